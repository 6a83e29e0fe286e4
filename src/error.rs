use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetaError {
    #[error("No stored session for the {account} account.\nRun `remeta --setup` to connect your accounts first.")]
    Auth { account: String },

    #[error("Session for the {account} account was rejected by {backend}.\nIt has likely expired; re-run `remeta --setup` to reconnect.")]
    SessionExpired {
        account: String,
        backend: &'static str,
    },

    #[error("Root folder not found on {backend}: {path}\nCheck the path spelling; it must name folders from the top of the account.")]
    RootNotFound { path: String, backend: &'static str },

    #[error("{backend} request failed: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    #[error("HTTP error: {0}\nCheck your network connection and try again.")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid session file: {0}\nDelete it and re-run `remeta --setup`.")]
    Session(#[from] serde_json::Error),

    #[error("Report export failed: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, MetaError>;

impl MetaError {
    /// Wrap a vendor SDK error, keeping only its message.
    pub fn backend(backend: &'static str, err: impl std::fmt::Display) -> Self {
        MetaError::Backend {
            backend,
            message: err.to_string(),
        }
    }
}
