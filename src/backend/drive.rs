use super::{Backend, RawEntry, WriteOutcome};
use crate::error::{MetaError, Result};
use crate::model::{MetadataPatch, Node, NodeKind, Permission, Principal};
use crate::session::{AccountSlot, SessionStore};
use async_trait::async_trait;
use google_drive3::api::{File, Permission as DrivePermission, User};
use google_drive3::hyper::client::HttpConnector;
use google_drive3::hyper_rustls::HttpsConnector;
use google_drive3::{hyper, hyper_rustls, oauth2, DriveHub};
use tracing::{debug, warn};

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

const LIST_FIELDS: &str = "id, name, mimeType, owners, modifiedTime, createdTime, \
                           lastModifyingUser, permissions(id, emailAddress, displayName, role, type)";

/// Google Drive backend over the official v3 API.
pub struct DriveBackend {
    hub: DriveHub<HttpsConnector<HttpConnector>>,
    slot: AccountSlot,
}

impl DriveBackend {
    /// Connect using the OAuth client secret and the slot's persisted token
    /// file. The first run (during `--setup`) opens the installed-app flow;
    /// afterwards the SDK refreshes from disk without user interaction.
    pub async fn connect(store: &SessionStore, slot: AccountSlot) -> Result<Self> {
        let secret_path = store.client_secret_path();
        if !secret_path.exists() {
            return Err(MetaError::Config(format!(
                "missing OAuth client secret: {}\nDownload it from the Google API console and place it there.",
                secret_path.display()
            )));
        }

        let secret = oauth2::read_application_secret(&secret_path).await?;
        let auth = oauth2::InstalledFlowAuthenticator::builder(
            secret,
            oauth2::InstalledFlowReturnMethod::HTTPRedirect,
        )
        .persist_tokens_to_disk(store.token_path(slot))
        .build()
        .await?;

        let http_client = hyper::Client::builder().build(
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_native_roots()?
                .https_or_http()
                .enable_http1()
                .build(),
        );
        let hub = DriveHub::new(http_client, auth);

        Ok(Self { hub, slot })
    }
}

fn principal_from_user(user: &User) -> Option<Principal> {
    let email = user.email_address.clone()?;
    Some(Principal {
        email,
        name: user.display_name.clone(),
    })
}

/// Drive-native editor files get the extension a transfer service will have
/// put on the exported copy, so the join key lines up across accounts.
fn normalize_name(name: String, mime_type: Option<&str>) -> String {
    let lower = name.to_lowercase();
    match mime_type {
        Some("application/vnd.google-apps.document")
            if !lower.ends_with(".docx") && !lower.ends_with(".doc") && !lower.ends_with(".txt") =>
        {
            format!("{}.docx", name)
        }
        Some("application/vnd.google-apps.spreadsheet")
            if !lower.ends_with(".xlsx") && !lower.ends_with(".xls") =>
        {
            format!("{}.xlsx", name)
        }
        Some("application/vnd.google-apps.presentation")
            if !lower.ends_with(".pptx") && !lower.ends_with(".ppt") =>
        {
            format!("{}.pptx", name)
        }
        _ => name,
    }
}

fn entry_from_file(file: File) -> Option<RawEntry> {
    let id = file.id?;
    let raw_name = file.name.unwrap_or_default();
    let mime_type = file.mime_type.as_deref();
    let kind = if mime_type == Some(FOLDER_MIME) {
        NodeKind::Folder
    } else {
        NodeKind::File
    };
    let name = match kind {
        NodeKind::Folder => raw_name,
        NodeKind::File => normalize_name(raw_name, mime_type),
    };

    let owner = file
        .owners
        .as_ref()
        .and_then(|owners| owners.first())
        .and_then(principal_from_user);
    let last_modified_by = file
        .last_modifying_user
        .as_ref()
        .and_then(principal_from_user);
    let permissions = file
        .permissions
        .unwrap_or_default()
        .into_iter()
        .filter_map(|perm| {
            // Link-style grants have no principal; nothing to carry over
            let email = perm.email_address?;
            Some(Permission {
                principal: Principal {
                    email,
                    name: perm.display_name,
                },
                role: perm.role.unwrap_or_default(),
            })
        })
        .collect();

    Some(RawEntry {
        id,
        name,
        kind,
        owner,
        last_modified_by,
        modified_time: file.modified_time,
        created_time: file.created_time,
        permissions,
    })
}

#[async_trait]
impl Backend for DriveBackend {
    fn name(&self) -> &'static str {
        "drive"
    }

    fn root_id(&self) -> String {
        // Drive aliases the account's "My Drive" folder as `root`
        "root".to_string()
    }

    async fn authenticate(&self) -> Result<Principal> {
        let (_response, about) = self
            .hub
            .about()
            .get()
            .param("fields", "user")
            .doit()
            .await
            .map_err(|_| MetaError::SessionExpired {
                account: self.slot.as_str().to_string(),
                backend: "drive",
            })?;

        about
            .user
            .as_ref()
            .and_then(principal_from_user)
            .ok_or_else(|| MetaError::backend("drive", "about() returned no user identity"))
    }

    async fn list_children(&self, folder_id: &str) -> Result<Vec<RawEntry>> {
        if folder_id.is_empty() || folder_id.contains('\'') {
            return Err(MetaError::backend(
                "drive",
                format!("invalid folder id: {:?}", folder_id),
            ));
        }

        let query = format!("'{}' in parents and trashed = false", folder_id);
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            debug!("listing children of {} (page_token: {:?})", folder_id, page_token);
            let mut request = self
                .hub
                .files()
                .list()
                .q(&query)
                .page_size(1000)
                .param("fields", &format!("nextPageToken, files({})", LIST_FIELDS));
            if let Some(token) = &page_token {
                request = request.page_token(token);
            }

            let (_response, list) = request
                .doit()
                .await
                .map_err(|e| MetaError::backend("drive", e))?;

            for file in list.files.unwrap_or_default() {
                match entry_from_file(file) {
                    Some(entry) => entries.push(entry),
                    None => warn!("skipping listing row without an id"),
                }
            }

            page_token = list.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        Ok(entries)
    }

    async fn read_metadata(&self, id: &str) -> Result<RawEntry> {
        let (_response, file) = self
            .hub
            .files()
            .get(id)
            .param("fields", LIST_FIELDS)
            .doit()
            .await
            .map_err(|e| MetaError::backend("drive", e))?;

        entry_from_file(file)
            .ok_or_else(|| MetaError::backend("drive", format!("node {} has no id in response", id)))
    }

    /// Drive can set the modified time directly; owner and permissions go
    /// through the permissions API. The last-modifying user cannot be
    /// written on Drive, so that field of the patch is ignored here.
    async fn write_metadata(&self, node: &Node, patch: &MetadataPatch) -> Result<WriteOutcome> {
        if patch.modified_time.is_some() {
            let update = File {
                modified_time: patch.modified_time,
                ..Default::default()
            };
            self.hub
                .files()
                .update(update, &node.id)
                .doit_without_upload()
                .await
                .map_err(|e| MetaError::backend("drive", e))?;
        }

        for perm in &patch.permissions {
            let request = DrivePermission {
                email_address: Some(perm.principal.email.clone()),
                role: Some(perm.role.clone()),
                type_: Some("user".to_string()),
                ..Default::default()
            };
            self.hub
                .permissions()
                .create(request, &node.id)
                .send_notification_email(false)
                .doit()
                .await
                .map_err(|e| MetaError::backend("drive", e))?;
        }

        if let Some(owner) = &patch.owner {
            let request = DrivePermission {
                email_address: Some(owner.email.clone()),
                role: Some("owner".to_string()),
                type_: Some("user".to_string()),
                ..Default::default()
            };
            // Drive requires the notification email when transferring ownership
            self.hub
                .permissions()
                .create(request, &node.id)
                .transfer_ownership(true)
                .send_notification_email(true)
                .doit()
                .await
                .map_err(|e| MetaError::backend("drive", e))?;
        }

        Ok(WriteOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editor_files_gain_export_extensions() {
        let name = normalize_name(
            "Quarterly Report".to_string(),
            Some("application/vnd.google-apps.document"),
        );
        assert_eq!(name, "Quarterly Report.docx");

        let name = normalize_name(
            "Budget".to_string(),
            Some("application/vnd.google-apps.spreadsheet"),
        );
        assert_eq!(name, "Budget.xlsx");
    }

    #[test]
    fn existing_extension_is_not_doubled() {
        let name = normalize_name(
            "Report.DOCX".to_string(),
            Some("application/vnd.google-apps.document"),
        );
        assert_eq!(name, "Report.DOCX");
    }

    #[test]
    fn plain_files_keep_their_names() {
        let name = normalize_name("photo.jpg".to_string(), Some("image/jpeg"));
        assert_eq!(name, "photo.jpg");
    }

    #[test]
    fn folder_mime_maps_to_folder_kind() {
        let entry = entry_from_file(File {
            id: Some("d1".to_string()),
            name: Some("docs".to_string()),
            mime_type: Some(FOLDER_MIME.to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(entry.kind, NodeKind::Folder);
    }

    #[test]
    fn link_grants_without_principal_are_dropped() {
        let entry = entry_from_file(File {
            id: Some("f1".to_string()),
            name: Some("a.txt".to_string()),
            permissions: Some(vec![
                DrivePermission {
                    email_address: None,
                    role: Some("reader".to_string()),
                    ..Default::default()
                },
                DrivePermission {
                    email_address: Some("carol@old.example".to_string()),
                    role: Some("writer".to_string()),
                    ..Default::default()
                },
            ]),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(entry.permissions.len(), 1);
        assert_eq!(entry.permissions[0].principal.email, "carol@old.example");
    }
}
