use super::{Backend, RawEntry, WriteOutcome};
use crate::error::{MetaError, Result};
use crate::model::{MetadataPatch, Node, NodeKind, Principal};
use crate::session::{AccountSlot, SessionStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const API_BASE: &str = "https://api.box.com/2.0";
const PAGE_SIZE: usize = 1000;
const ITEM_FIELDS: &str = "id,type,name,created_at,modified_at,owned_by,modified_by";

/// Box backend over the content API.
///
/// Box cannot rewrite the real timestamps or ownership of an item, so the
/// metadata overlay lands in an enterprise metadata template instance
/// (`legacyData`), the convention the destination organization reads the
/// provenance from. An item that already carries the template is reported
/// as already tagged and left alone.
pub struct BoxBackend {
    http: reqwest::Client,
    access_token: String,
    slot: AccountSlot,
}

#[derive(Debug, Deserialize)]
struct BoxUser {
    login: String,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BoxItem {
    id: String,
    #[serde(rename = "type")]
    item_type: String,
    name: String,
    created_at: Option<DateTime<Utc>>,
    modified_at: Option<DateTime<Utc>>,
    owned_by: Option<BoxUser>,
    modified_by: Option<BoxUser>,
}

#[derive(Debug, Deserialize)]
struct ItemPage {
    entries: Vec<BoxItem>,
    total_count: usize,
}

impl From<BoxUser> for Principal {
    fn from(user: BoxUser) -> Self {
        Principal {
            email: user.login,
            name: user.name,
        }
    }
}

fn entry_from_item(item: BoxItem) -> Option<RawEntry> {
    let kind = match item.item_type.as_str() {
        "folder" => NodeKind::Folder,
        "file" => NodeKind::File,
        // web_link and friends have no counterpart in a Drive tree
        _ => return None,
    };
    Some(RawEntry {
        id: item.id,
        name: item.name,
        kind,
        owner: item.owned_by.map(Principal::from),
        last_modified_by: item.modified_by.map(Principal::from),
        modified_time: item.modified_at,
        created_time: item.created_at,
        permissions: Vec::new(),
    })
}

impl BoxBackend {
    /// Connect with the bearer token persisted by `--setup`.
    pub fn connect(store: &SessionStore, slot: AccountSlot) -> Result<Self> {
        let session = store.require(slot)?;
        let access_token = session.access_token.ok_or(MetaError::Auth {
            account: slot.as_str().to_string(),
        })?;
        Ok(Self::with_token(access_token, slot))
    }

    pub fn with_token(access_token: String, slot: AccountSlot) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token,
            slot,
        }
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED => Err(MetaError::SessionExpired {
                account: self.slot.as_str().to_string(),
                backend: "box",
            }),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(MetaError::Backend {
                    backend: "box",
                    message: format!("{}: {}", status, body),
                })
            }
        }
    }

    async fn get_item(&self, kind: &str, id: &str) -> Result<reqwest::Response> {
        let response = self
            .http
            .get(format!("{}/{}/{}", API_BASE, kind, id))
            .query(&[("fields", ITEM_FIELDS)])
            .header("Authorization", self.auth_header())
            .send()
            .await?;
        self.check(response).await
    }
}

#[async_trait]
impl Backend for BoxBackend {
    fn name(&self) -> &'static str {
        "box"
    }

    fn root_id(&self) -> String {
        // Box addresses the account root folder as id 0
        "0".to_string()
    }

    async fn authenticate(&self) -> Result<Principal> {
        let response = self
            .http
            .get(format!("{}/users/me", API_BASE))
            .header("Authorization", self.auth_header())
            .send()
            .await?;
        let user: BoxUser = self.check(response).await?.json().await?;
        Ok(user.into())
    }

    async fn list_children(&self, folder_id: &str) -> Result<Vec<RawEntry>> {
        let mut entries = Vec::new();
        let mut offset = 0usize;

        loop {
            debug!("listing box folder {} at offset {}", folder_id, offset);
            let response = self
                .http
                .get(format!("{}/folders/{}/items", API_BASE, folder_id))
                .query(&[
                    ("fields", ITEM_FIELDS.to_string()),
                    ("limit", PAGE_SIZE.to_string()),
                    ("offset", offset.to_string()),
                ])
                .header("Authorization", self.auth_header())
                .send()
                .await?;
            let page: ItemPage = self.check(response).await?.json().await?;

            offset += page.entries.len();
            entries.extend(page.entries.into_iter().filter_map(entry_from_item));
            if offset >= page.total_count {
                break;
            }
        }

        Ok(entries)
    }

    async fn read_metadata(&self, id: &str) -> Result<RawEntry> {
        // An id alone does not say file or folder; try the file endpoint
        // first, it is the overwhelmingly common case.
        let response = match self.get_item("files", id).await {
            Ok(response) => response,
            Err(MetaError::Backend { .. }) => self.get_item("folders", id).await?,
            Err(e) => return Err(e),
        };
        let item: BoxItem = response.json().await?;
        entry_from_item(item)
            .ok_or_else(|| MetaError::backend("box", format!("{} is not a file or folder", id)))
    }

    async fn write_metadata(&self, node: &Node, patch: &MetadataPatch) -> Result<WriteOutcome> {
        let kind = if node.is_folder() { "folders" } else { "files" };
        let url = format!(
            "{}/{}/{}/metadata/enterprise/legacyData",
            API_BASE, kind, node.id
        );

        let body = json!({
            "owner": patch.owner.as_ref().map(|p| p.email.clone()),
            "legacyLastModifyingUser": patch.last_modified_by.as_ref().map(|p| p.email.clone()),
            "legacyLastModifiedDate": patch.modified_time.map(|t| t.to_rfc3339()),
            "legacyCreatedDate": patch.created_time.map(|t| t.to_rfc3339()),
        });

        let response = self
            .http
            .post(url)
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            // Template instance already exists: migrated on an earlier run
            return Ok(WriteOutcome::AlreadyTagged);
        }
        self.check(response).await?;
        Ok(WriteOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_page_deserializes_box_payload() {
        let page: ItemPage = serde_json::from_str(
            r#"{
                "total_count": 2,
                "entries": [
                    {"id": "11", "type": "folder", "name": "docs"},
                    {"id": "12", "type": "file", "name": "report.txt",
                     "modified_at": "2019-04-02T09:30:00-07:00",
                     "owned_by": {"login": "alice@old.example", "name": "Alice"}}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(page.total_count, 2);
        let file = entry_from_item(page.entries.into_iter().nth(1).unwrap()).unwrap();
        assert_eq!(file.kind, NodeKind::File);
        assert_eq!(file.owner.unwrap().email, "alice@old.example");
        // Offsets are normalized to UTC on parse
        assert_eq!(
            file.modified_time.unwrap().to_rfc3339(),
            "2019-04-02T16:30:00+00:00"
        );
    }

    #[test]
    fn web_links_are_skipped() {
        let item = BoxItem {
            id: "13".to_string(),
            item_type: "web_link".to_string(),
            name: "bookmark".to_string(),
            created_at: None,
            modified_at: None,
            owned_by: None,
            modified_by: None,
        };
        assert!(entry_from_item(item).is_none());
    }
}
