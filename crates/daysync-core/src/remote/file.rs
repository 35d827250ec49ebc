use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::RemoteError;
use crate::models::Task;
use crate::remote::{document, sort_newest_first, RemoteDocument, RemoteStore};

const COLLECTION: &str = "daily_tasks";

/// Directory-backed document collection laid out as
/// `<root>/users/<uid>/daily_tasks/<docId>.json`.
///
/// Pointing several devices at a shared folder gives them a common "cloud".
#[derive(Debug)]
pub struct FileRemoteStore {
    root: PathBuf,
    user: RwLock<Option<String>>,
}

impl FileRemoteStore {
    pub fn new(root: impl Into<PathBuf>, user_id: Option<String>) -> Self {
        Self {
            root: root.into(),
            user: RwLock::new(user_id),
        }
    }

    pub fn sign_in(&self, user_id: impl Into<String>) {
        *self.user.write() = Some(user_id.into());
    }

    pub fn sign_out(&self) {
        *self.user.write() = None;
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir(&self) -> Result<PathBuf, RemoteError> {
        let user = self.user.read().clone().ok_or(RemoteError::Unauthenticated)?;
        check_segment(&user)?;
        Ok(self.root.join("users").join(user).join(COLLECTION))
    }

    fn document_path(&self, doc_id: &str) -> Result<PathBuf, RemoteError> {
        check_segment(doc_id)?;
        Ok(self.collection_dir()?.join(format!("{}.json", doc_id)))
    }
}

fn check_segment(segment: &str) -> Result<(), RemoteError> {
    let valid = !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(RemoteError::InvalidDocument(format!("illegal path segment '{}'", segment)))
    }
}

#[async_trait]
impl RemoteStore for FileRemoteStore {
    fn user_id(&self) -> Option<String> {
        self.user.read().clone()
    }

    async fn upsert(&self, doc_id: &str, task: &Task) -> Result<(), RemoteError> {
        let path = self.document_path(doc_id)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(&document::encode(task)?)?;

        // Write-then-rename so readers never observe a half-written document.
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, body).await?;
        tokio::fs::rename(&staging, &path).await?;
        Ok(())
    }

    async fn delete(&self, doc_id: &str) -> Result<(), RemoteError> {
        let path = self.document_path(doc_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn fetch_all_ordered_by_creation(&self) -> Result<Vec<RemoteDocument>, RemoteError> {
        let dir = self.collection_dir()?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut documents = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|stem| stem.to_str()).map(str::to_string) else {
                continue;
            };
            let raw = tokio::fs::read(&path).await?;
            // Undecodable bodies become `null` and are skipped by the merge like any bad record.
            let data = serde_json::from_slice(&raw).unwrap_or_else(|e| {
                tracing::warn!(document = %id, error = %e, "remote document is not valid JSON");
                Value::Null
            });
            documents.push(RemoteDocument { id, data });
        }

        sort_newest_first(&mut documents);
        Ok(documents)
    }
}
