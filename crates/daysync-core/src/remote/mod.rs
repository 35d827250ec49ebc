//! Remote document store: a per-user collection of task documents.
//!
//! Adapters only move documents; turning a document back into a [`Task`]
//! happens in the sync engine so one malformed record cannot fail a whole
//! snapshot.

use crate::error::RemoteError;
use crate::models::Task;
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

pub mod document;
pub mod file;
pub mod memory;

pub use document::TaskDocument;
pub use file::FileRemoteStore;
pub use memory::MemoryRemoteStore;

/// A raw document as fetched from the remote collection.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    pub id: String,
    pub data: Value,
}

impl RemoteDocument {
    /// Creation timestamp used for snapshot ordering; missing values sort last.
    pub fn created_at(&self) -> i64 {
        self.data
            .get("createdAt")
            .and_then(Value::as_i64)
            .unwrap_or(i64::MIN)
    }
}

/// Orders documents newest first, breaking ties by id for a stable snapshot.
pub(crate) fn sort_newest_first(documents: &mut [RemoteDocument]) {
    documents.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Document collection scoped to the currently authenticated user.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// The signed-in user, or `None` when working offline/signed out.
    fn user_id(&self) -> Option<String>;

    /// Allocates an id for a document that has never been uploaded.
    fn new_document_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }

    async fn upsert(&self, doc_id: &str, task: &Task) -> Result<(), RemoteError>;
    async fn delete(&self, doc_id: &str) -> Result<(), RemoteError>;
    /// Full snapshot ordered by creation time, newest first.
    async fn fetch_all_ordered_by_creation(&self) -> Result<Vec<RemoteDocument>, RemoteError>;
}
