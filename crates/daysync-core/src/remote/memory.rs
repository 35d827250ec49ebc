use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::RemoteError;
use crate::models::Task;
use crate::remote::{document, sort_newest_first, RemoteDocument, RemoteStore};

#[derive(Debug, Default)]
struct MemoryState {
    user: Option<String>,
    collections: HashMap<String, BTreeMap<String, Value>>,
}

/// In-process remote collection keyed by user id.
///
/// Collections survive sign-out, so signing back in sees the same documents.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    state: Mutex<MemoryState>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(user_id: impl Into<String>) -> Self {
        let store = Self::new();
        store.sign_in(user_id);
        store
    }

    pub fn sign_in(&self, user_id: impl Into<String>) {
        self.state.lock().user = Some(user_id.into());
    }

    pub fn sign_out(&self) {
        self.state.lock().user = None;
    }

    /// Stores a raw body as-is, bypassing task encoding.
    pub fn put_raw(&self, doc_id: impl Into<String>, data: Value) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        let user = state.user.clone().ok_or(RemoteError::Unauthenticated)?;
        state
            .collections
            .entry(user)
            .or_default()
            .insert(doc_id.into(), data);
        Ok(())
    }

    pub fn document(&self, doc_id: &str) -> Option<Value> {
        let state = self.state.lock();
        let user = state.user.as_ref()?;
        state.collections.get(user)?.get(doc_id).cloned()
    }

    pub fn len(&self) -> usize {
        let state = self.state.lock();
        state
            .user
            .as_ref()
            .and_then(|user| state.collections.get(user))
            .map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    fn user_id(&self) -> Option<String> {
        self.state.lock().user.clone()
    }

    async fn upsert(&self, doc_id: &str, task: &Task) -> Result<(), RemoteError> {
        self.put_raw(doc_id, document::encode(task)?)
    }

    async fn delete(&self, doc_id: &str) -> Result<(), RemoteError> {
        let mut state = self.state.lock();
        let user = state.user.clone().ok_or(RemoteError::Unauthenticated)?;
        if let Some(collection) = state.collections.get_mut(&user) {
            collection.remove(doc_id);
        }
        Ok(())
    }

    async fn fetch_all_ordered_by_creation(&self) -> Result<Vec<RemoteDocument>, RemoteError> {
        let state = self.state.lock();
        let user = state.user.as_ref().ok_or(RemoteError::Unauthenticated)?;
        let mut documents: Vec<RemoteDocument> = state
            .collections
            .get(user)
            .map(|collection| {
                collection
                    .iter()
                    .map(|(id, data)| RemoteDocument {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        sort_newest_first(&mut documents);
        Ok(documents)
    }
}
