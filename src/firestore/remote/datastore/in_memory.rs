use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::firestore::api::{DocumentSnapshot, SnapshotMetadata};
use crate::firestore::error::{unavailable, FirestoreResult};
use crate::firestore::model::DocumentKey;
use crate::firestore::value::MapValue;

use super::Datastore;

/// Process-local document source. Clones share the same documents.
#[derive(Clone, Default)]
pub struct InMemoryDatastore {
    documents: Arc<Mutex<BTreeMap<String, MapValue>>>,
    offline: Arc<AtomicBool>,
    get_count: Arc<AtomicUsize>,
}

impl InMemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &DocumentKey, data: MapValue) {
        self.documents
            .lock()
            .unwrap()
            .insert(key.path().canonical_string(), data);
    }

    /// While offline every read fails with `unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of `get_document` calls served so far, including failed ones.
    pub fn get_count(&self) -> usize {
        self.get_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Datastore for InMemoryDatastore {
    async fn get_document(&self, key: &DocumentKey) -> FirestoreResult<DocumentSnapshot> {
        self.get_count.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(unavailable("In-memory datastore is offline"));
        }
        let data = self
            .documents
            .lock()
            .unwrap()
            .get(&key.path().canonical_string())
            .cloned();
        Ok(DocumentSnapshot::new(
            key.clone(),
            data,
            SnapshotMetadata::default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::value::FirestoreValue;
    use crate::firestore::FirestoreErrorCode;

    #[tokio::test(flavor = "current_thread")]
    async fn serves_inserted_documents() {
        let store = InMemoryDatastore::new();
        let key = DocumentKey::from_string("User/uid-1").unwrap();
        store.insert(
            &key,
            MapValue::new(BTreeMap::from([(
                "email".to_string(),
                FirestoreValue::from_string("a@b.c"),
            )])),
        );

        let snapshot = store.get_document(&key).await.unwrap();
        assert!(snapshot.exists());
        let missing = store
            .get_document(&DocumentKey::from_string("User/other").unwrap())
            .await
            .unwrap();
        assert!(!missing.exists());
        assert_eq!(store.get_count(), 2);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn offline_reads_fail_unavailable() {
        let store = InMemoryDatastore::new();
        store.set_offline(true);
        let err = store
            .get_document(&DocumentKey::from_string("User/uid-1").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::Unavailable);
    }
}
