use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::app::{FirebaseApp, HeartbeatService};
use crate::firestore::error::{
    failed_precondition, internal_error, FirestoreErrorCode, FirestoreResult,
};
use crate::firestore::local::LocalDocumentCache;
use crate::firestore::logger::LOGGER;
use crate::firestore::model::{DatabaseId, DocumentKey, ResourcePath};
use crate::firestore::remote::{
    Datastore, HttpDatastore, JsonProtoSerializer, NoopTokenProvider, RetrySettings,
    TokenProviderArc,
};

use super::reference::{CollectionReference, DocumentReference};
use super::settings::FirestoreSettings;
use super::snapshot::{DocumentSnapshot, SnapshotMetadata};

/// Handle to one Cloud Firestore database.
///
/// Clones share state. The client starts on the first document read; from then
/// on settings are frozen and, with persistence enabled, the on-disk cache is
/// held open until [`Firestore::terminate`].
#[derive(Clone)]
pub struct Firestore {
    inner: Arc<FirestoreInner>,
}

struct FirestoreInner {
    app: FirebaseApp,
    database_id: DatabaseId,
    datastore: Arc<dyn Datastore>,
    cache_dir: Option<PathBuf>,
    settings: Mutex<FirestoreSettings>,
    state: Mutex<ClientState>,
}

enum ClientState {
    Idle,
    Running(Option<Arc<LocalDocumentCache>>),
    Terminated,
}

impl fmt::Debug for Firestore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Firestore")
            .field("app", &self.inner.app.name())
            .field("database_id", &self.inner.database_id)
            .field("cache_dir", &self.inner.cache_dir)
            .finish()
    }
}

impl Firestore {
    pub fn builder(app: FirebaseApp) -> FirestoreBuilder {
        FirestoreBuilder::new(app)
    }

    /// Firestore for the app's default database over the REST transport.
    pub fn new(app: FirebaseApp) -> FirestoreResult<Self> {
        Self::builder(app).build()
    }

    pub fn app(&self) -> &FirebaseApp {
        &self.inner.app
    }

    pub fn database_id(&self) -> &DatabaseId {
        &self.inner.database_id
    }

    pub fn project_id(&self) -> &str {
        self.inner.database_id.project_id()
    }

    pub fn database(&self) -> &str {
        self.inner.database_id.database()
    }

    /// Directory of the on-disk document cache, when a local data root is known.
    pub fn cache_dir(&self) -> Option<&Path> {
        self.inner.cache_dir.as_deref()
    }

    pub fn persistence_enabled(&self) -> bool {
        self.inner.settings.lock().unwrap().persistence_enabled
    }

    /// Changes the persistence setting.
    ///
    /// Setting the current value again always succeeds. Changing it after the
    /// client has started (or been terminated) fails with `failed-precondition`.
    pub fn set_persistence_enabled(&self, enabled: bool) -> FirestoreResult<()> {
        let state = self.inner.state.lock().unwrap();
        let mut settings = self.inner.settings.lock().unwrap();
        if settings.persistence_enabled == enabled {
            return Ok(());
        }
        if !matches!(*state, ClientState::Idle) {
            return Err(failed_precondition(
                "Firestore has already been started and its settings can no longer be changed. \
                 You can only modify settings before calling any other methods on a Firestore object.",
            ));
        }
        settings.persistence_enabled = enabled;
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        matches!(*self.inner.state.lock().unwrap(), ClientState::Running(_))
    }

    pub fn is_terminated(&self) -> bool {
        matches!(*self.inner.state.lock().unwrap(), ClientState::Terminated)
    }

    /// Creates a `CollectionReference` pointing at `path` (e.g. `"User"`).
    pub fn collection(&self, path: &str) -> FirestoreResult<CollectionReference> {
        let resource = ResourcePath::from_string(path)?;
        CollectionReference::new(self.clone(), resource)
    }

    /// Creates a `DocumentReference` pointing at `path` (e.g. `"User/uid"`).
    pub fn doc(&self, path: &str) -> FirestoreResult<DocumentReference> {
        let resource = ResourcePath::from_string(path)?;
        DocumentReference::new(self.clone(), resource)
    }

    /// Shuts the client down and releases the on-disk cache.
    ///
    /// Terminating twice is a no-op. Every later read fails with
    /// `failed-precondition`; build a new `Firestore` to continue.
    pub async fn terminate(&self) -> FirestoreResult<()> {
        let previous = std::mem::replace(
            &mut *self.inner.state.lock().unwrap(),
            ClientState::Terminated,
        );
        if let ClientState::Running(Some(cache)) = previous {
            cache.close()?;
        }
        LOGGER.debug(format!(
            "Terminated Firestore for {}",
            self.inner.database_id.project_id()
        ));
        Ok(())
    }

    /// Deletes the on-disk cache directory.
    ///
    /// Only allowed before the first read or after [`Firestore::terminate`].
    pub async fn clear_persistence(&self) -> FirestoreResult<()> {
        if matches!(*self.inner.state.lock().unwrap(), ClientState::Running(_)) {
            return Err(failed_precondition(
                "Persistence can only be cleared before a Firestore instance is initialized or after it is terminated.",
            ));
        }

        let Some(dir) = self.inner.cache_dir.as_ref() else {
            return Ok(());
        };
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => {
                LOGGER.debug(format!("Cleared Firestore cache at {}", dir.display()));
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(internal_error(format!(
                "failed to remove {}: {err}",
                dir.display()
            ))),
        }
    }

    pub(crate) async fn get_document(&self, key: &DocumentKey) -> FirestoreResult<DocumentSnapshot> {
        let cache = self.ensure_started()?;

        match self.inner.datastore.get_document(key).await {
            Ok(snapshot) => {
                if let Some(cache) = cache.as_ref() {
                    let stored = match snapshot.map_value() {
                        Some(data) => cache.write(key, data),
                        None => cache.remove(key),
                    };
                    if let Err(err) = stored {
                        LOGGER.warn(format!("Failed to update local cache: {err}"));
                    }
                }
                Ok(snapshot)
            }
            Err(err) if err.code == FirestoreErrorCode::Unavailable => {
                let Some(cache) = cache.as_ref() else {
                    return Err(err);
                };
                match cache.read(key)? {
                    Some(data) => {
                        LOGGER.debug(format!(
                            "Serving {} from local cache: {err}",
                            key.path()
                        ));
                        Ok(DocumentSnapshot::new(
                            key.clone(),
                            Some(data),
                            SnapshotMetadata::new(true, false),
                        ))
                    }
                    None => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    fn ensure_started(&self) -> FirestoreResult<Option<Arc<LocalDocumentCache>>> {
        let mut state = self.inner.state.lock().unwrap();
        match &*state {
            ClientState::Running(cache) => return Ok(cache.clone()),
            ClientState::Terminated => {
                return Err(failed_precondition("The client has already been terminated."))
            }
            ClientState::Idle => {}
        }

        let persistence = self.inner.settings.lock().unwrap().persistence_enabled;
        let cache = match (persistence, self.inner.cache_dir.as_ref()) {
            (true, Some(dir)) => {
                let serializer = JsonProtoSerializer::new(self.inner.database_id.clone());
                match LocalDocumentCache::open(dir, serializer) {
                    Ok(cache) => Some(Arc::new(cache)),
                    Err(err) => {
                        LOGGER.warn(format!(
                            "Failed to open local cache, continuing without persistence: {err}"
                        ));
                        None
                    }
                }
            }
            _ => None,
        };
        *state = ClientState::Running(cache.clone());
        Ok(cache)
    }
}

/// Assembles a [`Firestore`]; by default the REST datastore and the app's
/// local data layout are used.
pub struct FirestoreBuilder {
    app: FirebaseApp,
    database: Option<String>,
    datastore: Option<Arc<dyn Datastore>>,
    auth_provider: TokenProviderArc,
    heartbeat: Option<Arc<HeartbeatService>>,
    emulator_host: Option<String>,
    retry: RetrySettings,
}

impl FirestoreBuilder {
    fn new(app: FirebaseApp) -> Self {
        Self {
            app,
            database: None,
            datastore: None,
            auth_provider: Arc::new(NoopTokenProvider),
            heartbeat: None,
            emulator_host: None,
            retry: RetrySettings::default(),
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Replaces the REST transport entirely.
    pub fn with_datastore(mut self, datastore: Arc<dyn Datastore>) -> Self {
        self.datastore = Some(datastore);
        self
    }

    pub fn with_auth_provider(mut self, provider: TokenProviderArc) -> Self {
        self.auth_provider = provider;
        self
    }

    pub fn with_heartbeat_service(mut self, service: Arc<HeartbeatService>) -> Self {
        self.heartbeat = Some(service);
        self
    }

    pub fn with_emulator_host(mut self, host: impl Into<String>) -> Self {
        self.emulator_host = Some(host.into());
        self
    }

    pub fn with_retry_settings(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    pub fn build(self) -> FirestoreResult<Firestore> {
        self.app
            .check_destroyed()
            .map_err(|err| failed_precondition(err.to_string()))?;

        let mut database_id = DatabaseId::from_app(&self.app)?;
        if let Some(database) = self.database {
            database_id = DatabaseId::new(database_id.project_id(), database);
        }

        let cache_dir = self.app.local_data_layout().ok().map(|layout| {
            layout.firestore_database_dir(
                &self.app.storage_name(),
                database_id.project_id(),
                database_id.database(),
            )
        });

        let datastore: Arc<dyn Datastore> = match self.datastore {
            Some(datastore) => datastore,
            None => {
                let mut builder = HttpDatastore::builder(database_id.clone())
                    .with_auth_provider(self.auth_provider)
                    .with_retry_settings(self.retry);
                if let Some(host) = self.emulator_host {
                    builder = builder.with_emulator_host(host);
                }
                if let Some(heartbeat) = self.heartbeat {
                    builder = builder.with_heartbeat_service(heartbeat);
                }
                Arc::new(builder.build()?)
            }
        };

        Ok(Firestore {
            inner: Arc::new(FirestoreInner {
                app: self.app,
                database_id,
                datastore,
                cache_dir,
                settings: Mutex::new(FirestoreSettings::default()),
                state: Mutex::new(ClientState::Idle),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::firestore::local::{DOCUMENTS_FILE, LOCK_FILE};
    use crate::firestore::remote::InMemoryDatastore;
    use crate::firestore::value::{FirestoreValue, MapValue};
    use crate::test_support::test_firebase_app;

    fn user_doc() -> MapValue {
        MapValue::new(BTreeMap::from([(
            "email".to_string(),
            FirestoreValue::from_string("ada@example.com"),
        )]))
    }

    fn setup(root: &Path) -> (Firestore, InMemoryDatastore) {
        let store = InMemoryDatastore::new();
        store.insert(&DocumentKey::from_string("User/uid-1").unwrap(), user_doc());
        let firestore = Firestore::builder(test_firebase_app(root))
            .with_datastore(Arc::new(store.clone()))
            .build()
            .unwrap();
        (firestore, store)
    }

    #[test]
    fn cache_dir_follows_local_data_layout() {
        let temp = tempfile::tempdir().unwrap();
        let (firestore, _) = setup(temp.path());
        let expected = temp
            .path()
            .join("firestore")
            .join(firestore.app().storage_name())
            .join("demo-project")
            .join("main");
        assert_eq!(firestore.cache_dir(), Some(expected.as_path()));
        assert!(firestore.persistence_enabled());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn settings_freeze_once_started() {
        let temp = tempfile::tempdir().unwrap();
        let (firestore, _) = setup(temp.path());

        firestore.set_persistence_enabled(false).unwrap();
        firestore.set_persistence_enabled(true).unwrap();

        firestore.doc("User/uid-1").unwrap().get().await.unwrap();
        assert!(firestore.is_started());
        firestore.set_persistence_enabled(true).unwrap();
        let err = firestore.set_persistence_enabled(false).unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::FailedPrecondition);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn reads_are_cached_and_served_offline() {
        let temp = tempfile::tempdir().unwrap();
        let (firestore, store) = setup(temp.path());
        let doc = firestore.collection("User").unwrap().doc("uid-1").unwrap();

        let online = doc.get().await.unwrap();
        assert!(!online.from_cache());
        let cache_dir = firestore.cache_dir().unwrap().to_path_buf();
        assert!(cache_dir.join(DOCUMENTS_FILE).exists());
        assert!(cache_dir.join(LOCK_FILE).exists());

        store.set_offline(true);
        let offline = doc.get().await.unwrap();
        assert!(offline.from_cache());
        assert_eq!(offline.get("email"), online.get("email"));

        let missing = firestore.doc("User/other").unwrap().get().await.unwrap_err();
        assert_eq!(missing.code, FirestoreErrorCode::Unavailable);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn without_persistence_nothing_touches_disk() {
        let temp = tempfile::tempdir().unwrap();
        let (firestore, store) = setup(temp.path());
        firestore.set_persistence_enabled(false).unwrap();

        firestore.doc("User/uid-1").unwrap().get().await.unwrap();
        assert!(!temp.path().join("firestore").exists());

        store.set_offline(true);
        assert!(firestore.doc("User/uid-1").unwrap().get().await.is_err());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn clear_requires_terminate_first() {
        let temp = tempfile::tempdir().unwrap();
        let (firestore, store) = setup(temp.path());
        firestore.doc("User/uid-1").unwrap().get().await.unwrap();
        let cache_dir = firestore.cache_dir().unwrap().to_path_buf();

        let err = firestore.clear_persistence().await.unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::FailedPrecondition);
        assert!(cache_dir.exists());

        firestore.terminate().await.unwrap();
        assert!(!cache_dir.join(LOCK_FILE).exists());
        firestore.clear_persistence().await.unwrap();
        assert!(!cache_dir.exists());
        firestore.clear_persistence().await.unwrap();

        let reads_before = store.get_count();
        let err = firestore.doc("User/uid-1").unwrap().get().await.unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::FailedPrecondition);
        assert_eq!(store.get_count(), reads_before);
        assert!(firestore.is_terminated());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn clear_before_start_is_allowed() {
        let temp = tempfile::tempdir().unwrap();
        let (firestore, _) = setup(temp.path());
        firestore.clear_persistence().await.unwrap();
        assert!(!firestore.is_started());
    }
}
