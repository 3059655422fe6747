use std::sync::Arc;

use crate::app::{FirebaseApp, HeartbeatService};
use crate::auth::{Auth, FilePersistence};
use crate::firestore::{Datastore, Firestore, RetrySettings};
use crate::session::error::SessionResult;

/// The Auth and Firestore handles one session works with.
#[derive(Clone)]
pub struct SessionClients {
    pub auth: Arc<Auth>,
    pub firestore: Firestore,
    pub heartbeat: Option<Arc<HeartbeatService>>,
}

/// Builds the clients for an app during `initialize`.
pub trait ClientFactory: Send + Sync {
    fn create(&self, app: &FirebaseApp) -> SessionResult<SessionClients>;
}

/// Builds real clients: Auth over the Identity Toolkit REST API with its state
/// persisted under the app's data root, and Firestore over its REST API.
#[derive(Clone, Default)]
pub struct DefaultClientFactory {
    identity_toolkit_endpoint: Option<String>,
    secure_token_endpoint: Option<String>,
    firestore_emulator_host: Option<String>,
    database: Option<String>,
    retry: Option<RetrySettings>,
    datastore: Option<Arc<dyn Datastore>>,
}

impl DefaultClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity_toolkit_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.identity_toolkit_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_secure_token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.secure_token_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_firestore_emulator_host(mut self, host: impl Into<String>) -> Self {
        self.firestore_emulator_host = Some(host.into());
        self
    }

    /// Targets a named Firestore database instead of `(default)`.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_retry_settings(mut self, retry: RetrySettings) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Serves documents from `datastore` instead of the REST API.
    pub fn with_datastore(mut self, datastore: Arc<dyn Datastore>) -> Self {
        self.datastore = Some(datastore);
        self
    }
}

impl ClientFactory for DefaultClientFactory {
    fn create(&self, app: &FirebaseApp) -> SessionResult<SessionClients> {
        let persistence = Arc::new(FilePersistence::for_app(app)?);
        let mut auth = Auth::builder(app.clone()).with_persistence(persistence);
        if let Some(endpoint) = &self.identity_toolkit_endpoint {
            auth = auth.with_identity_toolkit_endpoint(endpoint.clone());
        }
        if let Some(endpoint) = &self.secure_token_endpoint {
            auth = auth.with_secure_token_endpoint(endpoint.clone());
        }
        let auth = auth.build()?;

        let heartbeat = Arc::new(HeartbeatService::for_app(app)?);
        let mut firestore = Firestore::builder(app.clone())
            .with_auth_provider(auth.token_provider())
            .with_heartbeat_service(heartbeat.clone());
        if let Some(host) = &self.firestore_emulator_host {
            firestore = firestore.with_emulator_host(host.clone());
        }
        if let Some(database) = &self.database {
            firestore = firestore.with_database(database.clone());
        }
        if let Some(retry) = &self.retry {
            firestore = firestore.with_retry_settings(retry.clone());
        }
        if let Some(datastore) = &self.datastore {
            firestore = firestore.with_datastore(datastore.clone());
        }

        Ok(SessionClients {
            auth,
            firestore: firestore.build()?,
            heartbeat: Some(heartbeat),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::InMemoryDatastore;
    use crate::test_support::test_firebase_app;

    #[test]
    fn default_factory_builds_clients_for_app() {
        let temp = tempfile::tempdir().unwrap();
        let app = test_firebase_app(temp.path());
        let factory = DefaultClientFactory::new().with_datastore(Arc::new(InMemoryDatastore::new()));

        let clients = factory.create(&app).unwrap();

        assert_eq!(clients.auth.app().name(), app.name());
        assert_eq!(clients.firestore.project_id(), "demo-project");
        assert!(clients.auth.current_user().is_none());
        assert!(clients.heartbeat.is_some());
    }

    #[test]
    fn named_database_moves_the_cache_directory() {
        let temp = tempfile::tempdir().unwrap();
        let app = test_firebase_app(temp.path());
        let factory = DefaultClientFactory::new()
            .with_database("qa")
            .with_datastore(Arc::new(InMemoryDatastore::new()));

        let clients = factory.create(&app).unwrap();

        assert_eq!(clients.firestore.database(), "qa");
        assert!(clients.firestore.cache_dir().unwrap().ends_with("demo-project/qa"));
    }
}
