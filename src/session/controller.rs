use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_lock::Mutex as AsyncMutex;

use crate::app::{
    check_and_fix_dependencies, initialize_app, FirebaseAppSettings, FirebaseOptions,
};
use crate::auth::{Auth, User};
use crate::firestore::{DocumentSnapshot, Firestore};
use crate::logger::Logger;
use crate::platform::runtime::sleep;
use crate::session::clients::{ClientFactory, SessionClients};
use crate::session::credentials::{Credentials, CREDENTIALS_FILE_NAME};
use crate::session::error::{SessionError, SessionResult};
use crate::session::logger::LOGGER;

/// Collection holding one document per user, keyed by uid.
pub const USER_COLLECTION: &str = "User";

/// Delay inserted between the steps of [`SessionController::fetch_user_document`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FetchPacing {
    #[default]
    None,
    Fixed(Duration),
}

impl FetchPacing {
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

    pub fn from_millis(millis: u64) -> Self {
        if millis == 0 {
            FetchPacing::None
        } else {
            FetchPacing::Fixed(Duration::from_millis(millis))
        }
    }

    async fn pause(self) {
        if let FetchPacing::Fixed(delay) = self {
            sleep(delay).await;
        }
    }
}

/// Drives one Firebase session: initialize, clear, sign in/out and fetching
/// the signed-in user's document.
///
/// Clients are created by the injected [`ClientFactory`] on the first
/// `initialize` and reused afterwards, unless Firestore was terminated in
/// the meantime.
pub struct SessionController {
    options: FirebaseOptions,
    settings: FirebaseAppSettings,
    assets_dir: PathBuf,
    factory: Arc<dyn ClientFactory>,
    pacing: FetchPacing,
    logger: Logger,
    clients: AsyncMutex<Option<SessionClients>>,
}

impl SessionController {
    pub fn new(
        options: FirebaseOptions,
        settings: FirebaseAppSettings,
        assets_dir: impl Into<PathBuf>,
        factory: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            options,
            settings,
            assets_dir: assets_dir.into(),
            factory,
            pacing: FetchPacing::None,
            logger: LOGGER.clone(),
            clients: AsyncMutex::new(None),
        }
    }

    pub fn with_pacing(mut self, pacing: FetchPacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Routes this controller's progress lines to `logger`.
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn pacing(&self) -> FetchPacing {
        self.pacing
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.assets_dir.join(CREDENTIALS_FILE_NAME)
    }

    /// Runs the dependency check, then creates (or reuses) the clients with
    /// Firestore persistence enabled.
    pub async fn initialize(&self) -> SessionResult<()> {
        let status = check_and_fix_dependencies(&self.options, &self.settings).await;
        if !status.is_available() {
            return Err(SessionError::Dependencies(status));
        }

        let app = initialize_app(self.options.clone(), Some(self.settings.clone()))?;
        let clients = {
            let mut slot = self.clients.lock().await;
            let reusable = slot.as_ref().filter(|clients| {
                !clients.firestore.is_terminated()
                    && clients.firestore.set_persistence_enabled(true).is_ok()
            });
            match reusable {
                Some(clients) => clients.clone(),
                None => {
                    let clients = self.factory.create(&app)?;
                    clients.firestore.set_persistence_enabled(true)?;
                    *slot = Some(clients.clone());
                    clients
                }
            }
        };

        if let Some(heartbeat) = &clients.heartbeat {
            if let Err(err) = heartbeat.trigger_heartbeat().await {
                self.logger.warn(format!("Failed to record heartbeat: {err}"));
            }
        }

        self.logger.info("Firebase Initialization successful");
        self.log_current_user(&clients.auth);
        Ok(())
    }

    /// Terminates Firestore, then clears its local persistence.
    pub async fn clear(&self) -> SessionResult<()> {
        let firestore = self.firestore().await?;
        firestore.terminate().await?;
        firestore.clear_persistence().await?;
        self.logger.info("Firestore persistence cleared.");
        Ok(())
    }

    /// Signs in with the email/password pair from `credentials.json`.
    pub async fn sign_in(&self) -> SessionResult<Arc<User>> {
        let credentials = Credentials::load(&self.credentials_path()).await?;
        let auth = self.auth().await?;
        let credential = auth
            .sign_in_with_email_and_password(&credentials.email, &credentials.password)
            .await?;
        self.logger.info(format!(
            "User signed in successfully: {}",
            credential.user.email().unwrap_or(&credentials.email)
        ));
        Ok(credential.user)
    }

    pub async fn sign_out(&self) -> SessionResult<()> {
        let auth = self.auth().await?;
        auth.sign_out();
        self.log_current_user(&auth);
        Ok(())
    }

    /// Reads `User/{uid}` for the signed-in user.
    ///
    /// With nobody signed in this fails with [`SessionError::NoCurrentUser`]
    /// before Firestore is touched.
    pub async fn fetch_user_document(&self) -> SessionResult<DocumentSnapshot> {
        let clients = self.clients().await?;
        self.log_current_user(&clients.auth);

        let user = clients
            .auth
            .current_user()
            .ok_or(SessionError::NoCurrentUser)?;
        self.logger.info(format!("User ID: {}", user.uid()));

        self.pacing.pause().await;
        let collection = clients.firestore.collection(USER_COLLECTION)?;
        self.logger.info("Collection reference obtained.");

        self.pacing.pause().await;
        let document = collection.doc(user.uid())?;
        self.logger.info("Document reference obtained.");

        self.pacing.pause().await;
        let snapshot = document.get().await?;
        self.logger.info("Document retrieved successfully.");
        Ok(snapshot)
    }

    pub async fn auth(&self) -> SessionResult<Arc<Auth>> {
        Ok(self.clients().await?.auth)
    }

    pub async fn firestore(&self) -> SessionResult<Firestore> {
        Ok(self.clients().await?.firestore)
    }

    async fn clients(&self) -> SessionResult<SessionClients> {
        self.clients
            .lock()
            .await
            .clone()
            .ok_or(SessionError::NotInitialized)
    }

    fn log_current_user(&self, auth: &Auth) {
        let current = auth.current_user();
        let label = current
            .as_ref()
            .map(|user| user.email().unwrap_or(user.uid()))
            .unwrap_or("None");
        self.logger.info(format!("Current user: {label}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use httpmock::prelude::*;
    use httpmock::MockServer;
    use serde_json::json;

    use crate::firestore::{DocumentKey, FirestoreErrorCode, FirestoreValue, InMemoryDatastore, MapValue};
    use crate::session::clients::DefaultClientFactory;
    use crate::test_support::{start_mock_server, test_options, TEST_API_KEY};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    struct Harness {
        _temp: tempfile::TempDir,
        server: MockServer,
        datastore: InMemoryDatastore,
        controller: SessionController,
        lines: Arc<Mutex<Vec<String>>>,
    }

    fn harness() -> Harness {
        harness_with_pacing(FetchPacing::None)
    }

    fn harness_with_pacing(pacing: FetchPacing) -> Harness {
        let temp = tempfile::tempdir().unwrap();
        let server = start_mock_server();
        let datastore = InMemoryDatastore::new();
        let factory = DefaultClientFactory::new()
            .with_identity_toolkit_endpoint(server.url("/v1"))
            .with_secure_token_endpoint(server.url("/token"))
            .with_datastore(Arc::new(datastore.clone()));
        let settings = FirebaseAppSettings {
            name: Some(format!(
                "session-test-{}",
                COUNTER.fetch_add(1, Ordering::SeqCst)
            )),
            local_data_dir: Some(temp.path().join("data")),
            ..Default::default()
        };

        let lines = Arc::new(Mutex::new(Vec::new()));
        let logger = Logger::new("@regression/session-test");
        let sink = lines.clone();
        logger.set_log_handler(move |_, _, message| sink.lock().unwrap().push(message.to_string()));

        let controller = SessionController::new(
            test_options(),
            settings,
            temp.path().join("assets"),
            Arc::new(factory),
        )
        .with_logger(logger)
        .with_pacing(pacing);

        Harness {
            _temp: temp,
            server,
            datastore,
            controller,
            lines,
        }
    }

    fn write_credentials(harness: &Harness, email: &str, password: &str) {
        let dir = harness.controller.assets_dir();
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(
            dir.join(CREDENTIALS_FILE_NAME),
            json!({ "email": email, "password": password }).to_string(),
        )
        .unwrap();
    }

    fn mock_sign_in<'a>(server: &'a MockServer, email: &str, uid: &str) -> httpmock::Mock<'a> {
        let email = email.to_string();
        let uid = uid.to_string();
        server.mock(move |when, then| {
            when.method(POST)
                .path("/v1/accounts:signInWithPassword")
                .query_param("key", TEST_API_KEY);
            then.status(200).json_body(json!({
                "localId": uid,
                "email": email,
                "idToken": "id-token",
                "refreshToken": "refresh-token",
                "expiresIn": "3600"
            }));
        })
    }

    #[tokio::test(flavor = "current_thread")]
    async fn initialize_enables_persistence_and_logs_user() {
        let harness = harness();
        harness.controller.initialize().await.unwrap();

        let firestore = harness.controller.firestore().await.unwrap();
        assert!(firestore.persistence_enabled());
        let lines = harness.lines.lock().unwrap().clone();
        assert_eq!(
            lines,
            vec!["Firebase Initialization successful", "Current user: None"]
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn initialize_reports_unavailable_dependencies() {
        let harness = harness();
        let controller = SessionController::new(
            FirebaseOptions::default(),
            FirebaseAppSettings::default(),
            harness.controller.assets_dir(),
            Arc::new(DefaultClientFactory::new()),
        );

        let err = controller.initialize().await.unwrap_err();
        assert!(matches!(err, SessionError::Dependencies(status) if !status.is_available()));
        assert!(matches!(
            controller.auth().await,
            Err(SessionError::NotInitialized)
        ));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn initialize_twice_reuses_clients() {
        let harness = harness();
        harness.controller.initialize().await.unwrap();
        let first = harness.controller.auth().await.unwrap();
        harness.controller.initialize().await.unwrap();
        let second = harness.controller.auth().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn sign_in_then_sign_out() {
        let harness = harness();
        harness.controller.initialize().await.unwrap();
        write_credentials(&harness, "ada@example.com", "secret");
        let mock = mock_sign_in(&harness.server, "ada@example.com", "uid-1");

        let user = harness.controller.sign_in().await.unwrap();
        mock.assert();
        assert_eq!(user.email(), Some("ada@example.com"));

        harness.controller.sign_out().await.unwrap();
        let auth = harness.controller.auth().await.unwrap();
        assert!(auth.current_user().is_none());

        let lines = harness.lines.lock().unwrap().clone();
        assert!(lines.contains(&"User signed in successfully: ada@example.com".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some("Current user: None"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn sign_in_without_credentials_file_never_calls_auth() {
        let harness = harness();
        harness.controller.initialize().await.unwrap();
        let mock = mock_sign_in(&harness.server, "ada@example.com", "uid-1");

        let err = harness.controller.sign_in().await.unwrap_err();

        assert!(matches!(err, SessionError::CredentialsIo { .. }));
        mock.assert_hits(0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn fetch_without_user_fails_before_store_call() {
        let harness = harness();
        harness.controller.initialize().await.unwrap();

        let err = harness.controller.fetch_user_document().await.unwrap_err();

        assert!(matches!(err, SessionError::NoCurrentUser));
        assert_eq!(harness.datastore.get_count(), 0);
        let lines = harness.lines.lock().unwrap().clone();
        assert_eq!(lines.last().map(String::as_str), Some("Current user: None"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn fetch_reads_user_document() {
        let harness = harness();
        harness.controller.initialize().await.unwrap();
        write_credentials(&harness, "ada@example.com", "secret");
        mock_sign_in(&harness.server, "ada@example.com", "uid-1");
        let mut fields = std::collections::BTreeMap::new();
        fields.insert("name".to_string(), FirestoreValue::from_string("Ada"));
        harness.datastore.insert(
            &DocumentKey::from_string("User/uid-1").unwrap(),
            MapValue::new(fields),
        );

        harness.controller.sign_in().await.unwrap();
        let snapshot = harness.controller.fetch_user_document().await.unwrap();

        assert!(snapshot.exists());
        assert_eq!(snapshot.id(), "uid-1");
        assert_eq!(
            snapshot.get("name").and_then(FirestoreValue::as_str),
            Some("Ada")
        );
        assert_eq!(harness.datastore.get_count(), 1);
        let lines = harness.lines.lock().unwrap().clone();
        let tail: Vec<&str> = lines.iter().rev().take(5).rev().map(String::as_str).collect();
        assert_eq!(
            tail,
            vec![
                "Current user: ada@example.com",
                "User ID: uid-1",
                "Collection reference obtained.",
                "Document reference obtained.",
                "Document retrieved successfully.",
            ]
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn fixed_pacing_waits_before_each_fetch_step() {
        let delay = FetchPacing::DEFAULT_DELAY;
        let harness = harness_with_pacing(FetchPacing::Fixed(delay));
        harness.controller.initialize().await.unwrap();
        write_credentials(&harness, "ada@example.com", "secret");
        mock_sign_in(&harness.server, "ada@example.com", "uid-1");
        harness.datastore.insert(
            &DocumentKey::from_string("User/uid-1").unwrap(),
            MapValue::default(),
        );
        harness.controller.sign_in().await.unwrap();
        harness.lines.lock().unwrap().clear();

        // The sign-in above needs the real clock for its HTTP round trip.
        tokio::time::pause();
        let started = tokio::time::Instant::now();
        let snapshot = harness.controller.fetch_user_document().await.unwrap();
        let elapsed = started.elapsed();
        tokio::time::resume();

        assert!(snapshot.exists());
        assert_eq!(elapsed, delay * 3);
        assert_eq!(
            *harness.lines.lock().unwrap(),
            vec![
                "Current user: ada@example.com",
                "User ID: uid-1",
                "Collection reference obtained.",
                "Document reference obtained.",
                "Document retrieved successfully.",
            ]
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn clear_terminates_then_reinitialize_rebuilds() {
        let harness = harness();
        harness.controller.initialize().await.unwrap();
        let before = harness.controller.firestore().await.unwrap();

        harness.controller.clear().await.unwrap();
        assert!(before.is_terminated());
        let err = before.doc("User/uid-1").unwrap().get().await.unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::FailedPrecondition);

        harness.controller.initialize().await.unwrap();
        let after = harness.controller.firestore().await.unwrap();
        assert!(!after.is_terminated());
        assert!(after.persistence_enabled());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn operations_before_initialize_report_not_initialized() {
        let harness = harness();
        assert!(matches!(
            harness.controller.sign_out().await,
            Err(SessionError::NotInitialized)
        ));
        assert!(matches!(
            harness.controller.fetch_user_document().await,
            Err(SessionError::NotInitialized)
        ));
    }

    #[test]
    fn pacing_from_millis() {
        assert_eq!(FetchPacing::from_millis(0), FetchPacing::None);
        assert_eq!(
            FetchPacing::from_millis(500),
            FetchPacing::Fixed(FetchPacing::DEFAULT_DELAY)
        );
    }
}
