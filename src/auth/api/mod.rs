use std::sync::{Arc, Mutex};
use std::time::{Duration, UNIX_EPOCH};

use reqwest::{Client, Url};
use serde::Serialize;

pub mod token;

use crate::app::FirebaseApp;
use crate::auth::error::{map_rest_error, AuthError, AuthResult};
use crate::auth::logger::LOGGER;
use crate::auth::model::{
    EmailAuthProvider, SignInWithPasswordRequest, SignInWithPasswordResponse, User,
    UserCredential, UserInfo,
};
use crate::auth::persistence::{AuthPersistence, InMemoryPersistence, PersistedAuthState};
use crate::firestore::remote::datastore::TokenProviderArc;

/// Points both REST endpoints at a local Auth emulator, e.g. `127.0.0.1:9099`.
pub const AUTH_EMULATOR_HOST_ENV: &str = "FIREBASE_AUTH_EMULATOR_HOST";

const DEFAULT_IDENTITY_TOOLKIT_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";

pub struct Auth {
    app: FirebaseApp,
    api_key: String,
    current_user: Mutex<Option<Arc<User>>>,
    rest_client: Client,
    token_refresh_tolerance: Duration,
    persistence: Arc<dyn AuthPersistence>,
    identity_toolkit_endpoint: Mutex<String>,
    secure_token_endpoint: Mutex<String>,
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth")
            .field("app", &self.app.name())
            .field("identity_toolkit_endpoint", &self.identity_toolkit_endpoint())
            .finish()
    }
}

impl Auth {
    /// Creates a builder for configuring an `Auth` instance before construction.
    pub fn builder(app: FirebaseApp) -> AuthBuilder {
        AuthBuilder::new(app)
    }

    /// Constructs an `Auth` instance using in-memory persistence.
    pub fn new(app: FirebaseApp) -> AuthResult<Self> {
        Self::new_with_persistence(app, Arc::new(InMemoryPersistence::default()))
    }

    /// Constructs an `Auth` instance with a caller-provided persistence backend.
    ///
    /// Endpoints default to production unless `FIREBASE_AUTH_EMULATOR_HOST` is set.
    pub fn new_with_persistence(
        app: FirebaseApp,
        persistence: Arc<dyn AuthPersistence>,
    ) -> AuthResult<Self> {
        app.check_destroyed()?;
        let api_key = app
            .options()
            .api_key
            .ok_or_else(|| AuthError::InvalidCredential("Missing API key".into()))?;

        let (identity_toolkit_endpoint, secure_token_endpoint) =
            match std::env::var(AUTH_EMULATOR_HOST_ENV) {
                Ok(host) if !host.trim().is_empty() => emulator_endpoints(host.trim()),
                _ => (
                    DEFAULT_IDENTITY_TOOLKIT_ENDPOINT.to_string(),
                    token::DEFAULT_SECURE_TOKEN_ENDPOINT.to_string(),
                ),
            };

        Ok(Self {
            app,
            api_key,
            current_user: Mutex::new(None),
            rest_client: Client::new(),
            token_refresh_tolerance: Duration::from_secs(5 * 60),
            persistence,
            identity_toolkit_endpoint: Mutex::new(identity_toolkit_endpoint),
            secure_token_endpoint: Mutex::new(secure_token_endpoint),
        })
    }

    /// Restores a previously persisted user, if one carries a refresh token.
    pub fn initialize(&self) -> AuthResult<()> {
        match self.persistence.get()? {
            Some(state) if has_refresh_token(&state) => {
                let user = build_user_from_persisted_state(&state);
                LOGGER.debug(format!("Restored persisted user {}", user.uid()));
                *self.current_user.lock().unwrap() = Some(user);
            }
            _ => self.clear_local_user_state(),
        }
        Ok(())
    }

    /// Returns the `FirebaseApp` associated with this Auth instance.
    pub fn app(&self) -> &FirebaseApp {
        &self.app
    }

    /// Returns the currently signed-in user, if any.
    pub fn current_user(&self) -> Option<Arc<User>> {
        self.current_user.lock().unwrap().clone()
    }

    /// Signs out the current user and clears persisted credentials.
    ///
    /// Signing out with nobody signed in is a no-op.
    pub fn sign_out(&self) {
        self.clear_local_user_state();
        if let Err(err) = self.persistence.set(None) {
            LOGGER.warn(format!("Failed to clear persisted auth state: {err}"));
        }
    }

    /// Signs a user in using the email/password REST endpoint.
    pub async fn sign_in_with_email_and_password(
        &self,
        email: &str,
        password: &str,
    ) -> AuthResult<UserCredential> {
        let request = SignInWithPasswordRequest {
            email: email.to_owned(),
            password: password.to_owned(),
            return_secure_token: true,
        };

        let response: SignInWithPasswordResponse = self
            .execute_request("accounts:signInWithPassword", &request)
            .await?;
        self.finalize_sign_in(response)
    }

    /// Returns the current user's ID token, refreshing when requested or near expiry.
    pub async fn get_token(&self, force_refresh: bool) -> AuthResult<Option<String>> {
        let user = match self.current_user() {
            Some(user) => user,
            None => return Ok(None),
        };

        let needs_refresh = force_refresh
            || user
                .token_manager()
                .should_refresh(self.token_refresh_tolerance);

        if needs_refresh {
            let token = self.refresh_user_token(&user).await?;
            Ok(Some(token))
        } else {
            Ok(user.token_manager().access_token())
        }
    }

    /// Exposes this auth instance as a Firestore token provider.
    pub fn token_provider(self: &Arc<Self>) -> TokenProviderArc {
        crate::auth::token_provider::auth_token_provider_arc(self.clone())
    }

    /// Updates the Identity Toolkit REST endpoint.
    pub fn set_identity_toolkit_endpoint(&self, endpoint: impl Into<String>) {
        *self.identity_toolkit_endpoint.lock().unwrap() = endpoint.into();
    }

    /// Returns the Identity Toolkit REST endpoint in use.
    pub fn identity_toolkit_endpoint(&self) -> String {
        self.identity_toolkit_endpoint.lock().unwrap().clone()
    }

    /// Sets the Secure Token endpoint used for refresh operations.
    pub fn set_secure_token_endpoint(&self, endpoint: impl Into<String>) {
        *self.secure_token_endpoint.lock().unwrap() = endpoint.into();
    }

    pub fn secure_token_endpoint(&self) -> String {
        self.secure_token_endpoint.lock().unwrap().clone()
    }

    async fn execute_request<TRequest, TResponse>(
        &self,
        path: &str,
        request: &TRequest,
    ) -> AuthResult<TResponse>
    where
        TRequest: Serialize,
        TResponse: serde::de::DeserializeOwned,
    {
        let url = self.endpoint_url(path)?;
        let response = self
            .rest_client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|err| AuthError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(map_rest_error(status, &body));
        }

        response
            .json()
            .await
            .map_err(|err| AuthError::Network(err.to_string()))
    }

    fn endpoint_url(&self, path: &str) -> AuthResult<Url> {
        let base = self.identity_toolkit_endpoint();
        let endpoint = format!(
            "{}/{}?key={}",
            base.trim_end_matches('/'),
            path,
            self.api_key
        );
        Url::parse(&endpoint).map_err(|err| AuthError::Network(err.to_string()))
    }

    fn finalize_sign_in(&self, response: SignInWithPasswordResponse) -> AuthResult<UserCredential> {
        let expires_in = parse_expires_in(&response.expires_in)?;
        let user = User::new(UserInfo {
            uid: response.local_id,
            display_name: response.display_name,
            email: response.email,
            provider_id: EmailAuthProvider::PROVIDER_ID.to_string(),
        });
        user.update_tokens(response.id_token, response.refresh_token, expires_in);

        let user = Arc::new(user);
        *self.current_user.lock().unwrap() = Some(user.clone());
        self.save_persisted_state(&user);

        Ok(UserCredential {
            user,
            provider_id: Some(EmailAuthProvider::PROVIDER_ID.to_string()),
            operation_type: Some("signIn".to_string()),
        })
    }

    async fn refresh_user_token(&self, user: &Arc<User>) -> AuthResult<String> {
        let refresh_token = user
            .refresh_token()
            .ok_or_else(|| AuthError::InvalidCredential("Missing refresh token".into()))?;
        let response = token::refresh_id_token_with_endpoint(
            &self.rest_client,
            &self.secure_token_endpoint(),
            &self.api_key,
            &refresh_token,
        )
        .await?;
        let expires_in = parse_expires_in(&response.expires_in)?;

        // Held through persist; sign_out clears the user under the same lock.
        let current = self.current_user.lock().unwrap();
        if !current
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, user))
        {
            LOGGER.debug("Discarding refreshed token for a signed-out user");
            return Err(AuthError::NotSignedIn);
        }
        user.update_tokens(
            response.id_token.clone(),
            response.refresh_token,
            expires_in,
        );
        self.save_persisted_state(user);
        Ok(response.id_token)
    }

    // A persistence failure never undoes an in-memory sign-in.
    fn save_persisted_state(&self, user: &Arc<User>) {
        let expires_at = user
            .token_manager()
            .expiration_time()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|duration| duration.as_secs() as i64);

        let state = PersistedAuthState {
            user_id: user.uid().to_string(),
            email: user.info().email.clone(),
            refresh_token: user.refresh_token(),
            access_token: user.token_manager().access_token(),
            expires_at,
        };
        if let Err(err) = self.persistence.set(Some(state)) {
            LOGGER.warn(format!("Failed to persist auth state: {err}"));
        }
    }

    fn clear_local_user_state(&self) {
        let mut guard = self.current_user.lock().unwrap();
        if let Some(user) = guard.as_ref() {
            user.token_manager().clear();
        }
        *guard = None;
    }
}

fn emulator_endpoints(host: &str) -> (String, String) {
    (
        format!("http://{host}/identitytoolkit.googleapis.com/v1"),
        format!("http://{host}/securetoken.googleapis.com/v1/token"),
    )
}

fn parse_expires_in(value: &str) -> AuthResult<Duration> {
    let seconds = value
        .parse::<u64>()
        .map_err(|err| AuthError::InvalidCredential(format!("Invalid expiresIn value: {err}")))?;
    Ok(Duration::from_secs(seconds))
}

fn has_refresh_token(state: &PersistedAuthState) -> bool {
    state
        .refresh_token
        .as_deref()
        .is_some_and(|token| !token.is_empty())
}

fn build_user_from_persisted_state(state: &PersistedAuthState) -> Arc<User> {
    let user = User::new(UserInfo {
        uid: state.user_id.clone(),
        display_name: None,
        email: state.email.clone(),
        provider_id: EmailAuthProvider::PROVIDER_ID.to_string(),
    });
    let expiration_time = state.expires_at.and_then(|seconds| {
        if seconds <= 0 {
            None
        } else {
            UNIX_EPOCH.checked_add(Duration::from_secs(seconds as u64))
        }
    });
    user.token_manager().initialize(
        state.access_token.clone(),
        state.refresh_token.clone(),
        expiration_time,
    );
    Arc::new(user)
}

pub struct AuthBuilder {
    app: FirebaseApp,
    persistence: Option<Arc<dyn AuthPersistence>>,
    auto_initialize: bool,
    identity_toolkit_endpoint: Option<String>,
    secure_token_endpoint: Option<String>,
}

impl AuthBuilder {
    fn new(app: FirebaseApp) -> Self {
        Self {
            app,
            persistence: None,
            auto_initialize: true,
            identity_toolkit_endpoint: None,
            secure_token_endpoint: None,
        }
    }

    /// Overrides the persistence backend used by the Auth instance.
    pub fn with_persistence(mut self, persistence: Arc<dyn AuthPersistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Overrides the Identity Toolkit endpoint used by the Auth instance.
    pub fn with_identity_toolkit_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.identity_toolkit_endpoint = Some(endpoint.into());
        self
    }

    /// Overrides the Secure Token endpoint used for refresh operations.
    pub fn with_secure_token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.secure_token_endpoint = Some(endpoint.into());
        self
    }

    /// Prevents `build` from automatically calling `initialize`.
    pub fn defer_initialization(mut self) -> Self {
        self.auto_initialize = false;
        self
    }

    /// Builds the Auth instance, applying all configured overrides.
    pub fn build(self) -> AuthResult<Arc<Auth>> {
        let persistence = self
            .persistence
            .unwrap_or_else(|| Arc::new(InMemoryPersistence::default()));
        let auth = Arc::new(Auth::new_with_persistence(self.app, persistence)?);
        if let Some(endpoint) = self.identity_toolkit_endpoint {
            auth.set_identity_toolkit_endpoint(endpoint);
        }
        if let Some(endpoint) = self.secure_token_endpoint {
            auth.set_secure_token_endpoint(endpoint);
        }
        if self.auto_initialize {
            auth.initialize()?;
        }
        Ok(auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::persistence::FilePersistence;
    use crate::test_support::{start_mock_server, test_firebase_app, TEST_API_KEY};
    use httpmock::prelude::*;
    use httpmock::MockServer;
    use serde_json::json;

    const TEST_EMAIL: &str = "user@example.com";
    const TEST_PASSWORD: &str = "secret";
    const TEST_UID: &str = "uid-123";

    fn build_auth(server: &MockServer, root: &std::path::Path) -> Arc<Auth> {
        Auth::builder(test_firebase_app(root))
            .with_identity_toolkit_endpoint(server.url("/v1"))
            .with_secure_token_endpoint(server.url("/token"))
            .defer_initialization()
            .build()
            .expect("failed to build auth")
    }

    fn mock_sign_in<'a>(server: &'a MockServer, expires_in: &str) -> httpmock::Mock<'a> {
        server.mock(|when, then| {
            when.method(POST)
                .path("/v1/accounts:signInWithPassword")
                .query_param("key", TEST_API_KEY)
                .json_body(json!({
                    "email": TEST_EMAIL,
                    "password": TEST_PASSWORD,
                    "returnSecureToken": true
                }));
            then.status(200).json_body(json!({
                "localId": TEST_UID,
                "email": TEST_EMAIL,
                "idToken": "id-token",
                "refreshToken": "refresh-token",
                "expiresIn": expires_in
            }));
        })
    }

    #[tokio::test(flavor = "current_thread")]
    async fn sign_in_with_email_and_password_success() {
        let temp = tempfile::tempdir().unwrap();
        let server = start_mock_server();
        let auth = build_auth(&server, temp.path());
        let mock = mock_sign_in(&server, "3600");

        let credential = auth
            .sign_in_with_email_and_password(TEST_EMAIL, TEST_PASSWORD)
            .await
            .expect("sign-in should succeed");

        mock.assert();
        assert_eq!(
            credential.provider_id.as_deref(),
            Some(EmailAuthProvider::PROVIDER_ID)
        );
        assert_eq!(credential.operation_type.as_deref(), Some("signIn"));
        assert_eq!(credential.user.uid(), TEST_UID);
        assert_eq!(credential.user.email(), Some(TEST_EMAIL));
        assert_eq!(auth.current_user().unwrap().uid(), TEST_UID);
        assert_eq!(
            auth.get_token(false).await.unwrap().as_deref(),
            Some("id-token")
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn wrong_password_surfaces_backend_code() {
        let temp = tempfile::tempdir().unwrap();
        let server = start_mock_server();
        let auth = build_auth(&server, temp.path());
        server.mock(|when, then| {
            when.method(POST).path("/v1/accounts:signInWithPassword");
            then.status(400).json_body(json!({
                "error": { "code": 400, "message": "INVALID_LOGIN_CREDENTIALS" }
            }));
        });

        let err = auth
            .sign_in_with_email_and_password(TEST_EMAIL, "wrong")
            .await
            .unwrap_err();

        assert_eq!(
            err,
            AuthError::InvalidCredential("INVALID_LOGIN_CREDENTIALS".into())
        );
        assert!(auth.current_user().is_none());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn get_token_refreshes_when_expired() {
        let temp = tempfile::tempdir().unwrap();
        let server = start_mock_server();
        let auth = build_auth(&server, temp.path());
        mock_sign_in(&server, "0");
        let refresh = server.mock(|when, then| {
            when.method(POST)
                .path("/token")
                .query_param("key", TEST_API_KEY);
            then.status(200).json_body(json!({
                "access_token": "access",
                "refresh_token": "refresh-token-2",
                "id_token": "id-token-2",
                "expires_in": "3600",
                "user_id": TEST_UID
            }));
        });

        auth.sign_in_with_email_and_password(TEST_EMAIL, TEST_PASSWORD)
            .await
            .unwrap();
        let token = auth.get_token(false).await.unwrap();

        refresh.assert();
        assert_eq!(token.as_deref(), Some("id-token-2"));
        assert_eq!(
            auth.current_user().unwrap().refresh_token().as_deref(),
            Some("refresh-token-2")
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn sign_out_clears_user_and_is_idempotent() {
        let temp = tempfile::tempdir().unwrap();
        let server = start_mock_server();
        let auth = build_auth(&server, temp.path());
        mock_sign_in(&server, "3600");

        auth.sign_in_with_email_and_password(TEST_EMAIL, TEST_PASSWORD)
            .await
            .unwrap();
        auth.sign_out();
        auth.sign_out();

        assert!(auth.current_user().is_none());
        assert_eq!(auth.get_token(false).await.unwrap(), None);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn persisted_user_is_restored_on_initialize() {
        let temp = tempfile::tempdir().unwrap();
        let server = start_mock_server();
        let app = test_firebase_app(temp.path());
        let persistence = Arc::new(FilePersistence::for_app(&app).unwrap());
        mock_sign_in(&server, "3600");

        let first = Auth::builder(app.clone())
            .with_persistence(persistence.clone())
            .with_identity_toolkit_endpoint(server.url("/v1"))
            .build()
            .unwrap();
        first
            .sign_in_with_email_and_password(TEST_EMAIL, TEST_PASSWORD)
            .await
            .unwrap();

        let second = Auth::builder(app)
            .with_persistence(persistence.clone())
            .build()
            .unwrap();
        let restored = second.current_user().expect("user restored");
        assert_eq!(restored.uid(), TEST_UID);
        assert_eq!(restored.email(), Some(TEST_EMAIL));

        second.sign_out();
        assert!(persistence.get().unwrap().is_none());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn refresh_finishing_after_sign_out_is_not_persisted() {
        let temp = tempfile::tempdir().unwrap();
        let server = start_mock_server();
        let app = test_firebase_app(temp.path());
        let persistence = Arc::new(FilePersistence::for_app(&app).unwrap());
        mock_sign_in(&server, "0");
        server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(200)
                .delay(Duration::from_millis(300))
                .json_body(json!({
                    "access_token": "access",
                    "refresh_token": "refresh-token-2",
                    "id_token": "id-token-2",
                    "expires_in": "3600",
                    "user_id": TEST_UID
                }));
        });

        let auth = Auth::builder(app.clone())
            .with_persistence(persistence.clone())
            .with_identity_toolkit_endpoint(server.url("/v1"))
            .with_secure_token_endpoint(server.url("/token"))
            .build()
            .unwrap();
        auth.sign_in_with_email_and_password(TEST_EMAIL, TEST_PASSWORD)
            .await
            .unwrap();

        let refreshing = {
            let auth = auth.clone();
            tokio::spawn(async move { auth.get_token(false).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        auth.sign_out();

        let result = refreshing.await.unwrap();
        assert_eq!(result, Err(AuthError::NotSignedIn));
        assert!(auth.current_user().is_none());
        assert!(persistence.get().unwrap().is_none());

        let restarted = Auth::builder(app)
            .with_persistence(persistence)
            .build()
            .unwrap();
        assert!(restarted.current_user().is_none());
    }

    #[test]
    fn emulator_endpoints_use_plain_http() {
        let (identity, secure) = emulator_endpoints("127.0.0.1:9099");
        assert_eq!(
            identity,
            "http://127.0.0.1:9099/identitytoolkit.googleapis.com/v1"
        );
        assert_eq!(
            secure,
            "http://127.0.0.1:9099/securetoken.googleapis.com/v1/token"
        );
    }
}
