use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::error::AuthError;
use crate::auth::Auth;
use crate::firestore::error::{internal_error, unauthenticated, unavailable, FirestoreError, FirestoreResult};
use crate::firestore::remote::datastore::{TokenProvider, TokenProviderArc};

/// Feeds the signed-in user's ID token into Firestore requests.
pub struct AuthTokenProvider {
    auth: Arc<Auth>,
    force_refresh: AtomicBool,
}

impl AuthTokenProvider {
    pub fn new(auth: Arc<Auth>) -> Self {
        Self {
            auth,
            force_refresh: AtomicBool::new(false),
        }
    }

    pub fn into_arc(self) -> TokenProviderArc {
        Arc::new(self)
    }
}

#[async_trait]
impl TokenProvider for AuthTokenProvider {
    async fn get_token(&self) -> FirestoreResult<Option<String>> {
        let force_refresh = self.force_refresh.swap(false, Ordering::SeqCst);
        self.auth.get_token(force_refresh).await.map_err(map_auth_error)
    }

    fn invalidate_token(&self) {
        self.force_refresh.store(true, Ordering::SeqCst);
    }
}

fn map_auth_error(error: AuthError) -> FirestoreError {
    match error {
        AuthError::InvalidCredential(message) => unauthenticated(message),
        AuthError::NotSignedIn => unauthenticated("No user is signed in"),
        AuthError::Network(message) => unavailable(message),
        AuthError::App(app_error) => internal_error(app_error.to_string()),
        AuthError::Persistence(message) => internal_error(message),
    }
}

pub fn auth_token_provider_arc(auth: Arc<Auth>) -> TokenProviderArc {
    AuthTokenProvider::new(auth).into_arc()
}
