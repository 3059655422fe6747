use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::token_manager::TokenManager;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub provider_id: String,
}

/// A signed-in account together with its tokens.
#[derive(Debug)]
pub struct User {
    info: UserInfo,
    token_manager: TokenManager,
}

impl User {
    pub fn new(info: UserInfo) -> Self {
        Self {
            info,
            token_manager: TokenManager::default(),
        }
    }

    /// Returns the stable Firebase UID for the user.
    pub fn uid(&self) -> &str {
        &self.info.uid
    }

    pub fn email(&self) -> Option<&str> {
        self.info.email.as_deref()
    }

    pub fn info(&self) -> &UserInfo {
        &self.info
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.token_manager.refresh_token()
    }

    pub fn token_manager(&self) -> &TokenManager {
        &self.token_manager
    }

    pub(crate) fn update_tokens(
        &self,
        access_token: String,
        refresh_token: String,
        expires_in: Duration,
    ) {
        self.token_manager
            .update(access_token, refresh_token, expires_in);
    }
}

#[derive(Clone, Debug)]
pub struct UserCredential {
    pub user: Arc<User>,
    pub provider_id: Option<String>,
    pub operation_type: Option<String>,
}

#[derive(Clone)]
pub struct EmailAuthProvider;

impl EmailAuthProvider {
    pub const PROVIDER_ID: &'static str = "password";
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInWithPasswordRequest {
    pub email: String,
    pub password: String,
    pub return_secure_token: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInWithPasswordResponse {
    pub local_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in: String,
    #[serde(default)]
    pub registered: Option<bool>,
}
