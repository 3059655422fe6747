use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::auth::error::AuthResult;

mod file;

pub use file::FilePersistence;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PersistedAuthState {
    pub user_id: String,
    pub email: Option<String>,
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
    /// Expiration timestamp in seconds since the Unix epoch.
    pub expires_at: Option<i64>,
}

/// Storage backend for the signed-in user between runs.
pub trait AuthPersistence: Send + Sync {
    fn set(&self, state: Option<PersistedAuthState>) -> AuthResult<()>;
    fn get(&self) -> AuthResult<Option<PersistedAuthState>>;
}

#[derive(Default)]
pub struct InMemoryPersistence {
    value: Mutex<Option<PersistedAuthState>>,
}

impl AuthPersistence for InMemoryPersistence {
    fn set(&self, state: Option<PersistedAuthState>) -> AuthResult<()> {
        *self.value.lock().unwrap() = state;
        Ok(())
    }

    fn get(&self) -> AuthResult<Option<PersistedAuthState>> {
        Ok(self.value.lock().unwrap().clone())
    }
}
