use std::sync::Mutex;
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone, Default)]
struct TokenState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expiration_time: Option<SystemTime>,
}

/// ID/refresh token pair of one user, with the ID token's expiry.
#[derive(Debug, Default)]
pub struct TokenManager {
    state: Mutex<TokenState>,
}

impl TokenManager {
    /// Stores freshly issued tokens; `expires_in` is relative to now.
    pub fn update(&self, access_token: String, refresh_token: String, expires_in: Duration) {
        let mut state = self.state.lock().unwrap();
        state.access_token = Some(access_token);
        state.refresh_token = Some(refresh_token);
        state.expiration_time = SystemTime::now().checked_add(expires_in);
    }

    /// Restores tokens read back from persistence.
    pub fn initialize(
        &self,
        access_token: Option<String>,
        refresh_token: Option<String>,
        expiration_time: Option<SystemTime>,
    ) {
        let mut state = self.state.lock().unwrap();
        state.access_token = access_token;
        state.refresh_token = refresh_token;
        state.expiration_time = expiration_time;
    }

    pub fn clear(&self) {
        *self.state.lock().unwrap() = TokenState::default();
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.lock().unwrap().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state.lock().unwrap().refresh_token.clone()
    }

    pub fn expiration_time(&self) -> Option<SystemTime> {
        self.state.lock().unwrap().expiration_time
    }

    /// True when there is no ID token or it expires within `tolerance`.
    pub fn should_refresh(&self, tolerance: Duration) -> bool {
        let state = self.state.lock().unwrap();
        if state.access_token.is_none() {
            return true;
        }
        match state.expiration_time {
            None => false,
            Some(expiration) => {
                let threshold = SystemTime::now()
                    .checked_add(tolerance)
                    .unwrap_or_else(SystemTime::now);
                expiration <= threshold
            }
        }
    }
}
