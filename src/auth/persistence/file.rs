use std::fs;
use std::path::{Path, PathBuf};

use crate::app::FirebaseApp;
use crate::auth::error::{AuthError, AuthResult};
use crate::auth::persistence::{AuthPersistence, PersistedAuthState};

/// Keeps the signed-in user as JSON in `<root>/firebase-auth/<app>.json`.
#[derive(Clone, Debug)]
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn for_app(app: &FirebaseApp) -> AuthResult<Self> {
        let layout = app.local_data_layout()?;
        let file_name = format!("{}.json", app.storage_name());
        Ok(Self::new(layout.auth_dir().join(file_name)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn persistence_error(action: &str, err: impl std::fmt::Display) -> AuthError {
    AuthError::Persistence(format!("Failed to {action} auth persistence file: {err}"))
}

impl AuthPersistence for FilePersistence {
    fn set(&self, state: Option<PersistedAuthState>) -> AuthResult<()> {
        match &state {
            Some(state) => {
                let serialized =
                    serde_json::to_string(state).map_err(|err| persistence_error("serialize", err))?;
                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent).map_err(|err| persistence_error("create", err))?;
                }
                fs::write(&self.path, serialized).map_err(|err| persistence_error("write", err))
            }
            None => {
                if self.path.exists() {
                    fs::remove_file(&self.path).map_err(|err| persistence_error("remove", err))?;
                }
                Ok(())
            }
        }
    }

    fn get(&self) -> AuthResult<Option<PersistedAuthState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let buffer = fs::read_to_string(&self.path).map_err(|err| persistence_error("read", err))?;
        if buffer.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&buffer)
            .map(Some)
            .map_err(|err| persistence_error("parse", err))
    }
}
