use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::session::error::{SessionError, SessionResult};

pub const CREDENTIALS_FILE_NAME: &str = "credentials.json";

/// Email/password pair read from `credentials.json`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Reads and parses the credentials file. The file is re-read on every call.
    pub async fn load(path: &Path) -> SessionResult<Self> {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|err| SessionError::CredentialsIo {
                    path: path.to_path_buf(),
                    message: err.to_string(),
                })?;
        serde_json::from_str(&contents).map_err(|err| SessionError::CredentialsParse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "current_thread")]
    async fn loads_email_and_password() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join(CREDENTIALS_FILE_NAME);
        std::fs::write(&path, r#"{ "email": "ada@example.com", "password": "hunter2" }"#).unwrap();

        let credentials = Credentials::load(&path).await.unwrap();
        assert_eq!(credentials.email, "ada@example.com");
        assert_eq!(credentials.password, "hunter2");
        assert!(!format!("{credentials:?}").contains("hunter2"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn missing_file_is_io_error() {
        let temp = tempfile::tempdir().unwrap();
        let err = Credentials::load(&temp.path().join(CREDENTIALS_FILE_NAME))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::CredentialsIo { .. }));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn missing_field_is_parse_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join(CREDENTIALS_FILE_NAME);
        std::fs::write(&path, r#"{ "email": "ada@example.com" }"#).unwrap();

        let err = Credentials::load(&path).await.unwrap_err();
        assert!(matches!(err, SessionError::CredentialsParse { .. }));
    }
}
