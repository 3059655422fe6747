use std::fmt;
use std::path::PathBuf;

use crate::app::{AppError, DependencyStatus};
use crate::auth::AuthError;
use crate::firestore::FirestoreError;

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Clone)]
pub enum SessionError {
    /// The dependency check did not report `Available`.
    Dependencies(DependencyStatus),
    CredentialsIo { path: PathBuf, message: String },
    CredentialsParse { path: PathBuf, message: String },
    App(AppError),
    Auth(AuthError),
    Firestore(FirestoreError),
    NotInitialized,
    /// A document fetch was requested while nobody is signed in.
    NoCurrentUser,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Dependencies(status) => {
                write!(f, "Firebase dependencies {status}")
            }
            SessionError::CredentialsIo { path, message } => {
                write!(f, "Failed to read credentials file {}: {message}", path.display())
            }
            SessionError::CredentialsParse { path, message } => {
                write!(f, "Malformed credentials file {}: {message}", path.display())
            }
            SessionError::App(err) => write!(f, "{err}"),
            SessionError::Auth(err) => write!(f, "{err}"),
            SessionError::Firestore(err) => write!(f, "{err}"),
            SessionError::NotInitialized => write!(f, "Firebase has not been initialized"),
            SessionError::NoCurrentUser => write!(f, "No user is signed in"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::App(err) => Some(err),
            SessionError::Auth(err) => Some(err),
            SessionError::Firestore(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AppError> for SessionError {
    fn from(error: AppError) -> Self {
        SessionError::App(error)
    }
}

impl From<AuthError> for SessionError {
    fn from(error: AuthError) -> Self {
        SessionError::Auth(error)
    }
}

impl From<FirestoreError> for SessionError {
    fn from(error: FirestoreError) -> Self {
        SessionError::Firestore(error)
    }
}
