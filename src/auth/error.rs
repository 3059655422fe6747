use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;

use crate::app::AppError;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    App(AppError),
    Network(String),
    InvalidCredential(String),
    NotSignedIn,
    Persistence(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::App(err) => write!(f, "{err}"),
            AuthError::Network(message) => write!(f, "Network error: {message}"),
            AuthError::InvalidCredential(message) => write!(f, "Invalid credential: {message}"),
            AuthError::NotSignedIn => write!(f, "No user is signed in"),
            AuthError::Persistence(message) => write!(f, "Auth persistence error: {message}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<AppError> for AuthError {
    fn from(error: AppError) -> Self {
        AuthError::App(error)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Maps a failed Identity Toolkit / Secure Token response.
///
/// A backend error code such as `INVALID_LOGIN_CREDENTIALS` means the request
/// was understood and rejected; anything else is treated as a transport fault.
pub(crate) fn map_rest_error(status: StatusCode, body: &str) -> AuthError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .and_then(|error| error.message);
    match message {
        Some(message) => AuthError::InvalidCredential(message),
        None => AuthError::Network(format!("Request failed with status {status}")),
    }
}
