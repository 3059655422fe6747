use std::fmt;

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::session::SessionError;

pub type PanelResult<T> = Result<T, PanelError>;

#[derive(Debug, Clone)]
pub enum PanelError {
    UnknownAction(String),
    Session(SessionError),
    Cache(CacheError),
    Config(ConfigError),
}

impl fmt::Display for PanelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanelError::UnknownAction(name) => write!(f, "Unknown action `{name}`"),
            PanelError::Session(err) => write!(f, "{err}"),
            PanelError::Cache(err) => write!(f, "{err}"),
            PanelError::Config(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for PanelError {}

impl From<SessionError> for PanelError {
    fn from(error: SessionError) -> Self {
        PanelError::Session(error)
    }
}

impl From<CacheError> for PanelError {
    fn from(error: CacheError) -> Self {
        PanelError::Cache(error)
    }
}

impl From<ConfigError> for PanelError {
    fn from(error: ConfigError) -> Self {
        PanelError::Config(error)
    }
}
