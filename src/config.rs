//! Harness configuration, read from a JSON file.
//!
//! ```json
//! {
//!   "firebase_config_file": "firebase-config.json",
//!   "assets_dir": "assets",
//!   "fetch_delay_ms": 500,
//!   "cleanup_mode": "dry-run",
//!   "log_level": "info"
//! }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::app::{AppError, FirebaseAppSettings, FirebaseOptions, DEFAULT_ENTRY_NAME};
use crate::cache::{CacheError, CleanupMode, LocalCacheCleaner};
use crate::logger::{set_log_level, LogError};
use crate::platform::LocalDataLayout;
use crate::session::{DefaultClientFactory, FetchPacing, SessionController};

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone)]
pub enum ConfigError {
    Io { path: PathBuf, message: String },
    Parse(String),
    Options(AppError),
    LogLevel(LogError),
    Cache(CacheError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, message } => {
                write!(f, "Failed to read config {}: {message}", path.display())
            }
            ConfigError::Parse(message) => write!(f, "Invalid config: {message}"),
            ConfigError::Options(err) => write!(f, "{err}"),
            ConfigError::LogLevel(err) => write!(f, "{err}"),
            ConfigError::Cache(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<AppError> for ConfigError {
    fn from(error: AppError) -> Self {
        ConfigError::Options(error)
    }
}

impl From<LogError> for ConfigError {
    fn from(error: LogError) -> Self {
        ConfigError::LogLevel(error)
    }
}

impl From<CacheError> for ConfigError {
    fn from(error: CacheError) -> Self {
        ConfigError::Cache(error)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RegressionConfig {
    /// Inline web config; ignored when `firebase_config_file` is set.
    pub options: FirebaseOptions,
    pub firebase_config_file: Option<PathBuf>,
    pub app_name: Option<String>,
    /// Directory holding `credentials.json`.
    pub assets_dir: PathBuf,
    /// Replaces the OS local application data directory.
    pub data_root: Option<PathBuf>,
    pub fetch_delay_ms: u64,
    pub cleanup_mode: CleanupMode,
    pub log_level: Option<String>,
    pub app_version: String,
    pub identity_toolkit_endpoint: Option<String>,
    pub secure_token_endpoint: Option<String>,
    pub firestore_emulator_host: Option<String>,
    /// Named Firestore database; `(default)` when unset.
    pub database: Option<String>,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            options: FirebaseOptions::default(),
            firebase_config_file: None,
            app_name: None,
            assets_dir: PathBuf::from("assets"),
            data_root: None,
            fetch_delay_ms: FetchPacing::DEFAULT_DELAY.as_millis() as u64,
            cleanup_mode: CleanupMode::default(),
            log_level: None,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            identity_toolkit_endpoint: None,
            secure_token_endpoint: None,
            firestore_emulator_host: None,
            database: None,
        }
    }
}

impl RegressionConfig {
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Reads a config file. Relative paths inside it resolve against its directory.
    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let mut config = Self::from_json_str(&contents)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.assets_dir);
        if let Some(file) = self.firebase_config_file.as_mut() {
            resolve(file);
        }
        if let Some(root) = self.data_root.as_mut() {
            resolve(root);
        }
    }

    pub fn firebase_options(&self) -> ConfigResult<FirebaseOptions> {
        match &self.firebase_config_file {
            Some(path) => Ok(FirebaseOptions::from_json_file(path)?),
            None => Ok(self.options.clone()),
        }
    }

    pub fn app_settings(&self) -> FirebaseAppSettings {
        FirebaseAppSettings {
            name: self.app_name.clone(),
            local_data_dir: self.data_root.clone(),
            ..Default::default()
        }
    }

    pub fn pacing(&self) -> FetchPacing {
        FetchPacing::from_millis(self.fetch_delay_ms)
    }

    /// Applies `log_level` to every logger, when set.
    pub fn apply_log_level(&self) -> ConfigResult<()> {
        if let Some(level) = self.log_level.as_deref() {
            set_log_level(level)?;
        }
        Ok(())
    }

    pub fn client_factory(&self) -> DefaultClientFactory {
        let mut factory = DefaultClientFactory::new();
        if let Some(endpoint) = &self.identity_toolkit_endpoint {
            factory = factory.with_identity_toolkit_endpoint(endpoint.clone());
        }
        if let Some(endpoint) = &self.secure_token_endpoint {
            factory = factory.with_secure_token_endpoint(endpoint.clone());
        }
        if let Some(host) = &self.firestore_emulator_host {
            factory = factory.with_firestore_emulator_host(host.clone());
        }
        if let Some(database) = &self.database {
            factory = factory.with_database(database.clone());
        }
        factory
    }

    pub fn session_controller(&self) -> ConfigResult<SessionController> {
        Ok(SessionController::new(
            self.firebase_options()?,
            self.app_settings(),
            self.assets_dir.clone(),
            Arc::new(self.client_factory()),
        )
        .with_pacing(self.pacing()))
    }

    /// Cleaner for the configured app, project and data root.
    pub fn cache_cleaner(&self) -> ConfigResult<LocalCacheCleaner> {
        let project_id = self
            .firebase_options()?
            .project_id
            .ok_or_else(|| AppError::InvalidOptions {
                message: "project_id is required to locate the Firestore cache".into(),
            })?;
        let layout = match &self.data_root {
            Some(root) => LocalDataLayout::new(root.clone()),
            None => LocalDataLayout::from_os().ok_or(CacheError::NoLocalDataDirectory)?,
        };
        let mut cleaner = LocalCacheCleaner::new(layout, project_id)
            .with_app_name(self.app_name.as_deref().unwrap_or(DEFAULT_ENTRY_NAME))
            .with_mode(self.cleanup_mode);
        if let Some(database) = &self.database {
            cleaner = cleaner.with_database(database.clone());
        }
        Ok(cleaner)
    }
}
