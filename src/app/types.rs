use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::app::errors::{AppError, AppResult};
use crate::platform::{app_storage_name, LocalDataLayout};

/// Project configuration, as found in the web config snippet of the Firebase console.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_domain: Option<String>,
    #[serde(default, rename = "databaseURL", skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messaging_sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_id: Option<String>,
}

impl FirebaseOptions {
    /// Parses the JSON web config (`{"apiKey": ..., "projectId": ...}`).
    pub fn from_json_str(json: &str) -> AppResult<Self> {
        serde_json::from_str(json).map_err(|err| AppError::InvalidOptions {
            message: err.to_string(),
        })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|err| AppError::InvalidOptions {
            message: format!("failed to read {}: {err}", path.display()),
        })?;
        Self::from_json_str(&contents)
    }

    pub(crate) fn is_defined(&self) -> bool {
        self.api_key.is_some()
            || self.project_id.is_some()
            || self.app_id.is_some()
            || self.auth_domain.is_some()
            || self.database_url.is_some()
            || self.storage_bucket.is_some()
            || self.messaging_sender_id.is_some()
            || self.measurement_id.is_some()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FirebaseAppSettings {
    pub name: Option<String>,
    pub automatic_data_collection_enabled: Option<bool>,
    /// Overrides the OS local application data directory as the root of every
    /// on-disk cache the app and its services keep.
    pub local_data_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FirebaseAppConfig {
    pub name: Arc<str>,
    pub automatic_data_collection_enabled: bool,
    pub local_data_dir: Option<PathBuf>,
}

impl FirebaseAppConfig {
    pub fn new(name: impl Into<String>, automatic: bool) -> Self {
        Self {
            name: Arc::from(name.into().into_boxed_str()),
            automatic_data_collection_enabled: automatic,
            local_data_dir: None,
        }
    }

    pub fn with_local_data_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.local_data_dir = dir;
        self
    }
}

#[derive(Clone)]
pub struct FirebaseApp {
    inner: Arc<FirebaseAppInner>,
}

struct FirebaseAppInner {
    options: FirebaseOptions,
    config: FirebaseAppConfig,
    is_deleted: AtomicBool,
}

impl FirebaseApp {
    pub fn new(options: FirebaseOptions, config: FirebaseAppConfig) -> Self {
        Self {
            inner: Arc::new(FirebaseAppInner {
                options,
                config,
                is_deleted: AtomicBool::new(false),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn options(&self) -> FirebaseOptions {
        self.inner.options.clone()
    }

    pub fn config(&self) -> FirebaseAppConfig {
        self.inner.config.clone()
    }

    pub fn automatic_data_collection_enabled(&self) -> bool {
        self.inner.config.automatic_data_collection_enabled
    }

    /// The directory name this app uses inside shared on-disk caches.
    pub fn storage_name(&self) -> String {
        app_storage_name(self.name())
    }

    /// Resolves the on-disk layout, honoring the settings override first.
    pub fn local_data_layout(&self) -> AppResult<LocalDataLayout> {
        match &self.inner.config.local_data_dir {
            Some(dir) => Ok(LocalDataLayout::new(dir.clone())),
            None => LocalDataLayout::from_os().ok_or(AppError::NoLocalDataDirectory),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.inner.is_deleted.load(Ordering::SeqCst)
    }

    pub(crate) fn set_is_deleted(&self, value: bool) {
        self.inner.is_deleted.store(value, Ordering::SeqCst);
    }

    pub fn check_destroyed(&self) -> AppResult<()> {
        if self.is_deleted() {
            return Err(AppError::AppDeleted {
                app_name: self.name().to_owned(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for FirebaseApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseApp")
            .field("name", &self.name())
            .field("project_id", &self.inner.options.project_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_console_web_config() {
        let options = FirebaseOptions::from_json_str(
            r#"{
                "apiKey": "AIza-test",
                "authDomain": "demo.firebaseapp.com",
                "databaseURL": "https://demo.firebaseio.com",
                "projectId": "demo",
                "appId": "1:123:web:abc"
            }"#,
        )
        .unwrap();
        assert_eq!(options.api_key.as_deref(), Some("AIza-test"));
        assert_eq!(options.project_id.as_deref(), Some("demo"));
        assert_eq!(
            options.database_url.as_deref(),
            Some("https://demo.firebaseio.com")
        );
        assert!(options.storage_bucket.is_none());
    }

    #[test]
    fn rejects_malformed_config() {
        let err = FirebaseOptions::from_json_str("{\"apiKey\": 12}").unwrap_err();
        assert!(matches!(err, AppError::InvalidOptions { .. }));
    }

    #[test]
    fn settings_override_local_data_layout() {
        let config = FirebaseAppConfig::new("[DEFAULT]", true)
            .with_local_data_dir(Some(PathBuf::from("/tmp/regression-root")));
        let app = FirebaseApp::new(FirebaseOptions::default(), config);
        let layout = app.local_data_layout().unwrap();
        assert_eq!(layout.root(), Path::new("/tmp/regression-root"));
        assert_eq!(app.storage_name(), "__FIRAPP_DEFAULT");
    }
}
