use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};

use crate::app::constants::DEFAULT_ENTRY_NAME;
use crate::app::errors::{AppError, AppResult};
use crate::app::logger::LOGGER;
use crate::app::types::{FirebaseApp, FirebaseAppConfig, FirebaseAppSettings, FirebaseOptions};

pub static SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

static APPS: LazyLock<Mutex<HashMap<String, FirebaseApp>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn normalize_name(settings: &FirebaseAppSettings) -> AppResult<String> {
    let name = settings
        .name
        .clone()
        .unwrap_or_else(|| DEFAULT_ENTRY_NAME.to_string());
    if name.trim().is_empty() {
        return Err(AppError::BadAppName { app_name: name });
    }
    Ok(name)
}

/// Creates (or returns the identical, already registered) app named by `settings`.
///
/// Re-initializing a name with different options or settings fails with
/// [`AppError::DuplicateApp`].
pub fn initialize_app(
    options: FirebaseOptions,
    settings: Option<FirebaseAppSettings>,
) -> AppResult<FirebaseApp> {
    let settings = settings.unwrap_or_default();
    let name = normalize_name(&settings)?;
    if !options.is_defined() {
        return Err(AppError::NoOptions);
    }

    let config = FirebaseAppConfig::new(
        name.clone(),
        settings.automatic_data_collection_enabled.unwrap_or(true),
    )
    .with_local_data_dir(settings.local_data_dir);

    let mut apps = APPS.lock().unwrap();
    if let Some(existing) = apps.get(&name) {
        if existing.options() == options && existing.config() == config {
            return Ok(existing.clone());
        }
        return Err(AppError::DuplicateApp { app_name: name });
    }

    let app = FirebaseApp::new(options, config);
    apps.insert(name.clone(), app.clone());
    LOGGER.debug(format!("Initialized Firebase App '{name}'"));
    Ok(app)
}

pub fn get_app(name: Option<&str>) -> AppResult<FirebaseApp> {
    let lookup = name.unwrap_or(DEFAULT_ENTRY_NAME);
    APPS.lock()
        .unwrap()
        .get(lookup)
        .cloned()
        .ok_or_else(|| AppError::NoApp {
            app_name: lookup.to_string(),
        })
}

/// Unregisters the app; further use of the handle fails with [`AppError::AppDeleted`].
pub fn delete_app(app: &FirebaseApp) -> AppResult<()> {
    let removed = APPS.lock().unwrap().remove(app.name());
    if removed.is_some() {
        app.set_is_deleted(true);
    }
    Ok(())
}
