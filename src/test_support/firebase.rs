use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::app::{FirebaseApp, FirebaseAppConfig, FirebaseOptions};

pub const TEST_API_KEY: &str = "test-api-key";
pub const TEST_PROJECT_ID: &str = "demo-project";

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Options carrying the test API key and project id.
pub fn test_options() -> FirebaseOptions {
    FirebaseOptions {
        api_key: Some(TEST_API_KEY.into()),
        project_id: Some(TEST_PROJECT_ID.into()),
        app_id: Some("1:000000000000:web:0000000000000000".into()),
        ..Default::default()
    }
}

/// Build a Firebase app whose on-disk data lives under `root`.
///
/// The app is not registered, and each call gets a unique name so tests stay
/// isolated from each other's caches.
pub fn test_firebase_app(root: &Path) -> FirebaseApp {
    let name = format!("test-app-{}", COUNTER.fetch_add(1, Ordering::SeqCst));
    let config = FirebaseAppConfig::new(name, false).with_local_data_dir(Some(root.to_path_buf()));
    FirebaseApp::new(test_options(), config)
}
