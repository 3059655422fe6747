use std::path::{Path, PathBuf};

/// Directory holding per-day heartbeat records.
pub const HEARTBEAT_DIR_NAME: &str = "firebase-heartbeat";
/// Root of every Firestore local cache, one sub-tree per app and project.
pub const FIRESTORE_DIR_NAME: &str = "firestore";
/// Directory holding persisted auth sessions.
pub const AUTH_DIR_NAME: &str = "firebase-auth";
/// On-disk name used for the default app.
pub const DEFAULT_APP_STORAGE_NAME: &str = "__FIRAPP_DEFAULT";
/// On-disk name used for the `(default)` database.
pub const DEFAULT_DATABASE_STORAGE_NAME: &str = "main";

/// Returns the per-user local application data directory of the host OS
/// (`%LOCALAPPDATA%`, `~/Library/Application Support`, `$XDG_DATA_HOME`).
pub fn local_data_dir() -> Option<PathBuf> {
    dirs::data_local_dir()
}

/// The fixed layout of everything the Firebase clients keep on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalDataLayout {
    root: PathBuf,
}

impl LocalDataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout rooted at the OS local application data directory.
    pub fn from_os() -> Option<Self> {
        local_data_dir().map(Self::new)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn heartbeat_dir(&self) -> PathBuf {
        self.root.join(HEARTBEAT_DIR_NAME)
    }

    pub fn firestore_dir(&self) -> PathBuf {
        self.root.join(FIRESTORE_DIR_NAME)
    }

    pub fn auth_dir(&self) -> PathBuf {
        self.root.join(AUTH_DIR_NAME)
    }

    /// `<root>/firestore/<app>/<project>/<database>`, the directory holding the
    /// document cache together with its log and config files.
    pub fn firestore_database_dir(
        &self,
        app_storage_name: &str,
        project_id: &str,
        database: &str,
    ) -> PathBuf {
        self.firestore_dir()
            .join(app_storage_name)
            .join(project_id)
            .join(database_storage_name(database))
    }
}

/// Maps an app name to the directory name used on disk.
pub fn app_storage_name(app_name: &str) -> String {
    if app_name == crate::app::DEFAULT_ENTRY_NAME {
        DEFAULT_APP_STORAGE_NAME.to_string()
    } else {
        app_name.replace(['/', '\\', ':'], "_")
    }
}

fn database_storage_name(database: &str) -> &str {
    if database == crate::firestore::DEFAULT_DATABASE_ID {
        DEFAULT_DATABASE_STORAGE_NAME
    } else {
        database
    }
}
