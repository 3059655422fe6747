use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app::DEFAULT_ENTRY_NAME;
use crate::cache::error::{CacheError, CacheResult};
use crate::cache::logger::LOGGER;
use crate::firestore::DEFAULT_DATABASE_ID;
use crate::logger::Logger;
use crate::platform::{app_storage_name, LocalDataLayout};

/// Extension of the Firestore database files the logs sweep leaves alone.
pub const DATABASE_FILE_EXTENSION: &str = "ldb";

/// Whether the logs/config sweep removes files or only reports them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CleanupMode {
    /// Logs every file it would delete and leaves the directory untouched.
    #[default]
    DryRun,
    Delete,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CleanupOutcome {
    Deleted(PathBuf),
    NotFound(PathBuf),
}

impl CleanupOutcome {
    pub fn path(&self) -> &Path {
        match self {
            CleanupOutcome::Deleted(path) | CleanupOutcome::NotFound(path) => path,
        }
    }
}

/// Result of [`LocalCacheCleaner::delete_logs_and_configs`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SweepReport {
    pub directory: PathBuf,
    pub mode: CleanupMode,
    /// False when the directory does not exist.
    pub found: bool,
    /// `.ldb` files, never touched.
    pub skipped: Vec<PathBuf>,
    /// Files reported as deleted; only removed from disk in [`CleanupMode::Delete`].
    pub deleted: Vec<PathBuf>,
}

/// Deletes the Firebase clients' state under the local application data root.
#[derive(Clone, Debug)]
pub struct LocalCacheCleaner {
    layout: LocalDataLayout,
    app_storage: String,
    project_id: String,
    database: String,
    mode: CleanupMode,
    logger: Logger,
}

impl LocalCacheCleaner {
    pub fn new(layout: LocalDataLayout, project_id: impl Into<String>) -> Self {
        Self {
            layout,
            app_storage: app_storage_name(DEFAULT_ENTRY_NAME),
            project_id: project_id.into(),
            database: DEFAULT_DATABASE_ID.to_string(),
            mode: CleanupMode::default(),
            logger: LOGGER.clone(),
        }
    }

    /// Cleaner rooted at the OS local application data directory.
    pub fn from_os(project_id: impl Into<String>) -> CacheResult<Self> {
        let layout = LocalDataLayout::from_os().ok_or(CacheError::NoLocalDataDirectory)?;
        Ok(Self::new(layout, project_id))
    }

    pub fn with_app_name(mut self, app_name: &str) -> Self {
        self.app_storage = app_storage_name(app_name);
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_mode(mut self, mode: CleanupMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn layout(&self) -> &LocalDataLayout {
        &self.layout
    }

    pub fn mode(&self) -> CleanupMode {
        self.mode
    }

    /// `<root>/firestore/<app>/<project>/main` for the default database.
    pub fn logs_directory(&self) -> PathBuf {
        self.layout
            .firestore_database_dir(&self.app_storage, &self.project_id, &self.database)
    }

    pub async fn delete_heartbeat_folder(&self) -> CacheResult<CleanupOutcome> {
        self.delete_directory(self.layout.heartbeat_dir()).await
    }

    pub async fn delete_firestore_folder(&self) -> CacheResult<CleanupOutcome> {
        self.delete_directory(self.layout.firestore_dir()).await
    }

    /// Sweeps the files directly inside [`Self::logs_directory`], keeping every
    /// `.ldb` file.
    pub async fn delete_logs_and_configs(&self) -> CacheResult<SweepReport> {
        let directory = self.logs_directory();
        let mut report = SweepReport {
            directory: directory.clone(),
            mode: self.mode,
            found: false,
            skipped: Vec::new(),
            deleted: Vec::new(),
        };

        let files = match list_files(&directory).await {
            Ok(files) => files,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                self.logger
                    .info(format!("Directory not found: {}", directory.display()));
                return Ok(report);
            }
            Err(err) => return Err(CacheError::io(&directory, err)),
        };
        report.found = true;

        if files.is_empty() {
            self.logger.info("No files found");
            return Ok(report);
        }

        for file in files {
            if is_database_file(&file) {
                self.logger
                    .info(format!("Skipping database file: {}", file.display()));
                report.skipped.push(file);
                continue;
            }
            if self.mode == CleanupMode::Delete {
                match tokio::fs::remove_file(&file).await {
                    Ok(()) => {}
                    Err(err) if err.kind() == ErrorKind::NotFound => {}
                    Err(err) => return Err(CacheError::io(&file, err)),
                }
            }
            self.logger.info(format!("Deleted file: {}", file.display()));
            report.deleted.push(file);
        }
        Ok(report)
    }

    async fn delete_directory(&self, path: PathBuf) -> CacheResult<CleanupOutcome> {
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {
                self.logger
                    .info(format!("Directory deleted: {}", path.display()));
                Ok(CleanupOutcome::Deleted(path))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                self.logger
                    .info(format!("Directory not found: {}", path.display()));
                Ok(CleanupOutcome::NotFound(path))
            }
            Err(err) => Err(CacheError::io(&path, err)),
        }
    }
}

fn is_database_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension == DATABASE_FILE_EXTENSION)
}

async fn list_files(directory: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(directory).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
