use std::fmt;
use std::fs;
use std::path::Path;

use crate::app::logger::LOGGER;
use crate::app::types::{FirebaseAppSettings, FirebaseOptions};
use crate::platform::LocalDataLayout;

/// Outcome of [`check_and_fix_dependencies`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DependencyStatus {
    Available,
    /// A required option is absent (`api_key`, `project_id`).
    UnavailableMissing { field: &'static str },
    /// A required option is present but unusable.
    UnavailableInvalid { field: &'static str, reason: String },
    /// The local data directory cannot be created or written.
    UnavailablePermission { message: String },
    UnavailableOther { message: String },
}

impl DependencyStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, DependencyStatus::Available)
    }
}

impl fmt::Display for DependencyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyStatus::Available => write!(f, "available"),
            DependencyStatus::UnavailableMissing { field } => {
                write!(f, "unavailable: missing option `{field}`")
            }
            DependencyStatus::UnavailableInvalid { field, reason } => {
                write!(f, "unavailable: invalid option `{field}` ({reason})")
            }
            DependencyStatus::UnavailablePermission { message } => {
                write!(f, "unavailable: permission denied ({message})")
            }
            DependencyStatus::UnavailableOther { message } => write!(f, "unavailable: {message}"),
        }
    }
}

/// Verifies everything the Auth and Firestore clients need before they are built.
///
/// Checks the required options and makes sure the local data root exists and is
/// writable, creating it when missing. Never panics and never retries.
pub async fn check_and_fix_dependencies(
    options: &FirebaseOptions,
    settings: &FirebaseAppSettings,
) -> DependencyStatus {
    for (field, value) in [
        ("api_key", options.api_key.as_deref()),
        ("project_id", options.project_id.as_deref()),
    ] {
        match value {
            None => return DependencyStatus::UnavailableMissing { field },
            Some(value) if value.trim().is_empty() => {
                return DependencyStatus::UnavailableInvalid {
                    field,
                    reason: "value is empty".into(),
                }
            }
            Some(value) if value.contains('/') && field == "project_id" => {
                return DependencyStatus::UnavailableInvalid {
                    field,
                    reason: "value must not contain '/'".into(),
                }
            }
            Some(_) => {}
        }
    }

    let layout = match &settings.local_data_dir {
        Some(dir) => LocalDataLayout::new(dir.clone()),
        None => match LocalDataLayout::from_os() {
            Some(layout) => layout,
            None => {
                return DependencyStatus::UnavailableOther {
                    message: "no local application data directory on this platform".into(),
                }
            }
        },
    };

    match ensure_writable(layout.root()) {
        Ok(()) => DependencyStatus::Available,
        Err(message) => {
            LOGGER.warn(format!(
                "Local data directory {} is not usable: {message}",
                layout.root().display()
            ));
            DependencyStatus::UnavailablePermission { message }
        }
    }
}

fn ensure_writable(root: &Path) -> Result<(), String> {
    fs::create_dir_all(root).map_err(|err| err.to_string())?;
    let metadata = fs::metadata(root).map_err(|err| err.to_string())?;
    if metadata.permissions().readonly() {
        return Err(format!("{} is read-only", root.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(dir: &Path) -> FirebaseAppSettings {
        FirebaseAppSettings {
            local_data_dir: Some(dir.to_path_buf()),
            ..Default::default()
        }
    }

    fn valid_options() -> FirebaseOptions {
        FirebaseOptions {
            api_key: Some("key".into()),
            project_id: Some("demo".into()),
            ..Default::default()
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn creates_missing_data_root() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("nested").join("appdata");
        let status = check_and_fix_dependencies(&valid_options(), &settings(&root)).await;
        assert_eq!(status, DependencyStatus::Available);
        assert!(root.is_dir());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn reports_missing_api_key() {
        let temp = tempfile::tempdir().unwrap();
        let options = FirebaseOptions {
            api_key: None,
            ..valid_options()
        };
        let status = check_and_fix_dependencies(&options, &settings(temp.path())).await;
        assert_eq!(status, DependencyStatus::UnavailableMissing { field: "api_key" });
        assert!(!status.is_available());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn reports_blank_project_id() {
        let temp = tempfile::tempdir().unwrap();
        let options = FirebaseOptions {
            project_id: Some("  ".into()),
            ..valid_options()
        };
        let status = check_and_fix_dependencies(&options, &settings(temp.path())).await;
        assert!(matches!(
            status,
            DependencyStatus::UnavailableInvalid {
                field: "project_id",
                ..
            }
        ));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn data_root_blocked_by_file_is_a_permission_failure() {
        let temp = tempfile::tempdir().unwrap();
        let blocker = temp.path().join("appdata");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let status = check_and_fix_dependencies(&valid_options(), &settings(&blocker)).await;
        assert!(matches!(status, DependencyStatus::UnavailablePermission { .. }));
    }
}
