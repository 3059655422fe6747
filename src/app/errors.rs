use std::fmt;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    NoApp { app_name: String },
    BadAppName { app_name: String },
    DuplicateApp { app_name: String },
    AppDeleted { app_name: String },
    NoOptions,
    InvalidOptions { message: String },
    NoLocalDataDirectory,
    Storage { message: String },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NoApp { app_name } => {
                write!(f, "No Firebase App '{app_name}' has been created - call initialize_app() first")
            }
            AppError::BadAppName { app_name } => write!(f, "Illegal App name: '{app_name}'"),
            AppError::DuplicateApp { app_name } => write!(
                f,
                "Firebase App named '{app_name}' already exists with different options or config"
            ),
            AppError::AppDeleted { app_name } => {
                write!(f, "Firebase App named '{app_name}' already deleted")
            }
            AppError::NoOptions => write!(f, "Need to provide options to initialize a Firebase App."),
            AppError::InvalidOptions { message } => write!(f, "Invalid Firebase options: {message}"),
            AppError::NoLocalDataDirectory => {
                write!(f, "Could not determine the local application data directory")
            }
            AppError::Storage { message } => write!(f, "Local storage error: {message}"),
        }
    }
}

impl std::error::Error for AppError {}
