//! Firebase app core: options, the named app registry, the dependency check run
//! before any client is built, and the on-disk heartbeat store.

pub mod api;
mod constants;
mod dependencies;
mod errors;
mod heartbeat;
mod logger;
mod types;

#[doc(inline)]
pub use api::{delete_app, get_app, initialize_app, SDK_VERSION};

#[doc(inline)]
pub use constants::{DEFAULT_ENTRY_NAME, PLATFORM_LOG_STRING};

#[doc(inline)]
pub use dependencies::{check_and_fix_dependencies, DependencyStatus};

#[doc(inline)]
pub use errors::{AppError, AppResult};

#[doc(inline)]
pub use heartbeat::{
    FileHeartbeatStorage, HeartbeatService, HeartbeatStorage, HeartbeatsInStorage,
    InMemoryHeartbeatStorage, SingleDateHeartbeat,
};

#[doc(inline)]
pub use logger::{set_log_level, set_user_log_handler, LogCallback, LogLevel, LogOptions, Logger, LOGGER};

#[doc(inline)]
pub use types::{FirebaseApp, FirebaseAppConfig, FirebaseAppSettings, FirebaseOptions};
