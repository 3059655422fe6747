//! Removal of the on-disk state the Firebase clients leave behind: the
//! heartbeat folder, the whole Firestore folder, and the log/config files next
//! to Firestore's `.ldb` database files.

mod cleaner;
mod error;
mod logger;

#[doc(inline)]
pub use cleaner::{CleanupMode, CleanupOutcome, LocalCacheCleaner, SweepReport, DATABASE_FILE_EXTENSION};

#[doc(inline)]
pub use error::{CacheError, CacheResult};
