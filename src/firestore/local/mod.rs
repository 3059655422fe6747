mod disk_cache;

#[doc(inline)]
pub use disk_cache::{
    LocalDocumentCache, CURRENT_FILE, DOCUMENTS_FILE, LOCK_FILE, LOG_FILE, MANIFEST_FILE,
    OLD_LOG_FILE,
};
