use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use serde_json::Value as JsonValue;

use crate::firestore::error::{internal_error, FirestoreError, FirestoreResult};
use crate::firestore::model::DocumentKey;
use crate::firestore::remote::JsonProtoSerializer;
use crate::firestore::value::MapValue;

/// Cached documents, keyed by canonical document path.
pub const DOCUMENTS_FILE: &str = "documents.ldb";
pub const LOG_FILE: &str = "LOG";
pub const OLD_LOG_FILE: &str = "LOG.old";
pub const CURRENT_FILE: &str = "CURRENT";
pub const MANIFEST_FILE: &str = "MANIFEST-000001";
pub const LOCK_FILE: &str = "LOCK";

/// On-disk document cache of one database.
///
/// The directory holds the document table (`documents.ldb`), an operation
/// journal (`LOG`, previous session in `LOG.old`), two small config files
/// (`CURRENT`, `MANIFEST-000001`) and a `LOCK` file that exists while a client
/// has the cache open.
#[derive(Debug)]
pub struct LocalDocumentCache {
    dir: PathBuf,
    serializer: JsonProtoSerializer,
    // Guards the read-modify-write of the document table.
    table: Mutex<()>,
}

fn io_error(action: &str, path: &Path, err: impl std::fmt::Display) -> FirestoreError {
    internal_error(format!("failed to {action} {}: {err}", path.display()))
}

impl LocalDocumentCache {
    /// Opens (creating if needed) the cache in `dir` and takes the lock.
    pub fn open(dir: impl Into<PathBuf>, serializer: JsonProtoSerializer) -> FirestoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|err| io_error("create", &dir, err))?;

        let log = dir.join(LOG_FILE);
        if log.exists() {
            let old = dir.join(OLD_LOG_FILE);
            fs::rename(&log, &old).map_err(|err| io_error("rotate", &log, err))?;
        }

        let manifest = dir.join(MANIFEST_FILE);
        if !manifest.exists() {
            fs::write(&manifest, b"").map_err(|err| io_error("write", &manifest, err))?;
        }
        let current = dir.join(CURRENT_FILE);
        if !current.exists() {
            fs::write(&current, format!("{MANIFEST_FILE}\n"))
                .map_err(|err| io_error("write", &current, err))?;
        }

        let lock = dir.join(LOCK_FILE);
        fs::write(&lock, std::process::id().to_string())
            .map_err(|err| io_error("write", &lock, err))?;

        let cache = Self {
            dir,
            serializer,
            table: Mutex::new(()),
        };
        cache.append_log("Opened local document cache")?;
        Ok(cache)
    }

    pub fn read(&self, key: &DocumentKey) -> FirestoreResult<Option<MapValue>> {
        let _guard = self.table.lock().unwrap();
        let table = self.load_table()?;
        match table.get(&key.path().canonical_string()) {
            Some(document) => self.serializer.decode_document_fields(document).map(Some),
            None => Ok(None),
        }
    }

    pub fn write(&self, key: &DocumentKey, data: &MapValue) -> FirestoreResult<()> {
        let _guard = self.table.lock().unwrap();
        let mut table = self.load_table()?;
        let path = key.path().canonical_string();
        table.insert(path.clone(), self.serializer.encode_document(key, data));
        self.store_table(&table)?;
        self.append_log(&format!("Cached document {path}"))
    }

    /// Drops the cached copy of a document the backend reported missing.
    pub fn remove(&self, key: &DocumentKey) -> FirestoreResult<()> {
        let _guard = self.table.lock().unwrap();
        let mut table = self.load_table()?;
        let path = key.path().canonical_string();
        if table.remove(&path).is_some() {
            self.store_table(&table)?;
            self.append_log(&format!("Removed document {path}"))?;
        }
        Ok(())
    }

    /// Releases the lock. The cached data stays on disk.
    pub fn close(&self) -> FirestoreResult<()> {
        self.append_log("Closed local document cache")?;
        let lock = self.dir.join(LOCK_FILE);
        match fs::remove_file(&lock) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error("remove", &lock, err)),
        }
    }

    fn load_table(&self) -> FirestoreResult<BTreeMap<String, JsonValue>> {
        let path = self.dir.join(DOCUMENTS_FILE);
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(&path).map_err(|err| io_error("read", &path, err))?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents).map_err(|err| io_error("parse", &path, err))
    }

    fn store_table(&self, table: &BTreeMap<String, JsonValue>) -> FirestoreResult<()> {
        let path = self.dir.join(DOCUMENTS_FILE);
        let serialized =
            serde_json::to_vec(table).map_err(|err| io_error("serialize", &path, err))?;
        fs::write(&path, serialized).map_err(|err| io_error("write", &path, err))
    }

    fn append_log(&self, message: &str) -> FirestoreResult<()> {
        let path = self.dir.join(LOG_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| io_error("open", &path, err))?;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        writeln!(file, "{now} {message}").map_err(|err| io_error("append", &path, err))
    }
}
