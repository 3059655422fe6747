use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_lock::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::app::api::SDK_VERSION;
use crate::app::constants::PLATFORM_LOG_STRING;
use crate::app::errors::{AppError, AppResult};
use crate::app::types::FirebaseApp;

const MAX_NUM_STORED_HEARTBEATS: usize = 30;
const MAX_HEADER_BYTES: usize = 1024;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatsInStorage {
    #[serde(default)]
    pub last_sent_heartbeat_date: Option<String>,
    #[serde(default)]
    pub heartbeats: Vec<SingleDateHeartbeat>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleDateHeartbeat {
    pub agent: String,
    pub date: String,
}

pub trait HeartbeatStorage: Send + Sync {
    fn read(&self) -> AppResult<HeartbeatsInStorage>;
    fn overwrite(&self, value: &HeartbeatsInStorage) -> AppResult<()>;
}

#[derive(Default)]
pub struct InMemoryHeartbeatStorage {
    value: Mutex<HeartbeatsInStorage>,
}

impl HeartbeatStorage for InMemoryHeartbeatStorage {
    fn read(&self) -> AppResult<HeartbeatsInStorage> {
        Ok(self.value.lock().unwrap().clone())
    }

    fn overwrite(&self, value: &HeartbeatsInStorage) -> AppResult<()> {
        *self.value.lock().unwrap() = value.clone();
        Ok(())
    }
}

/// Stores heartbeats as JSON in `<root>/firebase-heartbeat/heartbeats-<app>.json`.
#[derive(Clone, Debug)]
pub struct FileHeartbeatStorage {
    path: PathBuf,
}

impl FileHeartbeatStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_app(app: &FirebaseApp) -> AppResult<Self> {
        let layout = app.local_data_layout()?;
        let file_name = format!("heartbeats-{}.json", app.storage_name());
        Ok(Self::new(layout.heartbeat_dir().join(file_name)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn storage_error(action: &str, path: &Path, err: impl std::fmt::Display) -> AppError {
    AppError::Storage {
        message: format!("failed to {action} {}: {err}", path.display()),
    }
}

impl HeartbeatStorage for FileHeartbeatStorage {
    fn read(&self) -> AppResult<HeartbeatsInStorage> {
        if !self.path.exists() {
            return Ok(HeartbeatsInStorage::default());
        }
        let contents = fs::read_to_string(&self.path)
            .map_err(|err| storage_error("read", &self.path, err))?;
        if contents.trim().is_empty() {
            return Ok(HeartbeatsInStorage::default());
        }
        serde_json::from_str(&contents).map_err(|err| storage_error("parse", &self.path, err))
    }

    fn overwrite(&self, value: &HeartbeatsInStorage) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| storage_error("create", parent, err))?;
        }
        let serialized = serde_json::to_string(value)
            .map_err(|err| storage_error("serialize", &self.path, err))?;
        fs::write(&self.path, serialized).map_err(|err| storage_error("write", &self.path, err))
    }
}

/// Records at most one heartbeat per UTC day and turns them into the
/// `X-Firebase-Client` header.
pub struct HeartbeatService {
    agent: String,
    storage: Arc<dyn HeartbeatStorage>,
    cache: AsyncMutex<Option<HeartbeatsInStorage>>,
}

impl HeartbeatService {
    pub fn new(storage: Arc<dyn HeartbeatStorage>) -> Self {
        Self {
            agent: default_agent(),
            storage,
            cache: AsyncMutex::new(None),
        }
    }

    /// Service backed by the app's heartbeat folder on disk.
    pub fn for_app(app: &FirebaseApp) -> AppResult<Self> {
        app.check_destroyed()?;
        Ok(Self::new(Arc::new(FileHeartbeatStorage::for_app(app)?)))
    }

    /// Locks the cache for a whole read-modify-write, reading storage on first use.
    async fn lock_cache(&self) -> AppResult<AsyncMutexGuard<'_, Option<HeartbeatsInStorage>>> {
        let mut guard = self.cache.lock().await;
        if guard.is_none() {
            *guard = Some(self.storage.read()?);
        }
        Ok(guard)
    }

    fn store(
        &self,
        slot: &mut Option<HeartbeatsInStorage>,
        value: HeartbeatsInStorage,
    ) -> AppResult<()> {
        self.storage.overwrite(&value)?;
        *slot = Some(value);
        Ok(())
    }

    /// Adds today's heartbeat unless one was already recorded or sent today.
    pub async fn trigger_heartbeat(&self) -> AppResult<()> {
        let mut guard = self.lock_cache().await?;
        let mut cache = guard.clone().unwrap_or_default();
        let date = today_utc();

        if cache.last_sent_heartbeat_date.as_deref() == Some(date.as_str())
            || cache.heartbeats.iter().any(|heartbeat| heartbeat.date == date)
        {
            return Ok(());
        }

        cache.heartbeats.push(SingleDateHeartbeat {
            agent: self.agent.clone(),
            date,
        });
        prune_oldest(&mut cache.heartbeats);
        self.store(&mut guard, cache)
    }

    /// Drains as many stored heartbeats as fit in the header and returns it.
    pub async fn heartbeats_header(&self) -> AppResult<Option<String>> {
        let mut guard = self.lock_cache().await?;
        let mut cache = guard.clone().unwrap_or_default();
        if cache.heartbeats.is_empty() {
            return Ok(None);
        }

        let (selected, unsent) = split_for_header(&cache.heartbeats);
        let header = match encode_entries(&selected) {
            Some(header) if !selected.is_empty() => header,
            _ => return Ok(None),
        };

        cache.heartbeats = unsent;
        cache.last_sent_heartbeat_date = Some(today_utc());
        self.store(&mut guard, cache)?;
        Ok(Some(header))
    }
}

fn default_agent() -> String {
    format!("{PLATFORM_LOG_STRING}/{SDK_VERSION}")
}

fn today_utc() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

fn prune_oldest(heartbeats: &mut Vec<SingleDateHeartbeat>) {
    while heartbeats.len() > MAX_NUM_STORED_HEARTBEATS {
        if let Some((index, _)) = heartbeats
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.date.cmp(&b.date))
        {
            heartbeats.remove(index);
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct HeartbeatsByUserAgent {
    agent: String,
    dates: Vec<String>,
}

fn split_for_header(
    heartbeats: &[SingleDateHeartbeat],
) -> (Vec<HeartbeatsByUserAgent>, Vec<SingleDateHeartbeat>) {
    let mut selected: Vec<HeartbeatsByUserAgent> = Vec::new();
    let mut unsent = Vec::new();

    for heartbeat in heartbeats {
        match selected.iter_mut().find(|entry| entry.agent == heartbeat.agent) {
            Some(entry) => entry.dates.push(heartbeat.date.clone()),
            None => selected.push(HeartbeatsByUserAgent {
                agent: heartbeat.agent.clone(),
                dates: vec![heartbeat.date.clone()],
            }),
        }

        let fits = encode_entries(&selected)
            .map(|encoded| encoded.len() <= MAX_HEADER_BYTES)
            .unwrap_or(false);
        if fits {
            continue;
        }

        if let Some(entry) = selected.iter_mut().find(|entry| entry.agent == heartbeat.agent) {
            entry.dates.pop();
        }
        selected.retain(|entry| !entry.dates.is_empty());
        unsent.push(heartbeat.clone());
    }

    (selected, unsent)
}

fn encode_entries(entries: &[HeartbeatsByUserAgent]) -> Option<String> {
    let payload = json!({ "version": 2, "heartbeats": entries });
    serde_json::to_vec(&payload)
        .ok()
        .map(|bytes| URL_SAFE_NO_PAD.encode(bytes))
}
