//! Daily generation quota persisted in a key-value store.
//!
//! The record is normalized against "today" before every read and write, so
//! a counter never survives a day boundary no matter how long the client
//! sat idle. Storage problems never reach the caller: an unreadable or
//! corrupt record simply starts a fresh day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Key the quota record is stored under.
pub const STORAGE_KEY: &str = "retro_vision_daily_limit";

/// Successful generations allowed per calendar day.
pub const DAILY_MAX: u32 = 10;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Minimal string key-value storage (the browser's local storage, a file, ...).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Source of the current calendar date.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local system date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// Clock pinned to a settable date.
#[derive(Debug)]
pub struct ManualClock {
    date: Mutex<NaiveDate>,
}

impl ManualClock {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date: Mutex::new(date),
        }
    }

    pub fn set(&self, date: NaiveDate) {
        if let Ok(mut current) = self.date.lock() {
            *current = date;
        }
    }

    /// Move the clock forward by whole days.
    pub fn advance_days(&self, days: u64) {
        if let Ok(mut current) = self.date.lock() {
            *current = *current + chrono::Days::new(days);
        }
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        match self.date.lock() {
            Ok(date) => *date,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let data = self
            .data
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(data.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut data = self
            .data
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store that keeps each key in `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(path)?))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

/// Persisted quota record: `{"count": 3, "lastResetDate": "2026-10-16"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaState {
    pub count: u32,
    pub last_reset_date: NaiveDate,
}

impl QuotaState {
    fn fresh(today: NaiveDate) -> Self {
        Self {
            count: 0,
            last_reset_date: today,
        }
    }
}

/// Per-day usage limiter.
#[derive(Clone)]
pub struct QuotaLimiter {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    daily_max: u32,
}

impl std::fmt::Debug for QuotaLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaLimiter")
            .field("daily_max", &self.daily_max)
            .finish()
    }
}

impl QuotaLimiter {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            daily_max: DAILY_MAX,
        }
    }

    /// In-memory limiter on the system clock.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock))
    }

    pub fn with_daily_max(mut self, daily_max: u32) -> Self {
        self.daily_max = daily_max;
        self
    }

    pub fn daily_max(&self) -> u32 {
        self.daily_max
    }

    /// Generations left today.
    pub fn remaining(&self) -> u32 {
        let state = self.normalized();
        self.daily_max.saturating_sub(state.count)
    }

    pub fn is_limit_reached(&self) -> bool {
        self.remaining() == 0
    }

    /// Generations used today.
    pub fn used(&self) -> u32 {
        self.normalized().count
    }

    /// Record one successful generation and return the new remaining count.
    pub fn increment(&self) -> u32 {
        let mut state = self.normalized();
        state.count = state.count.saturating_add(1);
        self.persist(&state);

        let remaining = self.daily_max.saturating_sub(state.count);
        tracing::debug!(used = state.count, remaining, "Quota usage recorded");
        remaining
    }

    /// Load the record and roll it over to today if needed.
    fn normalized(&self) -> QuotaState {
        let today = self.clock.today();

        let stored = match self.store.get(STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<QuotaState>(&raw) {
                Ok(state) => Some(state),
                Err(e) => {
                    tracing::warn!(error = %e, "Corrupt quota record, starting fresh");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Quota storage unreadable, starting fresh");
                None
            }
        };

        match stored {
            Some(state) if state.last_reset_date == today => state,
            Some(state) => {
                tracing::info!(
                    previous = %state.last_reset_date,
                    %today,
                    "New day, resetting quota"
                );
                let fresh = QuotaState::fresh(today);
                self.persist(&fresh);
                fresh
            }
            None => {
                let fresh = QuotaState::fresh(today);
                self.persist(&fresh);
                fresh
            }
        }
    }

    fn persist(&self, state: &QuotaState) {
        let raw = match serde_json::to_string(state) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode quota record");
                return;
            }
        };
        if let Err(e) = self.store.set(STORAGE_KEY, &raw) {
            tracing::warn!(error = %e, "Failed to persist quota record");
        }
    }
}
