//! Persistent single-slot cache for aggregated weather results.
//!
//! One record exists at a time. A record is served only while it is younger
//! than the TTL and was stored for exactly the requested coordinate. Records
//! that cannot be decoded are removed and treated as a miss.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{AggregatedResult, Coordinate, WeatherError, WeatherReading};

/// Default record lifetime: one hour.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Lookup/store capability over an abstract key.
///
/// The single-slot cache below is one implementation; a multi-entry store
/// keyed by coordinate can replace it without touching callers.
pub trait ResultCache<K, V>: Send + Sync {
    /// Returns the stored value if it is still valid for `key`.
    fn lookup(&self, key: &K) -> Option<V>;

    /// Replaces whatever is stored with `value` for `key`.
    fn store(&self, key: &K, value: &V) -> Result<(), WeatherError>;
}

/// Source of "now" in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(now_millis),
        }
    }

    pub fn set(&self, now_millis: i64) {
        self.now.store(now_millis, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let by = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.now.fetch_add(by, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Storage holding at most one serialized record.
pub trait BlobStore: Send + Sync {
    fn read(&self) -> io::Result<Option<String>>;
    fn write(&self, contents: &str) -> io::Result<()>;
    fn remove(&self) -> io::Result<()>;
}

/// Record kept in a JSON file.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    path: PathBuf,
}

impl FileBlobStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BlobStore for FileBlobStore {
    fn read(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, contents: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write-then-rename so a reader never sees a half-written record
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)
    }

    fn remove(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// Record kept in memory.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    slot: Mutex<Option<String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-filled slot, e.g. with a record written by an older build
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(contents.into())),
        }
    }
}

impl BlobStore for MemoryBlobStore {
    fn read(&self) -> io::Result<Option<String>> {
        Ok(self.slot.lock().clone())
    }

    fn write(&self, contents: &str) -> io::Result<()> {
        *self.slot.lock() = Some(contents.to_string());
        Ok(())
    }

    fn remove(&self) -> io::Result<()> {
        *self.slot.lock() = None;
        Ok(())
    }
}

/// Persisted form of one cached round.
///
/// `{timestamp, coordinate, weather, locationName, allAgentWeather}`. There is
/// no version field; a record that no longer decodes is discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord {
    pub timestamp: i64,
    pub coordinate: Coordinate,
    pub weather: Option<WeatherReading>,
    pub location_name: String,
    pub all_agent_weather: Option<Value>,
}

impl CacheRecord {
    pub fn new(timestamp: i64, coordinate: Coordinate, result: &AggregatedResult) -> Self {
        Self {
            timestamp,
            coordinate,
            weather: result.weather.clone(),
            location_name: result.location_name.clone(),
            all_agent_weather: result.all_agent_weather.clone(),
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    pub fn into_result(self) -> AggregatedResult {
        AggregatedResult {
            weather: self.weather,
            location_name: self.location_name,
            all_agent_weather: self.all_agent_weather,
        }
    }

    fn age_millis(&self, now: i64) -> i64 {
        now.saturating_sub(self.timestamp)
    }
}

/// Why a lookup did not produce a value; only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MissReason {
    Empty,
    Corrupt,
    Expired,
    OtherCoordinate,
    NoPrimary,
}

/// Single-slot, TTL-bounded cache of the last aggregation round.
pub struct AggregationCache<B: BlobStore = FileBlobStore> {
    blob: B,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    // Serializes read-validate-purge against store so no one sees a torn slot
    slot_lock: Mutex<()>,
}

impl AggregationCache<FileBlobStore> {
    /// File-backed cache at `path` with the system clock
    pub fn at_path(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self::new(FileBlobStore::new(path), Arc::new(SystemClock), ttl)
    }
}

impl<B: BlobStore> AggregationCache<B> {
    pub fn new(blob: B, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            blob,
            clock,
            ttl,
            slot_lock: Mutex::new(()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn ttl_millis(&self) -> i64 {
        i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX)
    }

    fn purge(&self, why: &str) {
        if let Err(e) = self.blob.remove() {
            tracing::warn!("Failed to remove {} weather cache: {}", why, e);
        }
    }

    fn check(&self, coordinate: &Coordinate) -> Result<AggregatedResult, MissReason> {
        let contents = match self.blob.read() {
            Ok(Some(contents)) => contents,
            Ok(None) => return Err(MissReason::Empty),
            Err(e) => {
                tracing::warn!("Failed to read weather cache: {}", e);
                return Err(MissReason::Empty);
            }
        };

        let record = match CacheRecord::decode(&contents) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Failed to parse cached weather data: {}", e);
                self.purge("corrupt");
                return Err(MissReason::Corrupt);
            }
        };

        if record.age_millis(self.clock.now_millis()) >= self.ttl_millis() {
            self.purge("expired");
            return Err(MissReason::Expired);
        }

        if record.coordinate != *coordinate {
            return Err(MissReason::OtherCoordinate);
        }

        if record.weather.is_none() {
            return Err(MissReason::NoPrimary);
        }

        Ok(record.into_result())
    }
}

impl<B: BlobStore> ResultCache<Coordinate, AggregatedResult> for AggregationCache<B> {
    fn lookup(&self, coordinate: &Coordinate) -> Option<AggregatedResult> {
        let _guard = self.slot_lock.lock();

        match self.check(coordinate) {
            Ok(result) => {
                tracing::info!("Using cached weather data for {}", coordinate);
                Some(result)
            }
            Err(reason) => {
                tracing::debug!("Weather cache miss for {}: {:?}", coordinate, reason);
                None
            }
        }
    }

    fn store(&self, coordinate: &Coordinate, result: &AggregatedResult) -> Result<(), WeatherError> {
        let record = CacheRecord::new(self.clock.now_millis(), *coordinate, result);
        let contents = record
            .encode()
            .map_err(|e| WeatherError::Cache(e.to_string()))?;

        let _guard = self.slot_lock.lock();
        self.blob.write(&contents)?;
        tracing::debug!("Stored weather cache for {}", coordinate);
        Ok(())
    }
}
