//! # Config - SiltKV engine configuration
//!
//! Centralized configuration with sensible defaults, a builder, and
//! environment overrides.
//!
//! ```text
//! {data_dir}/
//!   ├── commit-log.txt          (write-ahead log)
//!   ├── sstable-…-….data        (segment records)
//!   ├── sstable-…-….index       (key → byte offset)
//!   └── sstable-…-….filter      (base64 membership filter)
//! ```
//!
//! ## Environment variables
//!
//! | Variable                     | Field                   |
//! |-----------------------------|-------------------------|
//! | `SILT_DATA_DIR`              | `data_dir`              |
//! | `SILT_FLUSH_THRESHOLD`       | `flush_threshold`       |
//! | `SILT_COMPACTION_TRIGGER`    | `compaction_trigger`    |
//! | `SILT_COMPACTION_SIZE_LIMIT` | `compaction_size_limit` |
//! | `SILT_WAL_SYNC`              | `wal_sync` (`always` or N) |

use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_FLUSH_THRESHOLD: usize = 1024;
pub const DEFAULT_COMPACTION_TRIGGER: usize = 5;
pub const DEFAULT_COMPACTION_SIZE_LIMIT: usize = 4096;
pub const DEFAULT_FILTER_EXPECTED_ELEMENTS: usize = 4096;
pub const DEFAULT_FILTER_FALSE_POSITIVE_RATE: f64 = 0.01;
pub const DEFAULT_WAL_SYNC_EVERY: usize = 64;

/// How often the write-ahead log is fsynced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncPolicy {
    /// fsync after every append (safest, slowest)
    EveryWrite,

    /// fsync after every `count` appends
    EveryN { count: usize },
}

impl Default for WalSyncPolicy {
    fn default() -> Self {
        WalSyncPolicy::EveryN {
            count: DEFAULT_WAL_SYNC_EVERY,
        }
    }
}

impl WalSyncPolicy {
    /// Parses `always` (any case) or a positive integer.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("always") {
            return Some(WalSyncPolicy::EveryWrite);
        }
        match s.parse::<usize>() {
            Ok(0) | Err(_) => None,
            Ok(1) => Some(WalSyncPolicy::EveryWrite),
            Ok(count) => Some(WalSyncPolicy::EveryN { count }),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("filter false positive rate must be in (0, 1), got {0}")]
    FalsePositiveRate(f64),
}

/// Main configuration for an engine instance.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Root directory for the WAL and all segment files.
    pub data_dir: PathBuf,

    /// Memtable entry count; a flush happens once the memtable holds more.
    pub flush_threshold: usize,

    /// Segments created since the last compaction; compaction runs once the
    /// counter exceeds this.
    pub compaction_trigger: usize,

    /// Segments at or below this row count keep absorbing their newer
    /// neighbours during compaction.
    pub compaction_size_limit: usize,

    /// Smallest element count a segment filter is sized for.
    pub filter_expected_elements: usize,
    pub filter_false_positive_rate: f64,

    pub wal_sync: WalSyncPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            compaction_trigger: DEFAULT_COMPACTION_TRIGGER,
            compaction_size_limit: DEFAULT_COMPACTION_SIZE_LIMIT,
            filter_expected_elements: DEFAULT_FILTER_EXPECTED_ELEMENTS,
            filter_false_positive_rate: DEFAULT_FILTER_FALSE_POSITIVE_RATE,
            wal_sync: WalSyncPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Create a new config builder
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Defaults overridden by `SILT_*` environment variables. Missing or
    /// unparsable values fall back to the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("SILT_DATA_DIR").filter(|d| !d.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        config.flush_threshold =
            parse_or(&lookup, "SILT_FLUSH_THRESHOLD", config.flush_threshold);
        config.compaction_trigger =
            parse_or(&lookup, "SILT_COMPACTION_TRIGGER", config.compaction_trigger);
        config.compaction_size_limit =
            parse_or(&lookup, "SILT_COMPACTION_SIZE_LIMIT", config.compaction_size_limit);

        if let Some(raw) = lookup("SILT_WAL_SYNC") {
            match WalSyncPolicy::parse(&raw) {
                Some(policy) => config.wal_sync = policy,
                None => tracing::warn!("ignoring invalid SILT_WAL_SYNC={:?}", raw),
            }
        }

        config
    }

    /// Checks that every threshold is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let nonzero = [
            ("flush_threshold", self.flush_threshold),
            ("compaction_trigger", self.compaction_trigger),
            ("compaction_size_limit", self.compaction_size_limit),
            ("filter_expected_elements", self.filter_expected_elements),
        ];
        for (field, value) in nonzero {
            if value == 0 {
                return Err(ConfigError::Zero { field });
            }
        }
        if let WalSyncPolicy::EveryN { count: 0 } = self.wal_sync {
            return Err(ConfigError::Zero { field: "wal_sync.count" });
        }

        let p = self.filter_false_positive_rate;
        if !(p > 0.0 && p < 1.0) {
            return Err(ConfigError::FalsePositiveRate(p));
        }
        Ok(())
    }
}

fn parse_or<F>(lookup: &F, key: &str, default: usize) -> usize
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("ignoring invalid {}={:?}", key, raw);
            default
        }),
    }
}

/// Builder for [`EngineConfig`]
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the memtable entry count that triggers a flush
    pub fn flush_threshold(mut self, entries: usize) -> Self {
        self.config.flush_threshold = entries;
        self
    }

    /// Set how many new segments trigger a compaction
    pub fn compaction_trigger(mut self, segments: usize) -> Self {
        self.config.compaction_trigger = segments;
        self
    }

    /// Set the row bound for merged segments
    pub fn compaction_size_limit(mut self, rows: usize) -> Self {
        self.config.compaction_size_limit = rows;
        self
    }

    pub fn filter_expected_elements(mut self, n: usize) -> Self {
        self.config.filter_expected_elements = n;
        self
    }

    pub fn filter_false_positive_rate(mut self, p: f64) -> Self {
        self.config.filter_false_positive_rate = p;
        self
    }

    /// Set the WAL sync policy
    pub fn wal_sync(mut self, policy: WalSyncPolicy) -> Self {
        self.config.wal_sync = policy;
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}
