use crate::payload::{ALPHABET, DEFAULT_POOL_SIZE};
use crate::wire::{self, DelimiterError};
use std::time::Duration;

pub const DEFAULT_BROKERS: &str = "127.0.0.1:9092";
pub const DEFAULT_KEY_SIZE: usize = 36;
pub const DEFAULT_VALUE_SIZE: usize = 300;
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(2);

/// Bound used when no record count is given.
pub const UNBOUNDED_RECORDS: u64 = u64::MAX;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("topic not specified")]
    MissingTopic,
    #[error("at least one producer is required")]
    NoProducers,
    #[error("report interval must be greater than zero")]
    ZeroInterval,
    #[error("{what} size {size} must be smaller than the random pool ({pool} bytes)")]
    ViewTooLarge {
        what: &'static str,
        size: usize,
        pool: usize,
    },
    #[error(transparent)]
    DelimiterInAlphabet(#[from] DelimiterError),
}

/// What each producer needs to know. Shared read-only between workers.
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    pub topic: String,
    pub brokers: String,
    /// Records per producer; `<= 0` means unbounded.
    pub records: i64,
    pub key_size: usize,
    pub value_size: usize,
    /// Per-producer pacing in records/s, `None` for full speed.
    pub rate: Option<f64>,
}

impl ProducerConfig {
    /// Number of records one producer writes before closing its stream.
    pub fn record_limit(&self) -> u64 {
        if self.records <= 0 {
            UNBOUNDED_RECORDS
        } else {
            self.records as u64
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.records <= 0
    }

    /// Bytes counted towards throughput for each record.
    pub fn record_bytes(&self) -> u64 {
        (self.key_size + self.value_size) as u64
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            topic: String::new(),
            brokers: DEFAULT_BROKERS.to_string(),
            records: 0,
            key_size: DEFAULT_KEY_SIZE,
            value_size: DEFAULT_VALUE_SIZE,
            rate: None,
        }
    }
}

/// Everything one run needs besides the sink.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub producer: ProducerConfig,
    pub producers: usize,
    pub pool_size: usize,
    pub seed: Option<u64>,
    pub report_interval: Duration,
    pub smoothing: Option<Duration>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            producer: ProducerConfig::default(),
            producers: 1,
            pool_size: DEFAULT_POOL_SIZE,
            seed: None,
            report_interval: DEFAULT_REPORT_INTERVAL,
            smoothing: None,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.producer.topic.is_empty() {
            return Err(ConfigError::MissingTopic);
        }
        if self.producers == 0 {
            return Err(ConfigError::NoProducers);
        }
        if self.report_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        for (what, size) in [
            ("key", self.producer.key_size),
            ("value", self.producer.value_size),
        ] {
            if size >= self.pool_size {
                return Err(ConfigError::ViewTooLarge {
                    what,
                    size,
                    pool: self.pool_size,
                });
            }
        }
        wire::check_alphabet(ALPHABET)?;
        Ok(())
    }
}
