//! Bulk pipeline settings.
//!
//! Settings can be built in code with the `with_*` setters, read from a
//! string key/value map (for instance one loaded from an application
//! config file) or taken from `BULKWIRE_*` environment variables.
//!
//! | key | env | default |
//! |---|---|---|
//! | `bulk.path` | `BULKWIRE_PATH` | `/_bulk` |
//! | `bulk.write.status.ignore` | `BULKWIRE_WRITE_STATUS_IGNORE` | empty |
//! | `bulk.write.retry.count` | `BULKWIRE_WRITE_RETRY_COUNT` | `3` |
//! | `bulk.write.retry.wait` | `BULKWIRE_WRITE_RETRY_WAIT` | `500ms` |
//! | `bulk.write.retry.max_wait` | `BULKWIRE_WRITE_RETRY_MAX_WAIT` | `10s` |
//! | `bulk.write.retry.statuses` | `BULKWIRE_WRITE_RETRY_STATUSES` | `429` |
//! | `bulk.size.entries` | `BULKWIRE_SIZE_ENTRIES` | `1000` |
//! | `bulk.size.bytes` | `BULKWIRE_SIZE_BYTES` | `1mb` |

use crate::{
    error::SettingsError,
    policy::{IgnorePolicy, StatusPolicy, parse_status_list},
    retry::{BackoffStrategy, RetryPolicy},
};
use std::time::Duration;

/// Endpoint path of bulk requests.
pub const BULK_PATH: &str = "bulk.path";
/// Comma-separated item statuses that never abort a batch.
pub const STATUS_IGNORE: &str = "bulk.write.status.ignore";
/// Number of resends after the first attempt.
pub const RETRY_COUNT: &str = "bulk.write.retry.count";
/// Delay before the first resend.
pub const RETRY_WAIT: &str = "bulk.write.retry.wait";
/// Upper bound of the backoff delay.
pub const RETRY_MAX_WAIT: &str = "bulk.write.retry.max_wait";
/// Comma-separated item statuses treated as transient.
pub const RETRY_STATUSES: &str = "bulk.write.retry.statuses";
/// Operations per batch before the writer flushes.
pub const SIZE_ENTRIES: &str = "bulk.size.entries";
/// Bytes per batch before the writer flushes.
pub const SIZE_BYTES: &str = "bulk.size.bytes";

const KEYS: &[&str] = &[
    BULK_PATH,
    STATUS_IGNORE,
    RETRY_COUNT,
    RETRY_WAIT,
    RETRY_MAX_WAIT,
    RETRY_STATUSES,
    SIZE_ENTRIES,
    SIZE_BYTES,
];

const ENV_PREFIX: &str = "BULKWIRE_";

/// Configuration consumed by the bulk pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkSettings {
    /// Path bulk requests are sent to.
    pub bulk_path: String,
    /// Tolerated item statuses.
    pub status_ignore: IgnorePolicy,
    /// Retry ceiling, backoff and transient statuses.
    pub retry: RetryPolicy,
    /// Writer flush threshold in operations; 0 disables it.
    pub batch_size_entries: usize,
    /// Writer flush threshold in bytes; 0 disables it.
    pub batch_size_bytes: usize,
}

impl Default for BulkSettings {
    fn default() -> Self {
        Self {
            bulk_path: "/_bulk".to_string(),
            status_ignore: IgnorePolicy::none(),
            retry: RetryPolicy::default(),
            batch_size_entries: 1000,
            batch_size_bytes: 1024 * 1024,
        }
    }
}

impl BulkSettings {
    /// Default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Send bulk requests to `path`, e.g. `/my-index/_bulk`.
    pub fn with_bulk_path(mut self, path: impl Into<String>) -> Self {
        self.bulk_path = path.into();
        self
    }

    /// Tolerate the given item statuses.
    pub fn with_status_ignore(mut self, ignore: IgnorePolicy) -> Self {
        self.status_ignore = ignore;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the writer flush thresholds.
    pub fn with_batch_size(mut self, entries: usize, bytes: usize) -> Self {
        self.batch_size_entries = entries;
        self.batch_size_bytes = bytes;
        self
    }

    /// Classification table derived from these settings.
    pub fn status_policy(&self) -> StatusPolicy {
        StatusPolicy::new(
            self.status_ignore.clone(),
            self.retry.retry_statuses.iter().copied(),
        )
    }

    /// Build settings from string properties. Unknown keys are skipped.
    pub fn from_properties<I, K, V>(properties: I) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut settings = Self::default();
        let mut wait = None;
        let mut max_wait = None;

        for (key, value) in properties {
            let (key, value) = (key.as_ref(), value.as_ref().trim());
            match key {
                BULK_PATH => {
                    if value.is_empty() {
                        return Err(SettingsError::invalid(key, value, "path is empty"));
                    }
                    settings.bulk_path = value.to_string();
                }
                STATUS_IGNORE => {
                    settings.status_ignore = IgnorePolicy::new(parse_status_list(key, value)?);
                }
                RETRY_COUNT => settings.retry.max_retries = parse_number(key, value)?,
                RETRY_WAIT => wait = Some(parse_duration(key, value)?),
                RETRY_MAX_WAIT => max_wait = Some(parse_duration(key, value)?),
                RETRY_STATUSES => settings.retry.retry_statuses = parse_status_list(key, value)?,
                SIZE_ENTRIES => settings.batch_size_entries = parse_number(key, value)?,
                SIZE_BYTES => settings.batch_size_bytes = parse_bytes(key, value)?,
                _ => {}
            }
        }

        if wait.is_some() || max_wait.is_some() {
            let (initial, max, multiplier) = match settings.retry.backoff {
                BackoffStrategy::Exponential { initial, max, multiplier } => (initial, max, multiplier),
                _ => (Duration::from_millis(500), Duration::from_secs(10), 2.0),
            };
            let initial = wait.unwrap_or(initial);
            settings.retry.backoff = BackoffStrategy::Exponential {
                initial,
                max: max_wait.unwrap_or(max).max(initial),
                multiplier,
            };
        }

        Ok(settings)
    }

    /// Build settings from `BULKWIRE_*` environment variables, loading a
    /// `.env` file first when one exists.
    pub fn from_env() -> Result<Self, SettingsError> {
        dotenvy::dotenv().ok();
        Self::from_env_vars(std::env::vars())
    }

    /// Build settings from an environment snapshot.
    pub fn from_env_vars<I>(vars: I) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let properties: Vec<(&'static str, String)> = vars
            .into_iter()
            .filter_map(|(name, value)| {
                KEYS.iter()
                    .find(|key| env_name(key) == name)
                    .map(|key| (*key, value))
            })
            .collect();

        Self::from_properties(properties)
    }
}

fn env_name(key: &str) -> String {
    let key = key.strip_prefix("bulk.").unwrap_or(key);
    format!("{}{}", ENV_PREFIX, key.replace('.', "_").to_uppercase())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, SettingsError> {
    value
        .parse()
        .map_err(|_| SettingsError::invalid(key, value, "expected a non-negative integer"))
}

/// Parse `250ms`, `10s`, `2m` or a bare number of milliseconds.
fn parse_duration(key: &str, value: &str) -> Result<Duration, SettingsError> {
    let lower = value.to_ascii_lowercase();
    let (digits, unit) = split_unit(&lower);
    let amount: u64 = parse_number(key, digits)?;

    match unit {
        "" | "ms" => Ok(Duration::from_millis(amount)),
        "s" => Ok(Duration::from_secs(amount)),
        "m" => Ok(Duration::from_secs(amount.saturating_mul(60))),
        _ => Err(SettingsError::invalid(key, value, "unknown time unit")),
    }
}

/// Parse `512b`, `64kb`, `1mb` or a bare number of bytes.
fn parse_bytes(key: &str, value: &str) -> Result<usize, SettingsError> {
    let lower = value.to_ascii_lowercase();
    let (digits, unit) = split_unit(&lower);
    let amount: usize = parse_number(key, digits)?;

    let factor = match unit {
        "" | "b" => 1,
        "kb" | "k" => 1024,
        "mb" | "m" => 1024 * 1024,
        _ => return Err(SettingsError::invalid(key, value, "unknown size unit")),
    };
    Ok(amount.saturating_mul(factor))
}

fn split_unit(value: &str) -> (&str, &str) {
    let at = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(at);
    (digits, unit.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let settings = BulkSettings::default();
        assert_eq!(settings.bulk_path, "/_bulk");
        assert!(settings.status_ignore.is_empty());
        assert_eq!(settings.retry.max_retries, 3);
        assert_eq!(settings.batch_size_entries, 1000);
        assert_eq!(settings.batch_size_bytes, 1024 * 1024);
    }

    #[test]
    fn test_from_properties() {
        let mut props = HashMap::new();
        props.insert(STATUS_IGNORE, "404,503");
        props.insert(RETRY_COUNT, "5");
        props.insert(RETRY_WAIT, "2s");
        props.insert(RETRY_MAX_WAIT, "1m");
        props.insert(RETRY_STATUSES, "429, 503");
        props.insert(SIZE_ENTRIES, "250");
        props.insert(SIZE_BYTES, "5mb");
        props.insert(BULK_PATH, "/logs/_bulk");
        props.insert("unrelated.key", "whatever");

        let settings = BulkSettings::from_properties(props).unwrap();

        assert_eq!(settings.bulk_path, "/logs/_bulk");
        assert_eq!(settings.status_ignore, IgnorePolicy::new([404, 503]));
        assert_eq!(settings.retry.max_retries, 5);
        assert_eq!(settings.retry.retry_statuses, vec![429, 503]);
        assert_eq!(
            settings.retry.backoff,
            BackoffStrategy::Exponential {
                initial: Duration::from_secs(2),
                max: Duration::from_secs(60),
                multiplier: 2.0,
            }
        );
        assert_eq!(settings.batch_size_entries, 250);
        assert_eq!(settings.batch_size_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_status_policy_from_settings() {
        let settings = BulkSettings::from_properties([(STATUS_IGNORE, "404")]).unwrap();
        let policy = settings.status_policy();
        assert_eq!(policy.classify(404), crate::Classification::Ignore);
        assert_eq!(policy.classify(429), crate::Classification::Retry);
    }

    #[test]
    fn test_invalid_values() {
        let cases = [
            (STATUS_IGNORE, "404;503"),
            (RETRY_COUNT, "-1"),
            (RETRY_WAIT, "10h"),
            (SIZE_BYTES, "1gb"),
            (SIZE_ENTRIES, "many"),
            (BULK_PATH, "  "),
        ];

        for (key, value) in cases {
            let err = BulkSettings::from_properties([(key, value)]).unwrap_err();
            let SettingsError::Invalid { key: reported, .. } = err;
            assert_eq!(reported, key);
        }
    }

    #[test]
    fn test_durations_and_sizes() {
        assert_eq!(parse_duration("k", "250").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("k", "250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("k", "3S").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("k", "2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_bytes("k", "512").unwrap(), 512);
        assert_eq!(parse_bytes("k", "64kb").unwrap(), 64 * 1024);
        assert!(parse_bytes("k", "kb").is_err());
    }

    #[test]
    fn test_from_env_vars() {
        let vars = vec![
            ("BULKWIRE_WRITE_STATUS_IGNORE".to_string(), "409".to_string()),
            ("BULKWIRE_SIZE_ENTRIES".to_string(), "10".to_string()),
            ("BULKWIRE_PATH".to_string(), "/x/_bulk".to_string()),
            ("HOME".to_string(), "/root".to_string()),
        ];

        let settings = BulkSettings::from_env_vars(vars).unwrap();
        assert!(settings.status_ignore.contains(409));
        assert_eq!(settings.batch_size_entries, 10);
        assert_eq!(settings.bulk_path, "/x/_bulk");
    }

    #[test]
    fn test_env_names() {
        assert_eq!(env_name(STATUS_IGNORE), "BULKWIRE_WRITE_STATUS_IGNORE");
        assert_eq!(env_name(RETRY_MAX_WAIT), "BULKWIRE_WRITE_RETRY_MAX_WAIT");
        assert_eq!(env_name(BULK_PATH), "BULKWIRE_PATH");
    }
}
