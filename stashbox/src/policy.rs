use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// TTL used when neither the status code nor its category has an entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Category key for 2xx responses.
pub const SUCCESS: u16 = 200;
/// Category key for 4xx responses.
pub const CLIENT_ERROR: u16 = 400;
/// Category key for 5xx responses.
pub const SERVER_ERROR: u16 = 500;

/// Maps response status codes to the time they stay cached.
///
/// Lookup order for a status code:
///
/// 1. the exact code, used verbatim (zero means "do not cache");
/// 2. the category entry (`200` for 2xx, `400` for 4xx, `500` for 5xx);
/// 3. [`DEFAULT_TTL`].
///
/// 1xx and 3xx codes have no category and go straight to the default.
///
/// ```
/// use std::time::Duration;
/// use stashbox::ExpirationTable;
///
/// let table = ExpirationTable::simple(
///     Duration::from_secs(60),
///     Duration::from_secs(10),
///     Duration::ZERO,
/// )
/// .with_status(404, Duration::from_secs(300));
///
/// assert_eq!(table.ttl(201), Duration::from_secs(60));
/// assert_eq!(table.ttl(404), Duration::from_secs(300));
/// assert_eq!(table.ttl(418), Duration::from_secs(10));
/// assert!(table.ttl(503).is_zero());
/// ```
///
/// Tables deserialize from a map of status codes to humantime durations,
/// e.g. `{"200": "5m", "404": "30s", "500": "0s"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTable", into = "RawTable")]
pub struct ExpirationTable {
    entries: BTreeMap<u16, Duration>,
}

impl ExpirationTable {
    /// Empty table: every status uses [`DEFAULT_TTL`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the three category entries set.
    pub fn simple(success: Duration, client_error: Duration, server_error: Duration) -> Self {
        Self::new()
            .with_status(SUCCESS, success)
            .with_status(CLIENT_ERROR, client_error)
            .with_status(SERVER_ERROR, server_error)
    }

    /// Adds or replaces the entry for `status`.
    pub fn with_status(mut self, status: u16, ttl: Duration) -> Self {
        self.insert(status, ttl);
        self
    }

    /// Adds or replaces the entry for `status`, returning the previous TTL.
    pub fn insert(&mut self, status: u16, ttl: Duration) -> Option<Duration> {
        self.entries.insert(status, ttl)
    }

    /// Explicit entry for `status`, without category or default fallback.
    pub fn get(&self, status: u16) -> Option<Duration> {
        self.entries.get(&status).copied()
    }

    /// TTL for a response with the given status code.
    pub fn ttl(&self, status: u16) -> Duration {
        if let Some(ttl) = self.get(status) {
            return ttl;
        }
        let category = match status / 100 {
            2 => Some(SUCCESS),
            4 => Some(CLIENT_ERROR),
            5 => Some(SERVER_ERROR),
            _ => None,
        };
        category
            .and_then(|code| self.get(code))
            .unwrap_or(DEFAULT_TTL)
    }

    /// Iterates explicit entries in status code order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, Duration)> + '_ {
        self.entries.iter().map(|(code, ttl)| (*code, *ttl))
    }

    /// Checks that every key is a three-digit status code.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.entries.keys().find(|code| !(100..=999).contains(*code)) {
            Some(code) => Err(ConfigError::InvalidStatusCode(*code)),
            None => Ok(()),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(transparent)]
struct RawTable(BTreeMap<u16, humantime_serde::Serde<Duration>>);

impl TryFrom<RawTable> for ExpirationTable {
    type Error = ConfigError;

    fn try_from(raw: RawTable) -> Result<Self, Self::Error> {
        let table = ExpirationTable {
            entries: raw
                .0
                .into_iter()
                .map(|(code, ttl)| (code, ttl.into_inner()))
                .collect(),
        };
        table.validate()?;
        Ok(table)
    }
}

impl From<ExpirationTable> for RawTable {
    fn from(table: ExpirationTable) -> Self {
        RawTable(
            table
                .entries
                .into_iter()
                .map(|(code, ttl)| (code, ttl.into()))
                .collect(),
        )
    }
}
