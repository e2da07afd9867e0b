// Copyright (c) 2025 - Cowboy AI, Inc.
//! Inbound Function Events
//!
//! Upstream services report state changes of registered functions as a JSON
//! envelope. The envelope always names the function (`id`) and its `type`;
//! the payload is either a `stopwatch` (timed on/off condition) or a SenML
//! `pack` of measurements.
//!
//! # Wire conventions
//!
//! The producer encodes unset timestamps as `0001-01-01T00:00:00Z` and
//! durations as integer nanoseconds. Both conventions are normalised here:
//! a zero timestamp becomes `None`, a duration becomes [`chrono::Duration`].
//!
//! ```text
//! {
//!   "id": "fn-cso-01",
//!   "type": "stopwatch",
//!   "timestamp": "2026-03-02T08:15:00Z",
//!   "stopwatch": {
//!     "startTime": "2026-03-02T08:00:00Z",
//!     "state": true,
//!     "count": 1
//!   }
//! }
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{FunctionError, FunctionResult};

pub mod senml;

pub use senml::{Pack, Record};

/// Envelope `type` carried by stopwatch events
pub const STOPWATCH_TYPE: &str = "stopwatch";

/// Function state change reported by an upstream service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionUpdated {
    /// Function identifier, matched against the registry
    pub id: String,

    /// Function type (`stopwatch`, `level`, ...)
    #[serde(rename = "type", default)]
    pub function_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,

    /// Owning organisation, when the producer knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,

    /// When the producer observed the change
    #[serde(
        default,
        with = "optional_time",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopwatch: Option<Stopwatch>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pack: Option<Pack>,
}

impl FunctionUpdated {
    /// Decode an envelope from a message body
    pub fn from_slice(body: &[u8]) -> FunctionResult<Self> {
        let event: FunctionUpdated = serde_json::from_slice(body)
            .map_err(|e| FunctionError::InvalidInput(format!("malformed envelope: {}", e)))?;

        if event.id.trim().is_empty() {
            return Err(FunctionError::InvalidInput(
                "envelope has an empty id".to_string(),
            ));
        }

        Ok(event)
    }

    /// Whether this envelope carries a stopwatch signal
    pub fn is_stopwatch(&self) -> bool {
        self.function_type.eq_ignore_ascii_case(STOPWATCH_TYPE)
    }

    /// Observation time, falling back to `now` when the producer omitted it
    pub fn observed_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.timestamp.unwrap_or(now)
    }
}

/// One signal from a stopwatch-style sensor or controller
///
/// Not persisted; handlers merge it into an asset record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stopwatch {
    #[serde(
        default,
        with = "optional_time",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_time: Option<DateTime<Utc>>,

    #[serde(
        default,
        with = "optional_time",
        skip_serializing_if = "Option::is_none"
    )]
    pub stop_time: Option<DateTime<Utc>>,

    /// Elapsed time as measured by the source, if it reports one
    #[serde(
        default,
        with = "optional_duration_nanos",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<Duration>,

    #[serde(default)]
    pub state: bool,

    #[serde(default)]
    pub count: i32,

    #[serde(
        default,
        with = "optional_duration_nanos",
        skip_serializing_if = "Option::is_none"
    )]
    pub cumulative_time: Option<Duration>,
}

/// Unix seconds of `0001-01-01T00:00:00Z`
const ZERO_TIME_UNIX: i64 = -62_135_596_800;

/// Whether `t` is the producer's "unset" timestamp
pub fn is_zero_time(t: &DateTime<Utc>) -> bool {
    t.timestamp() == ZERO_TIME_UNIX && t.timestamp_subsec_nanos() == 0
}

/// `Option<DateTime<Utc>>` where the zero timestamp reads as `None`
pub mod optional_time {
    use super::is_zero_time;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<DateTime<Utc>>::deserialize(deserializer)?;
        Ok(value.filter(|t| !is_zero_time(t)))
    }
}

/// Nanoseconds of `d`, saturating at the bound with the same sign
pub fn saturating_nanos(d: &Duration) -> i64 {
    d.num_nanoseconds().unwrap_or(if *d < Duration::zero() {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// [`chrono::Duration`] as integer nanoseconds
pub mod duration_nanos {
    use super::saturating_nanos;
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(saturating_nanos(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::nanoseconds(i64::deserialize(deserializer)?))
    }
}

/// `Option<chrono::Duration>` as integer nanoseconds
pub mod optional_duration_nanos {
    use super::saturating_nanos;
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_some(&saturating_nanos(d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<i64>::deserialize(deserializer)?.map(Duration::nanoseconds))
    }
}
