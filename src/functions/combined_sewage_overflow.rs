// Copyright (c) 2025 - Cowboy AI, Inc.
//! Combined Sewage Overflow
//!
//! Rebuilds the overflow history of one overflow point from stopwatch
//! start/stop signals. Each signal addresses an [`Overflow`] interval by its
//! start time, so re-sent or out-of-order signals land on the same interval.
//!
//! # Interval lifecycle
//!
//! ```text
//!   first sighting of startTime        state=true             state=false + stopTime
//! ─────────────────────────────▶ closed? ──────────▶ open ────────────────────────▶ ended
//!   (state=false, duration=0)                                                      (immutable)
//! ```
//!
//! # Invariants after every successful merge
//!
//! - intervals are ordered by ascending start time
//! - `cumulative_time` is the sum of all interval durations, recomputed
//! - the record's `state` is the state of the interval with the latest start
//!
//! A rejected merge leaves the record exactly as it was.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::{FunctionError, FunctionResult};
use crate::events::{duration_nanos, FunctionUpdated, Stopwatch};
use crate::functions::{commit, load_or_else, resolve_tenant, FunctionContext, FunctionKind, Loaded};
use crate::messaging::TopicMessage;
use crate::registry::RegistryItem;
use crate::subjects::Topic;
use crate::things::Thing;

pub const RECORD_TYPE: &str = "CombinedSewageOverflow";
pub const CONTENT_TYPE: &str = "application/vnd.diwise.combinedsewageoverflow+json";

/// Merge rejections
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// The signal lacks a value the merge depends on
    #[error("invalid stopwatch signal: {0}")]
    InvalidSignal(&'static str),

    /// The addressed interval already has a stop time
    #[error("overflow starting at {0} already ended")]
    AlreadyEnded(DateTime<Utc>),
}

impl From<MergeError> for FunctionError {
    fn from(err: MergeError) -> Self {
        match err {
            MergeError::InvalidSignal(_) => FunctionError::InvalidInput(err.to_string()),
            MergeError::AlreadyEnded(_) => FunctionError::InvalidState(err.to_string()),
        }
    }
}

/// One contiguous overflow period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overflow {
    /// Derived from `start_time`, see [`overflow_id`]
    pub id: String,
    /// True while the overflow is ongoing
    pub state: bool,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub stop_time: Option<DateTime<Utc>>,
    #[serde(with = "duration_nanos")]
    pub duration: Duration,
}

impl Overflow {
    fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            id: overflow_id(start_time),
            state: false,
            start_time,
            stop_time: None,
            duration: Duration::zero(),
        }
    }

    pub fn is_ended(&self) -> bool {
        self.stop_time.is_some()
    }
}

/// Persisted state of one overflow point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedSewageOverflow {
    pub id: String,

    #[serde(rename = "type")]
    pub record_type: String,

    /// Sum of all interval durations
    #[serde(with = "duration_nanos")]
    pub cumulative_time: Duration,

    pub date_observed: DateTime<Utc>,

    #[serde(rename = "overflow", default)]
    pub overflows: Vec<Overflow>,

    pub state: bool,

    pub tenant: String,

    #[serde(
        rename = "combinedsewageoverflow",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub thing: Option<Thing>,
}

impl CombinedSewageOverflow {
    pub fn new(id: impl Into<String>, tenant: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            record_type: RECORD_TYPE.to_string(),
            cumulative_time: Duration::zero(),
            date_observed: now,
            overflows: Vec::new(),
            state: false,
            tenant: tenant.into(),
            thing: None,
        }
    }

    /// Interval with the latest start time
    pub fn latest(&self) -> Option<&Overflow> {
        self.overflows.last()
    }

    /// Merge one stopwatch signal; returns whether the record changed
    ///
    /// `now` stands in for the stop time of an interval that is still open
    /// when the signal carries no duration.
    pub fn merge_signal(
        &mut self,
        signal: &Stopwatch,
        now: DateTime<Utc>,
    ) -> Result<bool, MergeError> {
        let start_time = signal
            .start_time
            .ok_or(MergeError::InvalidSignal("start time is zero"))?;

        let id = overflow_id(start_time);
        let existing = self.overflows.iter().position(|o| o.id == id);

        // Validate before touching anything so a rejection has no side effect.
        if let Some(index) = existing {
            let overflow = &self.overflows[index];
            if overflow.is_ended() {
                return Err(MergeError::AlreadyEnded(overflow.start_time));
            }
            if overflow.state && !signal.state && signal.stop_time.is_none() {
                return Err(MergeError::InvalidSignal("stop signal without stop time"));
            }
        }

        let mut changed = false;

        let index = match existing {
            Some(index) => index,
            None => {
                self.overflows.push(Overflow::new(start_time));
                changed = true;
                self.overflows.len() - 1
            }
        };

        let overflow = &mut self.overflows[index];
        if overflow.state != signal.state {
            if signal.state {
                overflow.duration = signal
                    .duration
                    .unwrap_or_else(|| now - overflow.start_time);
                self.date_observed = overflow.start_time;
            } else if let Some(stop_time) = signal.stop_time {
                overflow.stop_time = Some(stop_time);
                overflow.duration = signal
                    .duration
                    .unwrap_or_else(|| stop_time - overflow.start_time);
                self.date_observed = stop_time;
            }

            overflow.state = signal.state;
            changed = true;
        }

        self.overflows.sort_by_key(|o| o.start_time);

        let cumulative_time = self
            .overflows
            .iter()
            .fold(Duration::zero(), |total, o| total + o.duration);
        if cumulative_time != self.cumulative_time {
            self.cumulative_time = cumulative_time;
            changed = true;
        }

        let latest_state = self.latest().map(|o| o.state).unwrap_or(false);
        if latest_state != self.state {
            self.state = latest_state;
            changed = true;
        }

        Ok(changed)
    }
}

impl TopicMessage for CombinedSewageOverflow {
    fn topic_name(&self) -> &str {
        Topic::CipFunctionUpdated.as_str()
    }

    fn content_type(&self) -> &str {
        CONTENT_TYPE
    }

    fn body(&self) -> FunctionResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Interval identity derived from the start time alone
///
/// SHA-256 of the decimal nanosecond timestamp, truncated to 128 bits and
/// rendered as a UUID. Identical start times map to the same id on every
/// node and across restarts.
pub fn overflow_id(start_time: DateTime<Utc>) -> String {
    let nanos = i128::from(start_time.timestamp()) * 1_000_000_000
        + i128::from(start_time.timestamp_subsec_nanos());

    let digest = Sha256::digest(nanos.to_string().as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);

    Uuid::from_bytes(bytes).to_string()
}

pub(crate) async fn handle(
    ctx: &FunctionContext,
    item: &RegistryItem,
    event: &FunctionUpdated,
    cancel: &CancellationToken,
) -> FunctionResult<()> {
    let kind = FunctionKind::CombinedSewageOverflow;

    if !event.is_stopwatch() {
        info!(
            function_id = %event.id,
            function_type = %event.function_type,
            subtype = ?event.subtype,
            "Ignoring event, not a stopwatch"
        );
        return Ok(());
    }

    let signal = event.stopwatch.clone().unwrap_or_default();
    let id = kind.asset_id(&event.id);
    let now = ctx.now();

    let Loaded { mut record, stored } = load_or_else(ctx.storage.as_ref(), &id, || {
        CombinedSewageOverflow::new(&id, resolve_tenant(item, event), now)
    })
    .await?;

    let changed = record.merge_signal(&signal, now)?;

    if record.thing.is_none() {
        record.thing = ctx.lookup_thing(&event.id).await;
    }

    if !kind.publish_policy().should_publish(changed) {
        debug!(asset_id = %id, "Overflow record unchanged");
        return Ok(());
    }

    commit(ctx, cancel, &id, &record, stored).await
}
