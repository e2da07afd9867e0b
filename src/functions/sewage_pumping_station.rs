// Copyright (c) 2025 - Cowboy AI, Inc.
//! Sewage Pumping Station
//!
//! Tracks whether a pump is running. Unlike overflow points no interval
//! history is kept, only the current state with the last known start and end
//! time. Every accepted signal is written and republished, whether or not the
//! state moved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::errors::{FunctionError, FunctionResult};
use crate::events::{optional_time, FunctionUpdated, Stopwatch};
use crate::functions::{commit, load_or_else, FunctionContext, FunctionKind, Loaded};
use crate::messaging::TopicMessage;
use crate::subjects::Topic;

pub const RECORD_TYPE: &str = "SewagePumpingStation";
pub const CONTENT_TYPE: &str = "application/vnd.diwise.sewagepumpingstation+json";

fn record_type() -> String {
    RECORD_TYPE.to_string()
}

/// Persisted state of one pumping station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SewagePumpingStation {
    pub id: String,

    #[serde(rename = "type", default = "record_type")]
    pub record_type: String,

    /// True while the pump is running
    pub state: bool,

    #[serde(default, with = "optional_time", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    #[serde(default, with = "optional_time", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    #[serde(default, with = "optional_time")]
    pub observed_at: Option<DateTime<Utc>>,
}

fn missing_start_time() -> FunctionError {
    FunctionError::InvalidInput("state is true, but stopwatch does not have a start time".into())
}

impl SewagePumpingStation {
    /// Build the first record for a pump from its first signal
    ///
    /// A running pump must report when it started; a stopped pump may not
    /// know, in which case the start time stays empty.
    pub fn from_signal(
        id: impl Into<String>,
        signal: &Stopwatch,
        observed_at: DateTime<Utc>,
    ) -> FunctionResult<Self> {
        if signal.state && signal.start_time.is_none() {
            return Err(missing_start_time());
        }

        Ok(Self {
            id: id.into(),
            record_type: record_type(),
            state: signal.state,
            start_time: signal.start_time,
            end_time: None,
            observed_at: Some(observed_at),
        })
    }

    /// Apply a signal to an existing record; returns whether the state moved
    pub fn apply_signal(
        &mut self,
        signal: &Stopwatch,
        observed_at: DateTime<Utc>,
    ) -> FunctionResult<bool> {
        let transition = self.state != signal.state;

        if transition {
            if signal.state {
                let start_time = signal.start_time.ok_or_else(missing_start_time)?;
                self.start_time = Some(start_time);
            } else if self.end_time.is_some() {
                // The end time is only ever replaced, never set for the first time.
                if let Some(stop_time) = signal.stop_time {
                    self.end_time = Some(stop_time);
                }
            }
            self.state = signal.state;
        }

        self.observed_at = Some(observed_at);
        Ok(transition)
    }
}

impl TopicMessage for SewagePumpingStation {
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

pub(crate) async fn handle(
    ctx: &FunctionContext,
    event: &FunctionUpdated,
    cancel: &CancellationToken,
) -> FunctionResult<()> {
    let kind = FunctionKind::SewagePumpingStation;

    if !event.is_stopwatch() {
        info!(
            function_id = %event.id,
            function_type = %event.function_type,
            subtype = ?event.subtype,
            "Invalid function type, ignoring event"
        );
        return Ok(());
    }

    let signal = event.stopwatch.clone().unwrap_or_default();
    let id = kind.asset_id(&event.id);
    let observed_at = event.observed_at(ctx.now());

    if signal.start_time.is_none() && !signal.state {
        info!(asset_id = %id, "State is false and start time is empty");
    }

    let Loaded { record, stored } =
        load_or_else::<Option<SewagePumpingStation>, _>(ctx.storage.as_ref(), &id, || None).await?;

    let (record, changed) = match record {
        Some(mut record) => {
            let changed = record.apply_signal(&signal, observed_at).inspect_err(|e| {
                warn!(asset_id = %id, error = %e, "Rejected stopwatch signal");
            })?;
            (record, changed)
        }
        None => {
            let record = SewagePumpingStation::from_signal(&id, &signal, observed_at)
                .inspect_err(|e| warn!(asset_id = %id, error = %e, "Rejected stopwatch signal"))?;
            (record, true)
        }
    };

    if kind.publish_policy().should_publish(changed) {
        commit(ctx, cancel, &id, &record, stored).await?;
    }

    Ok(())
}
