// Copyright (c) 2025 - Cowboy AI, Inc.
//! Sewer distance tracker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::FunctionResult;
use crate::events::{optional_time, FunctionUpdated, Pack};
use crate::functions::{commit, load_or_else, resolve_tenant, FunctionContext, FunctionKind, Loaded};
use crate::messaging::TopicMessage;
use crate::registry::RegistryItem;
use crate::subjects::Topic;
use crate::things::Thing;

pub const RECORD_TYPE: &str = "Sewer";
pub const CONTENT_TYPE: &str = "application/vnd.diwise.sewer+json";

/// SenML channel carrying the measured distance
pub const DISTANCE: &str = "5700";

/// Readings closer than this are treated as the same distance
pub const DISTANCE_TOLERANCE: f64 = 1e-4;

fn record_type() -> String {
    RECORD_TYPE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sewer {
    pub id: String,

    #[serde(rename = "type", default = "record_type")]
    pub record_type: String,

    #[serde(default)]
    pub distance: f64,

    #[serde(default, with = "optional_time")]
    pub date_observed: Option<DateTime<Utc>>,

    #[serde(default)]
    pub tenant: String,

    #[serde(rename = "sewer", default, skip_serializing_if = "Option::is_none")]
    pub thing: Option<Thing>,
}

fn same_distance(a: f64, b: f64) -> bool {
    (a - b).abs() <= DISTANCE_TOLERANCE
}

impl Sewer {
    pub fn new(id: impl Into<String>, tenant: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            record_type: record_type(),
            distance: 0.0,
            date_observed: None,
            tenant: tenant.into(),
            thing: None,
        }
    }

    /// Merge the distance channel of `pack`; returns whether the record changed
    pub fn merge_pack(&mut self, pack: &Pack, now: DateTime<Utc>) -> bool {
        let mut changed = false;

        if let Some(reading) = pack.find_by_name(DISTANCE) {
            if let Some(distance) = reading.value() {
                if !same_distance(self.distance, distance) {
                    self.distance = distance;
                    changed = true;
                }
            }

            if let Some(observed) = reading.time() {
                if self.date_observed.map_or(true, |previous| observed > previous) {
                    self.date_observed = Some(observed);
                    changed = true;
                }
            }
        }

        if self.date_observed.is_none() {
            self.date_observed = Some(now);
            changed = true;
        }

        changed
    }
}

impl TopicMessage for Sewer {
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
    item: &RegistryItem,
    event: &FunctionUpdated,
    cancel: &CancellationToken,
) -> FunctionResult<()> {
    let kind = FunctionKind::Sewer;

    let Some(pack) = event.pack.as_ref() else {
        debug!(function_id = %event.id, "No measurement pack, nothing to merge");
        return Ok(());
    };

    let id = kind.asset_id(&event.id);
    let Loaded { mut record, stored } = load_or_else(ctx.storage.as_ref(), &id, || {
        Sewer::new(&id, resolve_tenant(item, event))
    })
    .await?;

    let changed = record.merge_pack(pack, ctx.now());

    if record.thing.is_none() {
        record.thing = ctx.lookup_thing(&event.id).await;
    }

    debug!(asset_id = %id, changed, distance = record.distance, "Merged distance");

    if kind.publish_policy().should_publish(changed) {
        commit(ctx, cancel, &id, &record, stored).await?;
    }

    Ok(())
}
