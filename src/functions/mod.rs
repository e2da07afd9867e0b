// Copyright (c) 2025 - Cowboy AI, Inc.
//! Asset State Handlers
//!
//! One handler per asset kind. Every handler follows the same shape:
//!
//! ```text
//! FunctionUpdated → load record (or build a fresh one) → merge → gate → persist → publish
//! ```
//!
//! The merge step is pure and lives on the record type; I/O happens only in
//! [`load_or_else`] and [`commit`].
//!
//! # Publication policies
//!
//! Handlers do not share a single "changed" rule:
//!
//! - [`PublishPolicy::OnChange`]: combined sewage overflow and sewer records are
//!   written and republished only when the merge reports a change
//! - [`PublishPolicy::EverySignal`]: pumping station records are written and
//!   republished for every accepted stopwatch signal, even a repeated one
//!
//! # Cancellation
//!
//! [`commit`] checks the cancellation token before the first write. A cancelled
//! merge leaves storage and the topic untouched.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::errors::{FunctionError, FunctionResult};
use crate::events::FunctionUpdated;
use crate::messaging::{MessagePublisher, TopicMessage};
use crate::registry::RegistryItem;
use crate::storage::{self, Storage};
use crate::things::{Thing, ThingsClient};

pub mod combined_sewage_overflow;
pub mod sewage_pumping_station;
pub mod sewer;

pub use combined_sewage_overflow::{CombinedSewageOverflow, MergeError, Overflow};
pub use sewage_pumping_station::SewagePumpingStation;
pub use sewer::Sewer;

/// Tenant used when neither the event nor the registry names one
pub const DEFAULT_TENANT: &str = "default";

/// Asset kinds a registry entry can select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    /// Overflow point with interval history
    CombinedSewageOverflow,
    /// Pump with on/off state only
    SewagePumpingStation,
    /// Level sensor reporting distance to the surface
    Sewer,
}

impl FunctionKind {
    /// Registry name and asset id prefix
    pub const fn as_str(&self) -> &'static str {
        match self {
            FunctionKind::CombinedSewageOverflow => "combinedsewageoverflow",
            FunctionKind::SewagePumpingStation => "sewagepumpingstation",
            FunctionKind::Sewer => "sewer",
        }
    }

    /// Stable storage id for the asset behind `source_id`
    pub fn asset_id(&self, source_id: &str) -> String {
        format!("{}:{}", self.as_str(), source_id)
    }

    pub const fn publish_policy(&self) -> PublishPolicy {
        match self {
            FunctionKind::CombinedSewageOverflow | FunctionKind::Sewer => PublishPolicy::OnChange,
            FunctionKind::SewagePumpingStation => PublishPolicy::EverySignal,
        }
    }

    /// Merge `event` into the asset this kind tracks
    pub async fn handle(
        &self,
        ctx: &FunctionContext,
        item: &RegistryItem,
        event: &FunctionUpdated,
        cancel: &CancellationToken,
    ) -> FunctionResult<()> {
        match self {
            FunctionKind::CombinedSewageOverflow => {
                combined_sewage_overflow::handle(ctx, item, event, cancel).await
            }
            FunctionKind::SewagePumpingStation => {
                sewage_pumping_station::handle(ctx, event, cancel).await
            }
            FunctionKind::Sewer => sewer::handle(ctx, item, event, cancel).await,
        }
    }
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FunctionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "combinedsewageoverflow" => Ok(FunctionKind::CombinedSewageOverflow),
            "sewagepumpingstation" => Ok(FunctionKind::SewagePumpingStation),
            "sewer" => Ok(FunctionKind::Sewer),
            other => Err(format!("unknown function kind: {}", other)),
        }
    }
}

/// Decides whether a merge result is written and republished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishPolicy {
    /// Only when the merge changed the record
    OnChange,
    /// For every accepted signal
    EverySignal,
}

impl PublishPolicy {
    pub const fn should_publish(&self, changed: bool) -> bool {
        match self {
            PublishPolicy::OnChange => changed,
            PublishPolicy::EverySignal => true,
        }
    }
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Collaborators shared by all handlers
#[derive(Clone)]
pub struct FunctionContext {
    pub storage: Arc<dyn Storage>,
    pub publisher: Arc<dyn MessagePublisher>,
    pub things: Arc<dyn ThingsClient>,
    clock: Clock,
}

impl FunctionContext {
    pub fn new(
        storage: Arc<dyn Storage>,
        publisher: Arc<dyn MessagePublisher>,
        things: Arc<dyn ThingsClient>,
    ) -> Self {
        Self {
            storage,
            publisher,
            things,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the wall clock, e.g. with a fixed instant in tests
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Resolve descriptive metadata; lookup failures are not merge failures
    pub async fn lookup_thing(&self, id: &str) -> Option<Thing> {
        match self.things.find_by_id(id).await {
            Ok(thing) => Some(thing),
            Err(e) => {
                debug!(id = %id, error = %e, "Thing lookup failed");
                None
            }
        }
    }
}

/// Tenant for a new record: event first, then the registry option
pub(crate) fn resolve_tenant(item: &RegistryItem, event: &FunctionUpdated) -> String {
    event
        .tenant
        .as_deref()
        .filter(|t| !t.is_empty())
        .or_else(|| item.option("tenant"))
        .unwrap_or(DEFAULT_TENANT)
        .to_string()
}

/// A record read from storage, or freshly built
pub(crate) struct Loaded<T> {
    pub record: T,
    /// Whether the record already exists in storage
    pub stored: bool,
}

pub(crate) async fn load_or_else<T, F>(
    storage: &dyn Storage,
    id: &str,
    factory: F,
) -> FunctionResult<Loaded<T>>
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    if storage.exists(id).await? {
        let record = storage::get::<T>(storage, id).await?;
        Ok(Loaded {
            record,
            stored: true,
        })
    } else {
        Ok(Loaded {
            record: factory(),
            stored: false,
        })
    }
}

/// Persist `record` and republish it
pub(crate) async fn commit<T>(
    ctx: &FunctionContext,
    cancel: &CancellationToken,
    id: &str,
    record: &T,
    stored: bool,
) -> FunctionResult<()>
where
    T: Serialize + TopicMessage,
{
    if cancel.is_cancelled() {
        return Err(FunctionError::Cancelled);
    }

    let value = serde_json::to_value(record)?;
    if stored {
        ctx.storage.update(id, value).await?;
        info!(asset_id = %id, "Updated record in storage");
    } else {
        ctx.storage.create(id, value).await?;
        info!(asset_id = %id, "Created record in storage");
    }

    ctx.publisher.publish_on_topic(record).await?;
    info!(asset_id = %id, topic = %record.topic_name(), "Published record");

    Ok(())
}
