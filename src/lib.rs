// Copyright (c) 2025 - Cowboy AI, Inc.
//! CIP Functions
//!
//! Keeps one state record per monitored sewer asset and republishes it when
//! it changes. Inbound function events are matched against a static registry
//! and merged by the handler for the asset's kind:
//!
//! - combined sewage overflows: reconstructed overflow intervals with a
//!   cumulative overflow time
//! - sewage pumping stations: pump on/off state
//! - sewers: distance to the surface from a SenML measurement pack
//!
//! Storage, transport and the thing directory are collaborators behind traits
//! ([`Storage`], [`MessagePublisher`], [`ThingsClient`]) so the merge logic
//! runs unchanged against NATS or in-memory doubles.

pub mod application;
pub mod config;
pub mod errors;
pub mod events;
pub mod functions;
pub mod messaging;
pub mod nats;
pub mod registry;
pub mod storage;
pub mod subjects;
pub mod things;

// Re-export commonly used types
pub use application::App;
pub use config::{ConfigError, ServiceConfig};
pub use errors::{FunctionError, FunctionResult};
pub use events::{FunctionUpdated, Pack, Stopwatch};
pub use functions::{
    CombinedSewageOverflow, FunctionContext, FunctionKind, Overflow, PublishPolicy,
    SewagePumpingStation, Sewer,
};
pub use messaging::{MessagePublisher, RecordingPublisher, TopicMessage};
pub use nats::{NatsClient, NatsConfig};
pub use registry::{Registry, RegistryError, RegistryItem};
pub use storage::{InMemoryStorage, NatsKvStorage, Storage, StorageError};
pub use subjects::Topic;
pub use things::{StaticThings, Thing, ThingsClient};
