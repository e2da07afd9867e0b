// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cip-functions
//!
//! Deterministic registry, clock and envelopes. Nothing here reads the wall
//! clock or the environment.
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::Arc;

use cip_functions::things::Location;
use cip_functions::{
    App, FunctionContext, FunctionKind, InMemoryStorage, RecordingPublisher, Registry,
    RegistryItem, StaticThings, Thing,
};

pub const CSO_ID: &str = "fn-cso-01";
pub const PUMP_ID: &str = "fn-pump-07";
pub const SEWER_ID: &str = "fn-lvl-12";

// Fixed clock (2026-03-02T12:00:00Z)
pub const FIXED_NOW: &str = "2026-03-02T12:00:00Z";

pub fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .expect("Invalid timestamp in test fixture")
        .with_timezone(&Utc)
}

pub fn fixed_now() -> DateTime<Utc> {
    ts(FIXED_NOW)
}

pub fn registry() -> Registry {
    Registry::new([
        RegistryItem::new(CSO_ID, FunctionKind::CombinedSewageOverflow)
            .with_option("tenant", "water"),
        RegistryItem::new(PUMP_ID, FunctionKind::SewagePumpingStation),
        RegistryItem::new(SEWER_ID, FunctionKind::Sewer),
    ])
}

pub fn things() -> StaticThings {
    StaticThings::new([Thing {
        id: CSO_ID.into(),
        thing_type: "CombinedSewageOverflow".into(),
        name: Some("Bräddpunkt Norra".into()),
        location: Some(Location {
            latitude: 62.3908,
            longitude: 17.3069,
        }),
        tenant: Some("water".into()),
    }])
}

/// An app wired to in-memory collaborators, plus handles on them
pub struct Harness {
    pub app: App,
    pub storage: Arc<InMemoryStorage>,
    pub publisher: Arc<RecordingPublisher>,
}

pub fn harness() -> Harness {
    harness_with(registry(), Arc::new(RecordingPublisher::new()))
}

pub fn harness_with(registry: Registry, publisher: Arc<RecordingPublisher>) -> Harness {
    let storage = Arc::new(InMemoryStorage::new());
    let context = FunctionContext::new(storage.clone(), publisher.clone(), Arc::new(things()))
        .with_clock(fixed_now);

    Harness {
        app: App::new(registry, context),
        storage,
        publisher,
    }
}

pub fn stopwatch(id: &str, state: bool, start: Option<&str>, stop: Option<&str>) -> Value {
    let mut stopwatch = json!({ "state": state, "count": 1 });
    if let Some(start) = start {
        stopwatch["startTime"] = json!(start);
    }
    if let Some(stop) = stop {
        stopwatch["stopTime"] = json!(stop);
    }

    json!({
        "id": id,
        "type": "stopwatch",
        "stopwatch": stopwatch,
    })
}

pub fn distance(id: &str, value: f64) -> Value {
    json!({
        "id": id,
        "type": "level",
        "pack": [
            { "bn": format!("urn:dev:{}/3330/", id), "n": "0", "vs": "urn:oma:lwm2m:ext:3330" },
            { "n": "5700", "v": value },
        ],
    })
}

pub fn body(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).expect("Invalid envelope in test fixture")
}
