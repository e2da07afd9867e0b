// Copyright (c) 2025 - Cowboy AI, Inc.
//! Thing Directory
//!
//! Resolves a source identifier to the descriptive metadata of the physical
//! asset behind it. Records embed the thing the first time it can be resolved;
//! a failed lookup never fails a merge.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThingsError {
    #[error("Thing not found: {0}")]
    NotFound(String),

    #[error("Thing directory unavailable: {0}")]
    Unavailable(String),
}

/// Geographic position of a thing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Descriptive metadata of a physical asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thing {
    pub id: String,

    #[serde(rename = "type")]
    pub thing_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
}

/// Lookup of things by id
#[async_trait]
pub trait ThingsClient: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Thing, ThingsError>;
}

/// Fixed set of things held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticThings {
    things: HashMap<String, Thing>,
}

impl StaticThings {
    pub fn new(things: impl IntoIterator<Item = Thing>) -> Self {
        Self {
            things: things.into_iter().map(|t| (t.id.clone(), t)).collect(),
        }
    }
}

#[async_trait]
impl ThingsClient for StaticThings {
    async fn find_by_id(&self, id: &str) -> Result<Thing, ThingsError> {
        self.things
            .get(id)
            .cloned()
            .ok_or_else(|| ThingsError::NotFound(id.to_string()))
    }
}

#[cfg(feature = "things")]
pub use http::HttpThingsClient;

#[cfg(feature = "things")]
mod http {
    use super::*;
    use reqwest::{Client, StatusCode};
    use std::time::Duration;
    use tracing::debug;

    /// Thing directory reached over HTTP
    pub struct HttpThingsClient {
        client: Client,
        base_url: String,
    }

    impl HttpThingsClient {
        pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ThingsError> {
            let client = Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| ThingsError::Unavailable(e.to_string()))?;

            Ok(Self {
                client,
                base_url: base_url.into().trim_end_matches('/').to_string(),
            })
        }
    }

    #[async_trait]
    impl ThingsClient for HttpThingsClient {
        async fn find_by_id(&self, id: &str) -> Result<Thing, ThingsError> {
            let url = format!("{}/api/v0/things/{}", self.base_url, id);
            debug!(url = %url, "Looking up thing");

            let response = self
                .client
                .get(&url)
                .header("Accept", "application/json")
                .send()
                .await
                .map_err(|e| ThingsError::Unavailable(e.to_string()))?;

            match response.status() {
                StatusCode::OK => response
                    .json::<Thing>()
                    .await
                    .map_err(|e| ThingsError::Unavailable(e.to_string())),
                StatusCode::NOT_FOUND => Err(ThingsError::NotFound(id.to_string())),
                status => Err(ThingsError::Unavailable(format!(
                    "unexpected status {} for {}",
                    status, url
                ))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_things() {
        let things = StaticThings::new([Thing {
            id: "fn-cso-01".into(),
            thing_type: "CombinedSewageOverflow".into(),
            name: Some("Bräddpunkt 1".into()),
            location: Some(Location {
                latitude: 62.39,
                longitude: 17.30,
            }),
            tenant: None,
        }]);

        let thing = things.find_by_id("fn-cso-01").await.unwrap();
        assert_eq!(thing.thing_type, "CombinedSewageOverflow");
        assert!(matches!(
            things.find_by_id("nope").await,
            Err(ThingsError::NotFound(_))
        ));
    }
}
