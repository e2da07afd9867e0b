// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Configuration
//!
//! Read from the environment at startup. Every setting has a default except
//! the thing directory URL, which is optional.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::nats::NatsConfig;
use crate::subjects::Topic;

pub const DEFAULT_REGISTRY_PATH: &str = "/opt/diwise/config/functions.csv";
pub const DEFAULT_KV_BUCKET: &str = "cip-functions";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing configuration value: {0}")]
    Missing(String),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: String, value: String },
}

/// Everything the service binary needs to start
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub nats: NatsConfig,
    /// Path of the function registry file
    pub registry_path: PathBuf,
    /// JetStream key/value bucket holding asset records
    pub kv_bucket: String,
    /// Inbound subjects to subscribe to
    pub subjects: Vec<String>,
    /// Base URL of the thing directory
    pub things_url: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig::default(),
            registry_path: PathBuf::from(DEFAULT_REGISTRY_PATH),
            kv_bucket: DEFAULT_KV_BUCKET.to_string(),
            subjects: Topic::inbound()
                .iter()
                .map(|t| t.as_str().to_string())
                .collect(),
            things_url: None,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get("NATS_URL") {
            config.nats.servers = split_list(&url);
            if config.nats.servers.is_empty() {
                return Err(ConfigError::Missing("NATS_URL".to_string()));
            }
        }

        if let Some(name) = get("NATS_CLIENT_NAME") {
            config.nats.name = name;
        }

        if let Some(value) = get("CONNECT_TIMEOUT_SECS") {
            let secs = value.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                key: "CONNECT_TIMEOUT_SECS".to_string(),
                value: value.clone(),
            })?;
            config.nats.connect_timeout = Duration::from_secs(secs);
        }

        if let Some(path) = get("CIP_FUNCTIONS_REGISTRY") {
            config.registry_path = PathBuf::from(path);
        }

        if let Some(bucket) = get("CIP_FUNCTIONS_KV_BUCKET") {
            config.kv_bucket = bucket;
        }

        if let Some(subjects) = get("CIP_FUNCTIONS_SUBJECTS") {
            config.subjects = split_list(&subjects);
            if config.subjects.is_empty() {
                return Err(ConfigError::Missing("CIP_FUNCTIONS_SUBJECTS".to_string()));
            }
        }

        config.things_url = get("THINGS_URL");

        Ok(config)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.nats.servers, vec!["nats://localhost:4222"]);
        assert_eq!(config.registry_path, PathBuf::from(DEFAULT_REGISTRY_PATH));
        assert_eq!(config.kv_bucket, "cip-functions");
        assert_eq!(config.subjects, vec!["function.updated", "message.accepted"]);
        assert_eq!(config.things_url, None);
    }

    #[test]
    fn test_overrides() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("NATS_URL", "nats://a:4222, nats://b:4222"),
            ("CONNECT_TIMEOUT_SECS", "3"),
            ("CIP_FUNCTIONS_SUBJECTS", "function.updated"),
            ("THINGS_URL", "http://things:8080"),
        ]))
        .unwrap();

        assert_eq!(config.nats.servers, vec!["nats://a:4222", "nats://b:4222"]);
        assert_eq!(config.nats.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.subjects, vec!["function.updated"]);
        assert_eq!(config.things_url.as_deref(), Some("http://things:8080"));
    }

    #[test]
    fn test_bad_timeout() {
        let err = ServiceConfig::from_lookup(lookup(&[("CONNECT_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "CONNECT_TIMEOUT_SECS".into(),
                value: "soon".into()
            }
        );
    }

    #[test]
    fn test_empty_subject_list() {
        let err = ServiceConfig::from_lookup(lookup(&[("CIP_FUNCTIONS_SUBJECTS", " , ")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("CIP_FUNCTIONS_SUBJECTS".into()));
    }
}
