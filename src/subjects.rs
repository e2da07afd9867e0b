// Copyright (c) 2025 - Cowboy AI, Inc.

//! NATS subjects used by the function service
//!
//! Inbound function events arrive on `function.updated` (stopwatch payloads)
//! and `message.accepted` (measurement packs). Every changed asset record is
//! republished on `cip-function.updated`.

use std::fmt;
use std::str::FromStr;

/// Known topics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Upstream function state changes
    FunctionUpdated,
    /// Accepted device measurements
    MessageAccepted,
    /// Republished asset records
    CipFunctionUpdated,
}

impl Topic {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Topic::FunctionUpdated => "function.updated",
            Topic::MessageAccepted => "message.accepted",
            Topic::CipFunctionUpdated => "cip-function.updated",
        }
    }

    /// Topics the service consumes by default
    pub fn inbound() -> Vec<Topic> {
        vec![Topic::FunctionUpdated, Topic::MessageAccepted]
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "function.updated" => Ok(Topic::FunctionUpdated),
            "message.accepted" => Ok(Topic::MessageAccepted),
            "cip-function.updated" => Ok(Topic::CipFunctionUpdated),
            other => Err(format!("unknown topic: {}", other)),
        }
    }
}
