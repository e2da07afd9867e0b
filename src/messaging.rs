// Copyright (c) 2025 - Cowboy AI, Inc.
//! Outbound Messaging
//!
//! Asset records are republished as canonical "updated" events. Each record
//! names its own topic and a versioned content type; the transport only
//! moves bytes.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::errors::{FunctionError, FunctionResult};

/// A record that can be published on a topic
pub trait TopicMessage: Send + Sync {
    /// Topic the record is published on
    fn topic_name(&self) -> &str;

    /// Versioned media type of the body
    fn content_type(&self) -> &str;

    /// Serialized body
    fn body(&self) -> FunctionResult<Vec<u8>>;
}

/// Transport used to publish records
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish_on_topic(&self, message: &dyn TopicMessage) -> FunctionResult<()>;
}

/// A message captured by [`RecordingPublisher`]
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub topic: String,
    pub content_type: String,
    pub body: serde_json::Value,
}

/// Publisher that keeps messages in memory
///
/// Used by tests and for dry runs without a broker.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<PublishedMessage>>,
    fail_with: Option<String>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher whose every publish fails with `reason`
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail_with: Some(reason.into()),
        }
    }

    /// Messages published so far
    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Most recently published message
    pub fn last(&self) -> Option<PublishedMessage> {
        self.messages().pop()
    }

    pub fn count(&self) -> usize {
        self.messages.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl MessagePublisher for RecordingPublisher {
    async fn publish_on_topic(&self, message: &dyn TopicMessage) -> FunctionResult<()> {
        if let Some(reason) = &self.fail_with {
            return Err(FunctionError::Messaging(reason.clone()));
        }

        let body = serde_json::from_slice(&message.body()?)?;
        self.messages
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(PublishedMessage {
                topic: message.topic_name().to_string(),
                content_type: message.content_type().to_string(),
                body,
            });

        Ok(())
    }
}
