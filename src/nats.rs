//! NATS client for the function service

use async_nats::{Client, ConnectOptions, HeaderMap, Subscriber};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::time::Duration;
use tracing::{debug, info};

use crate::errors::{FunctionError, FunctionResult};
use crate::messaging::{MessagePublisher, TopicMessage};

/// Configuration for NATS connection
#[derive(Debug, Clone)]
pub struct NatsConfig {
    /// NATS server URLs
    pub servers: Vec<String>,
    /// Client name
    pub name: String,
    /// Connection timeout
    pub connect_timeout: Duration,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            servers: vec!["nats://localhost:4222".to_string()],
            name: "cip-functions".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// NATS client wrapper used for inbound subscriptions and record publishing
#[derive(Clone)]
pub struct NatsClient {
    client: Client,
}

impl NatsClient {
    /// Connect with the given configuration
    pub async fn connect(config: &NatsConfig) -> FunctionResult<Self> {
        let connect_options = ConnectOptions::new()
            .name(&config.name)
            .connection_timeout(config.connect_timeout);

        let client = async_nats::connect_with_options(config.servers.join(","), connect_options)
            .await
            .map_err(|e| FunctionError::Messaging(e.to_string()))?;

        info!("Connected to NATS at {:?}", config.servers);

        Ok(Self { client })
    }

    /// Subscribe to a subject
    pub async fn subscribe(&self, subject: &str) -> FunctionResult<Subscriber> {
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| FunctionError::Messaging(e.to_string()))?;

        info!("Subscribed to subject: {}", subject);
        Ok(subscriber)
    }

    /// Merge subscriptions on several subjects into one stream of message bodies
    pub async fn subscribe_all(
        &self,
        subjects: &[String],
    ) -> FunctionResult<BoxStream<'static, Vec<u8>>> {
        let mut subscribers = Vec::with_capacity(subjects.len());
        for subject in subjects {
            subscribers.push(self.subscribe(subject).await?);
        }

        Ok(stream::select_all(subscribers)
            .map(|message| message.payload.to_vec())
            .boxed())
    }

    /// Get the underlying NATS client for advanced operations
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl MessagePublisher for NatsClient {
    async fn publish_on_topic(&self, message: &dyn TopicMessage) -> FunctionResult<()> {
        let subject = message.topic_name().to_string();

        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", message.content_type());

        self.client
            .publish_with_headers(subject.clone(), headers, message.body()?.into())
            .await
            .map_err(|e| FunctionError::Messaging(e.to_string()))?;

        debug!(subject = %subject, content_type = %message.content_type(), "Published record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NatsConfig::default();
        assert_eq!(config.servers, vec!["nats://localhost:4222"]);
        assert_eq!(config.name, "cip-functions");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }
}
