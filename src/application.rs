// Copyright (c) 2025 - Cowboy AI, Inc.
//! Dispatcher
//!
//! Matches inbound envelopes against the registry and runs the handler of
//! every matching entry, one after the other. The first failing handler stops
//! the remaining ones; earlier handlers are not rolled back.

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::errors::FunctionResult;
use crate::events::FunctionUpdated;
use crate::functions::FunctionContext;
use crate::registry::Registry;

/// The function service: a registry plus the collaborators handlers share
pub struct App {
    registry: Registry,
    context: FunctionContext,
}

impl App {
    pub fn new(registry: Registry, context: FunctionContext) -> Self {
        Self { registry, context }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn context(&self) -> &FunctionContext {
        &self.context
    }

    /// Entry point for a raw message body
    pub async fn message_accepted(
        &self,
        body: &[u8],
        cancel: &CancellationToken,
    ) -> FunctionResult<()> {
        let event = FunctionUpdated::from_slice(body)?;
        self.dispatch(&event, cancel).await
    }

    /// Run every registry entry matching `event`
    pub async fn dispatch(
        &self,
        event: &FunctionUpdated,
        cancel: &CancellationToken,
    ) -> FunctionResult<()> {
        let matches = self.registry.find(&event.id);
        debug!(function_id = %event.id, matches = matches.len(), "Found matching functions");

        for item in matches {
            debug!(function_id = %event.id, kind = %item.kind, "Handling event");
            item.kind
                .handle(&self.context, item, event, cancel)
                .await
                .inspect_err(|e| {
                    debug!(function_id = %event.id, kind = %item.kind, error = %e, "Handler failed");
                })?;
        }

        Ok(())
    }

    /// Handle message bodies until `cancel` fires or the stream ends
    ///
    /// A failing message is logged and skipped; it never stops the loop.
    pub async fn run<S>(&self, messages: S, cancel: CancellationToken)
    where
        S: Stream<Item = Vec<u8>>,
    {
        tokio::pin!(messages);

        let mut handled = 0u64;
        let mut failed = 0u64;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Cancellation requested, stopping");
                    break;
                }
                next = messages.next() => {
                    let Some(body) = next else {
                        info!("Subscription closed");
                        break;
                    };

                    match self.message_accepted(&body, &cancel).await {
                        Ok(()) => handled += 1,
                        Err(e) => {
                            failed += 1;
                            error!(error = %e, transient = e.is_transient(), "Failed to handle message");
                        }
                    }
                }
            }
        }

        info!(handled, failed, "Message loop finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::FunctionKind;
    use crate::messaging::RecordingPublisher;
    use crate::registry::RegistryItem;
    use crate::storage::InMemoryStorage;
    use crate::things::StaticThings;
    use std::sync::Arc;

    fn app(publisher: Arc<RecordingPublisher>) -> App {
        let registry = Registry::new([RegistryItem::new("fn-1", FunctionKind::Sewer)]);
        let context = FunctionContext::new(
            Arc::new(InMemoryStorage::new()),
            publisher,
            Arc::new(StaticThings::default()),
        );
        App::new(registry, context)
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected() {
        let app = app(Arc::new(RecordingPublisher::new()));
        let result = app
            .message_accepted(b"not json", &CancellationToken::new())
            .await;
        assert!(matches!(
            result,
            Err(crate::errors::FunctionError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_run_survives_bad_messages() {
        let publisher = Arc::new(RecordingPublisher::new());
        let app = app(publisher.clone());

        let bodies = vec![
            b"garbage".to_vec(),
            br#"{"id": "fn-1", "type": "level", "pack": [{"n": "5700", "v": 2.5}]}"#.to_vec(),
        ];
        app.run(futures::stream::iter(bodies), CancellationToken::new())
            .await;

        assert_eq!(publisher.count(), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let app = app(Arc::new(RecordingPublisher::new()));
        let cancel = CancellationToken::new();
        cancel.cancel();

        app.run(futures::stream::pending::<Vec<u8>>(), cancel).await;
    }
}
