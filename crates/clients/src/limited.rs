//! Shared concurrency ceiling for a language-model client
//!
//! Every stage of a run talks to the backend through one `LimitedClient`, so
//! the ceiling holds across records and across the batches inside a record.

use std::sync::Arc;

use contracts::{ClientError, GenerationOptions, LanguageClient, Message};
use tokio::sync::Semaphore;
use tracing::trace;

/// Client wrapper admitting at most `max_in_flight` concurrent `generate` calls
pub struct LimitedClient<C> {
    inner: Arc<C>,
    permits: Arc<Semaphore>,
}

impl<C> LimitedClient<C> {
    pub fn new(inner: Arc<C>, max_in_flight: usize) -> Self {
        Self {
            inner,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    /// Permits not currently held by a call
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

impl<C> LanguageClient for LimitedClient<C>
where
    C: LanguageClient + Sync,
{
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<String, ClientError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ClientError::Request("client limiter closed".to_string()))?;
        trace!(available = self.permits.available_permits(), "client permit acquired");
        self.inner.generate(messages, options).await
    }
}
