//! Mock language-model client
//!
//! Scripted responses for unit tests and `--dry-run`. Counts calls and tracks
//! the peak number of concurrent `generate` calls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{ClientError, GenerationOptions, LanguageClient, Message};
use tracing::{debug, instrument};

/// Produces the response for one prompt
pub type Responder = Arc<dyn Fn(&[Message]) -> Result<String, ClientError> + Send + Sync>;

/// Mock client
pub struct MockClient {
    name: String,
    responder: Responder,
    /// Simulated latency per call
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockClient {
    /// Create a mock answering every prompt through `responder`
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&[Message]) -> Result<String, ClientError> + Send + Sync + 'static,
    {
        Self {
            name: "mock".to_string(),
            responder: Arc::new(responder),
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Create a mock that always answers `text`
    pub fn fixed(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Create a mock that always fails with `error`
    pub fn failing(error: ClientError) -> Self {
        Self::new(move |_| Err(error.clone()))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Total `generate` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously running `generate` calls
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl LanguageClient for MockClient {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "mock_generate", skip(self, messages, _options), fields(client = %self.name))]
    async fn generate(
        &self,
        messages: &[Message],
        _options: &GenerationOptions,
    ) -> Result<String, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let result = (self.responder)(messages);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        debug!(ok = result.is_ok(), "mock response");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_response() {
        let client = MockClient::fixed("Explanation: numbers");
        let text = client
            .generate(&[Message::user("hi")], &GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "Explanation: numbers");
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_responder_sees_messages() {
        let client = MockClient::new(|messages| {
            Ok(messages
                .last()
                .map(|m| m.content.to_uppercase())
                .unwrap_or_default())
        });
        let text = client
            .generate(&[Message::user("abc")], &GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "ABC");
    }

    #[tokio::test]
    async fn test_failing() {
        let client = MockClient::failing(ClientError::Timeout { after_ms: 10 });
        let err = client
            .generate(&[], &GenerationOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::Timeout { after_ms: 10 });
    }

    #[tokio::test]
    async fn test_peak_concurrency_tracked() {
        let client = Arc::new(MockClient::fixed("ok").with_delay(Duration::from_millis(30)));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let client = Arc::clone(&client);
            handles.push(tokio::spawn(async move {
                client
                    .generate(&[], &GenerationOptions::default())
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(client.calls(), 3);
        assert_eq!(client.peak_concurrency(), 3);
    }
}
