//! OpenAI-compatible chat-completions client
//!
//! Works with any endpoint accepting the OpenAI request format (vLLM,
//! OpenRouter, OpenAI itself). No retries: every error surfaces to the caller.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use contracts::{ClientConfig, ClientError, GenerationOptions, LanguageClient, Message};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

const DEFAULT_RETRY_AFTER_MS: u64 = 1000;

/// Client for an OpenAI-compatible `/chat/completions` endpoint
pub struct OpenAiCompatClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    headers: HashMap<String, String>,
    timeout_ms: u64,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatClient {
    /// Build a client from configuration.
    ///
    /// The API key is read from `api_key_env` once, here. A configured but
    /// unset variable is an [`ClientError::Auth`] error.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let api_key = match &config.api_key_env {
            Some(var) => Some(
                std::env::var(var).map_err(|_| ClientError::Auth(format!("set {var} env var")))?,
            ),
            None => None,
        };
        Self::build(config, api_key)
    }

    /// Build a client with an explicit API key, bypassing the environment
    pub fn with_api_key(config: &ClientConfig, api_key: impl Into<String>) -> Result<Self, ClientError> {
        Self::build(config, Some(api_key.into()))
    }

    fn build(config: &ClientConfig, api_key: Option<String>) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let http = builder
            .build()
            .map_err(|e| ClientError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key,
            headers: config.headers.clone(),
            timeout_ms: config.timeout_secs * 1000,
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn completions_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/chat/completions")
    }

    fn request_body<'a>(
        &'a self,
        messages: &'a [Message],
        options: &GenerationOptions,
    ) -> ChatRequest<'a> {
        let response_format = options.response_schema.as_ref().map(|schema| {
            serde_json::json!({
                "type": "json_schema",
                "json_schema": {
                    "name": "response",
                    "schema": schema,
                    "strict": true,
                }
            })
        });

        ChatRequest {
            model: &self.model,
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            response_format,
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> ClientError {
        if e.is_timeout() {
            ClientError::Timeout {
                after_ms: self.timeout_ms,
            }
        } else {
            ClientError::Request(e.to_string())
        }
    }

    async fn send(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<String, ClientError> {
        let mut req = self.http.post(self.completions_url());
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        for (k, v) in &self.headers {
            req = req.header(k.as_str(), v.as_str());
        }

        let response = req
            .json(&self.request_body(messages, options))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        let status = response.status();

        if !status.is_success() {
            let retry_after_ms = parse_retry_after(&response);
            let body = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                429 => {
                    let retry_after_ms = retry_after_ms.unwrap_or(DEFAULT_RETRY_AFTER_MS);
                    warn!(model = %self.model, retry_after_ms, "rate limited");
                    ClientError::RateLimited { retry_after_ms }
                }
                401 | 403 => ClientError::Auth(body),
                _ => ClientError::Request(format!("HTTP {status}: {body}")),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| self.map_body_error(e))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ClientError::InvalidResponse("response contained no choices".into()))
    }

    fn map_body_error(&self, e: reqwest::Error) -> ClientError {
        if e.is_timeout() {
            ClientError::Timeout {
                after_ms: self.timeout_ms,
            }
        } else {
            ClientError::InvalidResponse(format!("failed to parse response: {e}"))
        }
    }
}

/// `Retry-After` in seconds, converted to milliseconds
fn parse_retry_after(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .map(|secs| (secs * 1000.0) as u64)
}

impl LanguageClient for OpenAiCompatClient {
    fn name(&self) -> &str {
        "openai_compat"
    }

    #[instrument(
        name = "openai_compat_generate",
        skip(self, messages, options),
        fields(model = %self.model, messages = messages.len())
    )]
    async fn generate(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<String, ClientError> {
        let start = Instant::now();
        let result = self.send(messages, options).await;
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        observability::record_client_request(self.name(), result.is_ok(), latency_ms);
        match &result {
            Ok(text) => debug!(latency_ms, chars = text.len(), "completion received"),
            Err(e) => warn!(latency_ms, error = %e, "completion failed"),
        }
        result
    }
}
