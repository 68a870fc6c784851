//! LanguageClient trait - the sole network boundary of the pipeline
//!
//! A client turns an ordered message sequence into response text. Stages
//! suspend exactly at `generate`; everything else they do is local.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::ClientError;

/// Chat role of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One `{role, content}` pair of a prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Generation options passed with every `generate` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct GenerationOptions {
    /// Response length ceiling in tokens
    #[serde(default = "default_max_tokens")]
    #[validate(range(min = 1))]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default)]
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: f32,

    /// Structured-output hint (JSON schema).
    ///
    /// Only client implementations look at this; it is never read from config.
    #[serde(skip)]
    pub response_schema: Option<serde_json::Value>,
}

fn default_max_tokens() -> u32 {
    500
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            response_schema: None,
        }
    }
}

impl GenerationOptions {
    pub fn new(max_tokens: u32, temperature: f32) -> Self {
        Self {
            max_tokens,
            temperature,
            response_schema: None,
        }
    }

    /// Copy of these options carrying a structured-output hint
    pub fn with_response_schema(&self, schema: serde_json::Value) -> Self {
        Self {
            response_schema: Some(schema),
            ..self.clone()
        }
    }
}

/// Language-model client
///
/// Implementations must be reentrant: one client is shared by every
/// concurrently running stage.
#[trait_variant::make(LanguageClient: Send)]
pub trait LocalLanguageClient {
    /// Client name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Generate a response for `messages`
    ///
    /// # Errors
    /// Transport, timeout, rate-limit and response-shape failures. Callers
    /// propagate them unchanged.
    async fn generate(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<String, ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::system("hi")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"hi"}"#);
    }

    #[test]
    fn test_generation_defaults() {
        let options: GenerationOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.max_tokens, 500);
        assert_eq!(options.temperature, 0.0);
        assert!(options.response_schema.is_none());
    }

    #[test]
    fn test_generation_validation() {
        assert!(GenerationOptions::new(0, 0.0).validate().is_err());
        assert!(GenerationOptions::new(10, 3.0).validate().is_err());
        assert!(GenerationOptions::new(10, 0.7).validate().is_ok());
    }

    #[test]
    fn test_with_response_schema_keeps_limits() {
        let base = GenerationOptions::new(50, 0.0);
        let hinted = base.with_response_schema(serde_json::json!({"type": "object"}));
        assert_eq!(hinted.max_tokens, 50);
        assert!(hinted.response_schema.is_some());
        assert!(base.response_schema.is_none());
    }
}
