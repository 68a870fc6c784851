//! # Clients
//!
//! Language-model backends implementing [`LanguageClient`].
//!
//! - [`OpenAiCompatClient`]: any server speaking the OpenAI chat-completions API
//! - [`MockClient`]: scripted responses for tests and dry runs
//! - [`LimitedClient`]: shared ceiling on concurrent calls to any client

pub mod limited;
pub mod mock_client;
pub mod openai_compat;

pub use contracts::{ClientError, GenerationOptions, LanguageClient, Message};
pub use limited::LimitedClient;
pub use mock_client::MockClient;
pub use openai_compat::OpenAiCompatClient;
