//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the auto-interpretation
//! pipeline. Business crates depend on this crate only; reverse dependencies
//! are prohibited.
//!
//! ## Data flow
//! - A loader yields [`Record`]s, one per SAE feature
//! - Processing units ([`ProcessUnit`]) turn stage inputs into stage outputs,
//!   calling a [`LanguageClient`] on the way
//! - Stage outputs are folded back into the [`Record`] before the next stage

mod blueprint;
mod client;
mod error;
mod feature_id;
mod record;
mod unit;

pub use blueprint::*;
pub use client::{GenerationOptions, LanguageClient, Message, Role};
pub use error::{ClientError, ContractError};
pub use feature_id::FeatureId;
pub use record::{Example, Record};
pub use unit::*;
