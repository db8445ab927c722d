//! Oracle client: prompt construction and an OpenAI-compatible chat transport.

pub mod prompt;

#[cfg(feature = "http")]
pub mod chat;

pub use prompt::{ChatMessage, adjudication_messages, classification_messages};

#[cfg(feature = "http")]
pub use chat::{ChatOracle, OracleConfig, OracleError};
