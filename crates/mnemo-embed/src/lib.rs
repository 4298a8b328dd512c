//! Embedding provider abstraction for the mnemo memory store.

pub mod compatible;
pub mod error;
pub mod http;
#[cfg(feature = "mock")]
pub mod mock;
pub mod provider;

pub use error::EmbedError;
pub use provider::EmbeddingProvider;
