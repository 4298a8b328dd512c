use mnemo_embed::EmbedError;

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("embedding service unavailable: {0}")]
    EmbeddingUnavailable(#[source] EmbedError),

    #[error("embedding failed: {0}")]
    Embed(#[from] EmbedError),

    #[error("persisted store unusable: {0}")]
    StorageCorrupt(String),

    #[error("record count {count} exceeds capacity {max} after eviction")]
    CapacityInvariantViolation { count: usize, max: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MemoryError>;
