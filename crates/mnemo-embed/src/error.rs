#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("embedding API returned status {status}")]
    Api { status: u16 },

    #[error("empty response from {provider}")]
    EmptyResponse { provider: &'static str },

    #[error("embedding count mismatch: sent {expected}, received {got}")]
    BatchShape { expected: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, EmbedError>;
