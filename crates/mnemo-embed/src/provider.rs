use crate::error::EmbedError;

/// A capability that turns text into fixed-length embedding vectors.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, returning one vector per input in input order.
    ///
    /// Implementations split oversized batches internally, so callers may
    /// pass any number of texts in one call.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or the response is
    /// malformed. The upstream API reports no per-item errors, so a failure
    /// covers the whole batch.
    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, EmbedError>> + Send;

    fn name(&self) -> &str;
}
