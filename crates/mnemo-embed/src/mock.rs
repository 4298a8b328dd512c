//! Test-only deterministic embedder.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::EmbedError;
use crate::provider::EmbeddingProvider;

/// Deterministic in-process embedder for tests.
///
/// Vectors are derived from byte content, so equal texts embed identically
/// and distinct texts point in distinct directions. The call counter lets
/// tests assert that filtered texts never reach the embedder.
#[derive(Debug, Clone)]
pub struct MockEmbeddings {
    pub dimension: usize,
    pub fail: bool,
    calls: Arc<AtomicUsize>,
}

impl Default for MockEmbeddings {
    fn default() -> Self {
        Self::new(4)
    }
}

impl MockEmbeddings {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn failing(dimension: usize) -> Self {
        Self {
            fail: true,
            ..Self::new(dimension)
        }
    }

    /// Number of `embed_batch` calls issued so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn text_vector(text: &str, dimension: usize) -> Vec<f32> {
    let mut v = vec![0.0_f32; dimension];
    for (i, b) in text.bytes().enumerate() {
        v[i % dimension] += f32::from(b) / 255.0;
    }
    if v.iter().all(|x| *x == 0.0) {
        v[0] = 1.0;
    }
    v
}

impl EmbeddingProvider for MockEmbeddings {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(EmbedError::EmptyResponse { provider: "mock" });
        }
        Ok(texts
            .iter()
            .map(|t| text_vector(t, self.dimension))
            .collect())
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn equal_texts_embed_identically() {
        let mock = MockEmbeddings::new(4);
        let vectors = mock
            .embed_batch(&["hello".into(), "hello".into(), "other".into()])
            .await
            .unwrap();
        assert_eq!(vectors[0], vectors[1]);
        assert_ne!(vectors[0], vectors[2]);
    }

    #[tokio::test]
    async fn vectors_have_requested_dimension() {
        let mock = MockEmbeddings::new(7);
        let vectors = mock.embed_batch(&["abc".into()]).await.unwrap();
        assert_eq!(vectors[0].len(), 7);
    }

    #[tokio::test]
    async fn failing_mock_errors_and_counts_calls() {
        let mock = MockEmbeddings::failing(4);
        assert_eq!(mock.calls(), 0);
        assert!(mock.embed_batch(&["x".into()]).await.is_err());
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn empty_text_is_not_a_zero_vector() {
        let mock = MockEmbeddings::new(4);
        let vectors = mock.embed_batch(&[String::new()]).await.unwrap();
        assert!(vectors[0].iter().any(|x| *x != 0.0));
    }
}
