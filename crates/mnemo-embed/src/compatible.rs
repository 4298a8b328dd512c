//! OpenAI-compatible `/embeddings` backend.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EmbedError;
use crate::provider::EmbeddingProvider;

pub struct CompatibleEmbeddings {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: Option<usize>,
    max_batch_size: usize,
}

impl fmt::Debug for CompatibleEmbeddings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompatibleEmbeddings")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .field("max_batch_size", &self.max_batch_size)
            .finish()
    }
}

impl CompatibleEmbeddings {
    #[must_use]
    pub fn new(
        mut base_url: String,
        api_key: String,
        model: String,
        dimensions: Option<usize>,
        max_batch_size: usize,
    ) -> Self {
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: crate::http::default_client(),
            base_url,
            api_key,
            model,
            dimensions,
            max_batch_size: max_batch_size.max(1),
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.dimensions,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.map_err(EmbedError::Http)?;

        if !status.is_success() {
            tracing::error!("embedding API error {status}: {text}");
            return Err(EmbedError::Api {
                status: status.as_u16(),
            });
        }

        let resp: EmbeddingResponse = serde_json::from_str(&text)?;

        if resp.data.is_empty() {
            return Err(EmbedError::EmptyResponse {
                provider: "compatible",
            });
        }
        if resp.data.len() != texts.len() {
            return Err(EmbedError::BatchShape {
                expected: texts.len(),
                got: resp.data.len(),
            });
        }

        // The API is allowed to reorder entries; `index` is authoritative.
        let mut data = resp.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

impl EmbeddingProvider for CompatibleEmbeddings {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.max_batch_size) {
            vectors.extend(self.embed_chunk(chunk).await?);
        }
        Ok(vectors)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "compatible"
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}
