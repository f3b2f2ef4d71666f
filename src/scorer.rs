//! HTTP adapter for the external scoring function.
//!
//! The model server is a black box: raw image bytes in, a JSON body with
//! a `score` field out. Anything else — transport failure, bad status,
//! missing field — is a scorer error and fails that one image's job.

use async_trait::async_trait;
use serde_json::Value;

use crate::classify::ImageScorer;
use crate::error::ClassifyError;

/// Scores images by POSTing them to a model-serving endpoint.
pub struct HttpScorer {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpScorer {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ImageScorer for HttpScorer {
    async fn score(&self, image: &[u8]) -> Result<f64, ClassifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| ClassifyError::Scorer(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClassifyError::Scorer(format!(
                "scoring endpoint returned {}",
                response.status()
            )));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| ClassifyError::Scorer(e.to_string()))?;
        data.get("score")
            .and_then(Value::as_f64)
            .ok_or_else(|| ClassifyError::Scorer("response missing numeric `score` field".into()))
    }
}
