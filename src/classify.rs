//! Classifier client — fetch, score, label, all under an admission ticket.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{ClassifyError, FetchError};
use crate::gate::AdmissionGate;
use crate::types::{ClassificationResult, ImageReference};

/// Retrieves image bytes for a content locator.
///
/// Pure I/O — no business logic. The homeserver transport implements
/// this over the media repository; tests substitute in-memory fakes.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, FetchError>;
}

/// The external scoring function: image bytes in, NSFW probability out.
#[async_trait]
pub trait ImageScorer: Send + Sync {
    async fn score(&self, image: &[u8]) -> Result<f64, ClassifyError>;
}

/// Wraps the external scorer with a uniform request/response contract.
///
/// Every call runs under a [`JobTicket`](crate::gate::JobTicket) from the
/// shared gate; the ticket is held for the whole fetch-and-score span and
/// released exactly once on every outcome.
pub struct ClassifierClient {
    fetcher: Arc<dyn ContentFetcher>,
    scorer: Arc<dyn ImageScorer>,
    gate: AdmissionGate,
    max_image_bytes: usize,
}

impl ClassifierClient {
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        scorer: Arc<dyn ImageScorer>,
        gate: AdmissionGate,
        max_image_bytes: usize,
    ) -> Self {
        Self {
            fetcher,
            scorer,
            gate,
            max_image_bytes,
        }
    }

    /// The shared admission gate (exposed for observability).
    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Classify one image reference.
    pub async fn classify(
        &self,
        reference: ImageReference,
    ) -> Result<ClassificationResult, ClassifyError> {
        let _ticket = self.gate.admit().await;
        debug!(locator = %reference.locator, "Classification job admitted");

        let bytes = self.fetcher.fetch(&reference.locator).await?;
        if bytes.len() > self.max_image_bytes {
            return Err(FetchError::TooLarge {
                size: bytes.len(),
                limit: self.max_image_bytes,
            }
            .into());
        }

        let score = self.scorer.score(&bytes).await?;
        if !(0.0..=1.0).contains(&score) {
            return Err(ClassifyError::ScoreOutOfRange(score));
        }

        Ok(ClassificationResult::new(reference, score))
    }
}
