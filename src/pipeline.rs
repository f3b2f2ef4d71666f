//! Message-to-action pipeline.
//!
//! Flow for one inbound message:
//! 1. `extract` — ordered image references (attachment or embedded)
//! 2. classify each reference concurrently under the admission gate
//! 3. reassemble in extraction order; failed images are omitted
//! 4. `decide` per result, merged into one per-message plan
//! 5. format one report, dispatch the plan's side effects
//!
//! Exactly one outbound report per message regardless of image count;
//! a batch with nothing to say produces no traffic at all.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::classify::ClassifierClient;
use crate::config::Config;
use crate::decision::ActionPlan;
use crate::dispatch::ActionDispatcher;
use crate::extract;
use crate::report;
use crate::types::{ClassificationResult, MessageEvent};

/// Outcome of handling one message, returned for observability.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Successful classifications, in extraction order.
    pub results: Vec<ClassificationResult>,
    /// The merged action plan that was dispatched.
    pub plan: ActionPlan,
    /// The rendered report, when one was produced.
    pub report: Option<String>,
}

/// Orchestrates extraction, classification and dispatch for inbound
/// messages. Shared across handler tasks; holds no per-message state.
pub struct ModerationPipeline {
    config: Arc<Config>,
    classifier: ClassifierClient,
    dispatcher: ActionDispatcher,
}

impl ModerationPipeline {
    pub fn new(
        config: Arc<Config>,
        classifier: ClassifierClient,
        dispatcher: ActionDispatcher,
    ) -> Self {
        Self {
            config,
            classifier,
            dispatcher,
        }
    }

    /// Handle one message. Returns `None` when it carried no images.
    ///
    /// Never fails: per-image errors are logged and the image is omitted
    /// from the report; dispatch failures are logged by the dispatcher.
    pub async fn handle_message(&self, event: &MessageEvent) -> Option<BatchOutcome> {
        let references = extract::extract_images(event);
        if references.is_empty() {
            return None;
        }
        info!(
            room = %event.room_id,
            event = %event.event_id,
            count = references.len(),
            "Classifying images"
        );

        // All jobs of the batch run concurrently (gate permitting) and
        // settle together; completion order does not matter because the
        // results are re-ordered by extraction position below.
        let jobs = references.into_iter().map(|reference| {
            let locator = reference.locator.clone();
            async move {
                let outcome = self.classifier.classify(reference).await;
                (locator, outcome)
            }
        });
        let settled = futures::future::join_all(jobs).await;

        let mut results = Vec::with_capacity(settled.len());
        for (locator, outcome) in settled {
            match outcome {
                Ok(result) => results.push(result),
                // Fail-silent per item: the image is left out of the
                // report, siblings are unaffected.
                Err(e) => warn!(locator = %locator, error = %e, "Image classification failed"),
            }
        }
        results.sort_by_key(|r| r.reference.position);

        if results.is_empty() {
            debug!(event = %event.event_id, "No classifiable images; nothing to report");
            return Some(BatchOutcome {
                results,
                plan: ActionPlan::default(),
                report: None,
            });
        }

        let plan = ActionPlan::for_batch(results.iter(), &self.config.actions);
        if plan.is_empty() {
            debug!(event = %event.event_id, "No actions configured for these results");
            return Some(BatchOutcome {
                results,
                plan,
                report: None,
            });
        }

        let permalink = report::permalink(
            &event.room_id,
            &event.event_id,
            &self.config.via_servers,
        );
        let text = report::format_report(&results, &permalink);
        self.dispatcher
            .execute(&plan, &event.room_id, &event.event_id, &text)
            .await;

        Some(BatchOutcome {
            results,
            plan,
            report: Some(text),
        })
    }
}
