//! Decision engine — maps classification outcomes to configured actions.

use crate::config::ActionConfig;
use crate::types::{ClassificationResult, Label};

/// An action to take for a classified image.
///
/// Not mutually exclusive — a single result can demand several. An empty
/// decision means the result is silently dropped, a valid terminal
/// outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send the report to the room of origin as a reply.
    Reply,
    /// Remove the originating message.
    Redact,
    /// Send the report to a separate room (ID or alias).
    Report(String),
}

/// Decide what to do with one result. Pure — no side effects, no I/O.
pub fn decide(result: &ClassificationResult, actions: &ActionConfig) -> Vec<Action> {
    match result.label {
        Label::Sfw => {
            if actions.ignore_sfw {
                Vec::new()
            } else {
                vec![Action::Reply]
            }
        }
        Label::Nsfw => {
            let mut decided = Vec::new();
            if actions.redact_nsfw {
                decided.push(Action::Redact);
            }
            if actions.direct_reply {
                decided.push(Action::Reply);
            }
            if let Some(target) = &actions.report_to_room {
                decided.push(Action::Report(target.clone()));
            }
            decided
        }
    }
}

/// Per-message union of per-result decisions.
///
/// Collapses duplicates so a batch produces at most one reply, one
/// redaction of the originating event, and one report per distinct
/// target — the one-outbound-response invariant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionPlan {
    pub reply: bool,
    pub redact: bool,
    pub report_targets: Vec<String>,
}

impl ActionPlan {
    /// Merge the decisions for every result of one message.
    pub fn for_batch<'a>(
        results: impl IntoIterator<Item = &'a ClassificationResult>,
        actions: &ActionConfig,
    ) -> Self {
        let mut plan = ActionPlan::default();
        for result in results {
            for action in decide(result, actions) {
                plan.add(action);
            }
        }
        plan
    }

    fn add(&mut self, action: Action) {
        match action {
            Action::Reply => self.reply = true,
            Action::Redact => self.redact = true,
            Action::Report(target) => {
                if !self.report_targets.contains(&target) {
                    self.report_targets.push(target);
                }
            }
        }
    }

    /// Nothing to dispatch.
    pub fn is_empty(&self) -> bool {
        !self.reply && !self.redact && self.report_targets.is_empty()
    }
}
