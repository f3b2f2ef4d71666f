//! Action dispatcher — executes the decided actions for one message.
//!
//! Notifications are at-least-once; redaction of a given originating
//! event is exactly-once (an in-process idempotency set makes the second
//! attempt a logged no-op). Every failure here is logged and isolated —
//! one action failing never blocks the others.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::decision::ActionPlan;
use crate::error::{DispatchError, TransportError};
use crate::transport::ChatTransport;

/// Reason attached to redactions.
const REDACT_REASON: &str = "NSFW";

/// Executes reply / redact / report side effects through the transport.
pub struct ActionDispatcher {
    transport: Arc<dyn ChatTransport>,
    /// Alias → room ID, populated lazily, valid for the process lifetime.
    /// Staleness is acceptable; there is no invalidation.
    alias_cache: RwLock<HashMap<String, String>>,
    /// Originating events already redacted.
    redacted: Mutex<HashSet<String>>,
}

impl ActionDispatcher {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            transport,
            alias_cache: RwLock::new(HashMap::new()),
            redacted: Mutex::new(HashSet::new()),
        }
    }

    /// Execute a per-message action plan. Failures are logged; the
    /// remaining actions always run.
    pub async fn execute(&self, plan: &ActionPlan, room_id: &str, event_id: &str, report: &str) {
        if plan.reply {
            match self.transport.send_reply(room_id, event_id, report).await {
                Ok(_) => info!(room = %room_id, "Replied with classification report"),
                Err(e) => warn!(room = %room_id, error = %e, "Failed to send reply"),
            }
        }

        for target in &plan.report_targets {
            match self.resolve_target(target).await {
                Ok(destination) => {
                    match self.transport.send_message(&destination, report).await {
                        Ok(_) => info!(room = %destination, "Sent report"),
                        Err(e) => {
                            warn!(room = %destination, error = %e, "Failed to send report")
                        }
                    }
                }
                Err(e) => warn!(target = %target, error = %e, "Report target unusable"),
            }
        }

        if plan.redact {
            self.redact_once(room_id, event_id).await;
        }
    }

    /// Redact the originating event at most once per process.
    ///
    /// Returns true when the event is redacted (now or previously).
    /// Failure degrades to a warn log so sibling actions and other
    /// images in the batch proceed.
    pub async fn redact_once(&self, room_id: &str, event_id: &str) -> bool {
        let key = format!("{room_id}/{event_id}");
        {
            let seen = self.redacted.lock().await;
            if seen.contains(&key) {
                debug!(event = %event_id, "Event already redacted; skipping");
                return true;
            }
        }

        match self.transport.redact(room_id, event_id, REDACT_REASON).await {
            Ok(()) => {
                self.redacted.lock().await.insert(key);
                info!(room = %room_id, event = %event_id, "Redacted NSFW message");
                true
            }
            // The message is gone already — same terminal state we wanted.
            Err(TransportError::NotFound(_)) => {
                self.redacted.lock().await.insert(key);
                debug!(event = %event_id, "Message already removed");
                true
            }
            Err(e) => {
                warn!(room = %room_id, event = %event_id, error = %e, "Failed to redact message");
                false
            }
        }
    }

    /// Turn a configured report target into a sendable room ID.
    ///
    /// Aliases go through the cache: a hit returns immediately, a miss
    /// resolves against the directory and stores the result.
    async fn resolve_target(&self, target: &str) -> Result<String, DispatchError> {
        if target.starts_with('!') {
            return Ok(target.to_string());
        }
        if !target.starts_with('#') {
            return Err(DispatchError::InvalidTarget(target.to_string()));
        }

        if let Some(room_id) = self.alias_cache.read().await.get(target) {
            return Ok(room_id.clone());
        }

        let room_id = self.transport.resolve_alias(target).await.map_err(|e| {
            DispatchError::AliasResolution {
                alias: target.to_string(),
                reason: e.to_string(),
            }
        })?;
        self.alias_cache
            .write()
            .await
            .insert(target.to_string(), room_id.clone());
        Ok(room_id)
    }
}
