//! Shared types for the moderation pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed decision boundary between SFW and NSFW. Not configurable — only
/// downstream action selection is.
const NSFW_BOUNDARY: f64 = 0.5;

// ── Inbound message ─────────────────────────────────────────────────

/// A room message as delivered by the chat transport.
///
/// The transport adapter converts its native event format into this
/// struct; the pipeline never sees raw wire events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    /// Room the message was sent in.
    pub room_id: String,
    /// Event identifier of the message itself.
    pub event_id: String,
    /// Fully-qualified sender identifier.
    pub sender: String,
    /// Message type, e.g. "m.image" or "m.text".
    pub msgtype: String,
    /// Plain-text body.
    pub body: String,
    /// Rich-text (HTML) body, if the client sent one.
    pub formatted_body: Option<String>,
    /// Content locator of a direct media attachment.
    pub attachment: Option<String>,
    /// When the message was received.
    pub received_at: DateTime<Utc>,
}

impl MessageEvent {
    /// Build a plain event. Optional fields via the `with_*` builders.
    pub fn new(
        room_id: impl Into<String>,
        event_id: impl Into<String>,
        sender: impl Into<String>,
        msgtype: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            room_id: room_id.into(),
            event_id: event_id.into(),
            sender: sender.into(),
            msgtype: msgtype.into(),
            body: body.into(),
            formatted_body: None,
            attachment: None,
            received_at: Utc::now(),
        }
    }

    pub fn with_formatted_body(mut self, html: impl Into<String>) -> Self {
        self.formatted_body = Some(html.into());
        self
    }

    pub fn with_attachment(mut self, locator: impl Into<String>) -> Self {
        self.attachment = Some(locator.into());
        self
    }

    /// Whether this is a direct image message (as opposed to a text
    /// message that may embed images in its formatted body).
    pub fn is_image(&self) -> bool {
        self.msgtype == "m.image"
    }
}

// ── Image reference ─────────────────────────────────────────────────

/// An image found in a message, addressed by its content locator.
///
/// Immutable once extracted. `position` is the index within the message
/// in document order; it drives report ordering when classification
/// completes out of order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Opaque content address (an mxc:// URI).
    pub locator: String,
    /// Event the image arrived in.
    pub source_event: String,
    /// Index within the message when it carried multiple images.
    pub position: usize,
}

// ── Classification outcome ──────────────────────────────────────────

/// Binary content-sensitivity label derived from a classifier score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Sfw,
    Nsfw,
}

impl Label {
    /// Apply the fixed boundary: NSFW iff `score >= 0.5`.
    pub fn from_score(score: f64) -> Self {
        if score >= NSFW_BOUNDARY {
            Label::Nsfw
        } else {
            Label::Sfw
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Sfw => "SFW",
            Label::Nsfw => "NSFW",
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying one image. One per [`ImageReference`]; lives
/// only for the handling of its originating message.
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    pub reference: ImageReference,
    /// NSFW probability in `[0, 1]`.
    pub score: f64,
    pub label: Label,
}

impl ClassificationResult {
    pub fn new(reference: ImageReference, score: f64) -> Self {
        Self {
            reference,
            label: Label::from_score(score),
            score,
        }
    }
}
