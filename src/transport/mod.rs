//! Chat transport abstraction.
//!
//! The pipeline talks to the homeserver only through [`ChatTransport`] —
//! pure I/O, no moderation logic. The concrete implementation is a thin
//! client-server API adapter in [`matrix`].

pub mod matrix;

pub use matrix::{MatrixTransport, SyncBatch};

use async_trait::async_trait;

use crate::error::TransportError;

/// Outbound operations the moderation pipeline needs from the chat
/// transport. All methods are side-effecting calls against the server.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a message to a room. Returns the new event's ID.
    async fn send_message(&self, room_id: &str, body: &str) -> Result<String, TransportError>;

    /// Send a message as a threaded reply to an existing event.
    async fn send_reply(
        &self,
        room_id: &str,
        in_reply_to: &str,
        body: &str,
    ) -> Result<String, TransportError>;

    /// Remove a previously sent message.
    async fn redact(
        &self,
        room_id: &str,
        event_id: &str,
        reason: &str,
    ) -> Result<(), TransportError>;

    /// Resolve a room alias (`#...`) to a room ID (`!...`).
    async fn resolve_alias(&self, alias: &str) -> Result<String, TransportError>;

    /// Download media content by its locator.
    async fn download(&self, locator: &str) -> Result<Vec<u8>, TransportError>;
}
