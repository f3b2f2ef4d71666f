//! Bot run loop — long-polls `/sync` and hands messages to the pipeline.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::pipeline::ModerationPipeline;
use crate::transport::MatrixTransport;

/// Long-poll timeout for `/sync`.
const SYNC_TIMEOUT_MS: u64 = 30_000;

/// Back-off after a failed sync before retrying.
const SYNC_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Receives message events and spawns one handler task per message.
pub struct Bot {
    transport: Arc<MatrixTransport>,
    pipeline: Arc<ModerationPipeline>,
    /// The bot's own user ID; its messages are skipped to avoid loops.
    user_id: String,
}

impl Bot {
    pub fn new(
        transport: Arc<MatrixTransport>,
        pipeline: Arc<ModerationPipeline>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            pipeline,
            user_id: user_id.into(),
        }
    }

    /// Run forever. Fails only if the initial sync (which establishes
    /// the stream position) cannot be completed; afterwards sync errors
    /// are retried with a delay.
    pub async fn run(&self) -> crate::error::Result<()> {
        // The backlog is not moderated — start from the current position.
        let mut since = self.transport.sync_once(None, 0).await?.next_batch;
        info!("Listening for room messages");

        loop {
            match self.transport.sync_once(Some(&since), SYNC_TIMEOUT_MS).await {
                Ok(batch) => {
                    since = batch.next_batch;
                    for event in batch.events {
                        if event.sender == self.user_id {
                            debug!(event = %event.event_id, "Skipping own message");
                            continue;
                        }
                        let pipeline = Arc::clone(&self.pipeline);
                        tokio::spawn(async move {
                            pipeline.handle_message(&event).await;
                        });
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Sync failed; retrying");
                    tokio::time::sleep(SYNC_RETRY_DELAY).await;
                }
            }
        }
    }
}
