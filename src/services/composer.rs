use std::sync::Arc;
use tokio::sync::RwLock;

use super::dm_gateway::DmGateway;
use super::dm_types::{DirectMessage, OutgoingMessage};
use crate::error::Result;

/// Draft text and submission of outgoing messages.
pub struct MessageComposer {
    gateway: Arc<dyn DmGateway>,
    draft: RwLock<String>,
}

impl MessageComposer {
    pub fn new(gateway: Arc<dyn DmGateway>) -> Self {
        Self {
            gateway,
            draft: RwLock::new(String::new()),
        }
    }

    pub async fn set_draft(&self, text: &str) {
        *self.draft.write().await = text.to_string();
    }

    pub async fn draft(&self) -> String {
        self.draft.read().await.clone()
    }

    /// Submit the draft to `peer_key`.
    ///
    /// Returns `Ok(None)` without contacting the backend when no peer is
    /// active. On success the backend's copy of the message is returned and
    /// the draft is cleared; on failure the draft is kept for a manual retry.
    pub async fn send(&self, peer_key: Option<&str>) -> Result<Option<DirectMessage>> {
        let Some(peer_key) = peer_key.filter(|k| !k.is_empty()) else {
            log::debug!("Send ignored: no active peer");
            return Ok(None);
        };

        let text = self.draft.read().await.clone();
        let outgoing = OutgoingMessage::draft(&text, peer_key);
        let event_id = outgoing.event_id.clone();

        let stored = self.gateway.send_message(outgoing).await.map_err(|e| {
            log::error!("Failed to send message {} to {}: {}", event_id, peer_key, e);
            e
        })?;

        log::info!("Message {} to {} persisted", stored.event_id, peer_key);
        self.draft.write().await.clear();
        Ok(Some(stored))
    }
}
