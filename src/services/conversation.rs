//! Active conversation: which peer is open and its loaded history.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::dm_gateway::DmGateway;
use super::dm_host::PanelHost;
use super::dm_types::{DirectMessage, NewMessageEvent};
use super::message_classifier::RenderedMessage;
use crate::error::Result;

pub const DEFAULT_SCROLL_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Default)]
struct ConversationState {
    active_peer: Option<String>,
    messages: Vec<DirectMessage>,
    /// Bumped on every peer switch; results issued under an older value are dropped.
    generation: u64,
    /// Generation whose history `messages` holds. Behind `generation` while a load is in flight.
    loaded: Option<u64>,
    /// Messages for the active peer that arrived before its history did.
    pending: Vec<DirectMessage>,
}

impl ConversationState {
    fn is_current(&self, generation: u64, peer_key: &str) -> bool {
        self.generation == generation && self.active_peer.as_deref() == Some(peer_key)
    }

    fn is_loaded(&self) -> bool {
        self.loaded == Some(self.generation)
    }

    /// Install a freshly loaded history, then replay anything buffered during the load.
    fn install(&mut self, messages: Vec<DirectMessage>) {
        self.messages = messages;
        for message in std::mem::take(&mut self.pending) {
            if !self.messages.iter().any(|m| m.event_id == message.event_id) {
                self.messages.push(message);
            }
        }
        self.loaded = Some(self.generation);
    }

    /// Append to the loaded list, or buffer until the history arrives.
    /// Returns the index of the appended message.
    fn accept(&mut self, message: DirectMessage) -> Option<usize> {
        if self.is_loaded() {
            self.messages.push(message);
            Some(self.messages.len() - 1)
        } else {
            self.pending.push(message);
            None
        }
    }
}

pub struct ConversationView {
    gateway: Arc<dyn DmGateway>,
    host: Arc<dyn PanelHost>,
    scroll_delay: Duration,
    state: RwLock<ConversationState>,
}

impl ConversationView {
    pub fn new(
        gateway: Arc<dyn DmGateway>,
        host: Arc<dyn PanelHost>,
        scroll_delay: Duration,
    ) -> Self {
        Self {
            gateway,
            host,
            scroll_delay,
            state: RwLock::new(ConversationState::default()),
        }
    }

    /// Make `peer_key` the active conversation and load its history.
    ///
    /// `None` or an empty key clears the conversation without any request.
    /// A failed fetch leaves the current messages in place.
    pub async fn switch_peer(&self, peer_key: Option<&str>) -> Result<()> {
        let peer_key = match peer_key.filter(|k| !k.is_empty()) {
            Some(k) => k.to_string(),
            None => {
                let mut state = self.state.write().await;
                state.generation += 1;
                state.active_peer = None;
                state.messages.clear();
                state.pending.clear();
                state.loaded = Some(state.generation);
                return Ok(());
            }
        };

        let generation = {
            let mut state = self.state.write().await;
            state.generation += 1;
            state.active_peer = Some(peer_key.clone());
            state.pending.clear();
            state.generation
        };

        let messages = self.gateway.list_messages(&peer_key).await.map_err(|e| {
            log::error!("Failed to load messages for {}: {}", peer_key, e);
            e
        })?;

        let mut state = self.state.write().await;
        if !state.is_current(generation, &peer_key) {
            log::debug!(
                "Discarding stale history for {} (generation {} superseded by {})",
                peer_key,
                generation,
                state.generation
            );
            return Ok(());
        }
        let buffered = state.pending.len();
        state.install(messages);
        if buffered > 0 {
            log::debug!("Replayed {} messages received while loading {}", buffered, peer_key);
        }
        let last = state.messages.len().checked_sub(1);
        drop(state);

        if let Some(index) = last {
            self.schedule_scroll(index);
        }
        Ok(())
    }

    /// Accept a pushed message if it belongs to the open conversation.
    ///
    /// While that conversation's history is still loading the message is held
    /// back and shown once the history lands.
    pub async fn append_incoming(&self, event: &NewMessageEvent) -> bool {
        let mut state = self.state.write().await;
        if state.active_peer.as_deref() != Some(event.peer_key.as_str()) {
            return false;
        }
        let appended = state.accept(event.message.clone());
        drop(state);

        if let Some(index) = appended {
            self.schedule_scroll(index);
        }
        true
    }

    /// Accept a message the backend confirmed, unless the user has since
    /// moved to another conversation.
    pub async fn append_confirmed(
        &self,
        generation: u64,
        peer_key: &str,
        message: DirectMessage,
    ) -> bool {
        let mut state = self.state.write().await;
        if !state.is_current(generation, peer_key) {
            log::debug!("Sent message for {} confirmed after switching away", peer_key);
            return false;
        }
        let appended = state.accept(message);
        drop(state);

        if let Some(index) = appended {
            self.schedule_scroll(index);
        }
        true
    }

    pub async fn active_peer(&self) -> Option<String> {
        self.state.read().await.active_peer.clone()
    }

    /// Active peer together with the generation it was selected under.
    pub async fn active_selection(&self) -> Option<(String, u64)> {
        let state = self.state.read().await;
        state
            .active_peer
            .clone()
            .map(|peer| (peer, state.generation))
    }

    pub async fn messages(&self) -> Vec<DirectMessage> {
        self.state.read().await.messages.clone()
    }

    pub async fn rendered_messages(&self) -> Vec<RenderedMessage> {
        self.state
            .read()
            .await
            .messages
            .iter()
            .map(RenderedMessage::from)
            .collect()
    }

    /// Stored body of the message at `index`, untouched by classification.
    pub async fn raw_message(&self, index: usize) -> Option<String> {
        self.state
            .read()
            .await
            .messages
            .get(index)
            .map(|m| m.body.clone())
    }

    /// After the delay, ask the host to bring message `index` into view.
    pub fn schedule_scroll(&self, index: usize) {
        let host = self.host.clone();
        let delay = self.scroll_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let anchor = message_anchor(index);
            if !host.scroll_into_view(&anchor) {
                log::debug!("Scroll target {} not rendered", anchor);
            }
        });
    }
}

/// Render anchor of the message at `index`.
pub fn message_anchor(index: usize) -> String {
    format!("chat-message-index-{}", index)
}
