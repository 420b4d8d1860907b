//! Direct-message panel: owns the peer directory and the open conversation,
//! and schedules background peer refreshes.

use futures::FutureExt;
use std::sync::Arc;

use super::admin_provisioner::{AdminProvisioner, ProvisionOutcome};
use super::composer::MessageComposer;
use super::config::PanelSettings;
use super::conversation::ConversationView;
use super::dm_gateway::DmGateway;
use super::dm_host::PanelHost;
use super::dm_types::{DirectMessage, NewMessageEvent, PanelEvent, Peer};
use super::message_classifier::RenderedMessage;
use super::peer_directory::{build_label, PeerDirectory};
use super::refresh_scheduler::{DebouncedAction, Debouncer};
use crate::error::{DmError, Result};

pub struct DirectMessagesPanel {
    is_super: bool,
    host: Arc<dyn PanelHost>,
    directory: Arc<PeerDirectory>,
    conversation: ConversationView,
    composer: MessageComposer,
    provisioner: AdminProvisioner,
    refresher: Debouncer,
}

impl DirectMessagesPanel {
    pub fn new(
        gateway: Arc<dyn DmGateway>,
        host: Arc<dyn PanelHost>,
        settings: &PanelSettings,
    ) -> Self {
        let directory = Arc::new(PeerDirectory::new(gateway.clone(), &settings.account_id));
        let refresher = Debouncer::new(
            settings.refresh_window(),
            refresh_action(directory.clone(), host.clone()),
        );

        Self {
            is_super: settings.is_super,
            conversation: ConversationView::new(
                gateway.clone(),
                host.clone(),
                settings.scroll_delay(),
            ),
            composer: MessageComposer::new(gateway.clone()),
            provisioner: AdminProvisioner::new(gateway),
            directory,
            refresher,
            host,
        }
    }

    fn report(&self, err: &DmError) {
        self.host.notify_error(&err.to_string());
    }

    // ── Lifecycle ──────────────────────────────────────────────

    /// Initial load: fetch peers, restrict non-privileged accounts to the
    /// admin, then open the admin (or the first peer).
    ///
    /// Returns the provisioning outcome for non-privileged accounts.
    pub async fn start(&self) -> Option<ProvisionOutcome> {
        let _ = self.refresh_peers().await;

        let outcome = if self.is_super {
            None
        } else {
            match self.provisioner.reconcile(&self.directory).await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    self.report(&e);
                    Some(ProvisionOutcome::Unavailable)
                }
            }
        };

        let active = match outcome.as_ref().and_then(|o| o.admin_key()) {
            Some(admin) => Some(admin.to_string()),
            None => self.directory.first_key().await,
        };
        log::info!(
            "Direct messages ready, active peer: {}",
            active.as_deref().unwrap_or("<none>")
        );
        let _ = self.set_active_peer(active.as_deref()).await;
        outcome
    }

    /// Stop background work. Safe to call more than once.
    pub fn teardown(&self) {
        self.refresher.cancel();
    }

    // ── Peers ──────────────────────────────────────────────────

    pub async fn refresh_peers(&self) -> Result<()> {
        self.directory.refresh().await.map_err(|e| {
            self.report(&e);
            e
        })
    }

    /// Register a peer, open it and reload the peer list.
    pub async fn add_peer(&self, public_key: &str) -> Result<Peer> {
        let peer = self.directory.add_peer(public_key).await.map_err(|e| {
            self.report(&e);
            e
        })?;
        let _ = self.set_active_peer(Some(&peer.public_key)).await;
        let _ = self.refresh_peers().await;
        Ok(peer)
    }

    pub async fn peers(&self) -> Vec<Peer> {
        self.directory.peers().await
    }

    pub async fn filtered_peers(&self, query: &str) -> Vec<Peer> {
        self.directory.filtered_peers(query).await
    }

    pub async fn peer_labels(&self, query: &str) -> Vec<(String, String)> {
        self.filtered_peers(query)
            .await
            .iter()
            .map(|p| (p.public_key.clone(), build_label(p)))
            .collect()
    }

    /// Number of peers with unread messages.
    pub async fn unread_total(&self) -> usize {
        self.directory.unread_total().await
    }

    // ── Conversation ───────────────────────────────────────────

    /// Set the active peer and load its conversation.
    pub async fn set_active_peer(&self, peer_key: Option<&str>) -> Result<()> {
        self.conversation.switch_peer(peer_key).await.map_err(|e| {
            self.report(&e);
            e
        })
    }

    /// Peer chosen by the host page. An empty key closes the conversation.
    pub async fn set_active_chat_peer(&self, peer_key: &str) -> Result<()> {
        log::debug!("Host selected peer {:?}", peer_key);
        self.set_active_peer(Some(peer_key)).await
    }

    /// Reload the open conversation, then the peer list.
    pub async fn reselect_active_peer(&self) -> Result<()> {
        let active = self.conversation.active_peer().await;
        self.set_active_peer(active.as_deref()).await?;
        self.refresh_peers().await
    }

    pub async fn active_peer(&self) -> Option<String> {
        self.conversation.active_peer().await
    }

    pub async fn messages(&self) -> Vec<DirectMessage> {
        self.conversation.messages().await
    }

    pub async fn rendered_messages(&self) -> Vec<RenderedMessage> {
        self.conversation.rendered_messages().await
    }

    pub async fn raw_message(&self, index: usize) -> Option<String> {
        self.conversation.raw_message(index).await
    }

    /// A message pushed by the backend. Unread counts are refreshed in the
    /// background whether or not it belongs to the open conversation.
    pub async fn handle_new_message(&self, event: NewMessageEvent) {
        if self.conversation.append_incoming(&event).await {
            log::debug!("Accepted pushed message {}", event.message.event_id);
        }
        self.refresher.trigger();
    }

    /// Decode a raw push frame and handle it.
    pub async fn handle_push_frame(&self, frame: &str) -> Result<()> {
        let event = NewMessageEvent::from_push_frame(frame).map_err(|e| {
            log::warn!("Ignoring undecodable push frame: {}", e);
            e
        })?;
        self.handle_new_message(event).await;
        Ok(())
    }

    // ── Composer ───────────────────────────────────────────────

    pub async fn set_draft(&self, text: &str) {
        self.composer.set_draft(text).await;
    }

    pub async fn draft(&self) -> String {
        self.composer.draft().await
    }

    /// Send the draft to the active peer. `Ok(None)` when no peer is open.
    pub async fn send_message(&self) -> Result<Option<DirectMessage>> {
        let Some((peer_key, generation)) = self.conversation.active_selection().await else {
            return Ok(None);
        };

        let stored = self
            .composer
            .send(Some(&peer_key))
            .await
            .map_err(|e| {
                self.report(&e);
                e
            })?;

        if let Some(message) = &stored {
            self.conversation
                .append_confirmed(generation, &peer_key, message.clone())
                .await;
        }
        Ok(stored)
    }

    // ── Host events ────────────────────────────────────────────

    pub fn show_order_details(&self, order_id: &str, event_id: &str) {
        self.host.emit(PanelEvent::OrderSelected {
            order_id: order_id.to_string(),
            event_id: event_id.to_string(),
        });
    }

    /// Ask the host to show orders for the open conversation's peer.
    pub async fn show_client_orders(&self) {
        if let Some(peer_key) = self.conversation.active_peer().await {
            self.host.emit(PanelEvent::PeerSelected { peer_key });
        }
    }
}

impl Drop for DirectMessagesPanel {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn refresh_action(directory: Arc<PeerDirectory>, host: Arc<dyn PanelHost>) -> DebouncedAction {
    Arc::new(move || {
        let directory = directory.clone();
        let host = host.clone();
        async move {
            if let Err(e) = directory.refresh().await {
                host.notify_error(&e.to_string());
            }
        }
        .boxed()
    })
}
