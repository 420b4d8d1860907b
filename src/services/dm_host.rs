//! The page hosting the panel: receives emitted events, error notices and
//! scroll requests.

use tokio::sync::mpsc;

use super::dm_types::PanelEvent;

#[cfg_attr(test, mockall::automock)]
pub trait PanelHost: Send + Sync {
    fn emit(&self, event: PanelEvent);

    /// Show a user-facing error notice.
    fn notify_error(&self, message: &str);

    /// Bring the element with `anchor` into view. Returns false when no such
    /// element is rendered.
    fn scroll_into_view(&self, anchor: &str) -> bool;
}

/// Everything a [`ChannelHost`] forwards.
#[derive(Debug, Clone, PartialEq)]
pub enum HostNotice {
    Event(PanelEvent),
    Error(String),
    Scroll(String),
}

/// Host that forwards everything into an unbounded channel.
pub struct ChannelHost {
    tx: mpsc::UnboundedSender<HostNotice>,
}

impl ChannelHost {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HostNotice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, notice: HostNotice) -> bool {
        if self.tx.send(notice).is_err() {
            log::debug!("Host receiver dropped; notice discarded");
            return false;
        }
        true
    }
}

impl PanelHost for ChannelHost {
    fn emit(&self, event: PanelEvent) {
        log::info!("Emitting {}", event.name());
        self.forward(HostNotice::Event(event));
    }

    fn notify_error(&self, message: &str) {
        self.forward(HostNotice::Error(message.to_string()));
    }

    fn scroll_into_view(&self, anchor: &str) -> bool {
        self.forward(HostNotice::Scroll(anchor.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_host_forwards_in_order() {
        let (host, mut rx) = ChannelHost::new();
        host.notify_error("boom");
        host.emit(PanelEvent::PeerSelected {
            peer_key: "ab12".to_string(),
        });
        assert!(host.scroll_into_view("chat-message-index-0"));

        assert_eq!(rx.try_recv().unwrap(), HostNotice::Error("boom".to_string()));
        assert!(matches!(
            rx.try_recv().unwrap(),
            HostNotice::Event(PanelEvent::PeerSelected { .. })
        ));
        assert_eq!(
            rx.try_recv().unwrap(),
            HostNotice::Scroll("chat-message-index-0".to_string())
        );
    }

    #[test]
    fn test_scroll_fails_without_receiver() {
        let (host, rx) = ChannelHost::new();
        drop(rx);
        assert!(!host.scroll_into_view("chat-message-index-3"));
    }
}
