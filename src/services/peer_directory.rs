use std::sync::Arc;
use tokio::sync::RwLock;

use super::dm_gateway::DmGateway;
use super::dm_types::{NewPeer, Peer};
use crate::error::Result;

#[derive(Debug, Default)]
struct DirectoryState {
    peers: Vec<Peer>,
    unread_total: usize,
}

impl DirectoryState {
    fn replace(&mut self, peers: Vec<Peer>) {
        self.unread_total = count_unread(&peers);
        self.peers = peers;
    }
}

/// The account's peer list as last reported by the backend.
pub struct PeerDirectory {
    gateway: Arc<dyn DmGateway>,
    account_id: String,
    state: RwLock<DirectoryState>,
}

impl PeerDirectory {
    pub fn new(gateway: Arc<dyn DmGateway>, account_id: &str) -> Self {
        Self {
            gateway,
            account_id: account_id.to_string(),
            state: RwLock::new(DirectoryState::default()),
        }
    }

    /// Fetch the peer list and replace the local copy wholesale.
    /// On failure the previous list is kept.
    pub async fn refresh(&self) -> Result<()> {
        let peers = self.gateway.list_peers().await.map_err(|e| {
            log::error!("Failed to fetch peers: {}", e);
            e
        })?;

        let mut state = self.state.write().await;
        state.replace(peers);
        log::debug!(
            "Peer list refreshed: {} peers, {} with unread messages",
            state.peers.len(),
            state.unread_total
        );
        Ok(())
    }

    /// Register a new peer with the backend. The local list is left alone;
    /// callers refresh once the peer is selected.
    pub async fn add_peer(&self, public_key: &str) -> Result<Peer> {
        let request = NewPeer {
            public_key: public_key.to_string(),
            account_id: self.account_id.clone(),
            unread_count: 0,
        };
        let peer = self.gateway.add_peer(request).await.map_err(|e| {
            log::error!("Failed to add peer {}: {}", public_key, e);
            e
        })?;
        log::info!("Added peer {}", peer.public_key);
        Ok(peer)
    }

    /// Overwrite the local list without contacting the backend.
    pub async fn replace(&self, peers: Vec<Peer>) {
        self.state.write().await.replace(peers);
    }

    pub async fn peers(&self) -> Vec<Peer> {
        self.state.read().await.peers.clone()
    }

    /// Number of peers with at least one unread message.
    pub async fn unread_total(&self) -> usize {
        self.state.read().await.unread_total
    }

    pub async fn first_key(&self) -> Option<String> {
        self.state
            .read()
            .await
            .peers
            .first()
            .map(|p| p.public_key.clone())
    }

    pub async fn filtered_peers(&self, query: &str) -> Vec<Peer> {
        filter_peers(&self.state.read().await.peers, query)
    }
}

fn count_unread(peers: &[Peer]) -> usize {
    peers.iter().filter(|p| p.has_unread()).count()
}

/// Case-insensitive match on name or public key. An empty query keeps everything.
pub fn filter_peers(peers: &[Peer], query: &str) -> Vec<Peer> {
    if query.is_empty() {
        return peers.to_vec();
    }
    let needle = query.to_lowercase();
    peers
        .iter()
        .filter(|peer| {
            let name = peer.profile.name.as_deref().unwrap_or("").to_lowercase();
            name.contains(&needle) || peer.public_key.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

/// One-line label: name, about, unread badge and the key fingerprint.
pub fn build_label(peer: &Peer) -> String {
    let mut label = format!(
        "{} {}",
        peer.profile.name.as_deref().unwrap_or("unknown"),
        peer.profile.about.as_deref().unwrap_or("")
    );
    if peer.unread_count > 0 {
        label.push_str(&format!("[new: {}]", peer.unread_count));
    }
    label.push_str(&format!("  ({})", key_fingerprint(&peer.public_key)));
    label
}

/// First 16 and last 16 characters of a key, joined by `...`.
pub fn key_fingerprint(public_key: &str) -> String {
    let chars: Vec<char> = public_key.chars().collect();
    let head: String = chars.iter().take(16).collect();
    let tail: String = chars[chars.len().saturating_sub(16)..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DmError;
    use crate::services::dm_gateway::MockDmGateway;
    use crate::services::dm_types::PeerProfile;
    use mockall::predicate::eq;
    use tokio_test::{assert_err, assert_ok};

    const KEY_A: &str = "ab12ab12ab12ab12ab12ab12ab12ab12ab12ab12ab12ab12ab12ab12ab12ab12";
    const KEY_B: &str = "cd34cd34cd34cd34cd34cd34cd34cd34cd34cd34cd34cd34cd34cd34cd34cd34";

    fn peer(key: &str, name: Option<&str>, unread: u32) -> Peer {
        Peer {
            public_key: key.to_string(),
            profile: PeerProfile {
                name: name.map(str::to_string),
                about: None,
            },
            unread_count: unread,
        }
    }

    #[tokio::test]
    async fn test_refresh_replaces_and_counts_peers_with_unread() {
        let mut gateway = MockDmGateway::new();
        gateway.expect_list_peers().times(1).returning(|| {
            Ok(vec![
                peer("k1", Some("a"), 5),
                peer("k2", Some("b"), 0),
                peer("k3", Some("c"), 1),
            ])
        });
        let directory = PeerDirectory::new(Arc::new(gateway), "acct");
        directory.replace(vec![peer("old", None, 0)]).await;

        assert_ok!(directory.refresh().await);

        // Two peers have something new; the sum would have been 6.
        assert_eq!(directory.unread_total().await, 2);
        let keys: Vec<_> = directory
            .peers()
            .await
            .into_iter()
            .map(|p| p.public_key)
            .collect();
        assert_eq!(keys, vec!["k1", "k2", "k3"]);
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_previous_state() {
        let mut gateway = MockDmGateway::new();
        gateway
            .expect_list_peers()
            .times(1)
            .returning(|| Err(DmError::Gateway("offline".to_string())));
        let directory = PeerDirectory::new(Arc::new(gateway), "acct");
        directory.replace(vec![peer("k1", None, 2)]).await;

        assert_err!(directory.refresh().await);
        assert_eq!(directory.peers().await.len(), 1);
        assert_eq!(directory.unread_total().await, 1);
    }

    #[tokio::test]
    async fn test_add_peer_submits_zero_unread_and_leaves_list() {
        let mut gateway = MockDmGateway::new();
        gateway
            .expect_add_peer()
            .with(eq(NewPeer {
                public_key: KEY_A.to_string(),
                account_id: "acct".to_string(),
                unread_count: 0,
            }))
            .times(1)
            .returning(|req| Ok(Peer::new(req.public_key)));
        let directory = PeerDirectory::new(Arc::new(gateway), "acct");

        let added = directory.add_peer(KEY_A).await.unwrap();
        assert_eq!(added.public_key, KEY_A);
        assert!(directory.peers().await.is_empty());
    }

    #[tokio::test]
    async fn test_add_peer_failure() {
        let mut gateway = MockDmGateway::new();
        gateway.expect_add_peer().returning(|_| {
            Err(DmError::Api {
                status: 400,
                detail: "bad key".to_string(),
            })
        });
        let directory = PeerDirectory::new(Arc::new(gateway), "acct");
        directory.replace(vec![peer("k1", None, 0)]).await;

        assert_err!(directory.add_peer("zz").await);
        assert_eq!(directory.peers().await.len(), 1);
    }

    #[test]
    fn test_filter_empty_query_keeps_order() {
        let peers = vec![peer(KEY_B, Some("Bob"), 0), peer(KEY_A, Some("Alice"), 0)];
        assert_eq!(filter_peers(&peers, ""), peers);
    }

    #[test]
    fn test_filter_by_name_case_insensitive() {
        let peers = vec![peer(KEY_A, Some("Alice"), 0), peer(KEY_B, Some("Bob"), 0)];
        let hits = filter_peers(&peers, "AL");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].profile.name.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_filter_by_key() {
        let peers = vec![
            peer(KEY_A, Some("Alice"), 0),
            peer(KEY_B, None, 0),
            peer("EF56", None, 0),
        ];
        let hits = filter_peers(&peers, "cd34");
        assert_eq!(hits, vec![peer(KEY_B, None, 0)]);

        let hits = filter_peers(&peers, "ef5");
        assert_eq!(hits[0].public_key, "EF56");
    }

    #[test]
    fn test_filter_no_match() {
        let peers = vec![peer(KEY_A, Some("Alice"), 0)];
        assert!(filter_peers(&peers, "zzz").is_empty());
    }

    #[test]
    fn test_build_label_with_unread() {
        let mut p = peer(KEY_A, Some("Alice"), 3);
        p.profile.about = Some("merchant".to_string());
        assert_eq!(
            build_label(&p),
            "Alice merchant[new: 3]  (ab12ab12ab12ab12...ab12ab12ab12ab12)"
        );
    }

    #[test]
    fn test_build_label_unknown_no_badge() {
        let p = peer(KEY_B, None, 0);
        assert_eq!(
            build_label(&p),
            "unknown   (cd34cd34cd34cd34...cd34cd34cd34cd34)"
        );
    }

    #[test]
    fn test_key_fingerprint_short_key() {
        assert_eq!(key_fingerprint("abc"), "abc...abc");
    }
}
