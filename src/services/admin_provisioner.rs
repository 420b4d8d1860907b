//! Restricts non-privileged accounts to the administrator peer.
//!
//! Runs once at startup. The admin-only peer set is not re-checked after
//! later refreshes.

use std::sync::Arc;

use super::dm_gateway::DmGateway;
use super::dm_types::Peer;
use super::peer_directory::PeerDirectory;
use crate::error::{DmError, Result};

/// What reconciliation has to do to the current peer set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Admin already present.
    Keep,
    /// No peers yet; the admin becomes the only one.
    AddSole,
    /// Peers exist but none is the admin; drop them and add the admin.
    ReplaceAll,
}

pub fn plan(peers: &[Peer], admin_key: &str) -> ReconcileAction {
    if peers.is_empty() {
        ReconcileAction::AddSole
    } else if peers.iter().any(|p| p.public_key == admin_key) {
        ReconcileAction::Keep
    } else {
        ReconcileAction::ReplaceAll
    }
}

/// Result of a provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// Admin known; `action` was applied.
    Reconciled {
        admin_key: String,
        action: ReconcileAction,
    },
    /// The admin identity could not be fetched. The existing peer set was
    /// left as is, so the admin-only restriction is not in force.
    Unavailable,
}

impl ProvisionOutcome {
    pub fn admin_key(&self) -> Option<&str> {
        match self {
            ProvisionOutcome::Reconciled { admin_key, .. } => Some(admin_key),
            ProvisionOutcome::Unavailable => None,
        }
    }
}

pub struct AdminProvisioner {
    gateway: Arc<dyn DmGateway>,
}

impl AdminProvisioner {
    pub fn new(gateway: Arc<dyn DmGateway>) -> Self {
        Self { gateway }
    }

    async fn fetch_admin_key(&self) -> Result<String> {
        let reply = self.gateway.get_admin_key().await?;
        reply
            .key
            .filter(|k| !k.trim().is_empty())
            .ok_or(DmError::AdminKeyMissing)
    }

    /// Fetch the admin identity and reconcile `directory` against it.
    ///
    /// Failing to fetch the admin key is logged and reported as
    /// [`ProvisionOutcome::Unavailable`]. Failing to register the admin peer
    /// is returned as an error with the directory untouched.
    pub async fn reconcile(&self, directory: &PeerDirectory) -> Result<ProvisionOutcome> {
        let admin_key = match self.fetch_admin_key().await {
            Ok(key) => key,
            Err(e) => {
                log::warn!("Admin key unavailable, keeping existing peers: {}", e);
                return Ok(ProvisionOutcome::Unavailable);
            }
        };

        let peers = directory.peers().await;
        let action = plan(&peers, &admin_key);
        log::info!(
            "Admin reconciliation: {} peers, action {:?}",
            peers.len(),
            action
        );

        if action != ReconcileAction::Keep {
            let admin = directory.add_peer(&admin_key).await?;
            directory.replace(vec![admin]).await;
        }

        Ok(ProvisionOutcome::Reconciled { admin_key, action })
    }
}
