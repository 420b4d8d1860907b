use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::services::{
    ChannelHost, DirectMessagesPanel, DmGateway, HostNotice, HttpGateway, PanelHost,
    PanelSettings,
};

/// Global application state for the console front end
pub struct AppState {
    pub panel: Arc<DirectMessagesPanel>,
}

impl AppState {
    /// Build the panel against the configured backend. Host notices are
    /// delivered through the returned receiver.
    pub fn new(settings: PanelSettings) -> Result<(Self, mpsc::UnboundedReceiver<HostNotice>)> {
        settings.validate()?;

        let gateway: Arc<dyn DmGateway> = Arc::new(HttpGateway::from_settings(&settings)?);
        let (host, notices) = ChannelHost::new();
        let host: Arc<dyn PanelHost> = Arc::new(host);

        log::info!(
            "Initializing direct messages for account {} at {} (super: {})",
            settings.account_id,
            settings.base_url,
            settings.is_super
        );

        let panel = Arc::new(DirectMessagesPanel::new(gateway, host, &settings));
        Ok((Self { panel }, notices))
    }
}
