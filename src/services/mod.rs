// Service layer - direct-message panel and its backend seam

pub mod admin_provisioner;
pub mod composer;
pub mod config;
pub mod conversation;
pub mod dm_gateway;
pub mod dm_host;
pub mod dm_panel;
pub mod dm_types;
pub mod message_classifier;
pub mod peer_directory;
pub mod refresh_scheduler;

pub use admin_provisioner::{AdminProvisioner, ProvisionOutcome, ReconcileAction};
pub use composer::MessageComposer;
pub use config::PanelSettings;
pub use conversation::ConversationView;
pub use dm_gateway::{DmGateway, HttpGateway};
pub use dm_host::{ChannelHost, HostNotice, PanelHost};
pub use dm_panel::DirectMessagesPanel;
pub use message_classifier::{classify, MessageContent, RenderedMessage};
pub use peer_directory::PeerDirectory;
pub use refresh_scheduler::Debouncer;
