use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ── Stored types ───────────────────────────────────────────────

/// Profile metadata published by a peer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeerProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub about: Option<String>,
}

/// A conversation counterpart, identified by its public key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peer {
    pub public_key: String,
    #[serde(default)]
    pub profile: PeerProfile,
    #[serde(rename = "unread_messages", default)]
    pub unread_count: u32,
}

impl Peer {
    pub fn new(public_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            profile: PeerProfile::default(),
            unread_count: 0,
        }
    }

    pub fn has_unread(&self) -> bool {
        self.unread_count > 0
    }
}

/// A direct message as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectMessage {
    /// Backend row id; absent on messages the backend has not persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub event_id: String,
    #[serde(rename = "public_key")]
    pub peer_key: String,
    #[serde(rename = "message")]
    pub body: String,
    /// Unix timestamp in seconds.
    #[serde(rename = "event_created_at")]
    pub created_at: i64,
    #[serde(default)]
    pub incoming: bool,
    #[serde(rename = "type", default = "default_message_type")]
    pub message_type: i32,
}

fn default_message_type() -> i32 {
    -1
}

impl DirectMessage {
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.created_at, 0).single()
    }
}

// ── Wire protocol types ────────────────────────────────────────

/// Body of `POST /message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    #[serde(rename = "message")]
    pub body: String,
    #[serde(rename = "public_key")]
    pub peer_key: String,
    pub event_id: String,
    #[serde(rename = "event_created_at")]
    pub created_at: i64,
}

impl OutgoingMessage {
    /// Build a draft with a fresh event id stamped with the current time.
    pub fn draft(body: &str, peer_key: &str) -> Self {
        Self {
            body: body.to_string(),
            peer_key: peer_key.to_string(),
            event_id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now().timestamp(),
        }
    }
}

/// Body of `POST /peer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPeer {
    pub public_key: String,
    #[serde(rename = "nostracct_id")]
    pub account_id: String,
    #[serde(rename = "unread_messages")]
    pub unread_count: u32,
}

/// Reply of `GET /admin-pubkey`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminKey {
    #[serde(default)]
    pub key: Option<String>,
}

/// A message pushed by the backend outside of any request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessageEvent {
    #[serde(rename = "peerPubkey")]
    pub peer_key: String,
    #[serde(rename = "dm")]
    pub message: DirectMessage,
}

impl NewMessageEvent {
    /// Decode a websocket frame of the form
    /// `{"type": "dm:<n>", "peerPubkey": "...", "dm": {...}}`.
    pub fn from_push_frame(frame: &str) -> Result<Self> {
        Ok(serde_json::from_str(frame)?)
    }
}

// ── Host events ────────────────────────────────────────────────

/// Events the panel emits to its hosting page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum PanelEvent {
    #[serde(rename_all = "camelCase")]
    OrderSelected { order_id: String, event_id: String },
    #[serde(rename_all = "camelCase")]
    PeerSelected { peer_key: String },
}

impl PanelEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PanelEvent::OrderSelected { .. } => "order-selected",
            PanelEvent::PeerSelected { .. } => "peer-selected",
        }
    }
}
