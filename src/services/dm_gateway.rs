//! Backend gateway for the direct-message API.
//!
//! The panel only talks to the [`DmGateway`] trait; [`HttpGateway`] is the
//! LNbits-style HTTP implementation used by the binary.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::config::PanelSettings;
use super::dm_types::{AdminKey, DirectMessage, NewPeer, OutgoingMessage, Peer};
use crate::error::{DmError, Result};

const API_PREFIX: &str = "nostrchat/api/v1";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DmGateway: Send + Sync {
    async fn list_peers(&self) -> Result<Vec<Peer>>;
    async fn list_messages(&self, peer_key: &str) -> Result<Vec<DirectMessage>>;
    async fn send_message(&self, message: OutgoingMessage) -> Result<DirectMessage>;
    async fn add_peer(&self, peer: NewPeer) -> Result<Peer>;
    async fn get_admin_key(&self) -> Result<AdminKey>;
}

/// Which of the account's two API keys a request is signed with.
#[derive(Debug, Clone, Copy, PartialEq)]
enum KeyScope {
    Read,
    Write,
}

pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    invoice_key: String,
    admin_key: String,
}

impl HttpGateway {
    pub fn new(base_url: &str, invoice_key: &str, admin_key: &str) -> Result<Self> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| DmError::Config(format!("Invalid base URL '{}': {}", base_url, e)))?;

        // No timeout: a hung request only blocks its own operation.
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| DmError::Gateway(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            invoice_key: invoice_key.to_string(),
            admin_key: admin_key.to_string(),
        })
    }

    pub fn from_settings(settings: &PanelSettings) -> Result<Self> {
        Self::new(
            &settings.base_url,
            &settings.invoice_key,
            &settings.admin_key,
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, API_PREFIX, path)
    }

    fn api_key(&self, scope: KeyScope) -> &str {
        match scope {
            KeyScope::Read => &self.invoice_key,
            KeyScope::Write => &self.admin_key,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .client
            .get(self.url(path))
            .header("X-Api-Key", self.api_key(KeyScope::Read))
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let resp = self
            .client
            .post(self.url(path))
            .header("X-Api-Key", self.api_key(KeyScope::Write))
            .json(body)
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DmError::Api {
                status: status.as_u16(),
                detail: error_detail(&body, status.canonical_reason()),
            });
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl DmGateway for HttpGateway {
    async fn list_peers(&self) -> Result<Vec<Peer>> {
        self.get("peer").await
    }

    async fn list_messages(&self, peer_key: &str) -> Result<Vec<DirectMessage>> {
        self.get(&format!("message/{}", urlencoding::encode(peer_key)))
            .await
    }

    async fn send_message(&self, message: OutgoingMessage) -> Result<DirectMessage> {
        self.post("message", &message).await
    }

    async fn add_peer(&self, peer: NewPeer) -> Result<Peer> {
        self.post("peer", &peer).await
    }

    async fn get_admin_key(&self) -> Result<AdminKey> {
        self.get("admin-pubkey").await
    }
}

/// Pull a human-readable reason out of an error reply.
fn error_detail(body: &str, fallback: Option<&str>) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: serde_json::Value,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(s),
        }) => s,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => fallback.unwrap_or("request failed").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_base_url() {
        let result = HttpGateway::new("not a url", "inkey", "adminkey");
        assert!(matches!(result, Err(DmError::Config(_))));
    }

    #[test]
    fn test_url_building() {
        let gateway = HttpGateway::new("https://wallet.example/", "inkey", "adminkey").unwrap();
        assert_eq!(
            gateway.url("peer"),
            "https://wallet.example/nostrchat/api/v1/peer"
        );
    }

    #[test]
    fn test_key_scopes() {
        let gateway = HttpGateway::new("https://wallet.example", "inkey", "adminkey").unwrap();
        assert_eq!(gateway.api_key(KeyScope::Read), "inkey");
        assert_eq!(gateway.api_key(KeyScope::Write), "adminkey");
    }

    #[test]
    fn test_error_detail_string() {
        assert_eq!(
            error_detail(r#"{"detail": "Peer not found."}"#, Some("Not Found")),
            "Peer not found."
        );
    }

    #[test]
    fn test_error_detail_structured() {
        let detail = error_detail(r#"{"detail": [{"msg": "field required"}]}"#, None);
        assert!(detail.contains("field required"));
    }

    #[test]
    fn test_error_detail_fallbacks() {
        assert_eq!(error_detail("boom", None), "boom");
        assert_eq!(error_detail("", Some("Bad Gateway")), "Bad Gateway");
        assert_eq!(error_detail("  ", None), "request failed");
    }
}
