use serde::{Serialize, Serializer};
use thiserror::Error;

/// Errors surfaced by the direct-message panel.
#[derive(Debug, Error)]
pub enum DmError {
    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Backend returned HTTP {status}: {detail}")]
    Api { status: u16, detail: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No active peer selected")]
    NoActivePeer,

    #[error("Backend did not return an admin public key")]
    AdminKeyMissing,
}

impl From<reqwest::Error> for DmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            DmError::Decode(e.to_string())
        } else {
            DmError::Gateway(e.to_string())
        }
    }
}

impl From<serde_json::Error> for DmError {
    fn from(e: serde_json::Error) -> Self {
        DmError::Decode(e.to_string())
    }
}

impl From<config::ConfigError> for DmError {
    fn from(e: config::ConfigError) -> Self {
        DmError::Config(e.to_string())
    }
}

// Hosts receive errors as plain strings.
impl Serialize for DmError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = DmError::Api {
            status: 404,
            detail: "Peer not found".to_string(),
        };
        assert_eq!(err.to_string(), "Backend returned HTTP 404: Peer not found");
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&DmError::NoActivePeer).unwrap();
        assert_eq!(json, "\"No active peer selected\"");
    }

    #[test]
    fn test_json_error_maps_to_decode() {
        let err: DmError = serde_json::from_str::<serde_json::Value>("not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, DmError::Decode(_)));
    }
}
