use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::conversation::DEFAULT_SCROLL_DELAY;
use super::refresh_scheduler::DEFAULT_REFRESH_WINDOW;
use crate::error::{DmError, Result};

const ENV_PREFIX: &str = "NOSTRCHAT";

/// Settings for the direct-message panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelSettings {
    /// Wallet host, e.g. `https://wallet.example`.
    pub base_url: String,
    /// Nostr account the panel acts for.
    pub account_id: String,
    /// Read-only API key.
    pub invoice_key: String,
    /// Write API key.
    pub admin_key: String,
    /// Privileged accounts may talk to any peer.
    pub is_super: bool,
    pub refresh_debounce_ms: u64,
    pub scroll_delay_ms: u64,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            account_id: String::new(),
            invoice_key: String::new(),
            admin_key: String::new(),
            is_super: false,
            refresh_debounce_ms: DEFAULT_REFRESH_WINDOW.as_millis() as u64,
            scroll_delay_ms: DEFAULT_SCROLL_DELAY.as_millis() as u64,
        }
    }
}

impl PanelSettings {
    /// Default settings file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("nostrchat").join("panel.toml"))
            .unwrap_or_else(|| PathBuf::from(".nostrchat/panel.toml"))
    }

    /// Layer the optional TOML file, then `NOSTRCHAT_*` variables, over the
    /// defaults. Missing keys fall back to `Default`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);

        let settings: PanelSettings = config::Config::builder()
            .add_source(config::File::from(path.as_path()).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        log::info!(
            "Loaded panel settings: base_url={}, account={}, super={}",
            settings.base_url,
            settings.account_id,
            settings.is_super
        );
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DmError::Config(format!("Create config dir: {}", e)))?;
        }
        let data = toml::to_string_pretty(self)
            .map_err(|e| DmError::Config(format!("Serialize settings: {}", e)))?;
        std::fs::write(path, data)
            .map_err(|e| DmError::Config(format!("Write settings: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(DmError::Config("base_url is empty".to_string()));
        }
        if self.invoice_key.trim().is_empty() || self.admin_key.trim().is_empty() {
            return Err(DmError::Config("API keys are not configured".to_string()));
        }
        Ok(())
    }

    pub fn refresh_window(&self) -> Duration {
        Duration::from_millis(self.refresh_debounce_ms)
    }

    pub fn scroll_delay(&self) -> Duration {
        Duration::from_millis(self.scroll_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = PanelSettings::default();
        assert_eq!(settings.refresh_window(), Duration::from_millis(2000));
        assert_eq!(settings.scroll_delay(), Duration::from_millis(100));
        assert!(!settings.is_super);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let settings = PanelSettings::load(Some(&tmp.path().join("absent.toml"))).unwrap();
        assert_eq!(settings.refresh_debounce_ms, 2000);
    }

    #[test]
    fn test_save_and_reload() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("panel.toml");

        let settings = PanelSettings {
            base_url: "https://wallet.example".to_string(),
            account_id: "acct-1".to_string(),
            invoice_key: "inkey".to_string(),
            admin_key: "adminkey".to_string(),
            is_super: true,
            refresh_debounce_ms: 500,
            scroll_delay_ms: 50,
        };
        settings.save(&path).unwrap();

        let loaded = PanelSettings::load(Some(&path)).unwrap();
        assert_eq!(loaded.base_url, "https://wallet.example");
        assert_eq!(loaded.account_id, "acct-1");
        assert!(loaded.is_super);
        assert_eq!(loaded.refresh_debounce_ms, 500);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("panel.toml");
        std::fs::write(&path, "account_id = \"acct-2\"\n").unwrap();

        let loaded = PanelSettings::load(Some(&path)).unwrap();
        assert_eq!(loaded.account_id, "acct-2");
        assert_eq!(loaded.scroll_delay_ms, 100);
    }

    #[test]
    fn test_validate() {
        let mut settings = PanelSettings::default();
        assert!(matches!(settings.validate(), Err(DmError::Config(_))));

        settings.invoice_key = "inkey".to_string();
        settings.admin_key = "adminkey".to_string();
        assert!(settings.validate().is_ok());

        settings.base_url = " ".to_string();
        assert!(settings.validate().is_err());
    }
}
