//! Configuration for a migration run
//!
//! Handles:
//! - Credentials from the environment (`.env` is loaded by `main`)
//! - Optional TOML settings file for non-secret tuning
//! - API base URLs, retry budgets, export directory and polling

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{MigrateError, Result};

pub const APP_NAME: &str = "Catalyst Center Wireless Floor Maps to Meraki";

/// Credential value that never shows up in logs or summaries
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrateConfig {
    pub cat_center: CatCenterConfig,
    pub meraki: MerakiConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatCenterConfig {
    #[serde(skip)]
    pub base_url: String,
    #[serde(skip)]
    pub username: String,
    #[serde(skip)]
    pub password: Secret,
    /// Appliances usually run with self-signed certificates
    pub verify_tls: bool,
    pub max_retries: u32,
    pub max_backoff_secs: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MerakiConfig {
    pub base_url: String,
    #[serde(skip)]
    pub api_key: Secret,
    #[serde(skip)]
    pub org_id: String,
    /// Retries on 429 rate limiting
    pub max_retries: u32,
    pub request_timeout_secs: u64,
    pub caller: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub dir: PathBuf,
    pub poll_interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for CatCenterConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            password: Secret::default(),
            verify_tls: false,
            max_retries: 5,
            max_backoff_secs: 30,
            request_timeout_secs: 60,
        }
    }
}

impl Default for MerakiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.meraki.com/api/v1".to_string(),
            api_key: Secret::default(),
            org_id: String::new(),
            max_retries: 25,
            request_timeout_secs: 60,
            caller: format!("FloorMapMigrate/{} Cisco", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("map_archive_exports"),
            poll_interval_secs: 5,
            timeout_secs: 600,
        }
    }
}

impl CatCenterConfig {
    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl MerakiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ExportConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl MigrateConfig {
    /// Load settings file (if any) then credentials from the process environment
    pub async fn load() -> Result<Self> {
        let settings = match Self::config_file_path() {
            Some(path) if path.exists() => {
                let content = tokio::fs::read_to_string(&path).await?;
                Self::from_toml(&content)?
            }
            _ => Self::default(),
        };
        settings.with_credentials(|key| std::env::var(key).ok())
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| MigrateError::Config(format!("invalid settings file: {e}")))
    }

    /// Settings file location: `$FLOORMAP_MIGRATE_CONFIG`, else the OS config dir
    pub fn config_file_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("FLOORMAP_MIGRATE_CONFIG") {
            return Some(PathBuf::from(path));
        }
        let mut path = dirs::config_dir()?;
        path.push("floormap-migrate");
        path.push("config.toml");
        Some(path)
    }

    /// Fill credentials through `lookup` (the environment in production)
    pub fn with_credentials<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| MigrateError::Config(format!("{key} is not set")))
        };

        self.cat_center.base_url = base_url_from_host(&required("CAT_CENTER_IP")?);
        self.cat_center.username = required("CAT_CENTER_USERNAME")?;
        self.cat_center.password = Secret::new(required("CAT_CENTER_PASSWORD")?);
        self.meraki.api_key = Secret::new(required("MERAKI_API_KEY")?);
        self.meraki.org_id = required("ORG_ID")?;
        if let Some(url) = lookup("MERAKI_BASE_URL").filter(|v| !v.trim().is_empty()) {
            self.meraki.base_url = url.trim().trim_end_matches('/').to_string();
        }
        Ok(self)
    }
}

impl MigrateConfig {
    /// Print the effective settings, credentials redacted
    pub fn write_summary<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "📋 CONFIGURATION SUMMARY")?;
        writeln!(out, "────────────────────────────────────────")?;
        writeln!(out, "🛰️  Catalyst Center:")?;
        writeln!(out, "   URL: {}", self.cat_center.base_url)?;
        writeln!(out, "   Username: {}", self.cat_center.username)?;
        writeln!(out, "   Password: {}", self.cat_center.password)?;
        writeln!(
            out,
            "   Verify TLS: {}",
            if self.cat_center.verify_tls { "✅ Yes" } else { "❌ No" }
        )?;
        writeln!(out, "☁️  Meraki:")?;
        writeln!(out, "   URL: {}", self.meraki.base_url)?;
        writeln!(out, "   Organization: {}", self.meraki.org_id)?;
        writeln!(out, "   API key: {}", self.meraki.api_key)?;
        writeln!(out, "📦 Exports: {}", self.export.dir.display())?;
        writeln!(out)
    }
}

/// `10.0.0.5` → `https://10.0.0.5`; full URLs are kept as given
fn base_url_from_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env() -> HashMap<&'static str, String> {
        HashMap::from([
            ("CAT_CENTER_IP", "10.10.20.85".to_string()),
            ("CAT_CENTER_USERNAME", "admin".to_string()),
            ("CAT_CENTER_PASSWORD", "C1sco12345".to_string()),
            ("MERAKI_API_KEY", "0123456789abcdef".to_string()),
            ("ORG_ID", "549236".to_string()),
        ])
    }

    #[test]
    fn test_default_config() {
        let config = MigrateConfig::default();
        assert_eq!(config.meraki.max_retries, 25);
        assert_eq!(config.export.poll_interval(), Duration::from_secs(5));
        assert!(!config.cat_center.verify_tls);
    }

    #[test]
    fn test_credentials_from_lookup() {
        let vars = env();
        let config = MigrateConfig::default()
            .with_credentials(|k| vars.get(k).cloned())
            .unwrap();
        assert_eq!(config.cat_center.base_url, "https://10.10.20.85");
        assert_eq!(config.cat_center.password.expose(), "C1sco12345");
        assert_eq!(config.meraki.org_id, "549236");
        assert_eq!(config.meraki.base_url, "https://api.meraki.com/api/v1");
    }

    #[test]
    fn test_missing_credential_is_config_error() {
        let mut vars = env();
        vars.remove("ORG_ID");
        let err = MigrateConfig::default()
            .with_credentials(|k| vars.get(k).cloned())
            .unwrap_err();
        assert!(matches!(err, MigrateError::Config(ref m) if m.contains("ORG_ID")));
    }

    #[test]
    fn test_full_url_host_is_kept() {
        assert_eq!(base_url_from_host("http://127.0.0.1:8443/"), "http://127.0.0.1:8443");
        assert_eq!(base_url_from_host("dnac.example.com"), "https://dnac.example.com");
    }

    #[test]
    fn test_secrets_are_redacted() {
        let vars = env();
        let config = MigrateConfig::default()
            .with_credentials(|k| vars.get(k).cloned())
            .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("C1sco12345"));
        assert!(!debug.contains("0123456789abcdef"));
    }

    #[test]
    fn test_settings_file_overrides_defaults() {
        let config = MigrateConfig::from_toml(
            r#"
            [export]
            dir = "/tmp/exports"
            timeout_secs = 30

            [meraki]
            max_retries = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.export.dir, PathBuf::from("/tmp/exports"));
        assert_eq!(config.export.timeout_secs, 30);
        assert_eq!(config.export.poll_interval_secs, 5);
        assert_eq!(config.meraki.max_retries, 3);
        assert_eq!(config.meraki.base_url, "https://api.meraki.com/api/v1");
    }

    #[test]
    fn test_summary_redacts_credentials() {
        let vars = env();
        let config = MigrateConfig::default()
            .with_credentials(|k| vars.get(k).cloned())
            .unwrap();
        let mut out = Vec::new();
        config.write_summary(&mut out).unwrap();
        let summary = String::from_utf8(out).unwrap();
        assert!(summary.contains("https://10.10.20.85"));
        assert!(summary.contains("549236"));
        assert!(!summary.contains("C1sco12345"));
        assert!(!summary.contains("0123456789abcdef"));
    }

    #[test]
    fn test_invalid_settings_file() {
        assert!(matches!(
            MigrateConfig::from_toml("export = 3"),
            Err(MigrateError::Config(_))
        ));
    }
}
