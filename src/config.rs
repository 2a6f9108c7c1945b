// =============================================================================
// Server Configuration
// =============================================================================
//
// Every setting the backend reads at startup: listen address, request
// defaults, and market-data provider settings. Loaded once from JSON, then
// overridden from the environment, then handed to the router as immutable
// state.
//
// All fields carry `#[serde(default)]` so a partial (or empty) config file
// still loads.
// =============================================================================

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_ticker() -> String {
    "AAPL".to_string()
}

fn default_days() -> u32 {
    365
}

fn default_base_url() -> String {
    "https://query2.finance.yahoo.com".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0 Safari/537.36"
        .to_string()
}

fn default_true() -> bool {
    true
}

// =============================================================================
// ProviderConfig
// =============================================================================

/// Settings for the Yahoo Finance chart client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Scheme and host of the chart API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Yahoo rejects requests without a browser-like agent.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Use split/dividend-adjusted closes when the provider supplies them.
    #[serde(default = "default_true")]
    pub auto_adjust: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            auto_adjust: true,
        }
    }
}

// =============================================================================
// ServerConfig
// =============================================================================

/// Top-level configuration for the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind. `0.0.0.0` listens on all interfaces.
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Ticker used when a request omits `ticker`.
    #[serde(default = "default_ticker")]
    pub default_ticker: String,

    /// Look-back used when a request omits `days`.
    #[serde(default = "default_days")]
    pub default_days: u32,

    #[serde(default)]
    pub provider: ProviderConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            default_ticker: default_ticker(),
            default_days: default_days(),
            provider: ProviderConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// A missing file is an error so the caller can fall back to defaults
    /// with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read server config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse server config from {}", path.display()))?;

        info!(
            path = %path.display(),
            port = config.port,
            default_ticker = %config.default_ticker,
            "server config loaded"
        );

        Ok(config)
    }

    /// Apply environment overrides on top of the loaded values.
    ///
    /// `PORT` is what hosting platforms set; `AURALENS_HOST` and
    /// `AURALENS_PROVIDER_URL` cover local setups.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = lookup("PORT") {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got '{port}'"))?;
        }
        if let Some(host) = lookup("AURALENS_HOST").filter(|h| !h.trim().is_empty()) {
            self.host = host.trim().to_string();
        }
        if let Some(url) = lookup("AURALENS_PROVIDER_URL").filter(|u| !u.trim().is_empty()) {
            self.provider.base_url = url.trim().to_string();
        }
        Ok(())
    }

    /// Socket address built from `host` and `port`.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}
