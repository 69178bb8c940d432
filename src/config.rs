use serde::Deserialize;
use std::path::PathBuf;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Redis connection URL for the remote list documents.
    /// When unset, an in-process document store is used instead.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Directory holding the on-device copy of the lists
    #[serde(default = "default_local_store_dir")]
    pub local_store_dir: PathBuf,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Signed-in user to load on startup; guest session when unset
    #[serde(default)]
    pub session_user_id: Option<String>,

    /// Maximum number of toasts kept visible at once
    #[serde(default = "default_toast_limit")]
    pub toast_limit: usize,

    /// Seconds before a toast expires
    #[serde(default = "default_toast_ttl_secs")]
    pub toast_ttl_secs: u64,
}

fn default_local_store_dir() -> PathBuf {
    PathBuf::from(".cinelist")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_toast_limit() -> usize {
    3
}

fn default_toast_ttl_secs() -> u64 {
    5
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from an explicit set of variables
    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars).map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Address the HTTP server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
