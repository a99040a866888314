//! Configuration management for askubed.
//!
//! Loads settings from /etc/askube/config.toml or uses defaults. Environment
//! variables override the file for the two client endpoints so a dev cluster
//! can be pointed at without editing config.

use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// System-wide config file path
pub const CONFIG_PATH: &str = "/etc/askube/config.toml";

/// Fallback path for running out of a checkout
pub const LOCAL_CONFIG_PATH: &str = "askube.toml";

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address; loopback only by default
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Whole-request timeout applied at the router layer
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_bind_addr() -> String {
    "127.0.0.1:7870".to_string()
}

fn default_request_timeout() -> u64 {
    120 // covers two model calls plus one apiserver round trip
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Language-model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model used for both synthesis and formatting
    #[serde(default = "default_model")]
    pub model: String,

    /// Ollama API endpoint
    #[serde(default = "default_ollama_url")]
    pub endpoint: String,

    /// Synthesizer call timeout in seconds
    #[serde(default = "default_synthesizer_timeout")]
    pub synthesizer_timeout_secs: u64,

    /// Formatter call timeout in seconds
    #[serde(default = "default_formatter_timeout")]
    pub formatter_timeout_secs: u64,

    /// Output bound for the synthesized descriptor
    #[serde(default = "default_synthesis_tokens")]
    pub max_synthesis_tokens: u32,

    /// Output bound for the formatted answer
    #[serde(default = "default_answer_tokens")]
    pub max_answer_tokens: u32,

    /// Sampling temperature; kept low so descriptors stay reproducible
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_model() -> String {
    "qwen2.5:7b-instruct".to_string()
}

fn default_ollama_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_synthesizer_timeout() -> u64 {
    30
}

fn default_formatter_timeout() -> u64 {
    30
}

fn default_synthesis_tokens() -> u32 {
    150
}

fn default_answer_tokens() -> u32 {
    100
}

fn default_temperature() -> f32 {
    0.3
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: default_ollama_url(),
            synthesizer_timeout_secs: default_synthesizer_timeout(),
            formatter_timeout_secs: default_formatter_timeout(),
            max_synthesis_tokens: default_synthesis_tokens(),
            max_answer_tokens: default_answer_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Kubernetes API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// API server base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bearer token file (service account token); KUBE_TOKEN overrides
    #[serde(default)]
    pub token_path: Option<String>,

    /// PEM bundle for the cluster CA
    #[serde(default)]
    pub ca_path: Option<String>,

    /// Accept untrusted certificates; only sensible against a local dev cluster
    #[serde(default)]
    pub insecure_skip_tls_verify: bool,

    /// Per-call timeout for apiserver requests
    #[serde(default = "default_cluster_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://127.0.0.1:6443".to_string()
}

fn default_cluster_timeout() -> u64 {
    10
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token_path: None,
            ca_path: None,
            insecure_skip_tls_verify: false,
            request_timeout_secs: default_cluster_timeout(),
        }
    }
}

/// Top-level daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub cluster: ClusterConfig,
}

impl Config {
    /// Load config from the first readable path, then apply env overrides.
    /// Falls back to defaults so the daemon always starts.
    pub fn load() -> Self {
        let mut candidates: Vec<String> = Vec::new();
        if let Ok(path) = std::env::var("ASKUBE_CONFIG") {
            candidates.push(path);
        }
        candidates.push(CONFIG_PATH.to_string());
        candidates.push(LOCAL_CONFIG_PATH.to_string());

        let mut config = Config::default();
        for candidate in &candidates {
            let path = Path::new(candidate);
            if !path.exists() {
                continue;
            }
            match Self::load_from(path) {
                Ok(loaded) => {
                    info!("Loaded config from {}", candidate);
                    config = loaded;
                    break;
                }
                Err(e) => {
                    warn!("Failed to load config from {}: {}", candidate, e);
                }
            }
        }

        config.apply_env_overrides();
        config
    }

    fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("KUBE_API_URL") {
            self.cluster.api_url = url;
        }
        if let Ok(url) = std::env::var("OLLAMA_URL") {
            self.llm.endpoint = url;
        }
    }
}
