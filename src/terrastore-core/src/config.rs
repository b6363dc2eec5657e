use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Base URLs of the servers, e.g. "http://localhost:8080"
    #[serde(default = "default_hosts")]
    pub hosts: Vec<String>,

    #[serde(default)]
    pub host_policy: HostPolicy,

    /// Idle HTTP connections kept per host
    #[serde(default = "default_max_idle_per_host")]
    pub max_idle_per_host: usize,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How the client picks a server for each request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostPolicy {
    /// Always talk to the first host and let the server route
    #[default]
    Single,
    /// Use the first trusted host; unreachable hosts move to the back
    Ordered,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// EnvFilter directives used when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Directory for rolling JSON log files; console only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Emit console logs as JSON lines
    #[serde(default)]
    pub json: bool,
}

fn default_hosts() -> Vec<String> {
    vec!["http://localhost:8080".to_string()]
}

fn default_max_idle_per_host() -> usize {
    // Ten connections per core, same sizing as the server-side HTTP pools
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        * 10
}

fn default_log_filter() -> String {
    "terrastore=info,terrastore_rs=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            log_dir: None,
            json: false,
        }
    }
}

impl ClientConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        let config: ClientConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.hosts.is_empty() {
            anyhow::bail!("At least one host must be configured");
        }
        if self.max_idle_per_host == 0 {
            anyhow::bail!("max_idle_per_host must be greater than zero");
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            hosts: default_hosts(),
            host_policy: HostPolicy::default(),
            max_idle_per_host: default_max_idle_per_host(),
            logging: LoggingConfig::default(),
        }
    }
}
