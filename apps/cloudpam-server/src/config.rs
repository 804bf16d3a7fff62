//! Layered configuration: `config/default.yaml`, overridden by a file
//! named on the command line, overridden by `CLOUDPAM_*` environment
//! variables. Precedence and provider order follow the teacher's
//! `figment` usage in its workspace dependencies.

use std::path::PathBuf;

use clap::Parser;
use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(name = "cloudpam-server", version, about = "CloudPAM IPAM service")]
pub struct Args {
    /// Path to a YAML config file, merged over the built-in defaults.
    #[arg(long, short, default_value = "config/default.yaml")]
    pub config: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Memory,
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub backend: Backend,
    /// SQLite file path or Postgres DSN; unused for the memory backend.
    pub dsn: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub login_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminBootstrapConfig {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub namespace: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    pub auto_approve_agents: bool,
    pub llm_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub listen_address: String,
    pub database: DatabaseConfig,
    pub rate_limit: RateLimitConfig,
    pub trusted_proxies: Vec<String>,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
    pub admin: AdminBootstrapConfig,
    pub discovery: DiscoveryConfig,
    /// Whether the session cookie gets the `Secure` attribute. `false` for
    /// plain-HTTP local runs, `true` behind a TLS-terminating proxy.
    pub cookie_secure: bool,
}

impl Config {
    pub fn load(path: &PathBuf) -> figment::Result<Self> {
        Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("CLOUDPAM_").split("__"))
            .extract()
    }
}
