use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub seed_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub default_radius_km: f64,
    pub max_radius_km: f64,
    pub max_batch_size: usize,
    pub default_currency: String,
    /// Bearer token to store id, for store-staff submissions.
    pub store_tokens: HashMap<String, i64>,
    /// Bearer tokens granting administrative identity.
    pub admin_tokens: HashSet<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("seed_path", &self.seed_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("default_radius_km", &self.default_radius_km)
            .field("max_radius_km", &self.max_radius_km)
            .field("max_batch_size", &self.max_batch_size)
            .field("default_currency", &self.default_currency)
            .field("store_tokens", &format!("[{} redacted]", self.store_tokens.len()))
            .field("admin_tokens", &format!("[{} redacted]", self.admin_tokens.len()))
            .finish()
    }
}
