//! Environment-driven configuration
//!
//! All knobs come from the process environment; there is no config file.
//! Unset or unparsable values fall back to their defaults.

use std::time::Duration;

/// TLS expectations; termination itself happens in front of the gateway
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub enabled: bool,
    pub cert_path: String,
    pub key_path: String,
}

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub tls: TlsConfig,
    pub backend_endpoint: String,
    pub backend_timeout: Duration,
    pub rate_rps: u32,
    pub rate_burst: u32,
    pub credential_ttl_s: i64,
    pub verify_cache_ttl: Duration,
    pub return_private_key: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env_parse("SERVER_PORT", 8443),
            tls: TlsConfig {
                enabled: env_bool("TLS_ENABLED", false),
                cert_path: env_str("TLS_CERT_PATH", "/etc/certs/server.crt"),
                key_path: env_str("TLS_KEY_PATH", "/etc/certs/server.key"),
            },
            backend_endpoint: env_str("BACKEND_ENDPOINT", "http://localhost:5000"),
            backend_timeout: Duration::from_secs(env_parse("BACKEND_TIMEOUT_S", 60u64)),
            rate_rps: env_parse("RATE_RPS", 100),
            rate_burst: env_parse("RATE_BURST", 50),
            credential_ttl_s: env_parse("CREDENTIAL_TTL_S", 3600),
            verify_cache_ttl: Duration::from_secs(env_parse("VERIFY_CACHE_TTL_S", 300u64)),
            return_private_key: env_bool("RETURN_PRIVATE_KEY", false),
        }
    }
}

impl Default for Config {
    /// Defaults without consulting the environment; used by tests
    fn default() -> Self {
        Self {
            port: 8443,
            tls: TlsConfig {
                enabled: false,
                cert_path: "/etc/certs/server.crt".into(),
                key_path: "/etc/certs/server.key".into(),
            },
            backend_endpoint: "http://localhost:5000".into(),
            backend_timeout: Duration::from_secs(60),
            rate_rps: 100,
            rate_burst: 50,
            credential_ttl_s: 3600,
            verify_cache_ttl: Duration::from_secs(300),
            return_private_key: false,
        }
    }
}

fn env_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.as_str(), "true" | "1" | "yes"),
        Err(_) => default,
    }
}
