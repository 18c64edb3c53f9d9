#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::auth::parse_allowed_auth_tokens;

/// Env var names. `MINDWTR_AUTH_TOKENS` is the legacy spelling still set by
/// older deployments; both sources are unioned.
pub const ENV_BIND: &str = "MINDWTR_SYNC_BIND";
pub const ENV_DATA_DIR: &str = "MINDWTR_SYNC_DATA_DIR";
pub const ENV_RATE_WINDOW_MS: &str = "MINDWTR_SYNC_RATE_WINDOW_MS";
pub const ENV_RATE_LIMIT: &str = "MINDWTR_SYNC_RATE_LIMIT";
pub const ENV_ATTACHMENT_RATE_LIMIT: &str = "MINDWTR_SYNC_ATTACHMENT_RATE_LIMIT";
pub const ENV_MAX_BODY_BYTES: &str = "MINDWTR_SYNC_MAX_BODY_BYTES";
pub const ENV_MAX_ATTACHMENT_BYTES: &str = "MINDWTR_SYNC_MAX_ATTACHMENT_BYTES";
pub const ENV_MAX_TITLE_LEN: &str = "MINDWTR_SYNC_MAX_TITLE_LEN";
pub const ENV_AUTH_TOKENS: &str = "MINDWTR_SYNC_AUTH_TOKENS";
pub const ENV_AUTH_TOKENS_LEGACY: &str = "MINDWTR_AUTH_TOKENS";
pub const ENV_CORS_ORIGIN: &str = "MINDWTR_SYNC_CORS_ORIGIN";
pub const ENV_SWEEP_INTERVAL_MS: &str = "MINDWTR_SYNC_SWEEP_INTERVAL_MS";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub data_dir: PathBuf,
    pub rate_window_ms: u64,
    pub route_budget: u32,
    pub attachment_budget: u32,
    pub max_body_bytes: usize,
    pub max_attachment_bytes: usize,
    pub max_title_len: usize,
    /// `None` means no allow-list: any bearer token defines its own
    /// isolated tenant.
    pub allowed_tokens: Option<BTreeSet<String>>,
    /// A fixed, explicitly configured origin, never `*`.
    pub cors_origin: String,
    pub sweep_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            data_dir: PathBuf::from("./data"),
            rate_window_ms: 60_000,
            route_budget: 240,
            attachment_budget: 60,
            max_body_bytes: 4 * 1024 * 1024,
            max_attachment_bytes: 16 * 1024 * 1024,
            max_title_len: 500,
            allowed_tokens: None,
            cors_origin: "http://localhost:5173".to_string(),
            sweep_interval_ms: 60_000,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = ServerConfig::default();
        ServerConfig {
            data_dir: env::var(ENV_DATA_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            rate_window_ms: parse_u64_from_env(ENV_RATE_WINDOW_MS, 1_000..=3_600_000)
                .unwrap_or(defaults.rate_window_ms),
            route_budget: parse_u32_from_env(ENV_RATE_LIMIT, 1..=100_000)
                .unwrap_or(defaults.route_budget),
            attachment_budget: parse_u32_from_env(ENV_ATTACHMENT_RATE_LIMIT, 1..=100_000)
                .unwrap_or(defaults.attachment_budget),
            max_body_bytes: parse_usize_from_env(ENV_MAX_BODY_BYTES, 1024..=256 * 1024 * 1024)
                .unwrap_or(defaults.max_body_bytes),
            max_attachment_bytes: parse_usize_from_env(
                ENV_MAX_ATTACHMENT_BYTES,
                1024..=1024 * 1024 * 1024,
            )
            .unwrap_or(defaults.max_attachment_bytes),
            max_title_len: parse_usize_from_env(ENV_MAX_TITLE_LEN, 1..=10_000)
                .unwrap_or(defaults.max_title_len),
            allowed_tokens: allowed_tokens_from_env(),
            cors_origin: env::var(ENV_CORS_ORIGIN)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty() && v != "*")
                .unwrap_or(defaults.cors_origin),
            sweep_interval_ms: parse_u64_from_env(ENV_SWEEP_INTERVAL_MS, 100..=3_600_000)
                .unwrap_or(defaults.sweep_interval_ms),
        }
    }

    /// Startup gate: the data directory must exist (or be creatable) and be
    /// writable, otherwise the process refuses to start rather than serving
    /// requests it can never persist.
    pub fn ensure_data_dir(&self) -> Result<(), String> {
        fs::create_dir_all(&self.data_dir)
            .map_err(|err| format!("cannot create data dir {}: {err}", self.data_dir.display()))?;
        let probe = self.data_dir.join(".write-probe");
        fs::write(&probe, b"probe")
            .map_err(|err| format!("data dir {} is not writable: {err}", self.data_dir.display()))?;
        fs::remove_file(&probe)
            .map_err(|err| format!("data dir {} is not writable: {err}", self.data_dir.display()))
    }
}

/// Union of the current and legacy auth token lists; `None` when the
/// union is empty (allow-list disabled, token-namespace mode).
pub fn merge_auth_token_sources(current: &str, legacy: &str) -> Option<BTreeSet<String>> {
    let mut merged = parse_allowed_auth_tokens(current).unwrap_or_default();
    if let Some(legacy) = parse_allowed_auth_tokens(legacy) {
        merged.extend(legacy);
    }
    if merged.is_empty() {
        None
    } else {
        Some(merged)
    }
}

pub fn allowed_tokens_from_env() -> Option<BTreeSet<String>> {
    merge_auth_token_sources(
        &env::var(ENV_AUTH_TOKENS).unwrap_or_default(),
        &env::var(ENV_AUTH_TOKENS_LEGACY).unwrap_or_default(),
    )
}

fn parse_u64_from_env(name: &str, range: std::ops::RangeInclusive<u64>) -> Option<u64> {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| range.contains(v))
}

fn parse_u32_from_env(name: &str, range: std::ops::RangeInclusive<u32>) -> Option<u32> {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|v| range.contains(v))
}

fn parse_usize_from_env(name: &str, range: std::ops::RangeInclusive<usize>) -> Option<usize> {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|v| range.contains(v))
}

pub fn bind_addr_from_env() -> String {
    env::var(ENV_BIND).unwrap_or_else(|_| "127.0.0.1:8787".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ServerConfig::default();
        assert!(config.attachment_budget < config.route_budget);
        assert!(config.max_body_bytes < config.max_attachment_bytes);
        assert!(config.allowed_tokens.is_none());
        assert_ne!(config.cors_origin, "*");
    }

    #[test]
    fn auth_token_sources_are_unioned() {
        let merged = merge_auth_token_sources("alpha, beta", "beta,gamma").unwrap();
        assert_eq!(merged.len(), 3);
        assert!(merged.contains("alpha"));
        assert!(merged.contains("beta"));
        assert!(merged.contains("gamma"));

        let current_only = merge_auth_token_sources("alpha", "").unwrap();
        assert_eq!(current_only.len(), 1);
        let legacy_only = merge_auth_token_sources("", "omega").unwrap();
        assert!(legacy_only.contains("omega"));
        assert_eq!(merge_auth_token_sources("", " , "), None);
    }

    #[test]
    fn ensure_data_dir_creates_and_probes() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            data_dir: dir.path().join("deep/nested"),
            ..ServerConfig::default()
        };
        config.ensure_data_dir().unwrap();
        assert!(config.data_dir.is_dir());
        assert!(!config.data_dir.join(".write-probe").exists());
    }
}
