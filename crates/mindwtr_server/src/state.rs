#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::{HeaderMap, Method};
use mindwtr_contracts::{validate_app_data, AppDocument};
use mindwtr_storage::{load_document_value, save_document, AttachmentStore};

use crate::auth::{bearer_token, is_authorized_token, token_to_key};
use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::rate_limit::{RateDecision, RateLimiter};
use crate::write_lock::WriteLocks;

/// Everything one server instance owns: configuration, rate-limit windows,
/// and the per-tenant write locks. No process-wide globals, so several
/// instances can coexist in tests without cross-contamination.
#[derive(Debug)]
pub struct AppState {
    pub config: ServerConfig,
    pub rate_limiter: RateLimiter,
    pub write_locks: WriteLocks,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let rate_limiter = RateLimiter::new(
            config.rate_window_ms,
            config.route_budget,
            config.attachment_budget,
        );
        AppState {
            config,
            rate_limiter,
            write_locks: WriteLocks::new(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    /// The auth-then-rate-limit gate every protected route passes through.
    /// Order matters: a missing or unauthorized credential fails before any
    /// rate-limit or storage work happens.
    pub fn gate(
        &self,
        headers: &HeaderMap,
        method: &Method,
        concrete_path: &str,
    ) -> Result<String, ApiError> {
        let token = bearer_token(headers).ok_or(ApiError::Unauthorized)?;
        if !is_authorized_token(&token, self.config.allowed_tokens.as_ref()) {
            return Err(ApiError::Unauthorized);
        }
        let tenant_key = token_to_key(&token);
        match self
            .rate_limiter
            .check(&tenant_key, method.as_str(), concrete_path, self.now_ms())
        {
            RateDecision::Allowed => Ok(tenant_key),
            RateDecision::Limited { retry_after_secs } => {
                Err(ApiError::RateLimited { retry_after_secs })
            }
        }
    }

    pub fn document_path(&self, tenant_key: &str) -> PathBuf {
        self.config.data_dir.join(format!("{tenant_key}.json"))
    }

    pub fn attachment_store(&self, tenant_key: &str) -> AttachmentStore {
        AttachmentStore::new(self.config.data_dir.join("attachments").join(tenant_key))
    }

    /// Loads the tenant document as raw JSON (synthesizing the empty
    /// workspace for a fresh tenant) and runs the structural gate. A file
    /// that parses but fails validation is a server-side integrity
    /// problem, so mutations refuse to proceed rather than clobber it.
    pub fn load_checked_document(&self, tenant_key: &str) -> Result<AppDocument, ApiError> {
        let value = load_document_value(&self.document_path(tenant_key));
        validate_app_data(&value)
            .map_err(|violation| ApiError::Internal(format!("stored document corrupt: {violation}")))?;
        serde_json::from_value(value)
            .map_err(|err| ApiError::Internal(format!("stored document corrupt: {err}")))
    }

    pub fn save_tenant_document(
        &self,
        tenant_key: &str,
        document: &AppDocument,
    ) -> Result<(), ApiError> {
        save_document(&self.document_path(tenant_key), document).map_err(ApiError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn state_with_dir() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            data_dir: dir.path().to_path_buf(),
            ..ServerConfig::default()
        };
        (AppState::new(config), dir)
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn gate_rejects_missing_credentials_before_counting() {
        let (state, _dir) = state_with_dir();
        let err = state
            .gate(&HeaderMap::new(), &Method::GET, "/v1/tasks")
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[test]
    fn gate_derives_a_stable_tenant_key() {
        let (state, _dir) = state_with_dir();
        let a = state.gate(&bearer("tok"), &Method::GET, "/v1/tasks").unwrap();
        let b = state.gate(&bearer("tok"), &Method::GET, "/v1/tasks").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn allow_list_mode_rejects_unknown_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            data_dir: dir.path().to_path_buf(),
            allowed_tokens: crate::auth::parse_allowed_auth_tokens("alpha,beta"),
            ..ServerConfig::default()
        };
        let state = AppState::new(config);
        assert!(state.gate(&bearer("alpha"), &Method::GET, "/v1/tasks").is_ok());
        assert!(matches!(
            state.gate(&bearer("gamma"), &Method::GET, "/v1/tasks"),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn fresh_tenant_loads_an_empty_valid_document() {
        let (state, _dir) = state_with_dir();
        let doc = state.load_checked_document("f".repeat(64).as_str()).unwrap();
        assert!(doc.tasks.is_empty());
        assert!(doc.projects.is_empty());
    }

    #[test]
    fn structurally_corrupt_documents_surface_as_internal_errors() {
        let (state, _dir) = state_with_dir();
        let key = "a".repeat(64);
        std::fs::write(
            state.document_path(&key),
            r#"{"tasks": 42, "projects": []}"#,
        )
        .unwrap();
        let err = state.load_checked_document(&key).unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
