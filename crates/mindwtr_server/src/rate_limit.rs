#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::Mutex;

/// Fixed-window request counter, keyed by `tenant:METHOD:route`. State is
/// owned by the server instance and the caller supplies `now_ms`, so
/// window expiry is deterministically testable and multiple servers can
/// coexist in one process without cross-contamination.
#[derive(Debug)]
pub struct RateLimiter {
    window_ms: u64,
    route_budget: u32,
    attachment_budget: u32,
    windows: Mutex<HashMap<String, Window>>,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after_secs: u64 },
}

/// Collapses item-identifier segments so `/v1/tasks/{anyId}` and its
/// `complete`/`archive` shortcuts each count as one route regardless of the
/// concrete id. Everything else is used verbatim.
pub fn to_rate_limit_route(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("/v1/tasks/") {
        if rest.is_empty() {
            return path.to_string();
        }
        return match rest.split_once('/') {
            None => "/v1/tasks/:id".to_string(),
            Some((_, action)) if action == "complete" || action == "archive" => {
                "/v1/tasks/:id/:action".to_string()
            }
            Some(_) => path.to_string(),
        };
    }
    path.to_string()
}

fn is_attachment_route(path: &str) -> bool {
    path == "/v1/attachments" || path.starts_with("/v1/attachments/")
}

impl RateLimiter {
    pub fn new(window_ms: u64, route_budget: u32, attachment_budget: u32) -> Self {
        RateLimiter {
            window_ms,
            route_budget,
            attachment_budget,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Counts one request against the window for this key and decides.
    /// Rejected requests still count; only window expiry resets the budget.
    pub fn check(&self, tenant_key: &str, method: &str, path: &str, now_ms: u64) -> RateDecision {
        let route = to_rate_limit_route(path);
        let budget = if is_attachment_route(path) {
            self.attachment_budget
        } else {
            self.route_budget
        };
        let key = format!("{tenant_key}:{method}:{route}");

        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let window = windows.entry(key).or_insert(Window {
            count: 0,
            reset_at_ms: now_ms + self.window_ms,
        });
        if now_ms > window.reset_at_ms {
            window.count = 0;
            window.reset_at_ms = now_ms + self.window_ms;
        }
        window.count += 1;
        if window.count > budget {
            // ceil(remaining / 1000); exactly at the reset boundary the
            // guidance is 0, i.e. retry immediately.
            let remaining_ms = window.reset_at_ms.saturating_sub(now_ms);
            RateDecision::Limited {
                retry_after_secs: remaining_ms.div_ceil(1000),
            }
        } else {
            RateDecision::Allowed
        }
    }

    /// Drops strictly expired windows. Runs under the same lock as
    /// `check`, so a sweep can never race a concurrent increment.
    pub fn sweep(&self, now_ms: u64) -> usize {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let before = windows.len();
        windows.retain(|_, window| now_ms <= window.reset_at_ms);
        before - windows.len()
    }

    #[cfg(test)]
    fn tracked_windows(&self) -> usize {
        self.windows.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
