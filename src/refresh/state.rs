//! Refresh lifecycle state

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshState {
    /// Created, no fetch attempted yet
    PendingFirstFetch,
    /// First fetch failed transiently; no data yet
    Retrying,
    /// At least one fetch succeeded; serving the last good data
    Active,
    /// Terminal; polling stopped
    Failed,
}

impl RefreshState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshState::PendingFirstFetch => "pending_first_fetch",
            RefreshState::Retrying => "retrying",
            RefreshState::Active => "active",
            RefreshState::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshStatus {
    pub state: RefreshState,
    pub last_update_success: bool,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl RefreshStatus {
    pub(crate) fn new() -> Self {
        Self {
            state: RefreshState::PendingFirstFetch,
            last_update_success: false,
            consecutive_failures: 0,
            last_error: None,
            last_success_at: None,
            last_attempt_at: None,
        }
    }

    pub(crate) fn record_success(&mut self, at: DateTime<Utc>) {
        self.state = RefreshState::Active;
        self.last_update_success = true;
        self.consecutive_failures = 0;
        self.last_error = None;
        self.last_success_at = Some(at);
        self.last_attempt_at = Some(at);
    }

    /// Record a transient failure; `limit` caps consecutive failures before giving up
    pub(crate) fn record_transient(
        &mut self,
        at: DateTime<Utc>,
        error: String,
        limit: Option<u32>,
    ) {
        self.last_update_success = false;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_error = Some(error);
        self.last_attempt_at = Some(at);

        self.state = match self.state {
            RefreshState::Failed => RefreshState::Failed,
            _ if limit.is_some_and(|max| self.consecutive_failures > max) => RefreshState::Failed,
            RefreshState::PendingFirstFetch | RefreshState::Retrying => RefreshState::Retrying,
            RefreshState::Active => RefreshState::Active,
        };
    }

    pub(crate) fn record_fatal(&mut self, at: DateTime<Utc>, error: String) {
        self.state = RefreshState::Failed;
        self.last_update_success = false;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_error = Some(error);
        self.last_attempt_at = Some(at);
    }
}
