//! Tenant session registry
//!
//! Process-wide, in-memory map from user identity to tenant credentials.
//! Sessions carry the credential token and offline dataset reference across
//! the asynchronous client/server boundary: a driver registers them on one
//! gateway call, and a later call (possibly a different endpoint) resolves
//! them by project.
//!
//! Lifetime: process-wide, no TTL, no eviction. Last write wins per user —
//! re-registering a user under a new project makes the old project
//! unresolvable through that user.
//!
//! All mutation goes through an `RwLock`; the registry is shared mutable
//! state touched by concurrent requests.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// One tenant's registered credentials
///
/// The token never serializes into registry dumps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantSession {
    pub user: String,
    pub project: String,
    #[serde(skip_serializing, default)]
    pub token: String,
    pub offline_dataset: Option<String>,
}

/// Tenant identity threaded explicitly through the execution path
///
/// Built at the gateway boundary from the request body or a registry lookup,
/// and passed as a parameter into every downstream call. Never stored in
/// process environment or other global state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub project: String,
    pub user: Option<String>,
    pub token: Option<String>,
    pub offline_dataset: Option<String>,
}

impl TenantContext {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            user: None,
            token: None,
            offline_dataset: None,
        }
    }

    pub fn from_session(session: &TenantSession) -> Self {
        Self {
            project: session.project.clone(),
            user: Some(session.user.clone()),
            token: Some(session.token.clone()),
            offline_dataset: session.offline_dataset.clone(),
        }
    }
}

/// Process-wide session registry, keyed by user
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, TenantSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or overwrite) a user's session
    pub fn put(&self, session: TenantSession) {
        let mut sessions = self.sessions.write().expect("session registry poisoned");
        sessions.insert(session.user.clone(), session);
    }

    /// Look up a session by user
    pub fn get(&self, user: &str) -> Option<TenantSession> {
        let sessions = self.sessions.read().expect("session registry poisoned");
        sessions.get(user).cloned()
    }

    /// Look up a session by project
    ///
    /// Linear scan over all sessions — O(n) in the number of registered
    /// users, which stays small at expected tenant counts.
    pub fn get_by_project(&self, project: &str) -> Option<TenantSession> {
        let sessions = self.sessions.read().expect("session registry poisoned");
        sessions.values().find(|s| s.project == project).cloned()
    }

    /// Remove a user's session
    pub fn delete(&self, user: &str) -> Option<TenantSession> {
        let mut sessions = self.sessions.write().expect("session registry poisoned");
        sessions.remove(user)
    }

    /// Snapshot of all registered sessions, keyed by user
    pub fn list(&self) -> HashMap<String, TenantSession> {
        let sessions = self.sessions.read().expect("session registry poisoned");
        sessions.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(user: &str, project: &str) -> TenantSession {
        TenantSession {
            user: user.to_string(),
            project: project.to_string(),
            token: "tok".to_string(),
            offline_dataset: Some("warehouse".to_string()),
        }
    }

    #[test]
    fn test_put_get() {
        let registry = SessionRegistry::new();
        registry.put(session("alice", "fraud"));
        let found = registry.get("alice").unwrap();
        assert_eq!(found.project, "fraud");
    }

    #[test]
    fn test_get_by_project() {
        let registry = SessionRegistry::new();
        registry.put(session("alice", "fraud"));
        registry.put(session("bob", "ranking"));
        assert_eq!(registry.get_by_project("ranking").unwrap().user, "bob");
        assert!(registry.get_by_project("unknown").is_none());
    }

    #[test]
    fn test_last_write_wins_across_projects() {
        let registry = SessionRegistry::new();
        registry.put(session("u", "p1"));
        registry.put(session("u", "p2"));

        assert!(registry.get_by_project("p1").is_none());
        assert_eq!(registry.get_by_project("p2").unwrap().user, "u");
    }

    #[test]
    fn test_delete() {
        let registry = SessionRegistry::new();
        registry.put(session("alice", "fraud"));
        assert!(registry.delete("alice").is_some());
        assert!(registry.get("alice").is_none());
        assert!(registry.delete("alice").is_none());
    }

    #[test]
    fn test_list_snapshot() {
        let registry = SessionRegistry::new();
        registry.put(session("alice", "fraud"));
        registry.put(session("bob", "ranking"));
        let all = registry.list();
        assert_eq!(all.len(), 2);
        assert!(all.contains_key("alice"));
    }

    #[test]
    fn test_token_is_redacted_in_dumps() {
        let json = serde_json::to_value(session("alice", "fraud")).unwrap();
        assert!(json.get("token").is_none());
        assert_eq!(json["user"], "alice");
    }
}
