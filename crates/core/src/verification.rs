//! The access verification gate.
//!
//! Privileged note content is released only after the viewer presents the
//! one-time code issued by the external authenticator. The engine never
//! owns the code: it compares against whatever the configured
//! [`CodeIssuer`] accepts. A granted verification is scoped to the current
//! session and is never persisted.
//!
//! No attempt counter or lockout lives here. If rate limiting is wanted it
//! belongs to the issuing collaborator.

use crate::config::CoreConfig;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Outcome of a verification attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verification {
    Granted,
    Denied,
}

/// External authenticator collaborator: the source of truth for the
/// one-time code.
pub trait CodeIssuer: Send + Sync {
    fn matches(&self, code: &str) -> bool;
}

/// Issuer backed by the code resolved into startup configuration.
///
/// Stands in for a real second-factor service; the engine only ever sees
/// the trait.
pub struct StaticCodeIssuer {
    code: String,
}

impl StaticCodeIssuer {
    pub fn from_config(cfg: &CoreConfig) -> Self {
        Self {
            code: cfg.access_code().to_string(),
        }
    }
}

impl CodeIssuer for StaticCodeIssuer {
    fn matches(&self, code: &str) -> bool {
        self.code == code
    }
}

/// The gate itself. Stateless per attempt; a `Denied` outcome carries no
/// side effects and mutates no case state.
#[derive(Clone)]
pub struct VerificationGate {
    issuer: Arc<dyn CodeIssuer>,
}

impl VerificationGate {
    pub fn new(issuer: Arc<dyn CodeIssuer>) -> Self {
        Self { issuer }
    }

    pub fn verify(&self, code: &str) -> Verification {
        if self.issuer.matches(code.trim()) {
            Verification::Granted
        } else {
            Verification::Denied
        }
    }
}

/// In-memory record of which sessions have passed the gate.
///
/// A grant lasts for the remainder of the session and dies with the
/// process; nothing is written to storage.
#[derive(Default)]
pub struct SessionGrants {
    granted: Mutex<HashSet<String>>,
}

impl SessionGrants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, session_id: &str) {
        let mut granted = self.granted.lock().expect("session grant set poisoned");
        granted.insert(session_id.to_string());
    }

    pub fn is_granted(&self, session_id: &str) -> bool {
        let granted = self.granted.lock().expect("session grant set poisoned");
        granted.contains(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(code: &str) -> VerificationGate {
        let cfg = CoreConfig::new("data".into(), code.into(), "cmr.test".into())
            .expect("config should build");
        VerificationGate::new(Arc::new(StaticCodeIssuer::from_config(&cfg)))
    }

    #[test]
    fn configured_code_is_granted() {
        assert_eq!(gate("778899").verify("778899"), Verification::Granted);
    }

    #[test]
    fn any_other_code_is_denied() {
        let gate = gate("778899");
        for wrong in ["778898", "000000", "123456", "", "77889"] {
            assert_eq!(gate.verify(wrong), Verification::Denied);
        }
    }

    #[test]
    fn verify_trims_surrounding_whitespace() {
        assert_eq!(gate("778899").verify(" 778899 "), Verification::Granted);
    }

    #[test]
    fn grants_are_scoped_per_session() {
        let grants = SessionGrants::new();
        assert!(!grants.is_granted("sess-1"));
        grants.grant("sess-1");
        assert!(grants.is_granted("sess-1"));
        assert!(!grants.is_granted("sess-2"));
    }
}
