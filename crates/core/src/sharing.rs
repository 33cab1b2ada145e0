//! Sharing of privileged note content with an external recipient.
//!
//! The engine's responsibility ends at producing a [`ShareGrant`]: an audit
//! record that consent was given and the gate re-verified. Actual
//! transmission is handed to the [`Notifier`] collaborator.

use crate::error::{CaseError, CaseResult};
use crate::model::{Note, ShareGrant};
use crate::verification::{Verification, VerificationGate};
use chrono::Utc;
use cmr_types::EmailAddress;

/// Notification/email collaborator. Receives the grant and the note to
/// transmit; delivery failures are the collaborator's to report.
pub trait Notifier: Send + Sync {
    fn deliver(&self, grant: &ShareGrant, note: &Note) -> CaseResult<()>;
}

/// Default notifier: records the handoff in the log. Useful for
/// development and as the wiring point for a real email service.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn deliver(&self, grant: &ShareGrant, note: &Note) -> CaseResult<()> {
        tracing::info!(
            note_id = %note.id,
            recipient = %grant.recipient,
            granted_by = %grant.granted_by,
            "share grant handed to notification service"
        );
        Ok(())
    }
}

/// Authorizes sharing a note's content with an external recipient.
///
/// Consent and recipient identity are validated first, then the gate is
/// consulted again: a share always re-verifies, even within an already
/// verified session.
///
/// # Errors
///
/// - `CaseError::Validation` if consent was not given or the recipient is
///   missing/invalid. Checked before the code so a missing consent never
///   burns a verification attempt.
/// - `CaseError::Verification` if the gate denies the code.
pub fn share_note(
    gate: &VerificationGate,
    note: &Note,
    granted_by: &str,
    recipient: &str,
    consent: bool,
    code: &str,
) -> CaseResult<ShareGrant> {
    if !consent {
        return Err(CaseError::Validation(
            "sharing requires explicit consent".into(),
        ));
    }
    if recipient.trim().is_empty() {
        return Err(CaseError::Validation("recipient is required".into()));
    }
    let recipient = EmailAddress::new(recipient)?;

    if gate.verify(code) == Verification::Denied {
        return Err(CaseError::Verification);
    }

    Ok(ShareGrant {
        granted_by: granted_by.to_string(),
        recipient,
        consent,
        verified: true,
        granted_at: Utc::now(),
    })
}
