//! The authorization matrix.
//!
//! One static table decides what each role may do to each resource type.
//! Every mutating request is checked here before it reaches the store, and
//! read handlers consult the same table, so permission logic has exactly
//! one source of truth.
//!
//! Per-note visibility is a separate concern: the matrix answers "may this
//! role act on notes at all", the visibility resolver answers "may this
//! viewer see this particular note's content".

use crate::error::{CaseError, CaseResult};
use crate::model::Role;
use std::fmt;

/// What a caller is attempting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Create,
    Edit,
    View,
    Answer,
    Share,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Create => "create",
            Action::Edit => "edit",
            Action::View => "view",
            Action::Answer => "answer",
            Action::Share => "share",
        };
        f.write_str(s)
    }
}

/// What the action targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Case,
    Document,
    ExternalUpload,
    Assessment,
    Report,
    Note,
    InfoRequest,
    Milestone,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Case => "case",
            ResourceKind::Document => "document",
            ResourceKind::ExternalUpload => "external upload",
            ResourceKind::Assessment => "assessment",
            ResourceKind::Report => "report",
            ResourceKind::Note => "note",
            ResourceKind::InfoRequest => "info request",
            ResourceKind::Milestone => "milestone",
        };
        f.write_str(s)
    }
}

/// The matrix itself: `(role, action, resource) -> allowed`.
///
/// Notes are append-only, so `Edit` on `Note` is false for every role.
/// External contributors hold upload-scoped access only: they can append
/// documents and uploads but see nothing.
pub fn can_perform(role: Role, action: Action, resource: ResourceKind) -> bool {
    use Action::*;
    use ResourceKind::*;

    match role {
        Role::Psychologist => match action {
            Create => !matches!(resource, ExternalUpload),
            Edit => matches!(resource, Case | Document | Assessment | Report | Milestone),
            View => true,
            Answer => false,
            Share => matches!(resource, Note),
        },
        Role::Lawyer => match action {
            Create => matches!(resource, Case | Document | Note | InfoRequest | Milestone),
            Edit => matches!(resource, Case | Document | Milestone),
            View => true,
            Answer => false,
            Share => matches!(resource, Note),
        },
        Role::Claimant => match action {
            Create => false,
            Edit => false,
            View => matches!(
                resource,
                Case | Document | Assessment | Note | InfoRequest | Milestone
            ),
            Answer => matches!(resource, InfoRequest),
            Share => false,
        },
        Role::ExternalContributor => match action {
            Create => matches!(resource, Document | ExternalUpload),
            _ => false,
        },
    }
}

/// Checks the matrix and raises `CaseError::Authorization` on denial.
/// Called before any store mutation so a denied request changes nothing.
pub fn authorize(role: Role, action: Action, resource: ResourceKind) -> CaseResult<()> {
    if can_perform(role, action, resource) {
        Ok(())
    } else {
        Err(CaseError::Authorization {
            role,
            action,
            resource,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn psychologist_creates_clinical_records() {
        assert!(can_perform(Role::Psychologist, Action::Create, ResourceKind::Note));
        assert!(can_perform(Role::Psychologist, Action::Create, ResourceKind::Assessment));
        assert!(can_perform(Role::Psychologist, Action::Create, ResourceKind::Report));
        assert!(can_perform(Role::Psychologist, Action::Edit, ResourceKind::Report));
    }

    #[test]
    fn lawyer_views_reports_and_writes_notes_but_not_assessments() {
        assert!(can_perform(Role::Lawyer, Action::View, ResourceKind::Report));
        assert!(can_perform(Role::Lawyer, Action::Create, ResourceKind::Note));
        assert!(!can_perform(Role::Lawyer, Action::Create, ResourceKind::Assessment));
        assert!(!can_perform(Role::Lawyer, Action::Edit, ResourceKind::Report));
    }

    #[test]
    fn claimant_can_only_answer_info_requests() {
        assert!(can_perform(Role::Claimant, Action::Answer, ResourceKind::InfoRequest));
        for resource in [
            ResourceKind::Case,
            ResourceKind::Document,
            ResourceKind::Assessment,
            ResourceKind::Report,
            ResourceKind::Note,
            ResourceKind::InfoRequest,
            ResourceKind::Milestone,
        ] {
            assert!(!can_perform(Role::Claimant, Action::Create, resource));
            assert!(!can_perform(Role::Claimant, Action::Edit, resource));
        }
        assert!(!can_perform(Role::Claimant, Action::View, ResourceKind::Report));
    }

    #[test]
    fn external_contributor_appends_uploads_and_sees_nothing() {
        assert!(can_perform(
            Role::ExternalContributor,
            Action::Create,
            ResourceKind::ExternalUpload
        ));
        assert!(can_perform(
            Role::ExternalContributor,
            Action::Create,
            ResourceKind::Document
        ));
        assert!(!can_perform(Role::ExternalContributor, Action::View, ResourceKind::Case));
        assert!(!can_perform(Role::ExternalContributor, Action::View, ResourceKind::Note));
    }

    #[test]
    fn notes_are_append_only_for_every_role() {
        for role in [
            Role::Psychologist,
            Role::Lawyer,
            Role::Claimant,
            Role::ExternalContributor,
        ] {
            assert!(!can_perform(role, Action::Edit, ResourceKind::Note));
        }
    }

    #[test]
    fn authorize_raises_on_denial() {
        let err = authorize(Role::Claimant, Action::Create, ResourceKind::Note)
            .expect_err("claimant cannot create notes");
        assert!(matches!(err, CaseError::Authorization { .. }));
    }
}
