//! Per-viewer response shaping.
//!
//! Builds wire DTOs from domain values. This is where the read-side policy
//! is applied: reports are omitted for roles the matrix does not allow to
//! view them, and note content is withheld unless the viewer is eligible
//! and, for private notes, the session has passed the verification gate.

use api_shared::dto::{
    AssessmentRes, CaseRes, CaseSummaryRes, ContributorRes, DocumentRes, ExternalUploadRes,
    InfoRequestRes, MilestoneRes, NoteViewRes, ParticipantsRes, ReportRes, ShareNoteRes,
    TimelineEntryRes, TimelineRes,
};
use cmr_core::model::{
    Assessment, Case, CaseSummary, Document, ExternalUpload, InfoRequest, Milestone, Note, Report,
    Role, ShareGrant,
};
use cmr_core::timeline::TimelineEntry;
use cmr_core::{authz, milestones, progress, visibility};

/// Reason strings for withheld note content.
const WITHHELD_NOT_VISIBLE: &str = "not_visible";
const WITHHELD_VERIFICATION: &str = "verification_required";

pub fn case_view(case: &Case, viewer: Role, session_verified: bool) -> CaseRes {
    let reports = if authz::can_perform(viewer, authz::Action::View, authz::ResourceKind::Report) {
        Some(case.reports.iter().map(report_view).collect())
    } else {
        None
    };

    CaseRes {
        id: case.id.simple().to_string(),
        claimant_name: case.claimant_name.to_string(),
        case_type: case.case_type.to_string(),
        status: case.status.as_str().to_string(),
        created_date: case.created_date.to_rfc3339(),
        expiry_date: case.expiry_date.to_rfc3339(),
        category_tags: case.category_tags.clone(),
        participants: ParticipantsRes {
            claimant: case.participants.claimant.clone(),
            psychologist: case.participants.psychologist.clone(),
            lawyer: case.participants.lawyer.clone(),
            others: case
                .participants
                .others
                .iter()
                .map(|c| ContributorRes {
                    id: c.id.simple().to_string(),
                    role: c.role.as_str().to_string(),
                    email: c.email.to_string(),
                })
                .collect(),
        },
        current_stage: case.current_stage.clone(),
        completed_stages: case.completed_stages.clone(),
        practice: case.practice.clone(),
        revision: case.revision,
        progress: progress::progress(case),
        documents: case.documents.iter().map(document_view).collect(),
        assessments: case.assessments.iter().map(assessment_view).collect(),
        reports,
        notes: case
            .notes
            .iter()
            .map(|n| note_view(n, viewer, session_verified))
            .collect(),
        external_uploads: case.external_uploads.iter().map(upload_view).collect(),
        info_requests: case.info_requests.iter().map(info_request_view).collect(),
        milestones: case
            .milestones
            .iter()
            .map(|m| milestone_view(case, m))
            .collect(),
    }
}

/// Renders a note for one viewer. Content is released only when the
/// canonical visibility rule passes and, for private notes, the session
/// has been verified.
pub fn note_view(note: &Note, viewer: Role, session_verified: bool) -> NoteViewRes {
    let (content, withheld) = if !visibility::is_visible(note, viewer) {
        (None, Some(WITHHELD_NOT_VISIBLE.to_string()))
    } else if visibility::requires_verification(note) && !session_verified {
        (None, Some(WITHHELD_VERIFICATION.to_string()))
    } else {
        (Some(note.content.to_string()), None)
    };

    NoteViewRes {
        id: note.id.simple().to_string(),
        created_by: note.created_by.clone(),
        created_at: note.created_at.to_rfc3339(),
        is_private: note.is_private,
        visible_to: note
            .visible_to
            .iter()
            .map(|r| r.as_str().to_string())
            .collect(),
        kind: note.kind.as_str().to_string(),
        content,
        withheld,
    }
}

pub fn document_view(doc: &Document) -> DocumentRes {
    DocumentRes {
        id: doc.id.simple().to_string(),
        name: doc.name.to_string(),
        uploaded_by: doc.uploaded_by.clone(),
        upload_date: doc.upload_date.to_rfc3339(),
        size: doc.size,
        tags: doc.tags.clone(),
    }
}

pub fn assessment_view(assessment: &Assessment) -> AssessmentRes {
    AssessmentRes {
        id: assessment.id.simple().to_string(),
        title: assessment.title.to_string(),
        status: assessment.status.as_str().to_string(),
        completion_percentage: assessment.completion_percentage,
        results: assessment.results.clone(),
        date: assessment.date.map(|d| d.to_rfc3339()),
    }
}

pub fn report_view(report: &Report) -> ReportRes {
    ReportRes {
        id: report.id.simple().to_string(),
        title: report.title.to_string(),
        status: report.status.as_str().to_string(),
        patient_name: report.patient_name.clone(),
        date: report.date.map(|d| d.to_rfc3339()),
        last_edited: report.last_edited.map(|d| d.to_rfc3339()),
    }
}

pub fn upload_view(upload: &ExternalUpload) -> ExternalUploadRes {
    ExternalUploadRes {
        id: upload.id.simple().to_string(),
        name: upload.name.to_string(),
        uploaded_by: upload.uploaded_by.to_string(),
        upload_date: upload.upload_date.to_rfc3339(),
        size: upload.size,
        description: upload.description.clone(),
    }
}

pub fn info_request_view(request: &InfoRequest) -> InfoRequestRes {
    InfoRequestRes {
        id: request.id.simple().to_string(),
        title: request.title.to_string(),
        questions: request.questions.clone(),
        answers: request.answers.clone(),
        status: request.status.as_str().to_string(),
        requested_by: request.requested_by.clone(),
        requested_at: request.requested_at.to_rfc3339(),
        completed_at: request.completed_at.map(|d| d.to_rfc3339()),
    }
}

/// Renders a milestone, resolving its related-item link. A dangling
/// reference renders as `linked: false` rather than failing the read.
pub fn milestone_view(case: &Case, milestone: &Milestone) -> MilestoneRes {
    MilestoneRes {
        id: milestone.id.simple().to_string(),
        kind: milestone.kind.as_str().to_string(),
        title: milestone.title.to_string(),
        date: milestone.date.to_rfc3339(),
        description: milestone.description.clone(),
        status: milestone.status.as_str().to_string(),
        related_item_id: milestone.related_item_id.map(|id| id.simple().to_string()),
        linked: milestones::resolve_link(case, milestone),
    }
}

pub fn timeline_view(entries: Vec<TimelineEntry>) -> TimelineRes {
    TimelineRes {
        entries: entries
            .into_iter()
            .map(|e| TimelineEntryRes {
                item_type: match e.item_type {
                    cmr_core::timeline::TimelineItemType::Document => "document",
                    cmr_core::timeline::TimelineItemType::Assessment => "assessment",
                    cmr_core::timeline::TimelineItemType::Report => "report",
                    cmr_core::timeline::TimelineItemType::Note => "note",
                    cmr_core::timeline::TimelineItemType::ExternalUpload => "external_upload",
                }
                .to_string(),
                title: e.title,
                description: e.description,
                timestamp: e.timestamp.map(|t| t.to_rfc3339()),
                source_id: e.source_id.simple().to_string(),
            })
            .collect(),
    }
}

pub fn summary_view(summary: &CaseSummary) -> CaseSummaryRes {
    CaseSummaryRes {
        id: summary.id.simple().to_string(),
        claimant_name: summary.claimant_name.clone(),
        case_type: summary.case_type.clone(),
        status: summary.status.as_str().to_string(),
        created_date: summary.created_date.to_rfc3339(),
        expiry_date: summary.expiry_date.to_rfc3339(),
        progress: summary.progress,
    }
}

pub fn share_view(grant: &ShareGrant) -> ShareNoteRes {
    ShareNoteRes {
        granted_by: grant.granted_by.clone(),
        recipient: grant.recipient.to_string(),
        consent: grant.consent,
        verified: grant.verified,
        granted_at: grant.granted_at.to_rfc3339(),
    }
}
