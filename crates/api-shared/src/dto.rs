//! Request and response DTOs for the REST surface.
//!
//! Wire types are deliberately stringly-typed for roles, statuses, kinds
//! and dates (RFC 3339): handlers parse them into the closed domain enums
//! and reject anything unrecognised with a 400. Response types are built
//! from domain values in the handler layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Cases
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ContributorReq {
    /// One of: lawyer, case_manager, support_coordinator, other.
    pub role: String,
    pub email: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ContributorRes {
    pub id: String,
    pub role: String,
    pub email: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ParticipantsRes {
    pub claimant: String,
    pub psychologist: String,
    pub lawyer: String,
    pub others: Vec<ContributorRes>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CreateCaseReq {
    pub claimant_name: String,
    pub case_type: String,
    /// RFC 3339; defaults to now when absent.
    #[serde(default)]
    pub created_date: Option<String>,
    /// RFC 3339.
    pub expiry_date: String,
    #[serde(default)]
    pub category_tags: Vec<String>,
    pub claimant: String,
    pub psychologist: String,
    pub lawyer: String,
    #[serde(default)]
    pub contributors: Vec<ContributorReq>,
    #[serde(default)]
    pub current_stage: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ToggleTagReq {
    pub tag: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AdvanceStageReq {
    pub stage: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CaseSummaryRes {
    pub id: String,
    pub claimant_name: String,
    pub case_type: String,
    pub status: String,
    pub created_date: String,
    pub expiry_date: String,
    pub progress: u8,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ListCasesRes {
    pub cases: Vec<CaseSummaryRes>,
}

/// Full aggregate view, shaped per viewer: reports are omitted for roles
/// that may not view them, and note content is withheld pending visibility
/// and verification.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct CaseRes {
    pub id: String,
    pub claimant_name: String,
    pub case_type: String,
    pub status: String,
    pub created_date: String,
    pub expiry_date: String,
    pub category_tags: Vec<String>,
    pub participants: ParticipantsRes,
    pub current_stage: String,
    pub completed_stages: Vec<String>,
    pub practice: String,
    pub revision: u64,
    pub progress: u8,
    pub documents: Vec<DocumentRes>,
    pub assessments: Vec<AssessmentRes>,
    /// Absent when the viewer's role may not view reports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reports: Option<Vec<ReportRes>>,
    pub notes: Vec<NoteViewRes>,
    pub external_uploads: Vec<ExternalUploadRes>,
    pub info_requests: Vec<InfoRequestRes>,
    pub milestones: Vec<MilestoneRes>,
}

// ---------------------------------------------------------------------------
// Documents & uploads
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CreateDocumentReq {
    pub name: String,
    pub size: u64,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PatchDocumentTagsReq {
    pub tags: Vec<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DocumentRes {
    pub id: String,
    pub name: String,
    pub uploaded_by: String,
    pub upload_date: String,
    pub size: u64,
    pub tags: Vec<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CreateUploadReq {
    pub name: String,
    pub size: u64,
    #[serde(default)]
    pub description: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ExternalUploadRes {
    pub id: String,
    pub name: String,
    pub uploaded_by: String,
    pub upload_date: String,
    pub size: u64,
    pub description: String,
}

// ---------------------------------------------------------------------------
// Assessments & reports
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CreateAssessmentReq {
    pub title: String,
    /// RFC 3339; absent until the assessment is scheduled.
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PatchAssessmentReq {
    /// One of: not_started, in_progress, completed.
    pub status: String,
    #[serde(default)]
    pub completion_percentage: Option<u8>,
    /// Scored fields; required when completing.
    #[serde(default)]
    pub results: Option<BTreeMap<String, f64>>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AssessmentRes {
    pub id: String,
    pub title: String,
    pub status: String,
    pub completion_percentage: u8,
    pub results: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CreateReportReq {
    pub title: String,
    pub patient_name: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PatchReportReq {
    /// One of: draft, completed. Only draft → completed is legal.
    pub status: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ReportRes {
    pub id: String,
    pub title: String,
    pub status: String,
    pub patient_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_edited: Option<String>,
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CreateNoteReq {
    pub content: String,
    pub is_private: bool,
    /// Roles eligible to see a private note; must be empty for public notes.
    #[serde(default)]
    pub visible_to: Vec<String>,
    /// One of: write, dictate, ocr.
    pub kind: String,
}

/// A note as rendered for one viewer. `content` is present only when the
/// viewer is eligible and, for private notes, the session has passed the
/// verification gate; otherwise `withheld` names the reason.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct NoteViewRes {
    pub id: String,
    pub created_by: String,
    pub created_at: String,
    pub is_private: bool,
    pub visible_to: Vec<String>,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// "not_visible" or "verification_required" when content is absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withheld: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ShareNoteReq {
    pub recipient: String,
    pub consent: bool,
    pub code: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ShareNoteRes {
    pub granted_by: String,
    pub recipient: String,
    pub consent: bool,
    pub verified: bool,
    pub granted_at: String,
}

// ---------------------------------------------------------------------------
// Info requests
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CreateInfoRequestReq {
    pub title: String,
    pub questions: Vec<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AnswerInfoRequestReq {
    pub answers: Vec<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct InfoRequestRes {
    pub id: String,
    pub title: String,
    pub questions: Vec<String>,
    pub answers: Vec<String>,
    pub status: String,
    pub requested_by: String,
    pub requested_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

// ---------------------------------------------------------------------------
// Milestones
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CreateMilestoneReq {
    /// One of: intake, key_session, document, assessment, report, letter,
    /// external, meeting, referral, closing.
    pub kind: String,
    pub title: String,
    /// RFC 3339.
    pub date: String,
    #[serde(default)]
    pub description: String,
    /// One of: pending, in_progress, completed. Defaults to pending.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub related_item_id: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PatchMilestoneReq {
    pub status: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MilestoneRes {
    pub id: String,
    pub kind: String,
    pub title: String,
    pub date: String,
    pub description: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_item_id: Option<String>,
    /// Whether the related item resolves; absent when unreferenced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked: Option<bool>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MilestonesRes {
    pub milestones: Vec<MilestoneRes>,
}

// ---------------------------------------------------------------------------
// Timeline & verification
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TimelineEntryRes {
    pub item_type: String,
    pub title: String,
    pub description: String,
    /// RFC 3339; absent for the undated sentinel bucket.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub source_id: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TimelineRes {
    pub entries: Vec<TimelineEntryRes>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct VerifyReq {
    pub code: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct VerifyRes {
    pub granted: bool,
}
