//! The case aggregate and its sub-records.
//!
//! A [`Case`] owns every sub-collection exclusively; nothing here is shared
//! across cases. Statuses, roles and kinds are closed enums so that illegal
//! states are unrepresentable and the transition tables beside each status
//! enum are exhaustive.
//!
//! The [`CaseItem`] and [`CasePatch`] enums give the store its generic
//! append/update contract: one variant per collection that supports the
//! operation. Notes and documents have no patch variant because they are
//! append-only (documents except for tag edits, which have their own
//! variant).

use chrono::{DateTime, Utc};
use cmr_types::{EmailAddress, NonEmptyText};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A viewer role supplied by the identity provider.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Psychologist,
    Lawyer,
    Claimant,
    ExternalContributor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Psychologist => "psychologist",
            Role::Lawyer => "lawyer",
            Role::Claimant => "claimant",
            Role::ExternalContributor => "external_contributor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "psychologist" => Ok(Role::Psychologist),
            "lawyer" => Ok(Role::Lawyer),
            "claimant" => Ok(Role::Claimant),
            "external_contributor" => Ok(Role::ExternalContributor),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Role of an external contributor granted upload-scoped access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributorRole {
    Lawyer,
    CaseManager,
    SupportCoordinator,
    Other,
}

impl ContributorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContributorRole::Lawyer => "lawyer",
            ContributorRole::CaseManager => "case_manager",
            ContributorRole::SupportCoordinator => "support_coordinator",
            ContributorRole::Other => "other",
        }
    }
}

impl FromStr for ContributorRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lawyer" => Ok(ContributorRole::Lawyer),
            "case_manager" => Ok(ContributorRole::CaseManager),
            "support_coordinator" => Ok(ContributorRole::SupportCoordinator),
            "other" => Ok(ContributorRole::Other),
            other => Err(format!("unknown contributor role: {other}")),
        }
    }
}

/// Lifecycle status of a case. Cases are never hard-deleted; the only
/// terminal transition is to `Expired`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Active,
    Expired,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Active => "active",
            CaseStatus::Expired => "expired",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl AssessmentStatus {
    /// Assessments only move forward: not_started → in_progress → completed,
    /// skips allowed, never backward and never a self-transition.
    pub fn can_transition_to(self, next: AssessmentStatus) -> bool {
        next > self
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentStatus::NotStarted => "not_started",
            AssessmentStatus::InProgress => "in_progress",
            AssessmentStatus::Completed => "completed",
        }
    }
}

impl FromStr for AssessmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(AssessmentStatus::NotStarted),
            "in_progress" => Ok(AssessmentStatus::InProgress),
            "completed" => Ok(AssessmentStatus::Completed),
            other => Err(format!("unknown assessment status: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Draft,
    Completed,
}

impl ReportStatus {
    /// Reports support exactly one transition: draft → completed.
    pub fn can_transition_to(self, next: ReportStatus) -> bool {
        matches!((self, next), (ReportStatus::Draft, ReportStatus::Completed))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Draft => "draft",
            ReportStatus::Completed => "completed",
        }
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ReportStatus::Draft),
            "completed" => Ok(ReportStatus::Completed),
            other => Err(format!("unknown report status: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfoRequestStatus {
    Pending,
    Completed,
}

impl InfoRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InfoRequestStatus::Pending => "pending",
            InfoRequestStatus::Completed => "completed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    Pending,
    InProgress,
    Completed,
}

impl MilestoneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MilestoneStatus::Pending => "pending",
            MilestoneStatus::InProgress => "in_progress",
            MilestoneStatus::Completed => "completed",
        }
    }
}

impl FromStr for MilestoneStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MilestoneStatus::Pending),
            "in_progress" => Ok(MilestoneStatus::InProgress),
            "completed" => Ok(MilestoneStatus::Completed),
            other => Err(format!("unknown milestone status: {other}")),
        }
    }
}

/// Curated milestone categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    Intake,
    KeySession,
    Document,
    Assessment,
    Report,
    Letter,
    External,
    Meeting,
    Referral,
    Closing,
}

impl MilestoneKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MilestoneKind::Intake => "intake",
            MilestoneKind::KeySession => "key_session",
            MilestoneKind::Document => "document",
            MilestoneKind::Assessment => "assessment",
            MilestoneKind::Report => "report",
            MilestoneKind::Letter => "letter",
            MilestoneKind::External => "external",
            MilestoneKind::Meeting => "meeting",
            MilestoneKind::Referral => "referral",
            MilestoneKind::Closing => "closing",
        }
    }
}

impl FromStr for MilestoneKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intake" => Ok(MilestoneKind::Intake),
            "key_session" => Ok(MilestoneKind::KeySession),
            "document" => Ok(MilestoneKind::Document),
            "assessment" => Ok(MilestoneKind::Assessment),
            "report" => Ok(MilestoneKind::Report),
            "letter" => Ok(MilestoneKind::Letter),
            "external" => Ok(MilestoneKind::External),
            "meeting" => Ok(MilestoneKind::Meeting),
            "referral" => Ok(MilestoneKind::Referral),
            "closing" => Ok(MilestoneKind::Closing),
            other => Err(format!("unknown milestone kind: {other}")),
        }
    }
}

/// How a note's structured text came to exist. OCR and dictation payloads
/// arrive from external services already structured; the engine only stores
/// the finished text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    Write,
    Dictate,
    Ocr,
}

impl NoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteKind::Write => "write",
            NoteKind::Dictate => "dictate",
            NoteKind::Ocr => "ocr",
        }
    }
}

impl FromStr for NoteKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "write" => Ok(NoteKind::Write),
            "dictate" => Ok(NoteKind::Dictate),
            "ocr" => Ok(NoteKind::Ocr),
            other => Err(format!("unknown note kind: {other}")),
        }
    }
}

/// An external contributor with upload-scoped access to one case.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalContributor {
    pub id: Uuid,
    pub role: ContributorRole,
    pub email: EmailAddress,
}

/// The people attached to a case. `others` holds external contributors,
/// who get upload access only, never full case visibility.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participants {
    pub claimant: String,
    pub psychologist: String,
    pub lawyer: String,
    #[serde(default)]
    pub others: Vec<ExternalContributor>,
}

/// File metadata. The binary itself lives with the external file storage
/// collaborator; the engine keeps only what the feed and views need.
/// Immutable once created except for tag edits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub name: NonEmptyText,
    pub uploaded_by: String,
    pub upload_date: DateTime<Utc>,
    pub size: u64,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub id: Uuid,
    pub title: NonEmptyText,
    pub status: AssessmentStatus,
    pub completion_percentage: u8,
    /// Scored fields, set when the assessment completes.
    #[serde(default)]
    pub results: BTreeMap<String, f64>,
    /// Unset until the assessment is scheduled or taken.
    pub date: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub title: NonEmptyText,
    pub status: ReportStatus,
    pub patient_name: String,
    pub date: Option<DateTime<Utc>>,
    pub last_edited: Option<DateTime<Utc>>,
}

/// A clinical or legal note. Append-only: there is no update or delete path
/// anywhere in the engine. `visible_to` must be non-empty exactly when
/// `is_private` is set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub content: NonEmptyText,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub is_private: bool,
    #[serde(default)]
    pub visible_to: BTreeSet<Role>,
    pub kind: NoteKind,
}

/// A structured question/answer exchange directed at the claimant.
/// `answers` is parallel to `questions`; completion requires every slot
/// filled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InfoRequest {
    pub id: Uuid,
    pub title: NonEmptyText,
    pub questions: Vec<String>,
    #[serde(default)]
    pub answers: Vec<String>,
    pub status: InfoRequestStatus,
    pub requested_by: String,
    pub requested_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A curated case event, explicitly created, never derived from the
/// timeline. `related_item_id` may reference a record in any other
/// collection; a dangling reference is tolerated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: Uuid,
    pub kind: MilestoneKind,
    pub title: NonEmptyText,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    pub status: MilestoneStatus,
    pub related_item_id: Option<Uuid>,
}

/// A file sent in by an external contributor through their upload-scoped
/// access.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExternalUpload {
    pub id: Uuid,
    pub name: NonEmptyText,
    pub uploaded_by: EmailAddress,
    pub upload_date: DateTime<Utc>,
    pub size: u64,
    #[serde(default)]
    pub description: String,
}

/// The aggregate root. Owned by a tenant/practice, created on intake,
/// mutated only through the store, never hard-deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: Uuid,
    pub claimant_name: NonEmptyText,
    pub case_type: NonEmptyText,
    pub status: CaseStatus,
    pub created_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    #[serde(default)]
    pub category_tags: Vec<String>,
    pub participants: Participants,
    pub current_stage: String,
    #[serde(default)]
    pub completed_stages: Vec<String>,
    /// Owning tenant/practice namespace, stamped from config at intake.
    pub practice: String,
    /// Bumped on every persisted write; used for optimistic concurrency.
    pub revision: u64,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub assessments: Vec<Assessment>,
    #[serde(default)]
    pub reports: Vec<Report>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub external_uploads: Vec<ExternalUpload>,
    #[serde(default)]
    pub info_requests: Vec<InfoRequest>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
}

impl Case {
    /// Looks up any sub-record by id across all collections. Used for
    /// resolving milestone references.
    pub fn contains_item(&self, item_id: Uuid) -> bool {
        self.documents.iter().any(|d| d.id == item_id)
            || self.assessments.iter().any(|a| a.id == item_id)
            || self.reports.iter().any(|r| r.id == item_id)
            || self.notes.iter().any(|n| n.id == item_id)
            || self.external_uploads.iter().any(|u| u.id == item_id)
            || self.info_requests.iter().any(|r| r.id == item_id)
            || self.milestones.iter().any(|m| m.id == item_id)
    }
}

/// Condensed case row for listings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaseSummary {
    pub id: Uuid,
    pub claimant_name: String,
    pub case_type: String,
    pub status: CaseStatus,
    pub created_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub progress: u8,
}

/// An item appended to one of a case's sub-collections.
#[derive(Clone, Debug)]
pub enum CaseItem {
    Document(Document),
    Assessment(Assessment),
    Report(Report),
    Note(Note),
    ExternalUpload(ExternalUpload),
    InfoRequest(InfoRequest),
    Milestone(Milestone),
}

impl CaseItem {
    pub fn id(&self) -> Uuid {
        match self {
            CaseItem::Document(d) => d.id,
            CaseItem::Assessment(a) => a.id,
            CaseItem::Report(r) => r.id,
            CaseItem::Note(n) => n.id,
            CaseItem::ExternalUpload(u) => u.id,
            CaseItem::InfoRequest(r) => r.id,
            CaseItem::Milestone(m) => m.id,
        }
    }
}

/// A patch applied to an existing sub-record. There is deliberately no
/// variant for notes: they are append-only and an edit cannot be expressed.
#[derive(Clone, Debug)]
pub enum CasePatch {
    AssessmentStatus {
        status: AssessmentStatus,
        completion_percentage: Option<u8>,
        results: Option<BTreeMap<String, f64>>,
    },
    ReportStatus {
        status: ReportStatus,
    },
    MilestoneStatus {
        status: MilestoneStatus,
    },
    DocumentTags {
        tags: Vec<String>,
    },
    InfoRequestAnswers {
        answers: Vec<String>,
    },
}

/// Audit record produced when privileged content is authorized for external
/// sharing. Recording the grant is the engine's job; transmission belongs
/// to the notification collaborator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShareGrant {
    pub granted_by: String,
    pub recipient: EmailAddress,
    pub consent: bool,
    pub verified: bool,
    pub granted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assessment_transitions_are_forward_only() {
        use AssessmentStatus::*;
        assert!(NotStarted.can_transition_to(InProgress));
        assert!(NotStarted.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Completed));
        assert!(!InProgress.can_transition_to(NotStarted));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Completed.can_transition_to(Completed));
    }

    #[test]
    fn report_transitions_allow_only_draft_to_completed() {
        use ReportStatus::*;
        assert!(Draft.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Draft));
        assert!(!Draft.can_transition_to(Draft));
        assert!(!Completed.can_transition_to(Completed));
    }

    #[test]
    fn role_parses_and_displays_symmetrically() {
        for role in [
            Role::Psychologist,
            Role::Lawyer,
            Role::Claimant,
            Role::ExternalContributor,
        ] {
            let parsed: Role = role.as_str().parse().expect("role should round-trip");
            assert_eq!(parsed, role);
        }
        assert!("receptionist".parse::<Role>().is_err());
    }

    #[test]
    fn milestone_kind_parses_snake_case() {
        assert_eq!(
            "key_session".parse::<MilestoneKind>().expect("should parse"),
            MilestoneKind::KeySession
        );
        assert!("vacation".parse::<MilestoneKind>().is_err());
    }
}
