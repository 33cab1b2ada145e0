//! The case record store.
//!
//! Owns persistence of the case aggregate and is the only component that
//! mutates it. Pure data operations: authorization and visibility decisions
//! happen before a call ever reaches this module.
//!
//! ## Storage Layout
//!
//! Cases are stored as one JSON aggregate per case in a sharded directory
//! structure:
//!
//! ```text
//! cases/
//!   <s1>/
//!     <s2>/
//!       <uuid>/
//!         case.json
//! ```
//!
//! where `s1` and `s2` are the first four hex characters of the case UUID,
//! keeping directory fan-out flat as case counts grow.
//!
//! ## Write discipline
//!
//! Every mutation is a read-modify-write of the whole aggregate, serialized
//! behind a store-level lock and flushed via temp-file-and-rename. Callers
//! that read first may pass the revision they saw; a mismatch at write time
//! fails with `CaseError::StateConflict` and changes nothing. Validation
//! runs before mutation, so a failed write never leaves partial state.

use crate::config::CoreConfig;
use crate::constants::CASE_JSON_FILENAME;
use crate::error::{CaseError, CaseResult};
use crate::info_requests;
use crate::model::{
    Case, CaseItem, CasePatch, CaseStatus, CaseSummary, ExternalContributor, InfoRequest,
    InfoRequestStatus, Note, Participants,
};
use crate::progress;
use crate::validation;
use chrono::{DateTime, Utc};
use cmr_types::NonEmptyText;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Intake payload for a new case.
#[derive(Clone, Debug)]
pub struct NewCase {
    pub claimant_name: NonEmptyText,
    pub case_type: NonEmptyText,
    /// Defaults to now when absent.
    pub created_date: Option<DateTime<Utc>>,
    pub expiry_date: DateTime<Utc>,
    pub category_tags: Vec<String>,
    pub participants: Participants,
    /// Defaults to "intake" when absent.
    pub current_stage: Option<String>,
}

/// File-backed store for case aggregates.
pub struct CaseStore {
    cfg: Arc<CoreConfig>,
    write_lock: Mutex<()>,
}

impl CaseStore {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self {
            cfg,
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a new case on intake and persists it.
    ///
    /// Allocates a unique sharded directory, retrying on the (pathological)
    /// UUID collision or pre-existing directory.
    ///
    /// # Errors
    ///
    /// Returns `CaseError::Validation` for bad intake data (dates out of
    /// order, tag violations), or a storage variant if the directory or
    /// file cannot be created.
    pub fn create(&self, new_case: NewCase) -> CaseResult<Case> {
        let created_date = new_case.created_date.unwrap_or_else(Utc::now);
        validation::validate_case_dates(created_date, new_case.expiry_date)?;
        validation::validate_category_tags(&new_case.category_tags)?;

        let _guard = self.write_lock.lock().expect("case store write lock poisoned");

        let (case_id, case_dir) = self.allocate_case_dir()?;

        let case = Case {
            id: case_id,
            claimant_name: new_case.claimant_name,
            case_type: new_case.case_type,
            status: CaseStatus::Active,
            created_date,
            expiry_date: new_case.expiry_date,
            category_tags: new_case.category_tags,
            participants: new_case.participants,
            current_stage: new_case.current_stage.unwrap_or_else(|| "intake".into()),
            completed_stages: Vec::new(),
            practice: self.cfg.practice_namespace().to_string(),
            revision: 0,
            documents: Vec::new(),
            assessments: Vec::new(),
            reports: Vec::new(),
            notes: Vec::new(),
            external_uploads: Vec::new(),
            info_requests: Vec::new(),
            milestones: Vec::new(),
        };

        self.write_case_file(&case_dir, &case)?;
        Ok(case)
    }

    /// Loads a case by id.
    ///
    /// # Errors
    ///
    /// `CaseError::NotFound` for an unknown id; storage variants for
    /// unreadable or unparsable files.
    pub fn get(&self, case_id: Uuid) -> CaseResult<Case> {
        let path = self.case_file(case_id);
        if !path.is_file() {
            return Err(CaseError::NotFound(format!("case {case_id}")));
        }
        let contents = fs::read_to_string(&path).map_err(CaseError::FileRead)?;
        serde_json::from_str(&contents).map_err(CaseError::Deserialization)
    }

    /// Lists all cases as summary rows, newest intake first.
    ///
    /// Unparsable entries are logged and skipped rather than failing the
    /// whole listing.
    pub fn list(&self) -> Vec<CaseSummary> {
        let mut summaries: Vec<CaseSummary> = self
            .case_files()
            .into_iter()
            .filter_map(|path| {
                let contents = match fs::read_to_string(&path) {
                    Ok(c) => c,
                    Err(e) => {
                        tracing::warn!("failed to read case file {}: {e}", path.display());
                        return None;
                    }
                };
                match serde_json::from_str::<Case>(&contents) {
                    Ok(case) => Some(CaseSummary {
                        id: case.id,
                        claimant_name: case.claimant_name.to_string(),
                        case_type: case.case_type.to_string(),
                        status: case.status,
                        created_date: case.created_date,
                        expiry_date: case.expiry_date,
                        progress: progress::progress(&case),
                    }),
                    Err(e) => {
                        tracing::warn!("failed to parse case file {}: {e}", path.display());
                        None
                    }
                }
            })
            .collect();

        summaries.sort_by(|a, b| b.created_date.cmp(&a.created_date));
        summaries
    }

    /// Appends an item to one of the case's sub-collections.
    ///
    /// The only mutation path for notes and documents. Item invariants are
    /// validated against the current aggregate before anything is written.
    ///
    /// # Errors
    ///
    /// `CaseError::NotFound` for an unknown case, `CaseError::Validation`
    /// for item invariant violations or an expired case,
    /// `CaseError::StateConflict` on a revision mismatch.
    pub fn append(
        &self,
        case_id: Uuid,
        item: CaseItem,
        expected_revision: Option<u64>,
    ) -> CaseResult<Case> {
        self.mutate(case_id, expected_revision, |case| {
            validate_item(case, &item)?;
            match item {
                CaseItem::Document(d) => case.documents.push(d),
                CaseItem::Assessment(a) => case.assessments.push(a),
                CaseItem::Report(r) => case.reports.push(r),
                CaseItem::Note(n) => case.notes.push(n),
                CaseItem::ExternalUpload(u) => case.external_uploads.push(u),
                CaseItem::InfoRequest(r) => case.info_requests.push(r),
                CaseItem::Milestone(m) => case.milestones.push(m),
            }
            Ok(())
        })
    }

    /// Applies a patch to an existing sub-record.
    ///
    /// Each patch is validated against the entity's allowed-transition
    /// table before being applied.
    ///
    /// # Errors
    ///
    /// `CaseError::NotFound` if the case or item is unknown,
    /// `CaseError::Validation` for an illegal transition,
    /// `CaseError::StateConflict` on a revision mismatch.
    pub fn update(
        &self,
        case_id: Uuid,
        item_id: Uuid,
        patch: CasePatch,
        expected_revision: Option<u64>,
    ) -> CaseResult<Case> {
        self.mutate(case_id, expected_revision, |case| {
            apply_patch(case, item_id, patch)
        })
    }

    /// Toggles a category tag on the case.
    ///
    /// Re-selecting removes; adding beyond the cap is a silent no-op, per
    /// the selection-control semantics.
    pub fn toggle_category_tag(&self, case_id: Uuid, tag: &str) -> CaseResult<Case> {
        self.mutate(case_id, None, |case| {
            case.category_tags = validation::toggle_category_tag(&case.category_tags, tag)?;
            Ok(())
        })
    }

    /// Transitions the case to expired: the only terminal status change.
    /// Cases are never hard-deleted.
    pub fn expire(&self, case_id: Uuid) -> CaseResult<Case> {
        self.mutate(case_id, None, |case| {
            case.status = CaseStatus::Expired;
            Ok(())
        })
    }

    /// Registers an external contributor for upload-scoped access.
    /// Idempotent on email.
    pub fn add_contributor(
        &self,
        case_id: Uuid,
        contributor: ExternalContributor,
    ) -> CaseResult<Case> {
        self.mutate(case_id, None, |case| {
            if case
                .participants
                .others
                .iter()
                .any(|c| c.email == contributor.email)
            {
                return Err(CaseError::Validation(format!(
                    "contributor {} is already registered",
                    contributor.email
                )));
            }
            case.participants.others.push(contributor);
            Ok(())
        })
    }

    /// Moves the case to its next stage, recording the previous one as
    /// completed.
    pub fn advance_stage(&self, case_id: Uuid, next_stage: NonEmptyText) -> CaseResult<Case> {
        self.mutate(case_id, None, |case| {
            let previous = std::mem::replace(&mut case.current_stage, next_stage.into_inner());
            if !previous.is_empty() && !case.completed_stages.contains(&previous) {
                case.completed_stages.push(previous);
            }
            Ok(())
        })
    }

    /// Finds the case owning a note, for the `/notes/{id}` routes.
    pub fn find_note(&self, note_id: Uuid) -> CaseResult<(Case, Note)> {
        for case in self.iter_cases() {
            if let Some(note) = case.notes.iter().find(|n| n.id == note_id).cloned() {
                return Ok((case, note));
            }
        }
        Err(CaseError::NotFound(format!("note {note_id}")))
    }

    /// Finds the case owning an information request, for the
    /// `/info-requests/{id}` routes.
    pub fn find_info_request(&self, request_id: Uuid) -> CaseResult<(Case, InfoRequest)> {
        for case in self.iter_cases() {
            if let Some(req) = case
                .info_requests
                .iter()
                .find(|r| r.id == request_id)
                .cloned()
            {
                return Ok((case, req));
            }
        }
        Err(CaseError::NotFound(format!("information request {request_id}")))
    }

    // ------------------------------------------------------------------
    // internals
    // ------------------------------------------------------------------

    fn mutate<F>(
        &self,
        case_id: Uuid,
        expected_revision: Option<u64>,
        apply: F,
    ) -> CaseResult<Case>
    where
        F: FnOnce(&mut Case) -> CaseResult<()>,
    {
        let _guard = self.write_lock.lock().expect("case store write lock poisoned");

        let mut case = self.get(case_id)?;

        if let Some(expected) = expected_revision {
            if case.revision != expected {
                return Err(CaseError::StateConflict {
                    case_id,
                    expected,
                    found: case.revision,
                });
            }
        }

        if case.status == CaseStatus::Expired {
            return Err(CaseError::Validation(format!("case {case_id} is expired")));
        }

        apply(&mut case)?;

        case.revision += 1;
        self.write_case_file(&self.case_dir(case_id), &case)?;
        Ok(case)
    }

    fn case_dir(&self, case_id: Uuid) -> PathBuf {
        let simple = case_id.simple().to_string();
        self.cfg
            .cases_dir()
            .join(&simple[0..2])
            .join(&simple[2..4])
            .join(&simple)
    }

    fn case_file(&self, case_id: Uuid) -> PathBuf {
        self.case_dir(case_id).join(CASE_JSON_FILENAME)
    }

    /// Allocates a fresh case directory, guarding against UUID collisions
    /// or externally pre-created directories by retrying.
    fn allocate_case_dir(&self) -> CaseResult<(Uuid, PathBuf)> {
        for _attempt in 0..5 {
            let candidate_id = Uuid::new_v4();
            let candidate = self.case_dir(candidate_id);

            if candidate.exists() {
                continue;
            }

            if let Some(parent) = candidate.parent() {
                fs::create_dir_all(parent).map_err(CaseError::StorageDirCreation)?;
            }

            match fs::create_dir(&candidate) {
                Ok(()) => return Ok((candidate_id, candidate)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(CaseError::CaseDirCreation(e)),
            }
        }

        Err(CaseError::CaseDirCreation(std::io::Error::new(
            ErrorKind::AlreadyExists,
            "failed to allocate a unique case directory after 5 attempts",
        )))
    }

    fn write_case_file(&self, case_dir: &PathBuf, case: &Case) -> CaseResult<()> {
        let contents = serde_json::to_string_pretty(case).map_err(CaseError::Serialization)?;
        let final_path = case_dir.join(CASE_JSON_FILENAME);
        let tmp_path = case_dir.join(format!("{CASE_JSON_FILENAME}.tmp"));
        fs::write(&tmp_path, contents).map_err(CaseError::FileWrite)?;
        fs::rename(&tmp_path, &final_path).map_err(CaseError::FileWrite)?;
        Ok(())
    }

    /// Walks the shard tree and yields every readable case, skipping
    /// unreadable or unparsable entries with a warning.
    fn iter_cases(&self) -> Vec<Case> {
        self.case_files()
            .into_iter()
            .filter_map(|path| {
                fs::read_to_string(&path)
                    .ok()
                    .and_then(|contents| match serde_json::from_str(&contents) {
                        Ok(case) => Some(case),
                        Err(e) => {
                            tracing::warn!(
                                "failed to parse case file {}: {e}",
                                path.display()
                            );
                            None
                        }
                    })
            })
            .collect()
    }

    fn case_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        let s1_iter = match fs::read_dir(self.cfg.cases_dir()) {
            Ok(it) => it,
            Err(_) => return files,
        };
        for s1 in s1_iter.flatten() {
            if !s1.path().is_dir() {
                continue;
            }
            let s2_iter = match fs::read_dir(s1.path()) {
                Ok(it) => it,
                Err(_) => continue,
            };
            for s2 in s2_iter.flatten() {
                if !s2.path().is_dir() {
                    continue;
                }
                let id_iter = match fs::read_dir(s2.path()) {
                    Ok(it) => it,
                    Err(_) => continue,
                };
                for id_ent in id_iter.flatten() {
                    let case_path = id_ent.path().join(CASE_JSON_FILENAME);
                    if case_path.is_file() {
                        files.push(case_path);
                    }
                }
            }
        }

        files
    }
}

/// Validates an item against the aggregate it is about to join.
fn validate_item(case: &Case, item: &CaseItem) -> CaseResult<()> {
    match item {
        CaseItem::Document(d) => validation::validate_document_tags(&d.tags),
        CaseItem::Assessment(a) => {
            if a.completion_percentage > 100 {
                return Err(CaseError::Validation(
                    "completion_percentage must be at most 100".into(),
                ));
            }
            if a.status == crate::model::AssessmentStatus::Completed && a.results.is_empty() {
                return Err(CaseError::Validation(
                    "a completed assessment must carry results".into(),
                ));
            }
            Ok(())
        }
        CaseItem::Report(_) => Ok(()),
        CaseItem::Note(n) => validation::validate_note(n),
        CaseItem::ExternalUpload(u) => {
            let registered = case
                .participants
                .others
                .iter()
                .any(|c| c.email == u.uploaded_by);
            if !registered {
                return Err(CaseError::Validation(format!(
                    "{} is not a registered contributor on this case",
                    u.uploaded_by
                )));
            }
            Ok(())
        }
        CaseItem::InfoRequest(r) => {
            if r.questions.is_empty() {
                return Err(CaseError::Validation(
                    "an information request needs at least one question".into(),
                ));
            }
            if r.status != InfoRequestStatus::Pending || !r.answers.is_empty() {
                return Err(CaseError::Validation(
                    "a new information request must be pending with no answers".into(),
                ));
            }
            Ok(())
        }
        CaseItem::Milestone(m) => {
            // Dangling references are tolerated: warn and accept.
            if let Some(related) = m.related_item_id {
                if !case.contains_item(related) {
                    tracing::warn!(
                        case_id = %case.id,
                        milestone_id = %m.id,
                        related_item_id = %related,
                        "milestone created with a reference to a missing item"
                    );
                }
            }
            Ok(())
        }
    }
}

/// Applies a patch, enforcing the target entity's transition table.
fn apply_patch(case: &mut Case, item_id: Uuid, patch: CasePatch) -> CaseResult<()> {
    let case_id = case.id;
    match patch {
        CasePatch::AssessmentStatus {
            status,
            completion_percentage,
            results,
        } => {
            let assessment = case
                .assessments
                .iter_mut()
                .find(|a| a.id == item_id)
                .ok_or_else(|| {
                    CaseError::NotFound(format!("assessment {item_id} in case {case_id}"))
                })?;

            if !assessment.status.can_transition_to(status) {
                return Err(CaseError::Validation(format!(
                    "assessment cannot move from {:?} to {:?}",
                    assessment.status, status
                )));
            }

            if status == crate::model::AssessmentStatus::Completed {
                if let Some(results) = results {
                    assessment.results = results;
                }
                if assessment.results.is_empty() {
                    return Err(CaseError::Validation(
                        "completing an assessment requires results".into(),
                    ));
                }
                assessment.completion_percentage = completion_percentage.unwrap_or(100);
                if assessment.date.is_none() {
                    assessment.date = Some(Utc::now());
                }
            } else if let Some(pct) = completion_percentage {
                if pct > 100 {
                    return Err(CaseError::Validation(
                        "completion_percentage must be at most 100".into(),
                    ));
                }
                assessment.completion_percentage = pct;
            }

            assessment.status = status;
            Ok(())
        }
        CasePatch::ReportStatus { status } => {
            let report = case
                .reports
                .iter_mut()
                .find(|r| r.id == item_id)
                .ok_or_else(|| {
                    CaseError::NotFound(format!("report {item_id} in case {case_id}"))
                })?;

            if !report.status.can_transition_to(status) {
                return Err(CaseError::Validation(format!(
                    "report cannot move from {:?} to {:?}",
                    report.status, status
                )));
            }

            report.status = status;
            let now = Utc::now();
            report.last_edited = Some(now);
            if report.date.is_none() {
                report.date = Some(now);
            }
            Ok(())
        }
        CasePatch::MilestoneStatus { status } => {
            let milestone = case
                .milestones
                .iter_mut()
                .find(|m| m.id == item_id)
                .ok_or_else(|| {
                    CaseError::NotFound(format!("milestone {item_id} in case {case_id}"))
                })?;
            // Milestone status is set explicitly; no transition table.
            milestone.status = status;
            Ok(())
        }
        CasePatch::DocumentTags { tags } => {
            validation::validate_document_tags(&tags)?;
            let document = case
                .documents
                .iter_mut()
                .find(|d| d.id == item_id)
                .ok_or_else(|| {
                    CaseError::NotFound(format!("document {item_id} in case {case_id}"))
                })?;
            document.tags = tags;
            Ok(())
        }
        CasePatch::InfoRequestAnswers { answers } => {
            let request = case
                .info_requests
                .iter_mut()
                .find(|r| r.id == item_id)
                .ok_or_else(|| {
                    CaseError::NotFound(format!(
                        "information request {item_id} in case {case_id}"
                    ))
                })?;

            info_requests::validate_answers(request, &answers)?;

            request.answers = answers;
            request.status = InfoRequestStatus::Completed;
            request.completed_at = Some(Utc::now());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Assessment, AssessmentStatus, ContributorRole, Document, ExternalUpload, Milestone,
        MilestoneKind, MilestoneStatus, NoteKind, Report, ReportStatus,
    };
    use chrono::Duration;
    use cmr_types::EmailAddress;
    use std::collections::{BTreeMap, BTreeSet};
    use tempfile::TempDir;

    fn test_store() -> (TempDir, CaseStore) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = Arc::new(
            CoreConfig::new(
                temp_dir.path().to_path_buf(),
                "778899".into(),
                "cmr.test.1".into(),
            )
            .expect("CoreConfig::new should succeed"),
        );
        (temp_dir, CaseStore::new(cfg))
    }

    fn intake() -> NewCase {
        NewCase {
            claimant_name: NonEmptyText::new("Jordan Avery").expect("name"),
            case_type: NonEmptyText::new("psych injury").expect("type"),
            created_date: None,
            expiry_date: Utc::now() + Duration::days(365),
            category_tags: vec!["workcover".into()],
            participants: Participants {
                claimant: "Jordan Avery".into(),
                psychologist: "Dr Ash".into(),
                lawyer: "R. Quinn".into(),
                others: vec![],
            },
            current_stage: None,
        }
    }

    fn note() -> Note {
        Note {
            id: Uuid::new_v4(),
            content: NonEmptyText::new("session summary").expect("content"),
            created_by: "Dr Ash".into(),
            created_at: Utc::now(),
            is_private: false,
            visible_to: BTreeSet::new(),
            kind: NoteKind::Write,
        }
    }

    fn assessment() -> Assessment {
        Assessment {
            id: Uuid::new_v4(),
            title: NonEmptyText::new("DASS-21").expect("title"),
            status: AssessmentStatus::NotStarted,
            completion_percentage: 0,
            results: BTreeMap::new(),
            date: None,
        }
    }

    #[test]
    fn create_persists_a_sharded_case_file() {
        let (temp_dir, store) = test_store();
        let case = store.create(intake()).expect("create should succeed");

        let simple = case.id.simple().to_string();
        let expected = temp_dir
            .path()
            .join("cases")
            .join(&simple[0..2])
            .join(&simple[2..4])
            .join(&simple)
            .join("case.json");
        assert!(expected.is_file(), "case file should exist at sharded path");
        assert_eq!(case.revision, 0);
        assert_eq!(case.status, CaseStatus::Active);
        assert_eq!(case.practice, "cmr.test.1");
    }

    #[test]
    fn create_rejects_expiry_before_created() {
        let (_temp_dir, store) = test_store();
        let mut bad = intake();
        bad.created_date = Some(Utc::now());
        bad.expiry_date = Utc::now() - Duration::days(1);
        let err = store.create(bad).expect_err("should reject");
        assert!(matches!(err, CaseError::Validation(_)));
    }

    #[test]
    fn create_rejects_more_than_three_category_tags() {
        let (_temp_dir, store) = test_store();
        let mut bad = intake();
        bad.category_tags = vec![
            "workcover".into(),
            "insurance".into(),
            "family_law".into(),
            "veterans".into(),
        ];
        let err = store.create(bad).expect_err("should reject");
        assert!(matches!(err, CaseError::Validation(_)));
    }

    #[test]
    fn get_unknown_case_is_not_found() {
        let (_temp_dir, store) = test_store();
        let err = store.get(Uuid::new_v4()).expect_err("should fail");
        assert!(matches!(err, CaseError::NotFound(_)));
    }

    #[test]
    fn append_note_bumps_revision_and_persists() {
        let (_temp_dir, store) = test_store();
        let case = store.create(intake()).expect("create should succeed");

        let updated = store
            .append(case.id, CaseItem::Note(note()), None)
            .expect("append should succeed");
        assert_eq!(updated.revision, 1);
        assert_eq!(updated.notes.len(), 1);

        let reloaded = store.get(case.id).expect("get should succeed");
        assert_eq!(reloaded, updated);
    }

    #[test]
    fn append_rejects_invalid_private_note() {
        let (_temp_dir, store) = test_store();
        let case = store.create(intake()).expect("create should succeed");

        let mut bad = note();
        bad.is_private = true; // no visible_to
        let err = store
            .append(case.id, CaseItem::Note(bad), None)
            .expect_err("should reject");
        assert!(matches!(err, CaseError::Validation(_)));

        let reloaded = store.get(case.id).expect("get should succeed");
        assert!(reloaded.notes.is_empty(), "no state change on validation failure");
    }

    #[test]
    fn revision_mismatch_is_a_state_conflict() {
        let (_temp_dir, store) = test_store();
        let case = store.create(intake()).expect("create should succeed");

        store
            .append(case.id, CaseItem::Note(note()), Some(0))
            .expect("first append should succeed");

        // A second writer still holding revision 0 loses.
        let err = store
            .append(case.id, CaseItem::Note(note()), Some(0))
            .expect_err("stale revision should conflict");
        assert!(matches!(err, CaseError::StateConflict { expected: 0, found: 1, .. }));
    }

    #[test]
    fn expired_cases_reject_mutation() {
        let (_temp_dir, store) = test_store();
        let case = store.create(intake()).expect("create should succeed");
        store.expire(case.id).expect("expire should succeed");

        let err = store
            .append(case.id, CaseItem::Note(note()), None)
            .expect_err("expired case should reject writes");
        assert!(matches!(err, CaseError::Validation(_)));
    }

    #[test]
    fn report_completes_once_and_never_reverts() {
        let (_temp_dir, store) = test_store();
        let case = store.create(intake()).expect("create should succeed");
        let report = Report {
            id: Uuid::new_v4(),
            title: NonEmptyText::new("Initial report").expect("title"),
            status: ReportStatus::Draft,
            patient_name: "Jordan Avery".into(),
            date: None,
            last_edited: None,
        };
        let report_id = report.id;
        store
            .append(case.id, CaseItem::Report(report), None)
            .expect("append should succeed");

        let updated = store
            .update(
                case.id,
                report_id,
                CasePatch::ReportStatus {
                    status: ReportStatus::Completed,
                },
                None,
            )
            .expect("completion should succeed");
        let completed = &updated.reports[0];
        assert_eq!(completed.status, ReportStatus::Completed);
        assert!(completed.date.is_some(), "completion stamps a date");

        let err = store
            .update(
                case.id,
                report_id,
                CasePatch::ReportStatus {
                    status: ReportStatus::Draft,
                },
                None,
            )
            .expect_err("backward transition should fail");
        assert!(matches!(err, CaseError::Validation(_)));
    }

    #[test]
    fn assessment_completion_requires_results() {
        let (_temp_dir, store) = test_store();
        let case = store.create(intake()).expect("create should succeed");
        let a = assessment();
        let a_id = a.id;
        store
            .append(case.id, CaseItem::Assessment(a), None)
            .expect("append should succeed");

        let err = store
            .update(
                case.id,
                a_id,
                CasePatch::AssessmentStatus {
                    status: AssessmentStatus::Completed,
                    completion_percentage: None,
                    results: None,
                },
                None,
            )
            .expect_err("completion without results should fail");
        assert!(matches!(err, CaseError::Validation(_)));

        let updated = store
            .update(
                case.id,
                a_id,
                CasePatch::AssessmentStatus {
                    status: AssessmentStatus::Completed,
                    completion_percentage: None,
                    results: Some(BTreeMap::from([("depression".to_string(), 21.0)])),
                },
                None,
            )
            .expect("completion with results should succeed");
        let completed = &updated.assessments[0];
        assert_eq!(completed.status, AssessmentStatus::Completed);
        assert_eq!(completed.completion_percentage, 100);
        assert!(completed.date.is_some());
    }

    #[test]
    fn assessment_cannot_move_backward() {
        let (_temp_dir, store) = test_store();
        let case = store.create(intake()).expect("create should succeed");
        let mut a = assessment();
        a.status = AssessmentStatus::InProgress;
        let a_id = a.id;
        store
            .append(case.id, CaseItem::Assessment(a), None)
            .expect("append should succeed");

        let err = store
            .update(
                case.id,
                a_id,
                CasePatch::AssessmentStatus {
                    status: AssessmentStatus::NotStarted,
                    completion_percentage: None,
                    results: None,
                },
                None,
            )
            .expect_err("backward transition should fail");
        assert!(matches!(err, CaseError::Validation(_)));
    }

    #[test]
    fn answering_completes_the_request_atomically() {
        let (_temp_dir, store) = test_store();
        let case = store.create(intake()).expect("create should succeed");
        let request = info_requests::new_request(
            NonEmptyText::new("employment history").expect("title"),
            vec!["Where did you work in 2024?".into(), "Role?".into()],
            "R. Quinn",
        )
        .expect("request should build");
        let request_id = request.id;
        store
            .append(case.id, CaseItem::InfoRequest(request), None)
            .expect("append should succeed");

        // Short answer list: nothing must be persisted.
        let err = store
            .update(
                case.id,
                request_id,
                CasePatch::InfoRequestAnswers {
                    answers: vec!["Acme".into()],
                },
                None,
            )
            .expect_err("mismatched answers should fail");
        assert!(matches!(err, CaseError::Validation(_)));

        let reloaded = store.get(case.id).expect("get should succeed");
        assert_eq!(reloaded.info_requests[0].status, InfoRequestStatus::Pending);
        assert!(reloaded.info_requests[0].answers.is_empty());

        let updated = store
            .update(
                case.id,
                request_id,
                CasePatch::InfoRequestAnswers {
                    answers: vec!["Acme".into(), "Storeperson".into()],
                },
                None,
            )
            .expect("full answers should succeed");
        let completed = &updated.info_requests[0];
        assert_eq!(completed.status, InfoRequestStatus::Completed);
        assert!(completed.completed_at.is_some());
        assert_eq!(completed.answers.len(), 2);
    }

    #[test]
    fn document_tag_updates_are_validated() {
        let (_temp_dir, store) = test_store();
        let case = store.create(intake()).expect("create should succeed");
        let doc = Document {
            id: Uuid::new_v4(),
            name: NonEmptyText::new("referral.pdf").expect("name"),
            uploaded_by: "Dr Ash".into(),
            upload_date: Utc::now(),
            size: 512,
            tags: vec!["referral".into()],
        };
        let doc_id = doc.id;
        store
            .append(case.id, CaseItem::Document(doc), None)
            .expect("append should succeed");

        let err = store
            .update(
                case.id,
                doc_id,
                CasePatch::DocumentTags {
                    tags: vec!["not_a_real_tag".into()],
                },
                None,
            )
            .expect_err("unknown tag should fail");
        assert!(matches!(err, CaseError::Validation(_)));

        let updated = store
            .update(
                case.id,
                doc_id,
                CasePatch::DocumentTags {
                    tags: vec!["referral".into(), "medical_records".into()],
                },
                None,
            )
            .expect("valid tags should succeed");
        assert_eq!(updated.documents[0].tags.len(), 2);
    }

    #[test]
    fn external_uploads_require_a_registered_contributor() {
        let (_temp_dir, store) = test_store();
        let case = store.create(intake()).expect("create should succeed");
        let email = EmailAddress::new("cm@agency.example.com").expect("email");

        let upload = ExternalUpload {
            id: Uuid::new_v4(),
            name: NonEmptyText::new("capacity-report.pdf").expect("name"),
            uploaded_by: email.clone(),
            upload_date: Utc::now(),
            size: 4096,
            description: String::new(),
        };

        let err = store
            .append(case.id, CaseItem::ExternalUpload(upload.clone()), None)
            .expect_err("unregistered contributor should fail");
        assert!(matches!(err, CaseError::Validation(_)));

        store
            .add_contributor(
                case.id,
                ExternalContributor {
                    id: Uuid::new_v4(),
                    role: ContributorRole::CaseManager,
                    email,
                },
            )
            .expect("add_contributor should succeed");

        store
            .append(case.id, CaseItem::ExternalUpload(upload), None)
            .expect("registered contributor should succeed");
    }

    #[test]
    fn milestones_tolerate_dangling_references() {
        let (_temp_dir, store) = test_store();
        let case = store.create(intake()).expect("create should succeed");

        let milestone = Milestone {
            id: Uuid::new_v4(),
            kind: MilestoneKind::Document,
            title: NonEmptyText::new("key evidence received").expect("title"),
            date: Utc::now(),
            description: String::new(),
            status: MilestoneStatus::Completed,
            related_item_id: Some(Uuid::new_v4()),
        };

        let updated = store
            .append(case.id, CaseItem::Milestone(milestone), None)
            .expect("dangling reference must be tolerated");
        assert_eq!(updated.milestones.len(), 1);
    }

    #[test]
    fn update_unknown_item_is_not_found() {
        let (_temp_dir, store) = test_store();
        let case = store.create(intake()).expect("create should succeed");

        let err = store
            .update(
                case.id,
                Uuid::new_v4(),
                CasePatch::MilestoneStatus {
                    status: MilestoneStatus::Completed,
                },
                None,
            )
            .expect_err("unknown item should fail");
        assert!(matches!(err, CaseError::NotFound(_)));
    }

    #[test]
    fn list_summarises_and_skips_corrupt_files() {
        let (temp_dir, store) = test_store();
        let case = store.create(intake()).expect("create should succeed");
        store
            .append(
                case.id,
                CaseItem::Document(Document {
                    id: Uuid::new_v4(),
                    name: NonEmptyText::new("form.pdf").expect("name"),
                    uploaded_by: "Dr Ash".into(),
                    upload_date: Utc::now(),
                    size: 100,
                    tags: vec![],
                }),
                None,
            )
            .expect("append should succeed");

        // Plant a corrupt case file beside the real one.
        let corrupt_dir = temp_dir
            .path()
            .join("cases")
            .join("zz")
            .join("zz")
            .join("zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz");
        fs::create_dir_all(&corrupt_dir).expect("Failed to create corrupt dir");
        fs::write(corrupt_dir.join("case.json"), b"{ not json").expect("Failed to write");

        let summaries = store.list();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, case.id);
        assert_eq!(summaries[0].progress, 100, "a lone document is complete");
    }

    #[test]
    fn find_note_walks_across_cases() {
        let (_temp_dir, store) = test_store();
        store.create(intake()).expect("create should succeed");
        let case_b = store.create(intake()).expect("create should succeed");

        let n = note();
        let note_id = n.id;
        store
            .append(case_b.id, CaseItem::Note(n), None)
            .expect("append should succeed");

        let (owner, found) = store.find_note(note_id).expect("note should be found");
        assert_eq!(owner.id, case_b.id);
        assert_eq!(found.id, note_id);

        let err = store.find_note(Uuid::new_v4()).expect_err("unknown note");
        assert!(matches!(err, CaseError::NotFound(_)));
    }

    #[test]
    fn find_info_request_walks_across_cases() {
        let (_temp_dir, store) = test_store();
        let case = store.create(intake()).expect("create should succeed");
        let request = info_requests::new_request(
            NonEmptyText::new("address history").expect("title"),
            vec!["Current address?".into()],
            "Dr Ash",
        )
        .expect("request should build");
        let request_id = request.id;
        store
            .append(case.id, CaseItem::InfoRequest(request), None)
            .expect("append should succeed");

        let (owner, found) = store
            .find_info_request(request_id)
            .expect("request should be found");
        assert_eq!(owner.id, case.id);
        assert_eq!(found.id, request_id);
    }

    #[test]
    fn toggle_category_tag_round_trip() {
        let (_temp_dir, store) = test_store();
        let case = store.create(intake()).expect("create should succeed");

        let updated = store
            .toggle_category_tag(case.id, "insurance")
            .expect("toggle should succeed");
        assert!(updated.category_tags.contains(&"insurance".to_string()));

        let updated = store
            .toggle_category_tag(case.id, "insurance")
            .expect("toggle should succeed");
        assert!(!updated.category_tags.contains(&"insurance".to_string()));
    }

    #[test]
    fn advance_stage_records_the_previous_stage() {
        let (_temp_dir, store) = test_store();
        let case = store.create(intake()).expect("create should succeed");
        assert_eq!(case.current_stage, "intake");

        let updated = store
            .advance_stage(case.id, NonEmptyText::new("treatment").expect("stage"))
            .expect("advance should succeed");
        assert_eq!(updated.current_stage, "treatment");
        assert_eq!(updated.completed_stages, vec!["intake".to_string()]);
    }
}
