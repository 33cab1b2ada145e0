//! The progress calculator.
//!
//! Completion counts deliverables only: documents (complete the instant
//! they exist), assessments and reports. Notes and info requests are
//! deliberately excluded. Recomputed from the aggregate on every read.

use crate::model::{AssessmentStatus, Case, ReportStatus};

/// Completion percentage in `0..=100`.
///
/// `round(100 * completed / total)`, where documents always count as
/// completed. An empty case reports 0. Items are only ever added and only
/// ever move toward completed, so the value never regresses in normal
/// operation.
pub fn progress(case: &Case) -> u8 {
    let total = case.documents.len() + case.assessments.len() + case.reports.len();
    if total == 0 {
        return 0;
    }

    let completed = case.documents.len()
        + case
            .assessments
            .iter()
            .filter(|a| a.status == AssessmentStatus::Completed)
            .count()
        + case
            .reports
            .iter()
            .filter(|r| r.status == ReportStatus::Completed)
            .count();

    ((100.0 * completed as f64) / total as f64).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Assessment, CaseStatus, Document, InfoRequest, InfoRequestStatus, Note, NoteKind,
        Participants,
    };
    use chrono::{TimeZone, Utc};
    use cmr_types::NonEmptyText;
    use std::collections::{BTreeMap, BTreeSet};
    use uuid::Uuid;

    fn empty_case() -> Case {
        let created = Utc.with_ymd_and_hms(2025, 2, 1, 9, 0, 0).unwrap();
        Case {
            id: Uuid::new_v4(),
            claimant_name: NonEmptyText::new("Jordan Avery").expect("name"),
            case_type: NonEmptyText::new("psych injury").expect("type"),
            status: CaseStatus::Active,
            created_date: created,
            expiry_date: created + chrono::Duration::days(365),
            category_tags: vec![],
            participants: Participants {
                claimant: "Jordan Avery".into(),
                psychologist: "Dr Ash".into(),
                lawyer: "R. Quinn".into(),
                others: vec![],
            },
            current_stage: "intake".into(),
            completed_stages: vec![],
            practice: "cmr.test".into(),
            revision: 0,
            documents: vec![],
            assessments: vec![],
            reports: vec![],
            notes: vec![],
            external_uploads: vec![],
            info_requests: vec![],
            milestones: vec![],
        }
    }

    fn document() -> Document {
        Document {
            id: Uuid::new_v4(),
            name: NonEmptyText::new("form.pdf").expect("name"),
            uploaded_by: "Dr Ash".into(),
            upload_date: Utc::now(),
            size: 100,
            tags: vec![],
        }
    }

    fn assessment(status: AssessmentStatus) -> Assessment {
        Assessment {
            id: Uuid::new_v4(),
            title: NonEmptyText::new("DASS-21").expect("title"),
            status,
            completion_percentage: if status == AssessmentStatus::Completed { 100 } else { 0 },
            results: BTreeMap::new(),
            date: None,
        }
    }

    #[test]
    fn empty_case_reports_zero() {
        assert_eq!(progress(&empty_case()), 0);
    }

    #[test]
    fn worked_example_from_the_dashboard() {
        // 2 documents + 1 completed assessment + 1 in-progress assessment,
        // no reports: total=4, completed=3.
        let mut case = empty_case();
        case.documents.push(document());
        case.documents.push(document());
        case.assessments.push(assessment(AssessmentStatus::Completed));
        case.assessments.push(assessment(AssessmentStatus::InProgress));

        assert_eq!(progress(&case), 75);
    }

    #[test]
    fn result_is_rounded_to_nearest() {
        // 1 of 3 completed = 33.33… rounds to 33; 2 of 3 = 66.67 rounds to 67.
        let mut case = empty_case();
        case.documents.push(document());
        case.assessments.push(assessment(AssessmentStatus::NotStarted));
        case.assessments.push(assessment(AssessmentStatus::NotStarted));
        assert_eq!(progress(&case), 33);

        case.assessments[0].status = AssessmentStatus::Completed;
        assert_eq!(progress(&case), 67);
    }

    #[test]
    fn appending_a_completed_assessment_never_decreases_progress() {
        let mut case = empty_case();
        case.documents.push(document());
        case.assessments.push(assessment(AssessmentStatus::InProgress));

        let before = progress(&case);
        case.assessments.push(assessment(AssessmentStatus::Completed));
        assert!(progress(&case) >= before);
    }

    #[test]
    fn notes_and_info_requests_do_not_move_the_needle() {
        let mut case = empty_case();
        case.documents.push(document());
        let before = progress(&case);

        case.notes.push(Note {
            id: Uuid::new_v4(),
            content: NonEmptyText::new("session note").expect("content"),
            created_by: "Dr Ash".into(),
            created_at: Utc::now(),
            is_private: false,
            visible_to: BTreeSet::new(),
            kind: NoteKind::Write,
        });
        case.info_requests.push(InfoRequest {
            id: Uuid::new_v4(),
            title: NonEmptyText::new("employment history").expect("title"),
            questions: vec!["Where did you work in 2024?".into()],
            answers: vec![],
            status: InfoRequestStatus::Pending,
            requested_by: "R. Quinn".into(),
            requested_at: Utc::now(),
            completed_at: None,
        });

        assert_eq!(progress(&case), before);
    }
}
