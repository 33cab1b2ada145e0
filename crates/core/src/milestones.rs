//! The milestone registry.
//!
//! Milestones are curated by hand: created explicitly, never derived from
//! the timeline, so only the events someone chose to flag appear here.
//! Status transitions are likewise explicit.
//!
//! A milestone may reference a record in another collection through
//! `related_item_id`. A dangling reference is a data-integrity warning,
//! not an error: the milestone renders unlinked and the read path carries
//! on.

use crate::model::{Case, Milestone};

/// All milestones sorted ascending by date for chronological display.
/// Equal dates keep creation order.
pub fn sorted(case: &Case) -> Vec<Milestone> {
    let mut milestones = case.milestones.clone();
    milestones.sort_by_key(|m| m.date);
    milestones
}

/// The `n` most-recently-dated milestones, newest first.
pub fn recent(case: &Case, n: usize) -> Vec<Milestone> {
    let mut milestones = sorted(case);
    milestones.reverse();
    milestones.truncate(n);
    milestones
}

/// Resolves a milestone's related-item reference.
///
/// Returns `None` when the milestone carries no reference, `Some(true)`
/// when the referenced record exists, and `Some(false)` for a dangling
/// reference, which is logged as an integrity warning.
pub fn resolve_link(case: &Case, milestone: &Milestone) -> Option<bool> {
    let related = milestone.related_item_id?;
    let exists = case.contains_item(related);
    if !exists {
        tracing::warn!(
            case_id = %case.id,
            milestone_id = %milestone.id,
            related_item_id = %related,
            "milestone references a missing item; rendering unlinked"
        );
    }
    Some(exists)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        CaseStatus, Document, MilestoneKind, MilestoneStatus, Participants,
    };
    use chrono::{DateTime, TimeZone, Utc};
    use cmr_types::NonEmptyText;
    use uuid::Uuid;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, day, 10, 0, 0).unwrap()
    }

    fn milestone(title: &str, day: u32, related: Option<Uuid>) -> Milestone {
        Milestone {
            id: Uuid::new_v4(),
            kind: MilestoneKind::KeySession,
            title: NonEmptyText::new(title).expect("title"),
            date: ts(day),
            description: String::new(),
            status: MilestoneStatus::Pending,
            related_item_id: related,
        }
    }

    fn case_with(milestones: Vec<Milestone>) -> Case {
        Case {
            id: Uuid::new_v4(),
            claimant_name: NonEmptyText::new("Jordan Avery").expect("name"),
            case_type: NonEmptyText::new("psych injury").expect("type"),
            status: CaseStatus::Active,
            created_date: ts(1),
            expiry_date: ts(28),
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
            milestones,
        }
    }

    #[test]
    fn sorted_returns_ascending_by_date() {
        let case = case_with(vec![
            milestone("closing conference", 20, None),
            milestone("intake", 2, None),
            milestone("first session", 9, None),
        ]);

        let titles: Vec<String> = sorted(&case).iter().map(|m| m.title.to_string()).collect();
        assert_eq!(titles, vec!["intake", "first session", "closing conference"]);
    }

    #[test]
    fn recent_returns_newest_first_and_truncates() {
        let case = case_with(vec![
            milestone("intake", 2, None),
            milestone("first session", 9, None),
            milestone("closing conference", 20, None),
        ]);

        let titles: Vec<String> = recent(&case, 2)
            .iter()
            .map(|m| m.title.to_string())
            .collect();
        assert_eq!(titles, vec!["closing conference", "first session"]);
    }

    #[test]
    fn recent_with_large_n_returns_everything() {
        let case = case_with(vec![milestone("intake", 2, None)]);
        assert_eq!(recent(&case, 10).len(), 1);
    }

    #[test]
    fn resolve_link_distinguishes_linked_dangling_and_unreferenced() {
        let doc_id = Uuid::new_v4();
        let mut case = case_with(vec![
            milestone("linked", 3, Some(doc_id)),
            milestone("dangling", 4, Some(Uuid::new_v4())),
            milestone("unreferenced", 5, None),
        ]);
        case.documents.push(Document {
            id: doc_id,
            name: NonEmptyText::new("referral.pdf").expect("name"),
            uploaded_by: "Dr Ash".into(),
            upload_date: ts(3),
            size: 64,
            tags: vec![],
        });

        assert_eq!(resolve_link(&case, &case.milestones[0]), Some(true));
        assert_eq!(resolve_link(&case, &case.milestones[1]), Some(false));
        assert_eq!(resolve_link(&case, &case.milestones[2]), None);
    }
}
