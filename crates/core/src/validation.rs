//! Input validation utilities.
//!
//! Pure guardrail functions applied before any store mutation. Each returns
//! early with a `CaseError::Validation` describing the violated invariant.

use crate::constants::{
    CATEGORY_TAG_VOCABULARY, DOCUMENT_TAG_VOCABULARY, MAX_CATEGORY_TAGS, MAX_DOCUMENT_TAGS,
};
use crate::error::{CaseError, CaseResult};
use crate::model::{Note, Role};
use chrono::{DateTime, Utc};

/// Validates that a tag belongs to the fixed category vocabulary.
pub fn validate_category_tag(tag: &str) -> CaseResult<()> {
    if CATEGORY_TAG_VOCABULARY.contains(&tag) {
        Ok(())
    } else {
        Err(CaseError::Validation(format!(
            "unknown category tag: {tag}"
        )))
    }
}

/// Validates a case's full category tag selection: every tag from the
/// vocabulary, no duplicates, at most [`MAX_CATEGORY_TAGS`].
pub fn validate_category_tags(tags: &[String]) -> CaseResult<()> {
    if tags.len() > MAX_CATEGORY_TAGS {
        return Err(CaseError::Validation(format!(
            "a case may carry at most {MAX_CATEGORY_TAGS} category tags"
        )));
    }
    for (i, tag) in tags.iter().enumerate() {
        validate_category_tag(tag)?;
        if tags[..i].contains(tag) {
            return Err(CaseError::Validation(format!(
                "duplicate category tag: {tag}"
            )));
        }
    }
    Ok(())
}

/// Applies toggle semantics to a category tag selection.
///
/// Re-selecting a tag already present removes it. Selecting a new tag when
/// the case already holds [`MAX_CATEGORY_TAGS`] is rejected as a no-op: the
/// selection is returned unchanged, mirroring how the selection control
/// behaves.
///
/// # Errors
///
/// Returns `CaseError::Validation` only when the tag is outside the fixed
/// vocabulary. The at-capacity case is not an error.
pub fn toggle_category_tag(tags: &[String], tag: &str) -> CaseResult<Vec<String>> {
    validate_category_tag(tag)?;

    let mut next: Vec<String> = tags.to_vec();
    if let Some(pos) = next.iter().position(|t| t == tag) {
        next.remove(pos);
        return Ok(next);
    }

    if next.len() >= MAX_CATEGORY_TAGS {
        return Ok(next);
    }

    next.push(tag.to_string());
    Ok(next)
}

/// Validates a document's tag set: every tag from the fixed vocabulary, no
/// duplicates, at most [`MAX_DOCUMENT_TAGS`].
pub fn validate_document_tags(tags: &[String]) -> CaseResult<()> {
    if tags.len() > MAX_DOCUMENT_TAGS {
        return Err(CaseError::Validation(format!(
            "a document may carry at most {MAX_DOCUMENT_TAGS} tags"
        )));
    }
    for (i, tag) in tags.iter().enumerate() {
        if !DOCUMENT_TAG_VOCABULARY.contains(&tag.as_str()) {
            return Err(CaseError::Validation(format!("unknown document tag: {tag}")));
        }
        if tags[..i].contains(tag) {
            return Err(CaseError::Validation(format!("duplicate document tag: {tag}")));
        }
    }
    Ok(())
}

/// Validates the privacy shape of a note: `visible_to` must be non-empty
/// exactly when the note is private.
pub fn validate_note(note: &Note) -> CaseResult<()> {
    if note.is_private && note.visible_to.is_empty() {
        return Err(CaseError::Validation(
            "a private note must name at least one role in visible_to".into(),
        ));
    }
    if !note.is_private && !note.visible_to.is_empty() {
        return Err(CaseError::Validation(
            "visible_to is only meaningful on private notes".into(),
        ));
    }
    Ok(())
}

/// Validates a note against its author's role.
///
/// Lawyer-authored notes may only be visible to the clinical/legal pair;
/// widening visibility to the claimant or contributors is a psychologist
/// decision.
pub fn validate_note_for_author(note: &Note, author_role: Role) -> CaseResult<()> {
    validate_note(note)?;

    if author_role == Role::Lawyer
        && note
            .visible_to
            .iter()
            .any(|r| !matches!(r, Role::Psychologist | Role::Lawyer))
    {
        return Err(CaseError::Validation(
            "lawyer notes may only be visible to psychologist and lawyer".into(),
        ));
    }
    Ok(())
}

/// Validates the intake date pair: a case cannot expire before it begins.
pub fn validate_case_dates(
    created_date: DateTime<Utc>,
    expiry_date: DateTime<Utc>,
) -> CaseResult<()> {
    if created_date > expiry_date {
        return Err(CaseError::Validation(
            "created_date must not be after expiry_date".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NoteKind;
    use chrono::TimeZone;
    use cmr_types::NonEmptyText;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn note(is_private: bool, visible_to: &[Role]) -> Note {
        Note {
            id: Uuid::new_v4(),
            content: NonEmptyText::new("session summary").expect("content"),
            created_by: "Dr Ash".into(),
            created_at: Utc::now(),
            is_private,
            visible_to: visible_to.iter().copied().collect::<BTreeSet<_>>(),
            kind: NoteKind::Write,
        }
    }

    #[test]
    fn toggle_adds_a_tag_below_the_cap() {
        let tags = vec!["workcover".to_string()];
        let next = toggle_category_tag(&tags, "insurance").expect("toggle should succeed");
        assert_eq!(next, vec!["workcover".to_string(), "insurance".to_string()]);
    }

    #[test]
    fn toggle_removes_an_already_selected_tag() {
        let tags = vec!["workcover".to_string(), "insurance".to_string()];
        let next = toggle_category_tag(&tags, "workcover").expect("toggle should succeed");
        assert_eq!(next, vec!["insurance".to_string()]);
    }

    #[test]
    fn toggle_is_a_no_op_at_the_cap() {
        let tags = vec![
            "workcover".to_string(),
            "insurance".to_string(),
            "family_law".to_string(),
        ];
        let next = toggle_category_tag(&tags, "veterans").expect("toggle should succeed");
        assert_eq!(next, tags, "a 4th tag must be rejected without error");
    }

    #[test]
    fn toggle_still_removes_at_the_cap() {
        let tags = vec![
            "workcover".to_string(),
            "insurance".to_string(),
            "family_law".to_string(),
        ];
        let next = toggle_category_tag(&tags, "insurance").expect("toggle should succeed");
        assert_eq!(
            next,
            vec!["workcover".to_string(), "family_law".to_string()]
        );
    }

    #[test]
    fn toggle_rejects_tags_outside_the_vocabulary() {
        let err = toggle_category_tag(&[], "conveyancing").expect_err("unknown tag should fail");
        assert!(matches!(err, CaseError::Validation(_)));
    }

    #[test]
    fn document_tags_are_capped_at_five() {
        let tags: Vec<String> = ["report", "correspondence", "legal", "consent", "invoice", "other"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        let err = validate_document_tags(&tags).expect_err("6 tags should fail");
        assert!(matches!(err, CaseError::Validation(_)));
        assert!(validate_document_tags(&tags[..5]).is_ok());
    }

    #[test]
    fn private_note_requires_visible_to() {
        let err = validate_note(&note(true, &[])).expect_err("should fail");
        assert!(matches!(err, CaseError::Validation(_)));
        assert!(validate_note(&note(true, &[Role::Psychologist])).is_ok());
    }

    #[test]
    fn public_note_must_not_carry_visible_to() {
        let err = validate_note(&note(false, &[Role::Lawyer])).expect_err("should fail");
        assert!(matches!(err, CaseError::Validation(_)));
        assert!(validate_note(&note(false, &[])).is_ok());
    }

    #[test]
    fn lawyer_notes_cannot_widen_visibility_to_claimant() {
        let restricted = note(true, &[Role::Psychologist, Role::Lawyer]);
        assert!(validate_note_for_author(&restricted, Role::Lawyer).is_ok());

        let widened = note(true, &[Role::Psychologist, Role::Claimant]);
        let err = validate_note_for_author(&widened, Role::Lawyer).expect_err("should fail");
        assert!(matches!(err, CaseError::Validation(_)));

        // The same visibility is fine when a psychologist writes it.
        let widened = note(true, &[Role::Psychologist, Role::Claimant]);
        assert!(validate_note_for_author(&widened, Role::Psychologist).is_ok());
    }

    #[test]
    fn case_dates_must_be_ordered() {
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let expiry = Utc.with_ymd_and_hms(2025, 2, 1, 9, 0, 0).unwrap();
        let err = validate_case_dates(created, expiry).expect_err("should fail");
        assert!(matches!(err, CaseError::Validation(_)));
        assert!(validate_case_dates(expiry, created).is_ok());
    }
}
