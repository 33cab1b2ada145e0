//! The information request subsystem.
//!
//! Structured question/answer exchanges directed at the claimant. A request
//! starts `pending` with its ordered questions and completes atomically:
//! either every question receives a non-empty answer in one submission, or
//! nothing is persisted and the request stays `pending`.

use crate::error::{CaseError, CaseResult};
use crate::model::{InfoRequest, InfoRequestStatus};
use chrono::Utc;
use cmr_types::NonEmptyText;
use uuid::Uuid;

/// Builds a new pending request.
///
/// # Errors
///
/// Returns `CaseError::Validation` if the question list is empty or any
/// question is blank.
pub fn new_request(
    title: NonEmptyText,
    questions: Vec<String>,
    requested_by: &str,
) -> CaseResult<InfoRequest> {
    if questions.is_empty() {
        return Err(CaseError::Validation(
            "an information request needs at least one question".into(),
        ));
    }
    if questions.iter().any(|q| q.trim().is_empty()) {
        return Err(CaseError::Validation("questions must not be blank".into()));
    }

    Ok(InfoRequest {
        id: Uuid::new_v4(),
        title,
        questions,
        answers: Vec::new(),
        status: InfoRequestStatus::Pending,
        requested_by: requested_by.to_string(),
        requested_at: Utc::now(),
        completed_at: None,
    })
}

/// Validates an answer submission against the request it targets.
///
/// Runs before any mutation, so a failed submission leaves the request
/// `pending` with no partial answers.
///
/// # Errors
///
/// Returns `CaseError::Validation` if the request is already completed, the
/// answer count does not match the question count, or any answer is empty.
pub fn validate_answers(request: &InfoRequest, answers: &[String]) -> CaseResult<()> {
    if request.status == InfoRequestStatus::Completed {
        return Err(CaseError::Validation(
            "information request is already completed".into(),
        ));
    }
    if answers.len() != request.questions.len() {
        return Err(CaseError::Validation(format!(
            "expected {} answers, got {}",
            request.questions.len(),
            answers.len()
        )));
    }
    if answers.iter().any(|a| a.trim().is_empty()) {
        return Err(CaseError::Validation("answers must not be empty".into()));
    }
    Ok(())
}
