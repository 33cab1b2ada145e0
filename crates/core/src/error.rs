use crate::authz::{Action, ResourceKind};
use crate::model::Role;

/// Errors produced by the case engine.
///
/// The first five variants are the engine's contract with callers:
/// validation, authorization, verification, not-found and state-conflict.
/// The remaining variants carry storage-layer failures with their io/serde
/// sources.
#[derive(Debug, thiserror::Error)]
pub enum CaseError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("role {role} may not {action} {resource}")]
    Authorization {
        role: Role,
        action: Action,
        resource: ResourceKind,
    },

    #[error("verification code rejected")]
    Verification,

    #[error("not found: {0}")]
    NotFound(String),

    #[error(
        "case {case_id} was modified concurrently (expected revision {expected}, found {found})"
    )]
    StateConflict {
        case_id: uuid::Uuid,
        expected: u64,
        found: u64,
    },

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to create case directory: {0}")]
    CaseDirCreation(std::io::Error),
    #[error("failed to write case file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read case file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize case: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize case: {0}")]
    Deserialization(serde_json::Error),
}

impl From<cmr_types::TextError> for CaseError {
    fn from(err: cmr_types::TextError) -> Self {
        CaseError::Validation(err.to_string())
    }
}

pub type CaseResult<T> = std::result::Result<T, CaseError>;
