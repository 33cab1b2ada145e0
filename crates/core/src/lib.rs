//! # CMR Core
//!
//! Core business logic for the CMR case-management engine.
//!
//! This crate contains pure data operations and the derived case views:
//! - Case aggregate persistence with sharded JSON storage ([`store`])
//! - The authorization matrix ([`authz`]) and note visibility resolver
//!   ([`visibility`])
//! - The access verification gate and session grants ([`verification`])
//! - Derived views: activity timeline ([`timeline`]), milestone registry
//!   ([`milestones`]) and completion percentage ([`progress`])
//! - Information requests ([`info_requests`]) and note sharing ([`sharing`])
//!
//! **No API concerns**: HTTP servers, role-claim extraction and DTOs belong
//! in `api-rest` and `api-shared`.

pub mod authz;
pub mod config;
pub mod constants;
pub mod error;
pub mod info_requests;
pub mod milestones;
pub mod model;
pub mod progress;
pub mod sharing;
pub mod store;
pub mod timeline;
pub mod validation;
pub mod verification;
pub mod visibility;

pub use config::CoreConfig;
pub use constants::DEFAULT_CASE_DATA_DIR;
pub use error::{CaseError, CaseResult};
pub use model::{Case, CaseItem, CasePatch, CaseStatus, CaseSummary, Role, ShareGrant};
pub use store::{CaseStore, NewCase};
pub use verification::{SessionGrants, StaticCodeIssuer, Verification, VerificationGate};
