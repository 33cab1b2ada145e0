//! Constants used throughout the CMR core crate.
//!
//! Path and filename constants keep the storage layout in one place. The
//! tag vocabularies are fixed reference data: configuration loaded once at
//! compile time, never runtime state.

/// Directory name for case record storage.
pub const CASES_DIR_NAME: &str = "cases";

/// Default directory for case data storage when none is configured.
pub const DEFAULT_CASE_DATA_DIR: &str = "case_data";

/// Filename for the persisted case aggregate within a case directory.
pub const CASE_JSON_FILENAME: &str = "case.json";

/// Maximum number of category tags a case may carry.
pub const MAX_CATEGORY_TAGS: usize = 3;

/// Maximum number of tags a document may carry.
pub const MAX_DOCUMENT_TAGS: usize = 5;

/// Fixed vocabulary for case category tags.
pub const CATEGORY_TAG_VOCABULARY: &[&str] = &[
    "workcover",
    "motor_vehicle",
    "public_liability",
    "medico_legal",
    "family_law",
    "insurance",
    "veterans",
    "employment",
];

/// Fixed vocabulary for document tags.
pub const DOCUMENT_TAG_VOCABULARY: &[&str] = &[
    "report",
    "correspondence",
    "medical_records",
    "assessment",
    "legal",
    "consent",
    "invoice",
    "imaging",
    "referral",
    "other",
];
