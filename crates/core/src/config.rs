//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into
//! services as an immutable value. Request handling never reads process-wide
//! environment variables; that keeps behaviour consistent across
//! multi-threaded runtimes and test harnesses.

use crate::constants::CASES_DIR_NAME;
use crate::error::{CaseError, CaseResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    case_data_dir: PathBuf,
    access_code: String,
    practice_namespace: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// The access code is the value the external authenticator issued for
    /// this deployment; it is compared by the verification gate and never
    /// embedded in engine code.
    ///
    /// # Errors
    ///
    /// Returns `CaseError::Validation` if the practice namespace is empty,
    /// or the access code is empty or contains non-digit characters.
    pub fn new(
        case_data_dir: PathBuf,
        access_code: String,
        practice_namespace: String,
    ) -> CaseResult<Self> {
        if practice_namespace.trim().is_empty() {
            return Err(CaseError::Validation(
                "practice_namespace cannot be empty".into(),
            ));
        }

        let access_code = access_code.trim().to_string();
        if access_code.is_empty() {
            return Err(CaseError::Validation("access_code cannot be empty".into()));
        }
        if !access_code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CaseError::Validation(
                "access_code must contain only digits".into(),
            ));
        }

        Ok(Self {
            case_data_dir,
            access_code,
            practice_namespace,
        })
    }

    pub fn case_data_dir(&self) -> &Path {
        &self.case_data_dir
    }

    pub fn cases_dir(&self) -> PathBuf {
        self.case_data_dir.join(CASES_DIR_NAME)
    }

    pub fn access_code(&self) -> &str {
        &self.access_code
    }

    pub fn practice_namespace(&self) -> &str {
        &self.practice_namespace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_accepts_digit_code() {
        let cfg = CoreConfig::new("data".into(), "778899".into(), "cmr.dev.1".into())
            .expect("config should build");
        assert_eq!(cfg.access_code(), "778899");
        assert_eq!(cfg.cases_dir(), PathBuf::from("data").join("cases"));
    }

    #[test]
    fn config_trims_the_access_code() {
        let cfg = CoreConfig::new("data".into(), " 778899 ".into(), "cmr.dev.1".into())
            .expect("config should build");
        assert_eq!(cfg.access_code(), "778899");
    }

    #[test]
    fn config_rejects_non_digit_code() {
        let err = CoreConfig::new("data".into(), "77a899".into(), "cmr.dev.1".into())
            .expect_err("config should reject letters in the code");
        assert!(matches!(err, CaseError::Validation(_)));
    }

    #[test]
    fn config_rejects_empty_namespace() {
        let err = CoreConfig::new("data".into(), "778899".into(), "  ".into())
            .expect_err("config should reject an empty namespace");
        assert!(matches!(err, CaseError::Validation(_)));
    }
}
