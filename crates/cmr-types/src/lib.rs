//! # CMR Types
//!
//! Validated text primitives shared across the CMR workspace.
//!
//! These newtypes push field-level invariants to the construction site so
//! that downstream code can hold a `NonEmptyText` or `EmailAddress` and
//! never re-check it.

/// Errors that can occur when constructing validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input was empty or contained only whitespace.
    #[error("text cannot be empty")]
    Empty,
    /// The input exceeded the maximum permitted length.
    #[error("text exceeds maximum length of {0} characters")]
    TooLong(usize),
    /// The input was not a plausible email address.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
}

const MAX_TEXT_LEN: usize = 4_096;

/// A string guaranteed to contain at least one non-whitespace character.
///
/// Input is trimmed on construction. The wrapped value is bounded at 4096
/// characters to keep persisted aggregates a sane size.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a `NonEmptyText`, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` if the trimmed input is empty, or
    /// `TextError::TooLong` if it exceeds the length bound.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        if trimmed.len() > MAX_TEXT_LEN {
            return Err(TextError::TooLong(MAX_TEXT_LEN));
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for NonEmptyText {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NonEmptyText::new(&raw).map_err(serde::de::Error::custom)
    }
}

/// A conservatively validated email address.
///
/// This is not full RFC 5322: it accepts the ASCII `local@domain` shapes a
/// practice management system actually sees and rejects anything that could
/// corrupt a notification handoff (whitespace, missing parts, non-ASCII).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates an `EmailAddress` after trimming and lower-casing the input.
    ///
    /// # Errors
    ///
    /// Returns `TextError::InvalidEmail` if the input does not look like a
    /// plausible `local@domain` address.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }

        let valid = trimmed.is_ascii()
            && !trimmed.contains(char::is_whitespace)
            && trimmed.len() <= 254
            && {
                match trimmed.split_once('@') {
                    Some((local, domain)) => {
                        !local.is_empty()
                            && !domain.is_empty()
                            && domain.contains('.')
                            && !domain.starts_with('.')
                            && !domain.ends_with('.')
                            && !domain.contains('@')
                    }
                    None => false,
                }
            };

        if !valid {
            return Err(TextError::InvalidEmail(trimmed.to_owned()));
        }

        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for EmailAddress {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl serde::Serialize for EmailAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for EmailAddress {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        EmailAddress::new(&raw).map_err(serde::de::Error::custom)
    }
}
