//! Customer lookup code.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`UniqueCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UniqueCodeError {
    /// The input is empty after trimming.
    #[error("customer code cannot be empty")]
    Empty,
    /// The input is too long.
    #[error("customer code must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// Short code staff use to find a customer at the counter.
///
/// Codes are not primary keys and several customers may share one; a lookup
/// by code returns every match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct UniqueCode(String);

impl UniqueCode {
    /// Maximum length of a code.
    pub const MAX_LENGTH: usize = 32;

    /// Width that imported codes are zero-padded to.
    pub const IMPORT_WIDTH: usize = 4;

    /// Parse a code entered by a user, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty or longer than 32 characters.
    pub fn parse(s: &str) -> Result<Self, UniqueCodeError> {
        let s = s.trim();

        if s.is_empty() {
            return Err(UniqueCodeError::Empty);
        }

        if s.chars().count() > Self::MAX_LENGTH {
            return Err(UniqueCodeError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        Ok(Self(s.to_owned()))
    }

    /// Parse a code read from a spreadsheet.
    ///
    /// Spreadsheets tend to store codes as numbers and lose leading zeros,
    /// so codes shorter than [`Self::IMPORT_WIDTH`] are left-padded with `0`.
    ///
    /// ```
    /// use loyalty_card_core::UniqueCode;
    ///
    /// assert_eq!(UniqueCode::from_import("7").unwrap().as_str(), "0007");
    /// assert_eq!(UniqueCode::from_import("12345").unwrap().as_str(), "12345");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`Self::parse`].
    pub fn from_import(s: &str) -> Result<Self, UniqueCodeError> {
        let code = Self::parse(s)?;
        let len = code.0.chars().count();
        if len >= Self::IMPORT_WIDTH {
            return Ok(code);
        }

        let mut padded = "0".repeat(Self::IMPORT_WIDTH - len);
        padded.push_str(&code.0);
        Ok(Self(padded))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `UniqueCode` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for UniqueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for UniqueCode {
    type Err = UniqueCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for UniqueCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_leading_zeros() {
        assert_eq!(UniqueCode::parse(" 0042 ").unwrap().as_str(), "0042");
    }

    #[test]
    fn test_parse_does_not_pad() {
        assert_eq!(UniqueCode::parse("7").unwrap().as_str(), "7");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(UniqueCode::parse(""), Err(UniqueCodeError::Empty));
        assert_eq!(UniqueCode::parse("  "), Err(UniqueCodeError::Empty));
    }

    #[test]
    fn test_parse_too_long() {
        assert!(matches!(
            UniqueCode::parse(&"9".repeat(33)),
            Err(UniqueCodeError::TooLong { max: 32 })
        ));
    }

    #[test]
    fn test_from_import_pads_short_codes() {
        assert_eq!(UniqueCode::from_import("1").unwrap().as_str(), "0001");
        assert_eq!(UniqueCode::from_import("123").unwrap().as_str(), "0123");
        assert_eq!(UniqueCode::from_import("1234").unwrap().as_str(), "1234");
        assert_eq!(UniqueCode::from_import("AB").unwrap().as_str(), "00AB");
    }

    #[test]
    fn test_from_import_empty() {
        assert_eq!(UniqueCode::from_import(" "), Err(UniqueCodeError::Empty));
    }
}
