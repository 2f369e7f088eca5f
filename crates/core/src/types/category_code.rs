//! Category code type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`CategoryCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CategoryCodeError {
    /// The input string is empty.
    #[error("category code cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("category code must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains whitespace.
    #[error("category code cannot contain whitespace")]
    Whitespace,
}

/// The operator-chosen code of a category.
///
/// Products reference their category by this code, not by the category's
/// store-assigned id, so it acts as the stable foreign key of the catalog.
///
/// ## Constraints
///
/// - Length: 1-32 characters
/// - No whitespace (codes are single command arguments)
///
/// ## Examples
///
/// ```
/// use shelf_core::CategoryCode;
///
/// assert!(CategoryCode::parse("4").is_ok());
/// assert!(CategoryCode::parse("drinks").is_ok());
///
/// assert!(CategoryCode::parse("").is_err());
/// assert!(CategoryCode::parse("two words").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct CategoryCode(String);

impl CategoryCode {
    /// Maximum length of a category code.
    pub const MAX_LENGTH: usize = 32;

    /// Parse a `CategoryCode` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, longer than 32 characters,
    /// or contains whitespace.
    pub fn parse(s: &str) -> Result<Self, CategoryCodeError> {
        if s.is_empty() {
            return Err(CategoryCodeError::Empty);
        }

        if s.chars().count() > Self::MAX_LENGTH {
            return Err(CategoryCodeError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if s.chars().any(char::is_whitespace) {
            return Err(CategoryCodeError::Whitespace);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `CategoryCode` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CategoryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CategoryCode {
    type Err = CategoryCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for CategoryCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
