//! Fixed category code → rank table used by the order reset.

use shelf_core::{CategoryCode, CategoryCodeError};
use thiserror::Error;

/// Default baseline as `code:rank` pairs.
pub const STANDARD_BASELINE: &str = "4:1,3:2,2:3,6:4,5:5,7:6,8:7,9:8";

/// Errors parsing a baseline table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BaselineError {
    #[error("entry '{0}' is not of the form code:rank")]
    Malformed(String),
    #[error("invalid category code in '{entry}': {source}")]
    Code {
        entry: String,
        #[source]
        source: CategoryCodeError,
    },
    #[error("invalid rank in '{0}'")]
    Rank(String),
    #[error("category code '{0}' appears twice")]
    Duplicate(String),
    #[error("baseline order is empty")]
    Empty,
}

/// Ranks assigned to known category codes by the order reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineOrder {
    entries: Vec<(CategoryCode, i32)>,
}

impl BaselineOrder {
    /// Parse `code:rank` pairs separated by commas.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed entries, bad codes or ranks, and
    /// duplicate codes.
    pub fn parse(s: &str) -> Result<Self, BaselineError> {
        let mut entries: Vec<(CategoryCode, i32)> = Vec::new();

        for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (code, rank) = entry
                .split_once(':')
                .ok_or_else(|| BaselineError::Malformed(entry.to_owned()))?;
            let code = CategoryCode::parse(code.trim()).map_err(|source| BaselineError::Code {
                entry: entry.to_owned(),
                source,
            })?;
            let rank = rank
                .trim()
                .parse::<i32>()
                .map_err(|_| BaselineError::Rank(entry.to_owned()))?;

            if entries.iter().any(|(known, _)| known == &code) {
                return Err(BaselineError::Duplicate(code.into_inner()));
            }
            entries.push((code, rank));
        }

        if entries.is_empty() {
            return Err(BaselineError::Empty);
        }
        Ok(Self { entries })
    }

    /// The deployment's standard ordering.
    #[must_use]
    pub fn standard() -> Self {
        let entries = STANDARD_BASELINE
            .split(',')
            .filter_map(|entry| {
                let (code, rank) = entry.split_once(':')?;
                Some((CategoryCode::parse(code).ok()?, rank.parse().ok()?))
            })
            .collect();
        Self { entries }
    }

    /// Rank of a code, if the baseline knows it.
    #[must_use]
    pub fn rank(&self, code: &CategoryCode) -> Option<i32> {
        self.entries
            .iter()
            .find(|(known, _)| known == code)
            .map(|&(_, rank)| rank)
    }
}

impl Default for BaselineOrder {
    fn default() -> Self {
        Self::standard()
    }
}
