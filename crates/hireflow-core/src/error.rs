//! Common error types for hireflow.

use std::str::FromStr;

use thiserror::Error;

use crate::ids::IdError;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors shared across the hireflow crates.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A path or body field did not contain a valid identifier.
    #[error("invalid {field}: {source}")]
    InvalidId {
        /// Name of the offending field.
        field: &'static str,
        /// The underlying parse error.
        source: IdError,
    },

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Parse an identifier, tagging failures with the field they came from.
///
/// # Errors
///
/// Returns `CoreError::InvalidId` if `value` does not parse.
pub fn parse_id<T>(field: &'static str, value: &str) -> Result<T>
where
    T: FromStr<Err = IdError>,
{
    value
        .parse()
        .map_err(|source| CoreError::InvalidId { field, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::AgentId;

    #[test]
    fn parse_id_tags_field() {
        let err = parse_id::<AgentId>("agent_id", "nope").unwrap_err();
        assert_eq!(err.to_string(), "invalid agent_id: invalid UUID format");
    }

    #[test]
    fn parse_id_accepts_uuid() {
        let id = AgentId::generate();
        let parsed: AgentId = parse_id("agent_id", &id.to_string()).unwrap();
        assert_eq!(parsed, id);
    }
}
