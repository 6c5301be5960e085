//! Error handling module
//!
//! Provides the error taxonomy shared by the document sources, the
//! governance model and the query engine.

use thiserror::Error;

/// Governance-wide error type
#[derive(Error, Debug)]
pub enum GovernanceError {
    /// Network or I/O failure while fetching a document
    #[error("Source unavailable: {location}: {reason}")]
    SourceUnavailable { location: String, reason: String },

    /// The document was fetched but could not be understood
    #[error("Malformed document: {location}: {reason}")]
    MalformedDocument { location: String, reason: String },

    /// A direct team lookup named a team that does not exist
    #[error("No team {team:?} found in {known:?}")]
    TeamNotFound { team: String, known: Vec<String> },

    /// No team claims the repository. Expected for non-code or new repos.
    #[error("Repository {0} not found in governance list")]
    NotFound(String),
}

/// Helper function to create a source unavailable error
pub fn source_unavailable(location: impl Into<String>, reason: impl ToString) -> GovernanceError {
    GovernanceError::SourceUnavailable {
        location: location.into(),
        reason: reason.to_string(),
    }
}

/// Helper function to create a malformed document error
pub fn malformed_document(location: impl Into<String>, reason: impl ToString) -> GovernanceError {
    GovernanceError::MalformedDocument {
        location: location.into(),
        reason: reason.to_string(),
    }
}

/// Result type alias for governance operations
pub type GovernanceResult<T> = Result<T, GovernanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = GovernanceError::NotFound("openstack/nova".to_string());
        assert_eq!(
            err.to_string(),
            "Repository openstack/nova not found in governance list"
        );
    }

    #[test]
    fn test_team_not_found_lists_known_teams() {
        let err = GovernanceError::TeamNotFound {
            team: "neutron".to_string(),
            known: vec!["nova".to_string(), "swift".to_string()],
        };
        assert_eq!(
            err.to_string(),
            r#"No team "neutron" found in ["nova", "swift"]"#
        );
    }

    #[test]
    fn test_fetch_failure_messages() {
        let err = source_unavailable("http://example.com", "connection refused");
        assert_eq!(
            err.to_string(),
            "Source unavailable: http://example.com: connection refused"
        );

        let err = malformed_document("projects.yaml", "not a mapping");
        assert_eq!(err.to_string(), "Malformed document: projects.yaml: not a mapping");
    }
}
