use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KaizenError {
    #[error("not initialized: run 'kaizen init'")]
    NotInitialized,

    #[error("opportunity not found: {0}")]
    OpportunityNotFound(String),

    #[error("{collection} entry not found: {id}")]
    EntryNotFound { collection: String, id: String },

    #[error("{0} has not been submitted for this opportunity")]
    PhaseNotStarted(String),

    #[error("employee not found: {0}")]
    EmployeeNotFound(String),

    #[error("plant not found: {0}")]
    PlantNotFound(String),

    #[error("opportunity already exists: {0}")]
    OpportunityExists(String),

    #[error("employee {0} is already a team member")]
    DuplicateTeamMember(String),

    #[error("invalid transition from '{from}' on {event}: {reason}")]
    InvalidTransition {
        from: String,
        event: String,
        reason: String,
    },

    #[error("already approved: {0}")]
    AlreadyApproved(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("concurrent modification of opportunity {0}; retry the request")]
    VersionConflict(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Machine-readable classification carried alongside every error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidTransition,
    Unauthorized,
    ValidationFailed,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        }
    }
}

impl KaizenError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KaizenError::OpportunityNotFound(_)
            | KaizenError::EntryNotFound { .. }
            | KaizenError::PhaseNotStarted(_)
            | KaizenError::EmployeeNotFound(_)
            | KaizenError::PlantNotFound(_) => ErrorKind::NotFound,
            KaizenError::OpportunityExists(_) | KaizenError::DuplicateTeamMember(_) => {
                ErrorKind::AlreadyExists
            }
            KaizenError::InvalidTransition { .. } | KaizenError::AlreadyApproved(_) => {
                ErrorKind::InvalidTransition
            }
            KaizenError::Unauthorized(_) => ErrorKind::Unauthorized,
            KaizenError::Validation(_) | KaizenError::NotInitialized => {
                ErrorKind::ValidationFailed
            }
            KaizenError::VersionConflict(_) => ErrorKind::Conflict,
            KaizenError::Storage(_)
            | KaizenError::Io(_)
            | KaizenError::Yaml(_)
            | KaizenError::Json(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn entry_not_found(collection: &str, id: impl ToString) -> Self {
        KaizenError::EntryNotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, KaizenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_classify_errors() {
        assert_eq!(
            KaizenError::OpportunityNotFound("x".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            KaizenError::entry_not_found("action_plan", "abc").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            KaizenError::AlreadyApproved("hod".into()).kind(),
            ErrorKind::InvalidTransition
        );
        assert_eq!(
            KaizenError::Unauthorized("role".into()).kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            KaizenError::VersionConflict("id".into()).kind(),
            ErrorKind::Conflict
        );
    }

    #[test]
    fn entry_not_found_message_names_collection() {
        let err = KaizenError::entry_not_found("team_members", "42");
        assert_eq!(err.to_string(), "team_members entry not found: 42");
    }
}
