use crate::domain::error::DomainError;
use crate::infrastructure::error::InfraError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("store error: {0}")]
    Store(InfraError),
}

impl From<InfraError> for ServiceError {
    fn from(error: InfraError) -> Self {
        match error {
            InfraError::Domain(error) => Self::Domain(error),
            InfraError::NotFound(message) => Self::NotFound(message),
            InfraError::Conflict(message) => Self::Conflict(message),
            InfraError::Upload(message) => Self::InvalidInput(message),
            InfraError::Api { status: 401, message, .. } => Self::Unauthorized(message),
            InfraError::Api { status: 403, message, .. } => Self::Forbidden(message),
            InfraError::Api { status: 404, message, .. } => Self::NotFound(message),
            InfraError::Api { status: 409, message, .. } => Self::Conflict(message),
            InfraError::Api { status: 400, message, .. } => Self::InvalidInput(message),
            InfraError::Api { status: 422, message, .. } => {
                Self::Domain(DomainError::MalformedTask(message))
            }
            other => Self::Store(other),
        }
    }
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Domain(error) => error.code(),
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::InvalidInput(_) => "invalid_input",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::Store(_) => "store_error",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infra_errors_map_to_service_variants() {
        assert!(matches!(
            ServiceError::from(InfraError::NotFound("task x".to_string())),
            ServiceError::NotFound(_)
        ));
        assert!(matches!(
            ServiceError::from(InfraError::Conflict("stale".to_string())),
            ServiceError::Conflict(_)
        ));
        assert!(matches!(
            ServiceError::from(InfraError::Api {
                status: 401,
                code: "unauthorized".to_string(),
                message: "expired".to_string(),
            }),
            ServiceError::Unauthorized(_)
        ));
        assert!(matches!(
            ServiceError::from(InfraError::InvalidConfig("bad".to_string())),
            ServiceError::Store(_)
        ));
    }

    #[test]
    fn codes_and_retryability() {
        let malformed = ServiceError::from(DomainError::MalformedTask("x".to_string()));
        assert_eq!(malformed.code(), "malformed_task");
        assert!(!malformed.is_retryable());
        let stored = ServiceError::from(InfraError::Domain(DomainError::MalformedTask(
            "recurringDays missing".to_string(),
        )));
        assert!(matches!(stored, ServiceError::Domain(DomainError::MalformedTask(_))));
        assert!(!stored.is_retryable());
        assert!(ServiceError::Conflict("stale".to_string()).is_retryable());
        assert!(ServiceError::Store(InfraError::Http("timeout".to_string())).is_retryable());
        assert!(!ServiceError::Forbidden("other user".to_string()).is_retryable());
    }
}
