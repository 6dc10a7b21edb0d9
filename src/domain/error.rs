use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    #[error("recurring task has no schedule entries")]
    NoSchedule,
    #[error("no schedule entry matches today or an upcoming day")]
    NoMatchingDay,
    #[error("malformed task: {0}")]
    MalformedTask(String),
}

impl DomainError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat(_) => "invalid_format",
            Self::NoSchedule => "no_schedule",
            Self::NoMatchingDay => "no_matching_day",
            Self::MalformedTask(_) => "malformed_task",
        }
    }
}
