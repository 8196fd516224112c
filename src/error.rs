use serde::Serialize;
use thiserror::Error;

/// Machine-readable reason attached to conflict and validation failures
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NameOrCodeExists,
    ManagerIneligible,
    ManagerAlreadyAssigned,
    CycleDetected,
    MissingField,
    NameTooLong,
    FieldTooLong,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NameOrCodeExists => "NAME_OR_CODE_EXISTS",
            ErrorCode::ManagerIneligible => "MANAGER_INELIGIBLE",
            ErrorCode::ManagerAlreadyAssigned => "MANAGER_ALREADY_ASSIGNED",
            ErrorCode::CycleDetected => "CYCLE_DETECTED",
            ErrorCode::MissingField => "MISSING_FIELD",
            ErrorCode::NameTooLong => "NAME_TOO_LONG",
            ErrorCode::FieldTooLong => "FIELD_TOO_LONG",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse error category reported to callers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Invalid,
    System,
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(ErrorCode),

    #[error("Invalid request: {0}")]
    Invalid(ErrorCode),

    #[error("System error: {0}")]
    System(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::Invalid(_) => ErrorKind::Invalid,
            AppError::System(_) | AppError::Database(_) => ErrorKind::System,
        }
    }

    /// Error code for conflict/validation failures, `None` otherwise
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            AppError::Conflict(code) | AppError::Invalid(code) => Some(*code),
            _ => None,
        }
    }

    /// HTTP status the transport layer should answer with
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Invalid => 400,
            ErrorKind::System => {
                tracing::error!("System error: {}", self);
                500
            }
        }
    }
}

/// Result type alias for application
pub type AppResult<T> = Result<T, AppError>;

/// Helper trait for converting Option to AppError::NotFound
pub trait OptionExt<T> {
    fn ok_or_not_found(self, msg: impl Into<String>) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, msg: impl Into<String>) -> AppResult<T> {
        self.ok_or_else(|| AppError::NotFound(msg.into()))
    }
}
