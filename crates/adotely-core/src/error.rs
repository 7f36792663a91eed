use thiserror::Error;

use adotely_types::StoreError;

/// A rejected form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn required(field: &'static str) -> Self {
        Self {
            field,
            message: "required".into(),
        }
    }
}

/// How the UI should treat a failure. None of them is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Blocking notice, operation aborted.
    Permission,
    /// Notice, then navigate back.
    NotFound,
    /// Generic failure notice; the user may retry.
    Transient,
    /// Stays on the form; nothing was sent to a collaborator.
    Validation,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("invalid input: {}", field_list(.0))]
    Validation(Vec<FieldError>),

    #[error("already exists: {0}")]
    Duplicate(String),

    #[error("not signed in")]
    NotSignedIn,

    #[error("invalid email or password")]
    InvalidCredentials,
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PermissionDenied(_) | Self::NotSignedIn | Self::InvalidCredentials => {
                ErrorKind::Permission
            }
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Unavailable(_) => ErrorKind::Transient,
            Self::Validation(_) | Self::Duplicate(_) => ErrorKind::Validation,
        }
    }

    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError {
            field,
            message: message.into(),
        }])
    }

    /// `Ok(())` for an empty error list, `Validation` otherwise.
    pub fn check(errors: Vec<FieldError>) -> AppResult<()> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self::Validation(errors))
        }
    }
}

fn field_list(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{} {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::PermissionDenied(why) => Self::PermissionDenied(why),
            StoreError::InvalidPath(path) => Self::invalid("id", format!("unusable key {}", path)),
            StoreError::InvalidCredentials => Self::InvalidCredentials,
            StoreError::EmailTaken(email) => Self::Duplicate(email),
            StoreError::WeakPassword(why) => Self::invalid("password", why),
            StoreError::NotSignedIn => Self::NotSignedIn,
            StoreError::InvalidDocument(why) => Self::Unavailable(why),
            StoreError::Unavailable(why) => Self::Unavailable(why),
            StoreError::Serialization(e) => Self::Unavailable(e.to_string()),
        }
    }
}
