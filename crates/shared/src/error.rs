use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const GENERIC_ERROR_CODE: &str = "GENERIC";

/// Message identifiers the presentation layer resolves to user-facing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiMessage {
    GenericError,
    LoginFailed,
    InvalidCredentials,
    UsernameEmpty,
    PasswordEmpty,
    ReportsLoadFailed,
    ReportLoadFailed,
    ReportNotFound,
    CommentFailed,
    CommentEmpty,
    CommentTooLong,
    SaveReportFailed,
    TitleEmpty,
    TitleTooLong,
    DescriptionEmpty,
    AttachmentFailed,
    AttachmentTooLarge,
    AttachmentTypeUnsupported,
    AttachmentsPending,
    ReportCreated,
    SessionExpired,
}

impl UiMessage {
    pub fn text(self) -> &'static str {
        match self {
            Self::GenericError => "Something went wrong, please try again.",
            Self::LoginFailed => "Sign-in failed.",
            Self::InvalidCredentials => "Wrong username or password.",
            Self::UsernameEmpty => "Username is required.",
            Self::PasswordEmpty => "Password is required.",
            Self::ReportsLoadFailed => "Could not load reports.",
            Self::ReportLoadFailed => "Could not load the report.",
            Self::ReportNotFound => "This report no longer exists.",
            Self::CommentFailed => "Could not send the comment.",
            Self::CommentEmpty => "Comment cannot be empty.",
            Self::CommentTooLong => "Comment is too long.",
            Self::SaveReportFailed => "Could not save the report.",
            Self::TitleEmpty => "Title is required.",
            Self::TitleTooLong => "Title is too long.",
            Self::DescriptionEmpty => "Description is required.",
            Self::AttachmentFailed => "Could not upload the attachment.",
            Self::AttachmentTooLarge => "Attachment is too large.",
            Self::AttachmentTypeUnsupported => "Attachment type is not supported.",
            Self::AttachmentsPending => "Wait for attachments to finish uploading.",
            Self::ReportCreated => "Report created.",
            Self::SessionExpired => "Your session has expired, please sign in again.",
        }
    }
}

impl fmt::Display for UiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// `{code, message}` record carried in an error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkError {
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NetworkErrorBody {
    Wrapped { errors: Vec<NetworkError> },
    List(Vec<NetworkError>),
    Single(NetworkError),
}

impl NetworkError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: Some(message.into()),
        }
    }

    /// Parses every error record out of a response body, preserving body order.
    /// Bodies that are not one of the known shapes yield no records.
    pub fn parse_all(body: &str) -> Vec<NetworkError> {
        match serde_json::from_str::<NetworkErrorBody>(body) {
            Ok(NetworkErrorBody::Wrapped { errors }) => errors,
            Ok(NetworkErrorBody::List(errors)) => errors,
            Ok(NetworkErrorBody::Single(error)) => vec![error],
            Err(_) => Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct SimpleError {
    pub code: String,
    pub message: UiMessage,
    pub is_verification_error: bool,
    pub cause: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl SimpleError {
    pub fn new(code: impl Into<String>, message: UiMessage) -> Self {
        Self {
            code: code.into(),
            message,
            is_verification_error: false,
            cause: None,
        }
    }

    pub fn verification(code: impl Into<String>, message: UiMessage) -> Self {
        Self {
            is_verification_error: true,
            ..Self::new(code, message)
        }
    }

    pub fn generic() -> Self {
        Self::new(GENERIC_ERROR_CODE, UiMessage::GenericError)
    }

    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }
}

impl fmt::Debug for SimpleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleError")
            .field("code", &self.code)
            .field("message", &self.message)
            .field("is_verification_error", &self.is_verification_error)
            .field("cause", &self.cause.as_ref().map(|c| c.to_string()))
            .finish()
    }
}

impl fmt::Display for SimpleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

// Causes are diagnostic only and do not take part in equality.
impl PartialEq for SimpleError {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
            && self.message == other.message
            && self.is_verification_error == other.is_verification_error
    }
}

impl Eq for SimpleError {}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorException {
    #[error("{0}")]
    Simple(SimpleError),
    #[error("{} errors", .0.len())]
    Composite(Vec<SimpleError>),
    #[error("unauthorized")]
    Unauthorized,
}

impl ErrorException {
    pub fn generic() -> Self {
        Self::Simple(SimpleError::generic())
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Every Simple error contained in this value, in order.
    pub fn simple_errors(&self) -> &[SimpleError] {
        match self {
            Self::Simple(error) => std::slice::from_ref(error),
            Self::Composite(errors) => errors,
            Self::Unauthorized => &[],
        }
    }

    /// Splits into (field-level verification errors, errors to notify).
    pub fn partition(&self) -> (Vec<SimpleError>, Vec<SimpleError>) {
        self.simple_errors()
            .iter()
            .cloned()
            .partition(|error| error.is_verification_error)
    }
}

impl From<SimpleError> for ErrorException {
    fn from(value: SimpleError) -> Self {
        Self::Simple(value)
    }
}

#[cfg(test)]
#[path = "tests/error_tests.rs"]
mod tests;
