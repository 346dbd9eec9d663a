//! Feature error catalogs: turn an HTTP failure into the typed taxonomy.

use std::{collections::HashMap, sync::Arc};

use shared::error::{ErrorException, NetworkError, SimpleError, UiMessage};

use crate::transport::HttpFailure;

pub const UNAUTHORIZED_STATUS: u16 = 401;

/// Converts an HTTP failure into an [`ErrorException`].
pub trait Classifier: Send + Sync {
    fn classify(&self, failure: &HttpFailure) -> ErrorException;
}

impl<F> Classifier for F
where
    F: Fn(&HttpFailure) -> ErrorException + Send + Sync,
{
    fn classify(&self, failure: &HttpFailure) -> ErrorException {
        self(failure)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CatalogEntry {
    message: UiMessage,
    verification: bool,
}

/// Lookup table from backend error codes to user-facing errors for one
/// feature, plus the message used for anything the table does not know.
#[derive(Debug, Clone)]
pub struct ErrorCatalog {
    feature: &'static str,
    entries: HashMap<String, CatalogEntry>,
    generic: UiMessage,
    unauthorized_on_401: bool,
}

impl ErrorCatalog {
    pub fn new(feature: &'static str, generic: UiMessage) -> Self {
        Self {
            feature,
            entries: HashMap::new(),
            generic,
            unauthorized_on_401: false,
        }
    }

    /// Field-level error shown inline on the originating input.
    pub fn verification(mut self, code: &str, message: UiMessage) -> Self {
        self.entries.insert(
            code.to_string(),
            CatalogEntry {
                message,
                verification: true,
            },
        );
        self
    }

    /// Error surfaced as a transient notification.
    pub fn notification(mut self, code: &str, message: UiMessage) -> Self {
        self.entries.insert(
            code.to_string(),
            CatalogEntry {
                message,
                verification: false,
            },
        );
        self
    }

    /// Treat HTTP 401 as an invalid session.
    pub fn session_checked(mut self) -> Self {
        self.unauthorized_on_401 = true;
        self
    }

    pub fn feature(&self) -> &'static str {
        self.feature
    }

    pub fn generic_error(&self, code: impl Into<String>) -> SimpleError {
        SimpleError::new(code, self.generic)
    }

    pub fn lookup(&self, record: &NetworkError) -> SimpleError {
        match self.entries.get(&record.code) {
            Some(entry) if entry.verification => {
                SimpleError::verification(record.code.clone(), entry.message)
            }
            Some(entry) => SimpleError::new(record.code.clone(), entry.message),
            None => self.generic_error(record.code.clone()),
        }
    }

    pub fn into_classifier(self) -> Arc<dyn Classifier> {
        Arc::new(self)
    }
}

impl Classifier for ErrorCatalog {
    fn classify(&self, failure: &HttpFailure) -> ErrorException {
        if self.unauthorized_on_401 && failure.status == UNAUTHORIZED_STATUS {
            return ErrorException::Unauthorized;
        }

        let records = failure
            .body
            .as_deref()
            .map(NetworkError::parse_all)
            .unwrap_or_default();
        let mut errors: Vec<SimpleError> = records.iter().map(|record| self.lookup(record)).collect();

        match errors.len() {
            0 => ErrorException::Simple(self.generic_error(format!("HTTP_{}", failure.status))),
            1 => ErrorException::Simple(errors.remove(0)),
            _ => ErrorException::Composite(errors),
        }
    }
}

pub mod catalogs {
    //! Catalogs for the shipped features.

    use super::ErrorCatalog;
    use shared::error::UiMessage;

    pub const USERNAME_EMPTY: &str = "USERNAME_EMPTY";
    pub const PASSWORD_EMPTY: &str = "PASSWORD_EMPTY";
    pub const INVALID_CREDENTIALS: &str = "INVALID_CREDENTIALS";
    pub const REPORT_NOT_FOUND: &str = "REPORT_NOT_FOUND";
    pub const COMMENT_EMPTY: &str = "COMMENT_EMPTY";
    pub const COMMENT_TOO_LONG: &str = "COMMENT_TOO_LONG";
    pub const TITLE_EMPTY: &str = "TITLE_EMPTY";
    pub const TITLE_TOO_LONG: &str = "TITLE_TOO_LONG";
    pub const DESCRIPTION_EMPTY: &str = "DESCRIPTION_EMPTY";
    pub const ATTACHMENT_TOO_LARGE: &str = "ATTACHMENT_TOO_LARGE";
    pub const ATTACHMENT_TYPE_UNSUPPORTED: &str = "ATTACHMENT_TYPE_UNSUPPORTED";

    pub fn login() -> ErrorCatalog {
        ErrorCatalog::new("login", UiMessage::LoginFailed)
            .verification(USERNAME_EMPTY, UiMessage::UsernameEmpty)
            .verification(PASSWORD_EMPTY, UiMessage::PasswordEmpty)
            .notification(INVALID_CREDENTIALS, UiMessage::InvalidCredentials)
    }

    pub fn report_list() -> ErrorCatalog {
        ErrorCatalog::new("report_list", UiMessage::ReportsLoadFailed).session_checked()
    }

    pub fn report_detail() -> ErrorCatalog {
        ErrorCatalog::new("report_detail", UiMessage::ReportLoadFailed)
            .session_checked()
            .notification(REPORT_NOT_FOUND, UiMessage::ReportNotFound)
    }

    pub fn comments() -> ErrorCatalog {
        ErrorCatalog::new("comments", UiMessage::CommentFailed)
            .session_checked()
            .notification(REPORT_NOT_FOUND, UiMessage::ReportNotFound)
            .verification(COMMENT_EMPTY, UiMessage::CommentEmpty)
            .verification(COMMENT_TOO_LONG, UiMessage::CommentTooLong)
    }

    pub fn create_report() -> ErrorCatalog {
        ErrorCatalog::new("create_report", UiMessage::SaveReportFailed)
            .session_checked()
            .verification(TITLE_EMPTY, UiMessage::TitleEmpty)
            .verification(TITLE_TOO_LONG, UiMessage::TitleTooLong)
            .verification(DESCRIPTION_EMPTY, UiMessage::DescriptionEmpty)
    }

    pub fn attachments() -> ErrorCatalog {
        ErrorCatalog::new("attachments", UiMessage::AttachmentFailed)
            .session_checked()
            .notification(ATTACHMENT_TOO_LARGE, UiMessage::AttachmentTooLarge)
            .notification(
                ATTACHMENT_TYPE_UNSUPPORTED,
                UiMessage::AttachmentTypeUnsupported,
            )
    }
}

#[cfg(test)]
#[path = "tests/error_tests.rs"]
mod tests;
