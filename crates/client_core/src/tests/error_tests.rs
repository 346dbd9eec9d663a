use super::catalogs::*;
use super::*;
use shared::error::GENERIC_ERROR_CODE;

fn failure(status: u16, body: &str) -> HttpFailure {
    HttpFailure {
        status,
        body: Some(body.to_string()),
    }
}

#[test]
fn known_codes_keep_their_kind() {
    let catalog = login();

    let verification = catalog.lookup(&NetworkError::new(USERNAME_EMPTY, "blank"));
    assert!(verification.is_verification_error);
    assert_eq!(verification.message, UiMessage::UsernameEmpty);

    let notification = catalog.lookup(&NetworkError::new(INVALID_CREDENTIALS, "nope"));
    assert!(!notification.is_verification_error);
    assert_eq!(notification.message, UiMessage::InvalidCredentials);
}

#[test]
fn unknown_code_uses_the_feature_generic_message() {
    let error = report_detail().lookup(&NetworkError::new("DB_DOWN", "oops"));
    assert_eq!(error.code, "DB_DOWN");
    assert_eq!(error.message, UiMessage::ReportLoadFailed);
    assert!(!error.is_verification_error);
}

#[test]
fn body_without_records_becomes_status_coded_generic() {
    let catalog = report_list();
    assert_eq!(
        catalog.classify(&failure(500, "<html>bad gateway</html>")),
        ErrorException::Simple(SimpleError::new("HTTP_500", UiMessage::ReportsLoadFailed))
    );
    assert_eq!(
        catalog.classify(&HttpFailure {
            status: 502,
            body: None
        }),
        ErrorException::Simple(SimpleError::new("HTTP_502", UiMessage::ReportsLoadFailed))
    );
}

#[test]
fn list_body_keeps_record_order() {
    let body = r#"[{"code":"DESCRIPTION_EMPTY"},{"code":"TITLE_TOO_LONG","message":"max 120"}]"#;
    let ErrorException::Composite(errors) = create_report().classify(&failure(422, body)) else {
        panic!("expected composite");
    };
    let codes: Vec<_> = errors.iter().map(|error| error.code.as_str()).collect();
    assert_eq!(codes, vec![DESCRIPTION_EMPTY, TITLE_TOO_LONG]);
    assert!(errors.iter().all(|error| error.is_verification_error));
}

#[test]
fn unauthorized_only_for_session_checked_catalogs() {
    let rejected = failure(401, r#"{"code":"INVALID_CREDENTIALS"}"#);
    assert_eq!(
        login().classify(&rejected),
        ErrorException::Simple(SimpleError::new(
            INVALID_CREDENTIALS,
            UiMessage::InvalidCredentials
        ))
    );
    assert_eq!(comments().classify(&rejected), ErrorException::Unauthorized);
    assert_eq!(attachments().classify(&rejected), ErrorException::Unauthorized);
}

#[test]
fn partition_splits_verification_from_notifications() {
    let body = r#"{"errors":[{"code":"COMMENT_EMPTY"},{"code":"REPORT_NOT_FOUND"}]}"#;
    let error = comments().classify(&failure(400, body));
    let (verification, other) = error.partition();
    assert_eq!(verification.len(), 1);
    assert_eq!(verification[0].message, UiMessage::CommentEmpty);
    assert_eq!(other.len(), 1);
    assert_eq!(other[0].message, UiMessage::ReportNotFound);
}

#[test]
fn generic_error_keeps_given_code() {
    let error = attachments().generic_error(GENERIC_ERROR_CODE);
    assert_eq!(error.code, GENERIC_ERROR_CODE);
    assert_eq!(error.message, UiMessage::AttachmentFailed);
    assert_eq!(attachments().feature(), "attachments");
}
