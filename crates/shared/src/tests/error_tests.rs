use super::*;

#[test]
fn parses_single_list_and_wrapped_bodies() {
    assert_eq!(
        NetworkError::parse_all(r#"{"code":"TITLE_EMPTY","message":"title"}"#),
        vec![NetworkError::new("TITLE_EMPTY", "title")]
    );

    let list = NetworkError::parse_all(r#"[{"code":"A"},{"code":"B","message":"b"}]"#);
    assert_eq!(
        list.iter().map(|e| e.code.as_str()).collect::<Vec<_>>(),
        ["A", "B"]
    );

    let wrapped = NetworkError::parse_all(r#"{"errors":[{"code":"X"}]}"#);
    assert_eq!(wrapped.len(), 1);
    assert_eq!(wrapped[0].code, "X");
    assert_eq!(wrapped[0].message, None);
}

#[test]
fn unparseable_body_has_no_records() {
    assert!(NetworkError::parse_all("<html>bad gateway</html>").is_empty());
    assert!(NetworkError::parse_all("").is_empty());
}

#[test]
fn partition_splits_verification_errors() {
    let error = ErrorException::Composite(vec![
        SimpleError::verification("TITLE_EMPTY", UiMessage::TitleEmpty),
        SimpleError::new("QUOTA", UiMessage::SaveReportFailed),
        SimpleError::verification("DESCRIPTION_EMPTY", UiMessage::DescriptionEmpty),
    ]);
    let (verification, other) = error.partition();
    assert_eq!(verification.len(), 2);
    assert_eq!(verification[1].code, "DESCRIPTION_EMPTY");
    assert_eq!(other, vec![SimpleError::new("QUOTA", UiMessage::SaveReportFailed)]);
}

#[test]
fn unauthorized_has_no_simple_errors() {
    let (verification, other) = ErrorException::Unauthorized.partition();
    assert!(verification.is_empty());
    assert!(other.is_empty());
}

#[test]
fn equality_ignores_cause() {
    let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
    assert_eq!(SimpleError::generic().with_cause(io), SimpleError::generic());
}
