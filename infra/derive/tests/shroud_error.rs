use std::borrow::Cow;

#[shroud_derive::shroud_error]
pub enum DemoError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Locked{}: {message}", format_context(.context))]
    Locked { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn read_missing() -> Result<Vec<u8>, DemoError> {
    std::fs::read("/definitely/not/here").context("Reading fixture")
}

#[test]
fn shroud_error_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/shroud_error_pass.rs");
}

#[test]
fn source_context_is_rendered() {
    let err = read_missing().expect_err("file must not exist");
    assert!(matches!(err, DemoError::Io { .. }));
    assert!(err.to_string().starts_with("IO error (Reading fixture):"), "got: {err}");
}

#[test]
fn context_attaches_to_own_result() {
    let res: Result<(), DemoError> =
        Err(DemoError::Locked { message: "no session".into(), context: None });
    let err = res.context("Loading profiles").expect_err("still an error");
    assert_eq!(err.to_string(), "Locked (Loading profiles): no session");
}

#[test]
fn kind_names_the_variant() {
    let err = DemoError::from("unexpected");
    assert_eq!(err.kind(), "Internal");
    let err = DemoError::Locked { message: "x".into(), context: None };
    assert_eq!(err.kind(), "Locked");
}
