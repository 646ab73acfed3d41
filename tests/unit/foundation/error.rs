use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        MoshError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        MoshError::resource("x")
            .to_string()
            .contains("resource error:")
    );
    assert!(
        MoshError::evaluation("x")
            .to_string()
            .contains("evaluation error:")
    );
    assert!(
        MoshError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn only_resource_errors_report_resource() {
    assert!(MoshError::resource("oom").is_resource());
    assert!(!MoshError::validation("bad").is_resource());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = MoshError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
