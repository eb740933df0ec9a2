use constraint_filter::{filter_datasources, EvalContext, EvalError, FilterError, HostFacts};
use serde_json::json;

fn ctx() -> EvalContext {
    let facts = HostFacts {
        agent_id: "id".into(),
        agent_version: "7.6.0".into(),
        architecture: "aarch64".into(),
        os_family: "darwin".into(),
        os_kernel: "23.1.0".into(),
        os_platform: "darwin".into(),
        os_version: "14.1".into(),
    };
    EvalContext::from_provider(&facts).unwrap()
}

// A constraints field holding a mapping is rejected before anything is evaluated.
#[test]
fn test_constraints_mapping_is_not_a_list() {
    let mut tree = json!({"datasources": [
        {"id": "m", "constraints": {"os.family": "darwin"}},
    ]});
    let before = tree.clone();
    let err = filter_datasources(&mut tree, &ctx()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "constraints not a list for datasource 'namespace:default, output:default, id:m'"
    );
    assert_eq!(tree, before);
}

// `constraints:` with no value comes through as null.
#[test]
fn test_null_constraints_is_not_a_list() {
    let mut tree = json!({"datasources": [{"constraints": null}]});
    assert!(matches!(
        filter_datasources(&mut tree, &ctx()),
        Err(FilterError::ConstraintsNotList { .. })
    ));
}

#[test]
fn test_non_string_constraint_after_matching_ones() {
    let mut tree = json!({"datasources": [
        {"constraints": ["os.family == 'darwin'", 42]},
    ]});
    assert!(matches!(
        filter_datasources(&mut tree, &ctx()),
        Err(FilterError::ConstraintNotString { .. })
    ));
}

#[test]
fn test_syntax_error_names_the_constraint() {
    let mut tree = json!({"datasources": [
        {"id": "typo", "constraints": ["os.family = 'darwin'"]},
    ]});
    let err = filter_datasources(&mut tree, &ctx()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("os.family = 'darwin'"), "{message}");
    assert!(message.contains("id:typo"), "{message}");
    assert!(matches!(
        err,
        FilterError::Constraint { source: EvalError::Parse(_), .. }
    ));
}

#[test]
fn test_unknown_function_and_type_errors() {
    let c = ctx();
    assert!(matches!(
        c.evaluate("is_arm(host.architecture)"),
        Err(EvalError::UnknownFunction(ref f)) if f == "is_arm"
    ));
    assert!(matches!(
        c.evaluate("validate_version(agent.version, '>=7') or os.kernel"),
        Ok(true)
    ));
    assert!(matches!(
        c.evaluate("validate_version(agent.version, '<7') or os.kernel"),
        Err(EvalError::Type(_))
    ));
    assert!(matches!(
        c.evaluate("validate_version(os.version, '>=14')"),
        Ok(true)
    ));
    assert!(matches!(
        c.evaluate("validate_version(os.version, 14)"),
        Err(EvalError::Function { .. })
    ));
}
