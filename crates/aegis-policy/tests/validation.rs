use aegis_policy::{Policy, PolicyError};
use std::io::Write;

fn write_temp_yaml(content: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().expect("create temp policy file");
    f.write_all(content.as_bytes()).expect("write temp policy file");
    f
}

#[test]
fn policy_with_unknown_top_level_field_is_rejected() {
    let err = Policy::from_yaml_str("name: Demo\nnot_a_real_field: 1\n").unwrap_err();
    assert!(matches!(err, PolicyError::Yaml(_)));
}

#[test]
fn field_rule_without_clearance_or_compartments_is_rejected_at_load() {
    let yaml = r#"
name: Demo
field_rules:
  - field_path: "user.email"
    field_type: "email"
    strategy: MASK_BRACKETS
"#;
    let err = Policy::from_yaml_str(yaml).unwrap_err();
    assert!(matches!(err, PolicyError::VacuousFieldRule(ref path) if path == "user.email"));
}

#[test]
fn unknown_classification_code_is_rejected() {
    let yaml = r#"
name: Demo
field_rules:
  - field_path: "user.email"
    field_type: "email"
    required_clearance: "TOP-SECRET"
"#;
    let err = Policy::from_yaml_str(yaml).unwrap_err();
    assert!(matches!(err, PolicyError::Yaml(_)));
}

#[test]
fn empty_dotted_path_is_rejected() {
    let yaml = r#"
name: Demo
field_rules:
  - field_path: ""
    field_type: "email"
    required_clearance: "S"
"#;
    assert!(Policy::from_yaml_str(yaml).is_err());
}

#[test]
fn policy_loads_successfully_from_an_on_disk_yaml_file() {
    let file = write_temp_yaml(
        r#"
name: On-disk Policy
field_rules:
  - field_path: "user.ssn"
    field_type: "ssn"
    strategy: MASK_BRACKETS
    required_clearance: "S"
"#,
    );
    let policy = Policy::from_yaml_path(file.path()).expect("valid policy should load");
    assert_eq!(policy.name, "On-disk Policy");
    assert_eq!(policy.field_rules.len(), 1);
}

#[test]
fn missing_policy_file_surfaces_an_io_error() {
    let err = Policy::from_yaml_path("/nonexistent/path/to/policy.yaml").unwrap_err();
    assert!(matches!(err, PolicyError::Io(_)));
}

#[test]
fn shadow_mode_policy_loads_but_is_marked_unenforced() {
    let yaml = "name: Shadow\nis_enforced: false\n";
    let policy = Policy::from_yaml_str(yaml).unwrap();
    assert!(!policy.is_enforced);
    assert!(policy.is_active);
}
