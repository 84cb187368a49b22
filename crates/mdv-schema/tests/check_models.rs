//! End-to-end checks: YAML text in, validation report out.

use mdv_schema::{check, Entry, ErrorList, Schema};

const YAML_UNKNOWN_ATTR_TYPE: &str = "---
some_model:
  field: unknown
";

const YAML_INVALID_RELATION: &str = "---
some_model:
  no_other_model:
    type: relation
    to: not_existing/field
  no_other_field:
    type: relation
    to: other_model/bar
other_model:
  foo: string
";

const YAML_VALID: &str = r#"---
meeting:
  id: number
  name: string
  start_time: timestamp
  motion_ids:
    type: relation-list
    to: motion/meeting_id
  group_$_ids:
    type: template
    replacement: group_id
    fields: number[]
motion:
  id: number
  text: HTMLStrict
  reason: HTMLPermissive
  amount: decimal(6)
  weight: float
  extra: JSON[]
  done: boolean
  meeting_id:
    type: relation
    to:
      collection: meeting
      field:
        name: motion_ids
        type: normal
  agenda_item_id:
    type: relation
    to: agenda_item/content_object_id
topic:
  agenda_item_id:
    type: relation
    to: agenda_item/content_object_id
agenda_item:
  content_object_id:
    type: generic-relation
    to:
      collection:
        - motion
        - topic
      field: agenda_item_id
"#;

/// Every finding of every named child list, rendered.
fn nested_messages(errors: &ErrorList) -> Vec<String> {
    let mut out = Vec::new();
    for entry in errors.entries() {
        let Entry::List(list) = entry else {
            continue;
        };
        for inner in list.entries() {
            out.push(inner.to_string());
        }
    }
    out
}

#[test]
fn test_check() {
    let cases = [
        (
            "unknown type",
            YAML_UNKNOWN_ATTR_TYPE,
            "Unknown type `unknown` in some_model/field",
        ),
        (
            "invalid relation to model",
            YAML_INVALID_RELATION,
            "some_model/no_other_model directs to nonexisting model `not_existing`",
        ),
        (
            "invalid relation to field",
            YAML_INVALID_RELATION,
            "some_model/no_other_field directs to nonexisting modelfield `other_model/bar`",
        ),
    ];

    for (name, yaml, expected) in cases {
        let schema: Schema = yaml
            .parse()
            .unwrap_or_else(|e| panic!("{name}: can not decode yaml: {e}"));
        let errors = check(&schema).expect_err(name);
        let found = nested_messages(&errors);
        assert!(
            found.iter().any(|m| m == expected),
            "{name}: check() returned {found:?}, expected {expected}"
        );
    }
}

#[test]
fn test_invalid_relation_reports_exactly_two_findings() {
    let schema: Schema = YAML_INVALID_RELATION.parse().unwrap();
    let errors = check(&schema).unwrap_err();
    assert_eq!(errors.len(), 1, "only the relation validator should report");
    assert_eq!(errors.violations().len(), 2);
}

#[test]
fn test_valid_schema_has_no_error() {
    let schema: Schema = YAML_VALID.parse().unwrap();
    assert_eq!(schema.len(), 4);
    if let Err(errors) = check(&schema) {
        panic!("unexpected findings:\n{errors}");
    }
}

#[test]
fn test_both_validators_report_in_stable_order() {
    let yaml = format!("{YAML_INVALID_RELATION}  bad: strin\n");
    let schema: Schema = yaml.parse().unwrap();
    let errors = check(&schema).unwrap_err();

    assert_eq!(
        errors.to_string(),
        "* type validator:\n \
         * Unknown type `strin` in other_model/bad\n\
         * relation validator:\n \
         * some_model/no_other_field directs to nonexisting modelfield `other_model/bar`\n \
         * some_model/no_other_model directs to nonexisting model `not_existing`"
    );
}

#[test]
fn test_decode_error_aborts_before_validation() {
    let yaml = "some_model:\n  broken:\n    type: relation\n    to: no_slash_here\n  fine: string\n";
    let err = yaml.parse::<Schema>().unwrap_err();
    let msg = err.to_string();
    assert!(msg.starts_with("decoding models: some_model.broken: "), "{msg}");
    assert!(
        msg.contains("invalid object of type relation: invalid value of `to`, expected one `/`: no_slash_here"),
        "{msg}"
    );
}

#[test]
fn test_reader_and_str_decoding_agree() {
    let from_str: Schema = YAML_VALID.parse().unwrap();
    let from_reader = Schema::from_reader(YAML_VALID.as_bytes()).unwrap();
    assert_eq!(from_str, from_reader);
}

#[test]
fn test_minimal_schema_round_trips() {
    let schema: Schema = YAML_VALID.parse().unwrap();
    let again: Schema = schema.to_yaml_string().unwrap().parse().unwrap();
    assert_eq!(schema, again);
}
