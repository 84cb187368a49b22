//! # Schema Validation
//!
//! Whole-schema checks over a decoded [`Schema`]. Each validator walks
//! every attribute of every model and collects all of its findings into
//! one named [`ErrorList`]; nothing short-circuits. [`check`] runs them
//! all and nests the non-empty reports under one anonymous list.
//!
//! Not checked: whether a relation's field type matches the field it
//! points at, and the type tag of the attribute a template wraps.

use crate::error::{ErrorList, Violation};
use crate::model::{
    Schema, GENERIC_RELATION, GENERIC_RELATION_LIST, RELATION, RELATION_LIST, TEMPLATE,
};

/// Base types. Every one of them may also be used as a list (`JSON[]`,
/// `timestamp[]`, ...).
pub const SCALAR_TYPES: &[&str] = &[
    "string",
    "number",
    "boolean",
    "JSON",
    "HTMLPermissive",
    "HTMLStrict",
    "float",
    "decimal(6)",
    "timestamp",
];

/// Types describing a relation to other fields, or a template.
pub const SPECIAL_TYPES: &[&str] = &[
    RELATION,
    RELATION_LIST,
    GENERIC_RELATION,
    GENERIC_RELATION_LIST,
    TEMPLATE,
];

/// Suffix turning a scalar type into a list type.
pub const LIST_SUFFIX: &str = "[]";

pub const TYPE_VALIDATOR: &str = "type validator";
pub const RELATION_VALIDATOR: &str = "relation validator";

/// Indentation of the findings inside a validator's report.
const VALIDATOR_INDENT: usize = 1;

type Validator = fn(&Schema) -> Result<(), ErrorList>;

/// Validators in report order.
const VALIDATORS: [Validator; 2] = [validate_types, validate_relations];

/// Run every validator over `schema`.
///
/// # Errors
///
/// Returns one anonymous [`ErrorList`] holding a named child list per
/// validator that found something.
pub fn check(schema: &Schema) -> Result<(), ErrorList> {
    let mut errors = ErrorList::default();
    for validator in VALIDATORS {
        errors.append_result(validator(schema));
    }

    tracing::debug!(
        models = schema.len(),
        findings = errors.violations().len(),
        "validated models"
    );
    errors.into_result()
}

/// Whether `type_tag` names a known type.
///
/// A single trailing `[]` is stripped before looking in
/// [`SCALAR_TYPES`]; [`SPECIAL_TYPES`] must match exactly.
pub fn is_known_type(type_tag: &str) -> bool {
    let base = type_tag.strip_suffix(LIST_SUFFIX).unwrap_or(type_tag);
    SCALAR_TYPES.contains(&base) || SPECIAL_TYPES.contains(&type_tag)
}

/// Report every attribute whose type tag is unknown.
pub fn validate_types(schema: &Schema) -> Result<(), ErrorList> {
    let mut errs = ErrorList::new(TYPE_VALIDATOR, VALIDATOR_INDENT);
    for (model_name, model) in schema.models() {
        for (attr_name, attr) in model.attributes() {
            if is_known_type(attr.type_tag()) {
                continue;
            }
            errs.append(Violation::UnknownType {
                model: model_name.to_string(),
                attribute: attr_name.to_string(),
                type_tag: attr.type_tag().to_string(),
            });
        }
    }
    errs.into_result()
}

/// Report every relation whose target model or target field is missing.
///
/// Candidates of a generic relation are tried in declared order; the
/// first missing one is reported and the rest of that attribute skipped.
pub fn validate_relations(schema: &Schema) -> Result<(), ErrorList> {
    let mut errs = ErrorList::new(RELATION_VALIDATOR, VALIDATOR_INDENT);
    for (model_name, model) in schema.models() {
        for (attr_name, attr) in model.attributes() {
            let Some(relation) = attr.relation() else {
                continue;
            };
            let field = relation.target_field();

            for collection in relation.target_collections() {
                let Some(target) = schema.model(collection) else {
                    errs.append(Violation::MissingModel {
                        model: model_name.to_string(),
                        attribute: attr_name.to_string(),
                        collection: collection.clone(),
                    });
                    break;
                };
                if target.attribute(&field.name).is_none() {
                    errs.append(Violation::MissingField {
                        model: model_name.to_string(),
                        attribute: attr_name.to_string(),
                        collection: collection.clone(),
                        field: field.name.clone(),
                    });
                    break;
                }
            }
        }
    }
    errs.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Entry;

    fn schema(yaml: &str) -> Schema {
        yaml.parse().unwrap()
    }

    fn messages(list: &ErrorList) -> Vec<String> {
        list.violations().iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn scalar_types_and_their_lists_are_known() {
        for t in SCALAR_TYPES {
            assert!(is_known_type(t), "{t}");
            assert!(is_known_type(&format!("{t}[]")), "{t}[]");
        }
    }

    #[test]
    fn special_types_are_known_only_verbatim() {
        for t in SPECIAL_TYPES {
            assert!(is_known_type(t), "{t}");
            assert!(!is_known_type(&format!("{t}[]")), "{t}[]");
        }
    }

    #[test]
    fn near_misses_are_unknown() {
        for t in [
            "",
            "String",
            "HtmlPermissive",
            "decimal",
            "decimal(2)",
            "number[][]",
            "[]",
            "relations",
        ] {
            assert!(!is_known_type(t), "{t:?}");
        }
    }

    #[test]
    fn unknown_type_is_reported_once() {
        let errs = validate_types(&schema("some_model:\n  field: unknown\n")).unwrap_err();
        assert_eq!(errs.name(), TYPE_VALIDATOR);
        assert_eq!(errs.indent(), 1);
        assert_eq!(
            messages(&errs),
            vec!["Unknown type `unknown` in some_model/field"]
        );
    }

    #[test]
    fn type_validator_collects_every_finding_in_order() {
        let errs = validate_types(&schema(
            "b_model:\n  z: nope\n  a: string\nc_ok:\n  x: float[]\na_model:\n  y: what[]\n  x: huh\n",
        ))
        .unwrap_err();
        assert_eq!(
            messages(&errs),
            vec![
                "Unknown type `huh` in a_model/x",
                "Unknown type `what[]` in a_model/y",
                "Unknown type `nope` in b_model/z",
            ]
        );
    }

    #[test]
    fn template_inner_type_is_not_checked() {
        // Only the outer `template` tag is looked at.
        let s = schema("m:\n  t:\n    type: template\n    replacement: x\n    fields: bogus\n");
        assert!(validate_types(&s).is_ok());
        assert!(check(&s).is_ok());
    }

    #[test]
    fn missing_model_and_missing_field() {
        let s = schema(
            r#"
some_model:
  no_other_model:
    type: relation
    to: not_existing/field
  no_other_field:
    type: relation
    to: other_model/bar
other_model:
  foo: string
"#,
        );
        let errs = validate_relations(&s).unwrap_err();
        assert_eq!(errs.name(), RELATION_VALIDATOR);
        assert_eq!(
            messages(&errs),
            vec![
                "some_model/no_other_field directs to nonexisting modelfield `other_model/bar`",
                "some_model/no_other_model directs to nonexisting model `not_existing`",
            ]
        );
    }

    #[test]
    fn valid_relation_passes() {
        let s = schema(
            "motion:\n  meeting_id: {type: relation, to: meeting/motion_ids}\nmeeting:\n  motion_ids: {type: relation-list, to: motion/meeting_id}\n",
        );
        assert!(validate_relations(&s).is_ok());
    }

    #[test]
    fn generic_relation_stops_at_first_missing_candidate() {
        let s = schema(
            r#"
m:
  target:
    type: generic-relation
    to:
      collection: [a, gone, also_gone, b]
      field: back
a:
  back: number
b:
  other: number
"#,
        );
        let errs = validate_relations(&s).unwrap_err();
        assert_eq!(
            messages(&errs),
            vec!["m/target directs to nonexisting model `gone`"]
        );
    }

    #[test]
    fn generic_relation_reports_missing_field_of_later_candidate() {
        let s = schema(
            "m:\n  target:\n    type: generic-relation-list\n    to: {collection: [a, b], field: back}\na:\n  back: number\nb:\n  other: number\n",
        );
        let errs = validate_relations(&s).unwrap_err();
        assert_eq!(
            errs.violations(),
            vec![&Violation::MissingField {
                model: "m".to_string(),
                attribute: "target".to_string(),
                collection: "b".to_string(),
                field: "back".to_string(),
            }]
        );
    }

    #[test]
    fn generic_relation_without_candidates_passes() {
        let s = schema("m:\n  target: {type: generic-relation, to: {collection: [], field: x}}\n");
        assert!(validate_relations(&s).is_ok());
    }

    #[test]
    fn relation_inside_template_is_checked() {
        let s = schema(
            "m:\n  t_$:\n    type: template\n    replacement: x\n    fields:\n      type: relation-list\n      to: nowhere/ids\n",
        );
        let errs = validate_relations(&s).unwrap_err();
        assert_eq!(
            messages(&errs),
            vec!["m/t_$ directs to nonexisting model `nowhere`"]
        );
    }

    #[test]
    fn check_returns_ok_for_clean_schema() {
        let s = schema("a:\n  id: number\n  b_id: {type: relation, to: b/a_ids}\nb:\n  a_ids: {type: relation-list, to: a/b_id}\n");
        assert!(check(&s).is_ok());
        assert!(check(&Schema::default()).is_ok());
    }

    #[test]
    fn check_nests_validator_reports_in_fixed_order() {
        let s = schema(
            "some_model:\n  field: unknown\n  rel: {type: relation, to: not_existing/field}\n",
        );
        let errs = check(&s).unwrap_err();
        assert_eq!(errs.name(), "");
        assert_eq!(errs.indent(), 0);
        assert_eq!(errs.len(), 2);

        let names: Vec<&str> = errs
            .entries()
            .iter()
            .map(|e| match e {
                Entry::List(list) => list.name(),
                Entry::Violation(v) => panic!("unexpected top-level finding: {v}"),
            })
            .collect();
        assert_eq!(names, vec![TYPE_VALIDATOR, RELATION_VALIDATOR]);

        assert_eq!(
            errs.to_string(),
            "* type validator:\n * Unknown type `unknown` in some_model/field\n\
             * relation validator:\n * some_model/rel directs to nonexisting model `not_existing`"
        );
    }

    #[test]
    fn check_omits_empty_validator_reports() {
        let s = schema("some_model:\n  field: unknown\n");
        let errs = check(&s).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(
            errs.to_string(),
            "* type validator:\n * Unknown type `unknown` in some_model/field"
        );
    }
}
