//! # mdv-schema: models.yml decoding and validation
//!
//! A models document declares entities ("models") and their typed
//! attributes. Attributes may be plain types, relations to a field of
//! another model, generic relations to one of several models, or
//! templates wrapping another attribute.
//!
//! ## Decoding (`model`)
//!
//! [`Schema::from_reader`] / `str::parse::<Schema>()` turn YAML into a
//! [`Schema`]. Shorthand forms (`field: string`, `to: model/field`) and
//! expanded objects decode to the same [`Attribute`]. A malformed node is
//! a [`SchemaError`]; no partial schema is returned.
//!
//! ## Validation (`validate`)
//!
//! [`check`] runs the type validator and the relation validator over a
//! decoded schema and returns every finding at once as a nested
//! [`ErrorList`]:
//!
//! ```text
//! * type validator:
//!  * Unknown type `unknown` in some_model/field
//! * relation validator:
//!  * some_model/no_other_model directs to nonexisting model `not_existing`
//! ```
//!
//! ## Crate Policy
//!
//! - Validation never mutates the schema and never stops at the first finding.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod model;
pub mod validate;

pub use error::{AttributeError, Entry, ErrorList, SchemaError, Violation};
pub use model::{
    Attribute, AttributeKind, GenericRelation, Model, Relation, RelationTarget, Schema, Template,
    ToField,
};
pub use validate::{check, validate_relations, validate_types};
