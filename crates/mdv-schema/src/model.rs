//! # Models Schema
//!
//! In-memory form of a `models.yml` document and its decoder.
//!
//! A document maps model names to models; a model maps attribute names to
//! attributes. Each attribute is written either as a bare type name
//! (`title: string`) or as an object with a `type` key:
//!
//! ```yaml
//! motion:
//!   title: string
//!   meeting_id:
//!     type: relation
//!     to: meeting/motion_ids
//!   agenda_item:
//!     type: generic-relation
//!     to:
//!       collection: [agenda_item, topic]
//!       field: { name: content_object_id, type: generic }
//!   comment_$:
//!     type: template
//!     replacement: section_id
//!     fields: HTMLStrict
//! ```
//!
//! Decoding normalizes every shorthand into one [`AttributeKind`], so the
//! validators never look at raw YAML again. Decoding is strict: the first
//! malformed attribute aborts the whole document. A null attribute, a
//! relation without `to` and a template without `fields` are decode
//! errors, not validation findings.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use serde::de::value::{EnumAccessDeserializer, MapAccessDeserializer};
use serde::de::{self, Deserializer, EnumAccess, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::{AttributeError, SchemaError};

/// Type tag of a single-target relation.
pub const RELATION: &str = "relation";
/// Type tag of a single-target relation holding a list of ids.
pub const RELATION_LIST: &str = "relation-list";
/// Type tag of a multi-target relation.
pub const GENERIC_RELATION: &str = "generic-relation";
/// Type tag of a multi-target relation holding a list of ids.
pub const GENERIC_RELATION_LIST: &str = "generic-relation-list";
/// Type tag of a template attribute.
pub const TEMPLATE: &str = "template";

/// Field kind assumed when a target field is given by bare name.
pub const NORMAL_FIELD: &str = "normal";

/// A decoded models document: model name to [`Model`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Schema {
    models: BTreeMap<String, Model>,
}

impl Schema {
    /// Decode a models document from a reader.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Decode`] on the first malformed node.
    pub fn from_reader(reader: impl Read) -> Result<Self, SchemaError> {
        let schema: Schema = serde_yaml::from_reader(reader).map_err(SchemaError::Decode)?;
        schema.log_decoded();
        Ok(schema)
    }

    /// Decode a models document from a file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Write the schema back out in canonical form: bare type names for
    /// plain attributes, expanded objects for everything else.
    pub fn to_yaml_string(&self) -> Result<String, SchemaError> {
        serde_yaml::to_string(self).map_err(SchemaError::Encode)
    }

    pub fn models(&self) -> impl Iterator<Item = (&str, &Model)> {
        self.models.iter().map(|(name, model)| (name.as_str(), model))
    }

    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    /// Number of models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    fn log_decoded(&self) {
        let attributes: usize = self.models.values().map(Model::len).sum();
        tracing::debug!(models = self.len(), attributes, "decoded models");
    }
}

impl FromStr for Schema {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let schema: Schema = serde_yaml::from_str(s).map_err(SchemaError::Decode)?;
        schema.log_decoded();
        Ok(schema)
    }
}

impl FromIterator<(String, Model)> for Schema {
    fn from_iter<I: IntoIterator<Item = (String, Model)>>(iter: I) -> Self {
        Self {
            models: iter.into_iter().collect(),
        }
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // An empty document is an empty schema.
        let models = Option::<BTreeMap<String, Model>>::deserialize(deserializer)?;
        Ok(Self {
            models: models.unwrap_or_default(),
        })
    }
}

/// One model: attribute name to [`Attribute`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Model {
    attributes: BTreeMap<String, Attribute>,
}

impl Model {
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.attributes
            .iter()
            .map(|(name, attr)| (name.as_str(), attr))
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl FromIterator<(String, Attribute)> for Model {
    fn from_iter<I: IntoIterator<Item = (String, Attribute)>>(iter: I) -> Self {
        Self {
            attributes: iter.into_iter().collect(),
        }
    }
}

impl<'de> Deserialize<'de> for Model {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // `some_model:` with no body declares a model without attributes.
        let attributes = Option::<BTreeMap<String, Attribute>>::deserialize(deserializer)?;
        Ok(Self {
            attributes: attributes.unwrap_or_default(),
        })
    }
}

/// The field a relation points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ToField {
    /// A target field of kind `normal`.
    pub fn normal(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NORMAL_FIELD.to_string(),
        }
    }
}

/// Where a relation points: candidate models plus one shared field.
pub trait RelationTarget {
    /// Candidate target models, in declared order.
    fn target_collections(&self) -> &[String];

    fn target_field(&self) -> &ToField;
}

/// Target of a `relation` or `relation-list` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relation {
    pub collection: String,
    pub field: ToField,
}

impl RelationTarget for Relation {
    fn target_collections(&self) -> &[String] {
        std::slice::from_ref(&self.collection)
    }

    fn target_field(&self) -> &ToField {
        &self.field
    }
}

/// Target of a `generic-relation` or `generic-relation-list` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenericRelation {
    #[serde(rename = "collection")]
    pub collections: Vec<String>,
    pub field: ToField,
}

impl RelationTarget for GenericRelation {
    fn target_collections(&self) -> &[String] {
        &self.collections
    }

    fn target_field(&self) -> &ToField {
        &self.field
    }
}

/// Body of a `template` attribute.
///
/// `replacement` names the pattern downstream renderers substitute; it
/// plays no part in validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub replacement: String,
    pub fields: Attribute,
}

/// Decoded shape of an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKind {
    /// Only the type tag matters (all scalar types, and unknown tags).
    Plain,
    Relation(Relation),
    GenericRelation(GenericRelation),
    Template(Box<Template>),
}

/// One attribute of a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    type_tag: String,
    kind: AttributeKind,
}

impl Attribute {
    /// An attribute with no structure beyond its type tag.
    pub fn plain(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            kind: AttributeKind::Plain,
        }
    }

    /// A `relation` attribute, or `relation-list` when `list` is set.
    pub fn from_relation(relation: Relation, list: bool) -> Self {
        Self {
            type_tag: if list { RELATION_LIST } else { RELATION }.to_string(),
            kind: AttributeKind::Relation(relation),
        }
    }

    /// A `generic-relation` attribute, or `generic-relation-list` when `list` is set.
    pub fn from_generic_relation(relation: GenericRelation, list: bool) -> Self {
        Self {
            type_tag: if list {
                GENERIC_RELATION_LIST
            } else {
                GENERIC_RELATION
            }
            .to_string(),
            kind: AttributeKind::GenericRelation(relation),
        }
    }

    pub fn from_template(template: Template) -> Self {
        Self {
            type_tag: TEMPLATE.to_string(),
            kind: AttributeKind::Template(Box::new(template)),
        }
    }

    /// The declared type tag, e.g. `string`, `number[]` or `relation`.
    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    pub fn kind(&self) -> &AttributeKind {
        &self.kind
    }

    /// The relation carried by this attribute, or by the attribute a
    /// template wraps. Only one template layer is unwrapped.
    pub fn relation(&self) -> Option<&dyn RelationTarget> {
        match &self.kind {
            AttributeKind::Template(template) => template.fields.direct_relation(),
            _ => self.direct_relation(),
        }
    }

    fn direct_relation(&self) -> Option<&dyn RelationTarget> {
        match &self.kind {
            AttributeKind::Relation(r) => Some(r as &dyn RelationTarget),
            AttributeKind::GenericRelation(r) => Some(r as &dyn RelationTarget),
            AttributeKind::Plain | AttributeKind::Template(_) => None,
        }
    }

    pub fn template(&self) -> Option<&Template> {
        match &self.kind {
            AttributeKind::Template(template) => Some(template),
            _ => None,
        }
    }

    /// Decode an attribute from a YAML node.
    ///
    /// A bare scalar is taken as the type tag. An object must carry a
    /// `type` key, which selects how the rest of the object is read.
    pub fn from_value(value: &Value) -> Result<Self, AttributeError> {
        let value = untag(value);
        if let Some(type_tag) = scalar_string(value) {
            return Ok(Self::plain(type_tag));
        }

        let Value::Mapping(object) = value else {
            return Err(AttributeError::NotAnObject {
                found: node_kind(value),
            });
        };
        let type_tag = match object.get("type").map(untag) {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(AttributeError::MissingType),
        };

        let kind = match type_tag.as_str() {
            RELATION | RELATION_LIST => decode_to(object).map(AttributeKind::Relation),
            GENERIC_RELATION | GENERIC_RELATION_LIST => {
                decode_generic_to(object).map(AttributeKind::GenericRelation)
            }
            TEMPLATE => decode_template(object).map(|t| AttributeKind::Template(Box::new(t))),
            _ => Ok(AttributeKind::Plain),
        }
        .map_err(|source| AttributeError::InvalidObject {
            type_tag: type_tag.clone(),
            source: Box::new(source),
        })?;

        Ok(Self { type_tag, kind })
    }
}

impl<'de> Deserialize<'de> for Attribute {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Decoding inside the visitor lets the YAML layer stamp errors with
        // this attribute's own path and position.
        deserializer.deserialize_any(AttributeVisitor)
    }
}

struct AttributeVisitor;

impl<'de> Visitor<'de> for AttributeVisitor {
    type Value = Attribute;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a type name or an attribute object")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Attribute, E> {
        Ok(Attribute::plain(v))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Attribute, E> {
        Ok(Attribute::plain(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Attribute, E> {
        Ok(Attribute::plain(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Attribute, E> {
        Ok(Attribute::plain(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Attribute, E> {
        Ok(Attribute::plain(v.to_string()))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Attribute, E> {
        Err(E::custom(AttributeError::NotAnObject { found: "null" }))
    }

    fn visit_none<E: de::Error>(self) -> Result<Attribute, E> {
        self.visit_unit()
    }

    fn visit_seq<A: SeqAccess<'de>>(self, _seq: A) -> Result<Attribute, A::Error> {
        Err(de::Error::custom(AttributeError::NotAnObject { found: "a list" }))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Attribute, A::Error> {
        let value = Value::deserialize(MapAccessDeserializer::new(map))?;
        Attribute::from_value(&value).map_err(de::Error::custom)
    }

    // Tagged nodes arrive as enums.
    fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> Result<Attribute, A::Error> {
        let value = Value::deserialize(EnumAccessDeserializer::new(data))?;
        Attribute::from_value(&value).map_err(de::Error::custom)
    }
}

impl Serialize for Attribute {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.kind {
            AttributeKind::Plain => serializer.serialize_str(&self.type_tag),
            AttributeKind::Relation(to) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", &self.type_tag)?;
                map.serialize_entry("to", to)?;
                map.end()
            }
            AttributeKind::GenericRelation(to) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", &self.type_tag)?;
                map.serialize_entry("to", to)?;
                map.end()
            }
            AttributeKind::Template(template) => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("type", &self.type_tag)?;
                map.serialize_entry("replacement", &template.replacement)?;
                map.serialize_entry("fields", &template.fields)?;
                map.end()
            }
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_tag)
    }
}

// `to` of a relation: `collection/field` or `{collection, field}`.
fn decode_to(object: &Mapping) -> Result<Relation, AttributeError> {
    match require(object, "to")? {
        Value::String(s) => {
            let parts: Vec<&str> = s.split('/').collect();
            let [collection, field] = parts.as_slice() else {
                return Err(AttributeError::ToShorthand(s.clone()));
            };
            Ok(Relation {
                collection: (*collection).to_string(),
                field: ToField::normal(*field),
            })
        }
        Value::Mapping(to) => Ok(Relation {
            collection: require_string(to, "collection")?,
            field: decode_field(require(to, "field")?)?,
        }),
        other => Err(AttributeError::WrongShape {
            key: "to",
            expected: "a `collection/field` string or an object",
            found: node_kind(other),
        }),
    }
}

// `to` of a generic relation: always an object, `collection` is a list.
fn decode_generic_to(object: &Mapping) -> Result<GenericRelation, AttributeError> {
    let to = match require(object, "to")? {
        Value::Mapping(to) => to,
        other => {
            return Err(AttributeError::WrongShape {
                key: "to",
                expected: "an object",
                found: node_kind(other),
            })
        }
    };

    let collections = match require(to, "collection")? {
        Value::Sequence(items) => items
            .iter()
            .map(|item| match untag(item) {
                Value::String(s) => Ok(s.clone()),
                other => Err(AttributeError::WrongShape {
                    key: "collection",
                    expected: "a list of model names",
                    found: node_kind(other),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?,
        other => {
            return Err(AttributeError::WrongShape {
                key: "collection",
                expected: "a list of model names",
                found: node_kind(other),
            })
        }
    };

    Ok(GenericRelation {
        collections,
        field: decode_field(require(to, "field")?)?,
    })
}

// Target field: bare name, or `{name, type}`.
fn decode_field(value: &Value) -> Result<ToField, AttributeError> {
    match value {
        Value::String(name) => Ok(ToField::normal(name.as_str())),
        Value::Mapping(field) => Ok(ToField {
            name: require_string(field, "name")?,
            kind: optional_string(field, "type")?.unwrap_or_default(),
        }),
        other => Err(AttributeError::WrongShape {
            key: "field",
            expected: "a field name or an object",
            found: node_kind(other),
        }),
    }
}

fn decode_template(object: &Mapping) -> Result<Template, AttributeError> {
    let replacement = optional_string(object, "replacement")?.unwrap_or_default();
    let fields = Attribute::from_value(require(object, "fields")?)
        .map_err(|e| AttributeError::Fields(Box::new(e)))?;
    Ok(Template {
        replacement,
        fields,
    })
}

fn require<'a>(object: &'a Mapping, key: &'static str) -> Result<&'a Value, AttributeError> {
    object
        .get(key)
        .map(untag)
        .ok_or(AttributeError::MissingKey(key))
}

fn require_string(object: &Mapping, key: &'static str) -> Result<String, AttributeError> {
    optional_string(object, key)?.ok_or(AttributeError::MissingKey(key))
}

fn optional_string(object: &Mapping, key: &'static str) -> Result<Option<String>, AttributeError> {
    match object.get(key).map(untag) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(AttributeError::WrongShape {
            key,
            expected: "a string",
            found: node_kind(other),
        }),
    }
}

// Plain scalars read as text, the way YAML treats `5` or `true` in a
// string position.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// YAML tags carry no meaning in a models document.
fn untag(value: &Value) -> &Value {
    match value {
        Value::Tagged(tagged) => untag(&tagged.value),
        other => other,
    }
}

fn node_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "an object",
        Value::Tagged(_) => "a tagged value",
    }
}
