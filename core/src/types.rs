//! Type definitions for the entity data model.
//!
//! This module defines the strongly-typed forms produced by the schema
//! normalizer ([`PropertySchema`], [`EntitySchema`]) and the data they
//! describe ([`Record`], [`Value`], [`CollectionData`]). All of them
//! serialize with [`serde`] into the same shape the presentation layer
//! exchanges as JSON.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Property names that collide with the reserved record keys.
pub const RESERVED_PROPERTY_NAMES: [&str; 2] = ["name", "type"];

/// Characters that may never appear in an entity name.
pub const RESERVED_NAME_CHARS: [char; 2] = ['"', '\\'];

/// Canonical property type, after alias resolution.
///
/// # Examples
///
/// ```
/// use entity_maker_core::PropertyType;
///
/// assert_eq!(PropertyType::parse("Integer"), Some(PropertyType::Int));
/// assert_eq!(PropertyType::parse("xref"), Some(PropertyType::Reference));
/// assert_eq!(PropertyType::parse("complex"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    /// Floating point number.
    Float,
    /// Integer, rounded from a floating point parse.
    Int,
    /// Checkbox-style flag.
    Bool,
    /// One string out of a fixed list of values.
    Enum,
    /// One or more `[filename, content]` pairs.
    File,
    /// Name of another record (or standalone schema) in the registry.
    Reference,
}

impl PropertyType {
    /// Resolves a type string, including its aliases, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "float" | "real" => Some(Self::Float),
            "int" | "integer" => Some(Self::Int),
            "bool" | "boolean" => Some(Self::Bool),
            "enum" | "enumeration" => Some(Self::Enum),
            "file" | "filename" => Some(Self::File),
            "reference" | "entity" | "xref" | "crossreference" => Some(Self::Reference),
            _ => None,
        }
    }

    /// Returns the canonical spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Enum => "enum",
            Self::File => "file",
            Self::Reference => "reference",
        }
    }

    /// Returns `true` for `float` and `int`.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Float | Self::Int)
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default value and bounds for a numeric property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberSpec<T> {
    /// Default value, always within `[min, max]`.
    pub default: T,
    /// Inclusive lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<T>,
    /// Inclusive upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<T>,
    /// Increment used by the editing widget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<T>,
}

/// Type-specific attributes of a property.
///
/// Each variant carries exactly the attributes its type allows, so a
/// normalized [`PropertySchema`] can never hold a forbidden attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PropertyKind {
    /// Floating point property.
    Float(NumberSpec<f64>),
    /// Integer property.
    Int(NumberSpec<i64>),
    /// Boolean property.
    Bool {
        /// Default value.
        default: bool,
    },
    /// Enumerated property.
    Enum {
        /// Allowed values, in display order.
        values: Vec<String>,
        /// Default value, a member of `values`.
        default: String,
    },
    /// File property.
    File {
        /// Whether several files can be selected at once.
        #[serde(default)]
        multiple: bool,
        /// File filter, comma-separated (e.g. `".png,.jpg"`).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        accept: Option<String>,
    },
    /// Cross-reference property.
    Reference {
        /// Names of the collections (or standalone schemas) that can be referenced.
        targets: Vec<String>,
        /// Whether several names can be referenced at once.
        #[serde(default)]
        multiple: bool,
    },
}

impl PropertyKind {
    /// Returns the canonical type of this kind.
    pub fn property_type(&self) -> PropertyType {
        match self {
            Self::Float(_) => PropertyType::Float,
            Self::Int(_) => PropertyType::Int,
            Self::Bool { .. } => PropertyType::Bool,
            Self::Enum { .. } => PropertyType::Enum,
            Self::File { .. } => PropertyType::File,
            Self::Reference { .. } => PropertyType::Reference,
        }
    }
}

/// One normalized property definition.
///
/// Produced by [`normalize_property`](crate::normalize_property); never built
/// from unchecked input.
///
/// # Examples
///
/// ```
/// use entity_maker_core::*;
///
/// let mut raw = serde_json::json!({
///     "name": "age", "type": "integer", "min": 0, "max": 120, "default": "30.7",
/// });
/// let prop = normalize_property("Person", raw.as_object_mut().unwrap()).unwrap();
/// assert_eq!(prop.property_type(), PropertyType::Int);
/// assert_eq!(prop.default_value(), Value::Int(31));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    /// Property name, unique within its entity type.
    pub name: String,
    /// Display title.
    pub title: String,
    /// Tooltip text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Physical units shown next to the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    /// Type and type-specific attributes.
    #[serde(flatten)]
    pub kind: PropertyKind,
}

impl PropertySchema {
    /// Returns the canonical type.
    pub fn property_type(&self) -> PropertyType {
        self.kind.property_type()
    }

    /// Returns `true` for multi-valued `file`/`reference` properties.
    pub fn is_multiple(&self) -> bool {
        match &self.kind {
            PropertyKind::File { multiple, .. } | PropertyKind::Reference { multiple, .. } => {
                *multiple
            }
            _ => false,
        }
    }

    /// Returns the reference targets, or an empty slice for other types.
    pub fn targets(&self) -> &[String] {
        match &self.kind {
            PropertyKind::Reference { targets, .. } => targets,
            _ => &[],
        }
    }

    /// Returns `true` if this property references `target`.
    pub fn references(&self, target: &str) -> bool {
        self.targets().iter().any(|t| t == target)
    }

    /// Value a freshly created record holds for this property.
    ///
    /// Scalar types use their configured default; `file` and `reference`
    /// start out empty (an empty list when `multiple`, otherwise null).
    pub fn default_value(&self) -> Value {
        match &self.kind {
            PropertyKind::Float(spec) => Value::Float(spec.default),
            PropertyKind::Int(spec) => Value::Int(spec.default),
            PropertyKind::Bool { default } => Value::Bool(*default),
            PropertyKind::Enum { default, .. } => Value::Text(default.clone()),
            PropertyKind::File { multiple, .. } | PropertyKind::Reference { multiple, .. } => {
                if *multiple {
                    Value::List(Vec::new())
                } else {
                    Value::Null
                }
            }
        }
    }
}

/// A named set of properties: one editable shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySchema {
    /// Schema name, unique across the registry.
    pub name: String,
    /// Display title.
    pub title: String,
    /// Description shown in the editor header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Properties in display order.
    pub properties: Vec<PropertySchema>,
    /// Name of the owning collection, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager: Option<String>,
}

impl EntitySchema {
    /// Finds a property by name.
    pub fn property(&self, name: &str) -> Option<&PropertySchema> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Iterates over the `reference` properties.
    pub fn reference_properties(&self) -> impl Iterator<Item = &PropertySchema> {
        self.properties
            .iter()
            .filter(|p| p.property_type() == PropertyType::Reference)
    }

    /// Returns `true` if any reference property targets `target`.
    pub fn references(&self, target: &str) -> bool {
        self.reference_properties().any(|p| p.references(target))
    }

    /// Builds a new record of this type populated with default values.
    ///
    /// # Examples
    ///
    /// ```
    /// use entity_maker_core::*;
    ///
    /// let mut raw = serde_json::json!({
    ///     "name": "Cat",
    ///     "properties": [{"name": "lives", "type": "int", "default": 9}],
    /// });
    /// let schema = normalize_entity_schema(raw.as_object_mut().unwrap(), None).unwrap();
    /// let record = schema.defaults("Tom");
    /// assert_eq!(record.kind, "Cat");
    /// assert_eq!(record.get("lives"), Some(&Value::Int(9)));
    /// ```
    pub fn defaults(&self, name: &str) -> Record {
        let mut record = Record::new(name, &self.name);
        for prop in &self.properties {
            record.fields.insert(prop.name.clone(), prop.default_value());
        }
        record
    }
}

/// A canonical typed value.
///
/// Serializes untagged, so the JSON form is exactly the external
/// representation: `null`, booleans, numbers, strings, arrays and objects.
/// File values are `[filename, content]` pairs; multi-valued properties hold
/// arrays.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// String.
    Text(String),
    /// Sequence (multi-valued properties, file pairs).
    List(Vec<Value>),
    /// Nested mapping, only found in fields the schema does not describe.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Builds a `[filename, content]` pair; `None` content means still loading.
    pub fn file(name: impl Into<String>, content: Option<String>) -> Self {
        Value::List(vec![
            Value::Text(name.into()),
            content.map(Value::Text).unwrap_or(Value::Null),
        ])
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the string slice of a [`Value::Text`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the elements of a [`Value::List`].
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Truthiness: null, `false`, zero, NaN and the empty string are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::Text(s) => !s.is_empty(),
            Value::List(_) | Value::Map(_) => true,
        }
    }

    /// String form used when a value is coerced to an enum member.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) if f.is_infinite() => {
                if *f > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
            }
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::List(items) => items
                .iter()
                .map(|v| if v.is_null() { String::new() } else { v.to_display_string() })
                .collect::<Vec<_>>()
                .join(","),
            Value::Map(_) => "[object Object]".to_string(),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    /// Non-finite floats have no JSON form and become `null`.
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::from(i),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s),
            Value::List(items) => {
                serde_json::Value::Array(items.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

/// One entity: reserved `name`/`type` keys plus a value per property.
///
/// # Examples
///
/// ```
/// use entity_maker_core::{Record, Value};
///
/// let mut record = Record::new("Tom", "Cat");
/// record.set("lives", Value::Int(9));
///
/// let json = serde_json::to_value(&record).unwrap();
/// assert_eq!(json, serde_json::json!({"name": "Tom", "type": "Cat", "lives": 9}));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    /// Record name; empty for the record of a standalone editor.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Name of the [`EntitySchema`] this record instantiates.
    #[serde(rename = "type")]
    pub kind: String,
    /// Property values, plus any extra fields carried through from input.
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    /// Creates an empty record.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Returns a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Sets a field value.
    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }
}

impl From<Record> for serde_json::Value {
    fn from(record: Record) -> Self {
        let mut map = serde_json::Map::new();
        if !record.name.is_empty() {
            map.insert("name".to_string(), serde_json::Value::String(record.name));
        }
        map.insert("type".to_string(), serde_json::Value::String(record.kind));
        for (field, value) in record.fields {
            map.insert(field, value.into());
        }
        serde_json::Value::Object(map)
    }
}

/// Serialized contents of a collection.
///
/// Collections sorted by name serialize as a name-keyed mapping; all others
/// serialize as an ordered array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CollectionData {
    /// Records in collection order.
    List(Vec<Record>),
    /// Records keyed (and therefore ordered) by name.
    Keyed(BTreeMap<String, Record>),
}

impl CollectionData {
    /// Number of records.
    pub fn len(&self) -> usize {
        match self {
            Self::List(records) => records.len(),
            Self::Keyed(records) => records.len(),
        }
    }

    /// Returns `true` if there are no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over the records in serialized order.
    pub fn records(&self) -> Box<dyn Iterator<Item = &Record> + '_> {
        match self {
            Self::List(records) => Box::new(records.iter()),
            Self::Keyed(records) => Box::new(records.values()),
        }
    }
}

impl From<CollectionData> for serde_json::Value {
    fn from(data: CollectionData) -> Self {
        match data {
            CollectionData::List(records) => {
                serde_json::Value::Array(records.into_iter().map(serde_json::Value::from).collect())
            }
            CollectionData::Keyed(records) => serde_json::Value::Object(
                records
                    .into_iter()
                    .map(|(name, record)| (name, serde_json::Value::from(record)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_type_aliases() {
        assert_eq!(PropertyType::parse("REAL"), Some(PropertyType::Float));
        assert_eq!(PropertyType::parse("boolean"), Some(PropertyType::Bool));
        assert_eq!(PropertyType::parse("enumeration"), Some(PropertyType::Enum));
        assert_eq!(PropertyType::parse("filename"), Some(PropertyType::File));
        assert_eq!(
            PropertyType::parse("CrossReference"),
            Some(PropertyType::Reference)
        );
        assert_eq!(PropertyType::parse("string"), None);
    }

    #[test]
    fn test_value_untagged_json_shapes() {
        let value: Value = serde_json::from_str(r#"[["a.txt", null], ["b.txt", "hi"]]"#).unwrap();
        assert_eq!(
            value,
            Value::List(vec![
                Value::file("a.txt", None),
                Value::file("b.txt", Some("hi".into())),
            ])
        );

        let int: Value = serde_json::from_str("30").unwrap();
        assert_eq!(int, Value::Int(30));
        let float: Value = serde_json::from_str("30.5").unwrap();
        assert_eq!(float, Value::Float(30.5));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Float(f64::NAN).is_truthy());
        assert!(!Value::Text(String::new()).is_truthy());
        assert!(Value::Text("false".into()).is_truthy());
        assert!(Value::List(Vec::new()).is_truthy());
    }

    #[test]
    fn test_display_string_matches_number_formatting() {
        assert_eq!(Value::Float(30.0).to_display_string(), "30");
        assert_eq!(Value::Float(2.5).to_display_string(), "2.5");
        assert_eq!(Value::Float(f64::INFINITY).to_display_string(), "Infinity");
        assert_eq!(Value::Bool(true).to_display_string(), "true");
    }

    #[test]
    fn test_record_flattens_fields() {
        let json = serde_json::json!({"name": "Rex", "type": "Dog", "age": 3, "owner": null});
        let record: Record = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(record.name, "Rex");
        assert_eq!(record.kind, "Dog");
        assert_eq!(record.get("age"), Some(&Value::Int(3)));
        assert_eq!(record.get("owner"), Some(&Value::Null));
        assert_eq!(serde_json::Value::from(record), json);
    }

    #[test]
    fn test_collection_data_keyed_serializes_as_object() {
        let mut keyed = BTreeMap::new();
        keyed.insert("b".to_string(), Record::new("b", "T"));
        keyed.insert("a".to_string(), Record::new("a", "T"));
        let data = CollectionData::Keyed(keyed);
        let json = serde_json::Value::from(data);
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
