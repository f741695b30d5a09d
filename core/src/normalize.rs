//! Schema normalization: raw configuration in, typed schemas out.
//!
//! Raw configurations are loosely-typed JSON mappings, as written by hand in
//! a YAML or JSON bundle. Normalization resolves attribute aliases and type
//! aliases, typecasts numeric attributes through the [codec](crate::cast),
//! checks which attributes each property type requires or forbids, and
//! rewrites the raw mapping in place to its canonical form so that
//! normalizing it a second time yields the same result.
//!
//! # Examples
//!
//! ```
//! use entity_maker_core::*;
//!
//! let mut raw = serde_json::json!({
//!     "name": "Pets",
//!     "sorted": true,
//!     "contents": [{
//!         "name": "Dog",
//!         "props": [
//!             {"name": "age", "type": "integer", "minimum": 0, "default": 2},
//!             {"name": "owner", "type": "xref", "targets": "People"},
//!         ],
//!     }],
//! });
//! let spec = normalize_collection(raw.as_object_mut().unwrap()).unwrap();
//! assert!(spec.keep_sorted);
//! assert_eq!(spec.schemas[0].manager.as_deref(), Some("Pets"));
//! assert_eq!(spec.schemas[0].properties[1].targets(), ["People".to_string()]);
//!
//! // The raw mapping now uses canonical attribute names.
//! assert!(raw.get("keep_sorted").is_some());
//! assert!(raw.get("entities").is_some());
//! ```

use std::collections::HashSet;

use crate::{
    ConfigError, EntitySchema, NumberSpec, PropertyKind, PropertySchema, PropertyType,
    RESERVED_PROPERTY_NAMES, Value, cast,
};

/// A raw, loosely-typed configuration mapping.
pub type RawConfig = serde_json::Map<String, serde_json::Value>;

/// Normalized collection configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSpec {
    /// Collection name.
    pub name: String,
    /// Display title.
    pub title: String,
    /// Description shown in the collection header.
    pub description: Option<String>,
    /// Schemas of the records this collection holds, each owned by it.
    pub schemas: Vec<EntitySchema>,
    /// Whether records are kept sorted by name.
    pub keep_sorted: bool,
}

/// Moves the value of any alias to the first (canonical) key.
///
/// Returns the value, if any alias was present. Two aliases holding
/// different values is a configuration error.
pub fn resolve_alias(
    raw: &mut RawConfig,
    location: &str,
    aliases: &[&'static str],
) -> Result<Option<serde_json::Value>, ConfigError> {
    let mut found: Option<serde_json::Value> = None;
    for &alias in aliases {
        let Some(value) = raw.remove(alias) else {
            continue;
        };
        match &found {
            None => found = Some(value),
            Some(first) if *first == value => {}
            Some(_) => {
                return Err(ConfigError::AliasConflict {
                    location: location.to_string(),
                    field: aliases[0],
                    alias,
                });
            }
        }
    }
    if let Some(value) = &found {
        raw.insert(aliases[0].to_string(), value.clone());
    }
    Ok(found)
}

/// Capitalizes every word of a title.
///
/// # Examples
///
/// ```
/// assert_eq!(entity_maker_core::display_title("max speed"), "Max Speed");
/// ```
pub fn display_title(title: &str) -> String {
    title
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalizes one raw property description belonging to entity type `entity`.
///
/// # Errors
///
/// Returns a [`ConfigError`] naming the entity, the property and the
/// attribute at fault.
pub fn normalize_property(entity: &str, raw: &mut RawConfig) -> Result<PropertySchema, ConfigError> {
    let name = property_name(entity, raw)?;
    let location = format!("{entity}:{name}");

    let ty = match raw.get("type") {
        None => PropertyType::Float,
        Some(serde_json::Value::String(found)) => {
            PropertyType::parse(found).ok_or_else(|| ConfigError::UnknownType {
                entity: entity.to_string(),
                property: name.clone(),
                found: found.clone(),
            })?
        }
        Some(other) => {
            return Err(ConfigError::UnknownType {
                entity: entity.to_string(),
                property: name.clone(),
                found: other.to_string(),
            });
        }
    };
    raw.insert("type".to_string(), ty.as_str().into());

    let description = optional_string(raw, &location, "description", &["description", "desc"])?;
    resolve_alias(raw, &location, &["min", "minimum"])?;
    resolve_alias(raw, &location, &["max", "maximum"])?;
    let title = title_of(raw, &name);
    let units = optional_string(raw, &location, "units", &["units"])?;

    let default = coerce(raw, &location, ty, "default")?;
    let min = coerce(raw, &location, ty, "min")?;
    let max = coerce(raw, &location, ty, "max")?;
    let step = coerce(raw, &location, ty, "step")?;

    let accept = match raw.get("accept") {
        None => None,
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Array(items)) => Some(
            items
                .iter()
                .map(|item| Value::from(item.clone()).to_display_string())
                .collect::<Vec<_>>()
                .join(","),
        ),
        Some(other) => {
            return Err(invalid(&location, "accept", format!("expected a string or list, found {other}")));
        }
    };
    if let Some(accept) = &accept {
        raw.insert("accept".to_string(), accept.as_str().into());
    }

    let multiple = raw
        .get("multiple")
        .map(|m| Value::from(m.clone()).is_truthy());
    if let Some(multiple) = multiple {
        raw.insert("multiple".to_string(), multiple.into());
    }

    let targets = match raw.get("targets") {
        None => None,
        Some(serde_json::Value::String(target)) => Some(vec![target.clone()]),
        Some(serde_json::Value::Array(items)) => {
            let mut targets: Vec<String> = Vec::new();
            for item in items {
                let Some(target) = item.as_str() else {
                    return Err(invalid(&location, "targets", format!("expected a name, found {item}")));
                };
                if !targets.iter().any(|t| t == target) {
                    targets.push(target.to_string());
                }
            }
            Some(targets)
        }
        Some(other) => {
            return Err(invalid(&location, "targets", format!("expected a name or list, found {other}")));
        }
    };
    if let Some(targets) = &targets {
        raw.insert("targets".to_string(), targets.clone().into());
    }

    let values = match raw.get("values") {
        None => None,
        Some(serde_json::Value::Array(items)) => Some(
            items
                .iter()
                .map(|item| Value::from(item.clone()).to_display_string())
                .collect::<Vec<_>>(),
        ),
        Some(other) => {
            return Err(invalid(&location, "values", format!("expected a list, found {other}")));
        }
    };
    if let Some(values) = &values {
        raw.insert("values".to_string(), values.clone().into());
    }

    check_presence(raw, &location, ty)?;

    let kind = match ty {
        PropertyType::Float => {
            let spec = NumberSpec {
                default: as_f64(default.as_ref()),
                min: min.as_ref().map(|v| as_f64(Some(v))),
                max: max.as_ref().map(|v| as_f64(Some(v))),
                step: step.as_ref().map(|v| as_f64(Some(v))),
            };
            check_bounds(&location, spec.default, spec.min, spec.max)?;
            PropertyKind::Float(spec)
        }
        PropertyType::Int => {
            let spec = NumberSpec {
                default: as_i64(default.as_ref()),
                min: min.as_ref().map(|v| as_i64(Some(v))),
                max: max.as_ref().map(|v| as_i64(Some(v))),
                step: step.as_ref().map(|v| as_i64(Some(v))),
            };
            check_bounds(
                &location,
                spec.default as f64,
                spec.min.map(|m| m as f64),
                spec.max.map(|m| m as f64),
            )?;
            PropertyKind::Int(spec)
        }
        PropertyType::Bool => PropertyKind::Bool {
            default: default.as_ref().is_some_and(Value::is_truthy),
        },
        PropertyType::Enum => {
            let values = values.unwrap_or_default();
            let default = default
                .as_ref()
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if !values.contains(&default) {
                return Err(ConfigError::DefaultNotInValues { location, default });
            }
            PropertyKind::Enum { values, default }
        }
        PropertyType::File => PropertyKind::File {
            multiple: multiple.unwrap_or(false),
            accept,
        },
        PropertyType::Reference => PropertyKind::Reference {
            targets: targets.unwrap_or_default(),
            multiple: multiple.unwrap_or(false),
        },
    };

    Ok(PropertySchema {
        name,
        title,
        description,
        units,
        kind,
    })
}

/// Normalizes a raw entity schema, optionally owned by collection `manager`.
///
/// # Errors
///
/// Returns the first [`ConfigError`] found in the schema or its properties.
pub fn normalize_entity_schema(
    raw: &mut RawConfig,
    manager: Option<&str>,
) -> Result<EntitySchema, ConfigError> {
    let name = config_name(raw, "entity schema")?;
    let title = title_of(raw, &name);
    let description = optional_string(raw, &name, "description", &["description", "desc"])?;

    resolve_alias(raw, &name, &["properties", "props"])?;
    let props = match raw.get_mut("properties") {
        Some(serde_json::Value::Array(props)) => props,
        Some(other) => {
            return Err(invalid(&name, "properties", format!("expected a list, found {other}")));
        }
        None => {
            return Err(ConfigError::MissingAttribute {
                location: name,
                attribute: "properties",
            });
        }
    };

    let mut properties: Vec<PropertySchema> = Vec::with_capacity(props.len());
    for prop in props.iter_mut() {
        let serde_json::Value::Object(prop) = prop else {
            return Err(invalid(&name, "properties", "every property must be a mapping".to_string()));
        };
        let prop = normalize_property(&name, prop)?;
        if properties.iter().any(|p| p.name == prop.name) {
            return Err(ConfigError::DuplicateProperty {
                entity: name,
                property: prop.name,
            });
        }
        properties.push(prop);
    }

    Ok(EntitySchema {
        name,
        title,
        description,
        properties,
        manager: manager.map(String::from),
    })
}

/// Normalizes a raw collection configuration and its member schemas.
///
/// # Errors
///
/// Returns the first [`ConfigError`] found. Member schemas must have distinct
/// names, different from the collection's own name.
pub fn normalize_collection(raw: &mut RawConfig) -> Result<CollectionSpec, ConfigError> {
    let name = config_name(raw, "collection")?;
    let title = title_of(raw, &name);
    let description = optional_string(raw, &name, "description", &["description", "desc"])?;
    let keep_sorted = resolve_alias(raw, &name, &["keep_sorted", "sorted", "sort"])?
        .map(|v| Value::from(v).is_truthy())
        .unwrap_or(false);
    raw.insert("keep_sorted".to_string(), keep_sorted.into());

    resolve_alias(raw, &name, &["entities", "contents"])?;
    let entities = match raw.get_mut("entities") {
        Some(serde_json::Value::Array(entities)) if !entities.is_empty() => entities,
        Some(serde_json::Value::Array(_)) => {
            return Err(invalid(&name, "entities", "must list at least one entity schema".to_string()));
        }
        Some(other) => {
            return Err(invalid(&name, "entities", format!("expected a list, found {other}")));
        }
        None => {
            return Err(ConfigError::MissingAttribute {
                location: name,
                attribute: "entities",
            });
        }
    };

    let mut seen: HashSet<String> = HashSet::from([name.clone()]);
    let mut schemas = Vec::with_capacity(entities.len());
    for entity in entities.iter_mut() {
        let serde_json::Value::Object(entity) = entity else {
            return Err(invalid(&name, "entities", "every entity schema must be a mapping".to_string()));
        };
        let schema = normalize_entity_schema(entity, Some(&name))?;
        if !seen.insert(schema.name.clone()) {
            return Err(ConfigError::NameConflict(schema.name));
        }
        schemas.push(schema);
    }

    Ok(CollectionSpec {
        name,
        title,
        description,
        schemas,
        keep_sorted,
    })
}

fn config_name(raw: &mut RawConfig, kind: &'static str) -> Result<String, ConfigError> {
    let name = raw
        .get("name")
        .and_then(|n| n.as_str())
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or(ConfigError::MissingName { kind })?;
    raw.insert("name".to_string(), name.as_str().into());
    Ok(name)
}

fn property_name(entity: &str, raw: &RawConfig) -> Result<String, ConfigError> {
    let reject = |property: &str, reason| ConfigError::InvalidPropertyName {
        entity: entity.to_string(),
        property: property.to_string(),
        reason,
    };
    let name = match raw.get("name") {
        Some(serde_json::Value::String(name)) => name.clone(),
        Some(other) => return Err(reject(&other.to_string(), "name must be a string")),
        None => return Err(reject("", "missing name")),
    };
    if name.is_empty() {
        return Err(reject(&name, "missing name"));
    }
    if name != name.trim() {
        return Err(reject(&name, "leading or trailing whitespace"));
    }
    if RESERVED_PROPERTY_NAMES.contains(&name.as_str()) {
        return Err(reject(&name, "reserved name"));
    }
    Ok(name)
}

// The raw title is filled in from the name (underscores as spaces); the
// returned display title is capitalized.
fn title_of(raw: &mut RawConfig, name: &str) -> String {
    let title = match raw.get("title").and_then(|t| t.as_str()) {
        Some(title) => title.to_string(),
        None => {
            let title = name.trim().replace('_', " ");
            raw.insert("title".to_string(), title.as_str().into());
            title
        }
    };
    display_title(&title)
}

fn optional_string(
    raw: &mut RawConfig,
    location: &str,
    attribute: &'static str,
    aliases: &[&'static str],
) -> Result<Option<String>, ConfigError> {
    match resolve_alias(raw, location, aliases)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(invalid(location, attribute, format!("expected a string, found {other}"))),
    }
}

// Casts one attribute through the codec and writes the canonical form back.
fn coerce(
    raw: &mut RawConfig,
    location: &str,
    ty: PropertyType,
    attribute: &'static str,
) -> Result<Option<Value>, ConfigError> {
    let Some(found) = raw.get(attribute) else {
        return Ok(None);
    };
    let value = match cast(ty, &Value::from(found.clone())) {
        Ok(value) => value,
        Err(crate::CodecError::NonFinite(_)) if attribute == "default" => {
            return Err(ConfigError::NonFiniteDefault {
                location: location.to_string(),
            });
        }
        Err(err) => return Err(ConfigError::codec(location, attribute, err)),
    };
    if let Value::Float(f) = value {
        if !f.is_finite() {
            if attribute == "default" {
                return Err(ConfigError::NonFiniteDefault {
                    location: location.to_string(),
                });
            }
            return Err(invalid(location, attribute, "must be a finite number".to_string()));
        }
    }
    raw.insert(attribute.to_string(), value.clone().into());
    Ok(Some(value))
}

fn check_presence(raw: &RawConfig, location: &str, ty: PropertyType) -> Result<(), ConfigError> {
    let require = |attribute: &'static str| {
        if raw.contains_key(attribute) {
            Ok(())
        } else {
            Err(ConfigError::MissingAttribute {
                location: location.to_string(),
                attribute,
            })
        }
    };
    let forbid = |attribute: &'static str| {
        if raw.contains_key(attribute) {
            Err(ConfigError::UnexpectedAttribute {
                location: location.to_string(),
                attribute,
            })
        } else {
            Ok(())
        }
    };

    if !ty.is_numeric() {
        forbid("min")?;
        forbid("max")?;
        forbid("step")?;
    }
    if ty == PropertyType::Enum {
        require("values")?;
    } else {
        forbid("values")?;
    }
    if ty == PropertyType::Reference {
        require("targets")?;
    } else {
        forbid("targets")?;
    }
    if !matches!(ty, PropertyType::File | PropertyType::Reference) {
        forbid("multiple")?;
    }
    if ty != PropertyType::File {
        forbid("accept")?;
    }
    match ty {
        PropertyType::File | PropertyType::Reference => forbid("default"),
        _ => require("default"),
    }
}

fn check_bounds(location: &str, default: f64, min: Option<f64>, max: Option<f64>) -> Result<(), ConfigError> {
    let below = min.is_some_and(|min| default < min);
    let above = max.is_some_and(|max| default > max);
    if below || above {
        return Err(ConfigError::DefaultOutOfBounds {
            location: location.to_string(),
            default,
            min: min.unwrap_or(f64::NEG_INFINITY),
            max: max.unwrap_or(f64::INFINITY),
        });
    }
    Ok(())
}

fn as_f64(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Float(f)) => *f,
        Some(Value::Int(i)) => *i as f64,
        _ => 0.0,
    }
}

fn as_i64(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Int(i)) => *i,
        _ => 0,
    }
}

fn invalid(location: &str, attribute: &'static str, reason: String) -> ConfigError {
    ConfigError::InvalidAttribute {
        location: location.to_string(),
        attribute,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn raw(value: serde_json::Value) -> RawConfig {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_int_default_is_rounded_and_bounded() {
        let mut config = raw(json!({
            "name": "age", "type": "int", "min": 0, "max": 120, "default": "30.7",
        }));
        let prop = normalize_property("Person", &mut config).unwrap();
        assert_eq!(
            prop.kind,
            PropertyKind::Int(NumberSpec {
                default: 31,
                min: Some(0),
                max: Some(120),
                step: None,
            })
        );
        assert_eq!(config.get("default"), Some(&json!(31)));
    }

    #[test]
    fn test_default_out_of_bounds_is_rejected() {
        let mut config = raw(json!({"name": "age", "type": "int", "min": 0, "max": 120, "default": 130}));
        assert!(matches!(
            normalize_property("Person", &mut config),
            Err(ConfigError::DefaultOutOfBounds { .. })
        ));

        let mut config = raw(json!({"name": "speed", "minimum": 1.5, "default": 1}));
        assert!(matches!(
            normalize_property("Car", &mut config),
            Err(ConfigError::DefaultOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_non_finite_default_is_rejected() {
        let mut config = raw(json!({"name": "x", "type": "float", "default": "Infinity"}));
        assert_eq!(
            normalize_property("Point", &mut config),
            Err(ConfigError::NonFiniteDefault {
                location: "Point:x".into()
            })
        );
        let mut config = raw(json!({"name": "n", "type": "int", "default": "NaN"}));
        assert!(matches!(
            normalize_property("Point", &mut config),
            Err(ConfigError::NonFiniteDefault { .. })
        ));
    }

    #[test]
    fn test_missing_type_defaults_to_float() {
        let mut config = raw(json!({"name": "mass", "default": 2}));
        let prop = normalize_property("Body", &mut config).unwrap();
        assert_eq!(prop.property_type(), PropertyType::Float);
        assert_eq!(prop.default_value(), Value::Float(2.0));
        assert_eq!(config.get("type"), Some(&json!("float")));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let mut config = raw(json!({
            "name": "max_speed", "type": "REAL", "desc": "Top speed", "maximum": "300",
            "default": "120", "step": 0.5, "units": "km/h",
        }));
        let first = normalize_property("Car", &mut config).unwrap();
        let snapshot = config.clone();
        let second = normalize_property("Car", &mut config).unwrap();
        assert_eq!(first, second);
        assert_eq!(config, snapshot);
        assert_eq!(first.title, "Max Speed");
        assert_eq!(first.description.as_deref(), Some("Top speed"));
    }

    #[test]
    fn test_alias_conflict_is_rejected() {
        let mut config = raw(json!({"name": "x", "min": 0, "minimum": 1, "default": 2}));
        assert_eq!(
            normalize_property("P", &mut config),
            Err(ConfigError::AliasConflict {
                location: "P:x".into(),
                field: "min",
                alias: "minimum",
            })
        );
    }

    #[test]
    fn test_reserved_and_padded_names_are_rejected() {
        for name in ["name", "type", " padded", ""] {
            let mut config = raw(json!({"name": name, "type": "bool", "default": false}));
            assert!(matches!(
                normalize_property("P", &mut config),
                Err(ConfigError::InvalidPropertyName { .. })
            ));
        }
    }

    #[test]
    fn test_forbidden_attributes_are_rejected() {
        let cases = [
            (json!({"name": "f", "type": "bool", "default": true, "min": 0}), "min"),
            (json!({"name": "f", "type": "file", "default": null}), "default"),
            (json!({"name": "f", "type": "int", "default": 1, "multiple": true}), "multiple"),
            (json!({"name": "f", "type": "xref", "targets": "A", "accept": ".png"}), "accept"),
            (json!({"name": "f", "type": "bool", "default": true, "targets": "A"}), "targets"),
        ];
        for (config, attribute) in cases {
            let mut config = raw(config);
            assert_eq!(
                normalize_property("P", &mut config),
                Err(ConfigError::UnexpectedAttribute {
                    location: "P:f".into(),
                    attribute,
                })
            );
        }
    }

    #[test]
    fn test_required_attributes_are_enforced() {
        let mut config = raw(json!({"name": "color", "type": "enum", "default": "red"}));
        assert_eq!(
            normalize_property("P", &mut config),
            Err(ConfigError::MissingAttribute {
                location: "P:color".into(),
                attribute: "values",
            })
        );
        let mut config = raw(json!({"name": "on", "type": "boolean"}));
        assert_eq!(
            normalize_property("P", &mut config),
            Err(ConfigError::MissingAttribute {
                location: "P:on".into(),
                attribute: "default",
            })
        );
    }

    #[test]
    fn test_enum_default_must_be_member() {
        let mut config = raw(json!({
            "name": "color", "type": "enumeration", "values": ["red", "green"], "default": "blue",
        }));
        assert!(matches!(
            normalize_property("P", &mut config),
            Err(ConfigError::DefaultNotInValues { .. })
        ));
    }

    #[test]
    fn test_file_and_reference_attributes() {
        let mut config = raw(json!({
            "name": "images", "type": "filename", "accept": [".png", ".jpg"], "multiple": 1,
        }));
        let prop = normalize_property("P", &mut config).unwrap();
        assert_eq!(
            prop.kind,
            PropertyKind::File {
                multiple: true,
                accept: Some(".png,.jpg".into()),
            }
        );
        assert_eq!(prop.default_value(), Value::List(Vec::new()));

        let mut config = raw(json!({"name": "friend", "type": "crossreference", "targets": "People"}));
        let prop = normalize_property("P", &mut config).unwrap();
        assert_eq!(prop.targets(), ["People".to_string()]);
        assert!(!prop.is_multiple());
        assert_eq!(prop.default_value(), Value::Null);
        assert_eq!(config.get("targets"), Some(&json!(["People"])));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let mut config = raw(json!({"name": "x", "type": "complex"}));
        assert_eq!(
            normalize_property("P", &mut config),
            Err(ConfigError::UnknownType {
                entity: "P".into(),
                property: "x".into(),
                found: "complex".into(),
            })
        );
    }

    #[test]
    fn test_entity_schema_rejects_duplicate_properties() {
        let mut config = raw(json!({
            "name": "Cat",
            "properties": [
                {"name": "lives", "type": "int", "default": 9},
                {"name": "lives", "type": "int", "default": 7},
            ],
        }));
        assert_eq!(
            normalize_entity_schema(&mut config, None),
            Err(ConfigError::DuplicateProperty {
                entity: "Cat".into(),
                property: "lives".into(),
            })
        );
    }

    #[test]
    fn test_collection_requires_entities() {
        let mut config = raw(json!({"name": "Pets", "entities": []}));
        assert!(matches!(
            normalize_collection(&mut config),
            Err(ConfigError::InvalidAttribute { attribute: "entities", .. })
        ));
        let mut config = raw(json!({"title": "Pets"}));
        assert_eq!(
            normalize_collection(&mut config),
            Err(ConfigError::MissingName { kind: "collection" })
        );
    }

    #[test]
    fn test_collection_title_and_name_are_trimmed() {
        let mut config = raw(json!({
            "name": " pet_shop ",
            "entities": [{"name": "Cat", "properties": []}],
        }));
        let spec = normalize_collection(&mut config).unwrap();
        assert_eq!(spec.name, "pet_shop");
        assert_eq!(spec.title, "Pet Shop");
        assert!(!spec.keep_sorted);
    }
}
