//! Configuration errors and schema validation.
//!
//! Normalization ([`normalize_property`](crate::normalize_property) and
//! friends) stops at the first problem it finds. The validators here run the
//! same checks on a copy of the raw configuration and collect every
//! diagnostic, which is what tooling wants when reporting on a whole bundle.
//!
//! # Examples
//!
//! ```
//! use entity_maker_core::*;
//!
//! let raw = serde_json::json!({
//!     "name": "Cat",
//!     "properties": [
//!         {"name": "lives", "type": "int"},
//!         {"name": "type", "type": "bool", "default": true},
//!     ],
//! });
//! let errors = validate_entity_schema(raw.as_object().unwrap());
//! assert_eq!(errors.len(), 2);
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::normalize::{RawConfig, normalize_collection, normalize_entity_schema, normalize_property};
use crate::{CodecError, SchemaBundle};

/// Configuration errors: a schema, collection or bundle is malformed.
///
/// These are fatal at setup time. Each variant names the entity type and,
/// where relevant, the property and attribute at fault.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A schema or collection config has no usable `name`.
    #[error("{kind} config is missing a name")]
    MissingName {
        /// `"entity schema"` or `"collection"`.
        kind: &'static str,
    },
    /// A property name is missing, padded with whitespace or reserved.
    #[error("invalid property name \"{property}\" on \"{entity}\": {reason}")]
    InvalidPropertyName {
        /// Entity type name.
        entity: String,
        /// Offending property name.
        property: String,
        /// Why the name was rejected.
        reason: &'static str,
    },
    /// Two properties of one entity type share a name.
    #[error("duplicate property \"{property}\" on \"{entity}\"")]
    DuplicateProperty {
        /// Entity type name.
        entity: String,
        /// Duplicated property name.
        property: String,
    },
    /// The `type` attribute names no known property type.
    #[error("unrecognized property type \"{found}\", in \"{entity}:{property}\"")]
    UnknownType {
        /// Entity type name.
        entity: String,
        /// Property name.
        property: String,
        /// Type string as written.
        found: String,
    },
    /// Two aliases of one attribute are both present with different values.
    #[error("conflicting attributes \"{field}\" and \"{alias}\" on \"{location}\"")]
    AliasConflict {
        /// `entity` or `entity:property`.
        location: String,
        /// Canonical attribute name.
        field: &'static str,
        /// Conflicting alias.
        alias: &'static str,
    },
    /// A required attribute is absent.
    #[error("missing attribute \"{attribute}\" on \"{location}\"")]
    MissingAttribute {
        /// `entity` or `entity:property`.
        location: String,
        /// Attribute name.
        attribute: &'static str,
    },
    /// An attribute is present that the property type forbids.
    #[error("unexpected attribute \"{attribute}\" on \"{location}\"")]
    UnexpectedAttribute {
        /// `entity:property`.
        location: String,
        /// Attribute name.
        attribute: &'static str,
    },
    /// An attribute has a value of the wrong shape or type.
    #[error("invalid attribute \"{attribute}\" on \"{location}\": {reason}")]
    InvalidAttribute {
        /// `entity` or `entity:property`.
        location: String,
        /// Attribute name.
        attribute: &'static str,
        /// What is wrong with it.
        reason: String,
    },
    /// A numeric default is NaN or infinite.
    #[error("default of \"{location}\" must be a finite number")]
    NonFiniteDefault {
        /// `entity:property`.
        location: String,
    },
    /// A numeric default lies outside `[min, max]`.
    #[error("default {default} of \"{location}\" is outside [{min}, {max}]")]
    DefaultOutOfBounds {
        /// `entity:property`.
        location: String,
        /// Configured default.
        default: f64,
        /// Lower bound (`-inf` when unset).
        min: f64,
        /// Upper bound (`inf` when unset).
        max: f64,
    },
    /// An enum default is not among its values.
    #[error("default \"{default}\" of \"{location}\" is not one of its values")]
    DefaultNotInValues {
        /// `entity:property`.
        location: String,
        /// Configured default.
        default: String,
    },
    /// A name is already taken by another schema or collection.
    #[error("entity schema or collection name conflict: \"{0}\"")]
    NameConflict(String),
}

impl ConfigError {
    pub(crate) fn codec(location: &str, attribute: &'static str, err: CodecError) -> Self {
        Self::InvalidAttribute {
            location: location.to_string(),
            attribute,
            reason: err.to_string(),
        }
    }
}

/// Validates one raw entity schema, collecting a diagnostic per bad property.
///
/// The input is left untouched; a copy is normalized.
pub fn validate_entity_schema(raw: &RawConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();
    let mut raw = raw.clone();

    let props = match raw.get("properties").or_else(|| raw.get("props")) {
        Some(serde_json::Value::Array(props)) => props.clone(),
        _ => {
            // Nothing to collect per property; report the normalizer's own
            // diagnostic for the schema as a whole.
            if let Err(err) = normalize_entity_schema(&mut raw, None) {
                errors.push(err);
            }
            return errors;
        }
    };

    let entity = raw
        .get("name")
        .and_then(|n| n.as_str())
        .map(|n| n.trim().to_string())
        .unwrap_or_default();
    if entity.is_empty() {
        errors.push(ConfigError::MissingName {
            kind: "entity schema",
        });
        return errors;
    }

    let mut seen = HashSet::new();
    for prop in props {
        let serde_json::Value::Object(mut prop) = prop else {
            errors.push(ConfigError::InvalidAttribute {
                location: entity.clone(),
                attribute: "properties",
                reason: "every property must be a mapping".to_string(),
            });
            continue;
        };
        match normalize_property(&entity, &mut prop) {
            Ok(normalized) => {
                if !seen.insert(normalized.name.clone()) {
                    errors.push(ConfigError::DuplicateProperty {
                        entity: entity.clone(),
                        property: normalized.name,
                    });
                }
            }
            Err(err) => errors.push(err),
        }
    }

    errors
}

/// Validates a full configuration bundle.
///
/// Checks every editor and collection config, then checks that all editor,
/// collection and member-schema names are unique across the bundle.
///
/// # Examples
///
/// ```
/// use entity_maker_core::*;
///
/// let bundle: SchemaBundle = serde_json::from_value(serde_json::json!({
///     "collections": [
///         {"name": "Pets", "entities": [{"name": "Cat", "properties": []}]},
///         {"name": "Cat", "entities": [{"name": "Lion", "properties": []}]},
///     ],
/// })).unwrap();
/// let errors = validate_bundle(&bundle);
/// assert_eq!(errors, vec![ConfigError::NameConflict("Cat".into())]);
/// ```
pub fn validate_bundle(bundle: &SchemaBundle) -> Vec<ConfigError> {
    let mut errors = Vec::new();
    let mut names: HashSet<String> = HashSet::new();
    let mut claim = |name: &str, errors: &mut Vec<ConfigError>| {
        if !names.insert(name.to_string()) {
            errors.push(ConfigError::NameConflict(name.to_string()));
        }
    };

    for editor in &bundle.editors {
        let schema_errors = validate_entity_schema(editor);
        if schema_errors.is_empty() {
            if let Ok(schema) = normalize_entity_schema(&mut editor.clone(), None) {
                claim(&schema.name, &mut errors);
            }
        }
        errors.extend(schema_errors);
    }

    for collection in &bundle.collections {
        let mut entity_errors = Vec::new();
        if let Some(serde_json::Value::Array(entities)) = collection
            .get("entities")
            .or_else(|| collection.get("contents"))
        {
            for entity in entities {
                if let serde_json::Value::Object(entity) = entity {
                    entity_errors.extend(validate_entity_schema(entity));
                }
            }
        }
        if entity_errors.is_empty() {
            match normalize_collection(&mut collection.clone()) {
                Ok(spec) => {
                    claim(&spec.name, &mut errors);
                    for schema in &spec.schemas {
                        claim(&schema.name, &mut errors);
                    }
                }
                Err(err) => errors.push(err),
            }
        }
        errors.extend(entity_errors);
    }

    errors
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
    fn test_validate_entity_schema_collects_all_errors() {
        let schema = raw(json!({
            "name": "Dog",
            "properties": [
                {"name": "age", "type": "int", "default": 3},
                {"name": "age", "type": "int", "default": 4},
                {"name": "color", "type": "colour"},
                {"name": "owner", "type": "xref"},
            ],
        }));
        let errors = validate_entity_schema(&schema);
        assert_eq!(
            errors,
            vec![
                ConfigError::DuplicateProperty {
                    entity: "Dog".into(),
                    property: "age".into(),
                },
                ConfigError::UnknownType {
                    entity: "Dog".into(),
                    property: "color".into(),
                    found: "colour".into(),
                },
                ConfigError::MissingAttribute {
                    location: "Dog:owner".into(),
                    attribute: "targets",
                },
            ]
        );
    }

    #[test]
    fn test_validate_entity_schema_accepts_valid_schema() {
        let schema = raw(json!({
            "name": "Dog",
            "props": [{"name": "good", "type": "boolean", "default": true}],
        }));
        assert!(validate_entity_schema(&schema).is_empty());
    }

    #[test]
    fn test_validate_entity_schema_reports_missing_properties() {
        let schema = raw(json!({"name": "Dog"}));
        assert_eq!(
            validate_entity_schema(&schema),
            vec![ConfigError::MissingAttribute {
                location: "Dog".into(),
                attribute: "properties",
            }]
        );
    }

    #[test]
    fn test_validate_bundle_rejects_editor_collection_clash() {
        let bundle: SchemaBundle = serde_json::from_value(json!({
            "editors": [{"name": "Pets", "properties": []}],
            "collections": [{"name": "Pets", "entities": [{"name": "Cat", "properties": []}]}],
        }))
        .unwrap();
        assert_eq!(
            validate_bundle(&bundle),
            vec![ConfigError::NameConflict("Pets".into())]
        );
    }
}
