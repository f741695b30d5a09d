//! Core entity schema types, value typecasting and schema normalization.
//!
//! This crate defines the foundational types for describing families of
//! typed entity records:
//!
//! - [`PropertySchema`] — one typed property, with its default value and the
//!   attributes its [`PropertyType`] allows.
//! - [`EntitySchema`] — a named set of properties; one editable shape.
//! - [`Record`] and [`Value`] — entity data in canonical typed form.
//! - [`CollectionData`] — the serialized form of a collection's records.
//! - [`SchemaBundle`] — a serializable bundle of raw editor and collection
//!   configurations.
//!
//! Normalization ([`normalize_property`], [`normalize_entity_schema`],
//! [`normalize_collection`]) turns hand-written configuration into these
//! types, reporting a [`ConfigError`] for anything malformed. The codec
//! ([`cast`], [`decode_field`]) typecasts values for a property type.
//!
//! # Example
//!
//! ```
//! use entity_maker_core::*;
//!
//! let mut raw = serde_json::json!({
//!     "name": "Person",
//!     "properties": [
//!         {"name": "age", "type": "int", "min": 0, "max": 120, "default": 30},
//!         {"name": "employed", "type": "bool", "default": true},
//!         {"name": "pets", "type": "xref", "targets": "Pets", "multiple": true},
//!     ],
//! });
//! let schema = normalize_entity_schema(raw.as_object_mut().unwrap(), None).unwrap();
//!
//! let record = schema.defaults("Alice");
//! assert_eq!(record.get("age"), Some(&Value::Int(30)));
//! assert_eq!(record.get("pets"), Some(&Value::List(vec![])));
//! assert!(schema.references("Pets"));
//! ```

mod bundle;
mod codec;
mod normalize;
mod types;
mod validate;

pub use bundle::SchemaBundle;
pub use codec::{CodecError, cast, decode_field, file_loaded, file_name};
pub use normalize::{
    CollectionSpec, RawConfig, display_title, normalize_collection, normalize_entity_schema,
    normalize_property, resolve_alias,
};
pub use types::*;
pub use validate::{ConfigError, validate_bundle, validate_entity_schema};

/// Version of the configuration bundle format (semver).
pub const BUNDLE_FORMAT_VERSION: &str = "1.0.0";
