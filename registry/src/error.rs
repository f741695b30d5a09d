//! Error types for registry and editing operations.
//!
//! Setup failures (reading or parsing a bundle, malformed configuration) are
//! [`RegistryError`]s. Editing operations return [`EditError`]; a rejected
//! edit leaves the model unchanged.

use entity_maker_core::{CodecError, ConfigError};
use thiserror::Error;

/// Errors that can occur while loading or building a registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A schema or collection configuration is malformed.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Convenience alias for results with [`RegistryError`].
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Why a proposed record name is not acceptable.
///
/// The display strings are the messages an editor shows next to the name
/// field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NameError {
    /// The name is empty (after trimming).
    #[error("required field")]
    Empty,
    /// The name belongs to a registered schema or collection.
    #[error("reserved name")]
    Reserved,
    /// Another record already has this name.
    #[error("duplicate name")]
    Duplicate,
    /// The name contains a character that cannot appear in names.
    #[error("invalid character: {0}")]
    InvalidCharacter(char),
}

/// Errors returned by editing operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    /// The proposed name is rejected.
    #[error(transparent)]
    Name(#[from] NameError),

    /// No collection or standalone editor is registered under this name.
    #[error("no collection or editor named \"{0}\"")]
    UnknownEntry(String),

    /// The name belongs to a standalone editor, not a collection.
    #[error("\"{0}\" is not a collection")]
    NotACollection(String),

    /// The collection has no member schema with this name.
    #[error("collection \"{collection}\" has no entity type \"{schema}\"")]
    UnknownSchema {
        /// Collection name.
        collection: String,
        /// Requested entity type.
        schema: String,
    },

    /// No record with this name exists in the collection.
    #[error("no entity named \"{0}\"")]
    UnknownEntity(String),

    /// The entity type has no property with this name.
    #[error("entity type \"{schema}\" has no property \"{property}\"")]
    UnknownProperty {
        /// Entity type name.
        schema: String,
        /// Requested property.
        property: String,
    },

    /// The property exists but is not a file property.
    #[error("property \"{0}\" is not a file property")]
    NotAFileProperty(String),

    /// A value could not be typecast for its property.
    #[error("invalid value for \"{property}\": {source}")]
    InvalidValue {
        /// Property name.
        property: String,
        /// Typecast failure.
        #[source]
        source: CodecError,
    },

    /// The operation needs a selected record and none is selected.
    #[error("no entity is selected")]
    NothingSelected,

    /// A record index is past the end of the collection.
    #[error("index {index} is out of range for {len} entities")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of records.
        len: usize,
    },

    /// Records of a sorted collection cannot be reordered by hand.
    #[error("collection \"{0}\" is kept sorted")]
    SortedCollection(String),
}
