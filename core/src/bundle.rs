use serde::{Deserialize, Serialize};

use crate::RawConfig;

/// Serializable configuration bundle describing a whole editing session.
///
/// A bundle groups the raw configurations of standalone entity editors and
/// entity collections together with the undo limit, making it suitable for
/// keeping in a single YAML or JSON file next to the application. The raw
/// configurations stay loosely typed until they are normalized.
///
/// # Examples
///
/// ```
/// use entity_maker_core::*;
///
/// let mut bundle = SchemaBundle::new(50);
/// bundle.collections.push(
///     serde_json::json!({"name": "Pets", "entities": [{"name": "Cat", "properties": []}]})
///         .as_object()
///         .cloned()
///         .unwrap(),
/// );
///
/// assert_eq!(bundle.config_count(), 1);
/// assert_eq!(bundle.undo_limit, 50);
/// assert!(validate_bundle(&bundle).is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaBundle {
    /// Bundle format version (populated from
    /// [`BUNDLE_FORMAT_VERSION`](crate::BUNDLE_FORMAT_VERSION)).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    /// How many actions can be undone; zero disables undo/redo.
    #[serde(default)]
    pub undo_limit: usize,
    /// Standalone entity editors (schemas without a collection).
    #[serde(default)]
    pub editors: Vec<RawConfig>,
    /// Entity collections, each with its member schemas.
    #[serde(default)]
    pub collections: Vec<RawConfig>,
}

impl SchemaBundle {
    /// Creates an empty bundle with the given undo limit.
    ///
    /// The `schema_version` is automatically set from
    /// [`BUNDLE_FORMAT_VERSION`](crate::BUNDLE_FORMAT_VERSION).
    pub fn new(undo_limit: usize) -> Self {
        Self {
            schema_version: Some(crate::BUNDLE_FORMAT_VERSION.to_string()),
            undo_limit,
            editors: Vec::new(),
            collections: Vec::new(),
        }
    }

    /// Returns the number of editor and collection configs.
    pub fn config_count(&self) -> usize {
        self.editors.len() + self.collections.len()
    }
}
