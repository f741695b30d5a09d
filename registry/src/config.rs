//! Configuration bundles and data documents on disk.
//!
//! A [`SchemaBundle`] describes a whole editing session: the undo limit, the
//! standalone editors and the collections. Bundles are YAML by default; a
//! `.json` extension selects JSON.
//!
//! # Example YAML
//!
//! ```yaml
//! undo_limit: 50
//! editors:
//!   - name: Settings
//!     properties:
//!       - {name: seed, type: int, default: 0}
//! collections:
//!   - name: Pets
//!     sorted: true
//!     entities:
//!       - name: Cat
//!         properties:
//!           - {name: lives, type: integer, default: 9, min: 0, max: 9}
//!       - name: Dog
//!         properties:
//!           - {name: good, type: boolean, default: true}
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use entity_maker_core::{RawConfig, SchemaBundle};
use tracing::{debug, warn};

use crate::error::Result;
use crate::registry::Registry;

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

/// Loads a configuration bundle.
///
/// # Errors
///
/// Returns [`IoError`](crate::RegistryError::IoError) if the file cannot be
/// read, or [`YamlError`](crate::RegistryError::YamlError) /
/// [`JsonError`](crate::RegistryError::JsonError) if parsing fails.
pub fn load_bundle(path: impl AsRef<Path>) -> Result<SchemaBundle> {
    let path = path.as_ref();
    let reader = BufReader::new(std::fs::File::open(path)?);
    let bundle = if is_json(path) {
        serde_json::from_reader(reader)?
    } else {
        serde_yaml::from_reader(reader)?
    };
    Ok(bundle)
}

/// Saves a configuration bundle, as JSON for `.json` paths and YAML
/// otherwise.
pub fn save_bundle(bundle: &SchemaBundle, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let writer = BufWriter::new(std::fs::File::create(path)?);
    if is_json(path) {
        serde_json::to_writer_pretty(writer, bundle)?;
    } else {
        serde_yaml::to_writer(writer, bundle)?;
    }
    Ok(())
}

/// Reads a JSON data document.
pub fn load_document(path: impl AsRef<Path>) -> Result<serde_json::Value> {
    let reader = BufReader::new(std::fs::File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Writes a JSON data document, pretty-printed.
pub fn save_document(document: &serde_json::Value, path: impl AsRef<Path>) -> Result<()> {
    let writer = BufWriter::new(std::fs::File::create(path)?);
    serde_json::to_writer_pretty(writer, document)?;
    Ok(())
}

/// Builder for a [`Registry`].
///
/// Configurations are normalized and registered in the order they were
/// added: collections first, then editors.
///
/// # Examples
///
/// ```
/// use entity_maker_registry::Registry;
///
/// let registry = Registry::builder()
///     .undo_limit(20)
///     .collection(serde_json::json!({
///         "name": "Pets",
///         "entities": [{"name": "Cat", "properties": []}],
///     }))
///     .editor(serde_json::json!({
///         "name": "Owner",
///         "properties": [{"name": "pet", "type": "xref", "targets": "Pets"}],
///     }))
///     .build()
///     .unwrap();
/// assert_eq!(registry.history().limit(), 20);
/// assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Pets", "Owner"]);
/// ```
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    undo_limit: usize,
    editors: Vec<RawConfig>,
    collections: Vec<RawConfig>,
}

impl RegistryBuilder {
    /// Creates an empty builder with undo disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many actions can be undone.
    pub fn undo_limit(mut self, limit: usize) -> Self {
        self.undo_limit = limit;
        self
    }

    /// Adds a raw standalone editor configuration.
    ///
    /// Anything other than a mapping is reported by
    /// [`build`](Self::build) as a missing name.
    pub fn editor(mut self, raw: serde_json::Value) -> Self {
        self.editors.push(into_raw(raw));
        self
    }

    /// Adds a raw collection configuration.
    pub fn collection(mut self, raw: serde_json::Value) -> Self {
        self.collections.push(into_raw(raw));
        self
    }

    /// Adds every configuration of a bundle and takes its undo limit.
    pub fn bundle(mut self, bundle: SchemaBundle) -> Self {
        self.undo_limit = bundle.undo_limit;
        self.editors.extend(bundle.editors);
        self.collections.extend(bundle.collections);
        self
    }

    /// Normalizes and registers every configuration.
    ///
    /// Reference targets that are still unresolved once everything is
    /// registered are logged as warnings.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Config`](crate::RegistryError::Config) for
    /// the first malformed or conflicting configuration.
    pub fn build(self) -> Result<Registry> {
        let mut registry = Registry::with_undo_limit(self.undo_limit);
        for mut raw in self.collections {
            registry.add_collection(&mut raw)?;
        }
        for mut raw in self.editors {
            registry.add_editor(&mut raw)?;
        }
        for (edge, target) in registry.unresolved_references() {
            warn!(schema = %edge.schema, property = %edge.property, target = %target, "Non-existent reference target");
        }
        debug!(entries = registry.names().count(), "Built registry");
        Ok(registry)
    }
}

fn into_raw(raw: serde_json::Value) -> RawConfig {
    match raw {
        serde_json::Value::Object(map) => map,
        _ => RawConfig::new(),
    }
}

impl Registry {
    /// Returns a new [`RegistryBuilder`].
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Builds a registry from a configuration bundle.
    pub fn from_bundle(bundle: SchemaBundle) -> Result<Self> {
        RegistryBuilder::new().bundle(bundle).build()
    }

    /// Loads a bundle file and builds a registry from it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_bundle(load_bundle(path)?)
    }
}

#[cfg(test)]
mod tests {
    use entity_maker_core::ConfigError;

    use super::*;
    use crate::RegistryError;

    fn sample_yaml() -> &'static str {
        r#"
undo_limit: 50
editors:
  - name: Settings
    properties:
      - {name: seed, type: int, default: 0}
collections:
  - name: Pets
    sorted: true
    entities:
      - name: Cat
        properties:
          - {name: lives, type: integer, default: 9, min: 0, max: 9}
      - name: Dog
        properties:
          - {name: good, type: boolean, default: true}
"#
    }

    #[test]
    fn test_deserialize_bundle() {
        let bundle: SchemaBundle = serde_yaml::from_str(sample_yaml()).unwrap();
        assert_eq!(bundle.undo_limit, 50);
        assert_eq!(bundle.editors.len(), 1);
        assert_eq!(bundle.collections.len(), 1);
        assert!(bundle.schema_version.is_none());
    }

    #[test]
    fn test_from_bundle_registers_everything() {
        let bundle: SchemaBundle = serde_yaml::from_str(sample_yaml()).unwrap();
        let registry = Registry::from_bundle(bundle).unwrap();
        assert!(registry.collection("Pets").unwrap().is_sorted());
        assert!(registry.editor("Settings").is_some());
        assert_eq!(registry.owner_of("Cat"), Some("Pets"));
        assert_eq!(registry.history().limit(), 50);
    }

    #[test]
    fn test_builder_rejects_name_conflict() {
        let result = Registry::builder()
            .collection(serde_json::json!({
                "name": "Pets",
                "entities": [{"name": "Cat", "properties": []}],
            }))
            .editor(serde_json::json!({"name": "Cat", "properties": []}))
            .build();
        assert!(matches!(
            result,
            Err(RegistryError::Config(ConfigError::NameConflict(name))) if name == "Cat"
        ));
    }

    #[test]
    fn test_builder_rejects_non_mapping() {
        let result = Registry::builder().editor(serde_json::json!(["x"])).build();
        assert!(matches!(
            result,
            Err(RegistryError::Config(ConfigError::MissingName { .. }))
        ));
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let bundle: SchemaBundle = serde_yaml::from_str(sample_yaml()).unwrap();

        for file in ["bundle.yml", "bundle.json"] {
            let path = dir.path().join(file);
            save_bundle(&bundle, &path).unwrap();
            let loaded = load_bundle(&path).unwrap();
            assert_eq!(loaded.undo_limit, bundle.undo_limit);
            assert_eq!(loaded.collections, bundle.collections);
        }
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_bundle(dir.path().join("missing.yml"));
        assert!(matches!(result, Err(RegistryError::IoError(_))));
    }
}
