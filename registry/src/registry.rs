//! The entity registry: every collection and standalone editor by name.
//!
//! [`Registry`] owns all editing state. Names are unique across the whole
//! registry: record names may not collide with each other or with any
//! registered schema or collection name.
//!
//! # Examples
//!
//! ```
//! use entity_maker_registry::Registry;
//!
//! let mut registry = Registry::with_undo_limit(10);
//! let mut raw = serde_json::json!({
//!     "name": "Pets",
//!     "entities": [
//!         {"name": "Cat", "properties": [{"name": "lives", "type": "int", "default": 9}]},
//!     ],
//! });
//! registry.add_collection(raw.as_object_mut().unwrap()).unwrap();
//!
//! registry.create("Pets", "Cat", "Tom").unwrap();
//! assert_eq!(registry.validate_name("Tom").unwrap_err().to_string(), "duplicate name");
//! assert!(registry.undo());
//! assert!(registry.collection("Pets").unwrap().is_empty());
//! ```

use std::collections::HashMap;

use entity_maker_core::{
    CollectionSpec, ConfigError, EntitySchema, RESERVED_NAME_CHARS, RawConfig, Record,
    normalize_collection, normalize_entity_schema,
};
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::collection::EntityCollection;
use crate::editor::StandaloneEditor;
use crate::error::NameError;
use crate::files::FileTracker;
use crate::history::{UndoEntry, UndoLog};
use crate::xref::XrefTracker;

/// Capabilities shared by everything registered in a [`Registry`].
pub trait Registered {
    /// Registered name.
    fn name(&self) -> &str;
    /// Display title.
    fn title(&self) -> &str;
    /// Optional description.
    fn description(&self) -> Option<&str>;
    /// Entity schemas this entry edits.
    fn schemas(&self) -> Vec<&EntitySchema>;
}

/// A registered collection or standalone editor.
#[derive(Debug)]
pub enum Entry {
    /// A standalone entity editor.
    Editor(StandaloneEditor),
    /// An entity collection.
    Collection(EntityCollection),
}

impl Entry {
    /// Shared view of the entry.
    pub fn as_registered(&self) -> &dyn Registered {
        match self {
            Self::Editor(editor) => editor,
            Self::Collection(collection) => collection,
        }
    }
}

/// All collections and standalone editors, with shared name space, cross
/// references and undo history.
#[derive(Debug, Default)]
pub struct Registry {
    pub(crate) entries: IndexMap<String, Entry>,
    /// Member schema name to owning collection name.
    pub(crate) owners: HashMap<String, String>,
    pub(crate) xrefs: XrefTracker,
    pub(crate) history: UndoLog,
    pub(crate) files: FileTracker,
}

impl Registry {
    /// Creates an empty registry with undo disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry keeping up to `limit` undoable actions.
    pub fn with_undo_limit(limit: usize) -> Self {
        Self {
            history: UndoLog::new(limit),
            ..Self::default()
        }
    }

    /// Normalizes and registers a standalone entity editor.
    ///
    /// The raw configuration is rewritten in canonical form.
    ///
    /// # Errors
    ///
    /// Returns the normalization error, or [`ConfigError::NameConflict`] if
    /// the name is taken.
    pub fn add_editor(&mut self, raw: &mut RawConfig) -> Result<(), ConfigError> {
        let schema = normalize_entity_schema(raw, None)?;
        self.register_editor(schema)
    }

    /// Registers an already normalized standalone schema.
    pub fn register_editor(&mut self, schema: EntitySchema) -> Result<(), ConfigError> {
        self.claim_names([schema.name.as_str()])?;
        let name = schema.name.clone();
        self.entries
            .insert(name.clone(), Entry::Editor(StandaloneEditor::new(schema)));
        self.link();
        debug!(editor = %name, "Registered entity editor");
        Ok(())
    }

    /// Normalizes and registers an entity collection.
    ///
    /// # Errors
    ///
    /// Returns the normalization error, or [`ConfigError::NameConflict`] if
    /// the collection name or any member schema name is taken.
    pub fn add_collection(&mut self, raw: &mut RawConfig) -> Result<(), ConfigError> {
        let spec = normalize_collection(raw)?;
        self.register_collection(spec)
    }

    /// Registers an already normalized collection.
    pub fn register_collection(&mut self, spec: CollectionSpec) -> Result<(), ConfigError> {
        self.claim_names(
            std::iter::once(spec.name.as_str()).chain(spec.schemas.iter().map(|s| s.name.as_str())),
        )?;
        let name = spec.name.clone();
        for schema in &spec.schemas {
            self.owners.insert(schema.name.clone(), name.clone());
        }
        self.entries
            .insert(name.clone(), Entry::Collection(EntityCollection::new(spec)));
        self.link();
        debug!(collection = %name, "Registered entity collection");
        Ok(())
    }

    fn claim_names<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<(), ConfigError> {
        for name in names {
            if self.is_registered_name(name) {
                return Err(ConfigError::NameConflict(name.to_string()));
            }
        }
        Ok(())
    }

    /// Returns `true` if `name` is a registered editor, collection or member
    /// schema.
    pub fn is_registered_name(&self, name: &str) -> bool {
        self.entries.contains_key(name) || self.owners.contains_key(name)
    }

    /// Looks up a registered entry.
    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    /// Registered entries in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// Registered entry names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Looks up any entity schema: standalone or a collection member.
    pub fn schema(&self, name: &str) -> Option<&EntitySchema> {
        match self.owners.get(name) {
            Some(owner) => self.collection(owner)?.schema(name),
            None => match self.entries.get(name)? {
                Entry::Editor(editor) => Some(editor.schema()),
                Entry::Collection(_) => None,
            },
        }
    }

    /// Iterates over every entity schema in the registry.
    pub fn schemas(&self) -> impl Iterator<Item = &EntitySchema> {
        self.entries
            .values()
            .flat_map(|entry| entry.as_registered().schemas())
    }

    /// Name of the collection owning schema `name`, if any.
    pub fn owner_of(&self, name: &str) -> Option<&str> {
        self.owners.get(name).map(String::as_str)
    }

    /// A fresh record of schema `name` with every property at its default.
    pub fn get_defaults(&self, name: &str) -> Option<Record> {
        self.schema(name).map(|schema| schema.defaults(""))
    }

    /// Finds a record by name in any collection, with pending edits.
    pub fn find_record(&self, name: &str) -> Option<(&str, &Record)> {
        self.entries.values().find_map(|entry| match entry {
            Entry::Collection(collection) => collection
                .get(name)
                .map(|record| (collection.name.as_str(), record)),
            Entry::Editor(_) => None,
        })
    }

    /// Checks a proposed record name.
    ///
    /// The name is trimmed first. It must be non-empty, must not be a
    /// registered schema or collection name, must not already name a record
    /// anywhere, and must not contain `"` or `\`.
    pub fn validate_name(&self, name: &str) -> Result<(), NameError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(NameError::Empty);
        }
        if self.is_registered_name(name) {
            return Err(NameError::Reserved);
        }
        if self.find_record(name).is_some() {
            return Err(NameError::Duplicate);
        }
        if let Some(c) = name.chars().find(|c| RESERVED_NAME_CHARS.contains(c)) {
            return Err(NameError::InvalidCharacter(c));
        }
        Ok(())
    }

    /// Human-readable validity message; empty when the name is acceptable.
    pub fn name_validity_message(&self, name: &str) -> String {
        match self.validate_name(name) {
            Ok(()) => String::new(),
            Err(err) => err.to_string(),
        }
    }

    /// Returns the whole document: every entry's data keyed by name.
    ///
    /// Pending edits are committed first.
    pub fn get_document(&mut self) -> serde_json::Map<String, serde_json::Value> {
        let mut document = serde_json::Map::new();
        for entry in self.entries.values_mut() {
            let (name, data): (String, serde_json::Value) = match entry {
                Entry::Collection(collection) => {
                    collection.commit();
                    (collection.name.clone(), collection.data().into())
                }
                Entry::Editor(editor) => (editor.schema().name.clone(), editor.record().clone().into()),
            };
            document.insert(name, data);
        }
        document
    }

    /// Loads a whole document and clears the undo history.
    ///
    /// Collections load before editors so that standalone references
    /// resolve against the new records. Entries missing from the document
    /// are reset to empty or default; unknown keys are ignored with a
    /// warning.
    pub fn set_document(&mut self, document: &serde_json::Value) {
        let empty = serde_json::Map::new();
        let document = match document {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => &empty,
            other => {
                warn!(found = %other, "Document must be a mapping; loading empty data");
                &empty
            }
        };
        for key in document.keys() {
            if !self.entries.contains_key(key) {
                warn!(key = %key, "Ignoring data for unknown collection or editor");
            }
        }

        let mut collections = Vec::new();
        let mut editors = Vec::new();
        for (name, entry) in &self.entries {
            match entry {
                Entry::Collection(_) => collections.push(name.clone()),
                Entry::Editor(_) => editors.push(name.clone()),
            }
        }

        // Old records must not block names the document moves between
        // collections.
        for name in &collections {
            if let Err(err) = self.deselect_inner(name) {
                warn!(collection = %name, error = %err, "Failed to clear collection");
            }
            if let Some(Entry::Collection(collection)) = self.entries.get_mut(name) {
                collection.records.clear();
            }
        }
        for name in &collections {
            let data = document.get(name).unwrap_or(&serde_json::Value::Null);
            if let Err(err) = self.load_collection(name, data) {
                warn!(collection = %name, error = %err, "Failed to load collection data");
            }
        }
        for name in &editors {
            let data = document.get(name).unwrap_or(&serde_json::Value::Null);
            if let Err(err) = self.load_editor(name, data) {
                warn!(editor = %name, error = %err, "Failed to load editor data");
            }
        }
        self.history.clear();
    }

    /// Loads a whole document from a JSON string; an empty string resets
    /// every entry.
    pub fn set_document_json(&mut self, json: &str) -> serde_json::Result<()> {
        let document = if json.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(json)?
        };
        self.set_document(&document);
        Ok(())
    }

    /// The undo/redo log.
    pub fn history(&self) -> &UndoLog {
        &self.history
    }

    /// Changes how many actions can be undone; zero disables undo.
    pub fn set_undo_limit(&mut self, limit: usize) {
        self.history.set_limit(limit);
    }

    /// Forgets every recorded action.
    pub fn clear_undo_history(&mut self) {
        self.history.clear();
    }

    /// Returns `true` if there is an action to undo.
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Returns `true` if there is an action to redo.
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Reverts the most recent action.
    ///
    /// Returns `false` if there was none, or if it could not be reverted; the
    /// history is then left as it was.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.history.step_back() else {
            return false;
        };
        let result = match &entry {
            UndoEntry::Create {
                collection, index, ..
            } => self.delete_at(collection, Some(*index), false).map(drop),
            UndoEntry::Delete {
                collection,
                record,
                index,
            } => self
                .insert_record(collection, record.clone(), Some(*index), false)
                .map(drop),
            UndoEntry::Rename {
                collection,
                old_name,
                new_name,
            } => self
                .rename_inner(collection, old_name, Some(new_name), false)
                .map(drop),
            UndoEntry::Move {
                collection,
                index,
                direction,
            } => match index.checked_add_signed(*direction) {
                Some(swapped) => self
                    .move_inner(collection, -direction, Some(swapped), false)
                    .map(drop),
                None => Ok(()),
            },
        };
        if let Err(err) = result {
            warn!(collection = %entry.collection(), error = %err, "Failed to undo action");
            self.history.step_forward();
            return false;
        }
        true
    }

    /// Reapplies the most recently undone action.
    ///
    /// Returns `false` if there was none, or if it could not be reapplied;
    /// the history is then left as it was.
    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.history.step_forward() else {
            return false;
        };
        let result = match &entry {
            UndoEntry::Create {
                collection,
                record,
                index,
            } => self
                .insert_record(collection, record.clone(), Some(*index), false)
                .map(drop),
            UndoEntry::Delete {
                collection, index, ..
            } => self.delete_at(collection, Some(*index), false).map(drop),
            UndoEntry::Rename {
                collection,
                old_name,
                new_name,
            } => self
                .rename_inner(collection, new_name, Some(old_name), false)
                .map(drop),
            UndoEntry::Move {
                collection,
                index,
                direction,
            } => self
                .move_inner(collection, *direction, Some(*index), false)
                .map(drop),
        };
        if let Err(err) = result {
            warn!(collection = %entry.collection(), error = %err, "Failed to redo action");
            self.history.step_back();
            return false;
        }
        true
    }
}
