//! Standalone entity editors and live field edits.
//!
//! A [`StandaloneEditor`] is an entity schema registered without a
//! collection. It always holds exactly one live record, which appears in the
//! serialized document under the schema's name.

use entity_maker_core::{CodecError, EntitySchema, PropertyType, Record, Value, decode_field};
use tracing::warn;

use crate::collection::decode_fields;
use crate::error::EditError;
use crate::registry::{Entry, Registered, Registry};

/// A schema registered on its own, holding a single record.
#[derive(Debug, Clone)]
pub struct StandaloneEditor {
    pub(crate) schema: EntitySchema,
    pub(crate) record: Record,
}

impl StandaloneEditor {
    pub(crate) fn new(schema: EntitySchema) -> Self {
        let record = schema.defaults("");
        Self { schema, record }
    }

    /// The edited schema.
    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    /// The live record.
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Editor heading: `Edit <title>`, followed by the record name if it
    /// has one.
    pub fn heading(&self) -> String {
        if self.record.name.is_empty() {
            format!("Edit {}", self.schema.title)
        } else {
            format!("Edit {}: {}", self.schema.title, self.record.name)
        }
    }

    fn load(&mut self, data: &serde_json::Value) {
        self.record = match data {
            serde_json::Value::Object(map) => {
                let name = map
                    .get("name")
                    .and_then(|name| name.as_str())
                    .unwrap_or_default()
                    .to_string();
                decode_fields(&self.schema, name, map)
            }
            serde_json::Value::Null => self.schema.defaults(""),
            other => {
                warn!(editor = %self.schema.name, found = %other, "Editor data must be a mapping; using defaults");
                self.schema.defaults("")
            }
        };
    }
}

impl Registered for StandaloneEditor {
    fn name(&self) -> &str {
        &self.schema.name
    }

    fn title(&self) -> &str {
        &self.schema.title
    }

    fn description(&self) -> Option<&str> {
        self.schema.description.as_deref()
    }

    fn schemas(&self) -> Vec<&EntitySchema> {
        vec![&self.schema]
    }
}

/// The record an edit applies to: a standalone editor's record or a
/// collection's selected draft.
pub(crate) struct LiveRecord<'a> {
    pub(crate) schema: &'a EntitySchema,
    pub(crate) record: &'a mut Record,
    pub(crate) in_collection: bool,
}

impl Registry {
    /// Returns the named standalone editor.
    pub fn editor(&self, name: &str) -> Option<&StandaloneEditor> {
        match self.entries.get(name) {
            Some(Entry::Editor(editor)) => Some(editor),
            _ => None,
        }
    }

    /// Returns a copy of a standalone editor's record.
    pub fn editor_data(&self, name: &str) -> Result<Record, EditError> {
        match self.entries.get(name) {
            Some(Entry::Editor(editor)) => Ok(editor.record.clone()),
            _ => Err(EditError::UnknownEntry(name.to_string())),
        }
    }

    /// Replaces a standalone editor's record.
    ///
    /// Missing properties take their defaults; `null` resets the editor.
    pub fn set_editor_data(&mut self, name: &str, data: &serde_json::Value) -> Result<(), EditError> {
        self.load_editor(name, data)
    }

    pub(crate) fn load_editor(&mut self, name: &str, data: &serde_json::Value) -> Result<(), EditError> {
        match self.entries.get_mut(name) {
            Some(Entry::Editor(editor)) => {
                editor.load(data);
                Ok(())
            }
            _ => Err(EditError::UnknownEntry(name.to_string())),
        }
    }

    /// Edits one field of the live record of `owner`.
    ///
    /// `owner` is a standalone editor, or a collection with a selection.
    /// The value is typecast for the property; reference values must name
    /// currently selectable targets. Collection `change` listeners fire on
    /// success.
    ///
    /// # Errors
    ///
    /// Unknown properties and values that fail to typecast are rejected and
    /// the record is left unchanged.
    pub fn set_field(&mut self, owner: &str, property: &str, raw: Value) -> Result<(), EditError> {
        let live = self.live_record(owner)?;
        let schema = live.schema.name.clone();
        let prop = live
            .schema
            .property(property)
            .ok_or_else(|| EditError::UnknownProperty {
                schema: schema.clone(),
                property: property.to_string(),
            })?;
        let invalid = |source| EditError::InvalidValue {
            property: property.to_string(),
            source,
        };
        let value = decode_field(prop, &raw).map_err(invalid)?;

        if prop.property_type() == PropertyType::Reference {
            let options = self.reference_options(&schema, property).unwrap_or_default();
            let names = match &value {
                Value::List(items) => items.iter().filter_map(Value::as_str).collect(),
                Value::Text(name) => vec![name.as_str()],
                _ => Vec::new(),
            };
            if let Some(missing) = names.into_iter().find(|name| !options.iter().any(|o| o == name)) {
                return Err(invalid(CodecError::NotAMember(missing.to_string())));
            }
        }

        let live = self.live_record(owner)?;
        live.record.set(property, value);
        if live.in_collection {
            self.notify_change(owner);
        }
        Ok(())
    }

    pub(crate) fn live_view(&self, owner: &str) -> Result<(&EntitySchema, &Record), EditError> {
        match self.entries.get(owner) {
            Some(Entry::Editor(editor)) => Ok((&editor.schema, &editor.record)),
            Some(Entry::Collection(collection)) => {
                let record = collection.selected().ok_or(EditError::NothingSelected)?;
                let schema = collection.schema(&record.kind).ok_or_else(|| EditError::UnknownSchema {
                    collection: owner.to_string(),
                    schema: record.kind.clone(),
                })?;
                Ok((schema, record))
            }
            None => Err(EditError::UnknownEntry(owner.to_string())),
        }
    }

    pub(crate) fn live_record(&mut self, owner: &str) -> Result<LiveRecord<'_>, EditError> {
        match self.entries.get_mut(owner) {
            Some(Entry::Editor(editor)) => Ok(LiveRecord {
                schema: &editor.schema,
                record: &mut editor.record,
                in_collection: false,
            }),
            Some(Entry::Collection(collection)) => {
                let sel = collection
                    .selection
                    .as_mut()
                    .ok_or(EditError::NothingSelected)?;
                let schema = collection.schemas.get(&sel.draft.kind).ok_or_else(|| {
                    EditError::UnknownSchema {
                        collection: owner.to_string(),
                        schema: sel.draft.kind.clone(),
                    }
                })?;
                Ok(LiveRecord {
                    schema,
                    record: &mut sel.draft,
                    in_collection: true,
                })
            }
            None => Err(EditError::UnknownEntry(owner.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use entity_maker_core::normalize_entity_schema;
    use serde_json::json;

    use super::*;

    fn settings() -> StandaloneEditor {
        let mut raw = json!({
            "name": "Settings",
            "title": "simulation settings",
            "properties": [
                {"name": "dt", "type": "float", "default": 0.1},
                {"name": "steps", "type": "int", "default": 100},
            ],
        });
        StandaloneEditor::new(normalize_entity_schema(raw.as_object_mut().unwrap(), None).unwrap())
    }

    #[test]
    fn test_new_editor_holds_defaults() {
        let editor = settings();
        assert_eq!(editor.record().get("steps"), Some(&Value::Int(100)));
        assert_eq!(editor.record().kind, "Settings");
    }

    #[test]
    fn test_load_fills_missing_with_defaults() {
        let mut editor = settings();
        editor.load(&json!({"steps": "250.4", "seed": 7}));
        assert_eq!(editor.record().get("steps"), Some(&Value::Int(250)));
        assert_eq!(editor.record().get("dt"), Some(&Value::Float(0.1)));
        assert_eq!(editor.record().get("seed"), Some(&Value::Int(7)));

        editor.load(&serde_json::Value::Null);
        assert_eq!(editor.record().get("steps"), Some(&Value::Int(100)));
        assert_eq!(editor.record().get("seed"), None);
    }

    #[test]
    fn test_heading_includes_name() {
        let mut editor = settings();
        assert_eq!(editor.heading(), "Edit Simulation Settings");
        editor.load(&json!({"name": "fast"}));
        assert_eq!(editor.heading(), "Edit Simulation Settings: fast");
    }
}
