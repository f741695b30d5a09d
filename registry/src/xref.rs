//! Cross-reference tracking between reference properties and their targets.
//!
//! Every reference property names one or more targets: collections (whose
//! record names become selectable options) or entity schemas (which are
//! selectable by their own name). Each collection keeps the list of
//! [`XrefEdge`]s that point at it so that only affected option lists are
//! recomputed when its records change.

use std::collections::HashMap;

use entity_maker_core::{EntitySchema, Record, Value};
use serde::Serialize;
use tracing::debug;

use crate::registry::{Entry, Registry};

/// A reference property, identified by its schema and property names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct XrefEdge {
    /// Name of the schema declaring the property.
    pub schema: String,
    /// Name of the reference property.
    pub property: String,
}

impl XrefEdge {
    /// Creates an edge.
    pub fn new(schema: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            property: property.into(),
        }
    }
}

/// Current selectable options per reference property.
#[derive(Debug, Default)]
pub(crate) struct XrefTracker {
    options: HashMap<XrefEdge, Vec<String>>,
}

impl Registry {
    /// Names currently selectable for a reference property.
    ///
    /// Options list the records of every target collection (in collection
    /// order) followed by the names of targeted schemas, in target order.
    pub fn reference_options(&self, schema: &str, property: &str) -> Option<&[String]> {
        self.xrefs
            .options
            .get(&XrefEdge::new(schema, property))
            .map(Vec::as_slice)
    }

    /// Reference targets that name nothing registered, with the property
    /// that names them. Such targets contribute no options.
    pub fn unresolved_references(&self) -> Vec<(XrefEdge, String)> {
        let mut unresolved = Vec::new();
        for schema in self.schemas() {
            for prop in schema.reference_properties() {
                for target in prop.targets() {
                    if !self.is_registered_name(target) {
                        unresolved.push((XrefEdge::new(&schema.name, &prop.name), target.clone()));
                    }
                }
            }
        }
        unresolved
    }

    /// Rebuilds every collection's edge list and every option list.
    ///
    /// Called on registration, so edges are complete regardless of the order
    /// in which referencing schemas and their targets were registered.
    pub(crate) fn link(&mut self) {
        let edges: Vec<(XrefEdge, Vec<String>)> = self
            .schemas()
            .flat_map(|schema| {
                schema.reference_properties().map(|prop| {
                    (
                        XrefEdge::new(&schema.name, &prop.name),
                        prop.targets().to_vec(),
                    )
                })
            })
            .collect();

        for entry in self.entries.values_mut() {
            if let Entry::Collection(collection) = entry {
                collection.references = edges
                    .iter()
                    .filter(|(_, targets)| targets.contains(&collection.name))
                    .map(|(edge, _)| edge.clone())
                    .collect();
            }
        }

        for (edge, _) in &edges {
            self.recompute_options(edge);
        }
    }

    /// Recomputes the option lists of every property that targets
    /// `collection`.
    pub(crate) fn refresh_references(&mut self, collection: &str) {
        let edges = match self.entries.get(collection) {
            Some(Entry::Collection(target)) => target.references.clone(),
            _ => return,
        };
        for edge in &edges {
            self.recompute_options(edge);
        }
    }

    pub(crate) fn refresh_all_references(&mut self) {
        let edges: Vec<XrefEdge> = self
            .schemas()
            .flat_map(|schema| {
                schema
                    .reference_properties()
                    .map(|prop| XrefEdge::new(&schema.name, &prop.name))
            })
            .collect();
        for edge in &edges {
            self.recompute_options(edge);
        }
    }

    fn recompute_options(&mut self, edge: &XrefEdge) {
        let Some(targets) = self
            .schema(&edge.schema)
            .and_then(|schema| schema.property(&edge.property))
            .map(|prop| prop.targets().to_vec())
        else {
            return;
        };

        let mut options = Vec::new();
        for target in &targets {
            match self.entries.get(target) {
                Some(Entry::Collection(collection)) => {
                    options.extend(collection.records.iter().map(|record| record.name.clone()));
                }
                Some(Entry::Editor(editor)) => options.push(editor.schema.name.clone()),
                None if self.owners.contains_key(target) => options.push(target.clone()),
                None => {
                    debug!(schema = %edge.schema, property = %edge.property, target = %target, "Non-existent reference target");
                }
            }
        }

        self.prune_live_value(edge, &options);
        self.xrefs.options.insert(edge.clone(), options);
    }

    /// Drops names that are no longer selectable from the live record of
    /// `edge.schema`, if there is one.
    fn prune_live_value(&mut self, edge: &XrefEdge, options: &[String]) {
        let owner = self
            .owners
            .get(&edge.schema)
            .cloned()
            .unwrap_or_else(|| edge.schema.clone());
        let record = match self.entries.get_mut(&owner) {
            Some(Entry::Collection(collection)) => match collection.selection.as_mut() {
                Some(sel) if sel.draft.kind == edge.schema => &mut sel.draft,
                _ => return,
            },
            Some(Entry::Editor(editor)) => &mut editor.record,
            None => return,
        };
        let Some(value) = record.fields.get_mut(&edge.property) else {
            return;
        };

        let selectable = |name: &str| options.iter().any(|option| option == name);
        let pruned = match &*value {
            Value::Text(name) if !selectable(name) => Some(Value::Null),
            Value::List(items) => Some(Value::List(
                items
                    .iter()
                    .filter(|item| item.as_str().is_some_and(selectable))
                    .cloned()
                    .collect(),
            )),
            _ => None,
        };
        if let Some(pruned) = pruned {
            *value = pruned;
        }
    }

    /// Rewrites every reference to `old` as `new`, in every record of every
    /// schema, including live drafts and standalone records.
    pub(crate) fn propagate_rename(&mut self, old: &str, new: &str) {
        for entry in self.entries.values_mut() {
            match entry {
                Entry::Collection(collection) => {
                    let schemas = &collection.schemas;
                    let drafts = collection.selection.iter_mut().map(|sel| &mut sel.draft);
                    for record in collection.records.iter_mut().chain(drafts) {
                        if let Some(schema) = schemas.get(&record.kind) {
                            rename_in_record(schema, record, old, new);
                        }
                    }
                }
                Entry::Editor(editor) => rename_in_record(&editor.schema, &mut editor.record, old, new),
            }
        }
    }
}

fn rename_in_record(schema: &EntitySchema, record: &mut Record, old: &str, new: &str) {
    for prop in schema.reference_properties() {
        let Some(value) = record.fields.get_mut(&prop.name) else {
            continue;
        };
        match value {
            Value::List(items) => {
                for item in items.iter_mut().filter(|item| item.as_str() == Some(old)) {
                    *item = Value::from(new);
                }
            }
            single => {
                if single.as_str() == Some(old) {
                    *single = Value::from(new);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: serde_json::Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    fn owner_schema() -> EntitySchema {
        let mut raw = json!({
            "name": "Owner",
            "properties": [
                {"name": "pet", "type": "xref", "targets": "Pets"},
                {"name": "pets", "type": "xref", "targets": ["Pets"], "multiple": true},
                {"name": "nickname", "type": "enum", "values": ["Tom", "Jerry"], "default": "Tom"},
            ],
        });
        entity_maker_core::normalize_entity_schema(raw.as_object_mut().unwrap(), None).unwrap()
    }

    #[test]
    fn test_rename_in_record_touches_only_references() {
        let schema = owner_schema();
        let mut owner = record(json!({
            "name": "Alice",
            "type": "Owner",
            "pet": "Tom",
            "pets": ["Rex", "Tom", "Tom"],
            "nickname": "Tom",
        }));
        rename_in_record(&schema, &mut owner, "Tom", "Thomas");
        assert_eq!(owner.get("pet"), Some(&Value::from("Thomas")));
        assert_eq!(
            owner.get("pets"),
            Some(&Value::List(vec!["Rex".into(), "Thomas".into(), "Thomas".into()]))
        );
        assert_eq!(owner.get("nickname"), Some(&Value::from("Tom")));
    }

    #[test]
    fn test_edges_order_by_schema_then_property() {
        let mut edges = vec![XrefEdge::new("Owner", "pets"), XrefEdge::new("Owner", "pet")];
        edges.sort();
        assert_eq!(edges[0].property, "pet");
    }
}
