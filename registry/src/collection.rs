//! Entity collections: ordered, named records of one or more entity types.
//!
//! An [`EntityCollection`] holds committed records plus at most one
//! selection. The selected record is edited through a draft copy which is
//! written back ("committed") on deselection and whenever the collection's
//! data is read.
//!
//! Editing operations live on [`Registry`] because names are unique across
//! the whole registry and renames propagate into every collection.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use entity_maker_core::{
    CollectionData, CollectionSpec, EntitySchema, Record, Value, decode_field,
};
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::EditError;
use crate::hooks::{CollectionListener, ListenerId, Listeners};
use crate::history::UndoEntry;
use crate::registry::{Entry, Registered, Registry};
use crate::xref::XrefEdge;

/// Comparator for [`SortPolicy::Custom`].
pub type Comparator = Arc<dyn Fn(&Record, &Record) -> Ordering + Send + Sync>;

/// How a collection orders its records.
#[derive(Clone, Default)]
pub enum SortPolicy {
    /// Insertion order; records can be moved by hand.
    #[default]
    Insertion,
    /// Sorted by name. Serializes as a name-keyed mapping.
    ByName,
    /// Sorted by a caller-supplied comparator. Serializes as an array.
    Custom(Comparator),
}

impl SortPolicy {
    /// Wraps a comparator closure.
    pub fn custom(cmp: impl Fn(&Record, &Record) -> Ordering + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(cmp))
    }

    /// Returns `true` for the sorted policies.
    pub fn is_sorted(&self) -> bool {
        !matches!(self, Self::Insertion)
    }

    fn sort(&self, records: &mut [Record]) {
        match self {
            Self::Insertion => {}
            Self::ByName => records.sort_by(|a, b| a.name.cmp(&b.name)),
            Self::Custom(cmp) => records.sort_by(|a, b| cmp(a, b)),
        }
    }
}

impl fmt::Debug for SortPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insertion => f.write_str("Insertion"),
            Self::ByName => f.write_str("ByName"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Selection {
    pub(crate) index: usize,
    pub(crate) draft: Record,
}

/// A named, ordered collection of entity records.
#[derive(Debug)]
pub struct EntityCollection {
    pub(crate) name: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) schemas: IndexMap<String, EntitySchema>,
    pub(crate) sort: SortPolicy,
    pub(crate) records: Vec<Record>,
    pub(crate) selection: Option<Selection>,
    /// Reference properties (anywhere in the registry) that target this
    /// collection.
    pub(crate) references: Vec<XrefEdge>,
    pub(crate) listeners: Listeners,
}

impl EntityCollection {
    pub(crate) fn new(spec: CollectionSpec) -> Self {
        let sort = if spec.keep_sorted {
            SortPolicy::ByName
        } else {
            SortPolicy::Insertion
        };
        Self {
            name: spec.name,
            title: spec.title,
            description: spec.description,
            schemas: spec
                .schemas
                .into_iter()
                .map(|schema| (schema.name.clone(), schema))
                .collect(),
            sort,
            records: Vec::new(),
            selection: None,
            references: Vec::new(),
            listeners: Listeners::default(),
        }
    }

    /// Looks up a member schema.
    pub fn schema(&self, name: &str) -> Option<&EntitySchema> {
        self.schemas.get(name)
    }

    /// The ordering policy.
    pub fn sort_policy(&self) -> &SortPolicy {
        &self.sort
    }

    /// Returns `true` if records are kept sorted and cannot be moved.
    pub fn is_sorted(&self) -> bool {
        self.sort.is_sorted()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the collection has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Committed records, in collection order.
    ///
    /// Pending edits to the selected record are not included; see
    /// [`record`](Self::record) for the live view.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Returns the record at `index`, including pending edits if it is the
    /// selection.
    pub fn record(&self, index: usize) -> Option<&Record> {
        match &self.selection {
            Some(sel) if sel.index == index => Some(&sel.draft),
            _ => self.records.get(index),
        }
    }

    /// Returns the record named `name`, including pending edits.
    pub fn get(&self, name: &str) -> Option<&Record> {
        self.index_of(name).and_then(|index| self.record(index))
    }

    /// Position of the record named `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.records.iter().position(|record| record.name == name)
    }

    /// Index of the selected record.
    pub fn selected_index(&self) -> Option<usize> {
        self.selection.as_ref().map(|sel| sel.index)
    }

    /// The selected record, with pending edits.
    pub fn selected(&self) -> Option<&Record> {
        self.selection.as_ref().map(|sel| &sel.draft)
    }

    /// Name of the selected record.
    pub fn selected_name(&self) -> Option<&str> {
        self.selected().map(|record| record.name.as_str())
    }

    /// Reference properties, anywhere in the registry, that can point at
    /// this collection's records.
    pub fn references(&self) -> &[XrefEdge] {
        &self.references
    }

    /// Returns `true` if `name` is a record of this collection.
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub(crate) fn commit(&mut self) {
        if let Some(sel) = &self.selection {
            if let Some(slot) = self.records.get_mut(sel.index) {
                *slot = sel.draft.clone();
            }
        }
    }

    pub(crate) fn sort_records(&mut self) {
        let selected = self
            .selection
            .as_ref()
            .map(|sel| sel.draft.name.clone());
        self.sort.sort(&mut self.records);
        if let (Some(sel), Some(name)) = (self.selection.as_mut(), selected) {
            if let Some(index) = self.records.iter().position(|r| r.name == name) {
                sel.index = index;
            }
        }
    }

    /// Serialized form of the committed records.
    pub(crate) fn data(&self) -> CollectionData {
        match self.sort {
            SortPolicy::ByName => CollectionData::Keyed(
                self.records
                    .iter()
                    .map(|record| (record.name.clone(), record.clone()))
                    .collect::<BTreeMap<_, _>>(),
            ),
            _ => CollectionData::List(self.records.clone()),
        }
    }

    /// Decodes externally supplied records, dropping malformed ones with a
    /// warning.
    pub(crate) fn decode_records(&self, data: &serde_json::Value) -> Vec<Record> {
        let items: Vec<(Option<&str>, &serde_json::Value)> = match data {
            serde_json::Value::Array(items) => items.iter().map(|item| (None, item)).collect(),
            serde_json::Value::Object(items) => items
                .iter()
                .map(|(key, item)| (Some(key.as_str()), item))
                .collect(),
            serde_json::Value::Null => Vec::new(),
            other => {
                warn!(collection = %self.name, found = %other, "Collection data must be a list or a mapping");
                Vec::new()
            }
        };

        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(items.len());
        for (key, item) in items {
            let Some(record) = self.decode_record(key, item) else {
                continue;
            };
            if !seen.insert(record.name.clone()) {
                warn!(collection = %self.name, entity = %record.name, "Dropping entity with duplicate name");
                continue;
            }
            records.push(record);
        }
        records
    }

    fn decode_record(&self, key: Option<&str>, item: &serde_json::Value) -> Option<Record> {
        let serde_json::Value::Object(map) = item else {
            warn!(collection = %self.name, "Dropping entity that is not a mapping");
            return None;
        };

        let name = match (map.get("name"), key) {
            (Some(serde_json::Value::String(name)), _) if !name.is_empty() => name.clone(),
            (None, Some(key)) if !key.is_empty() => key.to_string(),
            _ => {
                warn!(collection = %self.name, "Dropping entity with missing attribute \"name\"");
                return None;
            }
        };
        if key.is_some_and(|key| key != name) {
            warn!(collection = %self.name, entity = %name, key = ?key, "Dropping entity whose name does not match its key");
            return None;
        }

        let schema = match map.get("type") {
            Some(serde_json::Value::String(kind)) => match self.schemas.get(kind) {
                Some(schema) => schema,
                None => {
                    warn!(
                        collection = %self.name,
                        entity = %name,
                        found = %kind,
                        expected = ?self.schemas.keys().collect::<Vec<_>>(),
                        "Dropping entity with invalid type"
                    );
                    return None;
                }
            },
            None if self.schemas.len() == 1 => &self.schemas[0],
            _ => {
                warn!(collection = %self.name, entity = %name, "Dropping entity with missing attribute \"type\"");
                return None;
            }
        };

        Some(decode_fields(schema, name, map))
    }
}

/// Builds a record of `schema` from a JSON mapping.
///
/// Properties that are missing or fail to typecast take their defaults.
/// Fields the schema does not describe are carried through unchanged.
pub(crate) fn decode_fields(
    schema: &EntitySchema,
    name: String,
    map: &serde_json::Map<String, serde_json::Value>,
) -> Record {
    let mut record = schema.defaults(&name);
    for (field, raw) in map {
        if field == "name" || field == "type" {
            continue;
        }
        let raw = Value::from(raw.clone());
        match schema.property(field) {
            Some(prop) => match decode_field(prop, &raw) {
                Ok(value) => record.set(field.clone(), value),
                Err(err) => {
                    warn!(entity = %name, schema = %schema.name, property = %field, error = %err, "Using default for invalid value");
                }
            },
            None => record.set(field.clone(), raw),
        }
    }
    record
}

impl Registered for EntityCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn schemas(&self) -> Vec<&EntitySchema> {
        self.schemas.values().collect()
    }
}

impl Registry {
    /// Returns the named collection.
    pub fn collection(&self, name: &str) -> Option<&EntityCollection> {
        match self.entries.get(name) {
            Some(Entry::Collection(collection)) => Some(collection),
            _ => None,
        }
    }

    pub(crate) fn collection_mut(&mut self, name: &str) -> Result<&mut EntityCollection, EditError> {
        match self.entries.get_mut(name) {
            Some(Entry::Collection(collection)) => Ok(collection),
            Some(Entry::Editor(_)) => Err(EditError::NotACollection(name.to_string())),
            None => Err(EditError::UnknownEntry(name.to_string())),
        }
    }

    fn collection_ref(&self, name: &str) -> Result<&EntityCollection, EditError> {
        match self.entries.get(name) {
            Some(Entry::Collection(collection)) => Ok(collection),
            Some(Entry::Editor(_)) => Err(EditError::NotACollection(name.to_string())),
            None => Err(EditError::UnknownEntry(name.to_string())),
        }
    }

    /// Creates a record of type `schema` with default values and selects it.
    ///
    /// Returns the new record's index.
    ///
    /// # Errors
    ///
    /// Fails with [`EditError::Name`] if the trimmed name is not valid, or if
    /// the collection or schema is unknown. The model is unchanged on error.
    pub fn create(&mut self, collection: &str, schema: &str, name: &str) -> Result<usize, EditError> {
        let name = name.trim();
        let record = {
            let target = self.collection_ref(collection)?;
            let schema = target
                .schema(schema)
                .ok_or_else(|| EditError::UnknownSchema {
                    collection: collection.to_string(),
                    schema: schema.to_string(),
                })?;
            self.validate_name(name)?;
            schema.defaults(name)
        };
        self.insert_record(collection, record, None, true)
    }

    /// Copies the selected record under a new name and selects the copy.
    ///
    /// # Errors
    ///
    /// Fails with [`EditError::NothingSelected`] or [`EditError::Name`]; the
    /// model is unchanged on error.
    pub fn duplicate(&mut self, collection: &str, name: &str) -> Result<usize, EditError> {
        let name = name.trim();
        if self.collection_ref(collection)?.selection.is_none() {
            return Err(EditError::NothingSelected);
        }
        self.validate_name(name)?;
        let mut copy = self
            .deselect_inner(collection)?
            .ok_or(EditError::NothingSelected)?;
        copy.name = name.to_string();
        self.insert_record(collection, copy, None, true)
    }

    /// Deletes the record at `index`, or the selected record.
    ///
    /// Returns the removed record.
    pub fn delete(&mut self, collection: &str, index: Option<usize>) -> Result<Record, EditError> {
        self.delete_at(collection, index, true)
    }

    /// Renames the record named `old_name`, or the selected record, and
    /// selects it.
    ///
    /// Every reference to the old name in the registry is rewritten. Returns
    /// `false` if the name is unchanged.
    ///
    /// # Errors
    ///
    /// Fails if the new name is invalid or the record does not exist. The
    /// model is unchanged on error.
    pub fn rename(
        &mut self,
        collection: &str,
        new_name: &str,
        old_name: Option<&str>,
    ) -> Result<bool, EditError> {
        self.rename_inner(collection, new_name, old_name, true)
    }

    /// Swaps the record at `index` (or the selected record) with its
    /// neighbour at `index + direction`, leaving it selected.
    ///
    /// Returns `false` if the swap would leave the collection bounds.
    ///
    /// # Errors
    ///
    /// Sorted collections reject moves with [`EditError::SortedCollection`].
    pub fn move_record(
        &mut self,
        collection: &str,
        direction: isize,
        index: Option<usize>,
    ) -> Result<bool, EditError> {
        self.move_inner(collection, direction, index, true)
    }

    /// Selects the record at `index`.
    ///
    /// Selecting the current selection does nothing. Any other selection is
    /// committed first, so an out-of-range index leaves nothing selected.
    pub fn select(&mut self, collection: &str, index: usize) -> Result<(), EditError> {
        let target = self.collection_mut(collection)?;
        if target.selected_index() == Some(index) {
            return Ok(());
        }
        self.deselect_inner(collection)?;

        let target = self.collection_mut(collection)?;
        let Some(record) = target.records.get(index) else {
            return Err(EditError::IndexOutOfRange {
                index,
                len: target.records.len(),
            });
        };
        let draft = record.clone();
        target.selection = Some(Selection {
            index,
            draft: draft.clone(),
        });
        target.listeners.emit(|l| l.on_select(&draft, index));
        Ok(())
    }

    /// Selects the record named `name`.
    pub fn select_name(&mut self, collection: &str, name: &str) -> Result<(), EditError> {
        let index = self
            .collection_ref(collection)?
            .index_of(name)
            .ok_or_else(|| EditError::UnknownEntity(name.to_string()))?;
        self.select(collection, index)
    }

    /// Commits and clears the selection, returning the committed record.
    pub fn deselect(&mut self, collection: &str) -> Result<Option<Record>, EditError> {
        self.deselect_inner(collection)
    }

    /// Returns the collection's data with pending edits committed.
    ///
    /// Collections sorted by name produce a name-keyed mapping, all others an
    /// ordered list. The selection is kept.
    pub fn get_data(&mut self, collection: &str) -> Result<CollectionData, EditError> {
        let target = self.collection_mut(collection)?;
        target.commit();
        Ok(target.data())
    }

    /// Replaces the collection's records, clearing the selection and the
    /// undo history.
    ///
    /// Accepts a list of records or a mapping of name to record. Records
    /// with a missing name or an unknown type are dropped with a warning;
    /// the `type` may be omitted when the collection has one entity type.
    /// Returns the number of records loaded.
    pub fn set_data(&mut self, collection: &str, data: &serde_json::Value) -> Result<usize, EditError> {
        let loaded = self.load_collection(collection, data)?;
        self.history.clear();
        Ok(loaded)
    }

    /// Changes how the collection orders its records and re-sorts it.
    ///
    /// Recorded actions refer to record positions, so the undo history is
    /// cleared.
    pub fn set_sort_policy(&mut self, collection: &str, sort: SortPolicy) -> Result<(), EditError> {
        self.deselect_inner(collection)?;
        let target = self.collection_mut(collection)?;
        target.sort = sort;
        target.sort_records();
        self.refresh_references(collection);
        self.history.clear();
        Ok(())
    }

    /// Registers a listener on the collection.
    pub fn add_listener(
        &mut self,
        collection: &str,
        listener: Box<dyn CollectionListener>,
    ) -> Result<ListenerId, EditError> {
        Ok(self.collection_mut(collection)?.listeners.register(listener))
    }

    /// Unregisters a listener; returns `false` if it was not registered.
    pub fn remove_listener(&mut self, collection: &str, id: ListenerId) -> Result<bool, EditError> {
        Ok(self.collection_mut(collection)?.listeners.unregister(id))
    }

    pub(crate) fn load_collection(
        &mut self,
        collection: &str,
        data: &serde_json::Value,
    ) -> Result<usize, EditError> {
        self.deselect_inner(collection)?;
        let target = self.collection_mut(collection)?;
        let mut records = target.decode_records(data);
        let reserved: Vec<String> = records
            .iter()
            .filter(|record| self.is_registered_name(&record.name))
            .map(|record| record.name.clone())
            .collect();
        if !reserved.is_empty() {
            warn!(collection, entities = ?reserved, "Dropping entities named after a schema or collection");
            records.retain(|record| !reserved.contains(&record.name));
        }
        let taken: Vec<String> = records
            .iter()
            .filter(|record| self.owning_collection(&record.name, collection).is_some())
            .map(|record| record.name.clone())
            .collect();
        if !taken.is_empty() {
            warn!(collection, entities = ?taken, "Dropping entities whose names are used in another collection");
            records.retain(|record| !taken.contains(&record.name));
        }

        let target = self.collection_mut(collection)?;
        target.records = records;
        target.sort_records();
        let loaded = target.records.len();
        let snapshot = target.records.clone();
        target.listeners.emit(|l| l.on_set_data(&snapshot));
        debug!(collection, loaded, "Loaded collection data");

        self.refresh_references(collection);
        Ok(loaded)
    }

    /// Name of the collection other than `except` holding a record named
    /// `name`.
    fn owning_collection(&self, name: &str, except: &str) -> Option<&str> {
        self.entries.iter().find_map(|(key, entry)| match entry {
            Entry::Collection(other) if key != except && other.contains(name) => Some(key.as_str()),
            _ => None,
        })
    }

    pub(crate) fn deselect_inner(&mut self, collection: &str) -> Result<Option<Record>, EditError> {
        let target = self.collection_mut(collection)?;
        target.commit();
        let Some(sel) = target.selection.take() else {
            return Ok(None);
        };
        let record = sel.draft;
        target.listeners.emit(|l| l.on_deselect(&record, sel.index));
        Ok(Some(record))
    }

    pub(crate) fn insert_record(
        &mut self,
        collection: &str,
        record: Record,
        at: Option<usize>,
        record_history: bool,
    ) -> Result<usize, EditError> {
        self.deselect_inner(collection)?;
        let target = self.collection_mut(collection)?;
        let name = record.name.clone();
        match at {
            Some(at) => target.records.insert(at.min(target.records.len()), record),
            None => target.records.push(record),
        }
        target.sort_records();
        let index = target.index_of(&name).unwrap_or(0);
        let snapshot = target.records[index].clone();

        self.refresh_references(collection);
        if record_history {
            self.history.record(UndoEntry::Create {
                collection: collection.to_string(),
                record: snapshot.clone(),
                index,
            });
        }
        debug!(collection, entity = %name, index, "Created entity");

        let target = self.collection_mut(collection)?;
        target.listeners.emit(|l| l.on_create(&snapshot, index));
        self.select(collection, index)?;
        Ok(index)
    }

    pub(crate) fn delete_at(
        &mut self,
        collection: &str,
        index: Option<usize>,
        record_history: bool,
    ) -> Result<Record, EditError> {
        let target = self.collection_ref(collection)?;
        let index = match index {
            Some(index) => index,
            None => target.selected_index().ok_or(EditError::NothingSelected)?,
        };
        if index >= target.len() {
            return Err(EditError::IndexOutOfRange {
                index,
                len: target.len(),
            });
        }

        self.deselect_inner(collection)?;
        let target = self.collection_mut(collection)?;
        let record = target.records.remove(index);

        self.refresh_references(collection);
        if record_history {
            self.history.record(UndoEntry::Delete {
                collection: collection.to_string(),
                record: record.clone(),
                index,
            });
        }
        debug!(collection, entity = %record.name, index, "Deleted entity");

        let target = self.collection_mut(collection)?;
        target.listeners.emit(|l| l.on_delete(&record, index));
        Ok(record)
    }

    pub(crate) fn rename_inner(
        &mut self,
        collection: &str,
        new_name: &str,
        old_name: Option<&str>,
        record_history: bool,
    ) -> Result<bool, EditError> {
        let new_name = new_name.trim();
        let target = self.collection_ref(collection)?;
        let (old_index, old_name) = match old_name {
            Some(old_name) => (
                target
                    .index_of(old_name)
                    .ok_or_else(|| EditError::UnknownEntity(old_name.to_string()))?,
                old_name.to_string(),
            ),
            None => {
                let sel = target.selection.as_ref().ok_or(EditError::NothingSelected)?;
                (sel.index, sel.draft.name.clone())
            }
        };
        if new_name == old_name {
            return Ok(false);
        }
        self.validate_name(new_name)?;

        self.deselect_inner(collection)?;
        let target = self.collection_mut(collection)?;
        target.records[old_index].name = new_name.to_string();
        target.sort_records();
        let new_index = target.index_of(new_name).unwrap_or(old_index);

        self.propagate_rename(&old_name, new_name);
        self.refresh_all_references();
        if record_history {
            self.history.record(UndoEntry::Rename {
                collection: collection.to_string(),
                old_name: old_name.clone(),
                new_name: new_name.to_string(),
            });
        }
        debug!(collection, old_name = %old_name, new_name, "Renamed entity");

        let target = self.collection_mut(collection)?;
        target
            .listeners
            .emit(|l| l.on_rename(&old_name, new_name, old_index, new_index));
        self.select(collection, new_index)?;
        Ok(true)
    }

    pub(crate) fn move_inner(
        &mut self,
        collection: &str,
        direction: isize,
        index: Option<usize>,
        record_history: bool,
    ) -> Result<bool, EditError> {
        let target = self.collection_ref(collection)?;
        if target.is_sorted() {
            return Err(EditError::SortedCollection(collection.to_string()));
        }
        let index = match index {
            Some(index) => {
                self.select(collection, index)?;
                index
            }
            None => target.selected_index().ok_or(EditError::NothingSelected)?,
        };

        let target = self.collection_mut(collection)?;
        let swap = match index.checked_add_signed(direction) {
            Some(swap) if swap < target.records.len() => swap,
            _ => return Ok(false),
        };
        target.records.swap(index, swap);
        if let Some(sel) = target.selection.as_mut() {
            sel.index = swap;
        }

        self.refresh_references(collection);
        if record_history {
            self.history.record(UndoEntry::Move {
                collection: collection.to_string(),
                index,
                direction,
            });
        }

        let target = self.collection_mut(collection)?;
        target.listeners.emit(|l| l.on_move(index, swap));
        Ok(true)
    }

    pub(crate) fn notify_change(&mut self, collection: &str) {
        if let Ok(target) = self.collection_mut(collection) {
            if let Some(sel) = &target.selection {
                let (record, index) = (sel.draft.clone(), sel.index);
                target.listeners.emit(|l| l.on_change(&record, index));
            }
        }
    }
}
