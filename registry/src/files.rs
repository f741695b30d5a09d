//! Asynchronous loading of `file` property contents.
//!
//! Selecting files installs `[filename, null]` placeholders in the live
//! record and hands out one [`FileSelection`] token per file. Whoever reads
//! the file (see [`FileTransport`]) sends a [`FileLoaded`] completion on the
//! registry's channel; [`Registry::pump_file_events`] applies completions in
//! arrival order. A completion is stale, and ignored, when the field has been
//! re-selected since, when a different record is now live, or when the
//! placeholder has already been filled or replaced.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};

use entity_maker_core::{PropertyKind, Value, file_loaded, file_name};
use tracing::{debug, warn};

use crate::error::EditError;
use crate::registry::Registry;

/// A file property of a standalone editor, or of a collection's selected
/// record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    /// Editor or collection name.
    pub owner: String,
    /// File property name.
    pub property: String,
}

impl FieldRef {
    /// Creates a field reference.
    pub fn new(owner: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            property: property.into(),
        }
    }
}

/// Token for one selected file, echoed back in its completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSelection {
    /// The field the file was selected for.
    pub field: FieldRef,
    /// Name of the live record at selection time.
    pub record: String,
    /// Selection generation of the field.
    pub generation: u64,
    /// Position of the file within the selection.
    pub index: usize,
    /// File name as installed in the placeholder.
    pub file_name: String,
}

/// A finished (or failed) file read.
#[derive(Debug, Clone)]
pub struct FileLoaded {
    /// The selection this completes.
    pub selection: FileSelection,
    /// Encoded file content, or the reason reading failed.
    pub content: Result<String, String>,
}

/// Reads selected files and reports completions on a channel.
pub trait FileTransport {
    /// Starts reading `path` for `selection`; the completion goes to `reply`.
    fn load(&self, selection: FileSelection, path: PathBuf, reply: Sender<FileLoaded>);
}

/// Reads each file on its own thread.
///
/// File bytes are turned into content by `encode`; the default decodes them
/// as (lossy) UTF-8 text.
#[derive(Debug, Clone, Copy)]
pub struct ThreadFileTransport {
    encode: fn(&[u8]) -> String,
}

impl ThreadFileTransport {
    /// Uses a custom content encoding.
    pub fn with_encoding(encode: fn(&[u8]) -> String) -> Self {
        Self { encode }
    }
}

impl Default for ThreadFileTransport {
    fn default() -> Self {
        Self {
            encode: |bytes| String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

impl FileTransport for ThreadFileTransport {
    fn load(&self, selection: FileSelection, path: PathBuf, reply: Sender<FileLoaded>) {
        let encode = self.encode;
        std::thread::spawn(move || {
            let content = std::fs::read(&path)
                .map(|bytes| encode(&bytes))
                .map_err(|e| format!("{}: {e}", path.display()));
            // The registry may be gone; nothing to report to then.
            let _ = reply.send(FileLoaded { selection, content });
        });
    }
}

/// Per-field selection generations and the completion channel.
#[derive(Debug)]
pub(crate) struct FileTracker {
    next_generation: u64,
    current: HashMap<FieldRef, u64>,
    sender: Sender<FileLoaded>,
    receiver: Receiver<FileLoaded>,
}

impl Default for FileTracker {
    fn default() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            next_generation: 0,
            current: HashMap::new(),
            sender,
            receiver,
        }
    }
}

impl Registry {
    /// Installs placeholders for newly selected files and returns a token
    /// per file.
    ///
    /// Single-file properties keep only the first name; an empty selection
    /// clears the field. Any earlier selection on the field becomes stale.
    ///
    /// # Errors
    ///
    /// Fails if the field has no live record or is not a file property.
    pub fn select_files<S: AsRef<str>>(
        &mut self,
        field: &FieldRef,
        names: &[S],
    ) -> Result<Vec<FileSelection>, EditError> {
        let live = self.live_record(&field.owner)?;
        let multiple = match live.schema.property(&field.property).map(|p| &p.kind) {
            Some(PropertyKind::File { multiple, .. }) => *multiple,
            Some(_) => return Err(EditError::NotAFileProperty(field.property.clone())),
            None => {
                return Err(EditError::UnknownProperty {
                    schema: live.schema.name.clone(),
                    property: field.property.clone(),
                });
            }
        };
        let keep = if multiple { names.len() } else { names.len().min(1) };
        let names: Vec<&str> = names.iter().take(keep).map(|name| name.as_ref()).collect();

        let value = if multiple {
            Value::List(names.iter().map(|name| Value::file(*name, None)).collect())
        } else {
            names
                .first()
                .map(|name| Value::file(*name, None))
                .unwrap_or(Value::Null)
        };
        let record = live.record.name.clone();
        live.record.set(field.property.clone(), value);
        let in_collection = live.in_collection;

        self.files.next_generation += 1;
        let generation = self.files.next_generation;
        self.files.current.insert(field.clone(), generation);
        debug!(owner = %field.owner, property = %field.property, files = names.len(), generation, "Selected files");
        if in_collection {
            self.notify_change(&field.owner);
        }

        Ok(names
            .into_iter()
            .enumerate()
            .map(|(index, name)| FileSelection {
                field: field.clone(),
                record: record.clone(),
                generation,
                index,
                file_name: name.to_string(),
            })
            .collect())
    }

    /// Selects files by path and starts loading them through `transport`.
    ///
    /// Returns the number of files being loaded.
    pub fn load_files(
        &mut self,
        field: &FieldRef,
        paths: &[PathBuf],
        transport: &dyn FileTransport,
    ) -> Result<usize, EditError> {
        let names: Vec<String> = paths.iter().map(|path| display_name(path)).collect();
        let selections = self.select_files(field, &names)?;
        let count = selections.len();
        for (selection, path) in selections.into_iter().zip(paths) {
            transport.load(selection, path.clone(), self.file_sender());
        }
        Ok(count)
    }

    /// A sender for file completions; may be moved to any thread.
    pub fn file_sender(&self) -> Sender<FileLoaded> {
        self.files.sender.clone()
    }

    /// Applies every completion received so far, in arrival order.
    ///
    /// Returns how many were applied; stale ones are skipped.
    pub fn pump_file_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(loaded) = self.files.receiver.try_recv() {
            if self.complete_file(loaded) {
                applied += 1;
            }
        }
        applied
    }

    /// Applies one completion. Returns `false` if it was stale or failed.
    pub fn complete_file(&mut self, loaded: FileLoaded) -> bool {
        let FileLoaded { selection, content } = loaded;
        if self.files.current.get(&selection.field) != Some(&selection.generation) {
            debug!(file = %selection.file_name, generation = selection.generation, "Ignoring stale file completion");
            return false;
        }
        let content = match content {
            Ok(content) => content,
            Err(reason) => {
                warn!(file = %selection.file_name, reason = %reason, "Failed to load file");
                return false;
            }
        };

        let Ok(live) = self.live_record(&selection.field.owner) else {
            return false;
        };
        if live.record.name != selection.record {
            debug!(file = %selection.file_name, "Ignoring file completion for a record that is no longer live");
            return false;
        }
        let Some(value) = live.record.fields.get_mut(&selection.field.property) else {
            return false;
        };
        let pair = match value {
            Value::List(items) if items.first().is_some_and(|item| item.as_list().is_some()) => {
                items.get_mut(selection.index)
            }
            pair if selection.index == 0 => Some(pair),
            _ => None,
        };
        let Some(pair) = pair else {
            return false;
        };
        if file_name(pair) != Some(selection.file_name.as_str()) || file_loaded(pair) {
            return false;
        }
        *pair = Value::file(selection.file_name.clone(), Some(content));
        let in_collection = live.in_collection;

        if in_collection {
            self.notify_change(&selection.field.owner);
        }
        true
    }

    /// Status line for a file field.
    ///
    /// `No file selected` when empty, `Loading file ...` while any content
    /// is pending, and the comma-joined file names once all have loaded.
    pub fn file_status(&self, field: &FieldRef) -> Result<String, EditError> {
        let (schema, record) = self.live_view(&field.owner)?;
        let multiple = schema
            .property(&field.property)
            .is_some_and(|p| p.is_multiple());
        let pairs: Vec<&Value> = match record.get(&field.property) {
            Some(Value::List(items)) if items.first().is_some_and(|i| i.as_list().is_some()) => {
                items.iter().collect()
            }
            Some(Value::Null) | None => Vec::new(),
            Some(Value::List(items)) if items.is_empty() => Vec::new(),
            Some(pair) => vec![pair],
        };
        let plural = if multiple { "s" } else { "" };
        Ok(if pairs.is_empty() {
            format!("No file{plural} selected")
        } else if pairs.iter().any(|pair| !file_loaded(pair)) {
            format!("Loading file{plural} ...")
        } else {
            pairs
                .iter()
                .filter_map(|pair| file_name(pair))
                .collect::<Vec<_>>()
                .join(", ")
        })
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
