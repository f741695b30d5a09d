//! Entity registry, collections and the integrity engine behind entity
//! editors.
//!
//! This crate builds on the schema types of `entity_maker_core`:
//!
//! - [`Registry`] — session object holding every collection and standalone
//!   editor under a unique name, with a shared undo/redo log.
//! - [`EntityCollection`] — an ordered list of named, typed records with a
//!   single selection, edited through `create`, `duplicate`, `rename`,
//!   `delete`, `move_record` and `select`.
//! - Cross references — reference properties list the records of their
//!   target collections as options; renames are propagated to every record
//!   that references the old name.
//! - [`UndoLog`] — bounded, compacting history of reversible actions.
//! - [`CollectionListener`] — change notification for presentation layers.
//! - File loading — [`FileSelection`] tokens and [`FileLoaded`] completions
//!   delivered over a channel.
//!
//! # Quick start
//!
//! ```
//! use entity_maker_core::Value;
//! use entity_maker_registry::Registry;
//!
//! let mut registry = Registry::builder()
//!     .undo_limit(100)
//!     .collection(serde_json::json!({
//!         "name": "Pets",
//!         "entities": [
//!             {"name": "Cat", "properties": [{"name": "lives", "type": "int", "default": 9}]},
//!         ],
//!     }))
//!     .collection(serde_json::json!({
//!         "name": "People",
//!         "entities": [
//!             {"name": "Person", "properties": [{"name": "pet", "type": "xref", "targets": "Pets"}]},
//!         ],
//!     }))
//!     .build()
//!     .unwrap();
//!
//! registry.create("Pets", "Cat", "Tom").unwrap();
//! registry.create("People", "Person", "Alice").unwrap();
//! registry.set_field("People", "pet", Value::from("Tom")).unwrap();
//!
//! registry.rename("Pets", "Thomas", Some("Tom")).unwrap();
//! let alice = registry.collection("People").unwrap().get("Alice").unwrap();
//! assert_eq!(alice.get("pet"), Some(&Value::from("Thomas")));
//! ```

mod collection;
mod config;
mod editor;
mod error;
mod files;
mod history;
mod hooks;
mod registry;
mod xref;

pub use collection::{Comparator, EntityCollection, SortPolicy};
pub use config::{RegistryBuilder, load_bundle, load_document, save_bundle, save_document};
pub use editor::StandaloneEditor;
pub use error::{EditError, NameError, RegistryError, Result};
pub use files::{FieldRef, FileLoaded, FileSelection, FileTransport, ThreadFileTransport};
pub use history::{UndoEntry, UndoLog};
pub use hooks::{CollectionListener, ListenerId};
pub use registry::{Entry, Registered, Registry};
pub use xref::XrefEdge;
