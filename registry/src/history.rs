//! Bounded undo/redo log.
//!
//! The log is a linear list of reversible actions with a cursor: entries
//! before the cursor have been applied and can be undone, entries after it
//! can be redone. Recording a new action discards the redo tail.
//!
//! Compaction is amortized: the log may grow to 125% of its limit before the
//! oldest entries are dropped, bringing it back to exactly the limit.

use entity_maker_core::Record;
use serde::Serialize;

/// One reversible collection action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum UndoEntry {
    /// A record was inserted at `index`.
    Create {
        /// Collection name.
        collection: String,
        /// The record as inserted.
        record: Record,
        /// Position after insertion.
        index: usize,
    },
    /// A record was removed from `index`.
    Delete {
        /// Collection name.
        collection: String,
        /// The record as removed.
        record: Record,
        /// Position before removal.
        index: usize,
    },
    /// A record was renamed.
    Rename {
        /// Collection name.
        collection: String,
        /// Name before the rename.
        old_name: String,
        /// Name after the rename.
        new_name: String,
    },
    /// The record at `index` was swapped with its neighbour at
    /// `index + direction`.
    Move {
        /// Collection name.
        collection: String,
        /// Position before the move.
        index: usize,
        /// Offset of the swap.
        direction: isize,
    },
}

impl UndoEntry {
    /// Name of the collection the action applies to.
    pub fn collection(&self) -> &str {
        match self {
            Self::Create { collection, .. }
            | Self::Delete { collection, .. }
            | Self::Rename { collection, .. }
            | Self::Move { collection, .. } => collection,
        }
    }
}

/// Linear undo/redo log with a cursor and a size limit.
///
/// # Examples
///
/// ```
/// use entity_maker_registry::{UndoEntry, UndoLog};
///
/// let mut log = UndoLog::new(4);
/// for index in 0..5 {
///     log.record(UndoEntry::Move { collection: "Pets".into(), index, direction: 1 });
/// }
/// // 5 entries fit under 1.25 * 4.
/// assert_eq!(log.len(), 5);
/// log.record(UndoEntry::Move { collection: "Pets".into(), index: 5, direction: 1 });
/// assert_eq!(log.len(), 4);
/// assert_eq!(log.cursor(), 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct UndoLog {
    entries: Vec<UndoEntry>,
    cursor: usize,
    limit: usize,
}

impl UndoLog {
    /// Creates an empty log. A limit of zero disables recording.
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            limit,
        }
    }

    /// Maximum number of entries kept after compaction.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Changes the limit and compacts immediately if the log is now too long.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
        self.compact();
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    /// Appends an applied action, discarding anything that could be redone.
    pub fn record(&mut self, entry: UndoEntry) {
        if self.limit == 0 {
            return;
        }
        self.entries.truncate(self.cursor);
        self.entries.push(entry);
        self.cursor = self.entries.len();
        self.compact();
    }

    /// Number of entries in the log.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of applied entries; `0..=len()`.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Returns `true` if there is an action to undo.
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Returns `true` if there is an action to redo.
    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[UndoEntry] {
        &self.entries
    }

    /// Moves the cursor back and returns the entry to revert.
    pub(crate) fn step_back(&mut self) -> Option<UndoEntry> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor).cloned()
    }

    /// Moves the cursor forward and returns the entry to reapply.
    pub(crate) fn step_forward(&mut self) -> Option<UndoEntry> {
        let entry = self.entries.get(self.cursor).cloned()?;
        self.cursor += 1;
        Some(entry)
    }

    fn compact(&mut self) {
        // Integer form of `len > 1.25 * limit`.
        if self.entries.len() * 4 > self.limit * 5 {
            // Redo entries only apply on top of the undone ones before them.
            self.entries.truncate(self.cursor);
            let excess = self.entries.len().saturating_sub(self.limit);
            self.entries.drain(..excess);
            self.cursor = self.entries.len();
        }
    }
}
