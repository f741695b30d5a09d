//! Change notification for collections.
//!
//! A [`CollectionListener`] observes a single collection. Every method has an
//! empty default, so listeners implement only the events they care about.
//! Listeners receive borrowed snapshots and cannot reach back into the
//! registry while an operation is in progress.

use std::fmt;

use entity_maker_core::Record;

/// Observer of one collection's editing events.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use entity_maker_core::Record;
/// use entity_maker_registry::CollectionListener;
///
/// struct Log(Arc<Mutex<Vec<String>>>);
///
/// impl CollectionListener for Log {
///     fn on_create(&mut self, record: &Record, index: usize) {
///         self.0.lock().unwrap().push(format!("create {} at {index}", record.name));
///     }
/// }
/// ```
#[allow(unused_variables)]
pub trait CollectionListener {
    /// A record became the selection.
    fn on_select(&mut self, record: &Record, index: usize) {}
    /// The selection was committed and cleared.
    fn on_deselect(&mut self, record: &Record, index: usize) {}
    /// The collection contents were replaced wholesale.
    fn on_set_data(&mut self, records: &[Record]) {}
    /// A record was inserted.
    fn on_create(&mut self, record: &Record, index: usize) {}
    /// A field of the selected record changed.
    fn on_change(&mut self, record: &Record, index: usize) {}
    /// A record was renamed and possibly moved by sorting.
    fn on_rename(&mut self, old_name: &str, new_name: &str, old_index: usize, new_index: usize) {}
    /// A record was swapped from one position to another.
    fn on_move(&mut self, from: usize, to: usize) {}
    /// A record was removed.
    fn on_delete(&mut self, record: &Record, index: usize) {}
}

/// Handle returned on registration, used to unregister a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Registered listeners of one collection, in registration order.
#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, Box<dyn CollectionListener>)>,
}

impl Listeners {
    pub(crate) fn register(&mut self, listener: Box<dyn CollectionListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    pub(crate) fn unregister(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub(crate) fn emit(&mut self, mut event: impl FnMut(&mut dyn CollectionListener)) {
        for (_, listener) in &mut self.entries {
            event(listener.as_mut());
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    struct Counter(Rc<RefCell<usize>>);

    impl CollectionListener for Counter {
        fn on_move(&mut self, _from: usize, _to: usize) {
            *self.0.borrow_mut() += 1;
        }
    }

    #[test]
    fn test_emit_reaches_registered_listeners() {
        let count = Rc::new(RefCell::new(0));
        let mut listeners = Listeners::default();
        let first = listeners.register(Box::new(Counter(count.clone())));
        listeners.register(Box::new(Counter(count.clone())));

        listeners.emit(|l| l.on_move(0, 1));
        assert_eq!(*count.borrow(), 2);

        assert!(listeners.unregister(first));
        assert!(!listeners.unregister(first));
        listeners.emit(|l| l.on_move(1, 0));
        assert_eq!(*count.borrow(), 3);
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn test_unhandled_events_are_ignored() {
        let count = Rc::new(RefCell::new(0));
        let mut listeners = Listeners::default();
        listeners.register(Box::new(Counter(count.clone())));
        listeners.emit(|l| l.on_select(&Record::new("Tom", "Cat"), 0));
        assert_eq!(*count.borrow(), 0);
    }
}
