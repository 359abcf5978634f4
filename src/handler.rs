//! Handler capabilities consumed by the dispatcher.
//!
//! A [`HandlerTable`] maps byte offsets to [`ByteHandler`]s. The dispatcher asks
//! the table at most once per offset (the first time that offset changes) and
//! keeps the answer, so tables are expected to be static for the dispatcher's
//! lifetime.
//!
//! [`OffsetHandlers`] is the ready-made table: register closures per offset with
//! [`OffsetHandlers::on`], or [`OffsetHandlers::on_with_report`] for handlers that
//! need the whole report alongside the changed byte.
//!
//! ```
//! use bytewatch::{ByteChange, HandlerError, OffsetHandlers};
//!
//! let handlers: OffsetHandlers<()> = OffsetHandlers::new()
//!     .on(0, |c: &ByteChange<'_, ()>| {
//!         println!("buttons {:02x} -> {:02x}", c.previous, c.current);
//!         Ok::<(), HandlerError>(())
//!     });
//! assert!(bytewatch::HandlerTable::has(&handlers, 0));
//! ```

use crate::error::HandlerError;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Immutable copy of a full report, shared by every handler of one report.
pub type ReportSnapshot = Arc<[u8]>;

/// One changed byte, as passed to a handler.
#[derive(Clone, Debug)]
pub struct ByteChange<'a, S> {
    /// Zero-based offset into the report.
    pub offset: usize,
    /// Value in the report being processed.
    pub current: u8,
    /// Value at the same offset in the previous report (or `initial_state`).
    pub previous: u8,
    /// Shift state computed for this report, `None` without a provider.
    pub shift: Option<&'a S>,
    /// Full report, only for handlers whose [`ByteHandler::wants_report`] is `true`.
    pub report: Option<ReportSnapshot>,
}

/// Callable bound to one offset.
pub trait ByteHandler<S>: Send + Sync {
    fn on_change(&self, change: &ByteChange<'_, S>) -> Result<(), HandlerError>;

    /// Whether this handler receives [`ByteChange::report`].
    ///
    /// When no handler invoked for a report asks for it, no snapshot is allocated.
    fn wants_report(&self) -> bool {
        false
    }
}

/// Offset → handler lookup.
pub trait HandlerTable<S> {
    /// Bound handler for `offset`, if any.
    fn get(&self, offset: usize) -> Option<Arc<dyn ByteHandler<S>>>;

    fn has(&self, offset: usize) -> bool {
        self.get(offset).is_some()
    }
}

impl<S, T: HandlerTable<S> + ?Sized> HandlerTable<S> for Box<T> {
    fn get(&self, offset: usize) -> Option<Arc<dyn ByteHandler<S>>> {
        (**self).get(offset)
    }

    fn has(&self, offset: usize) -> bool {
        (**self).has(offset)
    }
}

/// Computes the opaque per-report shift state forwarded to every handler.
pub trait ShiftStateProvider<S> {
    fn shift_state(&self, report: &[u8]) -> S;
}

impl<S, F> ShiftStateProvider<S> for F
where
    F: Fn(&[u8]) -> S,
{
    fn shift_state(&self, report: &[u8]) -> S {
        self(report)
    }
}

struct FnHandler<F> {
    f: F,
    wants_report: bool,
}

impl<S, F> ByteHandler<S> for FnHandler<F>
where
    F: Fn(&ByteChange<'_, S>) -> Result<(), HandlerError> + Send + Sync,
{
    fn on_change(&self, change: &ByteChange<'_, S>) -> Result<(), HandlerError> {
        (self.f)(change)
    }

    fn wants_report(&self) -> bool {
        self.wants_report
    }
}

/// Explicit offset → handler map.
pub struct OffsetHandlers<S> {
    handlers: BTreeMap<usize, Arc<dyn ByteHandler<S>>>,
}

impl<S: 'static> OffsetHandlers<S> {
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Register a closure for `offset`. Replaces any earlier handler there.
    pub fn on<F>(self, offset: usize, f: F) -> Self
    where
        F: Fn(&ByteChange<'_, S>) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.insert(
            offset,
            FnHandler {
                f,
                wants_report: false,
            },
        )
    }

    /// Like [`on`](Self::on), but the closure also receives the full report.
    pub fn on_with_report<F>(self, offset: usize, f: F) -> Self
    where
        F: Fn(&ByteChange<'_, S>) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.insert(
            offset,
            FnHandler {
                f,
                wants_report: true,
            },
        )
    }

    /// Register any [`ByteHandler`] implementation for `offset`.
    pub fn insert(mut self, offset: usize, handler: impl ByteHandler<S> + 'static) -> Self {
        self.handlers.insert(offset, Arc::new(handler));
        self
    }

    /// Offsets that have a handler, ascending.
    pub fn offsets(&self) -> impl Iterator<Item = usize> + '_ {
        self.handlers.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<S: 'static> Default for OffsetHandlers<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> HandlerTable<S> for OffsetHandlers<S> {
    fn get(&self, offset: usize) -> Option<Arc<dyn ByteHandler<S>>> {
        self.handlers.get(&offset).cloned()
    }

    fn has(&self, offset: usize) -> bool {
        self.handlers.contains_key(&offset)
    }
}

impl<S> fmt::Debug for OffsetHandlers<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OffsetHandlers")
            .field("offsets", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn change(offset: usize, current: u8, previous: u8) -> ByteChange<'static, ()> {
        ByteChange {
            offset,
            current,
            previous,
            shift: None,
            report: None,
        }
    }

    #[test]
    fn lookup_by_offset() {
        let table: OffsetHandlers<()> = OffsetHandlers::new()
            .on(1, |_: &ByteChange<'_, ()>| Ok(()))
            .on_with_report(4, |_: &ByteChange<'_, ()>| Ok(()));

        assert!(!table.has(0));
        assert!(table.has(1));
        assert!(table.get(2).is_none());
        assert_eq!(table.offsets().collect::<Vec<_>>(), vec![1, 4]);

        assert!(!table.get(1).unwrap().wants_report());
        assert!(table.get(4).unwrap().wants_report());
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let table: OffsetHandlers<()> = OffsetHandlers::new()
            .on(0, |_: &ByteChange<'_, ()>| Err(HandlerError::Panicked("old".into())))
            .on(0, move |_: &ByteChange<'_, ()>| {
                h.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });

        assert_eq!(table.len(), 1);
        table.get(0).unwrap().on_change(&change(0, 1, 0)).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn closures_are_shift_providers() {
        let provider = |report: &[u8]| report[0] & 0x02 != 0;
        assert!(provider.shift_state(&[0x02, 0x00]));
        assert!(!provider.shift_state(&[0x01, 0x00]));
    }
}
