//! Byte-diff dispatcher.
//!
//! [`ByteDiffDispatcher`] keeps the last value seen at every report offset and,
//! for each new report, calls the handler bound to every offset whose value
//! changed. It is the stateful half of a session; the session only validates
//! notifications and hands it report bytes.
//!
//! ## Per-report algorithm
//! 1. A report wider than the configured width is rejected whole, before any
//!    state is touched.
//! 2. The shift-state provider (if any) runs once.
//! 3. Offsets are walked in ascending order. The stored value is overwritten with
//!    the current one *before* the handler for that offset runs, so a failing
//!    handler can never leave stale state behind.
//! 4. Changed offsets resolve their handler through the table on first change
//!    only; both hits and misses are cached.
//! 5. Handler errors and panics are logged, recorded in the [`DispatchReport`],
//!    and processing carries on with the next offset.
//!
//! A report shorter than the width only updates the offsets it contains.

use crate::config::ListenerConfig;
use crate::error::{ConfigError, DispatchError, HandlerError};
use crate::handler::{ByteChange, ByteHandler, HandlerTable, ReportSnapshot, ShiftStateProvider};
use log::{debug, error, warn};
#[cfg(feature = "debug-log")]
use log::trace;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Cached outcome of a handler lookup.
enum Resolved<S> {
    Bound(Arc<dyn ByteHandler<S>>),
    Absent,
}

/// A handler that failed for one offset of one report.
#[derive(Debug)]
pub struct HandlerFailure {
    pub offset: usize,
    pub error: HandlerError,
}

/// What happened while processing one report.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Offsets diffed (the report length).
    pub examined: usize,
    /// Offsets whose value differed from the stored one.
    pub changed: usize,
    /// Handlers invoked, failed ones included.
    pub dispatched: usize,
    /// Handlers that returned an error or panicked.
    pub failures: Vec<HandlerFailure>,
    /// Whether a full-report snapshot was allocated.
    pub snapshot_taken: bool,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Diffs consecutive reports and dispatches per-offset handlers.
///
/// `S` is the opaque shift-state type produced by the optional provider.
pub struct ByteDiffDispatcher<S> {
    state: Vec<u8>,
    cache: Vec<Option<Resolved<S>>>,
    table: Box<dyn HandlerTable<S> + Send>,
    shift: Option<Box<dyn ShiftStateProvider<S> + Send>>,
}

impl<S: 'static> ByteDiffDispatcher<S> {
    /// Create a dispatcher whose report width is `initial_state.len()`.
    pub fn new(
        initial_state: impl Into<Vec<u8>>,
        table: impl HandlerTable<S> + Send + 'static,
    ) -> Result<Self, ConfigError> {
        let state = initial_state.into();
        if state.is_empty() {
            return Err(ConfigError::EmptyInitialState);
        }
        let mut cache = Vec::with_capacity(state.len());
        cache.resize_with(state.len(), || None);
        Ok(Self {
            state,
            cache,
            table: Box::new(table),
            shift: None,
        })
    }

    /// Create a dispatcher from a loaded [`ListenerConfig`].
    pub fn from_config(
        config: &ListenerConfig,
        table: impl HandlerTable<S> + Send + 'static,
    ) -> Result<Self, ConfigError> {
        Self::new(config.initial_state.clone(), table)
    }

    /// Attach a shift-state provider, run once per report.
    pub fn with_shift_state<P>(mut self, provider: P) -> Self
    where
        P: Fn(&[u8]) -> S + Send + 'static,
    {
        self.shift = Some(Box::new(provider));
        self
    }

    /// Attach any [`ShiftStateProvider`] implementation.
    pub fn with_shift_provider(mut self, provider: impl ShiftStateProvider<S> + Send + 'static) -> Self {
        self.shift = Some(Box::new(provider));
        self
    }

    /// Process one report.
    ///
    /// Returns `Err` only when the report is wider than [`width`](Self::width); in
    /// that case nothing is diffed and no state changes. Handler failures do not
    /// produce `Err`; they are listed in the returned [`DispatchReport`].
    pub fn process(&mut self, report: &[u8]) -> Result<DispatchReport, DispatchError> {
        let width = self.state.len();
        if report.len() > width {
            let err = DispatchError::OutOfBoundsOffset {
                offset: width,
                width,
            };
            error!("rejecting {}-byte report: {err}", report.len());
            return Err(err);
        }

        let mut summary = DispatchReport::default();
        if report.is_empty() {
            return Ok(summary);
        }

        #[cfg(feature = "debug-log")]
        trace!("[DIFF] report n={} bytes: {:02x?}", report.len(), report);

        let shift = self.shift.as_ref().map(|p| p.shift_state(report));
        let mut snapshot: Option<ReportSnapshot> = None;

        for (offset, &current) in report.iter().enumerate() {
            let previous = std::mem::replace(&mut self.state[offset], current);
            summary.examined += 1;
            if current == previous {
                continue;
            }
            summary.changed += 1;

            let Some(handler) = self.resolve(offset) else {
                continue;
            };

            let full = if handler.wants_report() {
                Some(Arc::clone(
                    snapshot.get_or_insert_with(|| Arc::from(report)),
                ))
            } else {
                None
            };

            let change = ByteChange {
                offset,
                current,
                previous,
                shift: shift.as_ref(),
                report: full,
            };

            summary.dispatched += 1;
            if let Err(error) = invoke(handler.as_ref(), &change) {
                warn!(
                    "handler for offset {offset} failed ({previous:#04x} -> {current:#04x}): {error}"
                );
                summary.failures.push(HandlerFailure { offset, error });
            }
        }

        summary.snapshot_taken = snapshot.is_some();
        Ok(summary)
    }

    /// Report width fixed at construction.
    pub fn width(&self) -> usize {
        self.state.len()
    }

    /// Last value seen at every offset.
    pub fn state(&self) -> &[u8] {
        &self.state
    }

    /// Offsets whose handler lookup has already happened (bound or absent).
    pub fn resolved_offsets(&self) -> impl Iterator<Item = usize> + '_ {
        self.cache
            .iter()
            .enumerate()
            .filter_map(|(offset, slot)| slot.as_ref().map(|_| offset))
    }

    fn resolve(&mut self, offset: usize) -> Option<Arc<dyn ByteHandler<S>>> {
        let table = &self.table;
        let slot = self.cache[offset].get_or_insert_with(|| match table.get(offset) {
            Some(handler) => {
                debug!("bound handler for offset {offset}");
                Resolved::Bound(handler)
            }
            None => Resolved::Absent,
        });
        match slot {
            Resolved::Bound(handler) => Some(Arc::clone(handler)),
            Resolved::Absent => None,
        }
    }
}

/// Run a handler, turning a panic into [`HandlerError::Panicked`].
fn invoke<S>(handler: &dyn ByteHandler<S>, change: &ByteChange<'_, S>) -> Result<(), HandlerError> {
    match panic::catch_unwind(AssertUnwindSafe(|| handler.on_change(change))) {
        Ok(result) => result,
        Err(payload) => {
            let msg = if let Some(s) = payload.downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "non-string panic payload".to_string()
            };
            Err(HandlerError::Panicked(msg))
        }
    }
}
