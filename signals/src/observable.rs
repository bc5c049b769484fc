use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, trace};

use crate::cell::{CellListener, ObservableCell};
use crate::error::SubscribeError;
use crate::listener::{Listener, ListenerId};
use crate::scope::ScopeRef;

/// Revision value meaning "nothing yet": no publish has happened, or a
/// listener has not been handed anything.
pub const REVISION_NONE: i64 = -1;

/// Single-value publish/subscribe with per-listener delivery watermarks.
///
/// Each publish advances the revision counter; each registered listener
/// remembers the last revision it was handed and is only invoked for
/// revisions past that watermark. An eager registration starts at the
/// current revision (nothing published before it is ever replayed), a
/// sticky one starts at the sentinel (the current value, if any, is
/// delivered immediately).
///
/// Callers are expected to serialize publishes and (un)registrations on one
/// task context. The interior locking exists for memory safety and for
/// re-entrancy (a listener may call back into the observable from inside a
/// delivery); it adds no cross-thread ordering guarantees.
pub struct VersionedObservable<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    /// Shared with every wrapper closure so the filter reads the revision
    /// that is current at delivery time, not at registration time.
    revision: Arc<AtomicI64>,
    cell: ObservableCell<T>,
    registry: RwLock<HashMap<ListenerId, Registration<T>>>,
}

struct Registration<T> {
    /// The wrapper as handed to the cell; kept for unregistration.
    effective: CellListener<T>,
    scope: Option<ScopeRef>,
}

/// Wrapper installed in the cell in place of the real listener: forwards a
/// delivery only when it carries a revision past the watermark.
struct VersionedListener<T> {
    listener: Listener<T>,
    last_seen: AtomicI64,
}

impl<T> VersionedListener<T> {
    fn deliver(&self, revision: i64, value: Option<&T>) {
        // Advance the watermark before running caller code, so a re-entrant
        // publish from inside the callback cannot hand this listener the
        // same revision twice.
        let seen = self.last_seen.fetch_max(revision, Ordering::SeqCst);
        if revision <= seen {
            trace!(revision, seen, "delivery suppressed");
            return;
        }
        if let Some(value) = value {
            (self.listener)(value);
        }
    }
}

impl<T> Clone for VersionedObservable<T> {
    fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl<T: Send + Sync + 'static> Default for VersionedObservable<T> {
    fn default() -> Self { Self::new() }
}

impl<T> std::fmt::Debug for VersionedObservable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionedObservable")
            .field("revision", &self.inner.revision.load(Ordering::SeqCst))
            .field("observers", &self.inner.registry.read().expect("registry lock is poisoned").len())
            .finish()
    }
}

impl<T: Send + Sync + 'static> VersionedObservable<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                revision: Arc::new(AtomicI64::new(REVISION_NONE)),
                cell: ObservableCell::new(),
                registry: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Publish a value: advance the revision, store the value as current and
    /// fan it out. Publishing a value equal to the previous one is not
    /// special-cased; it consumes a revision like any other publish.
    pub fn publish(&self, value: T) { self.emit(Some(value)) }

    /// Consume a revision without a payload: the stored value becomes
    /// absent, watermarks still advance at fan-out, and no callback runs.
    pub fn publish_empty(&self) { self.emit(None) }

    fn emit(&self, value: Option<T>) {
        // The revision advances before the value is stored or any listener
        // runs, so every wrapper's filter sees the new revision as current
        // during this fan-out.
        let revision = self.inner.revision.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(revision, present = value.is_some(), "publish");
        self.inner.cell.set(value);
    }

    /// Register `listener` for values published while `scope` is alive,
    /// starting with the next publish. A scope that has already ended makes
    /// this a no-op.
    pub fn observe(&self, scope: impl Into<ScopeRef>, listener: Listener<T>) -> Result<(), SubscribeError> {
        self.register(Some(scope.into()), listener, false)
    }

    /// Like [`observe`](Self::observe), but additionally delivers the
    /// current value, if any, immediately.
    pub fn observe_sticky(&self, scope: impl Into<ScopeRef>, listener: Listener<T>) -> Result<(), SubscribeError> {
        self.register(Some(scope.into()), listener, true)
    }

    /// Register `listener` unscoped, starting with the next publish.
    pub fn observe_forever(&self, listener: Listener<T>) -> Result<(), SubscribeError> { self.register(None, listener, false) }

    /// Register `listener` unscoped and deliver the current value, if any,
    /// immediately.
    pub fn observe_sticky_forever(&self, listener: Listener<T>) -> Result<(), SubscribeError> { self.register(None, listener, true) }

    fn register(&self, scope: Option<ScopeRef>, listener: Listener<T>, sticky: bool) -> Result<(), SubscribeError> {
        if let Some(scope) = &scope {
            if scope.is_ended() {
                debug!("scope already ended; registration skipped");
                return Ok(());
            }
        }
        let id = ListenerId::of(&listener);
        let initial = if sticky { REVISION_NONE } else { self.inner.revision.load(Ordering::SeqCst) };
        let wrapper = Arc::new(VersionedListener { listener, last_seen: AtomicI64::new(initial) });
        let effective: CellListener<T> = {
            let revision = self.inner.revision.clone();
            Arc::new(move |value| wrapper.deliver(revision.load(Ordering::SeqCst), value))
        };
        {
            let mut registry = self.inner.registry.write().expect("registry lock is poisoned");
            if let Some(existing) = registry.get(&id) {
                // An entry whose scope has since ended is already cut off
                // from deliveries; evict it so the identity can register
                // anew. A live entry is a caller bug.
                let stale = existing.scope.as_ref().is_some_and(|scope| scope.is_ended());
                if !stale {
                    return Err(SubscribeError::DuplicateListener);
                }
                let existing = registry.remove(&id).expect("entry just observed");
                self.inner.cell.unregister(&existing.effective);
                debug!(?id, "stale registration evicted");
            }
            registry.insert(id, Registration { effective: effective.clone(), scope: scope.clone() });
        }
        debug!(?id, sticky, scoped = scope.is_some(), "listener registered");
        // Handing the wrapper to the cell may synchronously deliver the
        // current value (that is what makes sticky registration work without
        // another publish); the registry lock is released first so the
        // callback can re-enter.
        match scope {
            Some(scope) => self.inner.cell.register_scoped(scope, effective),
            None => self.inner.cell.register(effective),
        }
        Ok(())
    }

    /// Remove a previously registered listener. Unknown or already-removed
    /// listeners are ignored.
    pub fn unobserve(&self, listener: &Listener<T>) { self.unobserve_id(ListenerId::of(listener)) }

    /// Identity-addressed removal, for callers that kept the [`ListenerId`]
    /// rather than the listener itself.
    pub fn unobserve_id(&self, id: ListenerId) {
        let removed = self.inner.registry.write().expect("registry lock is poisoned").remove(&id);
        if let Some(removed) = removed {
            self.inner.cell.unregister(&removed.effective);
            debug!(?id, "listener unregistered");
        }
    }

    /// Revision of the most recent publish, or [`REVISION_NONE`] before the
    /// first one.
    pub fn revision(&self) -> i64 { self.inner.revision.load(Ordering::SeqCst) }

    pub fn observer_count(&self) -> usize { self.inner.registry.read().expect("registry lock is poisoned").len() }

    /// Run `f` against a borrow of the current value.
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R { self.inner.cell.with(f) }
}

impl<T: Clone + Send + Sync + 'static> VersionedObservable<T> {
    /// Clone out the current value, `None` before the first publish or after
    /// an empty one.
    pub fn value(&self) -> Option<T> { self.inner.cell.value() }
}
