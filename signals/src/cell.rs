use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::listener::ListenerId;
use crate::scope::ScopeRef;

/// Callback as registered with the cell. Receives a borrow of the stored
/// value, or `None` when the stored value is absent.
pub type CellListener<T> = Arc<dyn Fn(Option<&T>) + Send + Sync>;

/// Single-value storage plus change fan-out: the notification bus that
/// [`VersionedObservable`](crate::VersionedObservable) layers its filtering
/// on. Keeps the last stored value and replays it to listeners that register
/// after the fact.
pub struct ObservableCell<T> {
    inner: Arc<CellInner<T>>,
}

struct CellInner<T> {
    value: RwLock<Option<Arc<T>>>,
    /// Whether `set` has ever been called; gates replay to new listeners.
    primed: AtomicBool,
    listeners: RwLock<HashMap<ListenerId, CellEntry<T>>>,
}

struct CellEntry<T> {
    listener: CellListener<T>,
    scope: Option<ScopeRef>,
}

impl<T> Clone for ObservableCell<T> {
    fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl<T: Send + Sync + 'static> Default for ObservableCell<T> {
    fn default() -> Self { Self::new() }
}

impl<T> std::fmt::Debug for ObservableCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableCell")
            .field("listeners", &self.inner.listeners.read().expect("listener lock is poisoned").len())
            .finish()
    }
}

impl<T: Send + Sync + 'static> ObservableCell<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CellInner {
                value: RwLock::new(None),
                primed: AtomicBool::new(false),
                listeners: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Store a value (present or absent) and notify every live listener with
    /// a borrow of it.
    pub fn set(&self, value: Option<T>) {
        let value = value.map(Arc::new);
        {
            let mut slot = self.inner.value.write().expect("value lock is poisoned");
            *slot = value.clone();
        }
        self.inner.primed.store(true, Ordering::SeqCst);
        self.fan_out(value);
    }

    /// Register a listener for the lifetime of the cell.
    pub fn register(&self, listener: CellListener<T>) { self.insert(None, listener) }

    /// Register a listener that stops receiving once `scope` ends.
    pub fn register_scoped(&self, scope: ScopeRef, listener: CellListener<T>) { self.insert(Some(scope), listener) }

    /// Remove a listener. Unknown listeners are ignored.
    pub fn unregister(&self, listener: &CellListener<T>) {
        let id = ListenerId::of(listener);
        if self.inner.listeners.write().expect("listener lock is poisoned").remove(&id).is_some() {
            debug!(?id, "cell listener unregistered");
        }
    }

    pub fn listener_count(&self) -> usize { self.inner.listeners.read().expect("listener lock is poisoned").len() }

    /// Run `f` against a borrow of the stored value.
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        let slot = self.inner.value.read().expect("value lock is poisoned");
        f(slot.as_deref())
    }

    fn insert(&self, scope: Option<ScopeRef>, listener: CellListener<T>) {
        let id = ListenerId::of(&listener);
        self.inner
            .listeners
            .write()
            .expect("listener lock is poisoned")
            .insert(id, CellEntry { listener: listener.clone(), scope });
        // Late joiners get the last stored value right away, if there ever
        // was one. The lock is released first: the listener may re-enter.
        if self.inner.primed.load(Ordering::SeqCst) {
            let snapshot = self.inner.value.read().expect("value lock is poisoned").clone();
            listener(snapshot.as_deref());
        }
    }

    /// Invoke listeners with no lock held. Entries whose scope has ended are
    /// dropped here rather than notified.
    fn fan_out(&self, value: Option<Arc<T>>) {
        let live: Vec<CellListener<T>> = {
            let mut listeners = self.inner.listeners.write().expect("listener lock is poisoned");
            listeners.retain(|id, entry| {
                let ended = entry.scope.as_ref().is_some_and(|scope| scope.is_ended());
                if ended {
                    debug!(?id, "dropping listener of ended scope");
                }
                !ended
            });
            listeners.values().map(|entry| entry.listener.clone()).collect()
        };
        for listener in live {
            listener(value.as_deref());
        }
    }
}

impl<T: Clone + Send + Sync + 'static> ObservableCell<T> {
    /// Clone out the stored value.
    pub fn value(&self) -> Option<T> { self.inner.value.read().expect("value lock is poisoned").as_deref().cloned() }
}
