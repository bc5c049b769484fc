//! Caller-facing callback type and its identity.

use std::sync::Arc;

/// A registered callback. The observable keys on *identity*, not structure:
/// clones of one `Arc` are the same listener, separately built closures are
/// not, even if they do the same thing.
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Identity of a listener, derived from its `Arc` allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

impl ListenerId {
    pub fn of<T: ?Sized>(listener: &Arc<T>) -> Self { Self(Arc::as_ptr(listener) as *const () as usize) }
}

/// Wrap a plain closure. Hold on to the returned `Arc` (or its
/// [`ListenerId`]) if you intend to unregister later.
pub fn from_fn<T: 'static, F>(f: F) -> Listener<T>
where F: Fn(&T) + Send + Sync + 'static {
    Arc::new(f)
}

/// Forward published values into a standard channel. Send errors are
/// ignored; a dropped receiver just makes the listener inert.
pub fn from_sender<T>(sender: std::sync::mpsc::Sender<T>) -> Listener<T>
where T: Clone + Send + Sync + 'static {
    Arc::new(move |value: &T| {
        let _ = sender.send(value.clone());
    })
}

/// Forward published values into a tokio unbounded channel.
#[cfg(feature = "tokio")]
pub fn from_unbounded_sender<T>(sender: tokio::sync::mpsc::UnboundedSender<T>) -> Listener<T>
where T: Clone + Send + Sync + 'static {
    Arc::new(move |value: &T| {
        let _ = sender.send(value.clone());
    })
}
