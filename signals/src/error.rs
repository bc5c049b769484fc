use thiserror::Error;

/// Errors surfaced by listener registration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubscribeError {
    /// The listener identity is already registered with this observable.
    /// One identity maps to exactly one watermark; unregister first to
    /// start over.
    #[error("listener is already registered with this observable")]
    DuplicateListener,
}
