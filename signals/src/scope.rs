use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Capability interface over the host's notion of scope liveness.
///
/// The observable asks exactly one question, once per scoped registration:
/// has this scope reached its terminal state? Any environment with an
/// "is this still alive" bit can implement it.
pub trait LifecycleScope: Send + Sync {
    /// True once the scope has reached its terminal state.
    fn is_ended(&self) -> bool;
}

/// Erased scope handle as stored by registrations.
pub type ScopeRef = Arc<dyn LifecycleScope>;

/// Minimal owned scope: alive until [`Scope::end`] is called. Clones share
/// the flag.
#[derive(Clone)]
pub struct Scope(Arc<AtomicBool>);

impl Default for Scope {
    fn default() -> Self { Self::new() }
}

impl Scope {
    pub fn new() -> Self { Self(Arc::new(AtomicBool::new(false))) }

    /// Move the scope to its terminal state. Irreversible.
    pub fn end(&self) { self.0.store(true, Ordering::SeqCst); }

    /// Erased handle for registration calls.
    pub fn reference(&self) -> ScopeRef { Arc::new(self.clone()) }
}

impl LifecycleScope for Scope {
    fn is_ended(&self) -> bool { self.0.load(Ordering::SeqCst) }
}

impl From<&Scope> for ScopeRef {
    fn from(scope: &Scope) -> Self { scope.reference() }
}

impl From<Scope> for ScopeRef {
    fn from(scope: Scope) -> Self { Arc::new(scope) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_is_terminal_and_shared() {
        let scope = Scope::new();
        let clone = scope.clone();
        assert!(!scope.is_ended());
        scope.end();
        assert!(scope.is_ended());
        assert!(clone.is_ended());
    }
}
