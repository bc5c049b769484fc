use quell_signals::{listener, Listener};
use std::sync::{Arc, Mutex};

/// Recording listener: returns the listener and a `check` closure that
/// drains whatever it has seen so far.
#[allow(unused)]
pub fn recorder<T: Clone + Send + Sync + 'static>() -> (Listener<T>, Box<dyn Fn() -> Vec<T> + Send + Sync>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let listener = listener::from_fn({
        let seen = seen.clone();
        move |value: &T| seen.lock().unwrap().push(value.clone())
    });
    let check = Box::new(move || {
        let seen: Vec<T> = seen.lock().unwrap().drain(..).collect();
        seen
    });
    (listener, check)
}

#[allow(unused)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
