/*!
Versioned single-value publish/subscribe.

A [`VersionedObservable`] holds one current value and a monotonically
increasing revision. Every listener is wrapped with a watermark recording the
last revision it was handed, and a delivery is forwarded only when it carries
a newer revision. That is the whole trick: a listener registered after a
publish never replays it (the watermark starts at the current revision),
while a *sticky* registration starts at the sentinel and therefore pulls the
current value immediately.

Registrations may be bound to a [`Scope`]: a scope that has already ended is
never registered, and one that ends later stops receiving.

# Basic usage

```rust
use quell_signals::{listener, VersionedObservable};
use std::sync::{Arc, Mutex};

let price = VersionedObservable::new();
price.publish(42);

let seen = Arc::new(Mutex::new(Vec::new()));
let late = listener::from_fn({
    let seen = seen.clone();
    move |value: &i32| seen.lock().unwrap().push(*value)
});

// A plain registration never replays the value published before it...
price.observe_forever(late.clone())?;
assert!(seen.lock().unwrap().is_empty());

// ...while a sticky registration starts with the current value.
let sticky = listener::from_fn({
    let seen = seen.clone();
    move |value: &i32| seen.lock().unwrap().push(*value)
});
price.observe_sticky_forever(sticky)?;
assert_eq!(*seen.lock().unwrap(), vec![42]);

price.publish(43);
assert_eq!(*seen.lock().unwrap(), vec![42, 43, 43]);
# Ok::<(), quell_signals::SubscribeError>(())
```

Publishes, registrations and removals are expected to happen on one task
context; delivery is synchronous on the publishing call. The types are
`Send + Sync` and internally locked so that listeners may re-enter the
observable (publish, register, unregister) from inside a delivery.
*/

mod cell;
mod error;
pub mod listener;
mod observable;
mod scope;

pub use cell::*;
pub use error::*;
pub use listener::{Listener, ListenerId};
pub use observable::*;
pub use scope::*;
