//! Single-flight execution.
//!
//! [`InFlight`] keeps at most one running future per key.  A caller that
//! arrives while a future for its key is running awaits that future's
//! output instead of starting another one.  The entry is dropped as soon as
//! the future completes, so the next caller after completion starts afresh.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

/// Whether a call started the shared future or joined one already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joined {
    /// This call started the future.
    Started,
    /// This call attached to a running future.
    Attached,
}

/// A registry of in-flight futures keyed by operation kind.
pub struct InFlight<K, T>
where
    T: Clone,
{
    running: Mutex<HashMap<K, Shared<BoxFuture<'static, T>>>>,
}

impl<K, T> InFlight<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone,
{
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            running: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true if a future is currently registered under `key`.
    pub fn is_running(&self, key: &K) -> bool {
        match self.running.lock() {
            Ok(running) => running.contains_key(key),
            Err(poisoned) => poisoned.into_inner().contains_key(key),
        }
    }

    /// Awaits the future registered under `key`, starting it with `start`
    /// when none is running.
    pub async fn run<F>(&self, key: K, start: F) -> (T, Joined)
    where
        F: FnOnce() -> BoxFuture<'static, T>,
    {
        let (shared, joined) = {
            let mut running = match self.running.lock() {
                Ok(running) => running,
                Err(poisoned) => poisoned.into_inner(),
            };
            match running.get(&key) {
                Some(shared) => (shared.clone(), Joined::Attached),
                None => {
                    let shared = start().shared();
                    running.insert(key.clone(), shared.clone());
                    (shared, Joined::Started)
                }
            }
        };

        let output = shared.clone().await;

        let mut running = match self.running.lock() {
            Ok(running) => running,
            Err(poisoned) => poisoned.into_inner(),
        };
        if running.get(&key).is_some_and(|current| current.ptr_eq(&shared)) {
            running.remove(&key);
        }
        (output, joined)
    }
}

impl<K, T> Default for InFlight<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
