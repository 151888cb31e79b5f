use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};

type Pending<T> = Shared<BoxFuture<'static, T>>;

/// Coalesces concurrent work on the same key into a single execution.
///
/// The first caller to `admit` a key installs its work; anyone admitting the same key while
/// that work is still running awaits the same result instead of starting their own. The
/// entry is removed as soon as the work completes, whatever its result, so a later `admit`
/// for the key runs fresh work.
pub struct InFlight<K, T> {
    pending: Arc<Mutex<HashMap<K, Pending<T>>>>,
}

impl<K, T> InFlight<K, T>
where
    K: Eq + Hash + Clone + Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `work` for `key`, unless work for `key` is already in flight, in which case
    /// wait for that one and return its result. `work` is only called by the caller
    /// that wins the insert.
    pub async fn admit<F, Fut>(&self, key: K, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let pending = {
            let mut pending = lock(&self.pending);

            match pending.get(&key) {
                Some(in_flight) => in_flight.clone(),
                None => {
                    let registry = Arc::clone(&self.pending);
                    let entry = key.clone();
                    let fut = work();

                    let shared = async move {
                        let result = fut.await;
                        lock(&registry).remove(&entry);
                        result
                    }
                    .boxed()
                    .shared();

                    pending.insert(key, shared.clone());
                    shared
                }
            }
        };

        pending.await
    }

    /// Number of keys with work currently in flight.
    pub fn len(&self) -> usize {
        lock(&self.pending).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, T> Default for InFlight<K, T>
where
    K: Eq + Hash + Clone + Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

// The map is only ever left mid-update by a panic inside HashMap itself, so a poisoned
// lock still guards a consistent map.
fn lock<K, T>(pending: &Mutex<HashMap<K, Pending<T>>>) -> MutexGuard<'_, HashMap<K, Pending<T>>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}
