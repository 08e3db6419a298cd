//! Deduplication of concurrent identical persistence calls.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use serde::{Deserialize, Serialize};

use orderkit_core::UserId;

/// Who is mutating what.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoalesceKey {
    pub actor: UserId,
    pub resource: String,
}

impl CoalesceKey {
    pub fn new(actor: UserId, resource: impl Into<String>) -> Self {
        Self {
            actor,
            resource: resource.into(),
        }
    }
}

/// Cloneable handle on an in-flight operation; every clone resolves to the
/// same output.
pub type Coalesced<T> = Shared<BoxFuture<'static, T>>;

type InFlight<T> = Arc<Mutex<HashMap<CoalesceKey, Coalesced<T>>>>;

/// At most one execution per key at a time. No queue is kept: once an
/// operation settles its entry is removed and the next call starts fresh.
pub struct MutationCoalescer<T> {
    in_flight: InFlight<T>,
}

impl<T> Default for MutationCoalescer<T> {
    fn default() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T> core::fmt::Debug for MutationCoalescer<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MutationCoalescer")
            .field("in_flight", &lock(&self.in_flight).len())
            .finish()
    }
}

fn lock<T>(in_flight: &InFlight<T>) -> MutexGuard<'_, HashMap<CoalesceKey, Coalesced<T>>> {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T> MutationCoalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the in-flight call for `key`, or start `operation` as that call.
    pub fn coalesce<F>(&self, key: CoalesceKey, operation: F) -> Coalesced<T>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let mut in_flight = lock(&self.in_flight);
        if let Some(existing) = in_flight.get(&key) {
            tracing::debug!(actor = %key.actor, resource = %key.resource, "joining in-flight mutation");
            return existing.clone();
        }

        let registry = Arc::clone(&self.in_flight);
        let settled_key = key.clone();
        let shared = async move {
            let output = operation.await;
            lock(&registry).remove(&settled_key);
            output
        }
        .boxed()
        .shared();

        in_flight.insert(key, shared.clone());
        shared
    }

    /// Number of keys with an operation in flight.
    pub fn in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn distinct_keys_run_independently() {
        let coalescer = MutationCoalescer::new();
        let actor = UserId::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let a = {
            let runs = runs.clone();
            coalescer.coalesce(CoalesceKey::new(actor, "order/1"), async move {
                runs.fetch_add(1, Ordering::SeqCst);
                1
            })
        };
        let b = {
            let runs = runs.clone();
            coalescer.coalesce(CoalesceKey::new(actor, "order/2"), async move {
                runs.fetch_add(1, Ordering::SeqCst);
                2
            })
        };

        assert_eq!(coalescer.in_flight(), 2);
        assert_eq!((a.await, b.await), (1, 2));
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(coalescer.in_flight(), 0);
    }
}
