//! Run-scoped, populate-at-most-once caches.
//!
//! Concurrent first callers for the same slot coalesce into one fetch and all
//! of them observe its result. A failed fetch is remembered for the rest of
//! the run; waiters each get their own copy of the error.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;

use crate::error::{ProviderError, ProviderResult};

/// A single lazily fetched value, such as a session token.
#[derive(Debug)]
pub struct SharedSlot<T> {
    cell: OnceCell<Result<T, ProviderError>>,
}

impl<T> Default for SharedSlot<T> {
    fn default() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }
}

impl<T> SharedSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored value, running `fetch` if nobody has yet.
    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> ProviderResult<&T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        match self.cell.get_or_init(fetch).await {
            Ok(value) => Ok(value),
            Err(e) => Err(e.replicate()),
        }
    }

    /// True once a fetch has completed, successfully or not.
    pub fn is_filled(&self) -> bool {
        self.cell.initialized()
    }
}

/// A map of [`SharedSlot`]s, one per key. Used for per-day bulk downloads.
#[derive(Debug)]
pub struct KeyedSlots<K, V> {
    slots: Mutex<HashMap<K, Arc<SharedSlot<V>>>>,
}

impl<K, V> Default for KeyedSlots<K, V> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> KeyedSlots<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for `key`, running `fetch` at most once per key.
    pub async fn get_or_fetch<F, Fut>(&self, key: &K, fetch: F) -> ProviderResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ProviderResult<V>>,
    {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
            Arc::clone(slots.entry(key.clone()).or_default())
        };
        slot.get_or_fetch(fetch).await.cloned()
    }

    /// Number of keys that have been requested so far.
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn slot_fetches_once() {
        let slot = SharedSlot::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let value = slot
                .get_or_fetch(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ProviderError>("token".to_string())
                })
                .await
                .unwrap();
            assert_eq!(value, "token");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(slot.is_filled());
    }

    #[tokio::test]
    async fn slot_remembers_failure() {
        let slot: SharedSlot<String> = SharedSlot::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..2 {
            let err = slot
                .get_or_fetch(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ProviderError::authentication("login refused"))
                })
                .await
                .unwrap_err();
            assert_eq!(err.message(), "login refused");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_coalesce() {
        let slots: Arc<KeyedSlots<u32, Arc<Vec<u32>>>> = Arc::new(KeyedSlots::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let slots = Arc::clone(&slots);
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    slots
                        .get_or_fetch(&7, || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok(Arc::new(vec![1, 2, 3]))
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap().len(), 3);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(slots.len(), 1);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let slots: KeyedSlots<&'static str, u32> = KeyedSlots::new();
        let calls = AtomicUsize::new(0);
        for key in ["mon", "tue", "mon"] {
            slots
                .get_or_fetch(&key, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(1)
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
