//! Request Deduplication Module
//!
//! Coalesces concurrent requests for the same key onto one in-flight fetch.
//!
//! Every caller that arrives while a fetch is pending receives a clone of the
//! same outcome, success or failure. The pending record is dropped the moment
//! the fetch settles, so the next request for that key always fetches again.
//!
//! Fetches are driven on their own tokio task, so a fetch settles (and its
//! record clears) even when all of its callers were dropped, e.g. by a
//! timeout around the request.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, warn};

type SharedOutcome<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

// == Pending Request ==
struct PendingRequest {
    /// Distinguishes a record from a later one under the same key
    id: u64,
    /// A `SharedOutcome<T, E>`, erased so one deduplicator serves any type
    outcome: Box<dyn Any + Send + Sync>,
}

#[derive(Default)]
struct PendingSet {
    next_id: u64,
    requests: HashMap<String, PendingRequest>,
}

// == Request Deduplicator ==
/// Tracks at most one in-flight fetch per key.
///
/// Outcomes must be `Clone` because each coalesced caller receives its own
/// copy; wrap non-cloneable values or errors in an `Arc`.
#[derive(Clone, Default)]
pub struct RequestDeduplicator {
    pending: Arc<Mutex<PendingSet>>,
}

impl RequestDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PendingSet> {
        lock_pending(&self.pending)
    }

    // == Request ==
    /// Runs `fetcher` for `key`, or joins the fetch already pending for it.
    ///
    /// A pending fetch registered with a different `(T, E)` type cannot be
    /// shared; the new caller then fetches on its own without registering.
    pub async fn request<T, E, F, Fut>(&self, key: &str, fetcher: F) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        match self.join_or_register::<T, E, F, Fut>(key, fetcher) {
            Ok(outcome) => outcome.await,
            Err(fetcher) => fetcher().await,
        }
    }

    /// Returns the shared outcome to await, or hands the fetcher back when
    /// the pending record has an incompatible type.
    fn join_or_register<T, E, F, Fut>(&self, key: &str, fetcher: F) -> Result<SharedOutcome<T, E>, F>
    where
        T: Clone + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let mut pending = self.lock();

        if let Some(existing) = pending.requests.get(key) {
            return match existing.outcome.downcast_ref::<SharedOutcome<T, E>>() {
                Some(outcome) => {
                    debug!("Coalescing request for {} onto pending fetch", key);
                    Ok(outcome.clone())
                }
                None => {
                    warn!("Pending fetch for {} has a different type, fetching separately", key);
                    Err(fetcher)
                }
            };
        }

        let id = pending.next_id;
        pending.next_id += 1;

        let registry = Arc::clone(&self.pending);
        let owned_key = key.to_string();
        let outcome = async move {
            let result = fetcher().await;
            settle(&registry, &owned_key, id);
            result
        }
        .boxed()
        .shared();

        pending.requests.insert(
            key.to_string(),
            PendingRequest {
                id,
                outcome: Box::new(outcome.clone()),
            },
        );
        // The fetch runs to completion even if every caller stops waiting
        tokio::spawn(outcome.clone().map(drop));
        debug!("Registered pending fetch for {}", key);
        Ok(outcome)
    }

    // == Cancel ==
    /// Detaches `key` from its pending fetch so later callers start a new one.
    ///
    /// The in-flight fetch is not aborted and callers already waiting on it
    /// still receive its outcome. Returns true if a record was removed.
    pub fn cancel(&self, key: &str) -> bool {
        let removed = self.lock().requests.remove(key).is_some();
        if removed {
            debug!("Detached pending fetch for {}", key);
        }
        removed
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.lock().requests.contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.lock().requests.len()
    }
}

impl std::fmt::Debug for RequestDeduplicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDeduplicator")
            .field("pending", &self.pending_count())
            .finish()
    }
}

fn lock_pending(pending: &Mutex<PendingSet>) -> MutexGuard<'_, PendingSet> {
    // The set is consistent after every statement, so a poisoned lock is still usable
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drops the record for `key` if it is still the one created with `id`.
fn settle(pending: &Mutex<PendingSet>, key: &str, id: u64) {
    let mut pending = lock_pending(pending);
    if pending.requests.get(key).is_some_and(|record| record.id == id) {
        pending.requests.remove(key);
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    fn counting_fetcher(
        calls: &Arc<AtomicUsize>,
        delay_ms: u64,
        value: Value,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<Value, String>> + Send + 'static {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                sleep(Duration::from_millis(delay_ms)).await;
                Ok(value)
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_fetch() {
        let dedup = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            dedup.request("kpis:42", counting_fetcher(&calls, 50, json!({"value": 7}))),
            dedup.request("kpis:42", counting_fetcher(&calls, 50, json!({"value": 8}))),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a, Ok(json!({"value": 7})));
        assert_eq!(b, Ok(json!({"value": 7})));
        assert_eq!(dedup.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_request_after_settlement_fetches_again() {
        let dedup = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = dedup.request("k", counting_fetcher(&calls, 1, json!(1))).await;
        let second = dedup.request("k", counting_fetcher(&calls, 1, json!(2))).await;

        assert_eq!(first, Ok(json!(1)));
        assert_eq!(second, Ok(json!(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_is_shared_and_cleared() {
        let dedup = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let failing = |calls: &Arc<AtomicUsize>| {
            let calls = Arc::clone(calls);
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    sleep(Duration::from_millis(20)).await;
                    Err::<Value, String>("backend down".to_string())
                }
            }
        };

        let (a, b) = tokio::join!(
            dedup.request("k", failing(&calls)),
            dedup.request("k", failing(&calls)),
        );

        assert_eq!(a, Err("backend down".to_string()));
        assert_eq!(b, Err("backend down".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!dedup.is_pending("k"));
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_coalesce() {
        let dedup = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            dedup.request("a", counting_fetcher(&calls, 10, json!("a"))),
            dedup.request("b", counting_fetcher(&calls, 10, json!("b"))),
        );

        assert_eq!(a, Ok(json!("a")));
        assert_eq!(b, Ok(json!("b")));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancel_detaches_without_aborting() {
        let dedup = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = tokio::spawn({
            let dedup = dedup.clone();
            let fetcher = counting_fetcher(&calls, 50, json!("first"));
            async move { dedup.request("k", fetcher).await }
        });

        while !dedup.is_pending("k") {
            tokio::task::yield_now().await;
        }
        assert!(dedup.cancel("k"));
        assert!(!dedup.cancel("k"));

        let second = tokio::spawn({
            let dedup = dedup.clone();
            let fetcher = counting_fetcher(&calls, 100, json!("second"));
            async move { dedup.request("k", fetcher).await }
        });

        // The detached fetch still completes for its own caller
        assert_eq!(first.await.unwrap(), Ok(json!("first")));
        // ...and does not clear the newer record
        assert!(dedup.is_pending("k"));

        assert_eq!(second.await.unwrap(), Ok(json!("second")));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!dedup.is_pending("k"));
    }

    #[tokio::test]
    async fn test_mismatched_types_fetch_separately() {
        let dedup = RequestDeduplicator::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let numeric = {
            let calls = Arc::clone(&calls);
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    sleep(Duration::from_millis(20)).await;
                    Ok::<u32, String>(5)
                }
            }
        };

        let (a, b) = tokio::join!(
            dedup.request("k", counting_fetcher(&calls, 20, json!("v"))),
            dedup.request("k", numeric),
        );

        assert_eq!(a, Ok(json!("v")));
        assert_eq!(b, Ok(5));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_abandoned_request_still_settles() {
        let dedup = RequestDeduplicator::new();
        let completed = Arc::new(AtomicUsize::new(0));

        let fetcher = {
            let completed = Arc::clone(&completed);
            move || async move {
                sleep(Duration::from_millis(30)).await;
                completed.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, String>(1)
            }
        };

        let timed_out = tokio::time::timeout(Duration::from_millis(10), dedup.request("k", fetcher)).await;
        assert!(timed_out.is_err());
        assert!(dedup.is_pending("k"));

        sleep(Duration::from_millis(200)).await;

        assert_eq!(completed.load(Ordering::SeqCst), 1);
        assert_eq!(dedup.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_shared_arc_outcome_is_same_reference() {
        let dedup = RequestDeduplicator::new();

        let make = || {
            || async {
                sleep(Duration::from_millis(20)).await;
                Ok::<Arc<Vec<u8>>, String>(Arc::new(vec![1, 2, 3]))
            }
        };

        let (a, b) = tokio::join!(dedup.request("k", make()), dedup.request("k", make()));

        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    }
}
