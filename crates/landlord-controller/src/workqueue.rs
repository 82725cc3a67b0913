use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

/// Rate-limited, deduplicating workqueue of item identifiers. A mutex-guarded
/// set + ordered list for the ready queue, a `tokio::sync::Notify` to unblock
/// `get()` — the channel+task-pair alternative, idiomatic in an all-`tokio`
/// stack.
///
/// `AddRateLimited` schedules its re-add on its own `tokio::spawn`'d sleep
/// rather than a timer heap: with a handful of in-flight tenants at a time
/// this is simpler and equally correct, at the cost of one task per
/// scheduled re-add instead of one thread for the whole queue.
pub struct WorkQueue<T> {
    inner: Mutex<Inner<T>>,
    notify: Notify,
    base_delay: Duration,
    max_delay: Duration,
}

struct Inner<T> {
    queue: VecDeque<T>,
    queued: HashSet<T>,
    processing: HashSet<T>,
    dirty: HashSet<T>,
    requeue_counts: HashMap<T, u32>,
    shutting_down: bool,
}

impl<T> Default for Inner<T> {
    fn default() -> Self {
        Inner {
            queue: VecDeque::new(),
            queued: HashSet::new(),
            processing: HashSet::new(),
            dirty: HashSet::new(),
            requeue_counts: HashMap::new(),
            shutting_down: false,
        }
    }
}

impl<T> WorkQueue<T>
where
    T: Eq + Hash + Clone + Send + Sync + 'static,
{
    pub fn new(base_delay: Duration, max_delay: Duration) -> Arc<Self> {
        Arc::new(WorkQueue {
            inner: Mutex::new(Inner::default()),
            notify: Notify::new(),
            base_delay,
            max_delay,
        })
    }

    /// Immediate, non-blocking. Adding an item already queued is a no-op;
    /// adding an item currently being processed marks it dirty so it
    /// re-queues itself the moment `done` is called.
    pub fn add(&self, item: T) {
        let mut inner = self.inner.lock().unwrap();
        if inner.shutting_down {
            return;
        }
        if inner.processing.contains(&item) {
            inner.dirty.insert(item);
            return;
        }
        if inner.queued.contains(&item) {
            return;
        }
        inner.queued.insert(item.clone());
        inner.queue.push_back(item);
        drop(inner);
        self.notify.notify_one();
    }

    /// Schedules a re-add after an exponential-backoff delay (base · 2^(k-1),
    /// capped at `max_delay`, where `k` is the failure count for `item`
    /// after this call). Does not block the caller.
    pub fn add_rate_limited(self: &Arc<Self>, item: T) {
        let delay = {
            let mut inner = self.inner.lock().unwrap();
            if inner.shutting_down {
                return;
            }
            let count = inner.requeue_counts.entry(item.clone()).or_insert(0);
            *count += 1;
            backoff_delay(self.base_delay, self.max_delay, *count)
        };
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.add(item);
        });
    }

    /// Resets the failure counter for `item`. Called on success.
    pub fn forget(&self, item: &T) {
        let mut inner = self.inner.lock().unwrap();
        inner.requeue_counts.remove(item);
    }

    /// Current failure counter for `item`, queried for retry-ceiling decisions.
    pub fn num_requeues(&self, item: &T) -> u32 {
        let inner = self.inner.lock().unwrap();
        inner.requeue_counts.get(item).copied().unwrap_or(0)
    }

    /// Blocks until an item is available or the queue is shut down.
    pub async fn get(&self) -> Option<T> {
        loop {
            {
                let mut inner = self.inner.lock().unwrap();
                if let Some(item) = inner.queue.pop_front() {
                    inner.queued.remove(&item);
                    inner.processing.insert(item.clone());
                    return Some(item);
                }
                if inner.shutting_down {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Marks `item` processed. Required after every `get`. If `item` was
    /// marked dirty (re-added while being processed), re-queues it now.
    pub fn done(&self, item: &T) {
        let mut inner = self.inner.lock().unwrap();
        inner.processing.remove(item);
        if inner.dirty.remove(item) && !inner.shutting_down {
            inner.queued.insert(item.clone());
            inner.queue.push_back(item.clone());
            drop(inner);
            self.notify.notify_one();
        }
    }

    /// Unblocks every waiting `get` with `None`. New `add` calls after
    /// `shut_down` are ignored.
    pub fn shut_down(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.shutting_down = true;
        drop(inner);
        self.notify.notify_waiters();
    }
}

fn backoff_delay(base: Duration, max: Duration, k: u32) -> Duration {
    let exponent = k.saturating_sub(1).min(31);
    let multiplier = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
    base.checked_mul(multiplier).unwrap_or(max).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> Arc<WorkQueue<u32>> {
        WorkQueue::new(Duration::from_secs(1), Duration::from_secs(300))
    }

    #[tokio::test]
    async fn add_dedups_before_get() {
        let q = queue();
        q.add(1);
        q.add(1);
        assert_eq!(q.get().await, Some(1));
        // Only one entry was ever queued — draining again blocks, so
        // race it against a timeout instead of calling get() directly.
        let got_second = tokio::time::timeout(Duration::from_millis(20), q.get()).await;
        assert!(got_second.is_err(), "expected no second item queued");
    }

    #[tokio::test]
    async fn add_while_processing_requeues_after_done() {
        let q = queue();
        q.add(1);
        let item = q.get().await.unwrap();
        q.add(item); // item is mid-processing — marks dirty, not requeued yet
        q.done(&item);
        assert_eq!(q.get().await, Some(1));
    }

    #[tokio::test]
    async fn forget_resets_requeue_count() {
        let q = queue();
        q.add_rate_limited(1);
        q.add_rate_limited(1);
        assert_eq!(q.num_requeues(&1), 2);
        q.forget(&1);
        assert_eq!(q.num_requeues(&1), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_add_follows_exponential_backoff() {
        let q = queue();
        q.add_rate_limited(1);
        assert_eq!(q.num_requeues(&1), 1);

        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(tokio::time::timeout(Duration::from_millis(1), q.get()).await.is_err());
        tokio::time::advance(Duration::from_millis(2)).await;
        assert_eq!(q.get().await, Some(1));
        q.done(&1);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_caps_at_max_delay() {
        let base = Duration::from_secs(1);
        let max = Duration::from_secs(5);
        for k in 1..10 {
            assert!(backoff_delay(base, max, k) <= max);
        }
        assert_eq!(backoff_delay(base, max, 10), max);
    }

    #[tokio::test]
    async fn shutdown_unblocks_waiting_get() {
        let q = queue();
        let q2 = Arc::clone(&q);
        let handle = tokio::spawn(async move { q2.get().await });
        tokio::task::yield_now().await;
        q.shut_down();
        assert_eq!(handle.await.unwrap(), None);
    }

    #[tokio::test]
    async fn add_after_shutdown_is_ignored() {
        let q = queue();
        q.shut_down();
        q.add(1);
        assert_eq!(q.get().await, None);
    }
}
