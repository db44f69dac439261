use std::future::Future;

use futures::future::try_join_all;
use tokio::sync::Semaphore;

use crate::error::{AppError, Result};

/// Maximum number of tasks a single batch runs at once.
pub const CONCURRENCY_LIMIT: usize = 20;

/// FIFO admission gate that bounds how many tasks run concurrently.
///
/// A task's thunk is only invoked once a slot is free; waiting tasks are
/// admitted in the order they were added.
pub struct WorkQueue {
    slots: Semaphore,
    limit: usize,
}

impl WorkQueue {
    pub fn new(limit: usize) -> Self {
        Self {
            slots: Semaphore::new(limit),
            limit,
        }
    }

    /// Number of tasks currently holding a slot.
    pub fn running(&self) -> usize {
        self.limit - self.slots.available_permits()
    }

    pub async fn add<F, Fut, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _permit = self
            .slots
            .acquire()
            .await
            .map_err(|e| AppError::Internal(format!("work queue closed: {e}")))?;
        task().await
    }

    /// Run `f` over every item under this queue.
    ///
    /// Results keep the input order. The first failure is returned as soon as
    /// it happens and the remaining tasks are dropped.
    pub async fn queue_all<I, F, Fut, T>(&self, items: I, f: F) -> Result<Vec<T>>
    where
        I: IntoIterator,
        F: Fn(I::Item) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let f = &f;
        try_join_all(
            items
                .into_iter()
                .map(|item| self.add(move || f(item))),
        )
        .await
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new(CONCURRENCY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[tokio::test]
    async fn test_never_exceeds_limit() {
        let queue = WorkQueue::new(3);
        let running = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        let results = queue
            .queue_all(0..12, |i| {
                let (running, peak, queue) = (&running, &peak, &queue);
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    assert!(queue.running() <= 3);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(i * 2)
                }
            })
            .await
            .unwrap();

        assert_eq!(results, (0..12).map(|i| i * 2).collect::<Vec<_>>());
        assert_eq!(peak.load(Ordering::SeqCst), 3);
        assert_eq!(queue.running(), 0);
    }

    #[tokio::test]
    async fn test_admits_in_fifo_order() {
        let queue = WorkQueue::new(1);
        let started = Mutex::new(Vec::new());

        queue
            .queue_all(0..5, |i| {
                let started = &started;
                async move {
                    started.lock().unwrap().push(i);
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    Ok(())
                }
            })
            .await
            .unwrap();

        assert_eq!(*started.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_thunk_deferred_until_slot_frees() {
        let queue = WorkQueue::new(1);
        let invoked = AtomicUsize::new(0);

        let first = queue.add(|| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(())
        });
        let second = queue.add(|| {
            invoked.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        });
        let probe = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            invoked.load(Ordering::SeqCst)
        };

        let (a, b, seen) = tokio::join!(first, second, probe);
        a.unwrap();
        b.unwrap();
        assert_eq!(seen, 0);
        assert_eq!(invoked.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_queue_all_fails_fast() {
        let queue = WorkQueue::new(2);
        let completed = AtomicUsize::new(0);

        let result = queue
            .queue_all(0..6, |i| {
                let completed = &completed;
                async move {
                    if i == 0 {
                        return Err(AppError::Internal("boom".to_string()));
                    }
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    completed.fetch_add(1, Ordering::SeqCst);
                    Ok(i)
                }
            })
            .await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        assert!(completed.load(Ordering::SeqCst) < 5);
    }
}
