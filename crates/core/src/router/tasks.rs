//! Detached background work.
//!
//! Cache writes and background revalidations must never hold up the response
//! handed back to the host. They run as tracked tokio tasks whose outcome is
//! only visible through cache state, and a host (or a test) can wait for all
//! of them with [`BackgroundTasks::settle`].

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

#[derive(Clone, Default)]
pub struct BackgroundTasks {
    tracker: TaskTracker,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` onto the runtime. Dropping the returned handle detaches
    /// the task; it stays tracked until it finishes.
    pub fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tracker.spawn(task)
    }

    /// Tasks spawned and not yet finished.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every tracked task has completed, including tasks spawned
    /// by other tracked tasks while waiting.
    pub async fn settle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_settle_waits_for_nested_tasks() {
        let tasks = BackgroundTasks::new();
        let done = Arc::new(AtomicUsize::new(0));

        let inner_tasks = tasks.clone();
        let inner_done = done.clone();
        tasks.spawn(async move {
            tokio::task::yield_now().await;
            let d = inner_done.clone();
            inner_tasks.spawn(async move {
                tokio::task::yield_now().await;
                d.fetch_add(1, Ordering::SeqCst);
            });
            inner_done.fetch_add(1, Ordering::SeqCst);
        });

        tasks.settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 2);
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test]
    async fn test_spawn_after_settle_is_tracked() {
        let tasks = BackgroundTasks::new();
        tasks.settle().await;

        let done = Arc::new(AtomicUsize::new(0));
        let d = done.clone();
        tasks.spawn(async move {
            tokio::task::yield_now().await;
            d.fetch_add(1, Ordering::SeqCst);
        });

        tasks.settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handle_returns_output() {
        let tasks = BackgroundTasks::new();
        let handle = tasks.spawn(async { 7 });
        assert_eq!(handle.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_settle_with_nothing_pending() {
        BackgroundTasks::new().settle().await;
    }
}
