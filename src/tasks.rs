//! Scoped background tasks that are aborted when their owner lets go of them.

use std::future::Future;

use tokio::task::JoinSet;

/// A set of spawned tasks cancelled together.
///
/// Backed by a [`JoinSet`], so dropping the set aborts every task it still
/// holds and an owner torn down on any path cannot leak timers.
#[derive(Debug, Default)]
pub struct ScopedTasks {
    set: JoinSet<()>,
}

impl ScopedTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `future` onto the current runtime and take ownership of it.
    pub fn spawn<F>(&mut self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.reap();
        self.set.spawn(future);
    }

    /// Abort every task in the set.
    pub fn cancel_all(&mut self) {
        self.set.abort_all();
        self.set.detach_all();
    }

    /// Number of tasks that have not finished yet.
    pub fn active(&mut self) -> usize {
        self.reap();
        self.set.len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.active() == 0
    }

    fn reap(&mut self) {
        while self.set.try_join_next().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_stops_tasks() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut tasks = ScopedTasks::new();
        let c = counter.clone();
        tasks.spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(10)).await;
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(55)).await;
        tasks.cancel_all();
        let seen = counter.load(Ordering::SeqCst);
        assert_eq!(seen, 5);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(counter.load(Ordering::SeqCst), seen);
        assert!(tasks.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_tasks() {
        let counter = Arc::new(AtomicU32::new(0));
        {
            let mut tasks = ScopedTasks::new();
            let c = counter.clone();
            tasks.spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                c.fetch_add(1, Ordering::SeqCst);
            });
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_tasks_are_reaped() {
        let mut tasks = ScopedTasks::new();
        tasks.spawn(async {});
        tasks.spawn(async {
            tokio::time::sleep(Duration::from_secs(1)).await;
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(tasks.active(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(tasks.is_empty());
    }
}
