//! Cancel-and-reschedule debounce combinator.
//!
//! Every [`Debouncer::trigger`] restarts the quiet period; the action runs
//! once the period elapses without another trigger.

use futures::future::BoxFuture;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

type Action = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

pub struct Debouncer {
    delay: Duration,
    action: Action,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new<F>(delay: Duration, action: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        Self {
            delay,
            action: Arc::new(action),
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule the action, replacing any schedule still waiting.
    ///
    /// Only the wait is cancelled: once the action has started it runs on
    /// its own task and a later trigger does not abort it. Must be called
    /// from within a tokio runtime.
    pub fn trigger(&self) {
        let delay = self.delay;
        let action = Arc::clone(&self.action);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(action());
        });

        let mut pending = self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = pending.replace(handle) {
            if !previous.is_finished() {
                debug!("Debounce rescheduled");
            }
            previous.abort();
        }
    }

    /// Drop a waiting schedule without running the action
    pub fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = pending.take() {
            previous.abort();
        }
    }

    /// Whether a schedule is still waiting for its quiet period
    pub fn is_pending(&self) -> bool {
        let pending = self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        pending.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(delay: Duration) -> (Debouncer, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let debouncer = Debouncer::new(delay, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        });
        (debouncer, runs)
    }

    #[tokio::test]
    async fn test_rapid_triggers_coalesce() {
        let (debouncer, runs) = counting(Duration::from_millis(40));

        for _ in 0..5 {
            debouncer.trigger();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(debouncer.is_pending());
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test]
    async fn test_spaced_triggers_each_run() {
        let (debouncer, runs) = counting(Duration::from_millis(10));

        debouncer.trigger();
        tokio::time::sleep(Duration::from_millis(80)).await;
        debouncer.trigger();
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancel_prevents_run() {
        let (debouncer, runs) = counting(Duration::from_millis(20));

        debouncer.trigger();
        debouncer.cancel();
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
