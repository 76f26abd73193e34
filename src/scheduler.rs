use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Something that can run one status refresh pass
pub trait Refresh: Send + Sync {
    fn refresh(&self) -> Result<()>;
}

/// Periodically triggers a refresh pass until stopped
///
/// Passes run inline in the scheduler task, so at most one is in flight. A
/// failed pass is logged and the loop carries on with the next interval.
pub struct RefreshScheduler {
    stop_tx: Option<broadcast::Sender<()>>,
    task_handle: Option<JoinHandle<()>>,
}

impl RefreshScheduler {
    /// Start refreshing `target` every `interval`, first pass after one interval
    pub fn start(target: Arc<dyn Refresh>, interval: Duration) -> Self {
        let (stop_tx, mut stop_rx) = broadcast::channel(1);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop_rx.recv() => {
                        tracing::info!("Refresh scheduler stopped");
                        break;
                    }
                    _ = sleep(interval) => {}
                }

                if let Err(e) = target.refresh() {
                    tracing::error!("Error updating DIGI-5 status: {}", e);
                }
            }
        });

        Self {
            stop_tx: Some(stop_tx),
            task_handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the loop; a pass already running completes first
    pub async fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.task_handle.take() {
            // Give it a moment to stop gracefully
            let _ = tokio::time::timeout(Duration::from_millis(500), handle).await;
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Digi5Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        passes: AtomicUsize,
        fail: bool,
    }

    impl Refresh for Counter {
        fn refresh(&self) -> Result<()> {
            self.passes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Digi5Error::ConnectionClosed);
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_every_interval() {
        let counter = Arc::new(Counter::default());
        let mut scheduler = RefreshScheduler::start(counter.clone(), Duration::from_secs(1));

        sleep(Duration::from_millis(3500)).await;
        assert_eq!(counter.passes.load(Ordering::SeqCst), 3);
        assert!(scheduler.is_running());

        scheduler.stop().await;
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_pass_does_not_stop_loop() {
        let counter = Arc::new(Counter {
            passes: AtomicUsize::new(0),
            fail: true,
        });
        let mut scheduler = RefreshScheduler::start(counter.clone(), Duration::from_secs(10));

        sleep(Duration::from_secs(35)).await;
        assert_eq!(counter.passes.load(Ordering::SeqCst), 3);

        scheduler.stop().await;
        sleep(Duration::from_secs(30)).await;
        assert_eq!(counter.passes.load(Ordering::SeqCst), 3);
    }
}
