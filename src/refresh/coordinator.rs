//! RefreshCoordinator: periodic, single-flight data refresh
//!
//! Fetches data from an `UpdateSource` on a fixed interval. Each attempt runs in
//! its own tokio task bounded by a timeout. Outcomes are classified as fatal
//! (polling stops) or transient (last good data retained, retried next tick).
//! The current data is published whole through a watch channel.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::state::{RefreshState, RefreshStatus};
use crate::config::RefreshConfig;
use crate::error::UpdateError;

/// Something the coordinator can poll
#[async_trait]
pub trait UpdateSource<T>: Send + Sync {
    async fn fetch(&self) -> Result<T, UpdateError>;
}

#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    pub interval: Duration,
    pub timeout: Duration,
    pub max_consecutive_failures: Option<u32>,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(60),
            max_consecutive_failures: None,
        }
    }
}

impl From<&RefreshConfig> for RefreshPolicy {
    fn from(config: &RefreshConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs.max(1)),
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
            max_consecutive_failures: config.max_consecutive_failures,
        }
    }
}

/// Result of one successful fetch
#[derive(Debug)]
pub struct Snapshot<T> {
    pub data: Arc<T>,
    pub refreshed_at: DateTime<Utc>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            refreshed_at: self.refreshed_at,
        }
    }
}

/// Aborts the fetch task when dropped
struct FetchTask<T>(JoinHandle<Result<T, UpdateError>>);

impl<T> Drop for FetchTask<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct RefreshCoordinator<T> {
    name: String,
    source: Arc<dyn UpdateSource<T>>,
    policy: RefreshPolicy,
    /// Held for the whole duration of a fetch
    in_flight: Mutex<()>,
    current: watch::Sender<Option<Snapshot<T>>>,
    /// Updated after every attempt, successful or not
    status: watch::Sender<RefreshStatus>,
}

impl<T: Send + Sync + 'static> RefreshCoordinator<T> {
    pub fn new(
        name: impl Into<String>,
        source: Arc<dyn UpdateSource<T>>,
        policy: RefreshPolicy,
    ) -> Self {
        let (current, _) = watch::channel(None);
        let (status, _) = watch::channel(RefreshStatus::new());
        Self {
            name: name.into(),
            source,
            policy,
            in_flight: Mutex::new(()),
            current,
            status,
        }
    }

    /// Initial fetch during setup
    pub async fn first_refresh(&self) -> Result<Arc<T>, UpdateError> {
        tracing::info!("[Refresh] Initial {} fetch", self.name);
        self.refresh().await
    }

    /// Fetch once, publish on success and record the outcome
    pub async fn refresh(&self) -> Result<Arc<T>, UpdateError> {
        let _guard = self.in_flight.lock().await;

        if self.state() == RefreshState::Failed {
            return Err(UpdateError::Fatal(format!(
                "{} refresh stopped after a fatal error",
                self.name
            )));
        }

        let started = Instant::now();
        let outcome = self.run_fetch().await;
        let elapsed = started.elapsed().as_secs_f64();
        let now = Utc::now();

        match outcome {
            Ok(data) => {
                let data = Arc::new(data);
                if self.status.borrow().consecutive_failures > 0 {
                    tracing::info!("[Refresh] Fetching {} data recovered", self.name);
                }
                self.current.send_replace(Some(Snapshot {
                    data: Arc::clone(&data),
                    refreshed_at: now,
                }));
                self.status.send_modify(|status| status.record_success(now));
                tracing::debug!(
                    "[Refresh] Finished fetching {} data in {:.3}s (success: true)",
                    self.name,
                    elapsed
                );
                Ok(data)
            }
            Err(UpdateError::Transient(msg)) => {
                if self.status.borrow().consecutive_failures == 0 {
                    tracing::warn!("[Refresh] Error fetching {} data: {}", self.name, msg);
                } else {
                    tracing::debug!("[Refresh] Error fetching {} data: {}", self.name, msg);
                }
                let limit = self.policy.max_consecutive_failures;
                self.status
                    .send_modify(|status| status.record_transient(now, msg.clone(), limit));

                let status = self.status();
                if status.state == RefreshState::Failed {
                    tracing::error!(
                        "[Refresh] {} gave up after {} consecutive failures",
                        self.name,
                        status.consecutive_failures
                    );
                }
                tracing::debug!(
                    "[Refresh] Finished fetching {} data in {:.3}s (success: false)",
                    self.name,
                    elapsed
                );
                Err(UpdateError::Transient(msg))
            }
            Err(UpdateError::Fatal(msg)) => {
                tracing::error!("[Refresh] Fatal error fetching {} data: {}", self.name, msg);
                self.status
                    .send_modify(|status| status.record_fatal(now, msg.clone()));
                Err(UpdateError::Fatal(msg))
            }
        }
    }

    /// Run the source in its own task under the policy timeout.
    /// The task is aborted if the caller goes away or the timeout fires,
    /// so it never outlives the `in_flight` guard.
    async fn run_fetch(&self) -> Result<T, UpdateError> {
        let source = Arc::clone(&self.source);
        let mut task = FetchTask(tokio::spawn(async move { source.fetch().await }));

        match time::timeout(self.policy.timeout, &mut task.0).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(UpdateError::Transient(format!(
                "{} fetch task failed: {}",
                self.name, join_err
            ))),
            Err(_) => Err(UpdateError::Transient(format!(
                "Timeout fetching {} data after {}s",
                self.name,
                self.policy.timeout.as_secs()
            ))),
        }
    }

    /// Spawn the periodic loop; the first tick fires one interval from now
    pub fn start(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                "[Refresh] Starting {} refresh (interval: {}s)",
                self.name,
                self.policy.interval.as_secs()
            );

            let first_tick = Instant::now() + self.policy.interval;
            let mut timer = time::interval_at(first_tick, self.policy.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = timer.tick() => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                // Outcome already logged and recorded
                let _ = self.refresh().await;

                if self.state() == RefreshState::Failed {
                    tracing::error!("[Refresh] {} polling stopped", self.name);
                    break;
                }
            }

            tracing::info!("[Refresh] {} refresh loop exited", self.name);
        })
    }

    pub fn data(&self) -> Option<Arc<T>> {
        self.current.borrow().as_ref().map(|s| Arc::clone(&s.data))
    }

    pub fn snapshot(&self) -> Option<Snapshot<T>> {
        self.current.borrow().clone()
    }

    /// Receiver notified on every successful refresh
    pub fn subscribe(&self) -> watch::Receiver<Option<Snapshot<T>>> {
        self.current.subscribe()
    }

    /// Receiver notified after every refresh attempt
    pub fn subscribe_status(&self) -> watch::Receiver<RefreshStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> RefreshStatus {
        self.status.borrow().clone()
    }

    pub fn state(&self) -> RefreshState {
        self.status.borrow().state
    }

    pub fn last_update_success(&self) -> bool {
        self.status.borrow().last_update_success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::{assert_err, assert_ok};

    enum Step {
        Ok(Vec<u32>),
        Fail(UpdateError),
        Slow(Duration, Vec<u32>),
    }

    #[derive(Default)]
    struct ScriptedSource {
        steps: std::sync::Mutex<VecDeque<Step>>,
        calls: AtomicUsize,
        running: AtomicUsize,
        max_running: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                steps: std::sync::Mutex::new(steps.into()),
                ..Default::default()
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UpdateSource<Vec<u32>> for ScriptedSource {
        async fn fetch(&self) -> Result<Vec<u32>, UpdateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(running, Ordering::SeqCst);
            // Decrements even when the fetch is aborted mid-sleep
            let _running = Running(&self.running);

            let step = self.steps.lock().unwrap().pop_front();
            let result = match step {
                Some(Step::Ok(v)) => Ok(v),
                Some(Step::Fail(e)) => Err(e),
                Some(Step::Slow(d, v)) => {
                    time::sleep(d).await;
                    Ok(v)
                }
                None => Ok(Vec::new()),
            };

            result
        }
    }

    struct Running<'a>(&'a AtomicUsize);

    impl Drop for Running<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn coordinator(
        source: Arc<ScriptedSource>,
        policy: RefreshPolicy,
    ) -> Arc<RefreshCoordinator<Vec<u32>>> {
        Arc::new(RefreshCoordinator::new("test", source, policy))
    }

    fn transient(msg: &str) -> Step {
        Step::Fail(UpdateError::Transient(msg.to_string()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_publishes_data() {
        let source = ScriptedSource::new(vec![Step::Ok(vec![1, 2])]);
        let coord = coordinator(source.clone(), RefreshPolicy::default());
        let mut rx = coord.subscribe();

        assert_eq!(coord.state(), RefreshState::PendingFirstFetch);
        let data = assert_ok!(coord.first_refresh().await);

        assert_eq!(*data, vec![1, 2]);
        assert_eq!(coord.state(), RefreshState::Active);
        assert!(coord.last_update_success());
        assert!(rx.has_changed().unwrap());
        let published = rx.borrow_and_update().clone().unwrap();
        assert_eq!(*published.data, vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_transient_and_keeps_last_good() {
        let source = ScriptedSource::new(vec![
            Step::Ok(vec![7]),
            Step::Slow(Duration::from_secs(120), vec![8]),
        ]);
        let coord = coordinator(source, RefreshPolicy::default());
        assert_ok!(coord.first_refresh().await);

        let started = Instant::now();
        let err = assert_err!(coord.refresh().await);
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("Timeout"));
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert!(started.elapsed() < Duration::from_secs(120));

        assert_eq!(*coord.data().unwrap(), vec![7]);
        let status = coord.status();
        assert_eq!(status.state, RefreshState::Active);
        assert!(!status.last_update_success);
        assert_eq!(status.consecutive_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_fetch_transient_then_recovers() {
        let source =
            ScriptedSource::new(vec![transient("connection refused"), Step::Ok(vec![3])]);
        let coord = coordinator(source, RefreshPolicy::default());

        assert_err!(coord.first_refresh().await);
        assert_eq!(coord.state(), RefreshState::Retrying);
        assert!(coord.data().is_none());

        assert_ok!(coord.refresh().await);
        assert_eq!(coord.state(), RefreshState::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_stops_refreshing() {
        let source =
            ScriptedSource::new(vec![Step::Fail(UpdateError::Fatal("bad key".to_string()))]);
        let coord = coordinator(source.clone(), RefreshPolicy::default());

        let err = assert_err!(coord.first_refresh().await);
        assert!(err.is_fatal());
        assert_eq!(coord.state(), RefreshState::Failed);

        assert_err!(coord.refresh().await);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshes_are_single_flight() {
        let source = ScriptedSource::new(vec![
            Step::Slow(Duration::from_secs(5), vec![1]),
            Step::Slow(Duration::from_secs(5), vec![2]),
        ]);
        let coord = coordinator(source.clone(), RefreshPolicy::default());

        let (a, b) = tokio::join!(coord.refresh(), coord.refresh());
        assert_ok!(a);
        assert_ok!(b);
        assert_eq!(source.calls(), 2);
        assert_eq!(source.max_running.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_caller_aborts_fetch() {
        let source = ScriptedSource::new(vec![
            Step::Slow(Duration::from_secs(20), vec![1]),
            Step::Ok(vec![2]),
        ]);
        let coord = coordinator(source.clone(), RefreshPolicy::default());

        let caller = tokio::spawn({
            let coord = Arc::clone(&coord);
            async move { coord.refresh().await }
        });
        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(source.running.load(Ordering::SeqCst), 1);

        caller.abort();
        assert!(caller.await.unwrap_err().is_cancelled());
        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(source.running.load(Ordering::SeqCst), 0);

        let data = assert_ok!(coord.refresh().await);
        assert_eq!(*data, vec![2]);
        assert_eq!(source.calls(), 2);
        assert_eq!(source.max_running.load(Ordering::SeqCst), 1);

        // The abandoned fetch never publishes
        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(*coord.data().unwrap(), vec![2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_polls_on_interval() {
        let source = ScriptedSource::new(vec![
            Step::Ok(vec![1]),
            transient("dns failure"),
            Step::Ok(vec![2]),
        ]);
        let coord = coordinator(source.clone(), RefreshPolicy::default());
        assert_ok!(coord.first_refresh().await);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = Arc::clone(&coord).start(shutdown_rx);

        time::sleep(Duration::from_secs(31)).await;
        assert_eq!(source.calls(), 2);
        assert_eq!(*coord.data().unwrap(), vec![1]);
        assert!(!coord.last_update_success());

        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.calls(), 3);
        assert_eq!(*coord.data().unwrap(), vec![2]);

        shutdown_tx.send(true).unwrap();
        assert_ok!(handle.await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_stops_after_failure_limit() {
        let source = ScriptedSource::new(vec![
            Step::Ok(vec![1]),
            transient("reset"),
            transient("reset"),
        ]);
        let policy = RefreshPolicy {
            max_consecutive_failures: Some(1),
            ..RefreshPolicy::default()
        };
        let coord = coordinator(source.clone(), policy);
        assert_ok!(coord.first_refresh().await);

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = Arc::clone(&coord).start(shutdown_rx);

        assert_ok!(time::timeout(Duration::from_secs(300), handle).await);
        assert_eq!(coord.state(), RefreshState::Failed);
        assert_eq!(source.calls(), 3);
        assert_eq!(*coord.data().unwrap(), vec![1]);
    }
}
