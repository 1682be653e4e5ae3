//! Per-post alarm session management
//!
//! Each session is its own tokio task owned by the controller through a
//! JoinHandle. Cancellation is cooperative via a watch channel the session
//! observes inside its toggle loop, so worst-case stop latency is bounded by
//! one toggle interval. Every exit path - cancel, expiry, controller
//! shutdown - leaves the actuator off.

use crate::domain::types::{AlarmMode, PostId};
use crate::infra::metrics::Metrics;
use crate::io::actuator::AlarmActuator;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

struct SessionHandle {
    cancel_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
    sounding: Arc<AtomicBool>,
}

pub struct AlarmController {
    actuator: Arc<dyn AlarmActuator>,
    sessions: Mutex<HashMap<PostId, SessionHandle>>,
    toggle_cadence: Duration,
    metrics: Arc<Metrics>,
}

impl AlarmController {
    pub fn new(
        actuator: Arc<dyn AlarmActuator>,
        toggle_cadence: Duration,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { actuator, sessions: Mutex::new(HashMap::new()), toggle_cadence, metrics }
    }

    /// Start a session for a post, displacing any existing one first.
    ///
    /// The displaced session is cancelled and awaited before the new task
    /// spawns, so at most one session per post ever toggles the actuator.
    pub async fn start(&self, post_id: PostId, mode: AlarmMode) {
        if let Some(old) = self.remove_session(&post_id) {
            let _ = old.cancel_tx.send(true);
            if let Err(e) = old.task.await {
                warn!(post = %post_id, error = %e, "alarm_session_join_failed");
            }
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let sounding = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(run_session(
            post_id.clone(),
            mode,
            self.actuator.clone(),
            self.toggle_cadence,
            cancel_rx,
            sounding.clone(),
        ));

        self.metrics.record_alarm_started();
        self.sessions
            .lock()
            .insert(post_id, SessionHandle { cancel_tx, task, sounding });
    }

    /// Cancel a post's session if one is live.
    ///
    /// Returns true if a sounding session was actually cancelled; false when
    /// there was no session or it had already expired. Idempotent.
    pub async fn cancel(&self, post_id: &PostId) -> bool {
        let Some(handle) = self.remove_session(post_id) else {
            return false;
        };

        let was_sounding = handle.sounding.load(Ordering::Acquire);
        let _ = handle.cancel_tx.send(true);
        if let Err(e) = handle.task.await {
            warn!(post = %post_id, error = %e, "alarm_session_join_failed");
        }
        if was_sounding {
            self.metrics.record_alarm_cancelled();
        }
        was_sounding
    }

    /// Whether a session for the post is currently sounding
    pub fn is_sounding(&self, post_id: &PostId) -> bool {
        self.sessions
            .lock()
            .get(post_id)
            .map(|h| h.sounding.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    /// Number of live (still sounding) sessions
    pub fn live_sessions(&self) -> usize {
        self.sessions
            .lock()
            .values()
            .filter(|h| h.sounding.load(Ordering::Acquire))
            .count()
    }

    /// Cancel every session and wait for the tasks to finish.
    ///
    /// Called on coordinator shutdown; guarantees all actuators end off.
    pub async fn shutdown(&self) {
        let handles: Vec<(PostId, SessionHandle)> =
            self.sessions.lock().drain().collect();
        for (post_id, handle) in handles {
            let _ = handle.cancel_tx.send(true);
            if let Err(e) = handle.task.await {
                warn!(post = %post_id, error = %e, "alarm_session_join_failed");
            }
        }
    }

    fn remove_session(&self, post_id: &PostId) -> Option<SessionHandle> {
        self.sessions.lock().remove(post_id)
    }
}

/// One alarm session: toggle the actuator at the configured cadence until
/// cancelled or (in timed mode) expired, then force it off.
async fn run_session(
    post_id: PostId,
    mode: AlarmMode,
    actuator: Arc<dyn AlarmActuator>,
    cadence: Duration,
    mut cancel_rx: watch::Receiver<bool>,
    sounding: Arc<AtomicBool>,
) {
    info!(post = %post_id, mode = %mode, "alarm_started");

    let deadline = match mode {
        AlarmMode::Timed(duration) => Some(tokio::time::Instant::now() + duration),
        AlarmMode::Indefinite => None,
    };

    let mut toggle = tokio::time::interval(cadence);
    let mut on = false;
    let mut expired = false;

    loop {
        tokio::select! {
            changed = cancel_rx.changed() => {
                // A closed channel means the controller is gone; stop too
                if changed.is_err() || *cancel_rx.borrow() {
                    break;
                }
            }
            _ = async {
                match deadline {
                    Some(d) => tokio::time::sleep_until(d).await,
                    None => std::future::pending().await,
                }
            } => {
                expired = true;
                break;
            }
            _ = toggle.tick() => {
                on = !on;
                if on {
                    actuator.on().await;
                } else {
                    actuator.off().await;
                }
            }
        }
    }

    sounding.store(false, Ordering::Release);
    actuator.off().await;
    info!(post = %post_id, expired = %expired, "alarm_stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::time::sleep;

    /// Actuator that records every on/off call and its current state
    struct MockActuator {
        state: AtomicBool,
        calls: Mutex<Vec<bool>>,
    }

    impl MockActuator {
        fn new() -> Arc<Self> {
            Arc::new(Self { state: AtomicBool::new(false), calls: Mutex::new(Vec::new()) })
        }

        fn is_on(&self) -> bool {
            self.state.load(Ordering::Acquire)
        }

        fn call_count(&self) -> usize {
            self.calls.lock().len()
        }
    }

    #[async_trait]
    impl AlarmActuator for MockActuator {
        async fn on(&self) {
            self.state.store(true, Ordering::Release);
            self.calls.lock().push(true);
        }

        async fn off(&self) {
            self.state.store(false, Ordering::Release);
            self.calls.lock().push(false);
        }
    }

    fn controller(actuator: Arc<MockActuator>) -> AlarmController {
        AlarmController::new(actuator, Duration::from_millis(10), Arc::new(Metrics::new()))
    }

    #[tokio::test]
    async fn test_timed_session_expires_with_actuator_off() {
        let actuator = MockActuator::new();
        let alarms = controller(actuator.clone());

        alarms
            .start(PostId::from("x1"), AlarmMode::Timed(Duration::from_millis(50)))
            .await;
        assert!(alarms.is_sounding(&PostId::from("x1")));

        sleep(Duration::from_millis(120)).await;
        assert!(!alarms.is_sounding(&PostId::from("x1")));
        assert!(!actuator.is_on());
    }

    #[tokio::test]
    async fn test_indefinite_session_sounds_until_cancelled() {
        let actuator = MockActuator::new();
        let alarms = controller(actuator.clone());
        let id = PostId::from("x2");

        alarms.start(id.clone(), AlarmMode::Indefinite).await;
        sleep(Duration::from_millis(60)).await;
        assert!(alarms.is_sounding(&id));

        assert!(alarms.cancel(&id).await);
        assert!(!actuator.is_on());
        assert!(!alarms.is_sounding(&id));

        // No further toggles after cancellation
        let calls = actuator.call_count();
        sleep(Duration::from_millis(60)).await;
        assert_eq!(actuator.call_count(), calls);
    }

    #[tokio::test]
    async fn test_cancel_without_session_is_idempotent() {
        let alarms = controller(MockActuator::new());
        assert!(!alarms.cancel(&PostId::from("x1")).await);
        assert!(!alarms.cancel(&PostId::from("x1")).await);
    }

    #[tokio::test]
    async fn test_double_start_leaves_one_session() {
        let actuator = MockActuator::new();
        let alarms = controller(actuator.clone());
        let id = PostId::from("x3");

        alarms.start(id.clone(), AlarmMode::Indefinite).await;
        alarms.start(id.clone(), AlarmMode::Indefinite).await;

        assert_eq!(alarms.live_sessions(), 1);

        // A single cancel silences everything for the post
        assert!(alarms.cancel(&id).await);
        sleep(Duration::from_millis(40)).await;
        assert!(!actuator.is_on());
        let calls = actuator.call_count();
        sleep(Duration::from_millis(40)).await;
        assert_eq!(actuator.call_count(), calls);
    }

    #[tokio::test]
    async fn test_sessions_for_different_posts_are_independent() {
        let actuator = MockActuator::new();
        let alarms = controller(actuator.clone());

        alarms.start(PostId::from("x1"), AlarmMode::Indefinite).await;
        alarms.start(PostId::from("x2"), AlarmMode::Indefinite).await;
        assert_eq!(alarms.live_sessions(), 2);

        assert!(alarms.cancel(&PostId::from("x1")).await);
        assert!(alarms.is_sounding(&PostId::from("x2")));

        alarms.shutdown().await;
        assert_eq!(alarms.live_sessions(), 0);
        assert!(!actuator.is_on());
    }

    #[tokio::test]
    async fn test_cancel_expired_session_reports_no_alarm() {
        let actuator = MockActuator::new();
        let alarms = controller(actuator.clone());
        let id = PostId::from("x1");

        alarms.start(id.clone(), AlarmMode::Timed(Duration::from_millis(20))).await;
        sleep(Duration::from_millis(80)).await;

        // Session expired naturally; cancel reports nothing live
        assert!(!alarms.cancel(&id).await);
    }
}
