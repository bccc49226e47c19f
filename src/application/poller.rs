use crate::domain::ports::StatusGatewayArc;
use crate::domain::status::{PaymentStatus, StatusError, StatusResult};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Timing and startup configuration for a [`StatusPoller`].
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Minimum spacing between the start of one query attempt and the next.
    /// Must be non-zero.
    pub interval: Duration,
    /// Maximum wall-clock duration a session may stay active before it is
    /// forced to the timeout outcome.
    pub timeout: Duration,
    /// Whether construction immediately begins polling.
    pub auto_start: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(3000),
            timeout: Duration::from_millis(300_000),
            auto_start: true,
        }
    }
}

type StatusCallback = Box<dyn Fn(&StatusResult) + Send + Sync>;
type ErrorCallback = Box<dyn Fn(&StatusError) + Send + Sync>;
type TimeoutCallback = Box<dyn Fn() + Send + Sync>;

/// Observer callbacks for one poller instance.
///
/// `on_status` fires after every completed attempt; the other three are
/// terminal and mutually exclusive within a session.
#[derive(Default)]
pub struct PollerHooks {
    on_status: Option<StatusCallback>,
    on_success: Option<StatusCallback>,
    on_error: Option<ErrorCallback>,
    on_timeout: Option<TimeoutCallback>,
}

impl PollerHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoked after every completed query attempt, success or error,
    /// before any terminal callback.
    pub fn on_status(mut self, callback: impl Fn(&StatusResult) + Send + Sync + 'static) -> Self {
        self.on_status = Some(Box::new(callback));
        self
    }

    /// Invoked once per session, on the first confirmed-paid result.
    pub fn on_success(mut self, callback: impl Fn(&StatusResult) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    /// Invoked once per session, on a fatal query error or a status that
    /// can never become paid (`FAILED`, `REFUNDED`).
    pub fn on_error(mut self, callback: impl Fn(&StatusError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Invoked once per session if the timeout elapses unresolved.
    pub fn on_timeout(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_timeout = Some(Box::new(callback));
        self
    }
}

/// Where a delivered result came from. Scheduled deliveries are dropped for
/// sessions that are no longer current; manual checks are user-initiated
/// and always recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Scheduled,
    Manual,
}

enum Terminal {
    Success,
    Failure(StatusError),
}

#[derive(Default)]
struct SessionState {
    active: bool,
    epoch: u64,
    started_at: Option<Instant>,
    last_result: Option<StatusResult>,
    is_paid: bool,
    terminal_fired: bool,
}

struct Inner {
    gateway: StatusGatewayArc,
    target_id: String,
    config: PollerConfig,
    hooks: PollerHooks,
    state: Mutex<SessionState>,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
}

/// Drives recurring payment-status checks for one invoice to exactly one
/// terminal outcome.
///
/// A session runs from `start()` until the first of: a confirmed-paid
/// result, a fatal or unrecoverable-status error, the configured timeout,
/// or an explicit `stop()`. The first terminal event wins; results from
/// attempts still in flight when the session ends are discarded.
///
/// The poller owns all of its session state. A screen that needs to watch
/// a different invoice constructs a new poller rather than retargeting a
/// live one.
pub struct StatusPoller {
    inner: Arc<Inner>,
}

impl StatusPoller {
    /// Creates a poller for `target_id` backed by `gateway`.
    ///
    /// With `auto_start` set (the default) this immediately begins polling,
    /// so it must be called within a tokio runtime.
    pub fn new(
        gateway: StatusGatewayArc,
        target_id: impl Into<String>,
        config: PollerConfig,
        hooks: PollerHooks,
    ) -> Self {
        let auto_start = config.auto_start;
        let poller = Self {
            inner: Arc::new(Inner {
                gateway,
                target_id: target_id.into(),
                config,
                hooks,
                state: Mutex::new(SessionState::default()),
                shutdown: Mutex::new(None),
            }),
        };
        if auto_start {
            poller.start();
        }
        poller
    }

    pub fn target_id(&self) -> &str {
        &self.inner.target_id
    }

    pub fn is_active(&self) -> bool {
        self.inner.state().active
    }

    /// True from the first confirmed-paid result for the lifetime of this
    /// instance; never reverts, even across restarts.
    pub fn is_paid(&self) -> bool {
        self.inner.state().is_paid
    }

    /// Most recent result delivered to observers, retained for synchronous
    /// re-reads.
    pub fn last_result(&self) -> Option<StatusResult> {
        self.inner.state().last_result.clone()
    }

    /// Begins a polling session. No-op while a session is already active.
    ///
    /// The first query is issued immediately rather than after the first
    /// interval tick. Subsequent attempts are spaced by the configured
    /// interval until a terminal outcome or `stop()`.
    pub fn start(&self) {
        let epoch = {
            let mut state = self.inner.state();
            if state.active {
                return;
            }
            state.active = true;
            state.epoch += 1;
            state.started_at = Some(Instant::now());
            state.terminal_fired = false;
            state.epoch
        };
        let (sender, receiver) = watch::channel(false);
        *self
            .inner
            .shutdown
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(sender);
        info!(target_id = %self.inner.target_id, epoch, "payment status polling started");
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.run_session(epoch, receiver).await;
        });
    }

    /// Tears the session down without invoking any callback. Idempotent.
    pub fn stop(&self) {
        {
            let mut state = self.inner.state();
            if !state.active {
                return;
            }
            state.active = false;
        }
        self.inner.signal_shutdown();
        debug!(target_id = %self.inner.target_id, "payment status polling stopped");
    }

    /// Performs a single query outside the recurring schedule.
    ///
    /// The result is recorded and classified under the same rules as a
    /// scheduled tick (so a paid or unrecoverable result still ends an
    /// active session), but a non-terminal result leaves the recurring
    /// timers untouched. Returns `None` when the session's timeout had
    /// already elapsed, in which case the timeout outcome fires instead of
    /// a query being issued.
    pub async fn check_status(&self) -> Option<StatusResult> {
        let (epoch, timed_out) = {
            let state = self.inner.state();
            let timed_out = state.active
                && state
                    .started_at
                    .is_some_and(|started| started.elapsed() >= self.inner.config.timeout);
            (state.epoch, timed_out)
        };
        if timed_out {
            self.inner.finish_timeout(epoch);
            return None;
        }
        let result = self.inner.gateway.query_status(&self.inner.target_id).await;
        self.inner.deliver(epoch, result.clone(), Origin::Manual);
        Some(result)
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        // Safety net for the owning screen going away mid-session.
        self.stop();
    }
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn signal_shutdown(&self) {
        let sender = self
            .shutdown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sender) = sender {
            let _ = sender.send(true);
        }
    }

    fn session_current(&self, epoch: u64) -> bool {
        let state = self.state();
        state.active && state.epoch == epoch
    }

    async fn run_session(self: Arc<Self>, epoch: u64, mut shutdown_rx: watch::Receiver<bool>) {
        let started = match self.state().started_at {
            Some(started) => started,
            None => return,
        };
        let deadline = time::sleep_until(started + self.config.timeout);
        tokio::pin!(deadline);
        let mut ticker = time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => break,
                _ = &mut deadline => {
                    self.finish_timeout(epoch);
                    break;
                }
                // The first tick completes immediately, giving the
                // query-right-away-on-start behavior.
                _ = ticker.tick() => {
                    if !self.session_current(epoch) {
                        break;
                    }
                    if started.elapsed() >= self.config.timeout {
                        self.finish_timeout(epoch);
                        break;
                    }
                    // The timeout may fire while this query is in flight;
                    // if it wins, the in-flight result is discarded.
                    let result = tokio::select! {
                        biased;
                        _ = shutdown_rx.changed() => break,
                        _ = &mut deadline => {
                            self.finish_timeout(epoch);
                            break;
                        }
                        result = self.gateway.query_status(&self.target_id) => result,
                    };
                    if self.deliver(epoch, result, Origin::Scheduled) {
                        break;
                    }
                }
            }
        }
    }

    /// Records one attempt's result and applies the terminal-outcome rules.
    /// Returns true when the session is over from the caller's perspective.
    fn deliver(&self, epoch: u64, result: StatusResult, origin: Origin) -> bool {
        let terminal = {
            let mut state = self.state();
            if origin == Origin::Scheduled && (!state.active || state.epoch != epoch) {
                // A terminal event or stop() won while this attempt was in
                // flight; the stale result is discarded entirely.
                return true;
            }
            state.last_result = Some(result.clone());
            let terminal = match &result {
                Ok(snapshot) if snapshot.status == PaymentStatus::Paid => {
                    state.is_paid = true;
                    Some(Terminal::Success)
                }
                Ok(snapshot) if snapshot.status.is_unrecoverable() => {
                    Some(Terminal::Failure(StatusError::fatal(format!(
                        "payment reported status {}",
                        snapshot.status
                    ))))
                }
                Ok(_) => None,
                Err(error) if error.is_fatal() => Some(Terminal::Failure(error.clone())),
                Err(_) => None,
            };
            match terminal {
                Some(_) if !state.terminal_fired => {
                    state.terminal_fired = true;
                    state.active = false;
                    terminal
                }
                // The terminal callback for this session already fired; a
                // manual check still records the result but reports
                // nothing beyond on_status.
                _ => None,
            }
        };

        if terminal.is_some() {
            self.signal_shutdown();
        }

        match &result {
            Ok(snapshot) => {
                debug!(target_id = %self.target_id, status = %snapshot.status, "status attempt completed");
            }
            Err(error) if error.is_fatal() => {
                warn!(target_id = %self.target_id, error = %error, "fatal status query failure");
            }
            Err(error) => {
                debug!(target_id = %self.target_id, error = %error, "transient status query failure, will retry");
            }
        }

        if let Some(callback) = &self.hooks.on_status {
            callback(&result);
        }

        match terminal {
            Some(Terminal::Success) => {
                info!(target_id = %self.target_id, "payment confirmed");
                if let Some(callback) = &self.hooks.on_success {
                    callback(&result);
                }
                true
            }
            Some(Terminal::Failure(error)) => {
                warn!(target_id = %self.target_id, error = %error, "payment can no longer complete");
                if let Some(callback) = &self.hooks.on_error {
                    callback(&error);
                }
                true
            }
            None => false,
        }
    }

    fn finish_timeout(&self, epoch: u64) {
        {
            let mut state = self.state();
            if !state.active || state.epoch != epoch || state.terminal_fired {
                return;
            }
            state.terminal_fired = true;
            state.active = false;
        }
        self.signal_shutdown();
        warn!(target_id = %self.target_id, "payment status polling timed out");
        if let Some(callback) = &self.hooks.on_timeout {
            callback();
        }
    }
}
