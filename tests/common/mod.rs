use paywatch::application::poller::PollerHooks;
use paywatch::domain::status::{
    PaymentStatus, StatusError, StatusPayload, StatusResult, StatusSnapshot,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Records every callback invocation so tests can assert on the full
/// sequence after the fact.
#[derive(Default)]
pub struct Recorder {
    statuses: Mutex<Vec<StatusResult>>,
    successes: Mutex<Vec<StatusResult>>,
    errors: Mutex<Vec<StatusError>>,
    timeouts: AtomicUsize,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn statuses(&self) -> Vec<StatusResult> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn successes(&self) -> Vec<StatusResult> {
        self.successes.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<StatusError> {
        self.errors.lock().unwrap().clone()
    }

    pub fn timeouts(&self) -> usize {
        self.timeouts.load(Ordering::SeqCst)
    }

    /// Total number of terminal callbacks observed, across all kinds.
    pub fn terminal_count(&self) -> usize {
        self.successes().len() + self.errors().len() + self.timeouts()
    }
}

/// Hooks that report every callback into `recorder`.
pub fn recording_hooks(recorder: &Arc<Recorder>) -> PollerHooks {
    let status_recorder = Arc::clone(recorder);
    let success_recorder = Arc::clone(recorder);
    let error_recorder = Arc::clone(recorder);
    let timeout_recorder = Arc::clone(recorder);
    PollerHooks::new()
        .on_status(move |result| {
            status_recorder
                .statuses
                .lock()
                .unwrap()
                .push(result.clone());
        })
        .on_success(move |result| {
            success_recorder
                .successes
                .lock()
                .unwrap()
                .push(result.clone());
        })
        .on_error(move |error| {
            error_recorder.errors.lock().unwrap().push(error.clone());
        })
        .on_timeout(move || {
            timeout_recorder.timeouts.fetch_add(1, Ordering::SeqCst);
        })
}

pub fn pending() -> StatusResult {
    Ok(StatusSnapshot::new(PaymentStatus::Pending))
}

pub fn paid() -> StatusResult {
    Ok(StatusSnapshot::new(PaymentStatus::Paid))
}

pub fn paid_with_order(order_id: &str) -> StatusResult {
    Ok(StatusSnapshot::with_payload(
        PaymentStatus::Paid,
        StatusPayload {
            order_id: Some(order_id.to_string()),
            ..Default::default()
        },
    ))
}

pub fn status(status: PaymentStatus) -> StatusResult {
    Ok(StatusSnapshot::new(status))
}

pub fn transient(message: &str) -> StatusResult {
    Err(StatusError::transient(message))
}

pub fn fatal(message: &str) -> StatusResult {
    Err(StatusError::fatal(message))
}
