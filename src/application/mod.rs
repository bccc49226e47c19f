//! Application layer containing the payment-confirmation core.
//!
//! This module defines the `StatusPoller`, which drives recurring status
//! queries against the gateway port and owns all per-session state.

pub mod poller;
