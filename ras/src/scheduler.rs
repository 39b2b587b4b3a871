//! Background scheduler: lease refresh and unsolicited status reports.
//!
//! One task per engine. It sleeps until the earliest deadline in
//! [`SchedulerTimers`](crate::state::SchedulerTimers) or until the engine
//! notifies it, then runs whatever is due. Failures are logged and retried
//! on a later tick; nothing here reaches a caller.

use std::sync::Arc;

use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::engine::EngineInner;
use crate::error::RasError;
use crate::registration::status_interval;
use crate::request::RequestClass;
use crate::state::RegistrationState;

pub(crate) async fn run(inner: Arc<EngineInner>) {
    debug!("scheduler started");
    loop {
        if inner.is_closed() {
            break;
        }
        let (deadline, reregister_now) = {
            let state = inner.lock();
            (state.timers.next_deadline(), state.timers.reregister_now)
        };
        if !reregister_now {
            let notified = match deadline {
                Some(at) => tokio::select! {
                    biased;
                    () = inner.wake.notified() => true,
                    () = sleep_until(at) => false,
                },
                None => {
                    inner.wake.notified().await;
                    true
                }
            };
            if notified {
                continue;
            }
        }
        if inner.is_closed() {
            break;
        }
        tick(&inner).await;
    }
    debug!("scheduler stopped");
}

/// Whether a failed refresh is worth another try.
fn retryable(err: &RasError) -> bool {
    err.is_unreachable()
        || matches!(
            err,
            RasError::TransientReject(_) | RasError::NoGatekeeper
        )
}

async fn tick(inner: &EngineInner) {
    let now = Instant::now();
    let (refresh_due, status_due, lost) = {
        let mut state = inner.lock();
        let refresh_due = state.timers.reregister_now
            || state.timers.next_refresh.is_some_and(|at| at <= now);
        let status_due = state.timers.next_status.is_some_and(|at| at <= now);
        if refresh_due {
            state.timers.next_refresh = None;
            state.timers.reregister_now = false;
        }
        if status_due {
            state.timers.next_status = None;
        }
        let lost = state.registration.state == RegistrationState::LostRegistration;
        (refresh_due, status_due, lost)
    };

    if refresh_due {
        if lost && !inner.config.auto_reregister {
            debug!("registration lost and auto-reregister disabled");
        } else if let Err(err) = inner.refresh_registration().await {
            warn!(%err, "registration refresh failed");
            if inner.config.auto_reregister && retryable(&err) {
                let retry = inner.config.policy(RequestClass::Registration).budget();
                let mut state = inner.lock();
                if state.timers.next_refresh.is_none() && !state.closed {
                    state.timers.next_refresh = Some(Instant::now() + retry);
                }
            }
        }
    }

    if status_due {
        if let Err(err) = inner.send_status_report().await {
            warn!(%err, "status report failed");
        }
        let mut state = inner.lock();
        if state.registration.is_registered() && state.timers.next_status.is_none() {
            if let Some(interval) = status_interval(&inner.config, state.gatekeeper_irr_interval) {
                state.timers.next_status = Some(Instant::now() + interval);
            }
        }
    }
}
