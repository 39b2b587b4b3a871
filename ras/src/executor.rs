//! Transaction executor: transmit, wait, retransmit, fail over.
//!
//! Every request gets a ledger entry for the whole of its life. The entry is
//! owned by a [`LedgerGuard`], so it is removed on every exit path: confirm,
//! reject, exhausted retries, engine shutdown, or the caller dropping the
//! future mid-wait.

use h323_messages::{RasMessage, RegistrationRequest};
use h323_types::{SequenceNumber, TransportAddress};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::engine::EngineInner;
use crate::error::RasError;
use crate::events::RasEvent;
use crate::ledger::LedgerEvent;
use crate::request::{RasRequest, Reply, RequestClass, Retarget};
use crate::roster::{failover_order, AltRegistrationState, AlternateGatekeeper};
use crate::state::GatekeeperIdentity;

/// Where a request goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Target {
    /// The gatekeeper the transport is bound to; eligible for failover.
    Bound,
    /// An explicit address (discovery); never fails over.
    Address(TransportAddress),
}

/// Removes a ledger entry when dropped.
struct LedgerGuard<'a> {
    inner: &'a EngineInner,
    seq: SequenceNumber,
}

impl Drop for LedgerGuard<'_> {
    fn drop(&mut self) {
        if self.inner.lock().ledger.remove(self.seq) {
            self.inner.metrics.pending_transactions.dec();
        }
    }
}

type Outcome<R> = Result<Reply<<R as RasRequest>::Confirm, <R as RasRequest>::Reject>, RasError>;

impl EngineInner {
    fn open_entry(
        &self,
        class: RequestClass,
    ) -> Result<(LedgerGuard<'_>, mpsc::UnboundedReceiver<LedgerEvent>), RasError> {
        let (seq, rx) = {
            let mut state = self.lock();
            if state.closed {
                return Err(RasError::ShuttingDown);
            }
            state.ledger.open(class)
        };
        self.metrics.pending_transactions.inc();
        Ok((LedgerGuard { inner: self, seq }, rx))
    }

    /// Run one request against one target with retransmission but no
    /// failover.
    pub(crate) async fn transact<R: RasRequest>(&self, mut request: R, target: Target) -> Outcome<R> {
        let (guard, mut rx) = self.open_entry(R::CLASS)?;
        request.set_sequence_number(guard.seq);
        let outcome = self.transmit(&request, guard.seq, &mut rx, target).await;
        if let Ok(reply) = &outcome {
            self.apply_reply_alternates::<R>(reply);
        }
        outcome
    }

    /// Run a request against the bound gatekeeper, walking the alternate
    /// roster if it cannot be reached.
    pub(crate) async fn make_request<R: RasRequest>(&self, mut request: R) -> Outcome<R> {
        let (guard, mut rx) = self.open_entry(R::CLASS)?;
        request.set_sequence_number(guard.seq);
        let outcome = match self.transmit(&request, guard.seq, &mut rx, Target::Bound).await {
            Err(err) if err.is_unreachable() && !self.is_closed() => {
                self.failover(&mut request, guard.seq, &mut rx, err).await
            }
            other => other,
        };
        if let Ok(reply) = &outcome {
            self.apply_reply_alternates::<R>(reply);
        }
        outcome
    }

    /// Send with retransmissions until a correlated answer arrives or the
    /// class policy is exhausted.
    async fn transmit<R: RasRequest>(
        &self,
        request: &R,
        seq: SequenceNumber,
        rx: &mut mpsc::UnboundedReceiver<LedgerEvent>,
        target: Target,
    ) -> Outcome<R> {
        let policy = self.config.policy(R::CLASS);
        let mut message: RasMessage = request.clone().into();
        self.authenticators.prepare(&mut message);
        let kind = message.abbreviation();
        let started = Instant::now();

        for attempt in 1..=policy.retries {
            if attempt > 1 {
                self.metrics.retransmissions.inc();
            }
            self.metrics.transmissions.with_label_values(&[kind]).inc();
            match target {
                Target::Bound => self.transport.send(&message)?,
                Target::Address(to) => self.transport.send_to(&message, to)?,
            }
            debug!(%seq, kind, attempt, "request sent");

            let mut deadline = Instant::now() + policy.timeout();
            loop {
                // After the timer fires, drain once more: a reject that
                // raced the timeout still settles the attempt.
                let event = tokio::select! {
                    biased;
                    event = rx.recv() => Some(event),
                    () = sleep_until(deadline) => rx.try_recv().ok().map(Some),
                };
                let Some(event) = event else {
                    break;
                };
                let message = match event {
                    None | Some(LedgerEvent::Aborted) => return Err(RasError::NoResponse),
                    Some(LedgerEvent::InProgress(delay)) => {
                        debug!(%seq, kind, ?delay, "request in progress");
                        deadline = Instant::now() + delay;
                        continue;
                    }
                    Some(LedgerEvent::Response(message)) => message,
                };

                if let Err(reason) = self.authenticators.validate(&message) {
                    warn!(%seq, kind, %reason, "response failed authentication");
                    self.metrics.auth_failures.inc();
                    self.events
                        .emit(&RasEvent::AuthenticationFailed { reason: reason.clone() });
                    return Err(RasError::SecurityDenied(reason));
                }
                let answer = message.abbreviation();
                let reply = match R::match_reply(message) {
                    Ok(reply) if request.accepts_reply(&reply) => reply,
                    Ok(_) => {
                        debug!(%seq, answer, "reply from another gatekeeper ignored");
                        continue;
                    }
                    Err(other) => {
                        debug!(%seq, kind = other.abbreviation(), "unmatched reply ignored");
                        continue;
                    }
                };
                if let Reply::Reject(_) = reply {
                    self.metrics.rejects.with_label_values(&[answer]).inc();
                }
                self.metrics
                    .transaction_latency_ms
                    .observe(started.elapsed().as_secs_f64() * 1000.0);
                debug!(%seq, answer, "transaction settled");
                return Ok(reply);
            }

            self.metrics.timeouts.inc();
            debug!(%seq, kind, attempt, "attempt timed out");
        }
        Err(RasError::NoResponse)
    }

    /// Walk the alternates, retrying `request` with its original sequence
    /// number against each until one answers.
    async fn failover<R: RasRequest>(
        &self,
        request: &mut R,
        seq: SequenceNumber,
        rx: &mut mpsc::UnboundedReceiver<LedgerEvent>,
        first_error: RasError,
    ) -> Outcome<R> {
        let (saved, candidates) = {
            let state = self.lock();
            let leaving = state.gatekeeper.as_ref().map(|g| g.ras_address);
            let order = failover_order(state.assigned.as_ref(), &state.roster, leaving);
            (state.gatekeeper.clone(), order)
        };
        if candidates.is_empty() {
            return Err(first_error);
        }

        let mut last_error = first_error;
        let mut from = saved.as_ref().map(|g| g.ras_address);
        for candidate in candidates {
            if self.is_closed() {
                return Err(RasError::NoResponse);
            }
            let identity = GatekeeperIdentity {
                ras_address: candidate.ras_address,
                identifier: candidate.identifier.clone(),
            };
            if let Err(err) = self.rebind(identity, true) {
                warn!(to = %candidate.ras_address, %err, "cannot bind alternate");
                last_error = err;
                continue;
            }
            self.metrics.failovers.inc();
            info!(from = ?from, to = %candidate.ras_address, %seq, "failing over");
            self.events.emit(&RasEvent::FailedOver {
                from,
                to: candidate.ras_address,
            });
            from = Some(candidate.ras_address);

            // A registration does its own; an unregistration has nothing to
            // lose by skipping it.
            if candidate.registration_state == AltRegistrationState::NeedToRegister
                && !matches!(
                    R::CLASS,
                    RequestClass::Registration | RequestClass::Unregistration
                )
            {
                if let Err(err) = self.preregister(&candidate).await {
                    warn!(gatekeeper = %candidate.ras_address, %err, "alternate pre-registration failed");
                    self.record_preregistration(candidate.ras_address, AltRegistrationState::RegistrationFailed);
                    last_error = err;
                    continue;
                }
                self.record_preregistration(candidate.ras_address, AltRegistrationState::Registered);
            }

            {
                let state = self.lock();
                let gatekeeper_identifier = state.gatekeeper.as_ref().and_then(|g| g.identifier.as_ref());
                request.retarget(&Retarget {
                    gatekeeper_identifier,
                    endpoint_identifier: state.registration.endpoint_identifier.as_ref(),
                });
            }
            match self.transmit(&*request, seq, rx, Target::Bound).await {
                Err(err) if err.is_unreachable() && !self.is_closed() => last_error = err,
                other => return other,
            }
        }

        // Registration walks stay on the last candidate; the lifecycle
        // controller decides where to go next.
        if R::CLASS != RequestClass::Registration {
            if let Some(primary) = saved {
                let address = primary.ras_address;
                match self.rebind(primary, false) {
                    Ok(()) => {
                        info!(gatekeeper = %address, "alternates exhausted, primary restored");
                        self.events.emit(&RasEvent::PrimaryRestored { address });
                    }
                    Err(err) => warn!(gatekeeper = %address, %err, "cannot restore primary"),
                }
            }
        }
        Err(last_error)
    }

    /// Note a pre-registration result on the roster entry and, if it is the
    /// same gatekeeper, on the assigned one.
    fn record_preregistration(&self, address: TransportAddress, outcome: AltRegistrationState) {
        let mut state = self.lock();
        if outcome == AltRegistrationState::RegistrationFailed {
            state.roster.mark_failed(address);
        } else {
            state.roster.mark_registered(address);
        }
        if let Some(assigned) = state.assigned.as_mut().filter(|a| a.ras_address == address) {
            assigned.registration_state = outcome;
        }
    }

    /// Full registration with an alternate that demands one before use.
    async fn preregister(&self, candidate: &AlternateGatekeeper) -> Result<(), RasError> {
        let rrq: RegistrationRequest = self.full_registration_request(candidate.identifier.clone());
        match self.transact(rrq, Target::Bound).await? {
            Reply::Confirm(rcf) => {
                self.apply_registration_confirm(&rcf, false);
                Ok(())
            }
            Reply::Reject(rrj) => Err(RasError::TransientReject(
                crate::error::RejectCause::Registration(rrj.reason),
            )),
        }
    }

    /// Point the transport at `identity`. Always unbind-then-bind, under the
    /// state lock.
    pub(crate) fn rebind(
        &self,
        identity: GatekeeperIdentity,
        using_alternate: bool,
    ) -> Result<(), RasError> {
        let mut state = self.lock();
        self.transport.unbind_remote();
        self.transport.bind_remote(identity.ras_address)?;
        state.gatekeeper = Some(identity);
        state.using_alternate = using_alternate;
        Ok(())
    }

    fn apply_reply_alternates<R: RasRequest>(&self, reply: &Reply<R::Confirm, R::Reject>) {
        let Some((list, permanent)) = R::reply_alternates(reply) else {
            return;
        };
        let mut state = self.lock();
        let using_alternate = state.using_alternate;
        if state.roster.install(list, permanent, using_alternate) {
            debug!(count = list.len(), permanent, "alternate gatekeepers installed");
        } else {
            debug!("transient alternates ignored, keeping permanent roster");
        }
    }
}
