//! Inbound dispatch: responses go to the ledger, gatekeeper-initiated
//! requests (URQ, IRQ, SCI) are answered here.
//!
//! Runs on the transport's receive path, so nothing in this module awaits.

use tracing::{debug, info, trace, warn};

use h323_messages::{
    InfoRequest, RasMessage, SecurityTokens, ServiceControlIndication, ServiceControlResponse,
    ServiceControlResult, UnregRejectReason, UnregistrationConfirm, UnregistrationReject,
    UnregistrationRequest,
};
use h323_types::TransportAddress;

use crate::engine::EngineInner;
use crate::events::RasEvent;
use crate::ledger::Delivery;
use crate::state::{GatekeeperIdentity, RegistrationState};
use crate::status::CallFilter;

impl EngineInner {
    pub(crate) fn handle_message(&self, message: RasMessage, from: TransportAddress) {
        if self.is_closed() {
            return;
        }
        if message.kind().is_gatekeeper_initiated() {
            if !self.from_bound_gatekeeper(from) {
                warn!(%from, kind = message.abbreviation(), "request from unknown gatekeeper dropped");
                return;
            }
            if let Err(reason) = self.authenticators.validate(&message) {
                warn!(%from, kind = message.abbreviation(), %reason, "request failed authentication");
                self.metrics.auth_failures.inc();
                return;
            }
        }
        match message {
            RasMessage::UnregistrationRequest(urq) => self.on_unregistration_request(urq, from),
            RasMessage::InfoRequest(irq) => self.on_info_request(irq, from),
            RasMessage::ServiceControlIndication(sci) => self.on_service_control(sci, from),
            response => {
                let seq = response.sequence_number();
                let kind = response.abbreviation();
                match self.lock().ledger.deliver(response) {
                    Delivery::Delivered => trace!(%seq, kind, %from, "response delivered"),
                    Delivery::Unknown => debug!(%seq, kind, %from, "response for unknown sequence number dropped"),
                    Delivery::WrongKind => debug!(%seq, kind, %from, "response of the wrong kind dropped"),
                }
            }
        }
    }

    fn from_bound_gatekeeper(&self, from: TransportAddress) -> bool {
        self.lock()
            .gatekeeper
            .as_ref()
            .is_some_and(|gk| gk.ras_address.ip() == from.ip())
    }

    fn reply(&self, mut message: RasMessage, to: TransportAddress) {
        self.authenticators.prepare(&mut message);
        let kind = message.abbreviation();
        if let Err(err) = self.transport.send_to(&message, to) {
            warn!(%to, kind, %err, "cannot send reply");
        }
    }

    fn on_unregistration_request(&self, urq: UnregistrationRequest, from: TransportAddress) {
        let ours = self.lock().registration.endpoint_identifier.clone();
        let addressed_to_us = match (&urq.endpoint_identifier, &ours) {
            (Some(theirs), Some(ours)) => theirs == ours,
            (None, _) => true,
            (Some(_), None) => false,
        };
        if !addressed_to_us {
            debug!(seq = %urq.seq, "URQ for another endpoint refused");
            self.reply(
                UnregistrationReject {
                    seq: urq.seq,
                    reason: UnregRejectReason::NotCurrentlyRegistered,
                    alt_gk_info: None,
                    security: SecurityTokens::default(),
                }
                .into(),
                from,
            );
            return;
        }

        self.reply(
            UnregistrationConfirm {
                seq: urq.seq,
                security: SecurityTokens::default(),
            }
            .into(),
            from,
        );
        info!(reason = ?urq.reason, alternates = urq.alternate_gatekeepers.len(), "gatekeeper unregistered us");

        let auto = self.config.auto_reregister;
        let redirect = {
            let mut state = self.lock();
            state.registration.state = RegistrationState::LostRegistration;
            state.full_registration_required = true;
            state.timers.next_refresh = None;
            state.timers.reregister_now = auto;
            let using_alternate = state.using_alternate;
            if !urq.alternate_gatekeepers.is_empty() {
                state
                    .roster
                    .install(&urq.alternate_gatekeepers, false, using_alternate);
            }
            if auto && !urq.alternate_gatekeepers.is_empty() {
                state.roster.candidates().into_iter().next()
            } else {
                None
            }
        };
        self.metrics.registered.set(0);

        if let Some(alt) = redirect {
            let identity = GatekeeperIdentity {
                ras_address: alt.ras_address,
                identifier: alt.identifier.clone(),
            };
            match self.rebind(identity, true) {
                Ok(()) => {
                    self.metrics.failovers.inc();
                    self.events.emit(&RasEvent::FailedOver {
                        from: Some(from),
                        to: alt.ras_address,
                    });
                }
                Err(err) => warn!(to = %alt.ras_address, %err, "cannot bind alternate"),
            }
        }
        self.events
            .emit(&RasEvent::RegistrationLost { reason: urq.reason });
        if auto {
            self.notify_scheduler();
        }
    }

    fn on_info_request(&self, irq: InfoRequest, from: TransportAddress) {
        let filter = CallFilter::from_request(irq.call_reference, irq.call_identifier);
        let Some(irr) = self.build_status(irq.seq, filter, false) else {
            debug!(seq = %irq.seq, "IRQ while unregistered ignored");
            return;
        };
        let to = irq.reply_address.unwrap_or(from);
        debug!(seq = %irq.seq, %to, calls = irr.per_call_info.len(), "answering IRQ");
        self.reply(irr.into(), to);
    }

    fn on_service_control(&self, sci: ServiceControlIndication, from: TransportAddress) {
        self.reply(
            ServiceControlResponse {
                seq: sci.seq,
                result: Some(ServiceControlResult::Started),
                security: SecurityTokens::default(),
            }
            .into(),
            from,
        );
        debug!(seq = %sci.seq, sessions = sci.sessions.len(), "service control indication");
        self.events.emit(&RasEvent::ServiceControl {
            sessions: sci.sessions,
        });
    }
}
