//! Call release reporting (DRQ). Best effort: nothing here fails the caller.

use tracing::{debug, info, warn};

use h323_messages::{DisengageReason, DisengageRejectReason, DisengageRequest, SecurityTokens};
use h323_types::SequenceNumber;

use crate::call::{CallRasOutcome, RasCall};
use crate::engine::EngineInner;
use crate::error::RasError;
use crate::request::Reply;

/// How a disengage ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisengageOutcome {
    Confirmed,
    Rejected(DisengageRejectReason),
    /// No answer, not registered, or the transport failed.
    Unconfirmed,
}

impl EngineInner {
    pub(crate) async fn disengage(
        &self,
        call: &dyn RasCall,
        reason: DisengageReason,
    ) -> DisengageOutcome {
        let outcome = match self.disengage_inner(call, reason).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(call = %call.call_identifier(), %err, "disengage failed");
                DisengageOutcome::Unconfirmed
            }
        };
        call.on_ras_outcome(&CallRasOutcome::Disengaged {
            confirmed: outcome == DisengageOutcome::Confirmed,
        });
        outcome
    }

    async fn disengage_inner(
        &self,
        call: &dyn RasCall,
        reason: DisengageReason,
    ) -> Result<DisengageOutcome, RasError> {
        let mut reregistered = false;
        loop {
            let (endpoint_identifier, gatekeeper_identifier) = self.call_context()?;
            let usage = call.usage();
            let drq = DisengageRequest {
                seq: SequenceNumber::FIRST,
                endpoint_identifier,
                conference_id: call.conference_id(),
                call_reference: call.call_reference(),
                disengage_reason: reason,
                call_identifier: call.call_identifier(),
                gatekeeper_identifier,
                answered_call: !call.is_originator(),
                termination_cause: usage.termination_cause,
                usage: (!usage.is_empty()).then_some(usage),
                security: SecurityTokens::default(),
            };

            match self.make_request(drq).await? {
                Reply::Confirm(_) => {
                    debug!(call = %call.call_identifier(), "call disengaged");
                    return Ok(DisengageOutcome::Confirmed);
                }
                Reply::Reject(drj)
                    if drj.reason == DisengageRejectReason::NotRegistered && !reregistered =>
                {
                    info!(call = %call.call_identifier(), "disengage needs re-registration");
                    reregistered = true;
                    self.reregister_for_call().await?;
                }
                Reply::Reject(drj) => {
                    warn!(call = %call.call_identifier(), reason = ?drj.reason, "disengage rejected");
                    return Ok(DisengageOutcome::Rejected(drj.reason));
                }
            }
        }
    }
}
