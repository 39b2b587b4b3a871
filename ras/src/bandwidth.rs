//! Mid-call bandwidth change (BRQ).

use tracing::{debug, info, warn};

use h323_messages::{BandwidthRejectReason, BandwidthRequest, SecurityTokens};
use h323_types::{Bandwidth, SequenceNumber};

use crate::call::{CallRasOutcome, RasCall};
use crate::engine::EngineInner;
use crate::error::RasError;
use crate::request::Reply;

impl EngineInner {
    pub(crate) async fn change_bandwidth(
        &self,
        call: &dyn RasCall,
        bandwidth: Bandwidth,
    ) -> Result<Bandwidth, RasError> {
        let result = self.change_bandwidth_inner(call, bandwidth).await;
        let outcome = match &result {
            Ok(granted) => CallRasOutcome::BandwidthChanged(*granted),
            Err(err) => CallRasOutcome::BandwidthFailed(err.to_string()),
        };
        call.on_ras_outcome(&outcome);
        result
    }

    async fn change_bandwidth_inner(
        &self,
        call: &dyn RasCall,
        bandwidth: Bandwidth,
    ) -> Result<Bandwidth, RasError> {
        let mut reregistered = false;
        loop {
            let (endpoint_identifier, gatekeeper_identifier) = self.call_context()?;
            let usage = call.usage();
            let brq = BandwidthRequest {
                seq: SequenceNumber::FIRST,
                endpoint_identifier,
                conference_id: call.conference_id(),
                call_reference: call.call_reference(),
                call_identifier: call.call_identifier(),
                bandwidth,
                answered_call: !call.is_originator(),
                gatekeeper_identifier,
                usage: (!usage.is_empty()).then_some(usage),
                security: SecurityTokens::default(),
            };

            match self.make_request(brq).await? {
                Reply::Confirm(bcf) => {
                    call.set_bandwidth(bcf.bandwidth);
                    debug!(call = %call.call_identifier(), bandwidth = %bcf.bandwidth, "bandwidth changed");
                    return Ok(bcf.bandwidth);
                }
                Reply::Reject(brj)
                    if brj.reason == BandwidthRejectReason::NotBound && !reregistered =>
                {
                    info!(call = %call.call_identifier(), "bandwidth change needs re-registration");
                    reregistered = true;
                    self.reregister_for_call().await?;
                }
                Reply::Reject(brj) => {
                    warn!(
                        reason = ?brj.reason,
                        allowed = %brj.allowed_bandwidth,
                        "bandwidth change rejected"
                    );
                    return Err(RasError::BandwidthDenied {
                        reason: brj.reason,
                        allowed: brj.allowed_bandwidth,
                    });
                }
            }
        }
    }
}
