//! Call admission (ARQ).

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use h323_messages::{AdmissionConfirm, AdmissionRequest, CallModel, CallType, SecurityTokens};
use h323_types::{AliasAddress, Bandwidth, ClearToken, ObjectIdentifier, SequenceNumber, TransportAddress};

use crate::call::{CallRasOutcome, RasCall};
use crate::engine::EngineInner;
use crate::error::RasError;
use crate::registration::status_interval;
use crate::request::Reply;

/// What the call-control layer asks for.
#[derive(Clone, Debug, Default)]
pub struct AdmissionParams {
    pub destination: Vec<AliasAddress>,
    pub dest_call_signal_address: Option<TransportAddress>,
    /// Empty means the endpoint's own aliases.
    pub source: Vec<AliasAddress>,
    /// `None` means the call's current bandwidth.
    pub bandwidth: Option<Bandwidth>,
    pub call_type: CallType,
    pub call_model: Option<CallModel>,
    /// Clear tokens (e.g. a PIN or account) sent with the ARQ.
    pub credentials: Vec<ClearToken>,
}

/// A fallback destination offered by the gatekeeper.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdmittedAlternate {
    pub call_signal_addresses: Vec<TransportAddress>,
    pub aliases: Vec<AliasAddress>,
    pub access_token: Option<Vec<u8>>,
}

/// A granted admission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Admission {
    pub bandwidth: Bandwidth,
    pub call_model: CallModel,
    /// Where to send call signalling; may differ from what was asked for.
    pub dest_call_signal_address: Option<TransportAddress>,
    pub destination_aliases: Vec<AliasAddress>,
    pub access_token: Option<Vec<u8>>,
    pub alternate_endpoints: Vec<AdmittedAlternate>,
    /// How often the gatekeeper wants status reports for this call.
    pub irr_frequency: Option<Duration>,
}

/// Pull the payload of the first token matching `(token OID, payload OID)`.
/// Without a payload OID any non-standard payload of a matching token counts.
pub(crate) fn extract_access_token(
    tokens: &[ClearToken],
    matcher: &(ObjectIdentifier, Option<ObjectIdentifier>),
) -> Option<Vec<u8>> {
    let (token_oid, payload_oid) = matcher;
    tokens
        .iter()
        .filter(|t| &t.token_oid == token_oid)
        .filter_map(|t| t.non_standard.as_ref())
        .find(|data| payload_oid.as_ref().map_or(true, |oid| &data.oid == oid))
        .map(|data| data.data.clone())
}

impl EngineInner {
    pub(crate) async fn admit(
        &self,
        call: &dyn RasCall,
        params: AdmissionParams,
    ) -> Result<Admission, RasError> {
        let result = self.admit_inner(call, &params).await;
        let outcome = match &result {
            Ok(admission) => CallRasOutcome::Admitted {
                bandwidth: admission.bandwidth,
            },
            Err(err) => CallRasOutcome::AdmissionFailed(err.to_string()),
        };
        call.on_ras_outcome(&outcome);
        result
    }

    async fn admit_inner(
        &self,
        call: &dyn RasCall,
        params: &AdmissionParams,
    ) -> Result<Admission, RasError> {
        let mut reregistered = false;
        loop {
            let (endpoint_identifier, gatekeeper_identifier) = self.call_context()?;
            let usage = call.usage();
            let arq = AdmissionRequest {
                seq: SequenceNumber::FIRST,
                call_type: params.call_type,
                call_model: params.call_model,
                endpoint_identifier,
                destination_info: params.destination.clone(),
                dest_call_signal_address: params.dest_call_signal_address,
                src_info: if params.source.is_empty() {
                    self.endpoint.aliases()
                } else {
                    params.source.clone()
                },
                src_call_signal_address: self.endpoint.call_signal_addresses().first().copied(),
                bandwidth: params.bandwidth.unwrap_or_else(|| call.bandwidth()),
                call_reference: call.call_reference(),
                conference_id: call.conference_id(),
                call_identifier: call.call_identifier(),
                answer_call: !call.is_originator(),
                gatekeeper_identifier,
                usage: (!usage.is_empty()).then_some(usage),
                security: SecurityTokens {
                    clear: params.credentials.clone(),
                    crypto: Vec::new(),
                },
            };

            match self.make_request(arq).await? {
                Reply::Confirm(acf) => return Ok(self.accept_admission(call, acf)),
                Reply::Reject(arj) if arj.reason.is_registration_class() && !reregistered => {
                    info!(reason = ?arj.reason, call = %call.call_identifier(), "admission needs re-registration");
                    reregistered = true;
                    self.reregister_for_call().await?;
                }
                Reply::Reject(arj) => {
                    warn!(reason = ?arj.reason, call = %call.call_identifier(), "admission rejected");
                    return Err(RasError::CallAdmissionDenied(arj.reason));
                }
            }
        }
    }

    fn accept_admission(&self, call: &dyn RasCall, acf: AdmissionConfirm) -> Admission {
        call.set_bandwidth(acf.bandwidth);
        let irr_frequency = acf
            .irr_frequency
            .filter(|secs| *secs > 0)
            .map(|secs| Duration::from_secs(u64::from(secs)));

        if let Some(interval) = irr_frequency {
            let mut state = self.lock();
            state.gatekeeper_irr_interval = Some(interval);
            state.will_respond_to_irr |= acf.will_respond_to_irr;
            let interval = status_interval(&self.config, state.gatekeeper_irr_interval);
            if let Some(interval) = interval {
                let due = Instant::now() + interval;
                if state.timers.next_status.map_or(true, |at| at > due) {
                    state.timers.next_status = Some(due);
                }
            }
            drop(state);
            self.notify_scheduler();
        }

        let token = |tokens: &[ClearToken]| {
            self.access_token
                .as_ref()
                .and_then(|matcher| extract_access_token(tokens, matcher))
        };
        let admission = Admission {
            bandwidth: acf.bandwidth,
            call_model: acf.call_model,
            dest_call_signal_address: acf.dest_call_signal_address,
            access_token: token(&acf.security.clear),
            alternate_endpoints: acf
                .alternate_endpoints
                .iter()
                .map(|alt| AdmittedAlternate {
                    call_signal_addresses: alt.call_signal_addresses.clone(),
                    aliases: alt.aliases.clone(),
                    access_token: token(&alt.tokens),
                })
                .collect(),
            destination_aliases: acf.destination_info,
            irr_frequency,
        };
        debug!(
            call = %call.call_identifier(),
            bandwidth = %admission.bandwidth,
            alternates = admission.alternate_endpoints.len(),
            "call admitted"
        );
        admission
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use h323_types::NonStandardData;

    fn oid(s: &str) -> ObjectIdentifier {
        s.parse().unwrap()
    }

    fn token(token_oid: &str, payload_oid: &str, data: &[u8]) -> ClearToken {
        let mut t = ClearToken::new(oid(token_oid));
        t.non_standard = Some(NonStandardData {
            oid: oid(payload_oid),
            data: data.to_vec(),
        });
        t
    }

    #[test]
    fn access_token_matches_both_oids() {
        let tokens = vec![
            token("1.2.3", "9.9", b"wrong payload"),
            token("1.2.3", "4.5.6", b"right"),
        ];
        let matcher = (oid("1.2.3"), Some(oid("4.5.6")));
        assert_eq!(extract_access_token(&tokens, &matcher), Some(b"right".to_vec()));
    }

    #[test]
    fn access_token_without_payload_oid_takes_first() {
        let tokens = vec![token("7.7", "1.1", b"x"), token("1.2.3", "9.9", b"first")];
        let matcher = (oid("1.2.3"), None);
        assert_eq!(extract_access_token(&tokens, &matcher), Some(b"first".to_vec()));
    }

    #[test]
    fn no_matching_token() {
        let tokens = vec![ClearToken::new(oid("1.2.3"))];
        let matcher = (oid("1.2.3"), None);
        assert_eq!(extract_access_token(&tokens, &matcher), None);
    }
}
