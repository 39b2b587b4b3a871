//! A scripted in-memory gatekeeper cluster.
//!
//! Answers whatever the engine sends through a [`NullTransport`] the way a
//! cooperative gatekeeper would, unless a [`Scripted`] step says otherwise.
//! Several gatekeepers (a primary and its alternates) can live in one
//! cluster; they share one registration table.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use h323_messages::{
    AdmissionConfirm, AdmissionReject, AdmissionRejectReason, AdmissionRequest, AltGkInfo,
    AlternateGatekeeperInfo, BandwidthConfirm, BandwidthReject, BandwidthRejectReason,
    BandwidthRequest, CallModel, DisengageConfirm, DisengageReject, DisengageRejectReason,
    DisengageRequest, GatekeeperConfirm, GatekeeperReject, GatekeeperRejectReason,
    GatekeeperRequest, InfoRequestAck, InfoRequestNak, InfoRequestNakReason, InfoRequestResponse,
    MessageKind, RasMessage, RegistrationConfirm, RegistrationReject, RegistrationRejectReason,
    RegistrationRequest, RequestInProgress, SecurityTokens, UnregRejectReason,
    UnregistrationConfirm, UnregistrationReject, UnregistrationRequest,
};
use h323_ras::AuthenticatorSet;
use h323_types::{Bandwidth, ClearToken, EndpointId, GatekeeperId, SequenceNumber, TransportAddress};

use crate::transport::NullTransport;

/// How one gatekeeper of the cluster behaves.
#[derive(Clone, Debug)]
pub struct GatekeeperSetup {
    pub identifier: Option<GatekeeperId>,
    /// Lease granted in RCF; `None` grants no expiry.
    pub lease_secs: Option<u32>,
    pub alternates: Vec<AlternateGatekeeperInfo>,
    /// Alternates go out in GCF and RCF, and as `altGKInfo` with this
    /// permanence flag in every scripted reject.
    pub alternates_permanent: bool,
    /// Issue this identifier instead of a generated `EP<n>`.
    pub endpoint_id: Option<String>,
    /// Answer multicast discovery.
    pub answer_discovery: bool,
    pub will_respond_to_irr: bool,
    /// `irrFrequency` put in every ACF.
    pub irr_frequency: Option<u16>,
    /// Sent in GCF and RCF, and in RRJ `registerWithAssignedGK`.
    pub assigned: Option<AlternateGatekeeperInfo>,
    /// Clear tokens attached to every ACF.
    pub acf_tokens: Vec<ClearToken>,
}

impl Default for GatekeeperSetup {
    fn default() -> Self {
        Self {
            identifier: None,
            lease_secs: Some(300),
            alternates: Vec::new(),
            alternates_permanent: false,
            endpoint_id: None,
            answer_discovery: true,
            will_respond_to_irr: false,
            irr_frequency: None,
            assigned: None,
            acf_tokens: Vec::new(),
        }
    }
}

/// A one-shot deviation from the default answer. Each step is consumed by
/// the first request it applies to, whichever gatekeeper receives it.
#[derive(Clone, Debug)]
pub enum Scripted {
    RejectDiscovery(GatekeeperRejectReason),
    RejectRegistration(RegistrationRejectReason),
    RejectUnregistration(UnregRejectReason),
    RejectAdmission(AdmissionRejectReason),
    RejectBandwidth(BandwidthRejectReason, Bandwidth),
    RejectDisengage(DisengageRejectReason),
    NakStatus(InfoRequestNakReason),
    /// Say nothing to the next request of this kind.
    Drop(MessageKind),
    /// Answer the next request of this kind with RequestInProgress only.
    InProgress(MessageKind, u16),
}

impl Scripted {
    fn applies_to(&self, kind: MessageKind) -> bool {
        match self {
            Self::RejectDiscovery(_) => kind == MessageKind::GatekeeperRequest,
            Self::RejectRegistration(_) => kind == MessageKind::RegistrationRequest,
            Self::RejectUnregistration(_) => kind == MessageKind::UnregistrationRequest,
            Self::RejectAdmission(_) => kind == MessageKind::AdmissionRequest,
            Self::RejectBandwidth(..) => kind == MessageKind::BandwidthRequest,
            Self::RejectDisengage(_) => kind == MessageKind::DisengageRequest,
            Self::NakStatus(_) => kind == MessageKind::InfoRequestResponse,
            Self::Drop(k) | Self::InProgress(k, _) => *k == kind,
        }
    }
}

struct Member {
    setup: GatekeeperSetup,
    online: bool,
}

#[derive(Default)]
struct Cluster {
    members: HashMap<TransportAddress, Member>,
    script: VecDeque<Scripted>,
    registered: HashSet<EndpointId>,
    issued: u32,
    authenticators: AuthenticatorSet,
}

/// One or more simulated gatekeepers behind a [`NullTransport`].
#[derive(Default)]
pub struct ScriptedGatekeeper {
    inner: Mutex<Cluster>,
}

impl ScriptedGatekeeper {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Cluster> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Add (or replace) a gatekeeper listening on `address`.
    pub fn add(&self, address: TransportAddress, setup: GatekeeperSetup) {
        self.lock().members.insert(
            address,
            Member {
                setup,
                online: true,
            },
        );
    }

    /// Answer everything `transport` sends.
    pub fn attach(self: &Arc<Self>, transport: &NullTransport) {
        let cluster = Arc::clone(self);
        transport.set_responder(Arc::new(move |message, to| cluster.respond(message, to)));
    }

    pub fn set_online(&self, address: TransportAddress, online: bool) {
        if let Some(member) = self.lock().members.get_mut(&address) {
            member.online = online;
        }
    }

    pub fn update(&self, address: TransportAddress, f: impl FnOnce(&mut GatekeeperSetup)) {
        if let Some(member) = self.lock().members.get_mut(&address) {
            f(&mut member.setup);
        }
    }

    pub fn script(&self, step: Scripted) {
        self.lock().script.push_back(step);
    }

    /// Steps not yet consumed.
    pub fn pending_script(&self) -> usize {
        self.lock().script.len()
    }

    /// Sign every answer with these authenticators.
    pub fn set_authenticators(&self, authenticators: AuthenticatorSet) {
        self.lock().authenticators = authenticators;
    }

    /// Simulate a gatekeeper restart: every endpoint is forgotten.
    pub fn forget_registrations(&self) {
        self.lock().registered.clear();
    }

    pub fn is_registered(&self, endpoint: &EndpointId) -> bool {
        self.lock().registered.contains(endpoint)
    }

    /// A gatekeeper-initiated URQ for `endpoint`, ready for
    /// [`NullTransport::deliver`].
    pub fn unregistration_request(
        seq: u16,
        endpoint: Option<EndpointId>,
        alternates: Vec<AlternateGatekeeperInfo>,
    ) -> RasMessage {
        UnregistrationRequest {
            seq: SequenceNumber::new(seq),
            call_signal_addresses: Vec::new(),
            endpoint_alias: Vec::new(),
            endpoint_identifier: endpoint,
            gatekeeper_identifier: None,
            reason: Some(h323_messages::UnregRequestReason::Maintenance),
            alternate_gatekeepers: alternates,
            security: SecurityTokens::default(),
        }
        .into()
    }

    fn respond(&self, message: &RasMessage, to: TransportAddress) -> Vec<(RasMessage, TransportAddress)> {
        let mut cluster = self.lock();
        let targets: Vec<TransportAddress> = if to == TransportAddress::discovery() {
            let mut online: Vec<TransportAddress> = cluster
                .members
                .iter()
                .filter(|(_, m)| m.online && m.setup.answer_discovery)
                .map(|(addr, _)| *addr)
                .collect();
            online.sort_by_key(|addr| addr.socket_addr());
            online
        } else if cluster.members.get(&to).is_some_and(|m| m.online) {
            vec![to]
        } else {
            Vec::new()
        };

        let mut replies = Vec::new();
        for gatekeeper in targets {
            if let Some(mut reply) = cluster.answer(message, gatekeeper) {
                cluster.authenticators.prepare(&mut reply);
                replies.push((reply, gatekeeper));
            }
        }
        replies
    }
}

impl Cluster {
    fn take_step(&mut self, kind: MessageKind) -> Option<Scripted> {
        let index = self.script.iter().position(|s| s.applies_to(kind))?;
        self.script.remove(index)
    }

    fn setup(&self, gatekeeper: TransportAddress) -> GatekeeperSetup {
        self.members
            .get(&gatekeeper)
            .map(|m| m.setup.clone())
            .unwrap_or_default()
    }

    fn answer(&mut self, message: &RasMessage, gatekeeper: TransportAddress) -> Option<RasMessage> {
        let seq = message.sequence_number();
        match self.take_step(message.kind()) {
            Some(Scripted::Drop(_)) => return None,
            Some(Scripted::InProgress(_, delay_ms)) => {
                return Some(
                    RequestInProgress {
                        seq,
                        delay_ms,
                        security: SecurityTokens::default(),
                    }
                    .into(),
                )
            }
            Some(step) => return Some(self.reject(step, seq, gatekeeper)),
            None => {}
        }
        let setup = self.setup(gatekeeper);
        match message {
            RasMessage::GatekeeperRequest(grq) => Some(self.discovery(grq, gatekeeper, &setup)),
            RasMessage::RegistrationRequest(rrq) => Some(self.registration(rrq, &setup)),
            RasMessage::UnregistrationRequest(urq) => Some(self.unregistration(urq)),
            RasMessage::AdmissionRequest(arq) => Some(self.admission(arq, &setup)),
            RasMessage::BandwidthRequest(brq) => Some(self.bandwidth(brq)),
            RasMessage::DisengageRequest(drq) => Some(self.disengage(drq)),
            RasMessage::InfoRequestResponse(irr) => self.status(irr),
            _ => None,
        }
    }

    fn reject(&self, step: Scripted, seq: SequenceNumber, gatekeeper: TransportAddress) -> RasMessage {
        let security = SecurityTokens::default();
        let setup = self.setup(gatekeeper);
        let alt_gk_info = (!setup.alternates.is_empty()).then(|| AltGkInfo {
            alternate_gatekeepers: setup.alternates.clone(),
            alt_gk_is_permanent: setup.alternates_permanent,
        });
        match step {
            Scripted::RejectDiscovery(reason) => GatekeeperReject {
                seq,
                gatekeeper_identifier: setup.identifier,
                reason,
                alt_gk_info,
                security,
            }
            .into(),
            Scripted::RejectRegistration(reason) => {
                let assigned = (reason == RegistrationRejectReason::RegisterWithAssignedGk)
                    .then(|| setup.assigned.clone())
                    .flatten();
                RegistrationReject {
                    seq,
                    reason,
                    gatekeeper_identifier: setup.identifier,
                    alt_gk_info,
                    assigned_gatekeeper: assigned,
                    security,
                }
                .into()
            }
            Scripted::RejectUnregistration(reason) => UnregistrationReject {
                seq,
                reason,
                alt_gk_info,
                security,
            }
            .into(),
            Scripted::RejectAdmission(reason) => AdmissionReject {
                seq,
                reason,
                alt_gk_info,
                security,
            }
            .into(),
            Scripted::RejectBandwidth(reason, allowed_bandwidth) => BandwidthReject {
                seq,
                reason,
                allowed_bandwidth,
                alt_gk_info,
                security,
            }
            .into(),
            Scripted::RejectDisengage(reason) => DisengageReject {
                seq,
                reason,
                alt_gk_info,
                security,
            }
            .into(),
            Scripted::NakStatus(reason) => InfoRequestNak {
                seq,
                reason,
                alt_gk_info,
                security,
            }
            .into(),
            // Consumed in `answer`.
            Scripted::Drop(_) | Scripted::InProgress(..) => InfoRequestAck { seq, security }.into(),
        }
    }

    fn discovery(
        &self,
        grq: &GatekeeperRequest,
        gatekeeper: TransportAddress,
        setup: &GatekeeperSetup,
    ) -> RasMessage {
        GatekeeperConfirm {
            seq: grq.seq,
            gatekeeper_identifier: setup.identifier.clone(),
            ras_address: gatekeeper,
            alternate_gatekeepers: setup.alternates.clone(),
            assigned_gatekeeper: setup.assigned.clone(),
            security: SecurityTokens::default(),
        }
        .into()
    }

    fn registration(&mut self, rrq: &RegistrationRequest, setup: &GatekeeperSetup) -> RasMessage {
        let known = rrq
            .endpoint_identifier
            .as_ref()
            .filter(|id| self.registered.contains(*id))
            .cloned();
        if rrq.is_lightweight() && known.is_none() {
            return RegistrationReject {
                seq: rrq.seq,
                reason: RegistrationRejectReason::FullRegistrationRequired,
                gatekeeper_identifier: setup.identifier.clone(),
                alt_gk_info: None,
                assigned_gatekeeper: None,
                security: SecurityTokens::default(),
            }
            .into();
        }
        let endpoint_identifier = known.unwrap_or_else(|| match &setup.endpoint_id {
            Some(id) => EndpointId::new(id.clone()),
            None => {
                self.issued += 1;
                EndpointId::new(format!("EP{}", self.issued))
            }
        });
        self.registered.insert(endpoint_identifier.clone());
        RegistrationConfirm {
            seq: rrq.seq,
            call_signal_addresses: Vec::new(),
            terminal_alias: rrq.terminal_alias.clone(),
            gatekeeper_identifier: setup.identifier.clone(),
            endpoint_identifier,
            alternate_gatekeepers: setup.alternates.clone(),
            time_to_live: setup.lease_secs,
            will_respond_to_irr: setup.will_respond_to_irr,
            assigned_gatekeeper: setup.assigned.clone(),
            security: SecurityTokens::default(),
        }
        .into()
    }

    fn unregistration(&mut self, urq: &UnregistrationRequest) -> RasMessage {
        if let Some(id) = &urq.endpoint_identifier {
            self.registered.remove(id);
        }
        UnregistrationConfirm {
            seq: urq.seq,
            security: SecurityTokens::default(),
        }
        .into()
    }

    fn admission(&self, arq: &AdmissionRequest, setup: &GatekeeperSetup) -> RasMessage {
        if !self.registered.contains(&arq.endpoint_identifier) {
            return AdmissionReject {
                seq: arq.seq,
                reason: AdmissionRejectReason::CallerNotRegistered,
                alt_gk_info: None,
                security: SecurityTokens::default(),
            }
            .into();
        }
        AdmissionConfirm {
            seq: arq.seq,
            bandwidth: arq.bandwidth,
            call_model: arq.call_model.unwrap_or(CallModel::Direct),
            dest_call_signal_address: arq.dest_call_signal_address,
            irr_frequency: setup.irr_frequency,
            destination_info: arq.destination_info.clone(),
            alternate_endpoints: Vec::new(),
            will_respond_to_irr: setup.will_respond_to_irr,
            security: SecurityTokens {
                clear: setup.acf_tokens.clone(),
                crypto: Vec::new(),
            },
        }
        .into()
    }

    fn bandwidth(&self, brq: &BandwidthRequest) -> RasMessage {
        if !self.registered.contains(&brq.endpoint_identifier) {
            return BandwidthReject {
                seq: brq.seq,
                reason: BandwidthRejectReason::NotBound,
                allowed_bandwidth: Bandwidth::ZERO,
                alt_gk_info: None,
                security: SecurityTokens::default(),
            }
            .into();
        }
        BandwidthConfirm {
            seq: brq.seq,
            bandwidth: brq.bandwidth,
            security: SecurityTokens::default(),
        }
        .into()
    }

    fn disengage(&self, drq: &DisengageRequest) -> RasMessage {
        if !self.registered.contains(&drq.endpoint_identifier) {
            return DisengageReject {
                seq: drq.seq,
                reason: DisengageRejectReason::NotRegistered,
                alt_gk_info: None,
                security: SecurityTokens::default(),
            }
            .into();
        }
        DisengageConfirm {
            seq: drq.seq,
            security: SecurityTokens::default(),
        }
        .into()
    }

    fn status(&self, irr: &InfoRequestResponse) -> Option<RasMessage> {
        if !irr.need_response {
            return None;
        }
        if !self.registered.contains(&irr.endpoint_identifier) {
            return Some(
                InfoRequestNak {
                    seq: irr.seq,
                    reason: InfoRequestNakReason::NotRegistered,
                    alt_gk_info: None,
                    security: SecurityTokens::default(),
                }
                .into(),
            );
        }
        Some(
            InfoRequestAck {
                seq: irr.seq,
                security: SecurityTokens::default(),
            }
            .into(),
        )
    }
}
