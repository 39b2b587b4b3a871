//! Integration tests driving a full engine against scripted gatekeepers:
//! discovery → registration → lease refresh → call transactions → failover
//! → shutdown.
//!
//! Time is paused, so retry and lease timings are checked exactly without
//! real waiting.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use h323_protocol::transport::RasTransport;
use tokio::time::{sleep, Instant};

use h323_messages::{
    AdmissionReject, AdmissionRejectReason, AlternateGatekeeperInfo, BandwidthRejectReason,
    DisengageReason, InfoRequest, MessageKind, RasMessage, RegistrationRejectReason,
    SecurityTokens,
};
use h323_nullables::{
    BindEvent, GatekeeperSetup, NullCall, NullEndpoint, NullTransport, Scripted,
    ScriptedGatekeeper,
};
use h323_ras::{
    AdmissionParams, AltRegistrationState, AuthenticatorSet, CallRasOutcome, DisengageOutcome,
    GatekeeperConfig, HmacAuthenticator, RasCall, RasConfig, RasEngine, RasError, RasEvent,
    RegistrationState, RejectCause, RetryPolicy,
};
use h323_types::{
    AliasAddress, Bandwidth, CallReference, EndpointId, GatekeeperId, SequenceNumber,
    TransportAddress,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const GK_A: &str = "10.0.0.1:1719";
const GK_B: &str = "10.0.0.2:1719";
const GK_C: &str = "10.0.0.3:1719";

fn addr(s: &str) -> TransportAddress {
    s.parse().expect("valid address")
}

fn alternate(s: &str, priority: u8) -> AlternateGatekeeperInfo {
    AlternateGatekeeperInfo {
        ras_address: addr(s),
        gatekeeper_identifier: None,
        need_to_register: false,
        priority,
    }
}

struct Harness {
    engine: Arc<RasEngine>,
    transport: Arc<NullTransport>,
    gatekeepers: Arc<ScriptedGatekeeper>,
    endpoint: Arc<NullEndpoint>,
    events: Arc<Mutex<Vec<RasEvent>>>,
}

impl Harness {
    fn events(&self) -> Vec<RasEvent> {
        self.events.lock().unwrap().clone()
    }

    fn sent_to(&self, kind: MessageKind) -> Vec<TransportAddress> {
        self.transport
            .sent_of(kind)
            .into_iter()
            .map(|(to, _)| to)
            .collect()
    }

    fn sequence_numbers(&self, kind: MessageKind) -> Vec<SequenceNumber> {
        self.transport
            .sent_of(kind)
            .into_iter()
            .map(|(_, m)| m.sequence_number())
            .collect()
    }
}

fn config_for(address: Option<&str>) -> RasConfig {
    RasConfig {
        gatekeeper: GatekeeperConfig {
            address: address.map(str::to_string),
            identifier: None,
        },
        ..RasConfig::default()
    }
}

fn harness_with(
    config: RasConfig,
    endpoint: NullEndpoint,
    gatekeepers: Vec<(&str, GatekeeperSetup)>,
) -> Harness {
    let transport = Arc::new(NullTransport::new(addr("192.0.2.10:1719")));
    let cluster = Arc::new(ScriptedGatekeeper::new());
    for (address, setup) in gatekeepers {
        cluster.add(addr(address), setup);
    }
    cluster.attach(&transport);
    let endpoint = Arc::new(endpoint);
    let engine = RasEngine::new(config, transport.clone(), endpoint.clone()).expect("engine");
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    engine.subscribe(Box::new(move |event| sink.lock().unwrap().push(event.clone())));
    Harness {
        engine: Arc::new(engine),
        transport,
        gatekeepers: cluster,
        endpoint,
        events,
    }
}

fn default_endpoint() -> NullEndpoint {
    NullEndpoint::new(
        vec![AliasAddress::h323_id("alice"), "4411".parse().unwrap()],
        vec![addr("192.0.2.10:1720")],
    )
}

fn harness(config: RasConfig, gatekeepers: Vec<(&str, GatekeeperSetup)>) -> Harness {
    harness_with(config, default_endpoint(), gatekeepers)
}

fn call() -> Arc<NullCall> {
    Arc::new(NullCall::outgoing(7, Bandwidth::from_kbps(128)))
}

fn params() -> AdmissionParams {
    AdmissionParams {
        destination: vec!["5500".parse().unwrap()],
        ..AdmissionParams::default()
    }
}

// ---------------------------------------------------------------------------
// 1. Discovery
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn broadcast_discovery_binds_the_answering_gatekeeper() {
    let h = harness(
        config_for(None),
        vec![
            (
                GK_A,
                GatekeeperSetup {
                    answer_discovery: false,
                    ..GatekeeperSetup::default()
                },
            ),
            (
                GK_B,
                GatekeeperSetup {
                    identifier: Some(GatekeeperId::new("zone-b").unwrap()),
                    ..GatekeeperSetup::default()
                },
            ),
        ],
    );

    h.engine.connect().await.expect("connect");

    assert_eq!(h.sent_to(MessageKind::GatekeeperRequest), vec![TransportAddress::discovery()]);
    let gk = h.engine.gatekeeper().expect("bound");
    assert_eq!(gk.ras_address, addr(GK_B));
    assert_eq!(gk.identifier, Some(GatekeeperId::new("zone-b").unwrap()));
    assert_eq!(h.transport.bindings(), vec![BindEvent::Bound(addr(GK_B))]);
    assert_eq!(h.sent_to(MessageKind::RegistrationRequest), vec![addr(GK_B)]);
    assert!(h.engine.is_registered());
    assert!(h
        .events()
        .iter()
        .any(|e| matches!(e, RasEvent::GatekeeperDiscovered { address, .. } if *address == addr(GK_B))));
    assert_eq!(h.engine.pending_transactions(), 0);
}

#[tokio::test(start_paused = true)]
async fn silent_network_means_no_gatekeeper() {
    let h = harness(config_for(None), vec![]);
    let started = Instant::now();

    let err = h.engine.discover_any().await.unwrap_err();

    assert!(matches!(err, RasError::NoGatekeeper));
    let policy = h.engine.config().retries.discovery;
    assert!(started.elapsed() >= policy.budget());
    assert_eq!(
        h.transport.count_of(MessageKind::GatekeeperRequest),
        policy.retries as usize
    );
    assert!(h.engine.gatekeeper().is_none());
    assert_eq!(h.engine.pending_transactions(), 0);
}

#[tokio::test(start_paused = true)]
async fn locating_a_zone_ignores_other_gatekeepers() {
    let zone = GatekeeperId::new("zone-c").unwrap();
    let h = harness(
        config_for(None),
        vec![
            (
                GK_A,
                GatekeeperSetup {
                    identifier: Some(GatekeeperId::new("zone-a").unwrap()),
                    ..GatekeeperSetup::default()
                },
            ),
            (
                GK_C,
                GatekeeperSetup {
                    identifier: Some(zone.clone()),
                    ..GatekeeperSetup::default()
                },
            ),
        ],
    );

    h.engine
        .use_gatekeeper(None, Some(zone.clone()))
        .await
        .expect("located");

    assert_eq!(h.engine.gatekeeper().unwrap().ras_address, addr(GK_C));
}

// ---------------------------------------------------------------------------
// 2. Registration and lease refresh
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn lease_is_refreshed_with_lightweight_rrq() {
    let h = harness(
        config_for(Some(GK_A)),
        vec![(
            GK_A,
            GatekeeperSetup {
                endpoint_id: Some("EP123".into()),
                lease_secs: Some(120),
                ..GatekeeperSetup::default()
            },
        )],
    );

    h.engine.connect().await.expect("connect");
    let registration = h.engine.registration();
    assert_eq!(registration.endpoint_identifier, Some(EndpointId::new("EP123")));
    assert_eq!(registration.lease, Some(Duration::from_secs(120)));
    let due = h.engine.next_refresh_in().expect("refresh scheduled");
    assert!(due <= Duration::from_secs(120));
    assert!(due >= Duration::from_secs(60));

    // No GRQ when the gatekeeper address is configured.
    assert_eq!(h.transport.count_of(MessageKind::GatekeeperRequest), 0);
    let RasMessage::RegistrationRequest(first) = &h.transport.sent_of(MessageKind::RegistrationRequest)[0].1
    else {
        unreachable!()
    };
    assert!(!first.discovery_complete);
    assert!(!first.keep_alive);

    sleep(Duration::from_secs(119)).await;

    let rrqs = h.transport.sent_of(MessageKind::RegistrationRequest);
    assert_eq!(rrqs.len(), 2);
    let RasMessage::RegistrationRequest(refresh) = &rrqs[1].1 else {
        unreachable!()
    };
    assert!(refresh.keep_alive);
    assert!(refresh.terminal_alias.is_empty());
    assert_eq!(refresh.endpoint_identifier, Some(EndpointId::new("EP123")));
    assert!(h.engine.is_registered());
    assert!(h
        .events()
        .iter()
        .any(|e| matches!(e, RasEvent::Registered { lightweight: true, .. })));
}

#[tokio::test(start_paused = true)]
async fn forgotten_endpoint_falls_back_to_full_registration() {
    let h = harness(
        config_for(Some(GK_A)),
        vec![(
            GK_A,
            GatekeeperSetup {
                lease_secs: Some(60),
                ..GatekeeperSetup::default()
            },
        )],
    );
    h.engine.connect().await.expect("connect");
    let first_id = h.engine.registration().endpoint_identifier.unwrap();
    h.gatekeepers.forget_registrations();

    sleep(Duration::from_secs(59)).await;

    let rrqs = h.transport.sent_of(MessageKind::RegistrationRequest);
    let kinds: Vec<bool> = rrqs
        .iter()
        .map(|(_, m)| match m {
            RasMessage::RegistrationRequest(rrq) => rrq.keep_alive,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(kinds, vec![false, true, false]);
    let new_id = h.engine.registration().endpoint_identifier.unwrap();
    assert_ne!(new_id, first_id);
    assert!(h.gatekeepers.is_registered(&new_id));
}

#[tokio::test(start_paused = true)]
async fn discovery_required_sends_a_fresh_grq() {
    let h = harness(config_for(Some(GK_A)), vec![(GK_A, GatekeeperSetup::default())]);
    h.gatekeepers
        .script(Scripted::RejectRegistration(RegistrationRejectReason::DiscoveryRequired));

    h.engine.connect().await.expect("connect");

    assert_eq!(h.sent_to(MessageKind::GatekeeperRequest), vec![addr(GK_A)]);
    let rrqs = h.transport.sent_of(MessageKind::RegistrationRequest);
    assert_eq!(rrqs.len(), 2);
    let RasMessage::RegistrationRequest(retry) = &rrqs[1].1 else {
        unreachable!()
    };
    assert!(retry.discovery_complete);
    assert_ne!(rrqs[0].1.sequence_number(), rrqs[1].1.sequence_number());
    assert!(h.engine.is_registered());
}

#[tokio::test(start_paused = true)]
async fn register_with_assigned_gatekeeper_follows_redirect() {
    let h = harness(
        config_for(Some(GK_A)),
        vec![
            (
                GK_A,
                GatekeeperSetup {
                    assigned: Some(alternate(GK_C, 0)),
                    ..GatekeeperSetup::default()
                },
            ),
            (GK_C, GatekeeperSetup::default()),
        ],
    );
    h.gatekeepers
        .script(Scripted::RejectRegistration(RegistrationRejectReason::RegisterWithAssignedGk));

    h.engine.connect().await.expect("connect");

    assert_eq!(h.sent_to(MessageKind::RegistrationRequest), vec![addr(GK_A), addr(GK_C)]);
    assert_eq!(h.engine.gatekeeper().unwrap().ras_address, addr(GK_C));
    assert_eq!(
        h.engine.assigned_gatekeeper().map(|a| a.ras_address),
        Some(addr(GK_C))
    );
}

#[tokio::test(start_paused = true)]
async fn duplicate_alias_is_permanent() {
    let h = harness(config_for(Some(GK_A)), vec![(GK_A, GatekeeperSetup::default())]);
    h.gatekeepers.script(Scripted::RejectRegistration(
        RegistrationRejectReason::DuplicateAlias(Vec::new()),
    ));

    let err = h.engine.connect().await.unwrap_err();

    assert!(matches!(err, RasError::PermanentReject(_)));
    assert_eq!(h.transport.count_of(MessageKind::RegistrationRequest), 1);
    assert_eq!(h.engine.registration().state, RegistrationState::Unregistered);
    assert!(h.engine.next_refresh_in().is_none());
}

#[tokio::test(start_paused = true)]
async fn corrective_retry_happens_only_once() {
    let h = harness(config_for(Some(GK_A)), vec![(GK_A, GatekeeperSetup::default())]);
    for _ in 0..2 {
        h.gatekeepers.script(Scripted::RejectRegistration(
            RegistrationRejectReason::FullRegistrationRequired,
        ));
    }

    let err = h.engine.connect().await.unwrap_err();

    assert!(matches!(
        err,
        RasError::TransientReject(RejectCause::Registration(
            RegistrationRejectReason::FullRegistrationRequired
        ))
    ));
    assert_eq!(h.transport.count_of(MessageKind::RegistrationRequest), 2);
    assert_eq!(h.engine.registration().state, RegistrationState::Unregistered);
}

#[tokio::test(start_paused = true)]
async fn repeated_discovery_required_gives_up_after_one_rediscovery() {
    let h = harness(config_for(Some(GK_A)), vec![(GK_A, GatekeeperSetup::default())]);
    for _ in 0..2 {
        h.gatekeepers
            .script(Scripted::RejectRegistration(RegistrationRejectReason::DiscoveryRequired));
    }

    let err = h.engine.connect().await.unwrap_err();

    assert!(matches!(err, RasError::TransientReject(_)));
    assert_eq!(h.transport.count_of(MessageKind::GatekeeperRequest), 1);
    assert_eq!(h.transport.count_of(MessageKind::RegistrationRequest), 2);
    assert!(!h.engine.is_registered());
}

#[tokio::test(start_paused = true)]
async fn unanswered_registration_stays_on_the_last_alternate() {
    let h = harness(
        config_for(Some(GK_A)),
        vec![
            (GK_A, primary_with_alternates()),
            (GK_B, GatekeeperSetup::default()),
            (GK_C, GatekeeperSetup::default()),
        ],
    );
    h.engine.connect().await.expect("connect");
    for gk in [GK_A, GK_B, GK_C] {
        h.gatekeepers.set_online(addr(gk), false);
    }
    h.transport.clear_sent();

    let err = h.engine.register().await.unwrap_err();

    assert!(matches!(err, RasError::NoResponse));
    assert_eq!(
        h.sent_to(MessageKind::RegistrationRequest),
        vec![
            addr(GK_A),
            addr(GK_A),
            addr(GK_B),
            addr(GK_B),
            addr(GK_C),
            addr(GK_C)
        ]
    );
    assert_eq!(h.engine.gatekeeper().unwrap().ras_address, addr(GK_C));
    assert_eq!(h.transport.remote(), Some(addr(GK_C)));
    assert!(!h
        .events()
        .iter()
        .any(|e| matches!(e, RasEvent::PrimaryRestored { .. })));
    assert_eq!(h.engine.pending_transactions(), 0);
}

#[tokio::test(start_paused = true)]
async fn unregister_forgets_the_registration() {
    let h = harness(config_for(Some(GK_A)), vec![(GK_A, GatekeeperSetup::default())]);
    h.engine.connect().await.expect("connect");
    let id = h.engine.registration().endpoint_identifier.unwrap();

    h.engine.unregister().await.expect("unregister");

    assert!(!h.engine.is_registered());
    assert!(h.engine.next_refresh_in().is_none());
    assert!(!h.gatekeepers.is_registered(&id));
    assert!(matches!(
        h.engine.unregister().await,
        Err(RasError::NotRegistered)
    ));
    assert_eq!(h.transport.count_of(MessageKind::UnregistrationRequest), 1);
}

// ---------------------------------------------------------------------------
// 3. Call-scoped transactions
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn admission_reregisters_after_caller_not_registered() {
    let h = harness(config_for(Some(GK_A)), vec![(GK_A, GatekeeperSetup::default())]);
    h.engine.connect().await.expect("connect");
    let before = h.engine.registration().endpoint_identifier.unwrap();
    h.gatekeepers.forget_registrations();
    let call = call();

    let admission = h.engine.admit(call.as_ref(), params()).await.expect("admitted");

    assert_eq!(admission.bandwidth, Bandwidth::from_kbps(128));
    let seqs = h.sequence_numbers(MessageKind::AdmissionRequest);
    assert_eq!(seqs.len(), 2);
    assert_ne!(seqs[0], seqs[1]);
    let after = h.engine.registration().endpoint_identifier.unwrap();
    assert_ne!(before, after);
    let RasMessage::AdmissionRequest(retry) = &h.transport.sent_of(MessageKind::AdmissionRequest)[1].1
    else {
        unreachable!()
    };
    assert_eq!(retry.endpoint_identifier, after);
    assert_eq!(
        call.outcomes(),
        vec![CallRasOutcome::Admitted {
            bandwidth: Bandwidth::from_kbps(128)
        }]
    );
    assert_eq!(h.engine.pending_transactions(), 0);
}

#[tokio::test(start_paused = true)]
async fn admission_reject_is_reported_to_the_call() {
    let h = harness(config_for(Some(GK_A)), vec![(GK_A, GatekeeperSetup::default())]);
    h.engine.connect().await.expect("connect");
    h.gatekeepers
        .script(Scripted::RejectAdmission(AdmissionRejectReason::CalledPartyNotRegistered));
    let call = call();

    let err = h.engine.admit(call.as_ref(), params()).await.unwrap_err();

    assert!(matches!(
        err,
        RasError::CallAdmissionDenied(AdmissionRejectReason::CalledPartyNotRegistered)
    ));
    assert!(matches!(
        call.outcomes().as_slice(),
        [CallRasOutcome::AdmissionFailed(_)]
    ));
    assert_eq!(h.transport.count_of(MessageKind::AdmissionRequest), 1);
}

#[tokio::test(start_paused = true)]
async fn unanswered_admission_takes_retries_times_timeout() {
    let mut config = config_for(Some(GK_A));
    config.retries.admission = RetryPolicy::new(500, 3);
    let h = harness(config, vec![(GK_A, GatekeeperSetup::default())]);
    h.engine.connect().await.expect("connect");
    h.gatekeepers.set_online(addr(GK_A), false);
    let started = Instant::now();

    let err = h.engine.admit(call().as_ref(), params()).await.unwrap_err();

    let elapsed = started.elapsed();
    assert!(matches!(err, RasError::NoResponse));
    assert!(elapsed >= Duration::from_millis(1500), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(1600), "{elapsed:?}");
    let seqs = h.sequence_numbers(MessageKind::AdmissionRequest);
    assert_eq!(seqs.len(), 3);
    assert!(seqs.iter().all(|s| *s == seqs[0]));
    assert_eq!(h.engine.pending_transactions(), 0);
}

#[tokio::test(start_paused = true)]
async fn reject_ready_at_the_deadline_settles_the_attempt() {
    let mut config = config_for(Some(GK_A));
    config.retries.admission = RetryPolicy::new(500, 1);
    let h = harness(config, vec![(GK_A, GatekeeperSetup::default())]);
    h.engine.connect().await.expect("connect");
    h.gatekeepers.set_online(addr(GK_A), false);

    let engine = Arc::clone(&h.engine);
    let call = call();
    let pending = tokio::spawn(async move { engine.admit(call.as_ref(), params()).await });
    sleep(Duration::from_millis(499)).await;
    let seq = h.sequence_numbers(MessageKind::AdmissionRequest)[0];
    // Queue the reject and move onto the deadline before the engine runs
    // again, so the answer and the timer are ready together.
    h.transport.deliver(
        AdmissionReject {
            seq,
            reason: AdmissionRejectReason::RequestDenied,
            alt_gk_info: None,
            security: SecurityTokens::default(),
        }
        .into(),
        addr(GK_A),
    );
    tokio::time::advance(Duration::from_millis(1)).await;

    let result = pending.await.expect("task");
    assert!(matches!(
        result,
        Err(RasError::CallAdmissionDenied(AdmissionRejectReason::RequestDenied))
    ));
    assert_eq!(h.transport.count_of(MessageKind::AdmissionRequest), 1);
    assert_eq!(h.engine.metrics().timeouts.get(), 0);
    assert_eq!(h.engine.pending_transactions(), 0);
}

#[tokio::test(start_paused = true)]
async fn request_in_progress_extends_the_wait() {
    let mut config = config_for(Some(GK_A));
    config.retries.admission = RetryPolicy::new(1_000, 2);
    let h = harness(config, vec![(GK_A, GatekeeperSetup::default())]);
    h.engine.connect().await.expect("connect");
    h.gatekeepers
        .script(Scripted::InProgress(MessageKind::AdmissionRequest, 5_000));
    let started = Instant::now();

    h.engine
        .admit(call().as_ref(), params())
        .await
        .expect("admitted after RIP");

    assert!(started.elapsed() >= Duration::from_secs(5));
    assert_eq!(h.transport.count_of(MessageKind::AdmissionRequest), 2);
}

#[tokio::test(start_paused = true)]
async fn bandwidth_change_updates_the_call() {
    let h = harness(config_for(Some(GK_A)), vec![(GK_A, GatekeeperSetup::default())]);
    h.engine.connect().await.expect("connect");
    let call = call();

    let granted = h
        .engine
        .change_bandwidth(call.as_ref(), Bandwidth::from_kbps(384))
        .await
        .expect("granted");

    assert_eq!(granted, Bandwidth::from_kbps(384));
    assert_eq!(call.bandwidth(), Bandwidth::from_kbps(384));

    h.gatekeepers.script(Scripted::RejectBandwidth(
        BandwidthRejectReason::InsufficientResources,
        Bandwidth::from_kbps(256),
    ));
    let err = h
        .engine
        .change_bandwidth(call.as_ref(), Bandwidth::from_kbps(2_048))
        .await
        .unwrap_err();
    match err {
        RasError::BandwidthDenied { reason, allowed } => {
            assert_eq!(reason, BandwidthRejectReason::InsufficientResources);
            assert_eq!(allowed, Bandwidth::from_kbps(256));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(call.bandwidth(), Bandwidth::from_kbps(384));
}

#[tokio::test(start_paused = true)]
async fn disengage_swallows_transport_failure() {
    let h = harness(config_for(Some(GK_A)), vec![(GK_A, GatekeeperSetup::default())]);
    h.engine.connect().await.expect("connect");
    let call = call();
    h.transport.fail_sends(true);

    let outcome = h.engine.disengage(call.as_ref(), DisengageReason::NormalDrop).await;

    assert_eq!(outcome, DisengageOutcome::Unconfirmed);
    assert_eq!(
        call.outcomes(),
        vec![CallRasOutcome::Disengaged { confirmed: false }]
    );
    assert_eq!(h.engine.pending_transactions(), 0);
}

#[tokio::test(start_paused = true)]
async fn disengage_confirmed() {
    let h = harness(config_for(Some(GK_A)), vec![(GK_A, GatekeeperSetup::default())]);
    h.engine.connect().await.expect("connect");
    let call = call();

    let outcome = h.engine.disengage(call.as_ref(), DisengageReason::NormalDrop).await;

    assert_eq!(outcome, DisengageOutcome::Confirmed);
}

#[tokio::test(start_paused = true)]
async fn call_transactions_need_a_registration() {
    let h = harness(config_for(Some(GK_A)), vec![(GK_A, GatekeeperSetup::default())]);

    let err = h.engine.admit(call().as_ref(), params()).await.unwrap_err();

    assert!(matches!(err, RasError::NotRegistered));
    assert!(h.transport.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn access_token_is_extracted_from_acf() {
    use h323_types::{ClearToken, NonStandardData};

    let mut config = config_for(Some(GK_A));
    config.access_token_oids = Some(h323_ras::AccessTokenOids {
        token_oid: "1.3.6.1.4.1.17090.0.5".into(),
        payload_oid: Some("1.3.6.1.4.1.17090.0.6".into()),
    });
    let mut token = ClearToken::new("1.3.6.1.4.1.17090.0.5".parse().unwrap());
    token.non_standard = Some(NonStandardData {
        oid: "1.3.6.1.4.1.17090.0.6".parse().unwrap(),
        data: b"route-42".to_vec(),
    });
    let h = harness(
        config,
        vec![(
            GK_A,
            GatekeeperSetup {
                acf_tokens: vec![token],
                ..GatekeeperSetup::default()
            },
        )],
    );
    h.engine.connect().await.expect("connect");

    let admission = h.engine.admit(call().as_ref(), params()).await.expect("admitted");

    assert_eq!(admission.access_token, Some(b"route-42".to_vec()));
}

// ---------------------------------------------------------------------------
// 4. Alternate gatekeepers
// ---------------------------------------------------------------------------

fn primary_with_alternates() -> GatekeeperSetup {
    GatekeeperSetup {
        alternates: vec![alternate(GK_C, 2), alternate(GK_B, 1)],
        ..GatekeeperSetup::default()
    }
}

#[tokio::test(start_paused = true)]
async fn failover_retries_the_same_sequence_number_on_an_alternate() {
    let h = harness(
        config_for(Some(GK_A)),
        vec![
            (GK_A, primary_with_alternates()),
            (GK_B, GatekeeperSetup::default()),
            (GK_C, GatekeeperSetup::default()),
        ],
    );
    h.engine.connect().await.expect("connect");
    let ranked: Vec<TransportAddress> = h.engine.alternates().iter().map(|a| a.ras_address).collect();
    assert_eq!(ranked, vec![addr(GK_B), addr(GK_C)]);
    h.gatekeepers.set_online(addr(GK_A), false);

    h.engine.admit(call().as_ref(), params()).await.expect("admitted by B");

    assert_eq!(h.sent_to(MessageKind::AdmissionRequest), vec![addr(GK_A), addr(GK_A), addr(GK_B)]);
    let seqs = h.sequence_numbers(MessageKind::AdmissionRequest);
    assert!(seqs.iter().all(|s| *s == seqs[0]));
    assert_eq!(h.engine.gatekeeper().unwrap().ras_address, addr(GK_B));
    assert!(h
        .events()
        .iter()
        .any(|e| matches!(e, RasEvent::FailedOver { to, .. } if *to == addr(GK_B))));
}

#[tokio::test(start_paused = true)]
async fn exhausted_alternates_restore_the_primary() {
    let h = harness(
        config_for(Some(GK_A)),
        vec![
            (GK_A, primary_with_alternates()),
            (GK_B, GatekeeperSetup::default()),
            (GK_C, GatekeeperSetup::default()),
        ],
    );
    h.engine.connect().await.expect("connect");
    for gk in [GK_A, GK_B, GK_C] {
        h.gatekeepers.set_online(addr(gk), false);
    }

    let err = h.engine.admit(call().as_ref(), params()).await.unwrap_err();

    assert!(matches!(err, RasError::NoResponse));
    assert_eq!(
        h.sent_to(MessageKind::AdmissionRequest),
        vec![
            addr(GK_A),
            addr(GK_A),
            addr(GK_B),
            addr(GK_B),
            addr(GK_C),
            addr(GK_C)
        ]
    );
    assert_eq!(h.engine.gatekeeper().unwrap().ras_address, addr(GK_A));
    assert_eq!(h.transport.remote(), Some(addr(GK_A)));
    assert!(h
        .events()
        .iter()
        .any(|e| matches!(e, RasEvent::PrimaryRestored { address } if *address == addr(GK_A))));
    assert_eq!(h.engine.pending_transactions(), 0);
}

#[tokio::test(start_paused = true)]
async fn alternate_that_needs_registration_is_registered_first() {
    let mut setup = primary_with_alternates();
    setup.alternates = vec![AlternateGatekeeperInfo {
        need_to_register: true,
        ..alternate(GK_B, 1)
    }];
    let h = harness(
        config_for(Some(GK_A)),
        vec![(GK_A, setup), (GK_B, GatekeeperSetup::default())],
    );
    h.engine.connect().await.expect("connect");
    h.gatekeepers.set_online(addr(GK_A), false);
    h.transport.clear_sent();

    h.engine.admit(call().as_ref(), params()).await.expect("admitted by B");

    let order: Vec<(MessageKind, TransportAddress)> = h
        .transport
        .sent()
        .into_iter()
        .map(|(to, m)| (m.kind(), to))
        .collect();
    assert_eq!(
        order,
        vec![
            (MessageKind::AdmissionRequest, addr(GK_A)),
            (MessageKind::AdmissionRequest, addr(GK_A)),
            (MessageKind::RegistrationRequest, addr(GK_B)),
            (MessageKind::AdmissionRequest, addr(GK_B)),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn assigned_gatekeeper_that_failed_pre_registration_is_skipped_later() {
    let h = harness(
        config_for(Some(GK_A)),
        vec![
            (
                GK_A,
                GatekeeperSetup {
                    alternates: vec![alternate(GK_C, 1)],
                    assigned: Some(AlternateGatekeeperInfo {
                        need_to_register: true,
                        ..alternate(GK_B, 0)
                    }),
                    ..GatekeeperSetup::default()
                },
            ),
            (GK_B, GatekeeperSetup::default()),
            (GK_C, GatekeeperSetup::default()),
        ],
    );
    h.engine.connect().await.expect("connect");
    for gk in [GK_A, GK_B, GK_C] {
        h.gatekeepers.set_online(addr(gk), false);
    }

    let _ = h.engine.admit(call().as_ref(), params()).await;
    let first_walk: Vec<TransportAddress> = h
        .sent_to(MessageKind::RegistrationRequest)
        .into_iter()
        .filter(|to| *to == addr(GK_B))
        .collect();
    assert_eq!(first_walk.len(), 2);
    assert_eq!(
        h.engine.assigned_gatekeeper().map(|a| a.registration_state),
        Some(AltRegistrationState::RegistrationFailed)
    );
    h.transport.clear_sent();

    let err = h.engine.admit(call().as_ref(), params()).await.unwrap_err();

    assert!(matches!(err, RasError::NoResponse));
    assert!(h.sent_to(MessageKind::RegistrationRequest).is_empty());
    assert_eq!(
        h.sent_to(MessageKind::AdmissionRequest),
        vec![addr(GK_A), addr(GK_A), addr(GK_C), addr(GK_C)]
    );
}

#[tokio::test(start_paused = true)]
async fn unregistration_failover_skips_pre_registration() {
    let mut setup = primary_with_alternates();
    setup.alternates = vec![AlternateGatekeeperInfo {
        need_to_register: true,
        ..alternate(GK_B, 1)
    }];
    let h = harness(
        config_for(Some(GK_A)),
        vec![(GK_A, setup), (GK_B, GatekeeperSetup::default())],
    );
    h.engine.connect().await.expect("connect");
    h.gatekeepers.set_online(addr(GK_A), false);
    h.transport.clear_sent();

    h.engine.unregister().await.expect("confirmed by B");

    let order: Vec<(MessageKind, TransportAddress)> = h
        .transport
        .sent()
        .into_iter()
        .map(|(to, m)| (m.kind(), to))
        .collect();
    assert_eq!(
        order,
        vec![
            (MessageKind::UnregistrationRequest, addr(GK_A)),
            (MessageKind::UnregistrationRequest, addr(GK_A)),
            (MessageKind::UnregistrationRequest, addr(GK_B)),
        ]
    );
    assert!(!h.engine.is_registered());
}

#[tokio::test(start_paused = true)]
async fn permanent_roster_survives_transient_lists_while_on_an_alternate() {
    let h = harness(
        config_for(Some(GK_A)),
        vec![
            (
                GK_A,
                GatekeeperSetup {
                    alternates: vec![alternate(GK_B, 1)],
                    alternates_permanent: true,
                    ..GatekeeperSetup::default()
                },
            ),
            (
                GK_B,
                GatekeeperSetup {
                    alternates: vec![alternate(GK_C, 1)],
                    alternates_permanent: false,
                    ..GatekeeperSetup::default()
                },
            ),
        ],
    );
    h.engine.connect().await.expect("connect");
    // ARJ from A installs its list as permanent.
    h.gatekeepers
        .script(Scripted::RejectAdmission(AdmissionRejectReason::RequestDenied));
    let _ = h.engine.admit(call().as_ref(), params()).await;
    // A goes away, B answers with a transient list.
    h.gatekeepers.set_online(addr(GK_A), false);
    h.gatekeepers
        .script(Scripted::RejectAdmission(AdmissionRejectReason::RequestDenied));

    let err = h.engine.admit(call().as_ref(), params()).await.unwrap_err();

    assert!(matches!(err, RasError::CallAdmissionDenied(_)));
    assert_eq!(h.engine.gatekeeper().unwrap().ras_address, addr(GK_B));
    let roster: Vec<TransportAddress> = h.engine.alternates().iter().map(|a| a.ras_address).collect();
    assert_eq!(roster, vec![addr(GK_B)]);
}

// ---------------------------------------------------------------------------
// 5. Gatekeeper-initiated requests
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn gatekeeper_urq_with_alternates_moves_registration() {
    let h = harness(
        config_for(Some(GK_A)),
        vec![(GK_A, GatekeeperSetup::default()), (GK_B, GatekeeperSetup::default())],
    );
    h.engine.connect().await.expect("connect");
    let id = h.engine.registration().endpoint_identifier;

    h.transport.deliver(
        ScriptedGatekeeper::unregistration_request(900, id, vec![alternate(GK_B, 0)]),
        addr(GK_A),
    );
    sleep(Duration::from_millis(10)).await;

    let ucf = h.transport.sent_of(MessageKind::UnregistrationConfirm);
    assert_eq!(ucf.len(), 1);
    assert_eq!(ucf[0].0, addr(GK_A));
    assert_eq!(ucf[0].1.sequence_number(), SequenceNumber::new(900));
    assert_eq!(h.engine.gatekeeper().unwrap().ras_address, addr(GK_B));
    let rrqs = h.transport.sent_of(MessageKind::RegistrationRequest);
    assert_eq!(rrqs.last().map(|(to, _)| *to), Some(addr(GK_B)));
    assert!(h.engine.is_registered());
    assert!(h
        .events()
        .iter()
        .any(|e| matches!(e, RasEvent::RegistrationLost { .. })));
}

#[tokio::test(start_paused = true)]
async fn gatekeeper_urq_without_auto_reregister_leaves_registration_lost() {
    let mut config = config_for(Some(GK_A));
    config.auto_reregister = false;
    let h = harness(config, vec![(GK_A, GatekeeperSetup::default())]);
    h.engine.connect().await.expect("connect");
    let id = h.engine.registration().endpoint_identifier;

    h.transport.deliver(
        ScriptedGatekeeper::unregistration_request(900, id, Vec::new()),
        addr(GK_A),
    );
    sleep(Duration::from_secs(600)).await;

    assert_eq!(h.transport.count_of(MessageKind::UnregistrationConfirm), 1);
    assert_eq!(h.engine.registration().state, RegistrationState::LostRegistration);
    assert_eq!(h.transport.count_of(MessageKind::RegistrationRequest), 1);
    assert!(h
        .events()
        .iter()
        .any(|e| matches!(e, RasEvent::RegistrationLost { .. })));

    let call = call();
    let err = h.engine.admit(call.as_ref(), params()).await.unwrap_err();

    assert!(matches!(err, RasError::RegistrationLost(_)));
    assert_eq!(h.transport.count_of(MessageKind::AdmissionRequest), 0);
    assert_eq!(h.transport.count_of(MessageKind::RegistrationRequest), 1);
    assert!(matches!(
        call.outcomes().as_slice(),
        [CallRasOutcome::AdmissionFailed(_)]
    ));
}

#[tokio::test(start_paused = true)]
async fn urq_for_another_endpoint_is_refused() {
    let h = harness(config_for(Some(GK_A)), vec![(GK_A, GatekeeperSetup::default())]);
    h.engine.connect().await.expect("connect");

    h.transport.deliver(
        ScriptedGatekeeper::unregistration_request(5, Some(EndpointId::new("someone-else")), Vec::new()),
        addr(GK_A),
    );

    assert_eq!(h.transport.count_of(MessageKind::UnregistrationReject), 1);
    assert!(h.engine.is_registered());
}

#[tokio::test(start_paused = true)]
async fn urq_from_a_stranger_is_dropped() {
    let h = harness(config_for(Some(GK_A)), vec![(GK_A, GatekeeperSetup::default())]);
    h.engine.connect().await.expect("connect");
    let id = h.engine.registration().endpoint_identifier;

    h.transport.deliver(
        ScriptedGatekeeper::unregistration_request(5, id, Vec::new()),
        addr("198.51.100.66:1719"),
    );

    assert_eq!(h.transport.count_of(MessageKind::UnregistrationConfirm), 0);
    assert!(h.engine.is_registered());
}

#[tokio::test(start_paused = true)]
async fn irq_is_answered_with_call_status() {
    let h = harness(config_for(Some(GK_A)), vec![(GK_A, GatekeeperSetup::default())]);
    h.engine.connect().await.expect("connect");
    let first = call();
    let second = Arc::new(NullCall::incoming(9, Bandwidth::from_kbps(64)));
    h.endpoint.add_call(first.clone());
    h.endpoint.add_call(second.clone());
    let reply_to = addr("10.0.0.1:4000");

    h.transport.deliver(
        InfoRequest {
            seq: SequenceNumber::new(77),
            call_reference: CallReference::new(9),
            call_identifier: None,
            reply_address: Some(reply_to),
            security: SecurityTokens::default(),
        }
        .into(),
        addr(GK_A),
    );

    let irrs = h.transport.sent_of(MessageKind::InfoRequestResponse);
    assert_eq!(irrs.len(), 1);
    assert_eq!(irrs[0].0, reply_to);
    let RasMessage::InfoRequestResponse(irr) = &irrs[0].1 else {
        unreachable!()
    };
    assert_eq!(irr.seq, SequenceNumber::new(77));
    assert!(!irr.unsolicited);
    assert_eq!(irr.per_call_info.len(), 1);
    assert_eq!(irr.per_call_info[0].call_reference, CallReference::new(9));
    assert!(!irr.per_call_info[0].originator);
}

#[tokio::test(start_paused = true)]
async fn unsolicited_status_reports_follow_the_configured_interval() {
    let mut config = config_for(Some(GK_A));
    config.status_interval_secs = 30;
    let h = harness(
        config,
        vec![(
            GK_A,
            GatekeeperSetup {
                will_respond_to_irr: true,
                ..GatekeeperSetup::default()
            },
        )],
    );
    h.endpoint.add_call(call());
    h.engine.connect().await.expect("connect");

    sleep(Duration::from_secs(61)).await;

    let irrs = h.transport.sent_of(MessageKind::InfoRequestResponse);
    assert_eq!(irrs.len(), 2);
    let RasMessage::InfoRequestResponse(irr) = &irrs[0].1 else {
        unreachable!()
    };
    assert!(irr.unsolicited);
    assert!(irr.need_response);
    assert_eq!(irr.per_call_info.len(), 1);
    assert_eq!(h.engine.pending_transactions(), 0);
}

// ---------------------------------------------------------------------------
// 6. Security and shutdown
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn response_with_bad_digest_is_security_denied() {
    let endpoint = default_endpoint().with_authenticators(
        AuthenticatorSet::empty().with(Arc::new(HmacAuthenticator::new("alice", b"right".to_vec()))),
    );
    let h = harness_with(config_for(Some(GK_A)), endpoint, vec![(GK_A, GatekeeperSetup::default())]);
    h.gatekeepers.set_authenticators(
        AuthenticatorSet::empty().with(Arc::new(HmacAuthenticator::new("gk", b"wrong".to_vec()))),
    );

    let err = h.engine.connect().await.unwrap_err();

    assert!(matches!(err, RasError::SecurityDenied(_)));
    assert!(!h.engine.is_registered());
    assert!(h
        .events()
        .iter()
        .any(|e| matches!(e, RasEvent::AuthenticationFailed { .. })));
    assert_eq!(h.engine.metrics().auth_failures.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn shared_secret_authenticates_both_ways() {
    let key = b"zone-secret".to_vec();
    let endpoint = default_endpoint().with_authenticators(
        AuthenticatorSet::empty().with(Arc::new(HmacAuthenticator::new("alice", key.clone()))),
    );
    let h = harness_with(config_for(Some(GK_A)), endpoint, vec![(GK_A, GatekeeperSetup::default())]);
    h.gatekeepers.set_authenticators(
        AuthenticatorSet::empty().with(Arc::new(HmacAuthenticator::new("gk", key))),
    );

    h.engine.connect().await.expect("connect");

    let (_, rrq) = &h.transport.sent_of(MessageKind::RegistrationRequest)[0];
    assert_eq!(rrq.security().crypto.len(), 1);
    assert!(h.engine.is_registered());
}

#[tokio::test(start_paused = true)]
async fn close_aborts_pending_transactions() {
    let h = harness(config_for(Some(GK_A)), vec![(GK_A, GatekeeperSetup::default())]);
    h.engine.connect().await.expect("connect");
    h.gatekeepers.set_online(addr(GK_A), false);

    let engine = Arc::clone(&h.engine);
    let call = call();
    let pending = tokio::spawn(async move { engine.admit(call.as_ref(), params()).await });
    sleep(Duration::from_millis(100)).await;
    assert_eq!(h.engine.pending_transactions(), 1);

    h.engine.close().await;

    let result = pending.await.expect("task");
    assert!(matches!(result, Err(RasError::NoResponse)));
    assert_eq!(h.engine.pending_transactions(), 0);
    assert!(h.transport.is_closed());
    assert!(matches!(
        h.engine.register().await,
        Err(RasError::ShuttingDown)
    ));
}
