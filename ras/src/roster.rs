//! Alternate gatekeeper roster and the assigned-gatekeeper redirect.
//!
//! The roster is ranked by priority and is either *permanent* or
//! *transient*. A permanent roster survives transient lists delivered while
//! the engine is operating through an alternate; a transient one is
//! replaced wholesale by every new list. Candidates that failed their
//! pre-registration stay excluded for the lifetime of the roster, across
//! replacements.

use std::collections::HashSet;

use h323_messages::AlternateGatekeeperInfo;
use h323_types::{GatekeeperId, TransportAddress};

/// Registration status of one alternate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AltRegistrationState {
    NoRegistrationNeeded,
    NeedToRegister,
    Registered,
    RegistrationFailed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlternateGatekeeper {
    pub ras_address: TransportAddress,
    pub identifier: Option<GatekeeperId>,
    pub priority: u8,
    pub registration_state: AltRegistrationState,
}

impl From<&AlternateGatekeeperInfo> for AlternateGatekeeper {
    fn from(info: &AlternateGatekeeperInfo) -> Self {
        Self {
            ras_address: info.ras_address,
            identifier: info.gatekeeper_identifier.clone(),
            priority: info.priority,
            registration_state: if info.need_to_register {
                AltRegistrationState::NeedToRegister
            } else {
                AltRegistrationState::NoRegistrationNeeded
            },
        }
    }
}

#[derive(Debug, Default)]
pub struct AlternateRoster {
    entries: Vec<AlternateGatekeeper>,
    permanent: bool,
    failed: HashSet<TransportAddress>,
}

impl AlternateRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a gatekeeper-pushed list. Returns `false` when the current
    /// permanent roster is kept because the new list is transient and we are
    /// operating through an alternate.
    pub fn install(
        &mut self,
        list: &[AlternateGatekeeperInfo],
        permanent: bool,
        using_alternate: bool,
    ) -> bool {
        if self.permanent && !permanent && using_alternate {
            return false;
        }
        let mut entries: Vec<AlternateGatekeeper> =
            list.iter().map(AlternateGatekeeper::from).collect();
        // Stable: equal priorities keep the gatekeeper's order.
        entries.sort_by_key(|alt| alt.priority);
        for alt in &mut entries {
            if self.failed.contains(&alt.ras_address) {
                alt.registration_state = AltRegistrationState::RegistrationFailed;
            }
        }
        self.entries = entries;
        self.permanent = permanent;
        true
    }

    /// Alternates worth trying, in priority order.
    pub fn candidates(&self) -> Vec<AlternateGatekeeper> {
        self.entries
            .iter()
            .filter(|alt| alt.registration_state != AltRegistrationState::RegistrationFailed)
            .cloned()
            .collect()
    }

    pub fn mark_failed(&mut self, address: TransportAddress) {
        self.failed.insert(address);
        self.set_state(address, AltRegistrationState::RegistrationFailed);
    }

    /// Whether `address` failed its pre-registration while this roster was
    /// in use, whether or not it is still listed.
    pub fn has_failed(&self, address: TransportAddress) -> bool {
        self.failed.contains(&address)
    }

    pub fn mark_registered(&mut self, address: TransportAddress) {
        self.set_state(address, AltRegistrationState::Registered);
    }

    fn set_state(&mut self, address: TransportAddress, state: AltRegistrationState) {
        for alt in self.entries.iter_mut().filter(|a| a.ras_address == address) {
            alt.registration_state = state;
        }
    }

    pub fn entries(&self) -> &[AlternateGatekeeper] {
        &self.entries
    }

    pub fn is_permanent(&self) -> bool {
        self.permanent
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Failover order: the assigned gatekeeper (if any, and not the one we are
/// leaving) first, then the roster's candidates, without duplicates.
pub fn failover_order(
    assigned: Option<&AlternateGatekeeper>,
    roster: &AlternateRoster,
    leaving: Option<TransportAddress>,
) -> Vec<AlternateGatekeeper> {
    let mut order: Vec<AlternateGatekeeper> = Vec::new();
    let candidates = assigned
        .filter(|a| {
            a.registration_state != AltRegistrationState::RegistrationFailed
                && !roster.has_failed(a.ras_address)
        })
        .cloned()
        .into_iter()
        .chain(roster.candidates());
    for candidate in candidates {
        if Some(candidate.ras_address) == leaving {
            continue;
        }
        if order.iter().any(|c| c.ras_address == candidate.ras_address) {
            continue;
        }
        order.push(candidate);
    }
    order
}
