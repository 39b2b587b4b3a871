//! H.323 gatekeeper RAS client engine.
//!
//! [`RasEngine`] discovers a gatekeeper, registers the local [`Endpoint`]
//! and keeps that registration alive, runs per-call admission, bandwidth
//! and disengage transactions, answers gatekeeper-initiated requests, and
//! fails over to alternate gatekeepers when the current one stops
//! answering.
//!
//! All traffic goes through an [`h323_protocol::RasTransport`]; the engine
//! never touches sockets itself.

pub mod admission;
pub mod auth;
pub mod bandwidth;
pub mod call;
pub mod config;
pub mod disengage;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod events;
pub mod ledger;
pub mod metrics;
pub mod registration;
pub mod request;
pub mod roster;
pub mod state;

mod executor;
mod inbound;
mod scheduler;
mod status;

pub use admission::{Admission, AdmissionParams, AdmittedAlternate};
pub use auth::{AuthResult, Authenticator, AuthenticatorSet, HmacAuthenticator};
pub use call::{CallRasOutcome, RasCall};
pub use config::{AccessTokenOids, GatekeeperConfig, RasConfig, RetryConfig, RetryPolicy};
pub use disengage::DisengageOutcome;
pub use endpoint::Endpoint;
pub use engine::RasEngine;
pub use error::{RasError, RejectCause};
pub use events::{EventBus, RasEvent};
pub use ledger::{Delivery, TransactionLedger};
pub use metrics::RasMetrics;
pub use registration::DiscoveryStrategy;
pub use request::{RasRequest, Reply, RequestClass};
pub use roster::{AltRegistrationState, AlternateGatekeeper, AlternateRoster};
pub use state::{GatekeeperIdentity, Registration, RegistrationState};
