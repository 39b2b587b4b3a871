//! Nullable infrastructure for deterministic testing.
//!
//! Inspired by the "A-frame architecture" pattern: the RAS engine only
//! talks to the outside world through its transport, endpoint and call
//! seams. This crate provides test-friendly implementations of those seams
//! that:
//! - Never touch the network
//! - Record everything the engine sends
//! - Answer like a gatekeeper, or misbehave on cue
//!
//! Usage: build a [`NullTransport`], attach a [`ScriptedGatekeeper`], and
//! hand both to `RasEngine::new` together with a [`NullEndpoint`].

pub mod call;
pub mod endpoint;
pub mod gatekeeper;
pub mod transport;

pub use call::NullCall;
pub use endpoint::NullEndpoint;
pub use gatekeeper::{GatekeeperSetup, Scripted, ScriptedGatekeeper};
pub use transport::{BindEvent, NullTransport, Responder};
