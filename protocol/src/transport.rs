//! The transport seam the RAS client engine sends through.

use std::sync::Arc;

use h323_messages::RasMessage;
use h323_types::TransportAddress;

use crate::TransportError;

/// Callback a transport invokes for every decoded inbound message, together
/// with the address it came from.
pub type InboundHandler = Arc<dyn Fn(RasMessage, TransportAddress) + Send + Sync>;

/// A datagram channel bound to at most one remote gatekeeper at a time.
///
/// Implementations must deliver inbound messages one at a time to the
/// registered handler and must never call the handler while holding a lock
/// that `send` also takes.
pub trait RasTransport: Send + Sync {
    /// Our own RAS address, advertised in GRQ/RRQ/IRR.
    fn local_address(&self) -> TransportAddress;

    /// The gatekeeper address `send` currently targets.
    fn remote(&self) -> Option<TransportAddress>;

    /// Point `send` at a new gatekeeper. Replaces any previous binding.
    fn bind_remote(&self, remote: TransportAddress) -> Result<(), TransportError>;

    /// Drop the current binding; `send` fails with [`TransportError::NotBound`] until rebound.
    fn unbind_remote(&self);

    /// Send to the bound gatekeeper.
    fn send(&self, message: &RasMessage) -> Result<(), TransportError>;

    /// Send to an explicit address without touching the binding (discovery
    /// broadcasts, IRQ `replyAddress`).
    fn send_to(&self, message: &RasMessage, to: TransportAddress) -> Result<(), TransportError>;

    /// Install the receive callback.
    fn set_handler(&self, handler: InboundHandler);

    /// Stop receiving and release the socket. Further sends fail with
    /// [`TransportError::Closed`].
    fn close(&self);
}
