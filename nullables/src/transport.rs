//! Nullable transport — record datagrams instead of sending them.

use std::sync::{Arc, Mutex, MutexGuard};

use h323_messages::{MessageKind, RasMessage};
use h323_protocol::{InboundHandler, RasTransport, TransportError};
use h323_types::TransportAddress;
use tracing::trace;

/// Computes the replies a datagram provokes: `(reply, sent from)`.
pub type Responder =
    Arc<dyn Fn(&RasMessage, TransportAddress) -> Vec<(RasMessage, TransportAddress)> + Send + Sync>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindEvent {
    Bound(TransportAddress),
    Unbound,
}

#[derive(Default)]
struct Inner {
    remote: Option<TransportAddress>,
    handler: Option<InboundHandler>,
    responder: Option<Responder>,
    sent: Vec<(TransportAddress, RasMessage)>,
    bindings: Vec<BindEvent>,
    fail_sends: bool,
    closed: bool,
}

/// An in-memory [`RasTransport`].
///
/// Every datagram is recorded. When a responder is installed its replies are
/// handed to the engine's handler synchronously, from inside `send`, after
/// the transport's own lock is released.
pub struct NullTransport {
    local: TransportAddress,
    inner: Mutex<Inner>,
}

impl NullTransport {
    pub fn new(local: TransportAddress) -> Self {
        Self {
            local,
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn set_responder(&self, responder: Responder) {
        self.lock().responder = Some(responder);
    }

    /// Make every send fail with an I/O-style error.
    pub fn fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }

    /// Inject a datagram as if it arrived from `from`.
    pub fn deliver(&self, message: RasMessage, from: TransportAddress) {
        let handler = self.lock().handler.clone();
        if let Some(handler) = handler {
            handler(message, from);
        }
    }

    /// Every datagram sent so far, with its destination.
    pub fn sent(&self) -> Vec<(TransportAddress, RasMessage)> {
        self.lock().sent.clone()
    }

    pub fn sent_of(&self, kind: MessageKind) -> Vec<(TransportAddress, RasMessage)> {
        self.lock()
            .sent
            .iter()
            .filter(|(_, m)| m.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn count_of(&self, kind: MessageKind) -> usize {
        self.lock().sent.iter().filter(|(_, m)| m.kind() == kind).count()
    }

    pub fn last_sent(&self) -> Option<(TransportAddress, RasMessage)> {
        self.lock().sent.last().cloned()
    }

    pub fn clear_sent(&self) {
        self.lock().sent.clear();
    }

    pub fn bindings(&self) -> Vec<BindEvent> {
        self.lock().bindings.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn transmit(&self, message: &RasMessage, to: TransportAddress) -> Result<(), TransportError> {
        let (responder, handler) = {
            let mut inner = self.lock();
            if inner.closed {
                return Err(TransportError::Closed);
            }
            if inner.fail_sends {
                return Err(TransportError::Send("network unreachable".into()));
            }
            trace!(%to, kind = message.abbreviation(), "datagram recorded");
            inner.sent.push((to, message.clone()));
            (inner.responder.clone(), inner.handler.clone())
        };
        let (Some(responder), Some(handler)) = (responder, handler) else {
            return Ok(());
        };
        for (reply, from) in responder(message, to) {
            handler(reply, from);
        }
        Ok(())
    }
}

impl RasTransport for NullTransport {
    fn local_address(&self) -> TransportAddress {
        self.local
    }

    fn remote(&self) -> Option<TransportAddress> {
        self.lock().remote
    }

    fn bind_remote(&self, remote: TransportAddress) -> Result<(), TransportError> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(TransportError::Closed);
        }
        inner.remote = Some(remote);
        inner.bindings.push(BindEvent::Bound(remote));
        Ok(())
    }

    fn unbind_remote(&self) {
        let mut inner = self.lock();
        if inner.remote.take().is_some() {
            inner.bindings.push(BindEvent::Unbound);
        }
    }

    fn send(&self, message: &RasMessage) -> Result<(), TransportError> {
        let to = self.lock().remote.ok_or(TransportError::NotBound)?;
        self.transmit(message, to)
    }

    fn send_to(&self, message: &RasMessage, to: TransportAddress) -> Result<(), TransportError> {
        self.transmit(message, to)
    }

    fn set_handler(&self, handler: InboundHandler) {
        self.lock().handler = Some(handler);
    }

    fn close(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        inner.handler = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use h323_messages::{InfoRequestAck, SecurityTokens};
    use h323_types::SequenceNumber;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn addr(port: u16) -> TransportAddress {
        format!("192.0.2.1:{port}").parse().unwrap()
    }

    fn iack() -> RasMessage {
        InfoRequestAck {
            seq: SequenceNumber::FIRST,
            security: SecurityTokens::default(),
        }
        .into()
    }

    #[test]
    fn send_requires_binding() {
        let transport = NullTransport::new(addr(1));
        assert!(matches!(transport.send(&iack()), Err(TransportError::NotBound)));
        transport.bind_remote(addr(2)).unwrap();
        transport.send(&iack()).unwrap();
        assert_eq!(transport.sent()[0].0, addr(2));
    }

    #[test]
    fn binding_history_is_recorded() {
        let transport = NullTransport::new(addr(1));
        transport.bind_remote(addr(2)).unwrap();
        transport.unbind_remote();
        transport.unbind_remote();
        transport.bind_remote(addr(3)).unwrap();
        assert_eq!(
            transport.bindings(),
            vec![
                BindEvent::Bound(addr(2)),
                BindEvent::Unbound,
                BindEvent::Bound(addr(3))
            ]
        );
    }

    #[test]
    fn responder_replies_reach_handler() {
        let transport = NullTransport::new(addr(1));
        let received = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&received);
        transport.set_handler(Arc::new(move |_, _| {
            r.fetch_add(1, Ordering::SeqCst);
        }));
        transport.set_responder(Arc::new(|msg, to| vec![(msg.clone(), to)]));
        transport.send_to(&iack(), addr(9)).unwrap();
        assert_eq!(received.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn closed_transport_refuses() {
        let transport = NullTransport::new(addr(1));
        transport.close();
        assert!(matches!(
            transport.send_to(&iack(), addr(2)),
            Err(TransportError::Closed)
        ));
    }
}
