//! Tokio UDP implementation of [`RasTransport`].

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use h323_messages::RasMessage;
use h323_protocol::{
    BincodeCodec, InboundHandler, RasCodec, RasTransport, TransportError, MAX_MESSAGE_SIZE,
};
use h323_types::TransportAddress;
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use crate::NetworkError;

#[derive(Default)]
struct Shared {
    remote: Option<TransportAddress>,
    handler: Option<InboundHandler>,
    advertised: Option<TransportAddress>,
    closed: bool,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    match shared.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// A RAS channel over a single UDP socket.
///
/// Sends never await: frames are written with `try_send_to`, and a full
/// socket buffer surfaces as a send error for the engine's retry logic to
/// absorb. Inbound datagrams are decoded on a spawned task and delivered to
/// the handler one at a time.
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    bound: TransportAddress,
    codec: Arc<dyn RasCodec>,
    shared: Arc<Mutex<Shared>>,
    shutdown: broadcast::Sender<()>,
}

impl UdpTransport {
    /// Bind with the default [`BincodeCodec`].
    pub async fn bind(addr: SocketAddr) -> Result<Self, NetworkError> {
        Self::bind_with_codec(addr, Arc::new(BincodeCodec)).await
    }

    /// Bind `addr` and start the receive loop. Must be called inside a
    /// tokio runtime.
    pub async fn bind_with_codec(
        addr: SocketAddr,
        codec: Arc<dyn RasCodec>,
    ) -> Result<Self, NetworkError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| NetworkError::Bind { addr, source })?;
        // GRQ may go to a subnet broadcast address.
        socket
            .set_broadcast(true)
            .map_err(NetworkError::SocketOption)?;
        let bound = TransportAddress::from(socket.local_addr()?);

        let socket = Arc::new(socket);
        let shared = Arc::new(Mutex::new(Shared::default()));
        let (shutdown, _) = broadcast::channel(1);

        tokio::spawn(receive_loop(
            Arc::clone(&socket),
            Arc::clone(&codec),
            Arc::clone(&shared),
            shutdown.subscribe(),
        ));
        info!(local = %bound, "RAS socket bound");

        Ok(Self {
            socket,
            bound,
            codec,
            shared,
            shutdown,
        })
    }

    /// The address the socket is actually bound to.
    pub fn bound_address(&self) -> TransportAddress {
        self.bound
    }

    /// Advertise a different RAS address to the gatekeeper, for sockets
    /// bound to the unspecified address or sitting behind NAT.
    pub fn set_advertised_address(&self, address: TransportAddress) {
        lock(&self.shared).advertised = Some(address);
    }

    fn transmit(&self, message: &RasMessage, to: TransportAddress) -> Result<(), TransportError> {
        if lock(&self.shared).closed {
            return Err(TransportError::Closed);
        }
        let frame = self.codec.encode(message)?;
        match self.socket.try_send_to(&frame, to.socket_addr()) {
            Ok(_) => {
                trace!(%to, kind = message.abbreviation(), bytes = frame.len(), "datagram sent");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                Err(TransportError::Send("socket send buffer full".into()))
            }
            Err(e) => Err(TransportError::Io(e)),
        }
    }
}

async fn receive_loop(
    socket: Arc<UdpSocket>,
    codec: Arc<dyn RasCodec>,
    shared: Arc<Mutex<Shared>>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut buf = vec![0u8; MAX_MESSAGE_SIZE];
    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            received = socket.recv_from(&mut buf) => {
                let (len, from) = match received {
                    Ok(r) => r,
                    // ICMP port-unreachable from an earlier send shows up here
                    // on some platforms.
                    Err(e) if e.kind() == ErrorKind::ConnectionReset => continue,
                    Err(e) => {
                        warn!(error = %e, "RAS socket receive failed");
                        continue;
                    }
                };
                let message = match codec.decode(&buf[..len]) {
                    Ok(message) => message,
                    Err(e) => {
                        debug!(%from, error = %e, "dropping undecodable datagram");
                        continue;
                    }
                };
                let handler = lock(&shared).handler.clone();
                match handler {
                    Some(handler) => handler(message, TransportAddress::from(from)),
                    None => trace!(%from, "no handler installed, datagram dropped"),
                }
            }
        }
    }
    debug!("RAS receive loop stopped");
}

impl RasTransport for UdpTransport {
    fn local_address(&self) -> TransportAddress {
        lock(&self.shared).advertised.unwrap_or(self.bound)
    }

    fn remote(&self) -> Option<TransportAddress> {
        lock(&self.shared).remote
    }

    fn bind_remote(&self, remote: TransportAddress) -> Result<(), TransportError> {
        let mut shared = lock(&self.shared);
        if shared.closed {
            return Err(TransportError::Closed);
        }
        shared.remote = Some(remote);
        debug!(%remote, "RAS transport bound to gatekeeper");
        Ok(())
    }

    fn unbind_remote(&self) {
        lock(&self.shared).remote = None;
    }

    fn send(&self, message: &RasMessage) -> Result<(), TransportError> {
        let to = lock(&self.shared).remote.ok_or(TransportError::NotBound)?;
        self.transmit(message, to)
    }

    fn send_to(&self, message: &RasMessage, to: TransportAddress) -> Result<(), TransportError> {
        self.transmit(message, to)
    }

    fn set_handler(&self, handler: InboundHandler) {
        lock(&self.shared).handler = Some(handler);
    }

    fn close(&self) {
        {
            let mut shared = lock(&self.shared);
            if shared.closed {
                return;
            }
            shared.closed = true;
            shared.handler = None;
            shared.remote = None;
        }
        let _ = self.shutdown.send(());
        info!(local = %self.bound, "RAS socket closed");
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
    }
}
