use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::SocketAddr;

use bytes::BytesMut;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::error::{Result, TransportError};
use crate::packet::{encode_packet, op_name, split_packet};

/// Largest datagram we expect: ArtDmx header (18) + 512 channels, with headroom.
const RECV_BUFFER_SIZE: usize = 2048;

/// Callback invoked for every packet whose OpCode it was registered for.
///
/// Receives the sender address and the packet body (everything after the
/// OpCode). Runs on the receive path and must not block.
pub type PacketHandler = Box<dyn Fn(SocketAddr, &[u8]) + Send + Sync>;

/// Receives Art-Net datagrams and routes them to per-OpCode handlers.
pub struct ArtNetReceiver {
    socket: UdpSocket,
    handlers: HashMap<u16, PacketHandler>,
}

impl ArtNetReceiver {
    /// Bind a broadcast-capable UDP socket.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| TransportError::Bind { addr, source })?;
        socket
            .set_broadcast(true)
            .map_err(|source| TransportError::Bind { addr, source })?;

        info!(local_addr = ?socket.local_addr().ok(), "art-net receiver bound");

        Ok(Self {
            socket,
            handlers: HashMap::new(),
        })
    }

    /// Register the handler for an OpCode, replacing any previous one.
    pub fn register_handler<H>(&mut self, opcode: u16, handler: H)
    where
        H: Fn(SocketAddr, &[u8]) + Send + Sync + 'static,
    {
        debug!(opcode, op = op_name(opcode), "registered packet handler");
        self.handlers.insert(opcode, Box::new(handler));
    }

    /// Address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(Into::into)
    }

    /// Receive and dispatch datagrams until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        loop {
            let (len, src) = tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok(received) => received,
                    Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                    // ICMP port-unreachable surfaces here on some platforms.
                    Err(err) if err.kind() == ErrorKind::ConnectionReset => continue,
                    Err(err) => return Err(TransportError::Io(err)),
                },
            };

            self.dispatch(src, &buf[..len]);
        }
    }

    fn dispatch(&self, src: SocketAddr, datagram: &[u8]) {
        let (opcode, body) = match split_packet(datagram) {
            Ok(parts) => parts,
            Err(err) => {
                debug!(%src, error = %err, "ignoring non art-net datagram");
                return;
            }
        };

        match self.handlers.get(&opcode) {
            Some(handler) => handler(src, body),
            None => trace!(%src, opcode, op = op_name(opcode), "no handler for opcode"),
        }
    }
}

/// Sends Art-Net datagrams to a fixed target.
pub struct ArtNetSender {
    socket: UdpSocket,
    target: SocketAddr,
    buf: BytesMut,
}

impl ArtNetSender {
    /// Bind an ephemeral broadcast-capable socket aimed at `target`.
    pub async fn connect(target: SocketAddr) -> Result<Self> {
        let bind_addr: SocketAddr = if target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: bind_addr,
                source,
            })?;
        socket.set_broadcast(true)?;

        Ok(Self {
            socket,
            target,
            buf: BytesMut::with_capacity(RECV_BUFFER_SIZE),
        })
    }

    /// Wrap `body` in an Art-Net packet and send it.
    pub async fn send(&mut self, opcode: u16, body: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_packet(opcode, body, &mut self.buf);
        self.socket.send_to(&self.buf, self.target).await?;
        trace!(target_addr = %self.target, op = op_name(opcode), size = body.len(), "sent packet");
        Ok(())
    }

    /// Destination of every packet sent.
    pub fn target(&self) -> SocketAddr {
        self.target
    }
}
