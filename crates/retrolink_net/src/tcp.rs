//! Peer link over a pair of TCP streams.
//!
//! Each instance listens on its server port and connects out to the peer's.
//! Frames are sent on the outbound stream and read from the accepted one.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use retrolink_sio::link::MESSAGE_LEN;
use retrolink_sio::{LinkConfig, PeerTransport};

const CONNECT_TIMEOUT: Duration = Duration::from_millis(100);
/// `set_read_timeout` rejects a zero duration.
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

pub struct TcpTransport {
    listener: TcpListener,
    peer_host: String,
    peer_port: u16,
    inbound: Option<TcpStream>,
    outbound: Option<TcpStream>,
    /// Bytes of a frame that arrived split across reads.
    pending: Vec<u8>,
}

impl TcpTransport {
    /// Listen on `0.0.0.0:server_port` and target `client_host:client_port`.
    pub fn from_config(config: &LinkConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", config.server_port))?;
        log::info!("NET: listening on port {}", config.server_port);
        Self::new(listener, config.client_host.clone(), config.client_port)
    }

    pub fn new(listener: TcpListener, peer_host: String, peer_port: u16) -> io::Result<Self> {
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener,
            peer_host,
            peer_port,
            inbound: None,
            outbound: None,
            pending: Vec::with_capacity(MESSAGE_LEN),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    fn connect(&self) -> io::Result<TcpStream> {
        let mut last_err = io::Error::from(io::ErrorKind::AddrNotAvailable);
        for addr in (self.peer_host.as_str(), self.peer_port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
                Ok(stream) => return Ok(stream),
                Err(err) => last_err = err,
            }
        }
        Err(last_err)
    }

    /// Read until a whole frame is buffered. `Ok(None)` when the stream has
    /// nothing more for now.
    fn read_frame(&mut self) -> io::Result<Option<[u8; MESSAGE_LEN]>> {
        let stream = self
            .inbound
            .as_mut()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?;

        while self.pending.len() < MESSAGE_LEN {
            let mut buf = [0u8; MESSAGE_LEN];
            let wanted = MESSAGE_LEN - self.pending.len();
            match stream.read(&mut buf[..wanted]) {
                Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
                Ok(n) => self.pending.extend_from_slice(&buf[..n]),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err)
                    if matches!(
                        err.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    return Ok(None)
                }
                Err(err) => return Err(err),
            }
        }

        let frame = [self.pending[0], self.pending[1]];
        self.pending.clear();
        Ok(Some(frame))
    }
}

impl PeerTransport for TcpTransport {
    fn try_accept(&mut self) -> bool {
        if self.inbound.is_some() {
            return true;
        }
        match self.listener.accept() {
            Ok((stream, addr)) => {
                if let Err(err) = stream.set_nodelay(true) {
                    log::warn!("NET: could not disable Nagle on inbound stream: {err}");
                }
                log::info!("NET: accepted peer from {addr}");
                self.inbound = Some(stream);
                true
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => false,
            Err(err) => {
                log::warn!("NET: accept failed: {err}");
                false
            }
        }
    }

    fn try_connect(&mut self) -> bool {
        if self.outbound.is_some() {
            return true;
        }
        match self.connect() {
            Ok(stream) => {
                if let Err(err) = stream.set_nodelay(true) {
                    log::warn!("NET: could not disable Nagle on outbound stream: {err}");
                }
                log::info!("NET: connected to {}:{}", self.peer_host, self.peer_port);
                self.outbound = Some(stream);
                true
            }
            Err(err) => {
                log::trace!("NET: peer not reachable yet: {err}");
                false
            }
        }
    }

    fn send(&mut self, frame: [u8; MESSAGE_LEN]) -> io::Result<usize> {
        let stream = self
            .outbound
            .as_mut()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?;
        // A single write: the caller treats a short count as a lost link.
        stream.write(&frame)
    }

    fn try_receive(&mut self) -> io::Result<Option<[u8; MESSAGE_LEN]>> {
        if let Some(stream) = self.inbound.as_ref() {
            stream.set_nonblocking(true)?;
        }
        self.read_frame()
    }

    fn receive(&mut self, timeout: Option<Duration>) -> io::Result<Option<[u8; MESSAGE_LEN]>> {
        if let Some(stream) = self.inbound.as_ref() {
            stream.set_nonblocking(false)?;
            stream.set_read_timeout(timeout.map(|t| t.max(MIN_READ_TIMEOUT)))?;
        }
        self.read_frame()
    }

    fn has_sender(&self) -> bool {
        self.outbound.is_some()
    }

    fn close(&mut self) {
        for stream in [self.inbound.take(), self.outbound.take()].into_iter().flatten() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.pending.clear();
    }
}
