use std::io;
use std::time::Duration;

use super::MESSAGE_LEN;

/// Duplex byte channel to exactly one remote instance.
///
/// The transport moves raw 2-byte frames; [`super::Message`] gives them
/// meaning. `send` reports how many bytes went out so that short writes can
/// be treated as link failures.
pub trait PeerTransport {
    /// Try to accept the inbound half. Never blocks.
    fn try_accept(&mut self) -> bool;
    /// Try to open the outbound half. Never blocks for long.
    fn try_connect(&mut self) -> bool;
    fn send(&mut self, frame: [u8; MESSAGE_LEN]) -> io::Result<usize>;
    /// Poll once for a frame.
    fn try_receive(&mut self) -> io::Result<Option<[u8; MESSAGE_LEN]>>;
    /// Wait for a frame. `Ok(None)` means the timeout elapsed first.
    fn receive(&mut self, timeout: Option<Duration>) -> io::Result<Option<[u8; MESSAGE_LEN]>>;
    /// Whether an outbound channel exists that a disconnect could go to.
    fn has_sender(&self) -> bool;
    fn close(&mut self);
}
