//! Peer link: two emulator instances exchanging shifted bytes.
mod controller;
mod message;
mod status;
mod transport;

#[cfg(test)]
pub(crate) mod scripted;
#[cfg(test)]
mod tests;

pub use controller::LinkController;
pub use message::{Message, MessageTag, MESSAGE_LEN};
pub use status::{DeviceKind, LinkStatus};
pub use transport::PeerTransport;
