pub mod config;
mod error;
mod framing;
pub mod link;
pub mod mobile;
pub mod printer;
pub mod registers;
mod serial;
mod sink;

pub use config::{Accessory, ConsoleGeneration, LinkConfig};
pub use error::{AdapterError, LinkError};
pub use framing::additive_checksum;
pub use link::{DeviceKind, LinkController, LinkStatus, Message, MessageTag, PeerTransport};
pub use mobile::MobileAdapter;
pub use printer::Printer;
pub use registers::{LinkRegisters, RegisterFile, SerialControl};
pub use serial::SerialLink;
pub use sink::{ImageSink, MemorySink};

/// Printed strips are one screen wide.
pub const SCREEN_WIDTH: usize = 160;
/// Visible screen height; the printer pre-sizes its buffer to this many rows.
pub const SCREEN_HEIGHT: usize = 144;
