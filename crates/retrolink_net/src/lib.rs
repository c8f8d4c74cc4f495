mod channel;
mod tcp;

pub use channel::ChannelTransport;
pub use tcp::TcpTransport;
