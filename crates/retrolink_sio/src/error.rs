use std::io;

use thiserror::Error;

/// Failures on the peer link. Any of these leaves the link disconnected.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("peer transport I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("short send: wrote {written} of {expected} bytes")]
    ShortSend { written: usize, expected: usize },

    #[error("timed out waiting for the peer to answer")]
    Timeout,

    #[error("peer closed the link")]
    PeerDisconnected,
}

/// Mobile adapter command failures. The offending command is dropped
/// without a reply packet.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AdapterError {
    #[error("config access out of range: offset {offset} + length {length} exceeds {size} bytes")]
    ConfigOutOfRange {
        offset: usize,
        length: usize,
        size: usize,
    },

    #[error("command 0x{command:02X} needs {expected} argument bytes, got {actual}")]
    MissingArguments {
        command: u8,
        expected: usize,
        actual: usize,
    },
}
