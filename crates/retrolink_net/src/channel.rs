//! In-process peer link: two transports joined by channels, one per
//! direction. Lets two emulator instances run on separate threads of the
//! same process.

use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

use retrolink_sio::link::MESSAGE_LEN;
use retrolink_sio::PeerTransport;

type Frame = [u8; MESSAGE_LEN];

pub struct ChannelTransport {
    sender: Option<Sender<Frame>>,
    receiver: Receiver<Frame>,
}

impl ChannelTransport {
    /// Two ends of the same cable.
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::channel();
        let (b_tx, b_rx) = mpsc::channel();
        (
            Self {
                sender: Some(a_tx),
                receiver: b_rx,
            },
            Self {
                sender: Some(b_tx),
                receiver: a_rx,
            },
        )
    }
}

fn hung_up() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "peer end of the channel is gone")
}

impl PeerTransport for ChannelTransport {
    fn try_accept(&mut self) -> bool {
        true
    }

    fn try_connect(&mut self) -> bool {
        self.sender.is_some()
    }

    fn send(&mut self, frame: Frame) -> io::Result<usize> {
        let sender = self.sender.as_ref().ok_or_else(hung_up)?;
        sender.send(frame).map_err(|_| hung_up())?;
        Ok(MESSAGE_LEN)
    }

    fn try_receive(&mut self) -> io::Result<Option<Frame>> {
        match self.receiver.try_recv() {
            Ok(frame) => Ok(Some(frame)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(hung_up()),
        }
    }

    fn receive(&mut self, timeout: Option<Duration>) -> io::Result<Option<Frame>> {
        let Some(timeout) = timeout else {
            return self.receiver.recv().map(Some).map_err(|_| hung_up());
        };
        match self.receiver.recv_timeout(timeout) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(hung_up()),
        }
    }

    fn has_sender(&self) -> bool {
        self.sender.is_some()
    }

    fn close(&mut self) {
        self.sender = None;
    }
}
