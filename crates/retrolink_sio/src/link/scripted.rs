use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use std::time::Duration;

use super::{Message, PeerTransport, MESSAGE_LEN};

/// What the scripted peer will do, and what it saw.
pub(crate) struct Script {
    pub(crate) incoming: VecDeque<[u8; MESSAGE_LEN]>,
    pub(crate) sent: Vec<[u8; MESSAGE_LEN]>,
    pub(crate) accept: bool,
    pub(crate) connect: bool,
    /// Report one byte written instead of two.
    pub(crate) short_send: bool,
    pub(crate) closed: bool,
}

/// In-memory transport whose peer is a queue of canned frames.
#[derive(Clone)]
pub(crate) struct ScriptedTransport(pub(crate) Rc<RefCell<Script>>);

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self(Rc::new(RefCell::new(Script {
            incoming: VecDeque::new(),
            sent: Vec::new(),
            accept: true,
            connect: true,
            short_send: false,
            closed: false,
        })))
    }

    pub(crate) fn boxed(&self) -> Box<dyn PeerTransport> {
        Box::new(self.clone())
    }

    pub(crate) fn queue(&self, message: Message) {
        self.0.borrow_mut().incoming.push_back(message.to_bytes());
    }

    pub(crate) fn sent(&self) -> Vec<Message> {
        self.0
            .borrow()
            .sent
            .iter()
            .map(|&frame| Message::from_bytes(frame))
            .collect()
    }
}

impl PeerTransport for ScriptedTransport {
    fn try_accept(&mut self) -> bool {
        self.0.borrow().accept
    }

    fn try_connect(&mut self) -> bool {
        self.0.borrow().connect
    }

    fn send(&mut self, frame: [u8; MESSAGE_LEN]) -> io::Result<usize> {
        let mut script = self.0.borrow_mut();
        if script.closed {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        if script.short_send {
            return Ok(1);
        }
        script.sent.push(frame);
        Ok(MESSAGE_LEN)
    }

    fn try_receive(&mut self) -> io::Result<Option<[u8; MESSAGE_LEN]>> {
        Ok(self.0.borrow_mut().incoming.pop_front())
    }

    fn receive(&mut self, _timeout: Option<Duration>) -> io::Result<Option<[u8; MESSAGE_LEN]>> {
        // An empty queue stands in for a peer that never answers.
        Ok(self.0.borrow_mut().incoming.pop_front())
    }

    fn has_sender(&self) -> bool {
        let script = self.0.borrow();
        script.connect && !script.closed
    }

    fn close(&mut self) {
        self.0.borrow_mut().closed = true;
    }
}
