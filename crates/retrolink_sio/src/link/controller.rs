use std::time::Duration;

use crate::config::{ConsoleGeneration, LinkConfig, FAST_SHIFT_CLOCK};
use crate::error::LinkError;
use crate::registers::{LinkRegisters, SerialControl};

use super::{DeviceKind, LinkStatus, Message, MessageTag, PeerTransport, MESSAGE_LEN};

/// Shift timing plus the peer synchronisation protocol.
///
/// Everything here runs on the emulation thread. The only calls that wait on
/// the peer are [`LinkController::send_byte`] and
/// [`LinkController::send_ir_signal`]; they are bounded by the configured
/// exchange timeout.
pub struct LinkController {
    pub(crate) status: LinkStatus,
    transport: Option<Box<dyn PeerTransport>>,
    /// Inbound half accepted.
    inbound_connected: bool,
    /// Outbound half opened.
    outbound_connected: bool,
    /// Set once the link was lost or closed by the peer; only a reset
    /// clears it.
    terminated: bool,
    generation: ConsoleGeneration,
    hard_sync: bool,
    base_shift_clock: u32,
    exchange_timeout: Option<Duration>,
}

impl LinkController {
    pub fn new(config: &LinkConfig, transport: Option<Box<dyn PeerTransport>>) -> Self {
        Self {
            status: LinkStatus::new(config),
            transport,
            inbound_connected: false,
            outbound_connected: false,
            terminated: false,
            generation: config.generation,
            hard_sync: config.hard_sync,
            base_shift_clock: config.shift_clock,
            exchange_timeout: config.exchange_timeout,
        }
    }

    pub fn status(&self) -> &LinkStatus {
        &self.status
    }

    pub fn is_connected(&self) -> bool {
        self.status.connected
    }

    /// The link went down and will stay down until [`Self::reset`].
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Tear the session down and start over from `config`.
    ///
    /// An open send channel gets a best-effort disconnect notice first.
    pub fn reset(&mut self, config: &LinkConfig) {
        self.close_transport();
        self.status = LinkStatus::new(config);
        self.inbound_connected = false;
        self.outbound_connected = false;
        self.terminated = false;
        self.generation = config.generation;
        self.hard_sync = config.hard_sync;
        self.base_shift_clock = config.shift_clock;
        self.exchange_timeout = config.exchange_timeout;
    }

    pub(crate) fn close_transport(&mut self) {
        if let Some(transport) = self.transport.as_mut() {
            if transport.has_sender() {
                if let Err(err) = transport.send(Message::disconnect().to_bytes()) {
                    log::debug!("SIO: disconnect notice not delivered: {err}");
                }
            }
            transport.close();
        }
    }

    /// Level-triggered connection setup; call it regularly until connected.
    pub fn process_network_communication(&mut self) {
        if self.status.connected || self.terminated {
            return;
        }
        let Some(transport) = self.transport.as_mut() else {
            return;
        };

        if !self.inbound_connected && transport.try_accept() {
            log::info!("SIO: peer connected to us");
            self.inbound_connected = true;
        }
        if !self.outbound_connected && transport.try_connect() {
            log::info!("SIO: connected to peer");
            self.outbound_connected = true;
        }

        if self.inbound_connected && self.outbound_connected {
            self.status.connected = true;
            self.status.device_kind = DeviceKind::PeerLink(self.generation);
        }
    }

    // --- Shift timing ---

    pub fn set_double_speed(&mut self, enabled: bool) {
        self.status.double_speed = enabled;
    }

    /// Begin a transfer after SC was written with the start bit set.
    pub fn start_transfer(&mut self, control: SerialControl, transfer_byte: u8) {
        let status = &mut self.status;
        status.active_transfer = true;
        status.internal_clock = control.contains(SerialControl::INTERNAL_CLOCK);
        status.shifts_left = 8;
        status.shift_counter = 0;
        status.transfer_byte = transfer_byte;

        let fast = control.contains(SerialControl::FAST_CLOCK)
            && matches!(self.generation, ConsoleGeneration::Cgb);
        let mut clock = if fast {
            FAST_SHIFT_CLOCK
        } else {
            self.base_shift_clock
        };
        // Cycles are counted at the normal system rate; the serial clock
        // doubles along with the CPU.
        if status.double_speed {
            clock /= 2;
        }
        status.shift_clock = clock.max(1);
    }

    /// Advance the shift clock. Returns `true` when the eighth bit completes.
    ///
    /// Only internally clocked transfers make progress here; externally
    /// clocked ones finish when the peer drives them.
    pub fn tick_shift(&mut self, cycles: u32) -> bool {
        let status = &mut self.status;
        if !status.active_transfer || !status.internal_clock {
            return false;
        }

        status.shift_counter = status.shift_counter.saturating_add(cycles);
        while status.shifts_left > 0 && status.shift_counter >= status.shift_clock {
            status.shift_counter -= status.shift_clock;
            status.shifts_left -= 1;
        }

        if status.shifts_left == 0 {
            status.active_transfer = false;
            status.shift_counter = 0;
            return true;
        }
        false
    }

    /// Advance the sync barrier counter, requesting a sync when it expires.
    pub fn tick_sync(&mut self, cycles: u32) -> Result<(), LinkError> {
        if !self.hard_sync || !self.status.connected || self.status.sync {
            return Ok(());
        }
        self.status.sync_counter = self.status.sync_counter.saturating_add(cycles);
        if self.status.sync_counter >= self.status.sync_clock {
            self.request_sync()?;
        }
        Ok(())
    }

    // --- Peer protocol ---

    /// Send `transfer_byte` and wait for the peer's byte in exchange.
    pub fn send_byte(&mut self, regs: &mut impl LinkRegisters) -> Result<(), LinkError> {
        self.send(Message::data(self.status.transfer_byte))?;

        let reply = self.await_reply()?;
        regs.set_transfer_byte(reply.payload);
        self.status.transfer_byte = reply.payload;
        regs.request_interrupt();
        Ok(())
    }

    /// Same exchange as [`Self::send_byte`] for the infra-red port.
    pub fn send_ir_signal(&mut self, regs: &mut impl LinkRegisters) -> Result<(), LinkError> {
        self.send(Message::infrared(regs.ir_signal()))?;
        self.await_reply()?;
        regs.clear_ir_send();
        Ok(())
    }

    /// Tell the peer we reached the barrier. Does not wait.
    pub fn request_sync(&mut self) -> Result<(), LinkError> {
        self.send(Message::sync())?;
        self.status.sync = true;
        Ok(())
    }

    /// Poll the peer once and act on whatever arrived.
    pub fn receive_byte(&mut self, regs: &mut impl LinkRegisters) -> Result<(), LinkError> {
        if !self.status.connected {
            return Ok(());
        }
        let Some(transport) = self.transport.as_mut() else {
            return Ok(());
        };
        let frame = match transport.try_receive() {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(()),
            Err(err) => return Err(self.fail_link(err.into())),
        };

        let message = Message::from_bytes(frame);
        match message.tag {
            MessageTag::Sync => {
                self.status.sync = false;
                self.status.sync_counter = 0;
            }
            MessageTag::Disconnect => {
                log::info!("SIO: peer ended the session; reinitialize to reconnect");
                self.status.connected = false;
                self.status.sync = false;
                self.terminated = true;
            }
            MessageTag::InfraRed => {
                regs.set_ir_reception(message.payload & 0x01 != 0);
                let ack = Message::infrared_ack(message.payload).to_bytes();
                if let Err(err) = transport.send(ack) {
                    log::warn!("SIO: IR acknowledgement failed: {err}");
                }
            }
            MessageTag::InfraRedAck | MessageTag::Other(_) => {}
            MessageTag::Data => {
                regs.request_interrupt();
                let previous = regs.transfer_byte();
                regs.set_transfer_byte(message.payload);
                regs.clear_transfer_start();
                self.status.active_transfer = false;
                self.status.transfer_byte = message.payload;

                // The peer gets our old SB in exchange.
                self.send(Message::data(previous))?;
            }
        }
        Ok(())
    }

    fn send(&mut self, message: Message) -> Result<(), LinkError> {
        let Some(transport) = self.transport.as_mut() else {
            return Err(self.fail_link(LinkError::PeerDisconnected));
        };
        match transport.send(message.to_bytes()) {
            Ok(written) if written >= MESSAGE_LEN => Ok(()),
            Ok(written) => Err(self.fail_link(LinkError::ShortSend {
                written,
                expected: MESSAGE_LEN,
            })),
            Err(err) => Err(self.fail_link(err.into())),
        }
    }

    /// Block for the peer's answer to an exchange.
    ///
    /// A sync message crossing our request is consumed as the barrier
    /// release it is, and the wait goes on.
    fn await_reply(&mut self) -> Result<Message, LinkError> {
        loop {
            let timeout = self.exchange_timeout;
            let Some(transport) = self.transport.as_mut() else {
                return Err(self.fail_link(LinkError::PeerDisconnected));
            };
            let frame = match transport.receive(timeout) {
                Ok(Some(frame)) => frame,
                Ok(None) => return Err(self.fail_link(LinkError::Timeout)),
                Err(err) => return Err(self.fail_link(err.into())),
            };

            let message = Message::from_bytes(frame);
            match message.tag {
                MessageTag::Sync => {
                    self.status.sync = false;
                    self.status.sync_counter = 0;
                }
                MessageTag::Disconnect => return Err(self.fail_link(LinkError::PeerDisconnected)),
                _ => return Ok(message),
            }
        }
    }

    /// Mark both halves of the link down. Terminal until reset.
    fn fail_link(&mut self, err: LinkError) -> LinkError {
        log::error!("SIO: link lost: {err}");
        self.status.connected = false;
        self.status.sync = false;
        self.inbound_connected = false;
        self.outbound_connected = false;
        self.terminated = true;
        err
    }
}

impl Drop for LinkController {
    fn drop(&mut self) {
        self.close_transport();
    }
}
