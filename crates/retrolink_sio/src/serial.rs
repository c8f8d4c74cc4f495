//! Link port front end: owns the shift clock and routes every completed byte
//! to whichever device is plugged in.

use crate::config::{Accessory, LinkConfig};
use crate::error::LinkError;
use crate::link::{LinkController, LinkStatus, PeerTransport};
use crate::mobile::{MobileAdapter, CONFIG_SIZE};
use crate::printer::Printer;
use crate::registers::{LinkRegisters, RegisterFile, SerialControl};
use crate::sink::ImageSink;

/// Byte read back when nothing answers on the other end of the cable.
const OPEN_BUS: u8 = 0xFF;

/// Consumer of shifted bytes. Exactly one is active at a time.
enum Device {
    None,
    PeerLink,
    Printer(Printer),
    MobileAdapter(MobileAdapter),
}

impl Device {
    fn for_accessory(config: &LinkConfig, mobile_config: Option<[u8; CONFIG_SIZE]>) -> Self {
        match config.accessory {
            Accessory::Printer => Device::Printer(Printer::new(config.background_palette)),
            Accessory::MobileAdapter => Device::MobileAdapter(MobileAdapter::new(
                mobile_config.unwrap_or([0; CONFIG_SIZE]),
                config.unknown_command_delay,
            )),
            // The peer only takes over once the connection is up.
            Accessory::None | Accessory::PeerLink => Device::None,
        }
    }
}

pub struct SerialLink {
    config: LinkConfig,
    link: LinkController,
    device: Device,
    sink: Box<dyn ImageSink>,
}

impl SerialLink {
    pub fn new(
        config: LinkConfig,
        sink: Box<dyn ImageSink>,
        transport: Option<Box<dyn PeerTransport>>,
    ) -> Self {
        let link = LinkController::new(&config, transport);
        let device = Device::for_accessory(&config, None);
        Self {
            config,
            link,
            device,
            sink,
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn status(&self) -> &LinkStatus {
        self.link.status()
    }

    pub fn link(&self) -> &LinkController {
        &self.link
    }

    pub fn printer(&self) -> Option<&Printer> {
        match &self.device {
            Device::Printer(printer) => Some(printer),
            _ => None,
        }
    }

    pub fn mobile_adapter(&self) -> Option<&MobileAdapter> {
        match &self.device {
            Device::MobileAdapter(adapter) => Some(adapter),
            _ => None,
        }
    }

    /// Replace the mobile adapter's configuration store, e.g. with one saved
    /// by a previous run. Returns `false` if no adapter is plugged in.
    pub fn load_mobile_config(&mut self, store: [u8; CONFIG_SIZE]) -> bool {
        match &mut self.device {
            Device::MobileAdapter(adapter) => {
                *adapter = MobileAdapter::new(store, self.config.unknown_command_delay);
                true
            }
            _ => false,
        }
    }

    /// The host must stop advancing the CPU while this is set: we reached
    /// the sync barrier and the peer has not caught up yet.
    pub fn is_stalled(&self) -> bool {
        self.link.status().sync
    }

    pub fn set_double_speed(&mut self, enabled: bool) {
        self.link.set_double_speed(enabled);
    }

    /// Tear down the session and rebuild it from the current config.
    ///
    /// The mobile adapter's configuration store is carried over.
    pub fn reset(&mut self) {
        let mobile_config = match std::mem::replace(&mut self.device, Device::None) {
            Device::MobileAdapter(adapter) => Some(adapter.into_config_store()),
            _ => None,
        };
        self.link.reset(&self.config);
        self.device = Device::for_accessory(&self.config, mobile_config);
    }

    /// Poll connection setup. Once both halves of the peer link are up the
    /// peer owns the port.
    pub fn process_network_communication(&mut self) {
        self.link.process_network_communication();
        if self.link.is_connected() && !matches!(self.device, Device::PeerLink) {
            log::info!("SIO: peer link active");
            self.device = Device::PeerLink;
        }
    }

    /// Call after the host wrote SC.
    pub fn write_control(&mut self, regs: &impl LinkRegisters) {
        let control = regs.control();
        if control.contains(SerialControl::TRANSFER_START) {
            self.link.start_transfer(control, regs.transfer_byte());
        }
    }

    /// Advance the link by `cycles` CPU cycles.
    pub fn tick(&mut self, cycles: u32, regs: &mut impl LinkRegisters) -> Result<(), LinkError> {
        if matches!(self.device, Device::PeerLink) {
            self.link.receive_byte(regs)?;
            self.link.tick_sync(cycles)?;
            if self.is_stalled() {
                return Ok(());
            }
        }

        if self.link.tick_shift(cycles) {
            self.shift_event(regs)?;
        }
        Ok(())
    }

    pub fn send_ir_signal(&mut self, regs: &mut impl LinkRegisters) -> Result<(), LinkError> {
        if !self.link.is_connected() {
            regs.clear_ir_send();
            return Ok(());
        }
        self.link.send_ir_signal(regs)
    }

    /// Route the completed byte to the active device.
    fn shift_event(&mut self, regs: &mut impl LinkRegisters) -> Result<(), LinkError> {
        regs.clear_transfer_start();
        let byte = self.link.status().transfer_byte;

        let reply = match &mut self.device {
            Device::PeerLink if self.link.is_connected() => return self.link.send_byte(regs),
            Device::Printer(printer) => {
                let reply = printer.shift(byte);
                if let Some(image) = printer.take_printed() {
                    if let Err(err) = self.sink.print(&image) {
                        log::error!("SIO: could not hand printed page over: {err:#}");
                    }
                }
                reply
            }
            Device::MobileAdapter(adapter) => adapter.shift(byte),
            Device::PeerLink | Device::None => Some(OPEN_BUS),
        };

        if let Some(reply) = reply {
            regs.set_transfer_byte(reply);
            self.link.status.transfer_byte = reply;
            regs.request_interrupt();
        }
        Ok(())
    }

    /// Shift one byte out as the clock master and return what came back.
    ///
    /// Drives a whole transfer: SB is loaded, SC gets start and internal
    /// clock, and the shift clock is run to completion.
    pub fn transfer(&mut self, regs: &mut RegisterFile, byte: u8) -> Result<u8, LinkError> {
        regs.sb = byte;
        regs.sc |= (SerialControl::TRANSFER_START | SerialControl::INTERNAL_CLOCK).bits();
        self.write_control(regs);

        let cycles = self.link.status().shift_clock * 8;
        if self.link.tick_shift(cycles) {
            self.shift_event(regs)?;
        }
        Ok(regs.sb)
    }
}
