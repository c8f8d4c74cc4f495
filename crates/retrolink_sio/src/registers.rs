//! Register-side view of the link port.
//!
//! The core never owns the memory map. It talks to the host through
//! [`LinkRegisters`], which covers SB (FF01), SC (FF02), the serial bit of IF
//! (FF0F) and the CGB infra-red port RP (FF56).

use bitflags::bitflags;

bitflags! {
    /// Serial control register (SC) bits.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct SerialControl: u8 {
        /// Use the internal clock (this console is the master).
        const INTERNAL_CLOCK = 0x01;
        /// CGB only: fast clock.
        const FAST_CLOCK = 0x02;
        const TRANSFER_START = 0x80;
    }
}

/// Serial interrupt bit in IF.
pub const SERIAL_INTERRUPT: u8 = 0x08;
/// RP bit 1: set while no infra-red signal is being received.
pub const RP_NO_SIGNAL: u8 = 0x02;

pub trait LinkRegisters {
    /// Current SB value.
    fn transfer_byte(&self) -> u8;
    fn set_transfer_byte(&mut self, value: u8);
    fn control(&self) -> SerialControl;
    /// Clear SC bit 7 once a byte has completed.
    fn clear_transfer_start(&mut self);
    fn request_interrupt(&mut self);
    /// Update the RP receive bit for an incoming IR level.
    fn set_ir_reception(&mut self, receiving: bool);
    /// Outgoing IR level (bit 0 significant).
    fn ir_signal(&self) -> u8;
    /// Clear the "IR send pending" flag after the peer acknowledged.
    fn clear_ir_send(&mut self);
}

/// Plain register file used by hosts that do not map the link port onto a
/// larger bus, and by tests.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegisterFile {
    pub sb: u8,
    pub sc: u8,
    pub if_reg: u8,
    pub rp: u8,
    pub ir_signal: u8,
    pub ir_send: bool,
}

impl Default for RegisterFile {
    fn default() -> Self {
        // Matches the post-boot state: unused SC bits read back as 1.
        Self {
            sb: 0x00,
            sc: 0x7E,
            if_reg: 0x00,
            rp: RP_NO_SIGNAL,
            ir_signal: 0,
            ir_send: false,
        }
    }
}

impl RegisterFile {
    /// Take and clear a pending serial interrupt request.
    pub fn take_interrupt(&mut self) -> bool {
        let pending = self.if_reg & SERIAL_INTERRUPT != 0;
        self.if_reg &= !SERIAL_INTERRUPT;
        pending
    }
}

impl LinkRegisters for RegisterFile {
    fn transfer_byte(&self) -> u8 {
        self.sb
    }

    fn set_transfer_byte(&mut self, value: u8) {
        self.sb = value;
    }

    fn control(&self) -> SerialControl {
        SerialControl::from_bits_truncate(self.sc)
    }

    fn clear_transfer_start(&mut self) {
        self.sc &= !SerialControl::TRANSFER_START.bits();
    }

    fn request_interrupt(&mut self) {
        self.if_reg |= SERIAL_INTERRUPT;
    }

    fn set_ir_reception(&mut self, receiving: bool) {
        if receiving {
            self.rp &= !RP_NO_SIGNAL;
        } else {
            self.rp |= RP_NO_SIGNAL;
        }
    }

    fn ir_signal(&self) -> u8 {
        self.ir_signal
    }

    fn clear_ir_send(&mut self) {
        self.ir_send = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_ignores_unused_bits() {
        let regs = RegisterFile {
            sc: 0xFF,
            ..RegisterFile::default()
        };
        assert_eq!(
            regs.control(),
            SerialControl::TRANSFER_START
                | SerialControl::FAST_CLOCK
                | SerialControl::INTERNAL_CLOCK
        );
    }

    #[test]
    fn clearing_start_keeps_other_bits() {
        let mut regs = RegisterFile {
            sc: 0x81,
            ..RegisterFile::default()
        };
        regs.clear_transfer_start();
        assert_eq!(regs.sc, 0x01);
    }

    #[test]
    fn ir_reception_toggles_rp_bit() {
        let mut regs = RegisterFile::default();
        regs.set_ir_reception(true);
        assert_eq!(regs.rp & RP_NO_SIGNAL, 0);
        regs.set_ir_reception(false);
        assert_eq!(regs.rp & RP_NO_SIGNAL, RP_NO_SIGNAL);
    }

    #[test]
    fn interrupt_is_taken_once() {
        let mut regs = RegisterFile::default();
        regs.request_interrupt();
        assert!(regs.take_interrupt());
        assert!(!regs.take_interrupt());
    }
}
