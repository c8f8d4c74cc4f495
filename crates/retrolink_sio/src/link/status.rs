use crate::config::{Accessory, ConsoleGeneration, LinkConfig};

/// Consumer that currently owns shifted bytes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum DeviceKind {
    #[default]
    None,
    PeerLink(ConsoleGeneration),
    Printer,
    MobileAdapter,
}

impl DeviceKind {
    /// Device active right after a reset. A peer link only becomes active
    /// once both halves of the connection are up.
    pub fn at_reset(accessory: Accessory) -> Self {
        match accessory {
            Accessory::Printer => DeviceKind::Printer,
            Accessory::MobileAdapter => DeviceKind::MobileAdapter,
            Accessory::None | Accessory::PeerLink => DeviceKind::None,
        }
    }
}

/// Per-session link state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LinkStatus {
    pub connected: bool,
    pub active_transfer: bool,
    pub double_speed: bool,
    pub internal_clock: bool,
    pub shifts_left: u8,
    /// Cycles accumulated toward the next bit.
    pub shift_counter: u32,
    /// Cycles per bit for the transfer in flight.
    pub shift_clock: u32,
    /// Waiting at the sync barrier.
    pub sync: bool,
    pub sync_counter: u32,
    pub sync_clock: u32,
    pub transfer_byte: u8,
    pub device_kind: DeviceKind,
}

impl LinkStatus {
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            connected: false,
            active_transfer: false,
            double_speed: false,
            internal_clock: false,
            shifts_left: 0,
            shift_counter: 0,
            shift_clock: config.shift_clock,
            sync: false,
            sync_counter: config.initial_sync_counter(),
            sync_clock: config.sync_clock,
            transfer_byte: 0,
            device_kind: DeviceKind::at_reset(config.accessory),
        }
    }
}
