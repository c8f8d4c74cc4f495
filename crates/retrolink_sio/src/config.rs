use std::time::Duration;

use retrolink_common::Color;
use typed_builder::TypedBuilder;

/// Cycles per shifted bit at the normal 8192 Hz serial clock.
pub const DEFAULT_SHIFT_CLOCK: u32 = 512;
/// Cycles per shifted bit with the CGB fast clock (262144 Hz).
pub const FAST_SHIFT_CLOCK: u32 = 16;
/// Cycles between sync barriers when hard sync is enabled.
pub const DEFAULT_SYNC_CLOCK: u32 = 32;
/// Initial sync counter for the instance that starts out waiting.
pub const WAITING_SYNC_COUNTER: u32 = 64;

/// Accessory plugged into the link port.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum Accessory {
    #[default]
    None,
    /// Another emulator instance reached over a peer transport.
    PeerLink,
    Printer,
    MobileAdapter,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum ConsoleGeneration {
    #[default]
    Dmg,
    Cgb,
}

#[derive(TypedBuilder, Clone, Debug)]
pub struct LinkConfig {
    #[builder(default)]
    pub accessory: Accessory,
    #[builder(default)]
    pub generation: ConsoleGeneration,
    /// Keep both peers inside a sync barrier window.
    #[builder(default = false)]
    pub hard_sync: bool,
    #[builder(default = 2000)]
    pub server_port: u16,
    #[builder(default = 2001)]
    pub client_port: u16,
    #[builder(default = "127.0.0.1".to_string(), setter(into))]
    pub client_host: String,
    #[builder(default = DEFAULT_SHIFT_CLOCK)]
    pub shift_clock: u32,
    #[builder(default = DEFAULT_SYNC_CLOCK)]
    pub sync_clock: u32,
    /// Upper bound on a blocking peer exchange. `None` waits forever.
    #[builder(default, setter(strip_option))]
    pub exchange_timeout: Option<Duration>,
    /// Pause taken by the mobile adapter after an unknown command.
    #[builder(default = Duration::from_secs(3))]
    pub unknown_command_delay: Duration,
    /// Background color table used when decoding printer tiles.
    #[builder(default = Color::DMG_SHADES)]
    pub background_palette: [Color; 4],
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl LinkConfig {
    /// Sync counter a fresh session starts with.
    ///
    /// With hard sync the instance owning the higher server port starts
    /// already past the barrier, so it waits for the other side first.
    pub fn initial_sync_counter(&self) -> u32 {
        if self.hard_sync && self.server_port > self.client_port {
            WAITING_SYNC_COUNTER
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dmg_link_timing() {
        let config = LinkConfig::default();
        assert_eq!(config.accessory, Accessory::None);
        assert_eq!(config.shift_clock, 512);
        assert_eq!(config.sync_clock, 32);
        assert_eq!(config.exchange_timeout, None);
        assert_eq!(config.unknown_command_delay, Duration::from_secs(3));
        assert_eq!(config.background_palette, Color::DMG_SHADES);
    }

    #[test]
    fn higher_server_port_starts_waiting() {
        let waiting = LinkConfig::builder()
            .hard_sync(true)
            .server_port(2001)
            .client_port(2000)
            .build();
        assert_eq!(waiting.initial_sync_counter(), WAITING_SYNC_COUNTER);

        let leading = LinkConfig::builder()
            .hard_sync(true)
            .server_port(2000)
            .client_port(2001)
            .build();
        assert_eq!(leading.initial_sync_counter(), 0);

        let no_sync = LinkConfig::builder().server_port(9000).build();
        assert_eq!(no_sync.initial_sync_counter(), 0);
    }
}
