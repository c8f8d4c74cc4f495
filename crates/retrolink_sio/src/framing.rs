/// Two-byte magic prefix detector shared by the printer and the mobile
/// adapter.
///
/// While a device waits for a packet it keeps at most the last two bytes it
/// saw. Once two bytes are held and they are not the magic pair, the oldest
/// one is dropped so the next byte can complete a match.
#[derive(Copy, Clone, Debug)]
pub(crate) struct MagicWindow {
    magic: [u8; 2],
}

impl MagicWindow {
    pub(crate) const fn new(magic: [u8; 2]) -> Self {
        Self { magic }
    }

    /// Append `byte` to `buffer`. Returns `true` once `buffer` holds exactly
    /// the magic pair.
    pub(crate) fn push(&self, buffer: &mut Vec<u8>, byte: u8) -> bool {
        if buffer.len() >= self.magic.len() {
            let keep = buffer.len() - 1;
            buffer.drain(..keep);
        }
        buffer.push(byte);

        if buffer.len() < self.magic.len() {
            return false;
        }
        if buffer[..] == self.magic {
            return true;
        }
        // Slide: keep only the newest byte.
        buffer.remove(0);
        false
    }
}

/// 16-bit additive checksum with wraparound, as used by both accessory
/// protocols.
pub fn additive_checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |sum, &b| sum.wrapping_add(b as u16))
}
