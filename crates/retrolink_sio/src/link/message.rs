/// Every peer message is `[payload, tag]`.
pub const MESSAGE_LEN: usize = 2;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MessageTag {
    /// Ordinary shifted byte.
    Data,
    /// Sync barrier. The same tag starts a wait and releases the peer.
    Sync,
    /// Infra-red level in payload bit 0.
    InfraRed,
    InfraRedAck,
    Disconnect,
    /// Unknown non-zero tag; ignored by receivers.
    Other(u8),
}

impl MessageTag {
    pub const fn from_byte(value: u8) -> Self {
        match value {
            0x00 => MessageTag::Data,
            0xFF => MessageTag::Sync,
            0x40 => MessageTag::InfraRed,
            0x41 => MessageTag::InfraRedAck,
            0x80 => MessageTag::Disconnect,
            other => MessageTag::Other(other),
        }
    }

    pub const fn to_byte(self) -> u8 {
        match self {
            MessageTag::Data => 0x00,
            MessageTag::Sync => 0xFF,
            MessageTag::InfraRed => 0x40,
            MessageTag::InfraRedAck => 0x41,
            MessageTag::Disconnect => 0x80,
            MessageTag::Other(other) => other,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Message {
    pub payload: u8,
    pub tag: MessageTag,
}

impl Message {
    pub const fn new(payload: u8, tag: MessageTag) -> Self {
        Self { payload, tag }
    }

    pub const fn data(byte: u8) -> Self {
        Self::new(byte, MessageTag::Data)
    }

    pub const fn sync() -> Self {
        Self::new(0, MessageTag::Sync)
    }

    pub const fn infrared(level: u8) -> Self {
        Self::new(level, MessageTag::InfraRed)
    }

    pub const fn infrared_ack(level: u8) -> Self {
        Self::new(level, MessageTag::InfraRedAck)
    }

    pub const fn disconnect() -> Self {
        Self::new(0, MessageTag::Disconnect)
    }

    pub const fn to_bytes(self) -> [u8; MESSAGE_LEN] {
        [self.payload, self.tag.to_byte()]
    }

    pub const fn from_bytes(bytes: [u8; MESSAGE_LEN]) -> Self {
        Self::new(bytes[0], MessageTag::from_byte(bytes[1]))
    }
}
