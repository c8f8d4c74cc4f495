//! Mobile network adapter accessory.
//!
//! Packets look like
//! `[0x99, 0x66, command, 0x00, 0x00, length, payload.., sum_hi, sum_lo, 0x80, ack]`.
//! Only the configuration commands and the session begin/end echoes are
//! answered; the adapter keeps a 192-byte configuration store that outlives
//! every packet.

use std::time::Duration;

use crate::error::AdapterError;
use crate::framing::{additive_checksum, MagicWindow};

pub const ADAPTER_MAGIC: [u8; 2] = [0x99, 0x66];
pub const CONFIG_SIZE: usize = 192;

const COMMAND_OFFSET: usize = 2;
const LENGTH_OFFSET: usize = 5;
/// Magic plus the 4 header bytes.
const HEADER_LEN: usize = 6;
const CHECKSUM_LEN: usize = 2;
/// Config commands carry their offset as the first payload byte.
const CONFIG_OFFSET_FIELD: usize = HEADER_LEN;
/// Read-config carries its length as the second payload byte.
const CONFIG_LENGTH_FIELD: usize = HEADER_LEN + 1;
/// Write-config data follows the offset byte.
const WRITE_DATA_START: usize = HEADER_LEN + 1;

const IDLE_REPLY: u8 = 0x4B;
const CHECKSUM_ERROR_REPLY: u8 = 0xF1;
/// First acknowledge byte the console must send.
const ACK_REQUEST: u8 = 0x80;
/// Adapter id sent back during the acknowledge handshake.
const ADAPTER_ID: u8 = 0x8C;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum AdapterState {
    #[default]
    AwaitingPacket,
    ReceiveHeader,
    ReceiveData,
    ReceiveChecksum,
    AcknowledgePacket,
    EchoPacket,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum AdapterCommand {
    BeginSession = 0x10,
    EndSession = 0x11,
    ReadConfig = 0x19,
    WriteConfig = 0x1A,
}

impl TryFrom<u8> for AdapterCommand {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x10 => Ok(AdapterCommand::BeginSession),
            0x11 => Ok(AdapterCommand::EndSession),
            0x19 => Ok(AdapterCommand::ReadConfig),
            0x1A => Ok(AdapterCommand::WriteConfig),
            other => Err(other),
        }
    }
}

pub struct MobileAdapter {
    state: AdapterState,
    /// Packet in flight, or the reply being echoed in `EchoPacket`.
    packet: Vec<u8>,
    command: u8,
    data_length: u8,
    checksum: u16,
    config: [u8; CONFIG_SIZE],
    /// Next byte of `packet` to shift out while echoing.
    echo_position: usize,
    unknown_command_delay: Duration,
}

impl Default for MobileAdapter {
    fn default() -> Self {
        Self::new([0; CONFIG_SIZE], Duration::ZERO)
    }
}

impl MobileAdapter {
    const MAGIC: MagicWindow = MagicWindow::new(ADAPTER_MAGIC);

    pub fn new(config: [u8; CONFIG_SIZE], unknown_command_delay: Duration) -> Self {
        Self {
            state: AdapterState::AwaitingPacket,
            packet: Vec::new(),
            command: 0,
            data_length: 0,
            checksum: 0,
            config,
            echo_position: 0,
            unknown_command_delay,
        }
    }

    pub fn state(&self) -> AdapterState {
        self.state
    }

    pub fn packet_size(&self) -> usize {
        self.packet.len()
    }

    pub fn config_store(&self) -> &[u8; CONFIG_SIZE] {
        &self.config
    }

    /// Hand the configuration store over, e.g. to carry it into a new
    /// session or persist it.
    pub fn into_config_store(self) -> [u8; CONFIG_SIZE] {
        self.config
    }

    /// Bounds-checked view of `length` config bytes at `offset`.
    pub fn read_config(&self, offset: usize, length: usize) -> Result<&[u8], AdapterError> {
        let range = Self::config_range(offset, length)?;
        Ok(&self.config[range])
    }

    /// Store `data` at `offset`. Nothing is written if any byte would land
    /// out of range.
    pub fn write_config(&mut self, offset: usize, data: &[u8]) -> Result<(), AdapterError> {
        let range = Self::config_range(offset, data.len())?;
        self.config[range].copy_from_slice(data);
        Ok(())
    }

    fn config_range(offset: usize, length: usize) -> Result<std::ops::Range<usize>, AdapterError> {
        match offset.checked_add(length) {
            Some(end) if end <= CONFIG_SIZE => Ok(offset..end),
            _ => Err(AdapterError::ConfigOutOfRange {
                offset,
                length,
                size: CONFIG_SIZE,
            }),
        }
    }

    fn data_end(&self) -> usize {
        HEADER_LEN + self.data_length as usize
    }

    fn checksum_end(&self) -> usize {
        self.data_end() + CHECKSUM_LEN
    }

    /// Consume one shifted byte and return the byte shifted back.
    pub fn shift(&mut self, byte: u8) -> Option<u8> {
        match self.state {
            AdapterState::AwaitingPacket => {
                if Self::MAGIC.push(&mut self.packet, byte) {
                    log::debug!("SIO: mobile adapter magic bytes detected");
                    self.state = AdapterState::ReceiveHeader;
                }
                Some(IDLE_REPLY)
            }

            AdapterState::ReceiveHeader => {
                self.packet.push(byte);
                if self.packet.len() == HEADER_LEN {
                    self.command = self.packet[COMMAND_OFFSET];
                    self.data_length = self.packet[LENGTH_OFFSET];
                    log::debug!(
                        "SIO: mobile adapter command 0x{:02X}, {} data bytes",
                        self.command,
                        self.data_length
                    );
                    self.state = if self.data_length == 0 {
                        AdapterState::ReceiveChecksum
                    } else {
                        AdapterState::ReceiveData
                    };
                }
                Some(IDLE_REPLY)
            }

            AdapterState::ReceiveData => {
                self.packet.push(byte);
                if self.packet.len() == self.data_end() {
                    self.state = AdapterState::ReceiveChecksum;
                }
                Some(IDLE_REPLY)
            }

            AdapterState::ReceiveChecksum => {
                self.packet.push(byte);
                if self.packet.len() < self.checksum_end() {
                    return Some(IDLE_REPLY);
                }

                let at = self.data_end();
                self.checksum = u16::from_be_bytes([self.packet[at], self.packet[at + 1]]);
                let computed = additive_checksum(&self.packet[COMMAND_OFFSET..at]);
                if computed == self.checksum {
                    self.state = AdapterState::AcknowledgePacket;
                    Some(IDLE_REPLY)
                } else {
                    log::warn!(
                        "SIO: mobile adapter checksum mismatch (got 0x{:04X}, computed 0x{computed:04X})",
                        self.checksum
                    );
                    self.abort_packet();
                    Some(CHECKSUM_ERROR_REPLY)
                }
            }

            AdapterState::AcknowledgePacket => {
                if self.packet.len() == self.checksum_end() {
                    if byte != ACK_REQUEST {
                        self.abort_packet();
                        return Some(IDLE_REPLY);
                    }
                    self.packet.push(byte);
                    return Some(ADAPTER_ID);
                }

                self.packet.push(byte);
                let reply = ACK_REQUEST ^ self.command;
                if let Err(err) = self.execute_command() {
                    log::error!("SIO: mobile adapter command 0x{:02X} failed: {err}", self.command);
                    self.abort_packet();
                }
                Some(reply)
            }

            AdapterState::EchoPacket => {
                let reply = self.packet.get(self.echo_position).copied();
                self.echo_position += 1;
                if self.echo_position >= self.packet.len() {
                    log::debug!("SIO: mobile adapter echo done");
                    self.abort_packet();
                }
                reply
            }
        }
    }

    fn abort_packet(&mut self) {
        self.packet.clear();
        self.echo_position = 0;
        self.state = AdapterState::AwaitingPacket;
    }

    fn start_echo(&mut self) {
        self.echo_position = 0;
        self.state = AdapterState::EchoPacket;
    }

    fn execute_command(&mut self) -> Result<(), AdapterError> {
        match AdapterCommand::try_from(self.command) {
            Ok(AdapterCommand::BeginSession | AdapterCommand::EndSession) => {
                // Echo the request with the adapter's handshake in place of
                // the console's acknowledge bytes.
                let footer = handshake_footer(self.command);
                let n = self.packet.len();
                self.packet[n - 2..].copy_from_slice(&footer);
                self.start_echo();
            }

            Ok(AdapterCommand::ReadConfig) => {
                self.require_arguments(2)?;
                let offset = self.packet[CONFIG_OFFSET_FIELD];
                let length = self.packet[CONFIG_LENGTH_FIELD];
                let body = self.read_config(offset as usize, length as usize)?.to_vec();
                self.packet = reply_packet(self.command, &body);
                self.start_echo();
            }

            Ok(AdapterCommand::WriteConfig) => {
                // No payload past the offset byte writes nothing but is
                // still acknowledged.
                let data_end = self.data_end();
                let data = self
                    .packet
                    .get(WRITE_DATA_START..data_end)
                    .unwrap_or_default()
                    .to_vec();
                if !data.is_empty() {
                    let offset = self.packet[CONFIG_OFFSET_FIELD] as usize;
                    self.write_config(offset, &data)?;
                }
                self.packet = reply_packet(self.command, &[]);
                self.start_echo();
            }

            Err(command) => {
                log::warn!("SIO: mobile adapter unknown command 0x{command:02X}");
                if !self.unknown_command_delay.is_zero() {
                    std::thread::sleep(self.unknown_command_delay);
                }
                self.abort_packet();
            }
        }
        Ok(())
    }

    fn require_arguments(&self, expected: usize) -> Result<(), AdapterError> {
        let actual = self.data_length as usize;
        if actual < expected {
            return Err(AdapterError::MissingArguments {
                command: self.command,
                expected,
                actual,
            });
        }
        Ok(())
    }
}

/// Adapter id followed by the command-specific acknowledgement.
fn handshake_footer(command: u8) -> [u8; 2] {
    [ADAPTER_ID, ADAPTER_ID ^ command]
}

/// Build a complete reply packet: magic, header, body, big-endian checksum
/// and handshake footer.
fn reply_packet(command: u8, body: &[u8]) -> Vec<u8> {
    let mut packet = ADAPTER_MAGIC.to_vec();
    packet.extend_from_slice(&[command, 0x00, 0x00, body.len() as u8]);
    packet.extend_from_slice(body);
    let checksum = additive_checksum(&packet[COMMAND_OFFSET..]);
    packet.extend_from_slice(&checksum.to_be_bytes());
    packet.extend_from_slice(&handshake_footer(command));
    packet
}
