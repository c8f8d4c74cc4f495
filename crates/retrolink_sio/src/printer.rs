//! Thermal printer accessory.
//!
//! Packets look like
//! `[0x88, 0x33, command, compression, len_lo, len_hi, payload.., sum_lo, sum_hi, 0x00, 0x00]`.
//! The checksum covers everything between the magic bytes and the checksum
//! itself. The two trailing zero bytes are answered with `0x81` and then with
//! the printer status.
mod decode;


use bitflags::bitflags;
use retrolink_common::{Color, Image};

use crate::framing::{additive_checksum, MagicWindow};
use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};

pub const PRINTER_MAGIC: [u8; 2] = [0x88, 0x33];

const COMMAND_OFFSET: usize = 2;
const COMPRESSION_OFFSET: usize = 3;
const LENGTH_OFFSET: usize = 4;
/// Magic, command, compression flag and the two length bytes.
const HEADER_LEN: usize = 6;
const CHECKSUM_LEN: usize = 2;
/// Palette byte inside a print command's payload.
const PALETTE_OFFSET: usize = HEADER_LEN + 2;
/// Identity mapping, used when a print packet carries no palette byte.
const DEFAULT_PALETTE: u8 = 0xE4;

const IDLE_REPLY: u8 = 0x00;
const ACK_REPLY: u8 = 0x81;

/// Rows per strip; one data packet fills one strip.
pub const STRIP_ROWS: usize = 16;
pub const STRIP_PIXELS: usize = SCREEN_WIDTH * STRIP_ROWS;
/// The scanline buffer never shrinks below one screen worth of rows.
pub const SCANLINE_BASE_LEN: usize = SCREEN_WIDTH * SCREEN_HEIGHT;
/// Strips held between prints. Long banners span several screens; data
/// past this is dropped and reported as `IMAGE_DATA_FULL`.
pub const MAX_STRIPS: u16 = 64;

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct PrinterStatus: u8 {
        const CHECKSUM_ERROR = 0x01;
        /// Never reported: a print completes within the acknowledging shift.
        const PRINTING = 0x02;
        const IMAGE_DATA_FULL = 0x04;
        const UNPROCESSED_DATA = 0x08;
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum PrinterState {
    #[default]
    AwaitingPacket,
    ReceiveCommand,
    ReceiveCompressionFlag,
    ReceiveLength,
    ReceiveData,
    ReceiveChecksum,
    AcknowledgePacket,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum PrinterCommand {
    Initialize = 0x01,
    Print = 0x02,
    Data = 0x04,
    Status = 0x0F,
}

impl TryFrom<u8> for PrinterCommand {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(PrinterCommand::Initialize),
            0x02 => Ok(PrinterCommand::Print),
            0x04 => Ok(PrinterCommand::Data),
            0x0F => Ok(PrinterCommand::Status),
            other => Err(other),
        }
    }
}

pub struct Printer {
    state: PrinterState,
    /// Bytes of the packet in flight, starting with the magic pair.
    packet: Vec<u8>,
    command: u8,
    compression_flag: u8,
    data_length: u16,
    checksum: u16,
    status: PrinterStatus,
    strip_count: u16,
    /// Printer palette: shade per 2-bit color, from the print packet.
    palette: [u8; 4],
    /// Decoded pixels, packed RGBA, 160 per row.
    scanlines: Vec<u32>,
    background: [Color; 4],
    printed: Option<Image>,
}

impl Default for Printer {
    fn default() -> Self {
        Self::new(Color::DMG_SHADES)
    }
}

impl Printer {
    const MAGIC: MagicWindow = MagicWindow::new(PRINTER_MAGIC);

    /// `background` is the 4-entry color table tile pixels decode through.
    pub fn new(background: [Color; 4]) -> Self {
        Self {
            state: PrinterState::AwaitingPacket,
            packet: Vec::new(),
            command: 0,
            compression_flag: 0,
            data_length: 0,
            checksum: 0,
            status: PrinterStatus::empty(),
            strip_count: 0,
            palette: [0; 4],
            scanlines: vec![0; SCANLINE_BASE_LEN],
            background,
            printed: None,
        }
    }

    pub fn state(&self) -> PrinterState {
        self.state
    }

    pub fn status(&self) -> PrinterStatus {
        self.status
    }

    pub fn strip_count(&self) -> u16 {
        self.strip_count
    }

    pub fn packet_size(&self) -> usize {
        self.packet.len()
    }

    pub fn scanlines(&self) -> &[u32] {
        &self.scanlines
    }

    pub fn palette(&self) -> [u8; 4] {
        self.palette
    }

    /// Take the page produced by the last print command, if any.
    pub fn take_printed(&mut self) -> Option<Image> {
        self.printed.take()
    }

    fn data_end(&self) -> usize {
        HEADER_LEN + self.data_length as usize
    }

    fn checksum_end(&self) -> usize {
        self.data_end() + CHECKSUM_LEN
    }

    /// Consume one shifted byte. Returns the byte shifted back, or `None`
    /// when the printer ignores the byte and raises no interrupt.
    pub fn shift(&mut self, byte: u8) -> Option<u8> {
        match self.state {
            PrinterState::AwaitingPacket => {
                if Self::MAGIC.push(&mut self.packet, byte) {
                    self.state = PrinterState::ReceiveCommand;
                }
            }

            PrinterState::ReceiveCommand => {
                self.packet.push(byte);
                self.command = self.packet[COMMAND_OFFSET];
                if PrinterCommand::try_from(self.command).is_ok() {
                    self.state = PrinterState::ReceiveCompressionFlag;
                } else {
                    log::warn!("SIO: invalid printer command 0x{byte:02X}");
                    self.abort_packet();
                }
            }

            PrinterState::ReceiveCompressionFlag => {
                self.packet.push(byte);
                self.compression_flag = self.packet[COMPRESSION_OFFSET];
                self.state = PrinterState::ReceiveLength;
            }

            PrinterState::ReceiveLength => {
                self.packet.push(byte);
                if self.packet.len() == HEADER_LEN {
                    self.data_length = u16::from_le_bytes([
                        self.packet[LENGTH_OFFSET],
                        self.packet[LENGTH_OFFSET + 1],
                    ]);
                    self.state = if self.data_length > 0 {
                        PrinterState::ReceiveData
                    } else {
                        PrinterState::ReceiveChecksum
                    };
                }
            }

            PrinterState::ReceiveData => {
                self.packet.push(byte);
                if self.packet.len() == self.data_end() {
                    self.state = PrinterState::ReceiveChecksum;
                }
            }

            PrinterState::ReceiveChecksum => {
                self.packet.push(byte);
                if self.packet.len() == self.checksum_end() {
                    let at = self.data_end();
                    self.checksum = u16::from_le_bytes([self.packet[at], self.packet[at + 1]]);
                    let computed = additive_checksum(&self.packet[COMMAND_OFFSET..at]);
                    if computed != self.checksum {
                        log::warn!(
                            "SIO: printer checksum mismatch (got 0x{:04X}, computed 0x{computed:04X})",
                            self.checksum
                        );
                    }
                    self.status
                        .set(PrinterStatus::CHECKSUM_ERROR, computed != self.checksum);
                    self.state = PrinterState::AcknowledgePacket;
                }
            }

            PrinterState::AcknowledgePacket => {
                if byte != 0 {
                    return None;
                }
                self.packet.push(byte);
                if self.packet.len() - self.checksum_end() == 1 {
                    return Some(ACK_REPLY);
                }
                self.execute_command();
                let reply = self.status.bits();
                self.abort_packet();
                return Some(reply);
            }
        }

        Some(IDLE_REPLY)
    }

    fn abort_packet(&mut self) {
        self.packet.clear();
        self.state = PrinterState::AwaitingPacket;
    }

    fn execute_command(&mut self) {
        match PrinterCommand::try_from(self.command) {
            Ok(PrinterCommand::Initialize) => {
                self.status = PrinterStatus::empty();
                self.strip_count = 0;
                self.scanlines.clear();
                self.scanlines.resize(SCANLINE_BASE_LEN, 0);
            }
            Ok(PrinterCommand::Print) => {
                self.print_image();
                self.status = PrinterStatus::IMAGE_DATA_FULL;
            }
            Ok(PrinterCommand::Data) => {
                if self.process_data() {
                    self.status = PrinterStatus::UNPROCESSED_DATA;
                }
            }
            Ok(PrinterCommand::Status) => {}
            Err(command) => log::warn!("SIO: invalid printer command 0x{command:02X}"),
        }
    }

    /// Decode the payload into the next strip. Returns `true` if a strip
    /// was added.
    fn process_data(&mut self) -> bool {
        if self.data_length == 0 {
            return false;
        }
        let next_count = match self.strip_count.checked_add(1) {
            Some(count) if count <= MAX_STRIPS => count,
            _ => {
                log::warn!(
                    "SIO: printer buffer full at {} strips, dropping data packet",
                    self.strip_count
                );
                self.status.insert(PrinterStatus::IMAGE_DATA_FULL);
                return false;
            }
        };

        let strip = self.strip_count as usize;
        let needed = (strip + 1) * STRIP_PIXELS;
        if self.scanlines.len() < needed {
            self.scanlines.resize(needed, 0);
        }

        let payload = &self.packet[HEADER_LEN..self.data_end()];
        if self.compression_flag != 0 {
            let tiles = decode::expand_rle(payload);
            decode::decode_strip(&tiles, strip, &self.background, &mut self.scanlines);
        } else {
            decode::decode_strip(payload, strip, &self.background, &mut self.scanlines);
        }

        self.strip_count = next_count;
        true
    }

    fn print_image(&mut self) {
        let palette_byte = if self.data_length as usize > PALETTE_OFFSET - HEADER_LEN {
            self.packet[PALETTE_OFFSET]
        } else {
            DEFAULT_PALETTE
        };
        for (i, shade) in self.palette.iter_mut().enumerate() {
            *shade = (palette_byte >> (i * 2)) & 0x03;
        }

        let strips = (self.strip_count as usize).min(self.scanlines.len() / STRIP_PIXELS);
        let height = STRIP_ROWS * strips;
        let pixels = SCREEN_WIDTH * height;
        let background = self.background.map(|c| c.to_u32());

        for pixel in &mut self.scanlines[..pixels] {
            let color = background.iter().position(|&c| c == *pixel).unwrap_or(0);
            *pixel = background[self.palette[color] as usize];
        }

        let image = Image::new(SCREEN_WIDTH, height, self.scanlines[..pixels].to_vec());
        if image.is_empty() {
            log::warn!("SIO: print requested with no image data");
        } else {
            log::info!("SIO: printed {SCREEN_WIDTH}x{height} image");
            self.printed = Some(image);
        }
        self.strip_count = 0;
    }
}
