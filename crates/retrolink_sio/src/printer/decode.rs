use retrolink_common::Color;

use super::STRIP_PIXELS;
use crate::SCREEN_WIDTH;

/// Tiles per data packet: two bands of 20 tiles.
pub(super) const TILES_PER_STRIP: usize = 40;
const TILES_PER_BAND: usize = 20;
const TILE_ROWS: usize = 8;
const BYTES_PER_ROW: usize = 2;
pub(super) const TILE_BYTES: usize = TILE_ROWS * BYTES_PER_ROW;
/// Offset of the lower 8-row band within a strip.
const BAND_OFFSET: usize = SCREEN_WIDTH * TILE_ROWS;

/// Expand the printer's run-length encoding.
///
/// A control byte with bit 7 set repeats the next byte `(n & 0x7F) + 2`
/// times; otherwise the next `n + 1` bytes are copied as-is. A run that
/// promises more bytes than remain is cut short.
pub(super) fn expand_rle(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(TILES_PER_STRIP * TILE_BYTES);
    let mut input = payload.iter().copied();

    while let Some(control) = input.next() {
        if control & 0x80 != 0 {
            let count = (control & 0x7F) as usize + 2;
            let Some(value) = input.next() else {
                log::warn!("SIO: compressed printer run is missing its value byte");
                break;
            };
            out.extend(std::iter::repeat(value).take(count));
        } else {
            let count = control as usize + 1;
            let before = out.len();
            out.extend(input.by_ref().take(count));
            if out.len() - before < count {
                log::warn!("SIO: literal printer run truncated");
                break;
            }
        }
    }
    out
}

/// Decode 40 tiles of 2bpp data into strip `strip` of `scanlines`.
///
/// Tiles 0..20 form the upper 160x8 band and tiles 20..40 the lower one.
/// Short input decodes as many complete tile rows as it holds.
pub(super) fn decode_strip(
    tiles: &[u8],
    strip: usize,
    background: &[Color; 4],
    scanlines: &mut [u32],
) {
    let expected = TILES_PER_STRIP * TILE_BYTES;
    if tiles.len() < expected {
        log::warn!(
            "SIO: printer strip has {} of {expected} tile bytes",
            tiles.len()
        );
    }

    let strip_base = strip * STRIP_PIXELS;
    for (index, row_bytes) in tiles
        .chunks_exact(BYTES_PER_ROW)
        .take(TILES_PER_STRIP * TILE_ROWS)
        .enumerate()
    {
        let tile = index / TILE_ROWS;
        let row = index % TILE_ROWS;
        let mut base = strip_base + (tile % TILES_PER_BAND) * 8 + row * SCREEN_WIDTH;
        if tile >= TILES_PER_BAND {
            base += BAND_OFFSET;
        }

        let (lo, hi) = (row_bytes[0], row_bytes[1]);
        for x in 0..8 {
            let bit = 7 - x;
            let color = (((hi >> bit) & 0x01) << 1) | ((lo >> bit) & 0x01);
            if let Some(pixel) = scanlines.get_mut(base + x) {
                *pixel = background[color as usize].to_u32();
            }
        }
    }
}
