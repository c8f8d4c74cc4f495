use crate::Color;

/// A finished raster: `width * height` packed RGBA pixels, row-major.
///
/// Pixels are stored in the packed form produced by [`Color::to_u32`], which
/// is what the printer keeps in its scanline buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

impl Image {
    pub fn new(width: usize, height: usize, pixels: Vec<u32>) -> Self {
        debug_assert_eq!(pixels.len(), width * height);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Color> {
        if x >= self.width {
            return None;
        }
        self.pixels
            .get(y * self.width + x)
            .copied()
            .map(Color::from_u32)
    }

    /// Expand to an RGB24 buffer (3 bytes per pixel), the same layout the
    /// frontends upload as a texture.
    pub fn to_rgb24(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 3);
        for &packed in &self.pixels {
            let (r, g, b) = Color::from_u32(packed).rgb();
            out.extend_from_slice(&[r, g, b]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::Image;
    use crate::Color;

    #[test]
    fn rgb24_drops_alpha() {
        let img = Image::new(
            2,
            1,
            vec![Color::DMG_LIGHT.to_u32(), Color::new_rgba(1, 2, 3, 0).to_u32()],
        );
        assert_eq!(img.to_rgb24(), vec![0xAA, 0xAA, 0xAA, 1, 2, 3]);
    }

    #[test]
    fn pixel_lookup_is_bounds_checked() {
        let img = Image::new(1, 1, vec![Color::BLACK.to_u32()]);
        assert_eq!(img.pixel(0, 0), Some(Color::BLACK));
        assert_eq!(img.pixel(1, 0), None);
        assert_eq!(img.pixel(0, 1), None);
    }

    #[test]
    fn zero_sized_image_is_empty() {
        assert!(Image::new(160, 0, Vec::new()).is_empty());
        assert!(Image::default().is_empty());
        assert!(!Image::new(1, 1, vec![0]).is_empty());
    }
}
