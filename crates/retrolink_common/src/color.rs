#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

impl Color {
    pub const BLACK: Color = Color::new_rgb(0, 0, 0);
    pub const WHITE: Color = Color::new_rgb(255, 255, 255);

    /// DMG grayscale shades, lightest first.
    pub const DMG_LIGHTEST: Color = Color::new_rgb(0xFF, 0xFF, 0xFF);
    pub const DMG_LIGHT: Color = Color::new_rgb(0xAA, 0xAA, 0xAA);
    pub const DMG_DARK: Color = Color::new_rgb(0x55, 0x55, 0x55);
    pub const DMG_DARKEST: Color = Color::new_rgb(0x00, 0x00, 0x00);

    /// The four DMG shades indexed by 2-bit color number (0 = white, 3 = black).
    pub const DMG_SHADES: [Color; 4] = [
        Color::DMG_LIGHTEST,
        Color::DMG_LIGHT,
        Color::DMG_DARK,
        Color::DMG_DARKEST,
    ];

    #[inline]
    pub const fn new_rgb(r: u8, g: u8, b: u8) -> Color {
        Color { r, g, b, a: 0xff }
    }

    #[inline]
    pub const fn new_rgba(r: u8, g: u8, b: u8, a: u8) -> Color {
        Color { r, g, b, a }
    }

    #[inline]
    pub const fn rgb(&self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }

    pub fn to_u32(&self) -> u32 {
        u32::from_le_bytes([self.r, self.g, self.b, self.a])
    }

    pub fn from_u32(value: u32) -> Color {
        let [r, g, b, a] = value.to_le_bytes();
        Color { r, g, b, a }
    }
}
