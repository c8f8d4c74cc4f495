mod color;
mod image;

pub use color::Color;
pub use image::Image;
