use std::path::PathBuf;

use anyhow::{Context, Result};
use retrolink_common::Image;
use retrolink_sio::ImageSink;

/// Writes every printed page as a raw RGB24 dump named `gb_print_<random>`.
pub struct FileSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ImageSink for FileSink {
    fn print(&mut self, image: &Image) -> Result<()> {
        let path = self
            .dir
            .join(format!("gb_print_{}", rand::random::<u32>()));
        let buffer = image.to_rgb24();
        std::fs::write(&path, &buffer)
            .with_context(|| format!("Failed to write '{}'", path.display()))?;
        log::info!(
            "Wrote {} bytes ({}x{} rgb24) to '{}'",
            buffer.len(),
            image.width,
            image.height,
            path.display()
        );
        self.written.push(path);
        Ok(())
    }
}
