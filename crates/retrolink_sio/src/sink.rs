use retrolink_common::Image;

/// Receives finished printer pages.
pub trait ImageSink {
    fn print(&mut self, image: &Image) -> anyhow::Result<()>;
}

/// Keeps every printed page in memory.
#[derive(Default, Debug)]
pub struct MemorySink {
    pub pages: Vec<Image>,
}

impl ImageSink for MemorySink {
    fn print(&mut self, image: &Image) -> anyhow::Result<()> {
        self.pages.push(image.clone());
        Ok(())
    }
}
