//! Full-screen capture to a PNG file, used for the settings screenshot and
//! for debug snapshots when a session goes off the rails.

use std::path::Path;

/// Screen capture capability.
pub trait ScreenGrab: Send {
    /// Capture the primary monitor and write it as PNG to `path`.
    fn save(&mut self, path: &Path) -> anyhow::Result<()>;
    /// Primary monitor dimensions in pixels.
    fn screen_size(&mut self) -> anyhow::Result<(u32, u32)>;
}

/// `xcap`-backed capture of the primary monitor.
pub struct XcapGrab;

impl XcapGrab {
    pub fn new() -> Self {
        Self
    }

    fn primary() -> anyhow::Result<xcap::Monitor> {
        let monitors =
            xcap::Monitor::all().map_err(|e| anyhow::anyhow!("failed to list monitors: {e}"))?;
        monitors
            .into_iter()
            .find(|m| m.is_primary())
            .ok_or_else(|| anyhow::anyhow!("no primary monitor found"))
    }
}

impl Default for XcapGrab {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenGrab for XcapGrab {
    fn save(&mut self, path: &Path) -> anyhow::Result<()> {
        let image = Self::primary()?
            .capture_image()
            .map_err(|e| anyhow::anyhow!("failed to capture screen: {e}"))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        image
            .save(path)
            .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", path.display()))
    }

    fn screen_size(&mut self) -> anyhow::Result<(u32, u32)> {
        let primary = Self::primary()?;
        Ok((primary.width(), primary.height()))
    }
}
