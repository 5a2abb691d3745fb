//! Visual locator: find a reference image on the live screen.
//!
//! The engine only depends on the [`Locator`] trait. [`TemplateLocator`] is
//! the shipped implementation: a deliberately simple grayscale
//! mean-absolute-difference scan over an `xcap` capture of the primary
//! monitor. It is the thin shell around the engine, not the engine.

use std::path::Path;

use image::{DynamicImage, GrayImage};

/// On-screen bounding box of a matched element, in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn center(&self) -> (i32, i32) {
        (
            self.x + self.width as i32 / 2,
            self.y + self.height as i32 / 2,
        )
    }
}

/// Single observation of the screen for one reference image.
///
/// `Ok(None)` means "not currently visible"; `Err` means the capability
/// itself failed (no monitor, unreadable template) and is surfaced to the
/// session boundary.
pub trait Locator: Send {
    fn find(&mut self, template: &Path, confidence: f32) -> anyhow::Result<Option<Region>>;
}

/// Template matcher over the primary monitor.
pub struct TemplateLocator;

impl TemplateLocator {
    pub fn new() -> Self {
        Self
    }

    fn capture_primary() -> anyhow::Result<GrayImage> {
        let monitors =
            xcap::Monitor::all().map_err(|e| anyhow::anyhow!("failed to list monitors: {e}"))?;
        let primary = monitors
            .into_iter()
            .find(|m| m.is_primary())
            .ok_or_else(|| anyhow::anyhow!("no primary monitor found"))?;
        let image = primary
            .capture_image()
            .map_err(|e| anyhow::anyhow!("failed to capture screen: {e}"))?;
        Ok(DynamicImage::ImageRgba8(image).into_luma8())
    }
}

impl Default for TemplateLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl Locator for TemplateLocator {
    fn find(&mut self, template: &Path, confidence: f32) -> anyhow::Result<Option<Region>> {
        let template = image::open(template)
            .map_err(|e| anyhow::anyhow!("failed to load template {}: {e}", template.display()))?
            .into_luma8();
        let screen = Self::capture_primary()?;
        Ok(match_template(&screen, &template, confidence))
    }
}

/// Coarse grayscale scan: slide the template over the screen and score each
/// position by sampled mean absolute difference. Similarity is `1 - mad/255`;
/// the best position wins if it clears `min_confidence`.
pub(crate) fn match_template(
    screen: &GrayImage,
    template: &GrayImage,
    min_confidence: f32,
) -> Option<Region> {
    let (sw, sh) = screen.dimensions();
    let (tw, th) = template.dimensions();
    if tw == 0 || th == 0 || tw > sw || th > sh {
        return None;
    }

    // Sample the template on a sparse grid; full-resolution comparison is
    // wasted work at the confidences this tool runs with.
    let sample = ((tw.min(th)) / 16).max(1);
    let stride = ((tw.min(th)) / 4).max(1);

    let mut best: Option<(f32, u32, u32)> = None;
    let mut y = 0;
    while y + th <= sh {
        let mut x = 0;
        while x + tw <= sw {
            let score = similarity_at(screen, template, x, y, sample);
            if best.map_or(true, |(b, _, _)| score > b) {
                best = Some((score, x, y));
            }
            x += stride;
        }
        y += stride;
    }

    match best {
        Some((score, x, y)) if score >= min_confidence => Some(Region {
            x: x as i32,
            y: y as i32,
            width: tw,
            height: th,
        }),
        _ => None,
    }
}

fn similarity_at(screen: &GrayImage, template: &GrayImage, ox: u32, oy: u32, sample: u32) -> f32 {
    let (tw, th) = template.dimensions();
    let mut total: u64 = 0;
    let mut count: u64 = 0;
    let mut ty = 0;
    while ty < th {
        let mut tx = 0;
        while tx < tw {
            let t = template.get_pixel(tx, ty).0[0] as i32;
            let s = screen.get_pixel(ox + tx, oy + ty).0[0] as i32;
            total += (t - s).unsigned_abs() as u64;
            count += 1;
            tx += sample;
        }
        ty += sample;
    }
    1.0 - (total as f32 / count as f32) / 255.0
}
