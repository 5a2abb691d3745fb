//! High-level screen driver.
//!
//! Every flow step is some flavor of "locate this asset, maybe click it,
//! within a deadline". `ScreenDriver` owns the capability adapters and the
//! one shared retry loop, so the steps themselves stay declarative.

use std::path::Path;
use std::time::{Duration, Instant};

use crate::assets::AssetCatalog;
use crate::error::{Error, Result};

use super::capture::ScreenGrab;
use super::input::{Input, Key};
use super::locator::{Locator, Region};

pub struct ScreenDriver {
    locator: Box<dyn Locator>,
    input: Box<dyn Input>,
    grab: Box<dyn ScreenGrab>,
    assets: AssetCatalog,
    poll: Duration,
}

impl ScreenDriver {
    pub fn new(
        locator: Box<dyn Locator>,
        input: Box<dyn Input>,
        grab: Box<dyn ScreenGrab>,
        assets: AssetCatalog,
        poll: Duration,
    ) -> Self {
        Self {
            locator,
            input,
            grab,
            assets,
            poll,
        }
    }

    /// Locate an asset within a wall-clock deadline. Always makes at least
    /// one observation; returns `Ok(None)` when the deadline passes without
    /// a match.
    pub fn locate(
        &mut self,
        language: &str,
        asset: &str,
        timeout: Duration,
        confidence: f32,
    ) -> Result<Option<Region>> {
        let template = self.assets.path(language, asset);
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(region) = self.find_once(&template, confidence)? {
                return Ok(Some(region));
            }
            if Instant::now() >= deadline {
                tracing::warn!(asset, language, "element not found within budget");
                return Ok(None);
            }
            std::thread::sleep(self.poll);
        }
    }

    /// One silent observation, for poll loops that expect misses.
    pub fn probe(
        &mut self,
        language: &str,
        asset: &str,
        confidence: f32,
    ) -> Result<Option<Region>> {
        let template = self.assets.path(language, asset);
        self.find_once(&template, confidence)
    }

    /// Locate-and-click. `Ok(false)` when the asset never appeared.
    pub fn click(
        &mut self,
        language: &str,
        asset: &str,
        timeout: Duration,
        confidence: f32,
    ) -> Result<bool> {
        match self.locate(language, asset, timeout, confidence)? {
            Some(region) => {
                self.click_region(region)?;
                tracing::debug!(asset, language, "clicked");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn click_region(&mut self, region: Region) -> Result<()> {
        let (x, y) = region.center();
        self.input.click_at(x, y).map_err(Error::screen)
    }

    /// Click the middle of the primary monitor (focus fallback).
    pub fn click_screen_center(&mut self) -> Result<()> {
        let (w, h) = self.grab.screen_size().map_err(Error::screen)?;
        self.input
            .click_at(w as i32 / 2, h as i32 / 2)
            .map_err(Error::screen)
    }

    pub fn press(&mut self, key: Key) -> Result<()> {
        self.input.press(key).map_err(Error::screen)
    }

    pub fn scroll(&mut self, dy: i32) -> Result<()> {
        self.input.scroll(dy).map_err(Error::screen)
    }

    pub fn screenshot(&mut self, path: &Path) -> Result<()> {
        self.grab.save(path).map_err(Error::screen)
    }

    /// Push whatever window is left out of the way: show desktop, cycle
    /// focus, show desktop again.
    pub fn defocus(&mut self) -> Result<()> {
        self.input.hotkey(&[Key::Meta], Key::D).map_err(Error::screen)?;
        std::thread::sleep(self.poll);
        self.input
            .hotkey(&[Key::Alt], Key::Tab)
            .map_err(Error::screen)?;
        self.input.hotkey(&[Key::Meta], Key::D).map_err(Error::screen)
    }

    fn find_once(&mut self, template: &Path, confidence: f32) -> Result<Option<Region>> {
        self.locator.find(template, confidence).map_err(Error::screen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::testing::{ScriptedInput, ScriptedLocator, StubGrab};

    fn driver(locator: ScriptedLocator, input: ScriptedInput) -> ScreenDriver {
        ScreenDriver::new(
            Box::new(locator),
            Box::new(input),
            Box::new(StubGrab::default()),
            AssetCatalog::new("assets"),
            Duration::ZERO,
        )
    }

    #[test]
    fn locate_retries_until_visible() {
        // Visible only from the third observation on.
        let locator = ScriptedLocator::new().visible_after("en/save_button.png", 2);
        let mut driver = driver(locator, ScriptedInput::default());

        let region = driver
            .locate("en", "save_button", Duration::from_secs(5), 0.6)
            .unwrap();
        assert!(region.is_some());
    }

    #[test]
    fn zero_timeout_still_observes_once() {
        let locator = ScriptedLocator::new().visible_after("en/save_button.png", 0);
        let mut driver = driver(locator, ScriptedInput::default());

        let region = driver
            .locate("en", "save_button", Duration::ZERO, 0.6)
            .unwrap();
        assert!(region.is_some());
    }

    #[test]
    fn click_reports_miss_without_clicking() {
        let input = ScriptedInput::default();
        let clicks = input.clicks();
        let mut driver = driver(ScriptedLocator::new(), input);

        let hit = driver
            .click("en", "export_button", Duration::ZERO, 0.6)
            .unwrap();
        assert!(!hit);
        assert!(clicks.lock().unwrap().is_empty());
    }

    #[test]
    fn locator_failure_propagates() {
        let locator = ScriptedLocator::new().failing("locator backend gone");
        let mut driver = driver(locator, ScriptedInput::default());

        let err = driver
            .locate("en", "save_button", Duration::ZERO, 0.6)
            .unwrap_err();
        assert!(matches!(err, Error::Screen(_)));
    }
}
