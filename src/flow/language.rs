//! UI language detection.
//!
//! The client renders its menus in whatever language the account is set to,
//! so the engine first works out which per-language asset set matches the
//! screen. Detection is fused with navigation: clicking the settings menu
//! item both confirms the language and opens the settings page.

use crate::assets::{HAMBURGER_MENU, HAMBURGER_MENU_DARK, SETTINGS_MENU_ITEM};
use crate::config::ExportConfig;
use crate::error::Result;
use crate::screen::{Key, ScreenDriver};

pub struct LanguageResolver<'a> {
    config: &'a ExportConfig,
}

impl<'a> LanguageResolver<'a> {
    pub fn new(config: &'a ExportConfig) -> Self {
        Self { config }
    }

    /// Open the navigation menu and probe the settings item per language.
    ///
    /// Falls back to the configured default language when the menu anchor
    /// never matches (the screen is left untouched) or when the menu opens
    /// but no settings item matches (the menu is dismissed first).
    pub fn resolve(&self, driver: &mut ScreenDriver) -> Result<String> {
        if !self.open_menu(driver)? {
            tracing::warn!(
                default = %self.config.default_language,
                "menu anchor not found, assuming default language"
            );
            return Ok(self.config.default_language.clone());
        }
        std::thread::sleep(self.config.timeouts.menu_settle);

        for language in self.candidates() {
            let hit = driver.click(
                language,
                SETTINGS_MENU_ITEM,
                self.config.timeouts.probe,
                self.config.confidence.language,
            )?;
            if hit {
                tracing::info!(language, "ui language detected");
                std::thread::sleep(self.config.timeouts.step_settle);
                return Ok(language.to_string());
            }
        }

        // Menu is open but nothing matched; close it before falling back.
        driver.press(Key::Escape)?;
        tracing::warn!(
            default = %self.config.default_language,
            "no settings item matched, assuming default language"
        );
        Ok(self.config.default_language.clone())
    }

    /// Click the hamburger anchor: the light-theme image once at the menu
    /// threshold, then the dark-theme variant at progressively lower
    /// confidence before giving up.
    fn open_menu(&self, driver: &mut ScreenDriver) -> Result<bool> {
        let dark_thresholds = [
            self.config.confidence.menu,
            self.config.confidence.option,
            self.config.confidence.click,
        ];
        for language in self.candidates() {
            let hit = driver.click(
                language,
                HAMBURGER_MENU,
                self.config.timeouts.probe,
                self.config.confidence.menu,
            )?;
            if hit {
                tracing::debug!(language, "menu opened");
                return Ok(true);
            }
            for confidence in dark_thresholds {
                let hit = driver.click(
                    language,
                    HAMBURGER_MENU_DARK,
                    self.config.timeouts.probe,
                    confidence,
                )?;
                if hit {
                    tracing::debug!(language, confidence, "menu opened via dark variant");
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Configured languages with the default moved to the front.
    fn candidates(&self) -> impl Iterator<Item = &str> {
        let default = self.config.default_language.as_str();
        std::iter::once(default).chain(
            self.config
                .languages
                .iter()
                .map(String::as_str)
                .filter(move |l| *l != default),
        )
    }
}
