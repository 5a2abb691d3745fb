//! Reference-image catalog.
//!
//! UI elements are located by matching reference screenshots stored under
//! `<assets_dir>/<language>/<name>.png`. The catalog knows which images a
//! session needs and verifies all of them up front, so a misconfigured asset
//! tree fails the batch before any client is launched.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const HAMBURGER_MENU: &str = "hamburger_menu";
/// Dark-theme variant of the menu anchor; optional, tried as a fallback.
pub const HAMBURGER_MENU_DARK: &str = "hamburger_menu_dark";
pub const SETTINGS_MENU_ITEM: &str = "settings_menu_item";
pub const ADVANCED_TAB: &str = "advanced_tab";
pub const EXPORT_BUTTON: &str = "export_button";
pub const EXPORT_SETTINGS_TITLE: &str = "export_settings_title";
pub const SAVE_BUTTON: &str = "save_button";
pub const SHOW_MY_DATA_BUTTON: &str = "show_my_data_button";
pub const CLOSE_BUTTON: &str = "close_button";
pub const START_MESSAGING_BUTTON: &str = "start_messaging_button";

/// Resolves asset names to on-disk reference images.
#[derive(Debug, Clone)]
pub struct AssetCatalog {
    dir: PathBuf,
}

impl AssetCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of one reference image.
    pub fn path(&self, language: &str, name: &str) -> PathBuf {
        self.dir.join(language).join(format!("{name}.png"))
    }

    /// Every asset a session may need to click, for one language.
    pub fn required(export_options: &[String]) -> Vec<String> {
        let mut names: Vec<String> = [
            HAMBURGER_MENU,
            SETTINGS_MENU_ITEM,
            ADVANCED_TAB,
            EXPORT_BUTTON,
            EXPORT_SETTINGS_TITLE,
            SAVE_BUTTON,
            SHOW_MY_DATA_BUTTON,
            CLOSE_BUTTON,
            START_MESSAGING_BUTTON,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        names.extend(export_options.iter().cloned());
        names
    }

    /// Fail fast if any required image is missing for any supported language.
    pub fn verify(&self, languages: &[String], export_options: &[String]) -> Result<()> {
        let required = Self::required(export_options);
        for language in languages {
            let missing: Vec<String> = required
                .iter()
                .filter(|name| !self.path(language, name).is_file())
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(Error::MissingAssets {
                    language: language.clone(),
                    missing,
                });
            }
            tracing::debug!(language, "asset check passed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"png").unwrap();
    }

    #[test]
    fn verify_passes_with_complete_tree() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = AssetCatalog::new(dir.path());
        let options = vec!["option_videos".to_string()];
        for language in ["en", "ru"] {
            for name in AssetCatalog::required(&options) {
                touch(&catalog.path(language, &name));
            }
        }
        catalog
            .verify(&["en".to_string(), "ru".to_string()], &options)
            .unwrap();
    }

    #[test]
    fn verify_reports_every_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = AssetCatalog::new(dir.path());
        let options = vec!["option_videos".to_string()];
        for name in AssetCatalog::required(&options) {
            if name != SAVE_BUTTON && name != "option_videos" {
                touch(&catalog.path("en", &name));
            }
        }
        let err = catalog.verify(&["en".to_string()], &options).unwrap_err();
        match err {
            Error::MissingAssets { language, missing } => {
                assert_eq!(language, "en");
                assert!(missing.contains(&SAVE_BUTTON.to_string()));
                assert!(missing.contains(&"option_videos".to_string()));
                assert_eq!(missing.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn dark_menu_variant_is_not_required() {
        let options = vec![];
        assert!(!AssetCatalog::required(&options)
            .contains(&HAMBURGER_MENU_DARK.to_string()));
    }
}
