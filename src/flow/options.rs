//! Export-option selection.
//!
//! The export settings dialog lists toggles in a scrollable pane. Each
//! configured option is clicked at most once; the loop scrolls between
//! rounds until every option has been seen or the round budget runs out.

use std::collections::HashSet;

use crate::assets::EXPORT_SETTINGS_TITLE;
use crate::config::ExportConfig;
use crate::error::Result;
use crate::screen::ScreenDriver;

/// Tick every configured export option in the open dialog.
///
/// Options that never scrolled into view are logged and left unticked; the
/// export proceeds with whatever subset was confirmed.
pub fn select_options(
    driver: &mut ScreenDriver,
    language: &str,
    config: &ExportConfig,
) -> Result<usize> {
    focus_dialog(driver, language, config)?;
    scroll_to_top(driver, config)?;

    let mut confirmed: HashSet<&str> = HashSet::new();
    for round in 0..config.tuning.option_rounds {
        for option in &config.export_options {
            if confirmed.contains(option.as_str()) {
                continue;
            }
            let hit = driver.click(
                language,
                option,
                config.timeouts.probe,
                config.confidence.option,
            )?;
            if hit {
                confirmed.insert(option);
                std::thread::sleep(config.timeouts.click_settle);
            }
        }
        if confirmed.len() == config.export_options.len() {
            tracing::debug!(rounds = round + 1, "all export options selected");
            break;
        }
        driver.scroll(config.tuning.option_scroll_distance)?;
        std::thread::sleep(config.timeouts.click_settle);
    }

    if confirmed.len() < config.export_options.len() {
        let missing: Vec<&str> = config
            .export_options
            .iter()
            .map(String::as_str)
            .filter(|o| !confirmed.contains(o))
            .collect();
        tracing::warn!(?missing, "some export options were never seen");
    }
    Ok(confirmed.len())
}

/// Give the dialog keyboard and scroll focus before touching its pane.
fn focus_dialog(driver: &mut ScreenDriver, language: &str, config: &ExportConfig) -> Result<()> {
    let hit = driver.click(
        language,
        EXPORT_SETTINGS_TITLE,
        config.timeouts.probe,
        config.confidence.option,
    )?;
    if !hit {
        driver.click_screen_center()?;
    }
    std::thread::sleep(config.timeouts.click_settle);
    Ok(())
}

/// Scroll the pane back to its top, then nudge down to the first options.
fn scroll_to_top(driver: &mut ScreenDriver, config: &ExportConfig) -> Result<()> {
    for _ in 0..3 {
        driver.scroll(config.tuning.options_top_scroll)?;
        std::thread::sleep(config.timeouts.click_settle);
    }
    driver.scroll(config.tuning.options_start_scroll)?;
    std::thread::sleep(config.timeouts.click_settle);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetCatalog;
    use crate::screen::testing::{ScriptedInput, ScriptedLocator, StubGrab};
    use std::time::Duration;

    fn driver(locator: ScriptedLocator, input: ScriptedInput) -> ScreenDriver {
        ScreenDriver::new(
            Box::new(locator),
            Box::new(input),
            Box::new(StubGrab::default()),
            AssetCatalog::new("assets"),
            Duration::ZERO,
        )
    }

    fn two_option_config() -> ExportConfig {
        let mut config = ExportConfig::instant();
        config.export_options = vec!["option_videos".to_string(), "option_files".to_string()];
        config
    }

    #[test]
    fn every_visible_option_is_clicked_exactly_once() {
        let config = two_option_config();
        let locator = ScriptedLocator::new()
            .visible("en/export_settings_title.png")
            .visible("en/option_videos.png")
            .visible("en/option_files.png");
        let videos = locator.center_of("en/option_videos.png");
        let files = locator.center_of("en/option_files.png");
        let input = ScriptedInput::default();
        let clicks = input.clicks();
        let mut driver = driver(locator, input);

        let selected = select_options(&mut driver, "en", &config).unwrap();
        assert_eq!(selected, 2);

        // Title focus click plus one click per option, even though both
        // options stay visible for the whole loop.
        let clicks = clicks.lock().unwrap();
        assert_eq!(clicks.len(), 3);
        assert_eq!(clicks.iter().filter(|c| **c == videos).count(), 1);
        assert_eq!(clicks.iter().filter(|c| **c == files).count(), 1);
    }

    #[test]
    fn option_appearing_after_scroll_is_picked_up() {
        let config = two_option_config();
        // `option_files` only matches from the third observation, as if it
        // scrolled into view after a round.
        let locator = ScriptedLocator::new()
            .visible("en/export_settings_title.png")
            .visible("en/option_videos.png")
            .visible_after("en/option_files.png", 2);
        let mut driver = driver(locator, ScriptedInput::default());

        let selected = select_options(&mut driver, "en", &config).unwrap();
        assert_eq!(selected, 2);
    }

    #[test]
    fn missing_option_does_not_fail_the_selection() {
        let config = two_option_config();
        let locator = ScriptedLocator::new()
            .visible("en/export_settings_title.png")
            .visible("en/option_videos.png");
        let mut driver = driver(locator, ScriptedInput::default());

        let selected = select_options(&mut driver, "en", &config).unwrap();
        assert_eq!(selected, 1);
    }

    #[test]
    fn falls_back_to_screen_center_for_focus() {
        let config = two_option_config();
        let locator = ScriptedLocator::new()
            .visible("en/option_videos.png")
            .visible("en/option_files.png");
        let input = ScriptedInput::default();
        let clicks = input.clicks();
        let mut driver = driver(locator, input);

        select_options(&mut driver, "en", &config).unwrap();
        // StubGrab reports a 1920x1080 screen.
        assert_eq!(clicks.lock().unwrap()[0], (960, 540));
    }
}
