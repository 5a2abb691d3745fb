//! Engine configuration.
//!
//! All tuning values live in one immutable [`ExportConfig`] constructed at
//! startup and passed explicitly into each component. Defaults match the
//! values tuned against Telegram Desktop on a 1080p screen; a JSON file can
//! override any of them.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;

/// Match-confidence thresholds for the visual locator, by element class.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Confidence {
    /// Ordinary buttons and tabs.
    pub click: f32,
    /// Export options, dialog title, completion and close buttons.
    pub option: f32,
    /// Per-language settings menu item (language detection).
    pub language: f32,
    /// The hamburger menu anchor.
    pub menu: f32,
}

impl Default for Confidence {
    fn default() -> Self {
        Self {
            click: 0.6,
            option: 0.7,
            language: 0.75,
            menu: 0.8,
        }
    }
}

/// Scroll distances and round budgets.
///
/// Positive distances scroll up, negative down (mouse-wheel convention).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Rounds of scroll-then-locate while hunting the export button.
    pub scroll_attempts: u32,
    /// Per-round distance while hunting the export button.
    pub scroll_distance: i32,
    /// Round budget for the option-selection loop.
    pub option_rounds: u32,
    /// Between-round distance in the option-selection loop.
    pub option_scroll_distance: i32,
    /// Per-burst distance of the initial scroll-to-top (three bursts).
    pub options_top_scroll: i32,
    /// Nudge back down to where the options list starts.
    pub options_start_scroll: i32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            scroll_attempts: 5,
            scroll_distance: -1200,
            option_rounds: 10,
            option_scroll_distance: -500,
            options_top_scroll: 800,
            options_start_scroll: -400,
        }
    }
}

/// Wall-clock budgets. Every wait in the engine is a deadline built from one
/// of these, checked each poll iteration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Standard locate-and-click budget.
    #[serde(with = "humantime_serde")]
    pub locate: Duration,
    /// Short single-observation budget (login check, scroll-round probes).
    #[serde(with = "humantime_serde")]
    pub probe: Duration,
    /// Budget for the final save button.
    #[serde(with = "humantime_serde")]
    pub save: Duration,
    /// Budget for dismissing the completion dialog.
    #[serde(with = "humantime_serde")]
    pub dismiss: Duration,
    /// Upper bound on the asynchronous export itself.
    #[serde(with = "humantime_serde")]
    pub completion: Duration,
    /// Poll interval while waiting for completion.
    #[serde(with = "humantime_serde")]
    pub completion_poll: Duration,
    /// Retry interval inside a locate deadline loop.
    #[serde(with = "humantime_serde")]
    pub locate_poll: Duration,
    /// Pause after launching the client before touching its UI.
    #[serde(with = "humantime_serde")]
    pub launch_settle: Duration,
    /// Pause after opening the navigation menu.
    #[serde(with = "humantime_serde")]
    pub menu_settle: Duration,
    /// Pause between flow steps.
    #[serde(with = "humantime_serde")]
    pub step_settle: Duration,
    /// Pause after an individual click or scroll burst.
    #[serde(with = "humantime_serde")]
    pub click_settle: Duration,
    /// Pause before re-snapshotting the download directory.
    #[serde(with = "humantime_serde")]
    pub fs_settle: Duration,
    /// Pause between sessions so window focus can settle.
    #[serde(with = "humantime_serde")]
    pub session_cooldown: Duration,
    /// Pause between termination escalation stages.
    #[serde(with = "humantime_serde")]
    pub terminate_grace: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            locate: Duration::from_secs(15),
            probe: Duration::from_secs(2),
            save: Duration::from_secs(20),
            dismiss: Duration::from_secs(10),
            completion: Duration::from_secs(1800),
            completion_poll: Duration::from_secs(2),
            locate_poll: Duration::from_secs(1),
            launch_settle: Duration::from_secs(5),
            menu_settle: Duration::from_secs(2),
            step_settle: Duration::from_secs(1),
            click_settle: Duration::from_millis(500),
            fs_settle: Duration::from_secs(3),
            session_cooldown: Duration::from_secs(5),
            terminate_grace: Duration::from_secs(2),
        }
    }
}

/// Immutable engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory of per-language reference images.
    pub assets_dir: PathBuf,
    /// Destination root for relocated artifacts.
    pub export_base_dir: PathBuf,
    /// Directory the client writes exports into.
    pub download_dir: PathBuf,
    /// Supported UI languages, in detection priority order.
    pub languages: Vec<String>,
    /// Fallback when language detection fails.
    pub default_language: String,
    /// Export options to tick, in click order. Each needs a matching asset.
    pub export_options: Vec<String>,
    /// Version-resource strings that identify the target executable.
    pub identity_markers: Vec<String>,
    /// Failure report location.
    pub failure_report: PathBuf,
    pub confidence: Confidence,
    pub tuning: Tuning,
    pub timeouts: Timeouts,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("screenshots"),
            export_base_dir: PathBuf::from("exports"),
            download_dir: default_download_dir(),
            languages: vec!["en".to_string(), "ru".to_string()],
            default_language: "en".to_string(),
            export_options: vec![
                "option_only_my_messages".to_string(),
                "option_videos".to_string(),
                "option_voice_messages".to_string(),
                "option_video_messages".to_string(),
                "option_stickers".to_string(),
                "option_gifs".to_string(),
                "option_files".to_string(),
                "option_both".to_string(),
            ],
            identity_markers: vec!["Telegram".to_string(), "Desktop".to_string()],
            failure_report: PathBuf::from("failed_exports.txt"),
            confidence: Confidence::default(),
            tuning: Tuning::default(),
            timeouts: Timeouts::default(),
        }
    }
}

impl ExportConfig {
    /// Load overrides from a JSON file on top of the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("invalid config file {}: {e}", path.display()))?;
        Ok(config)
    }

    /// A config with every wait zeroed out, for tests.
    #[doc(hidden)]
    pub fn instant() -> Self {
        Self {
            timeouts: Timeouts {
                locate: Duration::ZERO,
                probe: Duration::ZERO,
                save: Duration::ZERO,
                dismiss: Duration::ZERO,
                completion: Duration::ZERO,
                completion_poll: Duration::ZERO,
                locate_poll: Duration::ZERO,
                launch_settle: Duration::ZERO,
                menu_settle: Duration::ZERO,
                step_settle: Duration::ZERO,
                click_settle: Duration::ZERO,
                fs_settle: Duration::ZERO,
                session_cooldown: Duration::ZERO,
                terminate_grace: Duration::ZERO,
            },
            ..Self::default()
        }
    }
}

/// `~/Downloads/Telegram Desktop`, where the client drops exports by default.
fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("Downloads"))
        .join("Telegram Desktop")
}
