//! Per-session state.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::collector::DirectorySnapshot;
use crate::process::ProcessHandle;

/// One discovered target-application install.
///
/// `root_label` is the name of the search root the install was found under,
/// `client_label` the name of the directory holding the executable; together
/// they namespace the output layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInstallation {
    pub exe_path: PathBuf,
    pub root_label: String,
    pub client_label: String,
}

impl ClientInstallation {
    pub fn new(exe_path: PathBuf, root_label: String) -> Self {
        let client_label = exe_path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "client".to_string());
        Self {
            exe_path,
            root_label,
            client_label,
        }
    }

    /// Destination directory for this install's artifact.
    pub fn destination(&self, export_base: &Path) -> PathBuf {
        export_base.join(&self.root_label).join(&self.client_label)
    }
}

/// Ephemeral state for one export attempt. Created at session start, owned
/// by exactly one run of the export flow, torn down at session end.
pub struct Session {
    pub id: String,
    pub installation: ClientInstallation,
    pub language: String,
    pub handle: Option<Box<dyn ProcessHandle>>,
    /// Staged settings screenshot, moved into the destination on success.
    pub settings_screenshot: Option<PathBuf>,
    /// Download-directory snapshot taken just before the export is submitted.
    pub baseline: Option<DirectorySnapshot>,
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn new(installation: ClientInstallation, default_language: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            installation,
            language: default_language.to_string(),
            handle: None,
            settings_screenshot: None,
            baseline: None,
            started_at: Utc::now(),
        }
    }

    /// Where the settings screenshot is staged until the artifact lands.
    pub fn screenshot_staging(&self, export_base: &Path) -> PathBuf {
        export_base
            .join(&self.installation.root_label)
            .join(format!("{}_settings.png", self.installation.client_label))
    }
}
