//! Output collector.
//!
//! The client writes its export into a shared download directory under a name
//! the engine cannot predict. The collector snapshots that directory before
//! the export is submitted, diffs after completion, relocates the one new
//! entry into the destination layout and cleans up behind itself. Relocation
//! problems are logged and degrade the session outcome; they never abort the
//! batch.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::Result;
use crate::session::Session;

/// Directory-entry names captured at a point in time; immutable, used only
/// for diffing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySnapshot {
    entries: BTreeSet<String>,
    present: bool,
}

impl DirectorySnapshot {
    /// Capture the subdirectory names of `dir`. A missing directory yields an
    /// empty snapshot flagged absent.
    pub fn capture(dir: &Path) -> Self {
        let mut entries = BTreeSet::new();
        let read = match fs::read_dir(dir) {
            Ok(read) => read,
            Err(_) => {
                return Self {
                    entries,
                    present: false,
                }
            }
        };
        for entry in read.flatten() {
            let path = entry.path();
            if path.is_dir() {
                entries.insert(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Self {
            entries,
            present: true,
        }
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    /// Entries in `later` that were not in `self`, sorted by name.
    pub fn new_entries(&self, later: &DirectorySnapshot) -> Vec<String> {
        later.entries.difference(&self.entries).cloned().collect()
    }
}

pub struct OutputCollector {
    download_dir: PathBuf,
    export_base: PathBuf,
}

impl OutputCollector {
    pub fn new(download_dir: PathBuf, export_base: PathBuf) -> Self {
        Self {
            download_dir,
            export_base,
        }
    }

    pub fn snapshot(&self) -> DirectorySnapshot {
        DirectorySnapshot::capture(&self.download_dir)
    }

    /// Reconcile filesystem state after a completed export: diff against the
    /// session's baseline, relocate the newest fresh entry to the session's
    /// destination, then move the staged screenshot in and drop the source.
    ///
    /// Returns the destination when an artifact landed, `None` when no
    /// artifact could be collected (missing download dir, nothing new, or a
    /// relocation failure).
    pub fn collect(&self, session: &mut Session) -> Result<Option<PathBuf>> {
        let baseline = session.baseline.clone().unwrap_or_else(|| DirectorySnapshot {
            entries: BTreeSet::new(),
            present: false,
        });
        let after = self.snapshot();
        if !after.is_present() {
            tracing::warn!(dir = %self.download_dir.display(), "download directory does not exist");
            self.discard_screenshot(session);
            return Ok(None);
        }

        let fresh = baseline.new_entries(&after);
        if fresh.is_empty() {
            tracing::warn!("no new entries in download directory after export");
            self.discard_screenshot(session);
            return Ok(None);
        }

        let candidates: Vec<(String, SystemTime)> = fresh
            .into_iter()
            .map(|name| {
                let created = creation_time(&self.download_dir.join(&name));
                (name, created)
            })
            .collect();
        // Unwrap is fine: fresh was non-empty.
        let chosen = pick_newest(candidates).unwrap();
        let source = self.download_dir.join(&chosen);
        let destination = session.installation.destination(&self.export_base);

        // Destructive overwrite of any previous export for this client.
        if destination.exists() {
            if let Err(e) = fs::remove_dir_all(&destination) {
                tracing::error!(dest = %destination.display(), error = %e, "could not clear destination");
            }
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        if let Err(e) = move_dir(&source, &destination) {
            tracing::error!(
                source = %source.display(),
                dest = %destination.display(),
                error = %e,
                "artifact relocation failed"
            );
            // An export happened even though it could not be relocated; the
            // staged screenshot stays on disk for diagnosis.
            if let Some(staged) = session.settings_screenshot.take() {
                tracing::warn!(path = %staged.display(), "keeping staged settings screenshot");
            }
            return Ok(None);
        }
        tracing::info!(artifact = %chosen, dest = %destination.display(), "artifact relocated");

        // Screenshot moves only after the artifact landed, so a failed
        // relocation leaves it behind for diagnosis.
        self.finalize_screenshot(session, &destination);

        if source.exists() {
            if let Err(e) = fs::remove_dir_all(&source) {
                tracing::warn!(source = %source.display(), error = %e, "could not remove source directory");
            }
        }

        Ok(Some(destination))
    }

    /// Drop the staged screenshot of a session that produced no artifact.
    pub fn discard_screenshot(&self, session: &mut Session) {
        if let Some(path) = session.settings_screenshot.take() {
            if path.exists() {
                if let Err(e) = fs::remove_file(&path) {
                    tracing::debug!(path = %path.display(), error = %e, "could not remove staged screenshot");
                }
            }
        }
    }

    fn finalize_screenshot(&self, session: &mut Session, destination: &Path) {
        let Some(staged) = session.settings_screenshot.take() else {
            return;
        };
        let target = destination.join(format!(
            "{}_settings.png",
            session.installation.client_label
        ));
        if let Err(e) = move_file(&staged, &target) {
            tracing::error!(error = %e, "could not move settings screenshot");
            // Leave the staged copy on disk for diagnosis.
            session.settings_screenshot = Some(staged);
        }
    }
}

/// Newest entry by creation timestamp; ties resolved to the lexicographically
/// greatest name, a documented arbitrary choice that keeps selection
/// deterministic.
fn pick_newest(candidates: Vec<(String, SystemTime)>) -> Option<String> {
    candidates
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
        .map(|(name, _)| name)
}

fn creation_time(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|m| m.created().or_else(|_| m.modified()))
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

fn move_dir(source: &Path, destination: &Path) -> std::io::Result<()> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        // Cross-device move: copy then delete.
        Err(_) => {
            copy_dir_all(source, destination)?;
            fs::remove_dir_all(source)
        }
    }
}

fn copy_dir_all(source: &Path, destination: &Path) -> std::io::Result<()> {
    fs::create_dir_all(destination)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let target = destination.join(entry.file_name());
        if entry.path().is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn move_file(source: &Path, destination: &Path) -> std::io::Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(source, destination)?;
            fs::remove_file(source)
        }
    }
}
