//! Batch discovery and coordination.
//!
//! Walks the configured client roots for installations, runs them strictly
//! one at a time (the screen and input devices are a single shared resource),
//! and reports per-client results plus a machine-readable failure file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::ExportConfig;
use crate::error::Result;
use crate::flow::ExportOutcome;
use crate::process::Processes;
use crate::runner::SessionRunner;
use crate::session::ClientInstallation;

/// Find every client executable under the given roots.
///
/// Only executables whose contents verify as the target application are
/// returned; real installs keep updaters and helper binaries next to the
/// client, and those must not consume batch slots. The walk is breadth-first
/// with sorted directory entries, so discovery order is stable across runs
/// regardless of filesystem enumeration order.
pub fn discover_installations(
    roots: &[PathBuf],
    processes: &dyn Processes,
) -> Result<Vec<ClientInstallation>> {
    let mut installations = Vec::new();
    for root in roots {
        let root_label = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());
        let mut queue = std::collections::VecDeque::from([root.clone()]);
        while let Some(dir) = queue.pop_front() {
            let mut entries: Vec<PathBuf> = match fs::read_dir(&dir) {
                Ok(read) => read.filter_map(|e| e.ok().map(|e| e.path())).collect(),
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "cannot read directory");
                    continue;
                }
            };
            entries.sort();
            for path in entries {
                if path.is_dir() {
                    queue.push_back(path);
                } else if is_executable_name(&path) {
                    if processes.verify_identity(&path) {
                        installations.push(ClientInstallation::new(path, root_label.clone()));
                    } else {
                        tracing::debug!(path = %path.display(), "not the target application, skipping");
                    }
                }
            }
        }
    }
    tracing::info!(count = installations.len(), "installations discovered");
    Ok(installations)
}

fn is_executable_name(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("exe"))
        .unwrap_or(false)
}

/// Progress notifications emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    SessionStarted {
        index: usize,
        total: usize,
        client: String,
    },
    SessionFinished {
        index: usize,
        total: usize,
        client: String,
        outcome: ExportOutcome,
    },
    BatchCancelled {
        remaining: usize,
    },
}

pub trait ProgressObserver {
    fn notify(&mut self, event: &BatchEvent);
}

/// Observer that drops every event.
#[derive(Default)]
pub struct NullObserver;

impl ProgressObserver for NullObserver {
    fn notify(&mut self, _event: &BatchEvent) {}
}

/// Observer that mirrors progress into the log.
#[derive(Default)]
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn notify(&mut self, event: &BatchEvent) {
        match event {
            BatchEvent::SessionStarted {
                index,
                total,
                client,
            } => {
                tracing::info!(
                    client = %client,
                    progress = format!("{}/{total}", index + 1),
                    "session starting"
                )
            }
            BatchEvent::SessionFinished {
                index,
                total,
                client,
                outcome,
            } => {
                tracing::info!(
                    client = %client,
                    progress = format!("{}/{total}", index + 1),
                    outcome = %outcome,
                    "session finished"
                )
            }
            BatchEvent::BatchCancelled { remaining } => {
                tracing::warn!(remaining, "batch cancelled")
            }
        }
    }
}

/// A non-success session, as written to the failure report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub exe_path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default, Clone)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<FailureRecord>,
}

/// Runs sessions sequentially and aggregates their outcomes.
pub struct BatchCoordinator<R: SessionRunner> {
    runner: R,
    config: ExportConfig,
    observer: Box<dyn ProgressObserver>,
    cancel: Arc<AtomicBool>,
}

impl<R: SessionRunner> BatchCoordinator<R> {
    pub fn new(runner: R, config: ExportConfig, observer: Box<dyn ProgressObserver>) -> Self {
        Self {
            runner,
            config,
            observer,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag checked between sessions; setting it stops the batch at the next
    /// session boundary. Sessions already underway run to completion.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn run(&mut self, installations: &[ClientInstallation]) -> Result<BatchSummary> {
        let total = installations.len();
        let mut summary = BatchSummary {
            total,
            ..BatchSummary::default()
        };

        for (index, installation) in installations.iter().enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                self.observer.notify(&BatchEvent::BatchCancelled {
                    remaining: total - index,
                });
                break;
            }
            if index > 0 {
                std::thread::sleep(self.config.timeouts.session_cooldown);
            }

            self.observer.notify(&BatchEvent::SessionStarted {
                index,
                total,
                client: installation.client_label.clone(),
            });
            let outcome = self.runner.run(installation);
            match &outcome {
                ExportOutcome::Success => summary.succeeded += 1,
                ExportOutcome::Failed(reason) => {
                    summary.failed += 1;
                    summary.failures.push(FailureRecord {
                        exe_path: installation.exe_path.clone(),
                        reason: reason.clone(),
                    });
                }
                ExportOutcome::Skipped(reason) => {
                    summary.skipped += 1;
                    summary.failures.push(FailureRecord {
                        exe_path: installation.exe_path.clone(),
                        reason: format!("skipped: {reason}"),
                    });
                }
            }
            self.observer.notify(&BatchEvent::SessionFinished {
                index,
                total,
                client: installation.client_label.clone(),
                outcome,
            });
        }

        self.write_failure_report(&summary)?;
        tracing::info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            "batch finished"
        );
        Ok(summary)
    }

    /// A count header, then one line per non-success session. An empty batch
    /// still truncates any stale report from a previous run.
    fn write_failure_report(&self, summary: &BatchSummary) -> Result<()> {
        let mut file = fs::File::create(&self.config.failure_report)?;
        writeln!(file, "total: {}", summary.failures.len())?;
        for record in &summary.failures {
            writeln!(file, "{}\t{}", record.exe_path.display(), record.reason)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Scripted runner: pops outcomes in order, optionally tripping the
    /// cancel flag after a given session.
    struct FakeRunner {
        outcomes: Vec<ExportOutcome>,
        calls: Arc<Mutex<Vec<PathBuf>>>,
        cancel_after: Option<(usize, Arc<AtomicBool>)>,
    }

    impl FakeRunner {
        fn new(outcomes: Vec<ExportOutcome>) -> Self {
            Self {
                outcomes,
                calls: Arc::new(Mutex::new(Vec::new())),
                cancel_after: None,
            }
        }
    }

    impl SessionRunner for FakeRunner {
        fn run(&mut self, installation: &ClientInstallation) -> ExportOutcome {
            let mut calls = self.calls.lock().unwrap();
            calls.push(installation.exe_path.clone());
            let index = calls.len() - 1;
            if let Some((after, flag)) = &self.cancel_after {
                if index == *after {
                    flag.store(true, Ordering::SeqCst);
                }
            }
            self.outcomes
                .get(index)
                .cloned()
                .unwrap_or(ExportOutcome::Success)
        }
    }

    fn installations(count: usize) -> Vec<ClientInstallation> {
        (0..count)
            .map(|i| {
                ClientInstallation::new(
                    PathBuf::from(format!("accounts/client{i}/Telegram.exe")),
                    "accounts".to_string(),
                )
            })
            .collect()
    }

    fn config(report: &Path) -> ExportConfig {
        let mut config = ExportConfig::instant();
        config.failure_report = report.to_path_buf();
        config
    }

    #[test]
    fn aggregates_mixed_outcomes_and_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("failed_exports.txt");
        let runner = FakeRunner::new(vec![
            ExportOutcome::Success,
            ExportOutcome::Failed("export did not complete within 30m".to_string()),
            ExportOutcome::Skipped("not logged in".to_string()),
        ]);
        let mut coordinator =
            BatchCoordinator::new(runner, config(&report), Box::new(NullObserver));

        let summary = coordinator.run(&installations(3)).unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);

        let contents = std::fs::read_to_string(&report).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "total: 2");
        assert!(lines[1].contains("client1"));
        assert!(lines[1].contains("did not complete"));
        assert!(lines[2].contains("client2"));
        assert!(lines[2].contains("skipped: not logged in"));
    }

    #[test]
    fn cancellation_stops_at_session_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("failed_exports.txt");
        let mut runner = FakeRunner::new(vec![ExportOutcome::Success; 3]);
        let calls = Arc::clone(&runner.calls);

        let mut coordinator =
            BatchCoordinator::new(FakeRunner::new(vec![]), config(&report), Box::new(NullObserver));
        // Wire the real runner to trip the coordinator's flag after the
        // first session.
        runner.cancel_after = Some((0, coordinator.cancel_flag()));
        coordinator.runner = runner;

        let summary = coordinator.run(&installations(3)).unwrap();
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.total, 3);
    }

    #[test]
    fn empty_batch_truncates_stale_report() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("failed_exports.txt");
        std::fs::write(&report, "old/failed.exe\tstale\n").unwrap();
        let mut coordinator = BatchCoordinator::new(
            FakeRunner::new(vec![]),
            config(&report),
            Box::new(NullObserver),
        );

        coordinator.run(&[]).unwrap();
        assert_eq!(std::fs::read_to_string(&report).unwrap(), "total: 0\n");
    }

    /// A file that passes the version-resource identity probe.
    fn target_exe_bytes() -> Vec<u8> {
        let mut body = vec![0u8; 64];
        body.extend(
            "Telegram Desktop"
                .encode_utf16()
                .flat_map(|u| u.to_le_bytes()),
        );
        body
    }

    #[test]
    fn discovery_is_sorted_and_verifies_identity() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("accounts");
        for sub in ["beta", "alpha"] {
            std::fs::create_dir_all(root.join(sub)).unwrap();
            std::fs::write(root.join(sub).join("Telegram.exe"), target_exe_bytes()).unwrap();
            std::fs::write(root.join(sub).join("notes.txt"), b"").unwrap();
        }
        // Helper binaries next to the client must not become installations,
        // even though they carry the executable extension.
        std::fs::write(root.join("alpha").join("Updater.EXE"), b"not the client").unwrap();

        let processes =
            crate::process::SystemProcesses::new(vec!["Telegram".to_string(), "Desktop".to_string()]);
        let found = discover_installations(&[root.clone()], &processes).unwrap();
        let paths: Vec<String> = found
            .iter()
            .map(|i| {
                i.exe_path
                    .strip_prefix(&root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        // Per-client directories in sorted order; the updater was dropped at
        // discovery rather than burning a session later.
        assert_eq!(paths, vec!["alpha/Telegram.exe", "beta/Telegram.exe"]);
        assert!(found.iter().all(|i| i.root_label == "accounts"));
    }
}
