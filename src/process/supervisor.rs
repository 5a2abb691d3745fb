//! Process lifecycle manager.
//!
//! Wraps every session with launch, identity verification and a best-effort
//! teardown that escalates until no target instance remains. Teardown never
//! propagates errors: the next session's launch tolerates a survivor.

use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

use super::{ProcessHandle, Processes};

pub struct ProcessSupervisor {
    processes: Box<dyn Processes>,
    grace: Duration,
}

impl ProcessSupervisor {
    pub fn new(processes: Box<dyn Processes>, grace: Duration) -> Self {
        Self { processes, grace }
    }

    /// Confirm the binary is the expected target application before driving
    /// any work against it.
    pub fn verify_identity(&self, path: &Path) -> bool {
        self.processes.verify_identity(path)
    }

    /// Launch the client. Pre-existing instances are tolerated; the spawned
    /// handle is still tracked so teardown can reap it first.
    pub fn start(&mut self, path: &Path) -> Result<Box<dyn ProcessHandle>> {
        let handle = self.processes.spawn(path).map_err(|source| Error::Launch {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(pid = handle.id(), path = %path.display(), "client launched");
        Ok(handle)
    }

    /// Terminate every running target instance with escalating force:
    /// owned handle first, then graceful termination of all instances, then
    /// forced, then a final forced pass over anything still alive.
    pub fn terminate_all(&mut self, handle: Option<Box<dyn ProcessHandle>>) {
        if let Some(mut handle) = handle {
            if let Err(e) = handle.kill() {
                tracing::debug!(pid = handle.id(), error = %e, "owned handle kill failed");
            }
            std::thread::sleep(self.grace);
        }

        let running = self.processes.running_targets();
        for target in &running {
            if !self.processes.terminate(target.pid, false) {
                tracing::debug!(pid = target.pid, name = %target.name, "graceful terminate refused");
            }
        }
        if !running.is_empty() {
            std::thread::sleep(self.grace);
            for target in self.processes.running_targets() {
                if !self.processes.terminate(target.pid, true) {
                    tracing::warn!(pid = target.pid, name = %target.name, "forced terminate refused");
                }
            }
            std::thread::sleep(self.grace);
        }

        let survivors = self.processes.running_targets();
        if !survivors.is_empty() {
            let names: Vec<&str> = survivors.iter().map(|t| t.name.as_str()).collect();
            tracing::warn!(?names, "target instances survived teardown, forcing again");
            for target in &survivors {
                self.processes.terminate(target.pid, true);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    use crate::process::{ProcessHandle, Processes, TargetProcess};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ProcEvent {
        Spawn(PathBuf),
        HandleKill(u32),
        Terminate { pid: u32, force: bool },
    }

    #[derive(Debug)]
    pub struct FakeHandle {
        pid: u32,
        events: Arc<Mutex<Vec<ProcEvent>>>,
    }

    impl ProcessHandle for FakeHandle {
        fn id(&self) -> u32 {
            self.pid
        }

        fn kill(&mut self) -> std::io::Result<()> {
            self.events.lock().unwrap().push(ProcEvent::HandleKill(self.pid));
            Ok(())
        }
    }

    /// Scripted process table: a fixed set of "running" targets that shrinks
    /// as terminations land, plus an event log.
    pub struct FakeProcesses {
        pub identity_ok: bool,
        pub spawn_fails: bool,
        running: Arc<Mutex<Vec<TargetProcess>>>,
        /// Pids that ignore graceful termination and need force.
        pub stubborn: Vec<u32>,
        events: Arc<Mutex<Vec<ProcEvent>>>,
        next_pid: u32,
    }

    impl FakeProcesses {
        pub fn new(running: Vec<u32>) -> Self {
            let table = running
                .into_iter()
                .map(|pid| TargetProcess {
                    pid,
                    name: format!("telegram-{pid}.exe"),
                })
                .collect();
            Self {
                identity_ok: true,
                spawn_fails: false,
                running: Arc::new(Mutex::new(table)),
                stubborn: Vec::new(),
                events: Arc::new(Mutex::new(Vec::new())),
                next_pid: 1000,
            }
        }

        pub fn events(&self) -> Arc<Mutex<Vec<ProcEvent>>> {
            Arc::clone(&self.events)
        }

        pub fn running_handle(&self) -> Arc<Mutex<Vec<TargetProcess>>> {
            Arc::clone(&self.running)
        }
    }

    impl Processes for FakeProcesses {
        fn spawn(&mut self, path: &Path) -> std::io::Result<Box<dyn ProcessHandle>> {
            if self.spawn_fails {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no such executable",
                ));
            }
            self.events
                .lock()
                .unwrap()
                .push(ProcEvent::Spawn(path.to_path_buf()));
            self.next_pid += 1;
            let pid = self.next_pid;
            self.running.lock().unwrap().push(TargetProcess {
                pid,
                name: "telegram-spawned.exe".to_string(),
            });
            Ok(Box::new(FakeHandle {
                pid,
                events: Arc::clone(&self.events),
            }))
        }

        fn verify_identity(&self, _path: &Path) -> bool {
            self.identity_ok
        }

        fn running_targets(&self) -> Vec<TargetProcess> {
            self.running.lock().unwrap().clone()
        }

        fn terminate(&self, pid: u32, force: bool) -> bool {
            self.events
                .lock()
                .unwrap()
                .push(ProcEvent::Terminate { pid, force });
            if !force && self.stubborn.contains(&pid) {
                return false;
            }
            self.running.lock().unwrap().retain(|t| t.pid != pid);
            true
        }
    }
}
