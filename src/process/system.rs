//! `sysinfo` + `std::process` implementation of the process capability.

use std::path::Path;
use std::process::Command;

use sysinfo::{Pid, Signal, System};

use super::{probe, ProcessHandle, Processes, TargetProcess};

pub struct SystemProcesses {
    markers: Vec<String>,
}

impl SystemProcesses {
    pub fn new(markers: Vec<String>) -> Self {
        Self { markers }
    }
}

impl Processes for SystemProcesses {
    fn spawn(&mut self, path: &Path) -> std::io::Result<Box<dyn ProcessHandle>> {
        let child = Command::new(path).spawn()?;
        Ok(Box::new(child))
    }

    fn verify_identity(&self, path: &Path) -> bool {
        probe::verify_executable(path, &self.markers)
    }

    fn running_targets(&self) -> Vec<TargetProcess> {
        let system = System::new_all();
        let mut targets: Vec<TargetProcess> = system
            .processes()
            .iter()
            .filter_map(|(pid, process)| {
                let exe = process.exe()?;
                if probe::verify_executable(exe, &self.markers) {
                    Some(TargetProcess {
                        pid: pid.as_u32(),
                        name: process.name().to_string_lossy().into_owned(),
                    })
                } else {
                    None
                }
            })
            .collect();
        targets.sort_by_key(|t| t.pid);
        targets
    }

    fn terminate(&self, pid: u32, force: bool) -> bool {
        let system = System::new_all();
        match system.process(Pid::from_u32(pid)) {
            Some(process) => {
                if force {
                    process.kill()
                } else {
                    // Graceful signal when the platform supports one,
                    // otherwise a plain kill.
                    process
                        .kill_with(Signal::Term)
                        .unwrap_or_else(|| process.kill())
                }
            }
            // Already gone.
            None => true,
        }
    }
}
