//! Process capability seam and the session lifecycle manager.

pub mod probe;
pub mod supervisor;
pub mod system;

pub use supervisor::ProcessSupervisor;
pub use system::SystemProcesses;

#[cfg(test)]
pub(crate) use supervisor::testing;

use std::path::Path;

/// Handle to a process this engine started.
pub trait ProcessHandle: Send + std::fmt::Debug {
    fn id(&self) -> u32;
    fn kill(&mut self) -> std::io::Result<()>;
}

impl ProcessHandle for std::process::Child {
    fn id(&self) -> u32 {
        std::process::Child::id(self)
    }

    fn kill(&mut self) -> std::io::Result<()> {
        std::process::Child::kill(self)
    }
}

/// A running process that verified as the target application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetProcess {
    pub pid: u32,
    pub name: String,
}

/// OS process operations the lifecycle manager needs.
pub trait Processes: Send {
    /// Start a process by executable path.
    fn spawn(&mut self, path: &Path) -> std::io::Result<Box<dyn ProcessHandle>>;

    /// Whether the executable's metadata identifies it as the target
    /// application.
    fn verify_identity(&self, path: &Path) -> bool;

    /// All running processes whose executable verifies as the target,
    /// whoever started them.
    fn running_targets(&self) -> Vec<TargetProcess>;

    /// Terminate one process; graceful first, forced when `force`.
    /// Returns false only when the process exists and refused to die.
    fn terminate(&self, pid: u32, force: bool) -> bool;
}
