//! One-client session lifecycle.
//!
//! [`ClientRunner`] wraps the flow machine with everything that happens
//! outside the client's UI: identity verification, launch, artifact
//! collection and unconditional teardown. The [`SessionRunner`] trait is the
//! seam the batch coordinator drives, so batches can be tested without a
//! screen or a process table.

use crate::collector::OutputCollector;
use crate::config::ExportConfig;
use crate::error::Result;
use crate::flow::{ExportMachine, ExportOutcome};
use crate::process::ProcessSupervisor;
use crate::screen::ScreenDriver;
use crate::session::{ClientInstallation, Session};

pub trait SessionRunner {
    /// Run one full session. Infrastructure failures are folded into the
    /// outcome so a batch never aborts on a single bad client.
    fn run(&mut self, installation: &ClientInstallation) -> ExportOutcome;
}

pub struct ClientRunner {
    driver: ScreenDriver,
    supervisor: ProcessSupervisor,
    collector: OutputCollector,
    config: ExportConfig,
}

impl ClientRunner {
    pub fn new(
        driver: ScreenDriver,
        supervisor: ProcessSupervisor,
        collector: OutputCollector,
        config: ExportConfig,
    ) -> Self {
        Self {
            driver,
            supervisor,
            collector,
            config,
        }
    }

    fn run_inner(&mut self, session: &mut Session) -> Result<ExportOutcome> {
        let path = &session.installation.exe_path;
        if !self.supervisor.verify_identity(path) {
            return Ok(ExportOutcome::Skipped(
                "executable failed identity check".to_string(),
            ));
        }

        session.handle = Some(self.supervisor.start(path)?);
        std::thread::sleep(self.config.timeouts.launch_settle);

        let outcome = {
            let mut machine =
                ExportMachine::new(&mut self.driver, &self.collector, &self.config);
            machine.run(session)?
        };
        if !outcome.is_success() {
            return Ok(outcome);
        }

        // Let the client finish writing before diffing the download dir.
        std::thread::sleep(self.config.timeouts.fs_settle);
        match self.collector.collect(session)? {
            Some(destination) => {
                tracing::info!(
                    session = %session.id,
                    destination = %destination.display(),
                    "artifact relocated"
                );
                Ok(ExportOutcome::Success)
            }
            None => Ok(ExportOutcome::Failed(
                "no export artifact found".to_string(),
            )),
        }
    }
}

impl SessionRunner for ClientRunner {
    fn run(&mut self, installation: &ClientInstallation) -> ExportOutcome {
        let mut session = Session::new(installation.clone(), &self.config.default_language);
        tracing::info!(
            session = %session.id,
            client = %installation.client_label,
            exe = %installation.exe_path.display(),
            "session starting"
        );

        let outcome = match self.run_inner(&mut session) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(session = %session.id, error = %e, "session errored");
                ExportOutcome::Failed(e.to_string())
            }
        };

        // Teardown runs no matter how the session ended.
        self.supervisor.terminate_all(session.handle.take());
        if let Err(e) = self.driver.defocus() {
            tracing::warn!(session = %session.id, error = %e, "defocus failed");
        }
        if !outcome.is_success() {
            self.collector.discard_screenshot(&mut session);
        }
        outcome
    }
}
