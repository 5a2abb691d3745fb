//! Per-session export state machine.
//!
//! One [`ExportMachine`] drives one launched client from language detection
//! through the settings UI to a completed export. Recoverable problems
//! (elements that never appear, exports that never finish) become a tagged
//! [`ExportOutcome`]; only capability breakage surfaces as `Err`.

use std::time::Instant;

use crate::assets::{
    ADVANCED_TAB, CLOSE_BUTTON, EXPORT_BUTTON, SAVE_BUTTON, SHOW_MY_DATA_BUTTON,
    START_MESSAGING_BUTTON,
};
use crate::collector::OutputCollector;
use crate::config::ExportConfig;
use crate::error::Result;
use crate::screen::{Key, ScreenDriver};
use crate::session::Session;

use super::options::select_options;
use super::{ExportOutcome, FlowState, LanguageResolver};

pub struct ExportMachine<'a> {
    driver: &'a mut ScreenDriver,
    collector: &'a OutputCollector,
    config: &'a ExportConfig,
    state: FlowState,
}

impl<'a> ExportMachine<'a> {
    pub fn new(
        driver: &'a mut ScreenDriver,
        collector: &'a OutputCollector,
        config: &'a ExportConfig,
    ) -> Self {
        Self {
            driver,
            collector,
            config,
            state: FlowState::Launched,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Drive the flow to a terminal outcome. The caller owns launch and
    /// teardown; this only touches the running client's UI.
    pub fn run(&mut self, session: &mut Session) -> Result<ExportOutcome> {
        let outcome = self.drive(session)?;
        tracing::info!(
            session = %session.id,
            client = %session.installation.client_label,
            outcome = %outcome,
            "session flow finished"
        );
        Ok(outcome)
    }

    fn drive(&mut self, session: &mut Session) -> Result<ExportOutcome> {
        session.language = LanguageResolver::new(self.config).resolve(self.driver)?;
        self.transition(session, FlowState::LanguageResolved);
        let language = session.language.clone();

        self.capture_settings(session);

        self.transition(session, FlowState::LoggedInCheck);
        let logged_out = self
            .driver
            .locate(
                &language,
                START_MESSAGING_BUTTON,
                self.config.timeouts.probe,
                self.config.confidence.click,
            )?
            .is_some();
        if logged_out {
            return Ok(ExportOutcome::Skipped("not logged in".to_string()));
        }

        let advanced = self.driver.click(
            &language,
            ADVANCED_TAB,
            self.config.timeouts.locate,
            self.config.confidence.click,
        )?;
        if !advanced {
            self.debug_screenshot(session, "advanced");
            return Ok(ExportOutcome::Skipped("advanced tab not found".to_string()));
        }
        self.transition(session, FlowState::AdvancedOpened);
        std::thread::sleep(self.config.timeouts.step_settle);

        if !self.scroll_to_export(&language)? {
            self.debug_screenshot(session, "export_entry");
            return Ok(ExportOutcome::Skipped(
                "export entry not found".to_string(),
            ));
        }
        self.transition(session, FlowState::ExportDialogOpened);
        std::thread::sleep(self.config.timeouts.step_settle);

        select_options(self.driver, &language, self.config)?;
        self.transition(session, FlowState::OptionsSelected);

        let saved = self.driver.click(
            &language,
            SAVE_BUTTON,
            self.config.timeouts.save,
            self.config.confidence.click,
        )?;
        if !saved {
            self.debug_screenshot(session, "save");
            return Ok(ExportOutcome::Skipped("save button not found".to_string()));
        }
        self.transition(session, FlowState::SaveConfirmed);
        std::thread::sleep(self.config.timeouts.click_settle);

        // Baseline goes in just before the confirmation keystroke, so the
        // snapshot diff sees exactly what this export adds.
        session.baseline = Some(self.collector.snapshot());
        self.driver.press(Key::Enter)?;
        self.transition(session, FlowState::AwaitingCompletion);

        if !self.await_completion(&language)? {
            self.transition(session, FlowState::TimedOut);
            return Ok(ExportOutcome::Failed(format!(
                "export did not complete within {}",
                humantime::format_duration(self.config.timeouts.completion)
            )));
        }
        self.transition(session, FlowState::Completed);

        self.dismiss(&language)?;
        self.transition(session, FlowState::Closed);
        Ok(ExportOutcome::Success)
    }

    /// Scroll down the settings page until the export entry turns up. Each
    /// round is one locate followed by one scroll, `scroll_attempts` rounds
    /// in total.
    fn scroll_to_export(&mut self, language: &str) -> Result<bool> {
        for _ in 0..self.config.tuning.scroll_attempts {
            let hit = self.driver.click(
                language,
                EXPORT_BUTTON,
                self.config.timeouts.probe,
                self.config.confidence.click,
            )?;
            if hit {
                return Ok(true);
            }
            self.driver.scroll(self.config.tuning.scroll_distance)?;
            std::thread::sleep(self.config.timeouts.click_settle);
        }
        Ok(false)
    }

    /// Poll for the completion dialog until the budget runs out.
    fn await_completion(&mut self, language: &str) -> Result<bool> {
        let deadline = Instant::now() + self.config.timeouts.completion;
        loop {
            let done = self
                .driver
                .probe(language, SHOW_MY_DATA_BUTTON, self.config.confidence.option)?
                .is_some();
            if done {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            std::thread::sleep(self.config.timeouts.completion_poll);
        }
    }

    /// Close the completion dialog, falling back to Escape.
    fn dismiss(&mut self, language: &str) -> Result<()> {
        let closed = self.driver.click(
            language,
            CLOSE_BUTTON,
            self.config.timeouts.dismiss,
            self.config.confidence.option,
        )?;
        if !closed {
            tracing::warn!("close button not found, sending escape");
            self.driver.press(Key::Escape)?;
        }
        std::thread::sleep(self.config.timeouts.step_settle);
        Ok(())
    }

    /// Best-effort screenshot of the settings page, staged until the
    /// collector confirms an artifact.
    fn capture_settings(&mut self, session: &mut Session) {
        let path = session.screenshot_staging(&self.config.export_base_dir);
        match self.driver.screenshot(&path) {
            Ok(()) => session.settings_screenshot = Some(path),
            Err(e) => {
                tracing::warn!(session = %session.id, error = %e, "settings screenshot failed")
            }
        }
    }

    /// Best-effort screenshot when a step dead-ends, for diagnosis.
    fn debug_screenshot(&mut self, session: &Session, tag: &str) {
        let path = self.config.export_base_dir.join(format!(
            "{}_{}_debug_{tag}.png",
            session.installation.root_label, session.installation.client_label
        ));
        if let Err(e) = self.driver.screenshot(&path) {
            tracing::warn!(session = %session.id, error = %e, "debug screenshot failed");
        }
    }

    fn transition(&mut self, session: &Session, next: FlowState) {
        tracing::info!(
            session = %session.id,
            from = self.state.as_str(),
            to = next.as_str(),
            "flow transition"
        );
        self.state = next;
    }
}
