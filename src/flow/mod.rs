//! The in-app export flow: language resolution, the per-session state
//! machine, and option selection.

pub mod language;
pub mod machine;
pub mod options;

pub use language::LanguageResolver;
pub use machine::ExportMachine;

/// Tagged result of one session. Produced exactly once per session and
/// consumed by the batch coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Success,
    Failed(String),
    Skipped(String),
}

impl ExportOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExportOutcome::Success)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExportOutcome::Success => "success",
            ExportOutcome::Failed(_) => "failed",
            ExportOutcome::Skipped(_) => "skipped",
        }
    }
}

impl std::fmt::Display for ExportOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportOutcome::Success => write!(f, "success"),
            ExportOutcome::Failed(reason) => write!(f, "failed: {reason}"),
            ExportOutcome::Skipped(reason) => write!(f, "skipped: {reason}"),
        }
    }
}

/// States of the export flow, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Launched,
    LanguageResolved,
    LoggedInCheck,
    AdvancedOpened,
    ExportDialogOpened,
    OptionsSelected,
    SaveConfirmed,
    AwaitingCompletion,
    Completed,
    TimedOut,
    Closed,
}

impl FlowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowState::Launched => "launched",
            FlowState::LanguageResolved => "language_resolved",
            FlowState::LoggedInCheck => "logged_in_check",
            FlowState::AdvancedOpened => "advanced_opened",
            FlowState::ExportDialogOpened => "export_dialog_opened",
            FlowState::OptionsSelected => "options_selected",
            FlowState::SaveConfirmed => "save_confirmed",
            FlowState::AwaitingCompletion => "awaiting_completion",
            FlowState::Completed => "completed",
            FlowState::TimedOut => "timed_out",
            FlowState::Closed => "closed",
        }
    }
}
