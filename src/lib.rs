//! Unattended data export for multi-account Telegram Desktop installations.
//!
//! The engine locates UI elements by matching reference screenshots on the
//! live screen, drives each client through its export settings with
//! synthesized mouse and keyboard input, waits out the export, and relocates
//! the produced archive into a per-client destination tree. Batches run one
//! client at a time because the screen and input devices are a single shared
//! resource.
//!
//! The hardware-facing edges (visual search, input synthesis, screen
//! capture, the process table) sit behind narrow traits in [`screen`] and
//! [`process`], so everything above them is testable with scripted doubles.

pub mod assets;
pub mod batch;
pub mod collector;
pub mod config;
pub mod error;
pub mod flow;
pub mod process;
pub mod runner;
pub mod screen;
pub mod session;

pub use assets::AssetCatalog;
pub use batch::{discover_installations, BatchCoordinator, BatchSummary, LogObserver};
pub use collector::OutputCollector;
pub use config::ExportConfig;
pub use error::{Error, Result};
pub use flow::{ExportMachine, ExportOutcome};
pub use process::{ProcessSupervisor, SystemProcesses};
pub use runner::{ClientRunner, SessionRunner};
pub use screen::{EnigoInput, ScreenDriver, TemplateLocator, XcapGrab};
pub use session::{ClientInstallation, Session};
