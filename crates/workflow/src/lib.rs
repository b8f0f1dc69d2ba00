//! Repasse workflow: import released titles and send the repasse e-mails
//! through the Tasy web UI.

pub mod config;
pub mod processor;
pub mod tasy;

pub use config::Config;
pub use processor::{RepasseOutcome, RepasseProcessor, RunMode, RunSummary};
