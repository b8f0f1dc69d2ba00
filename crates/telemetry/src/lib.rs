//! Observability for the repasse automation: logging, run evidence and metrics.

pub mod evidence;
pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::Metrics;
