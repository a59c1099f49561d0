//! Tracing subscriber setup

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::error::{PipelineError, Result};

/// Install a global formatter at INFO, or DEBUG when `verbose`.
///
/// Fails if a global subscriber is already installed.
pub fn init(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| PipelineError::Logging(e.to_string()))
}
