//! Command implementations.

mod info;
mod race;
mod run;
mod signal;
mod stream;
mod validate;

pub use info::run_info;
pub use race::run_race;
pub use run::run_aggregate;
pub use stream::run_stream;
pub use validate::run_validate;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::FanInBlueprint;

use crate::error::CliError;

/// Load a blueprint, failing early with a clear message if the file is absent
fn load_blueprint(path: &Path) -> Result<FanInBlueprint> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()).into());
    }

    config_loader::ConfigLoader::load_from_path(path)
        .map_err(CliError::from)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
