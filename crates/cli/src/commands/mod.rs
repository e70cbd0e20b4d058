mod propagate;
mod replay;

use std::path::Path;

use salvage_core::RecoveryConfig;

use crate::{fail, OutputFormat};

pub(crate) use propagate::cmd_propagate;
pub(crate) use replay::cmd_replay;

fn read_file(path: &Path, output: OutputFormat, quiet: bool) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", path.display(), e);
            fail(&msg, output, quiet);
        }
    }
}

/// Load `--config`, or `None` when the flag was not given.
fn load_config(path: Option<&Path>, output: OutputFormat, quiet: bool) -> Option<RecoveryConfig> {
    let path = path?;
    let text = read_file(path, output, quiet);
    match toml::from_str::<RecoveryConfig>(&text) {
        Ok(config) => {
            tracing::debug!(path = %path.display(), ?config, "loaded recovery config");
            Some(config)
        }
        Err(e) => {
            let msg = format!("error parsing config '{}': {}", path.display(), e);
            fail(&msg, output, quiet);
        }
    }
}
