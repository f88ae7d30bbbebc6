use std::{io::ErrorKind, path::Path};

use tracing::{debug, info};

use crate::{Error, Result, SluiceConfig};

/// Default config file name, looked up relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Load and validate the config file at `path`.
///
/// A missing file is not an error: the built-in defaults are returned.
/// Any other read failure, a parse error, or a validation error is.
pub fn load(path: &Path) -> Result<SluiceConfig> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            debug!(path = %path.display(), "loading config file");
            SluiceConfig::from_toml_str(&contents)
        },
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "config file not found, using defaults");
            Ok(SluiceConfig::default())
        },
        Err(source) => Err(Error::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
