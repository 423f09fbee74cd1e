//! Device file loading: turns the JSON device file into a registry.

use std::path::{Path, PathBuf};

use homesim_app::registry::DeviceRegistry;
use homesim_domain::descriptor::DeviceFile;
use homesim_domain::device::DeviceKind;
use homesim_domain::error::ConfigurationError;

/// Why the device set could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read device file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid device configuration")]
    Configuration(#[from] ConfigurationError),
}

/// Read `path` and register the devices of the `kinds` selected.
///
/// # Errors
///
/// Returns [`LoadError`] when the file cannot be read or any device is
/// invalid. Nothing is registered in that case.
pub fn load(path: &Path, kinds: &[DeviceKind]) -> Result<DeviceRegistry, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let registry = parse(&content, kinds)?;
    tracing::info!(path = %path.display(), devices = registry.len(), "device file loaded");
    Ok(registry)
}

fn parse(content: &str, kinds: &[DeviceKind]) -> Result<DeviceRegistry, ConfigurationError> {
    let devices = DeviceFile::from_json(content)?.into_devices(kinds)?;
    DeviceRegistry::from_devices(devices)
}
