use anyhow::{bail, Context, Result};
use std::path::Path;

use super::defaults::MAX_CONFIG_FILE_BYTES;
use super::StepsConfig;

/// Read and parse a configuration file.
///
/// The format follows the extension (`yaml`/`yml`, `toml`, otherwise JSON5,
/// which also accepts plain JSON). Symlinks at the final component and files
/// above [`MAX_CONFIG_FILE_BYTES`] are refused.
pub fn read_config_file(path: &Path) -> Result<StepsConfig> {
    let metadata = std::fs::symlink_metadata(path)
        .with_context(|| format!("Cannot stat config file '{}'", path.display()))?;

    if metadata.file_type().is_symlink() {
        bail!(
            "Config file '{}' is a symlink; refusing to follow it",
            path.display()
        );
    }

    if metadata.len() > MAX_CONFIG_FILE_BYTES {
        bail!(
            "Config file '{}' is {} bytes, exceeds limit of {} bytes",
            path.display(),
            metadata.len(),
            MAX_CONFIG_FILE_BYTES,
        );
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;

    parse_config(&content, path.extension().and_then(|e| e.to_str()))
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

/// Parse configuration text in the format named by `extension`.
pub fn parse_config(content: &str, extension: Option<&str>) -> Result<StepsConfig> {
    let config = match extension {
        Some("yaml") | Some("yml") => serde_yaml::from_str(content)?,
        Some("toml") => toml::from_str(content)?,
        _ => json5::from_str(content)?,
    };
    Ok(config)
}

/// Write configuration as pretty-printed JSON.
pub fn write_config_file(path: &Path, config: &StepsConfig) -> Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file '{}'", path.display()))?;
    Ok(())
}
