pub mod core;
pub mod export;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use toml::Value;

pub use self::core::{
    Corner, HookPoint, ImageGridConfig, LogOverlaySettings, VisualizationConfig,
};
pub use self::export::{ExportConfig, FFMPEG_ENV};

/// Load and merge TOML layers; later files override earlier ones key by key.
pub fn load_visualization_config(paths: &[PathBuf]) -> Result<VisualizationConfig> {
    let mut merged = Value::Table(Default::default());
    for path in paths {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let layer: Value = toml::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        merge_values(&mut merged, layer);
    }

    let config: VisualizationConfig = merged
        .try_into()
        .context("failed to deserialize visualization config")?;
    config.validate()?;
    Ok(config)
}

fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Table(base), Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
