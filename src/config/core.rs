use serde::{Deserialize, Serialize};

use crate::config::export::ExportConfig;
use crate::error::{VizError, VizResult};
use crate::mesh::DEFAULT_MAX_GRID_POINTS;
use crate::viz::grid::DataFormat;
use crate::viz::palette::Colormap;

const MIN_CANVAS_PX: u32 = 128;
/// Largest accepted canvas, in pixels.
pub const MAX_CANVAS_PIXELS: u64 = 16_777_216;

/// Which training hook drives a render cycle.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HookPoint {
    EpochStart,
    #[default]
    EpochEnd,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    UpperLeft,
    UpperRight,
    LowerLeft,
    #[default]
    LowerRight,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LogOverlaySettings {
    #[serde(default)]
    pub corner: Corner,
    #[serde(default = "default_overlay_pad")]
    pub pad: usize,
    #[serde(default = "default_overlay_scale")]
    pub scale: usize,
    /// Metric keys shown after the epoch counter, in order.
    #[serde(default = "default_overlay_metrics")]
    pub metrics: Vec<String>,
}

impl Default for LogOverlaySettings {
    fn default() -> Self {
        Self {
            corner: Corner::default(),
            pad: default_overlay_pad(),
            scale: default_overlay_scale(),
            metrics: default_overlay_metrics(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ImageGridConfig {
    #[serde(default = "default_num_columns")]
    pub num_columns: usize,
    #[serde(default = "default_grid_padding")]
    pub padding: usize,
    #[serde(default)]
    pub data_format: DataFormat,
    /// Random training samples forwarded once at start-up (0 disables).
    #[serde(default)]
    pub random_data: usize,
    #[serde(default)]
    pub add_embedding: bool,
    #[serde(default = "default_embedding_data")]
    pub embedding_data: usize,
}

impl Default for ImageGridConfig {
    fn default() -> Self {
        Self {
            num_columns: default_num_columns(),
            padding: default_grid_padding(),
            data_format: DataFormat::default(),
            random_data: 0,
            add_embedding: false,
            embedding_data: default_embedding_data(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct VisualizationConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub colormap: Colormap,
    #[serde(default = "default_border")]
    pub border: f64,
    #[serde(default = "default_resolution")]
    pub resolution: usize,
    #[serde(default = "default_max_grid_points")]
    pub max_grid_points: usize,
    #[serde(default)]
    pub axis_off: bool,
    #[serde(default = "default_true")]
    pub show: bool,
    #[serde(default)]
    pub block: bool,
    #[serde(default = "default_pause_time_ms")]
    pub pause_time_ms: u64,
    #[serde(default)]
    pub tensorboard: bool,
    #[serde(default)]
    pub show_last_only: bool,
    #[serde(default = "default_true")]
    pub show_protos: bool,
    #[serde(default)]
    pub map_protos: bool,
    #[serde(default = "default_true")]
    pub flatten_data: bool,
    /// Render every `interval` epochs; 0 renders every epoch.
    #[serde(default)]
    pub interval: usize,
    #[serde(default)]
    pub hook: HookPoint,
    #[serde(default)]
    pub preserve: bool,
    #[serde(default)]
    pub display_logs: bool,
    #[serde(default)]
    pub log_overlay: LogOverlaySettings,
    /// Canvas size in inches; multiplied by `dpi`.
    #[serde(default = "default_figsize")]
    pub figsize: (f32, f32),
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub image_grid: ImageGridConfig,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            colormap: Colormap::default(),
            border: default_border(),
            resolution: default_resolution(),
            max_grid_points: default_max_grid_points(),
            axis_off: false,
            show: true,
            block: false,
            pause_time_ms: default_pause_time_ms(),
            tensorboard: false,
            show_last_only: false,
            show_protos: true,
            map_protos: false,
            flatten_data: true,
            interval: 0,
            hook: HookPoint::default(),
            preserve: false,
            display_logs: false,
            log_overlay: LogOverlaySettings::default(),
            figsize: default_figsize(),
            dpi: default_dpi(),
            seed: None,
            export: ExportConfig::default(),
            image_grid: ImageGridConfig::default(),
        }
    }
}

impl VisualizationConfig {
    /// Canvas size in pixels.
    pub fn canvas_size(&self) -> (u32, u32) {
        let width = (self.figsize.0 * self.dpi as f32).round().max(0.0) as u32;
        let height = (self.figsize.1 * self.dpi as f32).round().max(0.0) as u32;
        (width, height)
    }

    pub fn validate(&self) -> VizResult<()> {
        if self.resolution < 2 {
            return Err(VizError::InvalidConfig(format!(
                "resolution must be at least 2, got {}",
                self.resolution
            )));
        }
        if !self.border.is_finite() || self.border < 0.0 {
            return Err(VizError::InvalidConfig(format!(
                "border must be finite and non-negative, got {}",
                self.border
            )));
        }
        if self.max_grid_points == 0 {
            return Err(VizError::InvalidConfig(
                "max_grid_points must be positive".into(),
            ));
        }
        if !(self.figsize.0.is_finite() && self.figsize.1.is_finite()) || self.dpi == 0 {
            return Err(VizError::InvalidConfig(format!(
                "figsize {:?} at dpi {} is not a usable canvas",
                self.figsize, self.dpi
            )));
        }
        let (width, height) = self.canvas_size();
        if width < MIN_CANVAS_PX || height < MIN_CANVAS_PX {
            return Err(VizError::InvalidConfig(format!(
                "canvas {width}x{height}px is smaller than {MIN_CANVAS_PX}px on a side"
            )));
        }
        let pixels = u64::from(width) * u64::from(height);
        if pixels > MAX_CANVAS_PIXELS {
            return Err(VizError::InvalidConfig(format!(
                "canvas {width}x{height}px ({pixels} pixels) exceeds the {MAX_CANVAS_PIXELS} pixel limit"
            )));
        }
        if self.image_grid.num_columns == 0 {
            return Err(VizError::InvalidConfig(
                "image_grid.num_columns must be positive".into(),
            ));
        }
        if self.log_overlay.scale == 0 {
            return Err(VizError::InvalidConfig(
                "log_overlay.scale must be positive".into(),
            ));
        }
        self.export.validate()
    }
}

fn default_title() -> String {
    "Prototype Visualization".into()
}

fn default_border() -> f64 {
    0.1
}

fn default_resolution() -> usize {
    100
}

fn default_max_grid_points() -> usize {
    DEFAULT_MAX_GRID_POINTS
}

fn default_true() -> bool {
    true
}

fn default_pause_time_ms() -> u64 {
    100
}

fn default_figsize() -> (f32, f32) {
    (8.0, 6.0)
}

fn default_dpi() -> u32 {
    100
}

fn default_overlay_pad() -> usize {
    6
}

fn default_overlay_scale() -> usize {
    2
}

fn default_overlay_metrics() -> Vec<String> {
    ["val_loss", "val_acc", "loss", "acc"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_num_columns() -> usize {
    2
}

fn default_grid_padding() -> usize {
    2
}

fn default_embedding_data() -> usize {
    100
}
