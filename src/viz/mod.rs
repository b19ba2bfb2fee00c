pub mod callback;
pub mod capture;
pub mod display;
pub mod draw;
pub mod export;
pub mod glyph;
pub mod grid;
pub mod palette;
pub mod raster;
pub mod strategy;
pub mod surface;
pub mod telemetry;

pub use callback::{CallbackState, VisualizationCallback, gate, log_overlay_lines};
pub use capture::{FrameSequence, save_still, still_path};
pub use display::{LiveImageViewer, NoViewer, Viewer};
pub use export::{AnimationRequest, animation_path, encode_with_ffmpeg, gif_from_dir};
pub use grid::{DataFormat, make_grid};
pub use palette::{Colormap, LabelColors};
pub use strategy::{RenderArtifacts, RenderContext, RenderStrategy, Variant, strategy_for};
pub use surface::RenderSurface;
pub use telemetry::{
    EmbeddingRecord, EventLogSink, MemorySink, TelemetryEvent, TelemetryForwarder, TelemetryKind,
    TelemetrySink,
};
