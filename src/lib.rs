pub mod config;
pub mod dataset;
pub mod error;
pub mod hooks;
pub mod mesh;
pub mod model;
pub mod viz;

pub use config::{
    Corner, ExportConfig, HookPoint, ImageGridConfig, LogOverlaySettings, VisualizationConfig,
    load_visualization_config,
};
pub use dataset::{IntoSampleBatch, LabeledSample, SampleBatch, SampleSource, TrainingSamples, ingest};
pub use error::{VizError, VizResult};
pub use hooks::{CycleOutcome, Logs, SkipReason, TrainEndReport, TrainerState, TrainingCallback};
pub use mesh::{MeshGrid, mesh2d, plot_bounds};
pub use model::{ModelSnapshot, PrototypeModel};
pub use viz::{
    CallbackState, Colormap, MemorySink, RenderStrategy, TelemetrySink, Variant,
    VisualizationCallback,
};
