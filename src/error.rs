use thiserror::Error;

pub type VizResult<T> = Result<T, VizError>;

#[derive(Debug, Error)]
pub enum VizError {
    #[error("unsupported training sample source: {0}")]
    InvalidInputKind(String),

    #[error(
        "degenerate {axis} range: every point has {axis} = {min} (max {max}); \
         a decision mesh needs spread on both axes"
    )]
    DegenerateRange { axis: char, min: f64, max: f64 },

    #[error(
        "mesh resolution {resolution} would produce {points} query points, above the limit of {limit}; \
         lower `resolution` or raise `max_grid_points`"
    )]
    GridTooLarge {
        resolution: usize,
        points: u128,
        limit: usize,
    },

    #[error("invalid visualization config: {0}")]
    InvalidConfig(String),

    #[error("shape mismatch: {0}")]
    Shape(String),

    #[error("tensor conversion failed: {0}")]
    Tensor(String),

    #[error("model prediction failed: {0}")]
    Prediction(String),

    #[error("telemetry sink unavailable: {0}")]
    TelemetryUnavailable(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("render failed: {0}")]
    Render(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}
