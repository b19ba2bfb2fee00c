use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbImage;
use ndarray::Array2;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::warn;

use crate::error::{VizError, VizResult};

/// Points forwarded to an embedding projector.
#[derive(Debug, Clone)]
pub struct EmbeddingRecord {
    pub features: Array2<f32>,
    pub metadata: Vec<i64>,
    /// Sprite of the samples, when they are images.
    pub sprite: Option<RgbImage>,
    pub step: Option<usize>,
}

/// External experiment tracker.
pub trait TelemetrySink {
    fn add_figure(&mut self, tag: &str, figure: &RgbImage, step: usize) -> VizResult<()>;

    fn add_image(&mut self, tag: &str, image: &RgbImage, step: Option<usize>) -> VizResult<()>;

    fn add_embedding(&mut self, tag: &str, embedding: &EmbeddingRecord) -> VizResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryKind {
    Figure,
    Image,
    Embedding,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelemetryEvent {
    pub kind: TelemetryKind,
    pub tag: String,
    pub step: Option<usize>,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// Records events in memory; clones share one log.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<TelemetryEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().clone()
    }

    fn record(&self, event: TelemetryEvent) {
        self.events.lock().push(event);
    }
}

impl TelemetrySink for MemorySink {
    fn add_figure(&mut self, tag: &str, figure: &RgbImage, step: usize) -> VizResult<()> {
        self.record(TelemetryEvent {
            kind: TelemetryKind::Figure,
            tag: tag.to_owned(),
            step: Some(step),
            width: figure.width(),
            height: figure.height(),
            file: None,
        });
        Ok(())
    }

    fn add_image(&mut self, tag: &str, image: &RgbImage, step: Option<usize>) -> VizResult<()> {
        self.record(TelemetryEvent {
            kind: TelemetryKind::Image,
            tag: tag.to_owned(),
            step,
            width: image.width(),
            height: image.height(),
            file: None,
        });
        Ok(())
    }

    fn add_embedding(&mut self, tag: &str, embedding: &EmbeddingRecord) -> VizResult<()> {
        let (rows, cols) = embedding.features.dim();
        self.record(TelemetryEvent {
            kind: TelemetryKind::Embedding,
            tag: tag.to_owned(),
            step: embedding.step,
            width: cols as u32,
            height: rows as u32,
            file: None,
        });
        Ok(())
    }
}

#[derive(Serialize)]
struct EmbeddingFile<'a> {
    tag: &'a str,
    step: Option<usize>,
    features: Vec<Vec<f32>>,
    metadata: &'a [i64],
    sprite: Option<String>,
}

/// Writes images as PNG files next to an `events.jsonl` index.
pub struct EventLogSink {
    dir: PathBuf,
    events: BufWriter<File>,
}

impl EventLogSink {
    pub fn create(dir: impl Into<PathBuf>) -> VizResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|err| unavailable(&dir, err))?;
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("events.jsonl"))
            .map_err(|err| unavailable(&dir, err))?;
        Ok(Self {
            dir,
            events: BufWriter::new(log),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(tag: &str, step: Option<usize>, extension: &str) -> String {
        let slug: String = tag
            .chars()
            .map(|ch| if ch.is_ascii_alphanumeric() { ch.to_ascii_lowercase() } else { '_' })
            .collect();
        match step {
            Some(step) => format!("{slug}_{step:05}.{extension}"),
            None => format!("{slug}.{extension}"),
        }
    }

    fn write_png(&self, name: &str, image: &RgbImage) -> VizResult<()> {
        let path = self.dir.join(name);
        image
            .save(&path)
            .map_err(|err| VizError::TelemetryUnavailable(format!("{}: {err}", path.display())))
    }

    fn append(&mut self, event: &TelemetryEvent) -> VizResult<()> {
        let line = serde_json::to_string(event)
            .map_err(|err| VizError::TelemetryUnavailable(err.to_string()))?;
        writeln!(self.events, "{line}")
            .and_then(|_| self.events.flush())
            .map_err(|err| unavailable(&self.dir, err))
    }
}

fn unavailable(dir: &Path, err: std::io::Error) -> VizError {
    VizError::TelemetryUnavailable(format!("{}: {err}", dir.display()))
}

impl TelemetrySink for EventLogSink {
    fn add_figure(&mut self, tag: &str, figure: &RgbImage, step: usize) -> VizResult<()> {
        let name = Self::file_name(tag, Some(step), "png");
        self.write_png(&name, figure)?;
        self.append(&TelemetryEvent {
            kind: TelemetryKind::Figure,
            tag: tag.to_owned(),
            step: Some(step),
            width: figure.width(),
            height: figure.height(),
            file: Some(name),
        })
    }

    fn add_image(&mut self, tag: &str, image: &RgbImage, step: Option<usize>) -> VizResult<()> {
        let name = Self::file_name(tag, step, "png");
        self.write_png(&name, image)?;
        self.append(&TelemetryEvent {
            kind: TelemetryKind::Image,
            tag: tag.to_owned(),
            step,
            width: image.width(),
            height: image.height(),
            file: Some(name),
        })
    }

    fn add_embedding(&mut self, tag: &str, embedding: &EmbeddingRecord) -> VizResult<()> {
        let sprite = match &embedding.sprite {
            Some(sprite) => {
                let name = Self::file_name(&format!("{tag} sprite"), embedding.step, "png");
                self.write_png(&name, sprite)?;
                Some(name)
            }
            None => None,
        };
        let name = Self::file_name(tag, embedding.step, "json");
        let body = EmbeddingFile {
            tag,
            step: embedding.step,
            features: embedding.features.rows().into_iter().map(|row| row.to_vec()).collect(),
            metadata: &embedding.metadata,
            sprite,
        };
        let path = self.dir.join(&name);
        let file = File::create(&path).map_err(|err| unavailable(&self.dir, err))?;
        serde_json::to_writer(BufWriter::new(file), &body)
            .map_err(|err| VizError::TelemetryUnavailable(err.to_string()))?;
        let (rows, cols) = embedding.features.dim();
        self.append(&TelemetryEvent {
            kind: TelemetryKind::Embedding,
            tag: tag.to_owned(),
            step: embedding.step,
            width: cols as u32,
            height: rows as u32,
            file: Some(name),
        })
    }
}

/// Fans render results out to the tracking sink when forwarding is enabled.
/// Sink failures are logged and never abort a cycle.
pub struct TelemetryForwarder {
    enabled: bool,
    sink: Option<Box<dyn TelemetrySink>>,
    failures: usize,
}

impl TelemetryForwarder {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            sink: None,
            failures: 0,
        }
    }

    pub fn new(enabled: bool, sink: Option<Box<dyn TelemetrySink>>) -> Self {
        Self {
            enabled,
            sink,
            failures: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn set_sink(&mut self, sink: Box<dyn TelemetrySink>) {
        self.sink = Some(sink);
    }

    fn forward<F>(&mut self, what: &str, send: F) -> bool
    where
        F: FnOnce(&mut dyn TelemetrySink) -> VizResult<()>,
    {
        if !self.enabled {
            return false;
        }
        let result = match self.sink.as_deref_mut() {
            Some(sink) => send(sink),
            None => Err(VizError::TelemetryUnavailable(
                "forwarding is enabled but no sink is attached".into(),
            )),
        };
        match result {
            Ok(()) => true,
            Err(err) => {
                self.failures += 1;
                warn!("viz: telemetry {what} dropped: {err}");
                false
            }
        }
    }

    pub fn forward_figure(&mut self, tag: &str, figure: &RgbImage, epoch: usize) -> bool {
        self.forward("figure", |sink| sink.add_figure(tag, figure, epoch))
    }

    pub fn forward_components(&mut self, grid: &RgbImage, epoch: usize) -> bool {
        self.forward("components", |sink| {
            sink.add_image("Components", grid, Some(epoch))
        })
    }

    pub fn forward_startup(&mut self, data_grid: Option<&RgbImage>, embedding: Option<&EmbeddingRecord>) -> bool {
        let mut delivered = true;
        if let Some(grid) = data_grid {
            delivered &= self.forward("data grid", |sink| sink.add_image("Data", grid, None));
        }
        if let Some(embedding) = embedding {
            delivered &= self.forward("embedding", |sink| {
                sink.add_embedding("Data Embedding", embedding)
            });
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_forwarder_sends_nothing() {
        let sink = MemorySink::new();
        let mut forwarder = TelemetryForwarder::disabled();
        forwarder.set_sink(Box::new(sink.clone()));
        assert!(!forwarder.is_enabled());
        let figure = RgbImage::new(4, 4);
        assert!(!forwarder.forward_figure("Prototype Visualization", &figure, 0));
        assert!(sink.events().is_empty());
        assert_eq!(forwarder.failures(), 0);
    }

    #[test]
    fn missing_sink_is_counted_not_raised() {
        let mut forwarder = TelemetryForwarder::new(true, None);
        let figure = RgbImage::new(4, 4);
        assert!(!forwarder.forward_figure("t", &figure, 3));
        assert_eq!(forwarder.failures(), 1);
    }

    #[test]
    fn event_log_writes_pngs_and_index() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sink = EventLogSink::create(dir.path().join("tb")).expect("sink");
        let figure = RgbImage::new(8, 6);
        sink.add_figure("GLVQ Run", &figure, 12).expect("figure");
        let embedding = EmbeddingRecord {
            features: Array2::zeros((3, 2)),
            metadata: vec![0, 1, 1],
            sprite: None,
            step: None,
        };
        sink.add_embedding("Data Embedding", &embedding)
            .expect("embedding");

        let tb = dir.path().join("tb");
        assert!(tb.join("glvq_run_00012.png").exists());
        assert!(tb.join("data_embedding.json").exists());
        let index = fs::read_to_string(tb.join("events.jsonl")).expect("index");
        let lines: Vec<&str> = index.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).expect("json");
        assert_eq!(first["kind"], "figure");
        assert_eq!(first["step"], 12);
    }
}
