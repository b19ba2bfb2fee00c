use std::fs;
use std::time::Duration;

use burn::tensor::backend::Backend;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use super::capture::{FrameSequence, save_still, still_path};
use super::display::{LiveImageViewer, NoViewer, Viewer};
use super::export::{AnimationRequest, gif_from_dir};
use super::strategy::{RenderArtifacts, RenderContext, RenderStrategy, Variant, strategy_for};
use super::surface::RenderSurface;
use super::telemetry::{TelemetryForwarder, TelemetrySink};
use crate::config::{HookPoint, VisualizationConfig};
use crate::dataset::{IntoSampleBatch, SampleSource, TrainingSamples, ingest};
use crate::error::{VizError, VizResult};
use crate::hooks::{
    CycleOutcome, Logs, SkipReason, TrainEndReport, TrainerState, TrainingCallback,
};
use crate::model::PrototypeModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackState {
    /// Constructed, waiting for training to start.
    Armed,
    Active,
    Closed,
}

/// Interval gate first, then the last-epoch gate. `None` means render.
pub fn gate(
    epoch: usize,
    max_epochs: usize,
    interval: usize,
    show_last_only: bool,
) -> Option<SkipReason> {
    if interval > 0 && epoch % interval != 0 {
        return Some(SkipReason::Interval);
    }
    if show_last_only && epoch + 1 != max_epochs {
        return Some(SkipReason::NotLastEpoch);
    }
    None
}

/// Overlay text: the epoch counter followed by the configured metrics,
/// `NaN` for metrics the trainer did not report.
pub fn log_overlay_lines(epoch: usize, logs: &Logs, metrics: &[String]) -> Vec<String> {
    let mut lines = Vec::with_capacity(metrics.len() + 1);
    lines.push(format!("Epoch: {epoch:04}"));
    for key in metrics {
        let value = logs.get(key).copied().unwrap_or(f64::NAN);
        lines.push(format!("{key}: {value:.3}"));
    }
    lines
}

/// Live visualization of a prototype classifier during training.
pub struct VisualizationCallback<B: Backend> {
    config: VisualizationConfig,
    samples: TrainingSamples,
    strategy: Box<dyn RenderStrategy<B>>,
    state: CallbackState,
    surface: Option<RenderSurface>,
    frames: Option<FrameSequence>,
    viewer: Box<dyn Viewer>,
    telemetry: TelemetryForwarder,
    rng: StdRng,
    rendered: Vec<usize>,
}

impl<B: Backend> VisualizationCallback<B> {
    pub fn new<T: IntoSampleBatch>(
        config: VisualizationConfig,
        source: SampleSource<'_, T>,
        variant: Variant,
    ) -> VizResult<Self> {
        let strategy = strategy_for::<B>(variant, &config);
        Self::with_strategy(config, source, strategy)
    }

    pub fn with_strategy<T: IntoSampleBatch>(
        config: VisualizationConfig,
        source: SampleSource<'_, T>,
        strategy: Box<dyn RenderStrategy<B>>,
    ) -> VizResult<Self> {
        config.validate()?;
        let samples = ingest(source, config.flatten_data)?;

        let export = &config.export;
        if export.writes_files() || config.show {
            fs::create_dir_all(&export.save_dir).map_err(|err| {
                VizError::Export(format!(
                    "failed to create output directory {}: {err}",
                    export.save_dir.display()
                ))
            })?;
        }
        let viewer: Box<dyn Viewer> = if config.show {
            Box::new(LiveImageViewer::new(&export.save_dir, &export.prefix))
        } else {
            Box::new(NoViewer)
        };
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let telemetry = if config.tensorboard {
            TelemetryForwarder::new(true, None)
        } else {
            TelemetryForwarder::disabled()
        };

        info!(
            "viz: {} callback armed over {} samples (resolution {}, interval {})",
            strategy.variant(),
            samples.len(),
            config.resolution,
            config.interval
        );

        Ok(Self {
            config,
            samples,
            strategy,
            state: CallbackState::Armed,
            surface: None,
            frames: None,
            viewer,
            telemetry,
            rng,
            rendered: Vec::new(),
        })
    }

    pub fn with_viewer(mut self, viewer: Box<dyn Viewer>) -> Self {
        self.viewer = viewer;
        self
    }

    pub fn with_telemetry(mut self, sink: Box<dyn TelemetrySink>) -> Self {
        self.telemetry.set_sink(sink);
        self
    }

    pub fn state(&self) -> CallbackState {
        self.state
    }

    pub fn config(&self) -> &VisualizationConfig {
        &self.config
    }

    pub fn samples(&self) -> &TrainingSamples {
        &self.samples
    }

    pub fn variant(&self) -> Variant {
        self.strategy.variant()
    }

    pub fn surface(&self) -> Option<&RenderSurface> {
        self.surface.as_ref()
    }

    /// Epochs that completed a render cycle, in order.
    pub fn rendered_epochs(&self) -> &[usize] {
        &self.rendered
    }

    pub fn captured_frames(&self) -> usize {
        self.frames.as_ref().map_or(0, FrameSequence::len)
    }

    pub fn telemetry_failures(&self) -> usize {
        self.telemetry.failures()
    }

    fn render_cycle(
        &mut self,
        hook: HookPoint,
        trainer: &TrainerState,
        model: &dyn PrototypeModel<B>,
        logs: &Logs,
    ) -> CycleOutcome {
        if self.state != CallbackState::Active {
            return CycleOutcome::Skipped(SkipReason::Inactive);
        }
        if self.config.hook != hook {
            return CycleOutcome::Skipped(SkipReason::OtherHook);
        }
        let epoch = trainer.current_epoch;
        if let Some(reason) = gate(
            epoch,
            trainer.max_epochs,
            self.config.interval,
            self.config.show_last_only,
        ) {
            debug!("viz: epoch {epoch} skipped ({reason:?})");
            return CycleOutcome::Skipped(reason);
        }

        let artifacts = match self.draw(epoch, model, logs) {
            Ok(artifacts) => artifacts,
            Err(err) => {
                warn!("viz: epoch {epoch} not rendered: {err}");
                return CycleOutcome::Failed(err);
            }
        };
        self.publish(epoch, &artifacts);
        self.rendered.push(epoch);
        CycleOutcome::Rendered
    }

    fn draw(
        &mut self,
        epoch: usize,
        model: &dyn PrototypeModel<B>,
        logs: &Logs,
    ) -> VizResult<RenderArtifacts> {
        let Self {
            config,
            samples,
            strategy,
            surface,
            ..
        } = self;
        let surface = surface
            .as_mut()
            .ok_or_else(|| VizError::Render("callback has no canvas".into()))?;
        surface.begin_cycle(config.preserve);

        let mut ctx = RenderContext {
            surface,
            config: &*config,
            samples: &*samples,
            epoch,
        };
        let artifacts = strategy.render(&mut ctx, model)?;
        if config.display_logs {
            let lines = log_overlay_lines(epoch, logs, &config.log_overlay.metrics);
            ctx.surface.draw_log_overlay(&lines, &config.log_overlay);
        }
        Ok(artifacts)
    }

    /// Sinks in order: telemetry, display, still, frame capture. Each failure
    /// is logged on its own and does not stop the rest.
    fn publish(&mut self, epoch: usize, artifacts: &RenderArtifacts) {
        let Some(surface) = self.surface.as_ref() else {
            return;
        };

        if self.telemetry.is_enabled() {
            match surface.to_rgb_image() {
                Ok(figure) => {
                    self.telemetry
                        .forward_figure(&self.config.title, &figure, epoch);
                }
                Err(err) => warn!("viz: epoch {epoch}: figure not forwarded: {err}"),
            }
            if let Some(grid) = &artifacts.components {
                self.telemetry.forward_components(grid, epoch);
            }
        }

        let pause = Duration::from_millis(self.config.pause_time_ms);
        if let Err(err) = self.viewer.present(surface, pause, self.config.block) {
            warn!("viz: epoch {epoch}: display failed: {err}");
        }

        let export = &self.config.export;
        if export.save {
            let path = still_path(&export.save_dir, &export.prefix, epoch);
            match save_still(surface, &path) {
                Ok(()) if export.verbose => info!("viz: saved {}", path.display()),
                Ok(()) => {}
                Err(err) => warn!("viz: epoch {epoch}: {err}"),
            }
        }

        if let Some(frames) = self.frames.as_mut()
            && let Err(err) = frames.push(surface.image())
        {
            warn!("viz: epoch {epoch}: frame not captured: {err}");
        }
    }
}

impl<B: Backend> TrainingCallback<B> for VisualizationCallback<B> {
    fn on_train_start(&mut self, _trainer: &TrainerState, _model: &dyn PrototypeModel<B>) {
        if self.state != CallbackState::Armed {
            warn!("viz: on_train_start ignored in state {:?}", self.state);
            return;
        }
        let (width, height) = self.config.canvas_size();
        let surface = RenderSurface::new(width, height);
        let (width, height) = surface.dimensions();
        self.surface = Some(surface);

        if self.config.export.captures_frames() {
            match FrameSequence::new(width, height) {
                Ok(frames) => self.frames = Some(frames),
                Err(err) => warn!("viz: frame capture disabled: {err}"),
            }
        } else if self.config.export.make_mp4 {
            info!("viz: mp4 requested without frame capture; nothing will be encoded");
        }

        if let Err(err) = self.strategy.on_train_start(
            &self.samples,
            &self.config,
            &mut self.telemetry,
            &mut self.rng,
        ) {
            warn!("viz: start-up telemetry skipped: {err}");
        }
        self.state = CallbackState::Active;
    }

    fn on_epoch_start(
        &mut self,
        trainer: &TrainerState,
        model: &dyn PrototypeModel<B>,
        logs: &Logs,
    ) -> CycleOutcome {
        self.render_cycle(HookPoint::EpochStart, trainer, model, logs)
    }

    fn on_epoch_end(
        &mut self,
        trainer: &TrainerState,
        model: &dyn PrototypeModel<B>,
        logs: &Logs,
    ) -> CycleOutcome {
        self.render_cycle(HookPoint::EpochEnd, trainer, model, logs)
    }

    fn on_train_end(
        &mut self,
        _trainer: &TrainerState,
        _model: &dyn PrototypeModel<B>,
    ) -> TrainEndReport {
        let mut report = TrainEndReport::default();
        if self.state != CallbackState::Active {
            self.state = CallbackState::Closed;
            return report;
        }

        let export = &self.config.export;
        if export.make_gif {
            match gif_from_dir(&export.save_dir, &export.prefix, export.fps) {
                Ok(Some(path)) => report.artifacts.push(path),
                Ok(None) => {}
                Err(err) => {
                    warn!("viz: gif not written: {err}");
                    report.failures.push(err);
                }
            }
        }

        if let Some(frames) = self.frames.take() {
            match frames.finish(&AnimationRequest::from_export(export)) {
                Ok(Some(path)) => report.artifacts.push(path),
                Ok(None) => {}
                Err(err) => {
                    warn!("viz: mp4 not written: {err}");
                    report.failures.push(err);
                }
            }
        }

        self.viewer.close();
        self.surface = None;
        self.state = CallbackState::Closed;
        info!(
            "viz: closed after {} rendered cycle(s), {} artifact(s)",
            self.rendered.len(),
            report.artifacts.len()
        );
        report
    }
}
