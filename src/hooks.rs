use std::collections::BTreeMap;
use std::path::PathBuf;

use burn::tensor::backend::Backend;

use crate::error::VizError;
use crate::model::PrototypeModel;

/// Metrics reported by the training loop, e.g. `loss`, `val_acc`.
pub type Logs = BTreeMap<String, f64>;

/// Trainer progress as seen by a callback. Epochs are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainerState {
    pub current_epoch: usize,
    pub max_epochs: usize,
}

impl TrainerState {
    pub fn new(current_epoch: usize, max_epochs: usize) -> Self {
        Self {
            current_epoch,
            max_epochs,
        }
    }

    pub fn is_last_epoch(&self) -> bool {
        self.current_epoch + 1 == self.max_epochs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Callback not yet started or already closed.
    Inactive,
    /// Rendering is bound to the other epoch hook.
    OtherHook,
    /// Epoch is not a multiple of the render interval.
    Interval,
    /// Only the final epoch renders.
    NotLastEpoch,
}

#[derive(Debug)]
pub enum CycleOutcome {
    Rendered,
    Skipped(SkipReason),
    /// The cycle failed; training carries on and the next cycle retries.
    Failed(VizError),
}

impl CycleOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, CycleOutcome::Rendered)
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            CycleOutcome::Skipped(reason) => Some(*reason),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&VizError> {
        match self {
            CycleOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// What `on_train_end` produced.
#[derive(Debug, Default)]
pub struct TrainEndReport {
    pub artifacts: Vec<PathBuf>,
    pub failures: Vec<VizError>,
}

/// Hooks a training loop calls into. Implementations never abort training:
/// problems surface as outcomes and log lines.
pub trait TrainingCallback<B: Backend> {
    fn on_train_start(&mut self, trainer: &TrainerState, model: &dyn PrototypeModel<B>);

    fn on_epoch_start(
        &mut self,
        trainer: &TrainerState,
        model: &dyn PrototypeModel<B>,
        logs: &Logs,
    ) -> CycleOutcome;

    fn on_epoch_end(
        &mut self,
        trainer: &TrainerState,
        model: &dyn PrototypeModel<B>,
        logs: &Logs,
    ) -> CycleOutcome;

    fn on_train_end(&mut self, trainer: &TrainerState, model: &dyn PrototypeModel<B>)
    -> TrainEndReport;
}
