use std::sync::Arc;

use burn::data::dataset::Dataset;
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};
use ndarray::{concatenate, stack, Array1, Array2, ArrayD, ArrayView, Axis, IxDyn};
use tracing::debug;

use crate::dataset::TrainingSamples;
use crate::error::{VizError, VizResult};

/// One item of an indexable sample collection.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSample {
    pub features: ArrayD<f32>,
    pub label: i64,
}

/// Host-side batch: features are `[N, ...]`, labels `[N]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBatch {
    pub features: ArrayD<f32>,
    pub labels: Array1<i64>,
}

pub trait IntoSampleBatch {
    fn into_sample_batch(self) -> VizResult<SampleBatch>;
}

impl IntoSampleBatch for SampleBatch {
    fn into_sample_batch(self) -> VizResult<SampleBatch> {
        Ok(self)
    }
}

impl IntoSampleBatch for (ArrayD<f32>, Array1<i64>) {
    fn into_sample_batch(self) -> VizResult<SampleBatch> {
        Ok(SampleBatch {
            features: self.0,
            labels: self.1,
        })
    }
}

impl IntoSampleBatch for (Array2<f32>, Array1<i64>) {
    fn into_sample_batch(self) -> VizResult<SampleBatch> {
        Ok(SampleBatch {
            features: self.0.into_dyn(),
            labels: self.1,
        })
    }
}

impl<B: Backend, const D: usize> IntoSampleBatch for (Tensor<B, D>, Tensor<B, 1, Int>) {
    fn into_sample_batch(self) -> VizResult<SampleBatch> {
        let (features, labels) = self;
        let dims = features.dims();
        let values = features
            .into_data()
            .convert::<f32>()
            .into_vec::<f32>()
            .map_err(|err| VizError::Tensor(format!("{err:?}")))?;
        let features = ArrayD::from_shape_vec(IxDyn(&dims), values)
            .map_err(|err| VizError::Tensor(err.to_string()))?;
        let labels = labels
            .into_data()
            .convert::<i64>()
            .into_vec::<i64>()
            .map_err(|err| VizError::Tensor(format!("{err:?}")))?;
        Ok(SampleBatch {
            features,
            labels: Array1::from(labels),
        })
    }
}

/// The accepted shapes of training data.
///
/// Batch streams may borrow (a data loader's `iter()`, `vec.iter().cloned()`);
/// `ingest` drains them before returning.
pub enum SampleSource<'a, T = SampleBatch> {
    /// A single features/labels pair.
    Pair(T),
    /// Batches drained once and concatenated.
    Batches(Box<dyn Iterator<Item = T> + 'a>),
    /// An indexable collection, stacked item by item.
    Collection(Arc<dyn Dataset<LabeledSample> + 'a>),
}

impl<'a, T> SampleSource<'a, T> {
    pub fn batches<I>(batches: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: 'a,
    {
        SampleSource::Batches(Box::new(batches.into_iter()))
    }
}

impl<'a> SampleSource<'a, SampleBatch> {
    pub fn collection<D>(dataset: D) -> Self
    where
        D: Dataset<LabeledSample> + 'a,
    {
        SampleSource::Collection(Arc::new(dataset))
    }
}

/// Normalize any accepted source into one host-side sample set.
pub fn ingest<T: IntoSampleBatch>(
    source: SampleSource<'_, T>,
    flatten: bool,
) -> VizResult<TrainingSamples> {
    let batch = match source {
        SampleSource::Pair(pair) => check_batch(pair.into_sample_batch()?, "pair")?,
        SampleSource::Batches(batches) => concat_batches(batches)?,
        SampleSource::Collection(dataset) => stack_collection(dataset.as_ref())?,
    };
    debug!(
        "viz: ingested {} samples with shape {:?}",
        batch.labels.len(),
        &batch.features.shape()[1..]
    );
    TrainingSamples::from_batch(batch, flatten)
}

fn check_batch(batch: SampleBatch, origin: &str) -> VizResult<SampleBatch> {
    let rank = batch.features.ndim();
    if rank < 2 {
        return Err(VizError::InvalidInputKind(format!(
            "{origin} features must be batched with rank >= 2, got rank {rank}"
        )));
    }
    let rows = batch.features.shape()[0];
    if rows != batch.labels.len() {
        return Err(VizError::InvalidInputKind(format!(
            "{origin} has {rows} feature rows but {} labels",
            batch.labels.len()
        )));
    }
    if rows == 0 {
        return Err(VizError::InvalidInputKind(format!("{origin} holds no samples")));
    }
    Ok(batch)
}

fn concat_batches<T: IntoSampleBatch>(
    batches: Box<dyn Iterator<Item = T> + '_>,
) -> VizResult<SampleBatch> {
    let mut collected: Vec<SampleBatch> = Vec::new();
    for (index, batch) in batches.enumerate() {
        let batch = check_batch(batch.into_sample_batch()?, &format!("batch {index}"))?;
        if let Some(first) = collected.first() {
            if first.features.shape()[1..] != batch.features.shape()[1..] {
                return Err(VizError::InvalidInputKind(format!(
                    "batch {index} has sample shape {:?}, expected {:?}",
                    &batch.features.shape()[1..],
                    &first.features.shape()[1..]
                )));
            }
        }
        collected.push(batch);
    }
    if collected.is_empty() {
        return Err(VizError::InvalidInputKind(
            "batch source yielded no batches".into(),
        ));
    }

    let feature_views: Vec<_> = collected.iter().map(|b| b.features.view()).collect();
    let label_views: Vec<_> = collected.iter().map(|b| b.labels.view()).collect();
    let features = concatenate(Axis(0), &feature_views)
        .map_err(|err| VizError::Shape(err.to_string()))?;
    let labels = concatenate(Axis(0), &label_views)
        .map_err(|err| VizError::Shape(err.to_string()))?;
    Ok(SampleBatch { features, labels })
}

fn stack_collection(dataset: &dyn Dataset<LabeledSample>) -> VizResult<SampleBatch> {
    let len = dataset.len();
    if len == 0 {
        return Err(VizError::InvalidInputKind("sample collection is empty".into()));
    }
    let mut items: Vec<LabeledSample> = Vec::with_capacity(len);
    for index in 0..len {
        let item = dataset.get(index).ok_or_else(|| {
            VizError::InvalidInputKind(format!("collection item {index} of {len} is missing"))
        })?;
        if let Some(first) = items.first() {
            if first.features.shape() != item.features.shape() {
                return Err(VizError::InvalidInputKind(format!(
                    "collection item {index} has shape {:?}, expected {:?}",
                    item.features.shape(),
                    first.features.shape()
                )));
            }
        }
        items.push(item);
    }

    let views: Vec<ArrayView<'_, f32, IxDyn>> = items.iter().map(|s| s.features.view()).collect();
    let features = stack(Axis(0), &views).map_err(|err| VizError::Shape(err.to_string()))?;
    let labels = items.iter().map(|s| s.label).collect::<Array1<i64>>();
    check_batch(SampleBatch { features, labels }, "collection")
}
