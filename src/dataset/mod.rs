mod source;

pub use source::{IntoSampleBatch, LabeledSample, SampleBatch, SampleSource, ingest};

use ndarray::{Array1, Array2, Array4, ArrayD, Axis, IxDyn, s};
use rand::Rng;
use rand::seq::index;

use crate::error::{VizError, VizResult};

/// Training data held host-side for the lifetime of a visualization callback.
///
/// Features are stored flattened to `[N, prod(sample_shape)]` when ingestion
/// was asked to flatten, otherwise in their original layout. The per-sample
/// shape is kept either way so image variants can unflatten rows.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSamples {
    features: ArrayD<f32>,
    labels: Array1<i64>,
    sample_shape: Vec<usize>,
}

impl TrainingSamples {
    pub(crate) fn from_batch(batch: SampleBatch, flatten: bool) -> VizResult<Self> {
        let SampleBatch { features, labels } = batch;
        let sample_shape = features.shape()[1..].to_vec();
        let features = if flatten && features.ndim() > 2 {
            let rows = features.shape()[0];
            let cols: usize = sample_shape.iter().product();
            let features = if features.is_standard_layout() {
                features
            } else {
                features.as_standard_layout().into_owned()
            };
            features
                .into_shape_with_order(IxDyn(&[rows, cols]))
                .map_err(|err| VizError::Shape(err.to_string()))?
        } else {
            features
        };
        Ok(Self {
            features,
            labels,
            sample_shape,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn features(&self) -> &ArrayD<f32> {
        &self.features
    }

    pub fn labels(&self) -> &Array1<i64> {
        &self.labels
    }

    pub fn sample_shape(&self) -> &[usize] {
        &self.sample_shape
    }

    pub fn feature_dim(&self) -> usize {
        self.sample_shape.iter().product()
    }

    /// Features as `[N, D]` regardless of how they are stored.
    pub fn flattened(&self) -> VizResult<Array2<f32>> {
        let rows = self.len();
        let standard = self.features.as_standard_layout();
        standard
            .to_shape((rows, self.feature_dim()))
            .map(|view| view.to_owned())
            .map_err(|err| VizError::Shape(err.to_string()))
    }

    /// The first two feature columns, as plotted by the 2-D variants.
    pub fn points2d(&self) -> VizResult<Array2<f64>> {
        let flat = self.flattened()?;
        if flat.ncols() < 2 {
            return Err(VizError::Shape(format!(
                "2-D plots need at least 2 feature columns, got {}",
                flat.ncols()
            )));
        }
        Ok(flat.slice(s![.., 0..2]).mapv(f64::from))
    }

    /// Samples as `[N, d0, d1, d2]` images.
    pub fn images(&self) -> VizResult<Array4<f32>> {
        let &[d0, d1, d2] = self.sample_shape.as_slice() else {
            return Err(VizError::Shape(format!(
                "image samples need a rank-3 sample shape, got {:?}",
                self.sample_shape
            )));
        };
        let rows = self.len();
        self.features
            .as_standard_layout()
            .to_shape((rows, d0, d1, d2))
            .map(|view| view.to_owned())
            .map_err(|err| VizError::Shape(err.to_string()))
    }

    pub fn select(&self, indices: &[usize]) -> TrainingSamples {
        TrainingSamples {
            features: self.features.select(Axis(0), indices),
            labels: self.labels.select(Axis(0), indices),
            sample_shape: self.sample_shape.clone(),
        }
    }

    /// Up to `amount` distinct samples drawn without replacement.
    pub fn random_subset<R: Rng + ?Sized>(&self, amount: usize, rng: &mut R) -> TrainingSamples {
        let amount = amount.min(self.len());
        let mut indices = index::sample(rng, self.len(), amount).into_vec();
        indices.sort_unstable();
        self.select(&indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array3, array};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn image_batch() -> SampleBatch {
        let features = Array3::from_shape_fn((4, 2, 3), |(n, h, w)| (n * 6 + h * 3 + w) as f32)
            .into_dyn();
        SampleBatch {
            features,
            labels: array![0, 1, 0, 1],
        }
    }

    #[test]
    fn flattening_keeps_sample_shape() {
        let samples = ingest(SampleSource::Pair(image_batch()), true).expect("ingest");
        assert_eq!(samples.features().shape(), &[4, 6]);
        assert_eq!(samples.sample_shape(), &[2, 3]);
        let flat = samples.flattened().expect("flat");
        assert_eq!(flat.row(1).to_vec(), vec![6.0, 7.0, 8.0, 9.0, 10.0, 11.0]);
        assert_eq!(samples.points2d().expect("points").row(3).to_vec(), vec![18.0, 19.0]);
    }

    #[test]
    fn unflattened_features_still_expose_rows() {
        let samples = ingest(SampleSource::Pair(image_batch()), false).expect("ingest");
        assert_eq!(samples.features().shape(), &[4, 2, 3]);
        assert_eq!(samples.flattened().expect("flat").dim(), (4, 6));
    }

    #[test]
    fn random_subset_is_distinct_and_bounded() {
        let samples = ingest(SampleSource::Pair(image_batch()), true).expect("ingest");
        let mut rng = StdRng::seed_from_u64(7);
        let subset = samples.random_subset(3, &mut rng);
        assert_eq!(subset.len(), 3);
        let mut firsts: Vec<i64> = subset
            .flattened()
            .expect("flat")
            .column(0)
            .iter()
            .map(|v| *v as i64)
            .collect();
        firsts.dedup();
        assert_eq!(firsts.len(), 3);
        assert_eq!(samples.random_subset(10, &mut rng).len(), 4);
    }

    #[test]
    fn images_require_rank_three_samples() {
        let samples = ingest(SampleSource::Pair(image_batch()), true).expect("ingest");
        assert!(matches!(samples.images(), Err(VizError::Shape(_))));
    }
}
