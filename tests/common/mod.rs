#![allow(dead_code)]

use burn::tensor::backend::Backend as BackendTrait;
use burn::tensor::{Int, Tensor, TensorData};
use burn_ndarray::NdArray;
use burn_proto_viz::{PrototypeModel, VisualizationConfig};
use ndarray::{Array1, Array2};
use std::path::Path;

pub type Backend = NdArray<f32>;

pub fn device() -> <Backend as BackendTrait>::Device {
    Default::default()
}

/// Two well separated blobs: label 0 near the origin, label 1 near (4, 4).
pub fn two_blobs() -> (Array2<f32>, Array1<i64>) {
    let offsets = [(-0.5, -0.3), (0.2, 0.4), (0.4, -0.2), (-0.1, 0.1), (0.3, 0.3)];
    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for (label, center) in [(0_i64, 0.0_f32), (1, 4.0)] {
        for (dx, dy) in offsets {
            rows.extend([center + dx, center + dy]);
            labels.push(label);
        }
    }
    let features = Array2::from_shape_vec((labels.len(), 2), rows).expect("blob shape");
    (features, Array1::from(labels))
}

/// Small, quiet canvas writing into `dir`.
pub fn quiet_config(dir: &Path) -> VisualizationConfig {
    let mut config = VisualizationConfig {
        show: false,
        figsize: (3.0, 2.0),
        resolution: 16,
        seed: Some(7),
        ..VisualizationConfig::default()
    };
    config.export.save_dir = dir.to_path_buf();
    config.export.verbose = false;
    config
}

/// Nearest-prototype classifier with optional extras for the richer variants.
pub struct NearestPrototype {
    pub prototypes: Vec<[f32; 2]>,
    pub labels: Vec<i64>,
    pub topology: Option<Vec<f32>>,
    pub components: Option<([usize; 4], Vec<f32>)>,
}

impl NearestPrototype {
    pub fn new(prototypes: Vec<[f32; 2]>, labels: Vec<i64>) -> Self {
        Self {
            prototypes,
            labels,
            topology: None,
            components: None,
        }
    }

    pub fn blobs() -> Self {
        Self::new(vec![[0.0, 0.0], [4.0, 4.0]], vec![0, 1])
    }

    pub fn with_topology(mut self, adjacency: Vec<f32>) -> Self {
        self.topology = Some(adjacency);
        self
    }

    pub fn with_components(mut self, shape: [usize; 4], values: Vec<f32>) -> Self {
        self.components = Some((shape, values));
        self
    }

    fn nearest(&self, x: f32, y: f32) -> i64 {
        let mut best = (f32::INFINITY, 0_i64);
        for (proto, label) in self.prototypes.iter().zip(&self.labels) {
            let distance = (proto[0] - x).powi(2) + (proto[1] - y).powi(2);
            if distance < best.0 {
                best = (distance, *label);
            }
        }
        best.1
    }
}

impl PrototypeModel<Backend> for NearestPrototype {
    fn prototypes(&self) -> Tensor<Backend, 2> {
        let flat: Vec<f32> = self.prototypes.iter().flatten().copied().collect();
        Tensor::from_data(TensorData::new(flat, [self.prototypes.len(), 2]), &device())
    }

    fn prototype_labels(&self) -> Option<Tensor<Backend, 1, Int>> {
        Some(Tensor::from_data(
            TensorData::new(self.labels.clone(), [self.labels.len()]),
            &device(),
        ))
    }

    fn predict(&self, inputs: Tensor<Backend, 2>) -> Tensor<Backend, 1, Int> {
        let [rows, cols] = inputs.dims();
        let values = inputs
            .into_data()
            .convert::<f32>()
            .into_vec::<f32>()
            .expect("inputs as f32");
        let predictions: Vec<i64> = values
            .chunks(cols)
            .map(|row| self.nearest(row[0], row[1]))
            .collect();
        Tensor::from_data(TensorData::new(predictions, [rows]), &device())
    }

    fn topology(&self) -> Option<Tensor<Backend, 2>> {
        let adjacency = self.topology.clone()?;
        let n = (adjacency.len() as f64).sqrt() as usize;
        Some(Tensor::from_data(TensorData::new(adjacency, [n, n]), &device()))
    }

    fn components(&self) -> Option<Tensor<Backend, 4>> {
        let (shape, values) = self.components.clone()?;
        Some(Tensor::from_data(TensorData::new(values, shape), &device()))
    }

    fn map_representation(&self, inputs: Tensor<Backend, 2>) -> Option<Tensor<Backend, 2>> {
        Some(inputs.mul_scalar(0.5))
    }
}
