use std::path::PathBuf;

use anyhow::{Result, anyhow};
use burn::tensor::{Int, Tensor, TensorData};
use burn_ndarray::NdArray;
use burn_proto_viz::{
    Logs, PrototypeModel, SampleSource, TrainerState, TrainingCallback, Variant,
    VisualizationCallback, VisualizationConfig, load_visualization_config,
};
use clap::Parser;
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

type Backend = NdArray<f32>;

#[derive(Parser, Debug)]
#[command(author, version, about = "Train a toy LVQ1 model and watch its decision regions")]
struct Cli {
    /// Visualization config files, later files override earlier ones.
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    config: Vec<PathBuf>,
    /// direct_space, representation_mapped, component_boundary or topology_graph.
    #[arg(long, default_value = "direct_space")]
    variant: Variant,
    #[arg(long, default_value_t = 30)]
    epochs: usize,
    #[arg(long, default_value_t = 2)]
    prototypes_per_class: usize,
    #[arg(long, default_value_t = 0.05)]
    learning_rate: f32,
    /// Write outputs here instead of the configured directory.
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,
    /// Do not refresh the live view.
    #[arg(long)]
    headless: bool,
    #[arg(long, default_value_t = 1337)]
    seed: u64,
}

pub fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();
    let args = Cli::parse();

    let mut config = if args.config.is_empty() {
        VisualizationConfig::default()
    } else {
        load_visualization_config(&args.config)?
    };
    if let Some(out) = &args.out {
        config.export.save_dir = out.clone();
    }
    if args.headless {
        config.show = false;
    }
    config.seed.get_or_insert(args.seed);

    if args.variant == Variant::ImageGrid {
        return Err(anyhow!(
            "the demo trains on 2-D points; {} needs image components",
            args.variant
        ));
    }

    let mut rng = StdRng::seed_from_u64(args.seed);
    let (features, labels) = three_blobs(&mut rng, 60)?;
    let mut model = Lvq1::init(&features, &labels, args.prototypes_per_class)?;

    let mut callback = VisualizationCallback::<Backend>::new(
        config,
        SampleSource::Pair((features.clone(), labels.clone())),
        args.variant,
    )?;

    let start = TrainerState::new(0, args.epochs);
    callback.on_train_start(&start, &model);
    for epoch in 0..args.epochs {
        let trainer = TrainerState::new(epoch, args.epochs);
        let mut logs = Logs::new();
        callback.on_epoch_start(&trainer, &model, &logs);

        let errors = model.epoch(&features, &labels, args.learning_rate, &mut rng);
        let error_rate = errors as f64 / labels.len() as f64;
        logs.insert("loss".into(), error_rate);
        logs.insert("acc".into(), 1.0 - error_rate);

        callback.on_epoch_end(&trainer, &model, &logs);
    }
    let report = callback.on_train_end(&TrainerState::new(args.epochs, args.epochs), &model);

    for artifact in &report.artifacts {
        info!("wrote {}", artifact.display());
    }
    if !report.failures.is_empty() {
        return Err(anyhow!(
            "{} export(s) failed; first: {}",
            report.failures.len(),
            report.failures[0]
        ));
    }
    Ok(())
}

fn three_blobs(rng: &mut StdRng, per_class: usize) -> Result<(Array2<f32>, Array1<i64>)> {
    let centers = [(0.0_f32, 0.0_f32), (3.0, 0.5), (1.5, 2.8)];
    let mut rows = Vec::with_capacity(per_class * centers.len() * 2);
    let mut labels = Vec::with_capacity(per_class * centers.len());
    for (label, (cx, cy)) in centers.iter().enumerate() {
        for _ in 0..per_class {
            rows.push(cx + rng.gen_range(-0.9..0.9));
            rows.push(cy + rng.gen_range(-0.9..0.9));
            labels.push(label as i64);
        }
    }
    let features = Array2::from_shape_vec((labels.len(), 2), rows)?;
    Ok((features, Array1::from(labels)))
}

/// Learning vector quantization with the classic attract/repel update.
struct Lvq1 {
    prototypes: Array2<f32>,
    labels: Vec<i64>,
}

impl Lvq1 {
    /// Seed prototypes on the first samples of each class.
    fn init(features: &Array2<f32>, labels: &Array1<i64>, per_class: usize) -> Result<Self> {
        let mut classes: Vec<i64> = labels.to_vec();
        classes.sort_unstable();
        classes.dedup();

        let mut rows = Vec::new();
        let mut proto_labels = Vec::new();
        for class in classes {
            let members = labels
                .iter()
                .enumerate()
                .filter(|(_, label)| **label == class)
                .take(per_class.max(1));
            for (index, _) in members {
                rows.extend(features.row(index).iter().copied());
                proto_labels.push(class);
            }
        }
        let prototypes = Array2::from_shape_vec((proto_labels.len(), features.ncols()), rows)?;
        Ok(Self {
            prototypes,
            labels: proto_labels,
        })
    }

    fn nearest(&self, point: ArrayView1<'_, f32>) -> usize {
        let mut best = (f32::INFINITY, 0);
        for (index, proto) in self.prototypes.rows().into_iter().enumerate() {
            let distance: f32 = proto
                .iter()
                .zip(point.iter())
                .map(|(p, x)| (p - x).powi(2))
                .sum();
            if distance < best.0 {
                best = (distance, index);
            }
        }
        best.1
    }

    /// One shuffled pass; returns the number of misclassified samples.
    fn epoch(
        &mut self,
        features: &Array2<f32>,
        labels: &Array1<i64>,
        learning_rate: f32,
        rng: &mut StdRng,
    ) -> usize {
        let mut order: Vec<usize> = (0..labels.len()).collect();
        for i in (1..order.len()).rev() {
            order.swap(i, rng.gen_range(0..=i));
        }
        let mut errors = 0;
        for index in order {
            let point = features.row(index);
            let winner = self.nearest(point);
            let sign = if self.labels[winner] == labels[index] {
                1.0
            } else {
                errors += 1;
                -1.0
            };
            let mut proto = self.prototypes.row_mut(winner);
            proto.zip_mut_with(&point, |p, x| *p += sign * learning_rate * (*x - *p));
        }
        errors
    }

    /// Chain prototypes of the same class.
    fn chain(&self) -> Vec<f32> {
        let n = self.labels.len();
        let mut adjacency = vec![0.0; n * n];
        for i in 1..n {
            if self.labels[i] == self.labels[i - 1] {
                adjacency[(i - 1) * n + i] = 1.0;
                adjacency[i * n + i - 1] = 1.0;
            }
        }
        adjacency
    }

    fn predict_rows(&self, values: &[f32], cols: usize) -> Vec<i64> {
        values
            .chunks(cols)
            .map(|row| self.labels[self.nearest(ArrayView1::from(row))])
            .collect()
    }
}

impl PrototypeModel<Backend> for Lvq1 {
    fn prototypes(&self) -> Tensor<Backend, 2> {
        let (rows, cols) = self.prototypes.dim();
        let values: Vec<f32> = self.prototypes.iter().copied().collect();
        Tensor::from_data(TensorData::new(values, [rows, cols]), &Default::default())
    }

    fn prototype_labels(&self) -> Option<Tensor<Backend, 1, Int>> {
        Some(Tensor::from_data(
            TensorData::new(self.labels.clone(), [self.labels.len()]),
            &Default::default(),
        ))
    }

    fn predict(&self, inputs: Tensor<Backend, 2>) -> Tensor<Backend, 1, Int> {
        let [rows, cols] = inputs.dims();
        let values = inputs
            .into_data()
            .convert::<f32>()
            .into_vec::<f32>()
            .unwrap_or_default();
        let predictions = if values.len() == rows * cols {
            self.predict_rows(&values, cols)
        } else {
            vec![0; rows]
        };
        Tensor::from_data(TensorData::new(predictions, [rows]), &Default::default())
    }

    fn topology(&self) -> Option<Tensor<Backend, 2>> {
        let n = self.labels.len();
        Some(Tensor::from_data(
            TensorData::new(self.chain(), [n, n]),
            &Default::default(),
        ))
    }

    fn map_representation(&self, inputs: Tensor<Backend, 2>) -> Option<Tensor<Backend, 2>> {
        Some(inputs.mul_scalar(0.5).add_scalar(1.0))
    }

    fn predict_latent(&self, latent: Tensor<Backend, 2>, _map_protos: bool) -> Tensor<Backend, 1, Int> {
        self.predict(latent.sub_scalar(1.0).mul_scalar(2.0))
    }
}
