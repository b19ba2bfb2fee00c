use std::hint::black_box;

use burn::tensor::{Int, Tensor, TensorData};
use burn_ndarray::NdArray;
use burn_proto_viz::viz::{RenderContext, RenderSurface, strategy_for};
use burn_proto_viz::{
    PrototypeModel, SampleSource, Variant, VisualizationConfig, ingest, mesh2d,
};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use ndarray::{Array1, Array2};

type Backend = NdArray<f32>;

#[derive(Clone, Copy)]
struct RenderBenchConfig {
    name: &'static str,
    samples: usize,
    resolution: usize,
}

const RENDER_CONFIGS: &[RenderBenchConfig] = &[
    RenderBenchConfig {
        name: "n200_r50",
        samples: 200,
        resolution: 50,
    },
    RenderBenchConfig {
        name: "n1000_r100",
        samples: 1000,
        resolution: 100,
    },
    RenderBenchConfig {
        name: "n1000_r200",
        samples: 1000,
        resolution: 200,
    },
];

/// Fixed nearest-prototype classifier on a ring of four prototypes.
struct Ring {
    prototypes: [[f32; 2]; 4],
}

impl PrototypeModel<Backend> for Ring {
    fn prototypes(&self) -> Tensor<Backend, 2> {
        let flat: Vec<f32> = self.prototypes.iter().flatten().copied().collect();
        Tensor::from_data(TensorData::new(flat, [4, 2]), &Default::default())
    }

    fn prototype_labels(&self) -> Option<Tensor<Backend, 1, Int>> {
        Some(Tensor::from_data(
            TensorData::new(vec![0_i64, 1, 2, 3], [4]),
            &Default::default(),
        ))
    }

    fn predict(&self, inputs: Tensor<Backend, 2>) -> Tensor<Backend, 1, Int> {
        let [rows, _] = inputs.dims();
        let values = inputs
            .into_data()
            .convert::<f32>()
            .into_vec::<f32>()
            .expect("inputs as f32");
        let labels: Vec<i64> = values
            .chunks(2)
            .map(|point| {
                let mut best = (f32::INFINITY, 0_i64);
                for (label, proto) in self.prototypes.iter().enumerate() {
                    let d = (proto[0] - point[0]).powi(2) + (proto[1] - point[1]).powi(2);
                    if d < best.0 {
                        best = (d, label as i64);
                    }
                }
                best.1
            })
            .collect();
        Tensor::from_data(TensorData::new(labels, [rows]), &Default::default())
    }
}

fn ring_data(samples: usize) -> (Array2<f32>, Array1<i64>) {
    let features = Array2::from_shape_fn((samples, 2), |(i, c)| {
        let angle = i as f32 * 0.37;
        let radius = 1.0 + (i % 7) as f32 * 0.1;
        if c == 0 { radius * angle.cos() } else { radius * angle.sin() }
    });
    let labels = Array1::from_iter((0..samples).map(|i| (i % 4) as i64));
    (features, labels)
}

fn mesh_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("proto_viz_mesh");
    for cfg in RENDER_CONFIGS {
        let (features, _) = ring_data(cfg.samples);
        let cloud = features.mapv(f64::from);
        group.throughput(Throughput::Elements((cfg.resolution * cfg.resolution) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(cfg.name), cfg, |b, cfg| {
            b.iter(|| {
                let mesh = mesh2d(cloud.view(), 0.1, cfg.resolution, usize::MAX).expect("mesh");
                black_box(mesh);
            });
        });
    }
    group.finish();
}

fn render_bench(c: &mut Criterion) {
    let model = Ring {
        prototypes: [[1.0, 0.0], [0.0, 1.0], [-1.0, 0.0], [0.0, -1.0]],
    };
    let mut group = c.benchmark_group("proto_viz_render/direct_space");

    for cfg in RENDER_CONFIGS {
        let config = VisualizationConfig {
            show: false,
            resolution: cfg.resolution,
            ..VisualizationConfig::default()
        };
        let samples = ingest(SampleSource::Pair(ring_data(cfg.samples)), true)
            .expect("ingest ring data");
        let strategy = strategy_for::<Backend>(Variant::DirectSpace, &config);
        let (width, height) = config.canvas_size();
        let mut surface = RenderSurface::new(width, height);

        group.throughput(Throughput::Elements(cfg.samples as u64));
        group.bench_with_input(BenchmarkId::from_parameter(cfg.name), cfg, |b, _| {
            b.iter(|| {
                surface.begin_cycle(false);
                let mut ctx = RenderContext {
                    surface: &mut surface,
                    config: &config,
                    samples: &samples,
                    epoch: 0,
                };
                let artifacts = strategy.render(&mut ctx, &model).expect("render");
                black_box(artifacts);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, mesh_bench, render_bench);
criterion_main!(benches);
