mod common;

use burn::data::dataset::InMemDataset;
use burn::tensor::{Int, Tensor, TensorData};
use burn_proto_viz::{
    LabeledSample, SampleBatch, SampleSource, Variant, VisualizationCallback, VizError, ingest,
};
use common::{Backend, device, quiet_config, two_blobs};
use ndarray::{Array1, ArrayD, Axis, IxDyn, s};
use tempfile::tempdir;

#[test]
fn accepted_sources_ingest_identically() {
    let (features, labels) = two_blobs();

    let pair = ingest(SampleSource::Pair((features.clone(), labels.clone())), true)
        .expect("pair");

    let halves = vec![
        (
            features.slice(s![0..4, ..]).to_owned(),
            labels.slice(s![0..4]).to_owned(),
        ),
        (
            features.slice(s![4.., ..]).to_owned(),
            labels.slice(s![4..]).to_owned(),
        ),
    ];
    let batched = ingest(SampleSource::batches(halves), true).expect("batches");

    let items: Vec<LabeledSample> = features
        .rows()
        .into_iter()
        .zip(labels.iter())
        .map(|(row, label)| LabeledSample {
            features: row.to_owned().into_dyn(),
            label: *label,
        })
        .collect();
    let collected = ingest(SampleSource::collection(InMemDataset::new(items)), true)
        .expect("collection");

    assert_eq!(pair.len(), 10);
    assert_eq!(pair, batched);
    assert_eq!(pair, collected);
    assert_eq!(pair.points2d().expect("points").dim(), (10, 2));
}

#[test]
fn borrowed_batch_streams_are_drained() {
    let (features, labels) = two_blobs();
    let expected = ingest(SampleSource::Pair((features.clone(), labels.clone())), true)
        .expect("pair");

    let batches: Vec<SampleBatch> = features
        .axis_chunks_iter(Axis(0), 3)
        .zip(labels.axis_chunks_iter(Axis(0), 3))
        .map(|(rows, labels)| SampleBatch {
            features: rows.to_owned().into_dyn(),
            labels: labels.to_owned(),
        })
        .collect();
    let cloned = ingest(SampleSource::batches(batches.iter().cloned()), true)
        .expect("cloned batches");
    assert_eq!(cloned, expected);

    let chunked = features
        .axis_chunks_iter(Axis(0), 4)
        .zip(labels.axis_chunks_iter(Axis(0), 4))
        .map(|(rows, labels)| (rows.to_owned(), labels.to_owned()));
    let streamed = ingest(SampleSource::batches(chunked), true).expect("chunked batches");
    assert_eq!(streamed, expected);
    assert_eq!(batches.len(), 4);
}

#[test]
fn tensor_pairs_are_copied_to_host() {
    let (features, labels) = two_blobs();
    let flat: Vec<f32> = features.iter().copied().collect();
    let tensors = (
        Tensor::<Backend, 2>::from_data(TensorData::new(flat, [10, 2]), &device()),
        Tensor::<Backend, 1, Int>::from_data(TensorData::new(labels.to_vec(), [10]), &device()),
    );

    let from_tensors = ingest(SampleSource::Pair(tensors), true).expect("tensor pair");
    let from_arrays = ingest(SampleSource::Pair((features, labels)), true).expect("array pair");
    assert_eq!(from_tensors, from_arrays);
}

#[test]
fn image_samples_flatten_but_keep_their_shape() {
    let features = ArrayD::from_shape_fn(IxDyn(&[6, 1, 3, 3]), |index| index[2] as f32);
    let labels = Array1::from(vec![0_i64, 1, 0, 1, 0, 1]);
    let samples = ingest(SampleSource::Pair(SampleBatch { features, labels }), true)
        .expect("images");

    assert_eq!(samples.features().shape(), &[6, 9]);
    assert_eq!(samples.sample_shape(), &[1, 3, 3]);
    assert_eq!(samples.images().expect("images").dim(), (6, 1, 3, 3));
}

#[test]
fn mismatched_labels_are_rejected_at_construction() {
    let dir = tempdir().expect("tempdir");
    let (features, _) = two_blobs();
    let labels = Array1::from(vec![0_i64, 1, 0]);
    let result = VisualizationCallback::<Backend>::new(
        quiet_config(dir.path()),
        SampleSource::Pair((features, labels)),
        Variant::DirectSpace,
    );
    assert!(matches!(result, Err(VizError::InvalidInputKind(_))));
}

#[test]
fn empty_batch_streams_are_rejected() {
    let batches: Vec<SampleBatch> = Vec::new();
    let result = ingest(SampleSource::batches(batches), true);
    assert!(matches!(result, Err(VizError::InvalidInputKind(_))));
}
