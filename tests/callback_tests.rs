mod common;

use burn_proto_viz::{
    CallbackState, CycleOutcome, HookPoint, Logs, MemorySink, PrototypeModel, SampleBatch,
    SampleSource, SkipReason, TrainEndReport, TrainerState, TrainingCallback, Variant,
    VisualizationCallback, VizError,
};
use burn_proto_viz::viz::TelemetryKind;
use common::{Backend, NearestPrototype, quiet_config, two_blobs};
use ndarray::{Array1, Array2};
use tempfile::tempdir;

fn blob_callback(
    config: burn_proto_viz::VisualizationConfig,
    variant: Variant,
) -> VisualizationCallback<Backend> {
    VisualizationCallback::<Backend>::new(config, SampleSource::Pair(two_blobs()), variant)
        .expect("callback")
}

/// Drive a full fit of `max_epochs`, returning the end-of-epoch outcomes.
fn fit(
    callback: &mut VisualizationCallback<Backend>,
    model: &dyn PrototypeModel<Backend>,
    max_epochs: usize,
) -> (Vec<CycleOutcome>, TrainEndReport) {
    let logs = Logs::new();
    callback.on_train_start(&TrainerState::new(0, max_epochs), model);
    let mut outcomes = Vec::with_capacity(max_epochs);
    for epoch in 0..max_epochs {
        let trainer = TrainerState::new(epoch, max_epochs);
        callback.on_epoch_start(&trainer, model, &logs);
        outcomes.push(callback.on_epoch_end(&trainer, model, &logs));
    }
    let report = callback.on_train_end(&TrainerState::new(max_epochs, max_epochs), model);
    (outcomes, report)
}

#[test]
fn interval_renders_every_fifth_epoch_and_names_stills() {
    let dir = tempdir().expect("tempdir");
    let mut config = quiet_config(dir.path());
    config.interval = 5;
    config.export.save = true;
    config.export.prefix = "glvq_".into();

    let mut callback = blob_callback(config, Variant::DirectSpace);
    let (outcomes, report) = fit(&mut callback, &NearestPrototype::blobs(), 11);

    assert_eq!(callback.rendered_epochs(), &[0, 5, 10]);
    assert_eq!(outcomes[1].skip_reason(), Some(SkipReason::Interval));
    for epoch in [0, 5, 10] {
        assert!(dir.path().join(format!("glvq_{epoch:05}.png")).is_file());
    }
    assert!(!dir.path().join("glvq_00001.png").exists());
    assert!(report.failures.is_empty());
}

#[test]
fn last_only_renders_the_final_epoch() {
    let dir = tempdir().expect("tempdir");
    let mut config = quiet_config(dir.path());
    config.show_last_only = true;

    let mut callback = blob_callback(config, Variant::DirectSpace);
    fit(&mut callback, &NearestPrototype::blobs(), 20);
    assert_eq!(callback.rendered_epochs(), &[19]);
}

#[test]
fn interval_and_last_only_combine() {
    let dir = tempdir().expect("tempdir");
    let mut config = quiet_config(dir.path());
    config.interval = 3;
    config.show_last_only = true;

    let mut callback = blob_callback(config, Variant::DirectSpace);
    fit(&mut callback, &NearestPrototype::blobs(), 10);
    assert_eq!(callback.rendered_epochs(), &[9]);
}

#[test]
fn epoch_start_hook_ignores_epoch_end() {
    let dir = tempdir().expect("tempdir");
    let mut config = quiet_config(dir.path());
    config.hook = HookPoint::EpochStart;

    let mut callback = blob_callback(config, Variant::DirectSpace);
    let (outcomes, _) = fit(&mut callback, &NearestPrototype::blobs(), 3);
    assert!(
        outcomes
            .iter()
            .all(|outcome| outcome.skip_reason() == Some(SkipReason::OtherHook))
    );
    assert_eq!(callback.rendered_epochs(), &[0, 1, 2]);
}

#[test]
fn lifecycle_moves_from_armed_to_closed() {
    let dir = tempdir().expect("tempdir");
    let model = NearestPrototype::blobs();
    let logs = Logs::new();
    let trainer = TrainerState::new(0, 2);
    let mut callback = blob_callback(quiet_config(dir.path()), Variant::DirectSpace);

    assert_eq!(callback.state(), CallbackState::Armed);
    let early = callback.on_epoch_end(&trainer, &model, &logs);
    assert_eq!(early.skip_reason(), Some(SkipReason::Inactive));
    assert!(callback.surface().is_none());

    callback.on_train_start(&trainer, &model);
    assert_eq!(callback.state(), CallbackState::Active);
    assert_eq!(callback.surface().map(|s| s.dimensions()), Some((300, 200)));
    assert!(callback.on_epoch_end(&trainer, &model, &logs).is_rendered());

    callback.on_train_end(&trainer, &model);
    assert_eq!(callback.state(), CallbackState::Closed);
    assert!(callback.surface().is_none());
    let late = callback.on_epoch_end(&TrainerState::new(1, 2), &model, &logs);
    assert_eq!(late.skip_reason(), Some(SkipReason::Inactive));
    assert_eq!(callback.rendered_epochs(), &[0]);
}

#[test]
fn failed_cycle_keeps_training_alive() {
    let dir = tempdir().expect("tempdir");
    let features = Array2::from_elem((4, 2), 1.0_f32);
    let labels = Array1::from(vec![0_i64, 0, 1, 1]);
    let mut callback = VisualizationCallback::<Backend>::new(
        quiet_config(dir.path()),
        SampleSource::Pair((features, labels)),
        Variant::DirectSpace,
    )
    .expect("callback");

    let collapsed = NearestPrototype::new(vec![[1.0, 1.0], [1.0, 1.0]], vec![0, 1]);
    let spread = NearestPrototype::new(vec![[0.0, 0.0], [3.0, 2.0]], vec![0, 1]);
    let logs = Logs::new();

    callback.on_train_start(&TrainerState::new(0, 2), &collapsed);
    let failed = callback.on_epoch_end(&TrainerState::new(0, 2), &collapsed, &logs);
    assert!(matches!(
        failed.error(),
        Some(VizError::DegenerateRange { axis: 'x', .. })
    ));
    assert_eq!(callback.state(), CallbackState::Active);

    let recovered = callback.on_epoch_end(&TrainerState::new(1, 2), &spread, &logs);
    assert!(recovered.is_rendered());
    assert_eq!(callback.rendered_epochs(), &[1]);
}

#[test]
fn figures_are_forwarded_per_rendered_epoch() {
    let dir = tempdir().expect("tempdir");
    let mut config = quiet_config(dir.path());
    config.tensorboard = true;
    config.title = "GLVQ".into();
    let sink = MemorySink::new();

    let mut callback =
        blob_callback(config, Variant::DirectSpace).with_telemetry(Box::new(sink.clone()));
    fit(&mut callback, &NearestPrototype::blobs(), 2);

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert!(
        events
            .iter()
            .all(|event| event.kind == TelemetryKind::Figure && event.tag == "GLVQ")
    );
    assert_eq!(events[1].step, Some(1));
    assert_eq!((events[0].width, events[0].height), (300, 200));
    assert_eq!(callback.telemetry_failures(), 0);
}

#[test]
fn forwarding_without_sink_is_counted_not_fatal() {
    let dir = tempdir().expect("tempdir");
    let mut config = quiet_config(dir.path());
    config.tensorboard = true;

    let mut callback = blob_callback(config, Variant::DirectSpace);
    let (outcomes, _) = fit(&mut callback, &NearestPrototype::blobs(), 2);
    assert!(outcomes.iter().all(CycleOutcome::is_rendered));
    assert_eq!(callback.telemetry_failures(), 2);
}

#[test]
fn forwarding_off_ignores_an_attached_sink() {
    let dir = tempdir().expect("tempdir");
    let sink = MemorySink::new();
    let mut callback = blob_callback(quiet_config(dir.path()), Variant::DirectSpace)
        .with_telemetry(Box::new(sink.clone()));
    let (outcomes, _) = fit(&mut callback, &NearestPrototype::blobs(), 2);

    assert!(outcomes.iter().all(CycleOutcome::is_rendered));
    assert!(sink.events().is_empty());
    assert_eq!(callback.telemetry_failures(), 0);
}

#[test]
fn every_plane_variant_renders() {
    let dir = tempdir().expect("tempdir");
    let chain = vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
    let model = NearestPrototype::new(vec![[0.0, 0.0], [2.0, 2.0], [4.0, 4.0]], vec![0, 1, 1])
        .with_topology(chain);

    for variant in [
        Variant::DirectSpace,
        Variant::RepresentationMapped,
        Variant::ComponentBoundary,
        Variant::TopologyGraph,
    ] {
        let mut callback = blob_callback(quiet_config(dir.path()), variant);
        let (outcomes, _) = fit(&mut callback, &model, 1);
        assert!(outcomes[0].is_rendered(), "{variant} did not render: {:?}", outcomes[0]);
    }
}

#[test]
fn topology_must_match_prototype_count() {
    let dir = tempdir().expect("tempdir");
    let model = NearestPrototype::blobs().with_topology(vec![0.0; 9]);
    let mut callback = blob_callback(quiet_config(dir.path()), Variant::TopologyGraph);
    let (outcomes, _) = fit(&mut callback, &model, 1);
    assert!(matches!(outcomes[0].error(), Some(VizError::Shape(_))));
}

#[test]
fn image_grid_forwards_components_and_startup_data() {
    let dir = tempdir().expect("tempdir");
    let mut config = quiet_config(dir.path());
    config.tensorboard = true;
    config.image_grid.random_data = 4;
    config.image_grid.add_embedding = true;
    config.image_grid.embedding_data = 6;
    let sink = MemorySink::new();

    let images = Array2::from_shape_fn((8, 16), |(i, j)| ((i + j) % 5) as f32 / 4.0)
        .into_shape_with_order((8, 1, 4, 4))
        .expect("image shape")
        .into_dyn();
    let labels = Array1::from_iter((0..8).map(|i| i % 2));
    let mut callback = VisualizationCallback::<Backend>::new(
        config,
        SampleSource::Pair(SampleBatch {
            features: images,
            labels,
        }),
        Variant::ImageGrid,
    )
    .expect("callback")
    .with_telemetry(Box::new(sink.clone()));

    let model = NearestPrototype::blobs().with_components([4, 1, 4, 4], vec![0.5; 64]);
    let (outcomes, _) = fit(&mut callback, &model, 2);
    assert!(outcomes.iter().all(CycleOutcome::is_rendered));

    let events = sink.events();
    let tags: Vec<&str> = events.iter().map(|event| event.tag.as_str()).collect();
    assert_eq!(
        tags,
        vec![
            "Data",
            "Data Embedding",
            "Prototype Visualization",
            "Components",
            "Prototype Visualization",
            "Components",
        ]
    );
    let embedding = &events[1];
    assert_eq!(embedding.kind, TelemetryKind::Embedding);
    assert_eq!((embedding.height, embedding.width), (6, 16));
    let components = &events[3];
    // 2 columns of 4px tiles with 2px padding.
    assert_eq!((components.width, components.height), (14, 14));
}

#[test]
fn gif_is_assembled_from_saved_stills() {
    let dir = tempdir().expect("tempdir");
    let mut config = quiet_config(dir.path());
    config.export.save = true;
    config.export.make_gif = true;

    let mut callback = blob_callback(config, Variant::DirectSpace);
    let (_, report) = fit(&mut callback, &NearestPrototype::blobs(), 3);

    let gif = dir.path().join("animation.gif");
    assert_eq!(report.artifacts, vec![gif.clone()]);
    assert!(gif.metadata().expect("gif metadata").len() > 0);
}

#[test]
fn mp4_without_frames_is_a_no_op() {
    let dir = tempdir().expect("tempdir");
    let mut config = quiet_config(dir.path());
    config.export.make_mp4 = true;
    config.hook = HookPoint::EpochStart;
    config.show_last_only = true;

    let mut callback = blob_callback(config, Variant::DirectSpace);
    let model = NearestPrototype::blobs();
    let logs = Logs::new();
    callback.on_train_start(&TrainerState::new(0, 3), &model);
    callback.on_epoch_start(&TrainerState::new(0, 3), &model, &logs);
    let report = callback.on_train_end(&TrainerState::new(3, 3), &model);

    assert_eq!(callback.captured_frames(), 0);
    assert!(report.artifacts.is_empty());
    assert!(report.failures.is_empty());
    assert!(!dir.path().join("animation.mp4").exists());
}

#[test]
fn missing_encoder_is_reported_at_train_end() {
    let dir = tempdir().expect("tempdir");
    let mut config = quiet_config(dir.path());
    config.export.make_mp4 = true;
    config.export.ffmpeg = Some(dir.path().join("no-such-ffmpeg"));

    let mut callback = blob_callback(config, Variant::DirectSpace);
    let model = NearestPrototype::blobs();
    let logs = Logs::new();
    callback.on_train_start(&TrainerState::new(0, 2), &model);
    for epoch in 0..2 {
        callback.on_epoch_end(&TrainerState::new(epoch, 2), &model, &logs);
    }
    assert_eq!(callback.captured_frames(), 2);

    let report = callback.on_train_end(&TrainerState::new(2, 2), &model);
    assert!(report.artifacts.is_empty());
    assert!(matches!(report.failures.as_slice(), [VizError::Export(_)]));
    assert_eq!(callback.state(), CallbackState::Closed);
}

#[test]
fn live_view_is_refreshed_when_shown() {
    let dir = tempdir().expect("tempdir");
    let mut config = quiet_config(dir.path());
    config.show = true;
    config.pause_time_ms = 0;
    config.export.prefix = "demo_".into();

    let mut callback = blob_callback(config, Variant::DirectSpace);
    fit(&mut callback, &NearestPrototype::blobs(), 2);

    assert!(dir.path().join("demo_live.png").is_file());
}
