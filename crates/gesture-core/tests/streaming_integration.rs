//! End-to-end tests of the frame loop over the scripted backend.

use gesture_core::config::{EngineConfig, PipelinePreset};
use gesture_core::preprocessing::FramePipeline;
use gesture_core::streaming::{FrameOutcome, StreamingController};
use gesture_core::testing::{fixtures, MockPreprocessor, MockSession, PresentedEvent, RecordingPresenter};
use gesture_core::{GestureError, InferenceError};

#[test]
fn test_image_frames_through_jester_pipeline() {
    let config = EngineConfig::default();
    let session = MockSession::jester().with_logits(fixtures::logits_peaking_at(20));
    let pipeline = FramePipeline::from_config(&config.preprocessing);
    let mut controller = StreamingController::from_session(session, pipeline, &config).unwrap();

    let frames = (0..6).map(|i| fixtures::solid_frame(640, 480, [i * 40, 100, 200]));
    let mut presenter = RecordingPresenter::new();
    let summary = controller.run(frames, &mut presenter).unwrap();

    assert_eq!(summary.frames_seen, 6);
    assert_eq!(summary.frames_processed, 3);
    assert_eq!(summary.frames_skipped, 3);
    assert_eq!(summary.last_label.name(), "Thumb Up");

    let calls = controller.invoker().session().calls();
    assert_eq!(calls.len(), 3);
    for call in &calls {
        assert_eq!(call["input"].shape(), &[1, 3, 224, 224]);
    }
}

#[test]
fn test_simple_pipeline_from_config() {
    let mut config = EngineConfig::default();
    config.preprocessing.preset = PipelinePreset::Simple;
    config.stream.frame_stride = 1;
    let pipeline = FramePipeline::from_config(&config.preprocessing);
    let mut controller =
        StreamingController::from_session(MockSession::jester(), pipeline, &config).unwrap();

    let outcome = controller
        .step(&fixtures::solid_frame(320, 240, [255, 255, 255]))
        .unwrap();
    assert!(matches!(outcome, FrameOutcome::Processed(_)));

    let input = &controller.invoker().session().calls()[0]["input"];
    assert!(input.iter().all(|&v| (v - 1.0).abs() < 1e-6));
}

#[test]
fn test_empty_image_is_dropped_not_fatal() {
    let mut config = EngineConfig::default();
    config.stream.frame_stride = 1;
    let mut controller = StreamingController::from_session(
        MockSession::jester(),
        FramePipeline::jester(),
        &config,
    )
    .unwrap();

    let outcome = controller
        .step(&image::DynamicImage::new_rgb8(0, 0))
        .unwrap();
    assert!(matches!(
        outcome,
        FrameOutcome::Dropped {
            error: GestureError::Preprocessing(_),
            ..
        }
    ));
}

#[test]
fn test_gesture_onset_is_debounced() {
    // Idle for a while, then the model starts seeing a swipe.
    let mut script = vec![fixtures::logits_peaking_at(2); 4];
    script.extend(vec![fixtures::logits_peaking_at(16); 8]);
    let session = MockSession::jester().with_logit_script(script);

    let mut config = EngineConfig::default();
    config.stream.frame_stride = 1;
    config.smoothing.logit_window = 3;
    let mut controller =
        StreamingController::from_session(session, MockPreprocessor::default(), &config).unwrap();

    let mut presenter = RecordingPresenter::new();
    controller.run(vec![Some(0.0); 12], &mut presenter).unwrap();

    // Window of 3: the swipe wins once two of three entries are swipes
    // (frame 5), and the stabilizer accepts it because the history was
    // steady on idle.
    let labels = presenter.labels();
    assert_eq!(&labels[..5], &[2, 2, 2, 2, 2]);
    assert!(labels[5..].iter().all(|&l| l == 16), "labels: {:?}", labels);
}

#[test]
fn test_masked_class_never_emitted() {
    // "Rolling Hand Forward" (8) is masked, so the idle label holds.
    let session = MockSession::jester().with_logits(fixtures::logits_peaking_at(8));
    let mut config = EngineConfig::default();
    config.stream.frame_stride = 1;
    let mut controller =
        StreamingController::from_session(session, MockPreprocessor::default(), &config).unwrap();

    let mut presenter = RecordingPresenter::new();
    controller.run(vec![Some(0.0); 10], &mut presenter).unwrap();
    assert!(presenter.labels().iter().all(|&l| l == 2));
}

#[test]
fn test_backend_failure_reported_and_recovered() {
    let session = MockSession::jester()
        .with_logits(fixtures::logits_peaking_at(14))
        .fail_on_call(1, "device lost");
    let mut config = EngineConfig::default();
    config.stream.frame_stride = 1;
    let mut controller =
        StreamingController::from_session(session, MockPreprocessor::default(), &config).unwrap();

    let mut presenter = RecordingPresenter::new();
    let summary = controller.run(vec![Some(0.0); 4], &mut presenter).unwrap();

    assert_eq!(summary.frames_dropped, 1);
    assert_eq!(summary.frames_processed, 3);
    match &presenter.events()[1] {
        PresentedEvent::Dropped { label, error, .. } => {
            assert_eq!(label.index(), 14);
            assert!(error.contains("device lost"));
        }
        other => panic!("expected dropped event, got {:?}", other),
    }
    // Three successful calls advanced the state three times.
    assert_eq!(controller.store().replacements(), 3);
}

#[test]
fn test_missing_state_output_drops_frame() {
    let session = MockSession::jester().without_output("shift_out_9");
    let mut config = EngineConfig::default();
    config.stream.frame_stride = 1;
    let mut controller =
        StreamingController::from_session(session, MockPreprocessor::default(), &config).unwrap();

    match controller.step(&Some(0.0)).unwrap() {
        FrameOutcome::Dropped {
            error: GestureError::Inference(InferenceError::MissingOutput(name)),
            ..
        } => assert_eq!(name, "shift_out_9"),
        other => panic!("expected dropped frame, got {:?}", other),
    }
    assert_eq!(controller.store().replacements(), 0);
}

#[test]
fn test_fatal_state_shape_stops_run() {
    let session = MockSession::jester().with_state_output_shape(0, vec![1, 3, 28, 28]);
    let mut controller = StreamingController::from_session(
        session,
        MockPreprocessor::default(),
        &EngineConfig::default(),
    )
    .unwrap();

    let mut presenter = RecordingPresenter::new();
    let err = controller
        .run(vec![Some(0.0); 4], &mut presenter)
        .unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, GestureError::StateShape { slot: 0, .. }));
    assert!(presenter.events().is_empty());
}

#[test]
fn test_histories_stay_bounded_on_long_stream() {
    let script = (0..60)
        .map(|i| fixtures::logits_peaking_at([1, 4, 9, 16, 20][i % 5]))
        .collect();
    let session = MockSession::jester().with_logit_script(script);
    let mut config = EngineConfig::default();
    config.stream.frame_stride = 1;
    let mut controller =
        StreamingController::from_session(session, MockPreprocessor::default(), &config).unwrap();

    for _ in 0..60 {
        controller.step(&Some(0.0)).unwrap();
        assert!(controller.averager().len() <= 12);
        assert!(controller.stabilizer().len() <= 20);
        for (i, slot) in controller.store().current().iter().enumerate() {
            assert_eq!(slot.shape(), controller.store().layout().shape(i));
        }
    }
}

#[test]
fn test_explicit_binding_from_config() {
    let yaml = r#"
model:
  binding:
    frame_input: input
    state_inputs: [shift_in_0, shift_in_1, shift_in_2, shift_in_3, shift_in_4,
                   shift_in_5, shift_in_6, shift_in_7, shift_in_8, shift_in_9]
    logits_output: logits
    state_outputs: [shift_out_0, shift_out_1, shift_out_2, shift_out_3, shift_out_4,
                    shift_out_5, shift_out_6, shift_out_7, shift_out_8, shift_out_9]
"#;
    let config = EngineConfig::from_yaml_str(yaml).unwrap();
    let controller =
        StreamingController::from_session(MockSession::jester(), MockPreprocessor::default(), &config)
            .unwrap();
    assert_eq!(controller.invoker().binding().state_output(9), "shift_out_9");
}
