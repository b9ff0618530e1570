// Audio pipeline tests
//
// Drives the capture -> gain -> publish chain against a loopback session and
// checks that devices and published tracks are never leaked or doubled.

use std::sync::Arc;
use std::time::Duration;
use voice_companion::audio::{AudioDevice, AudioPipeline, DeviceKind, SyntheticHost};
use voice_companion::provider::{ConnectOptions, LoopbackRelay, MediaProvider, MediaSession};
use voice_companion::token::{DevTokenIssuer, TokenIssuer};
use voice_companion::VoiceError;

async fn open_session(relay: &LoopbackRelay) -> Box<dyn MediaSession> {
    let credential = DevTokenIssuer::default()
        .issue_token("me", "channel-1")
        .await
        .unwrap();
    relay
        .connect("ws://loopback", &credential, ConnectOptions::default())
        .await
        .unwrap()
}

fn host_with_two_mics() -> SyntheticHost {
    let host = SyntheticHost::new();
    host.add_device(AudioDevice {
        id: "usb".to_string(),
        label: "USB Headset".to_string(),
        kind: DeviceKind::Input,
    });
    host
}

#[tokio::test]
async fn test_start_publishes_one_track() {
    let relay = LoopbackRelay::new();
    let host = SyntheticHost::new();
    let session = open_session(&relay).await;
    let mut pipeline = AudioPipeline::new(Arc::new(host.clone()), None, 100);

    pipeline.start(session.as_ref()).await.unwrap();

    assert!(pipeline.is_active());
    assert!(pipeline.published_track().is_some());
    assert_eq!(relay.published_now(), 1);
    assert_eq!(host.open_captures(), 1);

    // Voice processing constraints: echo cancellation and noise suppression on, AGC off
    let constraints = &host.requested_constraints()[0];
    assert!(constraints.echo_cancellation);
    assert!(constraints.noise_suppression);
    assert!(!constraints.auto_gain_control);
    assert_eq!(constraints.device_id, None);
}

#[tokio::test]
async fn test_frames_flow_to_relay() {
    let relay = LoopbackRelay::new();
    let session = open_session(&relay).await;
    let mut pipeline = AudioPipeline::new(Arc::new(SyntheticHost::new()), None, 100);

    pipeline.start(session.as_ref()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(relay.frames_received() > 0);
}

#[tokio::test]
async fn test_device_switches_never_overlap_tracks() {
    let relay = LoopbackRelay::new();
    let host = host_with_two_mics();
    let session = open_session(&relay).await;
    let mut pipeline = AudioPipeline::new(Arc::new(host.clone()), None, 100);
    pipeline.start(session.as_ref()).await.unwrap();

    for device in ["usb", "default", "usb", "default"] {
        pipeline
            .select_input_device(Some(device.to_string()), Some(session.as_ref()))
            .await
            .unwrap();
        assert_eq!(pipeline.input_device(), Some(device));
        assert_eq!(relay.published_now(), 1);
        assert_eq!(host.open_captures(), 1);
    }

    assert_eq!(relay.peak_published(), 1);
    assert_eq!(relay.publish_count(), 5);
    assert_eq!(relay.unpublish_count(), 4);
    assert_eq!(host.stopped_total(), 4);
}

#[tokio::test]
async fn test_failed_acquisition_keeps_previous_chain() {
    let relay = LoopbackRelay::new();
    let host = host_with_two_mics();
    host.deny("usb");
    let session = open_session(&relay).await;
    let mut pipeline = AudioPipeline::new(Arc::new(host.clone()), None, 100);
    pipeline.start(session.as_ref()).await.unwrap();
    let track = pipeline.published_track().cloned();

    let err = pipeline
        .select_input_device(Some("usb".to_string()), Some(session.as_ref()))
        .await
        .unwrap_err();

    assert!(matches!(err, VoiceError::DeviceAcquisitionFailed(_)));
    assert_eq!(pipeline.input_device(), None);
    assert_eq!(pipeline.published_track().cloned(), track);
    assert_eq!(relay.published_now(), 1);
    assert_eq!(host.open_captures(), 1);
    assert_eq!(relay.unpublish_count(), 0);
}

#[tokio::test]
async fn test_unknown_device_is_an_acquisition_failure() {
    let relay = LoopbackRelay::new();
    let session = open_session(&relay).await;
    let mut pipeline = AudioPipeline::new(Arc::new(SyntheticHost::new()), Some("ghost".into()), 100);

    let err = pipeline.start(session.as_ref()).await.unwrap_err();

    assert!(matches!(err, VoiceError::DeviceAcquisitionFailed(_)));
    assert!(!pipeline.is_active());
    assert_eq!(relay.publish_count(), 0);
}

#[tokio::test]
async fn test_publish_failure_releases_capture() {
    let relay = LoopbackRelay::new();
    let host = SyntheticHost::new();
    let session = open_session(&relay).await;
    relay.fail_publishes(true);
    let mut pipeline = AudioPipeline::new(Arc::new(host.clone()), None, 100);

    let err = pipeline.start(session.as_ref()).await.unwrap_err();

    assert!(matches!(err, VoiceError::PublishFailed(_)));
    assert!(!pipeline.is_active());
    assert_eq!(host.open_captures(), 0);
}

#[tokio::test]
async fn test_select_without_session_only_stores_choice() {
    let host = host_with_two_mics();
    let mut pipeline = AudioPipeline::new(Arc::new(host.clone()), None, 100);

    pipeline
        .select_input_device(Some("usb".to_string()), None)
        .await
        .unwrap();

    assert_eq!(pipeline.input_device(), Some("usb"));
    assert_eq!(host.opened_total(), 0);
}

#[tokio::test]
async fn test_teardown_is_idempotent() {
    let relay = LoopbackRelay::new();
    let host = SyntheticHost::new();
    let session = open_session(&relay).await;
    let mut pipeline = AudioPipeline::new(Arc::new(host.clone()), None, 100);
    pipeline.start(session.as_ref()).await.unwrap();

    pipeline.teardown(Some(session.as_ref())).await;
    pipeline.teardown(Some(session.as_ref())).await;
    pipeline.teardown(None).await;

    assert!(!pipeline.is_active());
    assert!(pipeline.published_track().is_none());
    assert_eq!(host.open_captures(), 0);
    assert_eq!(host.stopped_total(), 1);
    assert_eq!(relay.unpublish_count(), 1);
    assert_eq!(relay.published_now(), 0);
}

#[tokio::test]
async fn test_gain_changes_apply_live() {
    let relay = LoopbackRelay::new();
    let host = SyntheticHost::new();
    let session = open_session(&relay).await;
    let mut pipeline = AudioPipeline::new(Arc::new(host.clone()), None, 100);
    pipeline.start(session.as_ref()).await.unwrap();

    let linear = pipeline.set_gain(25);

    assert!((linear - 0.25).abs() < f32::EPSILON);
    assert_eq!(pipeline.gain_percent(), 25);
    assert!((pipeline.linear_gain() - 0.25).abs() < f32::EPSILON);
    assert_eq!(host.opened_total(), 1);
}

#[tokio::test]
async fn test_mute_survives_device_switch() {
    let relay = LoopbackRelay::new();
    let host = host_with_two_mics();
    let session = open_session(&relay).await;
    let mut pipeline = AudioPipeline::new(Arc::new(host.clone()), None, 100);

    assert_eq!(pipeline.set_muted(true), None);

    pipeline.start(session.as_ref()).await.unwrap();
    assert_eq!(pipeline.set_muted(true), Some(true));
    assert_eq!(relay.local_muted(), Some(true));

    pipeline
        .select_input_device(Some("usb".to_string()), Some(session.as_ref()))
        .await
        .unwrap();
    assert!(pipeline.is_muted());
    assert_eq!(relay.local_muted(), Some(true));
}
