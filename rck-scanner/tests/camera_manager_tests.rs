//! Camera resource manager tests
//!
//! Acquisition retries, release idempotence, the one-live-stream invariant,
//! host backgrounding and torch control.

mod helpers;

use helpers::FakeCamera;
use rck_common::config::FacingMode;
use rck_scanner::camera::{AcquirePolicy, CameraResourceManager, CaptureConstraints, FrameGrab};
use rck_scanner::scan::FrameBuffer;
use rck_scanner::CameraError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn manager(camera: &Arc<FakeCamera>) -> CameraResourceManager {
    CameraResourceManager::new(
        camera.clone(),
        CaptureConstraints::default(),
        AcquirePolicy::default(),
    )
}

// ============================================================================
// Acquisition and retries
// ============================================================================

/// **Given:** A camera that is busy for the first two requests
/// **When:** The manager acquires
/// **Then:** The third attempt succeeds after two 500 ms backoffs
#[tokio::test(start_paused = true)]
async fn test_acquire_retries_until_success() {
    let camera = Arc::new(
        FakeCamera::new().failing_opens(vec![CameraError::CameraBusy, CameraError::CameraBusy]),
    );
    let manager = manager(&camera);

    let started = Instant::now();
    let session = manager.acquire().await.expect("third attempt succeeds");

    assert_eq!(session.attempts, 3);
    assert_eq!(started.elapsed(), Duration::from_millis(1000));
    assert_eq!(camera.opens(), 3);
    assert_eq!(camera.live_streams(), 1);
    assert_eq!(manager.retry_count().await, 0, "retry count resets on success");
    assert!(manager.has_session().await);
}

/// **Given:** Permission is denied on every request
/// **When:** The manager acquires
/// **Then:** PermissionDenied surfaces after the initial attempt plus 2 retries
#[tokio::test(start_paused = true)]
async fn test_permission_denied_three_times_surfaces() {
    let camera = Arc::new(FakeCamera::new().failing_opens(vec![
        CameraError::PermissionDenied,
        CameraError::PermissionDenied,
        CameraError::PermissionDenied,
    ]));
    let manager = manager(&camera);

    let result = manager.acquire().await;

    assert_eq!(result, Err(CameraError::PermissionDenied));
    assert_eq!(camera.opens(), 3);
    assert_eq!(camera.live_streams(), 0);
    assert!(!manager.has_session().await);
    assert_eq!(manager.retry_count().await, 2);
    assert_eq!(manager.acquisition_count(), 0);
}

/// **Given:** A host that rejects the rear-camera facing mode
/// **When:** The manager acquires
/// **Then:** The retry goes out without a facing mode and succeeds
#[tokio::test(start_paused = true)]
async fn test_unsupported_facing_mode_is_dropped() {
    let camera = Arc::new(FakeCamera::new().failing_opens(vec![CameraError::UnsupportedConstraints]));
    let manager = manager(&camera);

    let session = manager.acquire().await.unwrap();

    let seen = camera.constraints_seen();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].facing_mode, Some(FacingMode::Environment));
    assert_eq!(seen[1].facing_mode, None);
    assert_eq!(session.facing_mode, None);
    assert_eq!(manager.facing_mode().await, None);
}

/// **Given:** A sink that refuses to start once
/// **When:** The manager acquires
/// **Then:** The start is retried after 300 ms on the same stream
#[tokio::test(start_paused = true)]
async fn test_sink_start_is_retried_once() {
    let camera = Arc::new(
        FakeCamera::new().failing_starts(vec![CameraError::Unknown("play() interrupted".into())]),
    );
    let manager = manager(&camera);

    let started = Instant::now();
    let session = manager.acquire().await.unwrap();

    assert_eq!(session.attempts, 1);
    assert_eq!(camera.opens(), 1);
    assert_eq!(started.elapsed(), Duration::from_millis(300));
}

/// **Given:** A sink that refuses to start twice
/// **When:** The manager acquires
/// **Then:** That stream is stopped and the next attempt opens a new one
#[tokio::test(start_paused = true)]
async fn test_sink_failing_twice_fails_the_attempt() {
    let camera = Arc::new(FakeCamera::new().failing_starts(vec![
        CameraError::CameraBusy,
        CameraError::CameraBusy,
    ]));
    let manager = manager(&camera);

    manager.acquire().await.unwrap();

    assert_eq!(camera.opens(), 2);
    assert_eq!(camera.live_streams(), 1);
    assert_eq!(camera.max_live_streams(), 1);
}

// ============================================================================
// Release and the one-session invariant
// ============================================================================

#[tokio::test]
async fn test_release_twice_is_noop_second_time() {
    let camera = Arc::new(FakeCamera::new());
    let manager = manager(&camera);
    manager.acquire().await.unwrap();

    assert!(manager.release().await);
    assert!(!manager.release().await);
    assert_eq!(camera.live_streams(), 0);
    assert_eq!(manager.release_count(), 1);
}

#[tokio::test]
async fn test_release_without_session_is_noop() {
    let camera = Arc::new(FakeCamera::new());
    let manager = manager(&camera);
    assert!(!manager.release().await);
    assert_eq!(manager.release_count(), 0);
}

/// **Given:** A slow camera
/// **When:** Two acquisitions race, then a third follows
/// **Then:** There is never more than one live stream
#[tokio::test(start_paused = true)]
async fn test_never_two_live_sessions() {
    let camera = Arc::new(FakeCamera::new().with_open_delay(Duration::from_millis(50)));
    let manager = manager(&camera);

    let (first, second) = tokio::join!(manager.acquire(), manager.acquire());
    assert!(first.is_ok());
    assert!(second.is_ok());
    manager.acquire().await.unwrap();

    assert_eq!(camera.opens(), 3);
    assert_eq!(camera.live_streams(), 1);
    assert_eq!(camera.max_live_streams(), 1);
    assert_eq!(manager.release_count(), 2);
}

#[tokio::test]
async fn test_dropping_manager_stops_stream() {
    let camera = Arc::new(FakeCamera::new());
    {
        let manager = manager(&camera);
        manager.acquire().await.unwrap();
        assert_eq!(camera.live_streams(), 1);
    }
    assert_eq!(camera.live_streams(), 0);
}

// ============================================================================
// Host backgrounding
// ============================================================================

/// **Given:** A live session
/// **When:** The host hides, then shows the page again
/// **Then:** The stream is fully released, then a brand new one is opened
#[tokio::test]
async fn test_pause_releases_and_resume_reacquires() {
    let camera = Arc::new(FakeCamera::new());
    let manager = manager(&camera);
    manager.acquire().await.unwrap();

    assert!(manager.pause().await);
    assert_eq!(camera.live_streams(), 0);
    assert!(manager.is_suspended().await);

    let mut buffer = FrameBuffer::new();
    assert_eq!(manager.grab_frame(&mut buffer), FrameGrab::NoSession);

    manager.resume_after_pause().await.unwrap();
    assert_eq!(camera.opens(), 2);
    assert_eq!(camera.live_streams(), 1);
    assert!(!manager.is_suspended().await);
    assert_eq!(manager.grab_frame(&mut buffer), FrameGrab::Captured);
    assert_eq!((buffer.width(), buffer.height()), (8, 8));
}

#[tokio::test]
async fn test_pause_without_session_still_suspends() {
    let camera = Arc::new(FakeCamera::new());
    let manager = manager(&camera);
    assert!(!manager.pause().await);
    assert!(manager.is_suspended().await);
}

// ============================================================================
// Torch
// ============================================================================

#[tokio::test]
async fn test_torch_unsupported_stays_off() {
    let camera = Arc::new(FakeCamera::new());
    let manager = manager(&camera);
    manager.acquire().await.unwrap();

    assert!(!manager.torch_supported().await);
    assert_eq!(
        manager.set_torch(true).await,
        Err(CameraError::UnsupportedConstraints)
    );
    assert!(!manager.torch_on().await);
}

#[tokio::test]
async fn test_torch_switches_when_supported() {
    let camera = Arc::new(FakeCamera::new().with_torch());
    let manager = manager(&camera);
    manager.acquire().await.unwrap();

    assert!(manager.torch_supported().await);
    manager.set_torch(true).await.unwrap();
    assert!(manager.torch_on().await);

    // A fresh session starts with the torch off.
    manager.acquire().await.unwrap();
    assert!(!manager.torch_on().await);
}

#[tokio::test]
async fn test_torch_without_session_is_error() {
    let camera = Arc::new(FakeCamera::new().with_torch());
    let manager = manager(&camera);
    assert!(manager.set_torch(true).await.is_err());
}
