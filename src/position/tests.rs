use super::*;
use crate::host::SimulatedPositioning;
use chrono::{TimeZone, Utc};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

fn create_fix(latitude: f64, longitude: f64) -> LocationFix {
    LocationFix::new(
        latitude,
        longitude,
        "gps",
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    )
}

fn create_stream(provider: &Arc<SimulatedPositioning>) -> PositionStream {
    PositionStream::new(
        Arc::clone(provider) as Arc<dyn PositioningProvider>,
        LocationRequest::default(),
        8,
    )
}

#[test]
fn test_default_request_is_five_seconds_high_accuracy() {
    let request = LocationRequest::default();
    assert_eq!(request.interval, Duration::from_secs(5));
    assert_eq!(request.accuracy, Accuracy::High);
}

#[test]
fn test_fix_helpers() {
    let fix = create_fix(52.52, 13.405).with_speed(10.0).with_bearing(95.0);

    assert!((fix.speed_kmh().unwrap() - 36.0).abs() < 1e-9);
    assert_eq!(fix.compass_direction(), Some("E"));
    assert_eq!(fix.notice_body(), "Lat: 52.52, Lon: 13.405");
    assert_eq!(create_fix(0.0, 0.0).compass_direction(), None);
}

#[test]
fn test_compass_points() {
    assert_eq!(compass_point(0.0), "N");
    assert_eq!(compass_point(22.5), "NE");
    assert_eq!(compass_point(112.4), "E");
    assert_eq!(compass_point(180.0), "S");
    assert_eq!(compass_point(200.0), "S");
    assert_eq!(compass_point(247.5), "W");
    assert_eq!(compass_point(300.0), "NW");
    assert_eq!(compass_point(337.5), "N");
    assert_eq!(compass_point(359.9), "N");
}

#[test]
fn test_no_registration_without_consumers() {
    let provider = Arc::new(SimulatedPositioning::new(0.0, 0.0));
    let stream = create_stream(&provider);

    assert_eq!(stream.consumer_count(), 0);
    assert!(!stream.is_registered());
    assert_eq!(provider.register_count(), 0);
}

#[test]
fn test_reference_counted_registration() {
    let provider = Arc::new(SimulatedPositioning::new(0.0, 0.0));
    let stream = create_stream(&provider);

    let first = stream.subscribe().unwrap();
    assert_eq!(provider.register_count(), 1);
    assert_eq!(provider.last_request(), Some(LocationRequest::default()));

    let second = stream.subscribe().unwrap();
    first.cancel();
    let third = stream.subscribe().unwrap();
    drop(second);

    assert_eq!(provider.register_count(), 1);
    assert_eq!(provider.deregister_count(), 0);
    assert_eq!(stream.consumer_count(), 1);

    drop(third);
    assert_eq!(provider.deregister_count(), 1);
    assert!(!stream.is_registered());
    assert!(!provider.is_registered());
}

#[test]
fn test_resubscribe_after_full_cancellation() {
    let provider = Arc::new(SimulatedPositioning::new(0.0, 0.0));
    let stream = create_stream(&provider);

    stream.subscribe().unwrap().cancel();
    let mut subscription = stream.subscribe().unwrap();

    assert_eq!(provider.register_count(), 2);
    assert_eq!(provider.deregister_count(), 1);

    assert_eq!(provider.push_batch(vec![create_fix(1.0, 2.0)]), 1);
    assert_eq!(subscription.try_recv(), Some(create_fix(1.0, 2.0)));
}

#[test]
fn test_registration_failure_is_reported() {
    let provider = Arc::new(SimulatedPositioning::new(0.0, 0.0).with_failing_registration());
    let stream = create_stream(&provider);

    let result = stream.subscribe();
    assert!(matches!(
        result,
        Err(crate::error::PositionError::RegistrationFailed { .. })
    ));
    assert_eq!(stream.consumer_count(), 0);
    assert!(!stream.is_registered());
}

#[test]
fn test_only_newest_fix_in_batch_is_forwarded() {
    let provider = Arc::new(SimulatedPositioning::new(0.0, 0.0));
    let stream = create_stream(&provider);
    let mut subscription = stream.subscribe().unwrap();

    provider.push_batch(vec![create_fix(1.0, 1.0), create_fix(2.0, 2.0), create_fix(3.0, 3.0)]);

    assert_eq!(subscription.try_recv(), Some(create_fix(3.0, 3.0)));
    assert_eq!(subscription.try_recv(), None);
}

#[test]
fn test_empty_batch_forwards_nothing() {
    let provider = Arc::new(SimulatedPositioning::new(0.0, 0.0));
    let stream = create_stream(&provider);
    let mut subscription = stream.subscribe().unwrap();

    assert_eq!(provider.push_batch(Vec::new()), 0);
    assert_eq!(subscription.try_recv(), None);
}

#[test]
fn test_fan_out_to_every_consumer() {
    let provider = Arc::new(SimulatedPositioning::new(0.0, 0.0));
    let stream = create_stream(&provider);
    let mut first = stream.subscribe().unwrap();
    let mut second = stream.subscribe().unwrap();

    assert_eq!(provider.push_batch(vec![create_fix(5.0, 6.0)]), 2);
    assert_eq!(first.try_recv(), Some(create_fix(5.0, 6.0)));
    assert_eq!(second.try_recv(), Some(create_fix(5.0, 6.0)));
}

#[test]
fn test_cancelled_consumer_receives_nothing() {
    let provider = Arc::new(SimulatedPositioning::new(0.0, 0.0));
    let stream = create_stream(&provider);
    let mut kept = stream.subscribe().unwrap();
    let cancelled = stream.subscribe().unwrap();

    cancelled.cancel();
    assert_eq!(provider.push_batch(vec![create_fix(7.0, 8.0)]), 1);
    assert_eq!(kept.try_recv(), Some(create_fix(7.0, 8.0)));
}

#[test]
fn test_lagging_consumer_keeps_newest_fix() {
    let provider = Arc::new(SimulatedPositioning::new(0.0, 0.0));
    let stream = PositionStream::new(
        Arc::clone(&provider) as Arc<dyn PositioningProvider>,
        LocationRequest::default(),
        1,
    );
    let mut subscription = stream.subscribe().unwrap();

    assert_eq!(provider.push_batch(vec![create_fix(1.0, 1.0)]), 1);
    assert_eq!(provider.push_batch(vec![create_fix(2.0, 2.0)]), 1);
    assert_eq!(subscription.try_recv(), Some(create_fix(2.0, 2.0)));
    assert_eq!(subscription.try_recv(), None);
}

#[test]
fn test_backlog_beyond_buffer_evicts_oldest() {
    let provider = Arc::new(SimulatedPositioning::new(0.0, 0.0));
    let stream = create_stream(&provider);
    let mut subscription = stream.subscribe().unwrap();

    for i in 1..=20 {
        assert_eq!(provider.push_batch(vec![create_fix(i as f64, i as f64)]), 1);
    }

    let received: Vec<f64> = std::iter::from_fn(|| subscription.try_recv())
        .map(|fix| fix.latitude)
        .collect();
    let expected: Vec<f64> = (13..=20).map(|i| i as f64).collect();
    assert_eq!(received, expected);
}

#[tokio::test]
async fn test_subscription_as_stream() {
    let provider = Arc::new(SimulatedPositioning::new(0.0, 0.0));
    let stream = create_stream(&provider);
    let subscription = stream.subscribe().unwrap();

    provider.push_batch(vec![create_fix(10.0, 20.0)]);
    let mut fixes = subscription.into_stream();
    let fix = timeout(Duration::from_millis(100), fixes.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fix.latitude, 10.0);

    drop(fixes);
    assert_eq!(stream.consumer_count(), 0);
    assert!(!provider.is_registered());
}

#[tokio::test]
async fn test_generated_fixes_arrive_and_stop_on_cancel() {
    let provider = Arc::new(SimulatedPositioning::new(48.8566, 2.3522).with_auto_emit());
    let stream = PositionStream::new(
        Arc::clone(&provider) as Arc<dyn PositioningProvider>,
        LocationRequest {
            interval: Duration::from_millis(10),
            accuracy: Accuracy::High,
        },
        8,
    );

    let mut subscription = stream.subscribe().unwrap();
    let fix = timeout(Duration::from_millis(500), subscription.recv())
        .await
        .unwrap()
        .unwrap();
    assert!((fix.latitude - 48.8566).abs() < 0.01);
    assert_eq!(fix.provider, "gps");

    subscription.cancel();
    assert!(!provider.is_registered());
    assert_eq!(provider.deregister_count(), 1);
}
