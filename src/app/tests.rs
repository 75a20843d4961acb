use super::*;
use crate::activation::{ActivationState, PermissionKind};
use crate::config::TelemetryConfig;
use crate::events::TelemetryEvent;
use crate::host::{
    ScriptedPermissions, SimulatedInertialHardware, SimulatedNoticeHost, SimulatedPositioning,
};
use crate::position::LocationFix;
use crate::sensor::SensorKind;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::{sleep, timeout};

struct Hosts {
    inertial: Arc<SimulatedInertialHardware>,
    positioning: Arc<SimulatedPositioning>,
    notices: Arc<SimulatedNoticeHost>,
}

fn create_test_config() -> TelemetryConfig {
    let mut config = TelemetryConfig::default();
    config.position.interval_ms = 20;
    config.system.report_interval_seconds = 60;
    config
}

fn create_orchestrator(
    config: TelemetryConfig,
    permissions: ScriptedPermissions,
    gyroscope_present: bool,
) -> (TelemetryOrchestrator, Hosts) {
    let hosts = Hosts {
        inertial: Arc::new(SimulatedInertialHardware::new(true, gyroscope_present)),
        positioning: Arc::new(SimulatedPositioning::new(37.422, -122.084)),
        notices: Arc::new(SimulatedNoticeHost::new(true)),
    };
    let collaborators = HostCollaborators {
        inertial: hosts.inertial.clone(),
        positioning: hosts.positioning.clone(),
        permissions: Arc::new(permissions),
        notices: hosts.notices.clone(),
    };

    let mut orchestrator = TelemetryOrchestrator::with_collaborators(config, collaborators)
        .expect("valid test configuration");
    orchestrator.set_console_enabled(false);
    (orchestrator, hosts)
}

fn granting_permissions() -> ScriptedPermissions {
    ScriptedPermissions::new(true)
        .grants_on_request(PermissionKind::ForegroundLocation)
        .grants_on_request(PermissionKind::BackgroundLocation)
}

async fn wait_until<F: Fn() -> bool>(condition: F) {
    timeout(Duration::from_secs(2), async {
        while !condition() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

async fn wait_for_bridge(orchestrator: &TelemetryOrchestrator) {
    let bridge = orchestrator.notification_bridge();
    wait_until(move || bridge.is_running()).await;
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = create_test_config();
    config.position.subscriber_buffer = 0;

    let result = TelemetryOrchestrator::new(config);
    assert!(matches!(
        result,
        Err(crate::error::TelemetryError::Config(_))
    ));
}

#[tokio::test]
async fn test_initialize_registers_components() {
    let (mut orchestrator, _hosts) =
        create_orchestrator(create_test_config(), granting_permissions(), true);

    let states = orchestrator.get_all_component_states().await;
    assert!(states.is_empty());

    orchestrator.initialize().await.unwrap();

    let states = orchestrator.get_all_component_states().await;
    assert_eq!(states.len(), 4);
    assert_eq!(states.get("bridge"), Some(&ComponentState::Stopped));
    assert!(!states.contains_key("keyboard"));
}

#[tokio::test]
async fn test_component_state_management() {
    let (orchestrator, _hosts) =
        create_orchestrator(create_test_config(), granting_permissions(), true);

    orchestrator
        .set_component_state("sensors", ComponentState::Starting)
        .await;
    assert_eq!(
        orchestrator.get_component_state("sensors").await,
        Some(ComponentState::Starting)
    );

    orchestrator
        .set_component_state("sensors", ComponentState::Running)
        .await;
    orchestrator
        .set_component_state("bridge", ComponentState::Failed)
        .await;

    let all_states = orchestrator.get_all_component_states().await;
    assert_eq!(all_states.len(), 2);
    assert_eq!(all_states.get("sensors"), Some(&ComponentState::Running));
}

#[tokio::test]
async fn test_activation_starts_bridge_and_shutdown_releases_everything() {
    let (mut orchestrator, hosts) =
        create_orchestrator(create_test_config(), granting_permissions(), true);
    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();

    assert!(orchestrator.sensor(SensorKind::Accelerometer).is_listening());
    assert!(orchestrator.sensor(SensorKind::Gyroscope).is_listening());

    wait_for_bridge(&orchestrator).await;
    assert_eq!(
        orchestrator.activation_gate().state(),
        ActivationState::Activated
    );
    assert_eq!(orchestrator.position_stream().consumer_count(), 1);

    hosts
        .positioning
        .push_batch(vec![LocationFix::new(37.5, -122.1, "gps", Utc::now())]);
    let notices = Arc::clone(&hosts.notices);
    wait_until(move || notices.post_count() >= 2).await;
    assert_eq!(
        hosts.notices.displayed(1).unwrap().body,
        "Lat: 37.5, Lon: -122.1"
    );

    let exit_code = orchestrator.shutdown().await.unwrap();
    assert_eq!(exit_code, 0);

    assert!(!orchestrator.notification_bridge().is_running());
    assert_eq!(orchestrator.position_stream().consumer_count(), 0);
    assert!(!hosts.positioning.is_registered());
    assert_eq!(hosts.inertial.active_listeners(), 0);
    assert_eq!(
        orchestrator.get_component_state("bridge").await,
        Some(ComponentState::Stopped)
    );
}

#[tokio::test]
async fn test_foreground_denial_never_starts_bridge() {
    let (mut orchestrator, hosts) =
        create_orchestrator(create_test_config(), ScriptedPermissions::new(true), true);
    orchestrator.start().await.unwrap();

    let gate = orchestrator.activation_gate();
    timeout(Duration::from_secs(2), gate.wait_for_terminal())
        .await
        .unwrap();
    sleep(Duration::from_millis(20)).await;

    assert_eq!(gate.state(), ActivationState::ForegroundDenied);
    assert!(!orchestrator.notification_bridge().is_running());
    assert_eq!(hosts.positioning.register_count(), 0);
    assert_eq!(hosts.notices.post_count(), 0);

    // Sensors keep working without location access
    assert!(orchestrator.sensor(SensorKind::Accelerometer).is_listening());

    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_background_denial_respects_notify_setting() {
    let permissions =
        || ScriptedPermissions::new(true).already_granted(PermissionKind::ForegroundLocation);

    let (mut orchestrator, _hosts) =
        create_orchestrator(create_test_config(), permissions(), true);
    orchestrator.start().await.unwrap();
    let gate = orchestrator.activation_gate();
    timeout(Duration::from_secs(2), gate.wait_for_terminal())
        .await
        .unwrap();
    sleep(Duration::from_millis(20)).await;
    assert_eq!(gate.state(), ActivationState::BackgroundDenied);
    assert!(!orchestrator.notification_bridge().is_running());
    orchestrator.shutdown().await.unwrap();

    let mut config = create_test_config();
    config.activation.notify_on_background_denial = true;
    let (mut orchestrator, _hosts) = create_orchestrator(config, permissions(), true);
    orchestrator.start().await.unwrap();
    wait_for_bridge(&orchestrator).await;
    assert_eq!(
        orchestrator.activation_gate().state(),
        ActivationState::BackgroundDenied
    );
    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_visibility_lifecycle() {
    let (mut orchestrator, hosts) =
        create_orchestrator(create_test_config(), granting_permissions(), false);
    orchestrator.start().await.unwrap();

    assert!(orchestrator.is_visible());
    assert!(orchestrator.sensor(SensorKind::Accelerometer).is_listening());
    assert!(!orchestrator.sensor(SensorKind::Gyroscope).is_listening());

    orchestrator.set_visible(false).await;
    assert!(!orchestrator.is_visible());
    assert!(!orchestrator.sensor(SensorKind::Accelerometer).is_listening());
    assert_eq!(hosts.inertial.active_listeners(), 0);

    orchestrator.set_visible(true).await;
    assert!(orchestrator.sensor(SensorKind::Accelerometer).is_listening());
    assert!(!orchestrator.sensor(SensorKind::Gyroscope).is_listening());

    // The background notice is independent of the presentation
    wait_for_bridge(&orchestrator).await;
    orchestrator.set_visible(false).await;
    assert!(orchestrator.notification_bridge().is_running());

    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_start_on_launch_disabled_keeps_sensors_idle() {
    let mut config = create_test_config();
    config.sensors.start_on_launch = false;
    let (mut orchestrator, hosts) = create_orchestrator(config, granting_permissions(), true);

    orchestrator.start().await.unwrap();

    assert!(!orchestrator.sensor(SensorKind::Accelerometer).is_listening());
    assert_eq!(hosts.inertial.register_count(), 0);

    assert!(orchestrator.toggle_sensor(SensorKind::Gyroscope).await);
    assert_eq!(hosts.inertial.register_count(), 1);

    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_toggle_command_from_event_bus() {
    let (mut orchestrator, _hosts) =
        create_orchestrator(create_test_config(), granting_permissions(), true);
    orchestrator.start().await.unwrap();
    let event_bus = orchestrator.event_bus();
    let mut status = event_bus.subscribe();

    event_bus
        .publish(TelemetryEvent::ToggleSensorRequested {
            kind: SensorKind::Gyroscope,
        })
        .await
        .unwrap();

    let gyroscope = orchestrator.sensor(SensorKind::Gyroscope);
    wait_until(move || !gyroscope.is_listening()).await;

    let event = timeout(Duration::from_secs(1), async {
        loop {
            if let Ok(TelemetryEvent::SensorStatusChanged { kind, listening, .. }) =
                status.recv().await
            {
                return (kind, listening);
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(event, (SensorKind::Gyroscope, false));

    event_bus
        .publish(TelemetryEvent::VisibilityRequested { visible: false })
        .await
        .unwrap();
    let accelerometer = orchestrator.sensor(SensorKind::Accelerometer);
    wait_until(move || !accelerometer.is_listening()).await;

    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_request_event_ends_run() {
    let (mut orchestrator, _hosts) =
        create_orchestrator(create_test_config(), granting_permissions(), true);
    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();

    let event_bus = orchestrator.event_bus();
    tokio::spawn(async move {
        sleep(Duration::from_millis(50)).await;
        let _ = event_bus
            .publish(TelemetryEvent::ShutdownRequested {
                timestamp: SystemTime::now(),
                reason: "test".to_string(),
            })
            .await;
    });

    let exit_code = timeout(Duration::from_secs(5), orchestrator.run())
        .await
        .expect("run should return after a shutdown request")
        .unwrap();
    assert_eq!(exit_code, 0);

    let states = orchestrator.get_all_component_states().await;
    assert!(states
        .values()
        .all(|state| *state == ComponentState::Stopped));
}

#[tokio::test]
async fn test_session_ids_are_unique() {
    let (first, _) = create_orchestrator(create_test_config(), granting_permissions(), true);
    let (second, _) = create_orchestrator(create_test_config(), granting_permissions(), true);
    assert_ne!(first.session_id(), second.session_id());
}
