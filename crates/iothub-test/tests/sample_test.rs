//! Workflow tests for `RegistryManagerSample` against the in-memory registry.
//!
//! These cover provisioning, twin updates and enumeration, and the guaranteed
//! removal of devices created by `run_sample`.

use std::sync::Arc;

use iothub_registry::{
    AuthenticationType, CertificateThumbprints, DeviceTransport, RegistryError,
    RegistryManagerSample, SampleError, X509Thumbprint, DEVICE_ID_PREFIX,
};
use iothub_test::{
    hub_connection_string, FailingMessaging, InMemoryRegistry, MockDevice, Operation,
    RecordingMessaging, RecordingReporter, TEST_HOST,
};

/// Builds a sample over `registry` that records its progress lines.
fn sample_for(
    registry: &Arc<InMemoryRegistry>,
    connection_string: &str,
) -> (RegistryManagerSample, Arc<RecordingReporter>) {
    let reporter = Arc::new(RecordingReporter::new());
    let sample = RegistryManagerSample::builder()
        .registry(registry.clone())
        .connection_string(connection_string)
        .thumbprints(CertificateThumbprints::new("PRIMARY-THUMB", "SECONDARY-THUMB"))
        .reporter(reporter.clone())
        .build()
        .expect("sample should build");
    (sample, reporter)
}

fn new_sample() -> (Arc<InMemoryRegistry>, RegistryManagerSample, Arc<RecordingReporter>) {
    let registry = Arc::new(InMemoryRegistry::new());
    let (sample, reporter) = sample_for(&registry, &hub_connection_string());
    (registry, sample, reporter)
}

// ============================================================================
// Device lifecycle
// ============================================================================

#[tokio::test]
async fn test_add_then_remove_leaves_no_device() {
    let (registry, sample, reporter) = new_sample();

    let device = sample.add_device("sensor-1").await.unwrap();
    assert_eq!(device.authentication.auth_type, AuthenticationType::Sas);
    assert!(device.authentication.primary_key().is_some());

    sample.remove_device("sensor-1").await.unwrap();
    assert_eq!(registry.device_count(), 0);

    let err = sample.remove_device("sensor-1").await.unwrap_err();
    assert!(err.is_not_found());

    assert!(reporter.contains("Adding device 'sensor-1' with default authentication . . . DONE"));
    assert!(reporter.contains("Remove device 'sensor-1' . . . DONE"));
    assert!(reporter.contains("Remove device 'sensor-1' . . . FAILED"));
}

#[tokio::test]
async fn test_duplicate_add_conflicts() {
    let (registry, sample, _) = new_sample();

    sample.add_device("sensor-1").await.unwrap();
    let err = sample.add_device("sensor-1").await.unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(registry.device_count(), 1);
}

#[tokio::test]
async fn test_self_signed_stores_both_thumbprints() {
    let (registry, sample, _) = new_sample();

    sample
        .add_device_with_self_signed_certificate("cam-1", "AAAA", "BBBB")
        .await
        .unwrap();

    let stored = registry.device("cam-1").unwrap();
    assert_eq!(stored.authentication.auth_type, AuthenticationType::SelfSigned);
    assert_eq!(
        stored.authentication.thumbprint(),
        Some(&X509Thumbprint {
            primary_thumbprint: Some("AAAA".to_string()),
            secondary_thumbprint: Some("BBBB".to_string()),
        })
    );
    assert!(stored.authentication.primary_key().is_none());
}

#[tokio::test]
async fn test_configured_thumbprints_are_used() {
    let (registry, sample, _) = new_sample();

    sample
        .add_device_with_configured_thumbprints("cam-2")
        .await
        .unwrap();

    let thumbprint = registry
        .device("cam-2")
        .unwrap()
        .authentication
        .thumbprint()
        .cloned()
        .unwrap();
    assert_eq!(thumbprint.primary_thumbprint.as_deref(), Some("PRIMARY-THUMB"));
    assert_eq!(thumbprint.secondary_thumbprint.as_deref(), Some("SECONDARY-THUMB"));
}

#[tokio::test]
async fn test_certificate_authority_has_no_thumbprint() {
    let (registry, sample, _) = new_sample();

    sample
        .add_device_with_certificate_authority("gateway-1")
        .await
        .unwrap();

    let stored = registry.device("gateway-1").unwrap();
    assert_eq!(
        stored.authentication.auth_type,
        AuthenticationType::CertificateAuthority
    );
    assert!(stored.authentication.thumbprint().is_none());
}

// ============================================================================
// Twins
// ============================================================================

#[tokio::test]
async fn test_update_desired_properties_merges_custom_key() {
    let (registry, sample, _) = new_sample();
    let (device, twin) = MockDevice::new("thermostat-1")
        .with_desired("targetTemperature", 21)
        .build();
    registry.seed(device, twin);

    let updated = sample
        .update_desired_properties("thermostat-1")
        .await
        .unwrap();

    assert_eq!(updated.properties.desired["customKey"], "customValue");
    assert_eq!(updated.properties.desired["targetTemperature"], 21);
    assert_eq!(registry.call_count(Operation::GetTwin, "thermostat-1"), 1);
}

#[tokio::test]
async fn test_update_desired_properties_rereads_etag() {
    let (_registry, sample, _) = new_sample();
    sample.add_device("thermostat-1").await.unwrap();

    sample
        .update_desired_properties("thermostat-1")
        .await
        .unwrap();
    sample
        .update_desired_properties("thermostat-1")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_stale_etag_is_rejected() {
    let (registry, sample, _) = new_sample();
    sample.add_device("thermostat-1").await.unwrap();
    let etag = registry.twin("thermostat-1").unwrap().etag;

    sample
        .update_desired_properties_with_etag("thermostat-1", &etag)
        .await
        .unwrap();
    let err = sample
        .update_desired_properties_with_etag("thermostat-1", &etag)
        .await
        .unwrap_err();

    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_update_unknown_twin_is_not_found() {
    let (_registry, sample, _) = new_sample();
    let err = sample
        .update_desired_properties("missing")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_print_twins_reports_every_page() {
    let registry = Arc::new(InMemoryRegistry::new().with_default_page_size(2));
    for i in 0..5 {
        let (device, twin) = MockDevice::new(format!("device-{i}")).connected().build();
        registry.seed(device, twin);
    }
    let (sample, reporter) = sample_for(&registry, &hub_connection_string());

    let count = sample.print_twins().await.unwrap();

    assert_eq!(count, 5);
    let queries = registry
        .calls()
        .iter()
        .filter(|call| call.operation == Operation::QueryTwins)
        .count();
    assert_eq!(queries, 3);

    let lines = reporter.lines();
    assert_eq!(lines[0], "Querying devices:");
    assert_eq!(lines.len(), 6);
    assert!(lines[1].starts_with("\tdevice-0"));
    assert!(lines[1].contains("Connected"));
}

#[tokio::test]
async fn test_enumerate_twins_restarts_from_scratch() {
    let registry = Arc::new(InMemoryRegistry::new().with_default_page_size(2));
    for i in 0..3 {
        let (device, twin) = MockDevice::new(format!("device-{i}")).build();
        registry.seed(device, twin);
    }
    let (sample, _) = sample_for(&registry, &hub_connection_string());

    let mut partial = sample.enumerate_twins();
    assert_eq!(partial.next_page().await.unwrap().len(), 2);

    let all = sample.enumerate_twins().collect_all().await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].device_id, "device-0");

    assert_eq!(partial.next_page().await.unwrap().len(), 1);
    assert!(!partial.has_more_results());
}

// ============================================================================
// Host name and connection strings
// ============================================================================

#[test]
fn test_host_name_from_connection_string() {
    let (_registry, sample, _) = new_sample();
    assert_eq!(sample.host_name().unwrap(), TEST_HOST);
}

#[test]
fn test_builder_requires_connection_string() {
    let err = RegistryManagerSample::builder()
        .registry(Arc::new(InMemoryRegistry::new()))
        .build()
        .unwrap_err();
    assert!(matches!(err, SampleError::MissingConnectionString));
}

// ============================================================================
// run_sample
// ============================================================================

#[tokio::test]
async fn test_run_sample_hands_off_device_connection_string() {
    let (registry, sample, _) = new_sample();
    let messaging = RecordingMessaging::new();

    sample.run_sample(&messaging).await.unwrap();

    let runs = messaging.runs();
    assert_eq!(runs.len(), 1);
    let (connection, transport) = &runs[0];
    assert_eq!(*transport, DeviceTransport::Amqp);
    assert_eq!(connection.host_name, TEST_HOST);
    assert!(connection.device_id.starts_with(DEVICE_ID_PREFIX));
    assert!(!connection.shared_access_key.is_empty());

    let text = connection.to_string();
    assert!(text.starts_with(&format!(
        "HostName={TEST_HOST};DeviceId={DEVICE_ID_PREFIX}"
    )));
    assert!(text.contains(";SharedAccessKey="));

    assert_eq!(registry.device_count(), 0);
    assert_eq!(
        registry.call_count(Operation::RemoveDevice, &connection.device_id),
        1
    );
}

#[tokio::test]
async fn test_run_sample_generates_distinct_ids() {
    let (_registry, sample, _) = new_sample();
    let messaging = RecordingMessaging::new();

    sample.run_sample(&messaging).await.unwrap();
    sample.run_sample(&messaging).await.unwrap();

    let runs = messaging.runs();
    assert_ne!(runs[0].0.device_id, runs[1].0.device_id);
}

#[tokio::test]
async fn test_run_sample_passes_configured_transport() {
    let registry = Arc::new(InMemoryRegistry::new());
    let sample = RegistryManagerSample::builder()
        .registry(registry.clone())
        .connection_string(hub_connection_string())
        .transport(DeviceTransport::Mqtt)
        .reporter(Arc::new(RecordingReporter::new()))
        .build()
        .unwrap();
    let messaging = RecordingMessaging::new();

    sample
        .run_sample_with_device_id("d1", &messaging)
        .await
        .unwrap();

    assert_eq!(messaging.runs()[0].1, DeviceTransport::Mqtt);
}

#[tokio::test]
async fn test_failing_messaging_still_removes_device_once() {
    let (registry, sample, reporter) = new_sample();
    let messaging = FailingMessaging::new("link detached");

    let err = sample
        .run_sample_with_device_id("d1", &messaging)
        .await
        .unwrap_err();

    assert!(matches!(err, SampleError::Messaging(_)));
    assert_eq!(registry.call_count(Operation::RemoveDevice, "d1"), 1);
    assert!(registry.device("d1").is_none());
    assert!(reporter.contains("Remove device 'd1' . . . DONE"));
}

#[tokio::test]
async fn test_missing_host_name_still_removes_device() {
    let registry = Arc::new(InMemoryRegistry::new());
    let (sample, _) = sample_for(&registry, "SharedAccessKeyName=owner;SharedAccessKey=a2V5");
    let messaging = RecordingMessaging::new();

    let err = sample
        .run_sample_with_device_id("d1", &messaging)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SampleError::Registry(RegistryError::Parse { .. })
    ));
    assert!(messaging.runs().is_empty());
    assert_eq!(registry.call_count(Operation::RemoveDevice, "d1"), 1);
}

#[tokio::test]
async fn test_conflicting_add_keeps_existing_device() {
    let (registry, sample, _) = new_sample();
    let (device, twin) = MockDevice::new("d1").build();
    registry.seed(device, twin);
    let messaging = RecordingMessaging::new();

    let err = sample
        .run_sample_with_device_id("d1", &messaging)
        .await
        .unwrap_err();

    assert!(matches!(err, SampleError::Registry(ref e) if e.is_conflict()));
    assert_eq!(registry.call_count(Operation::RemoveDevice, "d1"), 0);
    assert!(registry.device("d1").is_some());
    assert!(messaging.runs().is_empty());
}

#[tokio::test]
async fn test_lost_add_response_still_removes_device() {
    let (registry, sample, _) = new_sample();
    registry.lose_response(Operation::AddDevice, "timed out");
    let messaging = RecordingMessaging::new();

    let err = sample.run_sample(&messaging).await.unwrap_err();

    assert!(matches!(
        err,
        SampleError::Registry(RegistryError::Transport { status: None, .. })
    ));
    assert!(err.to_string().contains("timed out"));
    assert!(messaging.runs().is_empty());
    assert_eq!(registry.device_count(), 0);
    let removals = registry
        .calls()
        .iter()
        .filter(|call| call.operation == Operation::RemoveDevice)
        .count();
    assert_eq!(removals, 1);
}

#[tokio::test]
async fn test_failed_add_keeps_add_error_when_nothing_to_remove() {
    let (registry, sample, reporter) = new_sample();
    registry.fail(Operation::AddDevice, "hub unavailable");
    let messaging = RecordingMessaging::new();

    let err = sample
        .run_sample_with_device_id("d1", &messaging)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SampleError::Registry(RegistryError::Transport {
            status: Some(503),
            ..
        })
    ));
    assert_eq!(registry.call_count(Operation::RemoveDevice, "d1"), 1);
    assert!(reporter.contains("Remove device 'd1' . . . FAILED"));
}

#[tokio::test]
async fn test_failed_add_and_failed_removal_are_combined() {
    let (registry, sample, _) = new_sample();
    registry.fail(Operation::AddDevice, "add timed out");
    registry.fail(Operation::RemoveDevice, "remove timed out");
    let messaging = RecordingMessaging::new();

    let err = sample
        .run_sample_with_device_id("d1", &messaging)
        .await
        .unwrap_err();

    match err {
        SampleError::CleanupFailed {
            original, cleanup, ..
        } => {
            assert!(original.to_string().contains("add timed out"));
            assert!(cleanup.to_string().contains("remove timed out"));
        }
        other => panic!("expected CleanupFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cleanup_failure_after_success_is_reported() {
    let (registry, sample, _) = new_sample();
    registry.fail(Operation::RemoveDevice, "hub unavailable");
    let messaging = RecordingMessaging::new();

    let err = sample
        .run_sample_with_device_id("d1", &messaging)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SampleError::Registry(RegistryError::Transport {
            status: Some(503),
            ..
        })
    ));
    assert_eq!(messaging.runs().len(), 1);
    assert!(registry.device("d1").is_some());
}

#[tokio::test]
async fn test_cleanup_failure_keeps_original_error() {
    let (registry, sample, _) = new_sample();
    registry.fail(Operation::RemoveDevice, "hub unavailable");
    let messaging = FailingMessaging::new("link detached");

    let err = sample
        .run_sample_with_device_id("d1", &messaging)
        .await
        .unwrap_err();

    match err {
        SampleError::CleanupFailed {
            device_id,
            original,
            cleanup,
        } => {
            assert_eq!(device_id, "d1");
            assert!(matches!(*original, SampleError::Messaging(_)));
            assert!(cleanup.to_string().contains("hub unavailable"));
        }
        other => panic!("expected CleanupFailed, got {other:?}"),
    }
    assert_eq!(registry.call_count(Operation::RemoveDevice, "d1"), 1);
}
