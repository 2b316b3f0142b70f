//! End-to-end publish cycle behavior against the mock transport and fake
//! sensors: payload shape, per-cycle fault isolation, publish failure
//! isolation, readiness gating, and cadence.

use chrono::NaiveDateTime;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use wxstation::config::StationConfig;
use wxstation::cycle::PublishCycle;
use wxstation::protocol::{SensorReport, TIMESTAMP_FORMAT};
use wxstation::sensors::SensorReadout;
use wxstation::testing::mocks::{
    FixedClimateProbe, FixedCpuTemp, FixedTemperatureProbe, FixedUptime, MockTransport,
    ScriptedTemperatureProbe,
};
use wxstation::StationAgent;

fn test_config(interval: Duration) -> Arc<StationConfig> {
    let mut config = StationConfig::from_lookup(|name| {
        match name {
            "MQTT_HOST" => Some("localhost"),
            "MQTT_PORT" => Some("1883"),
            "MQTT_USER" => Some("wx"),
            "MQTT_PASSWORD" => Some("wx"),
            _ => None,
        }
        .map(str::to_string)
    })
    .unwrap();
    config.read_interval = interval;
    Arc::new(config)
}

fn reference_readout(outside: Box<ScriptedTemperatureProbe>) -> SensorReadout {
    SensorReadout::new(
        outside,
        Box::new(FixedClimateProbe::new(55.3, 1013.25, 22.0)),
        Box::new(FixedCpuTemp::new(45.0)),
    )
}

#[tokio::test]
async fn test_one_cycle_end_to_end_payload() {
    let config = test_config(Duration::from_secs(5));
    let transport = MockTransport::connected();

    let readout = SensorReadout::new(
        Box::new(FixedTemperatureProbe::new(10.0)),
        Box::new(FixedClimateProbe::new(55.3, 1013.25, 22.0)),
        Box::new(FixedCpuTemp::new(45.0)),
    );
    let mut cycle = PublishCycle::new(
        config.clone(),
        readout,
        Box::new(FixedUptime::new("2 weeks, 3 days")),
    );

    cycle.run_once(&transport).await;

    let published = transport.published();
    assert_eq!(published.len(), 2);

    assert_eq!(published[0].topic, config.status_topic);
    assert_eq!(published[0].payload, b"Online");

    assert_eq!(published[1].topic, config.sensors_topic);
    let report: SensorReport = serde_json::from_slice(&published[1].payload).unwrap();
    assert_eq!(report.garage_humidity, 55.3);
    assert_eq!(report.pressure, 1013.3);
    assert_eq!(report.garage_temp, 71.6);
    assert_eq!(report.outside_temp, 50.0);
    assert_eq!(report.cpu_temp, 113.0);
    assert_eq!(report.system_uptime, "2 weeks, 3 days");

    // The timestamp must parse back through the wire format exactly.
    assert!(NaiveDateTime::parse_from_str(&report.last_message, TIMESTAMP_FORMAT).is_ok());
}

#[tokio::test]
async fn test_sensor_failure_skips_only_that_cycle() {
    let config = test_config(Duration::from_secs(5));
    let transport = MockTransport::connected();

    let outside = ScriptedTemperatureProbe::failing_on(10.0, &[3]);
    let calls = outside.calls();
    let mut cycle = PublishCycle::new(
        config.clone(),
        reference_readout(Box::new(outside)),
        Box::new(FixedUptime::new("up")),
    );

    for _ in 0..5 {
        cycle.run_once(&transport).await;
    }

    assert_eq!(calls.load(Ordering::SeqCst), 5);
    // Cycles 1, 2, 4, 5 published; cycle 3 published nothing.
    assert_eq!(transport.published_to(&config.sensors_topic).len(), 4);
    assert_eq!(transport.published_to(&config.status_topic).len(), 4);
}

#[tokio::test]
async fn test_loop_survives_sensor_failure() {
    let config = test_config(Duration::from_millis(20));
    let transport = MockTransport::connected();

    // First cycle fails; the loop must keep its cadence and recover.
    let outside = ScriptedTemperatureProbe::failing_on(10.0, &[1]);
    let mut cycle = PublishCycle::new(
        config.clone(),
        reference_readout(Box::new(outside)),
        Box::new(FixedUptime::new("up")),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let transport_view = transport.clone();
    let handle = tokio::spawn(async move {
        cycle.run(&transport, shutdown_rx).await;
    });

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while transport_view.published_to(&config.sensors_topic).is_empty() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "loop never recovered from the failed cycle"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_sensor_topic_failure_keeps_status_publish() {
    let config = test_config(Duration::from_secs(5));
    let transport = MockTransport::connected();
    transport.fail_topic(&config.sensors_topic);

    let mut cycle = PublishCycle::new(
        config.clone(),
        reference_readout(Box::new(ScriptedTemperatureProbe::failing_on(10.0, &[]))),
        Box::new(FixedUptime::new("up")),
    );

    cycle.run_once(&transport).await;
    cycle.run_once(&transport).await;

    // Both publishes attempted every cycle even though one topic fails.
    assert_eq!(transport.attempts(), 4);
    assert_eq!(transport.published_to(&config.status_topic).len(), 2);
    assert!(transport.published_to(&config.sensors_topic).is_empty());
}

#[tokio::test]
async fn test_no_sampling_before_connection_ready() {
    let config = test_config(Duration::from_millis(20));
    let transport = MockTransport::new();

    let outside = ScriptedTemperatureProbe::failing_on(10.0, &[]);
    let calls = outside.calls();
    let mut agent = StationAgent::new(
        config.clone(),
        transport.clone(),
        reference_readout(Box::new(outside)),
        Box::new(FixedUptime::new("up")),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        agent.initialize().await.unwrap();
        agent.run(shutdown_rx).await;
        agent
    });

    // Not ready yet: no sampling, no publishing.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(transport.attempts(), 0);

    transport.set_connected(true);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while transport.published().is_empty() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "cycle never started after the connection became ready"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(calls.load(Ordering::SeqCst) > 0);

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_cadence_tracks_interval() {
    let interval = Duration::from_millis(50);
    let config = test_config(interval);
    let transport = MockTransport::connected();

    let mut cycle = PublishCycle::new(
        config.clone(),
        reference_readout(Box::new(ScriptedTemperatureProbe::failing_on(10.0, &[]))),
        Box::new(FixedUptime::new("up")),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let transport_view = transport.clone();
    let handle = tokio::spawn(async move {
        cycle.run(&transport, shutdown_rx).await;
    });

    let window = Duration::from_millis(600);
    tokio::time::sleep(window).await;
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();

    let cycles = transport_view.published_to(&config.status_topic).len() as u32;
    assert!(cycles > 1, "expected multiple cycles in the window");

    // Average period should sit near the configured interval: not a tight
    // loop (far more cycles) and not unbounded drift (far fewer).
    let average = window / cycles;
    assert!(
        average >= Duration::from_millis(30) && average <= Duration::from_millis(100),
        "average period {average:?} too far from {interval:?} over {cycles} cycles"
    );
}
