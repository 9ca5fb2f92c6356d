//! Integration tests for probes and the probe pool
//!
//! These tests run real probes against fake peers on loopback:
//! - Unreachable peers produce error reports on every cool-down
//! - Timer events carry the window maximum
//! - The pool staggers probe starts and stops cleanly
//! - A fresh connection to a real responder is echoed without accept delay

mod common;

use common::builders::{fast_pipeline, fast_probe};
use common::mock_helpers::{FakeEchoServer, RecordingReporter};
use common::{free_endpoint, wait_for};
use serial_test::serial;
use std::net::TcpListener;
use std::thread;
use std::time::{Duration, Instant};
use tcp_beep::config::{ProbeSettings, ResponderSettings};
use tcp_beep::{
    EchoResponder, Endpoint, EventPipeline, Probe, ProbePool, ProbeState, ReporterRegistry,
    StatKind,
};

fn recording_pipeline() -> (EventPipeline, RecordingReporter) {
    let recorder = RecordingReporter::new();
    let mut pipeline = EventPipeline::new(
        ReporterRegistry::new().with(Box::new(recorder.clone())),
        fast_pipeline(),
    );
    pipeline.start().unwrap();
    (pipeline, recorder)
}

#[test]
#[serial]
fn test_closed_port_reports_errors_only() {
    let (mut pipeline, recorder) = recording_pipeline();
    let mut probe = Probe::new(free_endpoint(), fast_probe(100.0, 5), pipeline.publisher());

    probe.start().unwrap();
    thread::sleep(Duration::from_millis(550));
    probe.stop();
    pipeline.stop();

    // cooldown is 100ms, so roughly one error per 100ms
    assert!(recorder.count(StatKind::ErrorReport) >= 3);
    assert_eq!(recorder.count(StatKind::Timer), 0);
    assert_eq!(probe.state(), ProbeState::Stopped);
}

#[test]
#[serial]
fn test_timer_is_window_maximum() {
    // Third of every five echoes is held back 50ms
    let server = FakeEchoServer::start(|n| {
        if n % 5 == 3 {
            Duration::from_millis(50)
        } else {
            Duration::ZERO
        }
    });
    let (mut pipeline, recorder) = recording_pipeline();
    let mut probe = Probe::new(server.endpoint(), fast_probe(100.0, 5), pipeline.publisher());

    probe.start().unwrap();
    assert!(wait_for(Duration::from_secs(5), || {
        recorder.count(StatKind::Timer) >= 2
    }));
    assert_eq!(probe.state(), ProbeState::Probing);
    probe.stop();
    pipeline.stop();

    let timers = recorder.timer_values();
    assert!(timers.len() >= 2);
    // Full windows all contain one delayed echo
    for rtt in &timers[..2] {
        assert!(*rtt >= 50.0, "window max {} below injected delay", rtt);
        assert!(*rtt < 500.0);
    }
    assert_eq!(recorder.count(StatKind::ErrorReport), 0);
}

#[test]
#[serial]
fn test_stop_mid_window_sends_sentinel_and_keeps_partial_window() {
    let server = FakeEchoServer::echo();
    let (mut pipeline, recorder) = recording_pipeline();
    // Window of 1000 at 50/s never completes during the test
    let mut probe = Probe::new(server.endpoint(), fast_probe(50.0, 1000), pipeline.publisher());

    probe.start().unwrap();
    assert!(wait_for(Duration::from_secs(2), || probe.state() == ProbeState::Probing));
    thread::sleep(Duration::from_millis(200));

    let started = Instant::now();
    probe.stop();
    assert!(started.elapsed() < Duration::from_secs(1), "stop must interrupt the jitter sleep");
    pipeline.stop();

    assert_eq!(recorder.count(StatKind::Timer), 1);
    assert_eq!(recorder.count(StatKind::ErrorReport), 0);
}

#[test]
#[serial]
fn test_pool_stagger_orders_connections() {
    let servers: Vec<FakeEchoServer> = (0..3).map(|_| FakeEchoServer::echo()).collect();
    let peers = servers.iter().map(|s| s.endpoint()).collect();
    let (mut pipeline, _recorder) = recording_pipeline();

    // window 0.5s over 3 peers: stagger up to ~333ms
    let mut pool = ProbePool::new(peers, fast_probe(10.0, 5), pipeline.publisher());
    let started = Instant::now();
    pool.start().unwrap();
    let stagger = pool.stagger_delay().unwrap();
    assert!(stagger < Duration::from_millis(334));

    assert!(wait_for(Duration::from_secs(3), || {
        servers.iter().all(|s| !s.accepted_at().is_empty())
    }));

    for (i, server) in servers.iter().enumerate() {
        let first = server.accepted_at()[0];
        assert!(
            first.duration_since(started) >= stagger * i as u32,
            "probe {} connected before its stagger slot",
            i
        );
    }

    pool.stop();
    pipeline.stop();
}

#[test]
#[serial]
fn test_pool_double_stop() {
    let server = FakeEchoServer::echo();
    let (mut pipeline, recorder) = recording_pipeline();
    let mut pool = ProbePool::new(
        vec![server.endpoint(), free_endpoint()],
        fast_probe(50.0, 5),
        pipeline.publisher(),
    );

    pool.start().unwrap();
    thread::sleep(Duration::from_millis(300));
    pool.stop();
    assert!(wait_for(Duration::from_secs(1), || pipeline.pending() == 0));
    let after_first = recorder.events().len();

    let started = Instant::now();
    pool.stop();
    assert!(started.elapsed() < Duration::from_millis(100));
    thread::sleep(Duration::from_millis(150));
    assert_eq!(recorder.events().len(), after_first);

    assert!(pool
        .probes()
        .iter()
        .all(|p| p.state() == ProbeState::Stopped));
    pipeline.stop();
}

#[test]
#[serial]
fn test_dropped_connection_is_connecting_during_cooldown() {
    // Accepts one connection and closes it straight away
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let peer = Endpoint::from(listener.local_addr().unwrap());
    let closer = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        drop(stream);
        listener
    });

    let (mut pipeline, recorder) = recording_pipeline();
    let settings = ProbeSettings {
        cooldown_ms: 5000,
        ..fast_probe(50.0, 5)
    };
    let mut probe = Probe::new(peer, settings, pipeline.publisher());

    probe.start().unwrap();
    assert!(wait_for(Duration::from_secs(2), || {
        recorder.count(StatKind::ErrorReport) >= 1
    }));
    assert_eq!(probe.state(), ProbeState::Connecting);

    probe.stop();
    pipeline.stop();
    assert_eq!(probe.state(), ProbeState::Stopped);
    drop(closer.join().unwrap());
}

#[test]
#[serial]
fn test_first_window_after_connect_has_no_accept_delay() {
    // Default responder settings, as a deployed node runs them
    let mut responder =
        EchoResponder::bind(&Endpoint::new("127.0.0.1", 0), ResponderSettings::default()).unwrap();
    responder.start().unwrap();
    let peer = Endpoint::from(responder.local_addr());
    let (mut pipeline, recorder) = recording_pipeline();

    let mut first_windows = Vec::new();
    for _ in 0..8 {
        let seen = recorder.timer_values().len();
        let mut probe = Probe::new(peer.clone(), fast_probe(1000.0, 1), pipeline.publisher());
        probe.start().unwrap();
        assert!(wait_for(Duration::from_secs(2), || {
            recorder.timer_values().len() > seen
        }));
        first_windows.push(recorder.timer_values()[seen]);
        probe.stop();
    }

    responder.stop();
    pipeline.stop();

    for rtt in &first_windows {
        assert!(*rtt < 20.0, "first window {}ms after connect: {:?}", rtt, first_windows);
    }
    assert_eq!(recorder.count(StatKind::ErrorReport), 0);
}
