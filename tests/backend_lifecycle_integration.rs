//! Integration tests for the acquisition session lifecycle
//!
//! These tests validate the state machine end to end:
//! - Connection and detection failures are fatal and close the transport
//! - A stop request exits cleanly from any phase
//! - A disconnect ends the session exactly once

mod common;

use common::builders::ConfigBuilder;
use common::mock_helpers::{collect_until_ended, ended_count, run_scripted_unlogged};
use common::test_timeout;
use serialgraph::backend::{
    AcquisitionBackend, AcquisitionEvent, AfterScript, NullSink, ScriptedTransport,
};
use serialgraph::{SerialGraphError, SessionState};
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

#[test]
fn test_connection_failure_ends_session() {
    let transport = ScriptedTransport::new(["1,2\n"]).failing_open("port busy");
    let counter = transport.close_counter();
    let (outcome, frontend) = run_scripted_unlogged(ConfigBuilder::new().build(), transport);

    assert_eq!(outcome.state, SessionState::Exited);
    assert_eq!(outcome.exit_code(), 1);
    assert!(matches!(
        outcome.error,
        Some(SerialGraphError::Connection { .. })
    ));
    // never opened
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert!(frontend.store().is_none());

    let events = collect_until_ended(&frontend);
    assert_eq!(ended_count(&events), 1);
    assert!(!events
        .iter()
        .any(|e| matches!(e, AcquisitionEvent::StateChanged(SessionState::Streaming))));
}

#[test]
fn test_detection_failure_closes_transport() {
    let transport = ScriptedTransport::new(["no terminator yet"]);
    let counter = transport.close_counter();
    let (outcome, frontend) = run_scripted_unlogged(ConfigBuilder::new().build(), transport);

    assert!(matches!(
        outcome.error,
        Some(SerialGraphError::DetectionFailure { lines: 0, .. })
    ));
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(outcome.state, SessionState::Exited);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!(frontend.session().failure().is_some());
}

#[test]
fn test_stop_while_streaming() {
    let transport = ScriptedTransport::new(["1,2\n", "3,4\n"]);
    let counter = transport.close_counter();
    let (backend, frontend) = AcquisitionBackend::new(
        ConfigBuilder::new().columns(2).build(),
        Box::new(transport),
        Box::new(NullSink),
    );
    let handle = backend.spawn().unwrap();

    assert_eq!(
        frontend.wait_for_streaming(test_timeout()),
        SessionState::Streaming
    );
    thread::sleep(Duration::from_millis(20));
    frontend.shutdown();

    let outcome = handle.join().expect("worker should exit cleanly");
    assert_eq!(outcome.state, SessionState::Exited);
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(frontend.store().unwrap().len(), 2);
}

#[test]
fn test_stop_during_detection() {
    // lines never complete, so detection would wait for its whole timeout
    let transport = ScriptedTransport::new(["1,2,3"]);
    let mut config = ConfigBuilder::new().build();
    config.detection.timeout_ms = 60_000;
    let (backend, frontend) =
        AcquisitionBackend::new(config, Box::new(transport), Box::new(NullSink));
    let handle = backend.spawn().unwrap();

    let state = frontend
        .session()
        .wait_until(test_timeout(), |s| s == SessionState::DetectingColumns);
    assert_eq!(state, SessionState::DetectingColumns);
    frontend.shutdown();

    let outcome = handle.join().unwrap();
    assert_eq!(outcome.state, SessionState::Exited);
    assert!(outcome.error.is_none());
    assert!(frontend.store().is_none());
}

#[test]
fn test_disconnect_is_reported_exactly_once() {
    let transport = ScriptedTransport::new(["1,2\n3,4\n"]).after_script(AfterScript::Unplug);
    let counter = transport.close_counter();
    let config = ConfigBuilder::new().columns(2).grace_ms(40).build();
    let (outcome, frontend) = run_scripted_unlogged(config, transport);

    assert_eq!(outcome.state, SessionState::Disconnected);
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    let events = frontend.drain();
    let disconnects = events
        .iter()
        .filter(|e| matches!(e, AcquisitionEvent::StateChanged(SessionState::Disconnected)))
        .count();
    assert_eq!(disconnects, 1);
    assert_eq!(ended_count(&events), 1);
    assert!(matches!(
        events.last(),
        Some(AcquisitionEvent::Ended {
            state: SessionState::Disconnected,
            error: Some(_)
        })
    ));

    // terminal states are final
    assert!(!frontend.session().transition(SessionState::Streaming));
}

#[test]
fn test_state_sequence() {
    let transport = ScriptedTransport::new(["5,6\n"]).after_script(AfterScript::Unplug);
    let config = ConfigBuilder::new().detection_lines(1).grace_ms(20).build();
    let (_outcome, frontend) = run_scripted_unlogged(config, transport);

    let states: Vec<SessionState> = frontend
        .drain()
        .into_iter()
        .filter_map(|e| match e {
            AcquisitionEvent::StateChanged(s) => Some(s),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            SessionState::Connecting,
            SessionState::DetectingColumns,
            SessionState::Streaming,
            SessionState::Disconnected
        ]
    );
}
