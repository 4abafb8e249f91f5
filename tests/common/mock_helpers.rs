//! Backend construction helpers

use super::test_timeout;
use serialgraph::backend::{
    AcquisitionBackend, AcquisitionEvent, FrontendReceiver, LogSink, NullSink, ScriptedTransport,
};
use serialgraph::config::AppConfig;
use serialgraph::SessionOutcome;

/// Run a scripted session to completion on the current thread
pub fn run_scripted(
    config: AppConfig,
    transport: ScriptedTransport,
    sink: Box<dyn LogSink>,
) -> (SessionOutcome, FrontendReceiver) {
    let (backend, frontend) = AcquisitionBackend::new(config, Box::new(transport), sink);
    let outcome = backend.run();
    (outcome, frontend)
}

/// Same as [`run_scripted`] without a log
pub fn run_scripted_unlogged(
    config: AppConfig,
    transport: ScriptedTransport,
) -> (SessionOutcome, FrontendReceiver) {
    run_scripted(config, transport, Box::new(NullSink))
}

/// Collect events until `Ended` (inclusive) or the test timeout
pub fn collect_until_ended(frontend: &FrontendReceiver) -> Vec<AcquisitionEvent> {
    let mut events = Vec::new();
    while let Some(event) = frontend.recv_timeout(test_timeout()) {
        let ended = matches!(event, AcquisitionEvent::Ended { .. });
        events.push(event);
        if ended {
            break;
        }
    }
    events
}

/// Number of `Ended` events in `events`
pub fn ended_count(events: &[AcquisitionEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, AcquisitionEvent::Ended { .. }))
        .count()
}
