//! Spawn failures, unexpected exits and shutdown of the calculator process.

mod common;

use calcpipe::child::{ChildProcess, ChildSpawnConfig, SupervisorError};
use calcpipe::protocol::ProtocolSettings;
use calcpipe::session::SessionError;
use calcpipe::shutdown::{ShutdownCoordinator, ShutdownPhase};
use common::{launch_stub, stub_spawn, CRASH_ON_INPUT, EXIT_IMMEDIATELY, IGNORES_QUIT};
use std::time::{Duration, Instant};

const POLL: Duration = Duration::from_millis(10);

#[test]
fn missing_executable_is_a_spawn_error() {
    let spawn = ChildSpawnConfig::new("/nonexistent/calculator-xyz", vec!["-u".to_string()]);
    match ChildProcess::launch(&spawn) {
        Err(SupervisorError::Spawn { program, .. }) => {
            assert_eq!(program, "/nonexistent/calculator-xyz");
        }
        Err(other) => panic!("expected Spawn error, got {:?}", other),
        Ok(_) => panic!("launch should fail"),
    }
}

#[test]
fn pipes_are_handed_out_once() {
    let mut child = ChildProcess::launch(&stub_spawn(IGNORES_QUIT)).unwrap();
    assert!(child.pid() > 0);
    let _channel = child.open_channel(ProtocolSettings::default()).unwrap();
    assert!(matches!(
        child.open_channel(ProtocolSettings::default()),
        Err(SupervisorError::PipesUnavailable)
    ));

    let coordinator = ShutdownCoordinator::new();
    child
        .shutdown(Duration::ZERO, POLL, &coordinator)
        .unwrap();
}

#[test]
fn child_exiting_before_prompt_is_a_startup_failure() {
    let (mut child, mut session) = launch_stub(EXIT_IMMEDIATELY, Duration::from_secs(1));

    let err = session.await_ready(Duration::from_secs(5)).unwrap_err();
    assert!(err.is_child_gone(), "unexpected error: {:?}", err);

    assert!(child.liveness().wait_for_exit(Duration::from_secs(5), POLL));
    assert!(!child.is_alive());

    let coordinator = ShutdownCoordinator::new();
    session.finish(&coordinator);
    let status = child.shutdown(Duration::from_secs(1), POLL, &coordinator).unwrap();
    assert_eq!(status.code(), Some(3));
}

#[test]
fn crash_mid_session_reports_closed_stream_then_refuses() {
    let (mut child, mut session) = launch_stub(CRASH_ON_INPUT, Duration::from_secs(2));
    session.await_ready(Duration::from_secs(5)).unwrap();

    let err = session.submit_line("1+1").unwrap_err();
    assert!(err.is_child_gone(), "unexpected error: {:?}", err);

    // The exit watcher flips the flag without any help from the session.
    assert!(child.liveness().wait_for_exit(Duration::from_secs(5), POLL));

    let start = Instant::now();
    let err = session.submit_line("2+2").unwrap_err();
    assert!(matches!(err, SessionError::ChildExited));
    assert!(start.elapsed() < Duration::from_millis(100));

    let coordinator = ShutdownCoordinator::new();
    session.finish(&coordinator);
    let status = child.shutdown(Duration::from_secs(1), POLL, &coordinator).unwrap();
    assert_eq!(status.code(), Some(3));

    // Reaped exactly once; asking again returns the same status.
    let again = child.shutdown(Duration::from_secs(1), POLL, &coordinator).unwrap();
    assert_eq!(again, status);
}

#[test]
fn child_ignoring_quit_is_killed_after_grace_period() {
    let (mut child, mut session) = launch_stub(IGNORES_QUIT, Duration::from_secs(1));
    session.await_ready(Duration::from_secs(5)).unwrap();

    let coordinator = ShutdownCoordinator::new();
    coordinator.signal();
    session.finish(&coordinator);
    assert_eq!(coordinator.phase(), ShutdownPhase::SendingQuit);

    let start = Instant::now();
    let status = child
        .shutdown(Duration::from_millis(200), POLL, &coordinator)
        .unwrap();
    assert!(!status.success());
    assert_eq!(status.code(), None);
    assert!(start.elapsed() >= Duration::from_millis(200));
    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(coordinator.phase(), ShutdownPhase::Complete);
    assert!(!child.is_alive());
}
