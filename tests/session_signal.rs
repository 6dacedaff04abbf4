//! Named session signal across threads of one process.
//!
//! Every test binds its own name so tests can run in parallel.

mod common;

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use interprocess::local_socket::traits::Stream as _;
use interprocess::local_socket::{GenericNamespaced, Stream, ToNsName};

use wakeguard::session::{signal, SessionSignal, SignalError, SignalState};

use common::unique_name;

#[test]
fn deadline_sets_the_signal() {
    let name = unique_name("deadline");
    let mut session = SessionSignal::begin(&name).expect("begin");
    assert_eq!(session.state(), SignalState::Unset);

    let started = Instant::now();
    session
        .wait(Some(Duration::from_millis(200)))
        .expect("wait");

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(200), "woke after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "woke after {elapsed:?}");
    assert_eq!(session.state(), SignalState::Set);
}

#[test]
fn external_signal_wins_over_deadline() {
    let name = unique_name("external");
    let mut session = SessionSignal::begin(&name).expect("begin");

    let sender = {
        let name = name.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            signal(&name)
        })
    };

    let started = Instant::now();
    session.wait(Some(Duration::from_secs(30))).expect("wait");
    assert!(started.elapsed() < Duration::from_secs(5));
    sender.join().expect("sender thread").expect("signal");

    // Already set: returns at once, deadline or not.
    let started = Instant::now();
    session.wait(Some(Duration::from_secs(30))).expect("wait again");
    session.wait(None).expect("wait without deadline");
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[test]
fn signalling_a_missing_session_is_not_found() {
    let name = unique_name("missing");
    match signal(&name) {
        Err(SignalError::SignalNotFound { name: missing }) => assert_eq!(missing, name),
        other => panic!("expected SignalNotFound, got {other:?}"),
    }
}

#[test]
fn name_cannot_be_claimed_twice() {
    let name = unique_name("double");
    let _first = SessionSignal::begin(&name).expect("begin");
    assert!(matches!(
        SessionSignal::begin(&name),
        Err(SignalError::ResourceCreationFailed { .. })
    ));
}

#[test]
fn dropping_the_owner_releases_the_name() {
    let name = unique_name("release");
    drop(SessionSignal::begin(&name).expect("begin"));

    assert!(matches!(
        signal(&name),
        Err(SignalError::SignalNotFound { .. })
    ));
    let again = SessionSignal::begin(&name).expect("name reusable after drop");
    assert_eq!(again.name(), name);
}

#[test]
fn silent_connection_does_not_hold_back_deadline() {
    let name = unique_name("silent");
    let mut session = SessionSignal::begin(&name).expect("begin");

    let ns_name = name
        .as_str()
        .to_ns_name::<GenericNamespaced>()
        .expect("socket name");
    let _silent = Stream::connect(ns_name).expect("connect");

    let (done, finished) = mpsc::channel();
    thread::spawn(move || {
        let started = Instant::now();
        let result = session.wait(Some(Duration::from_millis(200)));
        let _ = done.send((result.is_ok(), started.elapsed()));
    });

    let (ok, elapsed) = finished
        .recv_timeout(Duration::from_secs(3))
        .expect("wait stayed blocked behind a silent connection");
    assert!(ok);
    assert!(elapsed < Duration::from_secs(2), "woke after {elapsed:?}");
}

#[test]
fn silent_connection_does_not_hold_back_external_signal() {
    let name = unique_name("silent-external");
    let mut session = SessionSignal::begin(&name).expect("begin");

    let ns_name = name
        .as_str()
        .to_ns_name::<GenericNamespaced>()
        .expect("socket name");
    let _silent = Stream::connect(ns_name).expect("connect");
    signal(&name).expect("signal");

    let started = Instant::now();
    session.wait(None).expect("wait");
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(session.state(), SignalState::Set);
}
