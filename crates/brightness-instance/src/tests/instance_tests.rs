use super::*;
use std::cell::Cell;
use std::sync::mpsc;

/// Names unique to this test process so parallel tests never collide.
fn unique(tag: &str) -> String {
    format!("DisplayBrightness_Test_{}_{}", tag, std::process::id())
}

// ── Owner / challenger ───────────────────────────────────────────

#[test]
fn first_acquire_is_owner() {
    let role = Role::acquire(&unique("owner"));
    assert!(role.is_owner());
}

#[test]
fn second_acquire_is_challenger() {
    let name = unique("challenger");
    let owner = Role::acquire(&name);
    assert!(owner.is_owner());
    let second = Role::acquire(&name);
    assert!(!second.is_owner());
}

#[test]
fn lock_released_on_drop() {
    let name = unique("release");
    let owner = Role::acquire(&name);
    assert!(owner.is_owner());
    drop(owner);
    assert!(Role::acquire(&name).is_owner());
}

#[test]
fn well_known_names() {
    assert_eq!(MUTEX_NAME, "DisplayBrightness_SingleInstance_Mutex");
    assert_eq!(PIPE_NAME, r"\\.\pipe\DisplayBrightness_Pipe");
}

// ── Activation pipe ──────────────────────────────────────────────

#[test]
fn signal_without_owner_is_swallowed() {
    let pipe = format!(r"\\.\pipe\{}", unique("nobody"));
    assert!(!signal_existing_instance(&pipe));
}

#[test]
fn challenger_signal_reaches_listener_once() {
    let pipe = format!(r"\\.\pipe\{}", unique("listen"));
    let (tx, rx) = mpsc::channel();
    let listener = ActivationListener::spawn(&pipe, move || {
        let _ = tx.send(());
    })
    .unwrap();

    assert!(signal_existing_instance(&pipe));
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

    listener.stop();
}

#[test]
fn listener_keeps_serving_after_a_signal() {
    let pipe = format!(r"\\.\pipe\{}", unique("repeat"));
    let (tx, rx) = mpsc::channel();
    let listener = ActivationListener::spawn(&pipe, move || {
        let _ = tx.send(());
    })
    .unwrap();

    for _ in 0..3 {
        assert!(signal_existing_instance(&pipe));
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }
    listener.stop();
}

// ── Supervision ──────────────────────────────────────────────────

#[test]
fn supervise_retries_after_failure() {
    let running = AtomicBool::new(true);
    let attempts = Cell::new(0);
    let failures = supervise(&running, Duration::from_millis(1), || {
        attempts.set(attempts.get() + 1);
        if attempts.get() >= 4 {
            running.store(false, Ordering::SeqCst);
            Ok(())
        } else {
            Err("pipe busy")
        }
    });
    assert_eq!(attempts.get(), 4);
    assert_eq!(failures, 3);
}

#[test]
fn supervise_not_started_when_stopped() {
    let running = AtomicBool::new(false);
    let failures = supervise(&running, Duration::from_millis(1), || -> Result<(), &str> {
        panic!("must not run");
    });
    assert_eq!(failures, 0);
}

#[test]
fn supervise_backs_off_between_failures() {
    let running = AtomicBool::new(true);
    let attempts = Cell::new(0);
    let start = std::time::Instant::now();
    supervise(&running, Duration::from_millis(30), || {
        attempts.set(attempts.get() + 1);
        if attempts.get() == 3 {
            running.store(false, Ordering::SeqCst);
        }
        Err("create failed")
    });
    // Two sleeps; the last failure sees the stop flag and skips its sleep.
    assert!(start.elapsed() >= Duration::from_millis(60));
}
