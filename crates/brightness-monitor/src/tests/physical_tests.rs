use super::*;
use std::cell::{Cell, RefCell};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Scripted backend that records every release.
struct FakeApi {
    count: Option<u32>,
    acquire_ok: bool,
    released: RefCell<Vec<Vec<usize>>>,
}

impl FakeApi {
    fn with_count(count: u32) -> Self {
        Self {
            count: Some(count),
            acquire_ok: true,
            released: RefCell::new(Vec::new()),
        }
    }
}

impl PhysicalMonitorApi for FakeApi {
    fn count(&self, _hmonitor: isize) -> Option<u32> {
        self.count
    }

    fn acquire(&self, _hmonitor: isize, monitors: &mut [PhysicalMonitor]) -> bool {
        for (i, m) in monitors.iter_mut().enumerate() {
            m.handle = (0x100 + i) as HANDLE;
        }
        self.acquire_ok
    }

    fn release(&self, monitors: &mut [PhysicalMonitor]) {
        self.released
            .borrow_mut()
            .push(monitors.iter().map(|m| m.handle as usize).collect());
    }
}

// ── Success path ─────────────────────────────────────────────────

#[test]
fn body_receives_first_handle() {
    let api = FakeApi::with_count(2);
    let handle = with_physical_monitors_using(&api, 1, |h| h as usize).unwrap();
    assert_eq!(handle, 0x100);
}

#[test]
fn whole_array_released_after_success() {
    let api = FakeApi::with_count(3);
    with_physical_monitors_using(&api, 1, |_| ()).unwrap();
    assert_eq!(api.released.borrow().as_slice(), &[vec![0x100, 0x101, 0x102]]);
}

#[test]
fn released_when_body_reports_failure() {
    let api = FakeApi::with_count(1);
    let result: Result<Result<(), &str>, _> =
        with_physical_monitors_using(&api, 1, |_| Err("no DDC reply"));
    assert_eq!(result, Ok(Err("no DDC reply")));
    assert_eq!(api.released.borrow().len(), 1);
}

#[test]
fn released_when_body_panics() {
    let api = FakeApi::with_count(1);
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let _ = with_physical_monitors_using(&api, 1, |_| -> () { panic!("driver fault") });
    }));
    assert!(outcome.is_err());
    assert_eq!(api.released.borrow().len(), 1);
}

// ── Unsupported path ─────────────────────────────────────────────

#[test]
fn zero_count_is_unsupported_without_body() {
    let api = FakeApi::with_count(0);
    let called = Cell::new(false);
    let result = with_physical_monitors_using(&api, 1, |_| called.set(true));
    assert_eq!(result, Err(PhysicalMonitorError::Unsupported));
    assert!(!called.get());
    assert!(api.released.borrow().is_empty());
}

#[test]
fn count_failure_is_unsupported() {
    let api = FakeApi {
        count: None,
        acquire_ok: true,
        released: RefCell::new(Vec::new()),
    };
    assert_eq!(
        with_physical_monitors_using(&api, 1, |_| ()),
        Err(PhysicalMonitorError::Unsupported)
    );
}

#[test]
fn acquisition_failure_is_unsupported_without_body() {
    let api = FakeApi {
        count: Some(1),
        acquire_ok: false,
        released: RefCell::new(Vec::new()),
    };
    let called = Cell::new(false);
    let result = with_physical_monitors_using(&api, 1, |_| called.set(true));
    assert_eq!(result, Err(PhysicalMonitorError::Unsupported));
    assert!(!called.get());
}

#[test]
fn physical_monitor_has_dxva2_layout() {
    assert_eq!(
        std::mem::size_of::<PhysicalMonitor>(),
        std::mem::size_of::<HANDLE>() + 256
    );
}
