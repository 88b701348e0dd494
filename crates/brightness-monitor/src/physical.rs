//! Scoped access to the physical monitors behind a logical monitor.
//!
//! Every DDC/CI call needs a physical monitor handle from `dxva2.dll`, and
//! every handle array handed out by the OS must be destroyed again or the
//! driver eventually runs out of them. [`with_physical_monitors`] is the only
//! way this crate obtains handles: it acquires the array, runs one operation
//! against the first handle and releases the array on every exit path,
//! including unwinding.

use log::debug;
use std::ptr;
use thiserror::Error;
use windows::Win32::Foundation::BOOL;

// ============================================================================
// FFI: dxva2.dll
// ============================================================================

/// Opaque handle to a physical monitor.
pub type HANDLE = *mut std::ffi::c_void;

/// Physical monitor as returned by `GetPhysicalMonitorsFromHMONITOR`.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct PhysicalMonitor {
    pub handle: HANDLE,
    pub description: [u16; 128],
}

impl PhysicalMonitor {
    pub(crate) fn empty() -> Self {
        Self {
            handle: ptr::null_mut(),
            description: [0u16; 128],
        }
    }
}

#[link(name = "dxva2")]
extern "system" {
    fn GetNumberOfPhysicalMonitorsFromHMONITOR(h_monitor: isize, num_monitors: *mut u32) -> BOOL;

    fn GetPhysicalMonitorsFromHMONITOR(
        h_monitor: isize,
        array_size: u32,
        physical_monitors: *mut PhysicalMonitor,
    ) -> BOOL;

    fn DestroyPhysicalMonitors(array_size: u32, physical_monitors: *mut PhysicalMonitor) -> BOOL;

    pub(crate) fn GetMonitorBrightness(
        h_monitor: HANDLE,
        minimum: *mut u32,
        current: *mut u32,
        maximum: *mut u32,
    ) -> BOOL;

    pub(crate) fn SetMonitorBrightness(h_monitor: HANDLE, new_brightness: u32) -> BOOL;

    pub(crate) fn SetMonitorContrast(h_monitor: HANDLE, new_contrast: u32) -> BOOL;
}

// ============================================================================
// Acquisition
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PhysicalMonitorError {
    /// No physical monitor could be acquired for the logical monitor.
    #[error("no physical monitor available for this display")]
    Unsupported,
}

/// The three `dxva2` calls that acquire and release handle arrays.
pub trait PhysicalMonitorApi {
    /// Number of physical monitors behind `hmonitor`, or `None` on failure.
    fn count(&self, hmonitor: isize) -> Option<u32>;

    /// Fill `monitors` for `hmonitor`; false on failure.
    fn acquire(&self, hmonitor: isize, monitors: &mut [PhysicalMonitor]) -> bool;

    fn release(&self, monitors: &mut [PhysicalMonitor]);
}

/// The real `dxva2.dll` backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dxva2;

impl PhysicalMonitorApi for Dxva2 {
    fn count(&self, hmonitor: isize) -> Option<u32> {
        let mut count: u32 = 0;
        let ok = unsafe { GetNumberOfPhysicalMonitorsFromHMONITOR(hmonitor, &mut count) };
        ok.as_bool().then_some(count)
    }

    fn acquire(&self, hmonitor: isize, monitors: &mut [PhysicalMonitor]) -> bool {
        let ok = unsafe {
            GetPhysicalMonitorsFromHMONITOR(hmonitor, monitors.len() as u32, monitors.as_mut_ptr())
        };
        ok.as_bool()
    }

    fn release(&self, monitors: &mut [PhysicalMonitor]) {
        let ok = unsafe { DestroyPhysicalMonitors(monitors.len() as u32, monitors.as_mut_ptr()) };
        if !ok.as_bool() {
            debug!("DestroyPhysicalMonitors failed for {} handle(s)", monitors.len());
        }
    }
}

/// An acquired handle array; released on drop.
struct Acquired<'a, A: PhysicalMonitorApi + ?Sized> {
    api: &'a A,
    monitors: Vec<PhysicalMonitor>,
}

impl<A: PhysicalMonitorApi + ?Sized> Drop for Acquired<'_, A> {
    fn drop(&mut self) {
        self.api.release(&mut self.monitors);
    }
}

/// Run `body` against the first physical monitor behind `hmonitor`.
pub fn with_physical_monitors<R>(
    hmonitor: isize,
    body: impl FnOnce(HANDLE) -> R,
) -> Result<R, PhysicalMonitorError> {
    with_physical_monitors_using(&Dxva2, hmonitor, body)
}

/// [`with_physical_monitors`] over an explicit backend.
///
/// When the count is zero or acquisition fails, `body` is not invoked and
/// nothing is released. Otherwise the whole array is released after `body`
/// returns or unwinds. Only index 0 is ever addressed.
pub fn with_physical_monitors_using<A, R>(
    api: &A,
    hmonitor: isize,
    body: impl FnOnce(HANDLE) -> R,
) -> Result<R, PhysicalMonitorError>
where
    A: PhysicalMonitorApi + ?Sized,
{
    let count = match api.count(hmonitor) {
        Some(n) if n > 0 => n,
        _ => return Err(PhysicalMonitorError::Unsupported),
    };

    let mut monitors = vec![PhysicalMonitor::empty(); count as usize];
    if !api.acquire(hmonitor, &mut monitors) {
        return Err(PhysicalMonitorError::Unsupported);
    }

    let acquired = Acquired { api, monitors };
    let first = acquired.monitors[0].handle;
    Ok(body(first))
}

#[cfg(test)]
#[path = "tests/physical_tests.rs"]
mod tests;
