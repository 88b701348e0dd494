//! Night mode via device gamma ramps.
//!
//! A ramp computed by [`brightness_core::ramp::GammaRamp`] is written with
//! `SetDeviceGammaRamp` to a device context created for one GDI device name.
//! Every failure here is a silent no-op: night mode is cosmetic and a display
//! that rejects the ramp simply stays untinted.
//!
//! [`NightModeEngine`] owns the persisted night-light colour.

mod engine;

pub use engine::NightModeEngine;

use brightness_core::config::NightLightColor;
use brightness_core::ramp::GammaRamp;
use log::{debug, info};
use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;
use windows::core::PCWSTR;
use windows::Win32::Graphics::Gdi::{CreateDCW, DeleteDC, HDC};
use windows::Win32::UI::ColorSystem::SetDeviceGammaRamp;

// ============================================================================
// Device context
// ============================================================================

/// A display device context, deleted on drop.
struct DeviceContext(HDC);

impl DeviceContext {
    fn create(device_name: &str) -> Option<Self> {
        let wide = to_wide(device_name);
        let hdc = unsafe { CreateDCW(PCWSTR::null(), PCWSTR(wide.as_ptr()), PCWSTR::null(), None) };
        if hdc.is_invalid() {
            debug!("CreateDCW({}) failed", device_name);
            None
        } else {
            Some(Self(hdc))
        }
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteDC(self.0);
        }
    }
}

// ============================================================================
// Apply
// ============================================================================

/// Write `ramp` to the display named `device_name`. Returns whether it was accepted.
pub fn apply_ramp(device_name: &str, ramp: &GammaRamp) -> bool {
    let Some(dc) = DeviceContext::create(device_name) else {
        return false;
    };
    let ok = unsafe { SetDeviceGammaRamp(dc.0, ramp as *const GammaRamp as *const _) };
    if !ok.as_bool() {
        debug!("SetDeviceGammaRamp({}) rejected", device_name);
    }
    ok.as_bool()
}

/// Tint (`enabled`) or restore the identity ramp on one display.
pub fn set_night_light(device_name: &str, enabled: bool, color: NightLightColor) -> bool {
    let applied = apply_ramp(device_name, &GammaRamp::for_state(enabled, color));
    if applied {
        info!(
            "Night light {} on {}",
            if enabled { "on" } else { "off" },
            device_name
        );
    }
    applied
}

/// Re-enumerate monitors and apply the ramp to every one of them.
///
/// Independent of any cached display list. Returns how many displays
/// accepted the ramp.
pub fn apply_to_all(enabled: bool, color: NightLightColor) -> usize {
    let ramp = GammaRamp::for_state(enabled, color);
    let names = brightness_monitor::ddc::device_names();
    let applied = names.iter().filter(|name| apply_ramp(name, &ramp)).count();
    info!(
        "Night light {} applied to {}/{} display(s)",
        if enabled { "on" } else { "off" },
        applied,
        names.len()
    );
    applied
}

/// Convert a Rust string to a null-terminated wide string (UTF-16).
fn to_wide(s: &str) -> Vec<u16> {
    OsStr::new(s)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

#[cfg(test)]
#[path = "tests/gamma_tests.rs"]
mod tests;
