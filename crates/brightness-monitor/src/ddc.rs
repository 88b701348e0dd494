//! DDC/CI discovery and brightness control for external monitors.
//!
//! Enumerates every logical monitor with `EnumDisplayMonitors`, resolves its
//! GDI device name and PnP identity, and reads the brightness range through
//! the Monitor Configuration API (`dxva2.dll`). Every handle is obtained via
//! [`crate::physical::with_physical_monitors`].
//!
//! All functions are safe to call without admin rights; DDC/CI only needs
//! access to the display adapter.

use brightness_core::display::{BrightnessRange, Display, UNKNOWN_DISPLAY_NAME};
use log::{debug, info, warn};
use std::error::Error;
use std::ffi::OsStr;
use std::io;
use std::os::windows::ffi::OsStrExt;

use windows::core::PCWSTR;
use windows::Win32::Foundation::{BOOL, LPARAM, RECT};
use windows::Win32::Graphics::Gdi::{
    EnumDisplayDevicesW, EnumDisplayMonitors, GetMonitorInfoW, DISPLAY_DEVICEW,
    DISPLAY_DEVICE_ACTIVE, HDC, HMONITOR, MONITORINFO, MONITORINFOEXW,
};

use crate::physical::{
    with_physical_monitors, GetMonitorBrightness, SetMonitorBrightness, SetMonitorContrast,
    HANDLE,
};

// ============================================================================
// Discovery
// ============================================================================

/// Discover every logical monitor as a [`Display`].
///
/// Never fails. A monitor whose brightness cannot be read still appears,
/// with brightness unsupported.
pub fn discover_external() -> Vec<Display> {
    let hmonitors = match enumerate_hmonitors() {
        Ok(h) => h,
        Err(e) => {
            warn!("DDC discovery failed: {}", e);
            return Vec::new();
        }
    };

    let displays: Vec<Display> = hmonitors.into_iter().filter_map(describe_monitor).collect();
    info!("DDC discovery found {} display(s)", displays.len());
    displays
}

/// GDI device names of every logical monitor, in enumeration order.
pub fn device_names() -> Vec<String> {
    match enumerate_hmonitors() {
        Ok(hmonitors) => hmonitors
            .into_iter()
            .filter_map(|h| monitor_info(h).map(|info| info.device_name))
            .collect(),
        Err(e) => {
            warn!("Monitor enumeration failed: {}", e);
            Vec::new()
        }
    }
}

fn describe_monitor(hmonitor: isize) -> Option<Display> {
    let info = monitor_info(hmonitor)?;
    debug!(
        "Monitor {} work area ({}, {})-({}, {})",
        info.device_name,
        info.work_area.left,
        info.work_area.top,
        info.work_area.right,
        info.work_area.bottom
    );

    let (friendly_name, monitor_id) = match display_device(&info.device_name) {
        Some(dev) => (dev.friendly_name, Some(dev.device_id)),
        None => (UNKNOWN_DISPLAY_NAME.to_string(), None),
    };

    let reading = with_physical_monitors(hmonitor, read_brightness);
    let display = match reading {
        Ok(Ok((range, current))) => {
            Display::ddc(friendly_name, info.device_name, monitor_id, range, current)
        }
        Ok(Err(e)) => {
            debug!("{}: brightness unavailable: {}", info.device_name, e);
            unsupported(friendly_name, info.device_name, monitor_id)
        }
        Err(e) => {
            debug!("{}: {}", info.device_name, e);
            unsupported(friendly_name, info.device_name, monitor_id)
        }
    };
    Some(display)
}

fn unsupported(friendly_name: String, device_name: String, monitor_id: Option<String>) -> Display {
    let mut display = Display::unsupported(friendly_name, device_name);
    display.monitor_id = monitor_id;
    display
}

/// Read `(range, current)` from a physical monitor handle. Does NOT release it.
fn read_brightness(handle: HANDLE) -> Result<(BrightnessRange, u32), Box<dyn Error>> {
    let mut min: u32 = 0;
    let mut current: u32 = 0;
    let mut max: u32 = 0;

    let ok = unsafe { GetMonitorBrightness(handle, &mut min, &mut current, &mut max) };
    if !ok.as_bool() {
        let err = io::Error::last_os_error();
        return Err(format!("GetMonitorBrightness failed: {}", err).into());
    }

    let range = BrightnessRange::new(min, max)
        .ok_or_else(|| format!("degenerate brightness range {}..{}", min, max))?;
    Ok((range, current))
}

// ============================================================================
// Control
// ============================================================================

/// Set brightness (and contrast to the same value) on the monitor named `device_name`.
pub fn set_brightness(device_name: &str, value: u32) -> Result<(), Box<dyn Error>> {
    let hmonitor = find_hmonitor(device_name)?
        .ok_or_else(|| format!("no monitor named {}", device_name))?;

    with_physical_monitors(hmonitor, |handle| write_brightness(handle, value))??;
    info!("DDC brightness set to {} on {}", value, device_name);
    Ok(())
}

/// Write brightness then contrast. Does NOT release the handle.
fn write_brightness(handle: HANDLE, value: u32) -> Result<(), Box<dyn Error>> {
    let ok = unsafe { SetMonitorBrightness(handle, value) };
    if !ok.as_bool() {
        let err = io::Error::last_os_error();
        return Err(format!("SetMonitorBrightness({}) failed: {}", value, err).into());
    }

    let ok = unsafe { SetMonitorContrast(handle, value) };
    if !ok.as_bool() {
        let err = io::Error::last_os_error();
        debug!("SetMonitorContrast({}) failed: {}", value, err);
    }
    Ok(())
}

fn find_hmonitor(device_name: &str) -> Result<Option<isize>, Box<dyn Error>> {
    Ok(enumerate_hmonitors()?.into_iter().find(|&h| {
        monitor_info(h)
            .map(|info| info.device_name.eq_ignore_ascii_case(device_name))
            .unwrap_or(false)
    }))
}

// ============================================================================
// Internal helpers
// ============================================================================

struct MonitorInfo {
    device_name: String,
    work_area: RECT,
}

struct DisplayDevice {
    friendly_name: String,
    device_id: String,
}

fn monitor_info(hmonitor: isize) -> Option<MonitorInfo> {
    let mut mi = MONITORINFOEXW::default();
    mi.monitorInfo.cbSize = std::mem::size_of::<MONITORINFOEXW>() as u32;

    let ok = unsafe {
        GetMonitorInfoW(
            HMONITOR(hmonitor as *mut std::ffi::c_void),
            &mut mi as *mut MONITORINFOEXW as *mut MONITORINFO,
        )
    };
    if !ok.as_bool() {
        debug!("GetMonitorInfoW failed: {}", io::Error::last_os_error());
        return None;
    }

    Some(MonitorInfo {
        device_name: decode_wide(&mi.szDevice),
        work_area: mi.monitorInfo.rcWork,
    })
}

/// First active monitor device attached to the adapter output `device_name`.
fn display_device(device_name: &str) -> Option<DisplayDevice> {
    let wide = to_wide(device_name);

    for index in 0.. {
        let mut dd = DISPLAY_DEVICEW {
            cb: std::mem::size_of::<DISPLAY_DEVICEW>() as u32,
            ..Default::default()
        };
        let ok = unsafe { EnumDisplayDevicesW(PCWSTR(wide.as_ptr()), index, &mut dd, 0) };
        if !ok.as_bool() {
            break;
        }
        if dd.StateFlags & DISPLAY_DEVICE_ACTIVE != 0 {
            return Some(DisplayDevice {
                friendly_name: decode_wide(&dd.DeviceString),
                device_id: decode_wide(&dd.DeviceID),
            });
        }
    }
    None
}

/// Enumerate all HMONITOR handles on the system.
pub(crate) fn enumerate_hmonitors() -> Result<Vec<isize>, Box<dyn Error>> {
    let mut handles: Vec<isize> = Vec::new();

    unsafe extern "system" fn callback(
        hmonitor: HMONITOR,
        _hdc: HDC,
        _rect: *mut RECT,
        data: LPARAM,
    ) -> BOOL {
        let vec = &mut *(data.0 as *mut Vec<isize>);
        vec.push(hmonitor.0 as isize);
        BOOL::from(true)
    }

    let ok = unsafe {
        EnumDisplayMonitors(
            HDC::default(),
            None,
            Some(callback),
            LPARAM(&mut handles as *mut Vec<isize> as isize),
        )
    };

    if !ok.as_bool() {
        return Err("EnumDisplayMonitors failed".into());
    }

    Ok(handles)
}

fn to_wide(s: &str) -> Vec<u16> {
    OsStr::new(s).encode_wide().chain(std::iter::once(0)).collect()
}

/// Decode a null-terminated UTF-16 buffer.
pub fn decode_wide(raw: &[u16]) -> String {
    let len = raw.iter().position(|&c| c == 0).unwrap_or(raw.len());
    String::from_utf16_lossy(&raw[..len])
}
