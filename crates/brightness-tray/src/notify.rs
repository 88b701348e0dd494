//! Monitor device-interface notifications.
//!
//! Top-level windows receive `WM_DISPLAYCHANGE` on their own, but monitor
//! plug/unplug arrives as `WM_DEVICECHANGE` only after registering for the
//! monitor interface class.

use log::{debug, info, warn};
use std::ffi::c_void;
use std::mem;

use windows::core::GUID;
use windows::Win32::Foundation::{BOOL, HWND};

/// GUID_DEVINTERFACE_MONITOR = {E6F07B5F-EE97-4a90-B076-33F57BF4EAA7}
pub const GUID_DEVINTERFACE_MONITOR: GUID = GUID::from_values(
    0xE6F07B5F,
    0xEE97,
    0x4A90,
    [0xB0, 0x76, 0x33, 0xF5, 0x7B, 0xF4, 0xEA, 0xA7],
);

pub const DBT_DEVTYP_DEVICEINTERFACE: u32 = 5;
const DEVICE_NOTIFY_WINDOW_HANDLE: u32 = 0;

/// DEV_BROADCAST_DEVICEINTERFACE_W for RegisterDeviceNotificationW.
#[repr(C)]
pub struct DevBroadcastDeviceInterface {
    pub dbcc_size: u32,
    pub dbcc_devicetype: u32,
    pub dbcc_reserved: u32,
    pub dbcc_classguid: GUID,
    pub dbcc_name: [u16; 1],
}

impl DevBroadcastDeviceInterface {
    /// Filter for the monitor interface class.
    pub fn monitor_filter() -> Self {
        Self {
            dbcc_size: mem::size_of::<Self>() as u32,
            dbcc_devicetype: DBT_DEVTYP_DEVICEINTERFACE,
            dbcc_reserved: 0,
            dbcc_classguid: GUID_DEVINTERFACE_MONITOR,
            dbcc_name: [0],
        }
    }
}

#[link(name = "user32")]
extern "system" {
    fn RegisterDeviceNotificationW(
        recipient: HWND,
        notification_filter: *const DevBroadcastDeviceInterface,
        flags: u32,
    ) -> *mut c_void;

    fn UnregisterDeviceNotification(handle: *mut c_void) -> BOOL;
}

/// Registration handle; unregistered on drop.
pub struct DeviceNotification {
    handle: *mut c_void,
}

impl DeviceNotification {
    /// Register `hwnd` for monitor arrival/removal.
    ///
    /// Returns `None` when registration fails; display changes are then
    /// only seen through `WM_DISPLAYCHANGE`.
    pub fn register(hwnd: HWND) -> Option<Self> {
        let filter = DevBroadcastDeviceInterface::monitor_filter();
        let handle =
            unsafe { RegisterDeviceNotificationW(hwnd, &filter, DEVICE_NOTIFY_WINDOW_HANDLE) };
        if handle.is_null() {
            warn!("RegisterDeviceNotificationW failed, relying on WM_DISPLAYCHANGE only");
            return None;
        }
        info!("Registered for monitor device notifications");
        Some(Self { handle })
    }
}

impl Drop for DeviceNotification {
    fn drop(&mut self) {
        unsafe {
            if !UnregisterDeviceNotification(self.handle).as_bool() {
                debug!("UnregisterDeviceNotification failed");
            }
        }
    }
}
