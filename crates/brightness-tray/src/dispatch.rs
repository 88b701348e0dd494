//! Message classification and routing for the tray.
//!
//! Nothing in here calls the OS; the subclass procedure in [`crate::icon`]
//! feeds raw messages through [`classify`] and hands the result to
//! [`route`].

use windows::Win32::UI::WindowsAndMessaging::{
    WM_APP, WM_DEVICECHANGE, WM_DISPLAYCHANGE, WM_LBUTTONUP, WM_RBUTTONUP, WM_USER,
};

// ============================================================================
// Constants
// ============================================================================

/// Identifier of our notification-area icon.
pub const TRAY_ICON_ID: u32 = 100;

/// Private message the shell sends for icon mouse events.
pub const WM_TRAY_CALLBACK: u32 = WM_USER + 1001;

/// Posted to the host window when worker results or UI events are queued.
pub const WM_APP_WAKE: u32 = WM_APP + 1;

/// Posted to the host window to shut the application down.
pub const WM_APP_QUIT: u32 = WM_APP + 2;

/// Icon tooltip.
pub const TOOLTIP: &str = "DisplayBrightness";

/// WM_DEVICECHANGE event codes.
pub const DBT_DEVNODES_CHANGED: u32 = 0x0007;
pub const DBT_DEVICEARRIVAL: u32 = 0x8000;
pub const DBT_DEVICEREMOVECOMPLETE: u32 = 0x8004;

/// One wheel notch.
pub const WHEEL_DELTA: i32 = 120;

// ============================================================================
// Events
// ============================================================================

/// What a window message means to the tray.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayEvent {
    LeftClick,
    RightClick,
    /// Display topology or monitor devices changed.
    DisplaysChanged,
}

/// Map a raw window message to a tray event; `None` for everything else.
pub fn classify(msg: u32, wparam: usize, lparam: isize) -> Option<TrayEvent> {
    match msg {
        WM_TRAY_CALLBACK => match (lparam as u32) & 0xFFFF {
            WM_LBUTTONUP => Some(TrayEvent::LeftClick),
            WM_RBUTTONUP => Some(TrayEvent::RightClick),
            _ => None,
        },
        WM_DISPLAYCHANGE => Some(TrayEvent::DisplaysChanged),
        WM_DEVICECHANGE => match wparam as u32 {
            DBT_DEVICEARRIVAL | DBT_DEVICEREMOVECOMPLETE | DBT_DEVNODES_CHANGED => {
                Some(TrayEvent::DisplaysChanged)
            }
            _ => None,
        },
        _ => None,
    }
}

/// Whole wheel notches in a `WM_MOUSEWHEEL` wparam; positive is away from the user.
pub fn wheel_notches(wparam: usize) -> i32 {
    let delta = ((wparam >> 16) & 0xFFFF) as u16 as i16;
    i32::from(delta) / WHEEL_DELTA
}

// ============================================================================
// Context menu
// ============================================================================

/// Commands offered by the context menu. Values are the menu item ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum MenuCommand {
    Exit = 1,
    ToggleStartup = 2,
    AdjustNightMode = 3,
}

impl MenuCommand {
    pub fn id(self) -> usize {
        self as usize
    }

    /// The command for a menu item id; `None` for 0 (dismissed) or unknown ids.
    pub fn from_id(id: usize) -> Option<Self> {
        match id {
            1 => Some(Self::Exit),
            2 => Some(Self::ToggleStartup),
            3 => Some(Self::AdjustNightMode),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEntry {
    Item {
        command: MenuCommand,
        label: &'static str,
        checked: bool,
    },
    Separator,
}

/// Context menu layout, top to bottom.
pub fn menu_entries(startup_enabled: bool, night_mode_active: bool) -> Vec<MenuEntry> {
    vec![
        MenuEntry::Item {
            command: MenuCommand::ToggleStartup,
            label: "Run at Startup",
            checked: startup_enabled,
        },
        MenuEntry::Item {
            command: MenuCommand::AdjustNightMode,
            label: "Adjust Night Mode",
            checked: night_mode_active,
        },
        MenuEntry::Separator,
        MenuEntry::Item {
            command: MenuCommand::Exit,
            label: "Exit",
            checked: false,
        },
    ]
}

// ============================================================================
// Routing
// ============================================================================

/// Receiver of tray events.
///
/// Calls arrive on the UI thread, possibly re-entrantly while another
/// window message is being handled; implementations should queue work
/// rather than hold borrows across calls.
pub trait TrayHandler {
    /// Left click on the icon.
    fn on_click(&self);

    fn on_command(&self, command: MenuCommand);

    /// Display topology changed; dependent state should be rediscovered.
    fn on_displays_changed(&self);

    /// Checked state of "Run at Startup".
    fn startup_enabled(&self) -> bool;

    /// Checked state of "Adjust Night Mode".
    fn night_mode_active(&self) -> bool {
        false
    }
}

/// Deliver `event` to `handler`.
///
/// For a right click the menu is built from the handler's current state and
/// `pick` resolves the chosen command synchronously.
pub fn route<F>(handler: &dyn TrayHandler, event: TrayEvent, pick: F)
where
    F: FnOnce(&[MenuEntry]) -> Option<MenuCommand>,
{
    match event {
        TrayEvent::LeftClick => handler.on_click(),
        TrayEvent::RightClick => {
            let entries = menu_entries(handler.startup_enabled(), handler.night_mode_active());
            if let Some(command) = pick(&entries) {
                handler.on_command(command);
            }
        }
        TrayEvent::DisplaysChanged => handler.on_displays_changed(),
    }
}

// ============================================================================
// Panel placement
// ============================================================================

/// Screen rectangle as `(left, top, right, bottom)`.
pub type Bounds = (i32, i32, i32, i32);

/// Top-left corner for a `size` panel anchored above and centred on `point`,
/// kept inside `work`.
pub fn place_near_point(point: (i32, i32), size: (i32, i32), work: Bounds) -> (i32, i32) {
    let (w, h) = size;
    let (left, top, right, bottom) = work;
    let x = (point.0 - w / 2).min(right - w).max(left);
    let y = (point.1 - h).min(bottom - h).max(top);
    (x, y)
}

#[cfg(test)]
#[path = "tests/dispatch_tests.rs"]
mod tests;
