//! Notification-area icon attached to a host window by subclassing.
//!
//! [`TrayIcon::attach`] installs a subclass procedure on the host window and
//! adds the icon. The procedure routes tray clicks and display changes to a
//! [`TrayHandler`] and forwards every message, handled or not, to the next
//! procedure in the chain. Teardown (icon removal + subclass removal) runs
//! once, either when the icon is dropped or when the window is destroyed
//! first.

use log::{debug, info, warn};
use std::cell::Cell;
use std::error::Error;
use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;
use std::{mem, ptr};

use windows::core::PCWSTR;
use windows::Win32::Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, POINT, WPARAM};
use windows::Win32::UI::Shell::{
    DefSubclassProc, RemoveWindowSubclass, SetWindowSubclass, Shell_NotifyIconW, NIF_ICON,
    NIF_MESSAGE, NIF_TIP, NIM_ADD, NIM_DELETE, NOTIFYICONDATAW,
};
use windows::Win32::UI::WindowsAndMessaging::{
    AppendMenuW, CreatePopupMenu, DestroyMenu, GetCursorPos, LoadIconW, LoadImageW, PostMessageW,
    SetForegroundWindow, TrackPopupMenu, HICON, HMENU, IDI_APPLICATION, IMAGE_ICON,
    LR_DEFAULTSIZE, LR_LOADFROMFILE, MF_CHECKED, MF_SEPARATOR, MF_STRING, MF_UNCHECKED,
    TPM_NONOTIFY, TPM_RETURNCMD, TPM_RIGHTBUTTON, WM_NCDESTROY, WM_NULL,
};

use crate::dispatch::{
    classify, route, MenuCommand, MenuEntry, TrayHandler, TOOLTIP, TRAY_ICON_ID,
    WM_TRAY_CALLBACK,
};

/// Subclass id; unique per window for this procedure.
const SUBCLASS_ID: usize = 1;

/// Icon file looked up next to the executable.
const ICON_FILE: &str = "icon.ico";

struct TrayState {
    hwnd: HWND,
    handler: Box<dyn TrayHandler>,
    data: NOTIFYICONDATAW,
    torn_down: Cell<bool>,
}

impl TrayState {
    /// Remove the icon and the subclass. Runs at most once.
    fn teardown(&self) {
        if self.torn_down.replace(true) {
            return;
        }
        unsafe {
            if !Shell_NotifyIconW(NIM_DELETE, &self.data).as_bool() {
                debug!("Shell_NotifyIconW(NIM_DELETE) failed");
            }
            if !RemoveWindowSubclass(self.hwnd, Some(subclass_proc), SUBCLASS_ID).as_bool() {
                debug!("RemoveWindowSubclass failed");
            }
        }
        info!("Tray icon removed");
    }
}

/// The notification-area icon. Removed on drop.
pub struct TrayIcon {
    state: *mut TrayState,
}

impl TrayIcon {
    /// Subclass `hwnd` and add the icon, routing events to `handler`.
    pub fn attach(hwnd: HWND, handler: Box<dyn TrayHandler>) -> Result<Self, Box<dyn Error>> {
        let mut data = NOTIFYICONDATAW {
            cbSize: mem::size_of::<NOTIFYICONDATAW>() as u32,
            hWnd: hwnd,
            uID: TRAY_ICON_ID,
            uFlags: NIF_MESSAGE | NIF_ICON | NIF_TIP,
            uCallbackMessage: WM_TRAY_CALLBACK,
            hIcon: load_icon(),
            ..Default::default()
        };
        copy_tip(&mut data.szTip, TOOLTIP);

        let state = Box::into_raw(Box::new(TrayState {
            hwnd,
            handler,
            data,
            torn_down: Cell::new(false),
        }));

        let subclassed =
            unsafe { SetWindowSubclass(hwnd, Some(subclass_proc), SUBCLASS_ID, state as usize) };
        if !subclassed.as_bool() {
            drop(unsafe { Box::from_raw(state) });
            return Err("SetWindowSubclass failed".into());
        }

        if !unsafe { Shell_NotifyIconW(NIM_ADD, &(*state).data) }.as_bool() {
            unsafe {
                let _ = RemoveWindowSubclass(hwnd, Some(subclass_proc), SUBCLASS_ID);
                drop(Box::from_raw(state));
            }
            return Err("Shell_NotifyIconW(NIM_ADD) failed".into());
        }

        info!("Tray icon added");
        Ok(Self { state })
    }
}

impl Drop for TrayIcon {
    fn drop(&mut self) {
        unsafe {
            (*self.state).teardown();
            drop(Box::from_raw(self.state));
        }
    }
}

unsafe extern "system" fn subclass_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
    _id: usize,
    refdata: usize,
) -> LRESULT {
    let state = &*(refdata as *const TrayState);

    if let Some(event) = classify(msg, wparam.0, lparam.0) {
        route(state.handler.as_ref(), event, |entries| {
            show_context_menu(hwnd, entries)
        });
    }

    if msg == WM_NCDESTROY {
        state.teardown();
    }

    DefSubclassProc(hwnd, msg, wparam, lparam)
}

/// Show the menu at the cursor and block until a command is picked or the
/// menu is dismissed.
fn show_context_menu(hwnd: HWND, entries: &[MenuEntry]) -> Option<MenuCommand> {
    let menu = match unsafe { CreatePopupMenu() } {
        Ok(m) => m,
        Err(e) => {
            warn!("CreatePopupMenu failed: {}", e);
            return None;
        }
    };

    let picked = track_menu(hwnd, menu, entries);
    unsafe {
        let _ = DestroyMenu(menu);
    }
    picked
}

fn track_menu(hwnd: HWND, menu: HMENU, entries: &[MenuEntry]) -> Option<MenuCommand> {
    // Labels must outlive the AppendMenuW calls.
    let mut labels: Vec<Vec<u16>> = Vec::with_capacity(entries.len());

    for entry in entries {
        let appended = match entry {
            MenuEntry::Item {
                command,
                label,
                checked,
            } => {
                labels.push(to_wide(label));
                let text = labels.last().map(|l| l.as_ptr()).unwrap_or(ptr::null());
                let check = if *checked { MF_CHECKED } else { MF_UNCHECKED };
                unsafe { AppendMenuW(menu, MF_STRING | check, command.id(), PCWSTR(text)) }
            }
            MenuEntry::Separator => unsafe {
                AppendMenuW(menu, MF_SEPARATOR, 0, PCWSTR::null())
            },
        };
        if let Err(e) = appended {
            warn!("AppendMenuW failed: {}", e);
            return None;
        }
    }

    let mut pt = POINT::default();
    unsafe {
        if let Err(e) = GetCursorPos(&mut pt) {
            debug!("GetCursorPos failed: {}", e);
        }
        // Without this the menu does not close when clicking elsewhere.
        let _ = SetForegroundWindow(hwnd);
        let selected = TrackPopupMenu(
            menu,
            TPM_RETURNCMD | TPM_NONOTIFY | TPM_RIGHTBUTTON,
            pt.x,
            pt.y,
            0,
            hwnd,
            None,
        );
        let _ = PostMessageW(hwnd, WM_NULL, WPARAM(0), LPARAM(0));
        MenuCommand::from_id(selected.0 as usize)
    }
}

/// `icon.ico` beside the executable, else the stock application icon.
fn load_icon() -> HICON {
    if let Some(path) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(ICON_FILE)))
        .filter(|p| p.exists())
    {
        let wide: Vec<u16> = path
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();
        match unsafe {
            LoadImageW(
                HINSTANCE::default(),
                PCWSTR(wide.as_ptr()),
                IMAGE_ICON,
                0,
                0,
                LR_LOADFROMFILE | LR_DEFAULTSIZE,
            )
        } {
            Ok(handle) => return HICON(handle.0),
            Err(e) => debug!("Loading {} failed: {}", path.display(), e),
        }
    }

    unsafe { LoadIconW(HINSTANCE::default(), IDI_APPLICATION) }.unwrap_or_default()
}

/// Copy `text` into a fixed tooltip buffer, truncating and null-terminating.
fn copy_tip(buf: &mut [u16], text: &str) {
    let max = buf.len().saturating_sub(1);
    let mut len = 0;
    for (slot, unit) in buf.iter_mut().zip(text.encode_utf16().take(max)) {
        *slot = unit;
        len += 1;
    }
    if let Some(end) = buf.get_mut(len) {
        *end = 0;
    }
}

fn to_wide(s: &str) -> Vec<u16> {
    OsStr::new(s)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tip_is_copied_and_terminated() {
        let mut buf = [0xFFFFu16; 128];
        copy_tip(&mut buf, TOOLTIP);
        let expected: Vec<u16> = TOOLTIP.encode_utf16().collect();
        assert_eq!(&buf[..expected.len()], expected.as_slice());
        assert_eq!(buf[expected.len()], 0);
    }

    #[test]
    fn long_tip_is_truncated() {
        let mut buf = [0u16; 8];
        copy_tip(&mut buf, "abcdefghijklmnop");
        assert_eq!(&buf[..7], &"abcdefg".encode_utf16().collect::<Vec<_>>()[..]);
        assert_eq!(buf[7], 0);
    }

    #[test]
    fn empty_tip() {
        let mut buf = [1u16; 4];
        copy_tip(&mut buf, "");
        assert_eq!(buf[0], 0);
    }
}
