//! Hidden host window: owns the UI thread's message loop and doubles as the
//! pop-up panel shown from the tray.
//!
//! Work from other threads reaches the UI thread through [`UiWaker`], which
//! posts `WM_APP_WAKE`; the window procedure then calls
//! [`HostHandler::on_wake`]. The handler lives in thread-local storage for
//! the duration of [`HostWindow::run`].

use log::{debug, info, warn};
use std::cell::{Cell, RefCell};
use std::error::Error;
use std::ffi::{c_void, OsStr};
use std::os::windows::ffi::OsStrExt;
use std::{mem, ptr};

use windows::core::PCWSTR;
use windows::Win32::Foundation::{BOOL, HINSTANCE, HWND, LPARAM, LRESULT, POINT, RECT, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BeginPaint, DrawTextW, EndPaint, GetMonitorInfoW, GetSysColorBrush, InvalidateRect,
    MonitorFromPoint, COLOR_WINDOW, DT_LEFT, DT_NOPREFIX, DT_TOP, DT_WORDBREAK,
    MONITORINFO, MONITOR_DEFAULTTONEAREST, PAINTSTRUCT,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::*;

use crate::dispatch::{place_near_point, wheel_notches, WM_APP_QUIT, WM_APP_WAKE};

/// Window class and title.
const CLASS_NAME: &str = "DisplayBrightnessHostWnd";
const TITLE: &str = "DisplayBrightness";

/// Panel size in pixels.
pub const PANEL_WIDTH: i32 = 350;
pub const PANEL_HEIGHT: i32 = 500;

const TEXT_MARGIN: i32 = 12;

/// Receiver of UI-thread callbacks.
pub trait HostHandler {
    /// Queued work is available. Runs again if another wake arrives while
    /// this call is in progress.
    fn on_wake(&mut self);

    /// Mouse wheel over the panel, in whole notches (positive = up).
    fn on_wheel(&mut self, notches: i32);
}

thread_local! {
    static HANDLER: RefCell<Option<Box<dyn HostHandler>>> = RefCell::new(None);
    static WAKE_AGAIN: Cell<bool> = const { Cell::new(false) };
    static PANEL_TEXT: RefCell<Vec<u16>> = const { RefCell::new(Vec::new()) };
}

// ============================================================================
// Waker
// ============================================================================

/// Thread-safe handle that posts to the host window.
#[derive(Debug, Clone, Copy)]
pub struct UiWaker {
    hwnd: isize,
}

impl UiWaker {
    fn hwnd(self) -> HWND {
        HWND(self.hwnd as *mut c_void)
    }

    /// Ask the UI thread to run [`HostHandler::on_wake`].
    pub fn wake(self) {
        if let Err(e) = unsafe { PostMessageW(self.hwnd(), WM_APP_WAKE, WPARAM(0), LPARAM(0)) } {
            debug!("Wake post failed: {}", e);
        }
    }

    /// Destroy the host window, ending [`HostWindow::run`].
    pub fn quit(self) {
        if let Err(e) = unsafe { PostMessageW(self.hwnd(), WM_APP_QUIT, WPARAM(0), LPARAM(0)) } {
            warn!("Quit post failed: {}", e);
        }
    }
}

// ============================================================================
// Panel
// ============================================================================

/// UI-thread handle to the panel surface of the host window.
#[derive(Debug, Clone, Copy)]
pub struct Panel {
    hwnd: HWND,
}

impl Panel {
    /// Replace the panel text and schedule a repaint.
    pub fn set_lines(&self, lines: &[String]) {
        let text = lines.join("\r\n");
        PANEL_TEXT.with(|t| *t.borrow_mut() = text.encode_utf16().collect());
        unsafe {
            let _ = InvalidateRect(self.hwnd, None, true);
        }
    }

    pub fn is_visible(&self) -> bool {
        unsafe { IsWindowVisible(self.hwnd) }.as_bool()
    }

    /// Show the panel above the cursor, inside the work area of the monitor
    /// under it, and give it focus.
    pub fn show_near_cursor(&self) {
        let mut pt = POINT::default();
        unsafe {
            if let Err(e) = GetCursorPos(&mut pt) {
                debug!("GetCursorPos failed: {}", e);
            }
        }

        let (x, y) = place_near_point(
            (pt.x, pt.y),
            (PANEL_WIDTH, PANEL_HEIGHT),
            work_area_at(pt),
        );

        unsafe {
            if let Err(e) = SetWindowPos(
                self.hwnd,
                HWND_TOPMOST,
                x,
                y,
                PANEL_WIDTH,
                PANEL_HEIGHT,
                SWP_SHOWWINDOW,
            ) {
                warn!("SetWindowPos failed: {}", e);
            }
            let _ = ShowWindow(self.hwnd, SW_SHOWNORMAL);
            let _ = SetForegroundWindow(self.hwnd);
        }
    }

    pub fn hide(&self) {
        unsafe {
            let _ = ShowWindow(self.hwnd, SW_HIDE);
        }
    }

    /// Show when hidden, hide when shown.
    pub fn toggle(&self) {
        if self.is_visible() {
            self.hide();
        } else {
            self.show_near_cursor();
        }
    }

    /// Bring an already-running instance's panel forward.
    pub fn bring_to_front(&self) {
        if self.is_visible() {
            unsafe {
                let _ = SetForegroundWindow(self.hwnd);
            }
        } else {
            self.show_near_cursor();
        }
    }
}

fn work_area_at(pt: POINT) -> (i32, i32, i32, i32) {
    let mut info = MONITORINFO {
        cbSize: mem::size_of::<MONITORINFO>() as u32,
        ..Default::default()
    };
    let ok = unsafe {
        let hmon = MonitorFromPoint(pt, MONITOR_DEFAULTTONEAREST);
        GetMonitorInfoW(hmon, &mut info)
    };
    if !ok.as_bool() {
        // Unbounded fallback; the panel lands at the cursor.
        return (i32::MIN / 2, i32::MIN / 2, i32::MAX / 2, i32::MAX / 2);
    }
    let r = info.rcWork;
    (r.left, r.top, r.right, r.bottom)
}

// ============================================================================
// Host window
// ============================================================================

/// The UI thread's top-level window. Destroyed on drop.
pub struct HostWindow {
    hwnd: HWND,
    hinstance: HINSTANCE,
    class_name: Vec<u16>,
}

impl HostWindow {
    /// Register the class and create the (hidden) window on this thread.
    pub fn create() -> Result<Self, Box<dyn Error>> {
        let class_name = to_wide(CLASS_NAME);
        let title = to_wide(TITLE);
        let hinstance: HINSTANCE = unsafe { GetModuleHandleW(PCWSTR(ptr::null()))? }.into();

        let wc = WNDCLASSEXW {
            cbSize: mem::size_of::<WNDCLASSEXW>() as u32,
            lpfnWndProc: Some(wnd_proc),
            hInstance: hinstance,
            hCursor: unsafe { LoadCursorW(HINSTANCE::default(), IDC_ARROW) }.unwrap_or_default(),
            hbrBackground: unsafe { GetSysColorBrush(COLOR_WINDOW) },
            lpszClassName: PCWSTR(class_name.as_ptr()),
            ..Default::default()
        };

        let atom = unsafe { RegisterClassExW(&wc) };
        if atom == 0 {
            return Err("Failed to register window class".into());
        }

        // Top-level rather than message-only: WM_DISPLAYCHANGE is only
        // broadcast to top-level windows.
        let created = unsafe {
            CreateWindowExW(
                WS_EX_TOOLWINDOW | WS_EX_TOPMOST,
                PCWSTR(class_name.as_ptr()),
                PCWSTR(title.as_ptr()),
                WS_POPUP | WS_CAPTION | WS_SYSMENU,
                0,
                0,
                PANEL_WIDTH,
                PANEL_HEIGHT,
                None,
                None,
                hinstance,
                None,
            )
        };
        let hwnd = match created {
            Ok(h) => h,
            Err(e) => {
                unsafe {
                    let _ = UnregisterClassW(PCWSTR(class_name.as_ptr()), hinstance);
                }
                return Err(e.into());
            }
        };

        info!("Host window created");
        Ok(Self {
            hwnd,
            hinstance,
            class_name,
        })
    }

    pub fn hwnd(&self) -> HWND {
        self.hwnd
    }

    pub fn waker(&self) -> UiWaker {
        UiWaker {
            hwnd: self.hwnd.0 as isize,
        }
    }

    pub fn panel(&self) -> Panel {
        Panel { hwnd: self.hwnd }
    }

    /// Pump messages until the window is destroyed, delivering callbacks to
    /// `handler`.
    pub fn run(&self, handler: Box<dyn HostHandler>) {
        HANDLER.with(|h| *h.borrow_mut() = Some(handler));

        unsafe {
            let mut msg = MSG::default();
            loop {
                let ret = GetMessageW(&mut msg, HWND::default(), 0, 0);
                if ret == BOOL(0) || ret == BOOL(-1) {
                    break;
                }
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }

        HANDLER.with(|h| h.borrow_mut().take());
        info!("Message loop finished");
    }
}

impl Drop for HostWindow {
    fn drop(&mut self) {
        unsafe {
            if IsWindow(self.hwnd).as_bool() {
                let _ = DestroyWindow(self.hwnd);
            }
            let _ = UnregisterClassW(PCWSTR(self.class_name.as_ptr()), self.hinstance);
        }
    }
}

/// Run `on_wake`, repeating while wakes arrive during the call.
fn dispatch_wake() {
    HANDLER.with(|slot| {
        let Ok(mut guard) = slot.try_borrow_mut() else {
            WAKE_AGAIN.with(|w| w.set(true));
            return;
        };
        if let Some(handler) = guard.as_mut() {
            loop {
                WAKE_AGAIN.with(|w| w.set(false));
                handler.on_wake();
                if !WAKE_AGAIN.with(|w| w.get()) {
                    break;
                }
            }
        }
    });
}

fn dispatch_wheel(notches: i32) {
    HANDLER.with(|slot| match slot.try_borrow_mut() {
        Ok(mut guard) => {
            if let Some(handler) = guard.as_mut() {
                handler.on_wheel(notches);
            }
        }
        Err(_) => debug!("Wheel ignored while busy"),
    });
}

unsafe fn paint(hwnd: HWND) {
    let mut ps = PAINTSTRUCT::default();
    let hdc = BeginPaint(hwnd, &mut ps);
    let mut rc = RECT::default();
    if GetClientRect(hwnd, &mut rc).is_ok() {
        rc.left += TEXT_MARGIN;
        rc.top += TEXT_MARGIN;
        rc.right -= TEXT_MARGIN;
        rc.bottom -= TEXT_MARGIN;
        PANEL_TEXT.with(|t| {
            let mut text = t.borrow().clone();
            if !text.is_empty() {
                DrawTextW(
                    hdc,
                    &mut text,
                    &mut rc,
                    DT_LEFT | DT_TOP | DT_WORDBREAK | DT_NOPREFIX,
                );
            }
        });
    }
    let _ = EndPaint(hwnd, &ps);
}

unsafe extern "system" fn wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_APP_WAKE => {
            dispatch_wake();
            LRESULT(0)
        }

        WM_MOUSEWHEEL => {
            let notches = wheel_notches(wparam.0);
            if notches != 0 {
                dispatch_wheel(notches);
            }
            LRESULT(0)
        }

        WM_PAINT => {
            paint(hwnd);
            LRESULT(0)
        }

        // Losing focus dismisses the panel, like a flyout.
        WM_ACTIVATE => {
            if (wparam.0 & 0xFFFF) as u32 == WA_INACTIVE {
                let _ = ShowWindow(hwnd, SW_HIDE);
            }
            LRESULT(0)
        }

        // Close button hides; only WM_APP_QUIT ends the application.
        WM_CLOSE => {
            let _ = ShowWindow(hwnd, SW_HIDE);
            LRESULT(0)
        }

        WM_APP_QUIT => {
            info!("Quit requested");
            if let Err(e) = DestroyWindow(hwnd) {
                warn!("DestroyWindow failed: {}", e);
                PostQuitMessage(0);
            }
            LRESULT(0)
        }

        WM_DESTROY => {
            PostQuitMessage(0);
            LRESULT(0)
        }

        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}

fn to_wide(s: &str) -> Vec<u16> {
    OsStr::new(s)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}
