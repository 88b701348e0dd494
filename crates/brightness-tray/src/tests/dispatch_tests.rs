use super::*;
use std::cell::{Cell, RefCell};
use windows::Win32::UI::WindowsAndMessaging::{WM_MOUSEMOVE, WM_PAINT};

#[derive(Default)]
struct Recorder {
    clicks: Cell<u32>,
    commands: RefCell<Vec<MenuCommand>>,
    changes: Cell<u32>,
    startup: Cell<bool>,
}

impl TrayHandler for Recorder {
    fn on_click(&self) {
        self.clicks.set(self.clicks.get() + 1);
    }

    fn on_command(&self, command: MenuCommand) {
        self.commands.borrow_mut().push(command);
    }

    fn on_displays_changed(&self) {
        self.changes.set(self.changes.get() + 1);
    }

    fn startup_enabled(&self) -> bool {
        self.startup.get()
    }
}

// ── classify ─────────────────────────────────────────────────────

#[test]
fn tray_left_click() {
    assert_eq!(
        classify(WM_TRAY_CALLBACK, 0, WM_LBUTTONUP as isize),
        Some(TrayEvent::LeftClick)
    );
}

#[test]
fn tray_right_click() {
    assert_eq!(
        classify(WM_TRAY_CALLBACK, 0, WM_RBUTTONUP as isize),
        Some(TrayEvent::RightClick)
    );
}

#[test]
fn tray_callback_uses_low_word() {
    let lparam = ((TRAY_ICON_ID as isize) << 16) | WM_LBUTTONUP as isize;
    assert_eq!(
        classify(WM_TRAY_CALLBACK, 0, lparam),
        Some(TrayEvent::LeftClick)
    );
}

#[test]
fn tray_mouse_move_ignored() {
    assert_eq!(classify(WM_TRAY_CALLBACK, 0, WM_MOUSEMOVE as isize), None);
}

#[test]
fn display_change_detected() {
    assert_eq!(
        classify(WM_DISPLAYCHANGE, 32, 0),
        Some(TrayEvent::DisplaysChanged)
    );
}

#[test]
fn device_change_codes() {
    for code in [DBT_DEVICEARRIVAL, DBT_DEVICEREMOVECOMPLETE, DBT_DEVNODES_CHANGED] {
        assert_eq!(
            classify(WM_DEVICECHANGE, code as usize, 0),
            Some(TrayEvent::DisplaysChanged),
            "code {:#x}",
            code
        );
    }
}

#[test]
fn device_query_remove_ignored() {
    // DBT_DEVICEQUERYREMOVE
    assert_eq!(classify(WM_DEVICECHANGE, 0x8001, 0), None);
}

#[test]
fn unrelated_messages_ignored() {
    assert_eq!(classify(WM_PAINT, 0, 0), None);
    assert_eq!(classify(WM_LBUTTONUP, 0, 0), None);
}

// ── Wheel ────────────────────────────────────────────────────────

#[test]
fn wheel_up_one_notch() {
    assert_eq!(wheel_notches((WHEEL_DELTA as usize) << 16), 1);
}

#[test]
fn wheel_down_two_notches() {
    let delta = (-2 * WHEEL_DELTA) as i16 as u16 as usize;
    assert_eq!(wheel_notches(delta << 16), -2);
}

#[test]
fn wheel_ignores_key_state_word() {
    // MK_CONTROL in the low word.
    assert_eq!(wheel_notches(((WHEEL_DELTA as usize) << 16) | 0x0008), 1);
}

#[test]
fn partial_notch_is_zero() {
    assert_eq!(wheel_notches(60 << 16), 0);
}

// ── Menu ─────────────────────────────────────────────────────────

#[test]
fn command_ids_round_trip() {
    for cmd in [
        MenuCommand::Exit,
        MenuCommand::ToggleStartup,
        MenuCommand::AdjustNightMode,
    ] {
        assert_eq!(MenuCommand::from_id(cmd.id()), Some(cmd));
    }
}

#[test]
fn dismissed_menu_has_no_command() {
    assert_eq!(MenuCommand::from_id(0), None);
    assert_eq!(MenuCommand::from_id(99), None);
}

#[test]
fn menu_layout() {
    let entries = menu_entries(true, false);
    assert_eq!(entries.len(), 4);
    assert_eq!(
        entries[0],
        MenuEntry::Item {
            command: MenuCommand::ToggleStartup,
            label: "Run at Startup",
            checked: true,
        }
    );
    assert!(matches!(
        entries[1],
        MenuEntry::Item {
            command: MenuCommand::AdjustNightMode,
            checked: false,
            ..
        }
    ));
    assert_eq!(entries[2], MenuEntry::Separator);
    assert!(matches!(
        entries[3],
        MenuEntry::Item {
            command: MenuCommand::Exit,
            ..
        }
    ));
}

#[test]
fn menu_reflects_startup_state() {
    let entries = menu_entries(false, true);
    assert!(matches!(entries[0], MenuEntry::Item { checked: false, .. }));
    assert!(matches!(entries[1], MenuEntry::Item { checked: true, .. }));
}

// ── route ────────────────────────────────────────────────────────

#[test]
fn left_click_routes_to_on_click() {
    let rec = Recorder::default();
    route(&rec, TrayEvent::LeftClick, |_| panic!("no menu on left click"));
    assert_eq!(rec.clicks.get(), 1);
    assert!(rec.commands.borrow().is_empty());
}

#[test]
fn right_click_delivers_picked_command() {
    let rec = Recorder::default();
    route(&rec, TrayEvent::RightClick, |_| Some(MenuCommand::Exit));
    assert_eq!(*rec.commands.borrow(), vec![MenuCommand::Exit]);
    assert_eq!(rec.clicks.get(), 0);
}

#[test]
fn right_click_menu_built_from_handler_state() {
    let rec = Recorder::default();
    rec.startup.set(true);
    let mut seen = Vec::new();
    route(&rec, TrayEvent::RightClick, |entries| {
        seen = entries.to_vec();
        None
    });
    assert_eq!(seen, menu_entries(true, false));
}

#[test]
fn dismissed_menu_delivers_nothing() {
    let rec = Recorder::default();
    route(&rec, TrayEvent::RightClick, |_| None);
    assert!(rec.commands.borrow().is_empty());
}

#[test]
fn displays_changed_routes() {
    let rec = Recorder::default();
    route(&rec, TrayEvent::DisplaysChanged, |_| None);
    route(&rec, TrayEvent::DisplaysChanged, |_| None);
    assert_eq!(rec.changes.get(), 2);
}

// ── Placement ────────────────────────────────────────────────────

const WORK: Bounds = (0, 0, 1920, 1040);

#[test]
fn panel_centred_above_point() {
    assert_eq!(place_near_point((960, 1000), (350, 500), WORK), (785, 500));
}

#[test]
fn panel_clamped_to_right_edge() {
    assert_eq!(place_near_point((1910, 1030), (350, 500), WORK), (1570, 530));
}

#[test]
fn panel_clamped_to_left_and_top() {
    assert_eq!(place_near_point((10, 100), (350, 500), WORK), (0, 0));
}

#[test]
fn panel_on_secondary_monitor() {
    let work = (1920, 0, 3840, 1080);
    assert_eq!(place_near_point((1930, 1075), (350, 500), work), (1920, 575));
}
