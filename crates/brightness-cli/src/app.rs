//! The tray application.
//!
//! Architecture:
//!   - Everything that touches the [`DisplayList`] runs on the UI thread
//!     inside [`App::on_wake`] / [`App::on_wheel`]
//!   - Tray callbacks, the activation listener and worker threads never
//!     touch application state; they queue a [`UiEvent`] and wake the UI
//!     thread
//!   - Discovery and native brightness writes run on worker threads; their
//!     results come back as events and are committed on the UI thread
//!   - Display-change bursts are debounced into one refresh, and refreshes
//!     never overlap

use brightness_core::control::{apply_concurrently, BrightnessOutcome};
use brightness_core::display::Display;
use brightness_core::list::DisplayList;
use brightness_gamma::NightModeEngine;
use brightness_instance::{
    signal_existing_instance, ActivationListener, Role, MUTEX_NAME, PIPE_NAME,
};
use brightness_tray::{
    DeviceNotification, HostHandler, HostWindow, MenuCommand, Panel, TrayHandler, TrayIcon,
    UiWaker,
};
use log::{debug, info, warn};
use std::cell::Cell;
use std::error::Error;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::control::NativeControl;
use crate::startup;

/// Settle window for display/device-change bursts.
pub const REFRESH_DEBOUNCE: Duration = Duration::from_millis(750);

/// Brightness change per wheel notch, in percent.
pub const WHEEL_STEP_PERCENT: i32 = 10;

/// Work queued for the UI thread.
#[derive(Debug)]
pub enum UiEvent {
    /// Left click on the tray icon.
    TogglePanel,
    /// Another instance asked us to come forward.
    Activate,
    Command(MenuCommand),
    /// Displays changed and the settle window passed.
    RefreshRequested,
    RefreshDone(Vec<Display>),
    BrightnessDone(Vec<BrightnessOutcome>),
    NightModeDone { enabled: bool, applied: usize },
}

/// Sending half of the UI queue; usable from any thread.
#[derive(Clone)]
pub struct Shared {
    tx: Sender<UiEvent>,
    waker: UiWaker,
}

impl Shared {
    pub fn post(&self, event: UiEvent) {
        if self.tx.send(event).is_ok() {
            self.waker.wake();
        }
    }

    pub fn quit(&self) {
        self.waker.quit();
    }
}

// ============================================================================
// Debounce / refresh bookkeeping
// ============================================================================

/// Epoch-based debounce: only the last trigger within `delay` fires.
#[derive(Debug, Clone)]
pub struct Debounce {
    epoch: Arc<AtomicU64>,
    delay: Duration,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            epoch: Arc::new(AtomicU64::new(0)),
            delay,
        }
    }

    /// Run `fire` on a timer thread after the settle window, unless another
    /// trigger arrives first.
    pub fn trigger<F>(&self, fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let counter = self.epoch.clone();
        let delay = self.delay;
        thread::spawn(move || {
            thread::sleep(delay);
            let current = counter.load(Ordering::SeqCst);
            if current != epoch {
                debug!("Debounce: epoch {} superseded by {}", epoch, current);
                return;
            }
            fire();
        });
    }
}

/// Non-reentrant refresh with at most one queued follow-up.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefreshState {
    running: bool,
    pending: bool,
}

impl RefreshState {
    /// A refresh was requested; true if it should start now.
    pub fn request(&mut self) -> bool {
        if self.running {
            self.pending = true;
            false
        } else {
            self.running = true;
            true
        }
    }

    /// The running refresh finished; true if a follow-up should start now.
    pub fn finish(&mut self) -> bool {
        if self.pending {
            self.pending = false;
            true
        } else {
            self.running = false;
            false
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

/// Global level after `notches` wheel steps, kept in 0..=100.
pub fn step_percent(current: u32, notches: i32) -> u32 {
    let current = i64::from(current.min(100));
    let next = current + i64::from(notches) * i64::from(WHEEL_STEP_PERCENT);
    next.clamp(0, 100) as u32
}

/// Text shown on the panel.
pub fn panel_lines(displays: &[Display], global: Option<u32>, night_mode: bool) -> Vec<String> {
    let mut lines = vec![
        match global {
            Some(p) => format!("Brightness: {}%", p),
            None => "Brightness".to_string(),
        },
        String::new(),
    ];
    if displays.is_empty() {
        lines.push("No displays found".to_string());
    } else {
        lines.extend(displays.iter().map(|d| d.to_string()));
    }
    lines.push(String::new());
    lines.push(format!(
        "Night mode: {}",
        if night_mode { "on" } else { "off" }
    ));
    lines.push("Scroll to change brightness".to_string());
    lines
}

// ============================================================================
// Tray bridge
// ============================================================================

/// Receives tray callbacks; only queues events.
struct TrayBridge {
    shared: Shared,
    debounce: Debounce,
    night_mode: Rc<Cell<bool>>,
}

impl TrayHandler for TrayBridge {
    fn on_click(&self) {
        self.shared.post(UiEvent::TogglePanel);
    }

    fn on_command(&self, command: MenuCommand) {
        self.shared.post(UiEvent::Command(command));
    }

    fn on_displays_changed(&self) {
        debug!("Display change, debouncing");
        let shared = self.shared.clone();
        self.debounce
            .trigger(move || shared.post(UiEvent::RefreshRequested));
    }

    fn startup_enabled(&self) -> bool {
        startup::is_enabled()
    }

    fn night_mode_active(&self) -> bool {
        self.night_mode.get()
    }
}

// ============================================================================
// Application state (UI thread)
// ============================================================================

pub struct App {
    rx: Receiver<UiEvent>,
    shared: Shared,
    panel: Panel,
    list: DisplayList,
    engine: NightModeEngine,
    night_mode: Rc<Cell<bool>>,
    dirty: Rc<Cell<bool>>,
    refresh: RefreshState,
    global_percent: Option<u32>,
}

impl App {
    fn new(
        rx: Receiver<UiEvent>,
        shared: Shared,
        panel: Panel,
        night_mode: Rc<Cell<bool>>,
    ) -> Self {
        let dirty = Rc::new(Cell::new(true));
        let mut list = DisplayList::new();
        let flag = dirty.clone();
        list.subscribe(move |change| {
            debug!("Display list: {:?}", change);
            flag.set(true);
        });
        Self {
            rx,
            shared,
            panel,
            list,
            engine: NightModeEngine::load(),
            night_mode,
            dirty,
            refresh: RefreshState::default(),
            global_percent: None,
        }
    }

    fn handle(&mut self, event: UiEvent) {
        match event {
            UiEvent::TogglePanel => self.panel.toggle(),
            UiEvent::Activate => {
                info!("Activation request");
                self.panel.bring_to_front();
            }
            UiEvent::Command(command) => self.on_command(command),
            UiEvent::RefreshRequested => {
                if self.refresh.request() {
                    self.spawn_refresh();
                } else {
                    debug!("Refresh in progress, follow-up queued");
                }
            }
            UiEvent::RefreshDone(displays) => {
                info!("Discovered {} display(s)", displays.len());
                self.list.replace(displays);
                self.global_percent = None;
                if self.night_mode.get() {
                    // Newly connected displays start untinted.
                    self.set_night_mode(true);
                }
                if self.refresh.finish() {
                    self.spawn_refresh();
                }
            }
            UiEvent::BrightnessDone(outcomes) => {
                let committed = self.list.commit_outcomes(&outcomes);
                debug!("{} of {} brightness write(s) committed", committed, outcomes.len());
            }
            UiEvent::NightModeDone { enabled, applied } => {
                info!(
                    "Night mode {} on {} display(s)",
                    if enabled { "applied" } else { "cleared" },
                    applied
                );
            }
        }
    }

    fn on_command(&mut self, command: MenuCommand) {
        match command {
            MenuCommand::Exit => self.shared.quit(),
            MenuCommand::ToggleStartup => {
                let enable = !startup::is_enabled();
                if let Err(e) = startup::set_enabled(enable) {
                    warn!("Could not update startup entry: {}", e);
                }
            }
            MenuCommand::AdjustNightMode => {
                let enabled = !self.night_mode.get();
                self.set_night_mode(enabled);
            }
        }
    }

    /// Record the flag on every display and broadcast on a worker.
    fn set_night_mode(&mut self, enabled: bool) {
        self.night_mode.set(enabled);
        for index in 0..self.list.len() {
            self.list.toggle_night_light(index, enabled).ok();
        }
        self.dirty.set(true);

        // The colour may have been changed by `night-color` since the last broadcast.
        let color = self.engine.reload();
        let shared = self.shared.clone();
        thread::spawn(move || {
            let applied = brightness_gamma::apply_to_all(enabled, color);
            shared.post(UiEvent::NightModeDone { enabled, applied });
        });
    }

    fn spawn_refresh(&self) {
        let shared = self.shared.clone();
        thread::spawn(move || {
            let displays = brightness_monitor::discover_all();
            shared.post(UiEvent::RefreshDone(displays));
        });
    }

    /// Starting point for the global level: the first controllable display.
    fn current_percent(&self) -> u32 {
        self.list
            .displays()
            .iter()
            .find(|d| d.is_brightness_supported())
            .map(|d| d.brightness_percent())
            .unwrap_or(100)
    }

    fn redraw_if_dirty(&mut self) {
        if self.dirty.replace(false) {
            self.panel.set_lines(&panel_lines(
                self.list.displays(),
                self.global_percent,
                self.night_mode.get(),
            ));
        }
    }
}

impl HostHandler for App {
    fn on_wake(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.handle(event);
        }
        self.redraw_if_dirty();
    }

    fn on_wheel(&mut self, notches: i32) {
        let current = self.global_percent.unwrap_or_else(|| self.current_percent());
        let target = step_percent(current, notches);
        self.global_percent = Some(target);
        self.dirty.set(true);

        let requests = self.list.plan_global(f64::from(target) / 100.0);
        if !requests.is_empty() {
            let shared = self.shared.clone();
            thread::spawn(move || {
                let outcomes = apply_concurrently(&NativeControl, requests);
                shared.post(UiEvent::BrightnessDone(outcomes));
            });
        }
        self.redraw_if_dirty();
    }
}

// ============================================================================
// Entry point
// ============================================================================

/// Run the tray application until Exit (or Ctrl+C with `console`).
///
/// A second instance signals the first and exits the process immediately.
pub fn run(console: bool) -> Result<(), Box<dyn Error>> {
    let _lock = match Role::acquire(MUTEX_NAME) {
        Role::Owner(lock) => lock,
        Role::Challenger => {
            signal_existing_instance(PIPE_NAME);
            std::process::exit(0);
        }
    };

    let host = HostWindow::create()?;
    let (tx, rx) = mpsc::channel();
    let shared = Shared {
        tx,
        waker: host.waker(),
    };

    let activation = shared.clone();
    let _listener = ActivationListener::spawn(PIPE_NAME, move || {
        activation.post(UiEvent::Activate);
    })?;

    if console {
        let waker = host.waker();
        ctrlc::set_handler(move || waker.quit())?;
        println!("Running in the notification area. Press Ctrl+C to exit.");
    }

    let _notification = DeviceNotification::register(host.hwnd());

    let night_mode = Rc::new(Cell::new(false));
    let bridge = TrayBridge {
        shared: shared.clone(),
        debounce: Debounce::new(REFRESH_DEBOUNCE),
        night_mode: night_mode.clone(),
    };
    let _tray = TrayIcon::attach(host.hwnd(), Box::new(bridge))?;

    let app = App::new(rx, shared.clone(), host.panel(), night_mode);
    shared.post(UiEvent::RefreshRequested);

    info!("DisplayBrightness running");
    host.run(Box::new(app));
    info!("DisplayBrightness exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use brightness_core::display::BrightnessRange;
    use std::sync::Mutex;

    // ── Wheel steps ──────────────────────────────────────────────

    #[test]
    fn wheel_up_adds_ten() {
        assert_eq!(step_percent(50, 1), 60);
    }

    #[test]
    fn wheel_down_subtracts() {
        assert_eq!(step_percent(50, -2), 30);
    }

    #[test]
    fn wheel_clamps() {
        assert_eq!(step_percent(95, 1), 100);
        assert_eq!(step_percent(5, -3), 0);
        assert_eq!(step_percent(250, 0), 100);
    }

    // ── Refresh bookkeeping ──────────────────────────────────────

    #[test]
    fn first_request_starts() {
        let mut state = RefreshState::default();
        assert!(state.request());
        assert!(state.is_running());
    }

    #[test]
    fn request_during_refresh_queues_one_follow_up() {
        let mut state = RefreshState::default();
        assert!(state.request());
        assert!(!state.request());
        assert!(!state.request());
        assert!(state.finish());
        assert!(state.is_running());
        assert!(!state.finish());
        assert!(!state.is_running());
    }

    #[test]
    fn finish_without_pending_goes_idle() {
        let mut state = RefreshState::default();
        state.request();
        assert!(!state.finish());
        assert!(state.request());
    }

    // ── Debounce ─────────────────────────────────────────────────

    #[test]
    fn debounce_fires_only_last() {
        let debounce = Debounce::new(Duration::from_millis(80));
        let fired = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let fired = fired.clone();
            debounce.trigger(move || fired.lock().unwrap().push(i));
        }
        thread::sleep(Duration::from_millis(400));
        assert_eq!(*fired.lock().unwrap(), vec![2]);
    }

    #[test]
    fn debounce_separate_bursts_both_fire() {
        let debounce = Debounce::new(Duration::from_millis(30));
        let (tx, rx) = mpsc::channel();
        let first = tx.clone();
        debounce.trigger(move || first.send(1).unwrap());
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(1));
        debounce.trigger(move || tx.send(2).unwrap());
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(2));
    }

    // ── Panel text ───────────────────────────────────────────────

    #[test]
    fn panel_lists_displays() {
        let displays = vec![
            Display::wmi("DISPLAY\\BOE0900\\4&1", 40),
            Display::unsupported("Generic Monitor", r"\\.\DISPLAY2"),
        ];
        let lines = panel_lines(&displays, Some(40), true);
        assert_eq!(lines[0], "Brightness: 40%");
        assert!(lines.contains(&"Internal Display - 40%".to_string()));
        assert!(lines.contains(&"Generic Monitor - unsupported".to_string()));
        assert!(lines.contains(&"Night mode: on".to_string()));
    }

    #[test]
    fn panel_without_displays() {
        let lines = panel_lines(&[], None, false);
        assert_eq!(lines[0], "Brightness");
        assert!(lines.contains(&"No displays found".to_string()));
        assert!(lines.contains(&"Night mode: off".to_string()));
    }

    #[test]
    fn panel_shows_percent_of_range() {
        let range = BrightnessRange::new(20, 100).unwrap();
        let display = Display::ddc("LG", r"\\.\DISPLAY1", None, range, 60);
        let lines = panel_lines(&[display], None, false);
        assert!(lines.contains(&"LG - 50%".to_string()));
    }
}
