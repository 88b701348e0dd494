//! Tray and event dispatch.
//!
//! Architecture:
//!   - [`window::HostWindow`] is a hidden top-level window on the UI thread;
//!     it runs the message loop and shows the brightness panel
//!   - [`icon::TrayIcon`] subclasses the host window, adds the
//!     notification-area icon and routes clicks, menu commands and display
//!     changes to a [`dispatch::TrayHandler`]
//!   - [`notify::DeviceNotification`] subscribes the host window to monitor
//!     plug/unplug events
//!   - Other threads reach the UI thread through [`window::UiWaker`]

pub mod dispatch;
pub mod icon;
pub mod notify;
pub mod window;

pub use dispatch::{MenuCommand, TrayHandler};
pub use icon::TrayIcon;
pub use notify::DeviceNotification;
pub use window::{HostHandler, HostWindow, Panel, UiWaker};
