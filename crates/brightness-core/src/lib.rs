//! Platform-neutral core of the display brightness tool.
//!
//! Holds the unified [`display::Display`] model shared by both discovery
//! channels, the reconciliation that merges them, gamma-ramp computation for
//! night mode, and the persisted night-light settings.
//!
//! Nothing in here touches the OS. Native control is reached through the
//! [`control::DisplayControl`] trait, implemented by the binary.

pub mod config;
pub mod control;
pub mod display;
pub mod list;
pub mod ramp;
pub mod reconcile;
