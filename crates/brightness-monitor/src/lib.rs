//! Monitor discovery via DDC/CI + WMI, and native brightness control.
//!
//! The [`ddc`] module enumerates every logical monitor and talks DDC/CI to
//! external displays through the Monitor Configuration API (`dxva2.dll`).
//! The [`panel`] module reads and writes internal laptop panels through WMI.
//! [`discover_all`] runs both channels and reconciles the results into one
//! list where every monitor appears once.

pub mod ddc;
pub mod panel;
pub mod physical;

use brightness_core::display::Display;
use brightness_core::reconcile;
use log::debug;

/// Discover every display through both channels and merge them.
///
/// Never fails; a channel that is unavailable contributes nothing.
pub fn discover_all() -> Vec<Display> {
    let internal = panel::discover_internal();
    let external = ddc::discover_external();
    debug!(
        "Reconciling {} internal and {} external display(s)",
        internal.len(),
        external.len()
    );
    reconcile::merge(internal, external)
}
