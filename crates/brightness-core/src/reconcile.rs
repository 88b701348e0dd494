//! Identity reconciliation between the WMI and DDC/CI discovery channels.
//!
//! WMI only sees the internal panel and DDC/CI only sees external monitors,
//! but both report the panel's PnP path. Paths from the two channels differ
//! in their first segment (`DISPLAY\...` vs `MONITOR\...`) and share the
//! second, which carries the EDID hardware id. Matching on that segment is a
//! heuristic tied to this identifier format.

use crate::display::{Display, NightLightControl};
use log::debug;

/// Merge internal and external discovery results into one list.
///
/// Internal entries keep their order and their brightness control. The first
/// external entry matching an internal entry donates its device name, and the
/// internal entry's night light is rebound to that name. Each internal entry
/// is matched at most once. Unmatched external entries are appended in order.
pub fn merge(internal: Vec<Display>, external: Vec<Display>) -> Vec<Display> {
    let mut merged = internal;
    let mut matched = vec![false; merged.len()];
    let mut extra = Vec::new();

    for ext in external {
        let target = merged.iter().enumerate().position(|(i, int)| {
            !matched[i] && same_monitor(int.monitor_id.as_deref(), ext.monitor_id.as_deref())
        });

        match target {
            Some(i) => {
                matched[i] = true;
                let int = &mut merged[i];
                debug!(
                    "Reconciled {} with {} ({})",
                    int.device_name, ext.device_name, ext.friendly_name
                );
                int.night_light_control = NightLightControl::GammaRamp {
                    device_name: ext.device_name.clone(),
                };
                int.device_name = ext.device_name;
            }
            None => extra.push(ext),
        }
    }

    merged.extend(extra);
    merged
}

/// True when both identities carry the same hardware id segment.
pub fn same_monitor(a: Option<&str>, b: Option<&str>) -> bool {
    match (a.and_then(hardware_segment), b.and_then(hardware_segment)) {
        (Some(x), Some(y)) => x.eq_ignore_ascii_case(y),
        _ => false,
    }
}

/// The second backslash-delimited segment, if the path has one.
pub fn hardware_segment(monitor_id: &str) -> Option<&str> {
    let mut parts = monitor_id.split('\\');
    parts.next()?;
    parts.next().filter(|segment| !segment.is_empty())
}

#[cfg(test)]
#[path = "tests/reconcile_tests.rs"]
mod tests;
