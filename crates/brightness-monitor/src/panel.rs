//! Internal panel brightness through the `root\wmi` brightness classes.
//!
//! Laptop panels are invisible to DDC/CI but expose `WmiMonitorBrightness`
//! (read) and `WmiMonitorBrightnessMethods` (write). Desktops without an
//! internal panel simply have no instances, or no provider at all.

use brightness_core::display::Display;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use wmi::{COMLibrary, WMIConnection};

/// Transition argument passed to `WmiSetBrightness`.
pub const SET_BRIGHTNESS_TIMEOUT: u32 = 1;

/// Raw WMI result from `WmiMonitorBrightness`.
#[derive(Deserialize, Debug)]
#[serde(rename = "WmiMonitorBrightness")]
#[serde(rename_all = "PascalCase")]
struct WmiMonitorBrightness {
    instance_name: Option<String>,
    current_brightness: Option<u8>,
}

/// Instance of `WmiMonitorBrightnessMethods`; only its object path is needed.
#[derive(Deserialize, Debug)]
#[serde(rename = "WmiMonitorBrightnessMethods")]
struct WmiMonitorBrightnessMethods {
    #[serde(rename = "__Path")]
    path: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct SetBrightnessParams {
    timeout: u32,
    brightness: u8,
}

fn connect() -> Result<WMIConnection, Box<dyn Error>> {
    let com = COMLibrary::new()?;
    Ok(WMIConnection::with_namespace_path("root\\wmi", com)?)
}

/// Discover internal panels. Never fails; returns empty when WMI is unavailable.
pub fn discover_internal() -> Vec<Display> {
    match query_internal() {
        Ok(displays) => {
            info!("WMI discovery found {} display(s)", displays.len());
            displays
        }
        Err(e) => {
            debug!("WMI brightness unavailable: {}", e);
            Vec::new()
        }
    }
}

fn query_internal() -> Result<Vec<Display>, Box<dyn Error>> {
    let wmi = connect()?;
    let rows: Vec<WmiMonitorBrightness> =
        wmi.raw_query("SELECT InstanceName, CurrentBrightness FROM WmiMonitorBrightness")?;

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let instance = row.instance_name.filter(|s| !s.is_empty())?;
            Some(Display::wmi(
                instance,
                u32::from(row.current_brightness.unwrap_or(0)),
            ))
        })
        .collect())
}

/// Set brightness on the active WMI instance named `instance_name`.
pub fn set_brightness(instance_name: &str, value: u32) -> Result<(), Box<dyn Error>> {
    let wmi = connect()?;
    let query = format!(
        "SELECT * FROM WmiMonitorBrightnessMethods WHERE Active=TRUE AND InstanceName='{}'",
        escape_wql(instance_name)
    );
    let methods: Vec<WmiMonitorBrightnessMethods> = wmi.raw_query(query)?;
    if methods.is_empty() {
        warn!("No active WMI brightness instance named {}", instance_name);
        return Err(format!("no WMI brightness instance {}", instance_name).into());
    }

    let params = SetBrightnessParams {
        timeout: SET_BRIGHTNESS_TIMEOUT,
        brightness: value.min(100) as u8,
    };
    for m in &methods {
        wmi.exec_instance_method::<WmiMonitorBrightnessMethods, _, ()>(
            "WmiSetBrightness",
            &m.path,
            &params,
        )?;
    }
    info!("WMI brightness set to {} on {}", value, instance_name);
    Ok(())
}

/// Escape a value for use inside a single-quoted WQL string literal.
pub fn escape_wql(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_doubles_backslashes() {
        assert_eq!(
            escape_wql(r"DISPLAY\BOE0812\4&1a&0&UID265988_0"),
            r"DISPLAY\\BOE0812\\4&1a&0&UID265988_0"
        );
    }

    #[test]
    fn escape_quotes() {
        assert_eq!(escape_wql("a'b"), r"a\'b");
    }

    #[test]
    fn escape_plain_value_unchanged() {
        assert_eq!(escape_wql("ACPI_0"), "ACPI_0");
    }

    #[test]
    fn set_params_use_wmi_names() {
        let params = SetBrightnessParams {
            timeout: SET_BRIGHTNESS_TIMEOUT,
            brightness: 40,
        };
        let debug = format!("{:?}", params);
        assert!(debug.contains("timeout: 1"));
        assert!(debug.contains("brightness: 40"));
    }
}
