//! Display records and the capabilities attached to them.
//!
//! A [`Display`] carries one brightness capability and one night-light
//! capability. Each is chosen at discovery time; the enum tag says which
//! backend drives it and the payload names the target (GDI device name or
//! WMI instance name).

use std::fmt;

/// Friendly name used when no active monitor device is found.
pub const UNKNOWN_DISPLAY_NAME: &str = "Unknown Display";

/// Friendly name given to panels discovered through WMI.
pub const INTERNAL_DISPLAY_NAME: &str = "Internal Display";

/// Inclusive brightness range reported by a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrightnessRange {
    pub min: u32,
    pub max: u32,
}

impl Default for BrightnessRange {
    fn default() -> Self {
        Self::PLACEHOLDER
    }
}

impl BrightnessRange {
    /// Range stored for displays whose hardware range is unknown.
    pub const PLACEHOLDER: Self = Self { min: 0, max: 100 };

    /// A usable range; `None` when `min >= max` or `max == 0`.
    pub fn new(min: u32, max: u32) -> Option<Self> {
        if max == 0 || min >= max {
            None
        } else {
            Some(Self { min, max })
        }
    }

    pub fn clamp(self, value: u32) -> u32 {
        value.clamp(self.min, self.max)
    }

    /// Map a fraction in `[0, 1]` onto the range.
    ///
    /// Out-of-range fractions are clamped. The result is rounded to the
    /// nearest integer.
    pub fn from_percent(self, fraction: f64) -> u32 {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let span = f64::from(self.max - self.min);
        let value = f64::from(self.min) + (span * fraction).round();
        self.clamp(value as u32)
    }

    /// Position of `value` within the range as a whole percentage.
    pub fn percent_of(self, value: u32) -> u32 {
        let span = self.max.saturating_sub(self.min);
        if span == 0 {
            return 0;
        }
        let offset = self.clamp(value) - self.min;
        ((f64::from(offset) / f64::from(span)) * 100.0).round() as u32
    }
}

/// How a display's brightness is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrightnessControl {
    Unsupported,
    /// DDC/CI through the physical monitor of a GDI device (`\\.\DISPLAY1`).
    Ddc { device_name: String },
    /// WMI `WmiSetBrightness` on an instance name.
    Wmi { instance_name: String },
}

/// How a display's night-light tint is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NightLightControl {
    Unsupported,
    /// Gamma ramp written to a device context for the GDI device name.
    GammaRamp { device_name: String },
}

/// One connected monitor as seen by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Display {
    pub friendly_name: String,
    /// GDI device name for external displays, WMI instance name for internal ones.
    pub device_name: String,
    /// PnP instance path used to reconcile internal and external records.
    pub monitor_id: Option<String>,
    pub range: BrightnessRange,
    pub brightness: u32,
    pub night_light_enabled: bool,
    pub brightness_control: BrightnessControl,
    pub night_light_control: NightLightControl,
}

impl Display {
    /// A display with no working brightness control.
    ///
    /// Night light is attached whenever a device name is known.
    pub fn unsupported(friendly_name: impl Into<String>, device_name: impl Into<String>) -> Self {
        let device_name = device_name.into();
        let night_light_control = gamma_for(&device_name);
        Self {
            friendly_name: friendly_name.into(),
            device_name,
            monitor_id: None,
            range: BrightnessRange::PLACEHOLDER,
            brightness: 0,
            night_light_enabled: false,
            brightness_control: BrightnessControl::Unsupported,
            night_light_control,
        }
    }

    /// An external display driven over DDC/CI.
    pub fn ddc(
        friendly_name: impl Into<String>,
        device_name: impl Into<String>,
        monitor_id: Option<String>,
        range: BrightnessRange,
        brightness: u32,
    ) -> Self {
        let device_name = device_name.into();
        Self {
            friendly_name: friendly_name.into(),
            brightness_control: BrightnessControl::Ddc {
                device_name: device_name.clone(),
            },
            night_light_control: gamma_for(&device_name),
            device_name,
            monitor_id,
            range,
            brightness: range.clamp(brightness),
            night_light_enabled: false,
        }
    }

    /// An internal panel driven through WMI.
    ///
    /// The WMI instance name doubles as the device name and the monitor id.
    /// Night light stays unsupported until reconciliation supplies a GDI name.
    pub fn wmi(instance_name: impl Into<String>, brightness: u32) -> Self {
        let instance_name = instance_name.into();
        let range = BrightnessRange::PLACEHOLDER;
        Self {
            friendly_name: INTERNAL_DISPLAY_NAME.to_string(),
            device_name: instance_name.clone(),
            monitor_id: Some(instance_name.clone()),
            range,
            brightness: range.clamp(brightness),
            night_light_enabled: false,
            brightness_control: BrightnessControl::Wmi { instance_name },
            night_light_control: NightLightControl::Unsupported,
        }
    }

    pub fn is_brightness_supported(&self) -> bool {
        self.brightness_control != BrightnessControl::Unsupported
    }

    pub fn is_night_light_supported(&self) -> bool {
        self.night_light_control != NightLightControl::Unsupported
    }

    /// Current brightness as a percentage of the range.
    pub fn brightness_percent(&self) -> u32 {
        self.range.percent_of(self.brightness)
    }
}

impl fmt::Display for Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_brightness_supported() {
            write!(f, "{} - {}%", self.friendly_name, self.brightness_percent())
        } else {
            write!(f, "{} - unsupported", self.friendly_name)
        }
    }
}

fn gamma_for(device_name: &str) -> NightLightControl {
    if device_name.is_empty() {
        NightLightControl::Unsupported
    } else {
        NightLightControl::GammaRamp {
            device_name: device_name.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "tests/display_tests.rs"]
mod tests;
