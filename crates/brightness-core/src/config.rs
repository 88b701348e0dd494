//! Settings management: JSON file with sensible defaults.
//!
//! Settings file location: `%APPDATA%\DisplayBrightness\settings.json`
//! Falls back to compiled-in defaults if the file is missing or malformed.
//! Write failures are logged and otherwise ignored.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::{Path, PathBuf};

/// Default red factor of the night-light ramp.
pub const DEFAULT_RED: f64 = 1.0;
/// Default green factor of the night-light ramp.
pub const DEFAULT_GREEN: f64 = 0.9;
/// Default blue factor of the night-light ramp.
pub const DEFAULT_BLUE: f64 = 0.5;

/// Lowest factor the adjustment surface offers for any channel.
pub const ADJUSTMENT_FLOOR: f64 = 0.5;

/// Path to the per-user settings directory.
pub fn config_dir() -> PathBuf {
    let app_data = std::env::var("APPDATA").unwrap_or_else(|_| {
        let profile =
            std::env::var("USERPROFILE").unwrap_or_else(|_| r"C:\Users\Default".to_string());
        format!(r"{}\AppData\Roaming", profile)
    });
    PathBuf::from(app_data).join("DisplayBrightness")
}

/// Full path to the settings file.
pub fn config_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Per-channel multipliers applied to the gamma ramp while night mode is on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NightLightColor {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl Default for NightLightColor {
    fn default() -> Self {
        Self {
            red: DEFAULT_RED,
            green: DEFAULT_GREEN,
            blue: DEFAULT_BLUE,
        }
    }
}

impl NightLightColor {
    /// Build a colour, clamping every factor into `[0, 1]`.
    pub fn new(red: f64, green: f64, blue: f64) -> Self {
        Self { red, green, blue }.sanitized()
    }

    /// Clamp each factor into `[0, 1]`; non-finite factors fall back to the default.
    pub fn sanitized(self) -> Self {
        fn fix(value: f64, fallback: f64) -> f64 {
            if value.is_finite() {
                value.clamp(0.0, 1.0)
            } else {
                fallback
            }
        }
        Self {
            red: fix(self.red, DEFAULT_RED),
            green: fix(self.green, DEFAULT_GREEN),
            blue: fix(self.blue, DEFAULT_BLUE),
        }
    }

    /// The colour as presented by the adjustment surface.
    ///
    /// Each channel is floored at [`ADJUSTMENT_FLOOR`]. This is a display
    /// rule only; the stored value may be lower.
    pub fn for_adjustment(self) -> Self {
        Self {
            red: self.red.max(ADJUSTMENT_FLOOR),
            green: self.green.max(ADJUSTMENT_FLOOR),
            blue: self.blue.max(ADJUSTMENT_FLOOR),
        }
    }

    /// Factors in red, green, blue order.
    pub fn factors(self) -> [f64; 3] {
        [self.red, self.green, self.blue]
    }
}

/// Persisted settings with defaults for every field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(rename = "NightLightRed")]
    pub night_light_red: f64,

    #[serde(rename = "NightLightGreen")]
    pub night_light_green: f64,

    #[serde(rename = "NightLightBlue")]
    pub night_light_blue: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            night_light_red: DEFAULT_RED,
            night_light_green: DEFAULT_GREEN,
            night_light_blue: DEFAULT_BLUE,
        }
    }
}

impl Settings {
    /// Load settings from the per-user file, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    /// Load settings from `path`, falling back to defaults.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Settings>(&contents) {
                Ok(settings) => {
                    info!("Settings loaded from {}", path.display());
                    settings.sanitized()
                }
                Err(e) => {
                    warn!(
                        "Settings parse error in {}: {}, using defaults",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(_) => {
                info!("No settings file at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write settings to `path` (creates the directory if needed).
    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        debug!("Settings written to {}", path.display());
        Ok(())
    }

    /// Write settings to `path`, logging and discarding any failure.
    pub fn persist(&self, path: &Path) {
        if let Err(e) = self.save_to(path) {
            debug!("Settings write to {} failed: {}", path.display(), e);
        }
    }

    /// The stored night-light colour.
    pub fn night_light(&self) -> NightLightColor {
        NightLightColor {
            red: self.night_light_red,
            green: self.night_light_green,
            blue: self.night_light_blue,
        }
    }

    /// Replace the stored night-light colour.
    pub fn set_night_light(&mut self, color: NightLightColor) {
        self.night_light_red = color.red;
        self.night_light_green = color.green;
        self.night_light_blue = color.blue;
    }

    fn sanitized(mut self) -> Self {
        let color = self.night_light().sanitized();
        self.set_night_light(color);
        self
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
