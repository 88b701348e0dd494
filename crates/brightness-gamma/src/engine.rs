use brightness_core::config::{config_path, NightLightColor, Settings};
use log::info;
use std::path::{Path, PathBuf};

/// Owner of the night-light colour and its settings file.
///
/// Hold exactly one of these on the UI thread; workers receive the colour by
/// value, so a broadcast in flight keeps the colour it started with.
#[derive(Debug, Clone)]
pub struct NightModeEngine {
    settings: Settings,
    path: PathBuf,
}

impl NightModeEngine {
    /// Load from the per-user settings file.
    pub fn load() -> Self {
        Self::with_path(config_path())
    }

    /// Load from `path`; defaults when missing or malformed.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = Settings::load_from(&path);
        Self { settings, path }
    }

    /// Re-read the settings file, picking up changes made by other processes.
    pub fn reload(&mut self) -> NightLightColor {
        self.settings = Settings::load_from(&self.path);
        self.color()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The stored colour.
    pub fn color(&self) -> NightLightColor {
        self.settings.night_light()
    }

    /// The colour as shown by an adjustment surface (channels floored at 0.5).
    pub fn adjustment_color(&self) -> NightLightColor {
        self.color().for_adjustment()
    }

    /// Store and persist a new colour. Write failures are ignored.
    pub fn update_color(&mut self, color: NightLightColor) -> NightLightColor {
        let color = color.sanitized();
        self.settings.set_night_light(color);
        self.settings.persist(&self.path);
        info!(
            "Night light colour set to ({:.2}, {:.2}, {:.2})",
            color.red, color.green, color.blue
        );
        color
    }

    /// Restore and persist the default colour.
    pub fn reset(&mut self) -> NightLightColor {
        self.update_color(NightLightColor::default())
    }

    /// Tint or restore one display with the stored colour.
    pub fn set_night_light(&self, device_name: &str, enabled: bool) -> bool {
        crate::set_night_light(device_name, enabled, self.color())
    }

    /// Broadcast to every currently connected display.
    pub fn apply_to_all(&self, enabled: bool) -> usize {
        crate::apply_to_all(enabled, self.color())
    }
}
