//! The unified display list owned by the UI thread.
//!
//! All mutation happens through [`DisplayList`]; every mutation is reported
//! to subscribers as a [`DisplayChange`]. Native writes are either issued
//! synchronously through a [`DisplayControl`] or planned as
//! [`BrightnessRequest`]s for a worker and committed back afterwards.

use crate::config::NightLightColor;
use crate::control::{BrightnessOutcome, BrightnessRequest, ControlError, DisplayControl};
use crate::display::{BrightnessControl, Display, NightLightControl};
use log::debug;

/// A mutation of the display list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayChange {
    /// The list was replaced by a refresh.
    Replaced { count: usize },
    Brightness { index: usize, value: u32 },
    NightLight { index: usize, enabled: bool },
}

type Listener = Box<dyn FnMut(&DisplayChange)>;

#[derive(Default)]
pub struct DisplayList {
    displays: Vec<Display>,
    generation: u64,
    listeners: Vec<Listener>,
}

impl std::fmt::Debug for DisplayList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayList")
            .field("displays", &self.displays)
            .field("generation", &self.generation)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback invoked after every mutation.
    pub fn subscribe(&mut self, listener: impl FnMut(&DisplayChange) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn displays(&self) -> &[Display] {
        &self.displays
    }

    pub fn get(&self, index: usize) -> Option<&Display> {
        self.displays.get(index)
    }

    pub fn len(&self) -> usize {
        self.displays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.displays.is_empty()
    }

    /// Incremented on every [`replace`](Self::replace).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Index of the display whose device name equals `key` (case-insensitive).
    pub fn position(&self, key: &str) -> Option<usize> {
        self.displays
            .iter()
            .position(|d| d.device_name.eq_ignore_ascii_case(key))
    }

    /// Swap in a freshly discovered list.
    pub fn replace(&mut self, displays: Vec<Display>) {
        self.displays = displays;
        self.generation += 1;
        let count = self.displays.len();
        self.emit(DisplayChange::Replaced { count });
    }

    /// Write brightness through `control` and record it on success.
    ///
    /// The stored value only changes after the control call succeeds. A
    /// display without brightness control is left alone and its current
    /// value returned.
    pub fn set_brightness(
        &mut self,
        index: usize,
        value: u32,
        control: &dyn DisplayControl,
    ) -> Result<u32, ControlError> {
        let request = match self.plan_value(index, value) {
            Err(ControlError::Unsupported) => {
                let display = &self.displays[index];
                debug!("{} has no brightness control", display.device_name);
                return Ok(display.brightness);
            }
            planned => planned?,
        };
        control.set_brightness(&request.control, request.value)?;
        let value = request.value;
        self.store_brightness(index, value);
        Ok(value)
    }

    /// Plan a write of `value` (clamped to the display's range).
    pub fn plan_value(&self, index: usize, value: u32) -> Result<BrightnessRequest, ControlError> {
        let display = self
            .displays
            .get(index)
            .ok_or_else(|| ControlError::NotFound(format!("#{}", index)))?;
        if display.brightness_control == BrightnessControl::Unsupported {
            return Err(ControlError::Unsupported);
        }
        Ok(BrightnessRequest {
            generation: self.generation,
            index,
            device_name: display.device_name.clone(),
            control: display.brightness_control.clone(),
            value: display.range.clamp(value),
        })
    }

    /// Plan a write of `fraction` of the display's range.
    pub fn plan_percent(
        &self,
        index: usize,
        fraction: f64,
    ) -> Result<BrightnessRequest, ControlError> {
        let display = self
            .displays
            .get(index)
            .ok_or_else(|| ControlError::NotFound(format!("#{}", index)))?;
        self.plan_value(index, display.range.from_percent(fraction))
    }

    /// Plan the global-slider write: `fraction` of each supported display's range.
    pub fn plan_global(&self, fraction: f64) -> Vec<BrightnessRequest> {
        (0..self.displays.len())
            .filter_map(|index| self.plan_percent(index, fraction).ok())
            .collect()
    }

    /// Record a worker's successful write.
    ///
    /// Returns false when the list was replaced since the write was planned
    /// or the slot now holds a different device.
    pub fn commit_brightness(&mut self, request: &BrightnessRequest) -> bool {
        if request.generation != self.generation {
            debug!(
                "Dropping brightness result for {} from generation {}",
                request.device_name, request.generation
            );
            return false;
        }
        match self.displays.get(request.index) {
            Some(d) if d.device_name.eq_ignore_ascii_case(&request.device_name) => {}
            _ => return false,
        }
        self.store_brightness(request.index, request.value);
        true
    }

    /// Commit every successful outcome; returns how many were recorded.
    pub fn commit_outcomes(&mut self, outcomes: &[BrightnessOutcome]) -> usize {
        outcomes
            .iter()
            .filter(|o| o.result.is_ok())
            .filter(|o| self.commit_brightness(&o.request))
            .count()
    }

    /// Record the night-light flag and return the capability to apply.
    ///
    /// Returns `Ok(None)` when the flag already had that value; nothing is
    /// emitted then. The flag is recorded even when the display has no
    /// night-light capability.
    pub fn toggle_night_light(
        &mut self,
        index: usize,
        enabled: bool,
    ) -> Result<Option<NightLightControl>, ControlError> {
        let display = self
            .displays
            .get_mut(index)
            .ok_or_else(|| ControlError::NotFound(format!("#{}", index)))?;
        if display.night_light_enabled == enabled {
            return Ok(None);
        }
        display.night_light_enabled = enabled;
        let control = display.night_light_control.clone();
        self.emit(DisplayChange::NightLight { index, enabled });
        Ok(Some(control))
    }

    /// Record the night-light flag and apply it through `control` when it
    /// changed.
    pub fn set_night_light(
        &mut self,
        index: usize,
        enabled: bool,
        color: NightLightColor,
        control: &dyn DisplayControl,
    ) -> Result<(), ControlError> {
        match self.toggle_night_light(index, enabled)? {
            None | Some(NightLightControl::Unsupported) => Ok(()),
            Some(capability) => control.set_night_light(&capability, enabled, color),
        }
    }

    fn store_brightness(&mut self, index: usize, value: u32) {
        if let Some(display) = self.displays.get_mut(index) {
            display.brightness = display.range.clamp(value);
            let value = display.brightness;
            self.emit(DisplayChange::Brightness { index, value });
        }
    }

    fn emit(&mut self, change: DisplayChange) {
        for listener in self.listeners.iter_mut() {
            listener(&change);
        }
    }
}

#[cfg(test)]
#[path = "tests/list_tests.rs"]
mod tests;
