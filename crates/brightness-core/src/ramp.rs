//! Gamma ramp computation for night mode.

use crate::config::NightLightColor;

/// Entries per channel.
pub const RAMP_SIZE: usize = 256;

/// A device gamma ramp in the layout `SetDeviceGammaRamp` expects.
#[repr(C)]
#[derive(Clone, PartialEq, Eq)]
pub struct GammaRamp {
    pub red: [u16; RAMP_SIZE],
    pub green: [u16; RAMP_SIZE],
    pub blue: [u16; RAMP_SIZE],
}

impl GammaRamp {
    /// Linear, uncorrected output.
    pub fn identity() -> Self {
        Self::with_factors(1.0, 1.0, 1.0)
    }

    /// Ramp scaled per channel by the night-light colour.
    pub fn tinted(color: NightLightColor) -> Self {
        Self::with_factors(color.red, color.green, color.blue)
    }

    /// The ramp for a night-light state: tinted when enabled, identity otherwise.
    pub fn for_state(enabled: bool, color: NightLightColor) -> Self {
        if enabled {
            Self::tinted(color)
        } else {
            Self::identity()
        }
    }

    pub fn with_factors(red: f64, green: f64, blue: f64) -> Self {
        Self {
            red: channel(red),
            green: channel(green),
            blue: channel(blue),
        }
    }

    pub fn channels(&self) -> [&[u16; RAMP_SIZE]; 3] {
        [&self.red, &self.green, &self.blue]
    }
}

impl std::fmt::Debug for GammaRamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GammaRamp")
            .field("red_max", &self.red[RAMP_SIZE - 1])
            .field("green_max", &self.green[RAMP_SIZE - 1])
            .field("blue_max", &self.blue[RAMP_SIZE - 1])
            .finish()
    }
}

fn channel(factor: f64) -> [u16; RAMP_SIZE] {
    let factor = if factor.is_finite() { factor } else { 1.0 };
    let mut out = [0u16; RAMP_SIZE];
    for (i, entry) in out.iter_mut().enumerate() {
        let value = (i as f64 / 255.0 * 65535.0 * factor).round();
        *entry = value.clamp(0.0, 65535.0) as u16;
    }
    out
}

#[cfg(test)]
#[path = "tests/ramp_tests.rs"]
mod tests;
