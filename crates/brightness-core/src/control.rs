//! The seam between the display model and the native control channels.
//!
//! The model never calls the OS directly. Every brightness or night-light
//! write goes through a [`DisplayControl`] implementation, dispatched on the
//! capability descriptor attached to the display.

use crate::config::NightLightColor;
use crate::display::{BrightnessControl, NightLightControl};
use log::debug;
use thiserror::Error;

/// Failure of a single control call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("display does not support this operation")]
    Unsupported,
    #[error("display {0} not found")]
    NotFound(String),
    #[error("control channel failed: {0}")]
    Channel(String),
}

/// Native backend for capability descriptors.
pub trait DisplayControl: Send + Sync {
    /// Write `value` through the brightness capability.
    fn set_brightness(&self, control: &BrightnessControl, value: u32) -> Result<(), ControlError>;

    /// Apply the night-light tint (or identity when `enabled` is false).
    fn set_night_light(
        &self,
        control: &NightLightControl,
        enabled: bool,
        color: NightLightColor,
    ) -> Result<(), ControlError>;
}

/// One brightness write planned against a specific list generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrightnessRequest {
    pub generation: u64,
    pub index: usize,
    pub device_name: String,
    pub control: BrightnessControl,
    pub value: u32,
}

/// Outcome of one request from [`apply_concurrently`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrightnessOutcome {
    pub request: BrightnessRequest,
    pub result: Result<(), ControlError>,
}

/// Issue every request on its own scoped thread and wait for all of them.
///
/// Requests addressing distinct devices run concurrently. No ordering is
/// guaranteed between them. Results come back in request order.
pub fn apply_concurrently(
    control: &dyn DisplayControl,
    requests: Vec<BrightnessRequest>,
) -> Vec<BrightnessOutcome> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = requests
            .into_iter()
            .map(|request| {
                scope.spawn(move || {
                    let result = control.set_brightness(&request.control, request.value);
                    if let Err(ref e) = result {
                        debug!("Brightness write to {} failed: {}", request.device_name, e);
                    }
                    BrightnessOutcome { request, result }
                })
            })
            .collect();

        handles
            .into_iter()
            .filter_map(|handle| handle.join().ok())
            .collect()
    })
}

#[cfg(test)]
#[path = "tests/control_tests.rs"]
mod tests;
