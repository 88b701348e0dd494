//! Native backend behind the display model's control seam.

use brightness_core::config::NightLightColor;
use brightness_core::control::{ControlError, DisplayControl};
use brightness_core::display::{BrightnessControl, NightLightControl};
use brightness_monitor::{ddc, panel};
use log::debug;

/// Dispatches capability descriptors to DDC/CI, WMI and the gamma engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeControl;

impl DisplayControl for NativeControl {
    fn set_brightness(&self, control: &BrightnessControl, value: u32) -> Result<(), ControlError> {
        match control {
            BrightnessControl::Unsupported => Err(ControlError::Unsupported),
            BrightnessControl::Ddc { device_name } => ddc::set_brightness(device_name, value)
                .map_err(|e| ControlError::Channel(e.to_string())),
            BrightnessControl::Wmi { instance_name } => {
                panel::set_brightness(instance_name, value)
                    .map_err(|e| ControlError::Channel(e.to_string()))
            }
        }
    }

    fn set_night_light(
        &self,
        control: &NightLightControl,
        enabled: bool,
        color: NightLightColor,
    ) -> Result<(), ControlError> {
        match control {
            NightLightControl::Unsupported => Err(ControlError::Unsupported),
            NightLightControl::GammaRamp { device_name } => {
                // No device context or a rejected ramp leaves the display as is.
                if !brightness_gamma::set_night_light(device_name, enabled, color) {
                    debug!("Gamma ramp not applied to {}", device_name);
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_brightness_is_rejected() {
        assert_eq!(
            NativeControl.set_brightness(&BrightnessControl::Unsupported, 50),
            Err(ControlError::Unsupported)
        );
    }

    #[test]
    fn unsupported_night_light_is_rejected() {
        assert_eq!(
            NativeControl.set_night_light(
                &NightLightControl::Unsupported,
                true,
                NightLightColor::default()
            ),
            Err(ControlError::Unsupported)
        );
    }

    #[test]
    fn missing_gamma_device_is_a_silent_noop() {
        let control = NightLightControl::GammaRamp {
            device_name: r"\\.\NO_SUCH_DISPLAY_42".into(),
        };
        assert_eq!(
            NativeControl.set_night_light(&control, true, NightLightColor::default()),
            Ok(())
        );
        assert_eq!(
            NativeControl.set_night_light(&control, false, NightLightColor::default()),
            Ok(())
        );
    }
}
