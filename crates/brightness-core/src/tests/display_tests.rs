use super::*;

// ── BrightnessRange ──────────────────────────────────────────────

#[test]
fn new_rejects_degenerate_ranges() {
    assert_eq!(BrightnessRange::new(50, 50), None);
    assert_eq!(BrightnessRange::new(0, 0), None);
    assert_eq!(BrightnessRange::new(80, 20), None);
}

#[test]
fn new_accepts_ordered_range() {
    assert_eq!(BrightnessRange::new(20, 100), Some(BrightnessRange { min: 20, max: 100 }));
}

#[test]
fn placeholder_is_zero_to_hundred() {
    assert_eq!(BrightnessRange::default(), BrightnessRange { min: 0, max: 100 });
}

#[test]
fn half_of_twenty_to_hundred_is_sixty() {
    let range = BrightnessRange::new(20, 100).unwrap();
    assert_eq!(range.from_percent(0.5), 60);
}

#[test]
fn percent_outside_unit_interval_is_clamped() {
    let range = BrightnessRange::new(20, 100).unwrap();
    assert_eq!(range.from_percent(-0.3), 20);
    assert_eq!(range.from_percent(1.7), 100);
    assert_eq!(range.from_percent(f64::NAN), 20);
}

#[test]
fn percent_mapping_rounds_to_nearest() {
    let range = BrightnessRange::new(0, 3).unwrap();
    // 3 * 0.5 = 1.5 rounds up.
    assert_eq!(range.from_percent(0.5), 2);
    assert_eq!(range.from_percent(0.1), 0);
}

#[test]
fn percent_of_reports_position_in_range() {
    let range = BrightnessRange::new(20, 100).unwrap();
    assert_eq!(range.percent_of(20), 0);
    assert_eq!(range.percent_of(60), 50);
    assert_eq!(range.percent_of(100), 100);
    assert_eq!(range.percent_of(5), 0);
}

// ── Display constructors ─────────────────────────────────────────

#[test]
fn unsupported_display_uses_placeholder_range() {
    let d = Display::unsupported(UNKNOWN_DISPLAY_NAME, r"\\.\DISPLAY2");
    assert!(!d.is_brightness_supported());
    assert_eq!(d.range, BrightnessRange::PLACEHOLDER);
    assert_eq!(d.brightness_control, BrightnessControl::Unsupported);
}

#[test]
fn unsupported_display_keeps_night_light_when_named() {
    let d = Display::unsupported("Panel", r"\\.\DISPLAY2");
    assert_eq!(
        d.night_light_control,
        NightLightControl::GammaRamp { device_name: r"\\.\DISPLAY2".to_string() }
    );
}

#[test]
fn unnamed_display_has_no_night_light() {
    let d = Display::unsupported(UNKNOWN_DISPLAY_NAME, "");
    assert!(!d.is_night_light_supported());
}

#[test]
fn ddc_display_binds_both_capabilities_to_device_name() {
    let range = BrightnessRange::new(0, 100).unwrap();
    let d = Display::ddc("Dell U2720Q", r"\\.\DISPLAY1", None, range, 40);
    assert_eq!(
        d.brightness_control,
        BrightnessControl::Ddc { device_name: r"\\.\DISPLAY1".to_string() }
    );
    assert_eq!(
        d.night_light_control,
        NightLightControl::GammaRamp { device_name: r"\\.\DISPLAY1".to_string() }
    );
    assert_eq!(d.brightness, 40);
}

#[test]
fn ddc_display_clamps_reported_brightness() {
    let range = BrightnessRange::new(10, 50).unwrap();
    let d = Display::ddc("X", r"\\.\DISPLAY1", None, range, 90);
    assert_eq!(d.brightness, 50);
}

#[test]
fn wmi_display_is_internal_without_night_light() {
    let d = Display::wmi(r"DISPLAY\BOE0812\4&1a2b3c&0&UID265988_0", 70);
    assert_eq!(d.friendly_name, INTERNAL_DISPLAY_NAME);
    assert_eq!(d.monitor_id.as_deref(), Some(d.device_name.as_str()));
    assert_eq!(d.range, BrightnessRange::PLACEHOLDER);
    assert!(d.is_brightness_supported());
    assert!(!d.is_night_light_supported());
    assert_eq!(d.brightness, 70);
}

#[test]
fn supported_range_is_strictly_ordered() {
    let range = BrightnessRange::new(0, 100).unwrap();
    let displays = [
        Display::ddc("A", r"\\.\DISPLAY1", None, range, 10),
        Display::wmi("DISPLAY\\X\\1", 10),
        Display::unsupported("C", r"\\.\DISPLAY3"),
    ];
    for d in &displays {
        if d.is_brightness_supported() {
            assert!(d.range.min < d.range.max);
        } else {
            assert_eq!(d.range, BrightnessRange::PLACEHOLDER);
        }
    }
}

// ── Formatting ───────────────────────────────────────────────────

#[test]
fn display_format_shows_percent() {
    let range = BrightnessRange::new(20, 100).unwrap();
    let d = Display::ddc("Dell", r"\\.\DISPLAY1", None, range, 60);
    assert_eq!(d.to_string(), "Dell - 50%");
}

#[test]
fn display_format_marks_unsupported() {
    let d = Display::unsupported("Projector", r"\\.\DISPLAY4");
    assert_eq!(d.to_string(), "Projector - unsupported");
}
