use super::*;
use std::sync::Mutex;

/// Records every write; fails for devices listed in `failing`.
#[derive(Default)]
struct Recorder {
    writes: Mutex<Vec<(String, u32)>>,
    failing: Vec<String>,
}

fn key(control: &BrightnessControl) -> String {
    match control {
        BrightnessControl::Unsupported => String::new(),
        BrightnessControl::Ddc { device_name } => device_name.clone(),
        BrightnessControl::Wmi { instance_name } => instance_name.clone(),
    }
}

impl DisplayControl for Recorder {
    fn set_brightness(&self, control: &BrightnessControl, value: u32) -> Result<(), ControlError> {
        let device = key(control);
        if self.failing.contains(&device) {
            return Err(ControlError::Channel("no reply".into()));
        }
        self.writes.lock().unwrap().push((device, value));
        Ok(())
    }

    fn set_night_light(
        &self,
        _control: &NightLightControl,
        _enabled: bool,
        _color: NightLightColor,
    ) -> Result<(), ControlError> {
        Ok(())
    }
}

fn request(index: usize, device: &str, value: u32) -> BrightnessRequest {
    BrightnessRequest {
        generation: 1,
        index,
        device_name: device.to_string(),
        control: BrightnessControl::Ddc { device_name: device.to_string() },
        value,
    }
}

#[test]
fn every_request_is_issued() {
    let recorder = Recorder::default();
    let outcomes = apply_concurrently(
        &recorder,
        vec![request(0, "A", 10), request(1, "B", 20), request(2, "C", 30)],
    );
    assert_eq!(outcomes.len(), 3);
    let mut writes = recorder.writes.lock().unwrap().clone();
    writes.sort();
    assert_eq!(
        writes,
        vec![("A".to_string(), 10), ("B".to_string(), 20), ("C".to_string(), 30)]
    );
}

#[test]
fn outcomes_follow_request_order() {
    let recorder = Recorder::default();
    let outcomes = apply_concurrently(&recorder, vec![request(0, "A", 1), request(1, "B", 2)]);
    assert_eq!(outcomes[0].request.device_name, "A");
    assert_eq!(outcomes[1].request.device_name, "B");
}

#[test]
fn one_failure_does_not_stop_the_rest() {
    let recorder = Recorder {
        failing: vec!["B".to_string()],
        ..Default::default()
    };
    let outcomes = apply_concurrently(&recorder, vec![request(0, "A", 5), request(1, "B", 5)]);
    assert!(outcomes[0].result.is_ok());
    assert_eq!(outcomes[1].result, Err(ControlError::Channel("no reply".into())));
    assert_eq!(recorder.writes.lock().unwrap().len(), 1);
}

#[test]
fn empty_request_list() {
    let recorder = Recorder::default();
    assert!(apply_concurrently(&recorder, Vec::new()).is_empty());
}

#[test]
fn error_messages_name_the_problem() {
    assert_eq!(
        ControlError::NotFound(r"\\.\DISPLAY9".into()).to_string(),
        r"display \\.\DISPLAY9 not found"
    );
    assert!(ControlError::Unsupported.to_string().contains("not support"));
}
