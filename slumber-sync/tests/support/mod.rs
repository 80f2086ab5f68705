//! Recording doubles shared by the sync integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use slumber_core::{Automation, ControlMessage, Device, DeviceClass, Provenance};
use slumber_osc::{OscSink, TransportError};
use slumber_sync::{AutomationSettings, Collaborators, DeviceControl, SleepControl};

#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    sent: Arc<Mutex<Vec<ControlMessage>>>,
}

impl RecordingSink {
    /// Drain everything sent so far.
    pub fn take(&self) -> Vec<ControlMessage> {
        std::mem::take(&mut *self.sent.lock().expect("sink lock"))
    }
}

impl OscSink for RecordingSink {
    fn send(&self, message: &ControlMessage) -> Result<(), TransportError> {
        self.sent.lock().expect("sink lock").push(message.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    EnableSleep(Provenance),
    DisableSleep(Provenance),
    Automation(Automation, bool, Provenance),
    PowerOff(Vec<u32>),
}

#[derive(Debug, Default)]
pub struct Recorder {
    calls: Mutex<Vec<Call>>,
    devices: Vec<Device>,
}

impl Recorder {
    pub fn with_devices(devices: Vec<Device>) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            devices,
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

impl SleepControl for Recorder {
    fn enable_sleep_mode(&self, provenance: Provenance) {
        self.record(Call::EnableSleep(provenance));
    }

    fn disable_sleep_mode(&self, provenance: Provenance) {
        self.record(Call::DisableSleep(provenance));
    }
}

impl AutomationSettings for Recorder {
    fn set_automation_enabled(&self, automation: Automation, enabled: bool, provenance: Provenance) {
        self.record(Call::Automation(automation, enabled, provenance));
    }
}

impl DeviceControl for Recorder {
    fn devices(&self) -> Vec<Device> {
        self.devices.clone()
    }

    fn power_off(&self, devices: &[Device]) {
        self.record(Call::PowerOff(devices.iter().map(|d| d.index).collect()));
    }
}

pub fn collaborators(recorder: &Arc<Recorder>) -> Collaborators {
    Collaborators {
        sleep: recorder.clone(),
        automations: recorder.clone(),
        devices: recorder.clone(),
    }
}

/// Headset, two controllers, two trackers, one base station.
pub fn fleet() -> Vec<Device> {
    let device = |index, class| Device {
        index,
        class,
        serial_number: None,
    };
    vec![
        device(0, DeviceClass::Hmd),
        device(1, DeviceClass::Controller),
        device(2, DeviceClass::Controller),
        device(3, DeviceClass::GenericTracker),
        device(4, DeviceClass::GenericTracker),
        device(5, DeviceClass::TrackingReference),
    ]
}

/// Let spawned tasks run without letting the paused clock move.
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
