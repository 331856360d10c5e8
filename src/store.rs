use tracing::debug;

use crate::worker::{AudioDevice, FocusedPayload};

/// Last accepted focused-process record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FocusedProcess {
    pub process_id: u32,
    pub process_name: String,
    pub device_id: String,
    pub has_session: bool,
    pub icon_base64: Option<String>,
}

impl FocusedProcess {
    /// True when the worker reports neither an audio session nor a device
    pub fn is_silent(&self) -> bool {
        !self.has_session && self.device_id.is_empty()
    }
}

/// A focus update that passed the meaningful-change filter
#[derive(Debug, Clone, PartialEq)]
pub struct FocusChange {
    pub focus: FocusedProcess,
    /// Icon carried by this particular update, if any
    pub fresh_icon: Option<String>,
}

/// Shared device list and focused-process state
#[derive(Debug, Default)]
pub struct DeviceStore {
    devices: Vec<AudioDevice>,
    focus: Option<FocusedProcess>,
    force_update: bool,
}

impl DeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn devices(&self) -> &[AudioDevice] {
        &self.devices
    }

    pub fn focus(&self) -> Option<&FocusedProcess> {
        self.focus.as_ref()
    }

    pub fn device(&self, id: &str) -> Option<&AudioDevice> {
        self.devices.iter().find(|d| d.id == id)
    }

    /// Replace the whole device list. Does not push anything by itself.
    pub fn replace_devices(&mut self, devices: Vec<AudioDevice>) {
        debug!(count = devices.len(), "device list replaced");
        self.devices = devices;
    }

    /// Make the next focus update count as meaningful regardless of content
    pub fn request_refresh(&mut self) {
        self.force_update = true;
    }

    pub fn refresh_pending(&self) -> bool {
        self.force_update
    }

    /// Apply a focus report. Returns `None` when it is not a meaningful change,
    /// in which case nothing is stored.
    pub fn update_focus(&mut self, payload: FocusedPayload) -> Option<FocusChange> {
        let changed = match &self.focus {
            Some(current) => {
                current.process_id != payload.process_id
                    || current.has_session != payload.has_session
                    || current.device_id != payload.device_id
            }
            None => true,
        };

        if !((changed && payload.process_id != 0) || self.force_update) {
            return None;
        }

        // Icons only arrive on process change; keep ours for the same process
        let icon_base64 = match (&self.focus, &payload.process_icon_base64) {
            (Some(current), None) if current.process_id == payload.process_id => {
                current.icon_base64.clone()
            }
            _ => payload.process_icon_base64.clone(),
        };

        self.force_update = false;
        let focus = FocusedProcess {
            process_id: payload.process_id,
            process_name: payload.process_name,
            device_id: payload.device_id,
            has_session: payload.has_session,
            icon_base64,
        };
        self.focus = Some(focus.clone());

        debug!(pid = focus.process_id, name = %focus.process_name, "focus changed");
        Some(FocusChange {
            focus,
            fresh_icon: payload.process_icon_base64,
        })
    }
}
