use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::ParseError;

/// Command strings understood by the worker's control socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerCommand {
    GetDevices,
    GetFocused,
    GetFocusedWithIcon,
    Close,
}

impl WorkerCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerCommand::GetDevices => "--get devices",
            WorkerCommand::GetFocused => "--get focused",
            WorkerCommand::GetFocusedWithIcon => "--get focused --icon",
            WorkerCommand::Close => "close",
        }
    }
}

impl fmt::Display for WorkerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device state as reported by the worker (bit values)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum DeviceState {
    Active,
    Disabled,
    NotPresent,
    Unplugged,
}

impl DeviceState {
    pub fn bits(self) -> u32 {
        match self {
            DeviceState::Active => 0x1,
            DeviceState::Disabled => 0x2,
            DeviceState::NotPresent => 0x4,
            DeviceState::Unplugged => 0x8,
        }
    }

    /// Upper-case name shown next to inactive devices in the inspector
    pub fn label(self) -> &'static str {
        match self {
            DeviceState::Active => "ACTIVE",
            DeviceState::Disabled => "DISABLED",
            DeviceState::NotPresent => "NOTPRESENT",
            DeviceState::Unplugged => "UNPLUGGED",
        }
    }
}

impl TryFrom<u32> for DeviceState {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0x1 => Ok(DeviceState::Active),
            0x2 => Ok(DeviceState::Disabled),
            0x4 => Ok(DeviceState::NotPresent),
            0x8 => Ok(DeviceState::Unplugged),
            other => Err(format!("unknown device state {}", other)),
        }
    }
}

impl From<DeviceState> for u32 {
    fn from(state: DeviceState) -> Self {
        state.bits()
    }
}

/// Bit mask over [`DeviceState`] values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateMask(u32);

impl StateMask {
    pub const ACTIVE: StateMask = StateMask(0x1);
    pub const ALL: StateMask = StateMask(0xf);

    pub fn matches(self, state: DeviceState) -> bool {
        self.0 & state.bits() != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum DataFlow {
    Render,
    Capture,
    All,
}

impl TryFrom<u32> for DataFlow {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DataFlow::Render),
            1 => Ok(DataFlow::Capture),
            2 => Ok(DataFlow::All),
            other => Err(format!("unknown data flow {}", other)),
        }
    }
}

impl From<DataFlow> for u32 {
    fn from(flow: DataFlow) -> Self {
        match flow {
            DataFlow::Render => 0,
            DataFlow::Capture => 1,
            DataFlow::All => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AudioDevice {
    pub id: String,
    pub name: String,
    pub state: DeviceState,
    pub flow: DataFlow,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DevicesPayload {
    #[serde(default, deserialize_with = "known_devices")]
    pub devices: Vec<AudioDevice>,
}

/// Decode the device list entry by entry. An entry with a state or flow we do
/// not know is skipped so the rest of the list still applies.
fn known_devices<'de, D>(deserializer: D) -> Result<Vec<AudioDevice>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<Value>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .filter_map(|entry| match AudioDevice::deserialize(&entry) {
            Ok(device) => Some(device),
            Err(e) => {
                debug!(error = %e, %entry, "skipping unrecognised device entry");
                None
            }
        })
        .collect())
}

/// Focused-process report; the icon only accompanies a process change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusedPayload {
    pub process_id: u32,
    #[serde(default)]
    pub process_name: String,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub has_session: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_icon_base64: Option<String>,
}

/// Raw envelope: `{ "id": ..., "payload": {...} }`
#[derive(Debug, Deserialize)]
struct Envelope {
    id: String,
    #[serde(default)]
    payload: Value,
}

/// Decoded inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerMessage {
    Devices(DevicesPayload),
    Focused(FocusedPayload),
    Icon(FocusedPayload),
    Unknown(String),
}

impl WorkerMessage {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let envelope: Envelope = serde_json::from_str(raw)?;
        let payload_err = |source| ParseError::Payload {
            id: envelope.id.clone(),
            source,
        };

        match envelope.id.as_str() {
            "devices" => serde_json::from_value(envelope.payload.clone())
                .map(WorkerMessage::Devices)
                .map_err(payload_err),
            "focused" => serde_json::from_value(envelope.payload.clone())
                .map(WorkerMessage::Focused)
                .map_err(payload_err),
            "icon" => serde_json::from_value(envelope.payload.clone())
                .map(WorkerMessage::Icon)
                .map_err(payload_err),
            _ => Ok(WorkerMessage::Unknown(envelope.id.clone())),
        }
    }
}
