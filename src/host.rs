// Host boundary: events arriving from the control-surface software and the
// commands we send back. Both directions are JSON lines tagged by "event".

use std::io::Write;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

use crate::action::{ActionId, ActionSelection, Controller, DeviceOption};

/// Inspector request and response event name for the device picker
pub const DEVICES_DATA_SOURCE: &str = "getDevices";

/// Lifecycle and input events delivered by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum HostEvent {
    WillAppear {
        context: ActionId,
        #[serde(default)]
        controller: Controller,
        #[serde(default)]
        settings: ActionSelection,
    },
    WillDisappear {
        context: ActionId,
    },
    DidReceiveSettings {
        context: ActionId,
        #[serde(default)]
        settings: ActionSelection,
    },
    KeyDown {
        context: ActionId,
    },
    DialRotate {
        context: ActionId,
        ticks: i32,
    },
    DialDown {
        context: ActionId,
    },
    SendToPlugin {
        context: ActionId,
        #[serde(default)]
        payload: Value,
    },
}

impl HostEvent {
    pub fn context(&self) -> &ActionId {
        match self {
            HostEvent::WillAppear { context, .. }
            | HostEvent::WillDisappear { context }
            | HostEvent::DidReceiveSettings { context, .. }
            | HostEvent::KeyDown { context }
            | HostEvent::DialRotate { context, .. }
            | HostEvent::DialDown { context }
            | HostEvent::SendToPlugin { context, .. } => context,
        }
    }

    /// Whether this is an inspector asking for the device picker contents
    pub fn is_devices_request(&self) -> bool {
        match self {
            HostEvent::SendToPlugin { payload, .. } => {
                payload.get("event").and_then(Value::as_str) == Some(DEVICES_DATA_SOURCE)
            }
            _ => false,
        }
    }
}

/// Read host events as JSON lines until EOF. Lines that do not parse are
/// logged and skipped.
pub fn spawn_event_reader<R>(reader: R) -> mpsc::UnboundedReceiver<HostEvent>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<HostEvent>(line) {
                        Ok(event) => {
                            if tx.send(event).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, line, "ignoring malformed host event"),
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "host event stream failed");
                    break;
                }
            }
        }
    });
    rx
}

/// Dial layout update; absent fields are left as they are
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Feedback {
    pub fn value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            icon: None,
        }
    }

    /// Icon from a base64 PNG, as a data URI
    pub fn png_icon(base64: &str) -> Self {
        Self {
            value: None,
            icon: Some(format!("data:image/png;base64,{}", base64)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectorPayload {
    pub event: String,
    pub items: Vec<DeviceOption>,
}

/// Commands sent to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum HostCommand {
    SetTitle {
        context: ActionId,
        title: String,
    },
    SetFeedback {
        context: ActionId,
        payload: Feedback,
    },
    SetSettings {
        context: ActionId,
        payload: ActionSelection,
    },
    SendToPropertyInspector {
        context: ActionId,
        payload: InspectorPayload,
    },
}

/// Outbound side of the host connection. Delivery is fire-and-forget.
pub trait Host {
    fn send(&mut self, command: HostCommand);

    fn set_title(&mut self, context: &ActionId, title: &str) {
        self.send(HostCommand::SetTitle {
            context: context.clone(),
            title: title.to_string(),
        });
    }

    fn set_feedback(&mut self, context: &ActionId, feedback: Feedback) {
        self.send(HostCommand::SetFeedback {
            context: context.clone(),
            payload: feedback,
        });
    }

    fn set_settings(&mut self, context: &ActionId, settings: &ActionSelection) {
        self.send(HostCommand::SetSettings {
            context: context.clone(),
            payload: settings.clone(),
        });
    }

    fn send_device_options(&mut self, context: &ActionId, items: Vec<DeviceOption>) {
        self.send(HostCommand::SendToPropertyInspector {
            context: context.clone(),
            payload: InspectorPayload {
                event: DEVICES_DATA_SOURCE.to_string(),
                items,
            },
        });
    }
}

/// Writes each command as one JSON line
pub struct StdioHost<W: Write> {
    out: W,
}

impl<W: Write> StdioHost<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Host for StdioHost<W> {
    fn send(&mut self, command: HostCommand) {
        let result = serde_json::to_string(&command)
            .map_err(std::io::Error::from)
            .and_then(|line| {
                writeln!(self.out, "{}", line)?;
                self.out.flush()
            });
        if let Err(e) = result {
            warn!(error = %e, "failed to write host command");
        }
    }
}

/// Keeps every command in memory (tests and dry runs)
#[derive(Debug, Default)]
pub struct MemoryHost {
    pub commands: Vec<HostCommand>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain recorded commands
    pub fn take(&mut self) -> Vec<HostCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn titles_for(&self, context: &ActionId) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                HostCommand::SetTitle { context: ctx, title } if ctx == context => {
                    Some(title.as_str())
                }
                _ => None,
            })
            .collect()
    }

    pub fn feedback_for(&self, context: &ActionId) -> Vec<&Feedback> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                HostCommand::SetFeedback { context: ctx, payload } if ctx == context => {
                    Some(payload)
                }
                _ => None,
            })
            .collect()
    }

    pub fn settings_for(&self, context: &ActionId) -> Vec<&ActionSelection> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                HostCommand::SetSettings { context: ctx, payload } if ctx == context => {
                    Some(payload)
                }
                _ => None,
            })
            .collect()
    }
}

impl Host for MemoryHost {
    fn send(&mut self, command: HostCommand) {
        self.commands.push(command);
    }
}
