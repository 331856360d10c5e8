use tracing::{debug, trace};

use crate::store::{DeviceStore, FocusChange};
use crate::worker::{WorkerCommand, WorkerMessage};

/// What the caller has to do after a message was applied to the store
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Device list replaced; the follow-up command must be sent
    Devices { follow_up: WorkerCommand },
    /// Focus report applied; `Some` when it was a meaningful change
    Focus(Option<FocusChange>),
    /// Malformed or unknown message, nothing changed
    Dropped,
}

/// Parse one inbound frame and apply it to the store. Never fails.
pub fn route(store: &mut DeviceStore, raw: &str) -> Dispatch {
    trace!(raw, "worker message");

    let message = match WorkerMessage::parse(raw) {
        Ok(message) => message,
        Err(e) => {
            debug!(error = %e, "dropping unparsable worker message");
            return Dispatch::Dropped;
        }
    };

    match message {
        WorkerMessage::Devices(payload) => {
            store.replace_devices(payload.devices);
            // Device availability feeds focus-based feedback, so focus follows
            Dispatch::Devices {
                follow_up: WorkerCommand::GetFocusedWithIcon,
            }
        }
        WorkerMessage::Focused(payload) | WorkerMessage::Icon(payload) => {
            Dispatch::Focus(store.update_focus(payload))
        }
        WorkerMessage::Unknown(id) => {
            debug!(id = %id, "ignoring unknown worker message");
            Dispatch::Dropped
        }
    }
}
