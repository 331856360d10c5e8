// Action binding layer: one entry per visible button or dial, holding the
// host-persisted selection settings. No I/O happens here.

pub mod registry;
pub mod selection;

pub use registry::{Binding, Bindings};
pub use selection::DeviceOption;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Host-assigned identity of one action instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(String);

impl ActionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of physical control an action is placed on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Controller {
    #[default]
    Keypad,
    Encoder,
}

impl Controller {
    /// Only dials have a feedback layout (value text and icon)
    pub fn has_feedback(self) -> bool {
        matches!(self, Controller::Encoder)
    }
}

/// Per-action settings persisted by the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSelection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cur_selected_device_id: Option<String>,
    #[serde(default)]
    pub active_devices: BTreeSet<String>,
    #[serde(default)]
    pub show_inactive: bool,
}

impl ActionSelection {
    pub fn with_devices<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            active_devices: ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}
