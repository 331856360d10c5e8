use serde::{Deserialize, Serialize};
use tracing::info;

use super::ActionSelection;
use crate::error::SelectionError;
use crate::store::FocusedProcess;
use crate::worker::{AudioDevice, DeviceState, StateMask};

/// Value shown on a dial when no configured device is known
pub const NO_DEVICE_LABEL: &str = "None";
/// Value shown when the focused process has no audio session and no device
pub const SILENT_LABEL: &str = "-";

/// Devices configured for this action whose state matches `mask`, in store order
pub fn filtered_devices<'a>(
    selection: &ActionSelection,
    devices: &'a [AudioDevice],
    mask: StateMask,
) -> Vec<&'a AudioDevice> {
    devices
        .iter()
        .filter(|d| selection.active_devices.contains(&d.id) && mask.matches(d.state))
        .collect()
}

/// Position of the selected device within the filtered list
pub fn current_index(
    selection: &ActionSelection,
    devices: &[AudioDevice],
    mask: StateMask,
) -> Option<usize> {
    let selected = selection.cur_selected_device_id.as_deref()?;
    filtered_devices(selection, devices, mask)
        .iter()
        .position(|d| d.id == selected)
}

/// Selected device, falling back to the first configured one
pub fn current_device<'a>(
    selection: &ActionSelection,
    devices: &'a [AudioDevice],
) -> Option<&'a AudioDevice> {
    let filtered = filtered_devices(selection, devices, StateMask::ALL);
    let idx = current_index(selection, devices, StateMask::ALL).unwrap_or(0);
    filtered.get(idx).copied()
}

/// Step the selection through active devices with wraparound.
/// Returns whether the selection was updated.
pub fn cycle(selection: &mut ActionSelection, devices: &[AudioDevice], forward: bool) -> bool {
    let active = filtered_devices(selection, devices, StateMask::ACTIVE);
    if active.is_empty() {
        info!("no devices to switch to");
        return false;
    }

    let len = active.len();
    let next = match current_index(selection, devices, StateMask::ACTIVE) {
        Some(idx) if forward => (idx + 1) % len,
        Some(idx) => (idx + len - 1) % len,
        None if forward => 0,
        None => len - 1,
    };

    selection.cur_selected_device_id = Some(active[next].id.clone());
    true
}

/// Select `device_id` if it is a known device configured for this action
pub fn try_set_selected(
    selection: &mut ActionSelection,
    devices: &[AudioDevice],
    device_id: &str,
) -> Result<(), SelectionError> {
    let known = filtered_devices(selection, devices, StateMask::ALL)
        .iter()
        .any(|d| d.id == device_id);
    if !known {
        return Err(SelectionError::UnknownDevice(device_id.to_string()));
    }

    selection.cur_selected_device_id = Some(device_id.to_string());
    Ok(())
}

/// Text for a dial's value slot
pub fn feedback_value(
    selection: &ActionSelection,
    devices: &[AudioDevice],
    focus: Option<&FocusedProcess>,
) -> String {
    if focus.is_some_and(FocusedProcess::is_silent) {
        return SILENT_LABEL.to_string();
    }

    current_device(selection, devices)
        .map(|d| d.name.clone())
        .unwrap_or_else(|| NO_DEVICE_LABEL.to_string())
}

/// One entry of the inspector's device picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceOption {
    pub value: String,
    pub label: String,
}

/// Picker entries; inactive devices (with a state suffix) only when asked for
pub fn inspector_options(devices: &[AudioDevice], show_inactive: bool) -> Vec<DeviceOption> {
    devices
        .iter()
        .filter(|d| show_inactive || d.state == DeviceState::Active)
        .map(|d| DeviceOption {
            value: d.id.clone(),
            label: if show_inactive {
                format!("{} - {}", d.name, d.state.label())
            } else {
                d.name.clone()
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::DataFlow;

    fn device(id: &str, state: DeviceState) -> AudioDevice {
        AudioDevice {
            id: id.to_string(),
            name: format!("{} name", id),
            state,
            flow: DataFlow::Render,
        }
    }

    fn devices() -> Vec<AudioDevice> {
        vec![
            device("d1", DeviceState::Active),
            device("d2", DeviceState::Active),
            device("off", DeviceState::Unplugged),
            device("d3", DeviceState::Active),
            device("other", DeviceState::Active),
        ]
    }

    fn selection(selected: Option<&str>) -> ActionSelection {
        ActionSelection {
            cur_selected_device_id: selected.map(str::to_string),
            ..ActionSelection::with_devices(["d1", "d2", "d3", "off"])
        }
    }

    #[test]
    fn test_filter_keeps_store_order_and_mask() {
        let devices = devices();
        let sel = selection(None);

        let all: Vec<&str> = filtered_devices(&sel, &devices, StateMask::ALL)
            .iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(all, vec!["d1", "d2", "off", "d3"]);

        let active: Vec<&str> = filtered_devices(&sel, &devices, StateMask::ACTIVE)
            .iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(active, vec!["d1", "d2", "d3"]);
    }

    #[test]
    fn test_current_index_is_none_without_match() {
        let devices = devices();
        assert_eq!(current_index(&selection(None), &devices, StateMask::ALL), None);
        assert_eq!(current_index(&selection(Some("gone")), &devices, StateMask::ALL), None);
        assert_eq!(current_index(&selection(Some("d3")), &devices, StateMask::ALL), Some(3));
        assert_eq!(current_index(&selection(Some("d3")), &devices, StateMask::ACTIVE), Some(2));
    }

    #[test]
    fn test_cycle_forward_wraps_to_first() {
        let devices = devices();
        let mut sel = selection(Some("d3"));
        assert!(cycle(&mut sel, &devices, true));
        assert_eq!(sel.cur_selected_device_id.as_deref(), Some("d1"));
    }

    #[test]
    fn test_cycle_backward_wraps_to_last() {
        let devices = devices();
        let mut sel = selection(Some("d1"));
        assert!(cycle(&mut sel, &devices, false));
        assert_eq!(sel.cur_selected_device_id.as_deref(), Some("d3"));
    }

    #[test]
    fn test_cycle_skips_inactive_devices() {
        let devices = devices();
        let mut sel = selection(Some("d2"));
        cycle(&mut sel, &devices, true);
        assert_eq!(sel.cur_selected_device_id.as_deref(), Some("d3"));
    }

    #[test]
    fn test_cycle_from_no_selection() {
        let devices = devices();

        let mut sel = selection(None);
        cycle(&mut sel, &devices, true);
        assert_eq!(sel.cur_selected_device_id.as_deref(), Some("d1"));

        let mut sel = selection(None);
        cycle(&mut sel, &devices, false);
        assert_eq!(sel.cur_selected_device_id.as_deref(), Some("d3"));
    }

    #[test]
    fn test_cycle_with_no_active_devices_is_noop() {
        let devices = vec![device("off", DeviceState::Disabled)];
        let mut sel = selection(Some("off"));
        assert!(!cycle(&mut sel, &devices, true));
        assert_eq!(sel.cur_selected_device_id.as_deref(), Some("off"));
    }

    #[test]
    fn test_try_set_selected_rejects_unknown_ids() {
        let devices = devices();
        let mut sel = selection(Some("d1"));

        assert_eq!(
            try_set_selected(&mut sel, &devices, "other"),
            Err(SelectionError::UnknownDevice("other".to_string()))
        );
        assert_eq!(
            try_set_selected(&mut sel, &devices, "vanished"),
            Err(SelectionError::UnknownDevice("vanished".to_string()))
        );
        assert_eq!(sel.cur_selected_device_id.as_deref(), Some("d1"));

        try_set_selected(&mut sel, &devices, "d2").unwrap();
        assert_eq!(sel.cur_selected_device_id.as_deref(), Some("d2"));
    }

    #[test]
    fn test_current_device_falls_back_to_first() {
        let devices = devices();
        let device = current_device(&selection(Some("gone")), &devices).unwrap();
        assert_eq!(device.id, "d1");
        assert!(current_device(&ActionSelection::default(), &devices).is_none());
    }

    #[test]
    fn test_feedback_value_variants() {
        let devices = devices();
        let sel = selection(Some("d2"));

        assert_eq!(feedback_value(&sel, &devices, None), "d2 name");
        assert_eq!(
            feedback_value(&ActionSelection::default(), &devices, None),
            NO_DEVICE_LABEL
        );

        let silent = FocusedProcess {
            process_id: 4,
            process_name: "idle.exe".to_string(),
            ..FocusedProcess::default()
        };
        assert_eq!(feedback_value(&sel, &devices, Some(&silent)), SILENT_LABEL);

        let playing = FocusedProcess {
            has_session: true,
            ..silent
        };
        assert_eq!(feedback_value(&sel, &devices, Some(&playing)), "d2 name");
    }

    #[test]
    fn test_inspector_options_respect_show_inactive() {
        let devices = devices();

        let active = inspector_options(&devices, false);
        assert_eq!(active.len(), 4);
        assert_eq!(
            active[0],
            DeviceOption {
                value: "d1".to_string(),
                label: "d1 name".to_string()
            }
        );

        let all = inspector_options(&devices, true);
        assert_eq!(all.len(), 5);
        assert_eq!(all[2].label, "off name - UNPLUGGED");
        assert_eq!(all[0].label, "d1 name - ACTIVE");
    }
}
