use std::path::Path;

use tokio::process::Command;
use tracing::{debug, info};

use crate::error::ExternalCommandError;

/// Arguments for the one-shot "route this process to that device" call
pub fn switch_args(process_id: u32, device_id: &str) -> Vec<String> {
    vec![
        "--set".to_string(),
        "appDevice".to_string(),
        "--process".to_string(),
        process_id.to_string(),
        "--device".to_string(),
        device_id.to_string(),
    ]
}

/// Invoke the worker binary directly (not through the socket) to move
/// `process_id`'s audio to `device_id`.
pub async fn switch_app_device(
    program: &Path,
    process_id: u32,
    device_id: &str,
) -> Result<(), ExternalCommandError> {
    debug!(program = %program.display(), process_id, device_id, "switching app device");

    let output = Command::new(program)
        .args(switch_args(process_id, device_id))
        .kill_on_drop(true)
        .output()
        .await
        .map_err(ExternalCommandError::Spawn)?;

    if !output.status.success() {
        return Err(ExternalCommandError::Failed {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    info!(process_id, device_id, "app device switched");
    Ok(())
}
