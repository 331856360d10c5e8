use std::io;
use std::time::Duration;

use thiserror::Error;

/// The worker process could not be brought to its ready state.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to spawn worker: {0}")]
    Spawn(#[source] io::Error),

    #[error("worker stdout was not captured")]
    MissingStdout,

    #[error("worker exited before signalling readiness")]
    Exited,

    #[error("worker did not signal readiness within {0:?}")]
    Timeout(Duration),
}

/// The control socket to the worker could not be established.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error("failed to connect to worker at {addr}: {source}")]
    Io {
        addr: String,
        #[source]
        source: io::Error,
    },
}

/// An inbound worker message could not be decoded. Always dropped.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid payload for message '{id}': {source}")]
    Payload {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A selection referenced a device the action cannot use.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("device '{0}' is not available to this action")]
    UnknownDevice(String),
}

/// The one-shot device switch invocation failed.
#[derive(Debug, Error)]
pub enum ExternalCommandError {
    #[error("failed to run worker binary: {0}")]
    Spawn(#[source] io::Error),

    #[error("worker exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
}
