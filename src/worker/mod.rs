// Worker link: the helper process plus the single control socket to it.
// All plugin actions share one Worker; every entry point is idempotent.

pub mod client;
pub mod framing;
pub mod protocol;

pub use client::{WorkerConnection, WorkerEvent};
pub use framing::FrameDecoder;
pub use protocol::{
    AudioDevice, DataFlow, DeviceState, DevicesPayload, FocusedPayload, StateMask, WorkerCommand,
    WorkerMessage,
};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::ConnectError;
use crate::process::Supervisor;

pub struct Worker {
    supervisor: Supervisor,
    addr: String,
    connection: Option<WorkerConnection>,
    next_generation: u64,
    connects: u64,
    events: mpsc::UnboundedSender<WorkerEvent>,
}

impl Worker {
    pub fn new(
        supervisor: Supervisor,
        addr: impl Into<String>,
        events: mpsc::UnboundedSender<WorkerEvent>,
    ) -> Self {
        Self {
            supervisor,
            addr: addr.into(),
            connection: None,
            next_generation: 0,
            connects: 0,
            events,
        }
    }

    pub fn from_config(config: &Config, events: mpsc::UnboundedSender<WorkerEvent>) -> Self {
        Self::new(Supervisor::from_config(config), config.endpoint(), events)
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    pub fn supervisor_mut(&mut self) -> &mut Supervisor {
        &mut self.supervisor
    }

    /// Number of sockets opened since creation
    pub fn connect_count(&self) -> u64 {
        self.connects
    }

    pub fn has_connection(&self) -> bool {
        self.connection.is_some()
    }

    /// Connected means both a live process handle and an open socket
    pub fn is_connected(&mut self) -> bool {
        self.supervisor.is_running() && self.connection.is_some()
    }

    /// Make sure the worker runs and a socket to it is open.
    ///
    /// With `skip_launch`, only the socket is (re)opened.
    pub async fn ensure_connected(&mut self, skip_launch: bool) -> Result<(), ConnectError> {
        if self.is_connected() {
            return Ok(());
        }

        if !skip_launch {
            self.supervisor.ensure_started(false).await?;
        }

        // Never leak a previous socket
        if let Some(stale) = self.connection.take() {
            debug!(generation = stale.generation(), "discarding stale worker connection");
            drop(stale);
        }

        self.next_generation += 1;
        match WorkerConnection::connect(&self.addr, self.next_generation, self.events.clone()).await
        {
            Ok(connection) => {
                self.connection = Some(connection);
                self.connects += 1;
                Ok(())
            }
            Err(source) => {
                self.terminate().await;
                Err(ConnectError::Io {
                    addr: self.addr.clone(),
                    source,
                })
            }
        }
    }

    /// Send a command. Delivery is not guaranteed; failures are logged.
    pub async fn send(&mut self, command: WorkerCommand) {
        if let Err(e) = self.ensure_connected(true).await {
            warn!(error = %e, %command, "worker unavailable, command dropped");
            return;
        }

        let Some(connection) = self.connection.as_mut() else {
            debug!(%command, "no worker connection, command dropped");
            return;
        };

        debug!(%command, "sending worker command");
        if let Err(e) = connection.write(command).await {
            warn!(error = %e, %command, "worker write failed");
            self.connection = None;
        }
    }

    /// Forget the connection if `generation` is still the current one.
    /// Returns whether anything was dropped.
    pub fn handle_disconnect(&mut self, generation: u64) -> bool {
        match &self.connection {
            Some(conn) if conn.generation() == generation => {
                warn!(generation, "worker connection lost");
                self.connection = None;
                true
            }
            _ => {
                debug!(generation, "ignoring disconnect from replaced connection");
                false
            }
        }
    }

    /// Whether a frame came from the connection currently held
    pub fn is_current(&self, generation: u64) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|conn| conn.generation() == generation)
    }

    /// Close the socket (sending "close" first) and kill the process.
    /// A no-op when nothing is running.
    pub async fn terminate(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close().await;
        }
        if self.supervisor.pid().is_some() {
            info!("terminating worker");
        }
        self.supervisor.kill().await;
    }
}
