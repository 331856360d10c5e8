use std::io;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::framing::FrameDecoder;
use super::protocol::WorkerCommand;

/// Inbound notifications from a socket reader task, tagged with the
/// generation of the connection that produced them.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Frame { generation: u64, text: String },
    Disconnected { generation: u64 },
}

/// One live TCP connection to the worker's control port
#[derive(Debug)]
pub struct WorkerConnection {
    generation: u64,
    writer: OwnedWriteHalf,
    reader_task: JoinHandle<()>,
}

impl WorkerConnection {
    /// Connect and start forwarding decoded frames to `events`
    pub async fn connect(
        addr: &str,
        generation: u64,
        events: mpsc::UnboundedSender<WorkerEvent>,
    ) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (mut reader, writer) = stream.into_split();

        let reader_task = tokio::spawn(async move {
            let mut decoder = FrameDecoder::new();
            let mut buf = [0u8; 8192];
            loop {
                match reader.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        for text in decoder.push(&buf[..n]) {
                            if events.send(WorkerEvent::Frame { generation, text }).is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, generation, "worker socket read failed");
                        break;
                    }
                }
            }
            let _ = events.send(WorkerEvent::Disconnected { generation });
        });

        info!(addr, generation, "connected to worker");
        Ok(Self {
            generation,
            writer,
            reader_task,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Write a command as raw bytes, with no terminator
    pub async fn write(&mut self, command: WorkerCommand) -> io::Result<()> {
        self.writer.write_all(command.as_str().as_bytes()).await?;
        self.writer.flush().await
    }

    /// Best-effort "close" followed by shutting down both halves
    pub async fn close(mut self) {
        let _ = self.write(WorkerCommand::Close).await;
        let _ = self.writer.shutdown().await;
        self.reader_task.abort();
    }
}

impl Drop for WorkerConnection {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}
