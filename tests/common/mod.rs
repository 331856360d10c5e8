#![allow(dead_code)]

use std::future::Future;
use std::time::Duration;

use app_audio_switcher::config::Config;
use app_audio_switcher::host::Host;
use app_audio_switcher::plugin::Plugin;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const WAIT: Duration = Duration::from_secs(5);

/// Stand-in for the helper: `sh` prints the readiness marker and idles, while
/// the test owns the control port.
pub struct FakeWorker {
    listener: TcpListener,
    port: u16,
}

impl FakeWorker {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        Self { listener, port }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn config(&self) -> Config {
        Config {
            worker_path: "sh".into(),
            server_args: vec![
                "-c".to_string(),
                format!("echo 'Listening on port {}'; exec sleep 30", self.port),
            ],
            port: self.port,
            focus_poll_ms: None,
            ..Config::default()
        }
    }

    pub async fn accept(&self) -> WorkerPeer {
        let (stream, _) = tokio::time::timeout(WAIT, self.listener.accept())
            .await
            .expect("plugin never connected")
            .unwrap();
        WorkerPeer {
            stream,
            received: String::new(),
        }
    }
}

/// Server end of one control connection
pub struct WorkerPeer {
    stream: TcpStream,
    received: String,
}

impl WorkerPeer {
    /// Wait until `command` arrives and consume everything up to it.
    /// Commands are unterminated, so several may share one read.
    pub async fn expect(&mut self, command: &str) {
        let deadline = tokio::time::Instant::now() + WAIT;
        loop {
            if let Some(pos) = self.received.find(command) {
                self.received.drain(..pos + command.len());
                return;
            }

            let mut buf = [0u8; 1024];
            let n = tokio::time::timeout_at(deadline, self.stream.read(&mut buf))
                .await
                .unwrap_or_else(|_| panic!("timed out waiting for {:?}, have {:?}", command, self.received))
                .unwrap();
            assert!(n > 0, "connection closed while waiting for {:?}", command);
            self.received.push_str(std::str::from_utf8(&buf[..n]).unwrap());
        }
    }

    pub async fn reply(&mut self, message: &Value) {
        self.reply_raw(&message.to_string()).await;
    }

    pub async fn reply_raw(&mut self, text: &str) {
        self.stream.write_all(text.as_bytes()).await.unwrap();
        self.stream.flush().await.unwrap();
    }

    /// Everything sent until the plugin closes its end
    pub async fn read_to_close(mut self) -> String {
        let mut rest = String::new();
        tokio::time::timeout(WAIT, self.stream.read_to_string(&mut rest))
            .await
            .expect("connection was never closed")
            .unwrap();
        self.received + &rest
    }
}

pub fn devices_message() -> Value {
    serde_json::json!({
        "id": "devices",
        "payload": {"devices": [
            {"Id": "A", "Name": "Speakers", "State": 1, "Flow": 0},
            {"Id": "B", "Name": "Headphones", "State": 1, "Flow": 0},
            {"Id": "C", "Name": "Old Headset", "State": 8, "Flow": 0}
        ]}
    })
}

pub fn focused_message(pid: u32, name: &str, device: &str) -> Value {
    serde_json::json!({
        "id": "focused",
        "payload": {
            "processId": pid,
            "processName": name,
            "deviceId": device,
            "hasSession": true
        }
    })
}

/// Step the plugin's worker/tick loop until `done` holds
pub async fn step_until<H, F>(plugin: &mut Plugin<H>, mut done: F)
where
    H: Host,
    F: FnMut(&Plugin<H>) -> bool,
{
    let result = tokio::time::timeout(WAIT, async {
        while !done(plugin) {
            plugin.step().await;
        }
    })
    .await;
    assert!(result.is_ok(), "condition not reached in time");
}

pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(WAIT, future).await.expect("timed out")
}
