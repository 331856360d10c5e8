use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = ".appaudioswitcher.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Helper executable that performs the actual audio routing
    #[serde(default = "default_worker_path")]
    pub worker_path: PathBuf,
    /// Arguments that put the helper into server mode
    #[serde(default = "default_server_args")]
    pub server_args: Vec<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Stdout text that marks the helper as ready for connections
    #[serde(default = "default_ready_marker")]
    pub ready_marker: String,
    #[serde(default = "default_launch_timeout_ms")]
    pub launch_timeout_ms: u64,
    /// Interval for focused-process polling; 0 disables it
    #[serde(default = "default_focus_poll_ms", skip_serializing_if = "Option::is_none")]
    pub focus_poll_ms: Option<u64>,

    // This field is not serialized, just used at runtime
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

fn default_worker_path() -> PathBuf {
    PathBuf::from("audioSwitcherUtil").join("AppAudioSwitcherUtility.exe")
}

fn default_server_args() -> Vec<String> {
    vec!["--server".to_string()]
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    32122
}

fn default_ready_marker() -> String {
    "Listening on port".to_string()
}

fn default_launch_timeout_ms() -> u64 {
    5000
}

fn default_focus_poll_ms() -> Option<u64> {
    Some(1000)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_path: default_worker_path(),
            server_args: default_server_args(),
            host: default_host(),
            port: default_port(),
            ready_marker: default_ready_marker(),
            launch_timeout_ms: default_launch_timeout_ms(),
            focus_poll_ms: default_focus_poll_ms(),
            config_path: None,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.config_path = Some(PathBuf::from(path));
        Ok(config)
    }

    /// Load the config at `path`, or the defaults if the file does not exist.
    pub fn load_or_default(path: &str) -> anyhow::Result<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            Ok(Self {
                config_path: Some(PathBuf::from(path)),
                ..Self::default()
            })
        }
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Worker path with relative paths anchored at the config file's directory
    pub fn resolved_worker_path(&self) -> PathBuf {
        if self.worker_path.is_absolute() {
            return self.worker_path.clone();
        }

        // "file.toml".parent() is Some(""), which we treat like no parent
        match self
            .config_path
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
        {
            Some(dir) => dir.join(&self.worker_path),
            None => self.worker_path.clone(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn launch_timeout(&self) -> Duration {
        Duration::from_millis(self.launch_timeout_ms)
    }

    pub fn focus_poll_interval(&self) -> Option<Duration> {
        self.focus_poll_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}
