use std::{path::PathBuf, time::Duration};

use clap::Parser;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Runtime settings of the client
#[derive(Debug, Clone, Parser)]
#[command(name = "vidgrab")]
#[command(about = "Desktop client for a yt-dlp download backend", long_about = None)]
pub struct Config {
    /// Base URL of the download backend
    #[arg(long, env = "VIDGRAB_BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    pub backend_url: String,

    /// Delay between two progress polls, in milliseconds
    #[arg(long, env = "VIDGRAB_POLL_INTERVAL_MS", default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,

    /// Per-request timeout in seconds; no timeout when unset
    #[arg(long, env = "VIDGRAB_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Folder the save dialog opens in
    #[arg(long, env = "VIDGRAB_DOWNLOAD_DIR", default_value = "./downloads")]
    pub download_dir: PathBuf,
}

impl Config {
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            backend_url: backend_url.into(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            request_timeout_secs: None,
            download_dir: PathBuf::from("./downloads"),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_BACKEND_URL)
    }
}
