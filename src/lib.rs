//! Client for a yt-dlp download backend: dependency check, metadata lookup,
//! format selection and progress polling, with the UI kept as explicit state.

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod progress;
pub mod render;
pub mod state;

pub use backend::{Backend, HttpBackend};
pub use config::Config;
pub use controller::ClientController;
pub use error::{ClientError, Result};
pub use model::{DownloadJob, FormatKind, JobProgress, JobStatus, VideoMetadata};
pub use render::{format_duration, format_file_size, render, View};
pub use state::{Event, UiState};
