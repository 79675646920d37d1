use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Which of the two format lists an option belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    /// Audio-only stream, converted to mp3 by the backend
    Audio,
    /// Video stream, merged with the best audio by the backend
    Video,
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatKind::Audio => f.write_str("audio"),
            FormatKind::Video => f.write_str("video"),
        }
    }
}

/// Flags reported by `/check-dependencies`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct DependencyStatus {
    #[serde(default)]
    pub ytdlp: bool,
    #[serde(default)]
    pub ffmpeg: bool,
}

/// Audio format offered for a source URL
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AudioFormat {
    #[serde(default, deserialize_with = "de_null_default")]
    pub id: String,
    /// Average bitrate in kbps
    #[serde(default)]
    pub abr: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_bytes")]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Video format offered for a source URL
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VideoFormat {
    #[serde(default, deserialize_with = "de_null_default")]
    pub id: String,
    /// Frame height in pixels
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default, deserialize_with = "de_opt_bytes")]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub has_audio: Option<bool>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Metadata returned by `/get-info`; replaced wholesale on every lookup
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VideoMetadata {
    #[serde(default, deserialize_with = "de_null_default")]
    pub title: String,
    #[serde(default, deserialize_with = "de_null_default")]
    pub uploader: String,
    #[serde(default, deserialize_with = "de_null_default")]
    pub platform: String,
    /// Length in seconds; `None` or `0` when the backend doesn't know
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "de_null_default")]
    pub audio_formats: Vec<AudioFormat>,
    #[serde(default, deserialize_with = "de_null_default")]
    pub video_formats: Vec<VideoFormat>,
}

impl VideoMetadata {
    /// Whether `format_id` is one of the offered options of `kind`.
    pub fn has_format(&self, kind: FormatKind, format_id: &str) -> bool {
        match kind {
            FormatKind::Audio => self.audio_formats.iter().any(|f| f.id == format_id),
            FormatKind::Video => self.video_formats.iter().any(|f| f.id == format_id),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InfoRequest<'a> {
    pub url: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadRequest<'a> {
    pub url: &'a str,
    #[serde(rename = "type")]
    pub kind: FormatKind,
    pub format_id: &'a str,
    pub title: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadAccepted {
    pub download_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body the backend sends alongside a non-2xx status
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// Status string of a backend job
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum JobStatus {
    Queued,
    Downloading,
    Completed,
    Error,
    /// Anything else the backend sends, e.g. `not_found`
    Unknown(String),
}

impl JobStatus {
    /// Completed and error end polling; every other status keeps it going.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "queued" => JobStatus::Queued,
            "downloading" => JobStatus::Downloading,
            "completed" => JobStatus::Completed,
            "error" => JobStatus::Error,
            _ => JobStatus::Unknown(value),
        }
    }
}

impl From<&str> for JobStatus {
    fn from(value: &str) -> Self {
        JobStatus::from(value.to_string())
    }
}

/// One `/progress/{id}` response
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobProgress {
    #[serde(default = "unknown_status")]
    pub status: JobStatus,
    /// Percent in 0..=100
    #[serde(default, deserialize_with = "de_null_default")]
    pub progress: f64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default, deserialize_with = "de_opt_bytes")]
    pub filesize: Option<u64>,
}

impl JobProgress {
    pub fn new(status: impl Into<JobStatus>, progress: f64) -> Self {
        Self {
            status: status.into(),
            progress,
            message: None,
            filename: None,
            filesize: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

fn unknown_status() -> JobStatus {
    JobStatus::Unknown(String::new())
}

/// Represents a download job tracked by the UI
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadJob {
    /// Opaque id handed out by the backend
    pub id: String,
    /// Last recognised status
    pub status: JobStatus,
    /// Progress percentage (0.0 to 100.0)
    pub progress: f64,
    /// Backend message when the job failed
    pub error: Option<String>,
    /// File name and size reported on completion
    pub filename: Option<String>,
    pub filesize: Option<u64>,
}

impl DownloadJob {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Queued,
            progress: 0.0,
            error: None,
            filename: None,
            filesize: None,
        }
    }

    /// Folds one poll response into the job.
    ///
    /// Returns `false` for a status the client doesn't recognise; the job is
    /// left untouched in that case.
    pub fn apply(&mut self, update: &JobProgress) -> bool {
        match &update.status {
            JobStatus::Queued => {
                self.status = JobStatus::Queued;
            }
            JobStatus::Downloading => {
                self.status = JobStatus::Downloading;
                self.progress = update.progress.clamp(0.0, 100.0);
            }
            JobStatus::Completed => {
                self.status = JobStatus::Completed;
                self.progress = 100.0;
                self.filename = update.filename.clone();
                self.filesize = update.filesize;
            }
            JobStatus::Error => {
                // keep the last progress on screen
                self.status = JobStatus::Error;
                self.error = update.message.clone();
            }
            JobStatus::Unknown(_) => return false,
        }
        true
    }
}

/// yt-dlp passes missing values through as `null`; treat them like absent keys.
fn de_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// yt-dlp reports `filesize_approx` as a float, so sizes may arrive either way.
fn de_opt_bytes<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(raw.filter(|v| v.is_finite() && *v >= 0.0).map(|v| v as u64))
}
