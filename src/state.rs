//! Explicit UI state and the reducer that folds backend results into it.

use std::path::PathBuf;

use tracing::debug;

use crate::model::{DependencyStatus, DownloadJob, FormatKind, JobProgress, JobStatus, VideoMetadata};

pub const EMPTY_URL_MESSAGE: &str = "Enter a video URL first";
pub const INFO_FAILED_MESSAGE: &str = "Failed to fetch video information";
pub const DOWNLOAD_FAILED_MESSAGE: &str = "Failed to start download";
pub const JOB_FAILED_MESSAGE: &str = "Download failed";
pub const SAVE_FAILED_MESSAGE: &str = "Failed to save file";

/// Where the page is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    FetchingInfo,
    FormatSelected,
    Downloading,
    Complete,
    Error,
}

/// The format option the user clicked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub kind: FormatKind,
    pub format_id: String,
}

/// Metadata together with the URL it was fetched for
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedVideo {
    pub url: String,
    pub metadata: VideoMetadata,
}

/// Contents of the download section
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadSection {
    /// `POST /download` is in flight
    Starting,
    /// The backend refused to start the job
    StartFailed(String),
    Tracking(DownloadJob),
    /// Polling stopped on a transport failure
    ConnectionLost(DownloadJob),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saving,
    Saved(PathBuf),
    Failed(String),
}

/// Results reported back by spawned backend calls
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Dependencies(DependencyStatus),
    InfoLoaded { url: String, metadata: VideoMetadata },
    InfoFailed(String),
    DownloadStarted { generation: u64, job_id: String },
    DownloadFailed { generation: u64, message: String },
    Progress { generation: u64, update: JobProgress },
    ConnectionLost { generation: u64 },
    FileSaved { generation: u64, path: PathBuf },
    SaveFailed { generation: u64, message: String },
}

/// Follow-up work the controller must perform after applying an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Begin polling this job
    Poll(String),
}

/// Everything the window shows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiState {
    /// Text of the URL box
    pub url_input: String,
    pub phase: Phase,
    /// Unset until `/check-dependencies` answers
    pub dependencies: Option<DependencyStatus>,
    /// Inline error under the URL box
    pub error: Option<String>,
    /// Lookups sent but not yet answered
    pub pending_lookups: u32,
    pub video: Option<LoadedVideo>,
    pub active_tab: Option<FormatKind>,
    pub selection: Option<Selection>,
    pub download: Option<DownloadSection>,
    pub save: Option<SaveOutcome>,
    /// Bumped by every download start; older events are stale
    pub generation: u64,
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tab(&self) -> FormatKind {
        self.active_tab.unwrap_or(FormatKind::Audio)
    }

    /// Current job, if the backend accepted one.
    pub fn job(&self) -> Option<&DownloadJob> {
        match &self.download {
            Some(DownloadSection::Tracking(job)) | Some(DownloadSection::ConnectionLost(job)) => {
                Some(job)
            }
            _ => None,
        }
    }

    pub fn reject_lookup(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.phase = Phase::Error;
    }

    pub fn begin_lookup(&mut self) {
        self.error = None;
        self.video = None;
        self.selection = None;
        self.pending_lookups += 1;
        self.phase = Phase::FetchingInfo;
    }

    pub fn select(&mut self, kind: FormatKind, format_id: impl Into<String>) {
        self.selection = Some(Selection {
            kind,
            format_id: format_id.into(),
        });
        self.phase = Phase::FormatSelected;
    }

    /// Reset the download section for a new job and return its generation.
    pub fn begin_download(&mut self) -> u64 {
        self.generation += 1;
        self.download = Some(DownloadSection::Starting);
        self.save = None;
        self.phase = Phase::Downloading;
        self.generation
    }

    /// Make `job_id` the tracked job and return the generation to poll it under.
    ///
    /// A job other than the current one starts a fresh generation.
    pub fn track(&mut self, job_id: &str) -> u64 {
        if let Some(DownloadSection::Tracking(job)) = &self.download {
            if job.id == job_id {
                return self.generation;
            }
        }
        self.generation += 1;
        self.download = Some(DownloadSection::Tracking(DownloadJob::new(job_id)));
        self.save = None;
        self.phase = Phase::Downloading;
        self.generation
    }

    pub fn begin_save(&mut self) {
        self.save = Some(SaveOutcome::Saving);
    }

    pub fn apply(&mut self, event: Event) -> Effect {
        match event {
            Event::Dependencies(status) => {
                self.dependencies = Some(status);
            }
            Event::InfoLoaded { url, metadata } => {
                self.pending_lookups = self.pending_lookups.saturating_sub(1);
                self.error = None;
                self.selection = None;
                self.video = Some(LoadedVideo { url, metadata });
                self.phase = Phase::Idle;
            }
            Event::InfoFailed(message) => {
                self.pending_lookups = self.pending_lookups.saturating_sub(1);
                self.video = None;
                self.reject_lookup(message);
            }
            Event::DownloadStarted { generation, job_id } => {
                if self.is_stale(generation) {
                    return Effect::None;
                }
                self.download = Some(DownloadSection::Tracking(DownloadJob::new(job_id.clone())));
                return Effect::Poll(job_id);
            }
            Event::DownloadFailed {
                generation,
                message,
            } => {
                if self.is_stale(generation) {
                    return Effect::None;
                }
                self.download = Some(DownloadSection::StartFailed(message));
                self.phase = Phase::Error;
            }
            Event::Progress { generation, update } => {
                if self.is_stale(generation) {
                    return Effect::None;
                }
                if let Some(DownloadSection::Tracking(job)) = &mut self.download {
                    if !job.apply(&update) {
                        debug!(job_id = %job.id, status = ?update.status, "unrecognised job status, still polling");
                    }
                    match job.status {
                        JobStatus::Completed => self.phase = Phase::Complete,
                        JobStatus::Error => self.phase = Phase::Error,
                        _ => {}
                    }
                }
            }
            Event::ConnectionLost { generation } => {
                if self.is_stale(generation) {
                    return Effect::None;
                }
                if let Some(DownloadSection::Tracking(job)) = &self.download {
                    self.download = Some(DownloadSection::ConnectionLost(job.clone()));
                    self.phase = Phase::Error;
                }
            }
            Event::FileSaved { generation, path } => {
                if !self.is_stale(generation) {
                    self.save = Some(SaveOutcome::Saved(path));
                }
            }
            Event::SaveFailed {
                generation,
                message,
            } => {
                if !self.is_stale(generation) {
                    self.save = Some(SaveOutcome::Failed(message));
                }
            }
        }
        Effect::None
    }

    fn is_stale(&self, generation: u64) -> bool {
        if generation != self.generation {
            debug!(generation, current = self.generation, "dropping stale download event");
            return true;
        }
        false
    }
}
