//! Pure projection of [`UiState`] into display strings.

use crate::model::{AudioFormat, DownloadJob, FormatKind, JobStatus, VideoFormat};
use crate::state::{
    DownloadSection, SaveOutcome, UiState, JOB_FAILED_MESSAGE, SAVE_FAILED_MESSAGE,
};

/// Dependency indicator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub label: String,
    pub ok: bool,
}

/// One clickable format option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    pub kind: FormatKind,
    pub format_id: String,
    pub quality: String,
    pub size: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InfoView {
    pub title: String,
    pub uploader: String,
    pub platform: String,
    pub duration: String,
    pub thumbnail: Option<String>,
    pub active_tab: FormatKind,
    pub audio: Vec<OptionView>,
    pub video: Vec<OptionView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadView {
    pub status: String,
    pub percent: String,
    /// Progress bar fill in 0.0..=1.0
    pub fill: f32,
    /// Bar drawn in the error colour
    pub failed: bool,
    /// Set once the file can be fetched
    pub ready_job: Option<String>,
    pub file: Option<String>,
    pub save_note: Option<String>,
}

/// Everything the window paints for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    /// Empty until the dependency check answers
    pub badges: Vec<Badge>,
    pub fetching: bool,
    pub error: Option<String>,
    pub info: Option<InfoView>,
    pub download: Option<DownloadView>,
}

pub fn render(state: &UiState) -> View {
    let badges = state
        .dependencies
        .map(|deps| vec![badge("yt-dlp", deps.ytdlp), badge("ffmpeg", deps.ffmpeg)])
        .unwrap_or_default();

    let info = state.video.as_ref().map(|video| {
        let meta = &video.metadata;
        let is_selected = |kind: FormatKind, id: &str| {
            state
                .selection
                .as_ref()
                .is_some_and(|s| s.kind == kind && s.format_id == id)
        };
        InfoView {
            title: meta.title.clone(),
            uploader: meta.uploader.clone(),
            platform: meta.platform.clone(),
            duration: format_duration(meta.duration),
            thumbnail: meta.thumbnail.clone().filter(|t| !t.is_empty()),
            active_tab: state.tab(),
            audio: meta
                .audio_formats
                .iter()
                .map(|f| audio_option(f, is_selected(FormatKind::Audio, &f.id)))
                .collect(),
            video: meta
                .video_formats
                .iter()
                .map(|f| video_option(f, is_selected(FormatKind::Video, &f.id)))
                .collect(),
        }
    });

    let download = state
        .download
        .as_ref()
        .map(|section| download_view(section, state.save.as_ref()));

    View {
        badges,
        fetching: state.pending_lookups > 0,
        error: state.error.clone(),
        info,
        download,
    }
}

fn badge(name: &str, ok: bool) -> Badge {
    Badge {
        label: format!("{}: {}", name, if ok { '✓' } else { '✗' }),
        ok,
    }
}

fn audio_option(fmt: &AudioFormat, selected: bool) -> OptionView {
    OptionView {
        kind: FormatKind::Audio,
        format_id: fmt.id.clone(),
        quality: audio_quality(fmt.abr),
        size: size_label(fmt.filesize),
        selected,
    }
}

fn video_option(fmt: &VideoFormat, selected: bool) -> OptionView {
    OptionView {
        kind: FormatKind::Video,
        format_id: fmt.id.clone(),
        quality: video_quality(fmt.height),
        size: size_label(fmt.filesize),
        selected,
    }
}

fn download_view(section: &DownloadSection, save: Option<&SaveOutcome>) -> DownloadView {
    let mut view = DownloadView {
        status: "Starting download...".to_string(),
        percent: "0%".to_string(),
        fill: 0.0,
        failed: false,
        ready_job: None,
        file: None,
        save_note: None,
    };
    match section {
        DownloadSection::Starting => {}
        DownloadSection::StartFailed(message) => {
            view.status = format!("Error: {}", message);
            view.failed = true;
        }
        DownloadSection::Tracking(job) => {
            show_progress(&mut view, job);
            match &job.status {
                JobStatus::Downloading => view.status = "Downloading...".to_string(),
                JobStatus::Completed => {
                    view.status = "Download complete!".to_string();
                    view.percent = "100%".to_string();
                    view.fill = 1.0;
                    view.ready_job = Some(job.id.clone());
                    view.file = job.filename.as_ref().map(|name| {
                        match format_file_size(job.filesize).as_str() {
                            "" => name.clone(),
                            size => format!("{} ({})", name, size),
                        }
                    });
                    view.save_note = save.map(save_note);
                }
                JobStatus::Error => {
                    let message = job.error.as_deref().unwrap_or(JOB_FAILED_MESSAGE);
                    view.status = format!("Error: {}", message);
                    view.failed = true;
                }
                JobStatus::Queued | JobStatus::Unknown(_) => {}
            }
        }
        DownloadSection::ConnectionLost(job) => {
            show_progress(&mut view, job);
            view.status = "Error: Connection lost".to_string();
        }
    }
    view
}

fn show_progress(view: &mut DownloadView, job: &DownloadJob) {
    view.percent = format!("{}%", job.progress.round() as i64);
    view.fill = (job.progress / 100.0).clamp(0.0, 1.0) as f32;
}

fn save_note(outcome: &SaveOutcome) -> String {
    match outcome {
        SaveOutcome::Saving => "Saving...".to_string(),
        SaveOutcome::Saved(path) => format!("Saved to {}", path.display()),
        SaveOutcome::Failed(message) if message.is_empty() => {
            format!("Error: {}", SAVE_FAILED_MESSAGE)
        }
        SaveOutcome::Failed(message) => format!("Error: {}", message),
    }
}

/// Seconds as `m:ss`; `--:--` when unknown or zero.
pub fn format_duration(seconds: Option<f64>) -> String {
    match seconds {
        Some(s) if s.is_finite() && s > 0.0 => {
            let mins = (s / 60.0).floor() as u64;
            let secs = (s % 60.0).floor() as u64;
            format!("{}:{:02}", mins, secs)
        }
        _ => "--:--".to_string(),
    }
}

/// Bytes as KB below one megabyte, MB otherwise; empty when unknown or zero.
pub fn format_file_size(bytes: Option<u64>) -> String {
    let bytes = match bytes {
        Some(b) if b > 0 => b as f64,
        _ => return String::new(),
    };
    let mb = bytes / (1024.0 * 1024.0);
    if mb < 1.0 {
        return format!("{:.1} KB", bytes / 1024.0);
    }
    format!("{:.1} MB", mb)
}

pub fn audio_quality(abr: Option<f64>) -> String {
    match abr {
        Some(kbps) if kbps > 0.0 => format!("{}kbps", kbps.round() as u64),
        _ => "?kbps".to_string(),
    }
}

pub fn video_quality(height: Option<u32>) -> String {
    match height {
        Some(h) => format!("{}p", h),
        None => "?p".to_string(),
    }
}

fn size_label(bytes: Option<u64>) -> String {
    match format_file_size(bytes) {
        s if s.is_empty() => "Unknown size".to_string(),
        s => s,
    }
}
