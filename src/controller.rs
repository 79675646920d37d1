use std::{path::PathBuf, sync::Arc, time::Duration};

use tokio::{
    runtime::Handle,
    sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
};
use tracing::{error, info, warn};

use crate::backend::Backend;
use crate::model::FormatKind;
use crate::progress::PollHandle;
use crate::render::{render, View};
use crate::state::{
    Effect, Event, UiState, DOWNLOAD_FAILED_MESSAGE, EMPTY_URL_MESSAGE, INFO_FAILED_MESSAGE,
    SAVE_FAILED_MESSAGE,
};

/// Drives the page: turns user actions into backend calls and folds the
/// results back into [`UiState`].
///
/// Backend calls run as tasks on `runtime` and report through a channel;
/// nothing touches the state until [`pump`](Self::pump) or
/// [`process_next`](Self::process_next) applies their events on the caller's
/// thread.
pub struct ClientController {
    backend: Arc<dyn Backend>,
    runtime: Handle,
    poll_interval: Duration,
    state: UiState,
    events_tx: UnboundedSender<Event>,
    events_rx: UnboundedReceiver<Event>,
    /// Poll loop of the current job
    poller: Option<PollHandle>,
}

impl ClientController {
    pub fn new(backend: Arc<dyn Backend>, runtime: Handle, poll_interval: Duration) -> Self {
        let (events_tx, events_rx) = unbounded_channel();
        Self {
            backend,
            runtime,
            poll_interval,
            state: UiState::new(),
            events_tx,
            events_rx,
            poller: None,
        }
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut UiState {
        &mut self.state
    }

    pub fn view(&self) -> View {
        render(&self.state)
    }

    /// Whether a poll loop is still running for the current job.
    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(|p| !p.is_finished())
    }

    /// Ask the backend which external tools it has. Failures are only logged.
    pub fn check_dependencies(&self) {
        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        self.runtime.spawn(async move {
            match backend.check_dependencies().await {
                Ok(status) => {
                    info!(ytdlp = status.ytdlp, ffmpeg = status.ffmpeg, "dependency check");
                    let _ = tx.send(Event::Dependencies(status));
                }
                Err(err) => error!(error = %err, "failed to check dependencies"),
            }
        });
    }

    /// Look up `url` with the text currently in the URL box.
    pub fn submit(&mut self) -> bool {
        let url = self.state.url_input.clone();
        self.fetch_video_info(&url)
    }

    /// Request metadata for `url`.
    ///
    /// Returns `false` without touching the network when `url` is blank.
    /// Overlapping lookups aren't prevented; whichever answers last is shown.
    pub fn fetch_video_info(&mut self, url: &str) -> bool {
        let url = url.trim().to_string();
        if url.is_empty() {
            self.state.reject_lookup(EMPTY_URL_MESSAGE);
            return false;
        }

        info!(url = %url, "fetching video info");
        self.state.begin_lookup();
        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        self.runtime.spawn(async move {
            let event = match backend.get_info(&url).await {
                Ok(metadata) => Event::InfoLoaded { url, metadata },
                Err(err) => {
                    warn!(error = %err, "video info lookup failed");
                    Event::InfoFailed(err.user_message(INFO_FAILED_MESSAGE))
                }
            };
            let _ = tx.send(event);
        });
        true
    }

    pub fn set_active_tab(&mut self, kind: FormatKind) {
        self.state.active_tab = Some(kind);
    }

    /// Mark one option selected and start downloading it straight away.
    pub fn select_format(&mut self, kind: FormatKind, format_id: &str) {
        let Some(video) = self.state.video.as_ref() else {
            warn!(format_id, "format selected with no video loaded");
            return;
        };
        if !video.metadata.has_format(kind, format_id) {
            warn!(format_id, %kind, "unknown format selected");
            return;
        }
        let url = video.url.clone();
        let title = video.metadata.title.clone();

        self.state.select(kind, format_id);
        self.start_download(&url, kind, format_id, &title);
    }

    /// Ask the backend to start a job; polling begins once it is accepted.
    ///
    /// Any job tracked so far is superseded and its poll loop stopped.
    pub fn start_download(&mut self, url: &str, kind: FormatKind, format_id: &str, title: &str) {
        if let Some(old) = self.poller.take() {
            old.stop();
        }
        let generation = self.state.begin_download();
        info!(url, %kind, format_id, generation, "starting download");

        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        let (url, format_id, title) = (url.to_string(), format_id.to_string(), title.to_string());
        self.runtime.spawn(async move {
            let event = match backend.start_download(&url, kind, &format_id, &title).await {
                Ok(job_id) => Event::DownloadStarted { generation, job_id },
                Err(err) => {
                    warn!(error = %err, "download request failed");
                    Event::DownloadFailed {
                        generation,
                        message: err.user_message(DOWNLOAD_FAILED_MESSAGE),
                    }
                }
            };
            let _ = tx.send(event);
        });
    }

    /// Start polling `job_id`, tracking it in the download section.
    ///
    /// Polling a job other than the current one supersedes it.
    pub fn poll_progress(&mut self, job_id: String) {
        if let Some(old) = self.poller.take() {
            old.stop();
        }
        let generation = self.state.track(&job_id);
        self.poller = Some(PollHandle::spawn(
            &self.runtime,
            Arc::clone(&self.backend),
            job_id,
            generation,
            self.poll_interval,
            self.events_tx.clone(),
        ));
    }

    /// Fetch the finished file of `job_id` and write it to `destination`.
    pub fn save_file(&mut self, job_id: &str, destination: PathBuf) {
        let generation = self.state.generation;
        self.state.begin_save();
        info!(job_id, path = %destination.display(), "saving file");

        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        let job_id = job_id.to_string();
        self.runtime.spawn(async move {
            let result = async {
                let bytes = backend.download_file(&job_id).await?;
                if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&destination, bytes).await?;
                Ok::<_, crate::error::ClientError>(())
            }
            .await;
            let event = match result {
                Ok(()) => Event::FileSaved {
                    generation,
                    path: destination,
                },
                Err(err) => {
                    error!(error = %err, "saving file failed");
                    Event::SaveFailed {
                        generation,
                        message: err.user_message(SAVE_FAILED_MESSAGE),
                    }
                }
            };
            let _ = tx.send(event);
        });
    }

    /// Apply every event that has arrived so far. Returns whether any did.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle(event);
            changed = true;
        }
        changed
    }

    /// Wait for the next event and apply it.
    pub async fn process_next(&mut self) -> Option<Event> {
        let event = self.events_rx.recv().await?;
        self.handle(event.clone());
        Some(event)
    }

    fn handle(&mut self, event: Event) {
        if let Effect::Poll(job_id) = self.state.apply(event) {
            self.poll_progress(job_id);
        }
    }
}
