#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{connection_error, controller, idle, sample_metadata, FakeBackend, POLL_INTERVAL};
use tokio::runtime::Handle;
use tokio::sync::mpsc::unbounded_channel;
use vidgrab::backend::Backend;
use vidgrab::model::{FormatKind, JobProgress, JobStatus};
use vidgrab::progress::{poll_until_done, PollHandle};
use vidgrab::state::{DownloadSection, Event, Phase};
use vidgrab::ClientController;

/// Load sample metadata and pick an audio format backed by `job_id`.
async fn downloading(backend: &Arc<FakeBackend>, job_id: &str) -> ClientController {
    backend.push_info(Ok(sample_metadata("Clip")));
    backend.push_download(Ok(job_id.to_string()));
    let mut ctl = controller(backend);
    ctl.fetch_video_info("https://youtu.be/abc");
    ctl.process_next().await;
    ctl.select_format(FormatKind::Audio, "251");
    let started = ctl.process_next().await.unwrap();
    assert!(matches!(started, Event::DownloadStarted { .. }));
    ctl
}

async fn next_progress(ctl: &mut ClientController) -> Event {
    let event = ctl.process_next().await.unwrap();
    assert!(
        matches!(event, Event::Progress { .. } | Event::ConnectionLost { .. }),
        "unexpected event: {event:?}"
    );
    event
}

// === Poll loop ===

#[tokio::test(start_paused = true)]
async fn loop_forwards_until_completed() {
    let backend = FakeBackend::new();
    backend.push_progress("j", Ok(JobProgress::new("downloading", 50.0)));
    backend.push_progress("j", Ok(JobProgress::new("completed", 100.0)));
    let (tx, mut rx) = unbounded_channel();

    let dyn_backend: Arc<dyn Backend> = backend.clone();
    poll_until_done(dyn_backend, "j".into(), 7, POLL_INTERVAL, tx).await;

    let mut statuses = Vec::new();
    while let Ok(event) = rx.try_recv() {
        match event {
            Event::Progress { generation, update } => {
                assert_eq!(generation, 7);
                statuses.push(update.status);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
    assert_eq!(statuses, vec![JobStatus::Downloading, JobStatus::Completed]);
    assert_eq!(backend.progress_calls("j"), 2);
}

#[tokio::test(start_paused = true)]
async fn loop_waits_one_interval_between_polls() {
    let backend = FakeBackend::new();
    let (tx, _rx) = unbounded_channel();
    let dyn_backend: Arc<dyn Backend> = backend.clone();
    let handle = PollHandle::spawn(&Handle::current(), dyn_backend, "j".into(), 1, POLL_INTERVAL, tx);

    idle(Duration::from_millis(10)).await;
    assert_eq!(backend.progress_calls("j"), 1);
    idle(POLL_INTERVAL).await;
    assert_eq!(backend.progress_calls("j"), 2);
    idle(POLL_INTERVAL * 2).await;
    assert_eq!(backend.progress_calls("j"), 4);

    handle.stop();
    idle(POLL_INTERVAL * 4).await;
    assert_eq!(backend.progress_calls("j"), 4);
    assert_eq!(handle.job_id(), "j");
}

#[tokio::test(start_paused = true)]
async fn dropping_handle_stops_loop() {
    let backend = FakeBackend::new();
    let (tx, _rx) = unbounded_channel();
    let dyn_backend: Arc<dyn Backend> = backend.clone();
    let handle = PollHandle::spawn(&Handle::current(), dyn_backend, "j".into(), 1, POLL_INTERVAL, tx);

    idle(Duration::from_millis(10)).await;
    drop(handle);
    idle(POLL_INTERVAL * 4).await;
    assert_eq!(backend.progress_calls("j"), 1);
}

#[tokio::test(start_paused = true)]
async fn loop_ends_when_receiver_is_gone() {
    let backend = FakeBackend::new();
    let (tx, rx) = unbounded_channel();
    drop(rx);
    let dyn_backend: Arc<dyn Backend> = backend.clone();
    poll_until_done(dyn_backend, "j".into(), 1, POLL_INTERVAL, tx).await;
    assert_eq!(backend.progress_calls("j"), 1);
}

// === Through the controller ===

#[tokio::test(start_paused = true)]
async fn full_job_ends_in_single_completed_state() {
    let backend = FakeBackend::new();
    backend.push_progress("job-1", Ok(JobProgress::new("queued", 0.0)));
    backend.push_progress("job-1", Ok(JobProgress::new("downloading", 40.0)));
    backend.push_progress("job-1", Ok(JobProgress::new("downloading", 90.0)));
    backend.push_progress("job-1", Ok(JobProgress::new("completed", 100.0)));
    let mut ctl = downloading(&backend, "job-1").await;

    next_progress(&mut ctl).await;
    assert_eq!(ctl.view().download.unwrap().status, "Starting download...");

    next_progress(&mut ctl).await;
    let dl = ctl.view().download.unwrap();
    assert_eq!(dl.status, "Downloading...");
    assert_eq!(dl.percent, "40%");

    next_progress(&mut ctl).await;
    assert_eq!(ctl.view().download.unwrap().percent, "90%");

    next_progress(&mut ctl).await;
    let dl = ctl.view().download.unwrap();
    assert_eq!(dl.status, "Download complete!");
    assert_eq!(dl.percent, "100%");
    assert_eq!(dl.ready_job.as_deref(), Some("job-1"));
    assert_eq!(ctl.state().phase, Phase::Complete);

    idle(Duration::from_secs(10)).await;
    assert!(!ctl.pump());
    assert!(!ctl.is_polling());
    assert_eq!(backend.progress_calls("job-1"), 4);
}

#[tokio::test(start_paused = true)]
async fn connection_loss_stops_polling_for_good() {
    let backend = FakeBackend::new();
    backend.push_progress("job-1", Ok(JobProgress::new("downloading", 10.0)));
    backend.push_progress("job-1", Err(connection_error()));
    // backend "recovers" afterwards
    backend.push_progress("job-1", Ok(JobProgress::new("downloading", 50.0)));
    backend.push_progress("job-1", Ok(JobProgress::new("completed", 100.0)));
    let mut ctl = downloading(&backend, "job-1").await;

    next_progress(&mut ctl).await;
    let lost = next_progress(&mut ctl).await;
    assert!(matches!(lost, Event::ConnectionLost { .. }));

    idle(Duration::from_secs(10)).await;
    assert!(!ctl.pump());
    assert_eq!(backend.progress_calls("job-1"), 2);

    let dl = ctl.view().download.unwrap();
    assert_eq!(dl.status, "Error: Connection lost");
    assert_eq!(dl.percent, "10%");
    assert!(dl.ready_job.is_none());
    assert!(matches!(ctl.state().download, Some(DownloadSection::ConnectionLost(_))));
}

#[tokio::test(start_paused = true)]
async fn backend_job_error_is_terminal() {
    let backend = FakeBackend::new();
    backend.push_progress("job-1", Ok(JobProgress::new("downloading", 30.0)));
    backend.push_progress(
        "job-1",
        Ok(JobProgress::new("error", 0.0).with_message("Download gagal")),
    );
    let mut ctl = downloading(&backend, "job-1").await;

    next_progress(&mut ctl).await;
    next_progress(&mut ctl).await;
    idle(Duration::from_secs(10)).await;

    assert!(!ctl.pump());
    assert_eq!(backend.progress_calls("job-1"), 2);
    let dl = ctl.view().download.unwrap();
    assert_eq!(dl.status, "Error: Download gagal");
    assert!(dl.failed);
    assert_eq!(ctl.state().phase, Phase::Error);
}

#[tokio::test(start_paused = true)]
async fn unrecognised_status_keeps_polling() {
    let backend = FakeBackend::new();
    backend.push_progress("job-1", Ok(JobProgress::new("not_found", 0.0)));
    backend.push_progress("job-1", Ok(JobProgress::new("paused", 0.0)));
    backend.push_progress("job-1", Ok(JobProgress::new("downloading", 55.0)));
    backend.push_progress("job-1", Ok(JobProgress::new("completed", 100.0)));
    let mut ctl = downloading(&backend, "job-1").await;

    for _ in 0..4 {
        next_progress(&mut ctl).await;
    }
    assert_eq!(ctl.view().download.unwrap().status, "Download complete!");
    assert_eq!(backend.progress_calls("job-1"), 4);
}

#[tokio::test(start_paused = true)]
async fn new_download_supersedes_previous_job() {
    let backend = FakeBackend::new();
    // job-a never finishes; job-b completes on the first poll
    backend.push_progress("job-b", Ok(JobProgress::new("completed", 100.0)));
    let mut ctl = downloading(&backend, "job-a").await;
    next_progress(&mut ctl).await;

    backend.push_download(Ok("job-b".into()));
    ctl.select_format(FormatKind::Video, "136");
    let calls_a = backend.progress_calls("job-a");

    loop {
        ctl.process_next().await;
        if ctl.state().job().is_some_and(|j| j.id == "job-b" && j.status == JobStatus::Completed) {
            break;
        }
    }

    idle(Duration::from_secs(10)).await;
    ctl.pump();
    assert_eq!(backend.progress_calls("job-a"), calls_a);
    assert_eq!(backend.progress_calls("job-b"), 1);
    assert_eq!(ctl.view().download.unwrap().ready_job.as_deref(), Some("job-b"));
    let selected: Vec<_> = ctl
        .view()
        .info
        .unwrap()
        .video
        .into_iter()
        .filter(|o| o.selected)
        .map(|o| o.format_id)
        .collect();
    assert_eq!(selected, vec!["136".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn polling_a_job_directly_tracks_it() {
    let backend = FakeBackend::new();
    backend.push_progress("job-x", Ok(JobProgress::new("downloading", 25.0)));
    backend.push_progress("job-x", Ok(JobProgress::new("completed", 100.0)));
    let mut ctl = controller(&backend);

    ctl.poll_progress("job-x".into());
    assert_eq!(ctl.state().job().map(|j| j.id.as_str()), Some("job-x"));
    assert_eq!(ctl.state().phase, Phase::Downloading);

    next_progress(&mut ctl).await;
    assert_eq!(ctl.view().download.unwrap().percent, "25%");
    next_progress(&mut ctl).await;

    let dl = ctl.view().download.unwrap();
    assert_eq!(dl.status, "Download complete!");
    assert_eq!(dl.ready_job.as_deref(), Some("job-x"));
    assert_eq!(backend.progress_calls("job-x"), 2);
}

#[tokio::test(start_paused = true)]
async fn polling_another_job_supersedes_current_one() {
    let backend = FakeBackend::new();
    backend.push_progress("job-b", Ok(JobProgress::new("completed", 100.0)));
    let mut ctl = downloading(&backend, "job-a").await;
    next_progress(&mut ctl).await;
    let calls_a = backend.progress_calls("job-a");

    ctl.poll_progress("job-b".into());
    loop {
        ctl.process_next().await;
        if ctl.state().job().is_some_and(|j| j.status == JobStatus::Completed) {
            break;
        }
    }
    idle(Duration::from_secs(10)).await;
    ctl.pump();

    assert_eq!(backend.progress_calls("job-a"), calls_a);
    assert_eq!(ctl.view().download.unwrap().ready_job.as_deref(), Some("job-b"));
}

// === Saving ===

#[tokio::test(start_paused = true)]
async fn finished_file_is_written_to_disk() {
    let backend = FakeBackend::new();
    backend.push_progress("job-1", Ok(JobProgress::new("completed", 100.0)));
    backend.push_file(Ok(b"ID3 fake mp3".to_vec()));
    let mut ctl = downloading(&backend, "job-1").await;
    next_progress(&mut ctl).await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("music").join("clip.mp3");
    ctl.save_file("job-1", dest.clone());
    assert_eq!(ctl.view().download.unwrap().save_note.as_deref(), Some("Saving..."));

    let event = ctl.process_next().await.unwrap();
    assert!(matches!(event, Event::FileSaved { ref path, .. } if *path == dest));
    assert_eq!(std::fs::read(&dest).unwrap(), b"ID3 fake mp3");
    assert!(ctl
        .view()
        .download
        .unwrap()
        .save_note
        .unwrap()
        .starts_with("Saved to "));
}

#[tokio::test(start_paused = true)]
async fn failed_save_is_reported() {
    let backend = FakeBackend::new();
    backend.push_progress("job-1", Ok(JobProgress::new("completed", 100.0)));
    backend.push_file(Err(vidgrab::ClientError::Backend("File tidak ditemukan".into())));
    let mut ctl = downloading(&backend, "job-1").await;
    next_progress(&mut ctl).await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("clip.mp3");
    ctl.save_file("job-1", dest.clone());
    ctl.process_next().await;

    assert!(!dest.exists());
    assert_eq!(
        ctl.view().download.unwrap().save_note.as_deref(),
        Some("Error: File tidak ditemukan")
    );
}
