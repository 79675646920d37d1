use std::{sync::Arc, time::Duration};

use tokio::{runtime::Handle, sync::mpsc::UnboundedSender, task::JoinHandle};
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::state::Event;

/// Polls `/progress/{job_id}` until the job completes or fails.
///
/// Requests are strictly sequential: the next one is issued `interval` after
/// the previous response has been forwarded. A failed request ends the loop
/// with [`Event::ConnectionLost`]; it is never retried.
pub async fn poll_until_done(
    backend: Arc<dyn Backend>,
    job_id: String,
    generation: u64,
    interval: Duration,
    events: UnboundedSender<Event>,
) {
    loop {
        match backend.progress(&job_id).await {
            Ok(update) => {
                debug!(job_id = %job_id, status = ?update.status, progress = update.progress, "poll");
                let terminal = update.status.is_terminal();
                if events.send(Event::Progress { generation, update }).is_err() {
                    // controller is gone
                    return;
                }
                if terminal {
                    return;
                }
            }
            Err(err) => {
                warn!(job_id = %job_id, error = %err, "progress poll failed, giving up");
                let _ = events.send(Event::ConnectionLost { generation });
                return;
            }
        }
        tokio::time::sleep(interval).await;
    }
}

/// Running poll loop for one job. Dropping the handle stops the loop.
pub struct PollHandle {
    job_id: String,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn spawn(
        runtime: &Handle,
        backend: Arc<dyn Backend>,
        job_id: String,
        generation: u64,
        interval: Duration,
        events: UnboundedSender<Event>,
    ) -> Self {
        let task = runtime.spawn(poll_until_done(
            backend,
            job_id.clone(),
            generation,
            interval,
            events,
        ));
        Self { job_id, task }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn stop(&self) {
        if !self.task.is_finished() {
            debug!(job_id = %self.job_id, "stopping superseded poll loop");
        }
        self.task.abort();
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
