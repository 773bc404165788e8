//! Drive a run while forwarding its progress events.

use std::future::Future;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{Duration, Instant};

/// Upper bound on draining events after the task finishes, in case a sender
/// outlives it.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Run `task` to completion, handing every event from `events` to
/// `on_event`. Events still queued when the task ends are drained before
/// returning.
pub async fn run_with_events<F, E, R>(
    task: F,
    mut events: UnboundedReceiver<E>,
    mut on_event: impl FnMut(E),
) -> R
where
    F: Future<Output = R>,
{
    tokio::pin!(task);

    let finished = loop {
        tokio::select! {
            r = &mut task => break Some(r),
            event = events.recv() => match event {
                Some(e) => on_event(e),
                None => break None,
            }
        }
    };

    let Some(result) = finished else {
        // All senders gone; the task can finish on its own.
        log::debug!("run_with_events: channel closed before task finished");
        return task.await;
    };

    let deadline = Instant::now() + DRAIN_TIMEOUT;
    loop {
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Some(e)) => on_event(e),
            Ok(None) => break,
            Err(_) => {
                log::warn!(
                    "run_with_events: gave up draining events after {}s",
                    DRAIN_TIMEOUT.as_secs()
                );
                break;
            }
        }
    }

    result
}
