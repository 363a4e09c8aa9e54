use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::ReliabilityConfig;

const MIN_INITIAL_BACKOFF_SECS: u64 = 1;

/// A long-running inbound connection that can be restarted after it ends.
pub trait Listener: Send + Sync {
    fn name(&self) -> &str;

    /// Run until the connection ends. `Ok(())` means a clean reconnect
    /// request rather than a failure.
    fn listen<'a>(&'a self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;
}

/// `(initial, max)` restart backoff in seconds.
pub fn backoff_settings(reliability: &ReliabilityConfig) -> (u64, u64) {
    let initial = reliability
        .channel_initial_backoff_secs
        .max(MIN_INITIAL_BACKOFF_SECS);
    let max = reliability.channel_max_backoff_secs.max(initial);
    (initial, max)
}

/// Keep `listener` running, sleeping with exponential backoff between runs.
///
/// A clean exit restarts after the initial delay; consecutive failures double
/// the delay up to `max_backoff_secs`.
pub fn spawn_supervised(
    listener: Arc<dyn Listener>,
    initial_backoff_secs: u64,
    max_backoff_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let initial = initial_backoff_secs.max(MIN_INITIAL_BACKOFF_SECS);
        let max = max_backoff_secs.max(initial);
        let mut backoff = initial;

        loop {
            tracing::debug!(listener = listener.name(), "listener starting");
            match listener.listen().await {
                Ok(()) => {
                    tracing::info!(listener = listener.name(), "listener ended; reconnecting");
                    backoff = initial;
                }
                Err(error) => {
                    tracing::error!(
                        listener = listener.name(),
                        backoff_secs = backoff,
                        error = %error,
                        "listener failed; restarting"
                    );
                }
            }

            tokio::time::sleep(Duration::from_secs(backoff)).await;
            backoff = backoff.saturating_mul(2).min(max);
        }
    })
}

/// Run `handle` on every event from `events`, concurrently, until `source`
/// ends or the channel closes, then return the source's outcome.
///
/// Handlers already started, and events already queued, run to completion
/// before anything is returned, even when the source failed.
pub async fn drive_events<E, F, Fut>(
    mut events: mpsc::Receiver<E>,
    mut source: JoinHandle<anyhow::Result<()>>,
    handle: F,
) -> anyhow::Result<()>
where
    F: Fn(E) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut in_flight = FuturesUnordered::new();
    let mut finished = None;
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    break;
                };
                in_flight.push(handle(event));
            }
            Some(()) = in_flight.next(), if !in_flight.is_empty() => {}
            result = &mut source => {
                finished = Some(result);
                break;
            }
        }
    }

    events.close();
    while let Some(event) = events.recv().await {
        in_flight.push(handle(event));
    }
    if !in_flight.is_empty() {
        tracing::debug!(pending = in_flight.len(), "finishing in-flight events");
    }
    while in_flight.next().await.is_some() {}

    let result = match finished {
        Some(result) => result,
        None => source.await,
    };
    match result {
        Ok(outcome) => outcome,
        Err(error) => anyhow::bail!("event source task panicked: {error}"),
    }
}
