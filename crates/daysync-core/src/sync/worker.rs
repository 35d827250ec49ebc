use std::future::pending;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep_until, Interval, MissedTickBehavior};

use crate::remote::RemoteStore;
use crate::store::LocalStore;
use crate::sync::engine::SyncEngine;

/// The single background task that owns draining for one [`SyncEngine`].
///
/// It drains whenever an operation is enqueued or the earliest backoff
/// expires, and pulls the remote snapshot on the configured interval.
pub struct SyncWorker {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl SyncWorker {
    pub fn spawn<L, R>(engine: Arc<SyncEngine<L, R>>) -> Self
    where
        L: LocalStore + 'static,
        R: RemoteStore + 'static,
    {
        let (shutdown, stop) = oneshot::channel();
        let handle = tokio::spawn(run(engine, stop));
        Self {
            shutdown: Some(shutdown),
            handle,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stops the worker after its current pass and waits for it to exit.
    pub async fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = (&mut self.handle).await {
            tracing::warn!(error = %e, "sync worker ended abnormally");
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => pending::<()>().await,
    }
}

async fn run<L, R>(engine: Arc<SyncEngine<L, R>>, mut stop: oneshot::Receiver<()>)
where
    L: LocalStore,
    R: RemoteStore,
{
    let mut puller = engine.config().pull_interval.map(|period| {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });
    tracing::info!(pull_interval = ?engine.config().pull_interval, "sync worker started");

    loop {
        let retry_at = engine.next_retry_at();
        tokio::select! {
            _ = &mut stop => break,
            _ = engine.wake().notified() => {
                engine.drain_pending().await;
            }
            _ = async { if let Some(at) = retry_at { sleep_until(at).await } }, if retry_at.is_some() => {
                engine.drain_pending().await;
            }
            _ = next_tick(&mut puller) => {
                if let Err(e) = engine.pull_and_merge().await {
                    tracing::debug!(error = %e, "scheduled pull failed");
                }
            }
        }
    }

    tracing::info!("sync worker stopped");
}
