//! Dispatcher service - subscribe, fan out, reply.

use crate::domain::{DispatcherConfig, DispatcherError, RecentRequestFilter};
use crate::ipc::{DispatchSnapshot, DispatchStats, RequestHandler};
use crate::ports::SimulationBackend;
use futures::stream::{select_all, SelectAll, StreamExt};
use shared_bus::{MessageBus, MessageStream};
use shared_types::OperationRoutes;
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, info, instrument, warn};

/// A running dispatcher instance.
///
/// Joins the share group on all six request topics; the bus hands each
/// request to exactly one instance in the group.
pub struct DispatcherService {
    config: DispatcherConfig,
    stats: Arc<DispatchStats>,
    shutdown_tx: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DispatcherService {
    /// Subscribe to the request topics and start the dispatch loop.
    pub async fn start(
        bus: Arc<dyn MessageBus>,
        backend: Arc<dyn SimulationBackend>,
        config: DispatcherConfig,
    ) -> Result<Self, DispatcherError> {
        config.validate()?;
        let routes = OperationRoutes::new(&config.topic_prefix)?;

        let mut streams = Vec::with_capacity(routes.request_topics().len());
        for topic in routes.request_topics() {
            let filter = config.shared_filter(&topic);
            let subscription =
                bus.subscribe(&filter)
                    .await
                    .map_err(|source| DispatcherError::Subscribe {
                        filter: filter.clone(),
                        source,
                    })?;
            streams.push(subscription.into_stream());
        }

        let mut handler = RequestHandler::new(routes, backend, Arc::clone(&bus))
            .with_error_replies(config.reply_on_backend_error);
        if let Some(window) = config.dedup_window {
            handler = handler.with_dedup(RecentRequestFilter::new(window));
        }
        let stats = handler.stats();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = tokio::spawn(dispatch_loop(
            Arc::new(handler),
            select_all(streams),
            config.max_in_flight,
            shutdown_rx,
        ));

        info!(
            "[dcr-02] Dispatcher started (group={}, prefix={}, max_in_flight={})",
            config.share_group, config.topic_prefix, config.max_in_flight
        );

        Ok(Self {
            config,
            stats,
            shutdown_tx,
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn stats(&self) -> DispatchSnapshot {
        self.stats.snapshot()
    }

    /// Stop taking requests and wait for in-flight ones to finish.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let handle = self.worker.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            let _ = handle.await;
            info!("[dcr-02] Dispatcher stopped ({:?})", self.stats());
        }
    }
}

impl Drop for DispatcherService {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Take requests off the bus and handle each on its own task, at most
/// `max_in_flight` at a time.
///
/// A permit is taken before the next request is read, so a saturated pool
/// leaves requests on the bus and still sees shutdown.
#[instrument(skip_all, name = "dcr_dispatcher")]
async fn dispatch_loop(
    handler: Arc<RequestHandler>,
    mut requests: SelectAll<MessageStream>,
    max_in_flight: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    let permits = Arc::new(Semaphore::new(max_in_flight));
    let mut tasks = JoinSet::new();

    loop {
        let permit = tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("Dispatch loop shutting down");
                    break;
                }
                continue;
            }
            Some(result) = tasks.join_next(), if !tasks.is_empty() => {
                log_task_result(result);
                continue;
            }
            permit = Arc::clone(&permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let message = tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("Dispatch loop shutting down");
                    break;
                }
                continue;
            }
            Some(result) = tasks.join_next(), if !tasks.is_empty() => {
                log_task_result(result);
                continue;
            }
            next = requests.next() => match next {
                Some(message) => message,
                None => {
                    warn!("Request subscriptions closed, stopping dispatcher");
                    break;
                }
            },
        };

        let handler = Arc::clone(&handler);
        tasks.spawn(async move {
            let _permit = permit;
            handler.process(message).await;
        });
    }

    while let Some(result) = tasks.join_next().await {
        log_task_result(result);
    }
}

fn log_task_result(result: Result<(), JoinError>) {
    if let Err(e) = result {
        warn!(error = %e, "Request task failed");
    }
}
