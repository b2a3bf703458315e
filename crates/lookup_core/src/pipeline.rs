//! Background lookups and the single consumer that applies their results.

use crate::annotation::Annotation;
use crate::cache::LookupCache;
use crate::error::LookupError;
use crate::pending::PendingRequests;
use crate::record::LookupRecord;
use futures::FutureExt;
use overlay_plugin_api::PlayerTable;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

/// Turns a lookup record into what the player table should show.
///
/// Returning `None` leaves the row untouched.
pub trait Annotator: Send + Sync + 'static {
    fn annotate(&self, record: &LookupRecord) -> Option<Annotation>;
}

/// One player's result.
///
/// `key` is the normalised cache key. `row` is the UUID exactly as the host
/// reported it, which is how the player table addresses the player.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub key: String,
    pub row: String,
    pub record: LookupRecord,
}

enum Message {
    Deliver(Delivery),
    Flush(oneshot::Sender<()>),
}

/// Handle a worker uses to hand results to the consumer.
#[derive(Clone)]
pub struct DeliverySink {
    tx: mpsc::UnboundedSender<Message>,
}

impl DeliverySink {
    /// Sends one player's result as soon as it is known.
    ///
    /// Returns `false` once the pipeline has shut down; the result is dropped.
    pub fn deliver(
        &self,
        key: impl Into<String>,
        row: impl Into<String>,
        record: LookupRecord,
    ) -> bool {
        self.tx
            .send(Message::Deliver(Delivery {
                key: key.into(),
                row: row.into(),
                record,
            }))
            .is_ok()
    }
}

impl std::fmt::Debug for DeliverySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliverySink")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Cache, in-flight registry and completion channel of one plugin.
///
/// Workers run concurrently and in no particular order. Their results all
/// funnel through one consumer task, which writes the cache and then the table
/// for each delivery before looking at the next one.
pub struct LookupPipeline {
    name: String,
    cache: Arc<LookupCache>,
    pending: Arc<PendingRequests>,
    table: Arc<dyn PlayerTable>,
    annotator: Arc<dyn Annotator>,
    sink: DeliverySink,
    consumer: JoinHandle<()>,
    closed: AtomicBool,
}

impl LookupPipeline {
    /// Creates an empty cache and starts the consumer task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        name: impl Into<String>,
        table: Arc<dyn PlayerTable>,
        annotator: Arc<dyn Annotator>,
    ) -> Result<Self, LookupError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| LookupError::Spawn(e.to_string()))?;

        let name = name.into();
        let cache = Arc::new(LookupCache::new());
        let (tx, rx) = mpsc::unbounded_channel();

        let consumer = runtime.spawn(consume(
            name.clone(),
            rx,
            cache.clone(),
            table.clone(),
            annotator.clone(),
        ));

        Ok(Self {
            name,
            cache,
            pending: Arc::new(PendingRequests::new()),
            table,
            annotator,
            sink: DeliverySink { tx },
            consumer,
            closed: AtomicBool::new(false),
        })
    }

    pub fn cache(&self) -> &LookupCache {
        &self.cache
    }

    pub fn pending(&self) -> &PendingRequests {
        &self.pending
    }

    pub fn is_running(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && !self.consumer.is_finished()
    }

    /// Re-applies the record cached under `key` to the table row `row`.
    /// Returns `false` on a miss.
    pub fn replay(&self, key: &str, row: &str) -> bool {
        let Some(record) = self.cache.get(key) else {
            return false;
        };

        trace!("[{}] Cache hit for {}", self.name, key);
        if let Some(annotation) = self.annotator.annotate(&record) {
            annotation.apply(self.table.as_ref(), row);
        }
        true
    }

    /// Runs `fetch` as a background task unless a worker with the same key is
    /// already in flight.
    ///
    /// The returned future must not block; it reports results through the
    /// [`DeliverySink`] it is given. Returns whether a worker was started.
    pub fn dispatch<F, Fut>(&self, worker_key: impl Into<String>, fetch: F) -> bool
    where
        F: FnOnce(DeliverySink) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let worker_key = worker_key.into();

        if !self.is_running() {
            debug!("[{}] Pipeline closed, not looking up {}", self.name, worker_key);
            return false;
        }

        if !self.pending.try_begin(&worker_key) {
            debug!("[{}] Lookup for {} already in flight", self.name, worker_key);
            return false;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                self.pending.finish(&worker_key);
                error!(
                    "[{}] Failed to get player: {}! {}",
                    self.name,
                    worker_key,
                    LookupError::Spawn(e.to_string())
                );
                return false;
            }
        };

        let work = fetch(self.sink.clone());
        let pending = self.pending.clone();
        let name = self.name.clone();

        runtime.spawn(async move {
            if AssertUnwindSafe(work).catch_unwind().await.is_err() {
                error!("[{}] Lookup worker {} panicked", name, worker_key);
            }
            pending.finish(&worker_key);
        });

        true
    }

    /// Waits until no worker is in flight and every delivery sent so far has
    /// been applied. Does not return while a worker is stuck.
    pub async fn idle(&self) {
        self.pending.drained().await;

        let (ack, done) = oneshot::channel();
        if self.sink.tx.send(Message::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }

    /// Stops the consumer. Workers still running are abandoned and whatever
    /// they deliver afterwards is dropped.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.consumer.abort();
        debug!(
            "[{}] Lookup pipeline stopped with {} cached players, {} lookups abandoned",
            self.name,
            self.cache.len(),
            self.pending.len()
        );
    }
}

impl Drop for LookupPipeline {
    fn drop(&mut self) {
        self.consumer.abort();
    }
}

async fn consume(
    name: String,
    mut rx: mpsc::UnboundedReceiver<Message>,
    cache: Arc<LookupCache>,
    table: Arc<dyn PlayerTable>,
    annotator: Arc<dyn Annotator>,
) {
    while let Some(message) = rx.recv().await {
        match message {
            Message::Deliver(Delivery { key, row, record }) => {
                if record.is_empty() {
                    debug!("[{}] No data for {}, leaving it uncached", name, key);
                    continue;
                }

                let annotation = annotator.annotate(&record);
                cache.put(key, record);
                if let Some(annotation) = annotation {
                    annotation.apply(table.as_ref(), &row);
                }
            }
            Message::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}
