//! Fan-out of events to listeners.
//!
//! Every listener owns a queue drained by its own worker task, so a slow or
//! failing listener never holds up the others. Within one listener, events
//! start in dispatch order; `max_in_flight` bounds how many are processed at
//! once.
//!
//! Queues are unbounded unless a capacity is set with
//! [`EventDispatcher::with_queue_capacity`]. A full queue drops the event for
//! that listener and counts it in `events_dropped`.

use crate::metrics::DispatchMetrics;
use futures::FutureExt;
use relay_core::ports::EventListener;
use relay_core::{Event, RequestContext};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{Instrument, debug, error, info, info_span, warn};

struct Envelope {
    event: Arc<Event>,
    ctx: RequestContext,
}

enum QueueTx {
    Unbounded(mpsc::UnboundedSender<Envelope>),
    Bounded(mpsc::Sender<Envelope>),
}

enum QueueRx {
    Unbounded(mpsc::UnboundedReceiver<Envelope>),
    Bounded(mpsc::Receiver<Envelope>),
}

/// Why an envelope was not queued.
enum Rejected {
    Full,
    Closed,
}

fn queue(capacity: Option<usize>) -> (QueueTx, QueueRx) {
    match capacity {
        Some(capacity) => {
            let (tx, rx) = mpsc::channel(capacity.max(1));
            (QueueTx::Bounded(tx), QueueRx::Bounded(rx))
        }
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (QueueTx::Unbounded(tx), QueueRx::Unbounded(rx))
        }
    }
}

impl QueueTx {
    fn push(&self, envelope: Envelope) -> Result<(), Rejected> {
        match self {
            QueueTx::Unbounded(tx) => tx.send(envelope).map_err(|_| Rejected::Closed),
            QueueTx::Bounded(tx) => tx.try_send(envelope).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => Rejected::Full,
                mpsc::error::TrySendError::Closed(_) => Rejected::Closed,
            }),
        }
    }
}

impl QueueRx {
    async fn recv(&mut self) -> Option<Envelope> {
        match self {
            QueueRx::Unbounded(rx) => rx.recv().await,
            QueueRx::Bounded(rx) => rx.recv().await,
        }
    }
}

struct Worker {
    name: String,
    tx: QueueTx,
    task: JoinHandle<()>,
}

pub struct EventDispatcher {
    workers: Mutex<Vec<Worker>>,
    metrics: Arc<DispatchMetrics>,
    queue_capacity: Option<usize>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::with_metrics(DispatchMetrics::new())
    }

    pub fn with_metrics(metrics: Arc<DispatchMetrics>) -> Self {
        Self {
            workers: Mutex::new(Vec::new()),
            metrics,
            queue_capacity: None,
        }
    }

    /// Bound every listener queue registered afterwards to `capacity` events.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity.max(1));
        self
    }

    pub fn queue_capacity(&self) -> Option<usize> {
        self.queue_capacity
    }

    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Register a listener that processes one event at a time.
    pub fn register(&self, listener: Arc<dyn EventListener>) {
        self.register_with(listener, 1);
    }

    /// Register a listener that may process up to `max_in_flight` events
    /// concurrently. Must be called from within a Tokio runtime.
    pub fn register_with(&self, listener: Arc<dyn EventListener>, max_in_flight: usize) {
        let name = listener.name().to_string();
        let (tx, rx) = queue(self.queue_capacity);
        let task = tokio::spawn(run_worker(
            listener,
            rx,
            max_in_flight.max(1),
            Arc::clone(&self.metrics),
        ));

        let mut workers = self.lock_workers();
        workers.push(Worker {
            name: name.clone(),
            tx,
            task,
        });
        self.metrics.set_listeners(workers.len());

        info!(
            listener = %name,
            max_in_flight,
            queue_capacity = ?self.queue_capacity,
            "Registered event listener"
        );
    }

    /// Queue `event` for every listener and return immediately. Returns the
    /// number of listeners the event was queued for.
    pub fn dispatch(&self, event: Event, ctx: RequestContext) -> usize {
        let event = Arc::new(event);
        let workers = self.lock_workers();
        if workers.is_empty() {
            warn!(request_id = %ctx.request_id, "No listeners registered, event dropped");
            self.metrics.record_dropped();
            return 0;
        }

        self.metrics.record_dispatch();
        let mut queued = 0;
        for worker in workers.iter() {
            let envelope = Envelope {
                event: Arc::clone(&event),
                ctx: ctx.clone(),
            };
            match worker.tx.push(envelope) {
                Ok(()) => queued += 1,
                Err(Rejected::Full) => {
                    warn!(listener = %worker.name, "Listener queue is full, event dropped");
                    self.metrics.record_dropped();
                }
                Err(Rejected::Closed) => {
                    warn!(listener = %worker.name, "Listener worker is gone, event dropped");
                    self.metrics.record_dropped();
                }
            }
        }

        debug!(
            category = event.category().unwrap_or_default(),
            request_id = %ctx.request_id,
            queued,
            "Dispatched event"
        );
        queued
    }

    /// Close every queue and wait for the workers to finish what they hold.
    pub async fn shutdown(&self) {
        let workers: Vec<Worker> = self.lock_workers().drain(..).collect();
        self.metrics.set_listeners(0);

        for Worker { name, tx, task } in workers {
            drop(tx);
            if let Err(e) = task.await {
                error!(listener = %name, error = %e, "Listener worker ended abnormally");
            }
        }
        info!("Event dispatcher shut down");
    }

    fn lock_workers(&self) -> std::sync::MutexGuard<'_, Vec<Worker>> {
        match self.workers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_worker(
    listener: Arc<dyn EventListener>,
    mut rx: QueueRx,
    max_in_flight: usize,
    metrics: Arc<DispatchMetrics>,
) {
    let permits = Arc::new(Semaphore::new(max_in_flight));
    let mut in_flight = JoinSet::new();

    while let Some(envelope) = rx.recv().await {
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        while in_flight.try_join_next().is_some() {}

        let listener = Arc::clone(&listener);
        let metrics = Arc::clone(&metrics);
        in_flight.spawn(async move {
            deliver(listener.as_ref(), envelope, &metrics).await;
            drop(permit);
        });
    }

    while in_flight.join_next().await.is_some() {}
    debug!(listener = listener.name(), "Listener worker drained");
}

async fn deliver(listener: &dyn EventListener, envelope: Envelope, metrics: &DispatchMetrics) {
    let span = info_span!(
        "listener",
        listener = listener.name(),
        request_id = %envelope.ctx.request_id,
        user = envelope.ctx.user.as_deref().unwrap_or("anonymous"),
    );

    let outcome = AssertUnwindSafe(listener.process_event(&envelope.event, &envelope.ctx))
        .catch_unwind()
        .instrument(span)
        .await;

    match outcome {
        Ok(Ok(())) => metrics.record_delivery(),
        Ok(Err(e)) => {
            warn!(listener = listener.name(), error = %e, "Listener failed to process event");
            metrics.record_failure();
        }
        Err(panic) => {
            error!(
                listener = listener.name(),
                panic = %panic_message(panic.as_ref()),
                "Listener panicked while processing event"
            );
            metrics.record_panic();
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
