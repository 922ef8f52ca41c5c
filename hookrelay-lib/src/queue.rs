use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::{mpsc, oneshot};

use crate::scheduler::Scheduler;
use crate::{DispatchRequest, DispatchResponse, Endpoint, ErrorKind, Result};

type Outcome = Result<DispatchResponse>;

struct Job {
    request: DispatchRequest,
    reply: oneshot::Sender<Outcome>,
}

/// Bookkeeping of an endpoint with outstanding messages
#[derive(Debug)]
struct Worker {
    jobs: mpsc::UnboundedSender<Job>,
    /// Jobs sent but not yet answered, the running one included
    pending: usize,
}

/// Per-endpoint FIFO queues.
///
/// Every endpoint with outstanding messages has its own worker task, which
/// runs them one at a time through the [`Scheduler`]. Workers of different
/// endpoints run independently. Once the last message of an endpoint has been
/// answered, its worker exits and its bookkeeping is removed.
#[derive(Debug, Clone)]
pub(crate) struct EndpointQueue {
    workers: Arc<DashMap<Endpoint, Worker>>,
    scheduler: Scheduler,
}

impl EndpointQueue {
    pub(crate) fn new(scheduler: Scheduler) -> Self {
        Self {
            workers: Arc::new(DashMap::new()),
            scheduler,
        }
    }

    pub(crate) const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Append `request` to its endpoint's queue.
    ///
    /// The message is queued before this function returns, so the order of
    /// `enqueue` calls is the delivery order. The message is delivered even if
    /// the returned [`Delivery`] is dropped.
    pub(crate) fn enqueue(&self, request: DispatchRequest) -> Delivery {
        let (reply, outcome) = oneshot::channel();
        let endpoint = request.endpoint().clone();

        let mut worker = self
            .workers
            .entry(endpoint.clone())
            .or_insert_with(|| self.spawn_worker(endpoint.clone()));
        if worker.jobs.is_closed() {
            log::warn!("Worker of endpoint {endpoint} stopped unexpectedly, restarting it");
            *worker = self.spawn_worker(endpoint);
        }
        // A failed send drops `reply`, which the delivery reports as closed
        if worker.jobs.send(Job { request, reply }).is_ok() {
            worker.pending += 1;
        }

        Delivery { outcome }
    }

    /// Number of endpoints that currently have outstanding messages
    pub(crate) fn pending_endpoints(&self) -> usize {
        self.workers.len()
    }

    fn spawn_worker(&self, endpoint: Endpoint) -> Worker {
        let (jobs, receiver) = mpsc::unbounded_channel();
        log::debug!("Starting worker for endpoint {endpoint}");
        tokio::spawn(work(
            self.scheduler.clone(),
            Arc::clone(&self.workers),
            endpoint,
            receiver,
        ));
        Worker { jobs, pending: 0 }
    }
}

/// Owns a worker's job channel. Dropping it, even while unwinding from a
/// panic, closes the channel and removes the worker's entry if it is still
/// the registered one.
struct Inbox {
    jobs: mpsc::UnboundedReceiver<Job>,
    workers: Arc<DashMap<Endpoint, Worker>>,
    endpoint: Endpoint,
}

impl Drop for Inbox {
    fn drop(&mut self) {
        self.jobs.close();
        // A replacement worker has an open channel and is left alone
        if self
            .workers
            .remove_if(&self.endpoint, |_, worker| worker.jobs.is_closed())
            .is_some()
        {
            log::warn!("Worker of endpoint {} stopped unexpectedly", self.endpoint);
        }
    }
}

async fn work(
    scheduler: Scheduler,
    workers: Arc<DashMap<Endpoint, Worker>>,
    endpoint: Endpoint,
    jobs: mpsc::UnboundedReceiver<Job>,
) {
    let mut inbox = Inbox {
        jobs,
        workers: Arc::clone(&workers),
        endpoint: endpoint.clone(),
    };
    while let Some(Job { request, reply }) = inbox.jobs.recv().await {
        let outcome = scheduler.run(&request).await;
        if let Err(e) = &outcome {
            log::debug!("Failed to deliver {} to endpoint {endpoint}: {e}", request.name());
        }
        // The caller may have lost interest
        let _ = reply.send(outcome);

        if let Entry::Occupied(mut worker) = workers.entry(endpoint.clone()) {
            worker.get_mut().pending -= 1;
            if worker.get().pending == 0 {
                worker.remove();
                log::debug!("Queue of endpoint {endpoint} drained, stopping worker");
                return;
            }
        }
    }
}

/// The eventual outcome of an enqueued message.
///
/// Resolves once the message was delivered or failed for good. Rate limit
/// rejections along the way are invisible here.
#[derive(Debug)]
pub struct Delivery {
    outcome: oneshot::Receiver<Outcome>,
}

impl Future for Delivery {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.outcome)
            .poll(cx)
            .map(|outcome| outcome.unwrap_or_else(|_| Err(ErrorKind::DispatcherClosed)))
    }
}
