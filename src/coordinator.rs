use crate::clusterer::Clusterer;
use crate::combiner::{CombinationPolicy, GraphCombiner};
use crate::config::ClusteringConfig;
use crate::error::{CoordinatorError, ValidationError};
use crate::scorer::TextSimilarity;
use crate::session::{Session, SessionSnapshot};
use crate::{Page, PageGroups, PageId};
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::channel::oneshot;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::thread::{self, JoinHandle};

type Callback<T> = Box<dyn FnOnce(Result<T, CoordinatorError>) + Send>;

/// Ids accepted by synchronous validation, and how many queued requests
/// still refer to each of them.
#[derive(Default)]
struct Registry {
    tracked: HashSet<PageId>,
    in_flight: HashMap<PageId, usize>,
}

impl Registry {
    fn enqueued(&mut self, id: PageId) {
        *self.in_flight.entry(id).or_default() += 1;
    }

    /// Records that a request on `id` was processed. Once nothing else is
    /// queued for `id`, the admitted set follows the session again, so a
    /// request that failed in the worker leaves no stale entry behind.
    fn processed(&mut self, id: PageId, present: bool) {
        if let Some(count) = self.in_flight.get_mut(&id) {
            *count -= 1;
            if *count > 0 {
                return;
            }
            self.in_flight.remove(&id);
        }
        if present {
            self.tracked.insert(id);
        } else {
            self.tracked.remove(&id);
        }
    }
}

enum Request {
    Add {
        page: Page,
        on_complete: Callback<PageGroups>,
    },
    Remove {
        id: PageId,
        on_complete: Callback<PageGroups>,
    },
    Reconfigure {
        policy: CombinationPolicy,
        on_complete: Callback<PageGroups>,
    },
    Snapshot {
        on_complete: Callback<SessionSnapshot>,
    },
}

/// A future resolving to the outcome of an enqueued operation.
pub struct Completion<T> {
    receiver: oneshot::Receiver<Result<T, CoordinatorError>>,
}

impl<T> Future for Completion<T> {
    type Output = Result<T, CoordinatorError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(CoordinatorError::WorkerUnavailable)))
    }
}

/// Submits a request through `submit` with a callback that resolves the
/// returned future.
fn completion<T, F>(submit: F) -> Result<Completion<T>, CoordinatorError>
where
    T: Send + 'static,
    F: FnOnce(Callback<T>) -> Result<(), CoordinatorError>,
{
    let (sender, receiver) = oneshot::channel();
    submit(Box::new(move |result| {
        let _ = sender.send(result);
    }))?;
    Ok(Completion { receiver })
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The public entry point of one clustering session.
///
/// A coordinator owns the matrices and the stabilization state of a single
/// browsing session and runs every mutation on its own worker thread, in
/// submission order. Each request gets exactly one completion, invoked on
/// the worker thread in processing order.
///
/// Duplicate and unknown ids are rejected on the caller's thread before
/// anything is enqueued. Failures during processing are delivered through
/// the completion and leave the session in its previous state.
///
/// Dropping the coordinator, or calling [`Coordinator::shutdown`], processes
/// what is still queued and stops the worker.
pub struct Coordinator {
    sender: UnboundedSender<Request>,
    registry: Arc<Mutex<Registry>>,
    pending: Arc<AtomicUsize>,
    worker: Option<JoinHandle<()>>,
}

impl Coordinator {
    /// Starts a session with the clusterer described by `config`.
    pub fn new<S>(config: ClusteringConfig, scorer: S) -> Result<Coordinator, CoordinatorError>
    where
        S: TextSimilarity + 'static,
    {
        config.validate()?;
        let clusterer = config.build_clusterer();
        Self::with_clusterer(config, clusterer, scorer)
    }

    /// Starts a session with an explicitly provided clusterer. The algorithm
    /// and seed of `config` are ignored.
    pub fn with_clusterer<S>(
        config: ClusteringConfig,
        clusterer: Box<dyn Clusterer>,
        scorer: S,
    ) -> Result<Coordinator, CoordinatorError>
    where
        S: TextSimilarity + 'static,
    {
        config.combination.validate()?;
        let session = Session::new(
            GraphCombiner::new(config.combination),
            clusterer,
            Box::new(scorer),
        );

        let (sender, receiver) = mpsc::unbounded();
        let registry = Arc::new(Mutex::new(Registry::default()));
        let pending = Arc::new(AtomicUsize::new(0));
        let mut worker = Worker {
            session,
            registry: registry.clone(),
            pending: pending.clone(),
        };
        let handle = thread::Builder::new()
            .name("session-clustering".into())
            .spawn(move || worker.run(receiver))
            .map_err(|err| {
                log::error!("failed to spawn clustering worker: {err}");
                CoordinatorError::WorkerUnavailable
            })?;

        Ok(Coordinator {
            sender,
            registry,
            pending,
            worker: Some(handle),
        })
    }

    /// Enqueues `page` and calls `on_complete` with the new grouping.
    ///
    /// Fails immediately with [`ValidationError::DuplicateId`] when the id is
    /// already tracked or queued for insertion.
    pub fn add<F>(&self, page: Page, on_complete: F) -> Result<(), CoordinatorError>
    where
        F: FnOnce(Result<PageGroups, CoordinatorError>) + Send + 'static,
    {
        let mut registry = lock(&self.registry);
        let id = page.id;
        if !registry.tracked.insert(id) {
            return Err(ValidationError::DuplicateId(id).into());
        }

        let request = Request::Add {
            page,
            on_complete: Box::new(on_complete),
        };
        if let Err(e) = self.enqueue(request) {
            registry.tracked.remove(&id);
            return Err(e);
        }
        registry.enqueued(id);
        Ok(())
    }

    /// Enqueues the removal of `id` and calls `on_complete` with the new
    /// grouping.
    ///
    /// Fails immediately with [`ValidationError::UnknownId`] when the id was
    /// never added or is already removed. A page whose add is still queued
    /// counts as tracked.
    pub fn remove<F>(&self, id: PageId, on_complete: F) -> Result<(), CoordinatorError>
    where
        F: FnOnce(Result<PageGroups, CoordinatorError>) + Send + 'static,
    {
        let mut registry = lock(&self.registry);
        if !registry.tracked.remove(&id) {
            return Err(ValidationError::UnknownId(id).into());
        }

        let request = Request::Remove {
            id,
            on_complete: Box::new(on_complete),
        };
        if let Err(e) = self.enqueue(request) {
            registry.tracked.insert(id);
            return Err(e);
        }
        registry.enqueued(id);
        Ok(())
    }

    /// Enqueues a switch to new combination weights, after which the current
    /// pages are clustered again.
    pub fn reconfigure<F>(
        &self,
        policy: CombinationPolicy,
        on_complete: F,
    ) -> Result<(), CoordinatorError>
    where
        F: FnOnce(Result<PageGroups, CoordinatorError>) + Send + 'static,
    {
        policy.validate()?;
        self.enqueue(Request::Reconfigure {
            policy,
            on_complete: Box::new(on_complete),
        })
    }

    /// Enqueues a snapshot of the session as it is after every request
    /// submitted so far.
    pub fn snapshot<F>(&self, on_complete: F) -> Result<(), CoordinatorError>
    where
        F: FnOnce(Result<SessionSnapshot, CoordinatorError>) + Send + 'static,
    {
        self.enqueue(Request::Snapshot {
            on_complete: Box::new(on_complete),
        })
    }

    pub fn add_async(&self, page: Page) -> Result<Completion<PageGroups>, CoordinatorError> {
        completion(|done| self.add(page, done))
    }

    pub fn remove_async(&self, id: PageId) -> Result<Completion<PageGroups>, CoordinatorError> {
        completion(|done| self.remove(id, done))
    }

    pub fn reconfigure_async(
        &self,
        policy: CombinationPolicy,
    ) -> Result<Completion<PageGroups>, CoordinatorError> {
        completion(|done| self.reconfigure(policy, done))
    }

    pub fn snapshot_async(&self) -> Result<Completion<SessionSnapshot>, CoordinatorError> {
        completion(|done| self.snapshot(done))
    }

    /// Number of enqueued requests that have not been processed yet.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Number of ids currently admitted, including queued additions and
    /// excluding queued removals.
    pub fn tracked(&self) -> usize {
        lock(&self.registry).tracked.len()
    }

    /// Processes the remaining queue and stops the worker.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn enqueue(&self, request: Request) -> Result<(), CoordinatorError> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.sender.unbounded_send(request).map_err(|_| {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            CoordinatorError::WorkerUnavailable
        })
    }

    fn stop(&mut self) {
        self.sender.close_channel();
        if let Some(handle) = self.worker.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                log::error!("clustering worker panicked");
            }
        }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The single consumer of a coordinator's queue.
struct Worker {
    session: Session,
    registry: Arc<Mutex<Registry>>,
    pending: Arc<AtomicUsize>,
}

impl Worker {
    fn run(&mut self, receiver: UnboundedReceiver<Request>) {
        for request in futures::executor::block_on_stream(receiver) {
            self.handle_request(request);
        }
        log::debug!("clustering worker stopped");
    }

    fn handle_request(&mut self, request: Request) {
        match request {
            Request::Add { page, on_complete } => {
                let id = page.id;
                let result = self.session.add(page);
                self.settle(id);
                self.complete(format!("add {id}"), result, on_complete);
            }
            Request::Remove { id, on_complete } => {
                let result = self.session.remove(id);
                self.settle(id);
                self.complete(format!("remove {id}"), result, on_complete);
            }
            Request::Reconfigure {
                policy,
                on_complete,
            } => {
                let result = self.session.reconfigure(policy);
                self.complete(format!("reconfigure {policy:?}"), result, on_complete);
            }
            Request::Snapshot { on_complete } => {
                let result = self.session.snapshot();
                self.pending.fetch_sub(1, Ordering::SeqCst);
                on_complete(result);
            }
        }
    }

    fn settle(&self, id: PageId) {
        lock(&self.registry).processed(id, self.session.contains(id));
    }

    fn complete(
        &self,
        operation: String,
        result: Result<PageGroups, CoordinatorError>,
        on_complete: Callback<PageGroups>,
    ) {
        match &result {
            Ok(groups) => log::debug!(
                "{operation}: {} pages in {} groups",
                self.session.dimension(),
                groups.len()
            ),
            Err(e) => log::warn!("{operation} failed: {e}"),
        }
        self.pending.fetch_sub(1, Ordering::SeqCst);
        on_complete(result);
    }
}
