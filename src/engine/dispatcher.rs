//! Off-thread execution of single-city analysis builds.
//!
//! One persistent worker thread (the "secondary context") is created lazily and
//! shared by every request. Requests are multiplexed over it with monotonically
//! increasing correlation ids; each caller waits on its own `oneshot` receiver
//! bounded by a timeout.
//!
//! On timeout, an explicit error response, or a worker fault the context is torn
//! down, every request pending on it is failed, and the caller recomputes in-process. The
//! public entry point therefore never fails; the worst case is extra latency.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::catalog::CityCatalog;
use super::city_analysis;
use crate::error::{AppError, Result};
use crate::models::{AnalysisSnapshot, Window};

/// Default time a caller waits for the secondary context.
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_millis(5000);

/// The computation executed on the secondary context.
pub type AnalysisJob =
    Arc<dyn Fn(&str, Window) -> std::result::Result<AnalysisSnapshot, String> + Send + Sync>;

type ResponseTx = oneshot::Sender<Result<AnalysisSnapshot>>;
type PendingRequestMap = Arc<Mutex<HashMap<u64, PendingRequest>>>;
type ContextSlot = Arc<Mutex<Option<WorkerContext>>>;

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// When `false` no secondary context is used and builds run in the caller.
    pub offthread: bool,
    pub timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            offthread: true,
            timeout: DEFAULT_DISPATCH_TIMEOUT,
        }
    }
}

struct WorkerRequest {
    id: u64,
    city_id: String,
    window: Window,
}

struct WorkerResponse {
    id: u64,
    outcome: std::result::Result<AnalysisSnapshot, String>,
}

/// A waiting caller, tagged with the context generation it was sent to.
struct PendingRequest {
    generation: u64,
    tx: ResponseTx,
}

struct WorkerContext {
    generation: u64,
    requests: mpsc::UnboundedSender<WorkerRequest>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fails every request pending on the given context generation. Used whenever
/// that context is presumed corrupt; requests sent to a newer context are kept.
fn fail_all_pending(pending: &PendingRequestMap, generation: u64, reason: &str) {
    let drained: Vec<ResponseTx> = {
        let mut pending = lock(pending);
        let ids: Vec<u64> = pending
            .iter()
            .filter(|(_, request)| request.generation == generation)
            .map(|(&id, _)| id)
            .collect();
        ids.into_iter()
            .filter_map(|id| pending.remove(&id))
            .map(|request| request.tx)
            .collect()
    };
    if !drained.is_empty() {
        warn!(
            "Rejecting {} in-flight analysis request(s) on context {}: {}",
            drained.len(),
            generation,
            reason
        );
    }
    for tx in drained {
        let _ = tx.send(Err(AppError::Dispatch(reason.to_string())));
    }
}

/// Owns the secondary context handle and its request table.
pub struct AnalysisDispatcher {
    catalog: Arc<CityCatalog>,
    config: DispatcherConfig,
    job: AnalysisJob,
    context: ContextSlot,
    pending: PendingRequestMap,
    next_id: AtomicU64,
    generations: AtomicU64,
}

impl AnalysisDispatcher {
    /// Creates a dispatcher whose worker runs the local analysis builder.
    pub fn new(catalog: Arc<CityCatalog>, config: DispatcherConfig) -> Self {
        let worker_catalog = catalog.clone();
        let job: AnalysisJob = Arc::new(move |city_id, window| {
            Ok(city_analysis::build_city_analysis(
                &worker_catalog,
                city_id,
                window,
                Utc::now(),
            ))
        });
        Self::with_job(catalog, config, job)
    }

    /// Creates a dispatcher with a custom worker computation.
    pub fn with_job(catalog: Arc<CityCatalog>, config: DispatcherConfig, job: AnalysisJob) -> Self {
        Self {
            catalog,
            config,
            job,
            context: Arc::new(Mutex::new(None)),
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            generations: AtomicU64::new(0),
        }
    }

    /// Builds the analysis for a city, off-thread when possible.
    ///
    /// Always resolves: any dispatch failure falls back to an in-process build.
    pub async fn build_city_analysis(&self, city_id: &str, window: Window) -> AnalysisSnapshot {
        if !self.config.offthread || tokio::runtime::Handle::try_current().is_err() {
            debug!("No secondary context available, building {} in-process", city_id);
            return self.compute_in_process(city_id, window);
        }

        match self.dispatch(city_id, window).await {
            Ok(snapshot) => snapshot,
            Err((generation, e)) => {
                warn!(
                    "Off-thread analysis for {} ({}) failed: {}. Computing in-process.",
                    city_id, window, e
                );
                if let Some(generation) = generation {
                    self.teardown(generation, &e.to_string());
                }
                self.compute_in_process(city_id, window)
            },
        }
    }

    /// Synchronous build in the calling context.
    pub fn compute_in_process(&self, city_id: &str, window: Window) -> AnalysisSnapshot {
        city_analysis::build_city_analysis(&self.catalog, city_id, window, Utc::now())
    }

    /// Generation of the live secondary context, if one exists.
    pub fn context_generation(&self) -> Option<u64> {
        lock(&self.context).as_ref().map(|c| c.generation)
    }

    pub fn pending_requests(&self) -> usize {
        lock(&self.pending).len()
    }

    async fn dispatch(
        &self,
        city_id: &str,
        window: Window,
    ) -> std::result::Result<AnalysisSnapshot, (Option<u64>, AppError)> {
        let (generation, requests) = self.ensure_context().map_err(|e| (None, e))?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (response_tx, response_rx) = oneshot::channel();
        // Register before sending so a fast worker cannot answer an unknown id.
        lock(&self.pending).insert(
            id,
            PendingRequest {
                generation,
                tx: response_tx,
            },
        );

        let request = WorkerRequest {
            id,
            city_id: city_id.to_string(),
            window,
        };
        if requests.send(request).is_err() {
            lock(&self.pending).remove(&id);
            return Err((
                Some(generation),
                AppError::Dispatch("secondary context stopped accepting requests".to_string()),
            ));
        }
        debug!("Dispatched analysis request {} for {} ({})", id, city_id, window);

        match tokio::time::timeout(self.config.timeout, response_rx).await {
            Ok(Ok(Ok(snapshot))) => Ok(snapshot),
            Ok(Ok(Err(e))) => Err((Some(generation), e)),
            Ok(Err(_)) => Err((
                Some(generation),
                AppError::Dispatch(format!("request {} was dropped", id)),
            )),
            Err(_) => {
                lock(&self.pending).remove(&id);
                Err((
                    Some(generation),
                    AppError::Dispatch(format!(
                        "request {} timed out after {} ms",
                        id,
                        self.config.timeout.as_millis()
                    )),
                ))
            },
        }
    }

    /// Returns the live context, spawning one if none exists.
    fn ensure_context(&self) -> Result<(u64, mpsc::UnboundedSender<WorkerRequest>)> {
        let mut slot = lock(&self.context);
        if let Some(ctx) = slot.as_ref() {
            return Ok((ctx.generation, ctx.requests.clone()));
        }
        let ctx = self.spawn_context()?;
        let handle = (ctx.generation, ctx.requests.clone());
        *slot = Some(ctx);
        Ok(handle)
    }

    fn spawn_context(&self) -> Result<WorkerContext> {
        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<WorkerRequest>();
        let (response_tx, mut response_rx) = mpsc::unbounded_channel::<WorkerResponse>();

        let job = self.job.clone();
        std::thread::Builder::new()
            .name(format!("aqi-analysis-{}", generation))
            .spawn(move || {
                while let Some(request) = request_rx.blocking_recv() {
                    let outcome = job(&request.city_id, request.window);
                    let response = WorkerResponse {
                        id: request.id,
                        outcome,
                    };
                    if response_tx.send(response).is_err() {
                        break;
                    }
                }
            })?;

        // Routes responses back to waiting callers. The response channel closes when
        // the worker thread exits, either after teardown or because it faulted.
        let pending = self.pending.clone();
        let context = self.context.clone();
        tokio::spawn(async move {
            while let Some(response) = response_rx.recv().await {
                let waiter = lock(&pending).remove(&response.id);
                match waiter {
                    Some(request) => {
                        let _ = request.tx.send(response.outcome.map_err(AppError::Dispatch));
                    },
                    None => debug!(
                        "Discarding response for unknown or expired request {}",
                        response.id
                    ),
                }
            }

            let faulted = {
                let mut slot = lock(&context);
                if slot.as_ref().map(|c| c.generation) == Some(generation) {
                    *slot = None;
                    true
                } else {
                    false
                }
            };
            if faulted {
                warn!("Secondary analysis context {} faulted", generation);
                fail_all_pending(&pending, generation, "secondary context faulted");
            }
        });

        info!("Spawned secondary analysis context {}", generation);
        Ok(WorkerContext {
            generation,
            requests: request_tx,
        })
    }

    /// Drops the context of the given generation and rejects all in-flight requests.
    /// A context that was already replaced is left alone.
    fn teardown(&self, generation: u64, reason: &str) {
        let removed = {
            let mut slot = lock(&self.context);
            if slot.as_ref().map(|c| c.generation) == Some(generation) {
                slot.take()
            } else {
                None
            }
        };
        if removed.is_some() {
            info!("Tearing down secondary analysis context {}", generation);
            fail_all_pending(&self.pending, generation, reason);
        }
    }
}
