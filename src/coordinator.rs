//! Single-flight sprite generation.
//!
//! Compile requests arrive from any number of callers. The first one starts
//! the one and only discovery + build pass of this coordinator; every
//! request that arrives while the pass is running is queued and released,
//! in arrival order, once it finishes. Requests after completion pass
//! straight through.
//!
//! ```text
//!   Idle ──request──► Discovering ──► Building ──► Completed
//!                          │              │
//!                          └──── error ───┴──────► Failed
//! ```
//!
//! There is no way back: a new generation needs a new coordinator.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use crate::bridge::MetadataBridge;
use crate::config::SpriteConfig;
use crate::discovery::discover_project;
use crate::error::{Result, SpriteError};
use crate::pack::{ImageEngine, PackingEngine};
use crate::sheet::{build_sheet, ResultsTable, SheetResult};

/// What a request is completed with.
pub type Outcome = std::result::Result<MetadataBridge, SpriteError>;

type Callback<P> = Box<dyn FnOnce(P, PathBuf, Outcome) + Send>;

/// Lifecycle of a coordinator's generation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    Idle,
    Discovering,
    Building,
    Completed,
    /// The pass failed; every later request fails with the same error.
    Failed,
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GenerationState::Idle => "idle",
            GenerationState::Discovering => "discovering",
            GenerationState::Building => "building",
            GenerationState::Completed => "completed",
            GenerationState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Counters describing the work a coordinator has started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationStats {
    pub discovery_passes: usize,
    pub build_passes: usize,
    /// Requests that were queued behind the pass.
    pub queued_requests: usize,
    /// Requests served immediately.
    pub passed_through: usize,
}

/// A request waiting for the generation pass.
struct PendingRequest<P> {
    payload: P,
    source_path: PathBuf,
    on_complete: Callback<P>,
}

impl<P> PendingRequest<P> {
    fn complete(self, outcome: Outcome) {
        (self.on_complete)(self.payload, self.source_path, outcome)
    }
}

enum Phase {
    Idle,
    Discovering,
    Building,
    Completed(MetadataBridge),
    Failed(SpriteError),
}

impl Phase {
    fn state(&self) -> GenerationState {
        match self {
            Phase::Idle => GenerationState::Idle,
            Phase::Discovering => GenerationState::Discovering,
            Phase::Building => GenerationState::Building,
            Phase::Completed(_) => GenerationState::Completed,
            Phase::Failed(_) => GenerationState::Failed,
        }
    }
}

struct Inner<P> {
    phase: Phase,
    queue: Vec<PendingRequest<P>>,
    stats: GenerationStats,
}

struct Shared<P> {
    config: Arc<SpriteConfig>,
    engine: Arc<dyn PackingEngine>,
    inner: Mutex<Inner<P>>,
}

impl<P> Shared<P> {
    // Callbacks never run under the lock, so a poisoned lock still holds
    // consistent state.
    fn lock(&self) -> MutexGuard<'_, Inner<P>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Gates one generation pass behind any number of requests.
///
/// `P` is the caller's payload (for a stylesheet compiler, the source
/// text); it is handed back untouched when the request completes. Clones
/// share the same state.
pub struct Coordinator<P> {
    shared: Arc<Shared<P>>,
}

impl<P> Clone for Coordinator<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<P> fmt::Debug for Coordinator<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.lock();
        f.debug_struct("Coordinator")
            .field("state", &inner.phase.state())
            .field("queued", &inner.queue.len())
            .field("stats", &inner.stats)
            .finish()
    }
}

impl<P: Send + 'static> Coordinator<P> {
    /// Create a coordinator using the built-in packing engine.
    pub fn new(config: Arc<SpriteConfig>) -> Self {
        Self::with_engine(config, Arc::new(ImageEngine::new()))
    }

    /// Create a coordinator with a custom packing engine.
    pub fn with_engine(config: Arc<SpriteConfig>, engine: Arc<dyn PackingEngine>) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                engine,
                inner: Mutex::new(Inner {
                    phase: Phase::Idle,
                    queue: Vec::new(),
                    stats: GenerationStats::default(),
                }),
            }),
        }
    }

    pub fn config(&self) -> &SpriteConfig {
        &self.shared.config
    }

    pub fn state(&self) -> GenerationState {
        self.shared.lock().phase.state()
    }

    pub fn stats(&self) -> GenerationStats {
        self.shared.lock().stats
    }

    /// Submit a request.
    ///
    /// When generation is disabled, completed or failed, `on_complete` runs
    /// before this returns. Otherwise the request is queued, and the first
    /// request starts the generation pass on the current Tokio runtime.
    pub fn request<F>(&self, payload: P, source_path: impl Into<PathBuf>, on_complete: F)
    where
        F: FnOnce(P, PathBuf, Outcome) + Send + 'static,
    {
        let source_path = source_path.into();

        if !self.shared.config.enabled {
            self.shared.lock().stats.passed_through += 1;
            let bridge = MetadataBridge::new(Arc::new(ResultsTable::new()), &self.shared.config);
            on_complete(payload, source_path, Ok(bridge));
            return;
        }

        let mut inner = self.shared.lock();
        let settled = match &inner.phase {
            Phase::Completed(bridge) => Some(Ok(bridge.clone())),
            Phase::Failed(e) => Some(Err(e.clone())),
            Phase::Idle | Phase::Discovering | Phase::Building => None,
        };

        if let Some(outcome) = settled {
            inner.stats.passed_through += 1;
            drop(inner);
            on_complete(payload, source_path, outcome);
            return;
        }

        let start = matches!(inner.phase, Phase::Idle);
        if start {
            inner.phase = Phase::Discovering;
        }
        debug!(source = %source_path.display(), "queueing request behind sprite generation");
        inner.queue.push(PendingRequest {
            payload,
            source_path,
            on_complete: Box::new(on_complete),
        });
        inner.stats.queued_requests += 1;
        drop(inner);

        if start {
            self.start();
        }
    }

    /// Submit a request and wait for its outcome.
    pub async fn acquire(&self, payload: P, source_path: impl Into<PathBuf>) -> Result<(P, MetadataBridge)> {
        let (tx, rx) = oneshot::channel();
        self.request(payload, source_path, move |payload, _, outcome| {
            let _ = tx.send(outcome.map(|bridge| (payload, bridge)));
        });

        rx.await.map_err(|_| SpriteError::Interrupted {
            message: "the generation task ended without completing the request".to_string(),
        })?
    }

    fn start(&self) {
        let shared = Arc::clone(&self.shared);
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(run(shared));
            }
            Err(e) => {
                let failure = SpriteError::Interrupted {
                    message: format!("no async runtime to generate sprites on: {}", e),
                };
                finish(&shared, Err(failure));
            }
        }
    }
}

async fn run<P: Send + 'static>(shared: Arc<Shared<P>>) {
    let outcome = generate(&shared)
        .await
        .map(|table| MetadataBridge::new(Arc::new(table), &shared.config));
    finish(&shared, outcome);
}

/// Record the outcome, then release the queue in arrival order.
fn finish<P>(shared: &Shared<P>, outcome: Outcome) {
    let queue = {
        let mut inner = shared.lock();
        inner.phase = match &outcome {
            Ok(bridge) => Phase::Completed(bridge.clone()),
            Err(e) => Phase::Failed(e.clone()),
        };
        std::mem::take(&mut inner.queue)
    };

    match &outcome {
        Ok(bridge) => info!(
            sheets = bridge.results().len(),
            released = queue.len(),
            "sprite generation completed"
        ),
        Err(e) => error!(error = %e, released = queue.len(), "sprite generation failed"),
    }

    for pending in queue {
        pending.complete(outcome.clone());
    }
}

async fn generate<P>(shared: &Shared<P>) -> Result<ResultsTable> {
    shared.lock().stats.discovery_passes += 1;

    let config = Arc::clone(&shared.config);
    let discovered = tokio::task::spawn_blocking(move || {
        discover_project(&config)
    })
    .await
    .map_err(|e| SpriteError::Interrupted {
        message: format!("discovery task failed: {}", e),
    })??;

    {
        let mut inner = shared.lock();
        inner.phase = Phase::Building;
        inner.stats.build_passes += 1;
    }

    debug!(sheets = discovered.len(), images = discovered.total_images(), "building sprite sheets");

    let config = &shared.config;
    let builds = discovered.into_iter().map(|(name, images)| {
        let options = config.pack_options(&name);
        let engine = Arc::clone(&shared.engine);
        async move {
            let result = build_sheet(&name, images, options, &config.output, engine).await;
            (name, result)
        }
    });

    // Sheets build concurrently; results stay private until every one is done.
    let mut built: BTreeMap<String, SheetResult> = BTreeMap::new();
    let mut failure = None;
    for (name, result) in futures::future::join_all(builds).await {
        match result {
            Ok(sheet) => {
                built.insert(name, sheet);
            }
            Err(e) => {
                error!(sheet = %name, error = %e, "failed to generate sprite sheet");
                failure.get_or_insert(e);
            }
        }
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(built.into_values().collect()),
    }
}
