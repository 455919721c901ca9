//! Installed-dependency tree walker.
//!
//! Replays npm's nested `node_modules` resolution over an already
//! installed tree. Expanding a package reads its descriptor and emits
//! a metadata record; every declared dependency is then located by
//! probing ancestor `node_modules` directories innermost-first, and
//! each match is expanded in turn. The walk ends with exactly one
//! terminal event: [`WalkEvent::End`] once all tasks have settled, or
//! [`WalkEvent::Error`] carrying the first failure.
//!
//! Filesystem tasks run concurrently up to a configurable bound, but
//! all bookkeeping (seen set, task counter, terminal flag) lives on a
//! single coordinator task, so per-run state needs no locks.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Semaphore;

use crate::error::WalkError;
use crate::manifest::{DirProbe, FsDirProbe, FsManifestSource, Manifest, ManifestSource};
use crate::trail::Trail;

/// Options for a walk.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Maximum number of concurrently executing filesystem tasks
    /// (default 10).
    pub concurrency: usize,
    /// Merge the root package's `devDependencies` into its dependency
    /// set (default false). Transitive packages never contribute
    /// development dependencies.
    pub dev: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            concurrency: 10,
            dev: false,
        }
    }
}

/// Metadata record for one discovered package.
///
/// `path` is the root-relative installed path (`.` for the project
/// root itself). `parent` points at the record whose dependency
/// declaration introduced this package; the entry-point fields are
/// copied verbatim from the descriptor when present.
#[derive(Debug, Clone, Serialize)]
pub struct PackageMeta {
    pub name: String,
    pub version: String,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Arc<PackageMeta>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(rename = "jsnext:main", skip_serializing_if = "Option::is_none")]
    pub jsnext_main: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
}

/// Events emitted over the stream returned by [`Walker::run`].
///
/// `End` and `Error` are mutually exclusive and fire at most once per
/// run, strictly after every task known at that point has settled.
#[derive(Debug)]
pub enum WalkEvent {
    /// A package was discovered. Fires once per arrival, including
    /// repeat arrivals at an already expanded path.
    Package(Arc<PackageMeta>),
    /// All scheduled tasks settled without failure.
    End,
    /// The first task failure; later task outcomes are discarded.
    Error(WalkError),
}

/// Walks an installed dependency tree from a project root.
#[derive(Debug)]
pub struct Walker {
    root: PathBuf,
    opts: WalkOptions,
    manifests: Arc<dyn ManifestSource>,
    probe: Arc<dyn DirProbe>,
}

impl Walker {
    /// Create a walker over `root` with filesystem collaborators and
    /// default options.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            opts: WalkOptions::default(),
            manifests: Arc::new(FsManifestSource),
            probe: Arc::new(FsDirProbe),
        }
    }

    /// Set walk options.
    #[must_use]
    pub fn with_options(mut self, opts: WalkOptions) -> Self {
        self.opts = opts;
        self
    }

    /// Replace the manifest and directory collaborators, e.g. with
    /// test doubles.
    #[must_use]
    pub fn with_collaborators(
        mut self,
        manifests: Arc<dyn ManifestSource>,
        probe: Arc<dyn DirProbe>,
    ) -> Self {
        self.manifests = manifests;
        self.probe = probe;
        self
    }

    /// Start a walk and return its event stream.
    ///
    /// Each call creates a fresh run context and schedules the root
    /// expansion with the identity trail. Sibling subtrees settle in
    /// no promised order; the terminal event is the last one on the
    /// stream and the stream closes after it. Starting another run
    /// while a previous one is still in flight is unsupported.
    ///
    /// There is no cancellation: after a failure, tasks already in
    /// flight run to completion but their outcomes are discarded.
    #[must_use]
    pub fn run(&self) -> UnboundedReceiver<WalkEvent> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let driver = Driver {
            root: self.root.clone(),
            opts: self.opts.clone(),
            manifests: Arc::clone(&self.manifests),
            probe: Arc::clone(&self.probe),
            semaphore: Arc::new(Semaphore::new(self.opts.concurrency.max(1))),
        };
        tokio::spawn(driver.drive(events_tx));
        events_rx
    }
}

/// A unit of scheduled work.
enum Task {
    /// Read the descriptor at `trail` and emit its metadata.
    Expand {
        trail: Trail,
        parent: Option<Arc<PackageMeta>>,
    },
    /// Locate `name` by backtracking from `trail`.
    Resolve {
        name: String,
        optional: bool,
        trail: Trail,
        parent: Arc<PackageMeta>,
    },
}

/// What a settled task reports back to the coordinator.
enum Outcome {
    Expanded {
        trail: Trail,
        parent: Option<Arc<PackageMeta>>,
        manifest: Manifest,
    },
    /// A dependency was found installed at `trail`.
    Hit {
        trail: Trail,
        parent: Arc<PackageMeta>,
    },
    /// An optional dependency was absent at every ancestor level.
    Skipped,
    Failed(WalkError),
}

/// Per-run mutable state, owned exclusively by the coordinator.
#[derive(Debug, Default)]
struct RunContext {
    /// Root-relative paths already expanded; suppresses re-expansion,
    /// never emission.
    seen: HashSet<PathBuf>,
    /// Tasks scheduled but not yet settled.
    outstanding: usize,
    /// Set once the terminal event has fired.
    finished: bool,
}

struct Driver {
    root: PathBuf,
    opts: WalkOptions,
    manifests: Arc<dyn ManifestSource>,
    probe: Arc<dyn DirProbe>,
    semaphore: Arc<Semaphore>,
}

impl Driver {
    /// Coordinator loop: schedules the root expansion, then processes
    /// settlements until the outstanding counter returns to zero.
    async fn drive(self, events: UnboundedSender<WalkEvent>) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let mut ctx = RunContext::default();

        self.schedule(
            Task::Expand {
                trail: Trail::root(),
                parent: None,
            },
            &mut ctx,
            &done_tx,
        );

        while let Some(outcome) = done_rx.recv().await {
            if !ctx.finished {
                self.settle(outcome, &mut ctx, &events, &done_tx);
            }
            // Children scheduled by the settlement above were counted
            // before this decrement, so the counter cannot hit zero
            // while work is still being enqueued.
            ctx.outstanding -= 1;
            if !ctx.finished && ctx.outstanding == 0 {
                ctx.finished = true;
                let _ = events.send(WalkEvent::End);
            }
            if ctx.outstanding == 0 {
                break;
            }
        }
    }

    /// Process one task settlement. Runs on the coordinator, never
    /// concurrently with itself.
    fn settle(
        &self,
        outcome: Outcome,
        ctx: &mut RunContext,
        events: &UnboundedSender<WalkEvent>,
        done_tx: &UnboundedSender<Outcome>,
    ) {
        match outcome {
            Outcome::Failed(err) => {
                ctx.finished = true;
                let _ = events.send(WalkEvent::Error(err));
            }
            Outcome::Expanded {
                trail,
                parent,
                manifest,
            } => {
                let is_root = parent.is_none();
                let names = self.dependency_names(&manifest, is_root);
                let Manifest {
                    name,
                    version,
                    optional_dependencies,
                    main,
                    jsnext_main,
                    browser,
                    ..
                } = manifest;

                let rel_path = trail.rel_path();
                let meta = Arc::new(PackageMeta {
                    name,
                    version,
                    path: rel_path.clone(),
                    parent,
                    main,
                    jsnext_main,
                    browser,
                });
                let _ = events.send(WalkEvent::Package(Arc::clone(&meta)));

                // Emission is unconditional; only expansion dedups.
                if !ctx.seen.insert(rel_path) {
                    return;
                }

                for dep in names {
                    let optional = optional_dependencies.contains_key(&dep);
                    self.schedule(
                        Task::Resolve {
                            name: dep,
                            optional,
                            trail: trail.clone(),
                            parent: Arc::clone(&meta),
                        },
                        ctx,
                        done_tx,
                    );
                }
            }
            Outcome::Hit { trail, parent } => {
                self.schedule(
                    Task::Expand {
                        trail,
                        parent: Some(parent),
                    },
                    ctx,
                    done_tx,
                );
            }
            Outcome::Skipped => {}
        }
    }

    /// The dependency names a package contributes to the walk.
    fn dependency_names(&self, manifest: &Manifest, is_root: bool) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = manifest.dependencies.keys().cloned().collect();
        if self.opts.dev && is_root {
            names.extend(manifest.dev_dependencies.keys().cloned());
        }
        names
    }

    /// Count a task and hand it to the bounded scheduler. The counter
    /// increment happens synchronously, before the task can settle.
    fn schedule(&self, task: Task, ctx: &mut RunContext, done_tx: &UnboundedSender<Outcome>) {
        ctx.outstanding += 1;

        let root = self.root.clone();
        let manifests = Arc::clone(&self.manifests);
        let probe = Arc::clone(&self.probe);
        let semaphore = Arc::clone(&self.semaphore);
        let done_tx = done_tx.clone();

        tokio::spawn(async move {
            // Held for the task's whole execution; released on
            // settlement regardless of outcome. The semaphore is never
            // closed, so acquisition cannot fail.
            let _permit = semaphore.acquire_owned().await.ok();

            let outcome = match task {
                Task::Expand { trail, parent } => {
                    match manifests.read(&root.join(trail.rel_path())).await {
                        Ok(manifest) => Outcome::Expanded {
                            trail,
                            parent,
                            manifest,
                        },
                        Err(err) => Outcome::Failed(err),
                    }
                }
                Task::Resolve {
                    name,
                    optional,
                    trail,
                    parent,
                } => resolve(probe.as_ref(), &root, name, optional, trail, parent).await,
            };

            let _ = done_tx.send(outcome);
        });
    }
}

/// Backtracking dependency lookup.
///
/// Probes `trail + [name]`, dropping the trail's innermost segment on
/// each miss, so the innermost installed candidate wins. On exhaustion
/// an optional dependency is skipped silently; a required one fails
/// the run.
async fn resolve(
    probe: &dyn DirProbe,
    root: &Path,
    name: String,
    optional: bool,
    trail: Trail,
    parent: Arc<PackageMeta>,
) -> Outcome {
    let mut current = trail.clone();
    loop {
        let candidate = current.child(&name);
        match probe.is_dir(&root.join(candidate.rel_path())).await {
            Ok(true) => return Outcome::Hit {
                trail: candidate,
                parent,
            },
            Ok(false) => {
                if current.pop().is_none() {
                    break;
                }
            }
            Err(err) => return Outcome::Failed(err),
        }
    }

    if optional {
        Outcome::Skipped
    } else {
        Outcome::Failed(WalkError::DependencyNotFound { name, trail })
    }
}
