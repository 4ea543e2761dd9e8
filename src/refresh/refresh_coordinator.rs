use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::available_parallelism;

use compio::dispatcher::{Dispatcher, DispatcherBuilder};
use compio::runtime::spawn;
use futures::StreamExt;
use futures_channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use snafu::{ResultExt, Snafu};
use tracing::{debug, error, info};

use crate::status::{StatusMap, StatusProbe};
use crate::sync::{StatusMaps, TreeSynchronizer};
use crate::tree::TreeModel;

/// Default number of worker threads when unable to determine system parallelism
const DEFAULT_WORKER_THREADS: usize = 1;

type ProbeResult = Result<(PathBuf, StatusMap), RefreshError>;

/// What happened to a finished refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Statuses were installed and the whole forest reconciled
    Applied,
    /// Projects were added or removed while probing; results dropped
    Stale,
    /// A newer cycle was already installed; results dropped
    Superseded,
    /// Some probe never completed; nothing applied
    Failed,
}

/// Runs status probes for every project on a worker pool and installs their
/// results in one step.
///
/// All model mutation stays on the thread that owns the coordinator; workers
/// only run the status command.
pub struct RefreshCoordinator {
    dispatcher: Dispatcher,
    probe: StatusProbe,
    status_maps: Arc<StatusMaps>,
    next_cycle: u64,
    installed_cycle: Option<u64>,
}

/// A cycle whose probes are running.
#[must_use = "a pending refresh does nothing unless waited for and finished"]
pub struct PendingRefresh {
    cycle: u64,
    snapshot: Vec<PathBuf>,
    receiver: UnboundedReceiver<ProbeResult>,
}

/// A cycle whose probes have all reported back.
#[derive(Debug)]
pub struct CompletedRefresh {
    cycle: u64,
    snapshot: Vec<PathBuf>,
    result: Result<StatusMaps, RefreshError>,
}

impl RefreshCoordinator {
    pub fn new(
        probe: StatusProbe,
        max_workers: Option<NonZeroUsize>,
    ) -> Result<Self, RefreshCreationError> {
        let workers_num = Self::determine_worker_count(max_workers);
        debug!("Using {} worker threads for status probes", workers_num);

        let dispatcher = DispatcherBuilder::new()
            .worker_threads(workers_num)
            .build()
            .context(DispatcherSnafu)?;

        Ok(Self {
            dispatcher,
            probe,
            status_maps: Arc::new(StatusMaps::new()),
            next_cycle: 0,
            installed_cycle: None,
        })
    }

    fn determine_worker_count(max_workers: Option<NonZeroUsize>) -> NonZeroUsize {
        let available = available_parallelism()
            .ok()
            .or_else(|| NonZeroUsize::new(DEFAULT_WORKER_THREADS))
            .unwrap_or(NonZeroUsize::MIN);
        match max_workers {
            Some(max) => available.min(max),
            None => available,
        }
    }

    /// The installed snapshot. Replaced as a whole, never edited.
    pub fn status_maps(&self) -> Arc<StatusMaps> {
        self.status_maps.clone()
    }

    /// Starts probing every root in `snapshot`, each independently.
    pub fn begin_refresh(&mut self, snapshot: Vec<PathBuf>) -> Result<PendingRefresh, RefreshError> {
        let cycle = self.next_cycle;
        self.next_cycle += 1;
        debug!("Starting refresh cycle {} for {} projects", cycle, snapshot.len());

        let (sender, receiver) = mpsc::unbounded::<ProbeResult>();
        for root in &snapshot {
            self.dispatch_probe(sender.clone(), root.clone())?;
        }

        Ok(PendingRefresh {
            cycle,
            snapshot,
            receiver,
        })
    }

    /// Dispatch a probe to a worker and forward its result to the cycle's receiver
    fn dispatch_probe(
        &self,
        sender: UnboundedSender<ProbeResult>,
        root: PathBuf,
    ) -> Result<(), RefreshError> {
        let probe = self.probe.clone();
        let root_for_probe = root.clone();

        let receiver = self
            .dispatcher
            .dispatch(move || async move {
                let status_map = probe.probe(&root_for_probe).await;
                (root_for_probe, status_map)
            })
            .map_err(|e| RefreshError::DispatchError {
                root: root.clone(),
                error: e.to_string(),
            })?;

        spawn(async move {
            let result = match receiver.await {
                Ok(probed) => Ok(probed),
                Err(e) => {
                    debug!("Probe for {} was canceled: {}", root.display(), e);
                    Err(RefreshError::CanceledError { root, source: e })
                }
            };

            if let Err(send_err) = sender.unbounded_send(result) {
                debug!("Failed to send probe result: {}", send_err);
            }
        })
        .detach();

        Ok(())
    }

    /// Checks the cycle against the projects tracked now and, when still
    /// current, installs its statuses and reconciles the whole forest.
    pub fn finish_refresh(
        &mut self,
        completed: CompletedRefresh,
        current_roots: &[PathBuf],
        model: &mut TreeModel,
    ) -> RefreshOutcome {
        let CompletedRefresh {
            cycle,
            snapshot,
            result,
        } = completed;

        let status_maps = match result {
            Ok(status_maps) => status_maps,
            Err(e) => {
                error!(
                    "Error while running status probes\n{}",
                    snafu::Report::from_error(e)
                );
                return RefreshOutcome::Failed;
            }
        };

        let snapshot_set = snapshot.iter().collect::<HashSet<_>>();
        let current_set = current_roots.iter().collect::<HashSet<_>>();
        if snapshot_set != current_set {
            info!("Projects added or removed while refreshing, assuming another refresh is coming soon");
            return RefreshOutcome::Stale;
        }

        if self.installed_cycle.is_some_and(|installed| cycle < installed) {
            debug!("Refresh cycle {} finished after a newer one, dropping it", cycle);
            return RefreshOutcome::Superseded;
        }

        self.status_maps = Arc::new(status_maps);
        self.installed_cycle = Some(cycle);

        let status_maps = self.status_maps.clone();
        TreeSynchronizer::new(model, &status_maps).reconcile_all();
        debug!("Refresh cycle {} done", cycle);
        RefreshOutcome::Applied
    }
}

impl PendingRefresh {
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Waits for every probe of the cycle. Does not touch the model, so other
    /// events can be handled meanwhile.
    pub async fn wait(mut self) -> CompletedRefresh {
        let expected = self.snapshot.len();
        let mut status_maps = HashMap::with_capacity(expected);
        let mut failure = None;

        for _ in 0..expected {
            match self.receiver.next().await {
                Some(Ok((root, status_map))) => {
                    debug!("Got {} statuses for {}", status_map.len(), root.display());
                    status_maps.insert(root, Arc::new(status_map));
                }
                Some(Err(e)) => {
                    failure.get_or_insert(e);
                }
                None => {
                    failure.get_or_insert(RefreshError::ProbesIncomplete {
                        expected,
                        received: status_maps.len(),
                    });
                    break;
                }
            }
        }

        CompletedRefresh {
            cycle: self.cycle,
            snapshot: self.snapshot,
            result: match failure {
                Some(e) => Err(e),
                None => Ok(status_maps),
            },
        }
    }
}

#[derive(Debug, Snafu)]
pub enum RefreshCreationError {
    #[snafu(display("Failed to create status probe dispatcher"))]
    DispatcherError { source: std::io::Error },
}

#[derive(Debug, Snafu)]
pub enum RefreshError {
    #[snafu(display("Failed to dispatch status probe for {}: {}", root.display(), error))]
    DispatchError { root: PathBuf, error: String },
    #[snafu(display("Status probe for {} got cancelled", root.display()))]
    CanceledError {
        root: PathBuf,
        source: futures_channel::oneshot::Canceled,
    },
    #[snafu(display("Only {} of {} status probes reported back", received, expected))]
    ProbesIncomplete { expected: usize, received: usize },
}
