use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use auteur_types::{
    config::HeuristicsConfig,
    observation::{HeuristicKind, Observation, Window},
    timeline::MatchTimeline,
    Result,
};
use serde::Serialize;
use tracing::{trace, warn};

use crate::{heuristic_error, standard_heuristics, Heuristic};

/// Observations of one window, bucketed by phenomenon. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowAnalysis {
    pub window: Window,
    buckets: BTreeMap<HeuristicKind, Vec<Observation>>,
}

impl WindowAnalysis {
    pub fn get(&self, kind: HeuristicKind) -> &[Observation] {
        self.buckets.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Concatenation of the given buckets, in the order the kinds are listed.
    pub fn collect(&self, kinds: &[HeuristicKind]) -> Vec<Observation> {
        kinds
            .iter()
            .flat_map(|kind| self.get(*kind).iter().cloned())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(Vec::is_empty)
    }

    pub fn total(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}

/// Runs a registered scanner set over arbitrary windows. Holds no per-call
/// state, so overlapping windows may be analysed in any order.
pub struct WindowAnalyzer {
    heuristics: Vec<Box<dyn Heuristic>>,
}

impl WindowAnalyzer {
    pub fn new(heuristics: Vec<Box<dyn Heuristic>>) -> Result<Self> {
        let mut kinds = BTreeSet::new();
        for heuristic in &heuristics {
            if !kinds.insert(heuristic.kind()) {
                return Err(heuristic_error(format!(
                    "scanner for {} registered twice",
                    heuristic.kind()
                )));
            }
        }
        Ok(Self { heuristics })
    }

    pub fn standard(config: Arc<HeuristicsConfig>) -> Result<Self> {
        Self::new(standard_heuristics(config))
    }

    pub fn kinds(&self) -> Vec<HeuristicKind> {
        self.heuristics.iter().map(|h| h.kind()).collect()
    }

    pub fn analyze(&self, window: Window, timeline: &MatchTimeline) -> WindowAnalysis {
        self.run(window, timeline, |_| true)
    }

    /// Like [`analyze`](Self::analyze) but only runs the listed scanners.
    pub fn analyze_for(
        &self,
        window: Window,
        timeline: &MatchTimeline,
        kinds: &[HeuristicKind],
    ) -> WindowAnalysis {
        self.run(window, timeline, |kind| kinds.contains(&kind))
    }

    fn run(
        &self,
        window: Window,
        timeline: &MatchTimeline,
        wanted: impl Fn(HeuristicKind) -> bool,
    ) -> WindowAnalysis {
        let mut buckets = BTreeMap::new();
        for heuristic in self.heuristics.iter().filter(|h| wanted(h.kind())) {
            let kind = heuristic.kind();
            let mut observations = heuristic.scan(&window, timeline);
            let produced = observations.len();
            observations.retain(|obs| window.contains(obs.ready_at));
            if observations.len() != produced {
                warn!(
                    %kind,
                    %window,
                    dropped = produced - observations.len(),
                    "scanner produced observations outside its window"
                );
            }
            trace!(%kind, %window, count = observations.len(), "scan complete");
            buckets.insert(kind, observations);
        }
        WindowAnalysis { window, buckets }
    }
}
