use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::model::{Demand, SolutionRecord, TeError, Topology, WeightAssignment, WeightHeuristic};
use crate::runtime::clock::Stopwatch;

use super::policy::{BudgetPolicy, CandidateFilter, RoundPolicy, SortPolicy};
use super::routing::RoutingModel;
use super::search::WaypointSearch;
use super::utilization::CapacityPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chaining {
    /// Round `i + 1` consumes the `next_round_demands` of round `i` and its
    /// record accumulates onto round `i`.
    Threaded,
    /// Every round restarts from the input demands on top of the baseline.
    FromInitial,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundPlan {
    pub rounds: Vec<RoundPolicy>,
    pub chaining: Chaining,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmKind {
    KWaypoints { k: usize },
    MultiWaypoints { rounds: usize },
    PerRoundBudget { k_list: Vec<usize> },
    BudgetSweep { k_list: Vec<usize> },
    /// For each stride, one pass with budget `k` where only every
    /// stride-th node may be a waypoint.
    NodeStride { k: usize, strides: Vec<u32> },
    Restricted { k: usize, allow: BTreeSet<u32> },
}

impl AlgorithmKind {
    pub const NAMES: [&'static str; 6] = [
        "k_waypoints",
        "multi_waypoints",
        "per_round_budget",
        "budget_sweep",
        "node_stride",
        "restricted",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::KWaypoints { .. } => "k_waypoints",
            Self::MultiWaypoints { .. } => "multi_waypoints",
            Self::PerRoundBudget { .. } => "per_round_budget",
            Self::BudgetSweep { .. } => "budget_sweep",
            Self::NodeStride { .. } => "node_stride",
            Self::Restricted { .. } => "restricted",
        }
    }

    pub fn plan(&self, sort: SortPolicy) -> RoundPlan {
        let round = |budget: BudgetPolicy| RoundPolicy::new(budget).with_sort(sort);
        match self {
            Self::KWaypoints { k } => RoundPlan {
                rounds: vec![round(BudgetPolicy::Global(*k))],
                chaining: Chaining::Threaded,
            },
            Self::MultiWaypoints { rounds } => RoundPlan {
                rounds: (0..*rounds)
                    .map(|_| round(BudgetPolicy::OnePerDemand))
                    .collect(),
                chaining: Chaining::Threaded,
            },
            Self::PerRoundBudget { k_list } => RoundPlan {
                rounds: k_list
                    .iter()
                    .map(|k| round(BudgetPolicy::Global(*k)))
                    .collect(),
                chaining: Chaining::Threaded,
            },
            Self::BudgetSweep { k_list } => RoundPlan {
                rounds: k_list
                    .iter()
                    .map(|k| round(BudgetPolicy::Global(*k)))
                    .collect(),
                chaining: Chaining::FromInitial,
            },
            Self::NodeStride { k, strides } => RoundPlan {
                rounds: strides
                    .iter()
                    .map(|stride| {
                        round(BudgetPolicy::Global(*k))
                            .with_candidates(CandidateFilter::EveryNth(*stride))
                    })
                    .collect(),
                chaining: Chaining::FromInitial,
            },
            Self::Restricted { k, allow } => RoundPlan {
                rounds: vec![round(BudgetPolicy::Global(*k))
                    .with_candidates(CandidateFilter::AllowList(allow.clone()))],
                chaining: Chaining::Threaded,
            },
        }
    }

    pub fn round_label(&self, index: usize) -> String {
        if index == 0 {
            return format!("{}_baseline", self.name());
        }
        match self {
            Self::BudgetSweep { k_list } | Self::PerRoundBudget { k_list } => {
                format!("{}_k{}", self.name(), k_list.get(index - 1).copied().unwrap_or(0))
            }
            Self::NodeStride { strides, .. } => {
                format!("{}_{}", self.name(), strides.get(index - 1).copied().unwrap_or(0))
            }
            _ => format!("{}_{}", self.name(), index),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Deadline {
    started: Instant,
    limit: Option<Duration>,
    interrupt: Option<Arc<AtomicBool>>,
}

impl Deadline {
    pub fn none() -> Self {
        Self {
            started: Instant::now(),
            limit: None,
            interrupt: None,
        }
    }

    pub fn new(limit: Option<Duration>, interrupt: Option<Arc<AtomicBool>>) -> Self {
        Self {
            started: Instant::now(),
            limit,
            interrupt,
        }
    }

    pub fn is_expired(&self) -> bool {
        let interrupted = self
            .interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst));
        let timed_out = self
            .limit
            .is_some_and(|limit| self.started.elapsed() >= limit);
        interrupted || timed_out
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub sort: SortPolicy,
    pub capacity_policy: CapacityPolicy,
    pub seed: u64,
}

/// Runs the weight heuristic once, then the rounds of an algorithm family
/// over fixed weights. Records are cumulative snapshots, index 0 being the
/// baseline.
pub struct RoundOrchestrator {
    heuristic: Box<dyn WeightHeuristic>,
    config: OrchestratorConfig,
}

impl RoundOrchestrator {
    pub fn new(heuristic: Box<dyn WeightHeuristic>, config: OrchestratorConfig) -> Self {
        Self { heuristic, config }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn solve(
        &self,
        topology: &Topology,
        demands: &[Demand],
        weights: Option<WeightAssignment>,
        kind: &AlgorithmKind,
        deadline: &Deadline,
    ) -> Result<Vec<SolutionRecord>, TeError> {
        let watch = Stopwatch::start();
        topology.validate_demands(demands)?;
        let weights = match weights {
            Some(weights) => weights,
            None => self
                .heuristic
                .assign(topology, demands, self.config.seed)?,
        };
        let model = RoutingModel::build(topology, weights, self.config.capacity_policy)?;
        let baseline = model.baseline_record(demands, watch.elapsed())?;
        if deadline.is_expired() {
            warn!(
                "solve discarded: algorithm={} reason=deadline before baseline",
                kind.name()
            );
            return Err(TeError::Interrupted);
        }
        info!(
            "baseline: algorithm={} heuristic={} objective={:.6} demands={} links={}",
            kind.name(),
            self.heuristic.name(),
            baseline.objective,
            demands.len(),
            topology.links().len()
        );

        let plan = kind.plan(self.config.sort);
        let mut records = vec![baseline];
        for (round, policy) in plan.rounds.into_iter().enumerate() {
            if deadline.is_expired() {
                warn!(
                    "round skipped: algorithm={} round={} reason=deadline",
                    kind.name(),
                    round + 1
                );
                break;
            }

            let (input, base) = match plan.chaining {
                Chaining::Threaded => {
                    let last = &records[records.len() - 1];
                    (last.next_round_demands.clone(), last)
                }
                Chaining::FromInitial => (demands.to_vec(), &records[0]),
            };
            let candidates = policy.candidates.label();
            let outcome = WaypointSearch::new(&model, policy).run(&input)?;

            if deadline.is_expired() {
                warn!(
                    "round discarded: algorithm={} round={} reason=deadline",
                    kind.name(),
                    round + 1
                );
                break;
            }

            let merged = outcome.record.merged_onto(base);
            info!(
                "round committed: algorithm={} round={} candidates={} objective={:.6} waypoints={} next_demands={} budget_left={:?} elapsed_s={:.3}",
                kind.name(),
                round + 1,
                candidates,
                merged.objective,
                merged.waypoint_count(),
                merged.next_round_demands.len(),
                outcome.budget_left,
                merged.execution_time
            );
            records.push(merged);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InverseCapacityWeights, Link, UnitWeights};
    use proptest::prelude::*;

    fn bypass() -> Topology {
        Topology::new(
            5,
            vec![
                Link::new(0, 2, 10.0),
                Link::new(0, 1, 100.0),
                Link::new(1, 2, 100.0),
                Link::new(0, 3, 1.0),
                Link::new(3, 2, 1.0),
                Link::new(2, 4, 10.0),
            ],
            false,
        )
        .expect("valid bypass")
    }

    fn weights(topo: &Topology) -> WeightAssignment {
        WeightAssignment::for_topology(topo, vec![1.0, 2.0, 2.0, 5.0, 5.0, 1.0]).expect("weights")
    }

    fn orchestrator() -> RoundOrchestrator {
        RoundOrchestrator::new(Box::new(UnitWeights), OrchestratorConfig::default())
    }

    fn total_volume(demands: &[Demand]) -> f64 {
        demands.iter().map(|d| d.volume).sum()
    }

    #[test]
    fn k_waypoints_returns_baseline_then_round() {
        let topo = bypass();
        let demands = vec![Demand::new(0, 2, 8.0)];
        let records = orchestrator()
            .solve(
                &topo,
                &demands,
                Some(weights(&topo)),
                &AlgorithmKind::KWaypoints { k: 1 },
                &Deadline::none(),
            )
            .expect("solve");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].objective, 0.8);
        assert_eq!(records[1].objective, 0.08);
        assert!(records[1].execution_time >= records[0].execution_time);
        assert_eq!(records[1].weights, records[0].weights);
    }

    #[test]
    fn threaded_rounds_consume_previous_split_demands() {
        let topo = bypass();
        let demands = vec![Demand::new(0, 2, 8.0), Demand::new(4, 0, 3.0)];
        let records = orchestrator()
            .solve(
                &topo,
                &demands,
                Some(weights(&topo)),
                &AlgorithmKind::MultiWaypoints { rounds: 3 },
                &Deadline::none(),
            )
            .expect("solve");
        assert_eq!(records.len(), 4);
        for pair in records.windows(2) {
            assert!(pair[1].objective <= pair[0].objective);
            let previous = &pair[0].next_round_demands;
            let split = pair[1].waypoint_count();
            assert_eq!(pair[1].next_round_demands.len(), previous.len() + split);
            assert!(
                (total_volume(&pair[1].next_round_demands)
                    - total_volume(previous)
                    - pair[1]
                        .waypoints
                        .iter()
                        .filter(|(_, r)| r.waypoint().is_some())
                        .map(|(idx, _)| previous[*idx].volume)
                        .sum::<f64>())
                .abs()
                    < 1e-9
            );
        }
    }

    #[test]
    fn sweep_restarts_from_input_demands() {
        let topo = bypass();
        let demands = vec![Demand::new(0, 2, 8.0), Demand::new(2, 0, 6.0)];
        let kind = AlgorithmKind::BudgetSweep {
            k_list: vec![0, 1, 2],
        };
        let records = orchestrator()
            .solve(&topo, &demands, Some(weights(&topo)), &kind, &Deadline::none())
            .expect("solve");
        assert_eq!(records.len(), 4);
        assert_eq!(records[1].objective, records[0].objective);
        assert_eq!(records[2].waypoint_count(), 1);
        assert_eq!(records[3].waypoint_count(), 2);
        assert!(records
            .iter()
            .skip(1)
            .all(|r| r.waypoints.len() == demands.len()));
        assert_eq!(kind.round_label(2), "budget_sweep_k1");
    }

    #[test]
    fn node_stride_limits_candidates() {
        let topo = bypass();
        let demands = vec![Demand::new(0, 2, 8.0)];
        let kind = AlgorithmKind::NodeStride {
            k: 1,
            strides: vec![1, 3],
        };
        let records = orchestrator()
            .solve(&topo, &demands, Some(weights(&topo)), &kind, &Deadline::none())
            .expect("solve");
        assert_eq!(records[1].waypoints[&0].waypoint(), Some(1));
        // Stride 3 admits only node 3, which is worse than the direct route.
        assert_eq!(records[2].waypoint_count(), 0);
        assert_eq!(records[2].objective, 0.8);
    }

    #[test]
    fn heuristic_supplies_missing_weights() {
        let topo = bypass();
        let orchestrator =
            RoundOrchestrator::new(Box::new(InverseCapacityWeights), OrchestratorConfig::default());
        let records = orchestrator
            .solve(
                &topo,
                &[Demand::new(0, 2, 1.0)],
                None,
                &AlgorithmKind::KWaypoints { k: 0 },
                &Deadline::none(),
            )
            .expect("solve");
        // Reference capacity 100: the wide 0-1-2 path (2 * 1) beats 0-2 (10).
        assert_eq!(records[0].weights[0].weight, 10.0);
        assert_eq!(records[0].load_of(0, 1), Some(0.01));
        assert_eq!(records[0].load_of(0, 2), Some(0.0));
    }

    #[test]
    fn expired_deadline_discards_rounds() {
        let topo = bypass();
        let flag = Arc::new(AtomicBool::new(true));
        let deadline = Deadline::new(None, Some(flag.clone()));
        let err = orchestrator()
            .solve(
                &topo,
                &[Demand::new(0, 2, 8.0)],
                Some(weights(&topo)),
                &AlgorithmKind::KWaypoints { k: 1 },
                &deadline,
            )
            .unwrap_err();
        assert_eq!(err, TeError::Interrupted);

        flag.store(false, Ordering::SeqCst);
        assert!(!deadline.is_expired());
        assert!(Deadline::new(Some(Duration::ZERO), None).is_expired());
    }

    #[test]
    fn invalid_demand_is_rejected_before_routing() {
        let topo = bypass();
        let err = orchestrator()
            .solve(
                &topo,
                &[Demand::new(0, 9, 1.0)],
                None,
                &AlgorithmKind::KWaypoints { k: 1 },
                &Deadline::none(),
            )
            .unwrap_err();
        assert!(err.is_invalid_topology());
    }

    #[test]
    fn registry_names_are_unique_and_match() {
        let kinds = [
            AlgorithmKind::KWaypoints { k: 1 },
            AlgorithmKind::MultiWaypoints { rounds: 1 },
            AlgorithmKind::PerRoundBudget { k_list: vec![1] },
            AlgorithmKind::BudgetSweep { k_list: vec![1] },
            AlgorithmKind::NodeStride {
                k: 1,
                strides: vec![2],
            },
            AlgorithmKind::Restricted {
                k: 1,
                allow: BTreeSet::new(),
            },
        ];
        let names: Vec<&str> = kinds.iter().map(AlgorithmKind::name).collect();
        assert_eq!(names, AlgorithmKind::NAMES.to_vec());
        assert_eq!(
            kinds[1].plan(SortPolicy::ByDemandValue).rounds[0].budget,
            BudgetPolicy::OnePerDemand
        );
    }

    fn ring_with_chords(nodes: u32, chords: &[(u32, u32)], capacities: &[u32]) -> Topology {
        let mut pairs = BTreeSet::new();
        let mut links = Vec::new();
        let capacity = |i: usize| f64::from(capacities[i % capacities.len()]);
        for u in 0..nodes {
            let v = (u + 1) % nodes;
            pairs.insert((u.min(v), u.max(v)));
            links.push(Link::new(u, v, capacity(links.len())));
        }
        for (a, b) in chords {
            let (u, v) = (a % nodes, b % nodes);
            if u != v && pairs.insert((u.min(v), u.max(v))) {
                links.push(Link::new(u, v, capacity(links.len())));
            }
        }
        Topology::new(nodes as usize, links, false).expect("valid ring")
    }

    proptest! {
        #[test]
        fn threaded_rounds_conserve_volume_and_never_get_worse(
            nodes in 3u32..8,
            chords in prop::collection::vec((0u32..8, 0u32..8), 0..6),
            capacities in prop::collection::vec(1u32..20, 1..8),
            raw_demands in prop::collection::vec((0u32..8, 0u32..8, 1u32..10), 1..6),
            rounds in 1usize..4,
        ) {
            let topo = ring_with_chords(nodes, &chords, &capacities);
            let demands: Vec<Demand> = raw_demands
                .iter()
                .map(|(s, t, vol)| (s % nodes, t % nodes, f64::from(*vol)))
                .filter(|(s, t, _)| s != t)
                .map(|(s, t, vol)| Demand::new(s, t, vol))
                .collect();
            prop_assume!(!demands.is_empty());

            let records = RoundOrchestrator::new(
                Box::new(InverseCapacityWeights),
                OrchestratorConfig::default(),
            )
            .solve(
                &topo,
                &demands,
                None,
                &AlgorithmKind::MultiWaypoints { rounds },
                &Deadline::none(),
            )
            .expect("ring is connected");

            prop_assert_eq!(records.len(), rounds + 1);
            for pair in records.windows(2) {
                let previous = &pair[0].next_round_demands;
                prop_assert!(pair[1].objective <= pair[0].objective + 1e-9);
                prop_assert_eq!(pair[1].waypoints.len(), previous.len());
                let split: f64 = pair[1]
                    .waypoints
                    .iter()
                    .filter(|(_, route)| route.waypoint().is_some())
                    .map(|(idx, _)| previous[*idx].volume)
                    .sum();
                let grown = total_volume(&pair[1].next_round_demands) - total_volume(previous);
                prop_assert!((grown - split).abs() < 1e-9);
                for (idx, route) in &pair[1].waypoints {
                    let landed = &pair[1].next_round_demands[route.next_round_index];
                    prop_assert_eq!(landed.src, previous[*idx].src);
                }
            }
        }
    }
}
