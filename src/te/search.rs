use std::collections::BTreeMap;

use tracing::debug;

use crate::model::{Demand, SolutionRecord, TeError, WaypointRoute};
use crate::runtime::clock::Stopwatch;

use super::distance::approx_eq;
use super::flow::FlowMap;
use super::policy::RoundPolicy;
use super::routing::RoutingModel;

#[derive(Debug, Clone)]
pub struct RoundOutcome {
    pub record: SolutionRecord,
    pub baseline_objective: f64,
    pub trajectory: Vec<f64>,
    pub budget_left: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct WaypointSearch<'m, 'a> {
    model: &'m RoutingModel<'a>,
    policy: RoundPolicy,
}

impl<'m, 'a> WaypointSearch<'m, 'a> {
    pub fn new(model: &'m RoutingModel<'a>, policy: RoundPolicy) -> Self {
        Self { model, policy }
    }

    pub fn policy(&self) -> &RoundPolicy {
        &self.policy
    }

    pub fn run(&self, demands: &[Demand]) -> Result<RoundOutcome, TeError> {
        let watch = Stopwatch::start();
        let topology = self.model.topology();
        let evaluator = self.model.evaluator();
        let aggregator = self.model.aggregator();

        let mut flow = self.model.baseline_flow(demands)?;
        let mut objective = evaluator.objective(&flow);
        let baseline_objective = objective;

        let order = self.policy.sort.order(topology, demands);
        let mut budget = self.policy.budget.tracker();
        let mut waypoints: BTreeMap<usize, WaypointRoute> = BTreeMap::new();
        let mut next_round: Vec<Demand> = Vec::with_capacity(demands.len());
        let mut trajectory = Vec::with_capacity(demands.len());

        let mut scratch = aggregator.empty();
        let mut candidate_flow = aggregator.empty();

        for idx in order {
            let demand = &demands[idx];
            if budget.is_exhausted() {
                waypoints.insert(idx, WaypointRoute::identity(demand, next_round.len()));
                next_round.push(*demand);
                continue;
            }

            let chosen = self.best_waypoint(
                demand,
                &flow,
                objective,
                &mut scratch,
                &mut candidate_flow,
            )?;

            match chosen {
                Some((waypoint, improved)) => {
                    std::mem::swap(&mut flow, &mut candidate_flow);
                    objective = improved;
                    budget.consume();
                    debug!(
                        "waypoint committed: demand={} src={} dst={} waypoint={} objective={:.6}",
                        idx, demand.src, demand.dst, waypoint, objective
                    );
                    waypoints.insert(
                        idx,
                        WaypointRoute::detour(demand, waypoint, next_round.len()),
                    );
                    next_round.extend(demand.split_at(waypoint));
                }
                None => {
                    waypoints.insert(idx, WaypointRoute::identity(demand, next_round.len()));
                    next_round.push(*demand);
                }
            }
            trajectory.push(objective);
        }

        let elapsed = watch.elapsed();
        let record = SolutionRecord {
            objective,
            execution_time: elapsed.wall_s,
            process_time: elapsed.cpu_s,
            waypoints,
            weights: self.model.weights().export(topology),
            loads: evaluator.link_loads(topology, &flow),
            next_round_demands: next_round,
        };

        Ok(RoundOutcome {
            record,
            baseline_objective,
            trajectory,
            budget_left: budget.remaining(),
        })
    }

    /// Scans candidates in ascending node id and keeps the first one reaching
    /// the lowest objective, provided it is strictly below `current`. On
    /// success the winning flow map is left in `best_flow`.
    fn best_waypoint(
        &self,
        demand: &Demand,
        flow: &FlowMap,
        current: f64,
        scratch: &mut FlowMap,
        best_flow: &mut FlowMap,
    ) -> Result<Option<(u32, f64)>, TeError> {
        let fractions = self.model.fractions();
        let evaluator = self.model.evaluator();
        let aggregator = self.model.aggregator();

        let mut best: Option<(u32, f64)> = None;
        let mut best_objective = current;

        for waypoint in 0..fractions.node_count() as u32 {
            if waypoint == demand.src || waypoint == demand.dst {
                continue;
            }
            if !self.policy.candidates.admits(waypoint) {
                continue;
            }
            if !fractions.is_routable(demand.src, waypoint)
                || !fractions.is_routable(waypoint, demand.dst)
            {
                continue;
            }

            aggregator.with_waypoint_into(flow, demand, waypoint, scratch)?;
            let candidate = evaluator.objective(scratch);
            if candidate < best_objective && !approx_eq(candidate, best_objective) {
                best_objective = candidate;
                best = Some((waypoint, candidate));
                std::mem::swap(scratch, best_flow);
            }
        }

        Ok(best)
    }
}
