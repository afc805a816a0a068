use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::topology::Demand;
use super::weights::LinkWeight;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointRoute {
    pub segments: Vec<(u32, u32)>,
    /// Position of the (first) resulting demand in the next round's list.
    pub next_round_index: usize,
}

impl WaypointRoute {
    pub fn identity(demand: &Demand, next_round_index: usize) -> Self {
        Self {
            segments: vec![(demand.src, demand.dst)],
            next_round_index,
        }
    }

    pub fn detour(demand: &Demand, waypoint: u32, next_round_index: usize) -> Self {
        Self {
            segments: vec![(demand.src, waypoint), (waypoint, demand.dst)],
            next_round_index,
        }
    }

    pub fn waypoint(&self) -> Option<u32> {
        match self.segments.as_slice() {
            [(_, w), (w2, _)] if w == w2 => Some(*w),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkLoad {
    pub u: u32,
    pub v: u32,
    pub utilization: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionRecord {
    pub objective: f64,
    pub execution_time: f64,
    pub process_time: f64,
    pub waypoints: BTreeMap<usize, WaypointRoute>,
    pub weights: Vec<LinkWeight>,
    pub loads: Vec<LinkLoad>,
    pub next_round_demands: Vec<Demand>,
}

impl SolutionRecord {
    /// Layers this round on top of `previous`: times accumulate, everything
    /// else is taken from this round except the weights, which pass through.
    pub fn merged_onto(&self, previous: &SolutionRecord) -> SolutionRecord {
        SolutionRecord {
            objective: self.objective,
            execution_time: previous.execution_time + self.execution_time,
            process_time: previous.process_time + self.process_time,
            waypoints: self.waypoints.clone(),
            weights: previous.weights.clone(),
            loads: self.loads.clone(),
            next_round_demands: self.next_round_demands.clone(),
        }
    }

    pub fn waypoint_count(&self) -> usize {
        self.waypoints
            .values()
            .filter(|route| route.waypoint().is_some())
            .count()
    }

    pub fn load_of(&self, u: u32, v: u32) -> Option<f64> {
        self.loads
            .iter()
            .find(|load| load.u == u && load.v == v)
            .map(|load| load.utilization)
    }
}
