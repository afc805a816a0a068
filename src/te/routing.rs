use std::collections::BTreeMap;

use crate::model::{Demand, SolutionRecord, TeError, Topology, WaypointRoute, WeightAssignment};
use crate::runtime::clock::Elapsed;

use super::distance::DistanceMatrix;
use super::flow::{FlowAggregator, FlowMap};
use super::fraction::FlowFractionModel;
use super::utilization::{CapacityPolicy, UtilizationEvaluator};

#[derive(Debug, Clone)]
pub struct RoutingModel<'a> {
    topology: &'a Topology,
    weights: WeightAssignment,
    distances: DistanceMatrix,
    fractions: FlowFractionModel,
    evaluator: UtilizationEvaluator,
}

impl<'a> RoutingModel<'a> {
    pub fn build(
        topology: &'a Topology,
        weights: WeightAssignment,
        capacity_policy: CapacityPolicy,
    ) -> Result<Self, TeError> {
        let evaluator = UtilizationEvaluator::new(topology, capacity_policy)?;
        let distances = DistanceMatrix::compute(topology, &weights);
        let fractions = FlowFractionModel::compute(topology, &distances);
        Ok(Self {
            topology,
            weights,
            distances,
            fractions,
            evaluator,
        })
    }

    pub fn topology(&self) -> &'a Topology {
        self.topology
    }

    pub fn weights(&self) -> &WeightAssignment {
        &self.weights
    }

    pub fn distances(&self) -> &DistanceMatrix {
        &self.distances
    }

    pub fn fractions(&self) -> &FlowFractionModel {
        &self.fractions
    }

    pub fn evaluator(&self) -> &UtilizationEvaluator {
        &self.evaluator
    }

    pub fn aggregator(&self) -> FlowAggregator<'_> {
        FlowAggregator::new(self.topology, &self.fractions)
    }

    pub fn validate(&self, demands: &[Demand]) -> Result<(), TeError> {
        self.topology.validate_demands(demands)?;
        self.distances.check_demands(demands)
    }

    pub fn baseline_flow(&self, demands: &[Demand]) -> Result<FlowMap, TeError> {
        self.validate(demands)?;
        self.aggregator().baseline(demands)
    }

    pub fn baseline_record(
        &self,
        demands: &[Demand],
        elapsed: Elapsed,
    ) -> Result<SolutionRecord, TeError> {
        let flow = self.baseline_flow(demands)?;
        let waypoints: BTreeMap<usize, WaypointRoute> = demands
            .iter()
            .enumerate()
            .map(|(idx, demand)| (idx, WaypointRoute::identity(demand, idx)))
            .collect();
        Ok(SolutionRecord {
            objective: self.evaluator.objective(&flow),
            execution_time: elapsed.wall_s,
            process_time: elapsed.cpu_s,
            waypoints,
            weights: self.weights.export(self.topology),
            loads: self.evaluator.link_loads(self.topology, &flow),
            next_round_demands: demands.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Link;

    #[test]
    fn baseline_record_routes_directly() {
        let topo = Topology::new(
            3,
            vec![Link::new(0, 1, 10.0), Link::new(1, 2, 5.0)],
            false,
        )
        .expect("valid");
        let weights = WeightAssignment::for_topology(&topo, vec![1.0, 1.0]).expect("weights");
        let model = RoutingModel::build(&topo, weights, CapacityPolicy::Infinite).expect("model");
        let demands = vec![Demand::new(0, 2, 2.0)];
        let record = model
            .baseline_record(
                &demands,
                Elapsed {
                    wall_s: 0.5,
                    cpu_s: 0.25,
                },
            )
            .expect("record");
        assert_eq!(record.objective, 0.4);
        assert_eq!(record.load_of(0, 1), Some(0.2));
        assert_eq!(record.waypoint_count(), 0);
        assert_eq!(record.next_round_demands, demands);
        assert_eq!(record.execution_time, 0.5);
    }

    #[test]
    fn validation_reports_unreachable_demands() {
        let topo = Topology::new(3, vec![Link::new(0, 1, 10.0)], false).expect("valid");
        let weights = WeightAssignment::for_topology(&topo, vec![1.0]).expect("weights");
        let model = RoutingModel::build(&topo, weights, CapacityPolicy::Infinite).expect("model");
        assert_eq!(
            model.validate(&[Demand::new(0, 2, 1.0)]),
            Err(TeError::Unreachable { src: 0, dst: 2 })
        );
        assert!(matches!(
            model.validate(&[Demand::new(0, 7, 1.0)]),
            Err(TeError::NodeOutOfRange { .. })
        ));
    }
}
