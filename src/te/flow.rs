use crate::model::{Demand, TeError, Topology};

use super::fraction::FlowFractionModel;

#[derive(Debug, Clone, PartialEq)]
pub struct FlowMap {
    per_edge: Vec<f64>,
}

impl FlowMap {
    pub fn zeros(edges: usize) -> Self {
        Self {
            per_edge: vec![0.0; edges],
        }
    }

    pub fn from_values(per_edge: Vec<f64>) -> Self {
        Self { per_edge }
    }

    pub fn get(&self, edge: usize) -> f64 {
        self.per_edge[edge]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.per_edge
    }

    fn add_scaled(&mut self, fractions: &[(usize, f64)], scale: f64) {
        for (idx, frac) in fractions {
            self.per_edge[*idx] += scale * frac;
        }
    }

    fn clamp_at(&mut self, fractions: &[(usize, f64)]) {
        for (idx, _) in fractions {
            let slot = &mut self.per_edge[*idx];
            if *slot < 0.0 {
                *slot = 0.0;
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FlowAggregator<'a> {
    fractions: &'a FlowFractionModel,
    edge_count: usize,
}

impl<'a> FlowAggregator<'a> {
    pub fn new(topology: &Topology, fractions: &'a FlowFractionModel) -> Self {
        Self {
            fractions,
            edge_count: topology.edges().len(),
        }
    }

    pub fn empty(&self) -> FlowMap {
        FlowMap::zeros(self.edge_count)
    }

    pub fn baseline(&self, demands: &[Demand]) -> Result<FlowMap, TeError> {
        let mut flow = self.empty();
        for demand in demands {
            flow.add_scaled(self.fractions.fractions(demand.src, demand.dst)?, demand.volume);
        }
        Ok(flow)
    }

    /// Writes into `scratch` the flow obtained from `base` when `demand` is
    /// detoured through `waypoint` instead of following its direct route.
    pub fn with_waypoint_into(
        &self,
        base: &FlowMap,
        demand: &Demand,
        waypoint: u32,
        scratch: &mut FlowMap,
    ) -> Result<(), TeError> {
        let direct = self.fractions.fractions(demand.src, demand.dst)?;
        let first = self.fractions.fractions(demand.src, waypoint)?;
        let second = self.fractions.fractions(waypoint, demand.dst)?;

        scratch.per_edge.clone_from(&base.per_edge);
        scratch.add_scaled(direct, -demand.volume);
        scratch.add_scaled(first, demand.volume);
        scratch.add_scaled(second, demand.volume);
        scratch.clamp_at(direct);
        Ok(())
    }

    pub fn with_waypoint(
        &self,
        base: &FlowMap,
        demand: &Demand,
        waypoint: u32,
    ) -> Result<FlowMap, TeError> {
        let mut out = self.empty();
        self.with_waypoint_into(base, demand, waypoint, &mut out)?;
        Ok(out)
    }
}
