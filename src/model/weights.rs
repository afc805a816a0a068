use serde::{Deserialize, Serialize};

use super::error::TeError;
use super::topology::{Demand, Topology};

#[derive(Debug, Clone, PartialEq)]
pub struct WeightAssignment {
    weights: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkWeight {
    pub u: u32,
    pub v: u32,
    pub weight: f64,
}

impl WeightAssignment {
    pub fn for_topology(topology: &Topology, weights: Vec<f64>) -> Result<Self, TeError> {
        if weights.len() != topology.links().len() {
            return Err(TeError::WeightCountMismatch {
                expected: topology.links().len(),
                got: weights.len(),
            });
        }
        for (link, weight) in topology.links().iter().zip(&weights) {
            if !weight.is_finite() || *weight <= 0.0 {
                return Err(TeError::InvalidWeight {
                    u: link.u,
                    v: link.v,
                    weight: *weight,
                });
            }
        }
        Ok(Self { weights })
    }

    pub fn link_weight(&self, link: usize) -> f64 {
        self.weights[link]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.weights
    }

    pub fn export(&self, topology: &Topology) -> Vec<LinkWeight> {
        topology
            .links()
            .iter()
            .zip(&self.weights)
            .map(|(link, weight)| LinkWeight {
                u: link.u,
                v: link.v,
                weight: *weight,
            })
            .collect()
    }
}

pub trait WeightHeuristic {
    fn name(&self) -> &'static str;
    fn assign(
        &self,
        topology: &Topology,
        demands: &[Demand],
        seed: u64,
    ) -> Result<WeightAssignment, TeError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct InverseCapacityWeights;

impl WeightHeuristic for InverseCapacityWeights {
    fn name(&self) -> &'static str {
        "inverse_capacity"
    }

    fn assign(
        &self,
        topology: &Topology,
        _demands: &[Demand],
        _seed: u64,
    ) -> Result<WeightAssignment, TeError> {
        let reference = topology
            .links()
            .iter()
            .map(|link| link.capacity)
            .filter(|cap| cap.is_finite() && *cap > 0.0)
            .fold(0.0_f64, f64::max);
        let weights = topology
            .links()
            .iter()
            .map(|link| {
                if reference > 0.0 && link.capacity.is_finite() && link.capacity > 0.0 {
                    reference / link.capacity
                } else {
                    // Degenerate links get the largest usable weight so they are avoided.
                    f64::from(u16::MAX)
                }
            })
            .collect();
        WeightAssignment::for_topology(topology, weights)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UnitWeights;

impl WeightHeuristic for UnitWeights {
    fn name(&self) -> &'static str {
        "unit"
    }

    fn assign(
        &self,
        topology: &Topology,
        _demands: &[Demand],
        _seed: u64,
    ) -> Result<WeightAssignment, TeError> {
        WeightAssignment::for_topology(topology, vec![1.0; topology.links().len()])
    }
}
