use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::{LinkLoad, TeError, Topology};

use super::flow::FlowMap;

/// Flow below this on a zero-capacity edge counts as idle.
const IDLE_FLOW: f64 = 1e-12;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityPolicy {
    /// Utilization is `+inf` while the link carries flow and `0` when idle.
    #[default]
    Infinite,
    Reject,
}

#[derive(Debug, Clone)]
pub struct UtilizationEvaluator {
    capacity: Vec<f64>,
}

impl UtilizationEvaluator {
    pub fn new(topology: &Topology, policy: CapacityPolicy) -> Result<Self, TeError> {
        for link in topology.degenerate_links() {
            match policy {
                CapacityPolicy::Reject => {
                    return Err(TeError::DegenerateCapacity {
                        u: link.u,
                        v: link.v,
                        capacity: link.capacity,
                    })
                }
                CapacityPolicy::Infinite => warn!(
                    "degenerate capacity: link=({},{}) capacity={} utilization=inf when loaded",
                    link.u, link.v, link.capacity
                ),
            }
        }
        Ok(Self {
            capacity: topology.edges().iter().map(|edge| edge.capacity).collect(),
        })
    }

    pub fn edge_utilization(&self, edge: usize, flow: f64) -> f64 {
        let capacity = self.capacity[edge];
        if capacity > 0.0 {
            flow / capacity
        } else if flow > IDLE_FLOW {
            f64::INFINITY
        } else {
            0.0
        }
    }

    pub fn utilization(&self, flow: &FlowMap) -> Vec<f64> {
        flow.as_slice()
            .iter()
            .enumerate()
            .map(|(edge, value)| self.edge_utilization(edge, *value))
            .collect()
    }

    pub fn objective(&self, flow: &FlowMap) -> f64 {
        flow.as_slice()
            .iter()
            .enumerate()
            .map(|(edge, value)| self.edge_utilization(edge, *value))
            .fold(0.0, f64::max)
    }

    pub fn link_loads(&self, topology: &Topology, flow: &FlowMap) -> Vec<LinkLoad> {
        let per_link = topology.per_link_max(&self.utilization(flow));
        topology
            .links()
            .iter()
            .zip(per_link)
            .map(|(link, utilization)| LinkLoad {
                u: link.u,
                v: link.v,
                utilization: utilization.max(0.0),
            })
            .collect()
    }
}
