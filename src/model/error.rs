use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TeError {
    #[error("no shortest path from {src} to {dst} under the current weights")]
    Unreachable { src: u32, dst: u32 },
    #[error("{what} references node {node}, but the topology has {nodes} nodes")]
    NodeOutOfRange {
        what: &'static str,
        node: u32,
        nodes: usize,
    },
    #[error("link ({u},{v}) is defined more than once")]
    DuplicateLink { u: u32, v: u32 },
    #[error("link ({node},{node}) is a self loop")]
    SelfLoop { node: u32 },
    #[error("demand {index} has identical endpoints {node}")]
    DemandSelfLoop { index: usize, node: u32 },
    #[error("demand {index} has invalid volume {volume}")]
    InvalidVolume { index: usize, volume: f64 },
    #[error("link ({u},{v}) has non-positive capacity {capacity}")]
    DegenerateCapacity { u: u32, v: u32, capacity: f64 },
    #[error("link ({u},{v}) has invalid weight {weight}")]
    InvalidWeight { u: u32, v: u32, weight: f64 },
    #[error("weight assignment has {got} entries for {expected} links")]
    WeightCountMismatch { expected: usize, got: usize },
    #[error("solve interrupted before any round was committed")]
    Interrupted,
}

impl TeError {
    pub fn is_invalid_topology(&self) -> bool {
        matches!(
            self,
            Self::NodeOutOfRange { .. }
                | Self::DuplicateLink { .. }
                | Self::SelfLoop { .. }
                | Self::DemandSelfLoop { .. }
                | Self::InvalidVolume { .. }
        )
    }
}
