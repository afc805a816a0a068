pub mod error;
pub mod solution;
pub mod topology;
pub mod weights;

pub use error::TeError;
pub use solution::{LinkLoad, SolutionRecord, WaypointRoute};
pub use topology::{Demand, Edge, Link, Topology};
pub use weights::{
    InverseCapacityWeights, LinkWeight, UnitWeights, WeightAssignment, WeightHeuristic,
};
