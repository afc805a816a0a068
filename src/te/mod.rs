mod distance;
mod flow;
mod fraction;
mod frontier;
mod policy;
mod rounds;
mod routing;
mod search;
mod utilization;

pub use distance::DistanceMatrix;
pub use flow::{FlowAggregator, FlowMap};
pub use fraction::FlowFractionModel;
pub use policy::{Budget, BudgetPolicy, CandidateFilter, RoundPolicy, SortPolicy};
pub use rounds::{
    AlgorithmKind, Chaining, Deadline, OrchestratorConfig, RoundOrchestrator, RoundPlan,
};
pub use routing::RoutingModel;
pub use search::{RoundOutcome, WaypointSearch};
pub use utilization::{CapacityPolicy, UtilizationEvaluator};
