pub mod clock;
pub mod config;
pub mod report;

pub use clock::{Elapsed, Stopwatch};
pub use config::{load_solve_config, ProblemConfig, SolveConfig, WeightHeuristicKind};
pub use report::{failure_row, record_rows, write_report, RunSetup};
