use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;
use wpte::runtime::config::load_solve_config;
use wpte::runtime::report::{failure_row, record_rows, write_report, RunSetup};
use wpte::te::{Deadline, RoundOrchestrator};

#[derive(Debug, Parser)]
#[command(name = "wpsolve")]
#[command(about = "Greedy waypoint optimization over shortest-path routing")]
struct Args {
    #[arg(long)]
    config: PathBuf,
    #[arg(long, default_value = "INFO")]
    log_level: String,
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let cfg = load_solve_config(&args.config)?;
    let interrupt = Arc::new(AtomicBool::new(false));
    {
        let interrupt = interrupt.clone();
        ctrlc::set_handler(move || interrupt.store(true, Ordering::SeqCst))?;
    }

    let problem = &cfg.problem;
    let heuristic = cfg.weight_heuristic.build();
    let setup = RunSetup::new(
        &cfg.algorithm,
        &problem.topology,
        problem.demands.len(),
        &cfg.orchestrator,
        heuristic.name(),
    );
    info!(
        "wpsolve start: algorithm={} nodes={} links={} demands={} heuristic={} seed={} time_limit={:?}",
        setup.algorithm,
        setup.nodes,
        setup.links,
        setup.demands,
        setup.weight_heuristic,
        setup.seed,
        cfg.time_limit
    );

    let orchestrator = RoundOrchestrator::new(heuristic, cfg.orchestrator);
    let deadline = Deadline::new(cfg.time_limit, Some(interrupt));
    let rows = match orchestrator.solve(
        &problem.topology,
        &problem.demands,
        problem.weights.clone(),
        &cfg.algorithm,
        &deadline,
    ) {
        Ok(records) => {
            if let Some(last) = records.last() {
                info!(
                    "wpsolve done: rounds={} objective={:.6} waypoints={} elapsed_s={:.3}",
                    records.len() - 1,
                    last.objective,
                    last.waypoint_count(),
                    last.execution_time
                );
            }
            record_rows(&setup, &cfg.algorithm, &records)?
        }
        Err(err) => {
            error!("wpsolve failed: algorithm={} err={}", setup.algorithm, err);
            vec![failure_row(&setup, &cfg.algorithm, &err.to_string())?]
        }
    };

    write_report(args.output.as_deref(), &rows)
}

fn init_logging(level: &str) -> Result<()> {
    let level = level.parse::<Level>()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
    Ok(())
}
