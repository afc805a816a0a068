use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::model::{
    Demand, InverseCapacityWeights, Link, Topology, UnitWeights, WeightAssignment,
    WeightHeuristic,
};
use crate::te::{AlgorithmKind, CapacityPolicy, OrchestratorConfig, SortPolicy};

pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WeightHeuristicKind {
    #[default]
    InverseCapacity,
    Unit,
}

impl WeightHeuristicKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "inverse_capacity" | "inverse-capacity" => Some(Self::InverseCapacity),
            "unit" | "hop_count" => Some(Self::Unit),
            _ => None,
        }
    }

    pub fn build(&self) -> Box<dyn WeightHeuristic> {
        match self {
            Self::InverseCapacity => Box::new(InverseCapacityWeights),
            Self::Unit => Box::new(UnitWeights),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProblemConfig {
    pub topology: Topology,
    pub demands: Vec<Demand>,
    pub weights: Option<WeightAssignment>,
}

#[derive(Debug, Clone)]
pub struct SolveConfig {
    pub problem: ProblemConfig,
    pub algorithm: AlgorithmKind,
    pub orchestrator: OrchestratorConfig,
    pub weight_heuristic: WeightHeuristicKind,
    pub time_limit: Option<Duration>,
}

#[derive(Debug, Deserialize)]
struct RawProblem {
    nodes: usize,
    #[serde(default)]
    directed: bool,
    #[serde(default)]
    links: Vec<(u32, u32, f64)>,
    #[serde(default)]
    demands: Vec<(u32, u32, f64)>,
    weights: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize, Default)]
struct RawAlgorithm {
    kind: Option<String>,
    k: Option<usize>,
    rounds: Option<usize>,
    k_list: Option<Vec<usize>>,
    strides: Option<Vec<u32>>,
    allow: Option<Vec<u32>>,
}

#[derive(Debug, Deserialize, Default)]
struct RawSort {
    by: Option<String>,
    chunks: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawSolveConfig {
    problem: RawProblem,
    algorithm: Option<RawAlgorithm>,
    sort: Option<RawSort>,
    capacity_policy: Option<String>,
    weight_heuristic: Option<String>,
    seed: Option<u64>,
    time_limit_s: Option<f64>,
}

pub fn load_solve_config(path: &Path) -> Result<SolveConfig> {
    let raw_text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse_solve_config(&raw_text)
}

pub fn parse_solve_config(raw_text: &str) -> Result<SolveConfig> {
    let raw_cfg: RawSolveConfig =
        serde_yaml::from_str(raw_text).context("failed to parse solve config yaml")?;

    let problem = resolve_problem(raw_cfg.problem)?;
    let algorithm = resolve_algorithm(raw_cfg.algorithm.unwrap_or_default())?;
    let sort = resolve_sort(raw_cfg.sort.unwrap_or_default())?;

    let capacity_policy = match raw_cfg
        .capacity_policy
        .as_deref()
        .map(|raw| raw.trim().to_ascii_lowercase())
        .as_deref()
    {
        None | Some("infinite") | Some("inf") => CapacityPolicy::Infinite,
        Some("reject") => CapacityPolicy::Reject,
        Some(other) => bail!("unsupported capacity_policy: {other}"),
    };

    let weight_heuristic = match raw_cfg.weight_heuristic.as_deref() {
        None => WeightHeuristicKind::default(),
        Some(raw) => WeightHeuristicKind::parse(raw)
            .with_context(|| format!("unsupported weight_heuristic: {raw}"))?,
    };

    let time_limit = match raw_cfg.time_limit_s {
        None => None,
        Some(secs) if secs.is_finite() && secs > 0.0 => Some(Duration::from_secs_f64(secs)),
        Some(secs) => bail!("time_limit_s must be positive, got {secs}"),
    };

    Ok(SolveConfig {
        problem,
        algorithm,
        orchestrator: OrchestratorConfig {
            sort,
            capacity_policy,
            seed: raw_cfg.seed.unwrap_or(DEFAULT_SEED),
        },
        weight_heuristic,
        time_limit,
    })
}

fn resolve_problem(raw: RawProblem) -> Result<ProblemConfig> {
    let links = raw
        .links
        .into_iter()
        .map(|(u, v, capacity)| Link::new(u, v, capacity))
        .collect();
    let topology =
        Topology::new(raw.nodes, links, raw.directed).context("invalid problem topology")?;
    let demands: Vec<Demand> = raw
        .demands
        .into_iter()
        .map(|(src, dst, volume)| Demand::new(src, dst, volume))
        .collect();
    topology
        .validate_demands(&demands)
        .context("invalid problem demands")?;
    let weights = raw
        .weights
        .map(|weights| WeightAssignment::for_topology(&topology, weights))
        .transpose()
        .context("invalid problem weights")?;

    Ok(ProblemConfig {
        topology,
        demands,
        weights,
    })
}

fn resolve_algorithm(raw: RawAlgorithm) -> Result<AlgorithmKind> {
    let kind = raw
        .kind
        .unwrap_or_else(|| "k_waypoints".to_string())
        .trim()
        .to_ascii_lowercase();
    let k = raw.k.unwrap_or(1);

    Ok(match kind.as_str() {
        "k_waypoints" => AlgorithmKind::KWaypoints { k },
        "multi_waypoints" => AlgorithmKind::MultiWaypoints {
            rounds: raw.rounds.unwrap_or(1),
        },
        "per_round_budget" => AlgorithmKind::PerRoundBudget {
            k_list: required_list(raw.k_list, &kind, "k_list")?,
        },
        "budget_sweep" => AlgorithmKind::BudgetSweep {
            k_list: required_list(raw.k_list, &kind, "k_list")?,
        },
        "node_stride" => {
            let strides = required_list(raw.strides, &kind, "strides")?;
            if strides.contains(&0) {
                bail!("algorithm node_stride: strides must be positive");
            }
            AlgorithmKind::NodeStride { k, strides }
        }
        "restricted" => AlgorithmKind::Restricted {
            k,
            allow: required_list(raw.allow, &kind, "allow")?
                .into_iter()
                .collect::<BTreeSet<u32>>(),
        },
        other => bail!(
            "unsupported algorithm: {other} (expected one of {})",
            AlgorithmKind::NAMES.join(", ")
        ),
    })
}

fn required_list<T>(raw: Option<Vec<T>>, kind: &str, key: &str) -> Result<Vec<T>> {
    match raw {
        Some(items) if !items.is_empty() => Ok(items),
        _ => bail!("algorithm {kind} requires a non-empty {key}"),
    }
}

fn resolve_sort(raw: RawSort) -> Result<SortPolicy> {
    let by = raw
        .by
        .unwrap_or_else(|| "demand".to_string())
        .trim()
        .to_ascii_lowercase();
    Ok(match by.as_str() {
        "demand" | "demand_value" => SortPolicy::ByDemandValue,
        "capacity" | "endpoint_capacity" => SortPolicy::ByEndpointCapacity {
            chunks: raw.chunks.unwrap_or(1).max(1),
        },
        other => bail!("unsupported sort policy: {other}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RING: &str = r#"
problem:
  nodes: 4
  links:
    - [0, 1, 10.0]
    - [1, 2, 10.0]
    - [2, 3, 10.0]
    - [3, 0, 10.0]
  demands:
    - [0, 2, 5.0]
"#;

    #[test]
    fn defaults_apply_when_sections_are_missing() {
        let cfg = parse_solve_config(RING).expect("config");
        assert_eq!(cfg.problem.topology.node_count(), 4);
        assert!(!cfg.problem.topology.is_directed());
        assert_eq!(cfg.problem.demands, vec![Demand::new(0, 2, 5.0)]);
        assert!(cfg.problem.weights.is_none());
        assert_eq!(cfg.algorithm, AlgorithmKind::KWaypoints { k: 1 });
        assert_eq!(cfg.orchestrator.sort, SortPolicy::ByDemandValue);
        assert_eq!(cfg.orchestrator.capacity_policy, CapacityPolicy::Infinite);
        assert_eq!(cfg.orchestrator.seed, DEFAULT_SEED);
        assert_eq!(cfg.weight_heuristic, WeightHeuristicKind::InverseCapacity);
        assert!(cfg.time_limit.is_none());
    }

    #[test]
    fn parses_full_config() {
        let text = format!(
            "{RING}  weights: [1, 2, 1, 2]\nalgorithm:\n  kind: Node_Stride\n  k: 3\n  strides: [1, 2]\nsort:\n  by: capacity\n  chunks: 4\ncapacity_policy: reject\nweight_heuristic: unit\nseed: 7\ntime_limit_s: 1.5\n"
        );
        let cfg = parse_solve_config(&text).expect("config");
        assert_eq!(
            cfg.algorithm,
            AlgorithmKind::NodeStride {
                k: 3,
                strides: vec![1, 2]
            }
        );
        assert_eq!(
            cfg.orchestrator.sort,
            SortPolicy::ByEndpointCapacity { chunks: 4 }
        );
        assert_eq!(cfg.orchestrator.capacity_policy, CapacityPolicy::Reject);
        assert_eq!(cfg.orchestrator.seed, 7);
        assert_eq!(cfg.weight_heuristic, WeightHeuristicKind::Unit);
        assert_eq!(cfg.time_limit, Some(Duration::from_millis(1500)));
        let weights = cfg.problem.weights.expect("weights");
        assert_eq!(weights.as_slice(), &[1.0, 2.0, 1.0, 2.0]);
    }

    #[test]
    fn rejects_unknown_algorithm_and_missing_lists() {
        let err = parse_solve_config(&format!("{RING}algorithm:\n  kind: annealing\n"))
            .expect_err("unknown kind");
        assert!(err.to_string().contains("unsupported algorithm: annealing"));

        let err = parse_solve_config(&format!("{RING}algorithm:\n  kind: budget_sweep\n"))
            .expect_err("missing k_list");
        assert!(err.to_string().contains("requires a non-empty k_list"));
    }

    #[test]
    fn rejects_invalid_topology() {
        let text = "problem:\n  nodes: 2\n  links:\n    - [0, 3, 1.0]\n";
        let err = parse_solve_config(text).expect_err("out of range");
        assert!(format!("{err:#}").contains("invalid problem topology"));
    }

    #[test]
    fn loads_from_file() {
        let path = std::env::temp_dir().join(format!("wpte-config-{}.yaml", std::process::id()));
        fs::write(&path, RING).expect("write temp config");
        let cfg = load_solve_config(&path).expect("config");
        fs::remove_file(&path).ok();
        assert_eq!(cfg.problem.topology.links().len(), 4);

        let missing = load_solve_config(Path::new("/nonexistent/wpte.yaml")).expect_err("missing");
        assert!(missing.to_string().contains("failed to read config file"));
    }
}
