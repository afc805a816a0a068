use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use serde_json::{json, Value};
use wpte::model::{Demand, InverseCapacityWeights, Link, SolutionRecord, Topology};
use wpte::te::{AlgorithmKind, Deadline, OrchestratorConfig, RoundOrchestrator, SortPolicy};

#[derive(Debug, Parser)]
#[command(name = "waypoint_bench")]
#[command(about = "Benchmark waypoint algorithm families on random topologies")]
struct Args {
    #[arg(long, default_value_t = 30)]
    nodes: usize,
    #[arg(long, default_value_t = 0.1)]
    density: f64,
    #[arg(long, default_value_t = 40)]
    demands: usize,
    #[arg(long, default_value_t = 3)]
    seeds: usize,
    #[arg(long, default_value_t = 1)]
    start_seed: u64,
    #[arg(long, default_value_t = 3)]
    k: usize,
    #[arg(long, default_value_t = 3)]
    rounds: usize,
    #[arg(long, default_value_t = 1)]
    chunks: usize,
    #[arg(long)]
    output_json: Option<PathBuf>,
}

#[derive(Debug, Clone)]
struct LcgRng {
    state: u64,
}

impl LcgRng {
    fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1);
        self.state
    }

    fn next_f64(&mut self) -> f64 {
        let raw = self.next_u64() >> 11;
        (raw as f64) / ((1_u64 << 53) as f64)
    }

    fn range_f64(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    fn below(&mut self, bound: usize) -> usize {
        (self.next_u64() >> 33) as usize % bound.max(1)
    }
}

fn generate_topology(rng: &mut LcgRng, nodes: usize, density: f64) -> anyhow::Result<Topology> {
    let mut pairs = BTreeSet::new();
    let mut links = Vec::new();
    for u in 0..nodes as u32 {
        let v = (u + 1) % nodes as u32;
        pairs.insert((u.min(v), u.max(v)));
        links.push(Link::new(u, v, rng.range_f64(10.0, 100.0)));
    }

    let p = density.clamp(0.0, 1.0);
    for u in 0..nodes as u32 {
        for v in (u + 1)..nodes as u32 {
            if pairs.contains(&(u, v)) {
                continue;
            }
            if rng.next_f64() < p {
                pairs.insert((u, v));
                links.push(Link::new(u, v, rng.range_f64(10.0, 100.0)));
            }
        }
    }

    Ok(Topology::new(nodes, links, false)?)
}

fn generate_demands(rng: &mut LcgRng, nodes: usize, count: usize) -> Vec<Demand> {
    (0..count)
        .map(|_| {
            let src = rng.below(nodes);
            let dst = (src + 1 + rng.below(nodes - 1)) % nodes;
            Demand::new(src as u32, dst as u32, rng.range_f64(1.0, 20.0))
        })
        .collect()
}

fn algorithm_kinds(args: &Args, nodes: usize) -> Vec<AlgorithmKind> {
    let k = args.k;
    let rounds = args.rounds.max(1);
    vec![
        AlgorithmKind::KWaypoints { k },
        AlgorithmKind::MultiWaypoints { rounds },
        AlgorithmKind::PerRoundBudget {
            k_list: vec![k; rounds],
        },
        AlgorithmKind::BudgetSweep {
            k_list: (1..=k.max(1)).collect(),
        },
        AlgorithmKind::NodeStride {
            k,
            strides: vec![1, 2, 3],
        },
        AlgorithmKind::Restricted {
            k,
            allow: (0..nodes as u32).filter(|node| node % 2 == 0).collect(),
        },
    ]
}

fn summarize(kind: &AlgorithmKind, records: &[SolutionRecord], runtime_ms: f64) -> Value {
    let baseline = records.first().map_or(f64::NAN, |r| r.objective);
    let last = records.last();
    let best = records
        .iter()
        .map(|r| r.objective)
        .fold(f64::INFINITY, f64::min);
    json!({
        "algorithm": kind.name(),
        "records": records.len(),
        "baseline_objective": baseline,
        "final_objective": last.map_or(f64::NAN, |r| r.objective),
        "best_objective": best,
        "improvement": if baseline > 0.0 { 1.0 - best / baseline } else { 0.0 },
        "waypoints": last.map_or(0, SolutionRecord::waypoint_count),
        "runtime_ms": runtime_ms,
    })
}

fn aggregate(seed_rows: &[Value]) -> Value {
    let mut buckets: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for row in seed_rows {
        if let Some(algos) = row.get("algorithms").and_then(Value::as_array) {
            for algo in algos {
                if let Some(name) = algo.get("algorithm").and_then(Value::as_str) {
                    buckets
                        .entry(name.to_string())
                        .or_default()
                        .push(algo.clone());
                }
            }
        }
    }

    let avg = |rows: &[Value], key: &str| -> f64 {
        let xs: Vec<f64> = rows
            .iter()
            .filter_map(|row| row.get(key).and_then(Value::as_f64))
            .collect();
        if xs.is_empty() {
            f64::NAN
        } else {
            xs.iter().sum::<f64>() / xs.len() as f64
        }
    };

    let out = buckets
        .into_iter()
        .map(|(name, rows)| {
            json!({
                "algorithm": name,
                "runtime_ms": avg(&rows, "runtime_ms"),
                "baseline_objective": avg(&rows, "baseline_objective"),
                "best_objective": avg(&rows, "best_objective"),
                "improvement": avg(&rows, "improvement"),
                "waypoints": avg(&rows, "waypoints"),
            })
        })
        .collect();
    Value::Array(out)
}

fn print_summary(aggregated: &Value) {
    println!("algorithm\truntime_ms\tbaseline\tbest\timprovement\twaypoints");
    if let Some(rows) = aggregated.as_array() {
        for row in rows {
            let name = row.get("algorithm").and_then(Value::as_str).unwrap_or("?");
            let field = |key: &str| row.get(key).and_then(Value::as_f64).unwrap_or(f64::NAN);
            println!(
                "{}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{:.2}",
                name,
                field("runtime_ms"),
                field("baseline_objective"),
                field("best_objective"),
                field("improvement"),
                field("waypoints")
            );
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let nodes = args.nodes.max(3);
    let config = OrchestratorConfig {
        sort: if args.chunks > 1 {
            SortPolicy::ByEndpointCapacity {
                chunks: args.chunks,
            }
        } else {
            SortPolicy::ByDemandValue
        },
        ..OrchestratorConfig::default()
    };
    let mut seed_rows = Vec::new();

    for idx in 0..args.seeds.max(1) {
        let seed = args.start_seed + idx as u64;
        let mut rng = LcgRng::new(seed);
        let topology = generate_topology(&mut rng, nodes, args.density)?;
        let demands = generate_demands(&mut rng, nodes, args.demands);
        let orchestrator = RoundOrchestrator::new(
            Box::new(InverseCapacityWeights),
            OrchestratorConfig { seed, ..config },
        );

        let mut algorithms = Vec::new();
        for kind in algorithm_kinds(&args, nodes) {
            let start = Instant::now();
            let records = orchestrator.solve(&topology, &demands, None, &kind, &Deadline::none())?;
            let runtime_ms = start.elapsed().as_secs_f64() * 1000.0;
            algorithms.push(summarize(&kind, &records, runtime_ms));
        }

        seed_rows.push(json!({
            "seed": seed,
            "nodes": nodes,
            "links": topology.links().len(),
            "demands": demands.len(),
            "algorithms": algorithms,
        }));
    }

    let aggregated = aggregate(&seed_rows);
    print_summary(&aggregated);

    let payload = json!({
        "config": {
            "nodes": nodes,
            "density": args.density,
            "demands": args.demands,
            "seeds": args.seeds,
            "start_seed": args.start_seed,
            "k": args.k,
            "rounds": args.rounds,
            "chunks": args.chunks,
        },
        "runs": seed_rows,
        "aggregate": aggregated,
    });

    if let Some(path) = args.output_json {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec_pretty(&payload)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&payload)?);
    }

    Ok(())
}
