use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{json, Value};

use crate::model::{SolutionRecord, Topology};
use crate::te::{AlgorithmKind, OrchestratorConfig, SortPolicy};

pub const FAILURE_SENTINEL: f64 = -1.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSetup {
    pub algorithm: String,
    pub nodes: usize,
    pub links: usize,
    pub demands: usize,
    pub directed: bool,
    pub sort: String,
    pub capacity_policy: String,
    pub weight_heuristic: String,
    pub seed: u64,
}

impl RunSetup {
    pub fn new(
        kind: &AlgorithmKind,
        topology: &Topology,
        demands: usize,
        config: &OrchestratorConfig,
        weight_heuristic: &str,
    ) -> Self {
        Self {
            algorithm: kind.name().to_string(),
            nodes: topology.node_count(),
            links: topology.links().len(),
            demands,
            directed: topology.is_directed(),
            sort: sort_label(&config.sort),
            capacity_policy: format!("{:?}", config.capacity_policy).to_ascii_lowercase(),
            weight_heuristic: weight_heuristic.to_string(),
            seed: config.seed,
        }
    }
}

fn sort_label(sort: &SortPolicy) -> String {
    match sort {
        SortPolicy::ByDemandValue => "demand".to_string(),
        SortPolicy::ByEndpointCapacity { chunks } => format!("capacity_{chunks}"),
    }
}

fn with_setup(setup: &RunSetup, mut row: Value) -> Result<Value> {
    let setup = serde_json::to_value(setup).context("failed to serialize run setup")?;
    if let (Some(map), Value::Object(fields)) = (row.as_object_mut(), setup) {
        for (key, value) in fields {
            map.entry(key).or_insert(value);
        }
    }
    Ok(row)
}

pub fn record_rows(
    setup: &RunSetup,
    kind: &AlgorithmKind,
    records: &[SolutionRecord],
) -> Result<Vec<Value>> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let mut row = serde_json::to_value(record)
                .with_context(|| format!("failed to serialize record {index}"))?;
            if let Some(map) = row.as_object_mut() {
                map.insert("index".to_string(), json!(index));
                map.insert("label".to_string(), json!(kind.round_label(index)));
            }
            with_setup(setup, row)
        })
        .collect()
}

pub fn failure_row(setup: &RunSetup, kind: &AlgorithmKind, error: &str) -> Result<Value> {
    with_setup(
        setup,
        json!({
            "index": 0,
            "label": kind.round_label(0),
            "objective": FAILURE_SENTINEL,
            "execution_time": FAILURE_SENTINEL,
            "process_time": FAILURE_SENTINEL,
            "error": error,
        }),
    )
}

pub fn write_report(path: Option<&Path>, rows: &[Value]) -> Result<()> {
    let payload = Value::Array(rows.to_vec());
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            fs::write(path, serde_json::to_vec_pretty(&payload)?)
                .with_context(|| format!("failed to write report {}", path.display()))?;
        }
        None => println!("{}", serde_json::to_string_pretty(&payload)?),
    }
    Ok(())
}
