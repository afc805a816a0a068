use crate::model::{Demand, TeError, Topology, WeightAssignment};

use super::frontier::Frontier;

const EPS: f64 = 1e-9;

pub(crate) fn approx_eq(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    if !a.is_finite() || !b.is_finite() {
        return false;
    }
    (a - b).abs() <= EPS * a.abs().max(b.abs()).max(1.0)
}

#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    nodes: usize,
    dist: Vec<f64>,
    edge_weight: Vec<f64>,
}

impl DistanceMatrix {
    pub fn compute(topology: &Topology, weights: &WeightAssignment) -> Self {
        let nodes = topology.node_count();
        let edge_weight: Vec<f64> = topology
            .edges()
            .iter()
            .map(|edge| weights.link_weight(edge.link))
            .collect();

        let mut dist = Vec::with_capacity(nodes * nodes);
        for src in 0..nodes as u32 {
            dist.extend(single_source(topology, &edge_weight, src));
        }

        Self {
            nodes,
            dist,
            edge_weight,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes
    }

    pub fn get(&self, src: u32, dst: u32) -> f64 {
        self.dist[src as usize * self.nodes + dst as usize]
    }

    pub fn is_reachable(&self, src: u32, dst: u32) -> bool {
        self.get(src, dst).is_finite()
    }

    pub fn edge_weight(&self, edge: usize) -> f64 {
        self.edge_weight[edge]
    }

    pub fn check_demands(&self, demands: &[Demand]) -> Result<(), TeError> {
        match demands
            .iter()
            .find(|demand| !self.is_reachable(demand.src, demand.dst))
        {
            Some(demand) => Err(TeError::Unreachable {
                src: demand.src,
                dst: demand.dst,
            }),
            None => Ok(()),
        }
    }

    pub fn on_shortest_path(&self, topology: &Topology, src: u32, dst: u32, edge: usize) -> bool {
        let total = self.get(src, dst);
        if !total.is_finite() {
            return false;
        }
        let e = &topology.edges()[edge];
        let via = self.get(src, e.from) + self.edge_weight[edge] + self.get(e.to, dst);
        via.is_finite() && approx_eq(via, total)
    }

    pub fn next_hops<'a>(
        &'a self,
        topology: &'a Topology,
        node: u32,
        dst: u32,
    ) -> impl Iterator<Item = usize> + 'a {
        let remaining = self.get(node, dst);
        topology.out_edges(node).iter().copied().filter(move |idx| {
            if !remaining.is_finite() || node == dst {
                return false;
            }
            let edge = &topology.edges()[*idx];
            let via = self.edge_weight[*idx] + self.get(edge.to, dst);
            via.is_finite() && approx_eq(via, remaining)
        })
    }
}

fn single_source(topology: &Topology, edge_weight: &[f64], src: u32) -> Vec<f64> {
    let mut best = vec![f64::INFINITY; topology.node_count()];
    let mut settled = vec![false; topology.node_count()];
    let mut frontier = Frontier::new();

    best[src as usize] = 0.0;
    frontier.push(src, 0.0);

    while let Some((u, cost_u)) = frontier.pop_settled(&best) {
        if settled[u as usize] {
            continue;
        }
        settled[u as usize] = true;

        for idx in topology.out_edges(u) {
            let v = topology.edges()[*idx].to as usize;
            let candidate = cost_u + edge_weight[*idx];
            if candidate < best[v] {
                best[v] = candidate;
                frontier.push(v as u32, candidate);
            }
        }
    }

    best
}
