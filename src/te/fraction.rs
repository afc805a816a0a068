use crate::model::{TeError, Topology};

use super::distance::DistanceMatrix;

/// Per (src, dst) pair, the share of one unit of traffic carried by each edge
/// under ECMP: traffic reaching a node is split evenly over every outgoing
/// edge that continues a shortest path. Stored sparsely, sorted by edge id.
#[derive(Debug, Clone)]
pub struct FlowFractionModel {
    nodes: usize,
    pairs: Vec<Vec<(usize, f64)>>,
    reachable: Vec<bool>,
}

impl FlowFractionModel {
    pub fn compute(topology: &Topology, distances: &DistanceMatrix) -> Self {
        let nodes = topology.node_count();
        let edge_count = topology.edges().len();
        let mut pairs = vec![Vec::new(); nodes * nodes];
        let mut reachable = vec![false; nodes * nodes];

        let mut node_flow = vec![0.0_f64; nodes];
        let mut edge_flow = vec![0.0_f64; edge_count];
        let mut touched: Vec<usize> = Vec::new();

        for dst in 0..nodes as u32 {
            // Nodes farther from dst feed nodes closer to it, never the reverse.
            let mut order: Vec<u32> = (0..nodes as u32)
                .filter(|u| distances.is_reachable(*u, dst))
                .collect();
            order.sort_by(|a, b| {
                distances
                    .get(*b, dst)
                    .total_cmp(&distances.get(*a, dst))
                    .then_with(|| a.cmp(b))
            });
            let hops: Vec<Vec<usize>> = (0..nodes as u32)
                .map(|u| distances.next_hops(topology, u, dst).collect())
                .collect();

            for src in 0..nodes as u32 {
                let slot = src as usize * nodes + dst as usize;
                if src == dst {
                    reachable[slot] = true;
                    continue;
                }
                if !distances.is_reachable(src, dst) {
                    continue;
                }
                reachable[slot] = true;

                node_flow.iter_mut().for_each(|f| *f = 0.0);
                node_flow[src as usize] = 1.0;
                for u in &order {
                    let inflow = node_flow[*u as usize];
                    if inflow <= 0.0 || *u == dst {
                        continue;
                    }
                    let next = &hops[*u as usize];
                    let share = inflow / next.len() as f64;
                    for idx in next {
                        if edge_flow[*idx] == 0.0 {
                            touched.push(*idx);
                        }
                        edge_flow[*idx] += share;
                        node_flow[topology.edges()[*idx].to as usize] += share;
                    }
                }

                touched.sort_unstable();
                pairs[slot] = touched.iter().map(|idx| (*idx, edge_flow[*idx])).collect();
                for idx in touched.drain(..) {
                    edge_flow[idx] = 0.0;
                }
            }
        }

        Self {
            nodes,
            pairs,
            reachable,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes
    }

    pub fn fractions(&self, src: u32, dst: u32) -> Result<&[(usize, f64)], TeError> {
        let slot = src as usize * self.nodes + dst as usize;
        if !self.reachable[slot] {
            return Err(TeError::Unreachable { src, dst });
        }
        Ok(&self.pairs[slot])
    }

    pub fn fraction(&self, src: u32, dst: u32, edge: usize) -> f64 {
        self.fractions(src, dst)
            .ok()
            .and_then(|list| {
                list.binary_search_by_key(&edge, |(idx, _)| *idx)
                    .ok()
                    .map(|pos| list[pos].1)
            })
            .unwrap_or(0.0)
    }

    pub fn is_routable(&self, src: u32, dst: u32) -> bool {
        self.reachable[src as usize * self.nodes + dst as usize]
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::model::{Link, WeightAssignment};

    fn model(nodes: usize, links: Vec<Link>, weights: Vec<f64>) -> (Topology, FlowFractionModel) {
        let topo = Topology::new(nodes, links, false).expect("valid");
        let weights = WeightAssignment::for_topology(&topo, weights).expect("weights");
        let dm = DistanceMatrix::compute(&topo, &weights);
        let model = FlowFractionModel::compute(&topo, &dm);
        (topo, model)
    }

    fn edge_between(topo: &Topology, from: u32, to: u32) -> usize {
        topo.edges()
            .iter()
            .position(|e| e.from == from && e.to == to)
            .expect("edge should exist")
    }

    #[test]
    fn ring_splits_evenly_across_both_halves() {
        let (topo, model) = model(
            4,
            vec![
                Link::new(0, 1, 10.0),
                Link::new(1, 2, 10.0),
                Link::new(2, 3, 10.0),
                Link::new(3, 0, 10.0),
            ],
            vec![1.0; 4],
        );
        for (from, to) in [(0, 1), (1, 2), (0, 3), (3, 2)] {
            assert_eq!(model.fraction(0, 2, edge_between(&topo, from, to)), 0.5);
        }
        assert_eq!(model.fraction(0, 2, edge_between(&topo, 1, 0)), 0.0);
        assert_eq!(model.fractions(0, 2).expect("routable").len(), 4);
    }

    #[test]
    fn split_is_per_hop_not_per_path() {
        // 0 -> {1, 2}; 1 -> {3, 4}; 2 -> 5; all converge on 6 at equal cost.
        let (topo, model) = model(
            7,
            vec![
                Link::new(0, 1, 1.0),
                Link::new(0, 2, 1.0),
                Link::new(1, 3, 1.0),
                Link::new(1, 4, 1.0),
                Link::new(2, 5, 1.0),
                Link::new(3, 6, 1.0),
                Link::new(4, 6, 1.0),
                Link::new(5, 6, 1.0),
            ],
            vec![1.0; 8],
        );
        assert_eq!(model.fraction(0, 6, edge_between(&topo, 0, 1)), 0.5);
        assert_eq!(model.fraction(0, 6, edge_between(&topo, 1, 3)), 0.25);
        assert_eq!(model.fraction(0, 6, edge_between(&topo, 5, 6)), 0.5);
    }

    #[test]
    fn unreachable_pair_is_reported() {
        let (_, model) = model(3, vec![Link::new(0, 1, 1.0)], vec![1.0]);
        assert_eq!(
            model.fractions(0, 2).unwrap_err(),
            TeError::Unreachable { src: 0, dst: 2 }
        );
        assert!(model.is_routable(1, 0));
        assert_eq!(model.fraction(0, 2, 0), 0.0);
    }

    fn grid_links(width: u32, height: u32) -> Vec<Link> {
        let mut links = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let id = y * width + x;
                if x + 1 < width {
                    links.push(Link::new(id, id + 1, 10.0));
                }
                if y + 1 < height {
                    links.push(Link::new(id, id + width, 10.0));
                }
            }
        }
        links
    }

    proptest! {
        #[test]
        fn fractions_are_conserved_on_grids(
            width in 2u32..5,
            height in 2u32..5,
            raw_weights in prop::collection::vec(1u32..4, 32),
            src_seed in 0u32..1000,
            dst_seed in 0u32..1000,
        ) {
            let nodes = (width * height) as usize;
            let links = grid_links(width, height);
            let weights: Vec<f64> = links
                .iter()
                .enumerate()
                .map(|(i, _)| f64::from(raw_weights[i % raw_weights.len()]))
                .collect();
            let (topo, model) = model(nodes, links, weights);
            let src = src_seed % nodes as u32;
            let dst = dst_seed % nodes as u32;
            prop_assume!(src != dst);

            let fractions = model.fractions(src, dst).expect("grid is connected");
            let mut balance = vec![0.0_f64; nodes];
            for (idx, frac) in fractions {
                prop_assert!(*frac > 0.0 && *frac <= 1.0 + 1e-9);
                let edge = &topo.edges()[*idx];
                balance[edge.from as usize] -= frac;
                balance[edge.to as usize] += frac;
            }
            for (node, value) in balance.iter().enumerate() {
                let expected = if node as u32 == src {
                    -1.0
                } else if node as u32 == dst {
                    1.0
                } else {
                    0.0
                };
                prop_assert!((value - expected).abs() < 1e-9);
            }
        }
    }
}
