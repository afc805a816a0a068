use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::error::TeError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub u: u32,
    pub v: u32,
    pub capacity: f64,
}

impl Link {
    pub fn new(u: u32, v: u32, capacity: f64) -> Self {
        Self { u, v, capacity }
    }

    pub fn has_usable_capacity(&self) -> bool {
        self.capacity > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Demand {
    pub src: u32,
    pub dst: u32,
    pub volume: f64,
}

impl Demand {
    pub fn new(src: u32, dst: u32, volume: f64) -> Self {
        Self { src, dst, volume }
    }

    pub fn split_at(&self, waypoint: u32) -> [Demand; 2] {
        [
            Demand::new(self.src, waypoint, self.volume),
            Demand::new(waypoint, self.dst, self.volume),
        ]
    }
}

/// One direction of a link. Undirected links contribute two edges that share
/// the link's capacity value (full duplex) and weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub link: usize,
    pub from: u32,
    pub to: u32,
    pub capacity: f64,
}

#[derive(Debug, Clone)]
pub struct Topology {
    nodes: usize,
    directed: bool,
    links: Vec<Link>,
    edges: Vec<Edge>,
    out_edges: Vec<Vec<usize>>,
}

impl Topology {
    pub fn new(nodes: usize, links: Vec<Link>, directed: bool) -> Result<Self, TeError> {
        let mut seen: BTreeSet<(u32, u32)> = BTreeSet::new();
        for link in &links {
            for node in [link.u, link.v] {
                if node as usize >= nodes {
                    return Err(TeError::NodeOutOfRange {
                        what: "link",
                        node,
                        nodes,
                    });
                }
            }
            if link.u == link.v {
                return Err(TeError::SelfLoop { node: link.u });
            }
            let key = if directed {
                (link.u, link.v)
            } else {
                (link.u.min(link.v), link.u.max(link.v))
            };
            if !seen.insert(key) {
                return Err(TeError::DuplicateLink {
                    u: link.u,
                    v: link.v,
                });
            }
        }

        let mut edges = Vec::with_capacity(if directed { links.len() } else { 2 * links.len() });
        for (idx, link) in links.iter().enumerate() {
            edges.push(Edge {
                link: idx,
                from: link.u,
                to: link.v,
                capacity: link.capacity,
            });
            if !directed {
                edges.push(Edge {
                    link: idx,
                    from: link.v,
                    to: link.u,
                    capacity: link.capacity,
                });
            }
        }

        let mut out_edges = vec![Vec::new(); nodes];
        for (idx, edge) in edges.iter().enumerate() {
            out_edges[edge.from as usize].push(idx);
        }

        Ok(Self {
            nodes,
            directed,
            links,
            edges,
            out_edges,
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn out_edges(&self, node: u32) -> &[usize] {
        self.out_edges
            .get(node as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn degenerate_links(&self) -> Vec<&Link> {
        self.links
            .iter()
            .filter(|link| !link.has_usable_capacity())
            .collect()
    }

    pub fn validate_demands(&self, demands: &[Demand]) -> Result<(), TeError> {
        for (index, demand) in demands.iter().enumerate() {
            for node in [demand.src, demand.dst] {
                if node as usize >= self.nodes {
                    return Err(TeError::NodeOutOfRange {
                        what: "demand",
                        node,
                        nodes: self.nodes,
                    });
                }
            }
            if demand.src == demand.dst {
                return Err(TeError::DemandSelfLoop {
                    index,
                    node: demand.src,
                });
            }
            if !demand.volume.is_finite() || demand.volume < 0.0 {
                return Err(TeError::InvalidVolume {
                    index,
                    volume: demand.volume,
                });
            }
        }
        Ok(())
    }

    pub fn node_capacities(&self) -> Vec<f64> {
        let mut out = vec![0.0; self.nodes];
        for link in &self.links {
            out[link.u as usize] += link.capacity;
            out[link.v as usize] += link.capacity;
        }
        out
    }

    pub fn per_link_max(&self, per_edge: &[f64]) -> Vec<f64> {
        let mut out = vec![f64::NEG_INFINITY; self.links.len()];
        for (edge, value) in self.edges.iter().zip(per_edge) {
            let slot = &mut out[edge.link];
            if *value > *slot || value.is_nan() {
                *slot = *value;
            }
        }
        out
    }
}
