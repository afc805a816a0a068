use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    node: u32,
    dist: f64,
}

impl Eq for Candidate {}

impl Ord for Candidate {
    // Reversed so the max-heap yields the closest node, lowest id first on ties.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default, Clone)]
pub struct Frontier {
    heap: BinaryHeap<Candidate>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: u32, dist: f64) {
        self.heap.push(Candidate { node, dist });
    }

    /// Pops the closest node whose entry still matches `best[node]`; stale
    /// entries left behind by later relaxations are dropped.
    pub fn pop_settled(&mut self, best: &[f64]) -> Option<(u32, f64)> {
        while let Some(entry) = self.heap.pop() {
            let current = best
                .get(entry.node as usize)
                .copied()
                .unwrap_or(f64::INFINITY);
            if entry.dist > current {
                continue;
            }
            return Some((entry.node, entry.dist));
        }
        None
    }
}
