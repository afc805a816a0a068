use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::{Demand, Topology};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortPolicy {
    /// Largest volume first, ties by descending demand index.
    #[default]
    ByDemandValue,
    /// Volume order, then each of `chunks` contiguous position ranges is
    /// re-sorted by the total capacity incident to the demand's endpoints.
    /// The first chunk absorbs the remainder; one chunk is a full sort.
    ByEndpointCapacity { chunks: usize },
}

impl SortPolicy {
    pub fn order(&self, topology: &Topology, demands: &[Demand]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..demands.len()).collect();
        order.sort_by(|a, b| {
            demands[*b]
                .volume
                .total_cmp(&demands[*a].volume)
                .then_with(|| b.cmp(a))
        });

        let Self::ByEndpointCapacity { chunks } = *self else {
            return order;
        };
        if order.is_empty() {
            return order;
        }

        let node_capacity = topology.node_capacities();
        let pair_capacity = |idx: usize| {
            let demand = &demands[idx];
            node_capacity[demand.src as usize] + node_capacity[demand.dst as usize]
        };

        let chunks = chunks.clamp(1, order.len());
        let chunk_size = order.len() / chunks;
        let mut start = 0;
        let mut end = chunk_size + order.len() % chunks;
        while start < order.len() {
            order[start..end].sort_by(|a, b| pair_capacity(*b).total_cmp(&pair_capacity(*a)));
            start = end;
            end = (end + chunk_size).min(order.len());
        }
        order
    }
}

/// Which nodes may serve as a waypoint. Endpoints of the demand itself are
/// always excluded by the search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CandidateFilter {
    #[default]
    All,
    EveryNth(u32),
    AllowList(BTreeSet<u32>),
}

impl CandidateFilter {
    pub fn admits(&self, node: u32) -> bool {
        match self {
            Self::All => true,
            Self::EveryNth(stride) => node % (*stride).max(1) == 0,
            Self::AllowList(allowed) => allowed.contains(&node),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::All => "all".to_string(),
            Self::EveryNth(stride) => format!("every_{stride}"),
            Self::AllowList(allowed) => format!("allow_{}", allowed.len()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetPolicy {
    /// At most `k` waypoints across the whole pass; the pass stops once spent.
    Global(usize),
    OnePerDemand,
}

impl BudgetPolicy {
    pub fn tracker(&self) -> Budget {
        match self {
            Self::Global(k) => Budget { remaining: Some(*k) },
            Self::OnePerDemand => Budget { remaining: None },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    remaining: Option<usize>,
}

impl Budget {
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    pub fn consume(&mut self) {
        if let Some(left) = self.remaining.as_mut() {
            *left = left.saturating_sub(1);
        }
    }

    pub fn remaining(&self) -> Option<usize> {
        self.remaining
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundPolicy {
    pub sort: SortPolicy,
    pub candidates: CandidateFilter,
    pub budget: BudgetPolicy,
}

impl RoundPolicy {
    pub fn new(budget: BudgetPolicy) -> Self {
        Self {
            sort: SortPolicy::default(),
            candidates: CandidateFilter::All,
            budget,
        }
    }

    pub fn with_sort(mut self, sort: SortPolicy) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_candidates(mut self, candidates: CandidateFilter) -> Self {
        self.candidates = candidates;
        self
    }
}
