// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::BinaryHeap;
use std::time::Instant;

use super::{SearchError, SearchLimits};
use crate::Graph;

/// How often (in settled nodes) the deadline of a search is checked.
const DEADLINE_CHECK_INTERVAL: usize = 256;

const NO_PREDECESSOR: u32 = u32::MAX;

/// Result of a successful [shortest_path] search.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// Ids of consecutive nodes, starting with the start node and ending with the end node.
    pub nodes: Vec<i64>,

    /// Total length of the path, in meters.
    pub length: f64,
}

#[derive(Debug, Clone, Copy)]
struct QueueItem {
    at: u32,
    cost: f64,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for QueueItem {}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // NOTE: We revert the order of comparison,
        // as lower costs (and then lower node indices) are considered better ("higher"),
        // and Rust's BinaryHeap is a max-heap.
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.at.cmp(&self.at))
    }
}

fn reconstruct_path(g: &Graph, came_from: &[u32], mut last: usize) -> Vec<i64> {
    let mut path = vec![g.node_at(last).id];

    while came_from[last] != NO_PREDECESSOR {
        last = came_from[last] as usize;
        path.push(g.node_at(last).id);
    }

    path.reverse();
    path
}

/// Uses [Dijkstra's algorithm](https://en.wikipedia.org/wiki/Dijkstra%27s_algorithm)
/// to find the shortest path between two nodes in the provided graph.
///
/// Returns a single-node path if `from_id == to_id`, and [SearchError::NoPath]
/// if the nodes lie in different connected components of the graph.
///
/// Frontier nodes with equal tentative distances are expanded in the order of their ids,
/// so the result is deterministic. All parallel edges are considered.
///
/// The working memory (distance table, predecessor table and the queue)
/// is allocated per call, so any number of searches may run on a shared graph concurrently.
pub fn shortest_path(
    g: &Graph,
    from_id: i64,
    to_id: i64,
    limits: &SearchLimits,
) -> Result<Path, SearchError> {
    let from = g
        .index_of(from_id)
        .ok_or(SearchError::UnknownNode(from_id))?;
    let to = g.index_of(to_id).ok_or(SearchError::UnknownNode(to_id))?;

    if from == to {
        return Ok(Path {
            nodes: vec![from_id],
            length: 0.0,
        });
    }

    let mut queue: BinaryHeap<QueueItem> = BinaryHeap::default();
    let mut known_costs: Vec<f64> = vec![f64::INFINITY; g.len()];
    let mut came_from: Vec<u32> = vec![NO_PREDECESSOR; g.len()];
    let mut settled: Vec<bool> = vec![false; g.len()];
    let mut steps: usize = 0;
    let started = limits.deadline.map(|deadline| (Instant::now(), deadline));

    known_costs[from] = 0.0;
    queue.push(QueueItem {
        at: from as u32,
        cost: 0.0,
    });

    while let Some(item) = queue.pop() {
        let at = item.at as usize;

        // Multiple items may be kept in the queue for the same node
        if settled[at] {
            continue;
        }

        if at == to {
            return Ok(Path {
                nodes: reconstruct_path(g, &came_from, to),
                length: item.cost,
            });
        }

        if limits.step_limit.is_some_and(|limit| steps >= limit) {
            return Err(SearchError::Timeout { steps });
        }

        if let Some((started_at, deadline)) = started {
            if steps % DEADLINE_CHECK_INTERVAL == 0 && started_at.elapsed() >= deadline {
                return Err(SearchError::Timeout { steps });
            }
        }

        settled[at] = true;
        steps += 1;

        for (&neighbor, &length) in g.neighbors_at(at) {
            let neighbor_idx = neighbor as usize;
            if settled[neighbor_idx] {
                continue;
            }

            // Check if this is the cheapest way to the neighbor
            let neighbor_cost = item.cost + length;
            if neighbor_cost >= known_costs[neighbor_idx] {
                continue;
            }

            came_from[neighbor_idx] = item.at;
            known_costs[neighbor_idx] = neighbor_cost;
            queue.push(QueueItem {
                at: neighbor,
                cost: neighbor_cost,
            });
        }
    }

    log::trace!("no path from {from_id} to {to_id} after {steps} steps");
    Err(SearchError::NoPath {
        from: from_id,
        to: to_id,
    })
}

/// Runs [shortest_path] searches against a single [Graph] with fixed [SearchLimits].
#[derive(Debug, Clone, Copy)]
pub struct PathFinder<'g> {
    g: &'g Graph,
    limits: SearchLimits,
}

impl<'g> PathFinder<'g> {
    pub fn new(g: &'g Graph) -> Self {
        Self {
            g,
            limits: SearchLimits::UNLIMITED,
        }
    }

    pub fn with_limits(self, limits: SearchLimits) -> Self {
        Self { limits, ..self }
    }

    pub fn graph(&self) -> &'g Graph {
        self.g
    }

    pub fn limits(&self) -> &SearchLimits {
        &self.limits
    }

    /// Finds the shortest path between two nodes, see [shortest_path].
    pub fn shortest_path(&self, from_id: i64, to_id: i64) -> Result<Path, SearchError> {
        shortest_path(self.g, from_id, to_id, &self.limits)
    }
}
