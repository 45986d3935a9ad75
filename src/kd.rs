// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::distance::{meridian_distance, parallel_distance};
use crate::{earth_distance, Graph, Node};

/// Graphs with at most this many nodes are searched linearly by [SpatialIndex],
/// as building a tree doesn't pay off.
pub const LINEAR_SCAN_MAX_NODES: usize = 32;

/// Distances (in meters) closer than this are considered equal,
/// and such ties are resolved by picking the node with the lowest id.
pub(crate) const TIE_EPSILON_M: f64 = 1e-9;

/// Error conditions of [SpatialIndex] lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SpatialError {
    /// The index was built from a graph without any nodes.
    #[error("spatial index is empty")]
    EmptyIndex,
}

/// Best node found so far by a nearest-neighbor search.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    node: Node,
    dist: f64,
}

impl Candidate {
    fn new(node: Node, lat: f64, lon: f64) -> Self {
        Self {
            node,
            dist: earth_distance(lat, lon, node.lat, node.lon),
        }
    }

    fn is_better_than(&self, other: &Candidate) -> bool {
        if self.dist < other.dist - TIE_EPSILON_M {
            true
        } else if self.dist <= other.dist + TIE_EPSILON_M {
            self.node.id < other.node.id
        } else {
            false
        }
    }
}

/// Finds the index of the node closest to the given position by checking every node.
pub(crate) fn linear_nearest(nodes: &[Node], lat: f64, lon: f64) -> Option<usize> {
    let mut best: Option<(usize, Candidate)> = None;
    for (idx, &node) in nodes.iter().enumerate() {
        let candidate = Candidate::new(node, lat, lon);
        let is_better = match &best {
            Some((_, b)) => candidate.is_better_than(b),
            None => true,
        };
        if is_better {
            best = Some((idx, candidate));
        }
    }
    best.map(|(idx, _)| idx)
}

/// KDTree implements the [k-d tree data structure](https://en.wikipedia.org/wiki/K-d_tree),
/// which speeds up nearest-neighbor search for large datasets, trading memory usage for CPU time.
///
/// The tree alternates between splitting on latitude and longitude, but all distances
/// are great-circle distances as returned by [earth_distance]. Subtrees are pruned
/// by the exact distance to the splitting parallel or meridian (including the antimeridian),
/// so the result is always the same as of a linear scan.
#[derive(Debug, Clone)]
pub struct KDTree {
    pivot: Node,
    left: Option<Box<KDTree>>,
    right: Option<Box<KDTree>>,
}

impl KDTree {
    /// Finds the closest [Node] to the given position.
    /// Equidistant nodes are resolved by picking the lowest id.
    pub fn find_nearest_node(&self, lat: f64, lon: f64) -> Node {
        let mut best = Candidate::new(self.pivot, lat, lon);
        self.find_nearest_node_impl(lat, lon, false, &mut best);
        best.node
    }

    fn find_nearest_node_impl(&self, lat: f64, lon: f64, lon_divides: bool, best: &mut Candidate) {
        let candidate = Candidate::new(self.pivot, lat, lon);
        if candidate.is_better_than(best) {
            *best = candidate;
        }

        // Select which branch to recurse into first
        let first_left = if lon_divides {
            lon < self.pivot.lon
        } else {
            lat < self.pivot.lat
        };
        let (first, second) = if first_left {
            (&self.left, &self.right)
        } else {
            (&self.right, &self.left)
        };

        if let Some(ref branch) = first {
            branch.find_nearest_node_impl(lat, lon, !lon_divides, best);
        }

        if let Some(ref branch) = second {
            // A closer node is possible in the second branch if and only if
            // the splitting axis is closer than the current best candidate.
            // Longitude halves are also bounded by the antimeridian.
            let dist_to_axis = if lon_divides {
                meridian_distance(lat, lon, self.pivot.lon).min(meridian_distance(lat, lon, 180.0))
            } else {
                parallel_distance(lat, self.pivot.lat)
            };

            if dist_to_axis <= best.dist + TIE_EPSILON_M {
                branch.find_nearest_node_impl(lat, lon, !lon_divides, best);
            }
        }
    }

    /// Builds a k-d tree from an iterable of [Nodes](Node).
    pub fn from_iter<I: IntoIterator<Item = Node>>(nodes: I) -> Option<Self> {
        let mut nodes = nodes.into_iter().collect::<Vec<_>>();
        Self::build(nodes.as_mut_slice())
    }

    /// Builds a k-d tree from a mutable slice of [Nodes](Node). Nodes will be reordered
    /// in the slice to facilitate building the tree.
    pub fn build(nodes: &mut [Node]) -> Option<Self> {
        Self::build_impl(nodes, false)
    }

    fn build_impl(nodes: &mut [Node], lon_divides: bool) -> Option<Self> {
        match nodes.len() {
            0 => None,
            1 => Some(Self {
                pivot: nodes[0],
                left: None,
                right: None,
            }),
            _ => {
                let median = nodes.len() / 2;
                if lon_divides {
                    nodes.select_nth_unstable_by(median, |a, b| a.lon.total_cmp(&b.lon));
                } else {
                    nodes.select_nth_unstable_by(median, |a, b| a.lat.total_cmp(&b.lat));
                }
                let pivot = nodes[median];
                let (left, right_and_pivot) = nodes.split_at_mut(median);
                let right = &mut right_and_pivot[1..];
                Some(Self {
                    pivot,
                    left: Self::build_impl(left, !lon_divides).map(Box::new),
                    right: Self::build_impl(right, !lon_divides).map(Box::new),
                })
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Strategy {
    Empty,
    Linear(Vec<Node>),
    Tree(KDTree),
}

/// Answers "which node of the [Graph] is the closest to this position" queries.
///
/// The index is a snapshot of the graph's nodes - it never changes after being built,
/// and must be rebuilt if a different graph is used.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    strategy: Strategy,
    len: usize,
}

impl SpatialIndex {
    /// Builds an index over all nodes of a [Graph].
    pub fn build(g: &Graph) -> Self {
        Self::from_nodes(g.nodes().iter().copied())
    }

    /// Builds an index over arbitrary [Nodes](Node).
    pub fn from_nodes<I: IntoIterator<Item = Node>>(nodes: I) -> Self {
        let mut nodes: Vec<Node> = nodes.into_iter().collect();
        let len = nodes.len();

        let strategy = if nodes.is_empty() {
            Strategy::Empty
        } else if nodes.len() <= LINEAR_SCAN_MAX_NODES {
            Strategy::Linear(nodes)
        } else {
            match KDTree::build(nodes.as_mut_slice()) {
                Some(tree) => Strategy::Tree(tree),
                None => Strategy::Empty,
            }
        };

        log::debug!("built spatial index over {} nodes", len);
        Self { strategy, len }
    }

    /// Returns the number of indexed nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if there are no indexed nodes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Finds the closest [Node] to the given position.
    ///
    /// Nodes whose distances differ by less than a nanometer are considered equidistant,
    /// and the one with the lowest id is returned.
    pub fn nearest_node(&self, lat: f64, lon: f64) -> Result<Node, SpatialError> {
        match &self.strategy {
            Strategy::Empty => Err(SpatialError::EmptyIndex),
            Strategy::Linear(nodes) => linear_nearest(nodes, lat, lon)
                .map(|idx| nodes[idx])
                .ok_or(SpatialError::EmptyIndex),
            Strategy::Tree(tree) => Ok(tree.find_nearest_node(lat, lon)),
        }
    }

    /// Finds the id of the closest node to the given position.
    /// See [SpatialIndex::nearest_node].
    pub fn nearest(&self, lat: f64, lon: f64) -> Result<i64, SpatialError> {
        self.nearest_node(lat, lon).map(|n| n.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn node(id: i64, lat: f64, lon: f64) -> Node {
        Node { id, lat, lon }
    }

    fn grid_nodes() -> Vec<Node> {
        vec![
            node(1, 0.01, 0.01),
            node(2, 0.01, 0.05),
            node(3, 0.03, 0.09),
            node(4, 0.04, 0.03),
            node(5, 0.04, 0.07),
            node(6, 0.07, 0.03),
            node(7, 0.07, 0.01),
            node(8, 0.08, 0.05),
            node(9, 0.08, 0.09),
        ]
    }

    fn random_nodes(rng: &mut SmallRng, count: i64, lat: (f64, f64), lon: (f64, f64)) -> Vec<Node> {
        (1..=count)
            .map(|id| node(id, rng.gen_range(lat.0..=lat.1), rng.gen_range(lon.0..=lon.1)))
            .collect()
    }

    #[test]
    fn kd_tree() {
        let tree = KDTree::build(&mut grid_nodes())
            .expect("k-d tree from non-empty slice must not be empty");

        assert_eq!(tree.find_nearest_node(0.02, 0.02).id, 1);
        assert_eq!(tree.find_nearest_node(0.05, 0.03).id, 4);
        assert_eq!(tree.find_nearest_node(0.05, 0.08).id, 5);
        assert_eq!(tree.find_nearest_node(0.09, 0.06).id, 8);
    }

    #[test]
    fn kd_tree_empty() {
        assert!(KDTree::build(&mut []).is_none());
        assert!(KDTree::from_iter(Vec::<Node>::new()).is_none());
    }

    #[test]
    fn exact_position_returns_that_node() {
        let nodes = grid_nodes();
        let tree = KDTree::from_iter(nodes.clone()).unwrap();
        let index = SpatialIndex::from_nodes(nodes.clone());

        for n in &nodes {
            assert_eq!(tree.find_nearest_node(n.lat, n.lon).id, n.id);
            assert_eq!(index.nearest(n.lat, n.lon), Ok(n.id));
        }
    }

    #[test]
    fn ties_resolve_to_lowest_id() {
        let nodes = vec![node(5, 0.0, 0.001), node(3, 0.0, -0.001), node(9, 0.5, 0.5)];
        assert_eq!(linear_nearest(&nodes, 0.0, 0.0), Some(1));

        let tree = KDTree::from_iter(nodes).unwrap();
        assert_eq!(tree.find_nearest_node(0.0, 0.0).id, 3);

        // Nodes sharing a position
        let tree = KDTree::from_iter([node(9, 1.0, 1.0), node(4, 1.0, 1.0), node(6, 1.0, 1.0)])
            .unwrap();
        assert_eq!(tree.find_nearest_node(1.0, 1.0).id, 4);
        assert_eq!(tree.find_nearest_node(1.1, 0.9).id, 4);
    }

    #[test]
    fn tree_matches_linear_scan() {
        let mut rng = SmallRng::seed_from_u64(0x5eed);
        let nodes = random_nodes(&mut rng, 500, (40.6, 40.9), (-74.1, -73.9));
        let index = SpatialIndex::from_nodes(nodes.clone());
        assert!(matches!(index.strategy, Strategy::Tree(_)));

        for _ in 0..500 {
            let lat = rng.gen_range(40.5..=41.0);
            let lon = rng.gen_range(-74.2..=-73.8);
            let expected = nodes[linear_nearest(&nodes, lat, lon).unwrap()].id;
            assert_eq!(index.nearest(lat, lon), Ok(expected));
        }
    }

    #[test]
    fn tree_matches_linear_scan_globally() {
        let mut rng = SmallRng::seed_from_u64(42);
        let nodes = random_nodes(&mut rng, 300, (-89.0, 89.0), (-180.0, 180.0));
        let index = SpatialIndex::from_nodes(nodes.clone());

        for _ in 0..300 {
            let lat = rng.gen_range(-90.0..=90.0);
            let lon = rng.gen_range(-180.0..=180.0);
            let expected = nodes[linear_nearest(&nodes, lat, lon).unwrap()].id;
            assert_eq!(index.nearest(lat, lon), Ok(expected));
        }
    }

    #[test]
    fn across_antimeridian() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut nodes = random_nodes(&mut rng, 100, (-10.0, 10.0), (-170.0, 170.0));
        nodes.push(node(1000, 0.0, 179.99));
        nodes.push(node(1001, 0.0, -179.0));
        let index = SpatialIndex::from_nodes(nodes);

        assert_eq!(index.nearest(0.0, -179.995), Ok(1000));
        assert_eq!(index.nearest(0.0, -179.2), Ok(1001));
    }

    #[test]
    fn small_index_uses_linear_scan() {
        let index = SpatialIndex::from_nodes(grid_nodes());
        assert!(matches!(index.strategy, Strategy::Linear(_)));
        assert_eq!(index.len(), 9);
        assert_eq!(index.nearest(0.05, 0.08), Ok(5));
        assert_eq!(index.nearest_node(0.09, 0.06).map(|n| n.id), Ok(8));
    }

    #[test]
    fn empty_index() {
        let index = SpatialIndex::from_nodes(Vec::new());
        assert!(index.is_empty());
        assert_eq!(index.nearest(0.0, 0.0), Err(SpatialError::EmptyIndex));

        let index = SpatialIndex::build(&Graph::default());
        assert_eq!(index.nearest_node(10.0, 10.0), Err(SpatialError::EmptyIndex));
    }
}
