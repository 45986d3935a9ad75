// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use crate::{Coordinate, Edge, Node};

/// Reasons why a set of nodes and edges can't be turned into a [Graph].
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum Malformation {
    #[error("duplicate node {0}")]
    DuplicateNode(i64),

    #[error("node {id} has an invalid position ({lat}, {lon})")]
    InvalidCoordinate { id: i64, lat: f64, lon: f64 },

    #[error("edge {from}-{to} references unknown node {missing}")]
    UnknownEndpoint { from: i64, to: i64, missing: i64 },

    #[error("edge {from}-{to} has an invalid length {length}")]
    InvalidLength { from: i64, to: i64, length: f64 },

    #[error("total length of all edges is not representable")]
    TotalLengthOverflow,

    #[error("too many nodes: {0}")]
    TooManyNodes(usize),

    #[error("too many adjacency entries: {0}")]
    TooManyEdges(usize),
}

/// Error conditions of [Graph] construction and lookups.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// The input snapshot violates graph invariants; no graph was built.
    #[error("malformed graph: {0}")]
    MalformedGraph(#[from] Malformation),

    /// The requested node does not exist in the graph.
    #[error("unknown node: {0}")]
    UnknownNode(i64),
}

/// Represents a road network as a frozen set of [Nodes](Node) and undirected,
/// weighted [Edges](Edge) between them.
///
/// Nodes are stored in an arena sorted by their id, so that the dense index of a node
/// preserves the id order. Adjacency is kept in the compressed sparse row layout:
/// the neighbors of the node at index `i` are `targets[offsets[i]..offsets[i+1]]`,
/// with the corresponding edge lengths in `lengths`.
///
/// There is no mutation API - a Graph can be shared between any number of threads
/// once built.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<i64, u32>,
    offsets: Vec<u32>,
    targets: Vec<u32>,
    lengths: Vec<f64>,
    edge_count: usize,
}

impl Graph {
    /// Builds a graph from a set of nodes and undirected edges.
    ///
    /// Every edge must represent a distinct physical road segment: it is added
    /// to the adjacency of both of its endpoints (a self-loop only once), and parallel
    /// edges are all retained. Importers which produce directed pairs must merge them
    /// into one [Edge] beforehand.
    ///
    /// Fails with [GraphError::MalformedGraph] if a node id is duplicated, a node position
    /// is outside of the valid range, or an edge references an unknown node or has
    /// a negative (or non-finite) length.
    ///
    /// The sum of all edge lengths must be finite, so that no path length can overflow.
    /// Up to `u32::MAX` nodes and `u32::MAX` adjacency entries (two per edge,
    /// one per self-loop) are supported.
    pub fn build<N, E>(nodes: N, edges: E) -> Result<Self, GraphError>
    where
        N: IntoIterator<Item = Node>,
        E: IntoIterator<Item = Edge>,
    {
        let mut nodes: Vec<Node> = nodes.into_iter().collect();
        if let Some(n) = nodes.iter().find(|n| !n.coordinate().is_valid()) {
            return Err(Malformation::InvalidCoordinate {
                id: n.id,
                lat: n.lat,
                lon: n.lon,
            }
            .into());
        }

        check_capacity(nodes.len(), 0)?;
        nodes.sort_by_key(|n| n.id);
        if let Some(pair) = nodes.windows(2).find(|pair| pair[0].id == pair[1].id) {
            return Err(Malformation::DuplicateNode(pair[0].id).into());
        }

        // Indices fit in u32, as checked by check_capacity
        let index: HashMap<i64, u32> = nodes
            .iter()
            .enumerate()
            .map(|(idx, n)| (n.id, idx as u32))
            .collect();

        // Resolve and validate all edges, counting the degree of every node
        let mut degrees = vec![0u32; nodes.len()];
        let mut resolved = Vec::default();
        let mut adjacency_entries: usize = 0;
        let mut total_length: f64 = 0.0;
        for e in edges {
            let from = Self::resolve_endpoint(&index, &e, e.from)?;
            let to = Self::resolve_endpoint(&index, &e, e.to)?;

            if !e.length.is_finite() || e.length < 0.0 {
                return Err(Malformation::InvalidLength {
                    from: e.from,
                    to: e.to,
                    length: e.length,
                }
                .into());
            }

            total_length += e.length;
            if !total_length.is_finite() {
                return Err(Malformation::TotalLengthOverflow.into());
            }

            adjacency_entries += if from != to { 2 } else { 1 };
            check_capacity(nodes.len(), adjacency_entries)?;

            degrees[from as usize] += 1;
            if from != to {
                degrees[to as usize] += 1;
            }
            resolved.push((from, to, e.length));
        }

        // Lay out the adjacency lists
        let mut offsets = Vec::with_capacity(nodes.len() + 1);
        offsets.push(0u32);
        for d in &degrees {
            offsets.push(offsets[offsets.len() - 1] + d);
        }

        let total = offsets[nodes.len()] as usize;
        let mut targets = vec![0u32; total];
        let mut lengths = vec![0.0f64; total];
        let mut cursor: Vec<u32> = offsets[..nodes.len()].to_vec();

        for &(from, to, length) in &resolved {
            let slot = cursor[from as usize] as usize;
            targets[slot] = to;
            lengths[slot] = length;
            cursor[from as usize] += 1;

            if from != to {
                let slot = cursor[to as usize] as usize;
                targets[slot] = from;
                lengths[slot] = length;
                cursor[to as usize] += 1;
            }
        }

        log::debug!(
            "built road graph with {} nodes and {} edges",
            nodes.len(),
            resolved.len(),
        );

        Ok(Self {
            nodes,
            index,
            offsets,
            targets,
            lengths,
            edge_count: resolved.len(),
        })
    }

    fn resolve_endpoint(index: &HashMap<i64, u32>, e: &Edge, id: i64) -> Result<u32, GraphError> {
        index.get(&id).copied().ok_or(GraphError::MalformedGraph(
            Malformation::UnknownEndpoint {
                from: e.from,
                to: e.to,
                missing: id,
            },
        ))
    }

    /// Returns the number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the number of (undirected) edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Returns an iterator over all [Nodes](Node) in the graph, in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Retrieves a [Node] with the provided id.
    pub fn get_node(&self, id: i64) -> Option<Node> {
        self.index_of(id).map(|idx| self.nodes[idx])
    }

    /// Retrieves the position of a node with the provided id.
    pub fn node_coordinate(&self, id: i64) -> Result<Coordinate, GraphError> {
        self.get_node(id)
            .map(|n| n.coordinate())
            .ok_or(GraphError::UnknownNode(id))
    }

    /// Returns an iterator over `(neighbor_id, edge_length)` pairs of all edges incident
    /// to the node with the provided id. Parallel edges are reported separately.
    pub fn neighbors(&self, id: i64) -> Result<Neighbors<'_>, GraphError> {
        let idx = self.index_of(id).ok_or(GraphError::UnknownNode(id))?;
        Ok(Neighbors {
            g: self,
            inner: self.neighbors_at(idx),
        })
    }

    /// Finds the closest [Node] to the given position. Equidistant nodes
    /// are resolved by the lowest id.
    ///
    /// This function requires computing the distance to every [Node] in the graph,
    /// and is not suitable for large graphs - use [SpatialIndex](crate::SpatialIndex) instead.
    pub fn find_nearest_node(&self, lat: f64, lon: f64) -> Option<Node> {
        crate::kd::linear_nearest(&self.nodes, lat, lon).map(|idx| self.nodes[idx])
    }

    #[inline]
    pub(crate) fn index_of(&self, id: i64) -> Option<usize> {
        self.index.get(&id).map(|&idx| idx as usize)
    }

    #[inline]
    pub(crate) fn node_at(&self, idx: usize) -> Node {
        self.nodes[idx]
    }

    #[inline]
    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns `(neighbor_index, edge_length)` pairs of the node at a dense index.
    #[inline]
    pub(crate) fn neighbors_at(
        &self,
        idx: usize,
    ) -> std::iter::Zip<std::slice::Iter<'_, u32>, std::slice::Iter<'_, f64>> {
        let start = self.offsets[idx] as usize;
        let end = self.offsets[idx + 1] as usize;
        self.targets[start..end].iter().zip(&self.lengths[start..end])
    }

    /// Checks whether the two nodes are directly connected by at least one edge,
    /// returning the length of the shortest such edge.
    pub fn edge_between(&self, a: i64, b: i64) -> Option<f64> {
        let a_idx = self.index_of(a)?;
        let b_idx = self.index_of(b)? as u32;
        self.neighbors_at(a_idx)
            .filter(|&(&to, _)| to == b_idx)
            .map(|(_, &length)| length)
            .min_by(|x, y| x.total_cmp(y))
    }
}

/// Dense node indices and adjacency offsets are stored as `u32`,
/// with `u32::MAX` reserved as a "no node" marker.
fn check_capacity(nodes: usize, adjacency_entries: usize) -> Result<(), Malformation> {
    if u32::try_from(nodes).is_err() {
        Err(Malformation::TooManyNodes(nodes))
    } else if u32::try_from(adjacency_entries).is_err() {
        Err(Malformation::TooManyEdges(adjacency_entries))
    } else {
        Ok(())
    }
}

/// Iterator over the neighbors of a node, returned by [Graph::neighbors].
#[derive(Debug, Clone)]
pub struct Neighbors<'a> {
    g: &'a Graph,
    inner: std::iter::Zip<std::slice::Iter<'a, u32>, std::slice::Iter<'a, f64>>,
}

impl<'a> Iterator for Neighbors<'a> {
    type Item = (i64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(&to, &length)| (self.g.nodes[to as usize].id, length))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> ExactSizeIterator for Neighbors<'a> {}
