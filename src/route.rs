// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::osm::Snapshot;
use crate::{
    Coordinate, Graph, GraphError, PathFinder, SearchError, SearchLimits, SpatialError,
    SpatialIndex,
};

/// Error conditions which may occur during [RouteService::compute_route].
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum RouteError {
    /// The provided position is outside of the valid latitude/longitude ranges.
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(Coordinate),

    /// No route exists between the two positions - they are in disconnected
    /// parts of the road network. This is an expected outcome, not a failure.
    #[error("no route available")]
    NoPath,

    /// A node returned by the spatial index is missing from the graph.
    /// This indicates a [RouteContext] invariant violation.
    #[error("unknown node: {0}")]
    UnknownNode(i64),

    /// The road network has no nodes at all.
    #[error("road network is empty")]
    EmptyIndex,

    /// The search was aborted by its [SearchLimits] - whether a route
    /// exists could not be determined.
    #[error("route search timed out")]
    Timeout,
}

impl From<SearchError> for RouteError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::UnknownNode(id) => Self::UnknownNode(id),
            SearchError::NoPath { .. } => Self::NoPath,
            SearchError::Timeout { .. } => Self::Timeout,
        }
    }
}

impl From<SpatialError> for RouteError {
    fn from(e: SpatialError) -> Self {
        match e {
            SpatialError::EmptyIndex => Self::EmptyIndex,
        }
    }
}

/// Outcome of [RouteService::compute_route]: a sequence of node positions
/// from the start to the destination.
pub type RouteResult = Result<Vec<Coordinate>, RouteError>;

/// Immutable routing state: a road [Graph] and the [SpatialIndex] over its nodes.
///
/// Built once (usually at startup) and then shared by reference between any number of
/// [RouteServices](RouteService) and threads.
#[derive(Debug, Clone)]
pub struct RouteContext {
    graph: Graph,
    index: SpatialIndex,
}

impl RouteContext {
    /// Creates a context from an already built [Graph], indexing its nodes.
    pub fn new(graph: Graph) -> Self {
        let index = SpatialIndex::build(&graph);
        log::info!(
            "routing over {} nodes and {} edges",
            graph.len(),
            graph.edge_count()
        );
        Self { graph, index }
    }

    /// Builds the [Graph] from an imported [Snapshot] and indexes it.
    /// Fails with [GraphError::MalformedGraph] - no context is created in that case.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, GraphError> {
        Ok(Self::new(snapshot.into_graph()?))
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }
}

/// Computes routes between arbitrary positions over a [RouteContext].
///
/// The service holds no mutable state, so a single instance may be used
/// from many threads at once.
#[derive(Debug, Clone, Copy)]
pub struct RouteService<'c> {
    ctx: &'c RouteContext,
    limits: SearchLimits,
}

impl<'c> RouteService<'c> {
    pub fn new(ctx: &'c RouteContext) -> Self {
        Self {
            ctx,
            limits: SearchLimits::UNLIMITED,
        }
    }

    /// Bounds every route search, see [SearchLimits].
    pub fn with_limits(self, limits: SearchLimits) -> Self {
        Self { limits, ..self }
    }

    /// Finds the shortest route between the nodes closest to `start` and `destination`.
    ///
    /// The returned sequence is never empty: it begins at the node closest to `start`
    /// and ends at the node closest to `destination` (these may be the same node).
    pub fn compute_route(&self, start: Coordinate, destination: Coordinate) -> RouteResult {
        let result = self.compute_route_impl(start, destination);

        match &result {
            Ok(route) => log::debug!(
                "route {start} -> {destination}: {} nodes",
                route.len()
            ),
            Err(RouteError::NoPath) => log::debug!("route {start} -> {destination}: no path"),
            Err(RouteError::InvalidCoordinate(c)) => {
                log::debug!("route {start} -> {destination}: invalid coordinate {c}")
            }
            Err(RouteError::UnknownNode(id)) => {
                log::error!("route {start} -> {destination}: node {id} is not in the graph")
            }
            Err(e) => log::warn!("route {start} -> {destination}: {e}"),
        }

        result
    }

    fn compute_route_impl(&self, start: Coordinate, destination: Coordinate) -> RouteResult {
        for c in [start, destination] {
            if !c.is_valid() {
                return Err(RouteError::InvalidCoordinate(c));
            }
        }

        let start_node = self.ctx.index.nearest(start.lat, start.lon)?;
        let end_node = self.ctx.index.nearest(destination.lat, destination.lon)?;

        let path = PathFinder::new(&self.ctx.graph)
            .with_limits(self.limits)
            .shortest_path(start_node, end_node)?;

        path.nodes
            .iter()
            .map(|&id| {
                self.ctx
                    .graph
                    .node_coordinate(id)
                    .map_err(|_| RouteError::UnknownNode(id))
            })
            .collect()
    }
}
