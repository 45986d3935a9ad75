// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{HashMap, HashSet};

use super::{model, Options};
use crate::{earth_distance, Edge, Graph, GraphError, Node};

/// Road network imported from map data: nodes and undirected edges,
/// ready to be turned into a [Graph].
///
/// Every edge represents exactly one physical road segment - the two directions of travel
/// are never listed separately.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Snapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Snapshot {
    /// Builds a [Graph] out of the snapshot, see [Graph::build].
    pub fn into_graph(self) -> Result<Graph, GraphError> {
        Graph::build(self.nodes, self.edges)
    }
}

/// Helper object used for storing state related to converting
/// [OSM features](super::model::Feature) into a [Snapshot].
///
/// Features from multiple extracts may be added to a single builder;
/// nodes and road segments present in more than one of them are only used once.
/// A way clipped by an extract boundary is completed by the segments
/// of its copies in the other extracts.
pub struct SnapshotBuilder<'a> {
    pub(super) options: &'a Options<'a>,
    nodes: HashMap<i64, Node>,
    used_nodes: HashSet<i64>,
    seen_ways: HashSet<i64>,
    seen_segments: HashSet<(i64, i64, i64)>,
    edges: Vec<Edge>,
    ignore_bbox: bool,
}

impl<'a> SnapshotBuilder<'a> {
    /// Create a new, empty snapshot builder.
    pub fn new(options: &'a Options<'a>) -> Self {
        let ignore_bbox =
            options.bbox.iter().all(|&x| x == 0.0) || options.bbox.iter().any(|x| !x.is_finite());

        if ignore_bbox && options.bbox.iter().any(|x| !x.is_finite()) {
            log::warn!("ignoring non-finite bounding box {:?}", options.bbox);
        }

        Self {
            options,
            nodes: HashMap::default(),
            used_nodes: HashSet::default(),
            seen_ways: HashSet::default(),
            seen_segments: HashSet::default(),
            edges: Vec::default(),
            ignore_bbox,
        }
    }

    /// Add all features from the provided iterator, stopping at the first error.
    pub fn add_features<I, E>(&mut self, features: I) -> Result<(), E>
    where
        I: IntoIterator<Item = Result<model::Feature, E>>,
    {
        for f in features {
            self.add_feature(f?);
        }
        Ok(())
    }

    /// Returns the snapshot of all added features. Nodes which are not used by any
    /// routable way are discarded. Nodes are ordered by id, edges by the order of ways.
    pub fn finish(self) -> Snapshot {
        let mut nodes: Vec<Node> = self
            .nodes
            .into_values()
            .filter(|n| self.used_nodes.contains(&n.id))
            .collect();
        nodes.sort_by_key(|n| n.id);

        log::info!(
            "imported {} nodes and {} edges from {} ways",
            nodes.len(),
            self.edges.len(),
            self.seen_ways.len(),
        );

        Snapshot {
            nodes,
            edges: self.edges,
        }
    }

    fn add_feature(&mut self, f: model::Feature) {
        match f {
            model::Feature::Node(n) => self.add_node(n),
            model::Feature::Way(w) => self.add_way(w),
        }
    }

    fn add_node(&mut self, n: Node) {
        if !n.coordinate().is_valid() {
            log::warn!("skipping node {} with invalid position ({}, {})", n.id, n.lat, n.lon);
        } else if self.is_in_bbox(n.lat, n.lon) {
            self.nodes.entry(n.id).or_insert(n);
        }
    }

    fn is_in_bbox(&self, lat: f64, lon: f64) -> bool {
        if self.ignore_bbox {
            return true;
        }
        let [min_lon, min_lat, max_lon, max_lat] = self.options.bbox;
        lat >= min_lat && lat <= max_lat && lon >= min_lon && lon <= max_lon
    }

    fn add_way(&mut self, w: model::Way) {
        if !self.options.profile.is_routable(&w.tags) {
            return;
        }

        if w.nodes.len() < 2 {
            log::warn!("way {} has less than 2 nodes", w.id);
            return;
        }

        if !self.seen_ways.insert(w.id) {
            log::debug!("way {} was already seen, adding its missing segments", w.id);
        }

        self.create_edges(w.id, &w.nodes);
    }

    /// Creates one edge for every pair of consecutive, known nodes of a way,
    /// unless the same segment of the same way was already imported.
    /// References to unknown nodes (e.g. outside of the bounding box) break the way.
    fn create_edges(&mut self, way_id: i64, nodes: &[i64]) {
        for pair in nodes.windows(2) {
            let (left, right) = match (self.nodes.get(&pair[0]), self.nodes.get(&pair[1])) {
                (Some(&left), Some(&right)) => (left, right),
                _ => {
                    log::trace!(
                        "way {way_id}: skipping segment {}-{} with an unknown node",
                        pair[0],
                        pair[1],
                    );
                    continue;
                }
            };

            if left.id == right.id {
                continue;
            }

            let segment = (way_id, left.id.min(right.id), left.id.max(right.id));
            if !self.seen_segments.insert(segment) {
                continue;
            }

            self.edges.push(Edge {
                from: left.id,
                to: right.id,
                length: earth_distance(left.lat, left.lon, right.lat, right.lon),
            });
            self.used_nodes.insert(left.id);
            self.used_nodes.insert(right.id);
        }
    }
}
