// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Shortest driving routes over [OpenStreetMap](https://www.openstreetmap.org/) data.
//!
//! OSM extracts are converted into an undirected road [Graph] weighted by the physical
//! length of every road segment (in meters). Arbitrary positions are snapped to the
//! nearest graph node with a [SpatialIndex], and [Dijkstra's algorithm](shortest_path)
//! finds the shortest sequence of nodes between them. [RouteService] ties it all together.
//!
//! # Example
//!
//! ```no_run
//! let osm_options = drivepath::osm::Options {
//!     profile: &drivepath::osm::CAR_PROFILE,
//!     file_format: drivepath::osm::FileFormat::Unknown,
//!     bbox: [0.0; 4],
//! };
//! let snapshot = drivepath::osm::read_snapshot_from_file(&osm_options, "path/to/monaco.osm")
//!     .expect("failed to load monaco.osm");
//! let ctx = drivepath::RouteContext::from_snapshot(snapshot).expect("malformed graph");
//!
//! let route = drivepath::RouteService::new(&ctx)
//!     .compute_route(
//!         drivepath::Coordinate::new(43.7384, 7.4246),
//!         drivepath::Coordinate::new(43.7478, 7.4323),
//!     )
//!     .expect("failed to find route");
//!
//! println!("Route: {:?}", route);
//! ```

mod dijkstra;
mod distance;
mod graph;
mod kd;
pub mod osm;
mod route;

pub use dijkstra::{shortest_path, Path, PathFinder, SearchError, SearchLimits, DEFAULT_STEP_LIMIT};
pub use distance::earth_distance;
pub use graph::{GraphError, Graph, Malformation, Neighbors};
pub use kd::{KDTree, SpatialError, SpatialIndex, LINEAR_SCAN_MAX_NODES};
pub use route::{RouteContext, RouteError, RouteResult, RouteService};

/// Represents an addressable point (intersection or endpoint) of the road [Graph].
///
/// Identifiers are stable across graph builds, as they come straight from the map data
/// (OSM node ids). Any `i64` is a valid identifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
}

impl Node {
    /// Returns the position of the node.
    #[inline]
    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            lat: self.lat,
            lon: self.lon,
        }
    }
}

/// Represents an undirected road segment between two [Nodes](Node).
///
/// `length` is the physical length of the segment in meters and must be finite
/// and not negative. The same pair of nodes may be connected by multiple edges
/// (parallel roads or ramps); all of them are retained by the [Graph].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub from: i64,
    pub to: i64,
    pub length: f64,
}

/// A position on Earth, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    #[inline]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Checks that the latitude lies within [-90, 90] and the longitude within [-180, 180].
    /// NaNs and infinities are never valid.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.lat, self.lon)
    }
}
