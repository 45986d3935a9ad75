// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

/// Describes which OSM ways make up the road network.
///
/// The resulting network is undirected and weighted only by physical length,
/// so way direction (`oneway` tags) and road class preferences are not considered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Profile<'a> {
    /// Human readable name of the routing profile,
    /// customary the most specific [access tag](https://wiki.openstreetmap.org/wiki/Key:access).
    pub name: &'a str,

    /// Values of the [highway](https://wiki.openstreetmap.org/wiki/Key:highway) tag
    /// which make a way usable for routing.
    pub highways: &'a [&'a str],

    /// Values of the [service](https://wiki.openstreetmap.org/wiki/Key:service) tag
    /// which make an otherwise matching way unusable for routing.
    pub excluded_services: &'a [&'a str],

    /// Array of OSM [access tags](https://wiki.openstreetmap.org/wiki/Key:access#Land-based_transportation)
    /// (in order from least to most specific) to consider when checking for road prohibitions.
    pub access: &'a [&'a str],

    /// Force no routing over [motorroad=yes](https://wiki.openstreetmap.org/wiki/Key:motorroad) ways.
    pub disallow_motorroad: bool,
}

impl<'a> Profile<'a> {
    /// Checks if a way with given tags should be part of the road network:
    /// it needs a matching `highway` tag, can't be an area or an excluded service road,
    /// and must be allowed by the access tags (as determined by [Profile::is_allowed]).
    pub fn is_routable(&self, tags: &HashMap<String, String>) -> bool {
        let highway = match tags.get("highway") {
            Some(h) => h.as_str(),
            None => return false,
        };

        if !self.highways.contains(&highway) {
            return false;
        }

        if tags.get("area").map(|v| v.as_str()) == Some("yes") {
            return false;
        }

        if let Some(service) = tags.get("service") {
            if self.excluded_services.contains(&service.as_str()) {
                return false;
            }
        }

        self.is_allowed(tags)
    }

    /// Checks if the way is accessible, by considering motor roads ([Profile::disallow_motorroad])
    /// and access tags ([Profile::access]).
    pub fn is_allowed(&self, tags: &HashMap<String, String>) -> bool {
        // Check against the motorroad tag
        if self.disallow_motorroad && tags.get("motorroad").map(|v| v.as_str()) == Some("yes") {
            return false;
        }

        // Check against the access tags
        match self
            .access
            .iter()
            .rev()
            .find_map(|&mode| tags.get(mode).map(|v| v.as_str()))
        {
            Some("no") | Some("private") => false,
            _ => true,
        }
    }
}

/// Routing [Profile] for cars, selecting the drivable public road network.
pub const CAR_PROFILE: Profile = Profile {
    name: "motorcar",
    highways: &[
        "motorway",
        "motorway_link",
        "trunk",
        "trunk_link",
        "primary",
        "primary_link",
        "secondary",
        "secondary_link",
        "tertiary",
        "tertiary_link",
        "unclassified",
        "residential",
        "living_street",
        "road",
        "service",
    ],
    excluded_services: &[
        "alley",
        "driveway",
        "emergency_access",
        "parking",
        "parking_aisle",
        "private",
    ],
    access: &["access", "vehicle", "motor_vehicle", "motorcar"],
    disallow_motorroad: false,
};
