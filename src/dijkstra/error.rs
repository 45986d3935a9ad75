// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::time::Duration;

/// Recommended number of allowed node expansions in [shortest_path](crate::shortest_path)
/// before [SearchError::Timeout] is returned.
pub const DEFAULT_STEP_LIMIT: usize = 1_000_000;

/// Bounds on the amount of work a single [shortest_path](crate::shortest_path) call may do.
///
/// Concluding that no route exists requires expanding every node reachable from the start,
/// which can be very time-consuming on large datasets. Limits protect against
/// resource exhaustion - exceeding any of them aborts the search with [SearchError::Timeout].
///
/// The default is unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchLimits {
    /// Maximum number of nodes to settle.
    pub step_limit: Option<usize>,

    /// Maximum wall-clock duration of the search.
    pub deadline: Option<Duration>,
}

impl SearchLimits {
    pub const UNLIMITED: Self = Self {
        step_limit: None,
        deadline: None,
    };

    /// Limits the search to [DEFAULT_STEP_LIMIT] node expansions.
    pub const fn with_default_step_limit() -> Self {
        Self {
            step_limit: Some(DEFAULT_STEP_LIMIT),
            deadline: None,
        }
    }
}

/// Error conditions which may occur during [shortest_path](crate::shortest_path).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// The start or end nodes don't exist in a graph.
    #[error("unknown node: {0}")]
    UnknownNode(i64),

    /// The end node is not reachable from the start node.
    /// This is an expected outcome for disconnected road networks.
    #[error("no path from {from} to {to}")]
    NoPath { from: i64, to: i64 },

    /// Route search has exceeded its [SearchLimits] before reaching a conclusion.
    #[error("search aborted after {steps} steps")]
    Timeout { steps: usize },
}
