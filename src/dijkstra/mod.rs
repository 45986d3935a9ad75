// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

mod error;
mod search;

pub use error::{SearchError, SearchLimits, DEFAULT_STEP_LIMIT};
pub use search::{shortest_path, Path, PathFinder};
