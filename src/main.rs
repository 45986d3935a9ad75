// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use drivepath::{Coordinate, RouteContext, RouteError, RouteService, SearchLimits};

#[derive(Debug, thiserror::Error)]
#[error("{0}: {1}")]
struct GraphLoadError(PathBuf, #[source] drivepath::osm::Error);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// {"route": [[lat, lon], ...]}
    Route,

    /// GeoJSON FeatureCollection with a single LineString
    Geojson,
}

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The path to the OSM file (.osm, .osm.gz or .osm.bz2)
    osm_file: PathBuf,

    /// Latitude of the start point
    #[arg(allow_negative_numbers = true)]
    start_lat: f64,

    /// Longitude of the start point
    #[arg(allow_negative_numbers = true)]
    start_lon: f64,

    /// Latitude of the end point
    #[arg(allow_negative_numbers = true)]
    end_lat: f64,

    /// Longitude of the end point
    #[arg(allow_negative_numbers = true)]
    end_lon: f64,

    /// Additional OSM files to merge into the road network
    #[arg(long, value_name = "OSM_FILE")]
    merge: Vec<PathBuf>,

    /// Format of the printed route
    #[arg(long, value_enum, default_value_t = OutputFormat::Route)]
    format: OutputFormat,

    /// Maximum number of nodes to settle during the search
    #[arg(long)]
    step_limit: Option<usize>,

    /// Maximum time to spend on the search, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

pub fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    colog::default_builder().filter(None, level).init();

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode, Box<dyn Error>> {
    let ctx = load_context(&cli.osm_file, &cli.merge)?;

    let limits = SearchLimits {
        step_limit: cli.step_limit,
        deadline: cli.timeout_ms.map(Duration::from_millis),
    };
    let service = RouteService::new(&ctx).with_limits(limits);

    let route = match service.compute_route(
        Coordinate::new(cli.start_lat, cli.start_lon),
        Coordinate::new(cli.end_lat, cli.end_lon),
    ) {
        Ok(route) => route,
        Err(RouteError::NoPath) => {
            println!("{}", no_path_json());
            return Ok(ExitCode::from(2));
        }
        Err(e) => return Err(e.into()),
    };

    let output = match cli.format {
        OutputFormat::Route => route_json(&route),
        OutputFormat::Geojson => geojson(&route),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(ExitCode::SUCCESS)
}

fn no_path_json() -> serde_json::Value {
    serde_json::json!({ "error": "No available path" })
}

fn load_context(path: &Path, merge: &[PathBuf]) -> Result<RouteContext, Box<dyn Error>> {
    let options = drivepath::osm::Options {
        profile: &drivepath::osm::CAR_PROFILE,
        file_format: drivepath::osm::FileFormat::Unknown,
        bbox: [0.0; 4],
    };

    let mut b = drivepath::osm::SnapshotBuilder::new(&options);
    for p in std::iter::once(path).chain(merge.iter().map(PathBuf::as_path)) {
        b.add_file(p).map_err(|e| GraphLoadError(p.to_path_buf(), e))?;
    }

    Ok(RouteContext::from_snapshot(b.finish())?)
}

/// `{"route": [[lat, lon], ...]}`
fn route_json(route: &[Coordinate]) -> serde_json::Value {
    let points: Vec<[f64; 2]> = route.iter().map(|c| [c.lat, c.lon]).collect();
    serde_json::json!({ "route": points })
}

/// GeoJSON FeatureCollection with a single LineString; GeoJSON positions are `[lon, lat]`.
fn geojson(route: &[Coordinate]) -> serde_json::Value {
    let coordinates: Vec<[f64; 2]> = route.iter().map(|c| [c.lon, c.lat]).collect();
    serde_json::json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {},
            "geometry": {
                "type": "LineString",
                "coordinates": coordinates,
            },
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUTE: [Coordinate; 2] = [Coordinate::new(40.7, -74.0), Coordinate::new(40.701, -73.999)];

    #[test]
    fn route_output() {
        assert_eq!(
            route_json(&ROUTE),
            serde_json::json!({ "route": [[40.7, -74.0], [40.701, -73.999]] }),
        );
    }

    #[test]
    fn geojson_output() {
        let v = geojson(&ROUTE);
        assert_eq!(v["type"], "FeatureCollection");
        assert_eq!(v["features"][0]["geometry"]["type"], "LineString");
        assert_eq!(
            v["features"][0]["geometry"]["coordinates"],
            serde_json::json!([[-74.0, 40.7], [-73.999, 40.701]]),
        );
    }

    #[test]
    fn no_path_output() {
        assert_eq!(no_path_json().to_string(), r#"{"error":"No available path"}"#);
    }
}
