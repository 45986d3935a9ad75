// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

/// Mean radius of Earth, in meters.
/// Source: https://en.wikipedia.org/wiki/Earth_radius#Arithmetic_mean_radius
const EARTH_RADIUS: f64 = 6_371_008.8;

/// Mean diameter of Earth, in meters.
/// Source: https://en.wikipedia.org/wiki/Earth_radius#Arithmetic_mean_radius
const EARTH_DIAMETER: f64 = EARTH_RADIUS + EARTH_RADIUS;

/// Calculates the great-circle distance between two lat-lon positions
/// on Earth using the [haversine formula](https://en.wikipedia.org/wiki/Haversine_formula).
/// Returns the result in meters.
pub fn earth_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1 = lat1.to_radians();
    let lon1 = lon1.to_radians();
    let lat2 = lat2.to_radians();
    let lon2 = lon2.to_radians();

    let sin_dlat_half = ((lat2 - lat1) * 0.5).sin();
    let sin_dlon_half = ((lon2 - lon1) * 0.5).sin();

    let h = sin_dlat_half * sin_dlat_half + lat1.cos() * lat2.cos() * sin_dlon_half * sin_dlon_half;

    // Rounding might push h slightly above 1 for antipodal points
    EARTH_DIAMETER * h.sqrt().min(1.0).asin()
}

/// Shortest distance (in meters) from a position to any point on the parallel `lat0`.
pub(crate) fn parallel_distance(lat: f64, lat0: f64) -> f64 {
    (lat - lat0).abs().to_radians() * EARTH_RADIUS
}

/// Lower bound of the distance (in meters) from a position to any point on the meridian `lon0`.
///
/// For meridians less than 90° away this is the exact cross-track distance,
/// otherwise the bound degrades to zero.
pub(crate) fn meridian_distance(lat: f64, lon: f64, lon0: f64) -> f64 {
    let dlon = wrap_longitude(lon - lon0);
    if dlon.abs() >= 90.0 {
        return 0.0;
    }

    let sin_xt = dlon.to_radians().sin().abs() * lat.to_radians().cos();
    sin_xt.min(1.0).asin() * EARTH_RADIUS
}

/// Wraps a longitude difference into [-180, 180].
fn wrap_longitude(dlon: f64) -> f64 {
    let wrapped = (dlon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && dlon > 0.0 {
        180.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! assert_almost_eq {
        ($a:expr, $b:expr, $tolerance:expr) => {
            assert!(
                (($a - $b).abs() < $tolerance),
                "assertion failed: {} ≈ {}",
                $a,
                $b
            )
        };
    }

    #[test]
    fn test_earth_distance() {
        // Centrum - Stadion Narodowy in Warsaw
        assert_almost_eq!(
            earth_distance(52.23024, 21.01062, 52.23852, 21.0446),
            2490.0,
            10.0
        );

        // One degree of latitude
        assert_almost_eq!(earth_distance(0.0, 0.0, 1.0, 0.0), 111_195.0, 1.0);

        assert_eq!(earth_distance(40.7, -74.0, 40.7, -74.0), 0.0);
        assert_eq!(
            earth_distance(40.7, -74.0, 40.8, -73.9),
            earth_distance(40.8, -73.9, 40.7, -74.0),
        );
    }

    #[test]
    fn test_parallel_distance() {
        assert_almost_eq!(
            parallel_distance(10.0, 11.0),
            earth_distance(10.0, 5.0, 11.0, 5.0),
            1e-6
        );
    }

    #[test]
    fn test_meridian_distance() {
        // On the equator the closest point of a meridian is at the same latitude
        assert_almost_eq!(
            meridian_distance(0.0, 1.0, 0.0),
            earth_distance(0.0, 1.0, 0.0, 0.0),
            1e-6
        );

        // Further from the equator, the closest point lies poleward,
        // so the bound must not exceed the same-latitude distance.
        assert!(meridian_distance(60.0, 10.0, 0.0) < earth_distance(60.0, 10.0, 60.0, 0.0));

        // Across the antimeridian
        assert_almost_eq!(
            meridian_distance(0.0, 179.5, -179.5),
            earth_distance(0.0, 179.5, 0.0, -179.5),
            1e-6
        );

        assert_eq!(meridian_distance(0.0, 120.0, 0.0), 0.0);
    }
}
