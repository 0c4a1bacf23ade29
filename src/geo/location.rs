//! # Addressable Locations
//!
//! The coordinate kinds a table can be queried by. Which variants an indexer
//! accepts depends on the indexer; every indexer passes [`Location::Index`]
//! through untouched, and the spherical indexers accept
//! [`Location::Rectangular`] by converting it to spherical coordinates
//! first.

use std::f64::consts::PI;

/// A coordinate addressing one cell of a table.
///
/// Angles are radians. Grid coordinates put (0, 0) at the south-west corner
/// with `y` increasing north.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Location {
    /// A raw row index, accepted by every indexer as-is.
    Index(i64),
    /// A HEALPix pixel id in ring numbering.
    Ring(i64),
    /// A HEALPix pixel id in nested numbering.
    Nest(i64),
    /// A HEALPix pixel id in unique (order-embedding) numbering.
    Unique(i64),
    /// A 2-D grid cell.
    Grid { x: i64, y: i64 },
    /// Latitude/longitude on the sphere, radians.
    Spherical { lat: f64, lon: f64 },
    /// Planar coordinates in an indexer's projection space.
    Projected { x: f64, y: f64 },
    /// A 3-D rectangular position; the direction from the origin selects the
    /// cell.
    Rectangular { x: f64, y: f64, z: f64 },
}

/// Converts a 3-D rectangular position into the spherical location the
/// indexers consume: the polar angle from the z-axis and the azimuth wrapped
/// into [0, 2π).
pub fn spherical_from_rectangular(x: f64, y: f64, z: f64) -> Location {
    let theta = (x * x + y * y).sqrt().atan2(z);
    let mut phi = y.atan2(x);
    if phi < 0.0 {
        phi += 2.0 * PI;
    }
    if phi >= 2.0 * PI {
        phi -= 2.0 * PI;
    }
    Location::Spherical {
        lat: theta,
        lon: phi,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn spherical(loc: Location) -> (f64, f64) {
        match loc {
            Location::Spherical { lat, lon } => (lat, lon),
            other => panic!("expected spherical, got {:?}", other),
        }
    }

    #[test]
    fn north_pole_maps_to_zero_polar_angle() {
        let (lat, lon) = spherical(spherical_from_rectangular(0.0, 0.0, 1.0));
        assert!(lat.abs() < 1e-12);
        assert!(lon.abs() < 1e-12);
    }

    #[test]
    fn equatorial_axes_map_to_quarter_turns() {
        let (lat, lon) = spherical(spherical_from_rectangular(1.0, 0.0, 0.0));
        assert!((lat - FRAC_PI_2).abs() < 1e-12);
        assert!(lon.abs() < 1e-12);

        let (lat, lon) = spherical(spherical_from_rectangular(0.0, 1.0, 0.0));
        assert!((lat - FRAC_PI_2).abs() < 1e-12);
        assert!((lon - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn negative_azimuth_wraps_into_positive_range() {
        let (_, lon) = spherical(spherical_from_rectangular(0.0, -1.0, 0.0));
        assert!((lon - 3.0 * FRAC_PI_2).abs() < 1e-12);
    }
}
