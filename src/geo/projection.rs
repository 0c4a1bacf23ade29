//! # Planar Map Projections
//!
//! The forward/inverse transforms between spherical coordinates and the
//! planar spaces the grid indexers slice into pixels. Only the two
//! projections the indexers need live here; the HEALPix projection has its
//! own math in [`super::healpix`].
//!
//! Both projections take latitude and longitude in radians and return planar
//! coordinates whose extent is described by [`PlanarBounds`]. The bounds are
//! part of the pixel-addressing contract: an indexer maps
//! `(x - x_min) / width` of the planar span onto its grid width, so these
//! constants must not drift.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// The rectangular extent of a projection's planar space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl PlanarBounds {
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }
}

/// The standard Mercator projection.
///
/// Diverges at the poles; users truncate it with north/south cutoff
/// parallels, which is exactly what the mercator indexer does. The nominal
/// planar bounds are the square [−π, π]², the y extent corresponding to the
/// conventional ~85.05° cutoff.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Mercator;

impl Mercator {
    pub fn project(&self, lat: f64, lon: f64) -> (f64, f64) {
        (lon, (FRAC_PI_4 + lat / 2.0).tan().ln())
    }

    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        (2.0 * y.exp().atan() - FRAC_PI_2, x)
    }

    pub fn planar_bounds(&self) -> PlanarBounds {
        PlanarBounds {
            x_min: -PI,
            x_max: PI,
            y_min: -PI,
            y_max: PI,
        }
    }
}

/// The cylindrical equirectangular projection, true at the chosen standard
/// parallel. With parallel 0 this is plate carrée.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equirectangular {
    parallel: f64,
}

impl Equirectangular {
    pub fn new(parallel: f64) -> Self {
        Self { parallel }
    }

    pub fn parallel(&self) -> f64 {
        self.parallel
    }

    pub fn project(&self, lat: f64, lon: f64) -> (f64, f64) {
        (lon * self.parallel.cos(), lat)
    }

    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        (y, x / self.parallel.cos())
    }

    pub fn planar_bounds(&self) -> PlanarBounds {
        let half_width = PI * self.parallel.cos();
        PlanarBounds {
            x_min: -half_width,
            x_max: half_width,
            y_min: -FRAC_PI_2,
            y_max: FRAC_PI_2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mercator_equator_is_the_x_axis() {
        let (x, y) = Mercator.project(0.0, 1.25);
        assert_eq!(x, 1.25);
        assert!(y.abs() < 1e-12);
    }

    #[test]
    fn mercator_round_trips() {
        for &(lat, lon) in &[(0.5, -2.0), (-1.2, 3.0), (1.396, 0.0)] {
            let (x, y) = Mercator.project(lat, lon);
            let (lat2, lon2) = Mercator.inverse(x, y);
            assert!((lat - lat2).abs() < 1e-12);
            assert!((lon - lon2).abs() < 1e-12);
        }
    }

    #[test]
    fn mercator_is_antisymmetric_about_the_equator() {
        let (_, north) = Mercator.project(1.0, 0.0);
        let (_, south) = Mercator.project(-1.0, 0.0);
        assert!((north + south).abs() < 1e-12);
    }

    #[test]
    fn equirectangular_at_parallel_zero_is_identity() {
        let proj = Equirectangular::new(0.0);
        let (x, y) = proj.project(0.7, -2.1);
        assert_eq!((x, y), (-2.1, 0.7));

        let bounds = proj.planar_bounds();
        assert_eq!(bounds.x_min, -PI);
        assert_eq!(bounds.x_max, PI);
        assert_eq!(bounds.y_min, -FRAC_PI_2);
        assert_eq!(bounds.y_max, FRAC_PI_2);
    }

    #[test]
    fn equirectangular_narrows_with_the_parallel() {
        let proj = Equirectangular::new(1.0);
        let bounds = proj.planar_bounds();
        assert!((bounds.width() - 2.0 * PI * 1.0f64.cos()).abs() < 1e-12);
        assert_eq!(bounds.height(), PI);

        let (lat, lon) = proj.inverse(proj.project(0.3, 2.0).0, proj.project(0.3, 2.0).1);
        assert!((lat - 0.3).abs() < 1e-12);
        assert!((lon - 2.0).abs() < 1e-12);
    }
}
