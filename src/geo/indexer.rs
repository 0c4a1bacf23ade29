//! # Location Indexers
//!
//! The four mappings from a [`Location`] to a dense row index. Every indexer
//! carries a stable name tag (part of the table file format), reports its
//! total cell count, and accepts [`Location::Index`] as a pass-through.
//! Unsupported pairings are explicit errors rather than silent zeros.
//!
//! ## Pixel Truncation
//!
//! The projected indexers map a planar coordinate onto a W×H grid with
//!
//! ```text
//! x_pix = ((x - x_min) / planar_width)  * (W - 1)
//! y_pix = ((y - y_min) / planar_height) * (H - 1)
//! ```
//!
//! truncated toward zero. The truncation is part of the addressing contract:
//! boundary coordinates land deterministically on the first/last cells, and
//! substituting rounding would shift every stored pixel.
//!
//! ## Persistence
//!
//! Each indexer serializes its construction parameters under its name tag;
//! [`indexer_from_json`] re-dispatches on the tag when a table is opened.
//! Derived quantities (projected cutoffs, planar ranges) are recomputed, not
//! stored.

use eyre::{ensure, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::healpix::{self, HealpixScheme};
use super::location::{spherical_from_rectangular, Location};
use super::projection::{Equirectangular, Mercator};
use crate::error::Error;

/// Name tag of the plain grid indexer.
pub const PROJECTIONLESS: &str = "projectionless";
/// Name tag of the Mercator indexer with polar cutoffs.
pub const MERCATOR_CUTOFF: &str = "mercator-cutoff";
/// Name tag of the cylindrical equirectangular indexer.
pub const CYLINDRICAL_EQUIRECTANGULAR: &str = "cylindrical-equirectangular";
/// Name tag of the single-resolution HEALPix indexer.
pub const FLAT_HEALPIX: &str = "flat-healpix";

/// The capability every pixel indexer offers: a stable name, a total cell
/// count, a location-to-index mapping, and a serializable parameter set.
pub trait LocationIndexer: Send + Sync + std::fmt::Debug {
    /// The indexer's name tag, as persisted in table metadata.
    fn name(&self) -> &'static str;

    /// The total number of addressable cells. A store paired with this
    /// indexer has exactly this many rows.
    fn size(&self) -> i64;

    /// Translates a location into a row index.
    fn to_index(&self, location: Location) -> Result<i64>;

    /// The indexer's construction parameters as a JSON object.
    fn to_json(&self) -> Result<JsonValue>;
}

/// Reconstructs a concrete indexer from its name tag and parameter object.
pub fn indexer_from_json(name: &str, params: &JsonValue) -> Result<Box<dyn LocationIndexer>> {
    match name {
        PROJECTIONLESS => {
            let grid: ProjectionlessIndexer = serde_json::from_value(params.clone())?;
            Ok(Box::new(grid))
        }
        MERCATOR_CUTOFF => {
            let p: MercatorCutoffParams = serde_json::from_value(params.clone())?;
            Ok(Box::new(MercatorCutoffIndexer::new(
                p.north_cutoff,
                p.south_cutoff,
                p.grid.width(),
                p.grid.height(),
                p.grid.row_major(),
            )?))
        }
        CYLINDRICAL_EQUIRECTANGULAR => {
            let p: CylindricalEquirectangularParams = serde_json::from_value(params.clone())?;
            Ok(Box::new(CylindricalEquirectangularIndexer::new(
                p.parallel,
                p.grid.width(),
                p.grid.height(),
                p.grid.row_major(),
            )))
        }
        FLAT_HEALPIX => {
            let p: FlatHealpixParams = serde_json::from_value(params.clone())?;
            Ok(Box::new(FlatHealpixIndexer::new(p.order, p.scheme)?))
        }
        other => Err(Error::UnknownIndexerScheme(other.to_string()).into()),
    }
}

/// Plain 2-D grid indexing with no spherical projection. Supports row-major
/// (scanline) and column-major layouts for different access patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionlessIndexer {
    width: i64,
    // Older table files carried the misspelled key; accept both, write the
    // correct one.
    #[serde(alias = "heigh")]
    height: i64,
    #[serde(rename = "rowmajor")]
    row_major: bool,
}

impl ProjectionlessIndexer {
    pub fn new(width: i64, height: i64, row_major: bool) -> Self {
        Self {
            width,
            height,
            row_major,
        }
    }

    pub fn width(&self) -> i64 {
        self.width
    }

    pub fn height(&self) -> i64 {
        self.height
    }

    pub fn row_major(&self) -> bool {
        self.row_major
    }
}

impl LocationIndexer for ProjectionlessIndexer {
    fn name(&self) -> &'static str {
        PROJECTIONLESS
    }

    fn size(&self) -> i64 {
        self.width * self.height
    }

    fn to_index(&self, location: Location) -> Result<i64> {
        match location {
            Location::Index(index) => Ok(index),
            Location::Grid { x, y } => {
                if self.row_major {
                    Ok(y * self.width + x)
                } else {
                    Ok(x * self.height + y)
                }
            }
            other => Err(Error::LocationNotSupported {
                indexer: self.name(),
                location: other,
            }
            .into()),
        }
    }

    fn to_json(&self) -> Result<JsonValue> {
        Ok(serde_json::to_value(self)?)
    }
}

#[derive(Serialize, Deserialize)]
struct MercatorCutoffParams {
    #[serde(rename = "northCutoff")]
    north_cutoff: f64,
    #[serde(rename = "southCutoff")]
    south_cutoff: f64,
    #[serde(flatten)]
    grid: ProjectionlessIndexer,
}

/// Mercator-projected grid truncated at configurable north and south
/// parallels. Mercator diverges at the poles, so the cutoffs become the top
/// and bottom edges of the grid; spherical locations beyond them are out of
/// bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MercatorCutoffIndexer {
    north_cutoff: f64,
    south_cutoff: f64,
    south_proj: f64,
    lat_range_proj: f64,
    grid: ProjectionlessIndexer,
    proj: Mercator,
}

impl MercatorCutoffIndexer {
    /// Builds an indexer over a `width`×`height` grid spanning the latitudes
    /// between `south_cutoff` and `north_cutoff` (radians).
    pub fn new(
        north_cutoff: f64,
        south_cutoff: f64,
        width: i64,
        height: i64,
        row_major: bool,
    ) -> Result<Self> {
        ensure!(
            north_cutoff > south_cutoff,
            "mercator north cutoff {} not above south cutoff {}",
            north_cutoff,
            south_cutoff
        );
        let proj = Mercator;
        let (_, south_proj) = proj.project(south_cutoff, 0.0);
        let (_, north_proj) = proj.project(north_cutoff, 0.0);
        Ok(Self {
            north_cutoff,
            south_cutoff,
            south_proj,
            lat_range_proj: north_proj - south_proj,
            grid: ProjectionlessIndexer::new(width, height, row_major),
            proj,
        })
    }

    pub fn north_cutoff(&self) -> f64 {
        self.north_cutoff
    }

    pub fn south_cutoff(&self) -> f64 {
        self.south_cutoff
    }
}

impl LocationIndexer for MercatorCutoffIndexer {
    fn name(&self) -> &'static str {
        MERCATOR_CUTOFF
    }

    fn size(&self) -> i64 {
        self.grid.size()
    }

    fn to_index(&self, location: Location) -> Result<i64> {
        match location {
            Location::Index(index) => Ok(index),
            Location::Grid { .. } => self.grid.to_index(location),
            Location::Spherical { lat, lon } => {
                if lat > self.north_cutoff || lat < self.south_cutoff {
                    return Err(Error::LocationOutOfBounds { location }.into());
                }
                let (x, y) = self.proj.project(lat, lon);
                self.to_index(Location::Projected { x, y })
            }
            Location::Projected { x, y } => {
                let bounds = self.proj.planar_bounds();
                let x_pix = ((x - bounds.x_min) / bounds.width()) * (self.grid.width() - 1) as f64;
                let y_pix =
                    ((y - self.south_proj) / self.lat_range_proj) * (self.grid.height() - 1) as f64;
                self.to_index(Location::Grid {
                    x: x_pix as i64,
                    y: y_pix as i64,
                })
            }
            Location::Rectangular { x, y, z } => self.to_index(spherical_from_rectangular(x, y, z)),
            other => Err(Error::LocationNotSupported {
                indexer: self.name(),
                location: other,
            }
            .into()),
        }
    }

    fn to_json(&self) -> Result<JsonValue> {
        Ok(serde_json::to_value(MercatorCutoffParams {
            north_cutoff: self.north_cutoff,
            south_cutoff: self.south_cutoff,
            grid: self.grid,
        })?)
    }
}

#[derive(Serialize, Deserialize)]
struct CylindricalEquirectangularParams {
    parallel: f64,
    #[serde(flatten)]
    grid: ProjectionlessIndexer,
}

/// Full-sphere grid under the cylindrical equirectangular projection focused
/// at a chosen standard parallel. Grid cell (0, 0) is the south-west corner
/// of the planar space; increasing y moves north.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CylindricalEquirectangularIndexer {
    parallel: f64,
    grid: ProjectionlessIndexer,
    proj: Equirectangular,
}

impl CylindricalEquirectangularIndexer {
    pub fn new(parallel: f64, width: i64, height: i64, row_major: bool) -> Self {
        Self {
            parallel,
            grid: ProjectionlessIndexer::new(width, height, row_major),
            proj: Equirectangular::new(parallel),
        }
    }

    pub fn parallel(&self) -> f64 {
        self.parallel
    }
}

impl LocationIndexer for CylindricalEquirectangularIndexer {
    fn name(&self) -> &'static str {
        CYLINDRICAL_EQUIRECTANGULAR
    }

    fn size(&self) -> i64 {
        self.grid.size()
    }

    fn to_index(&self, location: Location) -> Result<i64> {
        match location {
            Location::Index(index) => Ok(index),
            Location::Grid { .. } => self.grid.to_index(location),
            Location::Spherical { lat, lon } => {
                let (x, y) = self.proj.project(lat, lon);
                self.to_index(Location::Projected { x, y })
            }
            Location::Projected { x, y } => {
                let bounds = self.proj.planar_bounds();
                let x_pix = ((x - bounds.x_min) / bounds.width()) * (self.grid.width() - 1) as f64;
                let y_pix =
                    ((y - bounds.y_min) / bounds.height()) * (self.grid.height() - 1) as f64;
                self.to_index(Location::Grid {
                    x: x_pix as i64,
                    y: y_pix as i64,
                })
            }
            Location::Rectangular { x, y, z } => self.to_index(spherical_from_rectangular(x, y, z)),
            other => Err(Error::LocationNotSupported {
                indexer: self.name(),
                location: other,
            }
            .into()),
        }
    }

    fn to_json(&self) -> Result<JsonValue> {
        Ok(serde_json::to_value(CylindricalEquirectangularParams {
            parallel: self.parallel,
            grid: self.grid,
        })?)
    }
}

#[derive(Serialize, Deserialize)]
struct FlatHealpixParams {
    scheme: HealpixScheme,
    order: u8,
}

/// Single-resolution HEALPix pixelization of the sphere: every cell has the
/// same angular area. The configured scheme decides the storage numbering;
/// locations in any HEALPix numbering are converted on the way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatHealpixIndexer {
    order: u8,
    scheme: HealpixScheme,
}

impl FlatHealpixIndexer {
    pub fn new(order: u8, scheme: HealpixScheme) -> Result<Self> {
        ensure!(
            order <= healpix::MAX_ORDER,
            "healpix order {} exceeds the maximum {}",
            order,
            healpix::MAX_ORDER
        );
        Ok(Self { order, scheme })
    }

    pub fn order(&self) -> u8 {
        self.order
    }

    pub fn scheme(&self) -> HealpixScheme {
        self.scheme
    }

    /// Converts a ring-numbered cell into the storage numbering.
    fn store_ring(&self, ring: i64) -> Result<i64> {
        match self.scheme {
            HealpixScheme::Ring => Ok(ring),
            // Unique ids at a fixed order are nested ids plus a constant
            // offset, so dense unique storage is nested storage.
            HealpixScheme::Nest | HealpixScheme::Unique => {
                healpix::ring_to_nest(self.order, ring)
            }
        }
    }

    /// Converts a nested-numbered cell into the storage numbering.
    fn store_nest(&self, nest: i64) -> Result<i64> {
        match self.scheme {
            HealpixScheme::Ring => healpix::nest_to_ring(self.order, nest),
            HealpixScheme::Nest | HealpixScheme::Unique => Ok(nest),
        }
    }
}

impl LocationIndexer for FlatHealpixIndexer {
    fn name(&self) -> &'static str {
        FLAT_HEALPIX
    }

    fn size(&self) -> i64 {
        healpix::pixel_count(self.order)
    }

    fn to_index(&self, location: Location) -> Result<i64> {
        match location {
            Location::Index(index) => Ok(index),
            Location::Ring(ring) => self.store_ring(ring),
            Location::Nest(nest) => self.store_nest(nest),
            Location::Unique(uniq) => {
                self.store_nest(healpix::unique_to_nest_at(self.order, uniq)?)
            }
            Location::Spherical { lat, lon } => match self.scheme {
                HealpixScheme::Ring => Ok(healpix::latlon_to_ring(self.order, lat, lon)),
                HealpixScheme::Nest | HealpixScheme::Unique => {
                    Ok(healpix::latlon_to_nest(self.order, lat, lon))
                }
            },
            Location::Projected { x, y } => {
                let (lat, lon) = healpix::unproject(x, y);
                self.to_index(Location::Spherical { lat, lon })
            }
            Location::Rectangular { x, y, z } => self.to_index(spherical_from_rectangular(x, y, z)),
            other => Err(Error::LocationNotSupported {
                indexer: self.name(),
                location: other,
            }
            .into()),
        }
    }

    fn to_json(&self) -> Result<JsonValue> {
        Ok(serde_json::to_value(FlatHealpixParams {
            scheme: self.scheme,
            order: self.order,
        })?)
    }
}
