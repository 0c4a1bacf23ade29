//! # Location Indexing
//!
//! Everything that turns a coordinate into a dense row index. A table's rows
//! are addressed by *pixel index* — a single integer derived from a location
//! on the sphere (or directly on a grid) under the table's configured
//! indexer.
//!
//! ## Pieces
//!
//! - [`Location`]: the tagged union of addressable coordinate kinds — raw
//!   indices, HEALPix ring/nest/unique ids, grid cells, spherical and
//!   projected coordinates, and 3-D rectangular positions
//! - [`LocationIndexer`]: the capability every indexer offers — a name tag,
//!   a total cell count, and the location-to-index mapping
//! - [`ProjectionlessIndexer`]: plain 2-D grid, row- or column-major
//! - [`MercatorCutoffIndexer`]: Mercator-projected grid truncated at
//!   configurable north/south parallels
//! - [`CylindricalEquirectangularIndexer`]: full-sphere plate-carrée-style
//!   grid focused on a chosen standard parallel
//! - [`FlatHealpixIndexer`]: single-resolution HEALPix pixelization in ring,
//!   nested or unique numbering
//! - [`projection`]: the planar map projections backing the grid indexers
//! - [`healpix`]: the HEALPix numbering and coordinate math
//!
//! ## Persistence
//!
//! Indexers serialize to JSON tagged by their name; [`indexer_from_json`]
//! performs the reverse dispatch when a table is opened. The tag strings are
//! part of the table file format.

pub mod healpix;
mod indexer;
mod location;
pub mod projection;

pub use healpix::HealpixScheme;
pub use indexer::{
    indexer_from_json, CylindricalEquirectangularIndexer, FlatHealpixIndexer, LocationIndexer,
    MercatorCutoffIndexer, ProjectionlessIndexer,
};
pub use location::{spherical_from_rectangular, Location};
