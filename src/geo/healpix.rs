//! # HEALPix Pixelization Math
//!
//! HEALPix divides the sphere into 12 base faces and subdivides each into
//! `nside × nside` equal-area cells, where `nside = 2^order`. The total cell
//! count is `12 · 4^order`. Cells can be numbered three ways:
//!
//! - **Ring**: consecutively along iso-latitude rings from the north pole
//!   southward — efficient for spectral transforms and latitude scans
//! - **Nested**: by quadtree position within each face — efficient for
//!   neighbor lookups and hierarchical degrade
//! - **Unique**: nested ids with the order embedded
//!   (`uniq = nest + 4·nside²`), so a single integer identifies both the
//!   resolution and the cell
//!
//! ## Coordinate Mapping
//!
//! `latlon_to_ring` / `latlon_to_nest` implement the standard HEALPix
//! ang2pix algorithms. The sphere splits at |z| = 2/3 into an equatorial
//! belt, where cell boundaries are straight lines in (φ, z), and two polar
//! caps, where rings shrink toward the poles. All fractional pixel
//! coordinates truncate toward zero; the numbering this produces is part of
//! the on-disk addressing contract and must not be "improved" with rounding.
//!
//! ## Ring ↔ Nested Conversion
//!
//! Both conversions go through the (face, x, y) decomposition: a cell's
//! face number plus its column/row within the face. Nested ids interleave
//! the x/y bits directly; ring ids are reconstructed from the ring number
//! and the position along the ring.
//!
//! ## Planar Projection
//!
//! [`unproject`] inverts the HEALPix "butterfly" projection
//! (x ∈ [−π, π], y ∈ [−π/2, π/2], equatorial belt at |y| ≤ π/4) back to
//! spherical coordinates, for looking up cells by projected coordinates.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use eyre::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Highest order whose pixel ids fit comfortably in an `i64`.
pub const MAX_ORDER: u8 = 29;

/// The three cell numbering schemes.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum HealpixScheme {
    Ring = 0,
    Nest = 1,
    Unique = 2,
}

impl From<HealpixScheme> for u8 {
    fn from(scheme: HealpixScheme) -> u8 {
        scheme as u8
    }
}

impl TryFrom<u8> for HealpixScheme {
    type Error = eyre::Report;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(HealpixScheme::Ring),
            1 => Ok(HealpixScheme::Nest),
            2 => Ok(HealpixScheme::Unique),
            _ => eyre::bail!("invalid HealpixScheme discriminant: {}", value),
        }
    }
}

/// Cells per face side at the given order.
pub fn nside(order: u8) -> i64 {
    1 << order
}

/// Total cells on the sphere at the given order.
pub fn pixel_count(order: u8) -> i64 {
    12 << (2 * order)
}

// Ring offset of each face's northernmost corner, in units of nside.
const JRLL: [i64; 12] = [2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4];
// Longitude offset of each face's center, in units of π/4.
const JPLL: [i64; 12] = [1, 3, 5, 7, 0, 2, 4, 6, 1, 3, 5, 7];

/// Maps spherical coordinates (radians) to a ring-numbered cell.
pub fn latlon_to_ring(order: u8, lat: f64, lon: f64) -> i64 {
    let ns = nside(order);
    let nl4 = 4 * ns;
    let npix = pixel_count(order);
    let ncap = 2 * ns * (ns - 1);

    let z = lat.sin();
    let za = z.abs();
    let tt = wrap_longitude(lon) / FRAC_PI_2; // in [0, 4)

    if za <= 2.0 / 3.0 {
        let temp1 = ns as f64 * (0.5 + tt);
        let temp2 = ns as f64 * z * 0.75;
        let jp = (temp1 - temp2) as i64; // ascending edge line
        let jm = (temp1 + temp2) as i64; // descending edge line

        let ir = ns + 1 + jp - jm; // ring counter, in {1, 2n+1}
        let kshift = 1 - (ir & 1);
        let mut ip = (jp + jm - ns + kshift + 1) >> 1;
        if ip >= nl4 {
            ip -= nl4;
        }
        ncap + (ir - 1) * nl4 + ip
    } else {
        let tp = tt.fract();
        let tmp = ns as f64 * (3.0 * (1.0 - za)).sqrt();
        let jp = (tp * tmp) as i64;
        let jm = ((1.0 - tp) * tmp) as i64;

        let ir = jp + jm + 1; // ring counter from the nearest pole
        let mut ip = (tt * ir as f64) as i64;
        ip = ip.rem_euclid(4 * ir);
        if z > 0.0 {
            2 * ir * (ir - 1) + ip
        } else {
            npix - 2 * ir * (ir + 1) + ip
        }
    }
}

/// Maps spherical coordinates (radians) to a nested-numbered cell.
pub fn latlon_to_nest(order: u8, lat: f64, lon: f64) -> i64 {
    let ns = nside(order);

    let z = lat.sin();
    let za = z.abs();
    let tt = wrap_longitude(lon) / FRAC_PI_2; // in [0, 4)

    if za <= 2.0 / 3.0 {
        let temp1 = ns as f64 * (0.5 + tt);
        let temp2 = ns as f64 * z * 0.75;
        let jp = (temp1 - temp2) as i64;
        let jm = (temp1 + temp2) as i64;

        let ifp = jp >> order;
        let ifm = jm >> order;
        let face = if ifp == ifm {
            ifp | 4
        } else if ifp < ifm {
            ifp
        } else {
            ifm + 8
        };

        let ix = jm & (ns - 1);
        let iy = ns - (jp & (ns - 1)) - 1;
        xyf_to_nest(order, ix, iy, face)
    } else {
        let ntt = (tt as i64).min(3);
        let tp = tt - ntt as f64;
        let tmp = ns as f64 * (3.0 * (1.0 - za)).sqrt();
        let jp = ((tp * tmp) as i64).min(ns - 1);
        let jm = (((1.0 - tp) * tmp) as i64).min(ns - 1);

        if z >= 0.0 {
            xyf_to_nest(order, ns - jm - 1, ns - jp - 1, ntt)
        } else {
            xyf_to_nest(order, jp, jm, ntt + 8)
        }
    }
}

/// Converts a ring-numbered cell to its nested number.
pub fn ring_to_nest(order: u8, pix: i64) -> Result<i64> {
    ensure!(
        pix >= 0 && pix < pixel_count(order),
        "ring pixel {} out of range for order {}",
        pix,
        order
    );
    let (ix, iy, face) = ring_to_xyf(order, pix);
    Ok(xyf_to_nest(order, ix, iy, face))
}

/// Converts a nested-numbered cell to its ring number.
pub fn nest_to_ring(order: u8, pix: i64) -> Result<i64> {
    ensure!(
        pix >= 0 && pix < pixel_count(order),
        "nested pixel {} out of range for order {}",
        pix,
        order
    );
    let (ix, iy, face) = nest_to_xyf(order, pix);
    Ok(xyf_to_ring(order, ix, iy, face))
}

/// Embeds a nested cell id and its order into one unique id.
pub fn nest_to_unique(order: u8, nest: i64) -> i64 {
    nest + (1 << (2 * order + 2))
}

/// Recovers (order, nested id) from a unique id.
pub fn split_unique(uniq: i64) -> Result<(u8, i64)> {
    ensure!(uniq >= 4, "unique pixel id {} is invalid", uniq);
    let msb = 63 - uniq.leading_zeros() as i64;
    let order = ((msb - 2) / 2) as u8;
    Ok((order, uniq - (1 << (2 * order + 2))))
}

/// Resolves a unique id to a nested id at `order`, descending to the first
/// child when the unique cell is coarser and ascending to the ancestor when
/// it is finer.
pub fn unique_to_nest_at(order: u8, uniq: i64) -> Result<i64> {
    let (uniq_order, nest) = split_unique(uniq)?;
    ensure!(
        uniq_order <= MAX_ORDER,
        "unique pixel id {} encodes order {} beyond the maximum {}",
        uniq,
        uniq_order,
        MAX_ORDER
    );
    Ok(if uniq_order <= order {
        nest << (2 * (order - uniq_order))
    } else {
        nest >> (2 * (uniq_order - order))
    })
}

/// Inverts the HEALPix planar projection back to (lat, lon) radians.
pub fn unproject(x: f64, y: f64) -> (f64, f64) {
    if y.abs() <= FRAC_PI_4 {
        // Equatorial belt: y is proportional to sin(lat).
        let sin_lat = (y * 8.0 / (3.0 * PI)).clamp(-1.0, 1.0);
        (sin_lat.asin(), x)
    } else {
        let sigma = 2.0 - 4.0 * y.abs() / PI;
        let z = (1.0 - sigma * sigma / 3.0).copysign(y);
        // Polar facets are centered at x = -3π/4, -π/4, π/4, 3π/4.
        let facet = (((x + PI) / FRAC_PI_2) as i64).clamp(0, 3);
        let center = -3.0 * FRAC_PI_4 + facet as f64 * FRAC_PI_2;
        let lon = if sigma.abs() < f64::EPSILON {
            x
        } else {
            center + (x - center) / sigma
        };
        (z.asin(), lon)
    }
}

fn wrap_longitude(lon: f64) -> f64 {
    let wrapped = lon.rem_euclid(2.0 * PI);
    if wrapped >= 2.0 * PI {
        0.0
    } else {
        wrapped
    }
}

/// Interleaves the low 32 bits of `v` into the even bit positions.
fn spread_bits(v: i64) -> i64 {
    let mut v = (v as u64) & 0xFFFF_FFFF;
    v = (v | (v << 16)) & 0x0000_FFFF_0000_FFFF;
    v = (v | (v << 8)) & 0x00FF_00FF_00FF_00FF;
    v = (v | (v << 4)) & 0x0F0F_0F0F_0F0F_0F0F;
    v = (v | (v << 2)) & 0x3333_3333_3333_3333;
    v = (v | (v << 1)) & 0x5555_5555_5555_5555;
    v as i64
}

/// Gathers the even bit positions of `v` back into a dense integer.
fn compress_bits(v: i64) -> i64 {
    let mut v = (v as u64) & 0x5555_5555_5555_5555;
    v = (v | (v >> 1)) & 0x3333_3333_3333_3333;
    v = (v | (v >> 2)) & 0x0F0F_0F0F_0F0F_0F0F;
    v = (v | (v >> 4)) & 0x00FF_00FF_00FF_00FF;
    v = (v | (v >> 8)) & 0x0000_FFFF_0000_FFFF;
    v = (v | (v >> 16)) & 0x0000_0000_FFFF_FFFF;
    v as i64
}

fn xyf_to_nest(order: u8, ix: i64, iy: i64, face: i64) -> i64 {
    (face << (2 * order)) + spread_bits(ix) + (spread_bits(iy) << 1)
}

fn nest_to_xyf(order: u8, pix: i64) -> (i64, i64, i64) {
    let face = pix >> (2 * order);
    let rem = pix & (nside(order) * nside(order) - 1);
    (compress_bits(rem), compress_bits(rem >> 1), face)
}

fn xyf_to_ring(order: u8, ix: i64, iy: i64, face: i64) -> i64 {
    let ns = nside(order);
    let nl4 = 4 * ns;
    let npix = pixel_count(order);
    let ncap = 2 * ns * (ns - 1);

    let jr = JRLL[face as usize] * ns - ix - iy - 1;
    let (nr, n_before, kshift) = if jr < ns {
        // North polar cap.
        (jr, 2 * jr * (jr - 1), 0)
    } else if jr > 3 * ns {
        // South polar cap.
        let nr = nl4 - jr;
        (nr, npix - 2 * (nr + 1) * nr, 0)
    } else {
        (ns, ncap + (jr - ns) * nl4, (jr - ns) & 1)
    };

    let mut jp = (JPLL[face as usize] * nr + ix - iy + 1 + kshift) / 2;
    if jp > nl4 {
        jp -= nl4;
    }
    if jp < 1 {
        jp += nl4;
    }
    n_before + jp - 1
}

fn ring_to_xyf(order: u8, pix: i64) -> (i64, i64, i64) {
    let ns = nside(order);
    let nl2 = 2 * ns;
    let nl4 = 4 * ns;
    let npix = pixel_count(order);
    let ncap = 2 * ns * (ns - 1);

    let (iring, iphi, kshift, nr, face) = if pix < ncap {
        // North polar cap; rings counted from the north pole.
        let iring = (1 + isqrt(1 + 2 * pix)) >> 1;
        let iphi = pix + 1 - 2 * iring * (iring - 1);
        (iring, iphi, 0, iring, (iphi - 1) / iring)
    } else if pix < npix - ncap {
        let ip = pix - ncap;
        let tmp = ip >> (order + 2);
        let iring = tmp + ns;
        let iphi = ip - tmp * nl4 + 1;
        let kshift = (iring + ns) & 1;

        let ire = iring - ns + 1;
        let irm = nl2 + 2 - ire;
        let ifm = (iphi - ire / 2 + ns - 1) >> order;
        let ifp = (iphi - irm / 2 + ns - 1) >> order;
        let face = if ifp == ifm {
            ifp | 4
        } else if ifp < ifm {
            ifp
        } else {
            ifm + 8
        };
        (iring, iphi, kshift, ns, face)
    } else {
        // South polar cap; rings counted from the south pole, then flipped.
        let ip = npix - pix;
        let iring = (1 + isqrt(2 * ip - 1)) >> 1;
        let iphi = 4 * iring + 1 - (ip - 2 * iring * (iring - 1));
        (2 * nl2 - iring, iphi, 0, iring, 8 + (iphi - 1) / iring)
    };

    let irt = iring - JRLL[face as usize] * ns + 1;
    let mut ipt = 2 * iphi - JPLL[face as usize] * nr - kshift - 1;
    if ipt >= nl2 {
        ipt -= 8 * ns;
    }
    ((ipt - irt) >> 1, (-ipt - irt) >> 1, face)
}

fn isqrt(v: i64) -> i64 {
    let mut r = (v as f64).sqrt() as i64;
    while (r + 1) * (r + 1) <= v {
        r += 1;
    }
    while r * r > v {
        r -= 1;
    }
    r
}
