//! Box geometry with per-axis periodicity

use anyhow::Result;
use ndarray::Array2;
use rayon::prelude::*;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

use crate::error::invalid_argument;

/// Coordinate axis of the box
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter)]
pub enum Dim {
    X, Y, Z
}

impl Dim {
    pub fn index(self) -> usize {
        match self {
            Dim::X => 0,
            Dim::Y => 1,
            Dim::Z => 2
        }
    }
}

/// Orthorhombic box centered on the origin, i.e. spanning `[-L/2, L/2)` along each axis.
///
/// A 2D box has `lz = 0` and all z displacements are treated as zero.
#[derive(Clone, Debug, PartialEq)]
pub struct SimBox {
    lengths: [f64; 3],
    periodic: [bool; 3],
    is_2d: bool,
}

impl SimBox {
    /// Fully periodic 3D box
    pub fn new(lx: f64, ly: f64, lz: f64) -> Result<Self> {
        let lengths = [lx, ly, lz];
        for dim in Dim::iter() {
            check_length(dim, lengths[dim.index()])?;
        }
        Ok(Self {
            lengths,
            periodic: [true; 3],
            is_2d: false
        })
    }

    /// Fully periodic cubic box
    pub fn cube(l: f64) -> Result<Self> {
        Self::new(l, l, l)
    }

    /// Periodic 2D box (z is not periodic since it has no extent)
    pub fn new_2d(lx: f64, ly: f64) -> Result<Self> {
        check_length(Dim::X, lx)?;
        check_length(Dim::Y, ly)?;
        Ok(Self {
            lengths: [lx, ly, 0.0],
            periodic: [true, true, false],
            is_2d: true
        })
    }

    /// Set periodicity per axis (z periodicity is ignored for 2D boxes)
    pub fn with_periodic(mut self, periodic: [bool; 3]) -> Self {
        self.periodic = periodic;
        if self.is_2d {
            self.periodic[2] = false;
        }
        self
    }

    pub fn lengths(&self) -> [f64; 3] {
        self.lengths
    }

    pub fn length(&self, dim: Dim) -> f64 {
        self.lengths[dim.index()]
    }

    pub fn lx(&self) -> f64 {
        self.lengths[0]
    }

    pub fn ly(&self) -> f64 {
        self.lengths[1]
    }

    pub fn lz(&self) -> f64 {
        self.lengths[2]
    }

    pub fn periodic(&self) -> [bool; 3] {
        self.periodic
    }

    pub fn is_periodic(&self, dim: Dim) -> bool {
        self.periodic[dim.index()]
    }

    pub fn is_2d(&self) -> bool {
        self.is_2d
    }

    /// Number of spatial dimensions (2 or 3)
    pub fn get_dim(&self) -> usize {
        if self.is_2d { 2 } else { 3 }
    }

    /// Volume of the box (area for 2D boxes)
    pub fn volume(&self) -> f64 {
        if self.is_2d {
            self.lengths[0] * self.lengths[1]
        }
        else {
            self.lengths.iter().product()
        }
    }

    /// Smallest side length (ignoring z for 2D boxes)
    pub fn min_side_length(&self) -> f64 {
        if self.is_2d {
            self.lengths[0].min(self.lengths[1])
        }
        else {
            self.lengths[0].min(self.lengths[1]).min(self.lengths[2])
        }
    }

    /// Minimum image of a displacement: every periodic component ends up in `(-L/2, L/2]`
    pub fn wrap(&self, delta: [f64; 3]) -> [f64; 3] {
        let mut wrapped = delta;
        for dim in Dim::iter() {
            let i = dim.index();
            if dim == Dim::Z && self.is_2d {
                wrapped[i] = 0.0;
                continue;
            }
            if !self.periodic[i] {
                continue;
            }
            let l = self.lengths[i];
            let mut x = delta[i] - l * (delta[i] / l).round();
            // round() sends ties away from zero, so fix up both ends of the interval
            if x <= -0.5 * l {
                x += l;
            }
            else if x > 0.5 * l {
                x -= l;
            }
            wrapped[i] = x;
        }
        wrapped
    }

    /// Canonical image of a position: every periodic component ends up in `[-L/2, L/2)`
    pub fn wrap_position(&self, pos: [f64; 3]) -> [f64; 3] {
        let mut wrapped = pos;
        for dim in Dim::iter() {
            let i = dim.index();
            if dim == Dim::Z && self.is_2d {
                wrapped[i] = 0.0;
                continue;
            }
            if !self.periodic[i] {
                continue;
            }
            let l = self.lengths[i];
            let x = (pos[i] + 0.5 * l).rem_euclid(l) - 0.5 * l;
            // rem_euclid may round up to exactly l for tiny negative inputs
            wrapped[i] = if x >= 0.5 * l { -0.5 * l } else { x };
        }
        wrapped
    }

    /// Position in units of the box lengths, measured from the lower box corner.
    /// Points inside the box map to `[0, 1)`, z is always 0 for 2D boxes.
    pub fn make_fractional(&self, pos: [f64; 3]) -> [f64; 3] {
        let mut frac = [0.0; 3];
        for dim in Dim::iter() {
            let i = dim.index();
            if dim == Dim::Z && self.is_2d {
                continue;
            }
            frac[i] = (pos[i] + 0.5 * self.lengths[i]) / self.lengths[i];
        }
        frac
    }

    /// Minimum image distance between two points
    pub fn distance(&self, a: [f64; 3], b: [f64; 3]) -> f64 {
        let d = self.wrap([b[0] - a[0], b[1] - a[1], b[2] - a[2]]);
        (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
    }

    /// All minimum image distances between `points` (rows) and `query_points` (columns)
    pub fn compute_all_distances(&self, points: &[[f64; 3]], query_points: &[[f64; 3]]) -> Result<Array2<f64>> {
        let n = points.len();
        let m = query_points.len();
        let mut distances = vec![0.0; n * m];
        if m > 0 {
            distances.par_chunks_mut(m)
                .zip(points.par_iter())
                .for_each(|(row, p)| {
                    for (d, q) in row.iter_mut().zip(query_points) {
                        *d = self.distance(*p, *q);
                    }
                });
        }
        Ok(Array2::from_shape_vec((n, m), distances)?)
    }
}

fn check_length(dim: Dim, length: f64) -> Result<()> {
    if !(length > 0.0) || !length.is_finite() {
        return Err(invalid_argument!("Box length along {:?} must be positive and finite, got {}", dim, length));
    }
    Ok(())
}
