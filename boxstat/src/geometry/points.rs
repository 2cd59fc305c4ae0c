//! Read-only access to a set of particle positions inside a box

use anyhow::Result;

use crate::error::invalid_argument;

use super::SimBox;

/// Point-iteration and box-access capability consumed by the analyses
pub trait NeighborQuery: Sync {
    /// Box the points live in
    fn sim_box(&self) -> &SimBox;

    /// All positions (contiguous, in index order)
    fn points(&self) -> &[[f64; 3]];

    fn n_points(&self) -> usize {
        self.points().len()
    }

    fn point(&self, idx: usize) -> [f64; 3] {
        self.points()[idx]
    }
}

/// Borrowed positions together with a copy of their box
#[derive(Clone, Debug)]
pub struct Points<'a> {
    sim_box: SimBox,
    positions: &'a [[f64; 3]],
}

impl<'a> Points<'a> {
    /// Wrap a slice of positions. For 2D boxes every z coordinate must be 0.
    pub fn new(sim_box: SimBox, positions: &'a [[f64; 3]]) -> Result<Self> {
        if sim_box.is_2d() {
            if let Some((idx, p)) = positions.iter().enumerate().find(|(_, p)| p[2] != 0.0) {
                return Err(invalid_argument!("Point {} has z = {} but the box is two-dimensional", idx, p[2]));
            }
        }
        Ok(Self { sim_box, positions })
    }

    /// Wrap a flat `[x0, y0, z0, x1, y1, z1, ...]` buffer
    pub fn from_flat(sim_box: SimBox, positions: &'a [f64]) -> Result<Self> {
        if positions.len() % 3 != 0 {
            return Err(invalid_argument!("Flat position buffer length {} is not a multiple of 3", positions.len()));
        }
        let positions: &[[f64; 3]] = bytemuck::try_cast_slice(positions)
            .map_err(|e| invalid_argument!("Cannot reinterpret position buffer: {}", e))?;
        Self::new(sim_box, positions)
    }
}

impl<'a> NeighborQuery for Points<'a> {
    fn sim_box(&self) -> &SimBox {
        &self.sim_box
    }

    fn points(&self) -> &[[f64; 3]] {
        self.positions
    }
}
