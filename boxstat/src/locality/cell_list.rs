//! Linked cell lists
//!
//! Each box dimension is split into an integer number of cells no smaller than the
//! nominal cell width. Membership is stored as an intrusive singly linked list in a
//! flat index arena of length `N + C`: entry `i < N` holds the particle following
//! particle `i` in its cell, entry `N + c` holds the head of cell `c`. Both chains
//! end in [`LINK_CELL_TERMINATOR`].
//!
//! 2D boxes get a `Nx x Ny x 1` topology and neighbor cells are only searched in-plane.

use anyhow::Result;
use log::debug;
use num::Integer;
use rayon::prelude::*;
use strum::IntoEnumIterator;

use crate::error::{invalid_argument, AnalysisError};
use crate::geometry::{Dim, NeighborQuery, SimBox};

/// Marks the end of a cell chain
pub const LINK_CELL_TERMINATOR: usize = usize::MAX;

/// Upper limit for the total number of cells of one list
pub const MAX_NUM_CELLS: usize = 1 << 28;

macro_rules! get_index_from_coords_3d {
    ($ixyz:expr, $nx:expr, $ny:expr) => {
        $ixyz.0 + $ixyz.1 * $nx + $ixyz.2 * $nx * $ny
    };
}

macro_rules! decompose_index_to_coords_3d {
    ($idx:expr, $nx:expr, $ny:expr) => { {
        let (tmp, ix) = $idx.div_rem(&$nx);
        let (iz, iy) = tmp.div_rem(&$ny);
        (ix,iy,iz)
    }};
}

pub struct CellList {
    /// Box the topology was derived from
    sim_box: SimBox,
    /// Nominal minimum cell width
    cell_width: f64,
    /// Number of cells along each axis
    cell_topo: (usize, usize, usize),
    /// Neighboring cells (including the cell itself) for each cell
    cell_neighbors: Vec<Vec<usize>>,
    /// Number of particles placed by the last `compute()`
    n_points: usize,
    /// Links followed by cell heads (empty until populated)
    links: Vec<usize>,
    /// Positions used for the last `compute()` (needed for ball queries)
    positions: Vec<[f64; 3]>,
}

impl CellList {
    /// Create an empty cell list for `sim_box` with cells at least `cell_width` wide
    pub fn new(sim_box: SimBox, cell_width: f64) -> Result<Self> {
        if !(cell_width > 0.0) || !cell_width.is_finite() {
            return Err(invalid_argument!("CellList requires a positive cell width, got {}", cell_width));
        }
        let cell_topo = compute_cell_topology(&sim_box, cell_width)?;
        let cell_neighbors = compute_cell_neighbors(&sim_box, cell_topo);
        debug!("Cell list topology {:?} for cell width {}", cell_topo, cell_width);
        Ok(Self {
            sim_box,
            cell_width,
            cell_topo,
            cell_neighbors,
            n_points: 0,
            links: vec![],
            positions: vec![],
        })
    }

    pub fn sim_box(&self) -> &SimBox {
        &self.sim_box
    }

    pub fn cell_width(&self) -> f64 {
        self.cell_width
    }

    /// Number of cells along x, y and z
    pub fn cell_topology(&self) -> (usize, usize, usize) {
        self.cell_topo
    }

    pub fn num_cells(&self) -> usize {
        self.cell_topo.0 * self.cell_topo.1 * self.cell_topo.2
    }

    /// Number of particles placed by the last `compute()`
    pub fn n_points(&self) -> usize {
        self.n_points
    }

    pub fn is_populated(&self) -> bool {
        !self.links.is_empty()
    }

    /// Cell coordinates for a position (positions outside the box are wrapped)
    pub fn cell_coord(&self, pos: [f64; 3]) -> (usize, usize, usize) {
        let frac = self.sim_box.make_fractional(pos);
        let (nx, ny, nz) = self.cell_topo;
        let to_cell = |alpha: f64, n: usize| ((alpha * n as f64).floor() as isize).rem_euclid(n as isize) as usize;
        (to_cell(frac[0], nx), to_cell(frac[1], ny), to_cell(frac[2], nz))
    }

    /// Flat index of the cell containing a position
    pub fn cell_of(&self, pos: [f64; 3]) -> usize {
        let (nx, ny, _) = self.cell_topo;
        get_index_from_coords_3d!(self.cell_coord(pos), nx, ny)
    }

    /// Cell coordinates for a flat cell index
    pub fn cell_coord_of_index(&self, cell: usize) -> (usize, usize, usize) {
        let (nx, ny, _) = self.cell_topo;
        decompose_index_to_coords_3d!(cell, nx, ny)
    }

    /// Cells that have to be searched for neighbors of anything in `cell`
    pub fn cell_neighbors(&self, cell: usize) -> &[usize] {
        &self.cell_neighbors[cell]
    }

    /// Place all points into their cells.
    ///
    /// If the points live in a different box than the current one, the topology and
    /// the neighbor table are rebuilt first.
    pub fn compute<Q: NeighborQuery + ?Sized>(&mut self, points: &Q) -> Result<()> {
        if points.sim_box() != &self.sim_box {
            self.cell_topo = compute_cell_topology(points.sim_box(), self.cell_width)?;
            self.sim_box = points.sim_box().clone();
            self.cell_neighbors = compute_cell_neighbors(&self.sim_box, self.cell_topo);
            debug!("Box changed, new cell list topology {:?}", self.cell_topo);
        }
        let positions = points.points();
        if let Some((idx, p)) = positions.iter().enumerate().find(|(_, p)| p.iter().any(|x| !x.is_finite())) {
            return Err(invalid_argument!("Particle {} has a non-finite position {:?}", idx, p));
        }
        let n = positions.len();
        let mut links = vec![LINK_CELL_TERMINATOR; n + self.num_cells()];
        for (idx, p) in positions.iter().enumerate() {
            let head = n + self.cell_of(*p);
            links[idx] = links[head];
            links[head] = idx;
        }
        self.n_points = n;
        self.links = links;
        self.positions = positions.to_vec();
        Ok(())
    }

    /// Iterate over the particles in `cell`.
    ///
    /// Panics if the cell list has not been populated yet.
    pub fn iter_cell(&self, cell: usize) -> CellIter<'_> {
        assert!(self.is_populated(), "Cell list must be populated before iterating");
        assert!(cell < self.num_cells());
        CellIter::new(&self.links, self.n_points + cell)
    }

    /// Checked variant of [`CellList::iter_cell`]
    pub fn try_iter_cell(&self, cell: usize) -> Result<CellIter<'_>> {
        if !self.is_populated() {
            return Err(AnalysisError::NotPopulated.into());
        }
        if cell >= self.num_cells() {
            return Err(invalid_argument!("Cell index {} out of range ({} cells)", cell, self.num_cells()));
        }
        Ok(CellIter::new(&self.links, self.n_points + cell))
    }

    /// Indices of all particles closer than `r_cut` to `query` (minimum image).
    /// `r_cut` must not exceed the cell width.
    pub fn neighbors_within(&self, query: [f64; 3], r_cut: f64) -> Result<Vec<usize>> {
        if !self.is_populated() {
            return Err(AnalysisError::NotPopulated.into());
        }
        if !(r_cut > 0.0) || r_cut > self.cell_width {
            return Err(invalid_argument!("Query radius {} must be positive and not exceed the cell width {}",
                r_cut, self.cell_width));
        }
        let r_cut_sqr = r_cut * r_cut;
        let mut result = vec![];
        for &cell in self.cell_neighbors(self.cell_of(query)) {
            for idx in self.iter_cell(cell) {
                let p = self.positions[idx];
                let d = self.sim_box.wrap([p[0] - query[0], p[1] - query[1], p[2] - query[2]]);
                if d[0] * d[0] + d[1] * d[1] + d[2] * d[2] < r_cut_sqr {
                    result.push(idx);
                }
            }
        }
        result.sort_unstable();
        Ok(result)
    }
}

/// Lazy, restartable sequence of the particle indices in one cell
#[derive(Clone)]
pub struct CellIter<'a> {
    links: &'a [usize],
    cur_idx: usize,
}

impl<'a> CellIter<'a> {
    fn new(links: &'a [usize], head: usize) -> Self {
        Self { links, cur_idx: head }
    }

    /// Whether the last returned index was the terminator
    pub fn at_end(&self) -> bool {
        self.cur_idx == LINK_CELL_TERMINATOR
    }

    /// Advance without bounds checks and return the next index or [`LINK_CELL_TERMINATOR`]
    ///
    /// # Safety
    /// Must not be called again once it has returned [`LINK_CELL_TERMINATOR`]
    /// (i.e. while [`CellIter::at_end`] is true).
    #[inline(always)]
    pub unsafe fn next_unchecked(&mut self) -> usize {
        self.cur_idx = *self.links.get_unchecked(self.cur_idx);
        self.cur_idx
    }
}

impl<'a> Iterator for CellIter<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.at_end() {
            return None;
        }
        self.cur_idx = self.links[self.cur_idx];
        if self.at_end() { None } else { Some(self.cur_idx) }
    }
}

/// Number of cells per axis: `max(1, floor(L / w))`, a single layer along z for 2D boxes.
/// Fails if the total number of cells exceeds [`MAX_NUM_CELLS`].
fn compute_cell_topology(sim_box: &SimBox, cell_width: f64) -> Result<(usize, usize, usize)> {
    let n = Dim::iter()
        .map(|dim| {
            if dim == Dim::Z && sim_box.is_2d() {
                1
            }
            else {
                ((sim_box.length(dim) / cell_width).floor() as usize).max(1)
            }
        })
        .collect::<Vec<_>>();
    let num_cells = n[0].checked_mul(n[1])
        .and_then(|nxy| nxy.checked_mul(n[2]))
        .filter(|num_cells| *num_cells <= MAX_NUM_CELLS);
    if num_cells.is_none() {
        return Err(invalid_argument!("Cell width {} is too small for box {:?} ({:?} cells, at most {} allowed)",
            cell_width, sim_box.lengths(), (n[0], n[1], n[2]), MAX_NUM_CELLS));
    }
    Ok((n[0], n[1], n[2]))
}

/// Neighbor table: the deduplicated 3x3x3 (3x3 in 2D) stencil around each cell,
/// wrapped on periodic axes and clipped on aperiodic ones
fn compute_cell_neighbors(sim_box: &SimBox, cell_topo: (usize, usize, usize)) -> Vec<Vec<usize>> {
    let (nx, ny, nz) = cell_topo;
    let periodic = sim_box.periodic();
    let dz_range = if sim_box.is_2d() { 0..=0 } else { -1..=1 };
    // Correct under- and overflow of a neighbor coordinate (None if it falls off an aperiodic edge)
    let correct = |c: isize, n: usize, periodic: bool| -> Option<usize> {
        if periodic {
            Some(c.rem_euclid(n as isize) as usize)
        }
        else if c < 0 || c >= n as isize {
            None
        }
        else {
            Some(c as usize)
        }
    };
    (0..(nx * ny * nz)).into_par_iter()
        .map(|cell_idx: usize| {
            let (cx, cy, cz) = decompose_index_to_coords_3d!(cell_idx, nx, ny);
            let mut neighbors = Vec::with_capacity(27);
            for dz in dz_range.clone() {
                let Some(cz2) = correct(cz as isize + dz, nz, periodic[2]) else { continue };
                for dy in -1..=1isize {
                    let Some(cy2) = correct(cy as isize + dy, ny, periodic[1]) else { continue };
                    for dx in -1..=1isize {
                        let Some(cx2) = correct(cx as isize + dx, nx, periodic[0]) else { continue };
                        neighbors.push(get_index_from_coords_3d!((cx2, cy2, cz2), nx, ny));
                    }
                }
            }
            neighbors.sort_unstable();
            neighbors.dedup();
            neighbors
        })
        .collect()
}
