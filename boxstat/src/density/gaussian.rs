//! Gaussian smeared density on a regular grid

use std::{f64::consts::PI, ops::Range};

use anyhow::Result;
use log::{debug, warn};
use ndarray::{Array3, ArrayView3};

use crate::error::invalid_argument;
use crate::geometry::{NeighborQuery, SimBox};
use crate::parallel::{default_num_workers, ThreadStorage, WorkerPool};

/// Every particle is smeared onto all grid cells whose center lies within `r_max`
/// (minimum image) by adding `A * exp(-r^2 / (2 sigma^2))`.
///
/// `A = sqrt(1 / (2 pi sigma^2))` is the one-dimensional Gaussian normalization, also
/// for 2D and 3D grids. The grid is therefore not a probability density: a single
/// particle integrates to `A * (2 pi sigma^2)^(d/2)`. This convention is kept on purpose
/// so results stay comparable with established tooling.
pub struct GaussianDensity {
    /// Grid resolution along x, y and z
    width: (usize, usize, usize),
    r_max: f64,
    sigma: f64,
    /// Box of the last computed frame
    sim_box: Option<SimBox>,
    /// Result of the last `compute()` (z extent is 1 for 2D boxes)
    density: Array3<f64>,
    pool: WorkerPool,
}

impl GaussianDensity {
    pub fn new(width: (usize, usize, usize), r_max: f64, sigma: f64) -> Result<Self> {
        Self::with_workers(width, r_max, sigma, default_num_workers())
    }

    pub fn with_workers(width: (usize, usize, usize), r_max: f64, sigma: f64, num_workers: usize) -> Result<Self> {
        if !(r_max > 0.0) || !r_max.is_finite() {
            return Err(invalid_argument!("GaussianDensity requires r_max to be positive, got {}", r_max));
        }
        if !(sigma > 0.0) || !sigma.is_finite() {
            return Err(invalid_argument!("GaussianDensity requires sigma to be positive, got {}", sigma));
        }
        if width.0 == 0 || width.1 == 0 || width.2 == 0 {
            return Err(invalid_argument!("GaussianDensity requires a nonzero grid width, got {:?}", width));
        }
        if width.0.checked_mul(width.1).and_then(|n| n.checked_mul(width.2)).is_none() {
            return Err(invalid_argument!("GaussianDensity grid width {:?} has too many bins", width));
        }
        Ok(Self {
            width, r_max, sigma,
            sim_box: None,
            density: Array3::zeros(width),
            pool: WorkerPool::new(num_workers)?,
        })
    }

    /// Configured grid resolution
    pub fn width(&self) -> (usize, usize, usize) {
        self.width
    }

    pub fn r_max(&self) -> f64 {
        self.r_max
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Prefactor `A` of every Gaussian contribution
    pub fn normalization(&self) -> f64 {
        (1.0 / (2.0 * PI * self.sigma * self.sigma)).sqrt()
    }

    /// Box of the most recent frame (`None` before the first `compute()`)
    pub fn sim_box(&self) -> Option<&SimBox> {
        self.sim_box.as_ref()
    }

    /// Density of the most recent frame
    pub fn density(&self) -> ArrayView3<'_, f64> {
        self.density.view()
    }

    /// Compute the density for one frame, replacing the previous result
    pub fn compute<Q: NeighborQuery + ?Sized>(&mut self, points: &Q) -> Result<()> {
        let sim_box = points.sim_box().clone();
        let positions = points.points();
        if let Some((idx, p)) = positions.iter().enumerate().find(|(_, p)| p.iter().any(|x| !x.is_finite())) {
            return Err(invalid_argument!("Particle {} has a non-finite position {:?}", idx, p));
        }

        let is_2d = sim_box.is_2d();
        let (wx, wy, wz) = if is_2d { (self.width.0, self.width.1, 1) } else { self.width };
        let [lx, ly, lz] = sim_box.lengths();
        let periodic = sim_box.periodic();

        let grid_size_x = lx / wx as f64;
        let grid_size_y = ly / wy as f64;
        let grid_size_z = if is_2d { 0.0 } else { lz / wz as f64 };

        // Number of bins within r_max along each axis, never more than the grid holds
        let bin_cut = |grid_size: f64, w: usize| ((self.r_max / grid_size).floor() as isize).min(w as isize);
        let bin_cut_x = bin_cut(grid_size_x, wx);
        let bin_cut_y = bin_cut(grid_size_y, wy);
        let bin_cut_z = if is_2d { 0 } else { bin_cut(grid_size_z, wz) };
        debug!("GaussianDensity grid {:?} with spacing ({}, {}, {}) and bin cutoff ({}, {}, {})",
            (wx, wy, wz), grid_size_x, grid_size_y, grid_size_z, bin_cut_x, bin_cut_y, bin_cut_z);
        for (axis, cut, w, periodic) in [("x", bin_cut_x, wx, periodic[0]), ("y", bin_cut_y, wy, periodic[1]),
            ("z", bin_cut_z, wz, periodic[2])] {
            if periodic && 2 * cut + 1 > w as isize {
                warn!("GaussianDensity cutoff {} spans the whole periodic box along {}", self.r_max, axis);
            }
        }

        let r_max_sqr = self.r_max * self.r_max;
        let sigma_sqr = self.sigma * self.sigma;
        let a = self.normalization();

        let mut local_bin_counts = ThreadStorage::<f64>::new(wx * wy * wz, self.pool.num_workers());
        let sim_box_ref = &sim_box;
        self.pool.for_each_partition(positions.len(), &mut local_bin_counts, |range, grid| {
            for idx in range.to_range() {
                // Canonical image on periodic axes keeps the home bin inside the grid
                let p = sim_box_ref.wrap_position(positions[idx]);
                // Find which bin the particle is in (2D: only the z=0 plane)
                let bin_x = ((p[0] + lx / 2.0) / grid_size_x).floor() as isize;
                let bin_y = ((p[1] + ly / 2.0) / grid_size_y).floor() as isize;
                let bin_z = if is_2d { 0 } else { ((p[2] + lz / 2.0) / grid_size_z).floor() as isize };

                for k in candidate_bins(bin_z, bin_cut_z, wz, periodic[2]) {
                    let dz = if is_2d { 0.0 } else { (grid_size_z * k as f64 + grid_size_z / 2.0) - p[2] - lz / 2.0 };
                    for j in candidate_bins(bin_y, bin_cut_y, wy, periodic[1]) {
                        let dy = (grid_size_y * j as f64 + grid_size_y / 2.0) - p[1] - ly / 2.0;
                        for i in candidate_bins(bin_x, bin_cut_x, wx, periodic[0]) {
                            let dx = (grid_size_x * i as f64 + grid_size_x / 2.0) - p[0] - lx / 2.0;
                            // Distance from the particle to the grid cell center
                            let delta = sim_box_ref.wrap([dx, dy, dz]);
                            let r_sqr = delta[0] * delta[0] + delta[1] * delta[1] + delta[2] * delta[2];
                            if r_sqr < r_max_sqr {
                                let gaussian = a * (-r_sqr / (2.0 * sigma_sqr)).exp();
                                // Out of range indices on periodic axes, i.e. bin -1 is bin w-1
                                let ni = i.rem_euclid(wx as isize) as usize;
                                let nj = j.rem_euclid(wy as isize) as usize;
                                let nk = k.rem_euclid(wz as isize) as usize;
                                grid[(ni * wy + nj) * wz + nk] += gaussian;
                            }
                        }
                    }
                }
            }
        });

        let mut density = vec![0.0; wx * wy * wz];
        local_bin_counts.reduce_into(&mut density);
        self.density = Array3::from_shape_vec((wx, wy, wz), density)?;
        self.sim_box = Some(sim_box);
        Ok(())
    }
}

/// Unwrapped candidate bin indices around `home` along one axis.
///
/// Aperiodic axes drop bins outside of `[0, w)`. Periodic axes keep at most `w`
/// consecutive bins so that no grid cell is visited twice.
fn candidate_bins(home: isize, cut: isize, w: usize, periodic: bool) -> Range<isize> {
    let lo = home.saturating_sub(cut);
    if periodic {
        let count = (2 * cut + 1).min(w as isize);
        lo..lo.saturating_add(count)
    }
    else {
        lo.max(0)..home.saturating_add(cut).saturating_add(1).min(w as isize)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::Points;
    use crate::AnalysisError;

    fn single_particle_density(sim_box: SimBox, p: [f64; 3], width: (usize, usize, usize), r_max: f64, sigma: f64) -> Array3<f64> {
        let positions = [p];
        let points = Points::new(sim_box, &positions).unwrap();
        let mut gd = GaussianDensity::with_workers(width, r_max, sigma, 2).unwrap();
        gd.compute(&points).unwrap();
        gd.density().to_owned()
    }

    #[test]
    fn test_rejects_bad_configuration() {
        for (width, r_max, sigma) in [((10, 10, 10), 0.0, 1.0), ((10, 10, 10), -1.0, 1.0),
            ((10, 10, 10), 1.0, 0.0), ((10, 10, 10), 1.0, -2.0), ((0, 10, 10), 1.0, 1.0),
            ((usize::MAX, 2, 1), 1.0, 1.0)] {
            let err = GaussianDensity::new(width, r_max, sigma).err().unwrap();
            assert!(matches!(err.downcast_ref::<AnalysisError>(), Some(AnalysisError::InvalidArgument(_))));
        }
        assert!(GaussianDensity::with_workers((2, 2, 2), 1.0, 1.0, 0).is_err());
    }

    #[test]
    fn test_candidate_bins() {
        assert_eq!(candidate_bins(5, 2, 10, true), 3..8);
        assert_eq!(candidate_bins(0, 2, 10, true), -2..3);
        assert_eq!(candidate_bins(5, 7, 10, true), -2..8);
        assert_eq!(candidate_bins(0, 2, 10, false), 0..3);
        assert_eq!(candidate_bins(9, 2, 10, false), 7..10);
        assert!(candidate_bins(20, 2, 10, false).is_empty());
    }

    #[test]
    fn test_single_particle_at_origin() {
        let density = single_particle_density(SimBox::cube(10.0).unwrap(), [0.0; 3], (10, 10, 10), 2.0, 1.0);
        let a = (1.0 / (2.0 * PI)).sqrt();
        // The particle sits on the corner shared by bins 4 and 5 along every axis
        let expected = a * (-0.75f64 / 2.0).exp();
        assert!((density[[5, 5, 5]] - expected).abs() < 1e-12);
        let max = density.iter().cloned().fold(f64::MIN, f64::max);
        assert!((max - density[[5, 5, 5]]).abs() < 1e-12);
        assert!(density[[5, 5, 5]] < a);
        for ((i, j, k), value) in density.indexed_iter() {
            let center = [i as f64 - 4.5, j as f64 - 4.5, k as f64 - 4.5];
            let r = (center[0].powi(2) + center[1].powi(2) + center[2].powi(2)).sqrt();
            if r >= 2.0 {
                assert_eq!(*value, 0.0, "bin {:?} should be empty", (i, j, k));
            }
            else {
                assert!(*value > 0.0);
            }
        }
        assert_eq!(density[[0, 0, 0]], 0.0);
    }

    #[test]
    fn test_2d_grid_is_flat() {
        let sim_box = SimBox::new_2d(10.0, 10.0).unwrap();
        let density = single_particle_density(sim_box, [1.0, -2.0, 0.0], (20, 20, 20), 3.0, 1.0);
        assert_eq!(density.dim(), (20, 20, 1));
        let a = (1.0 / (2.0 * PI)).sqrt();
        // Bin (12, 6) has its center 0.25 away from the particle along both axes
        let expected = a * (-(0.25f64.powi(2) * 2.0) / 2.0).exp();
        assert!((density[[12, 6, 0]] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_periodic_wrap_invariance() {
        let sim_box = SimBox::cube(10.0).unwrap();
        let d1 = single_particle_density(sim_box.clone(), [4.7, 0.3, -4.9], (20, 20, 20), 2.5, 0.8);
        let d2 = single_particle_density(sim_box.clone(), [4.7 - 10.0, 0.3, -4.9 + 10.0], (20, 20, 20), 2.5, 0.8);
        let d3 = single_particle_density(sim_box, [4.7 + 20.0, 0.3 - 10.0, -4.9], (20, 20, 20), 2.5, 0.8);
        for ((a, b), c) in d1.iter().zip(d2.iter()).zip(d3.iter()) {
            assert!((a - b).abs() < 1e-12);
            assert!((a - c).abs() < 1e-12);
        }
        assert!((d1.sum() - d2.sum()).abs() < 1e-10);
    }

    #[test]
    fn test_mass_3d() {
        let sigma: f64 = 1.0;
        let density = single_particle_density(SimBox::cube(20.0).unwrap(), [0.3, -0.2, 0.1], (80, 80, 80), 6.0, sigma);
        let bin_volume = 0.25f64.powi(3);
        // 1D normalization applied in 3D leaves a factor of 2 pi sigma^2
        let mass = density.sum() * bin_volume / (2.0 * PI * sigma * sigma);
        assert!((mass - 1.0).abs() < 1e-3, "mass = {}", mass);
    }

    #[test]
    fn test_mass_2d() {
        let sigma: f64 = 0.7;
        let sim_box = SimBox::new_2d(20.0, 20.0).unwrap();
        let density = single_particle_density(sim_box, [1.1, 2.2, 0.0], (100, 100, 1), 5.0, sigma);
        let bin_area = 0.2 * 0.2;
        let mass = density.sum() * bin_area / (2.0 * PI * sigma * sigma).sqrt();
        assert!((mass - 1.0).abs() < 1e-3, "mass = {}", mass);
    }

    #[test]
    fn test_cutoff_spanning_box_counts_each_bin_once() {
        let sigma: f64 = 0.3;
        let density = single_particle_density(SimBox::cube(4.0).unwrap(), [0.05, 0.0, 0.0], (40, 40, 40), 10.0, sigma);
        // Every bin is within the cutoff, so none is empty
        assert!(density.iter().all(|x| *x > 0.0));
        let mass = density.sum() * 0.1f64.powi(3) / (2.0 * PI * sigma * sigma);
        assert!((mass - 1.0).abs() < 1e-3, "mass = {}", mass);
    }

    #[test]
    fn test_huge_cutoff_is_capped_by_grid() {
        let p = [0.3, -0.2, 0.1];
        let spanning = single_particle_density(SimBox::cube(10.0).unwrap(), p, (10, 10, 10), 100.0, 1.0);
        let huge = single_particle_density(SimBox::cube(10.0).unwrap(), p, (10, 10, 10), 1e19, 1.0);
        assert!(huge.iter().all(|x| *x > 0.0));
        for (a, b) in spanning.iter().zip(huge.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
        let mass = huge.sum() / (2.0 * PI);
        assert!((mass - 1.0).abs() < 1e-3, "mass = {}", mass);
        // Open axes clip the window instead of wrapping it
        let open = SimBox::cube(10.0).unwrap().with_periodic([false; 3]);
        let huge_open = single_particle_density(open, p, (10, 10, 10), 1e19, 1.0);
        assert!(huge_open.iter().all(|x| *x > 0.0));
        assert!(huge_open.sum() < huge.sum());
    }

    #[test]
    fn test_aperiodic_edge_loses_mass() {
        let periodic = SimBox::cube(10.0).unwrap();
        let open = SimBox::cube(10.0).unwrap().with_periodic([false, true, true]);
        let p = [4.8, 0.0, 0.0];
        let d_periodic = single_particle_density(periodic, p, (20, 20, 20), 3.0, 1.0);
        let d_open = single_particle_density(open, p, (20, 20, 20), 3.0, 1.0);
        assert!(d_open.sum() < d_periodic.sum());
        // Nothing leaks to the opposite side of the open axis
        assert_eq!(d_open[[0, 10, 10]], 0.0);
        assert!(d_periodic[[0, 10, 10]] > 0.0);
    }

    #[test]
    fn test_compute_overwrites_previous_frame() {
        let sim_box = SimBox::cube(10.0).unwrap();
        let mut gd = GaussianDensity::with_workers((10, 10, 10), 2.0, 1.0, 3).unwrap();
        assert!(gd.sim_box().is_none());
        let first = [[0.0, 0.0, 0.0], [3.0, 3.0, 3.0]];
        gd.compute(&Points::new(sim_box.clone(), &first).unwrap()).unwrap();
        let two = gd.density().sum();
        let second = [[0.0, 0.0, 0.0]];
        gd.compute(&Points::new(sim_box.clone(), &second).unwrap()).unwrap();
        let one = gd.density().sum();
        assert!((two - 2.0 * one).abs() < 1e-10);
        assert_eq!(gd.sim_box(), Some(&sim_box));
    }
}
