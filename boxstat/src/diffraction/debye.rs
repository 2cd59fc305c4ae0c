//! Static structure factor from the Debye scattering equation
//!
//! `S(k) = 1/N * sum_ij sinc(k r_ij)` is evaluated at the center of every k bin for
//! all pairs between the reference and the query points, then averaged over frames.

use std::f64::consts::PI;

use anyhow::Result;
use log::{debug, warn};
use ndarray::{Array1, ArrayView1};
use strum_macros::Display;

use crate::error::invalid_argument;
use crate::geometry::NeighborQuery;
use crate::parallel::{default_num_workers, ThreadStorage, WorkerPool};
use crate::utils::{next_below, sinc, RegularAxis};

/// Lifecycle of a structure factor computation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum AccumulationState {
    /// No frame accumulated yet
    Configured,
    /// Frames were accumulated since the last `reduce()`
    Accumulating,
    /// `structure_factor()` reflects all accumulated frames
    Reduced,
}

pub struct StaticStructureFactorDebye {
    /// Axis of k bins
    k_axis: RegularAxis,
    /// Cached bin centers of `k_axis`
    k_bin_centers: Vec<f64>,
    /// Per-worker histograms, kept across frames until re-construction
    local_histograms: ThreadStorage<f64>,
    /// Result of the last `reduce()`
    structure_factor: Array1<f64>,
    /// Smallest k for which all accumulated frames give meaningful results
    min_valid_k: f64,
    frame_counter: usize,
    state: AccumulationState,
    pool: WorkerPool,
}

impl StaticStructureFactorDebye {
    pub fn new(bins: usize, k_max: f64, k_min: f64) -> Result<Self> {
        Self::with_workers(bins, k_max, k_min, default_num_workers())
    }

    pub fn with_workers(bins: usize, k_max: f64, k_min: f64, num_workers: usize) -> Result<Self> {
        if bins == 0 {
            return Err(invalid_argument!("StaticStructureFactorDebye requires a nonzero number of bins"));
        }
        if !(k_max > 0.0) {
            return Err(invalid_argument!("StaticStructureFactorDebye requires k_max to be positive, got {}", k_max));
        }
        if !(k_min >= 0.0) {
            return Err(invalid_argument!("StaticStructureFactorDebye requires k_min to be non-negative, got {}", k_min));
        }
        if k_max <= k_min {
            return Err(invalid_argument!("StaticStructureFactorDebye requires that k_max ({}) must be greater than k_min ({})",
                k_max, k_min));
        }
        if !k_max.is_finite() {
            return Err(invalid_argument!("StaticStructureFactorDebye requires a finite k_max"));
        }
        let pool = WorkerPool::new(num_workers)?;
        let k_axis = RegularAxis::new(bins, k_min, k_max)?;
        Ok(Self {
            k_bin_centers: k_axis.bin_centers(),
            k_axis,
            local_histograms: ThreadStorage::new(bins, pool.num_workers()),
            structure_factor: Array1::zeros(bins),
            min_valid_k: f64::INFINITY,
            frame_counter: 0,
            state: AccumulationState::Configured,
            pool,
        })
    }

    pub fn bins(&self) -> usize {
        self.k_axis.bins()
    }

    pub fn k_min(&self) -> f64 {
        self.k_axis.min()
    }

    pub fn k_max(&self) -> f64 {
        self.k_axis.max()
    }

    pub fn bin_centers(&self) -> &[f64] {
        &self.k_bin_centers
    }

    pub fn bin_edges(&self) -> Vec<f64> {
        self.k_axis.bin_edges()
    }

    /// Smallest physically meaningful k over all accumulated frames
    /// (infinite before the first frame)
    pub fn min_valid_k(&self) -> f64 {
        self.min_valid_k
    }

    pub fn frame_count(&self) -> usize {
        self.frame_counter
    }

    pub fn state(&self) -> AccumulationState {
        self.state
    }

    /// Structure factor as of the last `reduce()` (zeros before that)
    pub fn structure_factor(&self) -> ArrayView1<'_, f64> {
        self.structure_factor.view()
    }

    /// Fold one frame into the per-worker histograms.
    ///
    /// `points` are the reference points (and provide the box), every bin receives
    /// the sum over all reference/query pairs divided by `normalization_count`.
    pub fn accumulate<Q: NeighborQuery + ?Sized>(&mut self, points: &Q, query_points: &[[f64; 3]],
        normalization_count: usize) -> Result<()>
    {
        if normalization_count == 0 {
            return Err(invalid_argument!("StaticStructureFactorDebye requires a nonzero normalization count"));
        }
        let sim_box = points.sim_box();

        // Largest distance free of images at exactly half the box length
        let r_max = next_below(0.5 * sim_box.min_side_length());
        // k_min of validity is 4 pi / L = 2 pi / r_max for the smallest side length L
        let frame_min_valid_k = 2.0 * PI / r_max;
        self.min_valid_k = self.min_valid_k.min(frame_min_valid_k);
        debug!("Frame {}: validity floor k = {}, tracked minimum {}",
            self.frame_counter, frame_min_valid_k, self.min_valid_k);

        let distances = self.pool.install(|| sim_box.compute_all_distances(points.points(), query_points))?;
        let distances = distances.as_slice()
            .ok_or_else(|| anyhow::anyhow!("Distance matrix is not contiguous"))?;

        let k_bin_centers = &self.k_bin_centers;
        let normalization = normalization_count as f64;
        // Parallel over k so that every bin is written by a single worker
        self.pool.for_each_partition(self.k_axis.bins(), &mut self.local_histograms, |range, histogram| {
            for k_index in range.to_range() {
                let k = k_bin_centers[k_index];
                let s_k = distances.iter()
                    .map(|distance| sinc(k * distance))
                    .sum::<f64>();
                histogram[k_index] += s_k / normalization;
            }
        });
        self.frame_counter += 1;
        self.state = AccumulationState::Accumulating;
        Ok(())
    }

    /// Merge the per-worker histograms into `structure_factor()`, averaged over frames.
    ///
    /// May be called between frames; accumulation can continue afterwards.
    pub fn reduce(&mut self) {
        let mut structure_factor = vec![0.0; self.k_axis.bins()];
        self.local_histograms.reduce_into(&mut structure_factor);
        if self.frame_counter > 1 {
            let frames = self.frame_counter as f64;
            structure_factor.iter_mut().for_each(|s| *s /= frames);
        }
        self.structure_factor = Array1::from(structure_factor);
        if self.frame_counter == 0 {
            return;
        }
        self.state = AccumulationState::Reduced;
        if self.k_min() < self.min_valid_k {
            warn!("Structure factor requested down to k = {} but only k >= {} is valid for the accumulated boxes",
                self.k_min(), self.min_valid_k);
        }
    }
}
