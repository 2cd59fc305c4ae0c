//! Builder for `GaussianDensity`

use anyhow::Result;

use crate::parallel::default_num_workers;

use super::GaussianDensity;

/// Builder for [`GaussianDensity`] with default values
pub struct GaussianDensityBuilder {
    width: (usize, usize, usize),
    r_max: f64,
    sigma: f64,
    num_workers: usize,
}

impl GaussianDensityBuilder {
    pub fn new(width: (usize, usize, usize), r_max: f64, sigma: f64) -> Self {
        Self {
            width, r_max, sigma,
            num_workers: default_num_workers()
        }
    }

    /// Same grid resolution along all three axes
    pub fn cubic(width: usize, r_max: f64, sigma: f64) -> Self {
        Self::new((width, width, width), r_max, sigma)
    }

    pub fn with_num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    pub fn build(self) -> Result<GaussianDensity> {
        GaussianDensity::with_workers(self.width, self.r_max, self.sigma, self.num_workers)
    }
}
