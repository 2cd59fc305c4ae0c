//! Builder for `StaticStructureFactorDebye`

use anyhow::Result;

use crate::parallel::default_num_workers;

use super::StaticStructureFactorDebye;

/// Builder for [`StaticStructureFactorDebye`] with default values
pub struct StructureFactorBuilder {
    bins: usize,
    k_max: f64,
    k_min: f64,
    num_workers: usize,
}

impl StructureFactorBuilder {
    /// Histogram of `bins` bins over `[0, k_max)`
    pub fn new(bins: usize, k_max: f64) -> Self {
        Self {
            bins, k_max,
            k_min: 0.0,
            num_workers: default_num_workers()
        }
    }

    /// Lower end of the k histogram (default: 0)
    pub fn with_k_min(mut self, k_min: f64) -> Self {
        self.k_min = k_min;
        self
    }

    pub fn with_num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    pub fn build(self) -> Result<StaticStructureFactorDebye> {
        StaticStructureFactorDebye::with_workers(self.bins, self.k_max, self.k_min, self.num_workers)
    }
}
