//! Regularly spaced histogram axis

use anyhow::Result;

use crate::error::invalid_argument;

/// An axis of `bins` equally sized bins spanning `[min, max)`
#[derive(Clone, Debug, PartialEq)]
pub struct RegularAxis {
    bins: usize,
    min: f64,
    max: f64,
    bin_size: f64,
}

impl RegularAxis {
    pub fn new(bins: usize, min: f64, max: f64) -> Result<Self> {
        if bins == 0 {
            return Err(invalid_argument!("Axis requires a nonzero number of bins"));
        }
        if !(max > min) {
            return Err(invalid_argument!("Axis requires max ({}) to be greater than min ({})", max, min));
        }
        Ok(Self {
            bins, min, max,
            bin_size: (max - min) / bins as f64
        })
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// All `bins + 1` bin boundaries
    pub fn bin_edges(&self) -> Vec<f64> {
        (0..=self.bins)
            .map(|i| self.min + i as f64 * self.bin_size)
            .collect()
    }

    pub fn bin_centers(&self) -> Vec<f64> {
        (0..self.bins)
            .map(|i| self.min + (i as f64 + 0.5) * self.bin_size)
            .collect()
    }

    /// Bin containing `x` or `None` if `x` lies outside of `[min, max)`
    pub fn bin_of(&self, x: f64) -> Option<usize> {
        if !(x >= self.min && x < self.max) {
            return None;
        }
        let bin = ((x - self.min) / self.bin_size).floor() as usize;
        // Guard against rounding right below max
        Some(bin.min(self.bins - 1))
    }
}
