//! Density estimates on regular grids

mod builder;
mod gaussian;

pub use builder::*;
pub use gaussian::*;
