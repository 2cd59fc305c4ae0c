//! Diffraction analyses

mod builder;
mod debye;

pub use builder::*;
pub use debye::*;
