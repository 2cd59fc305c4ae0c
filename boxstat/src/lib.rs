//! Spatial statistics of particle configurations in (partially) periodic boxes
//!
//! The crate is organised around a small shared substrate:
//! - [`geometry`]: box geometry, minimum-image wrapping and point access
//! - [`locality`]: linked cell lists with precomputed neighbor cells
//! - [`parallel`]: worker pools and thread-local accumulate-then-reduce storage
//!
//! On top of it sit two analyses, the Gaussian smeared density
//! ([`density::GaussianDensity`]) and the Debye static structure factor
//! ([`diffraction::StaticStructureFactorDebye`]).

pub mod density;
pub mod diffraction;
pub mod error;
pub mod geometry;
pub mod locality;
pub mod parallel;
pub mod utils;

pub use error::AnalysisError;
