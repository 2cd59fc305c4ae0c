//! Small numerical helpers shared by the analyses

mod axis;
mod math;

pub use axis::*;
pub use math::*;
