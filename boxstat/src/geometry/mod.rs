//! Structures related to the simulation box and the particles inside of it

mod points;
mod sim_box;

pub use points::*;
pub use sim_box::*;
