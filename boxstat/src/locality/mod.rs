//! Components related to spatial partitioning of particles

mod cell_list;

pub use cell_list::*;
