//! parameters, sequence ids, fasta parsing and scratch files

pub mod files;
pub mod idsketch;
pub mod parameters;

pub use files::*;
pub use idsketch::*;
pub use parameters::*;
