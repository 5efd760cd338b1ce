//! Report rendering for the terminal front-end.

pub mod generator;

pub use generator::*;
