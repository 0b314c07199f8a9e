//! Lattice topology for Warren simulations.
//!
//! A [`Lattice`] is the immutable shape of the grid: its bounds, the
//! row-major identity index of every cell, and the directional links
//! between 4-connected neighbours. Boundary cells simply lack links in
//! off-grid directions. The engine wires channels onto this shape once
//! at startup.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod lattice;

pub use error::SpaceError;
pub use lattice::{Lattice, Links};
