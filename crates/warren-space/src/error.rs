//! Error types for lattice construction and lookups.

use std::fmt;

use warren_core::Position;

/// Errors arising from lattice construction or position lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpaceError {
    /// Attempted to construct a lattice with zero cells.
    EmptyLattice,
    /// `width * height` does not fit in `usize`.
    TooLarge {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// A position lies outside the lattice.
    OutOfBounds {
        /// The offending position.
        position: Position,
        /// Lattice width.
        width: u32,
        /// Lattice height.
        height: u32,
    },
}

impl fmt::Display for SpaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyLattice => write!(f, "lattice must have at least one cell"),
            Self::TooLarge { width, height } => {
                write!(f, "lattice {width}x{height} has too many cells")
            }
            Self::OutOfBounds {
                position,
                width,
                height,
            } => write!(
                f,
                "position {position} out of bounds: [0, {width}) x [0, {height})"
            ),
        }
    }
}

impl std::error::Error for SpaceError {}
