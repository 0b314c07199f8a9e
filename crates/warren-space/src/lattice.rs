//! Bounded 2D lattice with a 4-connected neighbourhood (N/S/E/W).

use smallvec::SmallVec;
use warren_core::{CellIndex, Direction, Position};

use crate::error::SpaceError;

/// Per-direction neighbour table, indexed by [`Direction::slot`].
/// `None` marks an off-grid direction.
pub type Links = [Option<Position>; 4];

/// A `width x height` grid of cells.
///
/// Cell `(x, y)` has identity index `y * width + x`. Edges absorb: a
/// corner cell has two neighbours, an edge cell three, an interior cell
/// four.
///
/// # Examples
///
/// ```
/// use warren_core::{Direction, Position};
/// use warren_space::Lattice;
///
/// let lattice = Lattice::new(3, 2).unwrap();
/// assert_eq!(lattice.cell_count(), 6);
/// assert_eq!(lattice.index(Position::new(2, 1)).unwrap().0, 5);
/// assert_eq!(lattice.neighbour(Position::new(0, 0), Direction::West), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lattice {
    width: u32,
    height: u32,
}

impl Lattice {
    /// Create a lattice. Both dimensions must be non-zero.
    pub fn new(width: u32, height: u32) -> Result<Self, SpaceError> {
        if width == 0 || height == 0 {
            return Err(SpaceError::EmptyLattice);
        }
        if (width as usize).checked_mul(height as usize).is_none() {
            return Err(SpaceError::TooLarge { width, height });
        }
        Ok(Self { width, height })
    }

    /// Number of columns.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Whether `pos` lies on the lattice.
    pub fn contains(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    /// Identity index of `pos`.
    pub fn index(&self, pos: Position) -> Result<CellIndex, SpaceError> {
        if !self.contains(pos) {
            return Err(self.out_of_bounds(pos));
        }
        Ok(CellIndex(
            (pos.y as usize) * (self.width as usize) + pos.x as usize,
        ))
    }

    /// Inverse of [`index`](Self::index).
    pub fn position(&self, index: CellIndex) -> Option<Position> {
        if index.0 >= self.cell_count() {
            return None;
        }
        let w = self.width as usize;
        Some(Position::new((index.0 % w) as u32, (index.0 / w) as u32))
    }

    /// The neighbour of `pos` in `dir`, or `None` if that step leaves
    /// the lattice (or `pos` itself is off-lattice).
    pub fn neighbour(&self, pos: Position, dir: Direction) -> Option<Position> {
        if !self.contains(pos) {
            return None;
        }
        pos.step(dir).filter(|p| self.contains(*p))
    }

    /// Full link table for `pos`.
    pub fn links(&self, pos: Position) -> Links {
        let mut links = [None; 4];
        for dir in Direction::ALL {
            links[dir.slot()] = self.neighbour(pos, dir);
        }
        links
    }

    /// On-lattice neighbours of `pos` with the direction leading to each,
    /// in [`Direction::ALL`] order.
    pub fn neighbours(&self, pos: Position) -> SmallVec<[(Direction, Position); 4]> {
        let links = self.links(pos);
        Direction::ALL
            .into_iter()
            .filter_map(|dir| links[dir.slot()].map(|p| (dir, p)))
            .collect()
    }

    /// Every position in identity-index order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Position::new(x, y)))
    }

    fn out_of_bounds(&self, position: Position) -> SpaceError {
        SpaceError::OutOfBounds {
            position,
            width: self.width,
            height: self.height,
        }
    }
}
