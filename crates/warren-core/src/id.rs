//! Strongly-typed identifiers, grid positions and compass directions.

use std::fmt;

/// Largest id handed out to a mobile agent before the cursor wraps to 1.
///
/// Ids are reused once the agent that held them has died; two live
/// agents may briefly share an id when the population cap exceeds this
/// value.
pub const ID_CYCLE: u16 = 99;

/// Identifies a mobile agent.
///
/// `AgentId(0)` is reserved as the "no agent" sentinel and is never
/// issued by the population manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub u16);

impl AgentId {
    /// Sentinel meaning "no agent". Carried by messages that are not
    /// sent on behalf of a mobile agent.
    pub const NONE: AgentId = AgentId(0);

    /// Whether this id refers to an actual agent.
    pub fn is_some(self) -> bool {
        self != Self::NONE
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

impl From<u16> for AgentId {
    fn from(v: u16) -> Self {
        Self(v)
    }
}

/// Row-major identity index of a cell: `y * width + x`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellIndex(pub usize);

impl fmt::Display for CellIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for CellIndex {
    fn from(v: usize) -> Self {
        Self(v)
    }
}

/// A cell coordinate. `x` grows eastwards, `y` grows southwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl Position {
    /// Construct a position from its column and row.
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// The position one step in `dir`, or `None` when the step would
    /// leave the non-negative quadrant. Upper bounds are the lattice's
    /// concern.
    pub fn step(self, dir: Direction) -> Option<Position> {
        let (dx, dy) = dir.offset();
        let x = self.x.checked_add_signed(dx)?;
        let y = self.y.checked_add_signed(dy)?;
        Some(Position { x, y })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:2},{:2})", self.x, self.y)
    }
}

/// One of the four cardinal directions a move can take.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Towards row 0.
    North,
    /// Away from row 0.
    South,
    /// Away from column 0.
    East,
    /// Towards column 0.
    West,
}

impl Direction {
    /// All directions, in link-slot order.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// `(dx, dy)` for one step in this direction.
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }

    /// Slot of this direction in a `[_; 4]` link table.
    pub const fn slot(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::South => 1,
            Direction::East => 2,
            Direction::West => 3,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Direction::North => "N",
            Direction::South => "S",
            Direction::East => "E",
            Direction::West => "W",
        };
        f.write_str(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn none_sentinel_is_zero() {
        assert_eq!(AgentId::NONE, AgentId(0));
        assert!(!AgentId::NONE.is_some());
        assert!(AgentId(1).is_some());
    }

    #[test]
    fn agent_id_displays_two_digits() {
        assert_eq!(AgentId(7).to_string(), "07");
        assert_eq!(AgentId(42).to_string(), "42");
    }

    #[test]
    fn step_follows_offsets() {
        let p = Position::new(2, 2);
        assert_eq!(p.step(Direction::North), Some(Position::new(2, 1)));
        assert_eq!(p.step(Direction::South), Some(Position::new(2, 3)));
        assert_eq!(p.step(Direction::East), Some(Position::new(3, 2)));
        assert_eq!(p.step(Direction::West), Some(Position::new(1, 2)));
    }

    #[test]
    fn step_off_origin_is_none() {
        let origin = Position::new(0, 0);
        assert_eq!(origin.step(Direction::North), None);
        assert_eq!(origin.step(Direction::West), None);
    }

    #[test]
    fn slots_are_distinct() {
        let mut seen = [false; 4];
        for dir in Direction::ALL {
            assert!(!seen[dir.slot()]);
            seen[dir.slot()] = true;
        }
    }

    proptest! {
        #[test]
        fn step_moves_by_offset_or_refuses(x in 0u32..1000, y in 0u32..1000, i in 0usize..4) {
            let dir = Direction::ALL[i];
            let (dx, dy) = dir.offset();
            let (tx, ty) = (i64::from(x) + i64::from(dx), i64::from(y) + i64::from(dy));
            match Position::new(x, y).step(dir) {
                Some(p) => prop_assert_eq!((i64::from(p.x), i64::from(p.y)), (tx, ty)),
                None => prop_assert!(tx < 0 || ty < 0),
            }
        }

        #[test]
        fn all_is_in_slot_order(i in 0usize..4) {
            prop_assert_eq!(Direction::ALL[i].slot(), i);
        }

        #[test]
        fn issued_ids_render_as_two_digits(n in 1u16..=ID_CYCLE) {
            let shown = AgentId(n).to_string();
            prop_assert_eq!(shown.len(), 2);
            prop_assert_eq!(shown.parse::<u16>().unwrap(), n);
        }
    }
}
