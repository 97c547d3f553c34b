/// Entities: positioned, mutable instances of the dynamic tile kinds.
///
/// Coordinates are engine coordinates: `x` grows to the right, `y` grows
/// upward (the top row of a level file has the highest `y`).

use super::tile::TileKind;

/// Movement direction. Rotation order is Up → Right → Down → Left → Up.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Right, Direction::Down, Direction::Left];

    /// Unit step `(dx, dy)`.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, 1),
            Direction::Right => (1, 0),
            Direction::Down => (0, -1),
            Direction::Left => (-1, 0),
        }
    }

    /// 90° clockwise.
    pub fn clockwise(self) -> Direction {
        match self {
            Direction::Up => Direction::Right,
            Direction::Right => Direction::Down,
            Direction::Down => Direction::Left,
            Direction::Left => Direction::Up,
        }
    }

    /// 90° counter-clockwise.
    pub fn counter_clockwise(self) -> Direction {
        match self {
            Direction::Up => Direction::Left,
            Direction::Left => Direction::Down,
            Direction::Down => Direction::Right,
            Direction::Right => Direction::Up,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }

    pub fn step(self, dir: Direction) -> Position {
        let (dx, dy) = dir.delta();
        Position { x: self.x + dx, y: self.y + dy }
    }

    pub fn neighbors(self) -> [Position; 4] {
        Direction::ALL.map(|d| self.step(d))
    }
}

/// Stable handle to an entity. Ids are never reused within one load.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct EntityId(pub u32);

#[derive(Clone, Debug)]
pub struct Entity {
    pub id: EntityId,
    pub kind: TileKind,
    pub pos: Position,
    /// Enemy only: direction of the last successful move.
    pub last_move: Direction,
    /// Boulder only: moved during the previous gravity phase.
    pub falling: bool,
}

impl Entity {
    pub fn new(id: EntityId, kind: TileKind, pos: Position) -> Self {
        Entity {
            id,
            kind,
            pos,
            last_move: Direction::Up,
            falling: false,
        }
    }
}
