/// Level definitions: parsing, validation and the immutable `Level` value.
///
/// ## File format (`.level`):
///   ```text
///   <name>
///   <required collectables>   positive integer
///   <time limit in seconds>   positive integer
///   <grid row>
///   ...
///   ```
///
/// The editor path (`parse_grid`, `Level::from_editor`) takes grid rows only.
///
/// ## Tile legend (case-insensitive):
///   ' '/'A' = Empty    'D' = Dirt      'W' = Wall
///   'P' = Player       'X' = Exit      'G' = Grub (collectable)
///   'O' = Boulder      'F' = Fox (enemy)
///
/// Validation order: some rows → rectangular → one player → an exit.
/// A valid grid is wrapped in a one-cell wall border, so every level is
/// `(w + 2) x (h + 2)` and nothing can walk off the map.

use std::fmt;

use thiserror::Error;

use super::entity::Position;
use super::tile::TileKind;

/// Name used for levels built from editor text.
pub const EDITOR_LEVEL_NAME: &str = "Test";
/// Time limit used for levels built from editor text.
pub const EDITOR_TIME_LIMIT: u32 = 3600;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HeaderField {
    Name,
    Collectables,
    TimeLimit,
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HeaderField::Name => "level name",
            HeaderField::Collectables => "number of grubs",
            HeaderField::TimeLimit => "time limit",
        })
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum LevelError {
    #[error("missing {field} line")]
    MissingHeader { field: HeaderField },
    #[error("invalid {field}: {value:?} (expected a positive whole number)")]
    Parse { field: HeaderField, value: String },
    #[error("unknown type of object {ch:?} at row {row}, column {column}")]
    UnknownTileCharacter { ch: char, row: usize, column: usize },
    #[error("no level data")]
    NoLevelData,
    #[error("level data has to be in a rectangle shape (row {row} is {found} wide, expected {expected})")]
    Shape { row: usize, expected: usize, found: usize },
    #[error("level must have exactly one player (found {found})")]
    PlayerCount { found: usize },
    #[error("level must have at least one exit")]
    MissingExit,
}

/// A validated, wall-bordered tile grid. Rows are stored top row first, as
/// they appear in the level text.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<TileKind>,
}

impl Grid {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Tile at text row/column (row 0 is the top border).
    pub fn at_row(&self, row: usize, column: usize) -> Option<TileKind> {
        if row < self.height && column < self.width {
            Some(self.cells[row * self.width + column])
        } else {
            None
        }
    }

    /// Iterate `(row, column, kind)` in row-major text order.
    pub fn iter_rows(&self) -> impl Iterator<Item = (usize, usize, TileKind)> + '_ {
        let w = self.width;
        self.cells.iter().enumerate().map(move |(i, k)| (i / w, i % w, *k))
    }

    fn count(&self, kind: TileKind) -> usize {
        self.cells.iter().filter(|k| **k == kind).count()
    }
}

/// Parse and validate raw grid rows (no header). This is the editor path.
pub fn parse_grid(text: &str) -> Result<Grid, LevelError> {
    grid_from_lines(text.lines())
}

fn grid_from_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Result<Grid, LevelError> {
    let mut rows: Vec<Vec<TileKind>> = vec![];
    for line in lines {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            continue;
        }
        let row_no = rows.len() + 1;
        let row = line
            .chars()
            .enumerate()
            .map(|(i, ch)| {
                TileKind::from_glyph(ch).ok_or(LevelError::UnknownTileCharacter {
                    ch,
                    row: row_no,
                    column: i + 1,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(row);
    }

    let first = rows.first().ok_or(LevelError::NoLevelData)?;
    let width = first.len();
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
        return Err(LevelError::Shape { row: i + 1, expected: width, found: row.len() });
    }

    let grid = bordered(&rows, width);

    let players = grid.count(TileKind::Player);
    if players != 1 {
        return Err(LevelError::PlayerCount { found: players });
    }
    if grid.count(TileKind::ExitInactive) == 0 {
        return Err(LevelError::MissingExit);
    }

    Ok(grid)
}

fn bordered(rows: &[Vec<TileKind>], width: usize) -> Grid {
    let w = width + 2;
    let h = rows.len() + 2;
    let mut cells = Vec::with_capacity(w * h);
    cells.extend(std::iter::repeat(TileKind::Wall).take(w));
    for row in rows {
        cells.push(TileKind::Wall);
        cells.extend_from_slice(row);
        cells.push(TileKind::Wall);
    }
    cells.extend(std::iter::repeat(TileKind::Wall).take(w));
    Grid { width: w, height: h, cells }
}

fn parse_positive(field: HeaderField, line: Option<&str>) -> Result<u32, LevelError> {
    let raw = line.ok_or(LevelError::MissingHeader { field })?;
    let trimmed = raw.trim();
    match trimmed.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(LevelError::Parse { field, value: trimmed.to_string() }),
    }
}

/// An immutable, validated level.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Level {
    name: String,
    required_collectables: u32,
    max_time: u32,
    grid: Grid,
}

impl Level {
    pub fn new(name: impl Into<String>, required_collectables: u32, max_time: u32, grid: Grid) -> Self {
        Level {
            name: name.into(),
            required_collectables,
            max_time,
            grid,
        }
    }

    /// Parse a full level file (three header lines + grid).
    pub fn parse(text: &str) -> Result<Level, LevelError> {
        let mut lines = text.lines();
        let name = lines
            .next()
            .map(|l| l.trim_end_matches('\r').trim().to_string())
            .ok_or(LevelError::MissingHeader { field: HeaderField::Name })?;
        let required = parse_positive(HeaderField::Collectables, lines.next())?;
        let max_time = parse_positive(HeaderField::TimeLimit, lines.next())?;
        let grid = grid_from_lines(lines)?;
        Ok(Level::new(name, required, max_time, grid))
    }

    /// Build a test level from editor text and the editor's grub field.
    pub fn from_editor(text: &str, required: &str) -> Result<Level, LevelError> {
        let required = parse_positive(HeaderField::Collectables, Some(required))?;
        let grid = parse_grid(&text.to_ascii_uppercase())?;
        Ok(Level::new(EDITOR_LEVEL_NAME, required, EDITOR_TIME_LIMIT, grid))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn required_collectables(&self) -> u32 {
        self.required_collectables
    }

    /// Time limit in seconds.
    pub fn max_time(&self) -> u32 {
        self.max_time
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Bordered width.
    pub fn width(&self) -> usize {
        self.grid.width
    }

    /// Bordered height.
    pub fn height(&self) -> usize {
        self.grid.height
    }

    /// Convert a text row to an engine `y` (top row = highest `y`).
    pub fn row_to_y(&self, row: usize) -> i32 {
        (self.grid.height - 1 - row) as i32
    }

    /// Tile at engine coordinates. Outside the grid reads as wall.
    pub fn tile_at(&self, x: i32, y: i32) -> TileKind {
        if x < 0 || y < 0 {
            return TileKind::Wall;
        }
        let (x, y) = (x as usize, y as usize);
        if y >= self.grid.height {
            return TileKind::Wall;
        }
        self.grid.at_row(self.grid.height - 1 - y, x).unwrap_or(TileKind::Wall)
    }

    /// Player start in engine coordinates.
    pub fn spawn_position(&self) -> Position {
        self.grid
            .iter_rows()
            .find(|(_, _, k)| *k == TileKind::Player)
            .map(|(row, col, _)| Position::new(col as i32, self.row_to_y(row)))
            .unwrap_or_default()
    }
}
