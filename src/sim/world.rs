/// World: the live entity set of one loaded level.
///
/// ## Layers
///
/// Two layers, composed at query time:
///   - `level`     : the validated level as loaded. **Never mutated.** Only
///                   its walls are read back; every dynamic tile became an
///                   entity at load.
///   - `entities`  : everything that moves, gets eaten or changes kind.
///
/// `occupancy[y * width + x]` mirrors entity positions for O(1) cell
/// lookup. All position changes go through `move_entity` / `remove_entity`
/// so the two never disagree, and no two entities ever share a cell.
///
/// `kind_at` is the single occupancy query the rules use: a wall cell reads
/// as `Wall`, an entity cell as the entity's kind, anything else as empty.

use std::collections::BTreeMap;

use crate::domain::entity::{Entity, EntityId, Position};
use crate::domain::level::Level;
use crate::domain::tile::TileKind;

/// Why a level run ended.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FinishReason {
    Success,
    TimedOut,
    KilledByEnemy,
    CrushedByRock,
}

impl FinishReason {
    pub fn message(self) -> &'static str {
        match self {
            FinishReason::Success => "Congratulations!",
            FinishReason::TimedOut => "You've run out of time",
            FinishReason::KilledByEnemy => "Fox got to you first",
            FinishReason::CrushedByRock => "You've been crushed by rock",
        }
    }

    /// Failures offer a retry; success moves on.
    pub fn is_retryable(self) -> bool {
        !matches!(self, FinishReason::Success)
    }
}

pub struct World {
    level: Level,
    width: usize,
    height: usize,

    // ── Entities ──
    /// Keyed by id; ids are handed out in row-major load order, so
    /// iteration order is the load scan order.
    entities: BTreeMap<EntityId, Entity>,
    occupancy: Vec<Option<EntityId>>,
    next_id: u32,

    // ── Player tracking ──
    player: Option<EntityId>,
    /// Last known player position; survives the player being crushed.
    focus: Position,

    // ── Progress ──
    collected: u32,
    finish: Option<FinishReason>,
    tick: u64,
}

// ── Construction ──

impl World {
    /// Spawn one entity per dynamic tile, scanning rows top to bottom.
    pub fn from_level(level: Level) -> Self {
        let width = level.width();
        let height = level.height();
        let mut world = World {
            width,
            height,
            entities: BTreeMap::new(),
            occupancy: vec![None; width * height],
            next_id: 0,
            player: None,
            focus: level.spawn_position(),
            collected: 0,
            finish: None,
            tick: 0,
            level,
        };

        let spawns: Vec<(TileKind, Position)> = world
            .level
            .grid()
            .iter_rows()
            .filter(|(_, _, kind)| kind.is_dynamic())
            .map(|(row, col, kind)| (kind, Position::new(col as i32, world.level.row_to_y(row))))
            .collect();

        for (kind, pos) in spawns {
            let id = world.spawn(kind, pos);
            if kind == TileKind::Player {
                world.player = Some(id);
            }
        }

        world
    }

    fn spawn(&mut self, kind: TileKind, pos: Position) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        if let Some(idx) = self.index(pos) {
            debug_assert!(self.occupancy[idx].is_none(), "spawn onto occupied cell {pos:?}");
            self.occupancy[idx] = Some(id);
        }
        self.entities.insert(id, Entity::new(id, kind, pos));
        id
    }
}

// ── Cell queries ──

impl World {
    #[inline]
    fn index(&self, pos: Position) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 {
            return None;
        }
        let (x, y) = (pos.x as usize, pos.y as usize);
        if x < self.width && y < self.height {
            Some(y * self.width + x)
        } else {
            None
        }
    }

    pub fn entity_at(&self, pos: Position) -> Option<&Entity> {
        let id = self.index(pos).and_then(|i| self.occupancy[i])?;
        self.entities.get(&id)
    }

    /// What blocks or fills this cell: an entity's kind, `Wall` for wall
    /// background or off-grid, `None` when the cell is empty.
    pub fn kind_at(&self, pos: Position) -> Option<TileKind> {
        if let Some(e) = self.entity_at(pos) {
            return Some(e.kind);
        }
        match self.level.tile_at(pos.x, pos.y) {
            TileKind::Wall => Some(TileKind::Wall),
            _ => None,
        }
    }

    #[inline]
    pub fn is_empty(&self, pos: Position) -> bool {
        self.kind_at(pos).is_none()
    }
}

// ── Entity access / mutation ──

impl World {
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Ids of every entity of `kind`, in load order. Phases iterate over
    /// this snapshot so removals mid-phase don't disturb the walk.
    pub fn ids_of(&self, kind: TileKind) -> Vec<EntityId> {
        self.entities.values().filter(|e| e.kind == kind).map(|e| e.id).collect()
    }

    /// Move an entity into an empty cell.
    pub fn move_entity(&mut self, id: EntityId, to: Position) {
        let Some(from) = self.entities.get(&id).map(|e| e.pos) else { return };
        debug_assert!(self.entity_at(to).is_none(), "move onto occupied cell {to:?}");
        if let Some(i) = self.index(from) {
            if self.occupancy[i] == Some(id) {
                self.occupancy[i] = None;
            }
        }
        if let Some(i) = self.index(to) {
            self.occupancy[i] = Some(id);
        }
        if let Some(e) = self.entities.get_mut(&id) {
            e.pos = to;
        }
        if self.player == Some(id) {
            self.focus = to;
        }
    }

    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        if let Some(i) = self.index(entity.pos) {
            if self.occupancy[i] == Some(id) {
                self.occupancy[i] = None;
            }
        }
        if self.player == Some(id) {
            self.player = None;
        }
        Some(entity)
    }

    /// Change an entity's kind in place (exit opening).
    pub fn set_kind(&mut self, id: EntityId, kind: TileKind) {
        if let Some(e) = self.entities.get_mut(&id) {
            e.kind = kind;
        }
    }
}

// ── Player / progress ──

impl World {
    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn player_id(&self) -> Option<EntityId> {
        self.player
    }

    pub fn player_position(&self) -> Option<Position> {
        self.player.and_then(|id| self.entity(id)).map(|e| e.pos)
    }

    pub fn focus(&self) -> Position {
        self.focus
    }

    pub fn collected(&self) -> u32 {
        self.collected
    }

    /// Count one more collectable; returns the new total.
    pub fn add_collected(&mut self) -> u32 {
        self.collected += 1;
        self.collected
    }

    pub fn required(&self) -> u32 {
        self.level.required_collectables()
    }

    pub fn finish(&self) -> Option<FinishReason> {
        self.finish
    }

    pub fn is_finished(&self) -> bool {
        self.finish.is_some()
    }

    /// First reason wins; later ones are ignored.
    /// Number of ticks run so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub(crate) fn begin_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    pub fn set_finish(&mut self, reason: FinishReason) {
        if self.finish.is_none() {
            log::debug!("level {:?} finished at tick {}: {:?}", self.level.name(), self.tick, reason);
            self.finish = Some(reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_from(rows: &[&str]) -> World {
        let text = format!("t\n1\n60\n{}\n", rows.join("\n"));
        World::from_level(Level::parse(&text).unwrap())
    }

    #[test]
    fn load_spawns_dynamic_tiles_only() {
        let w = world_from(&["PDG", "WOX"]);
        // P D G O X; the inner W stays background
        assert_eq!(w.entity_count(), 5);
        assert_eq!(w.ids_of(TileKind::Player).len(), 1);
        assert_eq!(w.ids_of(TileKind::Wall).len(), 0);
    }

    #[test]
    fn load_has_one_player_and_an_exit_and_no_shared_cells() {
        let w = world_from(&["PFO ", "DDGX", "O  X"]);
        let players = w.entities().filter(|e| e.kind == TileKind::Player).count();
        let exits = w
            .entities()
            .filter(|e| matches!(e.kind, TileKind::ExitInactive | TileKind::ExitActive))
            .count();
        assert_eq!(players, 1);
        assert!(exits >= 1);
        let mut cells: Vec<_> = w.entities().map(|e| (e.pos.x, e.pos.y)).collect();
        cells.sort();
        let before = cells.len();
        cells.dedup();
        assert_eq!(cells.len(), before);
        for e in w.entities() {
            assert_eq!(w.entity_at(e.pos).map(|o| o.id), Some(e.id));
        }
    }

    #[test]
    fn player_is_cached_and_focused() {
        let w = world_from(&["  ", "PX"]);
        let id = w.player_id().unwrap();
        assert_eq!(w.entity(id).unwrap().kind, TileKind::Player);
        assert_eq!(w.focus(), Position::new(1, 1));
        assert_eq!(w.player_position(), Some(Position::new(1, 1)));
    }

    #[test]
    fn walls_and_border_read_as_wall() {
        let w = world_from(&["PW", "X "]);
        assert_eq!(w.kind_at(Position::new(2, 2)), Some(TileKind::Wall));
        assert_eq!(w.kind_at(Position::new(0, 1)), Some(TileKind::Wall));
        assert_eq!(w.kind_at(Position::new(-5, 1)), Some(TileKind::Wall));
        assert_eq!(w.kind_at(Position::new(2, 1)), None);
    }

    #[test]
    fn move_updates_occupancy_and_focus() {
        let mut w = world_from(&["P ", "X "]);
        let id = w.player_id().unwrap();
        w.move_entity(id, Position::new(2, 2));
        assert!(w.is_empty(Position::new(1, 2)));
        assert_eq!(w.entity_at(Position::new(2, 2)).map(|e| e.id), Some(id));
        assert_eq!(w.focus(), Position::new(2, 2));
    }

    #[test]
    fn removed_player_keeps_focus() {
        let mut w = world_from(&["P ", "X "]);
        let id = w.player_id().unwrap();
        w.remove_entity(id);
        assert_eq!(w.player_id(), None);
        assert_eq!(w.player_position(), None);
        assert_eq!(w.focus(), Position::new(1, 2));
        assert!(w.is_empty(Position::new(1, 2)));
    }

    #[test]
    fn tick_counter_starts_at_zero_and_counts_up() {
        let mut w = world_from(&["P X"]);
        assert_eq!(w.tick(), 0);
        assert_eq!(w.begin_tick(), 1);
        assert_eq!(w.begin_tick(), 2);
        assert_eq!(w.tick(), 2);
    }

    #[test]
    fn first_finish_reason_sticks() {
        let mut w = world_from(&["PX"]);
        w.set_finish(FinishReason::KilledByEnemy);
        w.set_finish(FinishReason::Success);
        assert_eq!(w.finish(), Some(FinishReason::KilledByEnemy));
    }

    #[test]
    fn only_success_is_final() {
        assert!(!FinishReason::Success.is_retryable());
        assert!(FinishReason::TimedOut.is_retryable());
        assert!(FinishReason::KilledByEnemy.is_retryable());
        assert!(FinishReason::CrushedByRock.is_retryable());
        assert_eq!(FinishReason::KilledByEnemy.message(), "Fox got to you first");
    }
}
