/// The step function: advances the world by one tick.
///
/// Processing order, stopping as soon as a finish reason is set:
///   1. Time-out check
///   2. Player movement (consumes the buffered direction)
///   3. Hazard check (toxic neighbour)
///   4. Enemy movement (wall following)
///   5. Hazard check again
///   6. Gravity (boulders fall, slide and crush)
///
/// Every phase that walks entities walks a snapshot of ids taken at phase
/// start, in load order.
///
/// Occupancy queries go through `World::kind_at`: walls and the border read
/// as `Wall`, empty cells as `None`.

use crate::domain::entity::{Direction, EntityId, Position};
use crate::domain::tile::TileKind;
use super::event::GameEvent;
use super::input::InputBuffer;
use super::world::{FinishReason, World};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut World, input: &mut InputBuffer, elapsed: f64) -> Vec<GameEvent> {
    if world.is_finished() { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();
    let tick = world.begin_tick();
    log::trace!("tick {tick} at {elapsed:.2}s");

    if resolve_timeout(world, elapsed, &mut events) { return events; }

    resolve_player(world, input.consume(), &mut events);
    if world.is_finished() { return events; }

    check_hazards(world, &mut events);
    if world.is_finished() { return events; }

    resolve_enemies(world);
    check_hazards(world, &mut events);
    if world.is_finished() { return events; }

    resolve_gravity(world, &mut events);

    events
}

// ══════════════════════════════════════════════════════════════
// Time-out
// ══════════════════════════════════════════════════════════════

fn resolve_timeout(world: &mut World, elapsed: f64, events: &mut Vec<GameEvent>) -> bool {
    if elapsed < world.level().max_time() as f64 { return false; }
    world.set_finish(FinishReason::TimedOut);
    events.push(GameEvent::TimeRanOut);
    true
}

// ══════════════════════════════════════════════════════════════
// Player movement
// ══════════════════════════════════════════════════════════════

fn resolve_player(world: &mut World, dir: Option<Direction>, events: &mut Vec<GameEvent>) {
    let Some(dir) = dir else { return };
    let Some(player) = world.player_id() else { return };
    let Some(from) = world.player_position() else { return };
    let target = from.step(dir);

    match world.kind_at(target) {
        None => world.move_entity(player, target),
        Some(kind) if kind.is_enterable() => {
            if let Some(occupant) = world.entity_at(target).map(|e| e.id) {
                enter(world, occupant, target, events);
            }
            // Entering the exit finishes the level; the player still steps in.
            world.move_entity(player, target);
        }
        Some(kind) if kind.is_pushable() => {
            let beyond = target.step(dir);
            if !world.is_empty(beyond) { return; }
            let Some(pushed) = world.entity_at(target).map(|e| e.id) else { return };
            world.move_entity(pushed, beyond);
            world.move_entity(player, target);
            events.push(GameEvent::BoulderPushed { id: pushed, to: beyond });
        }
        Some(_) => {}
    }
}

/// Entry effect of the player stepping onto `occupant`.
fn enter(world: &mut World, occupant: EntityId, at: Position, events: &mut Vec<GameEvent>) {
    let Some(kind) = world.remove_entity(occupant).map(|e| e.kind) else { return };
    match kind {
        TileKind::Dirt => events.push(GameEvent::DirtEaten { at }),
        TileKind::Collectable => {
            let collected = world.add_collected();
            let required = world.required();
            events.push(GameEvent::CollectablePicked { at, collected, required });
            if collected == required {
                open_exits(world);
                events.push(GameEvent::ExitOpened);
            }
        }
        TileKind::ExitActive => {
            world.set_finish(FinishReason::Success);
            events.push(GameEvent::LevelExited);
        }
        _ => {}
    }
}

fn open_exits(world: &mut World) {
    for id in world.ids_of(TileKind::ExitInactive) {
        world.set_kind(id, TileKind::ExitActive);
    }
}

// ══════════════════════════════════════════════════════════════
// Hazards
// ══════════════════════════════════════════════════════════════

fn check_hazards(world: &mut World, events: &mut Vec<GameEvent>) {
    if world.is_finished() { return; }
    let Some(pos) = world.player_position() else { return };
    let toxic_nearby = pos
        .neighbors()
        .into_iter()
        .any(|n| world.entity_at(n).is_some_and(|e| e.kind.is_toxic()));
    if toxic_nearby {
        world.set_finish(FinishReason::KilledByEnemy);
        events.push(GameEvent::PlayerKilled);
    }
}

// ══════════════════════════════════════════════════════════════
// Enemies
// ══════════════════════════════════════════════════════════════

fn resolve_enemies(world: &mut World) {
    for id in world.ids_of(TileKind::Enemy) {
        let Some((pos, last)) = world.entity(id).map(|e| (e.pos, e.last_move)) else { continue };

        // Pinned under a boulder: this enemy waits.
        if world.entity_at(pos.step(Direction::Up)).is_some_and(|e| e.kind == TileKind::Boulder) {
            continue;
        }

        if let Some(dir) = wall_follow(world, pos, last) {
            world.move_entity(id, pos.step(dir));
            if let Some(e) = world.entity_mut(id) {
                e.last_move = dir;
            }
        }
    }
}

/// First free direction, starting counter-clockwise of `last` and turning
/// clockwise. None when all four neighbours are occupied.
pub fn wall_follow(world: &World, pos: Position, last: Direction) -> Option<Direction> {
    std::iter::successors(Some(last.counter_clockwise()), |d| Some(d.clockwise()))
        .take(4)
        .find(|d| world.is_empty(pos.step(*d)))
}

// ══════════════════════════════════════════════════════════════
// Gravity
// ══════════════════════════════════════════════════════════════

fn resolve_gravity(world: &mut World, events: &mut Vec<GameEvent>) {
    for id in world.ids_of(TileKind::Boulder) {
        if world.is_finished() { return; }
        let Some((pos, falling)) = world.entity(id).map(|e| (e.pos, e.falling)) else { continue };
        let below = pos.step(Direction::Down);

        // A player is only hurt by a boulder already in motion.
        let victim = world
            .entity_at(below)
            .filter(|e| e.kind.is_crushable() && (falling || e.kind != TileKind::Player))
            .map(|e| (e.id, e.kind));
        if let Some((victim, kind)) = victim {
            crush(world, victim, kind, below, events);
        }

        let target = if world.is_empty(below) {
            Some(below)
        } else {
            slide_target(world, pos)
        };

        match target {
            Some(to) => {
                world.move_entity(id, to);
                set_falling(world, id, true);
            }
            None => set_falling(world, id, false),
        }
    }
}

/// Diagonal slide off an obstacle: right side first, then left. Both the
/// cell beside and the cell diagonally below must be empty.
fn slide_target(world: &World, pos: Position) -> Option<Position> {
    [Direction::Right, Direction::Left]
        .into_iter()
        .map(|side| (pos.step(side), pos.step(side).step(Direction::Down)))
        .find(|(beside, diagonal)| world.is_empty(*beside) && world.is_empty(*diagonal))
        .map(|(_, diagonal)| diagonal)
}

fn crush(world: &mut World, victim: EntityId, kind: TileKind, at: Position, events: &mut Vec<GameEvent>) {
    world.remove_entity(victim);
    if kind == TileKind::Player {
        world.set_finish(FinishReason::CrushedByRock);
        events.push(GameEvent::PlayerCrushed);
    } else {
        events.push(GameEvent::EnemyCrushed { id: victim, at });
    }
}

fn set_falling(world: &mut World, id: EntityId, falling: bool) {
    if let Some(e) = world.entity_mut(id) {
        e.falling = falling;
    }
}
