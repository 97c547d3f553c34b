/// The simulation engine: owns the loaded world, the input mailbox, the
/// injected time source and the tick gate.
///
/// Lifecycle: Unloaded → Loaded(running) → Loaded(finished). Pause is not
/// an engine state; the host simply stops calling `sample` / `advance`.
///
/// Hosts drive it once per frame:
///   ```text
///   engine.sample(&keys);
///   let events = engine.advance(frame_dt);
///   ```
/// Tests usually call `tick` directly with an explicit elapsed time.

use std::time::Duration;

use crate::domain::entity::{Entity, Position};
use crate::domain::level::Level;
use super::clock::{FrameClock, TickGate, TimeSource, DEFAULT_TICK_INTERVAL};
use super::event::GameEvent;
use super::input::{InputBuffer, KeyState};
use super::step;
use super::world::{FinishReason, World};

/// Engine-facing subset of the game configuration.
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    pub tick_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig { tick_interval: DEFAULT_TICK_INTERVAL }
    }
}

pub struct Engine<T: TimeSource = FrameClock> {
    time: T,
    input: InputBuffer,
    gate: TickGate,
    world: Option<World>,
}

impl Engine<FrameClock> {
    /// Engine on a fresh frame clock.
    pub fn with_frame_clock(config: &EngineConfig) -> Self {
        Engine::new(FrameClock::new(), config)
    }
}

impl<T: TimeSource> Engine<T> {
    pub fn new(time: T, config: &EngineConfig) -> Self {
        Engine {
            time,
            input: InputBuffer::new(),
            gate: TickGate::new(config.tick_interval),
            world: None,
        }
    }

    // ── Lifecycle ──

    /// Replace whatever is loaded with a fresh world built from `level`.
    pub fn load(&mut self, level: Level) {
        self.world = None;
        let world = World::from_level(level);
        log::debug!(
            "loaded level {:?}: {} entities, {} grubs required, {}s",
            world.level().name(),
            world.entity_count(),
            world.required(),
            world.level().max_time(),
        );
        self.world = Some(world);
        self.input.reset();
        self.gate.reset();
        self.time.reset();
    }

    pub fn unload(&mut self) {
        if let Some(world) = self.world.take() {
            log::debug!("unloaded level {:?}", world.level().name());
        }
        self.input.reset();
    }

    pub fn is_loaded(&self) -> bool {
        self.world.is_some()
    }

    // ── Per-frame driving ──

    /// Per-frame key sampling. Call once per frame before `advance`.
    pub fn sample(&mut self, keys: &KeyState) {
        let now = self.time.elapsed();
        self.input.sample(keys, now);
    }

    /// Advance the owned clock by `dt` seconds and run a tick if one is due.
    /// A finished or unloaded engine keeps its clock frozen.
    pub fn advance(&mut self, dt: f64) -> Vec<GameEvent> {
        if !self.is_running() {
            return vec![];
        }
        self.time.advance(dt);
        let now = self.time.elapsed();
        if self.gate.poll(now) {
            self.tick(now)
        } else {
            vec![]
        }
    }

    /// Run one tick of the phase pipeline at `elapsed` seconds.
    /// No-op when nothing is loaded or the level already finished.
    pub fn tick(&mut self, elapsed: f64) -> Vec<GameEvent> {
        match self.world.as_mut() {
            Some(world) => step::step(world, &mut self.input, elapsed),
            None => vec![],
        }
    }

    fn is_running(&self) -> bool {
        self.world.as_ref().is_some_and(|w| !w.is_finished())
    }

    // ── Queries ──

    pub fn finish_state(&self) -> Option<FinishReason> {
        self.world.as_ref().and_then(|w| w.finish())
    }

    pub fn collected_count(&self) -> u32 {
        self.world.as_ref().map_or(0, |w| w.collected())
    }

    pub fn required_count(&self) -> u32 {
        self.world.as_ref().map_or(0, |w| w.required())
    }

    /// Player position for camera framing. After the player is crushed this
    /// is where it was last seen.
    pub fn focus_position(&self) -> Option<Position> {
        self.world.as_ref().map(|w| w.focus())
    }

    /// Level time limit in seconds (0 when unloaded).
    pub fn max_time(&self) -> u32 {
        self.world.as_ref().map_or(0, |w| w.level().max_time())
    }

    pub fn elapsed(&self) -> f64 {
        self.time.elapsed()
    }

    /// Whole seconds left on the clock, never negative.
    pub fn remaining_time(&self) -> u32 {
        let left = self.max_time() as f64 - self.elapsed().floor();
        left.max(0.0) as u32
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.world.iter().flat_map(|w| w.entities())
    }

    pub fn entity_at(&self, pos: Position) -> Option<&Entity> {
        self.world.as_ref().and_then(|w| w.entity_at(pos))
    }

    pub fn level(&self) -> Option<&Level> {
        self.world.as_ref().map(|w| w.level())
    }

    pub fn input(&self) -> &InputBuffer {
        &self.input
    }

    #[cfg(test)]
    fn time_mut(&mut self) -> &mut T {
        &mut self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Direction;
    use crate::domain::tile::TileKind;

    fn level(rows: &[&str], required: u32, max_time: u32) -> Level {
        let text = format!("test\n{required}\n{max_time}\n{}\n", rows.join("\n"));
        Level::parse(&text).unwrap()
    }

    fn engine() -> Engine {
        Engine::with_frame_clock(&EngineConfig::default())
    }

    fn hold(dir: Direction) -> KeyState {
        KeyState {
            up: dir == Direction::Up,
            down: dir == Direction::Down,
            left: dir == Direction::Left,
            right: dir == Direction::Right,
            pause_pressed: false,
        }
    }

    #[test]
    fn unloaded_engine_is_inert() {
        let mut e = engine();
        assert!(!e.is_loaded());
        assert!(e.tick(0.0).is_empty());
        assert!(e.advance(1.0).is_empty());
        assert_eq!(e.finish_state(), None);
        assert_eq!(e.collected_count(), 0);
        assert_eq!(e.focus_position(), None);
        assert_eq!(e.entities().count(), 0);
    }

    #[test]
    fn load_resets_progress_and_clock() {
        let mut e = engine();
        e.load(level(&["PGX"], 1, 60));
        e.sample(&hold(Direction::Right));
        e.advance(0.0);
        assert_eq!(e.collected_count(), 1);
        e.advance(5.0);

        e.load(level(&["PGX"], 1, 60));
        assert_eq!(e.collected_count(), 0);
        assert_eq!(e.finish_state(), None);
        assert_eq!(e.elapsed(), 0.0);
        assert_eq!(e.input().pending(), None);
    }

    #[test]
    fn unload_then_load_leaves_no_residue() {
        let mut e = engine();
        e.load(level(&["PFOOX", "DDDDD"], 1, 60));
        e.tick(0.0);
        e.unload();
        assert!(!e.is_loaded());
        assert_eq!(e.entities().count(), 0);

        e.load(level(&["P GX"], 1, 30));
        let kinds: Vec<TileKind> = e.entities().map(|en| en.kind).collect();
        assert_eq!(kinds, vec![TileKind::Player, TileKind::Collectable, TileKind::ExitInactive]);
        assert_eq!(e.max_time(), 30);
        assert_eq!(e.finish_state(), None);
    }

    #[test]
    fn first_frame_ticks_then_waits_for_interval() {
        let mut e = engine();
        e.load(level(&["P    X"], 1, 60));
        let hold_right = hold(Direction::Right);

        e.sample(&hold_right);
        e.advance(0.0);
        assert_eq!(e.focus_position(), Some(Position::new(2, 1)));

        // 0.15s later: no tick yet, mailbox refilled but not consumed
        e.sample(&hold_right);
        e.advance(0.15);
        assert_eq!(e.focus_position(), Some(Position::new(2, 1)));

        e.sample(&hold_right);
        e.advance(0.15);
        assert_eq!(e.focus_position(), Some(Position::new(3, 1)));
    }

    #[test]
    fn tap_between_ticks_is_not_lost() {
        let mut e = engine();
        e.load(level(&["P  X"], 1, 60));
        e.advance(0.0); // first tick, nothing buffered
        e.sample(&hold(Direction::Right));
        e.advance(0.05);
        e.sample(&KeyState::default());
        e.advance(0.05);
        e.sample(&KeyState::default());
        e.advance(0.15);
        assert_eq!(e.focus_position(), Some(Position::new(2, 1)));
    }

    #[test]
    fn time_out_through_advance() {
        let mut e = engine();
        e.load(level(&["P X"], 1, 1));
        e.advance(0.0);
        e.advance(0.5);
        assert_eq!(e.finish_state(), None);
        let events = e.advance(0.6);
        assert_eq!(events, vec![GameEvent::TimeRanOut]);
        assert_eq!(e.finish_state(), Some(FinishReason::TimedOut));
        assert_eq!(e.remaining_time(), 0);
    }

    #[test]
    fn finished_engine_freezes_clock() {
        let mut e = engine();
        e.load(level(&["PFX"], 1, 60));
        e.advance(0.0);
        assert_eq!(e.finish_state(), Some(FinishReason::KilledByEnemy));
        e.advance(3.0);
        assert_eq!(e.elapsed(), 0.0);
    }

    #[test]
    fn remaining_time_counts_whole_seconds() {
        let mut e = engine();
        e.load(level(&["P X"], 1, 90));
        e.time_mut().set(12.7);
        assert_eq!(e.remaining_time(), 78);
        assert_eq!(e.max_time(), 90);
    }

    #[test]
    fn focus_survives_crush() {
        let mut e = engine();
        e.load(level(&["O X", "   ", "P  "], 1, 60));
        e.tick(0.0);
        e.tick(0.2);
        assert_eq!(e.finish_state(), Some(FinishReason::CrushedByRock));
        assert_eq!(e.focus_position(), Some(Position::new(1, 1)));
        assert_eq!(e.entity_at(Position::new(1, 1)).map(|en| en.kind), Some(TileKind::Boulder));
    }
}
