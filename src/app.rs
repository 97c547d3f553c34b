/// Host-side screen flow around the engine.
///
/// ```text
/// LevelSelect ──Enter──▶ Playing ──finish──▶ Finished(reason)
///      ▲                   │  ▲                 │
///      └────── q (paused) ─┘  └── retry ────────┤ (retryable)
///      ▲                                        │ success
///      └──────────────── Complete ◀── last level┘
/// ```
///
/// Pausing is purely a host flag: while paused the engine is neither
/// sampled nor advanced, so its clock stands still.

use crate::sim::catalog::Catalog;
use crate::sim::clock::TimeSource;
use crate::sim::engine::Engine;
use crate::sim::event::GameEvent;
use crate::sim::input::KeyState;
use crate::sim::world::FinishReason;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    LevelSelect,
    Playing,
    Finished(FinishReason),
    Complete,
}

pub struct App {
    pub phase: Phase,
    pub paused: bool,
    /// Level-select cursor.
    pub cursor: usize,
    /// Index of the level being played.
    pub current: usize,
    /// Frame counter for blinking UI elements.
    pub anim_tick: u32,
    /// Most recent sound cue, shown in the status line.
    pub last_cue: Option<&'static str>,
}

impl App {
    pub fn new() -> Self {
        App {
            phase: Phase::LevelSelect,
            paused: false,
            cursor: 0,
            current: 0,
            anim_tick: 0,
            last_cue: None,
        }
    }

    // ── Level select ──

    /// Move the select cursor, clamped to the catalog.
    pub fn move_cursor(&mut self, delta: i32, total: usize) {
        if total == 0 {
            self.cursor = 0;
            return;
        }
        let next = self.cursor as i64 + delta as i64;
        self.cursor = next.clamp(0, total as i64 - 1) as usize;
    }

    /// Load level `index` and switch to play. False if no such level.
    pub fn start<T: TimeSource>(&mut self, engine: &mut Engine<T>, catalog: &Catalog, index: usize) -> bool {
        let Some(level) = catalog.get(index) else { return false };
        engine.load(level.clone());
        self.current = index;
        self.cursor = index;
        self.paused = false;
        self.last_cue = None;
        self.phase = Phase::Playing;
        true
    }

    pub fn back_to_select<T: TimeSource>(&mut self, engine: &mut Engine<T>) {
        engine.unload();
        self.paused = false;
        self.cursor = self.current;
        self.phase = Phase::LevelSelect;
    }

    // ── Playing ──

    /// One frame of play. Returns the tick's events (empty when paused or
    /// between ticks).
    pub fn play_frame<T: TimeSource>(&mut self, engine: &mut Engine<T>, keys: &KeyState, dt: f64) -> Vec<GameEvent> {
        if self.phase != Phase::Playing {
            return vec![];
        }
        if self.paused {
            if keys.pause_pressed {
                self.paused = false;
            }
            return vec![];
        }

        engine.sample(keys);
        if engine.input().is_pause_requested() {
            self.paused = true;
            return vec![];
        }

        let events = engine.advance(dt);
        if let Some(cue) = events.iter().rev().find_map(GameEvent::sound) {
            self.last_cue = Some(cue);
        }
        if let Some(reason) = engine.finish_state() {
            log::info!("level {} finished: {}", self.current + 1, reason.message());
            self.phase = Phase::Finished(reason);
        }
        events
    }

    // ── Finished ──

    /// Acknowledge the finish screen: retry a failure, advance on success.
    pub fn confirm_finish<T: TimeSource>(&mut self, engine: &mut Engine<T>, catalog: &Catalog) {
        let Phase::Finished(reason) = self.phase else { return };
        if reason.is_retryable() {
            self.start(engine, catalog, self.current);
        } else if !self.start(engine, catalog, self.current + 1) {
            engine.unload();
            self.phase = Phase::Complete;
        }
    }
}

impl Default for App {
    fn default() -> Self {
        App::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::engine::EngineConfig;

    fn engine() -> Engine {
        Engine::with_frame_clock(&EngineConfig::default())
    }

    fn right() -> KeyState {
        KeyState { right: true, ..KeyState::default() }
    }

    fn pause() -> KeyState {
        KeyState { pause_pressed: true, ..KeyState::default() }
    }

    #[test]
    fn cursor_is_clamped() {
        let mut app = App::new();
        app.move_cursor(-1, 4);
        assert_eq!(app.cursor, 0);
        app.move_cursor(10, 4);
        assert_eq!(app.cursor, 3);
        app.move_cursor(1, 0);
        assert_eq!(app.cursor, 0);
    }

    #[test]
    fn start_loads_the_chosen_level() {
        let catalog = Catalog::embedded();
        let mut e = engine();
        let mut app = App::new();
        assert!(app.start(&mut e, &catalog, 1));
        assert_eq!(app.phase, Phase::Playing);
        assert_eq!(e.level().map(|l| l.name()), catalog.get(1).map(|l| l.name()));
        assert!(!app.start(&mut e, &catalog, 99));
    }

    #[test]
    fn pause_freezes_the_clock() {
        let catalog = Catalog::embedded();
        let mut e = engine();
        let mut app = App::new();
        app.start(&mut e, &catalog, 0);

        app.play_frame(&mut e, &KeyState::default(), 0.1);
        app.play_frame(&mut e, &pause(), 0.1);
        assert!(app.paused);
        let frozen = e.elapsed();
        app.play_frame(&mut e, &right(), 5.0);
        assert_eq!(e.elapsed(), frozen);

        app.play_frame(&mut e, &pause(), 0.1);
        assert!(!app.paused);
    }

    #[test]
    fn failure_retries_same_level() {
        let catalog = Catalog::embedded();
        let mut e = engine();
        let mut app = App::new();
        app.start(&mut e, &catalog, 2);
        app.phase = Phase::Finished(FinishReason::KilledByEnemy);
        app.confirm_finish(&mut e, &catalog);
        assert_eq!(app.phase, Phase::Playing);
        assert_eq!(app.current, 2);
        assert_eq!(e.finish_state(), None);
    }

    #[test]
    fn success_advances_then_completes() {
        let catalog = Catalog::embedded();
        let last = catalog.len() - 1;
        let mut e = engine();
        let mut app = App::new();

        app.start(&mut e, &catalog, 0);
        app.phase = Phase::Finished(FinishReason::Success);
        app.confirm_finish(&mut e, &catalog);
        assert_eq!(app.current, 1);

        app.start(&mut e, &catalog, last);
        app.phase = Phase::Finished(FinishReason::Success);
        app.confirm_finish(&mut e, &catalog);
        assert_eq!(app.phase, Phase::Complete);
        assert!(!e.is_loaded());
    }

    #[test]
    fn timeout_reaches_finish_screen() {
        let level = crate::domain::level::Level::parse("t\n1\n1\nP X\n").unwrap();
        let catalog = Catalog::from_levels(vec![level]);
        let mut e = engine();
        let mut app = App::new();
        app.start(&mut e, &catalog, 0);
        app.play_frame(&mut e, &KeyState::default(), 0.0);
        app.play_frame(&mut e, &KeyState::default(), 1.5);
        assert_eq!(app.phase, Phase::Finished(FinishReason::TimedOut));
    }
}
