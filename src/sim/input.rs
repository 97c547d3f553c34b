/// Direction mailbox between per-frame key sampling and per-tick movement.
///
/// `sample` runs every frame. When exactly one direction group is held the
/// slot is overwritten with that direction and the sample time. Chords of
/// two or more directions are dropped for that frame, and releasing every
/// key leaves the slot alone, so a tap shorter than a tick still lands.
/// The next tick takes the slot with `consume`.

use crate::domain::entity::Direction;

/// Raw per-frame key state, already folded from key bindings into groups.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct KeyState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    /// Edge-triggered: pause key went down this frame.
    pub pause_pressed: bool,
}

impl KeyState {
    /// The single held direction, or None for no key or a chord.
    pub fn direction(&self) -> Option<Direction> {
        let held = [
            (self.up, Direction::Up),
            (self.down, Direction::Down),
            (self.right, Direction::Right),
            (self.left, Direction::Left),
        ];
        let mut found = None;
        for (pressed, dir) in held {
            if !pressed {
                continue;
            }
            if found.is_some() {
                return None;
            }
            found = Some(dir);
        }
        found
    }
}

/// A buffered direction and when it was captured (engine seconds).
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Intent {
    pub direction: Direction,
    pub captured_at: f64,
}

#[derive(Clone, Debug, Default)]
pub struct InputBuffer {
    slot: Option<Intent>,
    pause_requested: bool,
}

impl InputBuffer {
    pub fn new() -> Self {
        InputBuffer::default()
    }

    /// Call exactly once per frame, before the tick decision.
    pub fn sample(&mut self, keys: &KeyState, now: f64) {
        self.pause_requested = keys.pause_pressed;
        if let Some(direction) = keys.direction() {
            self.slot = Some(Intent { direction, captured_at: now });
        }
    }

    /// Take the buffered direction, leaving the slot empty.
    pub fn consume(&mut self) -> Option<Direction> {
        self.slot.take().map(|i| i.direction)
    }

    pub fn pending(&self) -> Option<Intent> {
        self.slot
    }

    pub fn is_pause_requested(&self) -> bool {
        self.pause_requested
    }

    pub fn reset(&mut self) {
        self.slot = None;
        self.pause_requested = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(up: bool, down: bool, left: bool, right: bool) -> KeyState {
        KeyState { up, down, left, right, pause_pressed: false }
    }

    #[test]
    fn single_key_fills_slot_with_timestamp() {
        let mut buf = InputBuffer::new();
        buf.sample(&keys(false, false, true, false), 1.5);
        assert_eq!(buf.pending(), Some(Intent { direction: Direction::Left, captured_at: 1.5 }));
    }

    #[test]
    fn release_keeps_last_direction() {
        let mut buf = InputBuffer::new();
        buf.sample(&keys(true, false, false, false), 0.0);
        buf.sample(&KeyState::default(), 0.05);
        buf.sample(&KeyState::default(), 0.10);
        assert_eq!(buf.consume(), Some(Direction::Up));
    }

    #[test]
    fn consume_clears_slot() {
        let mut buf = InputBuffer::new();
        buf.sample(&keys(false, true, false, false), 0.0);
        assert_eq!(buf.consume(), Some(Direction::Down));
        assert_eq!(buf.consume(), None);
    }

    #[test]
    fn chord_is_dropped_not_arbitrated() {
        let mut buf = InputBuffer::new();
        buf.sample(&keys(true, false, false, true), 0.0);
        assert_eq!(buf.pending(), None);
    }

    #[test]
    fn chord_leaves_previous_direction() {
        let mut buf = InputBuffer::new();
        buf.sample(&keys(false, false, false, true), 0.0);
        buf.sample(&keys(true, true, false, false), 0.1);
        assert_eq!(buf.pending().map(|i| i.direction), Some(Direction::Right));
        assert_eq!(buf.pending().map(|i| i.captured_at), Some(0.0));
    }

    #[test]
    fn newer_direction_overwrites() {
        let mut buf = InputBuffer::new();
        buf.sample(&keys(false, false, true, false), 0.0);
        buf.sample(&keys(false, false, false, true), 0.1);
        assert_eq!(buf.consume(), Some(Direction::Right));
    }

    #[test]
    fn held_key_rearms_after_consume() {
        let mut buf = InputBuffer::new();
        let held = keys(true, false, false, false);
        buf.sample(&held, 0.0);
        assert_eq!(buf.consume(), Some(Direction::Up));
        buf.sample(&held, 0.02);
        assert_eq!(buf.consume(), Some(Direction::Up));
    }

    #[test]
    fn pause_flag_is_per_frame() {
        let mut buf = InputBuffer::new();
        buf.sample(&KeyState { pause_pressed: true, ..KeyState::default() }, 0.0);
        assert!(buf.is_pause_requested());
        buf.sample(&KeyState::default(), 0.02);
        assert!(!buf.is_pause_requested());
    }

    #[test]
    fn reset_clears_everything() {
        let mut buf = InputBuffer::new();
        buf.sample(&KeyState { up: true, pause_pressed: true, ..KeyState::default() }, 0.0);
        buf.reset();
        assert_eq!(buf.pending(), None);
        assert!(!buf.is_pause_requested());
    }
}
