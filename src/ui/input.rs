/// Terminal keyboard tracker.
///
/// Tracks which keys are currently held down so a held arrow keeps
/// re-arming the direction mailbox every frame, while pause and menu keys
/// are edge-triggered.
///
/// When the renderer turned on crossterm's keyboard enhancement, Release
/// events end a hold. Otherwise a key counts as released `HOLD_TIMEOUT`
/// after its last Press/Repeat.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::config::KeyBindings;
use crate::sim::input::KeyState;

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

/// Key names from the config, resolved to key codes.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyMap {
    pub up: Vec<KeyCode>,
    pub down: Vec<KeyCode>,
    pub left: Vec<KeyCode>,
    pub right: Vec<KeyCode>,
    pub pause: Vec<KeyCode>,
}

impl KeyMap {
    /// Unknown names are dropped with a warning.
    pub fn from_bindings(bindings: &KeyBindings) -> Self {
        KeyMap {
            up: resolve("up", &bindings.up),
            down: resolve("down", &bindings.down),
            left: resolve("left", &bindings.left),
            right: resolve("right", &bindings.right),
            pause: resolve("pause", &bindings.pause),
        }
    }
}

fn resolve(action: &str, names: &[String]) -> Vec<KeyCode> {
    names
        .iter()
        .filter_map(|name| {
            let code = parse_key(name);
            if code.is_none() {
                log::warn!("unknown key {name:?} bound to {action}");
            }
            code
        })
        .collect()
}

/// Parse a key name: named keys (`Up`, `Esc`, `Enter`, `Space`, ...) are
/// case-insensitive; a single character maps to itself.
pub fn parse_key(name: &str) -> Option<KeyCode> {
    let mut chars = name.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        return Some(KeyCode::Char(ch));
    }
    match name.to_ascii_lowercase().as_str() {
        "up" => Some(KeyCode::Up),
        "down" => Some(KeyCode::Down),
        "left" => Some(KeyCode::Left),
        "right" => Some(KeyCode::Right),
        "esc" | "escape" => Some(KeyCode::Esc),
        "enter" | "return" => Some(KeyCode::Enter),
        "space" => Some(KeyCode::Char(' ')),
        "tab" => Some(KeyCode::Tab),
        "backspace" => Some(KeyCode::Backspace),
        _ => None,
    }
}

pub struct Keyboard {
    keys: KeyMap,

    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from "not held" to "held" during the most recent
    /// drain_events() call.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain, for meta-key handling.
    raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl Keyboard {
    pub fn new(keys: KeyMap) -> Self {
        Keyboard {
            keys,
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before sampling.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.record(key, Instant::now());
            }
        }

        if !self.honor_release {
            let now = Instant::now();
            self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
        }
    }

    fn record(&mut self, key: KeyEvent, now: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            // Release not trusted: rely on timeout-based expiry instead
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.is_held(key.code);
                self.last_active.insert(key.code, now);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    /// Folded key state for the engine's input buffer.
    pub fn key_state(&self) -> KeyState {
        KeyState {
            up: self.any_held(&self.keys.up),
            down: self.any_held(&self.keys.down),
            left: self.any_held(&self.keys.left),
            right: self.any_held(&self.keys.right),
            pause_pressed: self.any_pressed(&self.keys.pause),
        }
    }

    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active
            .get(&code)
            .is_some_and(|t| self.honor_release || t.elapsed() < HOLD_TIMEOUT)
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Was this key freshly pressed this frame? (edge trigger)
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    /// Digit key freshly pressed this frame, if any.
    pub fn pressed_digit(&self) -> Option<u32> {
        self.fresh_presses.iter().find_map(|c| match c {
            KeyCode::Char(ch) => ch.to_digit(10),
            _ => None,
        })
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C'))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn keyboard() -> Keyboard {
        Keyboard::new(KeyMap::from_bindings(&crate::config::GameConfig::default().keys))
    }

    #[test]
    fn key_names_parse() {
        assert_eq!(parse_key("Up"), Some(KeyCode::Up));
        assert_eq!(parse_key("ESC"), Some(KeyCode::Esc));
        assert_eq!(parse_key("w"), Some(KeyCode::Char('w')));
        assert_eq!(parse_key("space"), Some(KeyCode::Char(' ')));
        assert_eq!(parse_key("hyper"), None);
        assert_eq!(parse_key(""), None);
    }

    #[test]
    fn unknown_bindings_are_dropped() {
        let bindings = KeyBindings {
            up: vec!["Up".into(), "nope".into()],
            down: vec![],
            left: vec!["a".into()],
            right: vec!["d".into()],
            pause: vec!["Esc".into()],
        };
        let map = KeyMap::from_bindings(&bindings);
        assert_eq!(map.up, vec![KeyCode::Up]);
        assert!(map.down.is_empty());
    }

    #[test]
    fn held_key_folds_into_direction() {
        let mut kb = keyboard();
        kb.record(press(KeyCode::Char('a')), Instant::now());
        let state = kb.key_state();
        assert!(state.left);
        assert!(!state.up && !state.down && !state.right);
        assert!(!state.pause_pressed);
    }

    #[test]
    fn pause_is_edge_triggered() {
        let mut kb = keyboard();
        kb.record(press(KeyCode::Esc), Instant::now());
        assert!(kb.key_state().pause_pressed);
        // a repeat while still held is not a fresh press
        kb.fresh_presses.clear();
        kb.record(press(KeyCode::Esc), Instant::now());
        assert!(!kb.key_state().pause_pressed);
    }

    #[test]
    fn release_honoured_only_when_enabled() {
        let mut kb = keyboard();
        let release = KeyEvent::new_with_kind(KeyCode::Up, KeyModifiers::NONE, KeyEventKind::Release);
        kb.record(press(KeyCode::Up), Instant::now());
        kb.record(release, Instant::now());
        assert!(kb.is_held(KeyCode::Up));

        kb.honor_release = true;
        kb.record(release, Instant::now());
        assert!(!kb.is_held(KeyCode::Up));
    }

    #[test]
    fn hold_outlives_timeout_only_with_release_events() {
        let mut kb = keyboard();
        let long_ago = Instant::now() - HOLD_TIMEOUT * 3;
        kb.record(press(KeyCode::Right), long_ago);
        assert!(!kb.is_held(KeyCode::Right));

        kb.honor_release = true;
        assert!(kb.is_held(KeyCode::Right));
        assert!(kb.key_state().right);
    }

    #[test]
    fn ctrl_c_and_digits() {
        let mut kb = keyboard();
        kb.record(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), Instant::now());
        kb.record(press(KeyCode::Char('3')), Instant::now());
        assert!(kb.ctrl_c_pressed());
        assert_eq!(kb.pressed_digit(), Some(3));
    }
}
