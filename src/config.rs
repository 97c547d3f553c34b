/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to defaults if the file is missing, unreadable or malformed;
/// any key left out keeps its default.
///
/// ```toml
/// [timing]
/// tick_interval_ms = 200
/// frame_sleep_ms = 5
///
/// [general]
/// levels_dir = "levels"
///
/// [keys]
/// up = ["Up", "w"]
/// ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sim::engine::EngineConfig;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub timing: TimingConfig,
    pub keys: KeyBindings,
    pub levels_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub tick_interval_ms: u64,
    pub frame_sleep_ms: u64,
}

/// Key names per action, e.g. `"Up"`, `"w"`, `"Esc"`. Resolved to key
/// codes by the terminal input layer.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyBindings {
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub pause: Vec<String>,
}

impl GameConfig {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            tick_interval: Duration::from_millis(self.timing.tick_interval_ms.max(1)),
        }
    }

    pub fn frame_sleep(&self) -> Duration {
        Duration::from_millis(self.timing.frame_sleep_ms)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), &[])
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    keys: TomlKeys,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_interval")]
    tick_interval_ms: u64,
    #[serde(default = "default_frame_sleep")]
    frame_sleep_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
}

#[derive(Deserialize, Debug)]
struct TomlKeys {
    #[serde(default = "default_up")]
    up: Vec<String>,
    #[serde(default = "default_down")]
    down: Vec<String>,
    #[serde(default = "default_left")]
    left: Vec<String>,
    #[serde(default = "default_right")]
    right: Vec<String>,
    #[serde(default = "default_pause")]
    pause: Vec<String>,
}

// ── Defaults ──

fn default_tick_interval() -> u64 { 200 }
fn default_frame_sleep() -> u64 { 5 }
fn default_levels_dir() -> String { "levels".into() }

fn default_up() -> Vec<String> { vec!["Up".into(), "w".into()] }
fn default_down() -> Vec<String> { vec!["Down".into(), "s".into()] }
fn default_left() -> Vec<String> { vec!["Left".into(), "a".into()] }
fn default_right() -> Vec<String> { vec!["Right".into(), "d".into()] }
fn default_pause() -> Vec<String> { vec!["Esc".into(), "p".into()] }

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            tick_interval_ms: default_tick_interval(),
            frame_sleep_ms: default_frame_sleep(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral { levels_dir: default_levels_dir() }
    }
}

impl Default for TomlKeys {
    fn default() -> Self {
        TomlKeys {
            up: default_up(),
            down: default_down(),
            left: default_left(),
            right: default_right(),
            pause: default_pause(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        GameConfig::from_toml(toml_cfg, &search_dirs)
    }

    /// Parse config text directly. Malformed text falls back to defaults.
    pub fn parse(text: &str) -> Self {
        let toml_cfg = parse_toml(text, Path::new("config.toml"));
        GameConfig::from_toml(toml_cfg, &[])
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let levels_dir = resolve_levels_dir(&toml_cfg.general.levels_dir, search_dirs);
        GameConfig {
            timing: TimingConfig {
                tick_interval_ms: toml_cfg.timing.tick_interval_ms,
                frame_sleep_ms: toml_cfg.timing.frame_sleep_ms,
            },
            keys: KeyBindings {
                up: toml_cfg.keys.up,
                down: toml_cfg.keys.down,
                left: toml_cfg.keys.left,
                right: toml_cfg.keys.right,
                pause: toml_cfg.keys.pause,
            },
            levels_dir,
        }
    }
}

/// Absolute paths are used as-is; relative ones are looked up in the
/// candidate dirs and default to CWD-relative.
fn resolve_levels_dir(dir: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let path = PathBuf::from(dir);
    if path.is_absolute() {
        return path;
    }
    search_dirs
        .iter()
        .map(|d| d.join(dir))
        .find(|p| p.is_dir())
        .unwrap_or(path)
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// First readable `config.toml` in the candidate dirs wins.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                log::debug!("using config {}", path.display());
                return parse_toml(&text, &path);
            }
            Err(e) => log::warn!("could not read {}: {e}", path.display()),
        }
    }
    TomlConfig::default()
}

fn parse_toml(text: &str, path: &Path) -> TomlConfig {
    toml::from_str::<TomlConfig>(text).unwrap_or_else(|e| {
        log::warn!("{} parse error, using default settings: {e}", path.display());
        TomlConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_gives_defaults() {
        let cfg = GameConfig::parse("");
        assert_eq!(cfg.timing.tick_interval_ms, 200);
        assert_eq!(cfg.timing.frame_sleep_ms, 5);
        assert_eq!(cfg.levels_dir, PathBuf::from("levels"));
        assert_eq!(cfg.keys.pause, vec!["Esc".to_string(), "p".to_string()]);
        assert_eq!(cfg.engine_config().tick_interval, Duration::from_millis(200));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = GameConfig::parse("[timing]\ntick_interval_ms = 150\n\n[keys]\nup = [\"k\"]\n");
        assert_eq!(cfg.timing.tick_interval_ms, 150);
        assert_eq!(cfg.timing.frame_sleep_ms, 5);
        assert_eq!(cfg.keys.up, vec!["k".to_string()]);
        assert_eq!(cfg.keys.down, default_down());
    }

    #[test]
    fn malformed_text_falls_back() {
        let cfg = GameConfig::parse("[timing\ntick_interval_ms = ");
        assert_eq!(cfg.timing.tick_interval_ms, 200);
        let cfg = GameConfig::parse("[timing]\ntick_interval_ms = \"fast\"\n");
        assert_eq!(cfg.timing.tick_interval_ms, 200);
    }

    #[test]
    fn zero_interval_is_clamped() {
        let cfg = GameConfig::parse("[timing]\ntick_interval_ms = 0\n");
        assert_eq!(cfg.engine_config().tick_interval, Duration::from_millis(1));
    }

    #[test]
    fn absolute_levels_dir_is_kept() {
        let dir = std::env::temp_dir().join("rockfall-levels");
        let text = format!("[general]\nlevels_dir = {:?}\n", dir.to_string_lossy());
        let cfg = GameConfig::parse(&text);
        assert_eq!(cfg.levels_dir, dir);
    }
}
