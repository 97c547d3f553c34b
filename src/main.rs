/// Entry point and game loop.
///
/// ```text
/// rockfall                  play the catalog (levels/ dir or built-ins)
/// rockfall FILE.level       play a single level file
/// rockfall --validate FILE  check a level file and exit
/// rockfall --grid FILE N    play grid-only editor text needing N grubs
/// rockfall --validate --grid FILE N
/// ```

use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;

use crossterm::event::KeyCode;

use rockfall::app::{App, Phase};
use rockfall::config::GameConfig;
use rockfall::domain::level::Level;
use rockfall::sim::catalog::{load_grid_file, load_level_file, Catalog, CatalogError, CatalogSource};
use rockfall::sim::engine::Engine;
use rockfall::ui::input::{KeyMap, Keyboard};
use rockfall::ui::renderer::Renderer;

/// Where the level(s) to play or check come from.
enum Source {
    Catalog,
    File(PathBuf),
    /// Grid-only text plus the required grub count.
    Grid(PathBuf, String),
}

enum Command {
    Play(Source),
    Validate(Source),
    Help,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Command, String> {
    let mut args = args.into_iter();
    match args.next().as_deref() {
        None => Ok(Command::Play(Source::Catalog)),
        Some("-h") | Some("--help") => Ok(Command::Help),
        Some("--validate") => match parse_source(&mut args)? {
            Source::Catalog => Err("--validate needs a level file".to_string()),
            source => Ok(Command::Validate(source)),
        },
        Some("--grid") => Ok(Command::Play(parse_grid_args(&mut args)?)),
        Some(flag) if flag.starts_with('-') => Err(format!("unknown option {flag}")),
        Some(path) => Ok(Command::Play(Source::File(PathBuf::from(path)))),
    }
}

fn parse_source(args: &mut impl Iterator<Item = String>) -> Result<Source, String> {
    match args.next().as_deref() {
        None => Ok(Source::Catalog),
        Some("--grid") => parse_grid_args(args),
        Some(path) => Ok(Source::File(PathBuf::from(path))),
    }
}

fn parse_grid_args(args: &mut impl Iterator<Item = String>) -> Result<Source, String> {
    match (args.next(), args.next()) {
        (Some(path), Some(grubs)) => Ok(Source::Grid(PathBuf::from(path), grubs)),
        _ => Err("--grid needs a grid file and a grub count".to_string()),
    }
}

const USAGE: &str = "usage: rockfall [FILE.level | --grid FILE GRUBS | --validate (FILE.level | --grid FILE GRUBS)]";

fn main() {
    env_logger::init();

    let command = match parse_args(std::env::args().skip(1)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            std::process::exit(2);
        }
    };

    match command {
        Command::Help => println!("{USAGE}"),
        Command::Validate(source) => std::process::exit(validate(&source)),
        Command::Play(source) => {
            if let Err(e) = play(source) {
                eprintln!("Game error: {e}");
                std::process::exit(1);
            }
        }
    }
}

fn validate(source: &Source) -> i32 {
    let loaded: Result<Level, CatalogError> = match source {
        Source::File(path) => load_level_file(path),
        Source::Grid(path, grubs) => load_grid_file(path, grubs),
        Source::Catalog => return 2,
    };
    match loaded {
        Ok(level) => {
            println!(
                "OK: {:?} ({}x{}, {} grubs required, {}s)",
                level.name(),
                level.width() - 2,
                level.height() - 2,
                level.required_collectables(),
                level.max_time(),
            );
            0
        }
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}

fn play(source: Source) -> Result<(), Box<dyn Error>> {
    let config = GameConfig::load();
    let catalog = match source {
        Source::File(path) => Catalog::from_file(&path)?,
        Source::Grid(path, grubs) => Catalog::from_grid_file(&path, &grubs)?,
        Source::Catalog => Catalog::load(&config),
    };
    if catalog.is_empty() {
        return Err("no levels to play".into());
    }
    log::info!("{} levels from {:?}", catalog.len(), catalog.source());

    let mut renderer = Renderer::new();
    renderer.init()?;

    let result = game_loop(&mut renderer, &catalog, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    result?;

    println!();
    println!("Thanks for playing Rockfall!");
    Ok(())
}

const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];
const KEYS_BACK: &[KeyCode] = &[KeyCode::Esc];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];
const KEYS_MENU_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w')];
const KEYS_MENU_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s')];

fn game_loop(renderer: &mut Renderer, catalog: &Catalog, config: &GameConfig) -> Result<(), Box<dyn Error>> {
    let mut kb = Keyboard::new(KeyMap::from_bindings(&config.keys));
    kb.honor_release = renderer.reports_key_release();
    let mut engine = Engine::with_frame_clock(&config.engine_config());
    let mut app = App::new();
    let mut last_frame = Instant::now();

    // A single file skips the select screen.
    if matches!(catalog.source(), CatalogSource::File(_)) {
        app.start(&mut engine, catalog, 0);
    }

    loop {
        kb.drain_events();
        if kb.ctrl_c_pressed() {
            break;
        }

        let now = Instant::now();
        let dt = now.duration_since(last_frame).as_secs_f64();
        last_frame = now;

        match app.phase {
            Phase::LevelSelect => {
                if kb.any_pressed(KEYS_BACK) || kb.any_pressed(KEYS_QUIT) {
                    break;
                }
                if kb.any_pressed(KEYS_MENU_UP) {
                    app.move_cursor(-1, catalog.len());
                }
                if kb.any_pressed(KEYS_MENU_DOWN) {
                    app.move_cursor(1, catalog.len());
                }
                if let Some(d) = kb.pressed_digit().filter(|d| *d > 0) {
                    app.move_cursor(d as i32 - 1 - app.cursor as i32, catalog.len());
                }
                if kb.any_pressed(KEYS_CONFIRM) {
                    app.start(&mut engine, catalog, app.cursor);
                }
            }
            Phase::Playing => {
                if app.paused && kb.any_pressed(KEYS_QUIT) {
                    app.back_to_select(&mut engine);
                } else {
                    let events = app.play_frame(&mut engine, &kb.key_state(), dt);
                    for event in &events {
                        log::debug!("{event:?}");
                    }
                }
            }
            Phase::Finished(_) => {
                if kb.any_pressed(KEYS_CONFIRM) {
                    app.confirm_finish(&mut engine, catalog);
                } else if kb.any_pressed(KEYS_BACK) {
                    app.back_to_select(&mut engine);
                }
            }
            Phase::Complete => {
                if kb.any_pressed(KEYS_CONFIRM) || kb.any_pressed(KEYS_BACK) {
                    app.back_to_select(&mut engine);
                }
            }
        }

        app.anim_tick = app.anim_tick.wrapping_add(1);
        renderer.render(&app, &engine, catalog)?;
        std::thread::sleep(config.frame_sleep());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Command, String> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn no_args_plays_the_catalog() {
        assert!(matches!(args(&[]), Ok(Command::Play(Source::Catalog))));
    }

    #[test]
    fn grid_mode_routes_through_the_editor_path() {
        match args(&["--grid", "sketch.txt", "3"]) {
            Ok(Command::Play(Source::Grid(path, grubs))) => {
                assert_eq!(path, PathBuf::from("sketch.txt"));
                assert_eq!(grubs, "3");
            }
            _ => panic!("expected grid play"),
        }
        assert!(matches!(
            args(&["--validate", "--grid", "sketch.txt", "3"]),
            Ok(Command::Validate(Source::Grid(..)))
        ));
        assert!(args(&["--grid", "sketch.txt"]).is_err());
    }

    #[test]
    fn validate_needs_a_file() {
        assert!(matches!(args(&["--validate", "a.level"]), Ok(Command::Validate(Source::File(_)))));
        assert!(args(&["--validate"]).is_err());
        assert!(args(&["--bogus"]).is_err());
    }
}
