/// Level catalog: the ordered list of playable levels.
///
/// ## Sources (priority order):
///   1. `levels/` directory (individual `.level` files, sorted by file name)
///   2. Built-in tutorial levels
///
/// A file that fails to read or validate is skipped with a warning; the
/// rest of the directory still loads. A directory with no usable level
/// falls back to the built-in set.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::GameConfig;
use crate::domain::level::{Level, LevelError};

pub const LEVEL_EXTENSION: &str = "level";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}: {source}", path.display())]
    Level {
        path: PathBuf,
        #[source]
        source: LevelError,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogSource {
    Directory(PathBuf),
    File(PathBuf),
    Embedded,
    Provided,
}

#[derive(Clone, Debug)]
pub struct CatalogEntry {
    /// File the level came from; None for built-in levels.
    pub file: Option<PathBuf>,
    pub level: Level,
}

pub struct Catalog {
    entries: Vec<CatalogEntry>,
    source: CatalogSource,
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

impl Catalog {
    pub fn load(config: &GameConfig) -> Catalog {
        Catalog::from_dir(&config.levels_dir)
    }

    pub fn from_dir(dir: &Path) -> Catalog {
        if !dir.is_dir() {
            log::debug!("no levels directory at {}, using built-in levels", dir.display());
            return Catalog::embedded();
        }
        match load_from_directory(dir) {
            Ok(entries) if !entries.is_empty() => {
                log::debug!("loaded {} levels from {}", entries.len(), dir.display());
                Catalog { entries, source: CatalogSource::Directory(dir.to_path_buf()) }
            }
            Ok(_) => {
                log::warn!("no usable .{LEVEL_EXTENSION} files in {}, using built-in levels", dir.display());
                Catalog::embedded()
            }
            Err(e) => {
                log::warn!("{e}; using built-in levels");
                Catalog::embedded()
            }
        }
    }

    pub fn embedded() -> Catalog {
        let entries = EMBEDDED
            .iter()
            .filter_map(|text| match Level::parse(text) {
                Ok(level) => Some(CatalogEntry { file: None, level }),
                Err(e) => {
                    log::warn!("built-in level rejected: {e}");
                    None
                }
            })
            .collect();
        Catalog { entries, source: CatalogSource::Embedded }
    }

    /// A one-level catalog from a single file.
    pub fn from_file(path: &Path) -> Result<Catalog, CatalogError> {
        let level = load_level_file(path)?;
        Ok(Catalog {
            entries: vec![CatalogEntry { file: Some(path.to_path_buf()), level }],
            source: CatalogSource::File(path.to_path_buf()),
        })
    }

    /// A one-level catalog from grid-only editor text.
    pub fn from_grid_file(path: &Path, required: &str) -> Result<Catalog, CatalogError> {
        let level = load_grid_file(path, required)?;
        Ok(Catalog {
            entries: vec![CatalogEntry { file: Some(path.to_path_buf()), level }],
            source: CatalogSource::File(path.to_path_buf()),
        })
    }

    pub fn from_levels(levels: Vec<Level>) -> Catalog {
        let entries = levels.into_iter().map(|level| CatalogEntry { file: None, level }).collect();
        Catalog { entries, source: CatalogSource::Provided }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&Level> {
        self.entries.get(index).map(|e| &e.level)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn source(&self) -> &CatalogSource {
        &self.source
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.level.name()).collect()
    }
}

/// Read and validate one level file.
pub fn load_level_file(path: &Path) -> Result<Level, CatalogError> {
    let text = read_text(path)?;
    Level::parse(&text).map_err(|source| CatalogError::Level { path: path.to_path_buf(), source })
}

/// Read grid rows with no header and wrap them as an editor test level.
pub fn load_grid_file(path: &Path, required: &str) -> Result<Level, CatalogError> {
    let text = read_text(path)?;
    Level::from_editor(&text, required)
        .map_err(|source| CatalogError::Level { path: path.to_path_buf(), source })
}

fn read_text(path: &Path) -> Result<String, CatalogError> {
    std::fs::read_to_string(path).map_err(|source| CatalogError::Io { path: path.to_path_buf(), source })
}

// ══════════════════════════════════════════════════════════════
// Directory loading
// ══════════════════════════════════════════════════════════════

fn load_from_directory(dir: &Path) -> Result<Vec<CatalogEntry>, CatalogError> {
    let read = std::fs::read_dir(dir)
        .map_err(|source| CatalogError::Io { path: dir.to_path_buf(), source })?;

    let mut paths: Vec<PathBuf> = read
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == LEVEL_EXTENSION))
        .collect();
    paths.sort();

    let entries = paths
        .into_iter()
        .filter_map(|path| match load_level_file(&path) {
            Ok(level) => Some(CatalogEntry { file: Some(path), level }),
            Err(e) => {
                log::warn!("skipping level: {e}");
                None
            }
        })
        .collect();
    Ok(entries)
}

// ══════════════════════════════════════════════════════════════
// Built-in levels
// ══════════════════════════════════════════════════════════════

const EMBEDDED: &[&str] = &[
    "First Steps
3
90
PDDDDDDDDD
DDDGDDDDDD
DDDDDDGDDD
DGDDDDDDDX
",
    "Rolling Stones
4
120
P DDDODDDDDD
DDDDDDDDODDD
DGD DDGDDDDD
DDDODDDDDGDD
DDDDDDGDD  X
",
    "The Fox Den
5
150
PDDDDDDDDDDDDD
DDDDWWWWWDDDDD
DGDDW   WDDGDD
DDDDW F WDDDDD
DDODWWWWWDDODD
DGDDDDDDDDDDGD
DDDDDDGDDDDDDX
",
    "Avalanche
6
180
PDDOOOODDDDDDDDD
DDDDDDDDDDOODDDD
DGDDGDDDGDDDDGDD
DDD  DDDDDD  DDD
DOODDDDFDDDDOODD
DDDDGDDDDDDDGDDX
",
];
