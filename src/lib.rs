//! Rockfall: a deterministic boulder-and-grub digging puzzle.
//!
//! `domain` holds the immutable pieces (tiles, levels, entities), `sim` the
//! tick-driven engine, `app` and `ui` the terminal host around it.

pub mod app;
pub mod config;
pub mod domain;
pub mod sim;
pub mod ui;
