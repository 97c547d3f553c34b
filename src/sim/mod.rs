pub mod catalog;
pub mod clock;
pub mod engine;
pub mod event;
pub mod input;
pub mod step;
pub mod world;
