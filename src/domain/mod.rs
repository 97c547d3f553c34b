pub mod entity;
pub mod level;
pub mod tile;
