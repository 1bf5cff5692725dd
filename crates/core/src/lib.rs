pub mod config;
pub mod entity;

pub use config::Config;
pub use entity::*;
