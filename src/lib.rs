pub mod app;
pub mod config;
pub mod driver;
pub mod logging;
pub mod render;
pub mod shader;
pub mod terminal;
pub mod tuning;
pub mod visual;
