pub mod agent;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod render;
pub mod snapshot;
pub mod system;
pub mod theme;
