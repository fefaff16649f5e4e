//! Configuration loading for mineserver

mod loader;

pub use loader::{HierarchicalConfigLoader, CONFIG_FILE_NAME};
