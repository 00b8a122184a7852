pub mod config;
pub mod context;
pub mod identifier;
pub mod logging;
pub mod media_files;
