// Utility Module
// Key file persistence and its configuration

pub mod file_ops;

pub use file_ops::{load_keypair, save_keypair, FileError, FileResult, KeyFileConfig};
