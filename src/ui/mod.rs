// UI Module
// Interactive console front end

pub mod app;

pub use app::{run_console, Session, SessionReport};
