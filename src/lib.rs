// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod api;
pub mod app_dirs;
pub mod attempts;
pub mod config;
pub mod grouping;
pub mod persist;
pub mod question;
pub mod runtime;
pub mod session;
pub mod shuffle;
pub mod timer;
