// src/serve/mod.rs

//! Development server and live-reload fan-out.

pub mod reload;
pub mod server;

pub use reload::{ReloadHub, ReloadNotice};
pub use server::{EVENTS_PATH, LIVERELOAD_PATH, ServerHandle, create_router, spawn_server};
