//! Terminal User Interface module.
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard input handling
//! - `events` - Background task event processing
//! - `helpers` - Spawning of background flows
//! - `render` - Layout and dispatch to the panel widgets
//! - `news`, `chat`, `proxy`, `video` - Panel widgets
//! - `status` - Status line widget
//! - `markdown` - Summary markdown rendering

mod chat;
mod events;
mod helpers;
mod input;
mod loop_runner;
pub mod markdown;
mod news;
mod proxy;
mod render;
mod status;
mod video;

pub use loop_runner::{run, Action};

/// Upper bound for per-panel scroll offsets; ratatui scrolls in `u16`.
pub const MAX_SCROLL: usize = u16::MAX as usize;
