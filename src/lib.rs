//! newsdeck: a terminal news dashboard.
//!
//! Aggregates RSS/Atom sources into one newest-first list, summarizes them
//! and chats through an OpenAI-compatible completion endpoint, fetches pages
//! through a relay and downloads videos with an external downloader.

pub mod app;
pub mod config;
pub mod feed;
pub mod llm;
pub mod proxy;
pub mod session;
pub mod status;
pub mod storage;
pub mod ui;
pub mod util;
pub mod video;
