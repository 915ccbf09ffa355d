//! convmem: import Claude and ChatGPT conversation exports into a
//! searchable SQLite memory store.

pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod progress;
pub mod source;
