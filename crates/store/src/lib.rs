#![deny(unused)]
//! Persistence for Taskforge: task and step storage plus per-task file
//! artifacts (append-only log, report).

pub mod files;
pub mod memory;
pub mod sqlite;

pub use files::TaskFileSink;
pub use memory::InMemoryTaskStore;
pub use sqlite::SqliteTaskStore;
