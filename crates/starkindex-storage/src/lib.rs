//! starkindex-storage: durable storage backends for StarkIndex.
//!
//! Backends:
//! - [`json`]: `events.json` + `cursor.json` under one directory
//! - [`blocks`]: one JSON file per archived block, bucketed into directories
//!
//! The in-memory backend lives in `starkindex-core` (`MemoryStore`).

pub mod blocks;
pub mod json;

pub use blocks::BlockArchive;
pub use json::{read_records, JsonFileStore};
