//! Raw block archive on disk.
//!
//! ```text
//! <root>/<n / blocks_per_dir>/<n>.json   one pretty-printed block per file
//! ```
//!
//! Files are written through the same temp-file rename as the JSON store.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};

use starkindex_core::archive::BlockSink;
use starkindex_core::error::IndexerError;
use starkindex_core::types::BlockNumber;

use crate::json::write_atomic;

pub const DEFAULT_BLOCKS_PER_DIR: u64 = 1000;

#[derive(Debug, Clone)]
pub struct BlockArchive {
    root: PathBuf,
    blocks_per_dir: u64,
}

impl BlockArchive {
    /// Open (creating if needed) the archive directory `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, IndexerError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        tracing::debug!(root = %root.display(), "opened block archive");
        Ok(Self {
            root,
            blocks_per_dir: DEFAULT_BLOCKS_PER_DIR,
        })
    }

    pub fn blocks_per_dir(mut self, n: u64) -> Self {
        self.blocks_per_dir = n.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn block_path(&self, number: BlockNumber) -> PathBuf {
        self.root
            .join((number / self.blocks_per_dir).to_string())
            .join(format!("{number}.json"))
    }
}

/// Largest `<u64><suffix>` name among the entries of `dir`.
async fn highest_entry(dir: &Path, suffix: &str, want_dir: bool) -> Result<Option<u64>, IndexerError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut highest = None;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() != want_dir {
            continue;
        }
        let name = entry.file_name();
        let parsed = name
            .to_str()
            .and_then(|n| n.strip_suffix(suffix))
            .and_then(|n| n.parse::<u64>().ok());
        if let Some(n) = parsed {
            highest = highest.max(Some(n));
        }
    }
    Ok(highest)
}

#[async_trait]
impl BlockSink for BlockArchive {
    async fn highest_block(&self) -> Result<Option<BlockNumber>, IndexerError> {
        // the newest bucket can be empty if a run stopped right after creating it
        let mut bucket = highest_entry(&self.root, "", true).await?;
        while let Some(b) = bucket {
            let dir = self.root.join(b.to_string());
            if let Some(n) = highest_entry(&dir, ".json", false).await? {
                return Ok(Some(n));
            }
            bucket = b.checked_sub(1);
        }
        Ok(None)
    }

    async fn write_block(&self, number: BlockNumber, block: &Value) -> Result<(), IndexerError> {
        let path = self.block_path(number);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let bytes =
            serde_json::to_vec_pretty(block).map_err(|e| IndexerError::Storage(e.to_string()))?;
        write_atomic(&path, bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DIRS: AtomicUsize = AtomicUsize::new(0);

    fn scratch_dir() -> PathBuf {
        let n = DIRS.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("starkindex-blocks-{}-{n}", std::process::id()))
    }

    #[tokio::test]
    async fn blocks_are_bucketed_by_height() {
        let root = scratch_dir();
        let archive = BlockArchive::open(&root).await.unwrap().blocks_per_dir(100);

        archive.write_block(42, &json!({"block_number": 42})).await.unwrap();
        archive.write_block(1_250, &json!({"block_number": 1250})).await.unwrap();

        assert_eq!(archive.block_path(42), root.join("0").join("42.json"));
        let text = std::fs::read_to_string(root.join("12").join("1250.json")).unwrap();
        let back: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back["block_number"], 1250);
        assert!(text.contains('\n'), "block files are pretty-printed");
        assert!(!root.join("12").join("1250.json.tmp").exists());

        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn highest_block_spans_buckets() {
        let root = scratch_dir();
        let archive = BlockArchive::open(&root).await.unwrap().blocks_per_dir(10);
        for n in [3, 9, 15, 17] {
            archive.write_block(n, &json!({})).await.unwrap();
        }
        // stray entries are ignored
        std::fs::write(root.join("1").join("notes.txt"), b"x").unwrap();
        std::fs::create_dir_all(root.join("tmp")).unwrap();
        assert_eq!(archive.highest_block().await.unwrap(), Some(17));

        // an empty newest bucket falls back to the previous one
        std::fs::create_dir_all(root.join("5")).unwrap();
        assert_eq!(archive.highest_block().await.unwrap(), Some(17));

        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn empty_archive_has_no_highest_block() {
        let root = scratch_dir();
        let archive = BlockArchive::open(&root).await.unwrap();
        assert_eq!(archive.highest_block().await.unwrap(), None);
        std::fs::remove_dir_all(&root).ok();
    }
}
