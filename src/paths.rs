//! Per-channel directory layout. Filename presence is the pipeline's only
//! cross-run state, so every component resolves paths through this one type
//! instead of formatting them ad hoc.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const CHANNEL_FILE: &str = "channel.json";
pub const CATALOG_FILE: &str = "videos.ndjson";
pub const MANIFEST_FILE: &str = "missing_videos.json";
pub const UNSCORED_FILE: &str = "comments_unscored.ndjson";
pub const SCORED_FILE: &str = "comments_scored.ndjson";
pub const VIDEO_METRICS_FILE: &str = "video_metrics.ndjson";
pub const CHANNEL_METRICS_FILE: &str = "channel_metrics.json";
const SHARDS_DIR: &str = "shards";
const SENTIMENT_PARTS_DIR: &str = "sentiment_parts";

/// Folder name derived from the channel title: spaces become underscores and
/// ampersands are dropped, matching the naming of existing corpora.
pub fn channel_folder_name(title: &str) -> String {
    title.replace(' ', "_").replace('&', "")
}

#[derive(Clone, Debug)]
pub struct ChannelLayout {
    root: PathBuf,
}

impl ChannelLayout {
    pub fn new(base_dir: &Path, channel_title: &str) -> Self {
        Self { root: base_dir.join(channel_folder_name(channel_title)) }
    }

    /// For tests and tools that address a channel directory directly.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("create channel dir {}", self.root.display()))
    }

    pub fn channel_file(&self) -> PathBuf {
        self.root.join(CHANNEL_FILE)
    }

    pub fn catalog_file(&self) -> PathBuf {
        self.root.join(CATALOG_FILE)
    }

    pub fn manifest_file(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn unscored_file(&self) -> PathBuf {
        self.root.join(UNSCORED_FILE)
    }

    pub fn scored_file(&self) -> PathBuf {
        self.root.join(SCORED_FILE)
    }

    pub fn video_metrics_file(&self) -> PathBuf {
        self.root.join(VIDEO_METRICS_FILE)
    }

    pub fn channel_metrics_file(&self) -> PathBuf {
        self.root.join(CHANNEL_METRICS_FILE)
    }

    pub fn shards_dir(&self) -> PathBuf {
        self.root.join(SHARDS_DIR)
    }

    pub fn shard_file(&self, video_id: &str) -> PathBuf {
        self.shards_dir().join(format!("{video_id}.ndjson"))
    }

    pub fn sentiment_parts_dir(&self) -> PathBuf {
        self.root.join(SENTIMENT_PARTS_DIR)
    }

    pub fn sentiment_batch_file(&self, batch_index: usize) -> PathBuf {
        self.sentiment_parts_dir().join(format!("batch_{batch_index:05}.ndjson"))
    }

    /// Video ids with a complete shard on disk. Temp `.part` files from an
    /// interrupted write are not shards and are ignored.
    pub fn shard_ids(&self) -> Result<BTreeSet<String>> {
        let dir = self.shards_dir();
        let mut ids = BTreeSet::new();
        if !dir.exists() {
            return Ok(ids);
        }
        for entry in fs::read_dir(&dir).with_context(|| format!("read {}", dir.display()))? {
            let path = entry?.path();
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if let Some(id) = name.strip_suffix(".ndjson") {
                    ids.insert(id.to_string());
                }
            }
        }
        Ok(ids)
    }
}
