use std::path::{Path, PathBuf};

/// What to do when a video catalog file already exists on disk.
///
/// The catalog carries no staleness metadata, so reusing it silently misses
/// videos uploaded since the last run. That trade-off is an explicit choice
/// here rather than implicit skip-if-exists behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CatalogPolicy {
    /// Treat an existing `videos.ndjson` as complete and skip the fetch.
    ReuseExisting,
    /// Always re-enumerate the playlist and overwrite the catalog.
    Refresh,
}

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct EtlOptions {
    /// Parent of all per-channel working directories.
    pub base_dir: PathBuf,
    /// Items per API page; the API caps this at 50.
    pub page_size: u32,
    pub catalog_policy: CatalogPolicy,
    /// Skip the comment fetch entirely when a merged file already exists.
    pub reuse_merged: bool,
    /// Fetch passes to run against one credential before escalating to the
    /// next one in rotation.
    pub passes_per_credential: u32,
    /// Delete the per-video shard directory after a confirmed merge.
    pub remove_shards_after_merge: bool,
    /// Comments per sentiment checkpoint batch.
    pub sentiment_batch_size: usize,
    /// Suppress the top-level sentiment index for videos with fewer top-level
    /// user comments than this.
    pub min_comments_for_sentiment_index: usize,
    pub progress: bool,
}

impl Default for EtlOptions {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./data"),
            page_size: 50,
            catalog_policy: CatalogPolicy::ReuseExisting,
            reuse_merged: true,
            passes_per_credential: 3,
            remove_shards_after_merge: true,
            sentiment_batch_size: 250,
            min_comments_for_sentiment_index: 50,
            progress: true,
        }
    }
}

impl EtlOptions {
    pub fn with_base_dir(mut self, base_dir: impl AsRef<Path>) -> Self {
        self.base_dir = base_dir.as_ref().to_path_buf();
        self
    }
    pub fn with_page_size(mut self, n: u32) -> Self {
        self.page_size = n.clamp(1, 50);
        self
    }
    pub fn with_catalog_policy(mut self, policy: CatalogPolicy) -> Self {
        self.catalog_policy = policy;
        self
    }
    pub fn with_reuse_merged(mut self, yes: bool) -> Self {
        self.reuse_merged = yes;
        self
    }
    pub fn with_passes_per_credential(mut self, n: u32) -> Self {
        self.passes_per_credential = n.max(1);
        self
    }
    pub fn with_remove_shards_after_merge(mut self, yes: bool) -> Self {
        self.remove_shards_after_merge = yes;
        self
    }
    pub fn with_sentiment_batch_size(mut self, n: usize) -> Self {
        self.sentiment_batch_size = n.max(1);
        self
    }
    pub fn with_min_comments_for_sentiment_index(mut self, n: usize) -> Self {
        self.min_comments_for_sentiment_index = n;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
}
