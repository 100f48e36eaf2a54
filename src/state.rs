//! Explicit pipeline-state queries. Components used to infer progress from
//! scattered directory listings; this module inspects a channel layout once
//! and answers "where is this channel in the pipeline" through one type.
//! Filename-existence semantics are unchanged, so directories written by
//! older runs read back identically.

use crate::paths::ChannelLayout;
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;

/// Where a channel directory stands, derived purely from which files exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    /// No catalog yet; nothing has been fetched.
    Empty,
    /// Catalog present, comment fetch not finished (manifest present or no
    /// merged file yet).
    Fetching,
    /// All shards merged, sentiment not yet applied.
    Unscored,
    /// Sentiment applied; the scored table is the terminal artifact.
    Scored,
}

#[derive(Clone, Debug)]
pub struct ChannelState {
    pub catalog_exists: bool,
    pub shard_ids: BTreeSet<String>,
    /// Contents of the pending-set manifest, when one is on disk.
    pub manifest: Option<Vec<String>>,
    pub unscored_exists: bool,
    pub scored_exists: bool,
}

impl ChannelState {
    /// Snapshot the channel directory. Cheap: one directory listing plus one
    /// small JSON file.
    pub fn inspect(layout: &ChannelLayout) -> Result<Self> {
        Ok(Self {
            catalog_exists: layout.catalog_file().exists(),
            shard_ids: layout.shard_ids()?,
            manifest: read_manifest(layout)?,
            unscored_exists: layout.unscored_file().exists(),
            scored_exists: layout.scored_file().exists(),
        })
    }

    pub fn stage(&self) -> PipelineStage {
        if self.scored_exists {
            PipelineStage::Scored
        } else if self.unscored_exists {
            PipelineStage::Unscored
        } else if self.catalog_exists {
            PipelineStage::Fetching
        } else {
            PipelineStage::Empty
        }
    }

    /// A non-empty manifest is the sole resume signal for the shard fetcher.
    pub fn has_gaps(&self) -> bool {
        self.manifest.as_ref().is_some_and(|m| !m.is_empty())
    }

    /// A merged file means the comment fetch for this channel already
    /// completed in a prior run.
    pub fn fetch_already_merged(&self) -> bool {
        self.unscored_exists || self.scored_exists
    }
}

/// Read the pending-set manifest, `None` when absent.
pub fn read_manifest(layout: &ChannelLayout) -> Result<Option<Vec<String>>> {
    let path = layout.manifest_file();
    if !path.exists() {
        return Ok(None);
    }
    let f = File::open(&path).with_context(|| format!("open {}", path.display()))?;
    let ids: Vec<String> = serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(ids))
}
