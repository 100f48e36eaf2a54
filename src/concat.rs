//! Shard concatenator: merge every per-video shard into one comment table,
//! join a slice of catalog fields onto each row, and drop the transient
//! update timestamp. Runs only once the pending set is closed; merging with
//! gaps would silently produce an incomplete table.

use crate::model::{MergedComment, VideoRecord};
use crate::ndjson::{read_records, tmp_sibling, NdjsonWriter};
use crate::paths::ChannelLayout;
use crate::progress::maybe_count_progress;
use crate::state::ChannelState;
use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::fs;

#[derive(Clone, Copy, Debug)]
pub struct MergeSummary {
    pub shard_count: usize,
    pub row_count: u64,
}

/// Concatenate all shards into `comments_unscored.ndjson`.
///
/// `remove_shards` deletes the shard directory afterwards — irreversible, and
/// only done once the merged file is confirmed on disk.
pub fn merge_shards(
    layout: &ChannelLayout,
    catalog: &[VideoRecord],
    remove_shards: bool,
    progress: bool,
) -> Result<MergeSummary> {
    let state = ChannelState::inspect(layout)?;
    if state.has_gaps() {
        bail!(
            "pending-set manifest still lists {} videos; finish the fetch before merging",
            state.manifest.as_ref().map(Vec::len).unwrap_or(0)
        );
    }

    let shard_ids = layout.shard_ids()?;
    if shard_ids.is_empty() {
        bail!("no shards found under {}", layout.shards_dir().display());
    }

    let by_id: BTreeMap<&str, &VideoRecord> =
        catalog.iter().map(|v| (v.video_id.as_str(), v)).collect();

    let final_path = layout.unscored_file();
    let tmp = tmp_sibling(&final_path);
    let mut writer = NdjsonWriter::create(&tmp)?;

    let pb = maybe_count_progress(progress, shard_ids.len() as u64, "Concatenating shards");
    let mut row_count: u64 = 0;
    for video_id in &shard_ids {
        let shard_path = layout.shard_file(video_id);
        let records: Vec<crate::model::CommentRecord> = read_records(&shard_path)
            .with_context(|| format!("read shard {}", shard_path.display()))?;
        let video = by_id.get(video_id.as_str()).copied();
        if video.is_none() {
            tracing::warn!(video = %video_id, "shard has no catalog row; joined fields left empty");
        }
        for record in &records {
            writer.write_record(&MergedComment::from_parts(record, video))?;
            row_count += 1;
        }
        if let Some(pb) = &pb {
            pb.inc(1);
        }
    }
    writer.finish_atomic(&final_path)?;
    if let Some(pb) = pb {
        pb.finish_with_message("merge done");
    }

    tracing::info!(
        rows = row_count,
        shards = shard_ids.len(),
        path = %final_path.display(),
        "merged comment table written"
    );

    // Only drop the source shards once the merged artifact is durable.
    if remove_shards && final_path.exists() {
        fs::remove_dir_all(layout.shards_dir())
            .with_context(|| format!("remove {}", layout.shards_dir().display()))?;
        tracing::info!("shard directory deleted");
    }

    Ok(MergeSummary { shard_count: shard_ids.len(), row_count })
}
