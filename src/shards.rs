//! Comment shard fetcher, the pipeline's resumability engine.
//!
//! Progress has exactly one source of truth: a shard file on disk means the
//! video's comment fetch is complete and durable. There is no separate
//! progress counter to drift from the filesystem. After each pass the set of
//! input ids without a shard is written to the pending-set manifest; a
//! non-empty manifest is the sole resume signal for the next pass.

use crate::api::{CommentThread, YouTubeApi};
use crate::error::ApiResult;
use crate::model::{CommentRecord, VideoRecord};
use crate::ndjson::{tmp_sibling, write_records_atomic};
use crate::pager::for_each_page;
use crate::paths::ChannelLayout;
use crate::progress::maybe_count_progress;
use crate::state::read_manifest;
use crate::util::{create_with_backoff, remove_with_backoff, replace_file_atomic};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::io::Write;

/// Result of one full sweep over the input id set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PassOutcome {
    /// Every input id has a shard on disk; the manifest was removed.
    AllComplete { fetched: usize },
    /// Some ids still lack a shard; they were written to the manifest.
    /// Expected under quota exhaustion; not an error.
    GapsRemain { fetched: usize, missing: Vec<String> },
}

impl PassOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, PassOutcome::AllComplete { .. })
    }
}

pub struct ShardFetcher<'a> {
    api: &'a dyn YouTubeApi,
    layout: &'a ChannelLayout,
    page_size: u32,
    progress: bool,
}

impl<'a> ShardFetcher<'a> {
    pub fn new(api: &'a dyn YouTubeApi, layout: &'a ChannelLayout, page_size: u32) -> Self {
        Self { api, layout, page_size, progress: false }
    }

    pub fn progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }

    /// Run one pass. In fresh mode the input set is every catalog video with
    /// a known, non-zero comment count; if a manifest exists it REPLACES the
    /// input set (retry-only mode). Ids that already have a shard are never
    /// re-touched within a manifest-driven pass.
    pub fn run_pass(&self, catalog: &[VideoRecord]) -> Result<PassOutcome> {
        let input: Vec<String> = match read_manifest(self.layout)? {
            Some(pending) => {
                tracing::info!(n = pending.len(), "continuing fetch from pending-set manifest");
                pending
            }
            None => {
                // Disabled (None) or zero comment counts are excluded up
                // front: never attempted, never counted as failures.
                let ids: Vec<String> = catalog
                    .iter()
                    .filter(|v| v.has_comments())
                    .map(|v| v.video_id.clone())
                    .collect();
                tracing::info!(n = ids.len(), "starting fresh comment fetch");
                ids
            }
        };

        std::fs::create_dir_all(self.layout.shards_dir())
            .with_context(|| format!("create {}", self.layout.shards_dir().display()))?;

        let already_done = self.layout.shard_ids()?;
        let pb = maybe_count_progress(self.progress, input.len() as u64, "Comment shards");

        for video_id in &input {
            if already_done.contains(video_id) {
                if let Some(pb) = &pb {
                    pb.inc(1);
                }
                continue;
            }
            // Failure isolation is per video: an error mid-pagination
            // abandons this video's partial output and moves on. The id stays
            // shard-less and lands in the manifest below.
            match self.fetch_video_comments(video_id) {
                Ok(records) => {
                    write_records_atomic(&self.layout.shard_file(video_id), &records)?;
                    tracing::info!(video = %video_id, n_comments = records.len(), "shard written");
                }
                Err(e) => {
                    tracing::warn!(video = %video_id, error = %e, "comment fetch failed; will retry via manifest");
                }
            }
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }
        if let Some(pb) = pb {
            pb.finish_with_message("pass done");
        }

        self.close_pass(&input)
    }

    /// Drain the comment-threads endpoint for one video, flattening each
    /// top-level comment and each of its replies into individual records.
    fn fetch_video_comments(&self, video_id: &str) -> ApiResult<Vec<CommentRecord>> {
        let mut records = Vec::new();
        for_each_page(
            |cursor| self.api.comment_threads(video_id, self.page_size, cursor),
            |threads| {
                for thread in threads {
                    flatten_thread(thread, &mut records);
                }
            },
        )?;
        Ok(records)
    }

    /// Compute gaps = input − shards-on-disk and persist/clear the manifest.
    fn close_pass(&self, input: &[String]) -> Result<PassOutcome> {
        let on_disk = self.layout.shard_ids()?;
        let input_set: BTreeSet<&str> = input.iter().map(String::as_str).collect();
        let missing: Vec<String> = input_set
            .iter()
            .filter(|id| !on_disk.contains(**id))
            .map(|id| id.to_string())
            .collect();
        let fetched = input_set.len() - missing.len();

        if missing.is_empty() {
            remove_with_backoff(&self.layout.manifest_file())?;
            tracing::info!("comments of all videos fetched");
            Ok(PassOutcome::AllComplete { fetched })
        } else {
            write_manifest(self.layout, &missing)?;
            tracing::warn!(n_missing = missing.len(), "comment fetch incomplete; manifest written");
            Ok(PassOutcome::GapsRemain { fetched, missing })
        }
    }
}

/// One thread becomes 1 + N records: the top-level comment, then each reply
/// sharing the parent's comment id with its own id in `reply_id`.
fn flatten_thread(thread: CommentThread, out: &mut Vec<CommentRecord>) {
    out.push(CommentRecord {
        video_id: thread.video_id.clone(),
        comment_id: thread.comment_id.clone(),
        author: thread.author,
        like_count: thread.like_count,
        reply_count: Some(thread.total_reply_count),
        published_at: thread.published_at,
        updated_at: thread.updated_at,
        text: thread.text,
        reply_id: None,
        top_level: true,
    });
    for reply in thread.replies {
        out.push(CommentRecord {
            video_id: if reply.video_id.is_empty() { thread.video_id.clone() } else { reply.video_id },
            comment_id: reply.parent_id,
            author: reply.author,
            like_count: reply.like_count,
            reply_count: None,
            published_at: reply.published_at,
            updated_at: reply.updated_at,
            text: reply.text,
            reply_id: Some(reply.reply_id),
            top_level: false,
        });
    }
}

/// Overwrite the pending-set manifest atomically.
fn write_manifest(layout: &ChannelLayout, missing: &[String]) -> Result<()> {
    let final_path = layout.manifest_file();
    let tmp = tmp_sibling(&final_path);
    let mut f = create_with_backoff(&tmp).with_context(|| format!("create {}", tmp.display()))?;
    serde_json::to_writer(&mut f, missing)?;
    f.flush()?;
    replace_file_atomic(&tmp, &final_path)
}
