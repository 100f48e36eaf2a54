//! Video catalog builder: enumerate a channel's uploads playlist, drop
//! entries without ownership metadata (private or deleted videos), pull
//! per-video statistics, and persist the catalog as one atomic file.

use crate::api::YouTubeApi;
use crate::config::{CatalogPolicy, EtlOptions};
use crate::duration::parse_iso8601_duration;
use crate::error::ApiError;
use crate::model::{ChannelDescriptor, VideoRecord};
use crate::ndjson::{read_records, write_records_atomic};
use crate::pager::drain_pages;
use crate::paths::ChannelLayout;
use crate::progress::maybe_count_progress;
use crate::util::replace_file_atomic;
use anyhow::{Context, Result};
use std::io::Write;

/// Fetch the channel descriptor. A missing channel is fatal for the run;
/// there is no retry path for a bad id.
pub fn fetch_descriptor(api: &dyn YouTubeApi, channel_id: &str) -> Result<ChannelDescriptor> {
    let descriptor = api
        .channel(channel_id)?
        .ok_or_else(|| ApiError::NotFound { kind: "channel", id: channel_id.to_string() })?;
    tracing::info!(channel = %descriptor.title, "loaded channel");
    Ok(descriptor)
}

/// Persist the channel descriptor as `channel.json` (atomic).
pub fn write_descriptor(layout: &ChannelLayout, descriptor: &ChannelDescriptor) -> Result<()> {
    layout.ensure_root()?;
    let final_path = layout.channel_file();
    let tmp = crate::ndjson::tmp_sibling(&final_path);
    let mut f = crate::util::create_with_backoff(&tmp)
        .with_context(|| format!("create {}", tmp.display()))?;
    serde_json::to_writer_pretty(&mut f, descriptor)?;
    f.flush()?;
    replace_file_atomic(&tmp, &final_path)
}

/// Build (or reuse) the video catalog for a channel.
///
/// With [`CatalogPolicy::ReuseExisting`] an on-disk `videos.ndjson` is
/// treated as complete and returned as-is; new uploads since it was written
/// are not picked up. [`CatalogPolicy::Refresh`] always re-enumerates.
pub fn build_catalog(
    api: &dyn YouTubeApi,
    layout: &ChannelLayout,
    descriptor: &ChannelDescriptor,
    opts: &EtlOptions,
) -> Result<Vec<VideoRecord>> {
    let catalog_path = layout.catalog_file();
    if opts.catalog_policy == CatalogPolicy::ReuseExisting && catalog_path.exists() {
        let videos: Vec<VideoRecord> = read_records(&catalog_path)?;
        tracing::info!(
            n_videos = videos.len(),
            "reusing existing catalog; use CatalogPolicy::Refresh for fresh data"
        );
        return Ok(videos);
    }

    let playlist_id = descriptor.uploads_playlist_id.as_str();
    let entries = drain_pages(|cursor| api.playlist_items(playlist_id, opts.page_size, cursor))
        .with_context(|| format!("enumerate playlist {playlist_id}"))?;
    let total = entries.len();

    // Private and deleted videos carry no owner fields; exclude them instead
    // of defaulting ownership.
    let entries: Vec<_> = entries
        .into_iter()
        .filter(|e| e.owner_channel_id.is_some() && e.owner_channel_title.is_some())
        .collect();
    tracing::info!(
        kept = entries.len(),
        dropped = total - entries.len(),
        "playlist enumeration done"
    );

    let pb = maybe_count_progress(opts.progress, entries.len() as u64, "Video statistics");
    let mut videos = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(details) = api
            .video_details(&entry.video_id)
            .with_context(|| format!("statistics lookup for {}", entry.video_id))?
        else {
            // Vanished between enumeration and lookup.
            tracing::warn!(video = %entry.video_id, "no statistics returned; skipping");
            if let Some(pb) = &pb {
                pb.inc(1);
            }
            continue;
        };

        let duration_secs = parse_iso8601_duration(&details.duration)
            .map_err(|e| ApiError::malformed(e))
            .with_context(|| format!("duration of {}", entry.video_id))?;

        videos.push(VideoRecord {
            video_id: details.video_id,
            title: entry.title,
            playlist_id: entry.playlist_id,
            // Both present after the filter above.
            channel_id: entry.owner_channel_id.unwrap_or_default(),
            channel_title: entry.owner_channel_title.unwrap_or_default(),
            published_at: details.published_at,
            duration_secs,
            definition: details.definition,
            view_count: details.view_count,
            like_count: details.like_count,
            comment_count: details.comment_count,
            category_id: details.category_id,
            description: details.description,
        });
        if let Some(pb) = &pb {
            pb.inc(1);
        }
    }
    if let Some(pb) = pb {
        pb.finish_with_message("catalog done");
    }

    layout.ensure_root()?;
    write_records_atomic(&catalog_path, &videos)?;
    tracing::info!(n_videos = videos.len(), path = %catalog_path.display(), "catalog written");
    Ok(videos)
}
