//! Derived engagement metrics over the scored comment table, reported per
//! video and rolled up per channel. Owner comments are identified by author
//! name matching the channel title, as the upstream data allows.

use crate::model::{ScoredComment, SentimentLabel, VideoRecord};
use crate::ndjson::write_records_atomic;
use crate::paths::ChannelLayout;
use crate::util::{create_with_backoff, replace_file_atomic};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use time::Duration;

const SECONDS_PER_DAY: i64 = 86_400;
const RESPONSE_WINDOW_DAYS: i64 = 28;

/// Per-video engagement report row (`video_metrics.ndjson`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VideoMetrics {
    pub video_id: String,
    pub available_comments: u64,
    /// Reported count minus fetched rows; comments deleted or held back by
    /// moderation. Negative when the reported count lags behind.
    pub removed_comments: Option<i64>,
    pub removed_comments_perc: Option<f64>,
    /// Owner comments per 1000 comments.
    pub mod_activity: Option<f64>,
    pub median_word_count: Option<f64>,
    pub n_toplevel_user_comments: u64,
    pub n_user_replies: u64,
    pub ratio_replies_toplevel: Option<f64>,
    pub toplevel_neutrality: Option<f64>,
    /// Mean of the numeric sentiment encoding over top-level user comments;
    /// suppressed below the configured comment minimum.
    pub toplevel_sentiment_mean: Option<f64>,
    pub replies_sentiment_mean: Option<f64>,
    /// Share (percent) of first-four-weeks user comments arriving on day one.
    pub responsivity: Option<f64>,
    pub likes_per_1k_views: Option<f64>,
    pub comments_per_1k_views: Option<f64>,
    pub mean_comments_per_author: Option<f64>,
}

/// Channel-level rollup (`channel_metrics.json`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChannelMetrics {
    pub channel_id: String,
    pub n_videos: u64,
    pub reported_comments: u64,
    pub available_comments: u64,
    pub removed_comments: i64,
    pub removed_comments_perc: Option<f64>,
    pub mean_likes_per_1k_views: Option<f64>,
    pub mean_comments_per_1k_views: Option<f64>,
    pub mean_mod_activity: Option<f64>,
    pub mean_responsivity: Option<f64>,
    pub mean_toplevel_sentiment: Option<f64>,
    pub mean_ratio_replies_toplevel: Option<f64>,
}

#[derive(Default)]
struct VideoAccumulator {
    total: u64,
    owner: u64,
    toplevel_user: u64,
    user_replies: u64,
    toplevel_neutral: u64,
    toplevel_sentiment_sum: f64,
    reply_sentiment_sum: f64,
    user_word_counts: Vec<u64>,
    user_comments_by_author: HashMap<String, u64>,
    /// Response delays (comment published − video published) within the
    /// four-week window, in days.
    response_days: Vec<i64>,
}

impl VideoAccumulator {
    fn ingest(&mut self, c: &ScoredComment) {
        self.total += 1;
        let owner = c
            .comment
            .video_channel_title
            .as_deref()
            .is_some_and(|title| title == c.comment.author);
        if owner {
            self.owner += 1;
            return;
        }

        self.user_word_counts.push(c.comment.text.split_whitespace().count() as u64);
        *self
            .user_comments_by_author
            .entry(c.comment.author.clone())
            .or_insert(0) += 1;

        if c.comment.top_level {
            self.toplevel_user += 1;
            self.toplevel_sentiment_sum += c.label.as_index();
            if c.label == SentimentLabel::Neutral {
                self.toplevel_neutral += 1;
            }
        } else {
            self.user_replies += 1;
            self.reply_sentiment_sum += c.label.as_index();
        }

        if let Some(video_published) = c.comment.video_published_at {
            let delay: Duration = c.comment.published_at - video_published;
            let days = delay.whole_seconds().div_euclid(SECONDS_PER_DAY);
            if (0..RESPONSE_WINDOW_DAYS).contains(&days) {
                self.response_days.push(days);
            }
        }
    }

    fn into_metrics(mut self, video: Option<&VideoRecord>, min_for_sentiment: usize) -> VideoMetricsParts {
        let reported = video.and_then(|v| v.comment_count);
        let removed = reported.map(|r| r as i64 - self.total as i64);
        let removed_perc = match (removed, reported) {
            (Some(r), Some(total)) if total > 0 => Some(round1(r as f64 / total as f64 * 100.0)),
            _ => None,
        };

        let mod_activity =
            (self.total > 0).then(|| round1(self.owner as f64 / self.total as f64 * 1000.0));

        self.user_word_counts.sort_unstable();
        let median_word_count = median(&self.user_word_counts);

        let ratio = (self.toplevel_user > 0)
            .then(|| self.user_replies as f64 / self.toplevel_user as f64);
        let neutrality = (self.toplevel_user > 0)
            .then(|| self.toplevel_neutral as f64 / self.toplevel_user as f64);

        let toplevel_mean = (self.toplevel_user as usize >= min_for_sentiment.max(1))
            .then(|| round3(self.toplevel_sentiment_sum / self.toplevel_user as f64));
        let replies_mean = (self.user_replies > 0)
            .then(|| round3(self.reply_sentiment_sum / self.user_replies as f64));

        let responsivity = (!self.response_days.is_empty()).then(|| {
            let first_day = self.response_days.iter().filter(|d| **d < 1).count();
            round1(first_day as f64 / self.response_days.len() as f64 * 100.0)
        });

        let views = video.and_then(|v| v.view_count).filter(|v| *v > 0);
        let likes_per_1k = match (video.and_then(|v| v.like_count), views) {
            (Some(likes), Some(views)) => Some(round1(likes as f64 / views as f64 * 1000.0)),
            _ => None,
        };
        let comments_per_1k = match (reported, views) {
            (Some(c), Some(views)) => Some(round1(c as f64 / views as f64 * 1000.0)),
            _ => None,
        };

        let mean_per_author = (!self.user_comments_by_author.is_empty()).then(|| {
            let sum: u64 = self.user_comments_by_author.values().sum();
            sum as f64 / self.user_comments_by_author.len() as f64
        });

        VideoMetricsParts {
            available_comments: self.total,
            removed_comments: removed,
            removed_comments_perc: removed_perc,
            mod_activity,
            median_word_count,
            n_toplevel_user_comments: self.toplevel_user,
            n_user_replies: self.user_replies,
            ratio_replies_toplevel: ratio,
            toplevel_neutrality: neutrality,
            toplevel_sentiment_mean: toplevel_mean,
            replies_sentiment_mean: replies_mean,
            responsivity,
            likes_per_1k_views: likes_per_1k,
            comments_per_1k_views: comments_per_1k,
            mean_comments_per_author: mean_per_author,
        }
    }
}

struct VideoMetricsParts {
    available_comments: u64,
    removed_comments: Option<i64>,
    removed_comments_perc: Option<f64>,
    mod_activity: Option<f64>,
    median_word_count: Option<f64>,
    n_toplevel_user_comments: u64,
    n_user_replies: u64,
    ratio_replies_toplevel: Option<f64>,
    toplevel_neutrality: Option<f64>,
    toplevel_sentiment_mean: Option<f64>,
    replies_sentiment_mean: Option<f64>,
    responsivity: Option<f64>,
    likes_per_1k_views: Option<f64>,
    comments_per_1k_views: Option<f64>,
    mean_comments_per_author: Option<f64>,
}

/// Compute per-video metrics for every video that has at least one comment
/// row or a catalog entry with comments.
pub fn compute_video_metrics(
    catalog: &[VideoRecord],
    comments: &[ScoredComment],
    min_comments_for_sentiment_index: usize,
) -> Vec<VideoMetrics> {
    let by_id: HashMap<&str, &VideoRecord> =
        catalog.iter().map(|v| (v.video_id.as_str(), v)).collect();

    let mut accumulators: HashMap<String, VideoAccumulator> = HashMap::new();
    for comment in comments {
        accumulators
            .entry(comment.comment.video_id.clone())
            .or_default()
            .ingest(comment);
    }

    let mut video_ids: Vec<String> = accumulators.keys().cloned().collect();
    video_ids.sort();

    video_ids
        .into_iter()
        .map(|video_id| {
            let acc = accumulators.remove(&video_id).unwrap_or_default();
            let video = by_id.get(video_id.as_str()).copied();
            let parts = acc.into_metrics(video, min_comments_for_sentiment_index);
            VideoMetrics {
                video_id,
                available_comments: parts.available_comments,
                removed_comments: parts.removed_comments,
                removed_comments_perc: parts.removed_comments_perc,
                mod_activity: parts.mod_activity,
                median_word_count: parts.median_word_count,
                n_toplevel_user_comments: parts.n_toplevel_user_comments,
                n_user_replies: parts.n_user_replies,
                ratio_replies_toplevel: parts.ratio_replies_toplevel,
                toplevel_neutrality: parts.toplevel_neutrality,
                toplevel_sentiment_mean: parts.toplevel_sentiment_mean,
                replies_sentiment_mean: parts.replies_sentiment_mean,
                responsivity: parts.responsivity,
                likes_per_1k_views: parts.likes_per_1k_views,
                comments_per_1k_views: parts.comments_per_1k_views,
                mean_comments_per_author: parts.mean_comments_per_author,
            }
        })
        .collect()
}

/// Roll per-video metrics up to the channel. Means are simple averages over
/// the videos where the metric is defined, no weighting.
pub fn compute_channel_metrics(
    channel_id: &str,
    catalog: &[VideoRecord],
    video_metrics: &[VideoMetrics],
) -> ChannelMetrics {
    let reported: u64 = catalog.iter().filter_map(|v| v.comment_count).sum();
    let available: u64 = video_metrics.iter().map(|m| m.available_comments).sum();
    let removed: i64 = video_metrics.iter().filter_map(|m| m.removed_comments).sum();
    let denom = available as i64 + removed;
    let removed_perc = (denom > 0).then(|| round3(removed as f64 / denom as f64));

    ChannelMetrics {
        channel_id: channel_id.to_string(),
        n_videos: catalog.len() as u64,
        reported_comments: reported,
        available_comments: available,
        removed_comments: removed,
        removed_comments_perc: removed_perc,
        mean_likes_per_1k_views: mean_of(video_metrics, |m| m.likes_per_1k_views),
        mean_comments_per_1k_views: mean_of(video_metrics, |m| m.comments_per_1k_views),
        mean_mod_activity: mean_of(video_metrics, |m| m.mod_activity),
        mean_responsivity: mean_of(video_metrics, |m| m.responsivity),
        mean_toplevel_sentiment: mean_of(video_metrics, |m| m.toplevel_sentiment_mean),
        mean_ratio_replies_toplevel: mean_of(video_metrics, |m| m.ratio_replies_toplevel),
    }
}

/// Persist both report files atomically.
pub fn write_metrics(
    layout: &ChannelLayout,
    video_metrics: &[VideoMetrics],
    channel_metrics: &ChannelMetrics,
) -> Result<()> {
    write_records_atomic(&layout.video_metrics_file(), video_metrics)?;

    let final_path = layout.channel_metrics_file();
    let tmp = crate::ndjson::tmp_sibling(&final_path);
    let mut f = create_with_backoff(&tmp).with_context(|| format!("create {}", tmp.display()))?;
    serde_json::to_writer_pretty(&mut f, channel_metrics)?;
    f.flush()?;
    replace_file_atomic(&tmp, &final_path)
}

fn mean_of(metrics: &[VideoMetrics], pick: impl Fn(&VideoMetrics) -> Option<f64>) -> Option<f64> {
    let values: Vec<f64> = metrics.iter().filter_map(pick).collect();
    (!values.is_empty()).then(|| round3(values.iter().sum::<f64>() / values.len() as f64))
}

fn median(sorted: &[u64]) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
    } else {
        sorted[mid] as f64
    })
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}
