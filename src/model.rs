use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Channel-level record, fetched once per channel and immutable within a run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    pub channel_id: String,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    /// The channel's uploads playlist; the catalog builder walks this.
    pub uploads_playlist_id: String,
    pub subscriber_count: Option<u64>,
    pub view_count: Option<u64>,
    pub video_count: Option<u64>,
}

/// One row of the video catalog (`videos.ndjson`).
///
/// `comment_count` is `None` when the uploader disabled comments; such videos
/// are never handed to the shard fetcher.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video_id: String,
    pub title: String,
    pub playlist_id: String,
    pub channel_id: String,
    pub channel_title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    pub duration_secs: u64,
    pub definition: String,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub comment_count: Option<u64>,
    pub category_id: String,
    pub description: String,
}

impl VideoRecord {
    /// Videos eligible for comment fetching: a known, non-zero comment count.
    pub fn has_comments(&self) -> bool {
        matches!(self.comment_count, Some(n) if n > 0)
    }
}

/// One flattened comment or reply, as stored in a shard.
///
/// A reply shares its parent's `comment_id`; its own id lives in `reply_id`.
/// The comment id alone is therefore NOT a unique key — use
/// [`CommentKey`] (comment id + reply id) instead.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommentRecord {
    pub video_id: String,
    pub comment_id: String,
    pub author: String,
    pub like_count: u64,
    /// Total replies under a top-level comment; `None` on reply rows.
    pub reply_count: Option<u64>,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub text: String,
    /// The reply's own id (`<parent>.<suffix>`); `None` for top-level rows.
    pub reply_id: Option<String>,
    pub top_level: bool,
}

impl CommentRecord {
    pub fn key(&self) -> CommentKey {
        CommentKey {
            comment_id: self.comment_id.clone(),
            reply_id: self.reply_id.clone(),
        }
    }
}

/// The stable join key carried through the sentiment pass.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommentKey {
    pub comment_id: String,
    pub reply_id: Option<String>,
}

/// One row of the merged comment table. The transient comment update
/// timestamp is dropped at merge time; a slice of catalog fields is joined in.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MergedComment {
    pub video_id: String,
    pub comment_id: String,
    pub author: String,
    pub like_count: u64,
    pub reply_count: Option<u64>,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    pub text: String,
    pub reply_id: Option<String>,
    pub top_level: bool,
    // Joined from the catalog; None when the catalog row is missing.
    pub video_title: Option<String>,
    pub video_channel_title: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub video_published_at: Option<OffsetDateTime>,
}

impl MergedComment {
    pub fn from_parts(c: &CommentRecord, v: Option<&VideoRecord>) -> Self {
        Self {
            video_id: c.video_id.clone(),
            comment_id: c.comment_id.clone(),
            author: c.author.clone(),
            like_count: c.like_count,
            reply_count: c.reply_count,
            published_at: c.published_at,
            text: c.text.clone(),
            reply_id: c.reply_id.clone(),
            top_level: c.top_level,
            video_title: v.map(|v| v.title.clone()),
            video_channel_title: v.map(|v| v.channel_title.clone()),
            video_published_at: v.map(|v| v.published_at),
        }
    }

    pub fn key(&self) -> CommentKey {
        CommentKey {
            comment_id: self.comment_id.clone(),
            reply_id: self.reply_id.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// Numeric encoding used by the sentiment indices.
    pub fn as_index(self) -> f64 {
        match self {
            SentimentLabel::Positive => 1.0,
            SentimentLabel::Neutral => 0.5,
            SentimentLabel::Negative => 0.0,
        }
    }
}

/// Classifier output for one comment body.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: SentimentLabel,
    pub p_positive: f64,
    pub p_negative: f64,
    pub p_neutral: f64,
}

/// One row of a sentiment checkpoint batch: the join key plus the score.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SentimentScore {
    #[serde(flatten)]
    pub key: CommentKey,
    #[serde(flatten)]
    pub sentiment: Sentiment,
}

/// One row of the final scored table (`comments_scored.ndjson`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScoredComment {
    #[serde(flatten)]
    pub comment: MergedComment,
    pub label: SentimentLabel,
    pub p_positive: f64,
    pub p_negative: f64,
    pub p_neutral: f64,
}
