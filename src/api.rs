//! The paginated listing API behind a trait so the pipeline can run against
//! an in-memory double in tests. The real client speaks the YouTube Data API
//! v3 over blocking HTTP; one call per request, no concurrency, so a shared
//! per-credential quota budget is respected by construction.

use crate::error::{ApiError, ApiResult};
use crate::model::ChannelDescriptor;
use serde::Deserialize;
use std::time::Duration;
use time::OffsetDateTime;

/// One page of items plus the cursor for the next page, if any. The cursor is
/// opaque: it is passed back verbatim and its absence is the only terminator.
#[derive(Clone, Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

/// Playlist-items row. Owner fields are absent for private/deleted videos;
/// the catalog builder excludes those entries rather than defaulting them.
#[derive(Clone, Debug)]
pub struct PlaylistEntry {
    pub video_id: String,
    pub title: String,
    pub playlist_id: String,
    pub owner_channel_id: Option<String>,
    pub owner_channel_title: Option<String>,
}

/// Statistics lookup result for one video id.
#[derive(Clone, Debug)]
pub struct VideoDetails {
    pub video_id: String,
    pub published_at: OffsetDateTime,
    pub duration: String,
    pub definition: String,
    pub description: String,
    pub category_id: String,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    /// `None` when comments are disabled for the video.
    pub comment_count: Option<u64>,
}

/// One comment thread: the top-level comment plus its (inline) replies.
#[derive(Clone, Debug)]
pub struct CommentThread {
    pub video_id: String,
    pub comment_id: String,
    pub author: String,
    pub like_count: u64,
    pub total_reply_count: u64,
    pub published_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub text: String,
    pub replies: Vec<ReplyItem>,
}

#[derive(Clone, Debug)]
pub struct ReplyItem {
    /// The reply's own id, `<parent>.<suffix>`.
    pub reply_id: String,
    /// The parent top-level comment id; shared across the whole thread.
    pub parent_id: String,
    pub video_id: String,
    pub author: String,
    pub like_count: u64,
    pub published_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub text: String,
}

/// The listing API consumed by the pipeline. Every method maps to exactly one
/// remote call; pagination is driven by the caller (see `pager`).
pub trait YouTubeApi {
    fn channel(&self, channel_id: &str) -> ApiResult<Option<ChannelDescriptor>>;

    fn playlist_items(
        &self,
        playlist_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> ApiResult<Page<PlaylistEntry>>;

    fn video_details(&self, video_id: &str) -> ApiResult<Option<VideoDetails>>;

    fn comment_threads(
        &self,
        video_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> ApiResult<Page<CommentThread>>;
}

// ----------------- HTTP client -----------------

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

pub struct HttpYouTubeClient {
    http: reqwest::blocking::Client,
    base_url: String,
    key: String,
}

impl HttpYouTubeClient {
    pub fn new(key: impl Into<String>) -> ApiResult<Self> {
        Ok(Self::with_http(Self::default_http()?, key))
    }

    /// Build the underlying HTTP transport. Construct it once and share it
    /// across per-credential clients; cloning a `reqwest` client is cheap.
    pub fn default_http() -> ApiResult<reqwest::blocking::Client> {
        Ok(reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?)
    }

    /// Bind a key to an already-built transport. Infallible, so it can live
    /// inside a `ClientFactory` closure.
    pub fn with_http(http: reqwest::blocking::Client, key: impl Into<String>) -> Self {
        Self { http, base_url: DEFAULT_BASE_URL.to_string(), key: key.into() }
    }

    /// Point the client at a different endpoint (proxies, test servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn get_json(&self, endpoint: &str, params: &[(&str, &str)]) -> ApiResult<serde_json::Value> {
        let url = format!("{}/{endpoint}", self.base_url);
        let mut query: Vec<(&str, &str)> = vec![("key", self.key.as_str())];
        query.extend_from_slice(params);

        let resp = self.http.get(&url).query(&query).send()?;
        let status = resp.status();
        if !status.is_success() {
            let body: serde_json::Value = resp.json().unwrap_or_default();
            let message = body["error"]["message"]
                .as_str()
                .unwrap_or("no error message")
                .to_string();
            return Err(ApiError::Status { status: status.as_u16(), message });
        }
        Ok(resp.json()?)
    }
}

impl YouTubeApi for HttpYouTubeClient {
    fn channel(&self, channel_id: &str) -> ApiResult<Option<ChannelDescriptor>> {
        let body = self.get_json(
            "channels",
            &[("part", "snippet,statistics,contentDetails"), ("id", channel_id)],
        )?;
        let resp: ListResponse<WireChannel> = parse_body(body)?;
        resp.items.into_iter().next().map(WireChannel::into_descriptor).transpose()
    }

    fn playlist_items(
        &self,
        playlist_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> ApiResult<Page<PlaylistEntry>> {
        let max = page_size.to_string();
        let mut params = vec![("part", "snippet"), ("playlistId", playlist_id), ("maxResults", max.as_str())];
        if let Some(token) = cursor {
            params.push(("pageToken", token));
        }
        let body = self.get_json("playlistItems", &params)?;
        let resp: ListResponse<WirePlaylistItem> = parse_body(body)?;
        Ok(Page {
            items: resp.items.into_iter().map(WirePlaylistItem::into_entry).collect(),
            next_cursor: resp.next_page_token,
        })
    }

    fn video_details(&self, video_id: &str) -> ApiResult<Option<VideoDetails>> {
        let body = self.get_json(
            "videos",
            &[("part", "snippet,contentDetails,statistics"), ("id", video_id)],
        )?;
        let resp: ListResponse<WireVideo> = parse_body(body)?;
        resp.items.into_iter().next().map(WireVideo::into_details).transpose()
    }

    fn comment_threads(
        &self,
        video_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> ApiResult<Page<CommentThread>> {
        let max = page_size.to_string();
        let mut params = vec![
            ("part", "snippet,replies"),
            ("videoId", video_id),
            ("maxResults", max.as_str()),
            ("textFormat", "plainText"),
        ];
        if let Some(token) = cursor {
            params.push(("pageToken", token));
        }
        let body = self.get_json("commentThreads", &params)?;
        let resp: ListResponse<WireCommentThread> = parse_body(body)?;
        let items = resp
            .items
            .into_iter()
            .map(WireCommentThread::into_thread)
            .collect::<ApiResult<Vec<_>>>()?;
        Ok(Page { items, next_cursor: resp.next_page_token })
    }
}

// ----------------- wire types -----------------

fn parse_body<T: serde::de::DeserializeOwned>(body: serde_json::Value) -> ApiResult<T> {
    serde_json::from_value(body).map_err(|e| ApiError::malformed(e.to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
}

fn parse_count(raw: Option<String>) -> Option<u64> {
    raw.and_then(|s| s.parse().ok())
}

fn parse_rfc3339(raw: &str) -> ApiResult<OffsetDateTime> {
    OffsetDateTime::parse(raw, &time::format_description::well_known::Rfc3339)
        .map_err(|e| ApiError::malformed(format!("bad timestamp {raw:?}: {e}")))
}

#[derive(Debug, Deserialize)]
struct WireChannel {
    id: String,
    snippet: WireChannelSnippet,
    statistics: WireChannelStats,
    #[serde(rename = "contentDetails")]
    content_details: WireChannelContentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireChannelSnippet {
    title: String,
    published_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireChannelStats {
    subscriber_count: Option<String>,
    view_count: Option<String>,
    video_count: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireChannelContentDetails {
    related_playlists: WireRelatedPlaylists,
}

#[derive(Debug, Deserialize)]
struct WireRelatedPlaylists {
    uploads: String,
}

impl WireChannel {
    fn into_descriptor(self) -> ApiResult<ChannelDescriptor> {
        Ok(ChannelDescriptor {
            channel_id: self.id,
            title: self.snippet.title,
            published_at: parse_rfc3339(&self.snippet.published_at)?,
            uploads_playlist_id: self.content_details.related_playlists.uploads,
            subscriber_count: parse_count(self.statistics.subscriber_count),
            view_count: parse_count(self.statistics.view_count),
            video_count: parse_count(self.statistics.video_count),
        })
    }
}

#[derive(Debug, Deserialize)]
struct WirePlaylistItem {
    snippet: WirePlaylistSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePlaylistSnippet {
    title: String,
    playlist_id: String,
    resource_id: WireResourceId,
    video_owner_channel_id: Option<String>,
    video_owner_channel_title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResourceId {
    video_id: String,
}

impl WirePlaylistItem {
    fn into_entry(self) -> PlaylistEntry {
        PlaylistEntry {
            video_id: self.snippet.resource_id.video_id,
            title: self.snippet.title,
            playlist_id: self.snippet.playlist_id,
            owner_channel_id: self.snippet.video_owner_channel_id,
            owner_channel_title: self.snippet.video_owner_channel_title,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireVideo {
    id: String,
    snippet: WireVideoSnippet,
    #[serde(rename = "contentDetails")]
    content_details: WireVideoContentDetails,
    statistics: WireVideoStats,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireVideoSnippet {
    published_at: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category_id: String,
}

#[derive(Debug, Deserialize)]
struct WireVideoContentDetails {
    duration: String,
    #[serde(default)]
    definition: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireVideoStats {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

impl WireVideo {
    fn into_details(self) -> ApiResult<VideoDetails> {
        Ok(VideoDetails {
            video_id: self.id,
            published_at: parse_rfc3339(&self.snippet.published_at)?,
            duration: self.content_details.duration,
            definition: self.content_details.definition,
            description: self.snippet.description,
            category_id: self.snippet.category_id,
            view_count: parse_count(self.statistics.view_count),
            like_count: parse_count(self.statistics.like_count),
            comment_count: parse_count(self.statistics.comment_count),
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireCommentThread {
    snippet: WireThreadSnippet,
    replies: Option<WireReplies>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireThreadSnippet {
    video_id: String,
    top_level_comment: WireComment,
    total_reply_count: u64,
}

#[derive(Debug, Deserialize)]
struct WireReplies {
    comments: Vec<WireComment>,
}

#[derive(Debug, Deserialize)]
struct WireComment {
    id: String,
    snippet: WireCommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCommentSnippet {
    #[serde(default)]
    video_id: String,
    author_display_name: String,
    #[serde(default)]
    like_count: u64,
    published_at: String,
    updated_at: String,
    text_display: String,
    parent_id: Option<String>,
}

impl WireCommentThread {
    fn into_thread(self) -> ApiResult<CommentThread> {
        let top = self.snippet.top_level_comment;
        let replies = self
            .replies
            .map(|r| r.comments)
            .unwrap_or_default()
            .into_iter()
            .map(|c| {
                let parent_id = c
                    .snippet
                    .parent_id
                    .ok_or_else(|| ApiError::malformed(format!("reply {} without parentId", c.id)))?;
                Ok(ReplyItem {
                    reply_id: c.id,
                    parent_id,
                    video_id: c.snippet.video_id,
                    author: c.snippet.author_display_name,
                    like_count: c.snippet.like_count,
                    published_at: parse_rfc3339(&c.snippet.published_at)?,
                    updated_at: parse_rfc3339(&c.snippet.updated_at)?,
                    text: c.snippet.text_display,
                })
            })
            .collect::<ApiResult<Vec<_>>>()?;

        Ok(CommentThread {
            video_id: self.snippet.video_id,
            comment_id: top.id,
            author: top.snippet.author_display_name,
            like_count: top.snippet.like_count,
            total_reply_count: self.snippet.total_reply_count,
            published_at: parse_rfc3339(&top.snippet.published_at)?,
            updated_at: parse_rfc3339(&top.snippet.updated_at)?,
            text: top.snippet.text_display,
            replies,
        })
    }
}
