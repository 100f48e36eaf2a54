#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use time::macros::datetime;
use time::{Duration, OffsetDateTime};
use ytetl::{
    ApiError, ApiResult, ChannelDescriptor, CommentThread, Page, PlaylistEntry, ReplyItem,
    VideoDetails, YouTubeApi,
};

pub const PROBE_VIDEO: &str = "probe0000000";
// Exactly 24 chars, like real channel ids.
pub const CHANNEL_ID: &str = "UCtestchannel0000000abcd";
pub const UPLOADS: &str = "UUtestuploads";

/// Deterministic timestamps: a fixed epoch plus an offset in seconds.
pub fn ts(offset_secs: i64) -> OffsetDateTime {
    datetime!(2023-01-01 00:00 UTC) + Duration::seconds(offset_secs)
}

/// Scripted fixture data served by the mock API.
#[derive(Default)]
pub struct MockData {
    pub channels: HashMap<String, ChannelDescriptor>,
    /// playlist id -> entries, served in order with real cursor pagination.
    pub playlist_items: HashMap<String, Vec<PlaylistEntry>>,
    pub videos: HashMap<String, VideoDetails>,
    /// video id -> comment threads.
    pub threads: HashMap<String, Vec<CommentThread>>,
}

/// In-memory stand-in for the listing API. Clones share the fixture data and
/// the request log; the failing-video set and probe behavior are per clone so
/// one "credential" can be broken while another works.
#[derive(Clone)]
pub struct MockApi {
    data: Arc<Mutex<MockData>>,
    requests: Arc<Mutex<Vec<String>>>,
    failing_videos: Arc<Mutex<HashSet<String>>>,
    probe_ok: bool,
}

impl MockApi {
    pub fn new(data: MockData) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
            requests: Arc::new(Mutex::new(Vec::new())),
            failing_videos: Arc::new(Mutex::new(HashSet::new())),
            probe_ok: true,
        }
    }

    /// A view on the same data whose comment fetches fail for `ids`.
    pub fn with_failing_videos<I: IntoIterator<Item = String>>(&self, ids: I) -> Self {
        let mut clone = self.clone();
        clone.failing_videos = Arc::new(Mutex::new(ids.into_iter().collect()));
        clone
    }

    /// A view on the same data whose probe call always errors.
    pub fn with_broken_probe(&self) -> Self {
        let mut clone = self.clone();
        clone.probe_ok = false;
        clone
    }

    pub fn clear_failing_videos(&self) {
        self.failing_videos.lock().unwrap().clear();
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, needle: &str) -> usize {
        self.requests().iter().filter(|r| r.contains(needle)).count()
    }

    fn log(&self, line: String) {
        self.requests.lock().unwrap().push(line);
    }
}

fn paginate<T: Clone>(items: &[T], page_size: u32, cursor: Option<&str>) -> ApiResult<Page<T>> {
    let offset = match cursor {
        None => 0usize,
        Some(token) => token
            .strip_prefix("page-")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| ApiError::Malformed(format!("unknown cursor {token:?}")))?,
    };
    let end = (offset + page_size as usize).min(items.len());
    let next_cursor = (end < items.len()).then(|| format!("page-{end}"));
    Ok(Page { items: items[offset..end].to_vec(), next_cursor })
}

impl YouTubeApi for MockApi {
    fn channel(&self, channel_id: &str) -> ApiResult<Option<ChannelDescriptor>> {
        self.log(format!("channels id={channel_id}"));
        Ok(self.data.lock().unwrap().channels.get(channel_id).cloned())
    }

    fn playlist_items(
        &self,
        playlist_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> ApiResult<Page<PlaylistEntry>> {
        self.log(format!("playlistItems playlistId={playlist_id} cursor={cursor:?}"));
        let data = self.data.lock().unwrap();
        let items = data.playlist_items.get(playlist_id).cloned().unwrap_or_default();
        paginate(&items, page_size, cursor)
    }

    fn video_details(&self, video_id: &str) -> ApiResult<Option<VideoDetails>> {
        if video_id == PROBE_VIDEO && !self.probe_ok {
            return Err(ApiError::Status { status: 403, message: "quota exceeded".into() });
        }
        self.log(format!("videos id={video_id}"));
        Ok(self.data.lock().unwrap().videos.get(video_id).cloned())
    }

    fn comment_threads(
        &self,
        video_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> ApiResult<Page<CommentThread>> {
        self.log(format!("commentThreads videoId={video_id} cursor={cursor:?}"));
        if self.failing_videos.lock().unwrap().contains(video_id) {
            return Err(ApiError::Status { status: 503, message: "backend error".into() });
        }
        let data = self.data.lock().unwrap();
        let items = data.threads.get(video_id).cloned().unwrap_or_default();
        paginate(&items, page_size, cursor)
    }
}

// ----------------- fixture builders -----------------

pub fn mk_channel() -> ChannelDescriptor {
    ChannelDescriptor {
        channel_id: CHANNEL_ID.to_string(),
        title: "Test Channel".to_string(),
        published_at: ts(0),
        uploads_playlist_id: UPLOADS.to_string(),
        subscriber_count: Some(1000),
        view_count: Some(500_000),
        video_count: Some(3),
    }
}

pub fn mk_playlist_entry(video_id: &str, title: &str) -> PlaylistEntry {
    PlaylistEntry {
        video_id: video_id.to_string(),
        title: title.to_string(),
        playlist_id: UPLOADS.to_string(),
        owner_channel_id: Some(CHANNEL_ID.to_string()),
        owner_channel_title: Some("Test Channel".to_string()),
    }
}

/// A private/deleted playlist entry: no ownership metadata.
pub fn mk_private_entry(video_id: &str) -> PlaylistEntry {
    PlaylistEntry {
        video_id: video_id.to_string(),
        title: "Private video".to_string(),
        playlist_id: UPLOADS.to_string(),
        owner_channel_id: None,
        owner_channel_title: None,
    }
}

pub fn mk_video(video_id: &str, comment_count: Option<u64>) -> VideoDetails {
    VideoDetails {
        video_id: video_id.to_string(),
        published_at: ts(0),
        duration: "PT4M13S".to_string(),
        definition: "hd".to_string(),
        description: String::new(),
        category_id: "22".to_string(),
        view_count: Some(10_000),
        like_count: Some(500),
        comment_count,
    }
}

pub fn mk_probe_video() -> VideoDetails {
    mk_video(PROBE_VIDEO, Some(1))
}

/// One thread with `reply_authors.len()` replies. Replies share the parent's
/// comment id; each gets its own `<parent>.<n>` reply id.
pub fn mk_thread(video_id: &str, comment_id: &str, author: &str, reply_authors: &[&str]) -> CommentThread {
    let replies = reply_authors
        .iter()
        .enumerate()
        .map(|(i, reply_author)| ReplyItem {
            reply_id: format!("{comment_id}.{i}"),
            parent_id: comment_id.to_string(),
            video_id: video_id.to_string(),
            author: reply_author.to_string(),
            like_count: 0,
            published_at: ts(7200),
            updated_at: ts(7200),
            text: format!("reply {i} to {comment_id}"),
        })
        .collect::<Vec<_>>();
    CommentThread {
        video_id: video_id.to_string(),
        comment_id: comment_id.to_string(),
        author: author.to_string(),
        like_count: 3,
        total_reply_count: replies.len() as u64,
        published_at: ts(3600),
        updated_at: ts(3600),
        text: format!("comment {comment_id}"),
        replies,
    }
}

pub fn mk_video_record(video_id: &str, title: &str, comment_count: Option<u64>) -> ytetl::VideoRecord {
    ytetl::VideoRecord {
        video_id: video_id.to_string(),
        title: title.to_string(),
        playlist_id: UPLOADS.to_string(),
        channel_id: CHANNEL_ID.to_string(),
        channel_title: "Test Channel".to_string(),
        published_at: ts(0),
        duration_secs: 253,
        definition: "hd".to_string(),
        view_count: Some(10_000),
        like_count: Some(500),
        comment_count,
        category_id: "22".to_string(),
        description: String::new(),
    }
}

pub fn mk_comment_record(
    video_id: &str,
    comment_id: &str,
    reply_id: Option<&str>,
    author: &str,
    text: &str,
) -> ytetl::CommentRecord {
    ytetl::CommentRecord {
        video_id: video_id.to_string(),
        comment_id: comment_id.to_string(),
        author: author.to_string(),
        like_count: 1,
        reply_count: reply_id.is_none().then_some(0),
        published_at: ts(3600),
        updated_at: ts(3600),
        text: text.to_string(),
        reply_id: reply_id.map(str::to_string),
        top_level: reply_id.is_none(),
    }
}

/// Deterministic classifier: the label is read off the comment text. Can be
/// told to fail on a specific text to exercise checkpoint recovery.
#[derive(Default)]
pub struct ScriptedClassifier {
    pub calls: usize,
    pub fail_on_text: Option<String>,
}

impl ytetl::SentimentClassifier for ScriptedClassifier {
    fn classify(&mut self, text: &str) -> anyhow::Result<ytetl::Sentiment> {
        if self.fail_on_text.as_deref() == Some(text) {
            anyhow::bail!("classifier backend unavailable");
        }
        self.calls += 1;
        let label = if text.contains("love") {
            ytetl::SentimentLabel::Positive
        } else if text.contains("hate") {
            ytetl::SentimentLabel::Negative
        } else {
            ytetl::SentimentLabel::Neutral
        };
        let (p_positive, p_negative, p_neutral) = match label {
            ytetl::SentimentLabel::Positive => (0.9, 0.05, 0.05),
            ytetl::SentimentLabel::Negative => (0.05, 0.9, 0.05),
            ytetl::SentimentLabel::Neutral => (0.1, 0.1, 0.8),
        };
        Ok(ytetl::Sentiment { label, p_positive, p_negative, p_neutral })
    }
}

/// Factory wiring: every credential gets a clone of the same mock.
pub fn factory_for(api: &MockApi) -> ytetl::ClientFactory {
    let api = api.clone();
    Box::new(move |_cred| Box::new(api.clone()))
}

/// Factory wiring with per-key behavior, e.g. a broken first credential.
pub fn factory_by_key(clients: HashMap<String, MockApi>) -> ytetl::ClientFactory {
    Box::new(move |cred| {
        let api = clients
            .get(&cred.key)
            .unwrap_or_else(|| panic!("no mock for credential key {:?}", cred.key))
            .clone();
        Box::new(api)
    })
}
