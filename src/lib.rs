mod config;
mod duration;
mod error;
mod model;
mod ndjson;
mod paths;
mod progress;
mod state;
mod util;

mod api;
mod credentials;
mod pager;

mod catalog;
mod concat;
mod sentiment;
mod shards;

mod aggregate;
mod pipeline;

pub use crate::config::{CatalogPolicy, EtlOptions};
pub use crate::error::{ApiError, ApiResult};
pub use crate::pipeline::{ChannelEtl, ChannelSession};

pub use crate::api::{
    CommentThread, HttpYouTubeClient, Page, PlaylistEntry, ReplyItem, VideoDetails, YouTubeApi,
};
pub use crate::credentials::{
    keys_from_env, ClientFactory, Credential, CredentialRotator, CredentialState,
    DEFAULT_PROBE_VIDEO_ID,
};
pub use crate::pager::{drain_pages, for_each_page};

pub use crate::model::{
    ChannelDescriptor, CommentKey, CommentRecord, MergedComment, ScoredComment, Sentiment,
    SentimentLabel, SentimentScore, VideoRecord,
};

pub use crate::paths::{channel_folder_name, ChannelLayout};
pub use crate::state::{read_manifest, ChannelState, PipelineStage};

pub use crate::catalog::{build_catalog, fetch_descriptor, write_descriptor};
pub use crate::shards::{PassOutcome, ShardFetcher};
pub use crate::concat::{merge_shards, MergeSummary};
pub use crate::sentiment::{
    apply_sentiment, HttpSentimentClassifier, ScoreSummary, SentimentClassifier,
};

pub use crate::aggregate::{
    compute_channel_metrics, compute_video_metrics, write_metrics, ChannelMetrics, VideoMetrics,
};

// Expose NDJSON helpers and robust file ops so binaries and tests can reuse
// the same atomic-write discipline.
pub use crate::ndjson::{read_records, write_records_atomic, NdjsonWriter};
pub use crate::util::{init_tracing_once, replace_file_atomic};

pub use crate::duration::parse_iso8601_duration;
