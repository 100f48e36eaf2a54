mod common;

use common::*;
use ytetl::{
    compute_channel_metrics, compute_video_metrics, MergedComment, ScoredComment, SentimentLabel,
    VideoRecord,
};

fn scored(
    video: &VideoRecord,
    comment_id: &str,
    reply_id: Option<&str>,
    author: &str,
    text: &str,
    label: SentimentLabel,
) -> ScoredComment {
    let comment = MergedComment::from_parts(
        &mk_comment_record(&video.video_id, comment_id, reply_id, author, text),
        Some(video),
    );
    ScoredComment { comment, label, p_positive: 0.3, p_negative: 0.3, p_neutral: 0.4 }
}

/// One video, one owner comment, four top-level user comments, one reply.
fn fixture() -> (Vec<VideoRecord>, Vec<ScoredComment>) {
    let video = mk_video_record("vid-aaa", "First video", Some(10));
    let comments = vec![
        // Author matches the channel title, so this is a moderator comment.
        scored(&video, "c0", None, "Test Channel", "thanks all", SentimentLabel::Positive),
        scored(&video, "c1", None, "alice", "one", SentimentLabel::Positive),
        scored(&video, "c2", None, "bob", "two words", SentimentLabel::Positive),
        scored(&video, "c3", None, "carol", "three words here", SentimentLabel::Neutral),
        scored(&video, "c4", None, "dave", "four words right here", SentimentLabel::Negative),
        scored(&video, "c1", Some("c1.0"), "alice", "five words in this one", SentimentLabel::Positive),
    ];
    (vec![video], comments)
}

#[test]
fn per_video_metrics_add_up() {
    let (catalog, comments) = fixture();
    let metrics = compute_video_metrics(&catalog, &comments, 1);
    assert_eq!(metrics.len(), 1);
    let m = &metrics[0];

    assert_eq!(m.video_id, "vid-aaa");
    assert_eq!(m.available_comments, 6);
    // 10 reported, 6 fetched.
    assert_eq!(m.removed_comments, Some(4));
    assert_eq!(m.removed_comments_perc, Some(40.0));
    // 1 owner comment in 6, per mille.
    assert_eq!(m.mod_activity, Some(166.7));
    assert_eq!(m.n_toplevel_user_comments, 4);
    assert_eq!(m.n_user_replies, 1);
    assert_eq!(m.ratio_replies_toplevel, Some(0.25));
    assert_eq!(m.toplevel_neutrality, Some(0.25));
    // (1 + 1 + 0.5 + 0) / 4
    assert_eq!(m.toplevel_sentiment_mean, Some(0.625));
    assert_eq!(m.replies_sentiment_mean, Some(1.0));
    // Word counts 1..5, median 3. Owner comments excluded.
    assert_eq!(m.median_word_count, Some(3.0));
    // Every user comment arrived within the first day of a 4-week window.
    assert_eq!(m.responsivity, Some(100.0));
    assert_eq!(m.likes_per_1k_views, Some(50.0));
    assert_eq!(m.comments_per_1k_views, Some(1.0));
    // alice wrote 2 of the 5 user comments; 5 comments over 4 authors.
    assert_eq!(m.mean_comments_per_author, Some(1.25));
}

#[test]
fn sentiment_index_is_suppressed_below_the_minimum() {
    let (catalog, comments) = fixture();
    // 4 top-level user comments < 5 minimum.
    let metrics = compute_video_metrics(&catalog, &comments, 5);
    assert_eq!(metrics[0].toplevel_sentiment_mean, None);
    // Unconditional counters are unaffected.
    assert_eq!(metrics[0].n_toplevel_user_comments, 4);
}

#[test]
fn video_without_catalog_row_gets_counts_but_no_ratios() {
    let video = mk_video_record("vid-zzz", "Unknown", Some(1));
    let comments = vec![scored(&video, "c1", None, "alice", "hello there", SentimentLabel::Neutral)];
    // Empty catalog: no reported counts, views, or likes to relate to.
    let metrics = compute_video_metrics(&[], &comments, 1);
    let m = &metrics[0];
    assert_eq!(m.available_comments, 1);
    assert_eq!(m.removed_comments, None);
    assert_eq!(m.likes_per_1k_views, None);
    assert_eq!(m.comments_per_1k_views, None);
}

#[test]
fn channel_rollup_averages_defined_videos_only() {
    let video_a = mk_video_record("vid-aaa", "First video", Some(10));
    let video_b = mk_video_record("vid-bbb", "Second video", Some(2));
    let catalog = vec![video_a.clone(), video_b.clone()];
    let comments = vec![
        scored(&video_a, "c1", None, "alice", "great stuff", SentimentLabel::Positive),
        scored(&video_a, "c2", None, "bob", "not for me", SentimentLabel::Negative),
        scored(&video_b, "c3", None, "carol", "decent", SentimentLabel::Neutral),
    ];

    let video_metrics = compute_video_metrics(&catalog, &comments, 1);
    let channel = compute_channel_metrics(CHANNEL_ID, &catalog, &video_metrics);

    assert_eq!(channel.channel_id, CHANNEL_ID);
    assert_eq!(channel.n_videos, 2);
    assert_eq!(channel.reported_comments, 12);
    assert_eq!(channel.available_comments, 3);
    assert_eq!(channel.removed_comments, 9);
    // Mean over the two per-video sentiment means: (0.5 + 0.5) / 2.
    assert_eq!(channel.mean_toplevel_sentiment, Some(0.5));
}

#[test]
fn videos_are_reported_in_sorted_order() {
    let video_b = mk_video_record("vid-bbb", "Second video", Some(1));
    let video_a = mk_video_record("vid-aaa", "First video", Some(1));
    let comments = vec![
        scored(&video_b, "c1", None, "alice", "hi", SentimentLabel::Neutral),
        scored(&video_a, "c2", None, "bob", "ho", SentimentLabel::Neutral),
    ];
    let metrics = compute_video_metrics(&[video_a, video_b], &comments, 1);
    let ids: Vec<&str> = metrics.iter().map(|m| m.video_id.as_str()).collect();
    assert_eq!(ids, ["vid-aaa", "vid-bbb"]);
}
