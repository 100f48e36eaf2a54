mod common;

use common::*;
use ytetl::{
    apply_sentiment, read_records, write_records_atomic, ChannelLayout, MergedComment,
    ScoredComment, SentimentLabel,
};

fn mk_merged(comment_id: &str, reply_id: Option<&str>, text: &str) -> MergedComment {
    MergedComment::from_parts(
        &mk_comment_record("vid-aaa", comment_id, reply_id, "alice", text),
        Some(&mk_video_record("vid-aaa", "First video", Some(4))),
    )
}

fn seed_unscored(layout: &ChannelLayout, comments: &[MergedComment]) {
    std::fs::create_dir_all(layout.root()).unwrap();
    write_records_atomic(&layout.unscored_file(), comments).unwrap();
}

#[test]
fn scores_join_on_comment_and_reply_id() {
    let dir = tempfile::tempdir().unwrap();
    let layout = ChannelLayout::at(dir.path().join("chan"));
    // A parent and its reply share the comment id; only the reply id differs.
    seed_unscored(
        &layout,
        &[
            mk_merged("c1", None, "i love this"),
            mk_merged("c1", Some("c1.0"), "i hate this"),
            mk_merged("c2", None, "okay i guess"),
        ],
    );

    let mut classifier = ScriptedClassifier::default();
    let summary = apply_sentiment(&layout, &mut classifier, 10, false).unwrap();
    assert_eq!(summary.comments, 3);
    assert_eq!(summary.resumed, 0);

    let rows: Vec<ScoredComment> = read_records(&layout.scored_file()).unwrap();
    assert_eq!(rows.len(), 3);
    let parent = rows.iter().find(|r| r.comment.reply_id.is_none() && r.comment.comment_id == "c1").unwrap();
    assert_eq!(parent.label, SentimentLabel::Positive);
    let reply = rows.iter().find(|r| r.comment.reply_id.is_some()).unwrap();
    assert_eq!(reply.label, SentimentLabel::Negative);

    // Inputs are retired once the scored table is durable.
    assert!(!layout.unscored_file().exists());
    assert!(!layout.sentiment_parts_dir().exists());
}

#[test]
fn classifier_failure_keeps_completed_batches() {
    let dir = tempfile::tempdir().unwrap();
    let layout = ChannelLayout::at(dir.path().join("chan"));
    let comments: Vec<MergedComment> = (0..5)
        .map(|i| mk_merged(&format!("c{i}"), None, &format!("comment number {i}")))
        .collect();
    let mut comments = comments;
    comments[3].text = "poison".to_string();
    seed_unscored(&layout, &comments);

    // Batch size 2: batches (c0,c1), (c2,poison), (c4). The failure hits
    // batch 1 after batch 0 is checkpointed.
    let mut failing = ScriptedClassifier {
        fail_on_text: Some("poison".to_string()),
        ..Default::default()
    };
    assert!(apply_sentiment(&layout, &mut failing, 2, false).is_err());
    assert!(layout.sentiment_batch_file(0).exists());
    // The failed batch left no partial checkpoint.
    assert!(!layout.sentiment_batch_file(1).exists());
    assert!(layout.unscored_file().exists());
    assert!(!layout.scored_file().exists());

    // Retry with a healthy classifier: batch 0 is skipped, the rest scored.
    let mut healthy = ScriptedClassifier::default();
    let summary = apply_sentiment(&layout, &mut healthy, 2, false).unwrap();
    assert_eq!(summary.comments, 5);
    assert_eq!(summary.batches, 3);
    assert_eq!(summary.resumed, 1);
    assert_eq!(healthy.calls, 3, "checkpointed comments were re-classified");

    let rows: Vec<ScoredComment> = read_records(&layout.scored_file()).unwrap();
    assert_eq!(rows.len(), 5);
}

#[test]
fn rerun_after_completion_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    let layout = ChannelLayout::at(dir.path().join("chan"));
    seed_unscored(&layout, &[mk_merged("c1", None, "fine")]);

    let mut classifier = ScriptedClassifier::default();
    apply_sentiment(&layout, &mut classifier, 10, false).unwrap();
    let calls_after_first = classifier.calls;

    let summary = apply_sentiment(&layout, &mut classifier, 10, false).unwrap();
    assert_eq!(summary.comments, 0);
    assert_eq!(classifier.calls, calls_after_first);
}

#[test]
fn scoring_without_a_merged_table_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let layout = ChannelLayout::at(dir.path().join("chan"));
    std::fs::create_dir_all(layout.root()).unwrap();

    let mut classifier = ScriptedClassifier::default();
    assert!(apply_sentiment(&layout, &mut classifier, 10, false).is_err());
}

#[test]
fn scored_rows_keep_the_merged_fields() {
    let dir = tempfile::tempdir().unwrap();
    let layout = ChannelLayout::at(dir.path().join("chan"));
    seed_unscored(&layout, &[mk_merged("c1", None, "i love this")]);

    let mut classifier = ScriptedClassifier::default();
    apply_sentiment(&layout, &mut classifier, 10, false).unwrap();

    let rows: Vec<ScoredComment> = read_records(&layout.scored_file()).unwrap();
    let row = &rows[0];
    assert_eq!(row.comment.video_title.as_deref(), Some("First video"));
    assert_eq!(row.comment.author, "alice");
    assert!((row.p_positive - 0.9).abs() < f64::EPSILON);
}
