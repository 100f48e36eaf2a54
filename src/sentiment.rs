//! Sentiment augmenter. The classifier itself is an external collaborator
//! behind a trait; this module owns the resumable batch loop around it.
//!
//! Scores are checkpointed in atomic per-batch files using the same pattern
//! as comment shards, so a classifier crash mid-pass loses at most one batch.
//! Scores carry the (comment id, reply id) join key, making the final merge
//! independent of row order. The unscored table is deleted only after the
//! scored table is confirmed on disk.

use crate::model::{CommentKey, MergedComment, ScoredComment, Sentiment, SentimentScore};
use crate::ndjson::{read_records, tmp_sibling, write_records_atomic, NdjsonWriter};
use crate::paths::ChannelLayout;
use crate::progress::maybe_count_progress;
use crate::util::remove_with_backoff;
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::fs;

/// An opaque classifier: one text in, a label plus three class probabilities
/// out. Implementations may hold model state, hence `&mut self`.
pub trait SentimentClassifier {
    fn classify(&mut self, text: &str) -> Result<Sentiment>;
}

#[derive(Clone, Copy, Debug)]
pub struct ScoreSummary {
    pub comments: u64,
    pub batches: usize,
    /// Batches found already checkpointed and skipped.
    pub resumed: usize,
}

/// Score every comment in the merged table and write the `_scored` file.
pub fn apply_sentiment(
    layout: &ChannelLayout,
    classifier: &mut dyn SentimentClassifier,
    batch_size: usize,
    progress: bool,
) -> Result<ScoreSummary> {
    let unscored_path = layout.unscored_file();
    if !unscored_path.exists() {
        if layout.scored_file().exists() {
            tracing::info!("comments already scored; nothing to do");
            return Ok(ScoreSummary { comments: 0, batches: 0, resumed: 0 });
        }
        bail!("no merged comment table at {}; run the merge first", unscored_path.display());
    }

    let comments: Vec<MergedComment> = read_records(&unscored_path)?;
    let batch_size = batch_size.max(1);
    fs::create_dir_all(layout.sentiment_parts_dir())
        .with_context(|| format!("create {}", layout.sentiment_parts_dir().display()))?;

    let pb = maybe_count_progress(progress, comments.len() as u64, "Sentiment");
    let mut resumed = 0usize;
    let mut batches = 0usize;

    for (batch_index, chunk) in comments.chunks(batch_size).enumerate() {
        batches += 1;
        let batch_path = layout.sentiment_batch_file(batch_index);
        if batch_path.exists() {
            resumed += 1;
            if let Some(pb) = &pb {
                pb.inc(chunk.len() as u64);
            }
            continue;
        }

        // A classifier error abandons this batch entirely: no partial
        // checkpoint is written, completed batches stay valid for resume.
        let mut scores = Vec::with_capacity(chunk.len());
        for comment in chunk {
            let sentiment = classifier
                .classify(&comment.text)
                .with_context(|| format!("classify comment {}", comment.comment_id))?;
            scores.push(SentimentScore { key: comment.key(), sentiment });
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }
        write_records_atomic(&batch_path, &scores)?;
        tracing::debug!(batch = batch_index, n = scores.len(), "sentiment batch checkpointed");
    }
    if let Some(pb) = pb {
        pb.finish_with_message("classification done");
    }

    let scores = load_all_scores(layout)?;
    let final_path = layout.scored_file();
    let tmp = tmp_sibling(&final_path);
    let mut writer = NdjsonWriter::create(&tmp)?;
    for comment in &comments {
        let key = comment.key();
        let Some(sentiment) = scores.get(&key) else {
            bail!("no sentiment checkpointed for comment {} (reply {:?})", key.comment_id, key.reply_id);
        };
        writer.write_record(&ScoredComment {
            comment: comment.clone(),
            label: sentiment.label,
            p_positive: sentiment.p_positive,
            p_negative: sentiment.p_negative,
            p_neutral: sentiment.p_neutral,
        })?;
    }
    writer.finish_atomic(&final_path)?;
    tracing::info!(rows = comments.len(), path = %final_path.display(), "scored comment table written");

    // The scored artifact is durable; retire its inputs.
    remove_with_backoff(&unscored_path)?;
    fs::remove_dir_all(layout.sentiment_parts_dir())
        .with_context(|| format!("remove {}", layout.sentiment_parts_dir().display()))?;

    Ok(ScoreSummary { comments: comments.len() as u64, batches, resumed })
}

/// Classifier backed by an HTTP scoring service: POST `{"text": …}`, expect
/// a label plus the three class probabilities back.
pub struct HttpSentimentClassifier {
    http: reqwest::blocking::Client,
    url: String,
}

#[derive(serde::Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
}

#[derive(serde::Deserialize)]
struct ClassifyResponse {
    label: crate::model::SentimentLabel,
    p_positive: f64,
    p_negative: f64,
    p_neutral: f64,
}

impl HttpSentimentClassifier {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;
        Ok(Self { http, url: url.into() })
    }
}

impl SentimentClassifier for HttpSentimentClassifier {
    fn classify(&mut self, text: &str) -> Result<Sentiment> {
        let resp: ClassifyResponse = self
            .http
            .post(&self.url)
            .json(&ClassifyRequest { text })
            .send()?
            .error_for_status()?
            .json()?;
        Ok(Sentiment {
            label: resp.label,
            p_positive: resp.p_positive,
            p_negative: resp.p_negative,
            p_neutral: resp.p_neutral,
        })
    }
}

fn load_all_scores(layout: &ChannelLayout) -> Result<HashMap<CommentKey, Sentiment>> {
    let dir = layout.sentiment_parts_dir();
    let mut paths: Vec<_> = fs::read_dir(&dir)
        .with_context(|| format!("read {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();
    paths.sort();

    let mut map = HashMap::new();
    for path in paths {
        let batch: Vec<SentimentScore> = read_records(&path)?;
        for score in batch {
            map.insert(score.key, score.sentiment);
        }
    }
    Ok(map)
}
