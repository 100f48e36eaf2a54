//! Pipeline orchestration: a builder-style entry point plus a per-channel
//! session that runs catalog → shards → merge → sentiment → metrics.
//!
//! Exactly one process may work a given channel directory at a time; shard
//! and manifest writes are not guarded against concurrent invocation.

use crate::aggregate::{compute_channel_metrics, compute_video_metrics, write_metrics, ChannelMetrics};
use crate::catalog::{build_catalog, fetch_descriptor, write_descriptor};
use crate::concat::{merge_shards, MergeSummary};
use crate::config::{CatalogPolicy, EtlOptions};
use crate::credentials::CredentialRotator;
use crate::error::ApiError;
use crate::model::{ChannelDescriptor, ScoredComment, VideoRecord};
use crate::ndjson::read_records;
use crate::paths::ChannelLayout;
use crate::sentiment::{apply_sentiment, ScoreSummary, SentimentClassifier};
use crate::shards::{PassOutcome, ShardFetcher};
use crate::state::ChannelState;
use crate::util::init_tracing_once;
use anyhow::{bail, Context, Result};
use regex::Regex;

#[derive(Clone, Default)]
pub struct ChannelEtl {
    opts: EtlOptions,
}

impl ChannelEtl {
    pub fn new() -> Self {
        Self { opts: EtlOptions::default() }
    }

    // -------- Builder methods --------
    pub fn base_dir(mut self, base: impl AsRef<std::path::Path>) -> Self {
        self.opts = self.opts.with_base_dir(base);
        self
    }
    pub fn page_size(mut self, n: u32) -> Self {
        self.opts = self.opts.with_page_size(n);
        self
    }
    pub fn catalog_policy(mut self, policy: CatalogPolicy) -> Self {
        self.opts = self.opts.with_catalog_policy(policy);
        self
    }
    pub fn reuse_merged(mut self, yes: bool) -> Self {
        self.opts = self.opts.with_reuse_merged(yes);
        self
    }
    pub fn passes_per_credential(mut self, n: u32) -> Self {
        self.opts = self.opts.with_passes_per_credential(n);
        self
    }
    pub fn remove_shards_after_merge(mut self, yes: bool) -> Self {
        self.opts = self.opts.with_remove_shards_after_merge(yes);
        self
    }
    pub fn sentiment_batch_size(mut self, n: usize) -> Self {
        self.opts = self.opts.with_sentiment_batch_size(n);
        self
    }
    pub fn min_comments_for_sentiment_index(mut self, n: usize) -> Self {
        self.opts = self.opts.with_min_comments_for_sentiment_index(n);
        self
    }
    pub fn progress(mut self, yes: bool) -> Self {
        self.opts = self.opts.with_progress(yes);
        self
    }

    /// Validate the channel id, look the channel up, and open a per-channel
    /// session with its descriptor persisted. A bad or unknown id is fatal.
    pub fn open_channel(
        &self,
        rotator: &mut CredentialRotator,
        channel_id: &str,
    ) -> Result<ChannelSession> {
        init_tracing_once();

        let valid = Regex::new(r"^[A-Za-z0-9_-]{24}$").expect("static regex");
        if !valid.is_match(channel_id) {
            bail!("not a valid channel id: {channel_id:?}");
        }

        let client = rotator.acquire()?;
        let descriptor = fetch_descriptor(client.as_ref(), channel_id)?;
        let layout = ChannelLayout::new(&self.opts.base_dir, &descriptor.title);
        write_descriptor(&layout, &descriptor)?;

        Ok(ChannelSession { opts: self.opts.clone(), descriptor, layout })
    }
}

/// One channel's slice of the pipeline. Each operation re-acquires a client
/// from the rotator: quota state is invisible until a call fails, so clients
/// are bound per unit of work, never cached process-wide.
pub struct ChannelSession {
    opts: EtlOptions,
    descriptor: ChannelDescriptor,
    layout: ChannelLayout,
}

impl ChannelSession {
    pub fn descriptor(&self) -> &ChannelDescriptor {
        &self.descriptor
    }

    pub fn layout(&self) -> &ChannelLayout {
        &self.layout
    }

    pub fn state(&self) -> Result<ChannelState> {
        ChannelState::inspect(&self.layout)
    }

    /// Build or reuse the video catalog (policy-controlled).
    pub fn build_catalog(&self, rotator: &mut CredentialRotator) -> Result<Vec<VideoRecord>> {
        let client = rotator.acquire()?;
        build_catalog(client.as_ref(), &self.layout, &self.descriptor, &self.opts)
    }

    fn load_catalog(&self) -> Result<Vec<VideoRecord>> {
        let path = self.layout.catalog_file();
        if !path.exists() {
            bail!("no video catalog at {}; build the catalog first", path.display());
        }
        read_records(&path)
    }

    /// Run comment fetch passes until the pending set closes or credentials
    /// run out. Per the retry policy: up to `passes_per_credential` passes on
    /// the current credential, then one more pass per remaining credential.
    /// Gaps persisting past that leave the manifest in place for a future
    /// run — an expected terminal state, not an error.
    pub fn fetch_comments(&self, rotator: &mut CredentialRotator) -> Result<PassOutcome> {
        let state = self.state()?;
        if self.opts.reuse_merged && state.fetch_already_merged() {
            tracing::info!(
                "merged comment file already present; set reuse_merged(false) for a fresh fetch"
            );
            return Ok(PassOutcome::AllComplete { fetched: 0 });
        }

        let catalog = self.load_catalog()?;
        let mut client = rotator.acquire()?;
        // The first credential gets the full pass budget; each escalation
        // credential gets a single pass against the surviving manifest.
        let mut pass_budget = self.opts.passes_per_credential;
        let mut outcome = PassOutcome::GapsRemain { fetched: 0, missing: Vec::new() };

        loop {
            let fetcher = ShardFetcher::new(client.as_ref(), &self.layout, self.opts.page_size)
                .progress(self.opts.progress);

            for _ in 0..pass_budget {
                outcome = fetcher.run_pass(&catalog)?;
                if outcome.is_complete() {
                    return Ok(outcome);
                }
            }

            // Persistent gaps on this credential look like quota exhaustion;
            // escalate to the next candidate.
            rotator.mark_current_exhausted();
            match rotator.acquire() {
                Ok(next) => {
                    client = next;
                    pass_budget = 1;
                }
                Err(ApiError::AllCredentialsExhausted) => {
                    tracing::warn!(
                        "gaps remain and no credentials left; manifest kept for a future run"
                    );
                    return Ok(outcome);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Merge all shards into the unscored comment table. Requires a closed
    /// pending set.
    pub fn merge_comments(&self) -> Result<MergeSummary> {
        let catalog = self.load_catalog()?;
        merge_shards(
            &self.layout,
            &catalog,
            self.opts.remove_shards_after_merge,
            self.opts.progress,
        )
    }

    /// Run the sentiment pass with per-batch checkpoints.
    pub fn score_comments(&self, classifier: &mut dyn SentimentClassifier) -> Result<ScoreSummary> {
        apply_sentiment(&self.layout, classifier, self.opts.sentiment_batch_size, self.opts.progress)
    }

    /// Compute and persist per-video and channel-level engagement metrics
    /// from the scored table.
    pub fn compute_metrics(&self) -> Result<ChannelMetrics> {
        let scored_path = self.layout.scored_file();
        if !scored_path.exists() {
            bail!("no scored comment table at {}; run sentiment first", scored_path.display());
        }
        let catalog = self.load_catalog()?;
        let comments: Vec<ScoredComment> = read_records(&scored_path)?;

        let video_metrics = compute_video_metrics(
            &catalog,
            &comments,
            self.opts.min_comments_for_sentiment_index,
        );
        let channel_metrics =
            compute_channel_metrics(&self.descriptor.channel_id, &catalog, &video_metrics);
        write_metrics(&self.layout, &video_metrics, &channel_metrics)?;
        Ok(channel_metrics)
    }

    /// Full pipeline for this channel. Stops cleanly (Ok) when gaps remain
    /// after credential escalation; the next invocation resumes from the
    /// manifest.
    pub fn run(
        &self,
        rotator: &mut CredentialRotator,
        classifier: &mut dyn SentimentClassifier,
    ) -> Result<()> {
        self.build_catalog(rotator)?;

        let outcome = self.fetch_comments(rotator)?;
        if let PassOutcome::GapsRemain { missing, .. } = &outcome {
            tracing::warn!(
                n_missing = missing.len(),
                "stopping with gaps; re-run later to resume from the manifest"
            );
            return Ok(());
        }

        let state = self.state()?;
        if !state.fetch_already_merged() {
            self.merge_comments().context("merge shards")?;
        }
        if !state.scored_exists {
            self.score_comments(classifier).context("sentiment pass")?;
        }
        self.compute_metrics().context("compute metrics")?;
        Ok(())
    }
}
