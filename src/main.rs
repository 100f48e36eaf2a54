use anyhow::{bail, Context, Result};
use ytetl::{
    keys_from_env, ChannelEtl, CredentialRotator, HttpSentimentClassifier, HttpYouTubeClient,
    PassOutcome,
};

const DATA_ROOT: &str = "./data";

fn main() -> Result<()> {
    ytetl::init_tracing_once();
    // API keys live in .env (API_KEY_1, API_KEY_2, ...); filled manually.
    let _ = dotenvy::dotenv();

    let channel_id = std::env::args()
        .nth(1)
        .context("usage: ytetl <channel-id> (quota status: https://console.cloud.google.com/apis)")?;

    let keys = keys_from_env();
    if keys.is_empty() {
        bail!("no API keys found; set API_KEY_1 (and optionally API_KEY_2, ...) in .env");
    }

    // One transport shared by every credential's client.
    let http = HttpYouTubeClient::default_http()?;
    let mut rotator = CredentialRotator::new(
        keys,
        Box::new(move |cred| Box::new(HttpYouTubeClient::with_http(http.clone(), cred.key.clone()))),
    );

    let etl = ChannelEtl::new().base_dir(DATA_ROOT).progress(true);
    let session = etl.open_channel(&mut rotator, &channel_id)?;

    session.build_catalog(&mut rotator)?;
    let outcome = session.fetch_comments(&mut rotator)?;
    if let PassOutcome::GapsRemain { missing, .. } = &outcome {
        tracing::warn!(
            n_missing = missing.len(),
            "quota likely exhausted; re-run later to resume from the manifest"
        );
        return Ok(());
    }

    if !session.state()?.fetch_already_merged() {
        session.merge_comments()?;
    }

    // Sentiment scoring needs an external classifier service.
    match std::env::var("SENTIMENT_URL") {
        Ok(url) => {
            let mut classifier = HttpSentimentClassifier::new(url)?;
            session.score_comments(&mut classifier)?;
            let metrics = session.compute_metrics()?;
            tracing::info!(
                videos = metrics.n_videos,
                comments = metrics.available_comments,
                "pipeline complete"
            );
        }
        Err(_) => {
            tracing::info!("SENTIMENT_URL not set; stopping after merge");
        }
    }
    Ok(())
}
