//! Credential rotation. Quota state is invisible until a call fails, so
//! rotation is reactive: each acquisition probes candidates in order with one
//! cheap lookup and binds the first that answers. Callers re-acquire per unit
//! of work rather than caching a client process-wide.

use crate::api::YouTubeApi;
use crate::error::{ApiError, ApiResult};

/// Default probe target: a fixed, always-available reference video
/// (the oldest video on the platform).
pub const DEFAULT_PROBE_VIDEO_ID: &str = "jNQXAC9IVRw";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialState {
    Untested,
    Valid,
    Exhausted,
}

/// An ordered API credential. Lower `ordinal` is tried first.
#[derive(Clone, Debug)]
pub struct Credential {
    pub ordinal: usize,
    pub key: String,
    pub state: CredentialState,
}

impl Credential {
    pub fn new(ordinal: usize, key: impl Into<String>) -> Self {
        Self { ordinal, key: key.into(), state: CredentialState::Untested }
    }
}

/// Builds a client bound to one credential's key. The indirection lets tests
/// hand out scripted in-memory clients.
pub type ClientFactory = Box<dyn Fn(&Credential) -> Box<dyn YouTubeApi>>;

pub struct CredentialRotator {
    credentials: Vec<Credential>,
    factory: ClientFactory,
    /// Index of the first credential still worth probing.
    cursor: usize,
    probe_video_id: String,
}

impl CredentialRotator {
    pub fn new(keys: impl IntoIterator<Item = String>, factory: ClientFactory) -> Self {
        let credentials = keys
            .into_iter()
            .enumerate()
            .map(|(i, key)| Credential::new(i, key))
            .collect();
        Self {
            credentials,
            factory,
            cursor: 0,
            probe_video_id: DEFAULT_PROBE_VIDEO_ID.to_string(),
        }
    }

    /// Override the probe target (tests point this at a mock video).
    pub fn with_probe_video(mut self, video_id: impl Into<String>) -> Self {
        self.probe_video_id = video_id.into();
        self
    }

    /// Probe candidates in order from the current cursor and return a client
    /// bound to the first credential whose probe succeeds with a non-empty
    /// result. Candidates that fail are marked exhausted and skipped on
    /// subsequent acquisitions.
    pub fn acquire(&mut self) -> ApiResult<Box<dyn YouTubeApi>> {
        while self.cursor < self.credentials.len() {
            let cred = &mut self.credentials[self.cursor];
            let client = (self.factory)(cred);
            match client.video_details(&self.probe_video_id) {
                Ok(Some(_)) => {
                    cred.state = CredentialState::Valid;
                    tracing::info!(ordinal = cred.ordinal, "credential probe passed");
                    return Ok(client);
                }
                Ok(None) => {
                    tracing::warn!(ordinal = cred.ordinal, "credential probe returned empty result");
                }
                Err(e) => {
                    tracing::warn!(ordinal = cred.ordinal, error = %e, "credential probe failed");
                }
            }
            cred.state = CredentialState::Exhausted;
            self.cursor += 1;
        }
        Err(ApiError::AllCredentialsExhausted)
    }

    /// Give up on the currently bound credential (quota ran out mid-fetch).
    /// The next `acquire` starts at the following candidate.
    pub fn mark_current_exhausted(&mut self) {
        if let Some(cred) = self.credentials.get_mut(self.cursor) {
            cred.state = CredentialState::Exhausted;
            tracing::info!(ordinal = cred.ordinal, "credential marked exhausted");
        }
        self.cursor += 1;
    }

    /// Credentials not yet marked exhausted.
    pub fn remaining(&self) -> usize {
        self.credentials.len().saturating_sub(self.cursor)
    }

    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }
}

/// Collect API keys from `API_KEY_1`, `API_KEY_2`, … in order, stopping at
/// the first gap. Call `dotenvy::dotenv()` beforehand to pick up a `.env`.
pub fn keys_from_env() -> Vec<String> {
    let mut keys = Vec::new();
    for i in 1.. {
        match std::env::var(format!("API_KEY_{i}")) {
            Ok(key) if !key.trim().is_empty() => keys.push(key),
            _ => break,
        }
    }
    keys
}
