//! # Spotify provider
//!
//! Full tracks come from the access point as encrypted Ogg Vorbis files
//! (96, 160 and 320 kbps) through a librespot session. Catalog search and
//! lookup go through the public Web API with tokens minted by that same
//! session.
//!
//! The session logs in with stored credentials, a login and password, or
//! the OAuth session written by `untzine auth`. Free accounts are offered
//! the 96 and 160 kbps files; 320 kbps needs Premium.

pub mod api;
pub mod auth;
pub mod session;

use std::{path::PathBuf, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    audio::{AudioFormat, formats},
    error::{Error, Result},
    management::TokenManager,
    provider::{
        ByteStream, Provider, ProviderBuilder, ProviderConfiguration, not_empty,
        stream::{self, RangeSource, RetryPolicy},
    },
    types::{AccountType, TrackInfo},
};

use api::WebApi;
use session::{LibrespotAudio, SessionTokens};

pub use api::parse_track;

pub const NAME: &str = "Spotify";

const FORMATS: [AudioFormat; 3] = [
    formats::OGG_VORBIS_96,
    formats::OGG_VORBIS_160,
    formats::OGG_VORBIS_320,
];

/// Formats a free account may stream.
const FREE_FORMATS: usize = 2;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpotifyConfiguration {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Directory where the reusable credentials are cached.
    #[serde(default)]
    pub login_session_save_path: Option<String>,
    /// Stored credentials, as written to the credentials cache.
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub session_path: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
}

impl ProviderConfiguration for SpotifyConfiguration {
    const KEY: &'static str = "spotify";
}

impl SpotifyConfiguration {
    pub fn session_path(&self) -> PathBuf {
        not_empty(&self.session_path)
            .map(PathBuf::from)
            .unwrap_or_else(TokenManager::default_path)
    }

    pub fn redirect_uri(&self) -> String {
        not_empty(&self.redirect_uri)
            .map(str::to_string)
            .unwrap_or_else(|| format!("http://{}/callback", crate::config::server_addr()))
    }
}

/// Where decrypted audio comes from.
#[async_trait]
pub trait SpotifyAudio: Send + Sync {
    fn account_type(&self) -> AccountType;

    /// Source of `track_id` in `format`, positioned at the first byte of
    /// the Ogg stream.
    async fn source(&self, track_id: &str, format: AudioFormat) -> Result<Arc<dyn RangeSource>>;
}

pub struct SpotifyBuilder;

#[async_trait]
impl ProviderBuilder for SpotifyBuilder {
    type Configuration = SpotifyConfiguration;
    const NAME: &'static str = NAME;

    async fn build(&self, conf: SpotifyConfiguration) -> Result<Arc<dyn Provider>> {
        let session = session::connect(&conf).await?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .read_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Configuration(e.to_string()))?;

        let api = WebApi::new(client, Arc::new(SessionTokens(session.clone())));
        let audio = Arc::new(LibrespotAudio::new(session));

        Ok(Arc::new(SpotifyProvider::new(api, audio)))
    }
}

pub struct SpotifyProvider {
    api: WebApi,
    audio: Arc<dyn SpotifyAudio>,
    retry: RetryPolicy,
}

impl SpotifyProvider {
    pub fn new(api: WebApi, audio: Arc<dyn SpotifyAudio>) -> Self {
        Self {
            api,
            audio,
            retry: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy used for audio transfers.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl Provider for SpotifyProvider {
    fn identity(&self) -> &str {
        NAME
    }

    fn account_type(&self) -> AccountType {
        self.audio.account_type()
    }

    fn available_formats(&self) -> &[AudioFormat] {
        match self.account_type() {
            AccountType::Premium => &FORMATS,
            AccountType::Free => &FORMATS[..FREE_FORMATS],
        }
    }

    async fn search(&self, terms: &str) -> Result<Vec<TrackInfo>> {
        self.api.search(terms).await
    }

    async fn lookup(&self, track_id: &str) -> Result<TrackInfo> {
        self.api.track(track_id).await
    }

    async fn download(&self, track_id: &str, format: AudioFormat) -> Result<ByteStream> {
        if !self.available_formats().contains(&format) {
            return Err(if FORMATS.contains(&format) {
                Error::Authorization(format!("{format} is not available with your subscription"))
            } else {
                Error::Unavailable(format!("{format} is not offered by {NAME}"))
            });
        }

        let source = self.audio.source(track_id, format).await?;
        Ok(stream::resumable(source, self.retry))
    }
}
