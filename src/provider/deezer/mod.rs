//! # Deezer provider
//!
//! Search and metadata go through the private gateway API authenticated with
//! the user's `arl` cookie. Audio comes from the media API as Blowfish-striped
//! files; when the media API returns no source the legacy CDN URL is derived
//! from the track's content hash instead.
//!
//! Entitlement is checked before asking for a URL: MP3 320 needs an HQ
//! subscription and FLAC a lossless one. A geo-restricted track is retried
//! once under the alternate id the gateway supplies, if any.

pub mod crypto;
pub mod gateway;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    audio::{AudioFormat, formats},
    error::{Error, Result},
    info,
    provider::{
        ByteStream, Provider, ProviderBuilder, ProviderConfiguration, not_empty,
        stream::{self, RetryPolicy},
    },
    types::{AccountType, TrackInfo},
};

use gateway::{DeezerApi, DeezerSession, MediaUrl};

pub const NAME: &str = "Deezer";

const FORMATS: [AudioFormat; 3] = [formats::MP3_128, formats::MP3_320, formats::FLAC_16];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeezerConfiguration {
    #[serde(default)]
    pub arl: Option<String>,
}

impl ProviderConfiguration for DeezerConfiguration {
    const KEY: &'static str = "deezer";
}

pub struct DeezerBuilder;

#[async_trait]
impl ProviderBuilder for DeezerBuilder {
    type Configuration = DeezerConfiguration;
    const NAME: &'static str = NAME;

    async fn build(&self, conf: DeezerConfiguration) -> Result<Arc<dyn Provider>> {
        let Some(arl) = not_empty(&conf.arl) else {
            return Err(Error::Configuration("No logging configuration".to_string()));
        };

        let session = DeezerSession::login(arl).await?;
        Ok(Arc::new(DeezerProvider::new(Arc::new(session))))
    }
}

pub struct DeezerProvider {
    session: Arc<dyn DeezerApi>,
    retry: RetryPolicy,
}

impl DeezerProvider {
    pub fn new(session: Arc<dyn DeezerApi>) -> Self {
        Self {
            session,
            retry: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy used for audio transfers.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Resolves the media URL of `track_id`, following the geo fallback once.
    /// Returns the id actually streamed along with its URL.
    async fn resolve_url(&self, track_id: &str, vendor_format: &str) -> Result<(String, String)> {
        let mut id = track_id.to_string();
        let mut media = gateway::parse_media(&self.session.get_track(&id).await?)?;
        let mut fallback_used = false;

        loop {
            match self
                .session
                .get_track_url(&media.track_token, vendor_format)
                .await?
            {
                MediaUrl::Url(url) => return Ok((id, url)),
                MediaUrl::Missing => {
                    let url =
                        crypto::encrypted_file_url(&id, &media.md5_origin, &media.media_version)?;
                    return Ok((id, url));
                }
                MediaUrl::GeoBlocked => match media.fallback_id.take() {
                    Some(fallback) if !fallback_used => {
                        info!("Track {} is geo-restricted, trying alternate id {}", id, fallback);
                        fallback_used = true;
                        id = fallback;
                        media = gateway::parse_media(&self.session.get_track(&id).await?)?;
                    }
                    _ => {
                        return Err(Error::Unavailable(
                            "The requested track is not available. This may be due to your country/location."
                                .to_string(),
                        ));
                    }
                },
            }
        }
    }
}

/// Deezer's name for a catalog format.
pub fn vendor_format(format: &AudioFormat) -> Option<&'static str> {
    match *format {
        f if f == formats::MP3_128 => Some("MP3_128"),
        f if f == formats::MP3_320 => Some("MP3_320"),
        f if f == formats::FLAC_16 => Some("FLAC"),
        _ => None,
    }
}

#[async_trait]
impl Provider for DeezerProvider {
    fn identity(&self) -> &str {
        NAME
    }

    fn account_type(&self) -> AccountType {
        if self.session.can_stream_hq() || self.session.can_stream_lossless() {
            AccountType::Premium
        } else {
            AccountType::Free
        }
    }

    fn available_formats(&self) -> &[AudioFormat] {
        &FORMATS
    }

    async fn search(&self, terms: &str) -> Result<Vec<TrackInfo>> {
        self.session
            .search_tracks(terms)
            .await?
            .iter()
            .map(gateway::parse_track)
            .collect()
    }

    async fn lookup(&self, track_id: &str) -> Result<TrackInfo> {
        gateway::parse_track(&self.session.get_track(track_id).await?)
    }

    async fn download(&self, track_id: &str, format: AudioFormat) -> Result<ByteStream> {
        let vendor_format = vendor_format(&format)
            .ok_or_else(|| Error::Unavailable(format!("{format} is not offered by {NAME}")))?;
        self.session.check_license(vendor_format)?;

        let (id, url) = self.resolve_url(track_id, vendor_format).await?;
        let key = crypto::is_encrypted_url(&url).then(|| crypto::blowfish_key(&id));

        let raw = stream::resumable(self.session.media_source(url), self.retry);
        Ok(crypto::decrypt_stream(raw, key))
    }
}
