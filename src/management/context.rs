use std::{sync::Arc, time::Duration};

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    provider::Provider,
    registry::ProviderRegistry,
    types::{ArtCover, TrackInfo, ensure_artists},
    utils::TOKEN_ENGINE,
};

/// A search result bound to the provider that produced it.
///
/// Carried across requests as an opaque token: URL-safe base64 of
/// `{"provider": <identity>, "trackinfo": {...}}`. The provider itself is
/// never serialized; decoding looks it up again in the live registry.
#[derive(Clone)]
pub struct TrackSearchContext {
    pub provider: Arc<dyn Provider>,
    pub trackinfo: TrackInfo,
}

#[derive(Serialize, Deserialize)]
struct ContextWire {
    provider: String,
    trackinfo: TrackInfoWire,
}

#[derive(Serialize, Deserialize)]
struct TrackInfoWire {
    id: String,
    album: String,
    artists: Vec<String>,
    /// Whole microseconds.
    duration: u64,
    explicit: bool,
    title: String,
    track_nb: u32,
    art_cover: Option<ArtCoverWire>,
}

/// A string is a URL, an array of integers is the image itself.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ArtCoverWire {
    Url(String),
    Data(Vec<u8>),
}

impl From<&TrackInfo> for TrackInfoWire {
    fn from(track: &TrackInfo) -> Self {
        TrackInfoWire {
            id: track.id.clone(),
            album: track.album.clone(),
            artists: track.artists.clone(),
            duration: u64::try_from(track.duration.as_micros()).unwrap_or(u64::MAX),
            explicit: track.explicit,
            title: track.title.clone(),
            track_nb: track.track_nb,
            art_cover: track.art_cover.as_ref().map(|cover| match cover {
                ArtCover::Url(url) => ArtCoverWire::Url(url.clone()),
                ArtCover::Data(data) => ArtCoverWire::Data(data.clone()),
            }),
        }
    }
}

impl From<TrackInfoWire> for TrackInfo {
    fn from(wire: TrackInfoWire) -> Self {
        TrackInfo {
            id: wire.id,
            title: wire.title,
            artists: ensure_artists(wire.artists),
            track_nb: wire.track_nb,
            album: wire.album,
            duration: Duration::from_micros(wire.duration),
            explicit: wire.explicit,
            art_cover: wire.art_cover.map(|cover| match cover {
                ArtCoverWire::Url(url) => ArtCover::Url(url),
                ArtCoverWire::Data(data) => ArtCover::Data(data),
            }),
        }
    }
}

impl TrackSearchContext {
    pub fn new(provider: Arc<dyn Provider>, trackinfo: TrackInfo) -> Self {
        Self {
            provider,
            trackinfo,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.identity()
    }

    pub fn to_token(&self) -> Result<String> {
        encode_token(self.provider.identity(), &self.trackinfo)
    }

    /// Decodes `token` and resolves its provider in `registry`.
    ///
    /// A token that is not base64 or not the expected JSON fails with
    /// [`Error::TokenDecode`]; a valid token naming a provider that is not
    /// loaded fails with [`Error::TokenResolution`].
    pub fn from_token(token: &str, registry: &ProviderRegistry) -> Result<Self> {
        let (name, trackinfo) = decode_token(token)?;
        let provider = registry
            .by_name(&name)
            .ok_or(Error::TokenResolution(name))?;

        Ok(Self::new(provider, trackinfo))
    }
}

pub fn encode_token(provider: &str, trackinfo: &TrackInfo) -> Result<String> {
    let wire = ContextWire {
        provider: provider.to_string(),
        trackinfo: trackinfo.into(),
    };

    let json = serde_json::to_vec(&wire).map_err(|e| Error::TokenDecode(e.to_string()))?;
    Ok(TOKEN_ENGINE.encode(json))
}

/// Decodes a token without resolving the provider.
pub fn decode_token(token: &str) -> Result<(String, TrackInfo)> {
    let bytes = TOKEN_ENGINE
        .decode(token.trim())
        .map_err(|e| Error::TokenDecode(e.to_string()))?;
    let wire: ContextWire =
        serde_json::from_slice(&bytes).map_err(|e| Error::TokenDecode(e.to_string()))?;

    Ok((wire.provider, wire.trackinfo.into()))
}
