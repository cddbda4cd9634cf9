//! Spotify Web API client used for catalog search and track lookup.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio::time::sleep;

use crate::{
    error::{Error, Result},
    types::{
        ArtCover, SpotifySearchResponse, SpotifyTrack, SpotifyTracksResponse, TrackInfo,
        ensure_artists,
    },
    warning,
};

pub const API_URL: &str = "https://api.spotify.com/v1";

const SEARCH_LIMIT: &str = "30";
const MAX_API_ATTEMPTS: u32 = 3;
const MAX_RETRY_AFTER: u64 = 120;
const BAD_GATEWAY_DELAY: Duration = Duration::from_secs(2);

/// Hands out bearer tokens for the Web API.
#[async_trait]
pub trait AccessTokens: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

pub struct WebApi {
    client: Client,
    base_url: String,
    tokens: Arc<dyn AccessTokens>,
}

impl WebApi {
    pub fn new(client: Client, tokens: Arc<dyn AccessTokens>) -> Self {
        Self {
            client,
            base_url: API_URL.to_string(),
            tokens,
        }
    }

    /// Points the client at another API root, without trailing slash.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Authenticated GET with the Web API's rate-limit and 502 handling.
    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let token = self.tokens.access_token().await?;

            let response = self
                .client
                .get(&url)
                .query(query)
                .bearer_auth(token)
                .header("Accept-Language", "en")
                .send()
                .await
                .map_err(Error::from_http)?;

            let status = response.status();
            if attempt < MAX_API_ATTEMPTS {
                if status == StatusCode::TOO_MANY_REQUESTS {
                    let retry_after = response
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok())
                        .unwrap_or(1);
                    if retry_after <= MAX_RETRY_AFTER {
                        sleep(Duration::from_secs(retry_after)).await;
                        continue;
                    }
                    warning!(
                        "Retry after has reached an abnormal high of {} seconds.",
                        retry_after
                    );
                } else if status == StatusCode::BAD_GATEWAY {
                    sleep(BAD_GATEWAY_DELAY).await;
                    continue;
                }
            }

            let response = response.error_for_status().map_err(Error::from_http)?;
            return response.json::<T>().await.map_err(Error::from_http);
        }
    }

    /// Searches tracks, keeping Spotify's relevance order.
    pub async fn search(&self, terms: &str) -> Result<Vec<TrackInfo>> {
        let response: SpotifySearchResponse = self
            .get(
                "/search",
                &[
                    ("q", terms),
                    ("type", "track"),
                    ("limit", SEARCH_LIMIT),
                    ("offset", "0"),
                ],
            )
            .await?;

        Ok(response.tracks.items.into_iter().map(parse_track).collect())
    }

    /// Resolves one track in the account's market.
    pub async fn track(&self, track_id: &str) -> Result<TrackInfo> {
        let response: SpotifyTracksResponse = self
            .get("/tracks", &[("ids", track_id), ("market", "from_token")])
            .await?;

        response
            .tracks
            .into_iter()
            .flatten()
            .next()
            .map(parse_track)
            .ok_or_else(|| Error::NotFound(format!("Spotify track {track_id}")))
    }
}

pub fn parse_track(track: SpotifyTrack) -> TrackInfo {
    let mut images = track.album.images;
    images.sort_by(|a, b| b.height.unwrap_or(0).cmp(&a.height.unwrap_or(0)));

    TrackInfo {
        id: track.id,
        title: track.name,
        artists: ensure_artists(track.artists.into_iter().map(|a| a.name).collect()),
        track_nb: track.track_number,
        album: track.album.name,
        duration: Duration::from_millis(track.duration_ms),
        explicit: track.explicit,
        art_cover: images.into_iter().next().map(|image| ArtCover::Url(image.url)),
    }
}
