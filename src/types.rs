use std::time::Duration;

use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Entitlement level of an authenticated provider session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountType {
    Free,
    Premium,
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountType::Free => f.write_str("Free"),
            AccountType::Premium => f.write_str("Premium"),
        }
    }
}

/// Cover art, either a link to fetch or the image itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtCover {
    Url(String),
    Data(Vec<u8>),
}

/// A searchable, downloadable track as described by one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    /// Provider-scoped identifier.
    pub id: String,
    pub title: String,
    /// Never empty; the first entry is the main artist.
    pub artists: Vec<String>,
    pub track_nb: u32,
    pub album: String,
    pub duration: Duration,
    pub explicit: bool,
    pub art_cover: Option<ArtCover>,
}

impl TrackInfo {
    pub fn first_artist(&self) -> &str {
        self.artists
            .first()
            .map(String::as_str)
            .unwrap_or(UNKNOWN_ARTIST)
    }

    pub fn artists_joined(&self) -> String {
        self.artists.join(", ")
    }
}

pub const UNKNOWN_ARTIST: &str = "Unknown artist";

/// Keeps the "artists is never empty" invariant for vendor payloads that
/// omit them.
pub fn ensure_artists(artists: Vec<String>) -> Vec<String> {
    if artists.is_empty() {
        vec![UNKNOWN_ARTIST.to_string()]
    } else {
        artists
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    pub expires_in: u64,
    pub obtained_at: u64,
}

/// State shared between the PKCE flow and its callback handler.
#[derive(Debug, Clone)]
pub struct PkceToken {
    pub code_verifier: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub token: Option<Token>,
}

#[derive(Tabled)]
pub struct ProviderTableRow {
    pub name: String,
    pub status: String,
    pub account: String,
    pub formats: String,
}

#[derive(Tabled)]
pub struct TrackTableRow {
    pub title: String,
    pub artists: String,
    pub album: String,
    pub duration: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifySearchResponse {
    pub tracks: SpotifyTrackPage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyTrackPage {
    pub items: Vec<SpotifyTrack>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyTrack {
    pub id: String,
    pub name: String,
    pub artists: Vec<SpotifyArtist>,
    pub album: SpotifyAlbum,
    pub track_number: u32,
    pub duration_ms: u64,
    pub explicit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyAlbum {
    pub name: String,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
    pub height: Option<u32>,
}

/// Answer of `GET /tracks?ids=…`; unknown ids come back as `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyTracksResponse {
    pub tracks: Vec<Option<SpotifyTrack>>,
}
