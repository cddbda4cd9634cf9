use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Url, cookie::Jar};
use serde_json::{Value, json};

use crate::{
    error::{Error, Result},
    provider::stream::{HttpRangeSource, RangeSource},
    types::{ArtCover, TrackInfo, ensure_artists},
};

const GATEWAY_URL: &str = "https://www.deezer.com/ajax/gw-light.php";
const MEDIA_URL: &str = "https://media.deezer.com/v1/get_url";
const COOKIE_URL: &str = "https://www.deezer.com";
const COVER_URL: &str = "https://api.deezer.com/album";

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
                              Chrome/79.0.3945.130 Safari/537.36";

const SEARCH_LIMIT: u32 = 25;
const GEOLOCATION_ERROR: i64 = 2002;

/// Outcome of a media URL request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaUrl {
    Url(String),
    /// The media API answered without a source; use the legacy CDN path.
    Missing,
    /// Not licensed in the account's country.
    GeoBlocked,
}

/// What is needed to fetch one track's audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMedia {
    pub track_token: String,
    pub md5_origin: String,
    pub media_version: String,
    pub fallback_id: Option<String>,
}

/// Calls the Deezer provider makes against the vendor.
///
/// [`DeezerSession`] is the live implementation; payloads are returned raw
/// and interpreted by the parsers in this module.
#[async_trait]
pub trait DeezerApi: Send + Sync {
    fn can_stream_hq(&self) -> bool;

    fn can_stream_lossless(&self) -> bool;

    /// Fails with `Authorization` when the account may not stream `format`.
    fn check_license(&self, format: &str) -> Result<()>;

    async fn search_tracks(&self, terms: &str) -> Result<Vec<Value>>;

    /// `song.getData` payload of one track.
    async fn get_track(&self, track_id: &str) -> Result<Value>;

    async fn get_track_url(&self, track_token: &str, format: &str) -> Result<MediaUrl>;

    /// Source the audio at `url` is read from.
    fn media_source(&self, url: String) -> Arc<dyn RangeSource>;
}

/// Authenticated gateway session.
///
/// Holds the cookie-carrying HTTP client; cloning is cheap and all clones
/// share the same session.
#[derive(Debug, Clone)]
pub struct DeezerSession {
    client: Client,
    api_token: String,
    license_token: String,
    can_stream_hq: bool,
    can_stream_lossless: bool,
}

impl DeezerSession {
    /// Logs in with an `arl` cookie.
    pub async fn login(arl: &str) -> Result<Self> {
        let jar = Jar::default();
        let cookie_url = Url::parse(COOKIE_URL).map_err(|e| Error::Configuration(e.to_string()))?;
        jar.add_cookie_str(&format!("arl={arl}; Domain=.deezer.com; Path=/"), &cookie_url);

        let client = Client::builder()
            .cookie_provider(Arc::new(jar))
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .read_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Configuration(e.to_string()))?;

        let user_data = call(&client, "deezer.getUserData", "null", json!({})).await?;
        let user = &user_data["USER"];

        if number(user, "USER_ID").unwrap_or(0) == 0 {
            return Err(Error::Authorization("Logging with arl failed".to_string()));
        }

        let options = &user["OPTIONS"];
        Ok(Self {
            client,
            api_token: text(&user_data, "checkForm").unwrap_or_default(),
            license_token: text(options, "license_token").unwrap_or_default(),
            can_stream_hq: flag(options, "web_hq") || flag(options, "mobile_hq"),
            can_stream_lossless: flag(options, "web_lossless") || flag(options, "mobile_lossless"),
        })
    }
}

#[async_trait]
impl DeezerApi for DeezerSession {
    fn can_stream_hq(&self) -> bool {
        self.can_stream_hq
    }

    fn can_stream_lossless(&self) -> bool {
        self.can_stream_lossless
    }

    fn check_license(&self, format: &str) -> Result<()> {
        let allowed = match format {
            "FLAC" => self.can_stream_lossless,
            "MP3_320" => self.can_stream_hq,
            _ => true,
        };

        if allowed {
            Ok(())
        } else {
            Err(Error::Authorization(format!(
                "{format} is not available with your subscription"
            )))
        }
    }

    async fn search_tracks(&self, terms: &str) -> Result<Vec<Value>> {
        let results = call(
            &self.client,
            "search.music",
            &self.api_token,
            json!({
                "query": terms,
                "filter": "ALL",
                "output": "TRACK",
                "start": 0,
                "nb": SEARCH_LIMIT,
            }),
        )
        .await?;

        match results.get("data") {
            Some(Value::Array(items)) => Ok(items.clone()),
            _ => Ok(Vec::new()),
        }
    }

    async fn get_track(&self, track_id: &str) -> Result<Value> {
        call(
            &self.client,
            "song.getData",
            &self.api_token,
            json!({ "sng_id": track_id }),
        )
        .await
    }

    async fn get_track_url(&self, track_token: &str, format: &str) -> Result<MediaUrl> {
        let response = self
            .client
            .post(MEDIA_URL)
            .json(&json!({
                "license_token": self.license_token,
                "media": [{
                    "type": "FULL",
                    "formats": [{ "cipher": "BF_CBC_STRIPE", "format": format }],
                }],
                "track_tokens": [track_token],
            }))
            .send()
            .await
            .map_err(Error::from_http)?
            .error_for_status()
            .map_err(Error::from_http)?;

        let body: Value = response.json().await.map_err(Error::from_http)?;
        parse_media_url(&body)
    }

    fn media_source(&self, url: String) -> Arc<dyn RangeSource> {
        Arc::new(HttpRangeSource::new(self.client.clone(), url))
    }
}

/// Calls a gateway method and returns its `results`.
async fn call(client: &Client, method: &str, api_token: &str, body: Value) -> Result<Value> {
    let response = client
        .post(GATEWAY_URL)
        .query(&[
            ("method", method),
            ("input", "3"),
            ("api_version", "1.0"),
            ("api_token", api_token),
        ])
        .json(&body)
        .send()
        .await
        .map_err(Error::from_http)?
        .error_for_status()
        .map_err(Error::from_http)?;

    let payload: Value = response.json().await.map_err(Error::from_http)?;
    gateway_results(payload)
}

/// Unwraps a gateway envelope, mapping its `error` object to the taxonomy.
pub fn gateway_results(mut payload: Value) -> Result<Value> {
    if let Some(errors) = payload.get("error").and_then(Value::as_object) {
        if let Some(message) = errors.get("DATA_ERROR") {
            return Err(Error::NotFound(message.to_string()));
        }
        if let Some(message) = errors.get("VALID_TOKEN_REQUIRED") {
            return Err(Error::Authorization(message.to_string()));
        }
        if !errors.is_empty() {
            return Err(Error::Vendor(Value::Object(errors.clone()).to_string()));
        }
    }

    match payload.get_mut("results").map(Value::take) {
        Some(results) => Ok(results),
        None => Err(Error::Vendor("gateway response without results".to_string())),
    }
}

pub fn parse_media_url(body: &Value) -> Result<MediaUrl> {
    let Some(entry) = body["data"].as_array().and_then(|d| d.first()) else {
        return Ok(MediaUrl::Missing);
    };

    if let Some(error) = entry["errors"].as_array().and_then(|e| e.first()) {
        if error["code"].as_i64() == Some(GEOLOCATION_ERROR) {
            return Ok(MediaUrl::GeoBlocked);
        }
        return Err(Error::Vendor(error.to_string()));
    }

    Ok(entry["media"][0]["sources"][0]["url"]
        .as_str()
        .map(|url| MediaUrl::Url(url.to_string()))
        .unwrap_or(MediaUrl::Missing))
}

pub fn parse_track(track: &Value) -> Result<TrackInfo> {
    let id = text(track, "SNG_ID")
        .ok_or_else(|| Error::Vendor("track without SNG_ID".to_string()))?;

    let mut artists: Vec<String> = track["ARTISTS"]
        .as_array()
        .map(|list| list.iter().filter_map(|a| text(a, "ART_NAME")).collect())
        .unwrap_or_default();
    if artists.is_empty() {
        artists.extend(text(track, "ART_NAME"));
    }

    Ok(TrackInfo {
        id,
        title: text(track, "SNG_TITLE").unwrap_or_default(),
        artists: ensure_artists(artists),
        track_nb: number(track, "TRACK_NUMBER")
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0),
        album: text(track, "ALB_TITLE").unwrap_or_default(),
        duration: Duration::from_secs(number(track, "DURATION").unwrap_or(0)),
        explicit: flag(track, "EXPLICIT_LYRICS"),
        art_cover: text(track, "ALB_ID").map(|album| ArtCover::Url(format!("{COVER_URL}/{album}/image"))),
    })
}

pub fn parse_media(track: &Value) -> Result<TrackMedia> {
    let track_token = text(track, "TRACK_TOKEN")
        .ok_or_else(|| Error::Unavailable("track has no stream token".to_string()))?;

    Ok(TrackMedia {
        track_token,
        md5_origin: text(track, "MD5_ORIGIN").unwrap_or_default(),
        media_version: text(track, "MEDIA_VERSION").unwrap_or_default(),
        fallback_id: text(&track["FALLBACK"], "SNG_ID"),
    })
}

// The gateway is loose about types: ids and counters arrive as strings or
// numbers, flags as booleans, numbers or "0"/"1".

fn text(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(value: &Value, key: &str) -> Option<u64> {
    match value.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn flag(value: &Value, key: &str) -> bool {
    match value.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0) != 0,
        Some(Value::String(s)) => s == "1" || s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}
