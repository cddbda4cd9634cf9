mod common;

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Extension, Json, Router,
    extract::Query,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use reqwest::Client;
use serde_json::{Value, json};
use untzine::{
    audio::{AudioFormat, formats},
    error::{Error, Result},
    provider::{
        Provider,
        spotify::{
            SpotifyAudio, SpotifyProvider,
            api::{AccessTokens, WebApi},
            session::file_format,
        },
        stream::{RangeSource, RetryPolicy, collect},
    },
    types::{AccountType, ArtCover},
};

use common::{FlakySource, patterned_bytes};

const TOKEN: &str = "session-token";

#[derive(Default)]
struct ApiState {
    searches: AtomicUsize,
    queries: Mutex<Vec<HashMap<String, String>>>,
}

fn track_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "artists": [{ "name": "Daft Punk" }, { "name": "Pharrell Williams" }],
        "album": {
            "name": "Random Access Memories",
            "images": [
                { "url": "https://i.scdn.co/small", "height": 64 },
                { "url": "https://i.scdn.co/large", "height": 640 }
            ]
        },
        "track_number": 8,
        "duration_ms": 369626,
        "explicit": false
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

async fn search(
    Extension(state): Extension<Arc<ApiState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.queries.lock().unwrap().push(params);

    // The first search is rate limited.
    if state.searches.fetch_add(1, Ordering::SeqCst) == 0 {
        return (StatusCode::TOO_MANY_REQUESTS, [("retry-after", "0")]).into_response();
    }

    Json(json!({
        "tracks": {
            "items": [
                track_json("2Foc5Q5nqNiosCNqttzHof", "Get Lucky"),
                track_json("69kOkLUCkxIZYexIgSG8rq", "Get Lucky - Radio Edit")
            ]
        }
    }))
    .into_response()
}

async fn tracks(
    Extension(state): Extension<Arc<ApiState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let id = params.get("ids").cloned().unwrap_or_default();
    state.queries.lock().unwrap().push(params);

    if id == "2Foc5Q5nqNiosCNqttzHof" {
        Json(json!({ "tracks": [track_json(&id, "Get Lucky")] })).into_response()
    } else {
        Json(json!({ "tracks": [null] })).into_response()
    }
}

async fn spawn_api() -> (SocketAddr, Arc<ApiState>) {
    let state = Arc::new(ApiState::default());
    let app = Router::new()
        .route("/v1/search", get(search))
        .route("/v1/tracks", get(tracks))
        .layer(Extension(state.clone()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });
    (addr, state)
}

struct StaticToken(&'static str);

#[async_trait]
impl AccessTokens for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.to_string())
    }
}

/// Audio back-end serving one payload over a connection that drops
/// `drops` times.
struct FakeAudio {
    account: AccountType,
    data: Bytes,
    drops: u32,
    requested: Mutex<Vec<(String, AudioFormat)>>,
}

impl FakeAudio {
    fn new(account: AccountType) -> Self {
        Self {
            account,
            data: patterned_bytes(40_000),
            drops: 2,
            requested: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SpotifyAudio for FakeAudio {
    fn account_type(&self) -> AccountType {
        self.account
    }

    async fn source(&self, track_id: &str, format: AudioFormat) -> Result<Arc<dyn RangeSource>> {
        self.requested
            .lock()
            .unwrap()
            .push((track_id.to_string(), format));
        Ok(Arc::new(FlakySource::new(self.data.clone(), 5000, self.drops)))
    }
}

fn provider(addr: SocketAddr, token: &'static str, audio: Arc<FakeAudio>) -> SpotifyProvider {
    let api = WebApi::new(Client::new(), Arc::new(StaticToken(token)))
        .with_base_url(format!("http://{addr}/v1"));

    SpotifyProvider::new(api, audio).with_retry(RetryPolicy {
        max_attempts: 5,
        delay: Duration::from_millis(1),
    })
}

#[tokio::test]
async fn test_search_waits_out_rate_limit() {
    let (addr, state) = spawn_api().await;
    let provider = provider(addr, TOKEN, Arc::new(FakeAudio::new(AccountType::Free)));

    let results = provider.search("get lucky").await.unwrap();

    assert_eq!(state.searches.load(Ordering::SeqCst), 2);
    let queries = state.queries.lock().unwrap().clone();
    assert_eq!(queries[1]["q"], "get lucky");
    assert_eq!(queries[1]["type"], "track");
    assert_eq!(queries[1]["limit"], "30");

    let ids: Vec<_> = results.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, ["2Foc5Q5nqNiosCNqttzHof", "69kOkLUCkxIZYexIgSG8rq"]);

    let first = &results[0];
    assert_eq!(first.artists, ["Daft Punk", "Pharrell Williams"]);
    assert_eq!(first.track_nb, 8);
    assert_eq!(first.duration, Duration::from_millis(369626));
    assert_eq!(
        first.art_cover,
        Some(ArtCover::Url("https://i.scdn.co/large".to_string()))
    );
}

#[tokio::test]
async fn test_lookup_resolves_in_account_market() {
    let (addr, state) = spawn_api().await;
    let provider = provider(addr, TOKEN, Arc::new(FakeAudio::new(AccountType::Free)));

    let track = provider.lookup("2Foc5Q5nqNiosCNqttzHof").await.unwrap();
    assert_eq!(track.title, "Get Lucky");
    assert_eq!(track.album, "Random Access Memories");

    let queries = state.queries.lock().unwrap().clone();
    assert_eq!(queries[0]["market"], "from_token");

    assert!(matches!(
        provider.lookup("0000000000000000000000").await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_rejected_token_is_an_authorization_error() {
    let (addr, _state) = spawn_api().await;
    let provider = provider(addr, "expired", Arc::new(FakeAudio::new(AccountType::Free)));

    assert!(matches!(
        provider.search("get lucky").await,
        Err(Error::Authorization(_))
    ));
}

#[tokio::test]
async fn test_formats_follow_account_type() {
    let (addr, _state) = spawn_api().await;

    let free_audio = Arc::new(FakeAudio::new(AccountType::Free));
    let free = provider(addr, TOKEN, free_audio.clone());
    assert_eq!(
        free.available_formats(),
        [formats::OGG_VORBIS_96, formats::OGG_VORBIS_160]
    );
    assert!(matches!(
        free.download("2Foc5Q5nqNiosCNqttzHof", formats::OGG_VORBIS_320)
            .await,
        Err(Error::Authorization(_))
    ));
    assert!(matches!(
        free.download("2Foc5Q5nqNiosCNqttzHof", formats::MP3_320).await,
        Err(Error::Unavailable(_))
    ));
    assert!(free_audio.requested.lock().unwrap().is_empty());

    let premium = provider(addr, TOKEN, Arc::new(FakeAudio::new(AccountType::Premium)));
    assert_eq!(
        premium.available_formats(),
        [
            formats::OGG_VORBIS_96,
            formats::OGG_VORBIS_160,
            formats::OGG_VORBIS_320
        ]
    );
}

#[tokio::test]
async fn test_download_streams_through_interruptions() {
    let (addr, _state) = spawn_api().await;
    let audio = Arc::new(FakeAudio::new(AccountType::Premium));
    let provider = provider(addr, TOKEN, audio.clone());

    let stream = provider
        .download("2Foc5Q5nqNiosCNqttzHof", formats::OGG_VORBIS_320)
        .await
        .unwrap();
    let output = collect(stream).await.unwrap();

    assert_eq!(output, audio.data);
    assert_eq!(
        audio.requested.lock().unwrap().clone(),
        vec![(
            "2Foc5Q5nqNiosCNqttzHof".to_string(),
            formats::OGG_VORBIS_320
        )]
    );
}

#[test]
fn test_file_format_mapping() {
    assert!(file_format(&formats::OGG_VORBIS_96).is_some());
    assert!(file_format(&formats::OGG_VORBIS_160).is_some());
    assert!(file_format(&formats::OGG_VORBIS_320).is_some());
    assert!(file_format(&formats::MP3_96).is_none());
    assert_ne!(
        file_format(&formats::OGG_VORBIS_96),
        file_format(&formats::OGG_VORBIS_320)
    );
}
