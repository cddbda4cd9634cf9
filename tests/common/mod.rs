#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use blowfish::Blowfish;
use bytes::Bytes;
use cbc::cipher::{BlockEncryptMut, KeyIvInit, block_padding::NoPadding};
use futures::{StreamExt, stream};
use serde::Deserialize;
use untzine::{
    audio::{AudioFormat, formats},
    error::{Error, Result},
    provider::{
        ByteStream, Provider, ProviderBuilder, ProviderConfiguration,
        deezer::crypto::{STRIPE_SIZE, WINDOW_SIZE},
        stream::RangeSource,
    },
    tagger::Tagger,
    types::{AccountType, TrackInfo},
};

pub const VALID_TOKEN: &str = "valid";

pub fn track(id: &str) -> TrackInfo {
    TrackInfo {
        id: id.to_string(),
        title: "Title".to_string(),
        artists: vec!["Artist1".to_string(), "Artist2".to_string()],
        track_nb: 3,
        album: "Album".to_string(),
        duration: Duration::from_secs(215),
        explicit: false,
        art_cover: None,
    }
}

/// In-memory provider returning one fixed track and payload.
pub struct StubProvider {
    name: String,
    formats: Vec<AudioFormat>,
    tracks: Vec<TrackInfo>,
    payload: Bytes,
    pub downloads: Mutex<Vec<(String, AudioFormat)>>,
}

impl StubProvider {
    pub fn new(name: &str, formats: Vec<AudioFormat>) -> Self {
        Self {
            name: name.to_string(),
            formats,
            tracks: vec![track("42")],
            payload: Bytes::from_static(b"ID3 fake audio payload"),
            downloads: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Provider for StubProvider {
    fn identity(&self) -> &str {
        &self.name
    }

    fn account_type(&self) -> AccountType {
        AccountType::Premium
    }

    fn available_formats(&self) -> &[AudioFormat] {
        &self.formats
    }

    async fn search(&self, _terms: &str) -> Result<Vec<TrackInfo>> {
        Ok(self.tracks.clone())
    }

    async fn lookup(&self, track_id: &str) -> Result<TrackInfo> {
        self.tracks
            .iter()
            .find(|t| t.id == track_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(track_id.to_string()))
    }

    async fn download(&self, track_id: &str, format: AudioFormat) -> Result<ByteStream> {
        self.downloads
            .lock()
            .unwrap()
            .push((track_id.to_string(), format));
        Ok(stream::iter(vec![Ok(self.payload.clone())]).boxed())
    }
}

#[derive(Debug, Deserialize)]
pub struct AlphaConfiguration {
    pub token: String,
}

impl ProviderConfiguration for AlphaConfiguration {
    const KEY: &'static str = "alpha";
}

#[derive(Debug, Deserialize)]
pub struct BetaConfiguration {
    pub token: String,
}

impl ProviderConfiguration for BetaConfiguration {
    const KEY: &'static str = "beta";
}

fn check_token(token: &str) -> Result<()> {
    if token == VALID_TOKEN {
        Ok(())
    } else {
        Err(Error::Authorization("invalid credentials".to_string()))
    }
}

pub struct AlphaBuilder {
    pub formats: Vec<AudioFormat>,
}

impl Default for AlphaBuilder {
    fn default() -> Self {
        Self {
            formats: vec![formats::MP3_128, formats::MP3_256, formats::MP3_320],
        }
    }
}

#[async_trait]
impl ProviderBuilder for AlphaBuilder {
    type Configuration = AlphaConfiguration;
    const NAME: &'static str = "Alpha";

    async fn build(&self, conf: AlphaConfiguration) -> Result<Arc<dyn Provider>> {
        check_token(&conf.token)?;
        Ok(Arc::new(StubProvider::new(Self::NAME, self.formats.clone())))
    }
}

pub struct BetaBuilder;

#[async_trait]
impl ProviderBuilder for BetaBuilder {
    type Configuration = BetaConfiguration;
    const NAME: &'static str = "Beta";

    async fn build(&self, conf: BetaConfiguration) -> Result<Arc<dyn Provider>> {
        check_token(&conf.token)?;
        Ok(Arc::new(StubProvider::new(Self::NAME, vec![formats::FLAC_16])))
    }
}

/// Builder whose providers claim Alpha's identity.
pub struct ImpostorBuilder;

#[async_trait]
impl ProviderBuilder for ImpostorBuilder {
    type Configuration = BetaConfiguration;
    const NAME: &'static str = "Impostor";

    async fn build(&self, conf: BetaConfiguration) -> Result<Arc<dyn Provider>> {
        check_token(&conf.token)?;
        Ok(Arc::new(StubProvider::new("Alpha", vec![formats::MP3_128])))
    }
}

/// Serves `data` in fixed-size chunks and drops the connection after the
/// first chunk of each of the first `failures` opens.
pub struct FlakySource {
    data: Bytes,
    chunk_size: usize,
    failures_left: Mutex<u32>,
    pub opens: Mutex<Vec<u64>>,
}

impl FlakySource {
    pub fn new(data: Bytes, chunk_size: usize, failures: u32) -> Self {
        Self {
            data,
            chunk_size,
            failures_left: Mutex::new(failures),
            opens: Mutex::new(Vec::new()),
        }
    }

    pub fn open_offsets(&self) -> Vec<u64> {
        self.opens.lock().unwrap().clone()
    }
}

#[async_trait]
impl RangeSource for FlakySource {
    async fn open(&self, offset: u64) -> Result<ByteStream> {
        self.opens.lock().unwrap().push(offset);

        let rest = self.data.slice(offset as usize..);
        let mut items: Vec<Result<Bytes>> = rest
            .chunks(self.chunk_size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();

        let mut failures = self.failures_left.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            items.truncate(1);
            items.push(Err(Error::TransientTransport(
                "connection reset by peer".to_string(),
            )));
        }

        Ok(stream::iter(items).boxed())
    }

    fn describe(&self) -> String {
        "flaky test source".to_string()
    }
}

/// Source that refuses every open with a non-retryable error.
pub struct ForbiddenSource {
    pub opens: Mutex<u32>,
}

#[async_trait]
impl RangeSource for ForbiddenSource {
    async fn open(&self, _offset: u64) -> Result<ByteStream> {
        *self.opens.lock().unwrap() += 1;
        Err(Error::Authorization("subscription required".to_string()))
    }

    fn describe(&self) -> String {
        "forbidden test source".to_string()
    }
}

/// Tagger that records what it was asked to tag and passes bytes through.
#[derive(Default)]
pub struct RecordingTagger {
    pub calls: Mutex<Vec<(String, AudioFormat)>>,
}

#[async_trait]
impl Tagger for RecordingTagger {
    async fn tag(
        &self,
        audio: ByteStream,
        track: &TrackInfo,
        format: &AudioFormat,
    ) -> Result<ByteStream> {
        self.calls
            .lock()
            .unwrap()
            .push((track.id.clone(), *format));
        Ok(audio)
    }
}

pub fn patterned_bytes(len: usize) -> Bytes {
    (0..len).map(|i| (i % 251) as u8).collect::<Vec<u8>>().into()
}

const STRIPE_IV: [u8; 8] = [0, 1, 2, 3, 4, 5, 6, 7];

pub fn encrypt_stripe(key: &[u8; 16], data: &mut [u8]) {
    let len = data.len();
    cbc::Encryptor::<Blowfish>::new_from_slices(key, &STRIPE_IV)
        .unwrap()
        .encrypt_padded_mut::<NoPadding>(data, len)
        .unwrap();
}

/// Plain content that never starts with a zero byte.
pub fn plain(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 250) as u8 + 1).collect()
}

/// Encrypts the first stripe of every full window, the way the CDN serves it.
pub fn obfuscate(key: &[u8; 16], data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    for window in out.chunks_mut(WINDOW_SIZE) {
        if window.len() >= STRIPE_SIZE {
            encrypt_stripe(key, &mut window[..STRIPE_SIZE]);
        }
    }
    out
}
