//! Spotify access-point session (librespot): login, Web API tokens and
//! encrypted audio files.

use std::{
    io::{ErrorKind, Read, Seek, SeekFrom},
    sync::Arc,
};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream};
use librespot_audio::{AudioDecrypt, AudioFile};
use librespot_core::{
    FileId, Session, SessionConfig, SpotifyId, audio_key::AudioKey, authentication::Credentials,
    cache::Cache,
};
use librespot_metadata::{Metadata, Track, audio::AudioFileFormat};
use reqwest::Client;
use tokio::sync::mpsc;

use crate::{
    audio::{AudioFormat, formats},
    error::{Error, Result},
    info,
    management::TokenManager,
    provider::{ByteStream, not_empty, stream::RangeSource},
    types::AccountType,
};

use super::{SpotifyAudio, SpotifyConfiguration, api::AccessTokens};

/// Web API scopes requested from the session's token provider.
const API_SCOPES: &str = "user-read-email,playlist-read-private,user-library-read,user-follow-read";

/// Spotify prefixes its Ogg files with a private header of this length.
const OGG_HEADER_END: u64 = 0xa7;

const READ_CHUNK: usize = 16 * 1024;

/// Spotify's file format for a catalog format.
pub fn file_format(format: &AudioFormat) -> Option<AudioFileFormat> {
    match *format {
        f if f == formats::OGG_VORBIS_96 => Some(AudioFileFormat::OGG_VORBIS_96),
        f if f == formats::OGG_VORBIS_160 => Some(AudioFileFormat::OGG_VORBIS_160),
        f if f == formats::OGG_VORBIS_320 => Some(AudioFileFormat::OGG_VORBIS_320),
        _ => None,
    }
}

/// Opens an authenticated session.
///
/// Login methods are tried in order: the stored credentials in `session`,
/// the credentials cached under `login_session_save_path`, `login` with
/// `password`, and finally an OAuth token from `refresh_token` or the
/// `untzine auth` session file. When `login_session_save_path` is set the
/// reusable credentials are written there after a successful login.
pub async fn connect(conf: &SpotifyConfiguration) -> Result<Session> {
    let cache = match not_empty(&conf.login_session_save_path) {
        Some(dir) => Some(
            Cache::new(Some(dir), None, None, None)
                .map_err(|e| Error::Configuration(format!("{dir}: {e}")))?,
        ),
        None => None,
    };

    let credentials = if let Some(stored) = not_empty(&conf.session) {
        serde_json::from_str::<Credentials>(stored)
            .map_err(|e| Error::Configuration(format!("Invalid stored spotify session: {e}")))?
    } else if let Some(cached) = cache.as_ref().and_then(Cache::credentials) {
        cached
    } else if let (Some(login), Some(password)) = (not_empty(&conf.login), not_empty(&conf.password))
    {
        Credentials::with_password(login, password)
    } else if let Some(token) = oauth_token(conf).await? {
        Credentials::with_access_token(token)
    } else {
        return Err(Error::Configuration(
            "Cannot build spotify provider, no login method configured".to_string(),
        ));
    };

    let store_credentials = cache.is_some();
    let session = Session::new(SessionConfig::default(), cache);
    session
        .connect(credentials, store_credentials)
        .await
        .map_err(|e| {
            Error::Authorization(format!("Cannot build spotify provider, login failed: {e}"))
        })?;

    Ok(session)
}

/// Access token of the PKCE session, when one is configured.
async fn oauth_token(conf: &SpotifyConfiguration) -> Result<Option<String>> {
    let Some(client_id) = not_empty(&conf.client_id) else {
        return Ok(None);
    };

    let session_path = conf.session_path();
    let mut tokens = if let Some(refresh) = not_empty(&conf.refresh_token) {
        TokenManager::from_refresh_token(refresh, client_id, Some(session_path))
    } else if session_path.exists() {
        TokenManager::load(&session_path, client_id).await?
    } else {
        return Ok(None);
    };

    tokens.get_valid_token(&Client::new()).await.map(Some)
}

/// Web API tokens minted by the session's token provider.
pub struct SessionTokens(pub Session);

#[async_trait]
impl AccessTokens for SessionTokens {
    async fn access_token(&self) -> Result<String> {
        self.0
            .token_provider()
            .get_token(API_SCOPES)
            .await
            .map(|token| token.access_token)
            .map_err(|e| Error::Authorization(format!("Spotify token: {e}")))
    }
}

/// Audio delivered through the access point.
pub struct LibrespotAudio {
    session: Session,
}

impl LibrespotAudio {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    async fn track(&self, id: &SpotifyId) -> Result<Track> {
        Track::get(&self.session, id)
            .await
            .map_err(|e| Error::Vendor(format!("Spotify metadata: {e}")))
    }

    /// Finds the file of `track_id` in `format`, looking at the regional
    /// alternatives Spotify lists when the track itself has none.
    async fn resolve_file(&self, track_id: &str, format: AudioFileFormat) -> Result<(SpotifyId, FileId)> {
        let id = SpotifyId::from_uri(&format!("spotify:track:{track_id}"))
            .map_err(|e| Error::NotFound(format!("Spotify track {track_id}: {e}")))?;

        let track = self.track(&id).await?;
        if let Some(file) = track.files.get(&format) {
            return Ok((id, *file));
        }

        for alternative in track.alternatives.iter() {
            let candidate = self.track(alternative).await?;
            if let Some(file) = candidate.files.get(&format) {
                info!(
                    "Track {} is not available here, using alternative {:?}",
                    track_id, alternative
                );
                return Ok((*alternative, *file));
            }
        }

        Err(Error::Unavailable("Track is not available".to_string()))
    }
}

#[async_trait]
impl SpotifyAudio for LibrespotAudio {
    fn account_type(&self) -> AccountType {
        match self.session.get_user_attribute("type").as_deref() {
            Some("premium") => AccountType::Premium,
            _ => AccountType::Free,
        }
    }

    async fn source(&self, track_id: &str, format: AudioFormat) -> Result<Arc<dyn RangeSource>> {
        let file_format = file_format(&format)
            .ok_or_else(|| Error::Unavailable(format!("{format} is not offered by Spotify")))?;

        let (track, file) = self.resolve_file(track_id, file_format).await?;
        let key = self
            .session
            .audio_key()
            .request(track, file)
            .await
            .map_err(|e| Error::Authorization(format!("No audio key for {track_id}: {e}")))?;

        Ok(Arc::new(SpotifyFileSource {
            session: self.session.clone(),
            file,
            key,
            bytes_per_second: format.bitrate as usize * 1024 / 8,
            name: format!("spotify:track:{track_id}"),
        }))
    }
}

/// One encrypted Ogg file on Spotify's CDN, decrypted on read.
pub struct SpotifyFileSource {
    session: Session,
    file: FileId,
    key: AudioKey,
    bytes_per_second: usize,
    name: String,
}

#[async_trait]
impl RangeSource for SpotifyFileSource {
    async fn open(&self, offset: u64) -> Result<ByteStream> {
        let file = AudioFile::open(&self.session, self.file, self.bytes_per_second)
            .await
            .map_err(|e| Error::TransientTransport(e.to_string()))?;
        let mut reader = AudioDecrypt::new(Some(self.key), file);

        // The CDN reader blocks on its fetch tasks; it runs off the runtime
        // and hands chunks over a bounded channel.
        let (tx, rx) = mpsc::channel::<Result<Bytes>>(4);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = reader.seek(SeekFrom::Start(OGG_HEADER_END + offset)) {
                let _ = tx.blocking_send(Err(Error::TransientTransport(e.to_string())));
                return;
            }

            let mut buf = vec![0u8; READ_CHUNK];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => return,
                    Ok(n) => {
                        // The receiver is gone: the download was dropped.
                        if tx.blocking_send(Ok(Bytes::copy_from_slice(&buf[..n]))).is_err() {
                            return;
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        let _ = tx.blocking_send(Err(Error::TransientTransport(e.to_string())));
                        return;
                    }
                }
            }
        });

        Ok(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed())
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}
