//! Metadata tagging boundary.
//!
//! The request manager hands every download to a [`Tagger`] before it
//! reaches the caller. [`LoftyTagger`] writes title, artists, album, track
//! number and front cover into the container's native tag format.
//! [`PassthroughTagger`] forwards the audio untouched.

use std::io::{Cursor, Seek};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream};
use lofty::{
    config::WriteOptions,
    picture::{MimeType, Picture, PictureType},
    probe::Probe,
    tag::{Accessor, ItemKey, Tag, TagExt},
};
use reqwest::Client;

use crate::{
    audio::AudioFormat,
    error::{Error, Result},
    provider::{ByteStream, stream::collect},
    types::{ArtCover, TrackInfo},
    warning,
};

#[async_trait]
pub trait Tagger: Send + Sync {
    /// Receives the audio positioned at its first byte and returns the
    /// tagged stream. Unreadable content is reported as [`crate::error::Error::Tagging`].
    async fn tag(
        &self,
        audio: ByteStream,
        track: &TrackInfo,
        format: &AudioFormat,
    ) -> Result<ByteStream>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughTagger;

#[async_trait]
impl Tagger for PassthroughTagger {
    async fn tag(
        &self,
        audio: ByteStream,
        _track: &TrackInfo,
        _format: &AudioFormat,
    ) -> Result<ByteStream> {
        Ok(audio)
    }
}

/// Embeds track metadata with `lofty`.
///
/// Containers keep their tag blocks ahead of or around the audio, so the
/// whole file is buffered before writing. A cover given as a URL is
/// fetched first; if that fails the track is still tagged, without art.
#[derive(Debug, Clone, Default)]
pub struct LoftyTagger {
    client: Client,
}

impl LoftyTagger {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn cover(&self, track: &TrackInfo) -> Option<Vec<u8>> {
        match track.art_cover.as_ref()? {
            ArtCover::Data(data) => Some(data.clone()),
            ArtCover::Url(url) => match self.fetch_cover(url).await {
                Ok(data) => Some(data),
                Err(e) => {
                    warning!("Cannot fetch cover art for '{}': {}", track.title, e);
                    None
                }
            },
        }
    }

    async fn fetch_cover(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(Error::from_http)?
            .error_for_status()
            .map_err(Error::from_http)?;

        Ok(response.bytes().await.map_err(Error::from_http)?.to_vec())
    }
}

#[async_trait]
impl Tagger for LoftyTagger {
    async fn tag(
        &self,
        audio: ByteStream,
        track: &TrackInfo,
        format: &AudioFormat,
    ) -> Result<ByteStream> {
        let data = collect(audio).await?;
        let cover = self.cover(track).await;
        let track = track.clone();

        let tagged = tokio::task::spawn_blocking(move || write_tags(data.to_vec(), &track, cover))
            .await
            .map_err(|e| Error::Tagging(e.to_string()))?
            .map_err(|e| match e {
                Error::Tagging(reason) => Error::Tagging(format!("{format}: {reason}")),
                other => other,
            })?;

        Ok(stream::once(async move { Ok(Bytes::from(tagged)) }).boxed())
    }
}

/// Writes `track` into the primary tag of the in-memory file `data`.
fn write_tags(data: Vec<u8>, track: &TrackInfo, cover: Option<Vec<u8>>) -> Result<Vec<u8>> {
    let reader = Probe::new(Cursor::new(data))
        .guess_file_type()
        .map_err(|e| Error::Tagging(e.to_string()))?;
    let Some(file_type) = reader.file_type() else {
        return Err(Error::Tagging("unrecognized audio container".to_string()));
    };

    let mut tag = Tag::new(file_type.primary_tag_type());
    tag.set_title(track.title.clone());
    tag.set_artist(track.first_artist().to_string());
    tag.insert_text(ItemKey::TrackArtists, track.artists_joined());
    tag.set_album(track.album.clone());
    if track.track_nb > 0 {
        tag.set_track(track.track_nb);
    }

    if let Some(image) = cover {
        let mime = cover_mime(&image);
        tag.push_picture(Picture::new_unchecked(
            PictureType::CoverFront,
            mime,
            Some("Front Cover".to_string()),
            image,
        ));
    }

    let mut file = reader.into_inner();
    file.rewind().map_err(|e| Error::Tagging(e.to_string()))?;
    tag.save_to(&mut file, WriteOptions::default())
        .map_err(|e| Error::Tagging(e.to_string()))?;
    Ok(file.into_inner())
}

fn cover_mime(image: &[u8]) -> Option<MimeType> {
    if image.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(MimeType::Jpeg)
    } else if image.starts_with(b"\x89PNG") {
        Some(MimeType::Png)
    } else {
        None
    }
}
