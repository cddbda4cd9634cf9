//! # Providers
//!
//! A provider is a streaming back-end that can search its catalog and
//! deliver audio. Each one has its own authentication, catalog API and wire
//! format; the [`Provider`] trait hides those differences so the request
//! manager can treat them uniformly.
//!
//! Providers are built once, at registry load time, by a [`ProviderBuilder`]
//! fed with the provider's typed [`ProviderConfiguration`]. After that they
//! are shared behind an `Arc` and must tolerate concurrent calls.
//!
//! ## Back-ends
//!
//! - [`deezer`] - gateway API, Blowfish-striped streams, legacy CDN URL derivation
//! - [`spotify`] - librespot session for Ogg Vorbis audio, Web API search
//!
//! ## Streaming
//!
//! [`stream`] provides the resumable byte-range stream every back-end uses
//! to fetch audio. Downloads are returned as a [`ByteStream`] so bytes reach
//! the caller as they arrive; dropping the stream closes the connection.

pub mod deezer;
pub mod spotify;
pub mod stream;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::de::DeserializeOwned;

use crate::{
    audio::AudioFormat,
    error::Result,
    types::{AccountType, TrackInfo},
};

/// Audio bytes in delivery order.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Capability every back-end implements.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable, unique name used for lookups and inside tokens.
    fn identity(&self) -> &str;

    fn account_type(&self) -> AccountType;

    /// Formats this provider can deliver. Never empty.
    fn available_formats(&self) -> &[AudioFormat];

    /// Queries the vendor catalog. Results keep the vendor's relevance order.
    async fn search(&self, terms: &str) -> Result<Vec<TrackInfo>>;

    /// Resolves one track by its provider-scoped id.
    async fn lookup(&self, track_id: &str) -> Result<TrackInfo>;

    /// Fetches (and decrypts, when the wire format requires it) the audio.
    async fn download(&self, track_id: &str, format: AudioFormat) -> Result<ByteStream>;
}

/// Typed configuration section of one provider.
pub trait ProviderConfiguration: DeserializeOwned + Send + 'static {
    /// Lower-case key of the section in the configuration mapping.
    const KEY: &'static str;
}

/// Builds a live provider from its configuration.
#[async_trait]
pub trait ProviderBuilder: Send + Sync + 'static {
    type Configuration: ProviderConfiguration;

    /// Identity of the providers this builder produces.
    const NAME: &'static str;

    async fn build(&self, conf: Self::Configuration) -> Result<Arc<dyn Provider>>;
}

/// Returns the trimmed value when it holds something.
pub(crate) fn not_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
