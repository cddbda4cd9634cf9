use std::sync::Arc;

use crate::{
    audio::{AudioFormat, negotiate},
    error::{Error, Result},
    info,
    management::{RequestPreferences, TrackSearchContext},
    provider::{ByteStream, Provider},
    registry::ProviderRegistry,
    tagger::Tagger,
    types::TrackInfo,
};

/// A finished download ready to be handed to the caller.
pub struct Download {
    pub filename: String,
    pub format: AudioFormat,
    pub stream: ByteStream,
}

/// Composes registry, providers and tagger into search and download
/// requests. Holds no per-request state.
pub struct RequestManager {
    registry: Arc<ProviderRegistry>,
    tagger: Arc<dyn Tagger>,
}

impl RequestManager {
    pub fn new(registry: Arc<ProviderRegistry>, tagger: Arc<dyn Tagger>) -> Self {
        Self { registry, tagger }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// The preferred provider when it is loaded, otherwise the first loaded
    /// one.
    pub fn resolve_provider(&self, preferences: &RequestPreferences) -> Result<Arc<dyn Provider>> {
        preferences
            .provider_name
            .as_deref()
            .and_then(|name| self.registry.by_name(name))
            .or_else(|| self.registry.first_loaded())
            .ok_or_else(|| {
                Error::NoProviderAvailable(match &preferences.provider_name {
                    Some(name) => format!("'{name}' is not loaded and no other provider is"),
                    None => "no provider is loaded".to_string(),
                })
            })
    }

    pub async fn search(
        &self,
        terms: &str,
        preferences: &RequestPreferences,
    ) -> Result<Vec<TrackSearchContext>> {
        let provider = self.resolve_provider(preferences)?;
        let tracks = provider.search(terms).await?;

        Ok(tracks
            .into_iter()
            .map(|track| TrackSearchContext::new(Arc::clone(&provider), track))
            .collect())
    }

    /// Negotiates the format, starts the provider download and passes the
    /// stream through the tagger.
    pub async fn download(
        &self,
        context: &TrackSearchContext,
        preferences: &RequestPreferences,
    ) -> Result<Download> {
        let provider = &context.provider;
        let track = &context.trackinfo;

        let format = negotiate(provider.available_formats(), preferences.quality).ok_or_else(
            || Error::NoAcceptableFormat {
                provider: provider.identity().to_string(),
                requested: preferences.quality,
            },
        )?;

        info!(
            "Downloading '{}' from {} as {}",
            track.title,
            provider.identity(),
            format
        );

        let raw = provider.download(&track.id, format).await?;
        let stream = self.tagger.tag(raw, track, &format).await?;

        Ok(Download {
            filename: download_filename(track, &format),
            format,
            stream,
        })
    }
}

/// `"{first artist} - {title}.{extension}"`.
pub fn download_filename(track: &TrackInfo, format: &AudioFormat) -> String {
    format!(
        "{} - {}.{}",
        track.first_artist(),
        track.title,
        format.extension
    )
}
