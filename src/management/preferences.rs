use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::{
    audio::AudioQuality,
    error::{Error, Result},
    utils::TOKEN_ENGINE,
};

/// Name of the cookie the HTTP surface keeps preferences in.
pub const PREFERENCES_COOKIE: &str = "untzine_preferences";

/// Per-request choices of the caller. Nothing is stored server side; the
/// value travels in a token the caller keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPreferences {
    pub quality: AudioQuality,
    pub provider_name: Option<String>,
}

impl Default for RequestPreferences {
    fn default() -> Self {
        Self {
            quality: AudioQuality::highest(),
            provider_name: None,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct PreferencesWire {
    quality: u8,
    provider_name: Option<String>,
}

impl RequestPreferences {
    pub fn new(quality: AudioQuality, provider_name: Option<String>) -> Self {
        let mut preferences = Self {
            quality,
            provider_name: None,
        };
        preferences.set_provider(provider_name.as_deref());
        preferences
    }

    pub fn to_cookie(&self) -> String {
        let wire = PreferencesWire {
            quality: self.quality.ordinal(),
            provider_name: self.provider_name.clone(),
        };
        // A struct of an integer and an optional string always serializes.
        let json = serde_json::to_vec(&wire).unwrap_or_default();
        TOKEN_ENGINE.encode(json)
    }

    /// Strict decoding.
    pub fn decode(token: &str) -> Result<Self> {
        let bytes = TOKEN_ENGINE
            .decode(token.trim())
            .map_err(|e| Error::TokenDecode(e.to_string()))?;
        let wire: PreferencesWire =
            serde_json::from_slice(&bytes).map_err(|e| Error::TokenDecode(e.to_string()))?;
        let quality = AudioQuality::from_ordinal(wire.quality).ok_or_else(|| {
            Error::TokenDecode(format!("unknown quality ordinal {}", wire.quality))
        })?;

        Ok(Self {
            quality,
            provider_name: wire.provider_name,
        })
    }

    /// Missing or unreadable tokens give the defaults.
    pub fn from_cookie(token: Option<&str>) -> Self {
        token
            .and_then(|t| Self::decode(t).ok())
            .unwrap_or_default()
    }

    /// Applies a submitted preferences form. An empty provider name clears
    /// the preferred provider.
    pub fn update_from_form(&mut self, quality: AudioQuality, provider_name: Option<&str>) {
        self.quality = quality;
        self.set_provider(provider_name);
    }

    fn set_provider(&mut self, provider_name: Option<&str>) {
        self.provider_name = provider_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
    }
}
