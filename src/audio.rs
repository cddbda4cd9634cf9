//! Audio format catalog and quality tiers.
//!
//! Every format a provider can deliver is one of the constants in
//! [`formats`]. Tiers are independent of codec and container and form a
//! total order, which is what negotiation works on.

use std::{fmt, str::FromStr};

/// Quality tier, ordered from `VeryLow` to `VeryHigh`.
///
/// The discriminant is the ordinal carried in the preferences token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AudioQuality {
    VeryLow = 0,
    Low = 1,
    Medium = 2,
    High = 3,
    VeryHigh = 4,
}

impl AudioQuality {
    pub const ALL: [AudioQuality; 5] = [
        AudioQuality::VeryLow,
        AudioQuality::Low,
        AudioQuality::Medium,
        AudioQuality::High,
        AudioQuality::VeryHigh,
    ];

    /// All tiers, lowest first. Used to build preference pickers.
    pub fn all() -> &'static [AudioQuality] {
        &Self::ALL
    }

    pub fn highest() -> Self {
        AudioQuality::VeryHigh
    }

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.get(ordinal as usize).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            AudioQuality::VeryLow => "Very low",
            AudioQuality::Low => "Low",
            AudioQuality::Medium => "Medium",
            AudioQuality::High => "High",
            AudioQuality::VeryHigh => "Very high",
        }
    }
}

impl fmt::Display for AudioQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Accepts an ordinal (`0`..`4`) or a tier name such as `very-high`,
/// `very_high` or `VeryHigh`.
impl FromStr for AudioQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(ordinal) = s.trim().parse::<u8>() {
            return Self::from_ordinal(ordinal)
                .ok_or_else(|| format!("quality ordinal must be between 0 and 4, got {ordinal}"));
        }

        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        Self::ALL
            .iter()
            .find(|q| q.label().replace(' ', "").to_lowercase() == normalized)
            .copied()
            .ok_or_else(|| format!("unknown quality '{s}'"))
    }
}

/// A concrete encoding a provider can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    /// Nominal bitrate in kbps.
    pub bitrate: u32,
    /// File extension of the container, without the dot.
    pub extension: &'static str,
    pub codec: &'static str,
    pub quality: AudioQuality,
}

impl AudioFormat {
    pub const fn new(
        bitrate: u32,
        extension: &'static str,
        codec: &'static str,
        quality: AudioQuality,
    ) -> Self {
        Self {
            bitrate,
            extension,
            codec,
            quality,
        }
    }

    pub fn quality(&self) -> AudioQuality {
        self.quality
    }

    /// Position of this format in the catalog declaration order, if it is
    /// a catalog format.
    pub fn catalog_position(&self) -> Option<usize> {
        formats::CATALOG.iter().position(|(_, f)| f == self)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}kbps ({})",
            self.codec.to_uppercase(),
            self.bitrate,
            self.quality
        )
    }
}

pub mod formats {
    use super::{AudioFormat, AudioQuality};

    pub const OGG_VORBIS_96: AudioFormat = AudioFormat::new(96, "ogg", "vorbis", AudioQuality::Low);
    pub const OGG_VORBIS_160: AudioFormat =
        AudioFormat::new(160, "ogg", "vorbis", AudioQuality::Medium);
    pub const OGG_VORBIS_320: AudioFormat =
        AudioFormat::new(320, "ogg", "vorbis", AudioQuality::High);
    pub const MP3_256: AudioFormat = AudioFormat::new(256, "mp3", "mp3", AudioQuality::Medium);
    pub const MP3_320: AudioFormat = AudioFormat::new(320, "mp3", "mp3", AudioQuality::High);
    pub const MP3_160: AudioFormat = AudioFormat::new(160, "mp3", "mp3", AudioQuality::Low);
    pub const MP3_128: AudioFormat = AudioFormat::new(128, "mp3", "mp3", AudioQuality::Low);
    pub const MP3_96: AudioFormat = AudioFormat::new(96, "mp3", "mp3", AudioQuality::VeryLow);
    pub const AAC_24: AudioFormat = AudioFormat::new(24, "m4a", "aac", AudioQuality::Medium);
    pub const AAC_48: AudioFormat = AudioFormat::new(48, "m4a", "aac", AudioQuality::High);
    pub const FLAC_16: AudioFormat =
        AudioFormat::new(1411, "flac", "flac", AudioQuality::VeryHigh);

    /// Named catalog in declaration order. Negotiation breaks tier ties by
    /// this order.
    pub const CATALOG: &[(&str, AudioFormat)] = &[
        ("OGG_VORBIS_96", OGG_VORBIS_96),
        ("OGG_VORBIS_160", OGG_VORBIS_160),
        ("OGG_VORBIS_320", OGG_VORBIS_320),
        ("MP3_256", MP3_256),
        ("MP3_320", MP3_320),
        ("MP3_160", MP3_160),
        ("MP3_128", MP3_128),
        ("MP3_96", MP3_96),
        ("AAC_24", AAC_24),
        ("AAC_48", AAC_48),
        ("FLAC_16", FLAC_16),
    ];

    pub fn by_name(name: &str) -> Option<AudioFormat> {
        CATALOG
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, f)| *f)
    }
}

/// Picks the highest-tier format that does not exceed `requested`.
///
/// There is no upgrade path: if every offered format is above the request,
/// nothing is acceptable. Among formats sharing the winning tier, the one
/// declared first in [`formats::CATALOG`] wins; formats outside the catalog
/// rank after catalog ones and keep the provider's order.
pub fn negotiate(available: &[AudioFormat], requested: AudioQuality) -> Option<AudioFormat> {
    let mut best: Option<(AudioFormat, usize)> = None;

    for (index, format) in available.iter().enumerate() {
        if format.quality > requested {
            continue;
        }

        let rank = format
            .catalog_position()
            .unwrap_or(formats::CATALOG.len() + index);

        best = match best {
            Some((current, current_rank))
                if current.quality > format.quality
                    || (current.quality == format.quality && current_rank <= rank) =>
            {
                Some((current, current_rank))
            }
            _ => Some((*format, rank)),
        };
    }

    best.map(|(format, _)| format)
}
