use untzine::audio::{AudioQuality, formats, negotiate};

#[test]
fn test_quality_tiers_are_totally_ordered() {
    let tiers = AudioQuality::all();
    assert_eq!(tiers.first(), Some(&AudioQuality::VeryLow));
    assert_eq!(tiers.last(), Some(&AudioQuality::VeryHigh));

    for window in tiers.windows(2) {
        assert!(window[0] < window[1]);
    }

    for (_, f1) in formats::CATALOG {
        for (_, f2) in formats::CATALOG {
            assert!(f1.quality() <= f2.quality() || f2.quality() <= f1.quality());
        }
    }
}

#[test]
fn test_quality_ordinals() {
    for tier in AudioQuality::all() {
        assert_eq!(AudioQuality::from_ordinal(tier.ordinal()), Some(*tier));
    }
    assert_eq!(AudioQuality::from_ordinal(5), None);
    assert_eq!(AudioQuality::highest(), AudioQuality::VeryHigh);
}

#[test]
fn test_quality_from_str() {
    assert_eq!("very-high".parse::<AudioQuality>(), Ok(AudioQuality::VeryHigh));
    assert_eq!("very_low".parse::<AudioQuality>(), Ok(AudioQuality::VeryLow));
    assert_eq!("Medium".parse::<AudioQuality>(), Ok(AudioQuality::Medium));
    assert_eq!("3".parse::<AudioQuality>(), Ok(AudioQuality::High));
    assert!("9".parse::<AudioQuality>().is_err());
    assert!("lossless".parse::<AudioQuality>().is_err());
}

#[test]
fn test_catalog_lookup() {
    assert_eq!(formats::by_name("flac_16"), Some(formats::FLAC_16));
    assert_eq!(formats::by_name("MP3_320"), Some(formats::MP3_320));
    assert_eq!(formats::by_name("WAV"), None);
    assert_eq!(formats::FLAC_16.quality(), AudioQuality::VeryHigh);
}

#[test]
fn test_negotiate_picks_requested_tier() {
    let available = [formats::MP3_128, formats::MP3_256, formats::MP3_320];

    assert_eq!(
        negotiate(&available, AudioQuality::High),
        Some(formats::MP3_320)
    );
    assert_eq!(
        negotiate(&available, AudioQuality::Medium),
        Some(formats::MP3_256)
    );
}

#[test]
fn test_negotiate_downgrades_to_fit() {
    let available = [formats::MP3_128, formats::MP3_320];

    assert_eq!(
        negotiate(&available, AudioQuality::VeryHigh),
        Some(formats::MP3_320)
    );
    assert_eq!(
        negotiate(&available, AudioQuality::Medium),
        Some(formats::MP3_128)
    );
}

#[test]
fn test_negotiate_never_upgrades() {
    let available = [formats::MP3_128, formats::MP3_256, formats::MP3_320];
    assert_eq!(negotiate(&available, AudioQuality::VeryLow), None);

    let only_lossless = [formats::FLAC_16];
    assert_eq!(negotiate(&only_lossless, AudioQuality::High), None);
    assert_eq!(negotiate(&[], AudioQuality::VeryHigh), None);
}

#[test]
fn test_negotiate_breaks_ties_by_catalog_order() {
    // MP3_128 and MP3_160 share the Low tier; MP3_160 is declared first.
    let available = [formats::MP3_128, formats::MP3_160];
    assert_eq!(
        negotiate(&available, AudioQuality::Low),
        Some(formats::MP3_160)
    );

    // Same result whatever order the provider lists them in.
    let reversed = [formats::MP3_160, formats::MP3_128];
    assert_eq!(
        negotiate(&reversed, AudioQuality::Low),
        Some(formats::MP3_160)
    );
}
