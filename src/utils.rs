use std::time::Duration;

use base64::{
    Engine, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig, general_purpose::URL_SAFE_NO_PAD},
};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

/// URL-safe base64 that writes no padding and reads tokens with or without it.
pub const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub fn generate_code_verifier() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(128)
        .map(char::from)
        .collect()
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Finds the value of cookie `name` in a `Cookie` request header.
///
/// # Arguments
///
/// * `header` - Raw `Cookie` header value, pairs separated by `;`
/// * `name` - Cookie name to look for
///
/// # Returns
///
/// The trimmed value without surrounding quotes, or `None` when the cookie
/// is absent.
///
/// # Example
///
/// ```
/// # use untzine::utils::parse_cookie;
/// let quality = parse_cookie("theme=dark; quality=4", "quality");
/// assert_eq!(quality.as_deref(), Some("4"));
/// ```
pub fn parse_cookie(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
}

/// Replaces characters that are not allowed in file names on common file
/// systems.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = cleaned.trim().trim_matches('.');
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `Content-Disposition` value for an attachment, with an ASCII fallback
/// and the exact name percent-encoded as UTF-8.
pub fn content_disposition(filename: &str) -> String {
    let fallback: String = sanitize_filename(filename)
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .collect();

    let encoded = urlencoding::encode(filename);

    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

/// Formats a track length as `m:ss`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}
