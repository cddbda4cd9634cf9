//! Deezer stream obfuscation.
//!
//! Encrypted Deezer resources are "striped": the file is cut into windows of
//! 6144 bytes and only the first 2048 bytes of each full-length stripe are
//! Blowfish-CBC encrypted with a per-track key and a fixed IV. The remainder
//! of every window is plain.
//!
//! Windows are counted from the start of the file, not from the start of a
//! network read, so [`StripeDecoder`] re-blocks whatever chunk sizes the
//! transport delivers (including the short reads around a resumed transfer).
//!
//! The legacy CDN path additionally hides the file location in an
//! AES-128-ECB encrypted blob, see [`encrypted_file_url`].

use aes::{
    Aes128,
    cipher::{BlockEncrypt, KeyInit, generic_array::GenericArray},
};
use blowfish::Blowfish;
use bytes::{Bytes, BytesMut};
use cbc::cipher::{BlockDecryptMut, KeyIvInit, block_padding::NoPadding};
use futures::{StreamExt, stream};
use md5::{Digest, Md5};

use crate::{
    error::{Error, Result},
    provider::ByteStream,
};

const BLOWFISH_SECRET: &[u8; 16] = b"g4el58wc0zvf9na1";
const BLOWFISH_IV: [u8; 8] = [0, 1, 2, 3, 4, 5, 6, 7];
const URL_CIPHER_KEY: &[u8; 16] = b"jo6aey6haid2Teih";
const URL_SEPARATOR: u8 = 0xa4;
const URL_PADDING: u8 = b'.';
const FORMAT_NUMBER: &str = "1";

/// Encrypted prefix of each window.
pub const STRIPE_SIZE: usize = 2048;
/// Distance between two encrypted stripes.
pub const WINDOW_SIZE: usize = STRIPE_SIZE * 3;

pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", Md5::digest(data))
}

/// Derives the Blowfish key of a track.
///
/// `key[i] = md5hex[i] ^ md5hex[i + 16] ^ secret[i]`, computed on the ASCII
/// hex digest of the track id.
pub fn blowfish_key(track_id: &str) -> [u8; 16] {
    let digest = md5_hex(track_id.as_bytes());
    let digest = digest.as_bytes();

    let mut key = [0u8; 16];
    for (i, byte) in key.iter_mut().enumerate() {
        *byte = digest[i] ^ digest[i + 16] ^ BLOWFISH_SECRET[i];
    }
    key
}

/// Decrypts one stripe in place. `data` must be a multiple of 8 bytes.
pub fn decrypt_stripe(key: &[u8; 16], data: &mut [u8]) -> Result<()> {
    let decryptor = cbc::Decryptor::<Blowfish>::new_from_slices(key, &BLOWFISH_IV)
        .map_err(|e| Error::Vendor(format!("invalid Blowfish key: {e}")))?;
    decryptor
        .decrypt_padded_mut::<NoPadding>(data)
        .map_err(|e| Error::Vendor(format!("Blowfish-CBC decryption failed: {e}")))?;
    Ok(())
}

/// Whether a media URL points at an obfuscated resource.
pub fn is_encrypted_url(url: &str) -> bool {
    url.contains("/mobile/") || url.contains("/media/")
}

/// Builds the legacy CDN URL of a track from its content hash.
///
/// The info block is `md5hex(payload) ‖ 0xA4 ‖ payload ‖ 0xA4`, where
/// `payload = hash ‖ 0xA4 ‖ "1" ‖ 0xA4 ‖ id ‖ 0xA4 ‖ media_version`. It is
/// padded with `.` to the next multiple of 16 (a full block of padding when
/// already aligned), AES-128-ECB encrypted and hex encoded.
pub fn encrypted_file_url(track_id: &str, track_hash: &str, media_version: &str) -> Result<String> {
    let Some(shard) = track_hash.chars().next() else {
        return Err(Error::Vendor("track has no content hash".to_string()));
    };

    let separator = [URL_SEPARATOR];
    let payload = [
        track_hash.as_bytes(),
        FORMAT_NUMBER.as_bytes(),
        track_id.as_bytes(),
        media_version.as_bytes(),
    ]
    .join(&separator[..]);

    let mut info = md5_hex(&payload).into_bytes();
    info.push(URL_SEPARATOR);
    info.extend_from_slice(&payload);
    info.push(URL_SEPARATOR);
    let padding = 16 - info.len() % 16;
    info.resize(info.len() + padding, URL_PADDING);

    let cipher = Aes128::new(GenericArray::from_slice(URL_CIPHER_KEY));
    for block in info.chunks_exact_mut(16) {
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }

    let path: String = info.iter().map(|b| format!("{b:02x}")).collect();
    Ok(format!(
        "https://e-cdns-proxy-{shard}.dzcdn.net/mobile/1/{path}"
    ))
}

/// Re-blocks a byte stream into stripe windows and decrypts them.
///
/// Also removes the zero padding some files carry before their first frame,
/// unless the file is an MP4 container (`ftyp` box at offset 4).
pub struct StripeDecoder {
    key: Option<[u8; 16]>,
    pending: BytesMut,
    first: bool,
}

impl StripeDecoder {
    /// `key` is `None` for resources that are not encrypted.
    pub fn new(key: Option<[u8; 16]>) -> Self {
        Self {
            key,
            pending: BytesMut::with_capacity(WINDOW_SIZE * 2),
            first: true,
        }
    }

    /// Buffers `chunk` and returns every complete window decoded so far.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Option<Bytes>> {
        self.pending.extend_from_slice(chunk);

        let complete = self.pending.len() / WINDOW_SIZE * WINDOW_SIZE;
        if complete == 0 {
            return Ok(None);
        }

        let mut out = self.pending.split_to(complete);
        if let Some(key) = &self.key {
            for window in out.chunks_mut(WINDOW_SIZE) {
                decrypt_stripe(key, &mut window[..STRIPE_SIZE])?;
            }
        }
        Ok(self.emit(out))
    }

    /// Flushes the trailing partial window. Its stripe is only decrypted
    /// when it holds a full 2048 bytes.
    pub fn finish(&mut self) -> Result<Option<Bytes>> {
        let mut out = self.pending.split();
        if let Some(key) = &self.key {
            if out.len() >= STRIPE_SIZE {
                decrypt_stripe(key, &mut out[..STRIPE_SIZE])?;
            }
        }
        Ok(self.emit(out))
    }

    fn emit(&mut self, mut out: BytesMut) -> Option<Bytes> {
        if self.first && !out.is_empty() {
            self.first = false;
            if out[0] == 0 && out.get(4..8) != Some(&b"ftyp"[..]) {
                let leading = out.iter().take_while(|b| **b == 0).count();
                let _ = out.split_to(leading);
            }
        }

        if out.is_empty() {
            None
        } else {
            Some(out.freeze())
        }
    }
}

/// Applies a [`StripeDecoder`] to a raw stream.
pub fn decrypt_stream(raw: ByteStream, key: Option<[u8; 16]>) -> ByteStream {
    stream::unfold(
        (raw, StripeDecoder::new(key), false),
        |(mut raw, mut decoder, done)| async move {
            if done {
                return None;
            }

            loop {
                match raw.next().await {
                    Some(Ok(chunk)) => match decoder.feed(&chunk) {
                        Ok(Some(out)) => return Some((Ok(out), (raw, decoder, false))),
                        Ok(None) => continue,
                        Err(e) => return Some((Err(e), (raw, decoder, true))),
                    },
                    Some(Err(e)) => return Some((Err(e), (raw, decoder, true))),
                    None => {
                        return match decoder.finish() {
                            Ok(Some(out)) => Some((Ok(out), (raw, decoder, true))),
                            Ok(None) => None,
                            Err(e) => Some((Err(e), (raw, decoder, true))),
                        };
                    }
                }
            }
        },
    )
    .boxed()
}
