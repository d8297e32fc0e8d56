// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Authenticated encryption over the confirmed session key
//!
//! After a successful handshake the peers exchange messages sealed with
//! AES-128-GCM under the first 16 bytes of `SK`. Each sealed message is a
//! random 12-byte nonce followed by the ciphertext, and travels on the wire
//! as one standard-base64 line.

use crate::errors::{InternalError, ProtocolError};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes128Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::{CryptoRng, RngCore};

/// Bytes of `SK` used as the channel key
pub const CHANNEL_KEY_LEN: usize = 16;

/// AES-GCM nonce width
const GCM_NONCE_LEN: usize = 12;

/// A symmetric channel keyed by a completed handshake
pub struct SecureChannel {
    cipher: Aes128Gcm,
}

impl SecureChannel {
    /// Keys the channel from a confirmed session key
    pub fn new(session_key: &[u8]) -> Result<Self, ProtocolError> {
        let key = session_key
            .get(..CHANNEL_KEY_LEN)
            .ok_or(ProtocolError::BadLength)?;
        let cipher = Aes128Gcm::new_from_slice(key)
            .map_err(|_| ProtocolError::Internal(InternalError::SealError))?;
        Ok(Self { cipher })
    }

    /// Seals a plaintext into `nonce || ciphertext`
    pub fn seal<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, ProtocolError> {
        let mut nonce = [0u8; GCM_NONCE_LEN];
        rng.fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| ProtocolError::Internal(InternalError::SealError))?;

        let mut sealed = Vec::with_capacity(GCM_NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Opens `nonce || ciphertext`; a forged or truncated message fails the
    /// tag check and is reported like any other authentication failure
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        if sealed.len() < GCM_NONCE_LEN {
            return Err(ProtocolError::BadLength);
        }
        let (nonce, ciphertext) = sealed.split_at(GCM_NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| ProtocolError::MacMismatch)
    }

    /// Seals a plaintext and encodes it for line framing
    pub fn seal_encoded<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        plaintext: &[u8],
    ) -> Result<String, ProtocolError> {
        Ok(BASE64.encode(self.seal(rng, plaintext)?))
    }

    /// Decodes one framed line and opens it
    pub fn open_encoded(&self, line: &str) -> Result<Vec<u8>, ProtocolError> {
        let sealed = BASE64
            .decode(line.trim_end())
            .map_err(|_| ProtocolError::BadFrame)?;
        self.open(&sealed)
    }
}
