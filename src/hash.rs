// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! SHA-256, HMAC-SHA-256 and HKDF-SHA-256 wrappers
//!
//! The protocol fixes its hash to SHA-256; every keyed primitive in the
//! handshake goes through this module.

use crate::errors::InternalError;
use crate::keypair::Key;
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// SHA-256 output width in bytes
pub const HASH_LEN: usize = 32;

/// Width of each key drawn from the handshake KDF
pub const DERIVED_KEY_LEN: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// SHA-256 over the concatenation of `chunks`
pub fn sha256(chunks: &[&[u8]]) -> [u8; HASH_LEN] {
    let mut hasher = Sha256::new();
    for chunk in chunks {
        hasher.update(chunk);
    }
    hasher.finalize().into()
}

/// HMAC-SHA-256 of `data` under `key`
pub fn hmac(key: &[u8], data: &[u8]) -> Result<[u8; HASH_LEN], InternalError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| InternalError::HmacError)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

/// Constant-time tag comparison; unequal lengths compare unequal
pub fn hmac_equal(expected: &[u8], received: &[u8]) -> bool {
    if expected.len() != received.len() {
        return false;
    }
    expected.ct_eq(received).into()
}

/// The three keys drawn, in order, from the handshake KDF stream
pub struct DerivedKeys {
    /// Candidate session key, released only on successful confirmation
    pub session_key: Key,
    /// Key for the server-to-client confirmation MAC
    pub km2: Key,
    /// Key for the client-to-server confirmation MAC
    pub km3: Key,
}

/// HKDF-SHA-256 with a 32-byte all-zero salt, expanded under `info` into
/// `SK || Km2 || Km3`
pub fn derive_handshake_keys(ikm: &[u8], info: &[u8]) -> Result<DerivedKeys, InternalError> {
    let salt = [0u8; HASH_LEN];
    let hk = Hkdf::<Sha256>::new(Some(&salt), ikm);

    let mut okm = [0u8; 3 * DERIVED_KEY_LEN];
    hk.expand(info, &mut okm)
        .map_err(|_| InternalError::HkdfError)?;

    let keys = DerivedKeys {
        session_key: Key::new(okm[..DERIVED_KEY_LEN].to_vec()),
        km2: Key::new(okm[DERIVED_KEY_LEN..2 * DERIVED_KEY_LEN].to_vec()),
        km3: Key::new(okm[2 * DERIVED_KEY_LEN..].to_vec()),
    };
    okm.zeroize();
    Ok(keys)
}
