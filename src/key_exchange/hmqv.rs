// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! An implementation of the HMQV key exchange used during authentication
//!
//! The derivation binds both parties' long-term and ephemeral keys into a
//! single curve point whose coordinates seed the handshake KDF. The ASCII
//! tags `"user"`, `"srvr"`, `"HMQVKeys"` and `"Finish"` are normative
//! transcript material and are encoded as raw bytes.

use crate::errors::InternalError;
use crate::group::{self, Point};
use crate::hash;
use p256::Scalar;

pub(crate) const STR_HMQV_KEYS: &[u8] = b"HMQVKeys";
pub(crate) const STR_USER: &[u8] = b"user";
pub(crate) const STR_SRVR: &[u8] = b"srvr";
pub(crate) const STR_FINISH: &[u8] = b"Finish";

/// Width of the nonces contributed by each side
pub const NONCE_LEN: usize = 32;

/// Initial keying material fed to the KDF: both coordinates of the HMQV point
pub type Ikm = [u8; 64];

// Variable-length transcript fields carry a two-byte big-endian length prefix
// so that no concatenation is ambiguous.
fn append_with_len2(out: &mut Vec<u8>, bytes: &[u8]) {
    debug_assert!(bytes.len() <= usize::from(u16::MAX));
    out.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
    out.extend_from_slice(bytes);
}

/// Builds the canonical transcript bound by both confirmation MACs
///
/// Coordinates and nonces are fixed-width big-endian; `username` and `env_u`
/// are length-prefixed. Any byte-level disagreement with the client's
/// transcript aborts the handshake at MAC verification.
#[allow(clippy::too_many_arguments)]
pub fn build_transcript(
    a: &Point,
    nonce_u: &[u8; NONCE_LEN],
    username: &[u8],
    ephemeral_pub_u: &Point,
    b: &Point,
    env_u: &[u8],
    nonce_s: &[u8; NONCE_LEN],
    ephemeral_pub_s: &Point,
) -> Vec<u8> {
    let mut transcript = Vec::with_capacity(8 * 32 + 2 * NONCE_LEN + username.len() + env_u.len());
    transcript.extend_from_slice(&a.x());
    transcript.extend_from_slice(&a.y());
    transcript.extend_from_slice(nonce_u);
    append_with_len2(&mut transcript, username);
    transcript.extend_from_slice(&ephemeral_pub_u.x());
    transcript.extend_from_slice(&ephemeral_pub_u.y());
    transcript.extend_from_slice(&b.x());
    transcript.extend_from_slice(&b.y());
    append_with_len2(&mut transcript, env_u);
    transcript.extend_from_slice(nonce_s);
    transcript.extend_from_slice(&ephemeral_pub_s.x());
    transcript.extend_from_slice(&ephemeral_pub_s.y());
    transcript
}

/// Builds the KDF info string `"HMQVKeys" || NonceU || NonceS || Username`
pub fn build_info(
    nonce_u: &[u8; NONCE_LEN],
    nonce_s: &[u8; NONCE_LEN],
    username: &[u8],
) -> Vec<u8> {
    let mut info = Vec::with_capacity(STR_HMQV_KEYS.len() + 2 * NONCE_LEN + username.len());
    info.extend_from_slice(STR_HMQV_KEYS);
    info.extend_from_slice(nonce_u);
    info.extend_from_slice(nonce_s);
    info.extend_from_slice(username);
    info
}

/// `H(pk.x || pk.y || tag || info)` interpreted as an integer mod n
fn q_scalar(pk: &Point, tag: &[u8], info: &[u8]) -> Scalar {
    let digest = hash::sha256(&[&pk.x(), &pk.y(), tag, info]);
    group::scalar_from_hash_output(&digest)
}

/// Server-side HMQV combination
///
/// Computes `(ePrivS + Q_s * privS) * (EphemeralPubU + Q_u * PubU)` where
/// `Q_u` is hashed from the client's ephemeral key and `Q_s` from the
/// server's. Returns the fixed-width coordinates of the resulting point.
pub fn server_ikm(
    ephemeral_priv_s: &Scalar,
    priv_s: &Scalar,
    ephemeral_pub_s: &Point,
    ephemeral_pub_u: &Point,
    pub_u: &Point,
    info: &[u8],
) -> Result<Ikm, InternalError> {
    let q_u = q_scalar(ephemeral_pub_u, STR_USER, info);
    let q_s = q_scalar(ephemeral_pub_s, STR_SRVR, info);

    let exponent = ephemeral_priv_s + &(q_s * priv_s);
    let base = ephemeral_pub_u.add(&pub_u.mul(&q_u)?)?;
    let shared = base.mul(&exponent)?;

    let mut ikm = [0u8; 64];
    ikm[..32].copy_from_slice(&shared.x());
    ikm[32..].copy_from_slice(&shared.y());
    Ok(ikm)
}
