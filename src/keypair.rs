// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Contains the keypair types used by the protocol engines

#![allow(unsafe_code)]

use crate::errors::InternalError;
use crate::group::{self, Point, FIELD_ELEMENT_LEN};
use rand::{CryptoRng, RngCore};
use std::ops::Deref;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A minimalist secret-byte container, wiped on drop
///
/// Used for private scalars and for the symmetric keys derived during a
/// handshake (`SK`, `Km2`, `Km3`).
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
#[repr(transparent)]
pub struct Key(Vec<u8>);

impl Key {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Deref for Key {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Key([REDACTED; {}])", self.0.len())
    }
}

/// Wrapper around a [`Key`] to enforce that it's a private scalar
#[derive(Clone, Debug, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
#[repr(transparent)]
pub struct PrivateKey(Key);

impl PrivateKey {
    /// Parses the canonical scalar held in this key
    pub(crate) fn to_scalar(&self) -> Result<p256::Scalar, InternalError> {
        group::scalar_from_slice(&self.0)
    }

    /// Fixed-width big-endian byte form
    pub fn to_arr(&self) -> [u8; FIELD_ELEMENT_LEN] {
        let mut out = [0u8; FIELD_ELEMENT_LEN];
        out.copy_from_slice(&self.0);
        out
    }
}

/// A validated public key; on-curve by construction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct PublicKey(Point);

impl PublicKey {
    /// Wraps an already-validated point
    pub fn from_point(point: Point) -> Self {
        Self(point)
    }

    /// The underlying curve point
    pub fn as_point(&self) -> &Point {
        &self.0
    }
}

/// A server keypair with public-private consistency enforced at the seams
#[derive(Clone, Debug)]
pub struct KeyPair {
    pk: PublicKey,
    sk: PrivateKey,
}

impl KeyPair {
    /// The public key component
    pub fn public(&self) -> &PublicKey {
        &self.pk
    }

    /// The private key component
    pub fn private(&self) -> &PrivateKey {
        &self.sk
    }

    /// Generating a random key pair given a cryptographic rng
    pub fn generate_random<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self, InternalError> {
        let sk = group::random_nonzero_scalar(rng);
        let pk = Point::mul_base(&sk)?;
        Ok(Self {
            pk: PublicKey(pk),
            sk: PrivateKey(Key(group::scalar_to_bytes(&sk).to_vec())),
        })
    }

    /// Obtaining a public key from secret bytes. At all times, we should have
    /// `public_from_private(self.private()) == self.public()`
    pub fn public_from_private(sk: &PrivateKey) -> Result<PublicKey, InternalError> {
        Ok(PublicKey(Point::mul_base(&sk.to_scalar()?)?))
    }

    /// Obtains a KeyPair from a slice representing the private key
    pub fn from_private_key_slice(input: &[u8]) -> Result<Self, InternalError> {
        let scalar = group::scalar_from_slice(input)?;
        let sk = PrivateKey(Key(group::scalar_to_bytes(&scalar).to_vec()));
        let pk = Self::public_from_private(&sk)?;
        Ok(Self { pk, sk })
    }
}
