// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Server side of the DH-OPRF from draft-krawczyk-cfrg-opaque-00
//!
//! The server holds a per-user salt `k` and, upon receiving a blinded element
//! `a`, responds with `b = a^k`. The blinding factor never reaches the server,
//! so nothing here learns the client's password input.

use crate::errors::InternalError;
use crate::group::{self, Point};
use p256::Scalar;
use rand::{CryptoRng, RngCore};

/// Samples a fresh per-user OPRF salt, uniform in `[1, n-1]`
pub fn generate_salt<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    group::random_nonzero_scalar(rng)
}

/// Computes the server's OPRF response `b = a^k`
///
/// All received values are checked to be non-unit elements of the group
/// before the salt touches them; [`Point`] enforces this at construction, so
/// an off-curve `a` never reaches this multiplication.
pub fn evaluate(a: &Point, salt: &Scalar) -> Result<Point, InternalError> {
    a.mul(salt)
}
