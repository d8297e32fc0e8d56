// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Elliptic curve operations over the fixed protocol group, P-256
//!
//! Every point that can be observed by this crate is on-curve and not the
//! identity: [`Point`] can only be constructed through validating paths, so
//! downstream code never re-checks group membership. Scalar arithmetic stays
//! inside `p256::Scalar`, which is constant-time with respect to its value.

use crate::errors::InternalError;
use p256::elliptic_curve::ops::Reduce;
use p256::elliptic_curve::sec1::{Coordinates, FromEncodedPoint, ToEncodedPoint};
use p256::elliptic_curve::{Field, PrimeField};
use p256::{AffinePoint, EncodedPoint, FieldBytes, NonZeroScalar, ProjectivePoint, Scalar, U256};
use rand::{CryptoRng, RngCore};

/// Width of a P-256 field element and of a serialized scalar, in bytes
pub const FIELD_ELEMENT_LEN: usize = 32;

/// A validated affine point on P-256
///
/// The affine coordinates are captured at construction time, so accessors are
/// infallible and the fixed-width big-endian forms used by the transcript are
/// always available.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Point {
    point: AffinePoint,
    x: [u8; FIELD_ELEMENT_LEN],
    y: [u8; FIELD_ELEMENT_LEN],
}

impl Point {
    /// Builds a point from big-endian affine coordinates, rejecting anything
    /// that does not satisfy the curve equation. The SEC1 identity encoding
    /// has no affine coordinates and is rejected by the same path.
    pub fn from_affine_coordinates(
        x: &[u8; FIELD_ELEMENT_LEN],
        y: &[u8; FIELD_ELEMENT_LEN],
    ) -> Result<Self, InternalError> {
        let encoded = EncodedPoint::from_affine_coordinates(
            FieldBytes::from_slice(x),
            FieldBytes::from_slice(y),
            false,
        );
        let point = Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
            .ok_or(InternalError::PointError)?;
        Self::from_affine(point)
    }

    fn from_affine(point: AffinePoint) -> Result<Self, InternalError> {
        let encoded = point.to_encoded_point(false);
        match encoded.coordinates() {
            Coordinates::Uncompressed { x, y } => {
                let mut out = Self {
                    point,
                    x: [0u8; FIELD_ELEMENT_LEN],
                    y: [0u8; FIELD_ELEMENT_LEN],
                };
                out.x.copy_from_slice(x);
                out.y.copy_from_slice(y);
                Ok(out)
            }
            _ => Err(InternalError::PointError),
        }
    }

    fn from_projective(point: ProjectivePoint) -> Result<Self, InternalError> {
        Self::from_affine(point.to_affine())
    }

    /// Fixed-width big-endian x coordinate
    pub fn x(&self) -> [u8; FIELD_ELEMENT_LEN] {
        self.x
    }

    /// Fixed-width big-endian y coordinate
    pub fn y(&self) -> [u8; FIELD_ELEMENT_LEN] {
        self.y
    }

    /// Scalar multiplication `scalar * self`, rejecting an identity result
    pub fn mul(&self, scalar: &Scalar) -> Result<Self, InternalError> {
        Self::from_projective(ProjectivePoint::from(self.point) * scalar)
    }

    /// Point addition `self + other`, rejecting an identity result
    pub fn add(&self, other: &Point) -> Result<Self, InternalError> {
        Self::from_projective(ProjectivePoint::from(self.point) + other.point)
    }

    /// Scalar multiplication of the generator
    pub fn mul_base(scalar: &Scalar) -> Result<Self, InternalError> {
        Self::from_projective(ProjectivePoint::GENERATOR * scalar)
    }
}

/// Samples a scalar uniformly from `[1, n-1]`
pub fn random_nonzero_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    *NonZeroScalar::random(rng)
}

/// Parses a canonical big-endian scalar, rejecting zero and values >= n
pub fn scalar_from_slice(bytes: &[u8]) -> Result<Scalar, InternalError> {
    if bytes.len() != FIELD_ELEMENT_LEN {
        return Err(InternalError::ScalarError);
    }
    let scalar = Option::<Scalar>::from(Scalar::from_repr(FieldBytes::clone_from_slice(bytes)))
        .ok_or(InternalError::ScalarError)?;
    if scalar == Scalar::ZERO {
        return Err(InternalError::ScalarError);
    }
    Ok(scalar)
}

/// Fixed-width big-endian serialization of a scalar
pub fn scalar_to_bytes(scalar: &Scalar) -> [u8; FIELD_ELEMENT_LEN] {
    let mut out = [0u8; FIELD_ELEMENT_LEN];
    out.copy_from_slice(&scalar.to_repr());
    out
}

/// Interprets a 32-byte hash output as a big-endian integer reduced mod n
pub fn scalar_from_hash_output(digest: &[u8; 32]) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::clone_from_slice(digest))
}
