// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Contains the messages used for the registration and authentication flows
//!
//! Every message after a connection's command tag is a single JSON object on
//! one line. Curve coordinates travel as unsigned decimal strings (inbound
//! parsing also accepts `0x`-prefixed hex); nonces, MACs and the envelope are
//! lowercase hex. None of these wire encodings enter the transcript -- the
//! engines always rebuild the fixed-width byte forms first.

use crate::errors::ProtocolError;
use crate::group::{Point, FIELD_ELEMENT_LEN};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use crate::key_exchange::hmqv::NONCE_LEN;

/// Width of the `Mac1`/`Mac2` fields, in bytes
pub const MAC_LEN: usize = 32;

/// Usernames longer than this are rejected before any cryptographic
/// processing, keeping the transcript length unambiguous
pub const MAX_USERNAME_LEN: usize = 255;

/// Upper bound on the opaque client envelope accepted at registration
pub const MAX_ENVELOPE_LEN: usize = 4096;

/// An affine point in its wire form: two coordinate strings
///
/// Unvalidated -- [`WirePoint::to_point`] is the only path onto the curve.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePoint {
    /// x coordinate
    #[serde(rename = "X", with = "coord_string")]
    pub x: [u8; FIELD_ELEMENT_LEN],
    /// y coordinate
    #[serde(rename = "Y", with = "coord_string")]
    pub y: [u8; FIELD_ELEMENT_LEN],
}

impl WirePoint {
    /// Wire form of a validated point
    pub fn from_point(point: &Point) -> Self {
        Self {
            x: point.x(),
            y: point.y(),
        }
    }

    /// Validates the coordinates onto the curve
    pub fn to_point(&self) -> Result<Point, ProtocolError> {
        Point::from_affine_coordinates(&self.x, &self.y).map_err(ProtocolError::from)
    }
}

/// The first message during password registration, client to server
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PwRegMsg1 {
    /// Requested username, opaque bytes to the protocol
    #[serde(rename = "Username")]
    pub username: String,
    /// The client's blinded password point
    #[serde(rename = "A")]
    pub a: WirePoint,
}

/// The second message in password registration, server to client
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PwRegMsg2 {
    /// OPRF response `b = a^k`
    #[serde(rename = "B")]
    pub b: WirePoint,
    /// The server's long-term public key
    #[serde(rename = "PubS")]
    pub pub_s: WirePoint,
}

/// The third and final message in password registration, client to server
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PwRegMsg3 {
    /// Client-sealed envelope, stored but never interpreted by the server
    #[serde(rename = "EnvU", with = "hex::serde")]
    pub env_u: Vec<u8>,
    /// The client's long-term public key
    #[serde(rename = "PubU")]
    pub pub_u: WirePoint,
}

/// The first message in the authentication protocol, client to server
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthMsg1 {
    /// Username to authenticate as
    #[serde(rename = "Username")]
    pub username: String,
    /// The client's blinded password point
    #[serde(rename = "A")]
    pub a: WirePoint,
    /// Client nonce, 32 bytes
    #[serde(rename = "NonceU", with = "hex::serde")]
    pub nonce_u: Vec<u8>,
    /// The client's ephemeral public key
    #[serde(rename = "EphemeralPubU")]
    pub ephemeral_pub_u: WirePoint,
}

/// The second message in the authentication protocol, server to client
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthMsg2 {
    /// OPRF response `b = a^k`, where `k` is the user's registration salt
    #[serde(rename = "B")]
    pub b: WirePoint,
    /// The envelope stored for this user at registration
    #[serde(rename = "EnvU", with = "hex::serde")]
    pub env_u: Vec<u8>,
    /// The server's ephemeral public key
    #[serde(rename = "EphemeralPubS")]
    pub ephemeral_pub_s: WirePoint,
    /// Server nonce, 32 bytes
    #[serde(rename = "NonceS", with = "hex::serde")]
    pub nonce_s: Vec<u8>,
    /// Server-to-client confirmation MAC over the transcript
    #[serde(rename = "Mac1", with = "hex::serde")]
    pub mac1: Vec<u8>,
}

/// The third and final message in the authentication protocol, client to
/// server
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthMsg3 {
    /// Client-to-server confirmation MAC
    #[serde(rename = "Mac2", with = "hex::serde")]
    pub mac2: Vec<u8>,
}

/// Decodes one framed JSON payload
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, ProtocolError> {
    serde_json::from_slice(payload).map_err(|_| ProtocolError::BadFrame)
}

/// Encodes a message as its single-line JSON payload
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(message).map_err(|_| ProtocolError::BadFrame)
}

mod coord_string {
    use super::FIELD_ELEMENT_LEN;
    use num_bigint::BigUint;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        coord: &[u8; FIELD_ELEMENT_LEN],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BigUint::from_bytes_be(coord).to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<[u8; FIELD_ELEMENT_LEN], D::Error> {
        let s = String::deserialize(deserializer)?;
        let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex_digits) if !hex_digits.is_empty() => {
                BigUint::parse_bytes(hex_digits.as_bytes(), 16)
            }
            Some(_) => None,
            None if !s.is_empty() => BigUint::parse_bytes(s.as_bytes(), 10),
            None => None,
        }
        .ok_or_else(|| D::Error::custom("malformed coordinate string"))?;

        let bytes = value.to_bytes_be();
        if bytes.len() > FIELD_ELEMENT_LEN {
            return Err(D::Error::custom("coordinate exceeds field width"));
        }
        let mut out = [0u8; FIELD_ELEMENT_LEN];
        out[FIELD_ELEMENT_LEN - bytes.len()..].copy_from_slice(&bytes);
        Ok(out)
    }
}
