// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! A minimal client side of the protocol, for exercising the server engines
//!
//! Mirrors what a real client computes: a blinded OPRF request, the HMQV
//! combination from the client's perspective, and both confirmation MACs.
//! Everything is rebuilt from wire messages, so these helpers also verify
//! that the two sides agree on the canonical transcript byte-for-byte.

// Each integration test binary compiles its own copy of this module and uses
// a different subset of it.
#![allow(dead_code)]

use opaque_server::group::{self, Point};
use opaque_server::hash;
use opaque_server::key_exchange::hmqv;
use opaque_server::messages::{
    AuthMsg1, AuthMsg2, AuthMsg3, PwRegMsg1, PwRegMsg2, PwRegMsg3, WirePoint,
};
use p256::elliptic_curve::Field;
use p256::Scalar;
use rand::{CryptoRng, RngCore};

pub struct ClientRegistration {
    pub username: String,
    pub blind: Scalar,
}

/// Starts registration with a blinded password point `A = blind * G`
pub fn client_register_start<R: RngCore + CryptoRng>(
    rng: &mut R,
    username: &str,
) -> (ClientRegistration, PwRegMsg1) {
    let blind = group::random_nonzero_scalar(rng);
    let a = Point::mul_base(&blind).unwrap();
    (
        ClientRegistration {
            username: username.to_string(),
            blind,
        },
        PwRegMsg1 {
            username: username.to_string(),
            a: WirePoint::from_point(&a),
        },
    )
}

/// What the client retains after registration completes
pub struct ClientCredentials {
    pub username: String,
    pub priv_u: Scalar,
    pub pub_u: Point,
    pub pub_s: Point,
    pub env_u: Vec<u8>,
}

/// Unblinds the server's response and uploads the long-term key and envelope
pub fn client_register_finish<R: RngCore + CryptoRng>(
    rng: &mut R,
    registration: ClientRegistration,
    msg2: &PwRegMsg2,
) -> (ClientCredentials, PwRegMsg3) {
    // Unblinding checks that the server's evaluation is well-formed; the
    // derived value would feed the envelope KDF in a real client.
    let b = msg2.b.to_point().unwrap();
    let unblind = Option::<Scalar>::from(registration.blind.invert()).unwrap();
    let _rwd = b.mul(&unblind).unwrap();

    let priv_u = group::random_nonzero_scalar(rng);
    let pub_u = Point::mul_base(&priv_u).unwrap();
    let mut env_u = vec![0u8; 64];
    rng.fill_bytes(&mut env_u);

    let credentials = ClientCredentials {
        username: registration.username,
        priv_u,
        pub_u,
        pub_s: msg2.pub_s.to_point().unwrap(),
        env_u: env_u.clone(),
    };
    let msg3 = PwRegMsg3 {
        env_u,
        pub_u: WirePoint::from_point(&pub_u),
    };
    (credentials, msg3)
}

pub struct ClientLogin {
    pub username: String,
    pub a: Point,
    pub nonce_u: [u8; 32],
    pub ephemeral_priv_u: Scalar,
    pub ephemeral_pub_u: Point,
    pub priv_u: Scalar,
    pub pub_s: Point,
}

/// Starts a login run with a fresh blinded point, nonce and ephemeral key
pub fn client_login_start<R: RngCore + CryptoRng>(
    rng: &mut R,
    credentials: &ClientCredentials,
) -> (ClientLogin, AuthMsg1) {
    let blind = group::random_nonzero_scalar(rng);
    let a = Point::mul_base(&blind).unwrap();
    let mut nonce_u = [0u8; 32];
    rng.fill_bytes(&mut nonce_u);
    let ephemeral_priv_u = group::random_nonzero_scalar(rng);
    let ephemeral_pub_u = Point::mul_base(&ephemeral_priv_u).unwrap();

    let login = ClientLogin {
        username: credentials.username.clone(),
        a,
        nonce_u,
        ephemeral_priv_u,
        ephemeral_pub_u,
        priv_u: credentials.priv_u,
        pub_s: credentials.pub_s,
    };
    let msg1 = AuthMsg1 {
        username: credentials.username.clone(),
        a: WirePoint::from_point(&login.a),
        nonce_u: nonce_u.to_vec(),
        ephemeral_pub_u: WirePoint::from_point(&login.ephemeral_pub_u),
    };
    (login, msg1)
}

pub struct ClientLoginResult {
    pub session_key: Vec<u8>,
    pub msg3: AuthMsg3,
}

fn q_scalar(pk: &Point, tag: &[u8], info: &[u8]) -> Scalar {
    let digest = hash::sha256(&[&pk.x(), &pk.y(), tag, info]);
    group::scalar_from_hash_output(&digest)
}

/// Processes `AuthMsg2`: rebuilds the transcript from wire data, derives the
/// session keys, verifies `Mac1` and produces `Mac2`
pub fn client_login_finish(login: &ClientLogin, msg2: &AuthMsg2) -> Result<ClientLoginResult, String> {
    let b = msg2.b.to_point().map_err(|e| e.to_string())?;
    let ephemeral_pub_s = msg2.ephemeral_pub_s.to_point().map_err(|e| e.to_string())?;
    let nonce_s: [u8; 32] = msg2
        .nonce_s
        .as_slice()
        .try_into()
        .map_err(|_| "bad NonceS length".to_string())?;

    let transcript = hmqv::build_transcript(
        &login.a,
        &login.nonce_u,
        login.username.as_bytes(),
        &login.ephemeral_pub_u,
        &b,
        &msg2.env_u,
        &nonce_s,
        &ephemeral_pub_s,
    );
    let info = hmqv::build_info(&login.nonce_u, &nonce_s, login.username.as_bytes());

    let q_u = q_scalar(&login.ephemeral_pub_u, b"user", &info);
    let q_s = q_scalar(&ephemeral_pub_s, b"srvr", &info);

    // (ePrivU + Q_u * privU) * (EphemeralPubS + Q_s * PubS)
    let exponent = login.ephemeral_priv_u + (q_u * login.priv_u);
    let base = ephemeral_pub_s
        .add(&login.pub_s.mul(&q_s).map_err(|e| e.to_string())?)
        .map_err(|e| e.to_string())?;
    let shared = base.mul(&exponent).map_err(|e| e.to_string())?;

    let mut ikm = [0u8; 64];
    ikm[..32].copy_from_slice(&shared.x());
    ikm[32..].copy_from_slice(&shared.y());

    let keys = hash::derive_handshake_keys(&ikm, &info).map_err(|e| e.to_string())?;

    let expected_mac1 = hash::hmac(&keys.km2, &transcript).map_err(|e| e.to_string())?;
    if !hash::hmac_equal(&expected_mac1, &msg2.mac1) {
        return Err("server confirmation MAC mismatch".to_string());
    }

    let mut finish_data = b"Finish".to_vec();
    finish_data.extend_from_slice(&transcript);
    let mac2 = hash::hmac(&keys.km3, &finish_data).map_err(|e| e.to_string())?;

    Ok(ClientLoginResult {
        session_key: keys.session_key.to_vec(),
        msg3: AuthMsg3 {
            mac2: mac2.to_vec(),
        },
    })
}
