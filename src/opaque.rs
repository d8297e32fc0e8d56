// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Provides the main server-side protocol API
//!
//! Two engines, each a short-lived state machine owned by the connection
//! handler that created it:
//!
//! * [`ServerRegistration`]: consumes `PwRegMsg1`/`PwRegMsg3` and produces a
//!   [`User`] record.
//! * [`ServerLogin`]: consumes `AuthMsg1`/`AuthMsg3` and, on successful key
//!   confirmation, releases the 32-byte session key.
//!
//! Both engines fail terminally: any error discards the in-flight session,
//! and the secret material it held is wiped on drop.

use crate::errors::utils::{check_slice_size, check_slice_size_atmost};
use crate::errors::ProtocolError;
use crate::hash;
use crate::key_exchange::hmqv::{self, NONCE_LEN, STR_FINISH};
use crate::keypair::{Key, KeyPair, PublicKey};
use crate::messages::{
    AuthMsg1, AuthMsg2, AuthMsg3, PwRegMsg1, PwRegMsg2, PwRegMsg3, WirePoint, MAC_LEN,
    MAX_ENVELOPE_LEN, MAX_USERNAME_LEN,
};
use crate::oprf;
use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The per-user record created by registration and stored by the server
///
/// Immutable once created. The OPRF salt is secret; the envelope is opaque
/// client data and the public key is, naturally, public.
#[derive(Clone)]
pub struct User {
    username: String,
    k: Key,
    env_u: Vec<u8>,
    pub_u: PublicKey,
}

impl User {
    /// The username this record is keyed by
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The client-sealed envelope returned during authentication
    pub fn envelope(&self) -> &[u8] {
        &self.env_u
    }

    /// The user's long-term public key
    pub fn public_key(&self) -> &PublicKey {
        &self.pub_u
    }

    fn salt(&self) -> Result<p256::Scalar, ProtocolError> {
        Ok(crate::group::scalar_from_slice(&self.k)?)
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("username", &self.username)
            .field("env_u_len", &self.env_u.len())
            .finish_non_exhaustive()
    }
}

fn check_username(username: &str) -> Result<(), ProtocolError> {
    if username.is_empty() || username.len() > MAX_USERNAME_LEN {
        return Err(ProtocolError::BadLength);
    }
    Ok(())
}

// Registration
// ============

/// The state the server holds between `PwRegMsg1` and `PwRegMsg3`
pub struct ServerRegistration {
    username: String,
    k: Key,
}

/// Contains the fields that are returned by a server registration start
pub struct ServerRegistrationStartResult {
    /// The response message to send to the client
    pub message: PwRegMsg2,
    /// The session state, consumed by [`ServerRegistration::finish`]
    pub state: ServerRegistration,
}

impl ServerRegistration {
    /// From the client's blinded password point, returns the OPRF response
    /// to be sent back, along with the in-flight session
    pub fn start<R: RngCore + CryptoRng>(
        rng: &mut R,
        server_public_key: &PublicKey,
        message: &PwRegMsg1,
    ) -> Result<ServerRegistrationStartResult, ProtocolError> {
        check_username(&message.username)?;
        let a = message.a.to_point()?;

        let k = oprf::generate_salt(rng);
        let b = oprf::evaluate(&a, &k)?;

        Ok(ServerRegistrationStartResult {
            message: PwRegMsg2 {
                b: WirePoint::from_point(&b),
                pub_s: WirePoint::from_point(server_public_key.as_point()),
            },
            state: ServerRegistration {
                username: message.username.clone(),
                k: Key::new(crate::group::scalar_to_bytes(&k).to_vec()),
            },
        })
    }

    /// Consumes the client's upload and produces the record to store
    ///
    /// The envelope is accepted as opaque bytes; only its size and the
    /// user's public key are checked.
    pub fn finish(self, message: &PwRegMsg3) -> Result<User, ProtocolError> {
        check_slice_size_atmost(&message.env_u, MAX_ENVELOPE_LEN, "env_u")?;
        let pub_u = message.pub_u.to_point()?;

        Ok(User {
            username: self.username,
            k: self.k,
            env_u: message.env_u.clone(),
            pub_u: PublicKey::from_point(pub_u),
        })
    }
}

// Login
// =====

/// The state the server holds between `AuthMsg2` and `AuthMsg3`
///
/// The ephemeral private key and the `Km2` MAC key are consumed inside
/// [`ServerLogin::start`] and wiped there; only what `finish` needs survives,
/// and it is wiped when the session is dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ServerLogin {
    session_key: Key,
    km3: Key,
    transcript: Vec<u8>,
}

/// Contains the fields that are returned by a server login start
pub struct ServerLoginStartResult {
    /// The response message to send to the client
    pub message: AuthMsg2,
    /// The session state, consumed by [`ServerLogin::finish`]
    pub state: ServerLogin,
}

/// Contains the fields that are returned by a server login finish
pub struct ServerLoginFinishResult {
    /// The mutually confirmed 32-byte session key
    pub session_key: Key,
}

impl ServerLogin {
    /// Processes `AuthMsg1` for a resolved user record
    ///
    /// Validates the client's points, evaluates the OPRF under the user's
    /// registration salt, runs the HMQV derivation and emits `AuthMsg2`
    /// carrying the server-to-client confirmation MAC.
    pub fn start<R: RngCore + CryptoRng>(
        rng: &mut R,
        server: &KeyPair,
        user: &User,
        message: &AuthMsg1,
    ) -> Result<ServerLoginStartResult, ProtocolError> {
        check_username(&message.username)?;
        let a = message.a.to_point()?;
        let ephemeral_pub_u = message.ephemeral_pub_u.to_point()?;

        let mut nonce_u = [0u8; NONCE_LEN];
        nonce_u.copy_from_slice(check_slice_size(&message.nonce_u, NONCE_LEN, "nonce_u")?);

        let b = oprf::evaluate(&a, &user.salt()?)?;

        let ephemeral = KeyPair::generate_random(rng)?;
        let mut nonce_s = [0u8; NONCE_LEN];
        rng.fill_bytes(&mut nonce_s);

        let transcript = hmqv::build_transcript(
            &a,
            &nonce_u,
            message.username.as_bytes(),
            &ephemeral_pub_u,
            &b,
            &user.env_u,
            &nonce_s,
            ephemeral.public().as_point(),
        );
        let info = hmqv::build_info(&nonce_u, &nonce_s, message.username.as_bytes());

        let mut ikm = hmqv::server_ikm(
            &ephemeral.private().to_scalar()?,
            &server.private().to_scalar()?,
            ephemeral.public().as_point(),
            &ephemeral_pub_u,
            user.pub_u.as_point(),
            &info,
        )?;
        let keys = hash::derive_handshake_keys(&ikm, &info)?;
        ikm.zeroize();

        let mac1 = hash::hmac(&keys.km2, &transcript)?;

        Ok(ServerLoginStartResult {
            message: AuthMsg2 {
                b: WirePoint::from_point(&b),
                env_u: user.env_u.clone(),
                ephemeral_pub_s: WirePoint::from_point(ephemeral.public().as_point()),
                nonce_s: nonce_s.to_vec(),
                mac1: mac1.to_vec(),
            },
            state: ServerLogin {
                session_key: keys.session_key,
                km3: keys.km3,
                transcript,
            },
        })
    }

    /// Verifies the client's confirmation MAC and releases the session key
    ///
    /// The comparison is constant-time, and a mismatch reveals nothing about
    /// which byte disagreed. Either way the session is consumed; there is no
    /// retry.
    pub fn finish(self, message: &AuthMsg3) -> Result<ServerLoginFinishResult, ProtocolError> {
        check_slice_size(&message.mac2, MAC_LEN, "mac2")?;

        let mut data = Vec::with_capacity(STR_FINISH.len() + self.transcript.len());
        data.extend_from_slice(STR_FINISH);
        data.extend_from_slice(&self.transcript);
        let expected = hash::hmac(&self.km3, &data)?;

        if !hash::hmac_equal(&expected, &message.mac2) {
            return Err(ProtocolError::MacMismatch);
        }

        Ok(ServerLoginFinishResult {
            session_key: self.session_key.clone(),
        })
    }
}
