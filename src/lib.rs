// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The server side of the OPAQUE asymmetric password-authenticated key
//! exchange, following draft-krawczyk-cfrg-opaque-00
//!
//! A client proves knowledge of a low-entropy password and both parties
//! derive a high-entropy 32-byte session key, without the server ever
//! learning the password or storing a password-equivalent. The server runs
//! two three-message flows over P-256:
//!
//! * **Password registration** (`pwreg`): a DH-OPRF evaluation under a fresh
//!   per-user salt, ending in a stored [`User`] record holding the salt, the
//!   user's long-term public key, and a client-sealed envelope the server
//!   never interprets.
//! * **Authentication** (`auth`): the same OPRF evaluation combined with an
//!   HMQV-style authenticated key exchange. Both sides MAC a canonical
//!   transcript of everything exchanged; the session key is released only
//!   after the client's confirmation MAC verifies.
//!
//! # Server registration
//!
//! The engine consumes the client's first message and produces the response
//! plus an in-flight session, which the connection handler keeps on its own
//! stack until the client's final message arrives:
//!
//! ```
//! use opaque_server::errors::ProtocolError;
//! use opaque_server::keypair::KeyPair;
//! use opaque_server::messages::{PwRegMsg1, PwRegMsg3, WirePoint};
//! use opaque_server::opaque::ServerRegistration;
//! use opaque_server::store::UserStore;
//! use rand::rngs::OsRng;
//!
//! let mut rng = OsRng;
//! let server_kp = KeyPair::generate_random(&mut rng)?;
//! let store = UserStore::new();
//!
//! // What a client would send: a blinded password point and, later, its
//! // sealed envelope and long-term public key.
//! let client_kp = KeyPair::generate_random(&mut rng)?;
//! let blinded = KeyPair::generate_random(&mut rng)?;
//! let msg1 = PwRegMsg1 {
//!     username: "alice".to_string(),
//!     a: WirePoint::from_point(blinded.public().as_point()),
//! };
//!
//! let start = ServerRegistration::start(&mut rng, server_kp.public(), &msg1)?;
//! // ... send `start.message` to the client, read its PwRegMsg3 ...
//! let msg3 = PwRegMsg3 {
//!     env_u: b"client-sealed envelope".to_vec(),
//!     pub_u: WirePoint::from_point(client_kp.public().as_point()),
//! };
//! let user = start.state.finish(&msg3)?;
//! store.insert(user)?;
//! # Ok::<(), ProtocolError>(())
//! ```
//!
//! # Server login
//!
//! [`ServerLogin::start`] validates every received point, evaluates the OPRF
//! under the user's registration salt, and runs the HMQV derivation; its
//! `AuthMsg2` carries the server-to-client confirmation MAC.
//! [`ServerLogin::finish`] verifies the client's MAC in constant time and
//! releases the session key. Failure at any step is terminal: the session is
//! consumed and its secrets are wiped on drop.
//!
//! # Transport
//!
//! [`server::Server`] wires the engines to a line-framed JSON protocol over
//! TCP: one task per connection, a per-read deadline, and a post-handshake
//! AES-GCM channel keyed by the confirmed session key.

#![deny(unsafe_code)]

/// Authenticated encryption over the confirmed session key
pub mod channel;
/// Protocol and internal error types
pub mod errors;
/// Elliptic curve operations over P-256
pub mod group;
/// SHA-256, HMAC and HKDF wrappers
pub mod hash;
/// The authenticated key exchange run during login
pub mod key_exchange;
/// Keypair and secret-byte container types
pub mod keypair;
/// Wire message definitions and JSON codecs
pub mod messages;
/// The registration and login engines
pub mod opaque;
/// Server side of the DH-OPRF
pub mod oprf;
/// TCP front end: framing, dispatch and connection handlers
pub mod server;
/// In-memory user record store
pub mod store;

pub use crate::messages::{AuthMsg1, AuthMsg2, AuthMsg3, PwRegMsg1, PwRegMsg2, PwRegMsg3};
pub use crate::opaque::{
    ServerLogin, ServerLoginFinishResult, ServerLoginStartResult, ServerRegistration,
    ServerRegistrationStartResult, User,
};
pub use crate::server::{Server, ServerConfig};
pub use crate::store::UserStore;
