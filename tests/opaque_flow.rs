// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Full protocol runs against the server engines, with the client side
//! computed independently from wire messages

mod common;

use common::{
    client_login_finish, client_login_start, client_register_finish, client_register_start,
    ClientCredentials,
};
use opaque_server::errors::ProtocolError;
use opaque_server::keypair::KeyPair;
use opaque_server::messages::WirePoint;
use opaque_server::opaque::{ServerLogin, ServerRegistration, User};
use opaque_server::store::UserStore;
use rand::rngs::OsRng;

fn register(server_kp: &KeyPair, store: &UserStore, username: &str) -> ClientCredentials {
    let mut rng = OsRng;
    let (registration, msg1) = client_register_start(&mut rng, username);
    let start = ServerRegistration::start(&mut rng, server_kp.public(), &msg1).unwrap();
    let (credentials, msg3) = client_register_finish(&mut rng, registration, &start.message);
    let user = start.state.finish(&msg3).unwrap();
    store.insert(user).unwrap();
    credentials
}

fn authenticate(
    server_kp: &KeyPair,
    user: &User,
    credentials: &ClientCredentials,
) -> (Vec<u8>, Vec<u8>) {
    let mut rng = OsRng;
    let (login, msg1) = client_login_start(&mut rng, credentials);
    let start = ServerLogin::start(&mut rng, server_kp, user, &msg1).unwrap();
    let client = client_login_finish(&login, &start.message).unwrap();
    let finish = start.state.finish(&client.msg3).unwrap();
    (finish.session_key.to_vec(), client.session_key)
}

#[test]
fn registration_stores_exactly_one_record() {
    let mut rng = OsRng;
    let server_kp = KeyPair::generate_random(&mut rng).unwrap();
    let store = UserStore::new();

    register(&server_kp, &store, "alice");

    assert_eq!(store.len(), 1);
    let user = store.lookup("alice").unwrap();
    assert_eq!(user.username(), "alice");
    // The stored public key is on-curve by construction; reparse to be sure
    let point = user.public_key().as_point();
    WirePoint::from_point(point).to_point().unwrap();
}

#[test]
fn both_parties_derive_the_same_session_key() {
    let mut rng = OsRng;
    let server_kp = KeyPair::generate_random(&mut rng).unwrap();
    let store = UserStore::new();

    let credentials = register(&server_kp, &store, "alice");
    let user = store.lookup("alice").unwrap();

    let (server_sk, client_sk) = authenticate(&server_kp, &user, &credentials);
    assert_eq!(server_sk.len(), 32);
    assert_eq!(server_sk, client_sk);
}

#[test]
fn unknown_user_is_not_in_the_store() {
    let mut rng = OsRng;
    let server_kp = KeyPair::generate_random(&mut rng).unwrap();
    let store = UserStore::new();
    register(&server_kp, &store, "alice");

    assert!(store.lookup("bob").is_none());
    assert_eq!(store.len(), 1);
}

#[test]
fn any_flipped_bit_in_mac2_fails_closed() {
    let mut rng = OsRng;
    let server_kp = KeyPair::generate_random(&mut rng).unwrap();
    let store = UserStore::new();
    let credentials = register(&server_kp, &store, "alice");
    let user = store.lookup("alice").unwrap();

    for byte in [0usize, 15, 31] {
        let (login, msg1) = client_login_start(&mut rng, &credentials);
        let start = ServerLogin::start(&mut rng, &server_kp, &user, &msg1).unwrap();
        let mut client = client_login_finish(&login, &start.message).unwrap();
        client.msg3.mac2[byte] ^= 0x80;

        assert!(matches!(
            start.state.finish(&client.msg3),
            Err(ProtocolError::MacMismatch)
        ));
    }
}

#[test]
fn transcript_disagreement_surfaces_at_confirmation() {
    let mut rng = OsRng;
    let server_kp = KeyPair::generate_random(&mut rng).unwrap();
    let store = UserStore::new();
    let credentials = register(&server_kp, &store, "alice");
    let user = store.lookup("alice").unwrap();

    // Tamper with the envelope the client sees; its transcript now differs
    // from the server's, so the Mac2 it produces cannot verify.
    let (login, msg1) = client_login_start(&mut rng, &credentials);
    let start = ServerLogin::start(&mut rng, &server_kp, &user, &msg1).unwrap();
    let mut tampered = start.message.clone();
    tampered.env_u[0] ^= 0x01;

    match client_login_finish(&login, &tampered) {
        // The client already rejects the server MAC over the altered
        // transcript...
        Err(_) => {}
        // ...and even a client that skipped that check could not produce a
        // verifying Mac2.
        Ok(client) => {
            assert!(matches!(
                start.state.finish(&client.msg3),
                Err(ProtocolError::MacMismatch)
            ));
        }
    }
}

#[test]
fn client_detects_a_tampered_server_mac() {
    let mut rng = OsRng;
    let server_kp = KeyPair::generate_random(&mut rng).unwrap();
    let store = UserStore::new();
    let credentials = register(&server_kp, &store, "alice");
    let user = store.lookup("alice").unwrap();

    let (login, msg1) = client_login_start(&mut rng, &credentials);
    let start = ServerLogin::start(&mut rng, &server_kp, &user, &msg1).unwrap();
    let mut tampered = start.message.clone();
    tampered.mac1[7] ^= 0x20;

    assert!(client_login_finish(&login, &tampered).is_err());
}

#[test]
fn repeated_logins_yield_uncorrelated_session_keys() {
    let mut rng = OsRng;
    let server_kp = KeyPair::generate_random(&mut rng).unwrap();
    let store = UserStore::new();
    let credentials = register(&server_kp, &store, "alice");
    let user = store.lookup("alice").unwrap();

    let (first, _) = authenticate(&server_kp, &user, &credentials);
    let (second, _) = authenticate(&server_kp, &user, &credentials);
    assert_ne!(first, second);
}

#[test]
fn server_nonces_differ_between_runs() {
    let mut rng = OsRng;
    let server_kp = KeyPair::generate_random(&mut rng).unwrap();
    let store = UserStore::new();
    let credentials = register(&server_kp, &store, "alice");
    let user = store.lookup("alice").unwrap();

    let (_, msg1_a) = client_login_start(&mut rng, &credentials);
    let run_a = ServerLogin::start(&mut rng, &server_kp, &user, &msg1_a).unwrap();
    let (_, msg1_b) = client_login_start(&mut rng, &credentials);
    let run_b = ServerLogin::start(&mut rng, &server_kp, &user, &msg1_b).unwrap();

    assert_ne!(run_a.message.nonce_s, run_b.message.nonce_s);
}

#[test]
fn off_curve_a_is_rejected_at_the_wire_boundary() {
    let mut rng = OsRng;
    let server_kp = KeyPair::generate_random(&mut rng).unwrap();

    // The literal point (0, 0), as a client would encode it
    let json = r#"{"Username": "alice", "A": {"X": "0", "Y": "0"}}"#;
    let msg1: opaque_server::messages::PwRegMsg1 = serde_json::from_str(json).unwrap();

    assert!(matches!(
        ServerRegistration::start(&mut rng, server_kp.public(), &msg1),
        Err(ProtocolError::InvalidPoint)
    ));
}
