// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! In-memory user record store
//!
//! Readable by any number of connection handlers at once, written only by
//! registration handlers. Readers observe either a complete record or no
//! record; the check-and-insert is a single critical section, so a duplicate
//! registration can never clobber an existing user.

use crate::errors::ProtocolError;
use crate::opaque::User;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Maps usernames to their registration records
#[derive(Default)]
pub struct UserStore {
    users: RwLock<HashMap<String, Arc<User>>>,
}

impl UserStore {
    /// An empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a freshly registered user
    ///
    /// Fails with [`ProtocolError::UserExists`] if the username is taken;
    /// records are immutable once inserted.
    pub fn insert(&self, user: User) -> Result<(), ProtocolError> {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        match users.entry(user.username().to_string()) {
            Entry::Occupied(_) => Err(ProtocolError::UserExists),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(user));
                Ok(())
            }
        }
    }

    /// Looks up a record by username
    pub fn lookup(&self, username: &str) -> Option<Arc<User>> {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(username)
            .cloned()
    }

    /// Number of registered users
    pub fn len(&self) -> usize {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no user has registered yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
