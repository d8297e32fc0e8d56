// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! A list of error types which are produced during an execution of the protocol
use displaydoc::Display;
use thiserror::Error;

/// Represents an error in the manipulation of internal cryptographic data
#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum InternalError {
    /// Invalid length for {name}: expected {len}, but is actually {actual_len}.
    SizeError {
        /// name
        name: &'static str,
        /// length
        len: usize,
        /// actual
        actual_len: usize,
    },
    /// Point is not on the curve, or is the identity.
    PointError,
    /// Byte sequence is not a canonical scalar in [1, n-1].
    ScalarError,
    /// Computing HKDF failed while deriving subkeys
    HkdfError,
    /// Computing HMAC failed while supplying a secret key
    HmacError,
    /// Sealing a post-handshake message failed
    SealError,
}

/// Represents an error in protocol handling, as reported to the transport
#[derive(Debug, Display, Error)]
pub enum ProtocolError {
    /// Line framing or JSON decoding failed
    BadFrame,
    /// First line of the connection is not a known command
    UnknownCommand,
    /// No registered user under the requested username
    UnknownUser,
    /// A received EC point is off-curve
    InvalidPoint,
    /// A nonce, MAC, envelope, or username has the wrong length
    BadLength,
    /// Key confirmation MAC did not verify
    MacMismatch,
    /// A user is already registered under the requested username
    UserExists,
    /// Reading the next protocol message exceeded the deadline
    Timeout,
    /// Internal error during protocol execution: {0}
    Internal(InternalError),
}

impl From<InternalError> for ProtocolError {
    fn from(e: InternalError) -> ProtocolError {
        match e {
            InternalError::PointError => ProtocolError::InvalidPoint,
            InternalError::SizeError { .. } => ProtocolError::BadLength,
            e => ProtocolError::Internal(e),
        }
    }
}

impl ProtocolError {
    /// The one-line reply written to the peer before the connection is
    /// closed. `MacMismatch` and `UnknownUser` are aliased so that a network
    /// observer cannot distinguish a failed guess from a missing account.
    pub fn wire_message(&self) -> &'static str {
        match self {
            ProtocolError::BadFrame => "error: bad frame",
            ProtocolError::UnknownCommand => "error: unknown command",
            ProtocolError::UnknownUser | ProtocolError::MacMismatch => {
                "error: authentication failed"
            }
            ProtocolError::InvalidPoint => "error: invalid point",
            ProtocolError::BadLength => "error: bad length",
            ProtocolError::UserExists => "error: user exists",
            ProtocolError::Timeout => "error: timeout",
            ProtocolError::Internal(_) => "error: internal",
        }
    }
}

pub(crate) mod utils {
    use super::*;

    pub fn check_slice_size<'a>(
        slice: &'a [u8],
        expected_len: usize,
        arg_name: &'static str,
    ) -> Result<&'a [u8], InternalError> {
        if slice.len() != expected_len {
            return Err(InternalError::SizeError {
                name: arg_name,
                len: expected_len,
                actual_len: slice.len(),
            });
        }
        Ok(slice)
    }

    pub fn check_slice_size_atmost<'a>(
        slice: &'a [u8],
        max_len: usize,
        arg_name: &'static str,
    ) -> Result<&'a [u8], InternalError> {
        if slice.len() > max_len {
            return Err(InternalError::SizeError {
                name: arg_name,
                len: max_len,
                actual_len: slice.len(),
            });
        }
        Ok(slice)
    }
}
