//! Numeric error codes, as returned through syscall status words.
//!
//! `0` is reserved for success, so every code here is nonzero. The kernel
//! converts its internal error enums into these before crossing the
//! address-space boundary; it never unwinds across it.

use core::convert::TryFrom;

use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[allow(non_camel_case_types)]
#[repr(u64)]
pub enum ErrorCode {
    unknown = 1,
    /// Service name is empty
    name_empty,
    /// Service name exceeds the maximum length
    name_too_long,
    /// Service name contains an invalid byte
    name_invalid,
    /// Service name is reserved for the kernel
    name_reserved,
    /// Another service has already claimed this name
    name_taken,
    /// The calling process already owns a service
    already_registered,
    /// The calling process has not registered a service
    not_registered,
    /// Message payload exceeds the maximum size
    message_too_large,
    /// Destination inbox is at capacity
    inbox_full,
    /// Pending pool is at capacity
    pending_pool_full,
    /// Restricted core command from an unprivileged caller
    permission_denied,
    /// Physical or virtual allocation failed
    out_of_memory,
    /// Core-command body could not be decoded
    malformed_request,
    /// No mapping matches the given range
    no_such_range,
    /// Syscall made outside any process context
    no_process,
}

impl From<ErrorCode> for u64 {
    fn from(code: ErrorCode) -> u64 {
        code as u64
    }
}

impl TryFrom<u64> for ErrorCode {
    type Error = ();

    fn try_from(value: u64) -> Result<Self, ()> {
        use ErrorCode::*;
        Ok(match value {
            1 => unknown,
            2 => name_empty,
            3 => name_too_long,
            4 => name_invalid,
            5 => name_reserved,
            6 => name_taken,
            7 => already_registered,
            8 => not_registered,
            9 => message_too_large,
            10 => inbox_full,
            11 => pending_pool_full,
            12 => permission_denied,
            13 => out_of_memory,
            14 => malformed_request,
            15 => no_such_range,
            16 => no_process,
            _ => return Err(()),
        })
    }
}
