use nxabi::name::NameError;
use nxabi::ErrorCode;

use crate::platform::{MapError, SpawnError};

pub type BusResult<T> = Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    Name(NameError),
    /// Another service has already claimed this name
    NameTaken,
    /// The calling process already owns a service
    AlreadyRegistered,
    /// The calling process has not registered a service
    NotRegistered,
    /// Syscall made outside any process context
    NoProcess,
    Delivery(DeliveryError),
    Permission(PermissionError),
    OutOfMemory,
    /// Core-command body could not be decoded
    MalformedRequest,
    /// No mapping matches the given range
    NoSuchRange,
}

impl From<NameError> for Error {
    fn from(error: NameError) -> Self {
        Self::Name(error)
    }
}
impl From<DeliveryError> for Error {
    fn from(error: DeliveryError) -> Self {
        Self::Delivery(error)
    }
}
impl From<PermissionError> for Error {
    fn from(error: PermissionError) -> Self {
        Self::Permission(error)
    }
}
impl From<MapError> for Error {
    fn from(error: MapError) -> Self {
        match error {
            MapError::OutOfMemory => Self::OutOfMemory,
            MapError::NoSuchRange => Self::NoSuchRange,
        }
    }
}
impl From<SpawnError> for Error {
    fn from(error: SpawnError) -> Self {
        match error {
            SpawnError::OutOfMemory => Self::OutOfMemory,
            SpawnError::InvalidImage => Self::MalformedRequest,
        }
    }
}
impl From<Error> for ErrorCode {
    fn from(error: Error) -> Self {
        match error {
            Error::Name(NameError::Empty) => ErrorCode::name_empty,
            Error::Name(NameError::TooLong) => ErrorCode::name_too_long,
            Error::Name(NameError::Invalid) => ErrorCode::name_invalid,
            Error::Name(NameError::Reserved) => ErrorCode::name_reserved,
            Error::NameTaken => ErrorCode::name_taken,
            Error::AlreadyRegistered => ErrorCode::already_registered,
            Error::NotRegistered => ErrorCode::not_registered,
            Error::NoProcess => ErrorCode::no_process,
            Error::Delivery(e) => e.into(),
            Error::Permission(_) => ErrorCode::permission_denied,
            Error::OutOfMemory => ErrorCode::out_of_memory,
            Error::MalformedRequest => ErrorCode::malformed_request,
            Error::NoSuchRange => ErrorCode::no_such_range,
        }
    }
}
impl From<Error> for u64 {
    fn from(error: Error) -> u64 {
        let code: ErrorCode = error.into();
        code.into()
    }
}

/// Delivering a message failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryError {
    /// Payload exceeds the maximum message size
    TooLarge,
    /// Recipient inbox is at capacity
    InboxFull,
    /// Pending pool is at capacity
    PendingPoolFull,
}
impl From<DeliveryError> for ErrorCode {
    fn from(error: DeliveryError) -> Self {
        match error {
            DeliveryError::TooLarge => ErrorCode::message_too_large,
            DeliveryError::InboxFull => ErrorCode::inbox_full,
            DeliveryError::PendingPoolFull => ErrorCode::pending_pool_full,
        }
    }
}

/// Operation not permitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionError {
    /// Core command reserved for a specific service
    Restricted,
}
