//! The kernel message bus.
//!
//! Every user-mode service is a named endpoint that exchanges
//! length-prefixed binary datagrams through this bus. The bus owns the
//! service registry, per-service inboxes, the pending pool for messages to
//! not-yet-registered names, sleep timers, and the privileged core
//! commands addressed to the reserved kernel name.
//!
//! The bus runs entirely in the context of its callers and the periodic
//! timer tick. Scheduling and paging are platform concerns, consumed
//! through the traits in [`platform`].

#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate alloc;

pub mod bus;
pub mod platform;

pub use self::bus::result::{BusResult, DeliveryError, Error, PermissionError};
pub use self::bus::{Bus, SendStatus};
pub use self::platform::{BlockReason, Platform};
