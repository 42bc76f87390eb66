//! Wire-visible ABI of the kernel message bus.
//!
//! Everything shared between the kernel and user programs lives here:
//! service name rules, the message header layout, the core-command
//! protocol addressed to [`name::CORE_SERVICE_NAME`], and the numeric
//! error codes returned through syscall status words.
//!
//! All multi-byte wire fields are little-endian.

#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate alloc;

pub mod addr;
pub mod cmd;
pub mod error;
pub mod message;
pub mod name;
pub mod process;

pub use self::addr::{PhysAddr, VirtAddr};
pub use self::error::ErrorCode;
pub use self::message::Message;
pub use self::name::ServiceName;
pub use self::process::ProcessId;
