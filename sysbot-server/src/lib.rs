//! # sys-module Device Emulator
//!
//! This crate serves the sys-module memory protocol from the host side, so that
//! clients can be exercised without a console on the network.
//!
//! ## Architecture
//!
//! The crate is built around two main components:
//!
//! - **[`MemoryDevice`] Trait**: Defines the memory operations a backend must provide
//!   (peek, poke and the two base address queries)
//! - **[`server::Server`]**: A tokio based server that parses command lines, dispatches
//!   them to the backend and writes hex responses
//!
//! [`memory::SparseMemory`] is a ready to use backend that keeps written bytes in a map.
//!
//! ## Basic Usage
//!
//! ```ignore
//! use sysbot_server::{memory::SparseMemory, server::Builder};
//!
//! let server = Builder::new()
//!     .max_transfer_size(0x1C0)
//!     .build(SparseMemory::default());
//! server.listen("127.0.0.1:6000").await?;
//! ```
//!
//! ## Error Handling
//!
//! The protocol has no way to report errors. Malformed commands and transfers larger
//! than the configured maximum close the client connection; the error is logged.
//!
//! ## Logging
//!
//! This crate uses the `log` crate for diagnostics: connections at `info`, every
//! command at `debug` and payload bytes at `trace`.
//!
//! ## Thread Model
//!
//! Clients are served one after another, like the real sys-module.
use std::sync::Arc;

use sysbot_protocol::AddressSpace;

pub mod memory;
pub mod server;

/// Trait that backends implement to provide the memory being served.
pub trait MemoryDevice {
    /// Read `length` bytes at `offset` in `space`.
    ///
    /// # Returns
    ///
    /// Exactly `length` bytes. Memory that cannot be read is returned as zeros, the
    /// protocol has no way to report a failed read.
    fn peek(&self, space: AddressSpace, offset: u64, length: usize) -> Box<[u8]>;

    /// Write `data` at `offset` in `space`. Failures are silently ignored by the protocol.
    fn poke(&self, space: AddressSpace, offset: u64, data: &[u8]);

    /// Base address of the main executable.
    fn main_nso_base(&self) -> u64;

    /// Base address of the heap.
    fn heap_base(&self) -> u64;
}

impl<T: MemoryDevice + ?Sized> MemoryDevice for Arc<T> {
    fn peek(&self, space: AddressSpace, offset: u64, length: usize) -> Box<[u8]> {
        (**self).peek(space, offset, length)
    }

    fn poke(&self, space: AddressSpace, offset: u64, data: &[u8]) {
        (**self).poke(space, offset, data)
    }

    fn main_nso_base(&self) -> u64 {
        (**self).main_nso_base()
    }

    fn heap_base(&self) -> u64 {
        (**self).heap_base()
    }
}
