use std::io;

use sysbot_protocol::error::DecodeError;
use thiserror::Error;

/// Errors surfaced by the client. None of them are retried internally.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    #[error("Invalid hex response: {0}")]
    Decode(#[from] DecodeError),

    #[error("Short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    #[error("Not connected to a device")]
    NotConnected,

    #[error("Transfer of {length} bytes at 0x{offset:X} exceeds the address range")]
    AddressOverflow { offset: u64, length: usize },
}

pub type Result<T> = std::result::Result<T, TransferError>;
