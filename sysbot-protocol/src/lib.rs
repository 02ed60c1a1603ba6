//! # sys-module Protocol Library
//!
//! This crate implements the text protocol spoken by sys-modules that expose the memory
//! of a running title over a TCP socket. A client sends one command per line; the device
//! answers reads with the requested memory as ASCII hex.
//!
//! ## Overview
//!
//! The library provides the pieces that do not depend on a particular transport:
//!
//! - Building and parsing command lines ([`Command`], [`AddressSpace::builders`])
//! - Converting hex responses back into bytes ([`hex_codec`])
//! - Estimating how long the device needs to produce a response ([`timing::Timing`])
//!
//! ## Protocol Features
//!
//! - **Address spaces**: `Heap`, `Main` and `Absolute`, each with its own command vocabulary
//! - **Commands**:
//!   - `peek`/`peekMain`/`peekAbsolute`: read memory
//!   - `poke`/`pokeMain`/`pokeAbsolute`: write memory, never answered
//!   - `getMainNsoBase`/`getHeapBase`: query base addresses
//!
//! ## Basic Usage
//!
//! ### Building Commands
//!
//! ```
//! use sysbot_protocol::AddressSpace;
//!
//! let builders = AddressSpace::Main.builders();
//! assert_eq!((builders.read)(0x4C0, 8), b"peekMain 0x4C0 8\r\n");
//! assert_eq!((builders.write)(0x4C0, &[0xAB]), b"pokeMain 0x4C0 0xAB\r\n");
//! ```
//!
//! ### Decoding Responses
//!
//! ```
//! use sysbot_protocol::hex_codec;
//!
//! // Two hex digits per byte plus a trailing newline
//! let response = b"DEADBEEF\n";
//! assert_eq!(Some(response.len()), hex_codec::response_len(4));
//! let bytes = hex_codec::decode_response(response, 4).expect("Response should decode");
//! assert_eq!(bytes, [0xDE, 0xAD, 0xBE, 0xEF]);
//! ```
//!
//! ## Message Format
//!
//! - **Read**: `peek 0x<offset> <length>\r\n`
//! - **Write**: `poke 0x<offset> 0x<data>\r\n`
//! - **Base queries**: `getMainNsoBase\r\n`, `getHeapBase\r\n`
//! - **Read response**: `<2 * length hex digits>\n`
//! - **Base response**: `<16 hex digits, most significant first>\n`
//!
//! ## Error Handling
//!
//! Parsing commands yields [`error::ReadError`], decoding hex yields [`error::DecodeError`].

pub mod protocol;
pub use protocol::*;
pub mod codec;
pub mod error;
pub mod hex_codec;
pub mod timing;
#[cfg(feature = "tokio")]
pub mod tokio_codec;
