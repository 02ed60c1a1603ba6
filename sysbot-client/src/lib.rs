//! # sys-module Client
//!
//! A blocking client that reads and writes memory of a title running on a remote
//! device through a sys-module socket.
//!
//! ## Overview
//!
//! The device answers every read with the requested memory encoded as hex text and never
//! acknowledges writes. This crate turns that into plain byte transfers of any length:
//!
//! - Transfers larger than the maximum transfer size are split into chunks,
//!   one command/response round trip per chunk
//! - After every read command the client waits for the device to produce its
//!   response (see [`sync::Synchronizer`])
//! - Responses are decoded and reassembled in address order
//!
//! For the command format, see the [`sysbot_protocol`] crate.
//!
//! ## Basic Usage
//!
//! ### Connecting to a Device
//!
//! ```ignore
//! use sysbot_client::{SysBotClient, transport::DeviceConfig};
//!
//! let config = DeviceConfig::new("192.168.0.42".parse()?, 6000);
//! let mut client = SysBotClient::connect(config)?;
//!
//! let heap = client.get_heap_base()?;
//! println!("Heap starts at 0x{:016X}", heap);
//! ```
//!
//! ### Reading and Writing Memory
//!
//! ```ignore
//! use sysbot_protocol::AddressSpace;
//!
//! let data = client.read_bytes(0x4C0_0000, 0x1000)?;
//! client.write_bytes_main(&[0x00, 0x00, 0x80, 0x52], 0x12_3450)?;
//! let raw = client.read(0x21_0000_0000, 8, AddressSpace::Absolute)?;
//! ```
//!
//! ## Configuration
//!
//! [`Builder`] exposes the tunables of the transfer engine:
//!
//! - **base_delay**: fixed wait before a response is read, in milliseconds (default: 64)
//! - **delay_factor**: bytes per additional millisecond of wait (default: 256)
//! - **max_transfer_size**: largest payload of a single command (default: 0x1C0 bytes)
//!
//! ## Thread Model
//!
//! Every operation takes `&mut self` and blocks until it is done. Only one command is ever
//! in flight; sharing a client between threads requires external synchronization.
//!
//! ## Failure Semantics
//!
//! Errors abort the transfer and are returned as they are; nothing is retried.
//! A failure in the middle of a chunked transfer leaves the earlier chunks applied.
pub mod connection;
pub mod error;
pub mod sync;
pub mod transport;

use sysbot_protocol::{
    AddressSpace, MAXIMUM_TRANSFER_SIZE, TRANSFER_SIZE_LIMIT, error::DecodeError, get_heap_base,
    get_main_nso_base, hex_codec, timing::Timing,
};

use crate::{
    connection::{Connection, ConnectionState},
    sync::{SleepSynchronizer, Synchronizer},
    transport::{DeviceConfig, TcpTransport, Transport},
};
pub use error::{Result, TransferError};

#[derive(Debug, Clone)]
pub struct Config {
    pub timing: Timing,
    pub max_transfer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timing: Timing::default(),
            max_transfer_size: MAXIMUM_TRANSFER_SIZE,
        }
    }
}

/// Builder to create a [SysBotClient] instance and modify configuration options
///
/// # Example
///
/// ```ignore
/// use sysbot_client::Builder;
///
/// let client = Builder::new()
///     .base_delay(32)
///     .max_transfer_size(0x100)
///     .build(transport);
/// ```
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Set the fixed part of the response delay, in milliseconds.
    pub fn base_delay(mut self, millis: u64) -> Self {
        self.config.timing.base_delay = millis;
        self
    }

    /// Set how many requested bytes add one millisecond to the response delay.
    pub fn delay_factor(mut self, bytes: u64) -> Self {
        self.config.timing.delay_factor = bytes;
        self
    }

    /// Set the largest payload a single command may carry.
    /// Clamped to between one byte and [`TRANSFER_SIZE_LIMIT`].
    pub fn max_transfer_size(mut self, size: usize) -> Self {
        self.config.max_transfer_size = size.clamp(1, TRANSFER_SIZE_LIMIT);
        self
    }

    /// Build a client that sleeps for the configured delay before reading a response.
    pub fn build<T: Transport>(self, transport: T) -> SysBotClient<T> {
        let synchronizer = SleepSynchronizer::new(self.config.timing);
        self.build_with_synchronizer(transport, synchronizer)
    }

    /// Build a client with a custom strategy for waiting on responses.
    pub fn build_with_synchronizer<T: Transport, S: Synchronizer>(
        self,
        transport: T,
        synchronizer: S,
    ) -> SysBotClient<T, S> {
        SysBotClient {
            connection: Connection::new(transport),
            synchronizer,
            max_transfer_size: self.config.max_transfer_size,
        }
    }
}

/// Client for reading and writing remote memory.
pub struct SysBotClient<T, S = SleepSynchronizer> {
    connection: Connection<T>,
    synchronizer: S,
    max_transfer_size: usize,
}

impl SysBotClient<TcpTransport> {
    /// Open a TCP connection to the device with the default configuration.
    pub fn connect(config: DeviceConfig) -> Result<SysBotClient<TcpTransport>> {
        let mut client = Builder::new().build(TcpTransport::from(config));
        client.connection.connect()?;
        Ok(client)
    }
}

impl<T: Transport, S: Synchronizer> SysBotClient<T, S> {
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn max_transfer_size(&self) -> usize {
        self.max_transfer_size
    }

    pub fn open(&mut self) -> Result<()> {
        self.connection.connect()
    }

    pub fn close(&mut self) -> Result<()> {
        self.connection.disconnect()
    }

    pub fn reset(&mut self) -> Result<()> {
        self.connection.reset()
    }

    /// Send a raw command to the device.
    pub fn send(&mut self, command: &[u8]) -> Result<usize> {
        log::trace!("Sending {:?}", String::from_utf8_lossy(command).trim_end());
        self.connection.send(command)
    }

    /// Query the base address of the main executable of the running title.
    pub fn get_main_nso_base(&mut self) -> Result<u64> {
        self.read_base(&get_main_nso_base())
    }

    /// Query the base address of the heap of the running title.
    pub fn get_heap_base(&mut self) -> Result<u64> {
        self.read_base(&get_heap_base())
    }

    pub fn read_bytes(&mut self, offset: u64, length: usize) -> Result<Vec<u8>> {
        self.read(offset, length, AddressSpace::Heap)
    }

    pub fn read_bytes_main(&mut self, offset: u64, length: usize) -> Result<Vec<u8>> {
        self.read(offset, length, AddressSpace::Main)
    }

    pub fn read_bytes_absolute(&mut self, offset: u64, length: usize) -> Result<Vec<u8>> {
        self.read(offset, length, AddressSpace::Absolute)
    }

    pub fn write_bytes(&mut self, data: &[u8], offset: u64) -> Result<()> {
        self.write(data, offset, AddressSpace::Heap)
    }

    pub fn write_bytes_main(&mut self, data: &[u8], offset: u64) -> Result<()> {
        self.write(data, offset, AddressSpace::Main)
    }

    pub fn write_bytes_absolute(&mut self, data: &[u8], offset: u64) -> Result<()> {
        self.write(data, offset, AddressSpace::Absolute)
    }

    /// Read `length` bytes at `offset` in `space`.
    ///
    /// # Returns
    ///
    /// Exactly `length` bytes in address order.
    pub fn read(&mut self, offset: u64, length: usize, space: AddressSpace) -> Result<Vec<u8>> {
        check_range(offset, length)?;
        let read = space.builders().read;
        log::debug!("Reading {} bytes at 0x{:X} ({})", length, offset, space);

        if length <= self.max_transfer_size {
            self.send(&read(offset, length))?;
            return self.read_response(length);
        }

        let mut result = Vec::with_capacity(self.max_transfer_size);
        for (start, len) in chunks(length, self.max_transfer_size) {
            self.send(&read(offset + start as u64, len))?;
            let bytes = self.read_response(len)?;
            result.extend_from_slice(&bytes);
        }
        Ok(result)
    }

    /// Write `data` at `offset` in `space`.
    ///
    /// The device does not acknowledge writes, so this returns as soon as the last
    /// command was handed to the transport.
    pub fn write(&mut self, data: &[u8], offset: u64, space: AddressSpace) -> Result<()> {
        check_range(offset, data.len())?;
        let write = space.builders().write;
        log::debug!("Writing {} bytes at 0x{:X} ({})", data.len(), offset, space);

        if data.len() <= self.max_transfer_size {
            self.send(&write(offset, data))?;
            return Ok(());
        }

        for (start, slice) in (0..data.len())
            .step_by(self.max_transfer_size)
            .zip(data.chunks(self.max_transfer_size))
        {
            self.send(&write(offset + start as u64, slice))?;
        }
        Ok(())
    }

    fn read_base(&mut self, command: &[u8]) -> Result<u64> {
        self.send(command)?;
        let bytes = self.read_response(8)?;
        let mut base = [0u8; 8];
        base.copy_from_slice(&bytes);
        // The device writes the most significant byte first.
        base.reverse();
        Ok(u64::from_le_bytes(base))
    }

    /// Wait for and decode the response to a read of `length` bytes.
    fn read_response(&mut self, length: usize) -> Result<Vec<u8>> {
        self.synchronizer.synchronize(length);
        let size = hex_codec::response_len(length).ok_or(DecodeError::Truncated {
            expected: usize::MAX,
            got: 0,
        })?;
        let mut buffer = vec![0u8; size];
        self.receive_exact(&mut buffer)?;
        Ok(hex_codec::decode_response(&buffer, length)?)
    }

    fn receive_exact(&mut self, buffer: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buffer.len() {
            let received = self.connection.receive(&mut buffer[filled..])?;
            if received == 0 {
                return Err(TransferError::ShortRead {
                    expected: buffer.len(),
                    actual: filled,
                });
            }
            filled += received;
        }
        log::trace!("Received {:?}", String::from_utf8_lossy(buffer).trim_end());
        Ok(())
    }
}

/// Splits `length` bytes into `(start, len)` chunks of at most `size` bytes.
fn chunks(length: usize, size: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..length)
        .step_by(size)
        .map(move |start| (start, size.min(length - start)))
}

fn check_range(offset: u64, length: usize) -> Result<()> {
    match length.checked_sub(1) {
        Some(last) if offset.checked_add(last as u64).is_none() => {
            Err(TransferError::AddressOverflow { offset, length })
        }
        _ => Ok(()),
    }
}
