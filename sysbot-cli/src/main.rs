//! # sys-module Command Line Tool
//!
//! Reads and writes memory of a title running on a device that hosts a sys-module,
//! queries its base addresses, or emulates such a device on the local machine.
//!
//! ## Overview
//!
//! ```text
//! sysbot --ip 192.168.0.42 peek 0x4C0 16
//! sysbot --ip 192.168.0.42 poke --space main 0x1234 0x00008052
//! sysbot --ip 192.168.0.42 heap-base
//! sysbot emulate --heap-base 0x2100000000
//! ```
use std::error::Error;
use std::net::{IpAddr, SocketAddr};

use clap::{Parser, Subcommand, ValueEnum};
use clap_num::maybe_hex;
use env_logger::Env;
use sysbot_client::{Builder, transport::DeviceConfig, transport::TcpTransport};
use sysbot_protocol::{AddressSpace, DEFAULT_PORT, MAXIMUM_TRANSFER_SIZE, timing::Timing};
use sysbot_server::{MemoryDevice, memory::SparseMemory, server::Builder as ServerBuilder};

#[derive(ValueEnum, Clone, Copy, Debug, Eq, PartialEq)]
enum Space {
    Heap,
    Main,
    Absolute,
}

impl From<Space> for AddressSpace {
    fn from(value: Space) -> Self {
        match value {
            Space::Heap => AddressSpace::Heap,
            Space::Main => AddressSpace::Main,
            Space::Absolute => AddressSpace::Absolute,
        }
    }
}

#[derive(Subcommand, Eq, PartialEq, Clone, Debug)]
enum Action {
    #[command(flatten)]
    Device(DeviceAction),
    /// Emulate a device on ip:port, backed by host memory
    Emulate {
        #[arg(long, value_parser = maybe_hex::<u64>, default_value_t = SparseMemory::DEFAULT_MAIN_NSO_BASE)]
        main_base: u64,
        #[arg(long, value_parser = maybe_hex::<u64>, default_value_t = SparseMemory::DEFAULT_HEAP_BASE)]
        heap_base: u64,
    },
}

/// Actions performed against a connected device.
#[derive(Subcommand, Eq, PartialEq, Clone, Debug)]
enum DeviceAction {
    /// Read memory and print it as hex
    Peek {
        #[arg(value_parser = maybe_hex::<u64>)]
        offset: u64,
        #[arg(value_parser = maybe_hex::<usize>)]
        length: usize,
        #[arg(short, long, value_enum, default_value_t = Space::Heap)]
        space: Space,
    },
    /// Write hex encoded data to memory
    Poke {
        #[arg(value_parser = maybe_hex::<u64>)]
        offset: u64,
        #[arg(help = "The bytes to write as hex, e.g. 0x00008052")]
        data: String,
        #[arg(short, long, value_enum, default_value_t = Space::Heap)]
        space: Space,
    },
    /// Print the base address of the main executable
    MainBase,
    /// Print the base address of the heap
    HeapBase,
}

#[derive(Parser)]
#[command(about = "Peek and poke memory on a sys-module device", long_about=None)]
struct Args {
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value = "127.0.0.1")]
    ip: IpAddr,

    #[arg(long, help = "Fixed wait before reading a response, in milliseconds", default_value_t = Timing::DEFAULT_BASE_DELAY)]
    base_delay: u64,

    #[arg(long, help = "Bytes per additional millisecond of wait", default_value_t = Timing::DEFAULT_DELAY_FACTOR)]
    delay_factor: u64,

    #[arg(long, value_parser = maybe_hex::<usize>, default_value_t = MAXIMUM_TRANSFER_SIZE)]
    max_transfer_size: usize,

    #[clap(subcommand)]
    action: Action,
}

/// Parses a hex payload with or without a `0x` prefix.
fn parse_payload(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    hex::decode(digits)
}

fn run_client(args: &Args, action: &DeviceAction) -> Result<(), Box<dyn Error>> {
    let device = DeviceConfig::new(args.ip, args.port);
    log::debug!("Connecting to {}", device.socket_addr());

    let mut client = Builder::new()
        .base_delay(args.base_delay)
        .delay_factor(args.delay_factor)
        .max_transfer_size(args.max_transfer_size)
        .build(TcpTransport::from(device));
    client.open()?;

    match action {
        DeviceAction::Peek {
            offset,
            length,
            space,
        } => {
            let data = client.read(*offset, *length, (*space).into())?;
            println!("{}", hex::encode_upper(data));
        }
        DeviceAction::Poke {
            offset,
            data,
            space,
        } => {
            let bytes = parse_payload(data)?;
            client.write(&bytes, *offset, (*space).into())?;
            log::info!("Wrote {} bytes at 0x{:X}", bytes.len(), offset);
        }
        DeviceAction::MainBase => println!("0x{:016X}", client.get_main_nso_base()?),
        DeviceAction::HeapBase => println!("0x{:016X}", client.get_heap_base()?),
    }

    client.close()?;
    Ok(())
}

fn emulate(
    addr: SocketAddr,
    memory: SparseMemory,
    max_transfer_size: usize,
) -> Result<(), Box<dyn Error>> {
    log::info!(
        "Emulating device with main base 0x{:016X} and heap base 0x{:016X}",
        memory.main_nso_base(),
        memory.heap_base()
    );
    let server = ServerBuilder::new()
        .max_transfer_size(max_transfer_size)
        .build(memory);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        tokio::select! {
            result = server.listen(addr) => result?,
            _ = tokio::signal::ctrl_c() => log::info!("Shutting down emulator"),
        }
        Ok::<(), Box<dyn Error>>(())
    })
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::debug!("Parsed arguments: ip={}, port={}", args.ip, args.port);

    match &args.action {
        Action::Emulate {
            main_base,
            heap_base,
        } => emulate(
            SocketAddr::new(args.ip, args.port),
            SparseMemory::new(*main_base, *heap_base),
            args.max_transfer_size,
        ),
        Action::Device(action) => run_client(&args, action),
    }
}
