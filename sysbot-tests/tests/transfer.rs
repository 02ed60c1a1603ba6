use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use sysbot_client::{Builder, TransferError, connection::ConnectionState, transport::TcpTransport};
use sysbot_protocol::{AddressSpace, MAXIMUM_TRANSFER_SIZE};
use sysbot_server::{MemoryDevice, memory::SparseMemory};
use sysbot_tests::{connect, spawn_emulator};

const HEAP_BASE: u64 = 0x0000_0021_0000_0000;
const MAIN_BASE: u64 = 0x0000_0080_0000_4000;

fn memory() -> Arc<SparseMemory> {
    Arc::new(SparseMemory::new(MAIN_BASE, HEAP_BASE))
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[test]
fn chunked_round_trip_in_every_space() {
    let addr = spawn_emulator(memory(), MAXIMUM_TRANSFER_SIZE).unwrap();
    let mut client = connect(addr, MAXIMUM_TRANSFER_SIZE).unwrap();

    let data = pattern(3 * MAXIMUM_TRANSFER_SIZE + 17);
    for (space, offset) in [
        (AddressSpace::Heap, 0x100),
        (AddressSpace::Main, 0x4C0),
        (AddressSpace::Absolute, 0x0000_0030_0000_0000),
    ] {
        client.write(&data, offset, space).unwrap();
        assert_eq!(client.read(offset, data.len(), space).unwrap(), data);
    }
}

#[test]
fn base_queries_match_device() {
    let addr = spawn_emulator(memory(), MAXIMUM_TRANSFER_SIZE).unwrap();
    let mut client = connect(addr, MAXIMUM_TRANSFER_SIZE).unwrap();

    assert_eq!(client.get_heap_base().unwrap(), HEAP_BASE);
    assert_eq!(client.get_main_nso_base().unwrap(), MAIN_BASE);
}

#[test]
fn heap_writes_land_at_heap_base() {
    let memory = memory();
    let addr = spawn_emulator(memory.clone(), MAXIMUM_TRANSFER_SIZE).unwrap();
    let mut client = connect(addr, MAXIMUM_TRANSFER_SIZE).unwrap();

    client.write_bytes(&[0xDE, 0xAD, 0xBE, 0xEF], 0x20).unwrap();
    let heap = client.get_heap_base().unwrap();
    assert_eq!(
        client.read_bytes_absolute(heap + 0x20, 4).unwrap(),
        [0xDE, 0xAD, 0xBE, 0xEF]
    );
    assert_eq!(
        &*memory.peek(AddressSpace::Absolute, HEAP_BASE + 0x20, 4),
        &[0xDE, 0xAD, 0xBE, 0xEF]
    );
}

#[test]
fn oversized_commands_end_the_transfer() {
    let addr = spawn_emulator(memory(), 16).unwrap();
    let mut client = connect(addr, 64).unwrap();

    match client.read_bytes(0, 32) {
        Err(TransferError::ShortRead { expected, actual }) => {
            assert_eq!(expected, 65);
            assert_eq!(actual, 0);
        }
        Err(TransferError::Transport(_)) => {}
        other => panic!("expected the transfer to fail, got {:?}", other),
    }
}

#[test]
fn reset_reconnects() {
    let addr = spawn_emulator(memory(), MAXIMUM_TRANSFER_SIZE).unwrap();
    let mut client = connect(addr, MAXIMUM_TRANSFER_SIZE).unwrap();

    client.write_bytes_main(&[7; 8], 0).unwrap();
    client.reset().unwrap();
    assert_eq!(client.state(), ConnectionState::Connected);
    assert_eq!(client.read_bytes_main(0, 8).unwrap(), [7; 8]);

    client.close().unwrap();
    assert!(matches!(
        client.read_bytes_main(0, 8),
        Err(TransferError::NotConnected)
    ));
}

#[test]
fn default_timing_waits_before_reading() {
    let addr = spawn_emulator(memory(), MAXIMUM_TRANSFER_SIZE).unwrap();
    let mut client = Builder::new().build(TcpTransport::new(addr));
    client.open().unwrap();

    let start = Instant::now();
    client.read_bytes(0, 8).unwrap();
    assert!(start.elapsed() >= Duration::from_millis(64));
}
