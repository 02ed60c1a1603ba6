use std::fmt::Display;

/// Largest number of memory bytes moved by a single peek or poke command.
pub const MAXIMUM_TRANSFER_SIZE: usize = 0x1C0;

/// Upper bound for any configured transfer size.
/// Keeps the hex response (two digits per byte) of a single command addressable.
pub const TRANSFER_SIZE_LIMIT: usize = 16 * 1024 * 1024;

/// TCP port the sys-module listens on by default.
pub const DEFAULT_PORT: u16 = 6000;

/// The logical region an offset is relative to.
/// The numeric base of `Heap` and `Main` is resolved by the device, never by the client.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum AddressSpace {
    /// Offsets relative to the heap of the running title.
    Heap,
    /// Offsets relative to the main executable (main NSO) of the running title.
    Main,
    /// Absolute addresses in the title's address space.
    Absolute,
}

/// Builds a read command for `(offset, length)`.
pub type ReadCommand = fn(u64, usize) -> Vec<u8>;
/// Builds a write command for `(offset, data)`.
pub type WriteCommand = fn(u64, &[u8]) -> Vec<u8>;

/// The read/write command builders that belong to one [`AddressSpace`].
#[derive(Copy, Clone)]
pub struct CommandBuilders {
    pub read: ReadCommand,
    pub write: WriteCommand,
}

impl AddressSpace {
    pub const ALL: [AddressSpace; 3] = [
        AddressSpace::Heap,
        AddressSpace::Main,
        AddressSpace::Absolute,
    ];

    /// Resolves the command builders for this space.
    pub fn builders(self) -> CommandBuilders {
        match self {
            AddressSpace::Heap => CommandBuilders {
                read: peek,
                write: poke,
            },
            AddressSpace::Main => CommandBuilders {
                read: peek_main,
                write: poke_main,
            },
            AddressSpace::Absolute => CommandBuilders {
                read: peek_absolute,
                write: poke_absolute,
            },
        }
    }
}

impl Display for AddressSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressSpace::Heap => write!(f, "heap"),
            AddressSpace::Main => write!(f, "main"),
            AddressSpace::Absolute => write!(f, "absolute"),
        }
    }
}

/// A command is sent from the client to the device as a single text line.
/// Reads and base queries are answered with a hex line, writes are never answered.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    /// Read `length` bytes at `offset` in `space`.
    Peek {
        space: AddressSpace,
        offset: u64,
        length: usize,
    },
    /// Write `data` at `offset` in `space`.
    Poke {
        space: AddressSpace,
        offset: u64,
        data: Box<[u8]>,
    },
    /// Query the base address of the main executable.
    GetMainNsoBase,
    /// Query the base address of the heap.
    GetHeapBase,
}

/// Answer of the device to a [`Command`] that expects one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Response {
    /// Memory contents answering a [`Command::Peek`].
    Memory(Box<[u8]>),
    /// An address answering one of the base queries.
    Address(u64),
}

pub fn peek(offset: u64, length: usize) -> Vec<u8> {
    read_command(AddressSpace::Heap, offset, length)
}

pub fn peek_main(offset: u64, length: usize) -> Vec<u8> {
    read_command(AddressSpace::Main, offset, length)
}

pub fn peek_absolute(offset: u64, length: usize) -> Vec<u8> {
    read_command(AddressSpace::Absolute, offset, length)
}

pub fn poke(offset: u64, data: &[u8]) -> Vec<u8> {
    write_command(AddressSpace::Heap, offset, data)
}

pub fn poke_main(offset: u64, data: &[u8]) -> Vec<u8> {
    write_command(AddressSpace::Main, offset, data)
}

pub fn poke_absolute(offset: u64, data: &[u8]) -> Vec<u8> {
    write_command(AddressSpace::Absolute, offset, data)
}

pub fn get_main_nso_base() -> Vec<u8> {
    Command::GetMainNsoBase.to_bytes()
}

pub fn get_heap_base() -> Vec<u8> {
    Command::GetHeapBase.to_bytes()
}

fn read_command(space: AddressSpace, offset: u64, length: usize) -> Vec<u8> {
    Command::Peek {
        space,
        offset,
        length,
    }
    .to_bytes()
}

fn write_command(space: AddressSpace, offset: u64, data: &[u8]) -> Vec<u8> {
    Command::Poke {
        space,
        offset,
        data: data.into(),
    }
    .to_bytes()
}

#[test]
fn builders_are_distinct_per_space() {
    let reads: Vec<_> = AddressSpace::ALL
        .iter()
        .map(|space| (space.builders().read)(0x1000, 8))
        .collect();
    let writes: Vec<_> = AddressSpace::ALL
        .iter()
        .map(|space| (space.builders().write)(0x1000, &[1, 2]))
        .collect();
    for i in 0..3 {
        for j in 0..3 {
            if i != j {
                assert_ne!(reads[i], reads[j]);
                assert_ne!(writes[i], writes[j]);
            }
        }
        assert_ne!(reads[i], writes[i]);
    }
}

#[test]
fn builders_produce_wire_commands() {
    assert_eq!(peek(0x10, 4), b"peek 0x10 4\r\n".to_vec());
    assert_eq!(peek_main(0xABC, 16), b"peekMain 0xABC 16\r\n".to_vec());
    assert_eq!(
        poke_absolute(0x8000_0000, &[0xde, 0xad]),
        b"pokeAbsolute 0x80000000 0xDEAD\r\n".to_vec()
    );
    assert_eq!(get_heap_base(), b"getHeapBase\r\n".to_vec());
}
