/// Read and write implementations for commands and responses
use std::io::{self, BufRead, Write};

use crate::{
    error::ReadError,
    hex_codec,
    protocol::{AddressSpace, Command, Response},
};

impl Command {
    const CMD_PEEK: &str = "peek";
    const CMD_PEEK_MAIN: &str = "peekMain";
    const CMD_PEEK_ABSOLUTE: &str = "peekAbsolute";
    const CMD_POKE: &str = "poke";
    const CMD_POKE_MAIN: &str = "pokeMain";
    const CMD_POKE_ABSOLUTE: &str = "pokeAbsolute";
    const CMD_GET_MAIN_NSO_BASE: &str = "getMainNsoBase";
    const CMD_GET_HEAP_BASE: &str = "getHeapBase";
    const CMD_TERMINATOR: &str = "\r\n";

    fn verb(&self) -> &'static str {
        match self {
            Command::Peek { space, .. } => match space {
                AddressSpace::Heap => Self::CMD_PEEK,
                AddressSpace::Main => Self::CMD_PEEK_MAIN,
                AddressSpace::Absolute => Self::CMD_PEEK_ABSOLUTE,
            },
            Command::Poke { space, .. } => match space {
                AddressSpace::Heap => Self::CMD_POKE,
                AddressSpace::Main => Self::CMD_POKE_MAIN,
                AddressSpace::Absolute => Self::CMD_POKE_ABSOLUTE,
            },
            Command::GetMainNsoBase => Self::CMD_GET_MAIN_NSO_BASE,
            Command::GetHeapBase => Self::CMD_GET_HEAP_BASE,
        }
    }

    /// The complete command line, including the terminator.
    pub fn to_bytes(&self) -> Vec<u8> {
        let line = match self {
            Command::Peek { offset, length, .. } => {
                format!("{} 0x{:X} {}", self.verb(), offset, length)
            }
            Command::Poke { offset, data, .. } => {
                format!("{} 0x{:X} 0x{}", self.verb(), offset, hex_codec::encode(data))
            }
            Command::GetMainNsoBase | Command::GetHeapBase => self.verb().to_string(),
        };
        let mut bytes = line.into_bytes();
        bytes.extend_from_slice(Self::CMD_TERMINATOR.as_bytes());
        bytes
    }

    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        writer.write_all(&self.to_bytes())
    }

    /// Reads one command line from `reader`.
    ///
    /// Returns `Ok(None)` when the stream ended before any byte of a new line arrived.
    pub fn from_reader(
        reader: &mut impl BufRead,
        max_transfer_size: usize,
    ) -> Result<Option<Command>, ReadError> {
        let mut line = Vec::with_capacity(64);
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(None);
        }
        Command::from_line(&line, max_transfer_size).map(Some)
    }

    /// Parses a single command line. Surrounding whitespace and the terminator are ignored.
    pub fn from_line(line: &[u8], max_transfer_size: usize) -> Result<Command, ReadError> {
        let line = str::from_utf8(line.trim_ascii())?;
        let mut parts = line.split_ascii_whitespace();
        let verb = parts.next().unwrap_or_default();

        let command = match verb {
            Self::CMD_PEEK | Self::CMD_PEEK_MAIN | Self::CMD_PEEK_ABSOLUTE => {
                let offset = parse_offset(parts.next())?;
                let length = parts
                    .next()
                    .ok_or_else(|| missing_argument(verb, "length"))?
                    .parse::<usize>()?;
                if length > max_transfer_size {
                    return Err(ReadError::TooManyBytes {
                        max: max_transfer_size,
                        got: length,
                    });
                }
                Command::Peek {
                    space: read_space(verb),
                    offset,
                    length,
                }
            }
            Self::CMD_POKE | Self::CMD_POKE_MAIN | Self::CMD_POKE_ABSOLUTE => {
                let offset = parse_offset(parts.next())?;
                let payload = parts.next().ok_or_else(|| missing_argument(verb, "data"))?;
                let digits = strip_hex_prefix(payload).as_bytes();
                let length = digits.len() / 2;
                if length > max_transfer_size {
                    return Err(ReadError::TooManyBytes {
                        max: max_transfer_size,
                        got: length,
                    });
                }
                if digits.len() % 2 != 0 {
                    return Err(ReadError::InvalidFormat(format!(
                        "Odd number of hex digits in {} payload",
                        verb
                    )));
                }
                Command::Poke {
                    space: write_space(verb),
                    offset,
                    data: hex_codec::decode_response(digits, length)?.into_boxed_slice(),
                }
            }
            Self::CMD_GET_MAIN_NSO_BASE => Command::GetMainNsoBase,
            Self::CMD_GET_HEAP_BASE => Command::GetHeapBase,
            _ => return Err(ReadError::InvalidCommand(line.to_string())),
        };

        if let Some(extra) = parts.next() {
            return Err(ReadError::InvalidFormat(format!(
                "Unexpected argument '{}' for {}",
                extra, verb
            )));
        }
        Ok(command)
    }
}

fn read_space(verb: &str) -> AddressSpace {
    match verb {
        Command::CMD_PEEK_MAIN => AddressSpace::Main,
        Command::CMD_PEEK_ABSOLUTE => AddressSpace::Absolute,
        _ => AddressSpace::Heap,
    }
}

fn write_space(verb: &str) -> AddressSpace {
    match verb {
        Command::CMD_POKE_MAIN => AddressSpace::Main,
        Command::CMD_POKE_ABSOLUTE => AddressSpace::Absolute,
        _ => AddressSpace::Heap,
    }
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

fn parse_offset(arg: Option<&str>) -> Result<u64, ReadError> {
    let arg = arg.ok_or_else(|| ReadError::InvalidFormat("Missing offset".to_string()))?;
    Ok(u64::from_str_radix(strip_hex_prefix(arg), 16)?)
}

fn missing_argument(verb: &str, name: &str) -> ReadError {
    ReadError::InvalidFormat(format!("Missing {} for {}", name, verb))
}

impl Response {
    const TERMINATOR: u8 = b'\n';

    /// The response line, two hex digits per byte plus the terminator.
    /// Addresses are written most significant byte first.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = match self {
            Response::Memory(data) => hex_codec::encode(data).into_bytes(),
            Response::Address(address) => format!("{:016X}", address).into_bytes(),
        };
        bytes.push(Self::TERMINATOR);
        bytes
    }

    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        writer.write_all(&self.to_bytes())
    }
}

#[test]
fn address_response_is_big_endian_hex() {
    let mut out = Vec::new();
    Response::Address(0x0000_0071_0000_0000)
        .write_to(&mut out)
        .unwrap();
    assert_eq!(out, b"0000007100000000\n".to_vec());
}

#[test]
fn memory_response_has_expected_size() {
    let out = Response::Memory(vec![0xAB; 5].into_boxed_slice()).to_bytes();
    assert_eq!(Some(out.len()), crate::hex_codec::response_len(5));
}
