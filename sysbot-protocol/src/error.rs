use std::{
    error::Error,
    fmt::Display,
    io,
    num::ParseIntError,
    str::Utf8Error,
};

/// Why a command line could not be turned into a [`crate::Command`].
#[derive(Debug)]
pub enum ReadError {
    /// The underlying stream failed.
    Io(io::Error),
    /// The line does not start with a known verb. Holds the whole line.
    InvalidCommand(String),
    /// The verb is known but its arguments are not.
    InvalidFormat(String),
    /// The command moves more memory than the receiver accepts.
    TooManyBytes { max: usize, got: usize },
}

impl From<io::Error> for ReadError {
    fn from(value: io::Error) -> Self {
        ReadError::Io(value)
    }
}

impl From<Utf8Error> for ReadError {
    fn from(value: Utf8Error) -> Self {
        ReadError::InvalidFormat(format!("command line is not UTF-8 ({})", value))
    }
}

impl From<ParseIntError> for ReadError {
    fn from(value: ParseIntError) -> Self {
        ReadError::InvalidFormat(format!("bad number in command ({})", value))
    }
}

impl From<DecodeError> for ReadError {
    fn from(value: DecodeError) -> Self {
        ReadError::InvalidFormat(format!("bad poke payload ({})", value))
    }
}

impl Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::Io(error) => write!(f, "I/O error on command stream: {}", error),
            ReadError::InvalidCommand(line) => write!(f, "Unknown command line '{}'", line),
            ReadError::InvalidFormat(reason) => write!(f, "Malformed command: {}", reason),
            ReadError::TooManyBytes { max, got } => {
                write!(f, "Command moves {} bytes, the limit is {}", got, max)
            }
        }
    }
}

impl Error for ReadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReadError::Io(error) => Some(error),
            _ => None,
        }
    }
}

/// Errors produced when hex text received from the device cannot be turned back into bytes.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DecodeError {
    /// A byte inside the expected hex span is not a hex digit.
    InvalidDigit { index: usize, byte: u8 },
    /// The hex text has an odd number of digits.
    OddLength(usize),
    /// The buffer is too short to hold the expected number of digits.
    Truncated { expected: usize, got: usize },
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::InvalidDigit { index, byte } => {
                write!(f, "Invalid hex digit 0x{:02x} at index {}", byte, index)
            }
            DecodeError::OddLength(len) => write!(f, "Odd number of hex digits ({})", len),
            DecodeError::Truncated { expected, got } => write!(
                f,
                "Hex response truncated! Expected {} digits, but got {}",
                expected, got
            ),
        }
    }
}

impl Error for DecodeError {}

#[test]
fn read_error_messages() {
    assert_eq!(
        ReadError::InvalidCommand("click A".to_string()).to_string(),
        "Unknown command line 'click A'"
    );
    assert_eq!(
        ReadError::TooManyBytes { max: 16, got: 17 }.to_string(),
        "Command moves 17 bytes, the limit is 16"
    );
    let err = ReadError::from("x".parse::<u64>().unwrap_err());
    assert!(err.to_string().starts_with("Malformed command: bad number in command"));

    let err = ReadError::from(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
    assert!(matches!(err, ReadError::Io(_)));
    assert!(err.source().is_some());
}
