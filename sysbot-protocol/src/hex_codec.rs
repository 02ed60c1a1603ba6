//! Conversion between raw memory bytes and the ASCII hex text exchanged on the wire.
//!
//! The device answers every read with two hex digits per byte followed by a single
//! terminator byte, so a response for `n` bytes always occupies [`response_len`]`(n)`
//! bytes on the wire.
use crate::error::DecodeError;

/// Number of bytes occupied by a response carrying `length` bytes of memory.
///
/// `None` if the response would not fit in memory.
pub const fn response_len(length: usize) -> Option<usize> {
    match length.checked_mul(2) {
        Some(digits) if digits < isize::MAX as usize => Some(digits + 1),
        _ => None,
    }
}

/// Encodes `data` as upper case hex text.
pub fn encode(data: &[u8]) -> String {
    hex::encode_upper(data)
}

/// Decodes all hex digit pairs at the start of `buffer`.
///
/// Decoding stops at the first byte that is not a hex digit (usually the
/// line terminator), everything after it is ignored.
pub fn decode(buffer: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let end = buffer
        .iter()
        .position(|b| !b.is_ascii_hexdigit())
        .unwrap_or(buffer.len());
    decode_digits(&buffer[..end])
}

/// Decodes a response buffer that is expected to carry exactly `length` bytes.
///
/// Only the first `2 * length` bytes are interpreted; the trailing terminator
/// is never looked at. A non-hex byte inside that span is an error rather than
/// an early end of input.
pub fn decode_response(buffer: &[u8], length: usize) -> Result<Vec<u8>, DecodeError> {
    match length.checked_mul(2) {
        Some(digits) if buffer.len() >= digits => decode_digits(&buffer[..digits]),
        digits => Err(DecodeError::Truncated {
            expected: digits.unwrap_or(usize::MAX),
            got: buffer.len(),
        }),
    }
}

fn decode_digits(digits: &[u8]) -> Result<Vec<u8>, DecodeError> {
    if let Some(index) = digits.iter().position(|b| !b.is_ascii_hexdigit()) {
        return Err(DecodeError::InvalidDigit {
            index,
            byte: digits[index],
        });
    }
    if digits.len() % 2 != 0 {
        return Err(DecodeError::OddLength(digits.len()));
    }
    // Digits and length are validated above.
    hex::decode(digits).map_err(|_| DecodeError::OddLength(digits.len()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn response_len_includes_terminator() {
        assert_eq!(response_len(0), Some(1));
        assert_eq!(response_len(8), Some(17));
    }

    #[test]
    fn response_len_of_oversized_length() {
        assert_eq!(response_len(usize::MAX / 2 + 1), None);
        assert_eq!(response_len(isize::MAX as usize), None);
        assert!(response_len(crate::TRANSFER_SIZE_LIMIT).is_some());
    }

    #[test]
    fn decode_stops_at_terminator() {
        assert_eq!(decode(b"DEADbeef\n").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(decode(b"\n").unwrap(), Vec::<u8>::new());
        assert_eq!(decode(b"0102\0\0\0").unwrap(), vec![1, 2]);
    }

    #[test]
    fn decode_rejects_odd_digit_count() {
        assert_eq!(decode(b"ABC\n"), Err(DecodeError::OddLength(3)));
    }

    #[test]
    fn decode_response_uses_only_expected_span() {
        let buffer = b"0A0B0C\n";
        assert_eq!(decode_response(buffer, 3).unwrap(), vec![0x0a, 0x0b, 0x0c]);
        assert_eq!(decode_response(buffer, 2).unwrap(), vec![0x0a, 0x0b]);
    }

    #[test]
    fn decode_response_rejects_garbage_in_span() {
        assert_eq!(
            decode_response(b"0AZZ\n", 2),
            Err(DecodeError::InvalidDigit {
                index: 2,
                byte: b'Z'
            })
        );
        // A terminator that arrives early is malformed content, not an end marker.
        assert_eq!(
            decode_response(b"0A\n\0\0", 2),
            Err(DecodeError::InvalidDigit {
                index: 2,
                byte: b'\n'
            })
        );
    }

    #[test]
    fn decode_response_rejects_short_buffer() {
        assert_eq!(
            decode_response(b"0A0", 2),
            Err(DecodeError::Truncated {
                expected: 4,
                got: 3
            })
        );
    }

    #[test]
    fn decode_response_with_overflowing_length() {
        assert_eq!(
            decode_response(b"00\n", usize::MAX),
            Err(DecodeError::Truncated {
                expected: usize::MAX,
                got: 3
            })
        );
    }

    #[test]
    fn hex_round_trip() {
        let data: Vec<u8> = (0..=255).collect();
        let text = encode(&data);
        assert_eq!(text.len(), data.len() * 2);
        assert_eq!(decode(text.as_bytes()).unwrap(), data);
        assert_eq!(decode_response(text.as_bytes(), data.len()).unwrap(), data);
    }
}
