//! The minimal CBOR envelope placed around payloads before `bc32` encoding.
//!
//! A payload is wrapped as a single CBOR byte string. Depending on the payload
//! length, the head takes one of four widths:
//!
//! | length               | head                  |
//! |----------------------|-----------------------|
//! | 1 – 23               | `0x40 + length`       |
//! | 24 – 255             | `0x58`, 1 byte length |
//! | 256 – 65535          | `0x59`, 2 byte length |
//! | 65536 – 2^32 - 1     | `0x5a`, 4 byte length |
//!
//! [`unwrap`] also accepts the legacy `0x60` head for the 4 byte length.
//! Payloads of 65536 bytes or more are wrapped with `0x5a`, which decoders
//! that only know `0x60` reject, so such payloads don't interoperate with
//! them.
//!
//! ```
//! use bcur::envelope::{unwrap, wrap};
//! let wrapped = wrap(&[0xde, 0xad, 0xbe, 0xef]).unwrap();
//! assert_eq!(wrapped, vec![0x44, 0xde, 0xad, 0xbe, 0xef]);
//! assert_eq!(unwrap(&wrapped).unwrap(), &[0xde, 0xad, 0xbe, 0xef]);
//! ```

extern crate alloc;
use alloc::vec::Vec;

/// Errors when wrapping or unwrapping an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Empty payloads can't be wrapped.
    Empty,
    /// The payload length doesn't fit into four bytes.
    TooLarge(usize),
    /// The initial byte is not one of the four known heads.
    InvalidHeader(u8),
    /// The input ends before the head or the declared payload does.
    Truncated { expected: usize, actual: usize },
    /// The CBOR encoder failed.
    Encode,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty payload"),
            Self::TooLarge(length) => write!(f, "payload of {length} bytes is too large"),
            Self::InvalidHeader(byte) => write!(f, "invalid envelope header {byte:#04x}"),
            Self::Truncated { expected, actual } => write!(
                f,
                "truncated envelope: expected {expected} bytes, got {actual}"
            ),
            Self::Encode => write!(f, "failed to encode envelope"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// The four envelope heads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Header {
    /// Length 1 to 23, packed into the initial byte.
    Tiny(u8),
    /// One length byte follows.
    U8,
    /// Two big-endian length bytes follow.
    U16,
    /// Four big-endian length bytes follow.
    U32,
}

impl Header {
    /// The smallest head able to describe a payload of `length` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error for empty payloads and payloads of `2^32` bytes or more.
    pub fn for_length(length: usize) -> Result<Self, Error> {
        match length {
            0 => Err(Error::Empty),
            #[allow(clippy::cast_possible_truncation)]
            1..=23 => Ok(Self::Tiny(length as u8)),
            24..=0xff => Ok(Self::U8),
            0x100..=0xffff => Ok(Self::U16),
            _ if u32::try_from(length).is_ok() => Ok(Self::U32),
            _ => Err(Error::TooLarge(length)),
        }
    }

    /// Reads the head from the initial byte of an envelope.
    ///
    /// `0x60` is accepted as a four byte head, since some encoders emit it.
    ///
    /// # Errors
    ///
    /// Returns an error if the byte doesn't start a non-empty byte string.
    pub fn from_initial_byte(byte: u8) -> Result<Self, Error> {
        match byte {
            0x41..=0x57 => Ok(Self::Tiny(byte - 0x40)),
            0x58 => Ok(Self::U8),
            0x59 => Ok(Self::U16),
            0x5a | 0x60 => Ok(Self::U32),
            _ => Err(Error::InvalidHeader(byte)),
        }
    }

    /// Total head width in bytes, initial byte included.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::Tiny(_) => 1,
            Self::U8 => 2,
            Self::U16 => 3,
            Self::U32 => 5,
        }
    }
}

/// Wraps a payload into a CBOR byte string.
///
/// # Errors
///
/// Returns an error for empty payloads and payloads of `2^32` bytes or more.
pub fn wrap(payload: &[u8]) -> Result<Vec<u8>, Error> {
    let header = Header::for_length(payload.len())?;
    let mut encoder = minicbor::Encoder::new(Vec::with_capacity(header.width() + payload.len()));
    encoder.bytes(payload).map_err(|_| Error::Encode)?;
    Ok(encoder.into_writer())
}

/// Unwraps the payload of a CBOR byte string envelope.
///
/// # Errors
///
/// Returns an error if the input is empty, starts with an unknown head,
/// declares a zero length or is shorter than its declared length.
pub fn unwrap(envelope: &[u8]) -> Result<&[u8], Error> {
    let (&initial, rest) = envelope.split_first().ok_or(Error::Empty)?;
    let header = Header::from_initial_byte(initial)?;
    let length_bytes = header.width() - 1;
    if rest.len() < length_bytes {
        return Err(Error::Truncated {
            expected: header.width(),
            actual: envelope.len(),
        });
    }
    let (length_bytes, payload) = rest.split_at(length_bytes);
    let length = match header {
        Header::Tiny(length) => usize::from(length),
        Header::U8 | Header::U16 | Header::U32 => length_bytes
            .iter()
            .fold(0_usize, |acc, &b| (acc << 8) | usize::from(b)),
    };
    if length == 0 {
        return Err(Error::Empty);
    }
    payload.get(..length).ok_or(Error::Truncated {
        expected: header.width() + length,
        actual: envelope.len(),
    })
}
