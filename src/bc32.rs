//! Encode and decode byte payloads with the [`bc32`](https://github.com/BlockchainCommons/Research/blob/master/papers/bcr-2020-004-bc32.md) scheme.
//!
//! `bc32` is a variant of `bech32` without a human-readable part and with a
//! different checksum constant. Both variants share the same alphabet and
//! checksum polynomial, which is why the address flavour lives in this module
//! as well.
//!
//! # Data encoding
//! ```
//! use bcur::bc32::{decode_data, encode_data};
//! let encoded = encode_data(b"Hello world");
//! assert_eq!(encoded, "fpjkcmr0ypmk7unvvsh4ra4j");
//! assert_eq!(decode_data(&encoded).unwrap(), b"Hello world");
//! // Upper case input is accepted, mixed case is not.
//! assert!(decode_data("FPJKCMR0YPMK7UNVVSH4RA4J").is_ok());
//! assert!(decode_data("FPJKCMR0YPMK7unvvsh4ra4j").is_err());
//! ```
//!
//! # Segwit addresses
//! ```
//! use bcur::bc32::{decode_segwit_address, encode_segwit_address};
//! let program = [
//!     0x75, 0x1e, 0x76, 0xe8, 0x19, 0x91, 0x96, 0xd4, 0x54, 0x94, 0x1c, 0x45, 0xd1, 0xb3, 0xa3,
//!     0x23, 0xf1, 0x43, 0x3b, 0xd6,
//! ];
//! let address = encode_segwit_address("bc", 0, &program).unwrap();
//! assert_eq!(address, "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4");
//! let decoded = decode_segwit_address("bc", &address).unwrap();
//! assert_eq!(decoded.version, 0);
//! assert_eq!(decoded.program, program);
//! ```

extern crate alloc;
use alloc::string::String;
use alloc::vec::Vec;

use phf::phf_map;

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

static CHARSET_REV: phf::Map<char, u8> = phf_map! {
    'q' => 0, 'p' => 1, 'z' => 2, 'r' => 3, 'y' => 4, '9' => 5, 'x' => 6, '8' => 7,
    'g' => 8, 'f' => 9, '2' => 10, 't' => 11, 'v' => 12, 'd' => 13, 'w' => 14, '0' => 15,
    's' => 16, '3' => 17, 'j' => 18, 'n' => 19, '5' => 20, '4' => 21, 'k' => 22, 'h' => 23,
    'c' => 24, 'e' => 25, '6' => 26, 'm' => 27, 'u' => 28, 'a' => 29, '7' => 30, 'l' => 31,
};

const GENERATOR: [u32; 5] = [
    0x3b6a_57b2,
    0x2650_8e6d,
    0x1ea1_19fa,
    0x3d42_33dd,
    0x2a14_62b3,
];

const CHECKSUM_LENGTH: usize = 6;

const SEPARATOR: char = '1';

/// Maximum length of a segwit address string.
const MAX_ADDRESS_LENGTH: usize = 90;

/// The two checksum flavours built on the shared polynomial.
///
/// The constant is part of the checksum, so a string produced with one
/// variant never validates under the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Segwit addresses, with a human-readable part.
    Bech32,
    /// Binary data, without a human-readable part.
    Bc32,
}

impl Variant {
    #[must_use]
    const fn constant(self) -> u32 {
        match self {
            Self::Bech32 => 1,
            Self::Bc32 => 0x3fff_ffff,
        }
    }
}

/// The errors that can be returned when decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A character outside of the alphabet was encountered.
    InvalidCharacter(char),
    /// Upper and lower case characters were mixed.
    MixedCase,
    /// The checksum doesn't validate.
    InvalidChecksum,
    /// The string is too short to carry a checksum, or too long for an address.
    InvalidLength,
    /// The trailing bits of the last group are not zero padding.
    InvalidPadding,
    /// The human-readable part is missing or not the expected one.
    InvalidHrp,
    /// The segwit version is larger than 16.
    InvalidWitnessVersion(u8),
    /// The witness program has a length not allowed for its version.
    InvalidProgramLength(usize),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidCharacter(c) => write!(f, "invalid character {c:?}"),
            Self::MixedCase => write!(f, "mixed case string"),
            Self::InvalidChecksum => write!(f, "invalid checksum"),
            Self::InvalidLength => write!(f, "invalid length"),
            Self::InvalidPadding => write!(f, "invalid padding"),
            Self::InvalidHrp => write!(f, "invalid human-readable part"),
            Self::InvalidWitnessVersion(v) => write!(f, "invalid witness version {v}"),
            Self::InvalidProgramLength(l) => write!(f, "invalid witness program length {l}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// A decoded segwit output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WitnessProgram {
    pub version: u8,
    pub program: Vec<u8>,
}

/// Encodes a byte payload into a `bc32` string.
///
/// # Examples
///
/// ```
/// assert_eq!(bcur::bc32::encode_data(&[0]), "qqwnf95j");
/// assert_eq!(bcur::bc32::encode_data(&[]), "szs95e");
/// ```
#[must_use]
pub fn encode_data(data: &[u8]) -> String {
    encode_with("", &to_base32(data), Variant::Bc32)
}

/// Decodes a `bc32` string back into a byte payload.
///
/// # Errors
///
/// If the string contains characters outside of the alphabet, mixes cases,
/// has an invalid checksum or non-zero padding, an error will be returned.
pub fn decode_data(encoded: &str) -> Result<Vec<u8>, Error> {
    let (_, groups) = decode_with(encoded, Variant::Bc32)?;
    from_base32(&groups)
}

/// Encodes a segwit output as a `bech32` address.
///
/// # Errors
///
/// Returns an error if the human-readable part is empty or not printable
/// ASCII, or the version and program do not form a valid witness program.
pub fn encode_segwit_address(hrp: &str, version: u8, program: &[u8]) -> Result<String, Error> {
    if hrp.is_empty() || !hrp.bytes().all(|b| (33..=126).contains(&b)) {
        return Err(Error::InvalidHrp);
    }
    check_witness_program(version, program.len())?;
    let mut groups = Vec::with_capacity(1 + (program.len() * 8 + 4) / 5);
    groups.push(version);
    groups.extend(to_base32(program));
    let encoded = encode_with(&hrp.to_ascii_lowercase(), &groups, Variant::Bech32);
    if encoded.len() > MAX_ADDRESS_LENGTH {
        return Err(Error::InvalidLength);
    }
    Ok(encoded)
}

/// Decodes a `bech32` segwit address, checking it against the expected
/// human-readable part.
///
/// # Errors
///
/// Returns an error if the address doesn't decode, carries another
/// human-readable part, or doesn't hold a valid witness program.
pub fn decode_segwit_address(hrp: &str, address: &str) -> Result<WitnessProgram, Error> {
    if address.len() > MAX_ADDRESS_LENGTH {
        return Err(Error::InvalidLength);
    }
    let (decoded_hrp, groups) = decode_with(address, Variant::Bech32)?;
    if !decoded_hrp.eq_ignore_ascii_case(hrp) {
        return Err(Error::InvalidHrp);
    }
    let (&version, rest) = groups.split_first().ok_or(Error::InvalidLength)?;
    let program = from_base32(rest)?;
    check_witness_program(version, program.len())?;
    Ok(WitnessProgram { version, program })
}

fn check_witness_program(version: u8, length: usize) -> Result<(), Error> {
    if version > 16 {
        return Err(Error::InvalidWitnessVersion(version));
    }
    if !(2..=40).contains(&length) || (version == 0 && length != 20 && length != 32) {
        return Err(Error::InvalidProgramLength(length));
    }
    Ok(())
}

fn polymod(values: impl IntoIterator<Item = u8>) -> u32 {
    values.into_iter().fold(1, |chk, value| {
        let top = chk >> 25;
        let chk = ((chk & 0x01ff_ffff) << 5) ^ u32::from(value);
        GENERATOR
            .iter()
            .enumerate()
            .filter(|(i, _)| (top >> i) & 1 == 1)
            .fold(chk, |chk, (_, g)| chk ^ g)
    })
}

// An empty human-readable part expands to the single zero symbol `bc32` prepends.
fn hrp_expand(hrp: &str) -> Vec<u8> {
    hrp.bytes()
        .map(|b| b >> 5)
        .chain(core::iter::once(0))
        .chain(hrp.bytes().map(|b| b & 0x1f))
        .collect()
}

fn create_checksum(hrp: &str, groups: &[u8], variant: Variant) -> [u8; CHECKSUM_LENGTH] {
    let values = hrp_expand(hrp)
        .into_iter()
        .chain(groups.iter().copied())
        .chain([0; CHECKSUM_LENGTH]);
    let modulus = polymod(values) ^ variant.constant();
    let mut checksum = [0; CHECKSUM_LENGTH];
    for (i, c) in checksum.iter_mut().enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        let group = ((modulus >> (5 * (CHECKSUM_LENGTH - 1 - i))) & 0x1f) as u8;
        *c = group;
    }
    checksum
}

fn verify_checksum(hrp: &str, groups: &[u8], variant: Variant) -> bool {
    polymod(hrp_expand(hrp).into_iter().chain(groups.iter().copied())) == variant.constant()
}

fn encode_with(hrp: &str, groups: &[u8], variant: Variant) -> String {
    let checksum = create_checksum(hrp, groups, variant);
    let mut encoded = String::with_capacity(hrp.len() + 1 + groups.len() + CHECKSUM_LENGTH);
    if !hrp.is_empty() {
        encoded.push_str(hrp);
        encoded.push(SEPARATOR);
    }
    encoded.extend(
        groups
            .iter()
            .chain(checksum.iter())
            .map(|&g| char::from(CHARSET[usize::from(g)])),
    );
    encoded
}

fn decode_with(encoded: &str, variant: Variant) -> Result<(String, Vec<u8>), Error> {
    if let Some(c) = encoded.chars().find(|c| !(33..=126).contains(&u32::from(*c))) {
        return Err(Error::InvalidCharacter(c));
    }
    let has_lower = encoded.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = encoded.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        return Err(Error::MixedCase);
    }
    let lowered = encoded.to_ascii_lowercase();

    let (hrp, data) = match variant {
        Variant::Bc32 => ("", lowered.as_str()),
        Variant::Bech32 => match lowered.rfind(SEPARATOR) {
            Some(0) | None => return Err(Error::InvalidHrp),
            Some(pos) => (&lowered[..pos], &lowered[pos + 1..]),
        },
    };
    if data.len() < CHECKSUM_LENGTH {
        return Err(Error::InvalidLength);
    }

    let groups = data
        .chars()
        .map(|c| CHARSET_REV.get(&c).copied().ok_or(Error::InvalidCharacter(c)))
        .collect::<Result<Vec<u8>, Error>>()?;
    if !verify_checksum(hrp, &groups, variant) {
        return Err(Error::InvalidChecksum);
    }
    let payload_length = groups.len() - CHECKSUM_LENGTH;
    Ok((String::from(hrp), groups[..payload_length].to_vec()))
}

/// Regroups bytes into 5-bit groups, zero padding the last one.
fn to_base32(data: &[u8]) -> Vec<u8> {
    let mut groups = Vec::with_capacity((data.len() * 8 + 4) / 5);
    let mut acc: u32 = 0;
    let mut bits = 0;
    for &byte in data {
        acc = (acc << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            #[allow(clippy::cast_possible_truncation)]
            groups.push(((acc >> bits) & 0x1f) as u8);
        }
    }
    if bits > 0 {
        #[allow(clippy::cast_possible_truncation)]
        groups.push(((acc << (5 - bits)) & 0x1f) as u8);
    }
    groups
}

/// Regroups 5-bit groups into bytes, rejecting anything but zero padding.
fn from_base32(groups: &[u8]) -> Result<Vec<u8>, Error> {
    let mut data = Vec::with_capacity(groups.len() * 5 / 8);
    let mut acc: u32 = 0;
    let mut bits = 0;
    for &group in groups {
        acc = ((acc << 5) | u32::from(group)) & 0xfff;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            #[allow(clippy::cast_possible_truncation)]
            data.push(((acc >> bits) & 0xff) as u8);
        }
    }
    if bits >= 5 || (acc << (8 - bits)) & 0xff != 0 {
        return Err(Error::InvalidPadding);
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bc32_vectors() {
        assert_eq!(encode_data(b"Hello world"), "fpjkcmr0ypmk7unvvsh4ra4j");
        assert_eq!(encode_data(&[0]), "qqwnf95j");
        assert_eq!(encode_data(&[0xff]), "lutxxjkk");
        assert_eq!(
            decode_data("fpjkcmr0ypmk7unvvsh4ra4j").unwrap(),
            b"Hello world".to_vec()
        );
        assert_eq!(
            decode_data("FPJKCMR0YPMK7UNVVSH4RA4J").unwrap(),
            b"Hello world".to_vec()
        );

        // empty payload is allowed
        assert_eq!(encode_data(&[]), "szs95e");
        assert!(decode_data("szs95e").unwrap().is_empty());
    }

    #[test]
    fn test_decode_errors() {
        // single substitution in the payload
        assert_eq!(
            decode_data("fpjkcmr0ypmk7unvvsh4ra4k").unwrap_err(),
            Error::InvalidChecksum
        );
        assert_eq!(
            decode_data("fpjkcmr0ypmk7unvvsh4ra4b").unwrap_err(),
            Error::InvalidCharacter('b')
        );
        assert_eq!(
            decode_data("Fpjkcmr0ypmk7unvvsh4ra4j").unwrap_err(),
            Error::MixedCase
        );
        assert_eq!(decode_data("qq").unwrap_err(), Error::InvalidLength);
        assert_eq!(decode_data("").unwrap_err(), Error::InvalidLength);
        assert_eq!(
            decode_data("qqwn f95j").unwrap_err(),
            Error::InvalidCharacter(' ')
        );
        assert_eq!(decode_data("₿").unwrap_err(), Error::InvalidCharacter('₿'));

        // a single 5-bit group can't hold a byte
        assert_eq!(decode_data("lh3dvvv").unwrap_err(), Error::InvalidPadding);
        // two groups leave two set padding bits
        assert_eq!(decode_data("qpn9asfq").unwrap_err(), Error::InvalidPadding);
    }

    #[test]
    fn test_variants_are_not_interchangeable() {
        // 0xdeadbeef checksummed with the address constant
        assert_eq!(
            decode_data("m6kmamcm2a56r").unwrap_err(),
            Error::InvalidChecksum
        );
        let groups = to_base32(&[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(encode_with("", &groups, Variant::Bech32), "m6kmamcm2a56r");
        assert!(decode_with("m6kmamcm2a56r", Variant::Bc32).is_err());
    }

    #[test]
    fn test_segwit_address() {
        let program = hex::decode("751e76e8199196d454941c45d1b3a323f1433bd6").unwrap();
        let address = encode_segwit_address("bc", 0, &program).unwrap();
        assert_eq!(address, "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4");

        let decoded =
            decode_segwit_address("bc", "BC1QW508D6QEJXTDG4Y5R3ZARVARY0C5XW7KV8F3T4").unwrap();
        assert_eq!(
            decoded,
            WitnessProgram {
                version: 0,
                program: program.clone()
            }
        );

        assert_eq!(
            decode_segwit_address("tb", &address).unwrap_err(),
            Error::InvalidHrp
        );
        assert_eq!(
            decode_segwit_address("bc", "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t5").unwrap_err(),
            Error::InvalidChecksum
        );
        assert_eq!(
            encode_segwit_address("bc", 17, &program).unwrap_err(),
            Error::InvalidWitnessVersion(17)
        );
        assert_eq!(
            encode_segwit_address("bc", 0, &program[..19]).unwrap_err(),
            Error::InvalidProgramLength(19)
        );
        assert_eq!(
            encode_segwit_address("", 0, &program).unwrap_err(),
            Error::InvalidHrp
        );

        // the data codec has no notion of a separator
        assert_eq!(
            decode_data(&address).unwrap_err(),
            Error::InvalidCharacter('b')
        );
    }

    #[test]
    fn test_base32_regrouping() {
        let data = [0xde, 0xad, 0xbe, 0xef, 0x00, 0x01];
        let groups = to_base32(&data);
        assert_eq!(groups.len(), 10);
        assert!(groups.iter().all(|&g| g < 32));
        assert_eq!(from_base32(&groups).unwrap(), data.to_vec());
    }
}
