//! The textual grammar of a single UR part.
//!
//! A part takes one of three shapes:
//!
//! - `ur:<type>/<data>`
//! - `ur:<type>/<digest>/<data>`
//! - `ur:<type>/<index>of<total>/<digest>/<data>`
//!
//! Parsing is case-insensitive; all segments are normalized to lower case.
//!
//! ```
//! use bcur::part::{FragmentHeader, Part};
//! let part: Part = "UR:BYTES/2OF3/DIGEST/QPZRY".parse().unwrap();
//! assert_eq!(part.ur_type, "bytes");
//! assert_eq!(part.index(), 2);
//! assert_eq!(part.total(), 3);
//! assert_eq!(part.digest(), Some("digest"));
//! assert_eq!(part.data, "qpzry");
//! assert_eq!(part.to_string(), "ur:bytes/2of3/digest/qpzry");
//! ```

extern crate alloc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

const SCHEME: &str = "ur:";

/// Why a part string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The string doesn't start with `ur:`.
    InvalidScheme,
    /// The type is empty or contains characters other than `a-z`, `0-9` and `-`.
    InvalidType(String),
    /// The type is valid but not the one expected.
    UnexpectedType { expected: String, found: String },
    /// The number of `/` separated segments is not 2, 3 or 4.
    InvalidSegmentCount(usize),
    /// A segment is empty.
    EmptySegment,
    /// A segment mixes upper and lower case.
    MixedCase,
    /// The sequence segment is not `<index>of<total>`.
    InvalidSequence(String),
    /// The index is zero or larger than the total.
    IndexOutOfRange { index: usize, total: usize },
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidScheme => write!(f, "invalid scheme"),
            Self::InvalidType(t) => write!(f, "invalid type {t:?}"),
            Self::UnexpectedType { expected, found } => {
                write!(f, "expected type {expected:?}, found {found:?}")
            }
            Self::InvalidSegmentCount(n) => {
                write!(f, "invalid segment count: expected 2, 3 or 4 but got {n}")
            }
            Self::EmptySegment => write!(f, "empty segment"),
            Self::MixedCase => write!(f, "mixed case segment"),
            Self::InvalidSequence(s) => write!(f, "invalid sequence {s:?}"),
            Self::IndexOutOfRange { index, total } => {
                write!(f, "index {index} out of range for {total} fragments")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseError {}

/// What a part declares about its place in the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentHeader {
    /// The whole payload, without a digest.
    Single,
    /// The whole payload, with a digest.
    SingleWithDigest { digest: String },
    /// Fragment `index` (1-based) of `total`.
    Multi {
        index: usize,
        total: usize,
        digest: String,
    },
}

/// A parsed UR part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub ur_type: String,
    pub header: FragmentHeader,
    pub data: String,
}

impl Part {
    /// The 1-based index of this fragment. Single parts are fragment 1.
    #[must_use]
    pub fn index(&self) -> usize {
        match self.header {
            FragmentHeader::Single | FragmentHeader::SingleWithDigest { .. } => 1,
            FragmentHeader::Multi { index, .. } => index,
        }
    }

    /// The declared number of fragments. Single parts declare 1.
    #[must_use]
    pub fn total(&self) -> usize {
        match self.header {
            FragmentHeader::Single | FragmentHeader::SingleWithDigest { .. } => 1,
            FragmentHeader::Multi { total, .. } => total,
        }
    }

    #[must_use]
    pub fn digest(&self) -> Option<&str> {
        match &self.header {
            FragmentHeader::Single => None,
            FragmentHeader::SingleWithDigest { digest } | FragmentHeader::Multi { digest, .. } => {
                Some(digest)
            }
        }
    }
}

impl core::str::FromStr for Part {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = strip_prefix_ignore_case(s, SCHEME).ok_or(ParseError::InvalidScheme)?;
        let segments = rest
            .split('/')
            .map(normalize_segment)
            .collect::<Result<Vec<String>, ParseError>>()?;

        let (ur_type, header, data) = match segments.as_slice() {
            [ur_type, data] => (ur_type, FragmentHeader::Single, data),
            [ur_type, digest, data] => (
                ur_type,
                FragmentHeader::SingleWithDigest {
                    digest: digest.clone(),
                },
                data,
            ),
            [ur_type, sequence, digest, data] => {
                let (index, total) = parse_sequence(sequence)?;
                (
                    ur_type,
                    FragmentHeader::Multi {
                        index,
                        total,
                        digest: digest.clone(),
                    },
                    data,
                )
            }
            _ => return Err(ParseError::InvalidSegmentCount(segments.len())),
        };
        check_type(ur_type)?;

        Ok(Self {
            ur_type: ur_type.clone(),
            header,
            data: data.clone(),
        })
    }
}

impl core::fmt::Display for Part {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{SCHEME}{}/", self.ur_type)?;
        match &self.header {
            FragmentHeader::Single => {}
            FragmentHeader::SingleWithDigest { digest } => write!(f, "{digest}/")?,
            FragmentHeader::Multi {
                index,
                total,
                digest,
            } => write!(f, "{index}of{total}/{digest}/")?,
        }
        write!(f, "{}", self.data)
    }
}

/// Checks that a type consists of lower case letters, digits and dashes.
///
/// # Errors
///
/// Returns [`ParseError::InvalidType`] otherwise.
pub fn check_type(ur_type: &str) -> Result<(), ParseError> {
    let valid = !ur_type.is_empty()
        && ur_type
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(ParseError::InvalidType(ur_type.to_string()))
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        s.get(prefix.len()..)
    } else {
        None
    }
}

fn normalize_segment(segment: &str) -> Result<String, ParseError> {
    if segment.is_empty() {
        return Err(ParseError::EmptySegment);
    }
    let has_lower = segment.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = segment.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        return Err(ParseError::MixedCase);
    }
    Ok(segment.to_ascii_lowercase())
}

fn parse_sequence(sequence: &str) -> Result<(usize, usize), ParseError> {
    let invalid = || ParseError::InvalidSequence(sequence.to_string());
    let (index, total) = sequence.split_once("of").ok_or_else(invalid)?;
    let index = parse_positive(index).ok_or_else(invalid)?;
    let total = parse_positive(total).ok_or_else(invalid)?;
    if index > total {
        return Err(ParseError::IndexOutOfRange { index, total });
    }
    Ok((index, total))
}

fn parse_positive(digits: &str) -> Option<usize> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|&n| n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_part() {
        let part: Part = "ur:bytes/gn02m0h002kgc7".parse().unwrap();
        assert_eq!(
            part,
            Part {
                ur_type: "bytes".into(),
                header: FragmentHeader::Single,
                data: "gn02m0h002kgc7".into(),
            }
        );
        assert_eq!((part.index(), part.total(), part.digest()), (1, 1, None));
        assert_eq!(part, "UR:BYTES/GN02M0H002KGC7".parse::<Part>().unwrap());
    }

    #[test]
    fn test_single_part_with_digest() {
        let part: Part = "ur:bytes/hxammzakd3gpn6pfdj4y2w8j3acrya2sycy8eu2j9875s4nxt3dqc7pkf4/gn02m0h002kgc7"
            .parse()
            .unwrap();
        assert_eq!((part.index(), part.total()), (1, 1));
        assert_eq!(
            part.digest(),
            Some("hxammzakd3gpn6pfdj4y2w8j3acrya2sycy8eu2j9875s4nxt3dqc7pkf4")
        );
    }

    #[test]
    fn test_multi_part() {
        let part: Part = "UR:CRYPTO-PSBT/12OF20/ABC/DEF".parse().unwrap();
        assert_eq!(part.ur_type, "crypto-psbt");
        assert_eq!(
            part.header,
            FragmentHeader::Multi {
                index: 12,
                total: 20,
                digest: "abc".into()
            }
        );
        assert_eq!(part.to_string(), "ur:crypto-psbt/12of20/abc/def");
    }

    #[test]
    fn test_parse_errors() {
        let cases = [
            ("bytes/abc", ParseError::InvalidScheme),
            ("u", ParseError::InvalidScheme),
            ("ur:bytes", ParseError::InvalidSegmentCount(1)),
            ("ur:bytes/1of2/a/b/c", ParseError::InvalidSegmentCount(5)),
            ("ur:bytes/", ParseError::EmptySegment),
            ("ur:bytes//abc", ParseError::EmptySegment),
            ("ur:Bytes/abc", ParseError::MixedCase),
            ("ur:by_tes/abc", ParseError::InvalidType("by_tes".into())),
            (
                "ur:bytes/1-2/abc/def",
                ParseError::InvalidSequence("1-2".into()),
            ),
            (
                "ur:bytes/0of2/abc/def",
                ParseError::InvalidSequence("0of2".into()),
            ),
            (
                "ur:bytes/1of0/abc/def",
                ParseError::InvalidSequence("1of0".into()),
            ),
            (
                "ur:bytes/+1of2/abc/def",
                ParseError::InvalidSequence("+1of2".into()),
            ),
            (
                "ur:bytes/of2/abc/def",
                ParseError::InvalidSequence("of2".into()),
            ),
            (
                "ur:bytes/3of2/abc/def",
                ParseError::IndexOutOfRange { index: 3, total: 2 },
            ),
        ];
        for (input, expected) in cases {
            assert_eq!(input.parse::<Part>().unwrap_err(), expected, "{input}");
        }
    }

    #[test]
    fn test_check_type() {
        assert!(check_type("bytes").is_ok());
        assert!(check_type("crypto-hdkey").is_ok());
        assert!(check_type("").is_err());
        assert!(check_type("BYTES").is_err());
    }
}
