//! Split payloads into UR parts and put them back together.

extern crate alloc;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use bitcoin_hashes::{sha256, Hash};

use crate::part::{FragmentHeader, ParseError, Part};
use crate::{bc32, envelope};

/// Maximum number of `bc32` characters per part unless configured otherwise.
pub const DEFAULT_FRAGMENT_CAPACITY: usize = 200;

/// The UR type used unless configured otherwise.
pub const DEFAULT_UR_TYPE: &str = "bytes";

const DIGEST_LENGTH: usize = 32;

/// Everything that can go wrong when encoding or decoding URs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A part doesn't follow the part grammar.
    MalformedHeader(ParseError),
    /// Two parts disagree on the number of fragments.
    InconsistentTotal { expected: usize, found: usize },
    /// A digest segment doesn't decode to a SHA-256 hash.
    InvalidDigest,
    /// Parts carry different digests, or the payload doesn't hash to the digest.
    DigestMismatch,
    /// Two different parts claim the same index.
    DuplicateIndex(usize),
    /// The reassembled envelope is invalid.
    Envelope(envelope::Error),
    /// The reassembled data is not valid `bc32`.
    Bc32(bc32::Error),
    /// The payload is not an even-length hex string.
    InvalidHex,
    /// The fragment capacity is zero.
    InvalidCapacity,
    /// The configured type is not a valid UR type.
    InvalidType(String),
    /// No parts were passed.
    NoParts,
    /// Not all fragments were passed.
    Incomplete { received: usize, total: usize },
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::MalformedHeader(e) => write!(f, "malformed header: {e}"),
            Self::InconsistentTotal { expected, found } => write!(
                f,
                "inconsistent total: expected {expected} fragments, found {found}"
            ),
            Self::InvalidDigest => write!(f, "invalid digest"),
            Self::DigestMismatch => write!(f, "digest mismatch"),
            Self::DuplicateIndex(index) => write!(f, "index {index} has already been set"),
            Self::Envelope(e) => write!(f, "invalid envelope: {e}"),
            Self::Bc32(e) => write!(f, "invalid bc32 data: {e}"),
            Self::InvalidHex => write!(f, "payload is not valid hex"),
            Self::InvalidCapacity => write!(f, "fragment capacity must be positive"),
            Self::InvalidType(t) => write!(f, "invalid type {t:?}"),
            Self::NoParts => write!(f, "no parts"),
            Self::Incomplete { received, total } => {
                write!(f, "incomplete: received {received} of {total} fragments")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::MalformedHeader(e) => Some(e),
            Self::Envelope(e) => Some(e),
            Self::Bc32(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::MalformedHeader(e)
    }
}

impl From<envelope::Error> for Error {
    fn from(e: envelope::Error) -> Self {
        Self::Envelope(e)
    }
}

impl From<bc32::Error> for Error {
    fn from(e: bc32::Error) -> Self {
        Self::Bc32(e)
    }
}

impl From<hex::FromHexError> for Error {
    fn from(_: hex::FromHexError) -> Self {
        Self::InvalidHex
    }
}

/// Splits hex payloads into upper case UR parts of the default type.
///
/// # Examples
///
/// ```
/// let parts = bcur::ur::encode("deadbeef", 200).unwrap();
/// assert_eq!(parts, vec!["UR:BYTES/GN02M0H002KGC7"]);
/// ```
///
/// # Errors
///
/// Returns an error if the payload is empty or not valid hex, or the
/// capacity is zero.
pub fn encode(hex_payload: &str, fragment_capacity: usize) -> Result<Vec<String>, Error> {
    Encoder::with_capacity(fragment_capacity)?.encode(hex_payload)
}

/// Reassembles a hex payload from a complete set of parts, in any order.
///
/// # Examples
///
/// ```
/// let parts = bcur::ur::encode("deadbeef", 5).unwrap();
/// assert_eq!(parts.len(), 3);
/// assert_eq!(bcur::ur::decode(&parts, "bytes").unwrap(), "deadbeef");
/// ```
///
/// # Errors
///
/// Returns an error if any part is invalid, the parts don't belong together,
/// or not every fragment is present. Every part is validated, including
/// parts beyond a complete set.
pub fn decode<S: AsRef<str>>(parts: &[S], ur_type: &str) -> Result<String, Error> {
    if parts.is_empty() {
        return Err(Error::NoParts);
    }
    crate::part::check_type(ur_type).map_err(|_| Error::InvalidType(ur_type.to_string()))?;
    let mut workloads: Vec<String> = Vec::with_capacity(parts.len());
    for part in parts {
        let part = part.as_ref();
        if !workloads.iter().any(|w| w == part) {
            workloads.push(part.to_string());
        }
    }
    match assemble(&workloads, ur_type) {
        State::Done { payload, .. } => Ok(payload),
        State::Failed { error, .. } => Err(error),
        State::Collecting { received, total } => Err(Error::Incomplete { received, total }),
        State::Idle => Err(Error::NoParts),
    }
}

/// Splits payloads into UR parts.
///
/// An `Encoder` is plain configuration; encoding doesn't change it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoder {
    ur_type: String,
    fragment_capacity: usize,
}

impl Default for Encoder {
    fn default() -> Self {
        Self {
            ur_type: DEFAULT_UR_TYPE.to_string(),
            fragment_capacity: DEFAULT_FRAGMENT_CAPACITY,
        }
    }
}

impl Encoder {
    /// An encoder for `ur_type` parts carrying at most `fragment_capacity`
    /// data characters each.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is invalid or the capacity is zero.
    pub fn new(ur_type: &str, fragment_capacity: usize) -> Result<Self, Error> {
        crate::part::check_type(ur_type).map_err(|_| Error::InvalidType(ur_type.to_string()))?;
        if fragment_capacity == 0 {
            return Err(Error::InvalidCapacity);
        }
        Ok(Self {
            ur_type: ur_type.to_string(),
            fragment_capacity,
        })
    }

    /// An encoder for the default type.
    ///
    /// # Errors
    ///
    /// Returns an error if the capacity is zero.
    pub fn with_capacity(fragment_capacity: usize) -> Result<Self, Error> {
        Self::new(DEFAULT_UR_TYPE, fragment_capacity)
    }

    #[must_use]
    pub fn ur_type(&self) -> &str {
        &self.ur_type
    }

    #[must_use]
    pub fn fragment_capacity(&self) -> usize {
        self.fragment_capacity
    }

    /// Encodes a hex payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is empty, too large or not valid hex.
    pub fn encode(&self, hex_payload: &str) -> Result<Vec<String>, Error> {
        self.encode_bytes(&hex::decode(hex_payload)?)
    }

    /// Encodes a byte payload.
    ///
    /// # Examples
    ///
    /// ```
    /// let encoder = bcur::Encoder::new("crypto-psbt", 20).unwrap();
    /// let parts = encoder.encode_bytes(&[7; 16]).unwrap();
    /// assert_eq!(parts.len(), 2);
    /// assert!(parts[0].starts_with("UR:CRYPTO-PSBT/1OF2/"));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is empty or too large.
    pub fn encode_bytes(&self, payload: &[u8]) -> Result<Vec<String>, Error> {
        let envelope = envelope::wrap(payload)?;
        let body = bc32::encode_data(&envelope);
        let fragments: Vec<String> = body
            .as_bytes()
            .chunks(self.fragment_capacity)
            .map(|chunk| chunk.iter().copied().map(char::from).collect())
            .collect();
        let total = fragments.len();
        tracing::debug!(
            ur_type = %self.ur_type,
            bytes = payload.len(),
            fragments = total,
            capacity = self.fragment_capacity,
            "encoded payload"
        );

        if total == 1 {
            let part = Part {
                ur_type: self.ur_type.clone(),
                header: FragmentHeader::Single,
                data: body,
            };
            return Ok(vec![part.to_string().to_ascii_uppercase()]);
        }

        let digest = digest(&envelope);
        Ok(fragments
            .into_iter()
            .enumerate()
            .map(|(i, data)| {
                Part {
                    ur_type: self.ur_type.clone(),
                    header: FragmentHeader::Multi {
                        index: i + 1,
                        total,
                        digest: digest.clone(),
                    },
                    data,
                }
                .to_string()
                .to_ascii_uppercase()
            })
            .collect())
    }
}

fn sha256(data: &[u8]) -> [u8; DIGEST_LENGTH] {
    sha256::Hash::hash(data).to_byte_array()
}

fn digest(envelope: &[u8]) -> String {
    bc32::encode_data(&sha256(envelope))
}

/// Where a decoding session stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    /// No parts received.
    Idle,
    /// Some, but not all, fragments received.
    Collecting { received: usize, total: usize },
    /// The payload was reassembled and verified.
    Done { payload: String, total: usize },
    /// A part was invalid or the parts didn't fit together.
    Failed {
        error: Error,
        received: usize,
        total: usize,
    },
}

impl State {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Failed { .. })
    }
}

/// Progress of a decoding session, for display by scanners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    /// Declared number of fragments, 0 until a part was parsed.
    pub total_parts: usize,
    /// Number of distinct fragments received.
    pub parts_received: usize,
}

/// A plain snapshot of a decoding session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Summary {
    pub success: bool,
    pub current: usize,
    pub length: usize,
    pub workloads: Vec<String>,
    pub result: String,
}

/// Reassembles payloads from parts received one at a time.
///
/// Parts may arrive in any order and may repeat. The decoder is meant to be
/// fed from a scanning loop which stops once [`Decoder::is_complete`] holds.
///
/// ```
/// use bcur::{ur::encode, Decoder};
/// let parts = encode(&"00ff".repeat(100), 40).unwrap();
/// let mut decoder = Decoder::default();
/// for part in parts.iter().rev().chain(parts.iter()) {
///     if decoder.is_complete() {
///         break;
///     }
///     decoder.receive_part(part);
/// }
/// assert!(decoder.is_success());
/// assert_eq!(decoder.data(), Some("00ff".repeat(100).as_str()));
/// ```
#[derive(Debug, Clone)]
pub struct Decoder {
    ur_type: String,
    workloads: Vec<String>,
    state: State,
}

impl Default for Decoder {
    fn default() -> Self {
        Self {
            ur_type: DEFAULT_UR_TYPE.to_string(),
            workloads: Vec::new(),
            state: State::Idle,
        }
    }
}

impl Decoder {
    /// A decoder accepting parts of the given type only.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is not a valid UR type.
    pub fn with_type(ur_type: &str) -> Result<Self, Error> {
        crate::part::check_type(ur_type).map_err(|_| Error::InvalidType(ur_type.to_string()))?;
        Ok(Self {
            ur_type: ur_type.to_string(),
            ..Self::default()
        })
    }

    /// Forgets all received parts and any error.
    pub fn reset(&mut self) {
        self.workloads.clear();
        self.state = State::Idle;
    }

    /// Feeds a part into the session and returns the resulting state.
    ///
    /// Failures are recorded in the returned state rather than returned as
    /// errors. Parts received after the session completed are ignored.
    pub fn receive_part(&mut self, part: &str) -> &State {
        if self.state.is_terminal() {
            tracing::debug!("session complete, ignoring part");
            return &self.state;
        }
        if self.workloads.iter().any(|w| w == part) {
            tracing::debug!("ignoring duplicate part");
            return &self.state;
        }
        self.workloads.push(part.to_string());
        self.state = assemble(&self.workloads, &self.ur_type);

        match &self.state {
            State::Idle => {}
            State::Collecting { received, total } => {
                tracing::debug!(parts_received = received, total_parts = total, "part accepted");
            }
            State::Done { total, .. } => {
                tracing::debug!(total_parts = total, "payload reassembled");
            }
            State::Failed { error, .. } => {
                tracing::warn!(%error, "decoding failed");
            }
        }
        &self.state
    }

    #[must_use]
    pub fn state(&self) -> &State {
        &self.state
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        let (parts_received, total_parts) = match self.state {
            State::Idle => (0, 0),
            State::Collecting { received, total } | State::Failed { received, total, .. } => {
                (received, total)
            }
            State::Done { total, .. } => (total, total),
        };
        Progress {
            total_parts,
            parts_received,
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state.is_terminal()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.state, State::Done { .. })
    }

    /// The reassembled payload as hex.
    #[must_use]
    pub fn data(&self) -> Option<&str> {
        match &self.state {
            State::Done { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// The reassembled payload as bytes.
    #[must_use]
    pub fn message(&self) -> Option<Vec<u8>> {
        self.data().and_then(|payload| hex::decode(payload).ok())
    }

    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        match &self.state {
            State::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.error().map(ToString::to_string)
    }

    #[must_use]
    pub fn summary(&self) -> Summary {
        let progress = self.progress();
        Summary {
            success: self.is_success(),
            current: progress.parts_received,
            length: progress.total_parts,
            workloads: self.workloads.clone(),
            result: self.data().unwrap_or_default().to_string(),
        }
    }
}

/// Derives the session state from every part received so far.
fn assemble(workloads: &[String], ur_type: &str) -> State {
    let mut assembly = Assembly::default();
    for workload in workloads {
        if let Err(error) = assembly.insert(workload, ur_type) {
            return assembly.failed(error);
        }
    }
    match assembly.total {
        None => State::Idle,
        Some(total) if assembly.fragments.len() < total => State::Collecting {
            received: assembly.fragments.len(),
            total,
        },
        Some(total) => match assembly.reassemble() {
            Ok(payload) => State::Done {
                payload: hex::encode(payload),
                total,
            },
            Err(error) => assembly.failed(error),
        },
    }
}

#[derive(Default)]
struct Assembly {
    total: Option<usize>,
    digest: Option<Vec<u8>>,
    fragments: BTreeMap<usize, Part>,
}

impl Assembly {
    fn insert(&mut self, workload: &str, ur_type: &str) -> Result<(), Error> {
        let part: Part = workload.parse()?;
        if part.ur_type != ur_type {
            return Err(ParseError::UnexpectedType {
                expected: ur_type.to_string(),
                found: part.ur_type,
            }
            .into());
        }

        let total = part.total();
        match self.total {
            Some(expected) if expected != total => {
                return Err(Error::InconsistentTotal {
                    expected,
                    found: total,
                })
            }
            _ => self.total = Some(total),
        }

        if let Some(digest) = part.digest() {
            let digest = bc32::decode_data(digest).map_err(|_| Error::InvalidDigest)?;
            if digest.len() != DIGEST_LENGTH {
                return Err(Error::InvalidDigest);
            }
            match &self.digest {
                Some(expected) if *expected != digest => return Err(Error::DigestMismatch),
                _ => self.digest = Some(digest),
            }
        }

        let index = part.index();
        match self.fragments.get(&index) {
            Some(existing) if *existing == part => Ok(()),
            Some(_) => Err(Error::DuplicateIndex(index)),
            None => {
                self.fragments.insert(index, part);
                Ok(())
            }
        }
    }

    fn reassemble(&self) -> Result<Vec<u8>, Error> {
        let body: String = self.fragments.values().map(|p| p.data.as_str()).collect();
        let envelope = bc32::decode_data(&body)?;
        if let Some(digest) = &self.digest {
            if sha256(&envelope)[..] != digest[..] {
                return Err(Error::DigestMismatch);
            }
        }
        Ok(envelope::unwrap(&envelope)?.to_vec())
    }

    fn failed(&self, error: Error) -> State {
        State::Failed {
            error,
            received: self.fragments.len(),
            total: self.total.unwrap_or_default(),
        }
    }
}
