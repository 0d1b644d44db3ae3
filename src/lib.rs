//! `bcur` is a crate to move binary payloads as "Uniform Resource" parts in
//! the `bc32` flavour of the format, as exchanged with offline signing devices
//! over animated QR codes.
//!
//! # Encode binary data
//! ```
//! use bcur::bc32::encode_data;
//! assert_eq!(encode_data(b"Hello world"), "fpjkcmr0ypmk7unvvsh4ra4j");
//! ```
//!
//! # Split up payloads into uniform resource parts
//!
//! Payloads are passed as hex. Short payloads fit into a single part.
//! ```
//! let parts = bcur::ur::encode("deadbeef", 200).unwrap();
//! assert_eq!(parts, vec!["UR:BYTES/GN02M0H002KGC7"]);
//! ```
//!
//! # Recombine parts into the payload
//!
//! Longer payloads are split into numbered parts sharing a digest. The
//! receiver may see them in any order and any number of times.
//! ```
//! use bcur::{Decoder, Encoder};
//! let data = "deadbeef".repeat(50);
//! let parts = Encoder::with_capacity(50).unwrap().encode(&data).unwrap();
//! assert_eq!(parts.len(), 7);
//! let mut decoder = Decoder::default();
//! for part in parts.iter().rev() {
//!     decoder.receive_part(part);
//! }
//! assert!(decoder.is_success());
//! assert_eq!(decoder.data(), Some(data.as_str()));
//! ```

pub mod bc32;
pub mod envelope;
pub mod part;
pub mod ur;

pub use self::ur::Decoder;
pub use self::ur::Encoder;

#[cfg(test)]
pub mod test_utils {
    use bitcoin_hashes::{sha256, Hash};
    use rand_xoshiro::rand_core::{RngCore, SeedableRng};
    use rand_xoshiro::Xoshiro256StarStar;

    /// Deterministic pseudo-random bytes derived from `seed`.
    #[must_use]
    pub fn make_message(seed: &str, size: usize) -> Vec<u8> {
        let hash = sha256::Hash::hash(seed.as_bytes());
        let mut rng = Xoshiro256StarStar::from_seed(hash.to_byte_array());
        let mut message = vec![0; size];
        rng.fill_bytes(&mut message);
        message
    }
}
