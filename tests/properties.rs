//! Property-based tests for UR encoding and incremental decoding.

use bcur::ur::{decode, encode, Progress};
use bcur::Decoder;
use proptest::prelude::*;

const ALPHABET: &[u8] = b"QPZRY9X8GF2TVDW0S3JN54KHCE6MUA7L";

fn payload() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..200)
}

fn capacity() -> impl Strategy<Value = usize> {
    prop_oneof![3_usize..16, 16_usize..120, Just(200), Just(10_000)]
}

/// Parts of a payload together with a permutation of their indices.
fn shuffled_parts() -> impl Strategy<Value = (String, Vec<String>)> {
    (payload(), capacity()).prop_flat_map(|(payload, capacity)| {
        let hex = hex::encode(payload);
        let parts = encode(&hex, capacity).unwrap();
        (Just(hex), Just(parts).prop_shuffle())
    })
}

proptest! {
    #[test]
    fn round_trip((hex, parts) in shuffled_parts()) {
        prop_assert_eq!(decode(&parts, "bytes").unwrap(), hex);
    }

    #[test]
    fn order_independence((hex, parts) in shuffled_parts()) {
        let mut decoder = Decoder::default();
        for part in &parts {
            prop_assert!(!decoder.is_complete());
            decoder.receive_part(part);
        }
        prop_assert!(decoder.is_success());
        prop_assert_eq!(decoder.data(), Some(hex.as_str()));
    }

    #[test]
    fn duplicates_do_not_count((hex, parts) in shuffled_parts(), repeat in any::<prop::sample::Index>()) {
        let mut decoder = Decoder::default();
        let repeated = repeat.index(parts.len());
        for (i, part) in parts.iter().enumerate() {
            decoder.receive_part(part);
            let before = decoder.progress();
            if i == repeated {
                decoder.receive_part(part);
                prop_assert_eq!(decoder.progress(), before);
            }
        }
        prop_assert_eq!(decoder.data(), Some(hex.as_str()));
    }

    #[test]
    fn single_fragment_has_no_digest(payload in payload()) {
        let parts = encode(&hex::encode(&payload), 10_000).unwrap();
        prop_assert_eq!(parts.len(), 1);
        prop_assert_eq!(parts[0].matches('/').count(), 1);
        prop_assert!(parts[0].starts_with("UR:BYTES/"));
    }

    #[test]
    fn corruption_is_detected(
        (_, parts) in shuffled_parts(),
        target in any::<prop::sample::Index>(),
        position in any::<prop::sample::Index>(),
        replacement in any::<prop::sample::Index>(),
    ) {
        let mut parts = parts;
        let target = target.index(parts.len());
        let data_start = parts[target].rfind('/').unwrap() + 1;
        let mut bytes = parts[target].clone().into_bytes();
        let position = data_start + position.index(bytes.len() - data_start);
        let original = bytes[position];
        let mut substitute = ALPHABET[replacement.index(ALPHABET.len())];
        if substitute == original {
            substitute = if original == b'Q' { b'P' } else { b'Q' };
        }
        bytes[position] = substitute;
        parts[target] = String::from_utf8(bytes).unwrap();

        let mut decoder = Decoder::default();
        for part in &parts {
            decoder.receive_part(part);
        }
        prop_assert!(decoder.is_complete());
        prop_assert!(!decoder.is_success());
        prop_assert!(decoder.error_message().is_some());
        prop_assert_eq!(decoder.data(), None);
    }
}

#[test]
fn progress_starts_at_zero() {
    assert_eq!(
        Decoder::default().progress(),
        Progress {
            total_parts: 0,
            parts_received: 0
        }
    );
}
