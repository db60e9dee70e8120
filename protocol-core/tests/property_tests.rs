//! Property-based tests for the payload codec
//!
//! - Round-trip: decode then encode reproduces the ordered tag/value pairs
//! - Length: any payload whose length is not 36 × field count is rejected
//!   before its content is looked at

use proptest::prelude::*;
use protocol_core::codec::{payload_len, FieldSet, FieldTag, FieldValue, CHUNK_LEN};
use protocol_core::Error;
use std::collections::HashSet;

/// Strategy for generating distinct tag/value pairs
fn fields_strategy() -> impl Strategy<Value = Vec<([u8; 4], [u8; 32])>> {
    prop::collection::vec((any::<[u8; 4]>(), any::<[u8; 32]>()), 1..12).prop_map(|pairs| {
        let mut seen = HashSet::new();
        pairs
            .into_iter()
            .filter(|(tag, _)| seen.insert(*tag))
            .collect()
    })
}

fn encode_raw(pairs: &[([u8; 4], [u8; 32])]) -> Vec<u8> {
    let mut out = Vec::new();
    for (tag, value) in pairs {
        out.extend_from_slice(tag);
        out.extend_from_slice(value);
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Property: decode → encode reconstructs the identical ordered pairs
    #[test]
    fn prop_round_trip(pairs in fields_strategy()) {
        let payload = encode_raw(&pairs);
        let set = FieldSet::decode_exact(&payload, pairs.len()).unwrap();

        let decoded: Vec<_> = set
            .iter()
            .map(|(tag, value)| (*tag.as_bytes(), *value.as_bytes()))
            .collect();
        prop_assert_eq!(&decoded, &pairs);
        prop_assert_eq!(set.encode(), payload);
    }

    /// Property: wrong length always fails with InvalidPayloadLength, whatever the content
    #[test]
    fn prop_wrong_length_rejected(
        field_count in 1usize..8,
        payload in prop::collection::vec(any::<u8>(), 0..400),
    ) {
        prop_assume!(payload.len() != payload_len(field_count));

        let result = FieldSet::decode_exact(&payload, field_count);
        prop_assert_eq!(
            result,
            Err(Error::InvalidPayloadLength {
                expected: field_count * CHUNK_LEN,
                actual: payload.len(),
            })
        );
    }

    /// Property: integer values survive the 256-bit encoding
    #[test]
    fn prop_u128_values(value in any::<u128>()) {
        let encoded = FieldValue::from_u128(value);
        prop_assert_eq!(encoded.as_u128(), Some(value));
        prop_assert_eq!(encoded.is_zero(), value == 0);
    }
}

#[test]
fn test_tag_addressed_lookup_ignores_order() {
    let debtor = FieldTag::new(*b"DBTR");
    let amount = FieldTag::new(*b"AMNT");

    let forward = FieldSet::new()
        .with(debtor, FieldValue::from_u128(7))
        .with(amount, FieldValue::from_u128(100));
    let reversed = FieldSet::new()
        .with(amount, FieldValue::from_u128(100))
        .with(debtor, FieldValue::from_u128(7));

    let forward = FieldSet::decode(&forward.encode()).unwrap();
    let reversed = FieldSet::decode(&reversed.encode()).unwrap();
    assert_eq!(forward.get(&amount), reversed.get(&amount));
    assert_eq!(forward.get(&debtor), reversed.get(&debtor));
}
