//! Proptest generators for property-based testing.

use proptest::prelude::*;

use sidechain_core::{Fixed64, Hash256, Keypair, OutPoint, ProgramHash, TokenValue};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random Hash256.
pub fn hash256() -> impl Strategy<Value = Hash256> {
    any::<[u8; 32]>().prop_map(Hash256::from_bytes)
}

/// Generate the program hash of a random standard key.
pub fn standard_program_hash() -> impl Strategy<Value = ProgramHash> {
    keypair().prop_map(|kp| kp.program_hash())
}

/// Generate a reference to a random prior output (never the coinbase sentinel).
pub fn out_point() -> impl Strategy<Value = OutPoint> {
    (hash256(), 0u16..64).prop_map(|(tx_id, index)| OutPoint::new(tx_id, index))
}

/// Generate a positive native amount small enough that thousands of them
/// sum without overflow.
pub fn native_amount() -> impl Strategy<Value = Fixed64> {
    (1i64..=1_000_000_000_000).prop_map(Fixed64::from_raw)
}

/// Generate a non-negative token amount at 18-decimal scale.
pub fn token_amount() -> impl Strategy<Value = TokenValue> {
    (0u64..=1_000_000).prop_map(|units| TokenValue::from(units) * TokenValue::from(10u64).pow(18))
}

/// Generate input values and output values of a spend whose outputs never
/// exceed its inputs.
pub fn balanced_spend(max_parts: usize) -> impl Strategy<Value = (Vec<Fixed64>, Vec<Fixed64>)> {
    prop::collection::vec(native_amount(), 1..=max_parts).prop_flat_map(move |inputs| {
        let total: i64 = inputs.iter().map(|v| v.raw()).sum();
        let outputs = prop::collection::vec(0i64..=total / max_parts as i64, 1..=max_parts)
            .prop_map(|values| values.into_iter().map(Fixed64::from_raw).collect::<Vec<_>>());
        (Just(inputs), outputs)
    })
}
