//! Veil (Verifiable ELgamal poker)
//!
//! Mental Poker (1979) implemented using ElGamal over the Baby Jubjub curve.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

use alloy_primitives::U256;

use crate::{
    error::{JubError, Result},
    field::is_canonical,
    point::Point,
    types::{PublicKey, SecretKey},
};

pub const FIELD_ELEMENT_LEN: usize = 32;

/// Fixed-width encoding, least significant byte first.
pub fn field_to_bytes(value: &U256) -> [u8; FIELD_ELEMENT_LEN] {
    value.to_le_bytes::<FIELD_ELEMENT_LEN>()
}

pub fn fields_to_bytes(values: &[U256]) -> Vec<u8> {
    let mut result = Vec::with_capacity(values.len() * FIELD_ELEMENT_LEN);
    for value in values {
        result.extend_from_slice(&field_to_bytes(value));
    }
    result
}

pub fn u256_from_slice(data: &[u8]) -> Result<U256> {
    if data.len() != FIELD_ELEMENT_LEN {
        return Err(JubError::InvalidLength {
            expected: FIELD_ELEMENT_LEN,
            got: data.len(),
        });
    }
    Ok(U256::from_le_slice(data))
}

pub fn make_field_from_slice(data: &[u8]) -> Result<U256> {
    let value = u256_from_slice(data)?;
    if !is_canonical(&value) {
        return Err(JubError::NotCanonical(value));
    }
    Ok(value)
}

pub fn make_public_key_from_secret_key(sk: &SecretKey) -> PublicKey {
    Point::generator().mul(sk)
}

/// Serde codec for field elements as decimal strings, the way the ledger's
/// JSON renders `u256`.
pub mod decimal {
    use alloy_primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let text = String::deserialize(deserializer)?;
        U256::from_str_radix(&text, 10).map_err(D::Error::custom)
    }
}
