//! Veil (Verifiable ELgamal poker)
//!
//! Mental Poker (1979) implemented using ElGamal over the Baby Jubjub curve.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

//! Byte layout of BN254 Groth16 proofs as the ledger verifier reads them

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::util::field_to_bytes;

/// Base field of BN254 (proof points live here, not in the Jubjub field)
pub const BN254_BASE_MODULUS: U256 = U256::from_limbs([
    0x3c208c16d87cfd47,
    0x97816a916871ca8d,
    0xb85045b68181585d,
    0x30644e72e131a029,
]);

pub const G1_COMPRESSED_LEN: usize = 32;
pub const G2_COMPRESSED_LEN: usize = 64;
pub const PROOF_COMPRESSED_LEN: usize = 2 * G1_COMPRESSED_LEN + G2_COMPRESSED_LEN;

const SIGN_BIT: u8 = 0x80;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct G1Affine {
    #[serde(with = "crate::util::decimal")]
    pub x: U256,
    #[serde(with = "crate::util::decimal")]
    pub y: U256,
}

/// Coordinates in Fq2 as `[c0, c1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct G2Affine {
    pub x: [Fq2Element; 2],
    pub y: [Fq2Element; 2],
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fq2Element(#[serde(with = "crate::util::decimal")] pub U256);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Groth16Proof {
    pub pi_a: G1Affine,
    pub pi_b: G2Affine,
    pub pi_c: G1Affine,
}

fn neg_mod_q(value: U256) -> U256 {
    let value = value.reduce_mod(BN254_BASE_MODULUS);
    if value.is_zero() {
        value
    } else {
        BN254_BASE_MODULUS - value
    }
}

fn is_negative(value: U256) -> bool {
    value > neg_mod_q(value)
}

pub fn g1_to_bytes(p: &G1Affine) -> [u8; G1_COMPRESSED_LEN] {
    let mut result = field_to_bytes(&p.x);
    if is_negative(p.y) {
        result[G1_COMPRESSED_LEN - 1] |= SIGN_BIT;
    }
    result
}

/// The sign is taken from the `c1` component of y.
pub fn g2_to_bytes(p: &G2Affine) -> [u8; G2_COMPRESSED_LEN] {
    let mut result = [0u8; G2_COMPRESSED_LEN];
    result[..32].copy_from_slice(&field_to_bytes(&p.x[0].0));
    result[32..].copy_from_slice(&field_to_bytes(&p.x[1].0));
    if is_negative(p.y[1].0) {
        result[G2_COMPRESSED_LEN - 1] |= SIGN_BIT;
    }
    result
}

pub fn proof_to_bytes(proof: &Groth16Proof) -> Vec<u8> {
    let mut result = Vec::with_capacity(PROOF_COMPRESSED_LEN);
    result.extend_from_slice(&g1_to_bytes(&proof.pi_a));
    result.extend_from_slice(&g2_to_bytes(&proof.pi_b));
    result.extend_from_slice(&g1_to_bytes(&proof.pi_c));
    result
}
