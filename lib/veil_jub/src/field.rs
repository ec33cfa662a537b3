//! Veil (Verifiable ELgamal poker)
//!
//! Mental Poker (1979) implemented using ElGamal over the Baby Jubjub curve.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

//! Base field of Baby Jubjub (the BN254 scalar field)

use alloy_primitives::U256;
use ff::{Field, PrimeField};

use crate::error::{JubError, Result};

#[derive(PrimeField)]
#[PrimeFieldModulus = "21888242871839275222246405745257275088548364400416034343698204186575808495617"]
#[PrimeFieldGenerator = "5"]
#[PrimeFieldReprEndianness = "little"]
pub struct Fq([u64; 4]);

pub const FIELD_MODULUS: U256 = U256::from_limbs([
    0x43e1f593f0000001,
    0x2833e84879b97091,
    0xb85045b68181585d,
    0x30644e72e131a029,
]);

/// (p - 1) / 2, the largest "positive" canonical representative
pub const FIELD_HALF: U256 = U256::from_limbs([
    0xa1f0fac9f8000000,
    0x9419f4243cdcb848,
    0xdc2822db40c0ac2e,
    0x183227397098d014,
]);

pub fn is_canonical(value: &U256) -> bool {
    *value < FIELD_MODULUS
}

pub fn to_fq(value: &U256) -> Result<Fq> {
    let mut repr = <Fq as PrimeField>::Repr::default();
    repr.as_mut().copy_from_slice(&value.to_le_bytes::<32>());
    Option::from(Fq::from_repr(repr)).ok_or(JubError::NotCanonical(*value))
}

/// Reduces first, so it accepts any integer.
pub fn to_fq_reduced(value: &U256) -> Fq {
    let reduced = value.reduce_mod(FIELD_MODULUS);
    let mut repr = <Fq as PrimeField>::Repr::default();
    repr.as_mut().copy_from_slice(&reduced.to_le_bytes::<32>());
    Fq::from_repr(repr).unwrap_or(Fq::ZERO)
}

pub fn from_fq(value: &Fq) -> U256 {
    U256::from_le_slice(value.to_repr().as_ref())
}

pub fn neg(value: U256) -> U256 {
    from_fq(&-to_fq_reduced(&value))
}

pub fn add(a: U256, b: U256) -> U256 {
    from_fq(&(to_fq_reduced(&a) + to_fq_reduced(&b)))
}

pub fn mul(a: U256, b: U256) -> U256 {
    from_fq(&(to_fq_reduced(&a) * to_fq_reduced(&b)))
}

pub fn invert(value: U256) -> Option<U256> {
    Option::from(to_fq_reduced(&value).invert()).map(|v: Fq| from_fq(&v))
}

/// Returns one of the two roots; which one is unspecified, callers choose the
/// sign they need with [`is_negative`].
pub fn sqrt(value: U256) -> Option<U256> {
    Option::from(to_fq_reduced(&value).sqrt()).map(|v: Fq| from_fq(&v))
}

/// The sign convention of the point codec: `y > -y mod p`.
pub fn is_negative(value: U256) -> bool {
    value > neg(value)
}
