//! Veil (Verifiable ELgamal poker)
//!
//! Mental Poker (1979) implemented using ElGamal over the Baby Jubjub curve.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

//! Scalar sampling

use alloy_primitives::{U256, aliases::U512};
use rand_core::RngCore;

use crate::point::SUB_ORDER;

/// Draws twice the bit length of `modulus` in random bytes and reduces.
///
/// This is biased rather than uniform. The shuffle and key circuits deployed
/// on chain were built against exactly this sampler, so keep it as is.
pub fn random_scalar<R: RngCore + ?Sized>(modulus: &U256, rng: &mut R) -> U256 {
    if modulus.is_zero() {
        return U256::ZERO;
    }
    let n_bytes = (2 * modulus.bit_len()).div_ceil(8);
    let mut bytes = vec![0u8; n_bytes];
    rng.fill_bytes(&mut bytes);

    let wide = U512::from_be_slice(&bytes);
    let wide_modulus = U512::from_le_slice(&modulus.to_le_bytes::<32>());
    let reduced = (wide % wide_modulus).to_le_bytes::<64>();
    U256::from_le_slice(&reduced[..32])
}

pub fn random_scalars<R: RngCore + ?Sized>(count: usize, rng: &mut R) -> Vec<U256> {
    (0..count).map(|_| random_scalar(&SUB_ORDER, rng)).collect()
}

pub fn generate_secret_key<R: RngCore + ?Sized>(rng: &mut R) -> U256 {
    random_scalar(&SUB_ORDER, rng)
}
