//! Veil (Verifiable ELgamal poker)
//!
//! Mental Poker (1979) implemented using ElGamal over the Baby Jubjub curve.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

use alloy_primitives::U256;

use crate::point::Point;

/// Scalars are plain integers below the subgroup order.
pub type Scalar = U256;
pub type SecretKey = U256;
pub type PublicKey = Point;
