//! Veil (Verifiable ELgamal poker)
//!
//! Mental Poker (1979) implemented using ElGamal over the Baby Jubjub curve.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

use alloy_primitives::U256;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JubError {
    #[error("expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
    #[error("{0} is not a canonical field element")]
    NotCanonical(U256),
    #[error("x = {0} is not the x-coordinate of a curve point")]
    NoSquareRoot(U256),
}

pub type Result<T> = core::result::Result<T, JubError>;
