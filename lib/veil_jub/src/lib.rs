//! Veil (Verifiable ELgamal poker)
//!
//! Mental Poker (1979) implemented using ElGamal over the Baby Jubjub curve.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

pub mod compress;
pub mod error;
pub mod field;
pub mod groth16;
pub mod point;
pub mod scalar;
pub mod types;
pub mod util;

pub use error::{JubError, Result};
pub use point::Point;
