//! Veil (Verifiable ELgamal poker)
//!
//! Mental Poker (1979) implemented using ElGamal over the Baby Jubjub curve.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

pub mod cache;
pub mod error;
pub mod poker_actions;
pub mod poker_bets;
pub mod poker_calls;
pub mod poker_deck;
pub mod poker_shuffle;
pub mod poker_state;
pub mod poker_table;
pub mod prover;

pub use error::{PkrError, Result};

#[cfg(test)]
pub mod tests;
