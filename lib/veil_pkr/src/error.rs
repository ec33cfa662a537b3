//! Veil (Verifiable ELgamal poker)
//!
//! Mental Poker (1979) implemented using ElGamal over the Baby Jubjub curve.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

use alloy_primitives::U256;
use thiserror::Error;
use veil_jub::{JubError, Point};

use crate::{
    poker_actions::{ActionType, InputKind},
    poker_state::Address,
    prover::ProverError,
};

#[derive(Error, Debug)]
pub enum PkrError {
    #[error("point ({}, {}) is not a card of the canonical deck", .0.x, .0.y)]
    PointNotInDeck(Point),
    #[error("{action:?} requires caller input {input:?}")]
    MissingInput {
        action: ActionType,
        input: InputKind,
    },
    #[error("deck of {got} cards does not fit {expected}")]
    InvalidDeck { expected: usize, got: usize },
    #[error("{got} decrypt shares exceed the reveal circuit width of {max}")]
    TooManyDecrypts { max: usize, got: usize },
    #[error("invalid permutation matrix")]
    InvalidPermutation,
    #[error("player {0} is not seated at this table")]
    UnknownPlayer(Address),
    #[error("player index {0} out of range")]
    PlayerIndex(usize),
    #[error("flags word {0} does not fit the deck")]
    InvalidFlags(U256),
    #[error("zero-encryption was made for a different group key")]
    StaleZeroEncryption,
    #[error(transparent)]
    Prover(#[from] ProverError),
    #[error(transparent)]
    Curve(#[from] JubError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, PkrError>;
