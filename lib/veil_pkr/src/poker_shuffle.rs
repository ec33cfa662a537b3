//! Veil (Verifiable ELgamal poker)
//!
//! Mental Poker (1979) implemented using ElGamal over the Baby Jubjub curve.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

use alloy_primitives::U256;
use rand::{Rng, seq::SliceRandom};
use veil_jub::{scalar::random_scalars, types::PublicKey};

use crate::{
    error::{PkrError, Result},
    poker_deck::{CipherText, zero_encrypt},
    prover::ProofOutput,
};

/// Square 0/1 matrix; `M[i][j] = 1` moves input `j` to output `i`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Permutation {
    matrix: Vec<Vec<u8>>,
}

impl Permutation {
    pub fn identity(size: usize) -> Self {
        let matrix = (0..size)
            .map(|i| (0..size).map(|j| u8::from(i == j)).collect())
            .collect();
        Self { matrix }
    }

    pub fn from_matrix(matrix: Vec<Vec<u8>>) -> Result<Self> {
        let result = Self { matrix };
        if !result.is_valid() {
            return Err(PkrError::InvalidPermutation);
        }
        Ok(result)
    }

    /// Fisher-Yates over the index vector, then `M[idx[i]][i] = 1`.
    pub fn random<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Self {
        let mut indices: Vec<usize> = (0..size).collect();
        indices.shuffle(rng);

        let mut matrix = vec![vec![0u8; size]; size];
        for (i, idx) in indices.into_iter().enumerate() {
            matrix[idx][i] = 1;
        }
        Self { matrix }
    }

    pub fn size(&self) -> usize {
        self.matrix.len()
    }

    pub fn matrix(&self) -> &[Vec<u8>] {
        &self.matrix
    }

    /// Every row and every column sums to exactly one.
    pub fn is_valid(&self) -> bool {
        let n = self.size();
        if self.matrix.iter().any(|row| row.len() != n) {
            return false;
        }
        if self.matrix.iter().flatten().any(|v| *v > 1) {
            return false;
        }
        let rows_ok = self
            .matrix
            .iter()
            .all(|row| row.iter().map(|v| *v as usize).sum::<usize>() == 1);
        let cols_ok =
            (0..n).all(|j| self.matrix.iter().map(|row| row[j] as usize).sum::<usize>() == 1);
        rows_ok && cols_ok
    }

    /// Output position of input `j`
    pub fn target(&self, j: usize) -> Option<usize> {
        self.matrix
            .iter()
            .position(|row| row.get(j).is_some_and(|v| *v == 1))
    }

    /// Input position landing at output `i`
    pub fn source(&self, i: usize) -> Option<usize> {
        self.matrix.get(i)?.iter().position(|v| *v == 1)
    }

    pub fn inverse(&self) -> Self {
        let n = self.size();
        let matrix = (0..n)
            .map(|i| (0..n).map(|j| self.matrix[j][i]).collect())
            .collect();
        Self { matrix }
    }
}

pub fn random_permutation<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Permutation {
    Permutation::random(size, rng)
}

/// Re-randomises and relocates every card: `out[i] = in[j] + zero[j]` where `M[i][j] = 1`.
pub fn encrypt_shuffle(
    zero_encrypts: &[CipherText],
    inputs: &[CipherText],
    perm: &Permutation,
) -> Result<Vec<CipherText>> {
    let n = perm.size();
    for len in [zero_encrypts.len(), inputs.len()] {
        if len != n {
            return Err(PkrError::InvalidDeck {
                expected: n,
                got: len,
            });
        }
    }
    (0..n)
        .map(|i| {
            let j = perm.source(i).ok_or(PkrError::InvalidPermutation)?;
            Ok(inputs[j].add(&zero_encrypts[j]))
        })
        .collect()
}

/// Blinding material for one shuffle, tied to the group key it was made for
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZeroEncryption {
    pub rands: Vec<U256>,
    pub cipher_texts: Vec<CipherText>,
    pub public_key: PublicKey,
    pub proof: Option<ProofOutput>,
}

impl ZeroEncryption {
    pub fn new<R: Rng + ?Sized>(public_key: &PublicKey, size: usize, rng: &mut R) -> Self {
        let rands = random_scalars(size, rng);
        Self::from_rands(rands, public_key)
    }

    pub fn from_rands(rands: Vec<U256>, public_key: &PublicKey) -> Self {
        let cipher_texts = zero_encrypt(&rands, public_key);
        Self {
            rands,
            cipher_texts,
            public_key: *public_key,
            proof: None,
        }
    }

    pub fn with_proof(mut self, proof: ProofOutput) -> Self {
        self.proof = Some(proof);
        self
    }

    pub fn is_for(&self, public_key: &PublicKey) -> bool {
        self.public_key == *public_key
    }

    pub fn len(&self) -> usize {
        self.cipher_texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cipher_texts.is_empty()
    }
}
