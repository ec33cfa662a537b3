//! Veil (Verifiable ELgamal poker)
//!
//! Mental Poker (1979) implemented using ElGamal over the Baby Jubjub curve.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

//! Boundary to the external Groth16 prover

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use veil_jub::{
    Point,
    groth16::{Groth16Proof, proof_to_bytes},
    types::SecretKey,
    util::fields_to_bytes,
};

use crate::{
    error::{PkrError, Result},
    poker_deck::{
        CanonicalDeck, CipherText, CompressedDeck, compress_deck, decimal_vec, strip_decrypts,
    },
    poker_shuffle::Permutation,
    poker_state::REVEAL_LENGTH,
};

/// Width of the `Add` circuit, shared with the reveal circuit
pub const ADD_LENGTH: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Circuit {
    PublicKey,
    Add,
    ZeroEncrypt,
    EncryptShuffle,
    Decrypt,
    Reveal,
    HashCompressed,
    HashUncompressed,
}

impl Circuit {
    pub const fn name(&self) -> &'static str {
        match self {
            Circuit::PublicKey => "pubkey",
            Circuit::Add => "add",
            Circuit::ZeroEncrypt => "zero_encrypt",
            Circuit::EncryptShuffle => "encrypt_shuffle",
            Circuit::Decrypt => "decrypt",
            Circuit::Reveal => "reveal",
            Circuit::HashCompressed => "hash_compressed",
            Circuit::HashUncompressed => "hash_uncompressed",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProverError {
    #[error("{} prover failed: {reason}", .circuit.name())]
    Failed { circuit: Circuit, reason: String },
    #[error("no proving key for {}", .0.name())]
    Unavailable(Circuit),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WitnessValue {
    Field(U256),
    Array(Vec<U256>),
    Matrix(Vec<Vec<U256>>),
}

/// Named circuit inputs, in the order the circuit declares them
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Witness {
    inputs: Vec<(&'static str, WitnessValue)>,
}

impl Witness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: &'static str, value: U256) -> Self {
        self.inputs.push((name, WitnessValue::Field(value)));
        self
    }

    pub fn with_array(mut self, name: &'static str, values: Vec<U256>) -> Self {
        self.inputs.push((name, WitnessValue::Array(values)));
        self
    }

    pub fn with_matrix(mut self, name: &'static str, values: Vec<Vec<U256>>) -> Self {
        self.inputs.push((name, WitnessValue::Matrix(values)));
        self
    }

    pub fn get(&self, name: &str) -> Option<&WitnessValue> {
        self.inputs
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    pub fn get_field(&self, name: &str) -> Option<U256> {
        match self.get(name)? {
            WitnessValue::Field(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_array(&self, name: &str) -> Option<&[U256]> {
        match self.get(name)? {
            WitnessValue::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn inputs(&self) -> &[(&'static str, WitnessValue)] {
        &self.inputs
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOutput {
    pub proof: Groth16Proof,
    #[serde(with = "decimal_vec")]
    pub public_signals: Vec<U256>,
}

impl ProofOutput {
    pub fn proof_bytes(&self) -> Vec<u8> {
        proof_to_bytes(&self.proof)
    }

    pub fn public_signal_bytes(&self) -> Vec<u8> {
        fields_to_bytes(&self.public_signals)
    }
}

/// Proof generation may block for seconds.
pub trait ProofOracle: Send + Sync {
    fn prove(
        &self,
        circuit: Circuit,
        witness: &Witness,
    ) -> core::result::Result<ProofOutput, ProverError>;
}

pub fn public_key_witness(sk: &SecretKey) -> Witness {
    Witness::new().with_field("in", *sk)
}

/// Sums up to [`ADD_LENGTH`] points; unused slots are the identity.
pub fn add_witness(points: &[Point]) -> Result<Witness> {
    let (x, y) = padded_coordinates(points, ADD_LENGTH)?;
    Ok(Witness::new().with_array("x", x).with_array("y", y))
}

pub fn zero_encrypt_witness(rands: &[U256], public_key: &Point) -> Witness {
    Witness::new()
        .with_array("randomVal", rands.to_vec())
        .with_field("pubKey_x", public_key.x)
        .with_field("pubKey_y", public_key.y)
}

pub fn encrypt_shuffle_witness(
    zero_encrypts: &[CipherText],
    inputs: &[CipherText],
    perm: &Permutation,
) -> Witness {
    let matrix = perm
        .matrix()
        .iter()
        .map(|row| row.iter().map(|v| U256::from(*v)).collect())
        .collect();
    Witness::new()
        .with_array("in_c1x", inputs.iter().map(|ct| ct.c1.x).collect())
        .with_array("in_c1y", inputs.iter().map(|ct| ct.c1.y).collect())
        .with_array("in_c2x", inputs.iter().map(|ct| ct.c2.x).collect())
        .with_array("in_c2y", inputs.iter().map(|ct| ct.c2.y).collect())
        .with_matrix("M", matrix)
        .with_array("zeros_c1x", zero_encrypts.iter().map(|ct| ct.c1.x).collect())
        .with_array("zeros_c1y", zero_encrypts.iter().map(|ct| ct.c1.y).collect())
        .with_array("zeros_c2x", zero_encrypts.iter().map(|ct| ct.c2.x).collect())
        .with_array("zeros_c2y", zero_encrypts.iter().map(|ct| ct.c2.y).collect())
}

pub fn decrypt_witness(c1: &Point, sk: &SecretKey) -> Witness {
    Witness::new()
        .with_field("c1_x", c1.x)
        .with_field("c1_y", c1.y)
        .with_field("privKey", *sk)
}

/// Public card is the index plus one, so zero never names a card.
pub fn reveal_witness(deck: &CanonicalDeck, c2: &Point, decrypts: &[Point]) -> Result<Witness> {
    let card = deck.resolve(&strip_decrypts(c2, decrypts))?;
    let (decrypt_x, decrypt_y) = padded_coordinates(decrypts, REVEAL_LENGTH)?;
    Ok(Witness::new()
        .with_field("card", U256::from(card.0) + U256::ONE)
        .with_field("c2x", c2.x)
        .with_field("c2y", c2.y)
        .with_array("decryptx", decrypt_x)
        .with_array("decrypty", decrypt_y))
}

pub fn hash_compressed_witness(deck: &CompressedDeck) -> Witness {
    Witness::new()
        .with_array("c1x", deck.c1x.clone())
        .with_array("c2x", deck.c2x.clone())
        .with_field("flags", deck.flags)
}

pub fn hash_uncompressed_witness(deck: &[CipherText]) -> Witness {
    Witness::new()
        .with_array("c1x", deck.iter().map(|ct| ct.c1.x).collect())
        .with_array("c1y", deck.iter().map(|ct| ct.c1.y).collect())
        .with_array("c2x", deck.iter().map(|ct| ct.c2.x).collect())
        .with_array("c2y", deck.iter().map(|ct| ct.c2.y).collect())
}

/// Proves the commitment of `deck` in its compressed or uncompressed layout.
pub fn prove_deck_hash<O: ProofOracle + ?Sized>(
    oracle: &O,
    deck: &[CipherText],
    compressed: bool,
) -> Result<ProofOutput> {
    let proof = if compressed {
        oracle.prove(Circuit::HashCompressed, &hash_compressed_witness(&compress_deck(deck)?))?
    } else {
        oracle.prove(Circuit::HashUncompressed, &hash_uncompressed_witness(deck))?
    };
    Ok(proof)
}

fn padded_coordinates(points: &[Point], width: usize) -> Result<(Vec<U256>, Vec<U256>)> {
    if points.len() > width {
        return Err(PkrError::TooManyDecrypts {
            max: width,
            got: points.len(),
        });
    }
    let identity = Point::identity();
    let padded = points
        .iter()
        .chain(std::iter::repeat_n(&identity, width - points.len()));
    Ok(padded.map(|p| (p.x, p.y)).unzip())
}
