//! Veil (Verifiable ELgamal poker)
//!
//! Mental Poker (1979) implemented using ElGamal over the Baby Jubjub curve.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

use std::fmt;

use alloy_primitives::{B256, Keccak256, U256};
use serde::{Deserialize, Serialize};
use veil_jub::{
    Point,
    compress::CompressedPoint,
    types::{PublicKey, SecretKey},
    util::{FIELD_ELEMENT_LEN, fields_to_bytes, make_field_from_slice},
};

use crate::error::{PkrError, Result};

pub const CARD_SUITS: &[u8; 4] = b"SCHD";
pub const CARD_RANKS: &[u8; 13] = b"AKQJT98765432";

/// Index into the canonical deck: suit is `i / 13`, rank is `i % 13`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardIndex(pub u8);

impl CardIndex {
    pub fn suit(&self) -> char {
        let suit = (self.0 / 13).min(3);
        CARD_SUITS[suit as usize] as char
    }

    pub fn rank(&self) -> char {
        CARD_RANKS[(self.0 % 13) as usize] as char
    }

    pub fn to_readable(&self) -> (char, char) {
        (self.suit(), self.rank())
    }

    pub const fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CardIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank(), self.suit())
    }
}

/// Hands are reported on chain as a bitset over card indices.
pub fn parse_card_bits(bits: U256) -> Vec<CardIndex> {
    (0..bits.bit_len())
        .filter(|&i| bits.bit(i))
        .map(|i| CardIndex(i as u8))
        .collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CipherText {
    pub c1: Point,
    pub c2: Point,
}

impl CipherText {
    pub const fn new(c1: Point, c2: Point) -> Self {
        Self { c1, c2 }
    }

    /// Encryption of `message` with zero randomness
    pub const fn plain(message: Point) -> Self {
        Self {
            c1: Point::identity(),
            c2: message,
        }
    }

    pub fn add(&self, other: &Self) -> Self {
        Self {
            c1: self.c1 + other.c1,
            c2: self.c2 + other.c2,
        }
    }

    pub fn compress(&self) -> CompressedCipherText {
        CompressedCipherText {
            c1: self.c1.compress(),
            c2: self.c2.compress(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompressedCipherText {
    pub c1: CompressedPoint,
    pub c2: CompressedPoint,
}

impl CompressedCipherText {
    pub fn decompress(&self) -> Result<CipherText> {
        Ok(CipherText {
            c1: self.c1.decompress()?,
            c2: self.c2.decompress()?,
        })
    }
}

pub fn decompress_deck(cards: &[CompressedCipherText]) -> Result<Vec<CipherText>> {
    cards.iter().map(|c| c.decompress()).collect()
}

/// Plain encryptions of `M_i = (i + 1)·G`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanonicalDeck {
    cards: Vec<CipherText>,
}

impl CanonicalDeck {
    pub fn new(size: usize) -> Self {
        let g = Point::generator();
        let mut current = g;
        let mut cards = Vec::with_capacity(size);
        for _ in 0..size {
            cards.push(CipherText::plain(current));
            current = current + g;
        }
        Self { cards }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[CipherText] {
        &self.cards
    }

    pub fn message(&self, card: CardIndex) -> Option<&Point> {
        self.cards.get(card.as_usize()).map(|ct| &ct.c2)
    }

    pub fn find_card(&self, point: &Point) -> Option<CardIndex> {
        self.cards
            .iter()
            .position(|ct| ct.c2 == *point)
            .map(|i| CardIndex(i as u8))
    }

    pub fn resolve(&self, point: &Point) -> Result<CardIndex> {
        self.find_card(point)
            .ok_or(PkrError::PointNotInDeck(*point))
    }
}

/// Deck in its on-chain form: x-coordinates plus one sign bit per point.
///
/// Bit `2i` of `flags` belongs to `c1` of card `i`, bit `2i + 1` to its `c2`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedDeck {
    #[serde(with = "decimal_vec")]
    pub c1x: Vec<U256>,
    #[serde(with = "decimal_vec")]
    pub c2x: Vec<U256>,
    #[serde(with = "veil_jub::util::decimal")]
    pub flags: U256,
}

const MAX_FLAGGED_CARDS: usize = 128;

pub fn compress_deck(deck: &[CipherText]) -> Result<CompressedDeck> {
    if deck.len() > MAX_FLAGGED_CARDS {
        return Err(PkrError::InvalidDeck {
            expected: MAX_FLAGGED_CARDS,
            got: deck.len(),
        });
    }
    let mut result = CompressedDeck {
        c1x: Vec::with_capacity(deck.len()),
        c2x: Vec::with_capacity(deck.len()),
        flags: U256::ZERO,
    };
    for (i, ct) in deck.iter().enumerate() {
        let compressed = ct.compress();
        result.c1x.push(compressed.c1.x);
        result.c2x.push(compressed.c2.x);
        result.flags.set_bit(2 * i, compressed.c1.flag);
        result.flags.set_bit(2 * i + 1, compressed.c2.flag);
    }
    Ok(result)
}

impl CompressedDeck {
    pub fn len(&self) -> usize {
        self.c1x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.c1x.is_empty()
    }

    pub fn cipher_texts(&self) -> Vec<CompressedCipherText> {
        self.c1x
            .iter()
            .zip(self.c2x.iter())
            .enumerate()
            .map(|(i, (c1x, c2x))| CompressedCipherText {
                c1: CompressedPoint {
                    x: *c1x,
                    flag: self.flags.bit(2 * i),
                },
                c2: CompressedPoint {
                    x: *c2x,
                    flag: self.flags.bit(2 * i + 1),
                },
            })
            .collect()
    }

    pub fn decompress(&self) -> Result<Vec<CipherText>> {
        decompress_deck(&self.cipher_texts())
    }

    /// `flags ‖ (c1x, c2x)*`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut fields = Vec::with_capacity(1 + 2 * self.len());
        fields.push(self.flags);
        for (c1x, c2x) in self.c1x.iter().zip(self.c2x.iter()) {
            fields.push(*c1x);
            fields.push(*c2x);
        }
        fields_to_bytes(&fields)
    }

    /// Commitment used to tell shuffled decks apart in logs and dedup
    pub fn hash(&self) -> B256 {
        let mut hasher = Keccak256::new();
        hasher.update(self.to_bytes());
        hasher.finalize()
    }
}

/// `(c1x, c1y, c2x, c2y)` per card
pub fn serialize_uncompressed_deck(deck: &[CipherText]) -> Vec<u8> {
    let fields: Vec<U256> = deck
        .iter()
        .flat_map(|ct| [ct.c1.x, ct.c1.y, ct.c2.x, ct.c2.y])
        .collect();
    fields_to_bytes(&fields)
}

pub fn decompress_deserialize_deck(bytes: &[u8], size: usize) -> Result<Vec<CipherText>> {
    let card_len = 2 * FIELD_ELEMENT_LEN;
    if bytes.len() != FIELD_ELEMENT_LEN + size * card_len {
        return Err(PkrError::InvalidDeck {
            expected: size,
            got: bytes.len().saturating_sub(FIELD_ELEMENT_LEN) / card_len,
        });
    }
    let flags = make_field_from_slice(&bytes[..FIELD_ELEMENT_LEN])?;
    if flags.bit_len() > 2 * size {
        return Err(PkrError::InvalidFlags(flags));
    }

    let mut deck = CompressedDeck {
        c1x: Vec::with_capacity(size),
        c2x: Vec::with_capacity(size),
        flags,
    };
    for card in bytes[FIELD_ELEMENT_LEN..].chunks_exact(card_len) {
        deck.c1x.push(make_field_from_slice(&card[..FIELD_ELEMENT_LEN])?);
        deck.c2x.push(make_field_from_slice(&card[FIELD_ELEMENT_LEN..])?);
    }
    deck.decompress()
}

/// Encryptions of the identity: `(r·G, r·PK)` per scalar
pub fn zero_encrypt(rands: &[U256], public_key: &PublicKey) -> Vec<CipherText> {
    let g = Point::generator();
    rands
        .iter()
        .map(|r| CipherText::new(g.mul(r), public_key.mul(r)))
        .collect()
}

pub fn partial_decrypt(sk: &SecretKey, c1: &Point) -> Point {
    c1.mul(sk)
}

/// `c2 - Σ d_i`
pub fn strip_decrypts(c2: &Point, decrypts: &[Point]) -> Point {
    decrypts.iter().fold(*c2, |acc, d| acc - *d)
}

pub fn apply_decrypts(
    deck: &CanonicalDeck,
    cipher_text: &CipherText,
    decrypts: &[Point],
) -> Result<CardIndex> {
    deck.resolve(&strip_decrypts(&cipher_text.c2, decrypts))
}

/// Owner opens a card alone by removing their own share last.
pub fn private_decrypt(
    deck: &CanonicalDeck,
    cipher_text: &CipherText,
    decrypts: &[Point],
    sk: &SecretKey,
) -> Result<CardIndex> {
    let own = partial_decrypt(sk, &cipher_text.c1);
    deck.resolve(&(strip_decrypts(&cipher_text.c2, decrypts) - own))
}

pub mod decimal_vec {
    use alloy_primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer, de::Error, ser::SerializeSeq};

    pub fn serialize<S: Serializer>(values: &[U256], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&value.to_string())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<U256>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|s| U256::from_str_radix(s, 10).map_err(D::Error::custom))
            .collect()
    }
}
