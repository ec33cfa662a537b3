//! Veil (Verifiable ELgamal poker)
//!
//! Mental Poker (1979) implemented using ElGamal over the Baby Jubjub curve.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

//! Per-process caches, passed explicitly to whoever needs them

use std::collections::{HashMap, hash_map::Entry};

use tracing::debug;
use veil_jub::{Point, types::{PublicKey, SecretKey}};

use crate::{
    error::Result,
    poker_actions::{Action, actions_are_same},
    poker_deck::CanonicalDeck,
    poker_shuffle::ZeroEncryption,
    poker_state::{DECK_SIZE, ObjectId},
    prover::{Circuit, ProofOracle, ProofOutput, decrypt_witness},
};

#[derive(Clone, Debug, Default)]
pub struct DeckCache {
    decks: HashMap<usize, CanonicalDeck>,
}

impl DeckCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, size: usize) -> &CanonicalDeck {
        self.decks
            .entry(size)
            .or_insert_with(|| CanonicalDeck::new(size))
    }

    pub fn standard(&mut self) -> &CanonicalDeck {
        self.get(DECK_SIZE)
    }
}

/// Zero-encryptions keyed by game and valid only for the group key they
/// were made for.
#[derive(Clone, Debug, Default)]
pub struct ZeroEncryptionCache {
    entries: HashMap<ObjectId, ZeroEncryption>,
}

impl ZeroEncryptionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, game_id: &ObjectId, group_key: &PublicKey) -> Option<&ZeroEncryption> {
        self.entries
            .get(game_id)
            .filter(|zero| zero.is_for(group_key))
    }

    /// Removes the entry so it is used for one shuffle only.
    pub fn take(&mut self, game_id: &ObjectId, group_key: &PublicKey) -> Option<ZeroEncryption> {
        if self.get(game_id, group_key).is_none() {
            return None;
        }
        self.entries.remove(game_id)
    }

    pub fn insert(&mut self, game_id: ObjectId, zero: ZeroEncryption) {
        self.entries.insert(game_id, zero);
    }

    /// Drops the entry of `game_id` if the group key moved on, returns whether
    /// a valid entry remains.
    pub fn invalidate_stale(&mut self, game_id: &ObjectId, group_key: &PublicKey) -> bool {
        match self.entries.get(game_id) {
            Some(zero) if zero.is_for(group_key) => true,
            Some(_) => {
                debug!(%game_id, "group key changed, dropping zero-encryption");
                self.entries.remove(game_id);
                false
            }
            None => false,
        }
    }

    pub fn get_or_try_insert_with<F>(
        &mut self,
        game_id: ObjectId,
        group_key: &PublicKey,
        make: F,
    ) -> Result<&ZeroEncryption>
    where
        F: FnOnce() -> Result<ZeroEncryption>,
    {
        self.invalidate_stale(&game_id, group_key);
        let zero = match self.entries.entry(game_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(make()?),
        };
        Ok(zero)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decrypt proofs computed ahead of time, keyed by the `c1` they open
#[derive(Clone, Debug, Default)]
pub struct DecryptProofCache {
    proofs: HashMap<Point, ProofOutput>,
}

impl DecryptProofCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, c1: &Point) -> Option<&ProofOutput> {
        self.proofs.get(c1)
    }

    pub fn insert(&mut self, c1: Point, proof: ProofOutput) {
        self.proofs.insert(c1, proof);
    }

    pub fn precompute(
        &mut self,
        oracle: &dyn ProofOracle,
        sk: &SecretKey,
        c1s: &[Point],
    ) -> Result<usize> {
        let mut added = 0;
        for c1 in c1s {
            if self.proofs.contains_key(c1) {
                continue;
            }
            let proof = oracle.prove(Circuit::Decrypt, &decrypt_witness(c1, sk))?;
            self.proofs.insert(*c1, proof);
            added += 1;
        }
        Ok(added)
    }

    pub fn clear(&mut self) {
        self.proofs.clear();
    }

    pub fn len(&self) -> usize {
        self.proofs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proofs.is_empty()
    }
}

/// Last action attempted per game, so polling does not resubmit it
#[derive(Clone, Debug, Default)]
pub struct DedupTracker {
    performed: HashMap<ObjectId, Action>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_duplicate(&self, game_id: &ObjectId, action: &Action) -> bool {
        self.performed
            .get(game_id)
            .is_some_and(|last| actions_are_same(last, action))
    }

    /// Stricter check for callers whose actions differ only in payload, such
    /// as the admin adding successive decrypt batches.
    pub fn is_exact_repeat(&self, game_id: &ObjectId, action: &Action) -> bool {
        self.performed.get(game_id) == Some(action)
    }

    pub fn record(&mut self, game_id: ObjectId, action: Action) {
        self.performed.insert(game_id, action);
    }
}
