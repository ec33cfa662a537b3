//! Veil (Verifiable ELgamal poker)
//!
//! Mental Poker (1979) implemented using ElGamal over the Baby Jubjub curve.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

//! Ledger call payloads for each action

use rand::Rng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, info, warn};
use veil_jub::{Point, types::SecretKey};

use crate::{
    cache::{DecryptProofCache, DeckCache},
    error::{PkrError, Result},
    poker_actions::{Action, ActionType, InputKind, Payload, ShuffleSource},
    poker_bets::BetType,
    poker_deck::{CanonicalDeck, CipherText, compress_deck, serialize_uncompressed_deck},
    poker_shuffle::{ZeroEncryption, encrypt_shuffle, random_permutation},
    poker_state::{Address, GAME_MODULE, ObjectId},
    prover::{
        Circuit, ProofOracle, ProofOutput, add_witness, decrypt_witness, encrypt_shuffle_witness,
        public_key_witness, reveal_witness, zero_encrypt_witness,
    },
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallArg {
    Address(Address),
    Object(ObjectId),
    U8(u8),
    U64(u64),
    Bool(bool),
    /// Pure `vector<u8>` argument
    U8Vec(Vec<u8>),
    /// BCS encoded bytes, passed as a pure `vector<u8>`
    Bytes(Vec<u8>),
    Objects(Vec<ObjectId>),
    /// Coin of this amount split off the gas coin
    SplitGas(u64),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveCall {
    pub target: String,
    pub arguments: Vec<CallArg>,
}

impl MoveCall {
    pub fn new(package_id: &str, function: &str, arguments: Vec<CallArg>) -> Self {
        Self {
            target: format!("{}::{}::{}", package_id, GAME_MODULE, function),
            arguments,
        }
    }

    pub fn function(&self) -> &str {
        self.target.rsplit("::").next().unwrap_or_default()
    }
}

pub fn write_uleb128(mut value: usize, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// BCS `vector<u8>`
pub fn bcs_bytes(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 4);
    write_uleb128(data.len(), &mut out);
    out.extend_from_slice(data);
    out
}

/// BCS `vector<vector<u8>>`
pub fn bcs_bytes_vec(items: &[Vec<u8>]) -> Vec<u8> {
    let mut out = vec![];
    write_uleb128(items.len(), &mut out);
    for item in items {
        out.extend(bcs_bytes(item));
    }
    out
}

pub fn read_uleb128(data: &[u8]) -> Option<(usize, usize)> {
    let mut value = 0usize;
    for (i, byte) in data.iter().enumerate() {
        let bits = usize::from(byte & 0x7f).checked_shl(7 * i as u32)?;
        value |= bits;
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

/// Contents of a BCS `vector<u8>`, `None` if truncated
pub fn read_bcs_bytes(data: &[u8]) -> Option<&[u8]> {
    let (len, offset) = read_uleb128(data)?;
    data.get(offset..offset.checked_add(len)?)
}

/// Batch of proofs the contract reads as `vector<vector<u8>>` wrapped once more.
fn nested_bytes(items: &[Vec<u8>]) -> CallArg {
    CallArg::Bytes(bcs_bytes(&bcs_bytes_vec(items)))
}

fn proof_args(proof: &ProofOutput) -> [CallArg; 2] {
    [
        CallArg::Bytes(bcs_bytes(&proof.public_signal_bytes())),
        CallArg::Bytes(bcs_bytes(&proof.proof_bytes())),
    ]
}

pub fn return_bet(package_id: &str, bet_id: ObjectId) -> MoveCall {
    MoveCall::new(package_id, "return_bet", vec![CallArg::Object(bet_id)])
}

/// Calls that undo `performed` after the batch carrying them was rejected.
pub fn compensating_calls(package_id: &str, performed: &[Action]) -> Vec<MoveCall> {
    performed
        .iter()
        .filter_map(|action| match &action.payload {
            Payload::AddBet { bet_id, .. } => Some(return_bet(package_id, *bet_id)),
            _ => None,
        })
        .collect()
}

pub fn create_game(package_id: &str, admin: Address, small_blind: u64, big_blind: u64) -> MoveCall {
    MoveCall::new(
        package_id,
        "create_game2",
        vec![
            CallArg::Address(admin),
            CallArg::U64(small_blind),
            CallArg::U64(big_blind),
        ],
    )
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Role {
    Admin,
    Player(Address),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandlerConfig {
    pub package_id: String,
    pub role: Role,
}

/// What the caller decided for actions that declare [`InputKind`]s
#[derive(Clone, Debug, Default)]
pub struct CallerInputs {
    pub balance: Option<u64>,
    pub seat: Option<u8>,
    pub zero_encryption: Option<ZeroEncryption>,
    pub bet_type: Option<BetType>,
    pub amount: Option<u64>,
}

impl CallerInputs {
    pub fn has(&self, kind: InputKind) -> bool {
        match kind {
            InputKind::Balance => self.balance.is_some(),
            InputKind::Seat => self.seat.is_some(),
            InputKind::ZeroEncryption => self.zero_encryption.is_some(),
            InputKind::BetType => self.bet_type.is_some(),
            InputKind::Amount => self.amount.is_some(),
        }
    }
}

fn require<T>(value: Option<T>, action: ActionType, input: InputKind) -> Result<T> {
    value.ok_or(PkrError::MissingInput { action, input })
}

pub struct ActionHandler<'a, O: ProofOracle> {
    config: HandlerConfig,
    oracle: &'a O,
    secret_key: SecretKey,
    decks: DeckCache,
    decrypt_proofs: DecryptProofCache,
}

impl<'a, O: ProofOracle> ActionHandler<'a, O> {
    pub fn new(config: HandlerConfig, oracle: &'a O, secret_key: SecretKey) -> Self {
        Self {
            config,
            oracle,
            secret_key,
            decks: DeckCache::new(),
            decrypt_proofs: DecryptProofCache::new(),
        }
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub fn decrypt_proofs_mut(&mut self) -> &mut DecryptProofCache {
        &mut self.decrypt_proofs
    }

    pub fn handles(&self, action: &Action) -> bool {
        match &self.config.role {
            Role::Admin => action.admin,
            Role::Player(me) => !action.admin && action.is_from(me),
        }
    }

    /// Builds the call for `action`, or `None` when it is not ours to take.
    pub fn handle<R: Rng + ?Sized>(
        &mut self,
        action: &Action,
        inputs: CallerInputs,
        rng: &mut R,
    ) -> Result<Option<MoveCall>> {
        if !self.handles(action) {
            debug!(action = ?action.action_type(), "not for this role");
            return Ok(None);
        }
        let action_type = action.action_type();
        if let Some(missing) = action.inputs.iter().find(|kind| !inputs.has(**kind)) {
            warn!(action = ?action_type, input = ?missing, "missing caller input");
            return Err(PkrError::MissingInput {
                action: action_type,
                input: *missing,
            });
        }

        let package = self.config.package_id.clone();
        let call = |function: &str, arguments: Vec<CallArg>| MoveCall::new(&package, function, arguments);

        let result = match &action.payload {
            Payload::Join {
                game_id, admin, ..
            } => {
                let balance = require(inputs.balance, action_type, InputKind::Balance)?;
                let seat = require(inputs.seat, action_type, InputKind::Seat)?;
                let proof = self
                    .oracle
                    .prove(Circuit::PublicKey, &public_key_witness(&self.secret_key))?;
                let [signals, proof] = proof_args(&proof);
                call(
                    "join",
                    vec![
                        CallArg::Address(*admin),
                        CallArg::Object(*game_id),
                        signals,
                        proof,
                        CallArg::U64(balance),
                        CallArg::U8(seat),
                    ],
                )
            }
            Payload::Leave { game_id, admin } => call(
                "leave",
                vec![CallArg::Address(*admin), CallArg::Object(*game_id)],
            ),
            Payload::AddPlayer {
                game_id,
                join_id,
                group_key,
                new_key,
            } => {
                let proof = self.prove_sum(&[*group_key, *new_key])?;
                let [signals, proof] = proof_args(&proof);
                call(
                    "add_player2",
                    vec![CallArg::Object(*game_id), CallArg::Object(*join_id), signals, proof],
                )
            }
            Payload::RemovePlayer {
                game_id,
                leave_id,
                group_key,
                player_key,
            } => {
                let proof = self.prove_sum(&[*group_key, -*player_key])?;
                let [signals, proof] = proof_args(&proof);
                call(
                    "remove_player",
                    vec![CallArg::Object(*game_id), CallArg::Object(*leave_id), signals, proof],
                )
            }
            Payload::RemoveBustPlayer {
                game_id,
                player,
                group_key,
                player_key,
            } => {
                let proof = self.prove_sum(&[*group_key, -*player_key])?;
                let [signals, proof] = proof_args(&proof);
                call(
                    "remove_bust_player",
                    vec![CallArg::Object(*game_id), CallArg::Address(*player), signals, proof],
                )
            }
            Payload::Shuffle {
                game_id,
                hand_idx,
                to,
                group_key,
                source,
            } => {
                let zero = require(inputs.zero_encryption, action_type, InputKind::ZeroEncryption)?;
                if !zero.is_for(group_key) {
                    warn!(%game_id, "zero-encryption was made for another group key");
                    return Err(PkrError::StaleZeroEncryption);
                }
                let (deck_arg, input_deck) = match source {
                    ShuffleSource::Plain => (None, self.decks.standard().cards().to_vec()),
                    ShuffleSource::Deck { deck_id, inputs } => (Some(*deck_id), inputs.clone()),
                };
                let mut args = self.shuffle_args(&zero, &input_deck, rng)?;
                match deck_arg {
                    None => {
                        args.splice(
                            0..0,
                            [
                                CallArg::Address(*to),
                                CallArg::Object(*game_id),
                                CallArg::U64(*hand_idx),
                            ],
                        );
                        call("shuffle_plain", args)
                    }
                    Some(deck_id) => {
                        args.splice(0..0, [CallArg::Address(*to), CallArg::Object(deck_id)]);
                        call("shuffle", args)
                    }
                }
            }
            Payload::CompleteShuffle {
                game_id,
                deck_id,
                inputs,
            } => call(
                "complete_shuffle2",
                vec![
                    CallArg::Object(*game_id),
                    CallArg::Object(*deck_id),
                    CallArg::Bytes(bcs_bytes(&serialize_uncompressed_deck(inputs))),
                ],
            ),
            Payload::BlindBet {
                game_id,
                hand_idx,
                admin,
                amount,
            } => call(
                "bet",
                bet_args(*admin, *game_id, *hand_idx, *amount, 0, BetType::BlindBet),
            ),
            Payload::Bet {
                game_id,
                hand_idx,
                admin,
                bet_round,
                decrypt_rounds,
                c1s,
            } => {
                let bet_type = require(inputs.bet_type, action_type, InputKind::BetType)?;
                let amount = require(inputs.amount, action_type, InputKind::Amount)?;
                let head = vec![
                    CallArg::Address(*admin),
                    CallArg::Object(*game_id),
                    CallArg::U64(*hand_idx),
                ];
                match bet_type {
                    BetType::Fold if c1s.is_empty() => {
                        call("fold", [head, vec![CallArg::U8(*bet_round)]].concat())
                    }
                    BetType::Fold => {
                        let [signals, proofs] = self.decrypt_args(c1s)?;
                        call(
                            "fold_and_decrypt_many",
                            [
                                head,
                                vec![
                                    CallArg::U8(*bet_round),
                                    CallArg::U8Vec(decrypt_rounds.clone()),
                                    signals,
                                    proofs,
                                ],
                            ]
                            .concat(),
                        )
                    }
                    BetType::Check => call("check", [head, vec![CallArg::U8(*bet_round)]].concat()),
                    BetType::Call | BetType::Bet | BetType::BlindBet => call(
                        "bet",
                        bet_args(*admin, *game_id, *hand_idx, amount, *bet_round, bet_type),
                    ),
                }
            }
            Payload::AddBet { game_id, bet_id } => call(
                "add_bet",
                vec![CallArg::Object(*game_id), CallArg::Object(*bet_id)],
            ),
            Payload::AddBetless {
                game_id,
                betless_id,
            } => call(
                "add_betless",
                vec![CallArg::Object(*game_id), CallArg::Object(*betless_id)],
            ),
            Payload::Decrypt {
                game_id,
                hand_idx,
                admin,
                round,
                is_final,
                c1s,
            } => {
                let [signals, proofs] = self.decrypt_args(c1s)?;
                call(
                    "decrypt2",
                    vec![
                        CallArg::Address(*admin),
                        CallArg::Object(*game_id),
                        CallArg::U64(*hand_idx),
                        CallArg::U8(*round),
                        CallArg::Bool(*is_final),
                        signals,
                        proofs,
                    ],
                )
            }
            Payload::DecryptMany {
                game_id,
                hand_idx,
                admin,
                rounds,
                c1s,
            } => {
                let [signals, proofs] = self.decrypt_args(c1s)?;
                call(
                    "decrypt_many",
                    vec![
                        CallArg::Address(*admin),
                        CallArg::Object(*game_id),
                        CallArg::U64(*hand_idx),
                        CallArg::U8Vec(rounds.clone()),
                        signals,
                        proofs,
                    ],
                )
            }
            Payload::AddDecrypts {
                game_id,
                decrypt_ids,
            } => call(
                "add_many_decrypt2",
                vec![CallArg::Object(*game_id), CallArg::Objects(decrypt_ids.clone())],
            ),
            Payload::AddDecryptManys {
                game_id,
                decrypt_ids,
            } => call(
                "add_many_decrypt_many",
                vec![CallArg::Object(*game_id), CallArg::Objects(decrypt_ids.clone())],
            ),
            Payload::RevealMany {
                game_id,
                card_indices,
                decrypts,
                c2s,
            } => {
                let proofs = prove_reveals(self.oracle, self.decks.standard(), c2s, decrypts)?;
                let signals: Vec<Vec<u8>> = proofs.iter().map(|p| p.public_signal_bytes()).collect();
                let proofs: Vec<Vec<u8>> = proofs.iter().map(|p| p.proof_bytes()).collect();
                call(
                    "reveal_many",
                    vec![
                        CallArg::Object(*game_id),
                        CallArg::U8Vec(card_indices.clone()),
                        nested_bytes(&signals),
                        nested_bytes(&proofs),
                    ],
                )
            }
            Payload::FindWinner { game_id } => {
                call("find_winners", vec![CallArg::Object(*game_id)])
            }
            Payload::ResetGame { game_id } => call("reset_game", vec![CallArg::Object(*game_id)]),
        };

        info!(call = %result.target, args = result.arguments.len(), "built call");
        Ok(Some(result))
    }

    fn prove_sum(&self, points: &[Point]) -> Result<ProofOutput> {
        Ok(self.oracle.prove(Circuit::Add, &add_witness(points)?)?)
    }

    /// Deck bytes followed by zero-encryption and shuffle proofs
    fn shuffle_args<R: Rng + ?Sized>(
        &self,
        zero: &ZeroEncryption,
        input_deck: &[CipherText],
        rng: &mut R,
    ) -> Result<Vec<CallArg>> {
        let perm = random_permutation(input_deck.len(), rng);
        let shuffled = encrypt_shuffle(&zero.cipher_texts, input_deck, &perm)?;
        let compressed = compress_deck(&shuffled)?;
        debug!(deck = %compressed.hash(), "shuffled deck");

        let zero_proof = match &zero.proof {
            Some(proof) => proof.clone(),
            None => self.oracle.prove(
                Circuit::ZeroEncrypt,
                &zero_encrypt_witness(&zero.rands, &zero.public_key),
            )?,
        };
        let shuffle_proof = self.oracle.prove(
            Circuit::EncryptShuffle,
            &encrypt_shuffle_witness(&zero.cipher_texts, input_deck, &perm),
        )?;

        let [zero_signals, zero_proof] = proof_args(&zero_proof);
        let [signals, proof] = proof_args(&shuffle_proof);
        Ok(vec![
            CallArg::Bytes(bcs_bytes(&compressed.to_bytes())),
            zero_signals,
            zero_proof,
            signals,
            proof,
        ])
    }

    /// Decrypt inputs and proofs, reversed into the order the contract pops them
    fn decrypt_args(&self, c1s: &[Point]) -> Result<[CallArg; 2]> {
        let mut signals = Vec::with_capacity(c1s.len());
        let mut proofs = Vec::with_capacity(c1s.len());
        for c1 in c1s {
            let proof = match self.decrypt_proofs.get(c1) {
                Some(cached) => cached.clone(),
                None => self
                    .oracle
                    .prove(Circuit::Decrypt, &decrypt_witness(c1, &self.secret_key))?,
            };
            signals.push(proof.public_signal_bytes());
            proofs.push(proof.proof_bytes());
        }
        signals.reverse();
        proofs.reverse();
        Ok([nested_bytes(&signals), nested_bytes(&proofs)])
    }
}

fn bet_args(
    admin: Address,
    game_id: ObjectId,
    hand_idx: u64,
    amount: u64,
    round: u8,
    bet_type: BetType,
) -> Vec<CallArg> {
    vec![
        CallArg::Address(admin),
        CallArg::Object(game_id),
        CallArg::U64(hand_idx),
        CallArg::SplitGas(amount),
        CallArg::U8(round),
        CallArg::U8(bet_type.code()),
    ]
}

/// Every card's proof depends only on its own `c2` and shares.
pub fn prove_reveals<O: ProofOracle>(
    oracle: &O,
    deck: &CanonicalDeck,
    c2s: &[Point],
    decrypts: &[Vec<Point>],
) -> Result<Vec<ProofOutput>> {
    let prove_one = |(c2, shares): (&Point, &Vec<Point>)| -> Result<ProofOutput> {
        let witness = reveal_witness(deck, c2, shares)?;
        Ok(oracle.prove(Circuit::Reveal, &witness)?)
    };

    #[cfg(feature = "parallel")]
    let proofs = c2s
        .par_iter()
        .zip(decrypts.par_iter())
        .map(prove_one)
        .collect();

    #[cfg(not(feature = "parallel"))]
    let proofs = c2s.iter().zip(decrypts.iter()).map(prove_one).collect();

    proofs
}
