//! Veil (Verifiable ELgamal poker)
//!
//! Mental Poker (1979) implemented using ElGamal over the Baby Jubjub curve.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

//! Typed view of the ledger's game object and the objects players own

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use veil_jub::{
    Point,
    types::{PublicKey, SecretKey},
    util::make_public_key_from_secret_key,
};

use crate::{
    error::Result,
    poker_deck::{CipherText, CompressedCipherText},
};

pub const NUM_ROUNDS: u8 = 4;
pub const PUBLIC_IDX: u8 = 255;
pub const REVEAL_LENGTH: usize = 5;
pub const DECK_SIZE: usize = 52;
pub const MAX_SEATS: u8 = 9;
/// Board cards need a share from every player and the reveal circuit takes
/// at most [`REVEAL_LENGTH`] of them.
pub const MAX_PLAYERS: usize = REVEAL_LENGTH;

/// Module name of the game contract inside its package
pub const GAME_MODULE: &str = "game";

pub type Address = B256;
pub type ObjectId = B256;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealtCard {
    pub cipher_text: CompressedCipherText,
    #[serde(default)]
    pub decrypts: Vec<Point>,
    #[serde(default)]
    pub submitted_decrypt: Vec<Address>,
    pub revealable: bool,
    pub revealed: bool,
    pub completed_decrypt: bool,
    pub reveal_card: u8,
}

impl DealtCard {
    pub fn decompress(&self) -> Result<CipherText> {
        self.cipher_text.decompress()
    }

    pub fn has_decrypt_from(&self, player: &Address) -> bool {
        self.submitted_decrypt.contains(player)
    }
}

/// A dealt card together with where the round layout put it
#[derive(Clone, Copy, Debug)]
pub struct CardSlot<'a> {
    pub round: usize,
    pub owner: u8,
    pub position: usize,
    pub card: &'a DealtCard,
}

impl CardSlot<'_> {
    pub const fn is_public(&self) -> bool {
        self.owner == PUBLIC_IDX
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub id: ObjectId,
    pub admin: Address,
    pub players: Vec<Address>,
    pub player_balances: Vec<u64>,
    pub current_bets: Vec<u64>,
    pub player_seats: Vec<u8>,
    pub current_hand_players: Vec<u8>,
    pub public_keys: Vec<Point>,
    pub group_public_key: Point,
    /// Owner of each dealt card per round, [`PUBLIC_IDX`] for the board
    pub rounds: Vec<Vec<u8>>,
    pub deck: Vec<DealtCard>,
    pub hand_idx: u64,
    pub bet_round: u8,
    pub decrypt_round: u8,
    pub bet_player: u8,
    pub current_bet: u64,
    pub raise_amount: u64,
    pub pot: u64,
    pub small_blind: u64,
    pub big_blind: u64,
    pub button_idx: u8,
    pub started: bool,
    pub can_add_player: bool,
    pub sb_submitted: bool,
    pub bb_submitted: bool,
    pub hand_over: bool,
}

impl GameState {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn num_players(&self) -> usize {
        self.players.len()
    }

    pub fn get_player(&self, idx: usize) -> Option<&Address> {
        self.players.get(idx)
    }

    pub fn player_index(&self, player: &Address) -> Option<usize> {
        self.players.iter().position(|p| p == player)
    }

    pub fn is_in_hand(&self, idx: usize) -> bool {
        self.current_hand_players.iter().any(|p| *p as usize == idx)
    }

    pub fn betting_over(&self) -> bool {
        self.bet_round == NUM_ROUNDS
    }

    pub fn is_reveal_phase(&self) -> bool {
        self.betting_over() && self.decrypt_round == NUM_ROUNDS
    }

    /// Walks `rounds` in order, pairing each owner with the next dealt card.
    pub fn card_slots(&self) -> impl Iterator<Item = CardSlot<'_>> {
        self.rounds
            .iter()
            .enumerate()
            .flat_map(|(round, owners)| owners.iter().map(move |owner| (round, *owner)))
            .zip(self.deck.iter())
            .enumerate()
            .map(|(position, ((round, owner), card))| CardSlot {
                round,
                owner,
                position,
                card,
            })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinGame {
    pub id: ObjectId,
    pub game_id: ObjectId,
    pub player: Address,
    pub seat: u8,
    pub balance: u64,
    pub point: Point,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveGame {
    pub id: ObjectId,
    pub game_id: ObjectId,
    pub player: Address,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShuffledDeck {
    pub id: ObjectId,
    pub game_id: ObjectId,
    pub hand_idx: u64,
    pub from: Address,
    pub public_key: Point,
    pub deck: Vec<CompressedCipherText>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDecrypt {
    pub id: ObjectId,
    pub game_id: ObjectId,
    pub from: Address,
    pub hand_idx: u64,
    pub round: u8,
    #[serde(rename = "final")]
    pub is_final: bool,
    pub public_key: Point,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDecryptMany {
    pub id: ObjectId,
    pub game_id: ObjectId,
    pub from: Address,
    pub hand_idx: u64,
    pub public_key: Point,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetObject {
    pub id: ObjectId,
    pub game_id: ObjectId,
    pub player: Address,
    pub round: u8,
    pub amount: u64,
    pub bet_type: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetlessObject {
    pub id: ObjectId,
    pub game_id: ObjectId,
    pub player: Address,
    pub round: u8,
    pub betless_type: u8,
}

/// One variant per object kind the game contract hands out
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "fields")]
pub enum LedgerObject {
    JoinGame(JoinGame),
    LeaveGame(LeaveGame),
    ShuffledDeck(ShuffledDeck),
    PartialDecrypt(PartialDecrypt),
    PartialDecryptMany(PartialDecryptMany),
    Bet(BetObject),
    Betless(BetlessObject),
    Game(Box<GameState>),
}

impl LedgerObject {
    pub fn id(&self) -> ObjectId {
        match self {
            LedgerObject::JoinGame(o) => o.id,
            LedgerObject::LeaveGame(o) => o.id,
            LedgerObject::ShuffledDeck(o) => o.id,
            LedgerObject::PartialDecrypt(o) => o.id,
            LedgerObject::PartialDecryptMany(o) => o.id,
            LedgerObject::Bet(o) => o.id,
            LedgerObject::Betless(o) => o.id,
            LedgerObject::Game(o) => o.id,
        }
    }

    pub fn game_id(&self) -> ObjectId {
        match self {
            LedgerObject::JoinGame(o) => o.game_id,
            LedgerObject::LeaveGame(o) => o.game_id,
            LedgerObject::ShuffledDeck(o) => o.game_id,
            LedgerObject::PartialDecrypt(o) => o.game_id,
            LedgerObject::PartialDecryptMany(o) => o.game_id,
            LedgerObject::Bet(o) => o.game_id,
            LedgerObject::Betless(o) => o.game_id,
            LedgerObject::Game(o) => o.id,
        }
    }

    pub fn list_from_json(text: &str) -> Result<Vec<Self>> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameEvent {
    Bet,
    AddBet,
    Fold,
    AddFold,
    Check,
    AddCheck,
    AddPlayer,
    AddDecrypt,
    Reveal,
    Payout,
    NewHand,
    Reset,
    Shuffle,
    RemovePlayer,
    Join,
    Leave,
}

impl GameEvent {
    pub const ALL: [GameEvent; 16] = [
        GameEvent::Bet,
        GameEvent::AddBet,
        GameEvent::Fold,
        GameEvent::AddFold,
        GameEvent::Check,
        GameEvent::AddCheck,
        GameEvent::AddPlayer,
        GameEvent::AddDecrypt,
        GameEvent::Reveal,
        GameEvent::Payout,
        GameEvent::NewHand,
        GameEvent::Reset,
        GameEvent::Shuffle,
        GameEvent::RemovePlayer,
        GameEvent::Join,
        GameEvent::Leave,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            GameEvent::Bet => "BetEvent",
            GameEvent::AddBet => "AddBetEvent",
            GameEvent::Fold => "FoldEvent",
            GameEvent::AddFold => "AddFoldEvent",
            GameEvent::Check => "CheckEvent",
            GameEvent::AddCheck => "AddCheckEvent",
            GameEvent::AddPlayer => "AddPlayerEvent",
            GameEvent::AddDecrypt => "AddDecryptEvent",
            GameEvent::Reveal => "RevealEvent",
            GameEvent::Payout => "PayoutEvent",
            GameEvent::NewHand => "NewHandEvent",
            GameEvent::Reset => "ResetEvent",
            GameEvent::Shuffle => "ShuffleEvent",
            GameEvent::RemovePlayer => "RemovePlayerEvent",
            GameEvent::Join => "JoinEvent",
            GameEvent::Leave => "LeaveEvent",
        }
    }

    /// Parses `"{package}::game::{Name}"`; events of other packages are `None`.
    pub fn parse(event_type: &str, package_id: &str) -> Option<Self> {
        let name = event_type
            .strip_prefix(package_id)?
            .strip_prefix("::")?
            .strip_prefix(GAME_MODULE)?
            .strip_prefix("::")?;
        Self::ALL.into_iter().find(|e| e.name() == name)
    }

    pub fn format(&self, package_id: &str) -> String {
        format!("{}::{}::{}", package_id, GAME_MODULE, self.name())
    }
}

/// What a single participant knows beyond the ledger
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrivateState {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
    pub player: Address,
}

impl PrivateState {
    pub fn new(player: Address, secret_key: SecretKey) -> Self {
        Self {
            secret_key,
            public_key: make_public_key_from_secret_key(&secret_key),
            player,
        }
    }
}
