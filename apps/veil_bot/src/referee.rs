//! Veil (Verifiable ELgamal poker)
//!
//! Mental Poker (1979) implemented using ElGamal over the Baby Jubjub curve.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

//! In-memory stand-in for the game contract, enough to drive whole hands

use std::collections::HashMap;

use alloy_primitives::B256;
use itertools::Itertools;
use thiserror::Error;
use tracing::{debug, info};
use veil_jub::Point;
use veil_pkr::{
    PkrError,
    cache::DeckCache,
    poker_actions::{Action, ChainView, Payload, ShuffleSource},
    poker_bets::{BetType, blind_indices},
    poker_calls::{CallArg, MoveCall, read_bcs_bytes},
    poker_deck::{CardIndex, CipherText, apply_decrypts, decompress_deserialize_deck},
    poker_state::{
        Address, BetObject, BetlessObject, DECK_SIZE, DealtCard, GameState, JoinGame, LeaveGame,
        LedgerObject, MAX_PLAYERS, NUM_ROUNDS, ObjectId, PUBLIC_IDX, PartialDecrypt,
        PartialDecryptMany, ShuffledDeck,
    },
};

const HOLE_CARDS: usize = 2;
const BOARD_ROUNDS: [usize; 3] = [3, 1, 1];

#[derive(Error, Debug)]
pub enum RefereeError {
    #[error(transparent)]
    Poker(#[from] PkrError),
    #[error("{call} rejected: {reason}")]
    Rejected { call: String, reason: &'static str },
    #[error("no progress after {0} steps")]
    Stalled(usize),
}

pub type Result<T> = core::result::Result<T, RefereeError>;

/// What the submitted proofs attest to, as the contract would read it
#[derive(Clone, Debug, Default)]
pub struct Attested {
    pub public_key: Option<Point>,
    /// `(c1, share)` per decrypted card
    pub shares: Vec<(Point, Point)>,
}

fn arg_u64(call: &MoveCall, idx: usize) -> Option<u64> {
    match call.arguments.get(idx)? {
        CallArg::U64(v) | CallArg::SplitGas(v) => Some(*v),
        _ => None,
    }
}

fn arg_u8(call: &MoveCall, idx: usize) -> Option<u8> {
    match call.arguments.get(idx)? {
        CallArg::U8(v) => Some(*v),
        _ => None,
    }
}

fn arg_bytes(call: &MoveCall, idx: usize) -> Option<&[u8]> {
    match call.arguments.get(idx)? {
        CallArg::Bytes(b) => read_bcs_bytes(b),
        _ => None,
    }
}

fn dealt(ct: &CipherText) -> DealtCard {
    DealtCard {
        cipher_text: ct.compress(),
        decrypts: vec![],
        submitted_decrypt: vec![],
        revealable: false,
        revealed: false,
        completed_decrypt: false,
        reveal_card: 0,
    }
}

pub struct Referee {
    pub game: GameState,
    admin_objects: Vec<LedgerObject>,
    player_objects: HashMap<Address, Vec<LedgerObject>>,
    shares: HashMap<ObjectId, (Address, Vec<(Point, Point)>)>,
    to_act: Vec<bool>,
    next_id: u64,
    decks: DeckCache,
    hands_played: usize,
}

impl Referee {
    pub fn new(game_id: ObjectId, admin: Address, small_blind: u64) -> Self {
        Self {
            game: GameState {
                id: game_id,
                admin,
                small_blind,
                big_blind: 2 * small_blind,
                can_add_player: true,
                ..Default::default()
            },
            admin_objects: vec![],
            player_objects: HashMap::new(),
            shares: HashMap::new(),
            to_act: vec![],
            next_id: 0,
            decks: DeckCache::new(),
            hands_played: 0,
        }
    }

    pub fn view(&self) -> ChainView<'_> {
        ChainView::new(&self.game, &self.admin_objects, &self.player_objects)
    }

    pub fn hands_played(&self) -> usize {
        self.hands_played
    }

    pub fn start(&mut self) {
        info!(players = self.game.num_players(), "starting game");
        self.game.started = true;
    }

    fn new_id(&mut self) -> ObjectId {
        self.next_id += 1;
        B256::left_padding_from(&self.next_id.to_be_bytes())
    }

    fn take_admin_object(&mut self, id: &ObjectId) -> Option<LedgerObject> {
        let pos = self.admin_objects.iter().position(|o| o.id() == *id)?;
        Some(self.admin_objects.remove(pos))
    }

    fn owned_mut(&mut self, owner: Address) -> &mut Vec<LedgerObject> {
        if owner == self.game.admin {
            &mut self.admin_objects
        } else {
            self.player_objects.entry(owner).or_default()
        }
    }

    fn index_of(&self, player: &Address) -> Result<usize> {
        self.game
            .player_index(player)
            .ok_or(RefereeError::Poker(PkrError::UnknownPlayer(*player)))
    }

    /// Executes one call on behalf of `actor`.
    pub fn submit(
        &mut self,
        actor: Address,
        action: &Action,
        call: &MoveCall,
        attested: Attested,
    ) -> Result<()> {
        debug!(call = %call.target, "executing");
        let reject = |reason| RefereeError::Rejected {
            call: call.function().to_string(),
            reason,
        };
        let game_id = self.game.id;

        match &action.payload {
            Payload::Join { .. } => {
                let balance = arg_u64(call, 4).ok_or_else(|| reject("missing balance"))?;
                let seat = arg_u8(call, 5).ok_or_else(|| reject("missing seat"))?;
                let point = attested.public_key.ok_or_else(|| reject("missing key"))?;
                let id = self.new_id();
                self.admin_objects.push(LedgerObject::JoinGame(JoinGame {
                    id,
                    game_id,
                    player: actor,
                    seat,
                    balance,
                    point,
                }));
            }
            Payload::Leave { .. } => {
                let id = self.new_id();
                self.admin_objects.push(LedgerObject::LeaveGame(LeaveGame {
                    id,
                    game_id,
                    player: actor,
                }));
            }
            Payload::AddPlayer {
                join_id, new_key, ..
            } => {
                if self.game.num_players() >= MAX_PLAYERS {
                    return Err(reject("table is full"));
                }
                let Some(LedgerObject::JoinGame(join)) = self.take_admin_object(join_id) else {
                    return Err(reject("join request is gone"));
                };
                let game = &mut self.game;
                game.players.push(join.player);
                game.player_balances.push(join.balance);
                game.current_bets.push(0);
                game.player_seats.push(join.seat);
                game.public_keys.push(*new_key);
                game.group_public_key = game.group_public_key + *new_key;
                info!(player = %join.player, seat = join.seat, "seated");
            }
            Payload::RemovePlayer { leave_id, .. } => {
                let Some(LedgerObject::LeaveGame(leave)) = self.take_admin_object(leave_id) else {
                    return Err(reject("leave request is gone"));
                };
                self.unseat(&leave.player)?;
            }
            Payload::RemoveBustPlayer { player, .. } => self.unseat(player)?,
            Payload::Shuffle {
                hand_idx,
                to,
                source,
                ..
            } => {
                let (bytes_idx, consumed) = match source {
                    ShuffleSource::Plain => (3, None),
                    ShuffleSource::Deck { deck_id, .. } => (2, Some(*deck_id)),
                };
                let bytes = arg_bytes(call, bytes_idx).ok_or_else(|| reject("missing deck"))?;
                let deck = decompress_deserialize_deck(bytes, DECK_SIZE)?;
                if let Some(deck_id) = consumed {
                    self.owned_mut(actor).retain(|o| o.id() != deck_id);
                }
                let id = self.new_id();
                let shuffled = LedgerObject::ShuffledDeck(ShuffledDeck {
                    id,
                    game_id,
                    hand_idx: *hand_idx,
                    from: actor,
                    public_key: self.game.group_public_key,
                    deck: deck.iter().map(CipherText::compress).collect(),
                });
                self.owned_mut(*to).push(shuffled);
                self.game.can_add_player = false;
            }
            Payload::CompleteShuffle {
                deck_id, inputs, ..
            } => {
                self.admin_objects.retain(|o| o.id() != *deck_id);
                self.deal(inputs)?;
            }
            Payload::BlindBet { amount, .. } => {
                let id = self.new_id();
                self.admin_objects.push(LedgerObject::Bet(BetObject {
                    id,
                    game_id,
                    player: actor,
                    round: 0,
                    amount: *amount,
                    bet_type: BetType::BlindBet.code(),
                }));
            }
            Payload::Bet { bet_round, .. } => {
                let id = self.new_id();
                let betless = |betless_type| {
                    LedgerObject::Betless(BetlessObject {
                        id,
                        game_id,
                        player: actor,
                        round: *bet_round,
                        betless_type,
                    })
                };
                let object = match call.function() {
                    "bet" => LedgerObject::Bet(BetObject {
                        id,
                        game_id,
                        player: actor,
                        round: *bet_round,
                        amount: arg_u64(call, 3).ok_or_else(|| reject("missing coin"))?,
                        bet_type: arg_u8(call, 5).ok_or_else(|| reject("missing bet type"))?,
                    }),
                    "check" => betless(BetType::Check.code()),
                    "fold" => betless(BetType::Fold.code()),
                    "fold_and_decrypt_many" => {
                        self.apply_shares(actor, &attested.shares);
                        self.refresh_cards();
                        betless(BetType::Fold.code())
                    }
                    _ => return Err(reject("unknown betting entry point")),
                };
                self.admin_objects.push(object);
            }
            Payload::AddBet { bet_id, .. } => {
                let Some(LedgerObject::Bet(bet)) = self.take_admin_object(bet_id) else {
                    return Err(reject("bet is gone"));
                };
                if bet.bet_type == BetType::BlindBet.code() {
                    self.post_blind(&bet)?;
                } else {
                    self.place_bet(&bet)?;
                }
            }
            Payload::AddBetless { betless_id, .. } => {
                let Some(LedgerObject::Betless(betless)) = self.take_admin_object(betless_id) else {
                    return Err(reject("betless is gone"));
                };
                let idx = self.index_of(&betless.player)?;
                if betless.betless_type == BetType::Fold.code() {
                    info!(player = %betless.player, "folds");
                    self.game.current_hand_players.retain(|p| *p as usize != idx);
                } else {
                    info!(player = %betless.player, "checks");
                }
                if let Some(flag) = self.to_act.get_mut(idx) {
                    *flag = false;
                }
                self.next_turn(idx);
            }
            Payload::Decrypt {
                round, is_final, ..
            } => {
                let public_key = self.public_key_of(&actor)?;
                let id = self.new_id();
                self.admin_objects.push(LedgerObject::PartialDecrypt(PartialDecrypt {
                    id,
                    game_id,
                    from: actor,
                    hand_idx: self.game.hand_idx,
                    round: *round,
                    is_final: *is_final,
                    public_key,
                }));
                self.shares.insert(id, (actor, attested.shares));
            }
            Payload::DecryptMany { .. } => {
                let public_key = self.public_key_of(&actor)?;
                let id = self.new_id();
                self.admin_objects
                    .push(LedgerObject::PartialDecryptMany(PartialDecryptMany {
                        id,
                        game_id,
                        from: actor,
                        hand_idx: self.game.hand_idx,
                        public_key,
                    }));
                self.shares.insert(id, (actor, attested.shares));
            }
            Payload::AddDecrypts { decrypt_ids, .. }
            | Payload::AddDecryptManys { decrypt_ids, .. } => {
                for id in decrypt_ids {
                    self.take_admin_object(id);
                    if let Some((from, shares)) = self.shares.remove(id) {
                        self.apply_shares(from, &shares);
                    }
                }
                self.refresh_cards();
                self.advance_decrypt_round();
            }
            Payload::RevealMany { card_indices, .. } => {
                let deck = self.decks.standard();
                for position in card_indices {
                    let Some(card) = self.game.deck.get_mut(*position as usize) else {
                        return Err(reject("no such card"));
                    };
                    let index = apply_decrypts(deck, &card.decompress()?, &card.decrypts)?;
                    card.revealed = true;
                    card.reveal_card = index.0;
                    info!(position, card = %index, "revealed");
                }
            }
            Payload::FindWinner { .. } => {
                self.log_showdown();
                let winners = self
                    .game
                    .current_hand_players
                    .iter()
                    .map(|p| *p as usize)
                    .collect_vec();
                self.award(&winners);
            }
            Payload::ResetGame { .. } => self.reset(),
        }
        Ok(())
    }

    /// Undo of a bet that never made it into the game
    pub fn compensate(&mut self, call: &MoveCall) -> Result<()> {
        if let Some(CallArg::Object(bet_id)) = call.arguments.first() {
            if self.take_admin_object(bet_id).is_some() {
                info!(bet = %bet_id, "bet returned");
            }
        }
        Ok(())
    }

    fn public_key_of(&self, player: &Address) -> Result<Point> {
        let idx = self.index_of(player)?;
        self.game
            .public_keys
            .get(idx)
            .copied()
            .ok_or(RefereeError::Poker(PkrError::PlayerIndex(idx)))
    }

    fn unseat(&mut self, player: &Address) -> Result<()> {
        let idx = self.index_of(player)?;
        let game = &mut self.game;
        let key = game.public_keys.remove(idx);
        game.players.remove(idx);
        game.player_balances.remove(idx);
        game.current_bets.remove(idx);
        game.player_seats.remove(idx);
        game.group_public_key = game.group_public_key - key;
        info!(%player, "unseated");
        Ok(())
    }

    fn deal(&mut self, inputs: &[CipherText]) -> Result<()> {
        let n = self.game.num_players() as u8;
        let mut rounds = vec![(0..HOLE_CARDS).flat_map(|_| 0..n).collect_vec()];
        rounds.extend(BOARD_ROUNDS.iter().map(|k| vec![PUBLIC_IDX; *k]));
        let total = rounds.iter().map(Vec::len).sum::<usize>();
        if inputs.len() < total {
            return Err(PkrError::InvalidDeck {
                expected: total,
                got: inputs.len(),
            }
            .into());
        }

        let game = &mut self.game;
        game.deck = inputs[..total].iter().map(dealt).collect();
        game.rounds = rounds;
        game.current_hand_players = (0..n).collect();
        game.current_bets = vec![0; n as usize];
        game.bet_round = 0;
        game.decrypt_round = 0;
        game.current_bet = 0;
        game.raise_amount = 0;
        game.pot = 0;
        game.sb_submitted = false;
        game.bb_submitted = false;
        game.hand_over = false;
        info!(hand = game.hand_idx, cards = total, "dealt");
        Ok(())
    }

    fn commit(&mut self, idx: usize, amount: u64) -> Result<()> {
        let game = &mut self.game;
        let (Some(balance), Some(bet)) = (
            game.player_balances.get_mut(idx),
            game.current_bets.get_mut(idx),
        ) else {
            return Err(PkrError::PlayerIndex(idx).into());
        };
        let amount = amount.min(*balance);
        *balance -= amount;
        *bet += amount;
        game.pot += amount;
        Ok(())
    }

    fn post_blind(&mut self, bet: &BetObject) -> Result<()> {
        let idx = self.index_of(&bet.player)?;
        self.commit(idx, bet.amount)?;
        info!(player = %bet.player, amount = bet.amount, "posts blind");

        let game = &mut self.game;
        let n = game.num_players();
        let (small, big) = blind_indices(n, game.button_idx as usize);
        if idx == small && !game.sb_submitted {
            game.sb_submitted = true;
        } else {
            game.bb_submitted = true;
        }
        if game.sb_submitted && game.bb_submitted {
            game.current_bet = game.current_bets.iter().copied().max().unwrap_or(0);
            game.raise_amount = game.big_blind;
            game.bet_player = ((big + 1) % n) as u8;
            self.to_act = (0..n).map(|i| self.game.is_in_hand(i)).collect();
        }
        Ok(())
    }

    fn place_bet(&mut self, bet: &BetObject) -> Result<()> {
        let idx = self.index_of(&bet.player)?;
        self.commit(idx, bet.amount)?;
        info!(player = %bet.player, amount = bet.amount, "bets");

        let committed = self.game.current_bets[idx];
        if committed > self.game.current_bet {
            self.game.raise_amount = committed - self.game.current_bet;
            self.game.current_bet = committed;
            self.to_act = (0..self.game.num_players())
                .map(|i| i != idx && self.game.is_in_hand(i))
                .collect();
        }
        if let Some(flag) = self.to_act.get_mut(idx) {
            *flag = false;
        }
        self.next_turn(idx);
        Ok(())
    }

    /// All-in players are skipped; nobody left to act closes the round.
    fn next_turn(&mut self, from: usize) {
        let game = &self.game;
        if game.current_hand_players.len() <= 1 {
            let winners = game
                .current_hand_players
                .iter()
                .map(|p| *p as usize)
                .collect_vec();
            self.award(&winners);
            return;
        }
        let n = game.num_players();
        let next = (1..=n).map(|k| (from + k) % n).find(|&i| {
            self.to_act.get(i).copied().unwrap_or(false)
                && game.is_in_hand(i)
                && game.player_balances.get(i).is_some_and(|b| *b > 0)
        });
        match next {
            Some(i) => self.game.bet_player = i as u8,
            None => self.close_round(),
        }
    }

    fn close_round(&mut self) {
        let game = &mut self.game;
        game.bet_round += 1;
        game.current_bets.iter_mut().for_each(|b| *b = 0);
        game.current_bet = 0;
        game.raise_amount = 0;
        let n = game.num_players();
        let button = game.button_idx as usize;
        let first = (1..=n)
            .map(|k| (button + k) % n)
            .find(|&i| game.is_in_hand(i))
            .unwrap_or(0);
        game.bet_player = first as u8;
        info!(round = game.bet_round, pot = game.pot, "betting round closed");
        self.to_act = (0..n).map(|i| self.game.is_in_hand(i)).collect();
    }

    /// No hand ranking here; the pot is split between the remaining players.
    fn award(&mut self, winners: &[usize]) {
        let game = &mut self.game;
        if let Some(first) = winners.first() {
            let share = game.pot / winners.len() as u64;
            let remainder = game.pot - share * winners.len() as u64;
            for idx in winners {
                if let Some(balance) = game.player_balances.get_mut(*idx) {
                    *balance += share;
                }
            }
            if let Some(balance) = game.player_balances.get_mut(*first) {
                *balance += remainder;
            }
            info!(pot = game.pot, winners = winners.len(), "pot awarded");
        }
        game.pot = 0;
        game.hand_over = true;
    }

    fn apply_shares(&mut self, from: Address, shares: &[(Point, Point)]) {
        for (c1, share) in shares {
            let compressed = c1.compress();
            let Some(card) = self
                .game
                .deck
                .iter_mut()
                .find(|card| card.cipher_text.c1 == compressed)
            else {
                debug!(%from, "share for a card not on the table");
                continue;
            };
            if !card.has_decrypt_from(&from) {
                card.decrypts.push(*share);
                card.submitted_decrypt.push(from);
            }
        }
    }

    /// Board cards open once everybody decrypted them, hole cards are
    /// complete with every share but the owner's.
    fn refresh_cards(&mut self) {
        let owners = self.game.card_slots().map(|slot| slot.owner).collect_vec();
        let players = self.game.players.clone();
        for (card, owner) in self.game.deck.iter_mut().zip(owners) {
            let all = players.iter().all(|p| card.has_decrypt_from(p));
            card.revealable = all;
            card.completed_decrypt = if owner == PUBLIC_IDX {
                all
            } else {
                let holder = players.get(owner as usize);
                players
                    .iter()
                    .filter(|p| Some(*p) != holder)
                    .all(|p| card.has_decrypt_from(p))
            };
        }
    }

    fn advance_decrypt_round(&mut self) {
        loop {
            let game = &self.game;
            let round = game.decrypt_round;
            if round > game.bet_round || round >= NUM_ROUNDS {
                return;
            }
            let complete = game
                .card_slots()
                .filter(|slot| slot.round == round as usize)
                .all(|slot| slot.card.completed_decrypt);
            if !complete {
                return;
            }
            self.game.decrypt_round += 1;
            debug!(round, "decrypt round complete");
        }
    }

    fn log_showdown(&self) {
        let shown = |owner: Option<u8>| {
            self.game
                .card_slots()
                .filter(|slot| match owner {
                    Some(o) => slot.owner == o,
                    None => slot.is_public(),
                })
                .map(|slot| {
                    if slot.card.revealed {
                        CardIndex(slot.card.reveal_card).to_string()
                    } else {
                        "_!".to_string()
                    }
                })
                .join(", ")
        };
        info!("Community cards: {}", shown(None));
        for idx in &self.game.current_hand_players {
            if let Some(player) = self.game.get_player(*idx as usize) {
                info!("Player {} cards: {}", player, shown(Some(*idx)));
            }
        }
    }

    fn reset(&mut self) {
        self.hands_played += 1;
        let game = &mut self.game;
        info!(hand = game.hand_idx, "hand over");
        game.hand_idx += 1;
        game.button_idx = ((game.button_idx as usize + 1) % game.num_players().max(1)) as u8;
        game.deck.clear();
        game.rounds.clear();
        game.current_hand_players.clear();
        game.current_bets.iter_mut().for_each(|b| *b = 0);
        game.current_bet = 0;
        game.raise_amount = 0;
        game.bet_round = 0;
        game.decrypt_round = 0;
        game.bet_player = 0;
        game.sb_submitted = false;
        game.bb_submitted = false;
        game.hand_over = false;
        game.can_add_player = true;
        self.shares.clear();
        self.admin_objects.retain(|o| {
            matches!(o, LedgerObject::JoinGame(_) | LedgerObject::LeaveGame(_))
        });
    }
}
