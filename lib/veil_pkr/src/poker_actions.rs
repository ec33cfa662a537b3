//! Veil (Verifiable ELgamal poker)
//!
//! Mental Poker (1979) implemented using ElGamal over the Baby Jubjub curve.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

//! Next legal protocol steps, derived from a ledger snapshot alone

use std::collections::HashMap;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use tracing::debug;
use veil_jub::Point;

use crate::{
    error::Result,
    poker_bets::{ADDABLE_BETS, BettingView},
    poker_deck::{CipherText, decompress_deck},
    poker_state::{
        Address, BetObject, BetlessObject, GameState, JoinGame, LeaveGame, LedgerObject,
        MAX_PLAYERS, MAX_SEATS, NUM_ROUNDS, ObjectId, PartialDecrypt, PartialDecryptMany,
        ShuffledDeck,
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    Join,
    Leave,
    AddPlayer,
    RemovePlayer,
    RemoveBustPlayer,
    Shuffle,
    CompleteShuffle,
    BlindBet,
    Bet,
    AddBet,
    AddBetless,
    Decrypt,
    DecryptMany,
    AddDecrypts,
    AddDecryptManys,
    RevealMany,
    FindWinner,
    ResetGame,
}

/// Values only the caller can supply, checked before any proving starts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputKind {
    Balance,
    Seat,
    ZeroEncryption,
    BetType,
    Amount,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyPart {
    Address(Address),
    Number(u64),
    Field(#[serde(with = "veil_jub::util::decimal")] U256),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShuffleSource {
    /// First shuffle of the hand, starting from the canonical deck
    Plain,
    Deck {
        deck_id: ObjectId,
        inputs: Vec<CipherText>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    Join {
        game_id: ObjectId,
        admin: Address,
        address: Address,
    },
    Leave {
        game_id: ObjectId,
        admin: Address,
    },
    AddPlayer {
        game_id: ObjectId,
        join_id: ObjectId,
        group_key: Point,
        new_key: Point,
    },
    RemovePlayer {
        game_id: ObjectId,
        leave_id: ObjectId,
        group_key: Point,
        player_key: Point,
    },
    RemoveBustPlayer {
        game_id: ObjectId,
        player: Address,
        group_key: Point,
        player_key: Point,
    },
    Shuffle {
        game_id: ObjectId,
        hand_idx: u64,
        to: Address,
        group_key: Point,
        source: ShuffleSource,
    },
    CompleteShuffle {
        game_id: ObjectId,
        deck_id: ObjectId,
        inputs: Vec<CipherText>,
    },
    BlindBet {
        game_id: ObjectId,
        hand_idx: u64,
        admin: Address,
        amount: u64,
    },
    Bet {
        game_id: ObjectId,
        hand_idx: u64,
        admin: Address,
        bet_round: u8,
        /// Cards a folding player opens for the rest, more than two in hand only
        decrypt_rounds: Vec<u8>,
        c1s: Vec<Point>,
    },
    AddBet {
        game_id: ObjectId,
        bet_id: ObjectId,
    },
    AddBetless {
        game_id: ObjectId,
        betless_id: ObjectId,
    },
    Decrypt {
        game_id: ObjectId,
        hand_idx: u64,
        admin: Address,
        round: u8,
        is_final: bool,
        c1s: Vec<Point>,
    },
    DecryptMany {
        game_id: ObjectId,
        hand_idx: u64,
        admin: Address,
        rounds: Vec<u8>,
        c1s: Vec<Point>,
    },
    AddDecrypts {
        game_id: ObjectId,
        decrypt_ids: Vec<ObjectId>,
    },
    AddDecryptManys {
        game_id: ObjectId,
        decrypt_ids: Vec<ObjectId>,
    },
    RevealMany {
        game_id: ObjectId,
        card_indices: Vec<u8>,
        decrypts: Vec<Vec<Point>>,
        c2s: Vec<Point>,
    },
    FindWinner {
        game_id: ObjectId,
    },
    ResetGame {
        game_id: ObjectId,
    },
}

impl Payload {
    pub const fn action_type(&self) -> ActionType {
        match self {
            Payload::Join { .. } => ActionType::Join,
            Payload::Leave { .. } => ActionType::Leave,
            Payload::AddPlayer { .. } => ActionType::AddPlayer,
            Payload::RemovePlayer { .. } => ActionType::RemovePlayer,
            Payload::RemoveBustPlayer { .. } => ActionType::RemoveBustPlayer,
            Payload::Shuffle { .. } => ActionType::Shuffle,
            Payload::CompleteShuffle { .. } => ActionType::CompleteShuffle,
            Payload::BlindBet { .. } => ActionType::BlindBet,
            Payload::Bet { .. } => ActionType::Bet,
            Payload::AddBet { .. } => ActionType::AddBet,
            Payload::AddBetless { .. } => ActionType::AddBetless,
            Payload::Decrypt { .. } => ActionType::Decrypt,
            Payload::DecryptMany { .. } => ActionType::DecryptMany,
            Payload::AddDecrypts { .. } => ActionType::AddDecrypts,
            Payload::AddDecryptManys { .. } => ActionType::AddDecryptManys,
            Payload::RevealMany { .. } => ActionType::RevealMany,
            Payload::FindWinner { .. } => ActionType::FindWinner,
            Payload::ResetGame { .. } => ActionType::ResetGame,
        }
    }

    pub const fn game_id(&self) -> &ObjectId {
        match self {
            Payload::Join { game_id, .. }
            | Payload::Leave { game_id, .. }
            | Payload::AddPlayer { game_id, .. }
            | Payload::RemovePlayer { game_id, .. }
            | Payload::RemoveBustPlayer { game_id, .. }
            | Payload::Shuffle { game_id, .. }
            | Payload::CompleteShuffle { game_id, .. }
            | Payload::BlindBet { game_id, .. }
            | Payload::Bet { game_id, .. }
            | Payload::AddBet { game_id, .. }
            | Payload::AddBetless { game_id, .. }
            | Payload::Decrypt { game_id, .. }
            | Payload::DecryptMany { game_id, .. }
            | Payload::AddDecrypts { game_id, .. }
            | Payload::AddDecryptManys { game_id, .. }
            | Payload::RevealMany { game_id, .. }
            | Payload::FindWinner { game_id }
            | Payload::ResetGame { game_id } => game_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Action {
    pub from: Option<Address>,
    pub admin: bool,
    pub inputs: Vec<InputKind>,
    pub key: Vec<KeyPart>,
    pub payload: Payload,
}

impl Action {
    pub fn admin(payload: Payload) -> Self {
        Self {
            from: None,
            admin: true,
            inputs: vec![],
            key: vec![],
            payload,
        }
    }

    pub fn player(from: Address, payload: Payload) -> Self {
        Self {
            from: Some(from),
            admin: false,
            inputs: vec![],
            key: vec![],
            payload,
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<InputKind>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_key(mut self, key: Vec<KeyPart>) -> Self {
        self.key = key;
        self
    }

    pub const fn action_type(&self) -> ActionType {
        self.payload.action_type()
    }

    pub const fn game_id(&self) -> &ObjectId {
        self.payload.game_id()
    }

    pub fn is_from(&self, player: &Address) -> bool {
        self.from.as_ref() == Some(player)
    }
}

/// Same step, ignoring payload contents such as fresh ciphertexts or proofs
pub fn actions_are_same(a: &Action, b: &Action) -> bool {
    a.action_type() == b.action_type()
        && a.from == b.from
        && a.admin == b.admin
        && a.inputs == b.inputs
        && a.key == b.key
}

/// Immutable snapshot the engine reads: the game plus owned objects
#[derive(Clone, Copy, Debug)]
pub struct ChainView<'a> {
    pub game: &'a GameState,
    pub admin_objects: &'a [LedgerObject],
    pub player_objects: &'a HashMap<Address, Vec<LedgerObject>>,
}

impl<'a> ChainView<'a> {
    pub fn new(
        game: &'a GameState,
        admin_objects: &'a [LedgerObject],
        player_objects: &'a HashMap<Address, Vec<LedgerObject>>,
    ) -> Self {
        Self {
            game,
            admin_objects,
            player_objects,
        }
    }

    pub fn objects_of(&self, owner: &Address) -> &'a [LedgerObject] {
        self.player_objects
            .get(owner)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn joins(&self) -> impl Iterator<Item = &'a JoinGame> {
        let game_id = self.game.id;
        self.admin_objects.iter().filter_map(move |o| match o {
            LedgerObject::JoinGame(j) if j.game_id == game_id => Some(j),
            _ => None,
        })
    }

    fn leaves(&self) -> impl Iterator<Item = &'a LeaveGame> {
        let game_id = self.game.id;
        self.admin_objects.iter().filter_map(move |o| match o {
            LedgerObject::LeaveGame(l) if l.game_id == game_id => Some(l),
            _ => None,
        })
    }

    fn find_bet(&self, player: &Address, round: u8, matches: impl Fn(&BetObject) -> bool) -> Option<&'a BetObject> {
        self.admin_objects.iter().find_map(|o| match o {
            LedgerObject::Bet(b)
                if b.game_id == self.game.id && b.player == *player && b.round == round && matches(b) =>
            {
                Some(b)
            }
            _ => None,
        })
    }

    fn find_betless(&self, player: &Address, round: u8, code: u8) -> Option<&'a BetlessObject> {
        self.admin_objects.iter().find_map(|o| match o {
            LedgerObject::Betless(b)
                if b.game_id == self.game.id
                    && b.player == *player
                    && b.round == round
                    && b.betless_type == code =>
            {
                Some(b)
            }
            _ => None,
        })
    }

    fn find_shuffled_deck(&self, objects: &'a [LedgerObject]) -> Option<&'a ShuffledDeck> {
        let game = self.game;
        objects.iter().find_map(|o| match o {
            LedgerObject::ShuffledDeck(d)
                if d.game_id == game.id
                    && d.hand_idx == game.hand_idx
                    && d.public_key == game.group_public_key =>
            {
                Some(d)
            }
            _ => None,
        })
    }

    fn find_decrypt(&self, player: &Address, key: &Point, round: u8, is_final: bool) -> Option<&'a PartialDecrypt> {
        let game = self.game;
        self.admin_objects.iter().find_map(|o| match o {
            LedgerObject::PartialDecrypt(d)
                if d.game_id == game.id
                    && d.from == *player
                    && d.hand_idx == game.hand_idx
                    && d.round == round
                    && d.is_final == is_final
                    && d.public_key == *key =>
            {
                Some(d)
            }
            _ => None,
        })
    }

    fn find_decrypt_many(&self, player: &Address, key: &Point) -> Option<&'a PartialDecryptMany> {
        let game = self.game;
        self.admin_objects.iter().find_map(|o| match o {
            LedgerObject::PartialDecryptMany(d)
                if d.game_id == game.id
                    && d.from == *player
                    && d.hand_idx == game.hand_idx
                    && d.public_key == *key =>
            {
                Some(d)
            }
            _ => None,
        })
    }
}

/// Every action currently legal for anyone at the table, in priority order.
///
/// All participants run this over the same snapshot and each picks the
/// actions addressed to them (or to the admin).
pub fn infer_actions(view: &ChainView<'_>, new_player: Option<&Address>) -> Result<Vec<Action>> {
    let game = view.game;
    let mut actions = vec![];

    let seat_mutation = housekeeping(view, new_player, &mut actions);
    if game.started && !seat_mutation && game.num_players() > 1 {
        if game.deck.is_empty() {
            shuffle_chain(view, &mut actions)?;
        } else {
            hand_actions(view, &mut actions)?;
        }
    }

    debug!(game = %game.id, hand = game.hand_idx, count = actions.len(), "inferred actions");
    Ok(actions)
}

/// At most one seat mutation per poll: leaves, then busted players, then joins.
fn housekeeping(view: &ChainView<'_>, new_player: Option<&Address>, actions: &mut Vec<Action>) -> bool {
    let game = view.game;
    let mut seat_mutation = false;
    let mut leaving = vec![];

    for leave in view.leaves() {
        let Some(idx) = game.player_index(&leave.player) else {
            continue;
        };
        leaving.push(leave.player);
        if game.can_add_player && !seat_mutation {
            seat_mutation = true;
            actions.push(Action::admin(Payload::RemovePlayer {
                game_id: game.id,
                leave_id: leave.id,
                group_key: game.group_public_key,
                player_key: game.public_keys.get(idx).copied().unwrap_or_default(),
            }));
        }
    }

    for (i, player) in game.players.iter().enumerate() {
        if !leaving.contains(player) {
            actions.push(Action::player(
                *player,
                Payload::Leave {
                    game_id: game.id,
                    admin: game.admin,
                },
            ));
        }
        let balance = game.player_balances.get(i).copied().unwrap_or(0);
        if balance < game.big_blind && game.can_add_player && !seat_mutation {
            seat_mutation = true;
            actions.push(Action::admin(Payload::RemoveBustPlayer {
                game_id: game.id,
                player: *player,
                group_key: game.group_public_key,
                player_key: game.public_keys.get(i).copied().unwrap_or_default(),
            }));
        }
    }

    let mut seated = game.players.clone();
    let mut join_pending = false;
    for join in view.joins() {
        if seated.contains(&join.player)
            || seat_mutation
            || join.balance < game.big_blind
            || game.player_seats.contains(&join.seat)
            || join.seat >= MAX_SEATS
            || seated.len() >= MAX_PLAYERS
        {
            continue;
        }
        if Some(&join.player) == new_player {
            join_pending = true;
        }
        if game.can_add_player {
            seated.push(join.player);
            seat_mutation = true;
            actions.push(Action::admin(Payload::AddPlayer {
                game_id: game.id,
                join_id: join.id,
                group_key: game.group_public_key,
                new_key: join.point,
            }));
        }
    }

    if let Some(new_player) = new_player {
        let table_full = game.players.len() >= MAX_PLAYERS;
        if !join_pending && !table_full && !game.players.contains(new_player) {
            actions.push(
                Action::player(
                    *new_player,
                    Payload::Join {
                        game_id: game.id,
                        admin: game.admin,
                        address: *new_player,
                    },
                )
                .with_inputs(vec![InputKind::Balance, InputKind::Seat]),
            );
        }
    }

    seat_mutation
}

/// Deck passes `p0 -> p1 -> ... -> admin`; whoever holds a deck for this hand
/// and group key is next.
fn shuffle_chain(view: &ChainView<'_>, actions: &mut Vec<Action>) -> Result<()> {
    let game = view.game;
    let mut order = game.players.clone();
    order.push(game.admin);
    order.reverse();

    let last = order.len() - 1;
    for (i, actor) in order.iter().enumerate() {
        if i == last {
            debug!(game = %game.id, from = %actor, "nobody holds a deck, starting plain shuffle");
            actions.push(shuffle_action(game, *actor, order[i - 1], ShuffleSource::Plain));
            break;
        }
        let owned = if i == 0 {
            view.admin_objects
        } else {
            view.objects_of(actor)
        };
        let Some(deck) = view.find_shuffled_deck(owned) else {
            continue;
        };
        let inputs = decompress_deck(&deck.deck)?;
        if i == 0 {
            actions.push(
                Action::admin(Payload::CompleteShuffle {
                    game_id: game.id,
                    deck_id: deck.id,
                    inputs,
                })
                .with_key(vec![KeyPart::Number(game.hand_idx)]),
            );
        } else {
            let source = ShuffleSource::Deck {
                deck_id: deck.id,
                inputs,
            };
            actions.push(shuffle_action(game, *actor, order[i - 1], source));
        }
        break;
    }
    Ok(())
}

fn shuffle_action(game: &GameState, from: Address, to: Address, source: ShuffleSource) -> Action {
    Action::player(
        from,
        Payload::Shuffle {
            game_id: game.id,
            hand_idx: game.hand_idx,
            to,
            group_key: game.group_public_key,
            source,
        },
    )
    .with_inputs(vec![InputKind::ZeroEncryption])
    .with_key(vec![
        KeyPart::Address(to),
        KeyPart::Number(game.hand_idx),
        KeyPart::Field(game.group_public_key.x),
    ])
}

fn hand_actions(view: &ChainView<'_>, actions: &mut Vec<Action>) -> Result<()> {
    let game = view.game;
    let betting = BettingView::from_state(game);

    let blinds = [
        (betting.small_blind_idx, game.sb_submitted, game.small_blind),
        (betting.big_blind_idx, game.bb_submitted, game.big_blind),
    ];
    for (idx, submitted, amount) in blinds {
        if submitted {
            continue;
        }
        let Some(player) = game.get_player(idx) else {
            continue;
        };
        match view.find_bet(player, 0, |b| b.amount == amount) {
            Some(bet) => actions.push(Action::admin(Payload::AddBet {
                game_id: game.id,
                bet_id: bet.id,
            })),
            None => actions.push(
                Action::player(
                    *player,
                    Payload::BlindBet {
                        game_id: game.id,
                        hand_idx: game.hand_idx,
                        admin: game.admin,
                        amount,
                    },
                )
                .with_key(vec![KeyPart::Number(game.hand_idx)]),
            ),
        }
    }

    if game.sb_submitted && game.bb_submitted {
        if game.hand_over {
            actions.push(Action::admin(Payload::ResetGame { game_id: game.id }));
        } else {
            if game.decrypt_round.checked_sub(1) == Some(game.bet_round) {
                bet_actions(view, &betting, actions)?;
            }
            if game.decrypt_round == game.bet_round || game.betting_over() {
                decrypt_actions(view, actions)?;
            }
            if game.bet_round == NUM_ROUNDS && game.decrypt_round == NUM_ROUNDS && all_revealed(game) {
                actions.push(Action::admin(Payload::FindWinner { game_id: game.id }));
            }
        }
    }

    reveal_actions(game, actions)
}

fn bet_actions(view: &ChainView<'_>, betting: &BettingView, actions: &mut Vec<Action>) -> Result<()> {
    let game = view.game;
    let Some(bet_player) = game.get_player(betting.bet_player) else {
        return Ok(());
    };

    let mut found = false;
    for bet_type in ADDABLE_BETS {
        if !betting.can(bet_type) {
            continue;
        }
        let action = if bet_type.is_betless() {
            view.find_betless(bet_player, game.bet_round, bet_type.code())
                .map(|b| Payload::AddBetless {
                    game_id: game.id,
                    betless_id: b.id,
                })
        } else {
            view.find_bet(bet_player, game.bet_round, |b| b.bet_type == bet_type.code())
                .map(|b| Payload::AddBet {
                    game_id: game.id,
                    bet_id: b.id,
                })
        };
        if let Some(payload) = action {
            actions.push(Action::admin(payload));
            found = true;
        }
    }
    if found {
        return Ok(());
    }

    let (c1s, decrypt_rounds) = if game.current_hand_players.len() > 2 {
        let rounds: Vec<usize> = (game.decrypt_round as usize..game.rounds.len()).collect();
        c1s_for_rounds(game, &rounds, bet_player, false)?
    } else {
        (vec![], vec![])
    };
    actions.push(
        Action::player(
            *bet_player,
            Payload::Bet {
                game_id: game.id,
                hand_idx: game.hand_idx,
                admin: game.admin,
                bet_round: game.bet_round,
                decrypt_rounds,
                c1s,
            },
        )
        .with_inputs(vec![InputKind::BetType, InputKind::Amount])
        .with_key(vec![KeyPart::Number(game.pot)]),
    );
    Ok(())
}

fn decrypt_actions(view: &ChainView<'_>, actions: &mut Vec<Action>) -> Result<()> {
    let game = view.game;
    let reveal_phase = game.is_reveal_phase();
    let round = if reveal_phase { 0 } else { game.decrypt_round };

    let mut decrypts_to_add = vec![];
    let mut manys_to_add = vec![];
    for (idx, player) in game.players.iter().enumerate() {
        let player_key = game.public_keys.get(idx).copied().unwrap_or_default();
        let is_in = game.is_in_hand(idx);

        if game.betting_over() || !is_in {
            if let Some(found) = view.find_decrypt_many(player, &player_key) {
                manys_to_add.push(found.id);
                continue;
            }
            let rounds: Vec<usize> = (0..game.rounds.len())
                .filter(|&i| (i == 0 && is_in) || i >= game.decrypt_round as usize)
                .collect();
            let (c1s, used) = c1s_for_rounds(game, &rounds, player, true)?;
            if c1s.is_empty() {
                continue;
            }
            let key = used.iter().map(|r| KeyPart::Number(*r as u64)).collect();
            actions.push(
                Action::player(
                    *player,
                    Payload::DecryptMany {
                        game_id: game.id,
                        hand_idx: game.hand_idx,
                        admin: game.admin,
                        rounds: used,
                        c1s,
                    },
                )
                .with_key(key),
            );
        } else {
            if let Some(found) = view.find_decrypt(player, &player_key, round, reveal_phase) {
                decrypts_to_add.push(found.id);
                continue;
            }
            let (c1s, _) = c1s_for_rounds(game, &[round as usize], player, false)?;
            if c1s.is_empty() {
                continue;
            }
            actions.push(
                Action::player(
                    *player,
                    Payload::Decrypt {
                        game_id: game.id,
                        hand_idx: game.hand_idx,
                        admin: game.admin,
                        round,
                        is_final: reveal_phase,
                        c1s,
                    },
                )
                .with_key(vec![KeyPart::Number(round as u64)]),
            );
        }
    }

    if !decrypts_to_add.is_empty() {
        actions.push(Action::admin(Payload::AddDecrypts {
            game_id: game.id,
            decrypt_ids: decrypts_to_add,
        }));
    }
    if !manys_to_add.is_empty() {
        actions.push(Action::admin(Payload::AddDecryptManys {
            game_id: game.id,
            decrypt_ids: manys_to_add,
        }));
    }
    Ok(())
}

/// `c1` of every card in `rounds` that `player` still has to decrypt.
///
/// Board cards always count. Otherwise with `showdown` the player opens their
/// own cards, without it everybody else's.
pub fn c1s_for_rounds(
    game: &GameState,
    rounds: &[usize],
    player: &Address,
    showdown: bool,
) -> Result<(Vec<Point>, Vec<u8>)> {
    let mut c1s = vec![];
    let mut used = vec![];
    for slot in game.card_slots() {
        if !rounds.contains(&slot.round) || slot.card.has_decrypt_from(player) {
            continue;
        }
        let owns = game.get_player(slot.owner as usize) == Some(player);
        if slot.is_public() || owns == showdown {
            if !used.contains(&(slot.round as u8)) {
                used.push(slot.round as u8);
            }
            c1s.push(slot.card.cipher_text.c1.decompress()?);
        }
    }
    Ok((c1s, used))
}

fn all_revealed(game: &GameState) -> bool {
    game.card_slots()
        .filter(|slot| slot.is_public() || game.is_in_hand(slot.owner as usize))
        .all(|slot| slot.card.revealed)
}

fn reveal_actions(game: &GameState, actions: &mut Vec<Action>) -> Result<()> {
    let mut card_indices = vec![];
    let mut decrypts = vec![];
    let mut c2s = vec![];
    for (i, card) in game.deck.iter().enumerate() {
        if card.revealable && !card.revealed {
            card_indices.push(i as u8);
            decrypts.push(card.decrypts.clone());
            c2s.push(card.cipher_text.c2.decompress()?);
        }
    }
    if !card_indices.is_empty() {
        actions.push(Action::admin(Payload::RevealMany {
            game_id: game.id,
            card_indices,
            decrypts,
            c2s,
        }));
    }
    Ok(())
}
