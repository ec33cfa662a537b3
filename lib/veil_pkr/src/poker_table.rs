//! Veil (Verifiable ELgamal poker)
//!
//! Mental Poker (1979) implemented using ElGamal over the Baby Jubjub curve.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

use serde::Serialize;
use tracing::debug;

use crate::{
    cache::DeckCache,
    error::{PkrError, Result},
    poker_bets::{BetType, BettingView},
    poker_deck::{CanonicalDeck, CardIndex, apply_decrypts, private_decrypt},
    poker_state::{Address, CardSlot, GameState, PrivateState},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CardState {
    /// Known card, `None` while it is still hidden
    pub card: Option<CardIndex>,
    /// Resolved locally rather than read from the ledger
    pub decrypted: bool,
}

impl CardState {
    pub const fn hidden() -> Self {
        Self {
            card: None,
            decrypted: false,
        }
    }

    pub const fn is_revealed(&self) -> bool {
        self.card.is_some()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PlayerState {
    pub cards: Vec<CardState>,
    pub balance: u64,
    pub bet: u64,
    pub seat: u8,
    pub is_in_hand: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParsedGameState {
    pub players: Vec<Address>,
    pub player_states: Vec<PlayerState>,
    pub public_cards: Vec<CardState>,
    pub pots: Vec<u64>,
    pub bet_player: Option<Address>,
    pub call_amount: u64,
    pub bet_amount: u64,
    pub raise_amount: u64,
    pub bet_round: u8,
    pub available_actions: Vec<BetType>,
    pub small_blind: u64,
    pub big_blind: u64,
    pub button_idx: usize,
    pub small_blind_idx: usize,
    pub big_blind_idx: usize,
}

impl ParsedGameState {
    pub fn player_state(&self, player: &Address) -> Option<&PlayerState> {
        let idx = self.players.iter().position(|p| p == player)?;
        self.player_states.get(idx)
    }
}

/// Builds the per-poll view of a game, opening every card the caller is
/// entitled to see.
pub fn parse_game_state(
    state: &GameState,
    viewer: Option<&PrivateState>,
    decks: &mut DeckCache,
) -> Result<ParsedGameState> {
    let mut player_states: Vec<PlayerState> = state
        .players
        .iter()
        .enumerate()
        .map(|(i, _)| PlayerState {
            cards: vec![],
            balance: state.player_balances.get(i).copied().unwrap_or(0),
            bet: state.current_bets.get(i).copied().unwrap_or(0),
            seat: state.player_seats.get(i).copied().unwrap_or(0),
            is_in_hand: state.is_in_hand(i),
        })
        .collect();
    let mut public_cards = vec![];

    let deck = decks.standard();
    for slot in state.card_slots() {
        if slot.is_public() {
            public_cards.push(board_card(&slot, deck)?);
            continue;
        }
        let owner = slot.owner as usize;
        let player = state
            .get_player(owner)
            .ok_or(PkrError::PlayerIndex(owner))?;
        let own = viewer.filter(|v| v.player == *player);
        let card = hole_card(&slot, own, deck)?;
        player_states[owner].cards.push(card);
    }

    let betting = BettingView::from_state(state);

    Ok(ParsedGameState {
        players: state.players.clone(),
        player_states,
        public_cards,
        pots: vec![state.pot],
        bet_player: state.get_player(betting.bet_player).copied(),
        call_amount: betting.call_amount,
        bet_amount: state.current_bet,
        raise_amount: state.raise_amount,
        bet_round: state.bet_round,
        available_actions: betting.available_actions,
        small_blind: state.small_blind,
        big_blind: state.big_blind,
        button_idx: state.button_idx as usize,
        small_blind_idx: betting.small_blind_idx,
        big_blind_idx: betting.big_blind_idx,
    })
}

fn on_chain(slot: &CardSlot<'_>) -> CardState {
    CardState {
        card: slot
            .card
            .revealed
            .then_some(CardIndex(slot.card.reveal_card)),
        decrypted: false,
    }
}

fn board_card(slot: &CardSlot<'_>, deck: &CanonicalDeck) -> Result<CardState> {
    let card = slot.card;
    if !card.revealable || card.revealed {
        return Ok(on_chain(slot));
    }
    let index = apply_decrypts(deck, &card.decompress()?, &card.decrypts)?;
    debug!(position = slot.position, %index, "opened board card");
    Ok(CardState {
        card: Some(index),
        decrypted: true,
    })
}

fn hole_card(
    slot: &CardSlot<'_>,
    own: Option<&PrivateState>,
    deck: &CanonicalDeck,
) -> Result<CardState> {
    let card = slot.card;
    if !card.completed_decrypt || card.revealed {
        return Ok(on_chain(slot));
    }
    let index = if card.revealable {
        apply_decrypts(deck, &card.decompress()?, &card.decrypts)?
    } else if let Some(own) = own {
        private_decrypt(deck, &card.decompress()?, &card.decrypts, &own.secret_key)?
    } else {
        return Ok(on_chain(slot));
    };
    debug!(position = slot.position, owner = slot.owner, "opened hole card");
    Ok(CardState {
        card: Some(index),
        decrypted: true,
    })
}
