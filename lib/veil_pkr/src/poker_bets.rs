//! Veil (Verifiable ELgamal poker)
//!
//! Mental Poker (1979) implemented using ElGamal over the Baby Jubjub curve.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

use serde::{Deserialize, Serialize};

use crate::poker_state::GameState;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BetType {
    Call,
    Bet,
    Fold,
    Check,
    BlindBet,
}

impl BetType {
    /// Code stored in `Bet`/`Betless` objects and passed to the `bet` entry point
    pub const fn code(&self) -> u8 {
        match self {
            BetType::Call => 0,
            BetType::Bet => 2,
            BetType::Check => 3,
            BetType::Fold => 4,
            BetType::BlindBet => 5,
        }
    }

    /// Fold and check move no chips and are recorded as `Betless` objects.
    pub const fn is_betless(&self) -> bool {
        matches!(self, BetType::Fold | BetType::Check)
    }

    pub const fn name(&self) -> &'static str {
        match self {
            BetType::Call => "call",
            BetType::Bet => "bet",
            BetType::Fold => "fold",
            BetType::Check => "check",
            BetType::BlindBet => "blind_bet",
        }
    }
}

/// Bet objects the admin may fold into the game, in the order they are searched
pub const ADDABLE_BETS: [BetType; 4] = [BetType::Fold, BetType::Check, BetType::Call, BetType::Bet];

pub fn call_amount(balance: u64, committed: u64, current_bet: u64) -> u64 {
    balance.min(current_bet.saturating_sub(committed))
}

pub fn available_actions(balance: u64, call_amount: u64) -> Vec<BetType> {
    let mut actions = Vec::with_capacity(3);
    if call_amount > 0 {
        actions.push(BetType::Call);
    } else {
        actions.push(BetType::Check);
    }
    if balance > call_amount {
        actions.push(BetType::Bet);
    }
    actions.push(BetType::Fold);
    actions
}

/// Heads-up the button posts the small blind.
pub fn blind_indices(num_players: usize, button_idx: usize) -> (usize, usize) {
    if num_players == 0 {
        return (0, 0);
    }
    if num_players == 2 {
        (button_idx % 2, (button_idx + 1) % 2)
    } else {
        (
            (button_idx + 1) % num_players,
            (button_idx + 2) % num_players,
        )
    }
}

/// Betting position of the player on turn, derived from ledger state alone
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BettingView {
    pub bet_player: usize,
    pub call_amount: u64,
    pub available_actions: Vec<BetType>,
    pub small_blind_idx: usize,
    pub big_blind_idx: usize,
}

impl BettingView {
    pub fn from_state(state: &GameState) -> Self {
        let bet_player = state.bet_player as usize;
        let balance = state.player_balances.get(bet_player).copied().unwrap_or(0);
        let committed = state.current_bets.get(bet_player).copied().unwrap_or(0);
        let call_amount = call_amount(balance, committed, state.current_bet);
        let (small_blind_idx, big_blind_idx) =
            blind_indices(state.num_players(), state.button_idx as usize);
        Self {
            bet_player,
            call_amount,
            available_actions: available_actions(balance, call_amount),
            small_blind_idx,
            big_blind_idx,
        }
    }

    pub fn can(&self, bet_type: BetType) -> bool {
        self.available_actions.contains(&bet_type)
    }
}
