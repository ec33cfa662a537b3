//! Veil (Verifiable ELgamal poker)
//!
//! Mental Poker (1979) implemented using ElGamal over the Baby Jubjub curve.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

mod referee;

use alloy_primitives::B256;
use itertools::Itertools;
use rand::{Rng, distributions::Uniform, rngs::ThreadRng, thread_rng};
use veil_jub::{Point, scalar::generate_secret_key, types::SecretKey};
use veil_pkr::{
    PkrError,
    cache::{DeckCache, DedupTracker, ZeroEncryptionCache},
    poker_actions::{Action, ActionType, Payload, c1s_for_rounds, infer_actions},
    poker_bets::{BetType, BettingView},
    poker_calls::{ActionHandler, CallerInputs, HandlerConfig, Role, compensating_calls},
    poker_deck::partial_decrypt,
    poker_shuffle::ZeroEncryption,
    poker_state::{Address, DECK_SIZE, GameState, MAX_PLAYERS, MAX_SEATS, ObjectId, PrivateState},
    poker_table::{CardState, parse_game_state},
    prover::{
        Circuit, ProofOracle, ProofOutput, ProverError, Witness, prove_deck_hash,
        zero_encrypt_witness,
    },
};

use crate::referee::{Attested, Referee, RefereeError};

const PACKAGE_ID: &str = "0x7e11";
const GAME_ID: ObjectId = B256::repeat_byte(0x9a);
const ADMIN: Address = B256::repeat_byte(0xad);
const PREFERRED_SEATS: [u8; 5] = [0, 2, 3, 5, 6];
const MAX_STEPS: usize = 10_000;

/// Proves nothing; the witness fields come back as public signals.
pub struct LocalOracle;

impl ProofOracle for LocalOracle {
    fn prove(&self, circuit: Circuit, witness: &Witness) -> Result<ProofOutput, ProverError> {
        tracing::trace!(circuit = circuit.name(), "proving");
        let public_signals = witness
            .inputs()
            .iter()
            .filter_map(|(name, _)| witness.get_field(name))
            .collect();
        Ok(ProofOutput {
            public_signals,
            ..Default::default()
        })
    }
}

fn cards_str(cards: &[CardState]) -> String {
    cards
        .iter()
        .map(|c| c.card.map_or("_!".to_string(), |c| c.to_string()))
        .join(", ")
}

pub struct PokerBot<'a> {
    state: PrivateState,
    oracle: &'a LocalOracle,
    handler: ActionHandler<'a, LocalOracle>,
    zero_encryptions: ZeroEncryptionCache,
    decks: DeckCache,
    performed: DedupTracker,
    prepared_hand: Option<u64>,
    chips: u64,
}

impl<'a> PokerBot<'a> {
    pub fn new(player_id: u8, oracle: &'a LocalOracle, chips: u64, rng: &mut ThreadRng) -> Self {
        let sk: SecretKey = generate_secret_key(rng);
        let address = B256::with_last_byte(player_id);
        let config = HandlerConfig {
            package_id: PACKAGE_ID.to_string(),
            role: Role::Player(address),
        };
        Self {
            state: PrivateState::new(address, sk),
            oracle,
            handler: ActionHandler::new(config, oracle, sk),
            zero_encryptions: ZeroEncryptionCache::new(),
            decks: DeckCache::new(),
            performed: DedupTracker::new(),
            prepared_hand: None,
            chips,
        }
    }

    pub fn address(&self) -> Address {
        self.state.player
    }

    pub fn wants(&self, action: &Action) -> bool {
        action.is_from(&self.address()) && !self.performed.is_duplicate(action.game_id(), action)
    }

    /// Work that can happen before it is our turn.
    pub fn observe(&mut self, game: &GameState) -> Result<(), PkrError> {
        if game.deck.is_empty() || self.prepared_hand == Some(game.hand_idx) {
            return Ok(());
        }
        self.prepared_hand = Some(game.hand_idx);
        let sk = self.state.secret_key;
        let (c1s, _) = c1s_for_rounds(game, &[0], &self.address(), false)?;
        let proofs = self.handler.decrypt_proofs_mut();
        proofs.clear();
        let count = proofs.precompute(self.oracle, &sk, &c1s)?;
        tracing::debug!(player = %self.address(), count, "precomputed decrypt proofs");
        Ok(())
    }

    fn choose_seat(game: &GameState) -> Option<u8> {
        let free = |seat: &u8| !game.player_seats.contains(seat);
        PREFERRED_SEATS
            .iter()
            .copied()
            .find(free)
            .or_else(|| (0..MAX_SEATS).find(free))
    }

    fn choose_bet(&self, game: &GameState, rng: &mut ThreadRng) -> (BetType, u64) {
        let betting = BettingView::from_state(game);
        let balance = game
            .player_balances
            .get(betting.bet_player)
            .copied()
            .unwrap_or(0);
        let bet_type = if betting.can(BetType::Check) && betting.can(BetType::Bet) {
            if rng.gen_bool(0.5) {
                BetType::Check
            } else {
                BetType::Bet
            }
        } else if betting.can(BetType::Check) {
            BetType::Check
        } else if rng.gen_bool(0.2) {
            BetType::Fold
        } else {
            BetType::Call
        };
        let amount = match bet_type {
            BetType::Call => betting.call_amount,
            BetType::Bet => balance.min(betting.call_amount + game.raise_amount.max(game.big_blind)),
            _ => 0,
        };
        (bet_type, amount)
    }

    fn choose_inputs(&mut self, action: &Action, game: &GameState, rng: &mut ThreadRng) -> CallerInputs {
        match &action.payload {
            Payload::Join { .. } => CallerInputs {
                balance: Some(self.chips),
                seat: Self::choose_seat(game),
                ..Default::default()
            },
            Payload::Shuffle {
                game_id, group_key, ..
            } => {
                let zero = self
                    .zero_encryptions
                    .take(game_id, group_key)
                    .unwrap_or_else(|| ZeroEncryption::new(group_key, DECK_SIZE, rng));
                CallerInputs {
                    zero_encryption: Some(zero),
                    ..Default::default()
                }
            }
            Payload::Bet { .. } => {
                let (bet_type, amount) = self.choose_bet(game, rng);
                CallerInputs {
                    bet_type: Some(bet_type),
                    amount: Some(amount),
                    ..Default::default()
                }
            }
            _ => CallerInputs::default(),
        }
    }

    fn attest(&self, action: &Action) -> Attested {
        let shares = |c1s: &[Point]| -> Vec<(Point, Point)> {
            c1s.iter()
                .map(|c1| (*c1, partial_decrypt(&self.state.secret_key, c1)))
                .collect()
        };
        match &action.payload {
            Payload::Join { .. } => Attested {
                public_key: Some(self.state.public_key),
                ..Default::default()
            },
            Payload::Decrypt { c1s, .. }
            | Payload::DecryptMany { c1s, .. }
            | Payload::Bet { c1s, .. } => Attested {
                shares: shares(c1s.as_slice()),
                ..Default::default()
            },
            _ => Attested::default(),
        }
    }

    fn own_cards_str(&mut self, game: &GameState) -> String {
        match parse_game_state(game, Some(&self.state), &mut self.decks) {
            Ok(parsed) => parsed
                .player_state(&self.state.player)
                .map(|s| cards_str(&s.cards))
                .unwrap_or_default(),
            Err(err) => format!("unreadable: {}", err),
        }
    }

    pub fn act(&mut self, action: &Action, referee: &mut Referee, rng: &mut ThreadRng) -> Result<(), RefereeError> {
        let inputs = self.choose_inputs(action, &referee.game, rng);
        if let (Some(bet_type), Some(amount)) = (inputs.bet_type, inputs.amount) {
            let cards = self.own_cards_str(&referee.game);
            tracing::info!(
                "Player {} ({}) {}: ${}",
                self.address(),
                cards,
                bet_type.name(),
                amount
            );
        }
        let Some(call) = self.handler.handle(action, inputs, rng)? else {
            return Ok(());
        };
        referee.submit(self.address(), action, &call, self.attest(action))?;
        self.performed.record(*action.game_id(), action.clone());

        // The cached blinding is spent, prepare the next one while others shuffle
        if let Payload::Shuffle {
            game_id, group_key, ..
        } = &action.payload
        {
            let zero = ZeroEncryption::new(group_key, DECK_SIZE, rng);
            let proof = self
                .oracle
                .prove(Circuit::ZeroEncrypt, &zero_encrypt_witness(&zero.rands, group_key))
                .map_err(PkrError::from)?;
            self.zero_encryptions.insert(*game_id, zero.with_proof(proof));
        }
        Ok(())
    }
}

pub struct Dealer<'a> {
    oracle: &'a LocalOracle,
    handler: ActionHandler<'a, LocalOracle>,
    performed: DedupTracker,
}

impl<'a> Dealer<'a> {
    pub fn new(oracle: &'a LocalOracle, rng: &mut ThreadRng) -> Self {
        let config = HandlerConfig {
            package_id: PACKAGE_ID.to_string(),
            role: Role::Admin,
        };
        Self {
            oracle,
            handler: ActionHandler::new(config, oracle, generate_secret_key(rng)),
            performed: DedupTracker::new(),
        }
    }

    pub fn wants(&self, action: &Action) -> bool {
        action.admin && !self.performed.is_exact_repeat(action.game_id(), action)
    }

    pub fn act(&mut self, action: &Action, referee: &mut Referee, rng: &mut ThreadRng) -> Result<(), RefereeError> {
        let Some(call) = self.handler.handle(action, CallerInputs::default(), rng)? else {
            return Ok(());
        };
        self.performed.record(*action.game_id(), action.clone());
        if let Err(err) = referee.submit(ADMIN, action, &call, Attested::default()) {
            tracing::warn!(%err, call = %call.target, "submission rejected");
            for undo in compensating_calls(PACKAGE_ID, std::slice::from_ref(action)) {
                referee.compensate(&undo)?;
            }
            return Err(err);
        }

        if let Payload::CompleteShuffle { inputs, .. } = &action.payload {
            let commitment = prove_deck_hash(self.oracle, inputs, true)?;
            tracing::debug!(signals = ?commitment.public_signals, "deck committed");
        }
        Ok(())
    }
}

/// Performs the first action somebody at the table wants to take.
fn step(
    actions: &[Action],
    referee: &mut Referee,
    dealer: &mut Dealer<'_>,
    bots: &mut [PokerBot<'_>],
    rng: &mut ThreadRng,
) -> Result<bool, RefereeError> {
    for action in actions {
        if action.action_type() == ActionType::Leave {
            continue;
        }
        if dealer.wants(action) {
            dealer.act(action, referee, rng)?;
            return Ok(true);
        }
        if let Some(bot) = bots.iter_mut().find(|b| b.wants(action)) {
            bot.act(action, referee, rng)?;
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn run(num_players: usize, initial_chips: u64, small_blind: u64, hands: usize) -> Result<(), RefereeError> {
    let oracle = LocalOracle;
    let mut rng = thread_rng();
    let mut referee = Referee::new(GAME_ID, ADMIN, small_blind);
    let mut dealer = Dealer::new(&oracle, &mut rng);
    let mut bots = (0..num_players)
        .map(|i| PokerBot::new(1 + i as u8, &oracle, initial_chips, &mut rng))
        .collect_vec();

    for steps in 0..MAX_STEPS {
        if referee.hands_played() >= hands {
            tracing::info!("Played {} hands", hands);
            return Ok(());
        }
        let newcomer = bots
            .iter()
            .map(PokerBot::address)
            .find(|a| !referee.game.players.contains(a));
        if newcomer.is_none() && !referee.game.started {
            referee.start();
        }
        for bot in bots.iter_mut() {
            bot.observe(&referee.game)?;
        }

        let actions = infer_actions(&referee.view(), newcomer.as_ref())?;
        if !step(&actions, &mut referee, &mut dealer, &mut bots, &mut rng)? {
            if referee.game.started && referee.game.num_players() < 2 {
                tracing::info!("Table broke up");
                return Ok(());
            }
            return Err(RefereeError::Stalled(steps));
        }
    }
    Err(RefereeError::Stalled(MAX_STEPS))
}

fn init_logging() {
    if cfg!(feature = "pure_output") {
        tracing_subscriber::fmt()
            .with_target(false)
            .with_level(false)
            .without_time()
            .init();
    } else {
        tracing_subscriber::fmt::init();
    }
}

pub fn main() {
    init_logging();

    #[cfg(not(feature = "full_table"))]
    let num_players = thread_rng().sample(Uniform::new_inclusive(2usize, MAX_PLAYERS));

    #[cfg(feature = "full_table")]
    let num_players = MAX_PLAYERS;

    let initial_chips = 1000;
    let small_blind = 10;
    let hands = 3;

    if let Err(err) = run(num_players, initial_chips, small_blind, hands) {
        tracing::error!("Error: {}", err);
    }
}
