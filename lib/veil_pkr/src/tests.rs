//! Veil (Verifiable ELgamal poker)
//!
//! Mental Poker (1979) implemented using ElGamal over the Baby Jubjub curve.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
};

use alloy_primitives::{B256, U256};
use itertools::Itertools;
use rand::{SeedableRng, rngs::StdRng};
use veil_jub::{
    Point,
    scalar::generate_secret_key,
    types::{PublicKey, SecretKey},
    util::make_public_key_from_secret_key,
};

use crate::{
    PkrError,
    cache::{DecryptProofCache, DeckCache, DedupTracker, ZeroEncryptionCache},
    poker_actions::{
        Action, ActionType, ChainView, InputKind, KeyPart, Payload, ShuffleSource,
        actions_are_same, infer_actions,
    },
    poker_bets::{BetType, BettingView, blind_indices},
    poker_calls::{
        ActionHandler, CallArg, CallerInputs, HandlerConfig, Role, bcs_bytes, bcs_bytes_vec,
        compensating_calls,
    },
    poker_deck::{
        CanonicalDeck, CardIndex, CipherText, apply_decrypts, compress_deck,
        decompress_deserialize_deck, parse_card_bits, partial_decrypt, private_decrypt,
        serialize_uncompressed_deck,
    },
    poker_shuffle::{Permutation, ZeroEncryption, encrypt_shuffle, random_permutation},
    poker_state::{
        DECK_SIZE, DealtCard, GameEvent, GameState, JoinGame, LeaveGame, LedgerObject,
        MAX_PLAYERS, NUM_ROUNDS, ObjectId, PUBLIC_IDX, PrivateState, REVEAL_LENGTH, ShuffledDeck,
    },
    poker_table::parse_game_state,
    prover::{
        Circuit, ProofOracle, ProofOutput, ProverError, Witness, hash_uncompressed_witness,
        prove_deck_hash, reveal_witness,
    },
};

const PACKAGE: &str = "0x2a";

/// Oracle handing back empty proofs, counting what it was asked for
#[derive(Default)]
struct CountingOracle {
    calls: AtomicUsize,
}

impl ProofOracle for CountingOracle {
    fn prove(&self, _circuit: Circuit, witness: &Witness) -> Result<ProofOutput, ProverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
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

struct Table {
    secret_keys: Vec<SecretKey>,
    public_keys: Vec<PublicKey>,
    group_key: PublicKey,
    /// Deck after every player shuffled once
    deck: Vec<CipherText>,
}

fn address(tag: u8) -> B256 {
    B256::repeat_byte(tag)
}

fn shuffle_table(num_players: usize, rng: &mut StdRng) -> Table {
    let secret_keys = (0..num_players).map(|_| generate_secret_key(rng)).collect_vec();
    let public_keys = secret_keys
        .iter()
        .map(make_public_key_from_secret_key)
        .collect_vec();
    let group_key: PublicKey = public_keys.iter().copied().sum();

    let mut deck = CanonicalDeck::new(DECK_SIZE).cards().to_vec();
    for _ in 0..num_players {
        let zero = ZeroEncryption::new(&group_key, DECK_SIZE, rng);
        let perm = random_permutation(DECK_SIZE, rng);
        deck = encrypt_shuffle(&zero.cipher_texts, &deck, &perm).unwrap();
    }

    Table {
        secret_keys,
        public_keys,
        group_key,
        deck,
    }
}

fn open(deck: &CanonicalDeck, ct: &CipherText, secret_keys: &[SecretKey]) -> CardIndex {
    let shares = secret_keys
        .iter()
        .map(|sk| partial_decrypt(sk, &ct.c1))
        .collect_vec();
    apply_decrypts(deck, ct, &shares).unwrap()
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

fn heads_up_game(table: &Table) -> GameState {
    GameState {
        id: address(0xaa),
        admin: address(0xad),
        players: vec![address(1), address(2)],
        player_balances: vec![100, 100],
        current_bets: vec![0, 0],
        player_seats: vec![0, 3],
        current_hand_players: vec![0, 1],
        public_keys: table.public_keys.clone(),
        group_public_key: table.group_key,
        hand_idx: 1,
        small_blind: 1,
        big_blind: 2,
        started: true,
        ..Default::default()
    }
}

/// Hole cards go round-robin, then flop, turn and river.
fn deal_holdem(game: &mut GameState, table: &Table) {
    let n = game.num_players() as u8;
    let hole = (0..2).flat_map(|_| 0..n).collect_vec();
    game.rounds = vec![
        hole,
        vec![PUBLIC_IDX; 3],
        vec![PUBLIC_IDX],
        vec![PUBLIC_IDX],
    ];
    let total = game.rounds.iter().map(Vec::len).sum::<usize>();
    game.deck = table.deck[..total].iter().map(dealt).collect();
}

#[test]
fn test_canonical_deck() {
    let deck = CanonicalDeck::new(DECK_SIZE);
    assert_eq!(deck.len(), DECK_SIZE);

    // Card `i` encodes `(i + 1)·G`, never the identity
    let mut point = Point::identity();
    for (i, card) in deck.cards().iter().enumerate() {
        point = point + Point::generator();
        assert_eq!(card.c1, Point::identity());
        assert_eq!(card.c2, point);
        assert_eq!(deck.find_card(&point), Some(CardIndex(i as u8)));
    }

    assert!(matches!(
        deck.resolve(&Point::identity()),
        Err(PkrError::PointNotInDeck(_))
    ));
}

#[test]
fn test_card_names() {
    assert_eq!(CardIndex(0).to_string(), "AS");
    assert_eq!(CardIndex(12).to_string(), "2S");
    assert_eq!(CardIndex(13).to_string(), "AC");
    assert_eq!(CardIndex(51).to_readable(), ('D', '2'));

    let bits = (U256::from(1u8) << 3usize) | (U256::from(1u8) << 40usize);
    assert_eq!(parse_card_bits(bits), vec![CardIndex(3), CardIndex(40)]);
    assert!(parse_card_bits(U256::ZERO).is_empty());
}

#[test]
fn test_compressed_deck() {
    let mut rng = StdRng::seed_from_u64(7);
    let table = shuffle_table(2, &mut rng);

    let compressed = compress_deck(&table.deck).unwrap();
    assert_eq!(compressed.len(), DECK_SIZE);
    assert_eq!(compressed.decompress().unwrap(), table.deck);

    // Flags word first, then both x-coordinates of every card
    let bytes = compressed.to_bytes();
    assert_eq!(bytes.len(), 32 + DECK_SIZE * 64);
    assert_eq!(
        decompress_deserialize_deck(&bytes, DECK_SIZE).unwrap(),
        table.deck
    );
    assert!(matches!(
        decompress_deserialize_deck(&bytes, DECK_SIZE - 1),
        Err(PkrError::InvalidDeck { .. })
    ));

    let first = table.deck[0].compress();
    assert_eq!(compressed.flags.bit(0), first.c1.flag);
    assert_eq!(compressed.flags.bit(1), first.c2.flag);

    assert_eq!(serialize_uncompressed_deck(&table.deck).len(), DECK_SIZE * 128);

    // The hash commits to order
    let mut swapped = table.deck.clone();
    swapped.swap(0, 1);
    assert_ne!(compress_deck(&swapped).unwrap().hash(), compressed.hash());
    assert_eq!(compress_deck(&table.deck).unwrap().hash(), compressed.hash());
}

#[test]
fn test_permutation() {
    let mut rng = StdRng::seed_from_u64(11);
    let perm = Permutation::random(DECK_SIZE, &mut rng);
    assert!(perm.is_valid());

    // Every column maps somewhere and `source` undoes `target`
    for j in 0..DECK_SIZE {
        let i = perm.target(j).unwrap();
        assert_eq!(perm.source(i), Some(j));
    }
    assert_eq!(perm.inverse().inverse(), perm);

    let doubled = vec![vec![1, 0], vec![1, 0]];
    assert!(matches!(
        Permutation::from_matrix(doubled),
        Err(PkrError::InvalidPermutation)
    ));
    assert!(Permutation::from_matrix(vec![vec![0, 1], vec![1, 0]]).is_ok());
    assert!(Permutation::identity(4).is_valid());
}

#[test]
fn test_encrypt_shuffle() {
    let mut rng = StdRng::seed_from_u64(3);
    let sk = generate_secret_key(&mut rng);
    let pk = make_public_key_from_secret_key(&sk);
    let deck = CanonicalDeck::new(DECK_SIZE);

    let zero = ZeroEncryption::new(&pk, DECK_SIZE, &mut rng);
    let perm = random_permutation(DECK_SIZE, &mut rng);
    let shuffled = encrypt_shuffle(&zero.cipher_texts, deck.cards(), &perm).unwrap();

    // Output `k` is input `source(k)` under fresh randomness
    for (k, ct) in shuffled.iter().enumerate() {
        let j = perm.source(k).unwrap();
        assert_ne!(ct.c1, Point::identity());
        assert_eq!(open(&deck, ct, &[sk]), CardIndex(j as u8));
    }

    let short = &deck.cards()[1..];
    assert!(matches!(
        encrypt_shuffle(&zero.cipher_texts, short, &perm),
        Err(PkrError::InvalidDeck { .. })
    ));
}

#[test]
fn test_decrypt_any_order() {
    let mut rng = StdRng::seed_from_u64(5);
    let table = shuffle_table(3, &mut rng);
    let deck = CanonicalDeck::new(DECK_SIZE);

    // Every card opens exactly once, whatever order the shares arrive in
    let mut seen = vec![false; DECK_SIZE];
    for ct in &table.deck {
        let forward = open(&deck, ct, &table.secret_keys);
        let reversed = table.secret_keys.iter().rev().copied().collect_vec();
        assert_eq!(open(&deck, ct, &reversed), forward);
        assert!(!seen[forward.as_usize()]);
        seen[forward.as_usize()] = true;
    }
    assert!(seen.into_iter().all(|s| s));

    // Missing one share leaves the card hidden
    let ct = &table.deck[0];
    let partial = [partial_decrypt(&table.secret_keys[0], &ct.c1)];
    assert!(apply_decrypts(&deck, ct, &partial).is_err());
}

#[test]
fn test_private_decrypt() {
    let mut rng = StdRng::seed_from_u64(9);
    let table = shuffle_table(3, &mut rng);
    let deck = CanonicalDeck::new(DECK_SIZE);
    let ct = &table.deck[4];

    // Owner is player 1, the others publish their shares
    let others = [0, 2]
        .iter()
        .map(|&i| partial_decrypt(&table.secret_keys[i], &ct.c1))
        .collect_vec();
    let card = private_decrypt(&deck, ct, &others, &table.secret_keys[1]).unwrap();
    assert_eq!(card, open(&deck, ct, &table.secret_keys));

    // Anyone else trying the same gets garbage
    assert!(private_decrypt(&deck, ct, &others, &table.secret_keys[0]).is_err());
}

#[test]
fn test_blinds() {
    assert_eq!(blind_indices(2, 0), (0, 1));
    assert_eq!(blind_indices(2, 1), (1, 0));
    assert_eq!(blind_indices(4, 3), (0, 1));
    assert_eq!(blind_indices(6, 0), (1, 2));
    assert_eq!(blind_indices(0, 0), (0, 0));

    let mut rng = StdRng::seed_from_u64(1);
    let table = shuffle_table(2, &mut rng);
    let mut game = heads_up_game(&table);
    game.current_bet = 2;
    game.current_bets = vec![1, 2];

    // Small blind owes one more chip and may raise or fold
    let betting = BettingView::from_state(&game);
    assert_eq!(betting.call_amount, 1);
    assert_eq!(
        betting.available_actions,
        vec![BetType::Call, BetType::Bet, BetType::Fold]
    );

    // Short stack can only call all-in
    game.player_balances[0] = 1;
    let betting = BettingView::from_state(&game);
    assert!(betting.can(BetType::Call));
    assert!(!betting.can(BetType::Bet));
}

#[test]
fn test_actions_are_same() {
    let game_id = address(0xaa);
    let shuffle = |hand_idx: u64, x: u64| {
        Action::player(
            address(1),
            Payload::Shuffle {
                game_id,
                hand_idx,
                to: address(2),
                group_key: Point::generator(),
                source: ShuffleSource::Plain,
            },
        )
        .with_inputs(vec![InputKind::ZeroEncryption])
        .with_key(vec![
            KeyPart::Address(address(2)),
            KeyPart::Number(hand_idx),
            KeyPart::Field(U256::from(x)),
        ])
    };

    assert!(actions_are_same(&shuffle(1, 5), &shuffle(1, 5)));
    assert!(!actions_are_same(&shuffle(1, 5), &shuffle(2, 5)));
    assert!(!actions_are_same(&shuffle(1, 5), &shuffle(1, 6)));

    // Payload contents outside the key do not matter
    let mut other_source = shuffle(1, 5);
    if let Payload::Shuffle { source, .. } = &mut other_source.payload {
        *source = ShuffleSource::Deck {
            deck_id: address(9),
            inputs: vec![],
        };
    }
    assert!(actions_are_same(&shuffle(1, 5), &other_source));

    let find = Action::admin(Payload::FindWinner { game_id });
    let reset = Action::admin(Payload::ResetGame { game_id });
    assert!(!actions_are_same(&find, &reset));
    assert!(actions_are_same(&find, &find.clone()));
}

#[test]
fn test_shuffle_chain() {
    let mut rng = StdRng::seed_from_u64(21);
    let table = shuffle_table(2, &mut rng);
    let game = heads_up_game(&table);
    let [p0, p1] = [game.players[0], game.players[1]];

    let shuffles = |admin_objects: &[LedgerObject], players: &HashMap<_, Vec<_>>| {
        let view = ChainView::new(&game, admin_objects, players);
        infer_actions(&view, None)
            .unwrap()
            .into_iter()
            .filter(|a| matches!(a.action_type(), ActionType::Shuffle | ActionType::CompleteShuffle))
            .collect_vec()
    };

    // Nobody holds a deck: first player starts from the canonical deck
    let actions = shuffles(&[], &HashMap::new());
    assert_eq!(actions.len(), 1);
    assert!(actions[0].is_from(&p0));
    assert!(matches!(
        &actions[0].payload,
        Payload::Shuffle { to, source: ShuffleSource::Plain, .. } if *to == p1
    ));
    assert_eq!(actions[0].inputs, vec![InputKind::ZeroEncryption]);

    let shuffled = |owner| {
        LedgerObject::ShuffledDeck(ShuffledDeck {
            id: address(0x5d),
            game_id: game.id,
            hand_idx: game.hand_idx,
            from: owner,
            public_key: game.group_public_key,
            deck: table.deck.iter().map(CipherText::compress).collect(),
        })
    };

    // Second player holds p0's deck and passes it on to the admin
    let players = HashMap::from([(p1, vec![shuffled(p0)])]);
    let actions = shuffles(&[], &players);
    assert_eq!(actions.len(), 1);
    assert!(actions[0].is_from(&p1));
    match &actions[0].payload {
        Payload::Shuffle {
            to,
            source: ShuffleSource::Deck { deck_id, inputs },
            ..
        } => {
            assert_eq!(*to, game.admin);
            assert_eq!(*deck_id, address(0x5d));
            assert_eq!(inputs, &table.deck);
        }
        other => panic!("unexpected payload {:?}", other),
    }

    // Deck of an older hand does not count
    let mut stale = shuffled(p0);
    if let LedgerObject::ShuffledDeck(d) = &mut stale {
        d.hand_idx = 0;
    }
    let players = HashMap::from([(p1, vec![stale])]);
    assert!(matches!(
        shuffles(&[], &players)[0].payload,
        Payload::Shuffle { source: ShuffleSource::Plain, .. }
    ));

    // Admin holds the final deck
    let actions = shuffles(&[shuffled(p1)], &HashMap::new());
    assert_eq!(actions.len(), 1);
    assert!(actions[0].admin);
    assert_eq!(actions[0].action_type(), ActionType::CompleteShuffle);
    assert_eq!(actions[0].key, vec![KeyPart::Number(game.hand_idx)]);
}

#[test]
fn test_housekeeping() {
    let mut rng = StdRng::seed_from_u64(22);
    let table = shuffle_table(2, &mut rng);
    let mut game = heads_up_game(&table);
    game.can_add_player = true;
    let [p0, p1] = [game.players[0], game.players[1]];
    let newcomer = address(3);

    let admin_objects = vec![LedgerObject::LeaveGame(LeaveGame {
        id: address(0x1e),
        game_id: game.id,
        player: p1,
    })];
    let players = HashMap::new();
    let view = ChainView::new(&game, &admin_objects, &players);
    let actions = infer_actions(&view, Some(&newcomer)).unwrap();

    // Removal comes first and blocks every other seat change and the hand
    assert_eq!(actions[0].action_type(), ActionType::RemovePlayer);
    assert!(matches!(
        &actions[0].payload,
        Payload::RemovePlayer { player_key, .. } if *player_key == table.public_keys[1]
    ));
    let leaves = actions
        .iter()
        .filter(|a| a.action_type() == ActionType::Leave)
        .collect_vec();
    assert_eq!(leaves.len(), 1);
    assert!(leaves[0].is_from(&p0));

    let join = actions.last().unwrap();
    assert_eq!(join.action_type(), ActionType::Join);
    assert!(join.is_from(&newcomer));
    assert_eq!(join.inputs, vec![InputKind::Balance, InputKind::Seat]);
    assert!(
        actions
            .iter()
            .all(|a| !matches!(a.action_type(), ActionType::Shuffle | ActionType::AddPlayer))
    );

    // Bust player goes once the leave is processed
    game.player_balances[0] = 1;
    let view = ChainView::new(&game, &[], &players);
    let actions = infer_actions(&view, None).unwrap();
    assert!(actions.iter().any(|a| matches!(
        &a.payload,
        Payload::RemoveBustPlayer { player, .. } if *player == p0
    )));
}

#[test]
fn test_find_winner() {
    let mut rng = StdRng::seed_from_u64(23);
    let table = shuffle_table(2, &mut rng);
    let mut game = heads_up_game(&table);
    deal_holdem(&mut game, &table);
    game.bet_round = NUM_ROUNDS;
    game.decrypt_round = NUM_ROUNDS;
    game.sb_submitted = true;
    game.bb_submitted = true;
    for card in game.deck.iter_mut() {
        card.submitted_decrypt = game.players.clone();
        card.revealable = true;
        card.revealed = true;
        card.completed_decrypt = true;
    }

    let objects = HashMap::new();
    let view = ChainView::new(&game, &[], &objects);
    let actions = infer_actions(&view, None).unwrap();
    let admin = actions.iter().filter(|a| a.admin).collect_vec();
    assert_eq!(admin.len(), 1);
    assert_eq!(admin[0].action_type(), ActionType::FindWinner);

    // One unrevealed board card holds the winner back and gets revealed instead
    game.deck[5].revealed = false;
    let view = ChainView::new(&game, &[], &objects);
    let actions = infer_actions(&view, None).unwrap();
    assert!(actions.iter().all(|a| a.action_type() != ActionType::FindWinner));
    match &actions.last().unwrap().payload {
        Payload::RevealMany {
            card_indices, c2s, ..
        } => {
            assert_eq!(card_indices, &vec![5]);
            assert_eq!(c2s[0], table.deck[5].c2);
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

#[test]
fn test_bet_turn() {
    let mut rng = StdRng::seed_from_u64(24);
    let table = shuffle_table(2, &mut rng);
    let mut game = heads_up_game(&table);
    deal_holdem(&mut game, &table);
    game.sb_submitted = true;
    game.bb_submitted = true;
    game.decrypt_round = 1;
    game.bet_round = 0;
    game.pot = 3;
    game.current_bet = 2;
    game.current_bets = vec![1, 2];

    let objects = HashMap::new();
    let view = ChainView::new(&game, &[], &objects);
    let actions = infer_actions(&view, None).unwrap();
    let bet = actions
        .iter()
        .find(|a| a.action_type() == ActionType::Bet)
        .unwrap();
    assert!(bet.is_from(&game.players[0]));
    assert_eq!(bet.inputs, vec![InputKind::BetType, InputKind::Amount]);
    assert_eq!(bet.key, vec![KeyPart::Number(3)]);
    // Heads-up folds open nothing
    assert!(matches!(&bet.payload, Payload::Bet { c1s, .. } if c1s.is_empty()));

    // Out-of-range rounds from the ledger are nobody's turn
    game.bet_round = u8::MAX;
    game.decrypt_round = 0;
    let view = ChainView::new(&game, &[], &objects);
    let actions = infer_actions(&view, None).unwrap();
    assert!(actions.iter().all(|a| a.action_type() != ActionType::Bet));
}

fn join_request(game_id: ObjectId, tag: u8, point: Point) -> LedgerObject {
    LedgerObject::JoinGame(JoinGame {
        id: address(0x30 + tag),
        game_id,
        player: address(tag),
        seat: tag,
        balance: 100,
        point,
    })
}

#[test]
fn test_full_table() {
    let mut rng = StdRng::seed_from_u64(26);
    let table = shuffle_table(2, &mut rng);
    let mut game = heads_up_game(&table);
    game.can_add_player = true;
    for tag in 3..=MAX_PLAYERS as u8 {
        game.players.push(address(tag));
        game.player_balances.push(100);
        game.current_bets.push(0);
        game.player_seats.push(tag);
        game.public_keys.push(table.public_keys[0]);
    }
    assert_eq!(game.num_players(), MAX_PLAYERS);

    let joiner = address(7);
    let admin_objects = vec![join_request(game.id, 7, table.public_keys[1])];
    let objects = HashMap::new();
    let is_seating = |a: &Action| matches!(a.action_type(), ActionType::AddPlayer | ActionType::Join);

    // Every board card already needs all the shares the reveal circuit takes
    let view = ChainView::new(&game, &admin_objects, &objects);
    let actions = infer_actions(&view, Some(&address(8))).unwrap();
    assert!(!actions.iter().any(is_seating));

    // One seat frees up: the pending request is seated, the newcomer may ask
    game.players.pop();
    game.player_balances.pop();
    game.current_bets.pop();
    game.player_seats.pop();
    game.public_keys.pop();
    let view = ChainView::new(&game, &admin_objects, &objects);
    let actions = infer_actions(&view, Some(&address(8))).unwrap();
    assert!(actions.iter().any(|a| matches!(
        &a.payload,
        Payload::AddPlayer { join_id, .. } if *join_id == address(0x37)
    )));
    assert!(actions.iter().any(|a| a.action_type() == ActionType::Join && a.is_from(&address(8))));
    assert!(!actions.iter().any(|a| a.is_from(&joiner)));
}

#[test]
fn test_blind_bets() {
    let mut rng = StdRng::seed_from_u64(25);
    let table = shuffle_table(2, &mut rng);
    let mut game = heads_up_game(&table);
    deal_holdem(&mut game, &table);

    let objects = HashMap::new();
    let view = ChainView::new(&game, &[], &objects);
    let actions = infer_actions(&view, None).unwrap();
    let blinds = actions
        .iter()
        .filter_map(|a| match &a.payload {
            Payload::BlindBet { amount, .. } => Some((a.from.unwrap(), *amount)),
            _ => None,
        })
        .collect_vec();
    assert_eq!(blinds, vec![(game.players[0], 1), (game.players[1], 2)]);
}

#[test]
fn test_game_events() {
    for event in GameEvent::ALL {
        let formatted = event.format(PACKAGE);
        assert_eq!(GameEvent::parse(&formatted, PACKAGE), Some(event));
    }
    assert_eq!(
        GameEvent::parse("0x2a::game::RevealEvent", PACKAGE),
        Some(GameEvent::Reveal)
    );
    assert_eq!(GameEvent::parse("0x2b::game::RevealEvent", PACKAGE), None);
    assert_eq!(GameEvent::parse("0x2a::game::Nothing", PACKAGE), None);
}

#[test]
fn test_parse_game_state() {
    let mut rng = StdRng::seed_from_u64(31);
    let table = shuffle_table(2, &mut rng);
    let mut game = heads_up_game(&table);
    deal_holdem(&mut game, &table);
    let canonical = CanonicalDeck::new(DECK_SIZE);

    // Hole cards carry the other player's share, the flop everybody's
    let hole_owners = game.rounds[0].clone();
    for (position, owner) in hole_owners.into_iter().enumerate() {
        let other = 1 - owner as usize;
        let card = &mut game.deck[position];
        card.decrypts = vec![partial_decrypt(&table.secret_keys[other], &table.deck[position].c1)];
        card.completed_decrypt = true;
    }
    for position in 4..7 {
        let card = &mut game.deck[position];
        card.decrypts = table
            .secret_keys
            .iter()
            .map(|sk| partial_decrypt(sk, &table.deck[position].c1))
            .collect();
        card.revealable = true;
        card.completed_decrypt = true;
    }
    // Turn was already revealed on chain
    game.deck[7].revealed = true;
    game.deck[7].reveal_card = 17;

    let viewer = PrivateState::new(game.players[0], table.secret_keys[0]);
    let mut decks = DeckCache::new();
    let parsed = parse_game_state(&game, Some(&viewer), &mut decks).unwrap();

    let own = parsed.player_state(&game.players[0]).unwrap();
    assert_eq!(own.cards.len(), 2);
    assert_eq!(
        own.cards[0].card,
        Some(open(&canonical, &table.deck[0], &table.secret_keys))
    );
    assert!(own.cards.iter().all(|c| c.decrypted));

    let theirs = parsed.player_state(&game.players[1]).unwrap();
    assert!(theirs.cards.iter().all(|c| !c.is_revealed()));

    assert_eq!(parsed.public_cards.len(), 5);
    for (i, card) in parsed.public_cards[..3].iter().enumerate() {
        let expected = open(&canonical, &table.deck[4 + i], &table.secret_keys);
        assert_eq!(card.card, Some(expected));
    }
    assert_eq!(parsed.public_cards[3].card, Some(CardIndex(17)));
    assert!(!parsed.public_cards[3].decrypted);
    assert!(!parsed.public_cards[4].is_revealed());

    assert_eq!(parsed.bet_player, Some(game.players[0]));
    assert_eq!(parsed.small_blind_idx, 0);
    assert_eq!(parsed.big_blind_idx, 1);

    // A spectator sees only the public part
    let parsed = parse_game_state(&game, None, &mut decks).unwrap();
    let own = parsed.player_state(&game.players[0]).unwrap();
    assert!(own.cards.iter().all(|c| !c.is_revealed()));
    assert!(parsed.public_cards[0].is_revealed());
}

#[test]
fn test_zero_encryption_cache() {
    let mut rng = StdRng::seed_from_u64(41);
    let table = shuffle_table(2, &mut rng);
    let game_id = address(0xaa);
    let mut cache = ZeroEncryptionCache::new();

    let made = cache
        .get_or_try_insert_with(game_id, &table.group_key, || {
            Ok(ZeroEncryption::new(&table.group_key, DECK_SIZE, &mut rng))
        })
        .unwrap()
        .clone();
    assert_eq!(made.len(), DECK_SIZE);
    assert_eq!(cache.get(&game_id, &table.group_key), Some(&made));

    // A new player changes the group key and the entry with it
    let new_key = table.group_key + table.public_keys[0];
    assert!(cache.get(&game_id, &new_key).is_none());
    assert!(cache.take(&game_id, &new_key).is_none());
    assert!(!cache.invalidate_stale(&game_id, &new_key));
    assert!(cache.is_empty());

    cache.insert(game_id, made.clone());
    assert_eq!(cache.take(&game_id, &table.group_key), Some(made));
    assert!(cache.take(&game_id, &table.group_key).is_none());
}

#[test]
fn test_zero_encryption_group_key_change() {
    let mut rng = StdRng::seed_from_u64(44);
    let table = shuffle_table(2, &mut rng);
    let game_id = address(0xaa);
    let joined_key = table.group_key + table.public_keys[0];
    let mut cache = ZeroEncryptionCache::new();

    let mut made = 0;
    for key in [table.group_key, table.group_key, joined_key] {
        let zero = cache
            .get_or_try_insert_with(game_id, &key, || {
                made += 1;
                Ok(ZeroEncryption::new(&key, DECK_SIZE, &mut rng))
            })
            .unwrap();
        assert!(zero.is_for(&key));
    }
    assert_eq!(made, 2);
    assert_eq!(cache.len(), 1);
    assert!(cache.get(&game_id, &table.group_key).is_none());
    assert!(cache.invalidate_stale(&game_id, &joined_key));

    // Somebody leaves: the key moves back and the entry is dropped
    assert!(!cache.invalidate_stale(&game_id, &table.group_key));
    assert!(cache.is_empty());
}

/// Encrypts `card` for the joint key of `secret_keys`, returns it with
/// everybody's share.
fn encrypt_for(
    deck: &CanonicalDeck,
    card: usize,
    secret_keys: &[SecretKey],
    rng: &mut StdRng,
) -> (CipherText, Vec<Point>) {
    let group_key: PublicKey = secret_keys
        .iter()
        .map(make_public_key_from_secret_key)
        .sum();
    let zero = ZeroEncryption::new(&group_key, 1, rng);
    let ct = deck.cards()[card].add(&zero.cipher_texts[0]);
    let shares = secret_keys
        .iter()
        .map(|sk| partial_decrypt(sk, &ct.c1))
        .collect();
    (ct, shares)
}

#[test]
fn test_reveal_width() {
    let mut rng = StdRng::seed_from_u64(43);
    let deck = CanonicalDeck::new(DECK_SIZE);
    let secret_keys = (0..REVEAL_LENGTH + 1)
        .map(|_| generate_secret_key(&mut rng))
        .collect_vec();

    // Two players leave three identity slots
    let (ct, shares) = encrypt_for(&deck, 0, &secret_keys[..2], &mut rng);
    let witness = reveal_witness(&deck, &ct.c2, &shares).unwrap();
    assert_eq!(witness.get_field("card"), Some(U256::ONE));
    let xs = witness.get_array("decryptx").unwrap();
    let ys = witness.get_array("decrypty").unwrap();
    assert_eq!(xs.len(), REVEAL_LENGTH);
    assert_eq!(xs[..2], [shares[0].x, shares[1].x]);
    assert!(xs[2..].iter().all(|x| x.is_zero()));
    assert!(ys[2..].iter().all(|y| *y == U256::ONE));

    // A full table fills every slot
    let (ct, shares) = encrypt_for(&deck, 7, &secret_keys[..REVEAL_LENGTH], &mut rng);
    let witness = reveal_witness(&deck, &ct.c2, &shares).unwrap();
    assert_eq!(witness.get_field("card"), Some(U256::from(8u8)));
    let expected = shares.iter().map(|p| p.y).collect_vec();
    assert_eq!(witness.get_array("decrypty"), Some(expected.as_slice()));

    // One more share than the circuit takes
    let (ct, shares) = encrypt_for(&deck, 7, &secret_keys, &mut rng);
    assert!(matches!(
        reveal_witness(&deck, &ct.c2, &shares),
        Err(PkrError::TooManyDecrypts { max: REVEAL_LENGTH, got }) if got == REVEAL_LENGTH + 1
    ));
}

#[test]
fn test_deck_hash() {
    let mut rng = StdRng::seed_from_u64(45);
    let table = shuffle_table(2, &mut rng);
    let oracle = CountingOracle::default();

    let compressed = prove_deck_hash(&oracle, &table.deck, true).unwrap();
    assert_eq!(
        compressed.public_signals,
        vec![compress_deck(&table.deck).unwrap().flags]
    );

    let witness = hash_uncompressed_witness(&table.deck);
    assert_eq!(witness.get_array("c2y").map(<[U256]>::len), Some(DECK_SIZE));
    let uncompressed = prove_deck_hash(&oracle, &table.deck, false).unwrap();
    assert!(uncompressed.public_signals.is_empty());
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_ledger_json() {
    let hex = |tag: &str| format!("\"0x{}\"", tag.repeat(32));
    let text = format!(
        r#"[
            {{"type": "LeaveGame", "fields": {{"id": {leave}, "game_id": {game}, "player": {player}}}}},
            {{"type": "JoinGame", "fields": {{"id": {join}, "game_id": {game}, "player": {player},
                "seat": 2, "balance": 500, "point": {{"x": "0", "y": "1"}}}}}}
        ]"#,
        leave = hex("1e"),
        game = hex("aa"),
        player = hex("03"),
        join = hex("33"),
    );
    let objects = LedgerObject::list_from_json(&text).unwrap();
    assert_eq!(objects.len(), 2);
    assert_eq!(objects[0].id(), address(0x1e));
    assert!(objects.iter().all(|o| o.game_id() == address(0xaa)));
    match &objects[1] {
        LedgerObject::JoinGame(join) => {
            assert_eq!(join.player, address(3));
            assert_eq!(join.balance, 500);
            assert!(join.point.is_identity());
        }
        other => panic!("unexpected object {:?}", other),
    }
    assert!(LedgerObject::list_from_json(r#"[{"type": "Coin", "fields": {}}]"#).is_err());

    // Field elements travel as decimal strings
    let mut rng = StdRng::seed_from_u64(46);
    let table = shuffle_table(2, &mut rng);
    let mut game = heads_up_game(&table);
    deal_holdem(&mut game, &table);
    let text = serde_json::to_string(&game).unwrap();
    assert!(text.contains(&format!("\"{}\"", game.group_public_key.x)));
    assert_eq!(GameState::from_json(&text).unwrap(), game);
}

#[test]
fn test_decrypt_proof_cache() {
    let mut rng = StdRng::seed_from_u64(42);
    let table = shuffle_table(2, &mut rng);
    let oracle = CountingOracle::default();
    let c1s = table.deck[..4].iter().map(|ct| ct.c1).collect_vec();

    let mut cache = DecryptProofCache::new();
    assert_eq!(cache.precompute(&oracle, &table.secret_keys[0], &c1s).unwrap(), 4);
    assert_eq!(cache.precompute(&oracle, &table.secret_keys[0], &c1s).unwrap(), 0);
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 4);
    assert_eq!(cache.get(&c1s[2]).unwrap().public_signals[0], c1s[2].x);

    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn test_dedup_tracker() {
    let game_id = address(0xaa);
    let action = Action::admin(Payload::FindWinner { game_id });
    let mut tracker = DedupTracker::new();

    assert!(!tracker.is_duplicate(&game_id, &action));
    tracker.record(game_id, action.clone());
    assert!(tracker.is_duplicate(&game_id, &action));
    assert!(!tracker.is_duplicate(&address(0xbb), &action));

    let reset = Action::admin(Payload::ResetGame { game_id });
    assert!(!tracker.is_duplicate(&game_id, &reset));

    // Keyless batches repeat by type, only their contents tell them apart
    let batch = |id| {
        Action::admin(Payload::AddDecrypts {
            game_id,
            decrypt_ids: vec![address(id)],
        })
    };
    let mut admin = DedupTracker::new();
    admin.record(game_id, batch(1));
    assert!(admin.is_duplicate(&game_id, &batch(2)));
    assert!(!admin.is_exact_repeat(&game_id, &batch(2)));
    assert!(admin.is_exact_repeat(&game_id, &batch(1)));

    // Only the latest attempt counts
    tracker.record(game_id, reset.clone());
    assert!(tracker.is_duplicate(&game_id, &reset));
    assert!(!tracker.is_duplicate(&game_id, &action));
}

#[test]
fn test_bcs_bytes() {
    assert_eq!(bcs_bytes(&[7, 8]), vec![2, 7, 8]);
    assert_eq!(bcs_bytes(&[0; 200])[..2], [0xc8, 0x01]);
    assert_eq!(
        bcs_bytes_vec(&[vec![1], vec![2, 3]]),
        vec![2, 1, 1, 2, 2, 3]
    );
}

#[test]
fn test_handler_roles() {
    let mut rng = StdRng::seed_from_u64(51);
    let table = shuffle_table(2, &mut rng);
    let game = heads_up_game(&table);
    let oracle = CountingOracle::default();
    let p0 = game.players[0];

    let config = HandlerConfig {
        package_id: PACKAGE.to_string(),
        role: Role::Player(p0),
    };
    let mut handler = ActionHandler::new(config, &oracle, table.secret_keys[0]);

    // Admin work is not ours
    let find = Action::admin(Payload::FindWinner { game_id: game.id });
    assert!(handler.handle(&find, CallerInputs::default(), &mut rng).unwrap().is_none());

    // Join needs balance and seat before anything is proven
    let join = Action::player(
        p0,
        Payload::Join {
            game_id: game.id,
            admin: game.admin,
            address: p0,
        },
    )
    .with_inputs(vec![InputKind::Balance, InputKind::Seat]);
    let missing = CallerInputs {
        balance: Some(50),
        ..Default::default()
    };
    assert!(matches!(
        handler.handle(&join, missing, &mut rng),
        Err(PkrError::MissingInput {
            action: ActionType::Join,
            input: InputKind::Seat
        })
    ));
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 0);

    let inputs = CallerInputs {
        balance: Some(50),
        seat: Some(3),
        ..Default::default()
    };
    let call = handler.handle(&join, inputs, &mut rng).unwrap().unwrap();
    assert_eq!(call.target, "0x2a::game::join");
    assert_eq!(call.function(), "join");
    assert_eq!(call.arguments[4], CallArg::U64(50));
    assert_eq!(call.arguments[5], CallArg::U8(3));
}

#[test]
fn test_handler_shuffle() {
    let mut rng = StdRng::seed_from_u64(52);
    let table = shuffle_table(2, &mut rng);
    let game = heads_up_game(&table);
    let oracle = CountingOracle::default();
    let p0 = game.players[0];
    let config = HandlerConfig {
        package_id: PACKAGE.to_string(),
        role: Role::Player(p0),
    };
    let mut handler = ActionHandler::new(config, &oracle, table.secret_keys[0]);

    let action = Action::player(
        p0,
        Payload::Shuffle {
            game_id: game.id,
            hand_idx: game.hand_idx,
            to: game.players[1],
            group_key: game.group_public_key,
            source: ShuffleSource::Plain,
        },
    )
    .with_inputs(vec![InputKind::ZeroEncryption]);

    // Zero-encryption made for a different key is refused
    let stale = CallerInputs {
        zero_encryption: Some(ZeroEncryption::new(&table.public_keys[0], DECK_SIZE, &mut rng)),
        ..Default::default()
    };
    assert!(matches!(
        handler.handle(&action, stale, &mut rng),
        Err(PkrError::StaleZeroEncryption)
    ));

    let inputs = CallerInputs {
        zero_encryption: Some(ZeroEncryption::new(&table.group_key, DECK_SIZE, &mut rng)),
        ..Default::default()
    };
    let call = handler.handle(&action, inputs, &mut rng).unwrap().unwrap();
    assert_eq!(call.function(), "shuffle_plain");
    assert_eq!(call.arguments.len(), 8);
    assert_eq!(call.arguments[2], CallArg::U64(game.hand_idx));
    // Compressed deck goes out length-prefixed
    match &call.arguments[3] {
        CallArg::Bytes(bytes) => assert_eq!(bytes.len(), 2 + 32 + DECK_SIZE * 64),
        other => panic!("unexpected argument {:?}", other),
    }
    // Zero-encryption and shuffle proofs
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_handler_admin() {
    let mut rng = StdRng::seed_from_u64(53);
    let table = shuffle_table(2, &mut rng);
    let mut game = heads_up_game(&table);
    deal_holdem(&mut game, &table);
    let oracle = CountingOracle::default();
    let config = HandlerConfig {
        package_id: PACKAGE.to_string(),
        role: Role::Admin,
    };
    let mut handler = ActionHandler::new(config, &oracle, table.secret_keys[0]);

    // Reveal proofs for two fully decrypted board cards
    let decrypts = [4, 5]
        .iter()
        .map(|&i| {
            table
                .secret_keys
                .iter()
                .map(|sk| partial_decrypt(sk, &table.deck[i].c1))
                .collect_vec()
        })
        .collect_vec();
    let reveal = Action::admin(Payload::RevealMany {
        game_id: game.id,
        card_indices: vec![4, 5],
        decrypts,
        c2s: vec![table.deck[4].c2, table.deck[5].c2],
    });
    let call = handler.handle(&reveal, CallerInputs::default(), &mut rng).unwrap().unwrap();
    assert_eq!(call.function(), "reveal_many");
    assert_eq!(call.arguments[1], CallArg::U8Vec(vec![4, 5]));
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 2);

    // Player moves are skipped by the admin
    let bet = Action::player(
        game.players[0],
        Payload::BlindBet {
            game_id: game.id,
            hand_idx: 1,
            admin: game.admin,
            amount: 1,
        },
    );
    assert!(handler.handle(&bet, CallerInputs::default(), &mut rng).unwrap().is_none());

    // Rejected batch hands every added bet back
    let performed = vec![
        Action::admin(Payload::AddBet {
            game_id: game.id,
            bet_id: address(0xb1),
        }),
        Action::admin(Payload::FindWinner { game_id: game.id }),
    ];
    let undo = compensating_calls(PACKAGE, &performed);
    assert_eq!(undo.len(), 1);
    assert_eq!(undo[0].target, "0x2a::game::return_bet");
    assert_eq!(undo[0].arguments, vec![CallArg::Object(address(0xb1))]);
}

#[test]
fn test_handler_fold() {
    let mut rng = StdRng::seed_from_u64(54);
    let table = shuffle_table(3, &mut rng);
    let oracle = CountingOracle::default();
    let p0 = address(1);
    let config = HandlerConfig {
        package_id: PACKAGE.to_string(),
        role: Role::Player(p0),
    };
    let mut handler = ActionHandler::new(config, &oracle, table.secret_keys[0]);
    let c1s = table.deck[..3].iter().map(|ct| ct.c1).collect_vec();
    handler
        .decrypt_proofs_mut()
        .precompute(&oracle, &table.secret_keys[0], &c1s[..1])
        .unwrap();

    let bet = |c1s: Vec<Point>| {
        Action::player(
            p0,
            Payload::Bet {
                game_id: address(0xaa),
                hand_idx: 1,
                admin: address(0xad),
                bet_round: 1,
                decrypt_rounds: vec![2, 3],
                c1s,
            },
        )
        .with_inputs(vec![InputKind::BetType, InputKind::Amount])
    };
    let fold = || CallerInputs {
        bet_type: Some(BetType::Fold),
        amount: Some(0),
        ..Default::default()
    };

    // Folding with more than two in hand opens the remaining cards
    let call = handler.handle(&bet(c1s), fold(), &mut rng).unwrap().unwrap();
    assert_eq!(call.function(), "fold_and_decrypt_many");
    assert_eq!(call.arguments[4], CallArg::U8Vec(vec![2, 3]));
    // One proof came from the cache
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 3);

    let call = handler.handle(&bet(vec![]), fold(), &mut rng).unwrap().unwrap();
    assert_eq!(call.function(), "fold");

    let raise = CallerInputs {
        bet_type: Some(BetType::Bet),
        amount: Some(8),
        ..Default::default()
    };
    let call = handler.handle(&bet(vec![]), raise, &mut rng).unwrap().unwrap();
    assert_eq!(call.function(), "bet");
    assert_eq!(call.arguments[3], CallArg::SplitGas(8));
    assert_eq!(call.arguments[5], CallArg::U8(BetType::Bet.code()));
}
