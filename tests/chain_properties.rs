//! Property tests for the ledger invariants

use forgechain::core::{Block, Chain, Sha256Hasher, Target, Transaction};
use forgechain::difficulty::{DifficultyController, CONFINE_FACTOR, MIN_DIFFICULTY};
use proptest::prelude::*;
use std::time::Duration;

fn arb_tx() -> impl Strategy<Value = Transaction> {
    (
        "[a-f0-9]{8}",
        "[a-f0-9]{8}",
        0.01f64..1_000.0,
        "[ -~]{0,16}",
    )
        .prop_map(|(sender, recipient, value, message)| {
            Transaction::new(sender, recipient, value, message)
        })
}

/// Mine a valid chain of the given shape with the real hasher and the
/// easiest possible target
fn build_chain(tx_batches: Vec<Vec<Transaction>>) -> Chain {
    let hasher = Sha256Hasher;
    let mut chain = Chain::genesis(&hasher);
    for (i, mut txs) in tx_batches.into_iter().enumerate() {
        txs.insert(0, Transaction::coinbase(format!("miner-{}", i % 3)));
        let block = Block::new(
            &hasher,
            chain.last().hash,
            txs,
            i as u64,
            Target::MAX,
            format!("miner-{}", i % 3),
        );
        chain = chain.with_block(block);
    }
    chain
}

proptest! {
    /// Chains assembled through the mining path always validate
    #[test]
    fn prop_mined_chains_are_valid(batches in prop::collection::vec(prop::collection::vec(arb_tx(), 0..4), 0..6)) {
        let chain = build_chain(batches);
        prop_assert!(chain.is_valid(&Sha256Hasher));
    }

    /// Validity survives a serialize/deserialize round trip, in both the
    /// binary and JSON encodings
    #[test]
    fn prop_validity_survives_round_trip(batches in prop::collection::vec(prop::collection::vec(arb_tx(), 0..3), 0..5)) {
        let hasher = Sha256Hasher;
        let chain = build_chain(batches);

        let binary = bincode::serialize(&chain).unwrap();
        let from_binary: Chain = bincode::deserialize(&binary).unwrap();
        prop_assert_eq!(from_binary.is_valid(&hasher), chain.is_valid(&hasher));
        prop_assert_eq!(&from_binary, &chain);

        let json = serde_json::to_string(&chain).unwrap();
        let from_json: Chain = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(from_json.is_valid(&hasher), chain.is_valid(&hasher));
    }

    /// Flipping any byte of any non-genesis block hash breaks validity
    #[test]
    fn prop_tampering_breaks_validity(
        batches in prop::collection::vec(prop::collection::vec(arb_tx(), 0..2), 1..5),
        block_pick: prop::sample::Index,
        byte_pick: prop::sample::Index,
    ) {
        let chain = build_chain(batches);
        let mut blocks = chain.blocks().to_vec();

        let i = 1 + block_pick.index(blocks.len() - 1);
        let b = byte_pick.index(32);
        blocks[i].hash.0[b] ^= 0x01;

        let tampered = Chain::from_blocks(blocks);
        prop_assert!(!tampered.is_valid(&Sha256Hasher));
    }

    /// credit_of equals the signed sum over all committed transfers
    #[test]
    fn prop_credit_round_trip_law(batches in prop::collection::vec(prop::collection::vec(arb_tx(), 0..4), 0..6)) {
        let chain = build_chain(batches);

        let mut pubkeys: Vec<String> = chain
            .blocks()
            .iter()
            .flat_map(|b| b.txs.iter())
            .flat_map(|tx| [tx.sender.clone(), tx.recipient.clone()])
            .filter(|p| !p.is_empty())
            .collect();
        pubkeys.dedup();

        for pubkey in pubkeys {
            let expected: f64 = chain
                .blocks()
                .iter()
                .flat_map(|b| b.txs.iter())
                .map(|tx| {
                    let mut v = 0.0;
                    if tx.recipient == pubkey {
                        v += tx.value;
                    }
                    if !tx.sender.is_empty() && tx.sender == pubkey {
                        v -= tx.value;
                    }
                    v
                })
                .sum();
            prop_assert!((chain.credit_of(&pubkey) - expected).abs() < 1e-9);
        }
    }

    /// One recalculation never moves difficulty by more than the confine
    /// factor, and never below the floor
    #[test]
    fn prop_adjustment_is_confined(
        target_secs in 1u64..1_000,
        actual_secs in 1i64..100_000,
        initial in 1.0f64..1e9,
    ) {
        let hasher = Sha256Hasher;
        let mut chain = Chain::genesis(&hasher);
        let mut block = Block::new(&hasher, chain.last().hash, vec![], 0, Target::MAX, "m");
        block.timestamp = chain.last().timestamp + chrono::Duration::seconds(actual_secs);
        chain = chain.with_block(block);

        let mut ctrl = DifficultyController::new(initial, Duration::from_secs(target_secs), 1);
        let recalc = ctrl.recalc(&chain).unwrap();

        let factor = recalc.difficulty / initial;
        prop_assert!(factor <= CONFINE_FACTOR + 1e-12);
        prop_assert!(factor >= 1.0 / CONFINE_FACTOR - 1e-12 || recalc.difficulty == MIN_DIFFICULTY);
        prop_assert!(recalc.difficulty >= MIN_DIFFICULTY);
    }
}
