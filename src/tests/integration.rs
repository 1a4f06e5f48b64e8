use proptest::prelude::*;

use crate::config::EngineConfig;
use crate::consensus::CreditScoreBook;
use crate::engine::DposEngine;
use crate::error::ErrorKind;
use crate::events::{Event, RewardDeprecationKind, SlashKind};
use crate::governance::{
    GovernanceAdmin, MainchainGovernance, Proposal, SignedVote, TrustedOrganization, VoteStatus,
    VoteSupport,
};
use crate::types::{test_keys, Address, Balance, BlockContext, ChainId, Signature64};

fn test_config() -> EngineConfig {
    EngineConfig {
        min_validator_stake: 100,
        max_validator_candidate: 10,
        cooldown_secs_to_undelegate: 10,
        waiting_secs_to_revoke: 50,
        max_validator_number: 3,
        blocks_per_epoch: 10,
        period_duration_secs: 100,
        unavailability_tier1_threshold: 2,
        unavailability_tier2_threshold: 4,
        slash_felony_amount: 30,
        felony_jail_blocks: 25,
        double_sign_slash_amount: 40,
        double_sign_jail_blocks: 60,
        gain_credit_score: 50,
        max_credit_score: 600,
        bail_out_cost_multiplier: 1,
        block_producer_bonus_per_block: 10,
        bridge_operator_bonus_per_block: 6,
    }
}

fn consensus(seed: u8) -> Address {
    test_keys::address(seed)
}

fn admin(seed: u8) -> Address {
    test_keys::address(seed + 100)
}

fn ctx(number: u64, timestamp: u64, producer: Address) -> BlockContext {
    BlockContext::new(number, timestamp, producer)
}

fn header_sig(seed: u8, header: &[u8]) -> Signature64 {
    Signature64::from_bytes(
        ed25519_dalek::Signer::sign(&test_keys::signing_key(seed), header).to_bytes(),
    )
}

/// Register the given candidates (20% commission each) and run the
/// bootstrap wrap-up at block 9 so a validator set is in force for period 1
fn setup_with_vault(stakes: &[(u8, Balance)], vault: Balance) -> DposEngine {
    let mut engine = DposEngine::new(test_config(), vault);
    for (seed, stake) in stakes {
        engine
            .apply_candidate(
                &ctx(0, 0, consensus(1)),
                admin(*seed),
                consensus(*seed),
                admin(*seed),
                admin(*seed),
                test_keys::address(seed + 50),
                2_000,
                *stake,
            )
            .unwrap();
    }
    engine.wrap_up_epoch(&ctx(9, 101, consensus(1)), consensus(1)).unwrap();
    engine.drain_events();
    engine
}

fn setup(stakes: &[(u8, Balance)]) -> DposEngine {
    setup_with_vault(stakes, 10_000)
}

#[test]
fn test_bootstrap_ranks_top_candidates_by_stake() {
    let engine = setup(&[(1, 400), (2, 300), (3, 200), (4, 150)]);
    assert_eq!(engine.validators(), &[consensus(1), consensus(2), consensus(3)]);
    assert_eq!(engine.block_producers(), engine.validators());
    assert_eq!(engine.current_period(), 1);
    assert!(!engine.is_validator(&consensus(4)));
    assert!(engine.is_validator_candidate(&consensus(4)));
}

#[test]
fn test_wrap_up_gated_on_epoch_end_and_producer() {
    let mut engine = setup(&[(1, 400), (2, 300)]);

    let err = engine.wrap_up_epoch(&ctx(15, 150, consensus(1)), consensus(1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timing);

    // consensus(2) is a producer but not this block's producer
    let err = engine.wrap_up_epoch(&ctx(19, 150, consensus(1)), consensus(2)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    // an outsider cannot wrap even as the nominal producer
    let err = engine.wrap_up_epoch(&ctx(19, 150, consensus(9)), consensus(9)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    engine.wrap_up_epoch(&ctx(19, 150, consensus(1)), consensus(1)).unwrap();
}

#[test]
fn test_min_staked_validator_slashed_jailed_then_evicted() {
    let mut engine = setup(&[(1, 400), (2, 300), (3, 100)]);
    let target = consensus(3);

    for block in 10..14 {
        engine.slash_unavailability(&ctx(block, 110, consensus(1)), consensus(1), target).unwrap();
    }
    let events = engine.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        Event::Slashed { kind: SlashKind::UnavailabilityTier2, .. }
    )));
    // penalty pushed the self-stake below the candidacy minimum
    assert_eq!(engine.staking_amount_of(&target, &admin(3)), 70);
    assert_eq!(engine.jailed_time_left(&target, 14), Some(24));

    // mid-period wrap: jailed validator keeps its seat, loses production
    engine.wrap_up_epoch(&ctx(19, 150, consensus(1)), consensus(1)).unwrap();
    assert!(engine.is_validator(&target));
    assert!(!engine.is_block_producer(&target));

    // period boundary: still under-staked, so the pool is revoked
    engine.wrap_up_epoch(&ctx(29, 205, consensus(1)), consensus(1)).unwrap();
    let events = engine.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::CandidateRevoked { pool, .. } if *pool == target)));
    assert!(!engine.is_validator_candidate(&target));
    assert_eq!(engine.validators(), &[consensus(1), consensus(2)]);
}

#[test]
fn test_at_most_one_slash_per_block() {
    let mut engine = setup(&[(1, 400), (2, 300), (3, 200)]);

    engine.slash_unavailability(&ctx(10, 110, consensus(1)), consensus(1), consensus(2)).unwrap();
    let err = engine
        .slash_unavailability(&ctx(10, 110, consensus(1)), consensus(1), consensus(3))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Ordering);

    engine.slash_unavailability(&ctx(11, 111, consensus(1)), consensus(1), consensus(3)).unwrap();
}

#[test]
fn test_period_end_distributes_commission_pool_and_bridge_rewards() {
    let mut engine = setup(&[(1, 400), (2, 300), (3, 200)]);
    let delegator = test_keys::address(42);
    engine.delegate(&ctx(10, 105, consensus(1)), delegator, consensus(1), 100).unwrap();

    engine.submit_block_reward(&ctx(10, 110, consensus(1)), consensus(1), 90).unwrap();
    assert_eq!(engine.reward_of(&consensus(1)), 100);
    assert_eq!(engine.bonus_vault_balance(), 10_000 - 16);

    engine.wrap_up_epoch(&ctx(19, 205, consensus(1)), consensus(1)).unwrap();
    let events = engine.drain_events();

    // 20% commission of the 100 accrued goes to the treasury
    assert!(events.iter().any(|e| matches!(
        e,
        Event::MiningRewardDistributed { consensus: c, treasury, amount: 20 }
            if *c == consensus(1) && *treasury == admin(1)
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        Event::StakingRewardDistributed { pool, amount: 80 } if *pool == consensus(1)
    )));
    // the 6-unit bridge pool splits evenly over the three producers
    let bridge: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, Event::BridgeOperatorRewardDistributed { amount: 2, .. }))
        .collect();
    assert_eq!(bridge.len(), 3);
    assert_eq!(engine.reward_of(&consensus(1)), 0);

    // pool share 80 over 500 total stake: 16 to the 100-stake delegator,
    // 64 plus rounding dust to the admin's self-stake
    assert_eq!(engine.pending_reward_of(&delegator), 16);
    assert_eq!(engine.pending_reward_of(&admin(1)), 64);
}

#[test]
fn test_jailed_producer_keeps_its_bridge_share() {
    let mut engine = setup(&[(1, 400), (2, 300)]);
    let target = consensus(2);

    // one submitted block feeds the 6-unit bridge pool
    engine.submit_block_reward(&ctx(10, 110, consensus(1)), consensus(1), 50).unwrap();
    for block in 11..15 {
        engine.slash_unavailability(&ctx(block, 120, consensus(1)), consensus(1), target).unwrap();
    }
    engine.wrap_up_epoch(&ctx(19, 150, consensus(1)), consensus(1)).unwrap();
    assert!(!engine.is_block_producer(&target));
    engine.drain_events();

    engine.wrap_up_epoch(&ctx(29, 205, consensus(1)), consensus(1)).unwrap();
    let events = engine.drain_events();
    let recipients: Vec<Address> = events
        .iter()
        .filter_map(|e| match e {
            Event::BridgeOperatorRewardDistributed { consensus, amount: 3, .. } => Some(*consensus),
            _ => None,
        })
        .collect();
    // jail forfeits the mining reward only; both producers share the pool
    assert!(recipients.contains(&consensus(1)));
    assert!(recipients.contains(&target));
}

#[test]
fn test_underfunded_vault_never_blocks_reward_submission() {
    let mut engine = setup_with_vault(&[(1, 400), (2, 300)], 0);

    engine.submit_block_reward(&ctx(10, 110, consensus(1)), consensus(1), 90).unwrap();
    let events = engine.drain_events();
    assert!(events.iter().any(|e| matches!(e, Event::BonusTransferFailed { .. })));
    // the submitted value still accrues, only the bonus is skipped
    assert_eq!(engine.reward_of(&consensus(1)), 90);
}

#[test]
fn test_slash_forfeits_accrued_reward_for_the_period() {
    let mut engine = setup(&[(1, 400), (2, 300)]);

    engine.submit_block_reward(&ctx(10, 110, consensus(2)), consensus(2), 50).unwrap();
    assert_eq!(engine.reward_of(&consensus(2)), 60);

    for block in 11..15 {
        engine
            .slash_unavailability(&ctx(block, 120, consensus(1)), consensus(1), consensus(2))
            .unwrap();
    }
    assert_eq!(engine.reward_of(&consensus(2)), 0);
}

#[test]
fn test_bail_out_restores_production_at_halved_rewards() {
    let mut engine = setup(&[(1, 400), (2, 300), (3, 200)]);
    let target = consensus(3);

    // three clean periods build 150 credit for every validator
    engine.wrap_up_epoch(&ctx(19, 205, consensus(1)), consensus(1)).unwrap();
    engine.wrap_up_epoch(&ctx(29, 305, consensus(1)), consensus(1)).unwrap();
    engine.wrap_up_epoch(&ctx(39, 405, consensus(1)), consensus(1)).unwrap();
    assert_eq!(engine.credit_score(&target), 150);

    for block in 40..44 {
        engine.slash_unavailability(&ctx(block, 410, consensus(1)), consensus(1), target).unwrap();
    }
    engine.wrap_up_epoch(&ctx(49, 450, consensus(1)), consensus(1)).unwrap();
    assert!(!engine.is_block_producer(&target));

    // jailed until block 68: 18 blocks left at block 50 is 2 epochs
    engine.bail_out(&ctx(50, 451, consensus(9)), admin(3), target).unwrap();
    assert_eq!(engine.credit_score(&target), 148);
    assert_eq!(engine.unavailability_indicator(&target), 0);
    assert_eq!(engine.jailed_time_left(&target, 51), None);
    let events = engine.drain_events();
    assert!(events.iter().any(|e| matches!(e, Event::BailedOut { validator, .. } if *validator == target)));

    // production resumes at the next wrap, rewards halve for the period
    engine.wrap_up_epoch(&ctx(59, 460, consensus(1)), consensus(1)).unwrap();
    assert!(engine.is_block_producer(&target));
    engine.drain_events();

    engine.submit_block_reward(&ctx(60, 461, target), target, 100).unwrap();
    assert_eq!(engine.reward_of(&target), 55);
    let events = engine.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        Event::BlockRewardDeprecated { kind: RewardDeprecationKind::AfterBailout, amount: 55, .. }
    )));

    // a second bail-out within the same period is refused
    engine
        .slash_double_sign(
            &ctx(61, 462, consensus(1)),
            consensus(1),
            target,
            b"a",
            &header_sig(3, b"a"),
            b"b",
            &header_sig(3, b"b"),
        )
        .unwrap();
    let err = engine.bail_out(&ctx(62, 463, consensus(9)), admin(3), target).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);

    // no credit accrues for a period spent (partly) in jail
    engine.wrap_up_epoch(&ctx(69, 505, consensus(1)), consensus(1)).unwrap();
    assert_eq!(engine.credit_score(&target), 148);
}

#[test]
fn test_reward_halving_clears_at_the_period_boundary() {
    let mut engine = setup(&[(1, 400), (2, 300), (3, 200)]);
    let target = consensus(3);

    engine.wrap_up_epoch(&ctx(19, 205, consensus(1)), consensus(1)).unwrap();
    engine.wrap_up_epoch(&ctx(29, 305, consensus(1)), consensus(1)).unwrap();
    engine.wrap_up_epoch(&ctx(39, 405, consensus(1)), consensus(1)).unwrap();

    for block in 40..44 {
        engine.slash_unavailability(&ctx(block, 410, consensus(1)), consensus(1), target).unwrap();
    }
    engine.bail_out(&ctx(44, 415, consensus(9)), admin(3), target).unwrap();
    engine.wrap_up_epoch(&ctx(49, 450, consensus(1)), consensus(1)).unwrap();
    assert!(engine.is_block_producer(&target));
    engine.drain_events();

    engine.submit_block_reward(&ctx(50, 451, target), target, 100).unwrap();
    assert_eq!(engine.reward_of(&target), 55);

    // the next period starts the validator back at full rate
    engine.wrap_up_epoch(&ctx(59, 505, consensus(1)), consensus(1)).unwrap();
    engine.drain_events();
    engine.submit_block_reward(&ctx(60, 506, target), target, 100).unwrap();
    assert_eq!(engine.reward_of(&target), 110);
    let events = engine.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        Event::BlockRewardSubmitted { producer, submitted: 100, bonus: 10 } if *producer == target
    )));
}

#[test]
fn test_bail_out_restricted_to_pool_admin() {
    let mut engine = setup(&[(1, 400), (2, 300)]);
    for block in 10..14 {
        engine
            .slash_unavailability(&ctx(block, 110, consensus(1)), consensus(1), consensus(2))
            .unwrap();
    }
    let err = engine.bail_out(&ctx(14, 120, consensus(9)), admin(1), consensus(2)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
}

#[test]
fn test_renounce_exits_at_period_boundary_and_rejoin_keeps_delegations() {
    let mut engine = setup(&[(1, 400), (2, 300)]);
    let delegator = test_keys::address(42);
    engine.delegate(&ctx(10, 110, consensus(1)), delegator, consensus(2), 80).unwrap();

    engine.request_renounce(&ctx(11, 111, consensus(1)), admin(2), consensus(2)).unwrap();
    // the waiting window (50s from t=111) has not matured at this boundary
    engine.wrap_up_epoch(&ctx(19, 150, consensus(1)), consensus(1)).unwrap();
    assert!(engine.is_validator_candidate(&consensus(2)));

    engine.wrap_up_epoch(&ctx(29, 205, consensus(1)), consensus(1)).unwrap();
    assert!(!engine.is_validator_candidate(&consensus(2)));
    assert_eq!(engine.validators(), &[consensus(1)]);

    engine
        .apply_candidate(
            &ctx(30, 210, consensus(1)),
            admin(2),
            consensus(2),
            admin(2),
            admin(2),
            test_keys::address(52),
            2_000,
            150,
        )
        .unwrap();
    assert_eq!(engine.staking_total(&consensus(2)), 230);
    assert_eq!(engine.staking_amount_of(&consensus(2), &delegator), 80);
}

#[test]
fn test_governance_decision_carries_over_to_the_relay_chain() {
    let roster = vec![
        TrustedOrganization { governor: test_keys::address(1), weight: 100 },
        TrustedOrganization { governor: test_keys::address(2), weight: 100 },
    ];
    let mut admin = GovernanceAdmin::new(roster.clone(), 1, 2);
    let relayer = test_keys::address(60);
    let mut mainchain = MainchainGovernance::new(relayer, roster, 1, 2);

    let proposal = Proposal {
        nonce: 1,
        chain_id: ChainId(2),
        targets: vec![test_keys::address(9)],
        values: vec![0],
        calldatas: vec![vec![0xaa]],
        gas_amounts: vec![100_000],
    };
    let digest = crate::governance::digest::ballot_digest(
        &crate::governance::digest::proposal_hash(&proposal),
        VoteSupport::For,
    );
    let votes: Vec<SignedVote> = [1u8, 2]
        .iter()
        .map(|seed| SignedVote {
            governor: test_keys::address(*seed),
            support: VoteSupport::For,
            signature: Signature64::from_bytes(
                ed25519_dalek::Signer::sign(&test_keys::signing_key(*seed), digest.as_bytes())
                    .to_bytes(),
            ),
        })
        .collect();

    let status = admin.propose_and_cast_votes(proposal.clone(), &votes).unwrap();
    assert_eq!(status, VoteStatus::Executed);

    // the same ballot batch convinces the relay chain
    let status = mainchain.relay_proposal(relayer, proposal, &votes).unwrap();
    assert_eq!(status, VoteStatus::Executed);
    assert!(mainchain.proposal_relayed(ChainId(2), 1));
}

proptest! {
    #[test]
    fn prop_credit_score_stays_within_bounds(
        periods in proptest::collection::vec((0u64..200, any::<bool>()), 1..60)
    ) {
        let config = test_config();
        let mut book = CreditScoreBook::new(&config);
        let validator = test_keys::address(1);
        for (indicator, jailed) in periods {
            book.settle_period(validator, indicator, jailed);
            prop_assert!(book.score_of(&validator) <= config.max_credit_score);
        }
    }

    #[test]
    fn prop_ranking_is_deterministic_for_any_stake_assignment(
        stakes in proptest::collection::vec(100u128..1_000, 2..8)
    ) {
        let pairs: Vec<(u8, Balance)> =
            stakes.iter().enumerate().map(|(i, s)| (i as u8 + 1, *s)).collect();
        let a = setup(&pairs);
        let b = setup(&pairs);
        prop_assert_eq!(a.validators(), b.validators());
        prop_assert!(a.validators().len() <= test_config().max_validator_number);
    }
}
