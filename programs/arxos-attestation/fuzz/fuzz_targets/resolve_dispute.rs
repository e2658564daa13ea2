//! Fuzz target for resolve_dispute and apply_overturn_slash
//!
//! Tests:
//! - Resolution only after the reveal window closes, exactly once
//! - Strict Invalid majority overturns; ties and silence uphold
//! - Overturned: bond returned, record cancelled, nothing minted
//! - Upheld: bond forfeited, payout only if already finalizable
//! - Overturn slashes hit confirmers once, within the slash window, including
//!   stake already queued for withdrawal
//!
//! Run with: cargo test --release -p arxos-attestation-fuzz resolve_dispute

use crate::*;
use arxos_attestation::state::{ContributionStatus, ProtocolParams, Ruling};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn fuzz_resolve_dispute(input in any::<ResolveDisputeInput>()) {
        let result = simulate_resolve_dispute(&input);
        prop_assert!(result.is_success(), "{:?} -> {:?}", input, result);
    }
}

/// Two confirmers, `voters` eligible voters, dispute raised immediately.
fn disputed(params: ProtocolParams, voters: u8) -> (Fixture, [u8; 32]) {
    let mut fx = Fixture::new(params, 2 + voters);
    let key = fx.attest_by(1_000, 2);
    let challenger = fx.challenger;
    assert!(fx
        .protocol
        .raise_dispute(challenger, key, "double counted")
        .is_success());
    (fx, key)
}

fn vote_and_close(fx: &mut Fixture, key: [u8; 32], votes: &[bool]) {
    let params = fx.protocol.config().params();
    for (i, vote) in votes.iter().enumerate() {
        let voter = fx.validators[2 + i];
        assert!(fx.protocol.commit_sealed(voter, key, *vote, [3; 32]).is_success());
    }
    fx.protocol.advance(params.commit_period);
    for (i, vote) in votes.iter().enumerate() {
        let voter = fx.validators[2 + i];
        assert!(fx.protocol.reveal_vote(voter, key, *vote, [3; 32]).is_success());
    }
    fx.protocol.advance(params.reveal_period);
}

#[test]
fn test_tie_upholds_and_pays_out() {
    let (mut fx, key) = disputed(ProtocolParams::default(), 2);
    vote_and_close(&mut fx, key, &[true, false]);

    assert!(fx.protocol.resolve_dispute(key).is_success());
    let dispute = fx.protocol.dispute(&key).unwrap();
    assert_eq!(dispute.ruling, Ruling::Upheld);
    let record = fx.protocol.record(&key).unwrap();
    assert_eq!(record.status, ContributionStatus::Finalized);
    assert_eq!(fx.protocol.balance(&fx.worker), 700);
}

#[test]
fn test_no_reveals_upholds() {
    let (mut fx, key) = disputed(ProtocolParams::default(), 0);
    vote_and_close(&mut fx, key, &[]);

    assert!(fx.protocol.resolve_dispute(key).is_success());
    assert_eq!(fx.protocol.dispute(&key).unwrap().ruling, Ruling::Upheld);
}

#[test]
fn test_overturn_returns_bond_and_cancels() {
    let params = ProtocolParams {
        overturn_slash_bps: 1_000,
        ..ProtocolParams::default()
    };
    let (mut fx, key) = disputed(params, 3);
    let challenger = fx.challenger;
    let balance_before = fx.protocol.balance(&challenger);
    vote_and_close(&mut fx, key, &[false, false, true]);

    assert!(fx.protocol.resolve_dispute(key).is_success());
    assert_eq!(fx.protocol.balance(&challenger), balance_before + params.dispute_bond);
    assert_eq!(
        fx.protocol.record(&key).unwrap().status,
        ContributionStatus::Cancelled
    );
    assert_eq!(fx.protocol.state.ledger.minted, 0);
    assert!(fx
        .protocol
        .finalize(key)
        .is_error_named("ContributionAlreadySettled"));

    // 10% of the 1000 minimum stake
    let confirmer = fx.validators[0];
    assert!(fx.protocol.apply_overturn_slash(key, confirmer).is_success());
    assert_eq!(fx.protocol.stake(&confirmer).unwrap().active_stake, 900);
}

#[test]
fn test_overturn_slash_reaches_queued_withdrawal() {
    let params = ProtocolParams {
        overturn_slash_bps: 1_000,
        ..ProtocolParams::default()
    };
    let (mut fx, key) = disputed(params, 3);
    let confirmer = fx.validators[0];

    // Confirmer queues its whole stake while the dispute runs
    assert!(fx
        .protocol
        .request_withdrawal(confirmer, params.min_stake)
        .is_success());
    vote_and_close(&mut fx, key, &[false, false, true]);
    assert!(fx.protocol.resolve_dispute(key).is_success());

    let treasury_before = fx.protocol.state.ledger.treasury;
    assert!(fx.protocol.apply_overturn_slash(key, confirmer).is_success());
    let stake = fx.protocol.stake(&confirmer).unwrap();
    assert_eq!(stake.active_stake, 0);
    assert_eq!(stake.pending_withdrawal, 900);
    assert_eq!(fx.protocol.state.ledger.treasury, treasury_before + 100);

    fx.protocol.advance(params.withdrawal_delay);
    let balance_before = fx.protocol.balance(&confirmer);
    assert!(fx.protocol.complete_withdrawal(confirmer).is_success());
    assert_eq!(fx.protocol.balance(&confirmer), balance_before + 900);
}

#[test]
fn test_resolution_does_not_depend_on_bond_source() {
    let (mut fx, key) = disputed(ProtocolParams::default(), 1);
    let challenger = fx.challenger;

    // Bond source drained and closed after posting
    fx.protocol.drain(&challenger);
    vote_and_close(&mut fx, key, &[true]);

    assert!(fx.protocol.resolve_dispute(key).is_success());
    let record = fx.protocol.record(&key).unwrap();
    assert!(!record.dispute_open);
    assert_eq!(record.status, ContributionStatus::Finalized);
}

#[test]
fn test_upheld_before_delay_returns_to_finalize_flow() {
    let params = ProtocolParams {
        finalization_delay: 7 * 24 * 60 * 60,
        ..ProtocolParams::default()
    };
    let (mut fx, key) = disputed(params, 1);
    vote_and_close(&mut fx, key, &[true]);

    assert!(fx.protocol.resolve_dispute(key).is_success());
    let record = fx.protocol.record(&key).unwrap();
    assert_eq!(record.status, ContributionStatus::Proposed);
    assert!(!record.dispute_open);

    // No second bonded dispute, no new flag
    let challenger = fx.challenger;
    assert!(fx
        .protocol
        .raise_dispute(challenger, key, "again")
        .is_error_named("DisputeAlreadyResolved"));
    assert!(fx
        .protocol
        .flag(fx.validators[2], key, "again")
        .is_error_named("DisputeAlreadyResolved"));

    fx.protocol.advance(params.finalization_delay);
    assert!(fx.protocol.finalize(key).is_success());
}

#[test]
fn test_upheld_ruling_clears_flag() {
    let (mut fx, key) = disputed(ProtocolParams::default(), 1);
    assert!(fx
        .protocol
        .flag(fx.validators[2], key, "blurry")
        .is_success());
    vote_and_close(&mut fx, key, &[true]);

    assert!(fx.protocol.resolve_dispute(key).is_success());
    let record = fx.protocol.record(&key).unwrap();
    assert!(!record.flagged);
    assert_eq!(record.status, ContributionStatus::Finalized);
}

#[test]
fn test_challenger_without_bond_rejected() {
    let mut fx = Fixture::new(ProtocolParams::default(), 2);
    let key = fx.attest_by(1_000, 2);
    let pauper = actor("pauper", 0);

    let result = fx.protocol.raise_dispute(pauper, key, "no funds");
    assert!(result.is_error_named("TokenTransferFailed"), "{:?}", result);
    assert!(fx.protocol.dispute(&key).is_none());
    assert!(!fx.protocol.record(&key).unwrap().dispute_open);
}
