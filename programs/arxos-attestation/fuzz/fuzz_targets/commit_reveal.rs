//! Fuzz target for commit_vote / reveal_vote
//!
//! Tests:
//! - Commits only inside the commit window, reveals only inside the reveal
//!   window
//! - A reveal must match its commitment exactly
//! - One commit and one reveal per voter; participants cannot vote, including
//!   voters who confirm the record after committing
//! - The tally counts exactly the accepted reveals
//!
//! Run with: cargo test --release -p arxos-attestation-fuzz commit_reveal

use crate::*;
use arxos_attestation::instructions::dispute_helpers::vote_commitment;
use arxos_attestation::state::ProtocolParams;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn fuzz_commit_reveal(input in any::<CommitRevealInput>()) {
        let result = simulate_commit_reveal(&input);
        prop_assert!(result.is_success(), "{:?} -> {:?}", input, result);
    }
}

fn open_dispute_fixture(voters: u8) -> (Fixture, [u8; 32]) {
    let mut fx = Fixture::new(ProtocolParams::default(), 2 + voters);
    let key = fx.attest_by(1_000, 2);
    let challenger = fx.challenger;
    assert!(fx
        .protocol
        .raise_dispute(challenger, key, "worker was on leave")
        .is_success());
    (fx, key)
}

#[test]
fn test_commitment_bound_to_voter() {
    let (mut fx, key) = open_dispute_fixture(2);
    let (alice, bob) = (fx.validators[2], fx.validators[3]);
    let salt = [5u8; 32];

    // Bob submits a copy of Alice's commitment
    let alice_commitment = vote_commitment(&key, &alice, false, &salt);
    assert!(fx.protocol.commit_vote(alice, key, alice_commitment).is_success());
    assert!(fx.protocol.commit_vote(bob, key, alice_commitment).is_success());

    fx.protocol.advance(ProtocolParams::default().commit_period);
    assert!(fx.protocol.reveal_vote(alice, key, false, salt).is_success());
    let result = fx.protocol.reveal_vote(bob, key, false, salt);
    assert!(result.is_error_named("CommitmentMismatch"), "{:?}", result);
}

#[test]
fn test_zero_commitment_rejected() {
    let (mut fx, key) = open_dispute_fixture(1);
    let result = fx.protocol.commit_vote(fx.validators[2], key, [0u8; 32]);
    assert!(result.is_error_named("InvalidCommitment"), "{:?}", result);
}

#[test]
fn test_commit_deadline_is_exclusive() {
    let params = ProtocolParams::default();
    let (mut fx, key) = open_dispute_fixture(2);

    fx.protocol.advance(params.commit_period - 1);
    assert!(fx
        .protocol
        .commit_sealed(fx.validators[2], key, true, [1; 32])
        .is_success());
    fx.protocol.advance(1);
    assert!(fx
        .protocol
        .commit_sealed(fx.validators[3], key, true, [1; 32])
        .is_error_named("CommitWindowClosed"));
}

#[test]
fn test_unbonded_voter_rejected() {
    let (mut fx, key) = open_dispute_fixture(0);
    let outsider = actor("outsider", 0);
    let result = fx.protocol.commit_sealed(outsider, key, true, [1; 32]);
    assert!(result.is_error_named(NOT_FOUND), "{:?}", result);
}

#[test]
fn test_voter_turned_confirmer_cannot_reveal() {
    let (mut fx, key) = open_dispute_fixture(1);
    let voter = fx.validators[2];
    let salt = [8u8; 32];
    assert!(fx.protocol.commit_sealed(voter, key, true, salt).is_success());

    // Same claim, fresh capture, attested by the voter
    let capture = fx.capture(1_000);
    assert_eq!(capture.contribution_key, key);
    assert!(fx.protocol.attest(voter, &capture).is_success());

    fx.protocol.advance(ProtocolParams::default().commit_period);
    let result = fx.protocol.reveal_vote(voter, key, true, salt);
    assert!(result.is_error_named("VoterIsParticipant"), "{:?}", result);
    assert_eq!(fx.protocol.dispute(&key).unwrap().reveal_count, 0);
}
