//! Fuzz target for attest_contribution
//!
//! Tests:
//! - Each signed capture is consumed at most once, whatever triple it is
//!   later presented under
//! - The precompile signer, message and signature must match the arguments
//! - Client-supplied record key and proof digest are recomputed
//! - A rejected attestation leaves no record, confirmation or consumed proof
//!
//! Run with: cargo test --release -p arxos-attestation-fuzz attest_contribution

use crate::*;
use arxos_attestation::instructions::contribution_helpers::contribution_key;
use arxos_attestation::state::ProtocolParams;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn fuzz_attest_contribution(input in any::<AttestContributionInput>()) {
        let result = simulate_attest_contribution(&input);
        prop_assert!(result.is_success(), "{:?} -> {:?}", input, result);
    }

    /// Distinct validators each bring their own capture; every one counts
    #[test]
    fn fuzz_distinct_validators_accumulate(confirmers in 1usize..=16, amount in 1u64..1_000_000) {
        let mut fx = Fixture::new(ProtocolParams::default(), confirmers as u8);
        let key = fx.attest_by(amount, confirmers);

        let record = fx.protocol.record(&key).unwrap();
        prop_assert_eq!(record.confirmation_count as usize, confirmers);
        prop_assert_eq!(fx.protocol.state.consumed.len(), confirmers);
        prop_assert_eq!(fx.protocol.config().total_contributions, 1);
    }
}

#[test]
fn test_same_validator_cannot_confirm_twice() {
    let mut fx = Fixture::new(ProtocolParams::default(), 1);
    let validator = fx.validators[0];
    let first = fx.capture(1_000);
    let second = fx.capture(1_000);

    assert!(fx.protocol.attest(validator, &first).is_success());
    let result = fx.protocol.attest(validator, &second);
    assert!(result.is_error_named("AlreadyConfirmed"), "{:?}", result);
}

#[test]
fn test_replayed_capture_rejected_for_every_validator() {
    let mut fx = Fixture::new(ProtocolParams::default(), 3);
    let capture = fx.capture(1_000);

    assert!(fx.protocol.attest(fx.validators[0], &capture).is_success());
    for validator in fx.validators.clone() {
        let result = fx.protocol.attest(validator, &capture);
        assert!(result.is_error_named("ProofAlreadyConsumed"), "{:?}", result);
    }
}

#[test]
fn test_consumed_capture_rejected_under_another_triple() {
    let mut fx = Fixture::new(ProtocolParams::default(), 3);
    let capture = fx.capture(1_000);
    assert!(fx.protocol.attest(fx.validators[0], &capture).is_success());

    // Same signed message presented as a different amount
    let other_amount = Attestation {
        amount: 2_000,
        contribution_key: contribution_key(&capture.building_id, &capture.worker, 2_000),
        ..capture.clone()
    };
    let result = fx.protocol.attest(fx.validators[1], &other_amount);
    assert!(result.is_error_named("ProofAlreadyConsumed"), "{:?}", result);

    // And under another registered building
    let other_building = [0xB2; 32];
    assert!(fx
        .protocol
        .register_building(other_building, fx.building_wallet)
        .is_success());
    let moved = Attestation {
        building_id: other_building,
        contribution_key: contribution_key(&other_building, &capture.worker, capture.amount),
        ..capture.clone()
    };
    let result = fx.protocol.attest(fx.validators[2], &moved);
    assert!(result.is_error_named("ProofAlreadyConsumed"), "{:?}", result);

    assert_eq!(fx.protocol.state.consumed.len(), 1);
    assert_eq!(fx.protocol.config().total_contributions, 1);
}

#[test]
fn test_seventeenth_confirmation_rejected() {
    let mut fx = Fixture::new(ProtocolParams::default(), 17);
    let key = fx.attest_by(1_000, 16);
    let capture = fx.capture(1_000);

    let result = fx.protocol.attest(fx.validators[16], &capture);
    assert!(result.is_error_named("ConfirmationLimitReached"), "{:?}", result);
    assert_eq!(fx.protocol.record(&key).unwrap().confirmation_count, 16);
}

#[test]
fn test_unregistered_building_not_found() {
    let mut fx = Fixture::new(ProtocolParams::default(), 1);
    let mut capture = fx.capture(1_000);
    capture.building_id = [0xEE; 32];

    let result = fx.protocol.attest(fx.validators[0], &capture);
    assert!(result.is_error_named(NOT_FOUND), "{:?}", result);
}

#[test]
fn test_building_wallet_is_snapshotted() {
    let mut fx = Fixture::new(ProtocolParams::default(), 2);
    let key = fx.attest_by(1_000, 1);
    let new_wallet = actor("building-wallet", 1);
    assert!(fx
        .protocol
        .update_building_wallet(fx.building_id, new_wallet)
        .is_success());

    let capture = fx.capture(1_000);
    assert!(fx.protocol.attest(fx.validators[1], &capture).is_success());
    assert_eq!(
        fx.protocol.record(&key).unwrap().building_wallet,
        fx.building_wallet
    );
}
