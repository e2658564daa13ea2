//! Fuzz target for the stake registry
//!
//! Tests:
//! - deposited = active + pending + withdrawn + slashed
//! - The stake vault holds exactly the bonded stake
//! - Withdrawals unlock only after the delay; slashes never touch pending
//!
//! Run with: cargo test --release -p arxos-attestation-fuzz stake_lifecycle

use crate::*;
use arxos_attestation::state::ProtocolParams;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn fuzz_stake_lifecycle(input in any::<StakeLifecycleInput>()) {
        let result = simulate_stake_lifecycle(&input);
        prop_assert!(result.is_success(), "{:?}", result);
    }
}

#[test]
fn test_withdrawal_request_restarts_timer() {
    let params = ProtocolParams::default();
    let mut protocol = SimulatedProtocol::new(params);
    let validator = actor("validator", 0);
    protocol.fund(validator, 2_000);
    assert!(protocol.deposit_stake(validator, 2_000).is_success());

    assert!(protocol.request_withdrawal(validator, 500).is_success());
    protocol.advance(params.withdrawal_delay - 10);
    assert!(protocol.request_withdrawal(validator, 500).is_success());

    // The first request alone would have unlocked by now
    protocol.advance(20);
    assert!(protocol
        .complete_withdrawal(validator)
        .is_error_named("WithdrawalLocked"));

    protocol.advance(params.withdrawal_delay);
    assert!(protocol.complete_withdrawal(validator).is_success());
    assert_eq!(protocol.balance(&validator), 1_000);
    assert_eq!(protocol.stake(&validator).unwrap().active_stake, 1_000);
}

#[test]
fn test_pending_stake_does_not_qualify() {
    let params = ProtocolParams::default();
    let mut fx = Fixture::new(params, 1);
    let validator = fx.validators[0];
    assert!(fx.protocol.request_withdrawal(validator, 1).is_success());

    let capture = fx.capture(1_000);
    let result = fx.protocol.attest(validator, &capture);
    assert!(result.is_error_named("ValidatorNotQualified"), "{:?}", result);
}

#[test]
fn test_slash_clamps_to_active_stake() {
    let params = ProtocolParams::default();
    let mut protocol = SimulatedProtocol::new(params);
    let admin = protocol.admin;
    let validator = actor("validator", 0);
    protocol.fund(validator, 1_500);
    assert!(protocol.deposit_stake(validator, 1_500).is_success());
    assert!(protocol.request_withdrawal(validator, 500).is_success());

    assert!(protocol
        .slash_validator(validator, 5_000, 1, &[admin])
        .is_success());
    let stake = protocol.stake(&validator).unwrap();
    assert_eq!(stake.active_stake, 0);
    assert_eq!(stake.pending_withdrawal, 500);
    assert_eq!(stake.total_slashed, 1_000);
    assert_eq!(protocol.state.ledger.treasury, 1_000);
    assert_eq!(protocol.config().total_staked, 500);
}

#[test]
fn test_slash_requires_multisig() {
    let mut protocol = SimulatedProtocol::new(ProtocolParams::default());
    let validator = actor("validator", 0);
    protocol.fund(validator, 1_000);
    assert!(protocol.deposit_stake(validator, 1_000).is_success());

    let result = protocol.slash_validator(validator, 100, 0, &[validator]);
    assert!(result.is_error_named("MultisigNotEnoughSigners"), "{:?}", result);
}

#[test]
fn test_deposit_needs_funds() {
    let mut protocol = SimulatedProtocol::new(ProtocolParams::default());
    let validator = actor("validator", 0);
    protocol.fund(validator, 999);

    let result = protocol.deposit_stake(validator, 1_000);
    assert!(result.is_error_named("TokenTransferFailed"), "{:?}", result);
    assert!(protocol.stake(&validator).is_none());
}
