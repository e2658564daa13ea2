//! Whole-protocol fuzz target and worked examples
//!
//! Random interleavings of every instruction across several claims, with
//! the full invariant set checked after each committed step.
//!
//! Run with: cargo test --release -p arxos-attestation-fuzz protocol_scenarios

use crate::*;
use arxos_attestation::state::{ContributionStatus, ProtocolParams};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn fuzz_protocol_scenarios(input in any::<ProtocolScenarioInput>()) {
        let result = simulate_protocol_scenario(&input);
        prop_assert!(!result.is_invariant_violation(), "{:?}", result);
    }
}

#[test]
fn test_worked_example_two_validators_pay_out_1000() {
    let params = ProtocolParams::default();
    let mut fx = Fixture::new(params, 2);
    let key = fx.attest_by(1_000, 2);

    let record = fx.protocol.record(&key).unwrap();
    assert_eq!(record.confirmation_count, 2);
    assert_eq!(record.status, ContributionStatus::Proposed);

    fx.protocol.advance(params.finalization_delay);
    assert!(fx.protocol.finalize(key).is_success());

    let ledger = &fx.protocol.state.ledger;
    assert_eq!(ledger.balance(&fx.worker), 700);
    assert_eq!(ledger.balance(&fx.building_wallet), 100);
    assert_eq!(ledger.maintainer_pool, 100);
    assert_eq!(ledger.treasury, 100);
    assert_eq!(fx.protocol.config().total_value_distributed, 1_000);
    assert_eq!(fx.protocol.config().finalized_contributions, 1);
}

#[test]
fn test_single_confirmation_insufficient() {
    let params = ProtocolParams::default();
    let mut fx = Fixture::new(params, 1);
    let key = fx.attest_by(1_000, 1);

    fx.protocol.advance(params.finalization_delay);
    let result = fx.protocol.finalize(key);
    assert!(result.is_error_named("InsufficientConfirmations"), "{:?}", result);
}

#[test]
fn test_distinct_amounts_are_distinct_records() {
    let mut fx = Fixture::new(ProtocolParams::default(), 2);
    let small = fx.attest_by(999, 2);
    let large = fx.attest_by(1_000, 2);

    assert_ne!(small, large);
    assert_eq!(fx.protocol.config().total_contributions, 2);
    assert_eq!(fx.protocol.state.consumed.len(), 4);
}

#[test]
fn test_parameter_update_requires_multisig_and_valid_params() {
    let mut protocol = SimulatedProtocol::new(ProtocolParams::default());
    let admin = protocol.admin;
    let outsider = actor("outsider", 0);
    let params = ProtocolParams {
        min_confirmations: 3,
        ..ProtocolParams::default()
    };

    assert!(protocol
        .update_params(params, &[outsider])
        .is_error_named("MultisigNotEnoughSigners"));
    assert!(protocol
        .update_params(
            ProtocolParams {
                min_confirmations: 0,
                ..params
            },
            &[admin]
        )
        .is_error_named("InvalidProtocolParams"));
    assert!(protocol.update_params(params, &[admin]).is_success());
    assert_eq!(protocol.config().min_confirmations, 3);
}

#[test]
fn test_inactive_worker_cannot_be_attested() {
    let mut fx = Fixture::new(ProtocolParams::default(), 1);
    let worker = fx.worker;
    assert!(fx.protocol.set_worker_status(worker, false).is_success());

    let capture = fx.capture(1_000);
    let result = fx.protocol.attest(fx.validators[0], &capture);
    assert!(result.is_error_named("WorkerNotActive"), "{:?}", result);
}

#[test]
fn test_registration_is_write_once() {
    let mut fx = Fixture::new(ProtocolParams::default(), 0);
    let worker = fx.worker;
    assert!(fx.protocol.register_worker(worker).is_error());
    assert!(fx
        .protocol
        .register_building(fx.building_id, fx.building_wallet)
        .is_error());
    assert!(fx
        .protocol
        .register_building([1; 32], anchor_lang::prelude::Pubkey::default())
        .is_error_named("InvalidBuildingWallet"));
}
