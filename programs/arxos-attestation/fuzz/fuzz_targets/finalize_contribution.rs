//! Fuzz target for finalize_contribution
//!
//! Tests:
//! - Finalization gate order: settled, delay, quorum, flag, dispute
//! - The 70/10/10/10 split sums exactly to the amount
//! - A finalized record is terminal
//!
//! Run with: cargo test --release -p arxos-attestation-fuzz finalize_contribution

use crate::*;
use arxos_attestation::instructions::contribution_helpers::calculate_payout_split;
use arxos_attestation::state::ProtocolParams;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn fuzz_finalize_contribution(input in any::<FinalizeContributionInput>()) {
        let result = simulate_finalize_contribution(&input);
        prop_assert!(result.is_success(), "{:?} -> {:?}", input, result);
    }

    #[test]
    fn fuzz_payout_split_exact(amount in arb_amount()) {
        match calculate_payout_split(amount) {
            Ok(split) => {
                let check = check_payout_split(amount, &split);
                prop_assert!(check.is_valid(), "{:?}", check);
            }
            Err(_) => prop_assert_eq!(amount, 0),
        }
    }
}

#[test]
fn test_finalize_exactly_at_delay() {
    let params = ProtocolParams::default();
    let mut fx = Fixture::new(params, 2);
    let key = fx.attest_by(1_000, 2);

    fx.protocol.advance(params.finalization_delay - 1);
    assert!(fx
        .protocol
        .finalize(key)
        .is_error_named("FinalizationDelayNotElapsed"));

    fx.protocol.advance(1);
    assert!(fx.protocol.finalize(key).is_success());
}

#[test]
fn test_flag_blocks_until_cleared() {
    let params = ProtocolParams::default();
    let mut fx = Fixture::new(params, 3);
    let key = fx.attest_by(1_000, 2);
    let admin = fx.protocol.admin;

    assert!(fx
        .protocol
        .flag(fx.validators[2], key, "photo from another site")
        .is_success());
    assert!(fx
        .protocol
        .flag(fx.validators[1], key, "again")
        .is_error_named("AlreadyFlagged"));

    fx.protocol.advance(params.finalization_delay);
    assert!(fx.protocol.finalize(key).is_error_named("ContributionFlagged"));

    // Clearing needs the multisig
    let outsider = actor("outsider", 0);
    assert!(fx
        .protocol
        .clear_flag(key, &[outsider])
        .is_error_named("MultisigNotEnoughSigners"));
    assert!(fx.protocol.clear_flag(key, &[admin]).is_success());
    assert!(fx.protocol.finalize(key).is_success());
}

#[test]
fn test_flag_requires_qualified_validator() {
    let mut fx = Fixture::new(ProtocolParams::default(), 2);
    let key = fx.attest_by(1_000, 2);
    let outsider = actor("outsider", 0);
    fx.protocol.fund(outsider, 10);
    assert!(fx.protocol.deposit_stake(outsider, 10).is_success());

    let result = fx.protocol.flag(outsider, key, "looks wrong");
    assert!(result.is_error_named("ValidatorNotQualified"), "{:?}", result);
}

#[test]
fn test_attest_after_finalize_rejected() {
    let params = ProtocolParams::default();
    let mut fx = Fixture::new(params, 3);
    let key = fx.attest_by(1_000, 2);
    fx.protocol.advance(params.finalization_delay);
    assert!(fx.protocol.finalize(key).is_success());

    let capture = fx.capture(1_000);
    let result = fx.protocol.attest(fx.validators[2], &capture);
    assert!(
        result.is_error_named("ContributionAlreadySettled"),
        "{:?}",
        result
    );
}
