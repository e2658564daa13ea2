//! Fuzz test runner for the ArxOS attestation protocol
//!
//! Run with: cargo run --release
//! Or: cargo test (for property-based tests)

use arxos_attestation::state::ProtocolParams;
use arxos_attestation_fuzz::*;
use proptest::prelude::*;
use proptest::strategy::ValueTree;
use std::time::Instant;

fn main() {
    println!("=== ArxOS Attestation Protocol Fuzz Testing ===\n");

    let start = Instant::now();
    let mut total_tests = 0;
    let mut passed = 0;
    let mut failed = 0;

    println!("Running attest_contribution fuzz tests...");
    let (p, f) = run_fuzz::<AttestContributionInput>(200, simulate_attest_contribution);
    passed += p;
    failed += f;
    total_tests += p + f;

    println!("Running finalize_contribution fuzz tests...");
    let (p, f) = run_fuzz::<FinalizeContributionInput>(200, simulate_finalize_contribution);
    passed += p;
    failed += f;
    total_tests += p + f;

    println!("Running stake_lifecycle fuzz tests...");
    let (p, f) = run_fuzz::<StakeLifecycleInput>(100, simulate_stake_lifecycle);
    passed += p;
    failed += f;
    total_tests += p + f;

    println!("Running commit_reveal fuzz tests...");
    let (p, f) = run_fuzz::<CommitRevealInput>(100, simulate_commit_reveal);
    passed += p;
    failed += f;
    total_tests += p + f;

    println!("Running resolve_dispute fuzz tests...");
    let (p, f) = run_fuzz::<ResolveDisputeInput>(100, simulate_resolve_dispute);
    passed += p;
    failed += f;
    total_tests += p + f;

    println!("Running protocol scenario fuzz tests...");
    let (p, f) = run_fuzz::<ProtocolScenarioInput>(50, |input| {
        match simulate_protocol_scenario(input) {
            SimulationResult::InvariantViolation(v) => SimulationResult::InvariantViolation(v),
            _ => SimulationResult::Success,
        }
    });
    passed += p;
    failed += f;
    total_tests += p + f;

    println!("Running edge case tests...");
    let (p, f) = run_edge_case_tests();
    passed += p;
    failed += f;
    total_tests += p + f;

    let duration = start.elapsed();

    println!("\n=== Fuzz Testing Complete ===");
    println!("Total tests: {}", total_tests);
    println!("Passed: {}", passed);
    println!("Failed: {}", failed);
    println!("Duration: {:?}", duration);

    if failed > 0 {
        std::process::exit(1);
    }
}

fn run_fuzz<I>(iterations: usize, scenario: impl Fn(&I) -> SimulationResult) -> (usize, usize)
where
    I: Arbitrary + std::fmt::Debug,
{
    let mut passed = 0;
    let mut failed = 0;

    let mut runner = proptest::test_runner::TestRunner::default();

    for i in 0..iterations {
        let input = any::<I>()
            .new_tree(&mut runner)
            .expect("Failed to generate fuzz input")
            .current();

        match scenario(&input) {
            SimulationResult::Success => passed += 1,
            other => {
                println!("  FAILED at iteration {}: {:?}", i, other);
                println!("  Input: {:?}", input);
                failed += 1;
            }
        }
    }

    println!("  Passed: {}, Failed: {}", passed, failed);
    (passed, failed)
}

fn run_edge_case_tests() -> (usize, usize) {
    let mut passed = 0;
    let mut failed = 0;
    let mut record = |name: &str, outcome: Verdict| match outcome {
        Ok(()) => passed += 1,
        Err(reason) => {
            println!("  FAILED {}: {}", name, reason);
            failed += 1;
        }
    };

    // Worked example: 1000 confirmed twice pays 700/100/100/100
    record("worked example", {
        let params = ProtocolParams::default();
        let mut fx = Fixture::new(params, 2);
        let key = fx.attest_by(1_000, 2);
        fx.protocol.advance(params.finalization_delay);
        expect("finalize", fx.protocol.finalize(key), Expect::Success).and_then(|_| {
            let ledger = &fx.protocol.state.ledger;
            let paid = (
                ledger.balance(&fx.worker),
                ledger.balance(&fx.building_wallet),
                ledger.maintainer_pool,
                ledger.treasury,
            );
            if paid == (700, 100, 100, 100) {
                Ok(())
            } else {
                Err(format!("paid {:?}", paid))
            }
        })
    });

    // Largest amount still splits exactly
    record("max amount split", {
        let params = ProtocolParams::default();
        let mut fx = Fixture::new(params, 2);
        let key = fx.attest_by(u64::MAX, 2);
        fx.protocol.advance(params.finalization_delay);
        expect("finalize", fx.protocol.finalize(key), Expect::Success)
    });

    // Replay of a consumed capture
    record("replay", {
        let mut fx = Fixture::new(ProtocolParams::default(), 2);
        let capture = fx.capture(1_000);
        let first = fx.protocol.attest(fx.validators[0], &capture);
        let second = fx.protocol.attest(fx.validators[1], &capture);
        expect("first", first, Expect::Success)
            .and_then(|_| expect("replay", second, Expect::Error("ProofAlreadyConsumed")))
    });

    // Resolve exactly at the reveal deadline
    record("resolve at deadline", {
        let params = ProtocolParams::default();
        let mut fx = Fixture::new(params, 2);
        let key = fx.attest_by(1_000, 2);
        let challenger = fx.challenger;
        let raised = fx.protocol.raise_dispute(challenger, key, "edge");
        fx.protocol
            .advance(params.commit_period + params.reveal_period - 1);
        let early = fx.protocol.resolve_dispute(key);
        fx.protocol.advance(1);
        let on_time = fx.protocol.resolve_dispute(key);
        expect("raise", raised, Expect::Success)
            .and_then(|_| expect("early", early, Expect::Error("DisputeWindowOpen")))
            .and_then(|_| expect("on time", on_time, Expect::Success))
    });

    println!("  Passed: {}, Failed: {}", passed, failed);
    (passed, failed)
}
