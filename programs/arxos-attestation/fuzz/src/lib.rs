//! Property-based fuzz testing library for the ArxOS attestation protocol
//!
//! Drives the program's bookkeeping helpers through a simulated account set
//! and checks protocol invariants after every committed operation.
//!
//! # Usage
//!
//! ```bash
//! # Run all property-based tests
//! cargo test --release
//!
//! # Run the fuzz test runner
//! cargo run --release
//!
//! # Run with more iterations
//! PROPTEST_CASES=10000 cargo test --release
//! ```

pub mod arbitrary;
pub mod invariants;
pub mod scenarios;

pub use arbitrary::*;
pub use invariants::*;
pub use scenarios::*;

// Include fuzz targets as test modules
#[cfg(test)]
#[path = "../fuzz_targets/attest_contribution.rs"]
mod attest_contribution_tests;

#[cfg(test)]
#[path = "../fuzz_targets/finalize_contribution.rs"]
mod finalize_contribution_tests;

#[cfg(test)]
#[path = "../fuzz_targets/stake_lifecycle.rs"]
mod stake_lifecycle_tests;

#[cfg(test)]
#[path = "../fuzz_targets/commit_reveal.rs"]
mod commit_reveal_tests;

#[cfg(test)]
#[path = "../fuzz_targets/resolve_dispute.rs"]
mod resolve_dispute_tests;

#[cfg(test)]
#[path = "../fuzz_targets/protocol_scenarios.rs"]
mod protocol_scenarios_tests;
