//! Arbitrary input generators for fuzz testing
//!
//! Generates random inputs for the protocol instructions, biased towards
//! boundary values: zero and maximal amounts, window edges and replays.

use proptest::prelude::*;

/// Arbitrary 32-byte identifier (building id, evidence hash, salt)
pub fn arb_id() -> impl Strategy<Value = [u8; 32]> {
    prop::array::uniform32(any::<u8>())
}

/// Arbitrary contribution amount with edge cases
pub fn arb_amount() -> impl Strategy<Value = u64> {
    prop_oneof![
        // Edge cases
        Just(0u64),
        Just(1u64),
        Just(7u64),
        Just(1_000u64),
        Just(u64::MAX),
        Just(u64::MAX - 1),
        // Amounts that exercise rounding
        1u64..1_000u64,
        // Typical amounts
        1_000u64..1_000_000_000u64,
        1_000_000_000u64..u64::MAX / 2,
    ]
}

/// Arbitrary stake movement around the default minimum stake of 1000
pub fn arb_stake_amount() -> impl Strategy<Value = u64> {
    prop_oneof![
        Just(0u64),
        Just(1u64),
        Just(999u64),
        Just(1_000u64),
        Just(1_001u64),
        1u64..5_000u64,
    ]
}

/// Arbitrary overturn slash in basis points (0-5000)
pub fn arb_slash_bps() -> impl Strategy<Value = u16> {
    prop_oneof![Just(0u16), Just(1u16), Just(5_000u16), 1u16..5_000u16]
}

/// Arbitrary time step in seconds, including jumps across the default
/// one-day windows
pub fn arb_time_step() -> impl Strategy<Value = i64> {
    prop_oneof![
        Just(0i64),
        Just(1i64),
        Just(60 * 60),
        Just(24 * 60 * 60 - 1),
        Just(24 * 60 * 60),
        Just(7 * 24 * 60 * 60),
        0i64..(10 * 24 * 60 * 60),
    ]
}

/// Arbitrary vote (valid/invalid)
pub fn arb_vote() -> impl Strategy<Value = bool> {
    any::<bool>()
}

/// Ways an attestation transaction can be malformed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttestTamper {
    None,
    /// Precompile instruction omitted
    MissingPrecompile,
    /// Precompile signed by someone other than the worker
    WrongSigner,
    /// Precompile valid, program argument carries different signature bytes
    SignatureArgMismatch,
    /// Signature the precompile itself rejects
    ForgedSignature,
    /// Proof describes a different amount
    ProofAmountMismatch,
    ZeroEvidence,
    CapturedInFuture,
    WrongContributionKey,
    WrongProofDigest,
    /// The same capture submitted twice
    Replay,
}

pub fn arb_attest_tamper() -> impl Strategy<Value = AttestTamper> {
    prop_oneof![
        4 => Just(AttestTamper::None),
        1 => Just(AttestTamper::MissingPrecompile),
        1 => Just(AttestTamper::WrongSigner),
        1 => Just(AttestTamper::SignatureArgMismatch),
        1 => Just(AttestTamper::ForgedSignature),
        1 => Just(AttestTamper::ProofAmountMismatch),
        1 => Just(AttestTamper::ZeroEvidence),
        1 => Just(AttestTamper::CapturedInFuture),
        1 => Just(AttestTamper::WrongContributionKey),
        1 => Just(AttestTamper::WrongProofDigest),
        1 => Just(AttestTamper::Replay),
    ]
}

/// Arbitrary input for attest_contribution
#[derive(Debug, Clone)]
pub struct AttestContributionInput {
    pub amount: u64,
    /// Stake of the attesting validator
    pub stake: u64,
    pub worker_active: bool,
    pub tamper: AttestTamper,
    /// Honest attestations from other validators before this one
    pub prior_confirmations: u8,
}

impl Arbitrary for AttestContributionInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            arb_amount(),
            arb_stake_amount(),
            prop::bool::weighted(0.9),
            arb_attest_tamper(),
            0u8..4u8,
        )
            .prop_map(
                |(amount, stake, worker_active, tamper, prior_confirmations)| {
                    AttestContributionInput {
                        amount,
                        stake,
                        worker_active,
                        tamper,
                        prior_confirmations,
                    }
                },
            )
            .boxed()
    }
}

/// Arbitrary input for finalize_contribution
#[derive(Debug, Clone)]
pub struct FinalizeContributionInput {
    pub amount: u64,
    pub min_confirmations: u8,
    pub confirmations: u8,
    /// Seconds waited after the proposal
    pub wait: i64,
    pub flagged: bool,
    pub flag_cleared: bool,
    /// Attempt a second finalize afterwards
    pub finalize_twice: bool,
}

impl Arbitrary for FinalizeContributionInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            arb_amount(),
            1u8..=4u8,
            0u8..=5u8,
            arb_time_step(),
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(
                |(amount, min_confirmations, confirmations, wait, flagged, flag_cleared, finalize_twice)| {
                    FinalizeContributionInput {
                        amount,
                        min_confirmations,
                        confirmations,
                        wait,
                        flagged,
                        flag_cleared,
                        finalize_twice,
                    }
                },
            )
            .boxed()
    }
}

/// One step of a validator's stake lifecycle
#[derive(Debug, Clone)]
pub enum StakeOp {
    Deposit { validator: u8, amount: u64 },
    RequestWithdrawal { validator: u8, amount: u64 },
    CompleteWithdrawal { validator: u8 },
    Slash { validator: u8, amount: u64, reason: u8 },
    Advance { seconds: i64 },
}

pub fn arb_stake_op() -> impl Strategy<Value = StakeOp> {
    prop_oneof![
        3 => (0u8..3, arb_stake_amount())
            .prop_map(|(validator, amount)| StakeOp::Deposit { validator, amount }),
        2 => (0u8..3, arb_stake_amount())
            .prop_map(|(validator, amount)| StakeOp::RequestWithdrawal { validator, amount }),
        2 => (0u8..3).prop_map(|validator| StakeOp::CompleteWithdrawal { validator }),
        1 => (0u8..3, arb_stake_amount(), 0u8..6)
            .prop_map(|(validator, amount, reason)| StakeOp::Slash { validator, amount, reason }),
        2 => arb_time_step().prop_map(|seconds| StakeOp::Advance { seconds }),
    ]
}

/// Arbitrary sequence of stake operations
#[derive(Debug, Clone)]
pub struct StakeLifecycleInput {
    pub ops: Vec<StakeOp>,
}

impl Arbitrary for StakeLifecycleInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop::collection::vec(arb_stake_op(), 1..40)
            .prop_map(|ops| StakeLifecycleInput { ops })
            .boxed()
    }
}

/// One voter's behaviour in a commit-reveal round
#[derive(Debug, Clone)]
pub struct VoterInput {
    pub vote_valid: bool,
    pub salt: [u8; 32],
    pub reveals: bool,
    /// Reveal with a different vote than committed
    pub reveal_flipped: bool,
    /// Reveal with a different salt than committed
    pub reveal_wrong_salt: bool,
}

pub fn arb_voter() -> impl Strategy<Value = VoterInput> {
    (
        arb_vote(),
        arb_id(),
        prop::bool::weighted(0.8),
        prop::bool::weighted(0.1),
        prop::bool::weighted(0.1),
    )
        .prop_map(
            |(vote_valid, salt, reveals, reveal_flipped, reveal_wrong_salt)| VoterInput {
                vote_valid,
                salt,
                reveals,
                reveal_flipped,
                reveal_wrong_salt,
            },
        )
}

/// Arbitrary input for commit_vote / reveal_vote
#[derive(Debug, Clone)]
pub struct CommitRevealInput {
    pub voters: Vec<VoterInput>,
    /// Seconds after opening at which commits are sent
    pub commit_at: i64,
    /// Seconds after opening at which reveals are sent
    pub reveal_at: i64,
}

impl Arbitrary for CommitRevealInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            prop::collection::vec(arb_voter(), 0..6),
            arb_time_step(),
            arb_time_step(),
        )
            .prop_map(|(voters, commit_at, reveal_at)| CommitRevealInput {
                voters,
                commit_at,
                reveal_at,
            })
            .boxed()
    }
}

/// Arbitrary input for resolve_dispute
#[derive(Debug, Clone)]
pub struct ResolveDisputeInput {
    pub amount: u64,
    pub confirmations: u8,
    pub valid_votes: u8,
    pub invalid_votes: u8,
    /// Try resolving before the reveal window closes
    pub resolve_early: bool,
    pub overturn_slash_bps: u16,
    /// Seconds after resolution at which confirmers are slashed
    pub slash_delay: i64,
}

impl Arbitrary for ResolveDisputeInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            prop_oneof![Just(1_000u64), 1u64..1_000_000u64],
            0u8..=3u8,
            0u8..=4u8,
            0u8..=4u8,
            prop::bool::weighted(0.2),
            arb_slash_bps(),
            prop_oneof![Just(0i64), Just(7 * 24 * 60 * 60), Just(7 * 24 * 60 * 60 + 1), 0i64..(10 * 24 * 60 * 60)],
        )
            .prop_map(
                |(amount, confirmations, valid_votes, invalid_votes, resolve_early, overturn_slash_bps, slash_delay)| {
                    ResolveDisputeInput {
                        amount,
                        confirmations,
                        valid_votes,
                        invalid_votes,
                        resolve_early,
                        overturn_slash_bps,
                        slash_delay,
                    }
                },
            )
            .boxed()
    }
}

/// One protocol operation against a small fixed cast: three validators,
/// one challenger and up to three candidate claim amounts.
#[derive(Debug, Clone)]
pub enum ProtocolOp {
    Deposit { validator: u8, amount: u64 },
    RequestWithdrawal { validator: u8, amount: u64 },
    CompleteWithdrawal { validator: u8 },
    Attest { validator: u8, claim: u8 },
    /// Resubmit the most recent capture
    Replay { validator: u8 },
    Flag { validator: u8, claim: u8 },
    ClearFlag { claim: u8 },
    Finalize { claim: u8 },
    RaiseDispute { claim: u8 },
    Commit { validator: u8, claim: u8, vote_valid: bool },
    Reveal { validator: u8, claim: u8 },
    Resolve { claim: u8 },
    OverturnSlash { validator: u8, claim: u8 },
    Advance { seconds: i64 },
}

pub fn arb_protocol_op() -> impl Strategy<Value = ProtocolOp> {
    prop_oneof![
        1 => (0u8..4, arb_stake_amount())
            .prop_map(|(validator, amount)| ProtocolOp::Deposit { validator, amount }),
        1 => (0u8..4, arb_stake_amount())
            .prop_map(|(validator, amount)| ProtocolOp::RequestWithdrawal { validator, amount }),
        1 => (0u8..4).prop_map(|validator| ProtocolOp::CompleteWithdrawal { validator }),
        4 => (0u8..4, 0u8..3).prop_map(|(validator, claim)| ProtocolOp::Attest { validator, claim }),
        1 => (0u8..4).prop_map(|validator| ProtocolOp::Replay { validator }),
        1 => (0u8..4, 0u8..3).prop_map(|(validator, claim)| ProtocolOp::Flag { validator, claim }),
        1 => (0u8..3).prop_map(|claim| ProtocolOp::ClearFlag { claim }),
        2 => (0u8..3).prop_map(|claim| ProtocolOp::Finalize { claim }),
        1 => (0u8..3).prop_map(|claim| ProtocolOp::RaiseDispute { claim }),
        2 => (0u8..4, 0u8..3, arb_vote())
            .prop_map(|(validator, claim, vote_valid)| ProtocolOp::Commit { validator, claim, vote_valid }),
        2 => (0u8..4, 0u8..3).prop_map(|(validator, claim)| ProtocolOp::Reveal { validator, claim }),
        1 => (0u8..3).prop_map(|claim| ProtocolOp::Resolve { claim }),
        1 => (0u8..4, 0u8..3)
            .prop_map(|(validator, claim)| ProtocolOp::OverturnSlash { validator, claim }),
        3 => arb_time_step().prop_map(|seconds| ProtocolOp::Advance { seconds }),
    ]
}

/// Arbitrary interleaving of protocol operations
#[derive(Debug, Clone)]
pub struct ProtocolScenarioInput {
    pub claim_amounts: [u64; 3],
    pub overturn_slash_bps: u16,
    pub ops: Vec<ProtocolOp>,
}

impl Arbitrary for ProtocolScenarioInput {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            prop::array::uniform3(prop_oneof![Just(1_000u64), 1u64..100_000u64]),
            arb_slash_bps(),
            prop::collection::vec(arb_protocol_op(), 1..60),
        )
            .prop_map(|(claim_amounts, overturn_slash_bps, ops)| ProtocolScenarioInput {
                claim_amounts,
                overturn_slash_bps,
                ops,
            })
            .boxed()
    }
}
