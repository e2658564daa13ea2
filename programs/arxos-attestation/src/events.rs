//! Events emitted by the ArxOS attestation protocol
//!
//! Indexers subscribe to these to mirror contribution, stake and dispute
//! state off-chain.

use anchor_lang::prelude::*;

/// Outcome codes carried by [`DisputeResolved`]
pub mod dispute_outcome {
    /// Strict majority of revealed votes said Valid
    pub const UPHELD: u8 = 0;
    /// Strict majority of revealed votes said Invalid
    pub const OVERTURNED: u8 = 1;
    /// Equal Valid and Invalid reveals, defaulted to Upheld
    pub const TIE_DEFAULT: u8 = 2;
    /// Nobody revealed, defaulted to Upheld
    pub const NO_REVEAL_DEFAULT: u8 = 3;
}

#[event]
pub struct ProtocolInitialized {
    pub authority: Pubkey,
    pub registrar: Pubkey,
    pub mint: Pubkey,
    pub treasury: Pubkey,
    pub maintainer_pool: Pubkey,
    pub min_stake: u64,
    pub min_confirmations: u8,
    pub timestamp: i64,
}

#[event]
pub struct ProtocolParamsUpdated {
    pub min_stake: u64,
    pub min_confirmations: u8,
    pub finalization_delay: i64,
    pub withdrawal_delay: i64,
    pub commit_period: i64,
    pub reveal_period: i64,
    pub dispute_bond: u64,
    pub overturn_slash_bps: u16,
    pub timestamp: i64,
}

#[event]
pub struct WorkerRegistered {
    pub worker: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct WorkerStatusChanged {
    pub worker: Pubkey,
    pub active: bool,
    pub timestamp: i64,
}

#[event]
pub struct BuildingRegistered {
    pub building_id: [u8; 32],
    pub wallet: Pubkey,
    pub timestamp: i64,
}

/// In-flight records keep the wallet they snapshotted
#[event]
pub struct BuildingWalletUpdated {
    pub building_id: [u8; 32],
    pub old_wallet: Pubkey,
    pub new_wallet: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct StakeDeposited {
    pub validator: Pubkey,
    pub amount: u64,
    pub active_stake: u64,
    pub timestamp: i64,
}

#[event]
pub struct WithdrawalRequested {
    pub validator: Pubkey,
    pub amount: u64,
    pub active_stake: u64,
    pub pending_withdrawal: u64,
    pub unlock_time: i64,
    pub timestamp: i64,
}

#[event]
pub struct WithdrawalCompleted {
    pub validator: Pubkey,
    pub amount: u64,
    pub timestamp: i64,
}

#[event]
pub struct ValidatorSlashed {
    pub validator: Pubkey,
    pub requested: u64,
    pub slashed: u64,
    pub remaining_stake: u64,
    pub reason: u8,
    pub timestamp: i64,
}

/// Emitted when the first attestation creates a record
#[event]
pub struct ContributionProposed {
    pub contribution_key: [u8; 32],
    pub building_id: [u8; 32],
    pub worker: Pubkey,
    pub building_wallet: Pubkey,
    pub amount: u64,
    pub validator: Pubkey,
    pub proof_digest: [u8; 32],
    pub timestamp: i64,
}

#[event]
pub struct ContributionConfirmed {
    pub contribution_key: [u8; 32],
    pub validator: Pubkey,
    pub confirmations: u8,
    pub proof_digest: [u8; 32],
    pub timestamp: i64,
}

#[event]
pub struct ContributionFlagged {
    pub contribution_key: [u8; 32],
    pub validator: Pubkey,
    pub reason: String,
    pub timestamp: i64,
}

#[event]
pub struct ContributionFlagCleared {
    pub contribution_key: [u8; 32],
    pub timestamp: i64,
}

#[event]
pub struct ContributionFinalized {
    pub contribution_key: [u8; 32],
    pub worker: Pubkey,
    pub building_wallet: Pubkey,
    pub amount: u64,
    pub worker_share: u64,
    pub building_share: u64,
    pub maintainer_share: u64,
    pub treasury_share: u64,
    pub timestamp: i64,
}

#[event]
pub struct ContributionCancelled {
    pub contribution_key: [u8; 32],
    pub amount: u64,
    pub timestamp: i64,
}

#[event]
pub struct DisputeRaised {
    pub contribution_key: [u8; 32],
    pub challenger: Pubkey,
    pub bond_amount: u64,
    pub reason: String,
    pub commit_deadline: i64,
    pub reveal_deadline: i64,
    pub timestamp: i64,
}

#[event]
pub struct VoteCommitted {
    pub contribution_key: [u8; 32],
    pub voter: Pubkey,
    pub commit_count: u16,
    pub timestamp: i64,
}

#[event]
pub struct VoteRevealed {
    pub contribution_key: [u8; 32],
    pub voter: Pubkey,
    pub vote_valid: bool,
    pub valid_votes: u16,
    pub invalid_votes: u16,
    pub timestamp: i64,
}

#[event]
pub struct DisputeResolved {
    pub contribution_key: [u8; 32],
    pub challenger: Pubkey,
    /// Ruling as u8 (1 = Upheld, 2 = Overturned)
    pub ruling: u8,
    /// See [`dispute_outcome`]
    pub outcome: u8,
    pub valid_votes: u16,
    pub invalid_votes: u16,
    pub bond_amount: u64,
    /// Whether the Upheld record was paid out in the same instruction
    pub paid_out: bool,
    pub timestamp: i64,
}

#[event]
pub struct OverturnSlashApplied {
    pub contribution_key: [u8; 32],
    pub validator: Pubkey,
    pub slashed: u64,
    pub timestamp: i64,
}
